//! Diagnostics capture: recent operational lines that ride along with a
//! restart and are shown to whoever asked for it.

pub mod capture;
pub mod layer;
pub mod render;

pub use capture::DiagnosticsCapture;
pub use layer::DiagnosticsLayer;
pub use render::{DiagnosticsRenderer, PreformattedRenderer};
