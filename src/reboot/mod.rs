//! Restart handoff: confirm, persist, exit, and report back after relaunch.
//!
//! The supervisor that relaunches the process reads the `signal` key (decimal
//! bitmask) between lifetimes; everything else in the store is private to
//! this crate.

pub mod coordinator;
pub mod record;
pub mod reporter;
pub mod signal;

pub use coordinator::{
    ProcessExit, RebootCoordinator, RebootOutcome, RebootPhase, RebootRequest, StdProcessExit,
};
pub use record::ResumeRecord;
pub use reporter::{ReportOutcome, ResumeReporter};
pub use signal::RebootSignal;
