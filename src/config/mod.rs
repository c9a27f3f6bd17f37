pub mod schema;

pub use schema::{
    BotConfig, Config, DiagnosticsConfig, HistoryConfig, ProviderConfig, RebootConfig,
    StoreConfig, SummaryConfig,
};
