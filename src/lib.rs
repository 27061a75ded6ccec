pub mod bse;
pub mod core;
pub mod db;
pub mod etl;
pub mod utils;

// Re-exports
pub use self::core::config::EtlConfig;
pub use self::etl::runlog::RunLog;
pub use self::utils::progress::ProgressTracker;
