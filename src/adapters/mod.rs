//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
pub mod history_import;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
