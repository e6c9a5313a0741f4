//! Academic Incentive Tracker Common Library
//!
//! Shared code for the incentive tracker services including:
//! - Record model for books, projects and journal papers
//! - In-memory record and user stores
//! - Delimited-text and spreadsheet exports
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod errors;
pub mod export;
pub mod metrics;
pub mod records;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use export::{ExportManager, ExportMode};
pub use records::{Record, RecordKind};
pub use store::{RecordStore, UserStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
