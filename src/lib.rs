pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fan_out;
pub mod models;
pub mod projection;
pub mod query;
pub mod render;
pub mod report;
pub mod server;

pub use cache::{MemoCache, ResponseCache};
pub use client::{Auth, JiraApi, JiraClient, JiraConfig};
pub use config::ReportConfig;
pub use error::{Error, Result};
pub use fan_out::{Aggregated, MAX_WORKERS, fan_out};
pub use models::*;

// Projection / rendering re-exports
pub use projection::{DurationFormat, Projectable, TimeUnit};
pub use render::{render_issues, render_worklogs};

// Report re-exports
pub use report::{PageOffset, SearchOutcome, TimespentReport};
