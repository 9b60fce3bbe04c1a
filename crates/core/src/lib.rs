//! Netra Core Library
//!
//! Session report contract, dashboard views and pipeline plumbing for the
//! Shiksha Netra teaching coach.

pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod provider;
pub mod report;
pub mod session;
pub mod view;

// Re-export commonly used items at crate root
pub use cache::{
    get_cache_dir, get_report_path, get_root_cache_dir, load_report, save_report,
    video_fingerprint,
};
pub use config::{AnalysisSettings, Settings};
pub use error::{NetraError, Result};
pub use format::{format_outcome, format_report_readable};
pub use pipeline::{CommandPipeline, HttpPipeline, Pipeline};
pub use provider::{CoachConfig, Provider, ProviderConfig};
pub use report::{SessionReport, check, is_failure, normalize};
pub use session::{Analysis, AnalysisOutcome, CoachStatus, SessionAnalyzer};
pub use view::{ReportViews, build_views};
