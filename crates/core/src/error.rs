use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetraError {
    #[error("Unsupported video file {file_name}: expected one of mp4, mov, avi, mkv")]
    UnsupportedVideo { file_name: String },

    #[error("Pipeline {stage} failed: {reason}")]
    PipelineFailed { stage: String, reason: String },

    #[error("Pipeline {stage} returned invalid output: {reason}")]
    InvalidPipelineOutput { stage: String, reason: String },

    #[error("Video file not found: {path}")]
    VideoNotFound { path: PathBuf },

    #[error("Invalid setting {key}={value}: {reason}")]
    InvalidSetting {
        key: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },
}

pub type Result<T> = std::result::Result<T, NetraError>;
