use thiserror::Error;

use crate::gl::ShaderStage;

/// Failures raised by a graphics backend. The renderer logs these and keeps
/// running in a degraded state; none of them reach the page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GlError {
    #[error("no WebGL context available on the surface")]
    ContextUnavailable,
    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("program failed to link: {log}")]
    Link { log: String },
    #[error("failed to create {0}")]
    Create(&'static str),
    #[error("texture upload failed: {0}")]
    Upload(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse effect config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid effect config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no image search access key configured")]
    MissingKey,
    #[error("invalid image search url: {0}")]
    InvalidUrl(String),
    #[error("image search request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image search returned status {0}")]
    Status(u16),
    #[error("image search response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("image search response had no usable photos")]
    Empty,
}
