use thiserror::Error;

use crate::github::ApiError;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Please provide the correct delete level (workflow or repo), got {0:?}")]
    InvalidDeleteLevel(String),

    #[error("Please provide all the required inputs: {0}")]
    MissingInputs(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("GitHub API error: {0}")]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
