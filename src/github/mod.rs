pub mod client;
pub mod error;
pub mod types;

pub use client::{GithubClient, RunsApi};
pub use error::ApiError;
pub use types::{RunRef, WorkflowRef};
