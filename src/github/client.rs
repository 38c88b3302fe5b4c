use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;
use super::types::{RunPage, WorkflowPage};

const USER_AGENT: &str = concat!("runsweep/", env!("CARGO_PKG_VERSION"));

/// The three Actions endpoints the sweep depends on.
///
/// Implemented by [`GithubClient`] and by in-memory fakes in tests.
pub trait RunsApi {
    /// `GET /repos/{owner}/{repo}/actions/workflows`
    fn list_workflows(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<WorkflowPage, ApiError>>;

    /// `GET /repos/{owner}/{repo}/actions/runs`
    fn fetch_runs(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<RunPage, ApiError>>;

    /// `DELETE /repos/{owner}/{repo}/actions/runs/{run_id}`.
    ///
    /// Any HTTP status is `Ok`; only transport failures are `Err`.
    fn delete_run(&self, run_id: u64) -> impl Future<Output = Result<u16, ApiError>>;
}

/// Repository-scoped client for the GitHub Actions REST API.
pub struct GithubClient {
    token: String,
    client: Client,
    repo_url: String,
    api_version: String,
}

impl GithubClient {
    /// `base_url` is the REST API root, e.g. `https://api.github.com` or a
    /// GitHub Enterprise `/api/v3` endpoint.
    pub fn with_base_url(
        token: String,
        owner: &str,
        repo: &str,
        base_url: &str,
        api_version: &str,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            token,
            client,
            repo_url: format!("{}/repos/{owner}/{repo}", base_url.trim_end_matches('/')),
            api_version: api_version.to_string(),
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("X-GitHub-Api-Version", &self.api_version)
            .header("Accept", "application/vnd.github+json")
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
        per_page: u32,
    ) -> Result<T, ApiError> {
        let url = format!("{}/{path}", self.repo_url);
        debug!(%url, page, per_page, "GET");
        let response = self
            .authorized(self.client.get(&url))
            .query(&[("per_page", per_page), ("page", page)])
            .send()
            .await?;

        let body = success_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Reads the body of a 2xx response, or turns anything else into [`ApiError::Protocol`].
async fn success_body(response: Response) -> Result<String, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(ApiError::Protocol {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.text().await?)
}

impl RunsApi for GithubClient {
    async fn list_workflows(&self, page: u32, per_page: u32) -> Result<WorkflowPage, ApiError> {
        self.get_page("actions/workflows", page, per_page).await
    }

    async fn fetch_runs(&self, page: u32, per_page: u32) -> Result<RunPage, ApiError> {
        self.get_page("actions/runs", page, per_page).await
    }

    async fn delete_run(&self, run_id: u64) -> Result<u16, ApiError> {
        let url = format!("{}/actions/runs/{run_id}", self.repo_url);
        let response = self.authorized(self.client.delete(&url)).send().await?;
        let status = response.status().as_u16();
        debug!(run_id, status, "DELETE");
        Ok(status)
    }
}
