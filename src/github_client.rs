use crate::checkpoint::{RunHistory, RunPredicate};
use crate::config::GithubContext;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use isahc::prelude::*;
use isahc::HttpClient;
use isahc::Request;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

const PER_PAGE: u32 = 100;

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("github request failed: {msg}")]
    HttpError { msg: String },
    #[error("github responded with {code}: {body}")]
    Status { code: u16, body: String },
    #[error("failed to parse github response: {msg}")]
    ParseError { msg: String },
}

#[derive(Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct WorkflowRun {
    pub id: u64,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub run_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WorkflowRun {
    pub fn started_at(&self) -> DateTime<Utc> {
        self.run_started_at.unwrap_or(self.created_at)
    }
}

#[derive(Deserialize, Debug)]
struct WorkflowsResponse {
    workflows: Vec<Workflow>,
}

#[derive(Deserialize, Debug)]
struct WorkflowRunsResponse {
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Clone, Debug)]
pub struct GithubClient {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    pub token: Option<String>,
    pub http_client: HttpClient,
}

impl GithubClient {
    pub fn new(context: &GithubContext, http_client: HttpClient) -> Self {
        Self {
            api_url: context.api_url.trim_end_matches('/').to_string(),
            owner: context.owner.clone(),
            repo: context.repo.clone(),
            token: context.token.clone(),
            http_client,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GithubError> {
        let mut url = format!(
            "{}/repos/{}/{}/{path}?per_page={PER_PAGE}",
            self.api_url, self.owner, self.repo
        );

        for (name, value) in query {
            url.push_str(&format!("&{name}={value}"));
        }

        let mut request_builder = Request::get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");

        if let Some(token) = &self.token {
            request_builder = request_builder.header("Authorization", format!("Bearer {token}"));
        }

        let request = request_builder.body(())?;
        let mut response = self.http_client.send_async(request).await?;
        let body = response.text().await?;

        if !response.status().is_success() {
            return Err(GithubError::Status {
                code: response.status().as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|error| {
            log::error!("Failed to parse a response {error:?}");

            GithubError::ParseError {
                msg: format!("{error:?}"),
            }
        })
    }
}

#[async_trait]
impl RunHistory for GithubClient {
    async fn workflows(&self) -> Result<Vec<Workflow>, GithubError> {
        let response: WorkflowsResponse = self.get("actions/workflows", &[]).await?;

        Ok(response.workflows)
    }

    async fn runs(
        &self,
        workflow_id: u64,
        predicate: RunPredicate,
    ) -> Result<Vec<WorkflowRun>, GithubError> {
        let path = format!("actions/workflows/{workflow_id}/runs");
        let query = [("status", predicate.status_filter())];
        let response: WorkflowRunsResponse = self.get(&path, &query).await?;

        Ok(response.workflow_runs)
    }
}

impl From<isahc::http::Error> for GithubError {
    fn from(error: isahc::http::Error) -> Self {
        let msg = format!("{error:?}");

        GithubError::HttpError { msg }
    }
}

impl From<isahc::Error> for GithubError {
    fn from(error: isahc::Error) -> Self {
        let msg = format!("{error:?}");

        GithubError::HttpError { msg }
    }
}

impl From<std::io::Error> for GithubError {
    fn from(error: std::io::Error) -> Self {
        let msg = format!("{error:?}");

        GithubError::HttpError { msg }
    }
}
