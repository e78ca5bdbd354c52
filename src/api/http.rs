use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::AnalysisApi;
use crate::config::{ClientConfig, ConfigError};
use crate::error::ApiError;
use crate::task::{AnalysisRequest, PlotResource, Task, TaskOutputs, TaskStatus};

/// Longest response body quoted back in an error message.
const MAX_ERROR_BODY: usize = 512;

/// [`AnalysisApi`] over HTTPS against the Signaloid REST API.
pub struct SignaloidClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl SignaloidClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            token: config.api_token.clone(),
        })
    }

    /// Base URL with `segments` appended as individually escaped path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl AnalysisApi for SignaloidClient {
    async fn submit_task(&self, request: &AnalysisRequest) -> Result<Task, ApiError> {
        let url = self.endpoint(&["tasks"]);
        debug!(%url, language = %request.language, "submitting task");
        let resp = self
            .http
            .post(url)
            .header(AUTHORIZATION, &self.token)
            .json(request)
            .send()
            .await?;
        decode(expect_status(resp, StatusCode::ACCEPTED).await?).await
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, ApiError> {
        let url = self.endpoint(&["tasks", task_id]);
        let resp = self
            .http
            .get(url)
            .header(AUTHORIZATION, &self.token)
            .send()
            .await?;
        let body: StatusResponse = decode(expect_status(resp, StatusCode::OK).await?).await?;
        Ok(body.status)
    }

    async fn task_outputs(&self, task_id: &str) -> Result<TaskOutputs, ApiError> {
        let mut url = self.endpoint(&["tasks", task_id, "outputs"]);
        url.query_pairs_mut().append_pair("sanitized", "false");
        debug!(task_id, "fetching output manifest");
        let resp = self
            .http
            .get(url)
            .header(AUTHORIZATION, &self.token)
            .send()
            .await?;
        decode(expect_status(resp, StatusCode::OK).await?).await
    }

    async fn fetch_stdout(&self, url: &str) -> Result<String, ApiError> {
        // Pre-signed: the URL itself grants access, so no Authorization header.
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(unexpected(resp).await);
        }
        let text = resp.text().await?;
        debug!(bytes = text.len(), "downloaded stdout");
        Ok(text)
    }

    async fn request_plot(&self, ux_string: &str) -> Result<PlotResource, ApiError> {
        let url = self.endpoint(&["plot"]);
        debug!(%url, "requesting plot");
        let resp = self
            .http
            .post(url)
            .header(AUTHORIZATION, &self.token)
            .json(&PlotRequest { payload: ux_string })
            .send()
            .await?;
        decode(expect_status(resp, StatusCode::CREATED).await?).await
    }

    async fn value_samples(
        &self,
        task_id: &str,
        value_id: &str,
        count: usize,
    ) -> Result<Vec<f64>, ApiError> {
        let mut url = self.endpoint(&["tasks", task_id, "values", value_id, "samples"]);
        url.query_pairs_mut()
            .append_pair("count", &count.to_string());
        let resp = self
            .http
            .get(url)
            .header(AUTHORIZATION, &self.token)
            .send()
            .await?;
        let body: SamplesResponse = decode(expect_status(resp, StatusCode::OK).await?).await?;
        Ok(body.samples)
    }
}

async fn expect_status(resp: Response, expected: StatusCode) -> Result<Response, ApiError> {
    if resp.status() == expected {
        Ok(resp)
    } else {
        Err(unexpected(resp).await)
    }
}

async fn unexpected(resp: Response) -> ApiError {
    let status = resp.status().as_u16();
    let mut body = resp.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|&i| body.is_char_boundary(i))
            .unwrap_or(0);
        body.truncate(cut);
        body.push_str("...");
    }
    ApiError::UnexpectedStatus { status, body }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let text = resp.text().await?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

// --- API types ---

#[derive(serde::Serialize)]
struct PlotRequest<'a> {
    payload: &'a str,
}

#[derive(Deserialize)]
struct StatusResponse {
    #[serde(rename = "Status")]
    status: TaskStatus,
}

#[derive(Deserialize)]
struct SamplesResponse {
    #[serde(rename = "Samples", default)]
    samples: Vec<f64>,
}
