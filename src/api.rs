use clap::ValueEnum;
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FetchError, SubmitError, ValidationError};
use crate::ledger::FeedbackValue;
use crate::query::Query;
use crate::schema::{SearchResult, validate};

/// How the search endpoint receives the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
  /// `GET ?query=...`
  #[default]
  Get,
  /// `POST {"query": ...}`
  Post,
}

/// State-changing method used for feedback writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackMethod {
  #[default]
  Post,
  Put,
}

impl From<FeedbackMethod> for Method {
  fn from(m: FeedbackMethod) -> Self {
    match m {
      FeedbackMethod::Post => Method::POST,
      FeedbackMethod::Put => Method::PUT,
    }
  }
}

/// Body of a feedback write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackRequest {
  pub feedback: i8,
  pub query: String,
  pub result_id: String,
}

impl FeedbackRequest {
  /// `None` for [`FeedbackValue::Unset`], which is never sent.
  pub fn new(value: FeedbackValue, query: &Query, result: &SearchResult) -> Option<Self> {
    Some(Self { feedback: value.wire()?, query: query.as_str().to_string(), result_id: result.id.clone() })
  }
}

/// The search/feedback service as seen by the session.
pub trait Backend: Send + Sync + 'static {
  /// Run a search and return the decoded, not yet validated, response body.
  fn search(&self, query: &Query) -> impl Future<Output = Result<Value, FetchError>> + Send;

  fn submit_feedback(&self, request: &FeedbackRequest) -> impl Future<Output = Result<(), SubmitError>> + Send;
}

/// Fetch and validate results for `query`. No query means no results and no request.
pub async fn fetch_results<B: Backend>(
  backend: &B,
  query: Option<&Query>,
) -> Result<Vec<SearchResult>, FetchError> {
  let Some(query) = query else {
    return Ok(Vec::new());
  };
  let raw = backend.search(query).await?;
  let results = validate(&raw)?;
  debug!(query = %query, count = results.len(), "search: response validated");
  Ok(results)
}

/// HTTP implementation of [`Backend`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
  client: Client,
  search_url: Url,
  feedback_url: Url,
  search_method: SearchMethod,
  feedback_method: FeedbackMethod,
}

impl HttpBackend {
  pub fn new(
    search_url: Url,
    feedback_url: Url,
    search_method: SearchMethod,
    feedback_method: FeedbackMethod,
    timeout: Duration,
  ) -> reqwest::Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, search_url, feedback_url, search_method, feedback_method })
  }

  fn search_request(&self, query: &Query) -> reqwest::RequestBuilder {
    match self.search_method {
      SearchMethod::Get => {
        let mut url = self.search_url.clone();
        url.query_pairs_mut().append_pair("query", query.as_str());
        self.client.get(url)
      }
      SearchMethod::Post => self.client.post(self.search_url.clone()).json(&serde_json::json!({ "query": query.as_str() })),
    }
  }
}

fn reason(status: StatusCode) -> String {
  status.canonical_reason().unwrap_or("").to_string()
}

impl Backend for HttpBackend {
  async fn search(&self, query: &Query) -> Result<Value, FetchError> {
    let response = self.search_request(query).send().await.map_err(|e| {
      warn!(err = %e, query = %query, "search: transport error");
      FetchError::Transport(e.to_string())
    })?;

    let status = response.status();
    if !status.is_success() {
      warn!(status = status.as_u16(), query = %query, "search: non-success response");
      return Err(FetchError::Status { status: status.as_u16(), reason: reason(status) });
    }

    let body = response.bytes().await.map_err(|e| FetchError::Transport(e.to_string()))?;
    // Decode only; field validation happens in `fetch_results`.
    serde_json::from_slice(&body).map_err(|e| ValidationError::NotJson(e.to_string()).into())
  }

  async fn submit_feedback(&self, request: &FeedbackRequest) -> Result<(), SubmitError> {
    let response = self
      .client
      .request(self.feedback_method.into(), self.feedback_url.clone())
      .json(request)
      .send()
      .await
      .map_err(|e| {
        warn!(err = %e, "feedback: transport error");
        SubmitError::Transport(e.to_string())
      })?;

    let status = response.status();
    if !status.is_success() {
      warn!(status = status.as_u16(), result_id = %request.result_id, "feedback: non-success response");
      return Err(SubmitError::Status { status: status.as_u16(), reason: reason(status) });
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  struct Canned(Result<Value, FetchError>);

  impl Backend for Canned {
    async fn search(&self, _query: &Query) -> Result<Value, FetchError> {
      self.0.clone()
    }

    async fn submit_feedback(&self, _request: &FeedbackRequest) -> Result<(), SubmitError> {
      Ok(())
    }
  }

  fn result() -> SearchResult {
    SearchResult {
      id: "42".to_string(),
      media_id: "vid".to_string(),
      title: "t".to_string(),
      text: "x".to_string(),
      start: 1,
      thumbnail_url: "thumb.jpg".to_string(),
      lesson: None,
      forum: None,
      course: None,
    }
  }

  #[test]
  fn feedback_request_wire_shape() {
    let q = Query::parse("neural nets").unwrap();
    let req = FeedbackRequest::new(FeedbackValue::Negative, &q, &result()).unwrap();
    assert_eq!(serde_json::to_value(&req).unwrap(), json!({"feedback": -1, "query": "neural nets", "result_id": "42"}));
    assert!(FeedbackRequest::new(FeedbackValue::Unset, &q, &result()).is_none());
  }

  #[test]
  fn feedback_method_maps_to_http() {
    assert_eq!(Method::from(FeedbackMethod::Post), Method::POST);
    assert_eq!(Method::from(FeedbackMethod::Put), Method::PUT);
  }

  #[test]
  fn get_search_puts_query_in_url() {
    let backend = HttpBackend::new(
      Url::parse("http://localhost:8000/api/search").unwrap(),
      Url::parse("http://localhost:8000/api/feedback").unwrap(),
      SearchMethod::Get,
      FeedbackMethod::Post,
      Duration::from_secs(1),
    )
    .unwrap();
    let req = backend.search_request(&Query::parse("lesson 1").unwrap()).build().unwrap();
    assert_eq!(req.method(), &Method::GET);
    assert_eq!(req.url().as_str(), "http://localhost:8000/api/search?query=lesson+1");
  }

  #[tokio::test]
  async fn absent_query_skips_backend() {
    let backend = Canned(Err(FetchError::Transport("must not be called".to_string())));
    assert!(fetch_results(&backend, None).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn fetch_validates_payload() {
    let q = Query::parse("x").unwrap();
    let backend = Canned(Ok(json!([{"id": 1, "video_id": "v", "title": "t", "text": "x", "thumbnail": "i"}])));
    let err = fetch_results(&backend, Some(&q)).await.unwrap_err();
    assert!(matches!(err, FetchError::Invalid(_)));
  }

  #[tokio::test]
  async fn fetch_passes_status_errors_through() {
    let q = Query::parse("x").unwrap();
    let backend = Canned(Err(FetchError::Status { status: 500, reason: "Internal Server Error".to_string() }));
    assert_eq!(
      fetch_results(&backend, Some(&q)).await.unwrap_err(),
      FetchError::Status { status: 500, reason: "Internal Server Error".to_string() }
    );
  }
}
