use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::blog::error::TransportError;
use crate::blog::transport::{Transport, TransportResult};
use crate::blog::types::{Comment, NewPost, Page, Post, PostPatch};
use crate::config::Config;
use color_eyre::{eyre::eyre, Result};

/// PUT body: the patch with the target id. An unset author is left out.
#[derive(Serialize)]
struct UpdateBody<'a> {
  id: u64,
  #[serde(flatten)]
  patch: &'a PostPatch,
}

/// HTTP client for the posts endpoint
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base: Url,
  token: Option<String>,
}

impl HttpTransport {
  pub fn new(config: &Config, token: Option<String>) -> Result<Self> {
    let base = Url::parse(&config.api_url())
      .map_err(|e| eyre!("Invalid API url {}: {}", config.api_url(), e))?;

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.api.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base,
      token,
    })
  }

  /// `base/{segments...}` without disturbing any path already in the base URL
  fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty();
      path.extend(segments);
    }
    url
  }

  async fn send(&self, request: RequestBuilder) -> TransportResult<Response> {
    let request = match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    };

    let request = request.build().map_err(map_reqwest_error)?;
    debug!(method = %request.method(), url = %request.url(), "outgoing request");

    let response = self
      .client
      .execute(request)
      .await
      .map_err(map_reqwest_error)?;

    let status = response.status();
    debug!(status = status.as_u16(), url = %response.url(), "incoming response");

    if status.is_success() {
      Ok(response)
    } else {
      let message = status
        .canonical_reason()
        .unwrap_or("unexpected status")
        .to_string();
      Err(TransportError::Status {
        status: status.as_u16(),
        message,
      })
    }
  }

  async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> TransportResult<T> {
    let response = self.send(request).await?;
    response
      .json::<T>()
      .await
      .map_err(|e| TransportError::Decode(e.to_string()))
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn list_posts(&self, page: Option<Page>) -> TransportResult<Vec<Post>> {
    let mut request = self.client.get(self.url(&[]));
    if let Some(page) = page {
      request = request.query(&[("_page", page.page), ("_limit", page.limit)]);
    }
    self.send_json(request).await
  }

  async fn get_post(&self, id: u64) -> TransportResult<Post> {
    let request = self.client.get(self.url(&[&id.to_string()]));
    self.send_json(request).await
  }

  async fn get_comments(&self, id: u64) -> TransportResult<Vec<Comment>> {
    let request = self.client.get(self.url(&[&id.to_string(), "comments"]));
    self.send_json(request).await
  }

  async fn create_post(&self, post: &NewPost) -> TransportResult<Post> {
    let request = self.client.post(self.url(&[])).json(post);
    self.send_json(request).await
  }

  async fn update_post(&self, id: u64, patch: &PostPatch) -> TransportResult<Post> {
    let body = UpdateBody { id, patch };
    let request = self.client.put(self.url(&[&id.to_string()])).json(&body);
    self.send_json(request).await
  }

  async fn delete_post(&self, id: u64) -> TransportResult<()> {
    let request = self.client.delete(self.url(&[&id.to_string()]));
    self.send(request).await?;
    Ok(())
  }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
  if e.is_decode() || e.is_body() {
    TransportError::Decode(e.to_string())
  } else if let Some(status) = e.status() {
    TransportError::Status {
      status: status.as_u16(),
      message: e.to_string(),
    }
  } else {
    TransportError::Network(e.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::blog::testing::{spawn_backend, Received, ReceivedLog};
  use serde_json::json;

  fn transport(url: &str) -> HttpTransport {
    authorized(url, None)
  }

  fn authorized(url: &str, token: Option<&str>) -> HttpTransport {
    let mut config = Config::default();
    config.api.url = url.to_string();
    HttpTransport::new(&config, token.map(str::to_string)).unwrap()
  }

  fn last(received: &ReceivedLog) -> Received {
    received.lock().unwrap().last().cloned().unwrap()
  }

  fn patch(user_id: Option<u64>) -> PostPatch {
    PostPatch {
      user_id,
      title: "t".into(),
      body: "b".into(),
    }
  }

  #[tokio::test]
  async fn test_list_sends_page_query() {
    let (url, received) = spawn_backend().await;
    let t = transport(&url);

    let posts = t.list_posts(None).await.unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(last(&received).query, None);

    t.list_posts(Some(Page { page: 2, limit: 5 })).await.unwrap();
    let seen = last(&received);
    assert_eq!(seen.path, "/posts");
    assert_eq!(seen.query.as_deref(), Some("_page=2&_limit=5"));
  }

  #[tokio::test]
  async fn test_bearer_token_is_sent() {
    let (url, received) = spawn_backend().await;

    authorized(&url, Some("mock-jwt-token"))
      .get_post(1)
      .await
      .unwrap();
    assert_eq!(
      last(&received).authorization.as_deref(),
      Some("Bearer mock-jwt-token")
    );

    transport(&url).get_post(1).await.unwrap();
    assert_eq!(last(&received).authorization, None);
  }

  #[tokio::test]
  async fn test_update_body_leaves_out_unset_author() {
    let (url, received) = spawn_backend().await;
    let t = transport(&url);

    let echoed = t.update_post(5, &patch(None)).await.unwrap();
    let seen = last(&received);
    assert_eq!(seen.method, "PUT");
    assert_eq!(seen.path, "/posts/5");
    assert_eq!(seen.body, Some(json!({"id": 5, "title": "t", "body": "b"})));
    assert_eq!(echoed.id, 5);
    assert_eq!(echoed.title, "t");

    let echoed = t.update_post(5, &patch(Some(3))).await.unwrap();
    assert_eq!(
      last(&received).body,
      Some(json!({"id": 5, "userId": 3, "title": "t", "body": "b"}))
    );
    assert_eq!(echoed.user_id, 3);
  }

  #[tokio::test]
  async fn test_create_sends_camel_case_body() {
    let (url, received) = spawn_backend().await;
    let created = transport(&url)
      .create_post(&NewPost {
        user_id: 1,
        title: "Hello".into(),
        body: "World".into(),
      })
      .await
      .unwrap();

    let seen = last(&received);
    assert_eq!(seen.method, "POST");
    assert_eq!(
      seen.body,
      Some(json!({"userId": 1, "title": "Hello", "body": "World"}))
    );
    assert_eq!(created.id, 101);
  }

  #[tokio::test]
  async fn test_comments_and_delete_paths() {
    let (url, received) = spawn_backend().await;
    let t = transport(&url);

    let comments = t.get_comments(2).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].post_id, 2);
    assert_eq!(last(&received).path, "/posts/2/comments");

    t.delete_post(2).await.unwrap();
    let seen = last(&received);
    assert_eq!(seen.method, "DELETE");
    assert_eq!(seen.path, "/posts/2");
  }

  #[tokio::test]
  async fn test_non_success_maps_to_status() {
    let (url, _) = spawn_backend().await;
    let t = transport(&url);

    assert!(matches!(
      t.get_post(500).await,
      Err(TransportError::Status { status: 500, .. })
    ));
    assert!(matches!(
      t.get_post(42).await,
      Err(TransportError::Status { status: 404, .. })
    ));
    assert!(matches!(
      t.update_post(500, &patch(None)).await,
      Err(TransportError::Status { status: 500, .. })
    ));
  }

  #[tokio::test]
  async fn test_unreachable_backend_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = transport(&format!("http://{addr}/posts")).get_post(1).await;
    assert!(matches!(result, Err(TransportError::Network(_))));
  }

  #[test]
  fn test_url_appends_segments() {
    let t = transport("https://example.com/posts");
    assert_eq!(t.url(&[]).as_str(), "https://example.com/posts");
    assert_eq!(t.url(&["5"]).as_str(), "https://example.com/posts/5");
    assert_eq!(
      t.url(&["5", "comments"]).as_str(),
      "https://example.com/posts/5/comments"
    );
  }

  #[test]
  fn test_url_tolerates_trailing_slash() {
    let t = transport("https://example.com/posts/");
    assert_eq!(t.url(&["7"]).as_str(), "https://example.com/posts/7");
  }

  #[test]
  fn test_rejects_invalid_base() {
    let mut config = Config::default();
    config.api.url = "not a url".to_string();
    assert!(HttpTransport::new(&config, None).is_err());
  }
}
