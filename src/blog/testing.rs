//! Scripted transport for tests.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use super::error::TransportError;
use super::transport::{Transport, TransportResult};
use super::types::{Comment, NewPost, Page, Post, PostPatch};

/// A request the mock received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
  List(Option<Page>),
  Get(u64),
  Comments(u64),
  Create,
  Update(u64),
  Delete(u64),
}

#[derive(Default)]
struct MockState {
  posts: BTreeMap<u64, Post>,
  comments: HashMap<u64, Vec<Comment>>,
  /// Failures handed out to the next requests, in order
  queued_failures: VecDeque<TransportError>,
  /// Failure returned for every request once the queue is drained
  failure: Option<TransportError>,
  calls: Vec<Call>,
}

/// In-memory backend that records every request.
#[derive(Default)]
pub struct MockTransport {
  state: Mutex<MockState>,
}

impl MockTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Backend holding posts `1..=count`.
  pub fn with_posts(count: u64) -> Self {
    let mock = Self::new();
    {
      let mut state = mock.state.lock().unwrap();
      for id in 1..=count {
        state.posts.insert(id, sample_post(id));
      }
    }
    mock
  }

  pub fn add_comments(&self, post_id: u64, comments: Vec<Comment>) {
    self
      .state
      .lock()
      .unwrap()
      .comments
      .insert(post_id, comments);
  }

  /// Fail the next request with `err`.
  pub fn fail_next(&self, err: TransportError) {
    self.state.lock().unwrap().queued_failures.push_back(err);
  }

  /// Fail every request with `err` until `recover` is called.
  pub fn fail_always(&self, err: TransportError) {
    self.state.lock().unwrap().failure = Some(err);
  }

  pub fn recover(&self) {
    self.state.lock().unwrap().failure = None;
  }

  pub fn calls(&self) -> Vec<Call> {
    self.state.lock().unwrap().calls.clone()
  }

  pub fn call_count(&self) -> usize {
    self.state.lock().unwrap().calls.len()
  }

  fn record(&self, call: Call) -> TransportResult<std::sync::MutexGuard<'_, MockState>> {
    let mut state = self.state.lock().unwrap();
    state.calls.push(call);
    if let Some(err) = state.queued_failures.pop_front() {
      return Err(err);
    }
    if let Some(err) = &state.failure {
      return Err(err.clone());
    }
    Ok(state)
  }
}

pub fn sample_post(id: u64) -> Post {
  Post {
    id,
    user_id: 1,
    title: format!("title {}", id),
    body: format!("body {}", id),
  }
}

pub fn sample_comment(id: u64, post_id: u64) -> Comment {
  Comment {
    id,
    post_id,
    name: format!("name {}", id),
    email: format!("user{}@example.com", id),
    body: format!("comment {}", id),
  }
}

fn not_found() -> TransportError {
  TransportError::Status {
    status: 404,
    message: "Not Found".into(),
  }
}

#[async_trait]
impl Transport for MockTransport {
  async fn list_posts(&self, page: Option<Page>) -> TransportResult<Vec<Post>> {
    let state = self.record(Call::List(page))?;
    let posts = state.posts.values().cloned();
    Ok(match page {
      Some(page) => {
        let (start, _) = page.bounds();
        posts.skip(start).take(page.limit).collect()
      }
      None => posts.collect(),
    })
  }

  async fn get_post(&self, id: u64) -> TransportResult<Post> {
    let state = self.record(Call::Get(id))?;
    state.posts.get(&id).cloned().ok_or_else(not_found)
  }

  async fn get_comments(&self, id: u64) -> TransportResult<Vec<Comment>> {
    let state = self.record(Call::Comments(id))?;
    Ok(state.comments.get(&id).cloned().unwrap_or_default())
  }

  async fn create_post(&self, post: &NewPost) -> TransportResult<Post> {
    let state = self.record(Call::Create)?;
    Ok(Post {
      id: state.posts.len() as u64 + 1,
      user_id: post.user_id,
      title: post.title.clone(),
      body: post.body.clone(),
    })
  }

  async fn update_post(&self, id: u64, patch: &PostPatch) -> TransportResult<Post> {
    let mut state = self.record(Call::Update(id))?;
    let post = state.posts.get_mut(&id).ok_or_else(not_found)?;
    post.title = patch.title.clone();
    post.body = patch.body.clone();
    if let Some(user_id) = patch.user_id {
      post.user_id = user_id;
    }
    Ok(post.clone())
  }

  async fn delete_post(&self, id: u64) -> TransportResult<()> {
    let mut state = self.record(Call::Delete(id))?;
    state.posts.remove(&id);
    Ok(())
  }
}

/// A request seen by the local backend
#[derive(Debug, Clone)]
pub struct Received {
  pub method: String,
  pub path: String,
  pub query: Option<String>,
  pub authorization: Option<String>,
  pub body: Option<Value>,
}

pub type ReceivedLog = Arc<Mutex<Vec<Received>>>;

/// Serve a small posts backend on a local port and return its posts URL.
///
/// Posts 1 and 2 exist. `POST` and `PUT` echo their body back, the way
/// jsonplaceholder does, and anything under id 500 answers with a server error.
pub async fn spawn_backend() -> (String, ReceivedLog) {
  let received = ReceivedLog::default();
  let app = Router::new()
    .fallback(backend)
    .with_state(Arc::clone(&received));

  let listener = TcpListener::bind("127.0.0.1:0")
    .await
    .expect("bind local backend");
  let addr = listener.local_addr().expect("local backend addr");
  tokio::spawn(async move {
    axum::serve(listener, app)
      .await
      .expect("serve local backend");
  });

  (format!("http://{addr}/posts"), received)
}

fn wire_post(id: u64) -> Value {
  json!({
    "id": id,
    "userId": 1,
    "title": format!("title {id}"),
    "body": format!("body {id}"),
  })
}

async fn backend(
  State(received): State<ReceivedLog>,
  method: Method,
  uri: Uri,
  headers: HeaderMap,
  body: Bytes,
) -> Response {
  let body: Option<Value> = serde_json::from_slice(&body).ok();
  received.lock().unwrap().push(Received {
    method: method.to_string(),
    path: uri.path().to_string(),
    query: uri.query().map(str::to_string),
    authorization: headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .map(str::to_string),
    body: body.clone(),
  });

  let segments: Vec<&str> = uri.path().trim_matches('/').split('/').collect();
  match (method.as_str(), segments.as_slice()) {
    (_, ["posts", "500", ..]) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    ("GET", ["posts"]) => Json(json!([wire_post(2), wire_post(1)])).into_response(),
    ("GET", ["posts", id]) => match id.parse::<u64>() {
      Ok(id @ 1..=2) => Json(wire_post(id)).into_response(),
      _ => StatusCode::NOT_FOUND.into_response(),
    },
    ("GET", ["posts", id, "comments"]) => Json(json!([{
      "id": 1,
      "postId": id.parse::<u64>().unwrap_or_default(),
      "name": "reader",
      "email": "reader@example.com",
      "body": "nice",
    }]))
    .into_response(),
    ("POST", ["posts"]) => {
      let mut created = body.unwrap_or_else(|| json!({}));
      created["id"] = json!(101);
      (StatusCode::CREATED, Json(created)).into_response()
    }
    ("PUT", ["posts", _]) => Json(body.unwrap_or(Value::Null)).into_response(),
    ("DELETE", ["posts", _]) => Json(json!({})).into_response(),
    _ => StatusCode::NOT_FOUND.into_response(),
  }
}
