use async_trait::async_trait;

use super::error::TransportError;
use super::types::{Comment, NewPost, Page, Post, PostPatch};

pub type TransportResult<T> = Result<T, TransportError>;

/// Remote posts endpoint.
///
/// Every method maps to a single HTTP request against the configured base URL.
#[async_trait]
pub trait Transport: Send + Sync {
  /// `GET base`, or `GET base?_page=P&_limit=L` when a page is given
  async fn list_posts(&self, page: Option<Page>) -> TransportResult<Vec<Post>>;

  /// `GET base/{id}`
  async fn get_post(&self, id: u64) -> TransportResult<Post>;

  /// `GET base/{id}/comments`
  async fn get_comments(&self, id: u64) -> TransportResult<Vec<Comment>>;

  /// `POST base`
  async fn create_post(&self, post: &NewPost) -> TransportResult<Post>;

  /// `PUT base/{id}`
  async fn update_post(&self, id: u64, patch: &PostPatch) -> TransportResult<Post>;

  /// `DELETE base/{id}`
  async fn delete_post(&self, id: u64) -> TransportResult<()>;
}
