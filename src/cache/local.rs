//! Durable store of posts owned by this client.

use std::sync::Arc;

use super::blob::{read_posts, write_posts};
use crate::blog::error::ApiResult;
use crate::blog::types::PostWithImage;
use crate::store::KvStore;

pub const LOCAL_POSTS_KEY: &str = "localPosts";

/// Posts created on this client, or promoted into it after a failed update.
/// Entries have no expiry and stay until deleted.
pub struct LocalPosts {
  store: Arc<dyn KvStore>,
}

impl LocalPosts {
  pub fn new(store: Arc<dyn KvStore>) -> Self {
    Self { store }
  }

  pub fn load(&self) -> ApiResult<Vec<PostWithImage>> {
    read_posts(self.store.as_ref(), LOCAL_POSTS_KEY)
  }

  fn save(&self, posts: &[PostWithImage]) -> ApiResult<()> {
    write_posts(self.store.as_ref(), LOCAL_POSTS_KEY, posts)
  }

  pub fn find(&self, id: u64) -> ApiResult<Option<PostWithImage>> {
    Ok(self.load()?.into_iter().find(|p| p.id == id))
  }

  /// Highest id held locally.
  pub fn max_id(&self) -> ApiResult<Option<u64>> {
    Ok(self.load()?.iter().map(|p| p.id).max())
  }

  /// Insert at the head of the store.
  pub fn insert_front(&self, post: PostWithImage) -> ApiResult<()> {
    let mut posts = self.load()?;
    posts.retain(|p| p.id != post.id);
    posts.insert(0, post);
    self.save(&posts)
  }

  /// Overwrite the stored post with the same id. Returns false when absent.
  pub fn replace(&self, post: &PostWithImage) -> ApiResult<bool> {
    let mut posts = self.load()?;
    let Some(slot) = posts.iter_mut().find(|p| p.id == post.id) else {
      return Ok(false);
    };
    *slot = post.clone();
    self.save(&posts)?;
    Ok(true)
  }

  pub fn remove(&self, id: u64) -> ApiResult<Option<PostWithImage>> {
    let mut posts = self.load()?;
    let Some(index) = posts.iter().position(|p| p.id == id) else {
      return Ok(None);
    };
    let removed = posts.remove(index);
    self.save(&posts)?;
    Ok(Some(removed))
  }

  pub fn clear(&self) -> ApiResult<()> {
    self.store.remove(LOCAL_POSTS_KEY)?;
    Ok(())
  }
}
