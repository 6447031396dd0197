//! JSON blob helpers shared by the cache and the local post store.

use tracing::warn;

use crate::blog::error::ApiResult;
use crate::blog::types::PostWithImage;
use crate::store::KvStore;

/// Read the post array stored under `key`.
///
/// A missing key reads as empty. A blob that no longer parses is logged and
/// also reads as empty; the next write replaces it.
pub fn read_posts(store: &dyn KvStore, key: &str) -> ApiResult<Vec<PostWithImage>> {
  let Some(raw) = store.get(key)? else {
    return Ok(Vec::new());
  };

  match serde_json::from_str(&raw) {
    Ok(posts) => Ok(posts),
    Err(e) => {
      warn!(key, error = %e, "discarding unreadable post blob");
      Ok(Vec::new())
    }
  }
}

pub fn write_posts(store: &dyn KvStore, key: &str, posts: &[PostWithImage]) -> ApiResult<()> {
  let raw = serde_json::to_string(posts)?;
  store.set(key, &raw)?;
  Ok(())
}
