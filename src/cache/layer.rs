//! Time-boxed mirror of remote reads.

use chrono::{Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::blob::{read_posts, write_posts};
use crate::blog::error::ApiResult;
use crate::blog::types::PostWithImage;
use crate::store::KvStore;

pub const CACHE_PAYLOAD_KEY: &str = "cachedPosts";
pub const CACHE_TIMESTAMP_KEY: &str = "cacheTimestamp";

/// Cache of remote posts with a single creation timestamp.
///
/// The payload and the timestamp live under two store keys. Every read checks
/// the timestamp first; once the cache is older than `duration` both keys are
/// removed and the read comes back empty.
pub struct PostCache {
  store: Arc<dyn KvStore>,
  /// How long before cached data is considered stale
  duration: Duration,
}

impl PostCache {
  pub fn new(store: Arc<dyn KvStore>) -> Self {
    Self {
      store,
      duration: Duration::minutes(5),
    }
  }

  /// Set how long cached posts stay valid.
  pub fn with_duration(mut self, duration: Duration) -> Self {
    self.duration = duration;
    self
  }

  /// Valid cached posts, or empty when there is no cache or it has expired.
  pub fn load(&self) -> ApiResult<Vec<PostWithImage>> {
    let timestamp = self
      .store
      .get(CACHE_TIMESTAMP_KEY)?
      .and_then(|raw| raw.trim().parse::<i64>().ok());

    let Some(written_at) = timestamp else {
      // Payload without a readable timestamp can't be trusted
      if self.store.get(CACHE_PAYLOAD_KEY)?.is_some() {
        debug!("cache payload has no timestamp, evicting");
        self.clear()?;
      }
      return Ok(Vec::new());
    };

    let now = Utc::now().timestamp_millis();
    if self.is_expired(written_at, now) {
      debug!(age_ms = now - written_at, "cache expired, evicting");
      self.clear()?;
      return Ok(Vec::new());
    }

    read_posts(self.store.as_ref(), CACHE_PAYLOAD_KEY)
  }

  /// A cache written at `written_at` is still valid at exactly
  /// `written_at + duration` (both in epoch milliseconds).
  fn is_expired(&self, written_at: i64, now: i64) -> bool {
    now.saturating_sub(written_at) > self.duration.num_milliseconds()
  }

  /// Replace the cache contents and restart its lifetime.
  pub fn save(&self, posts: &[PostWithImage]) -> ApiResult<()> {
    write_posts(self.store.as_ref(), CACHE_PAYLOAD_KEY, posts)?;
    self.store.set(
      CACHE_TIMESTAMP_KEY,
      &Utc::now().timestamp_millis().to_string(),
    )?;
    Ok(())
  }

  /// Merge a fetched batch into the cache. Fetched posts win over cached posts
  /// with the same id. Refreshes the timestamp.
  pub fn merge(&self, fetched: Vec<PostWithImage>) -> ApiResult<()> {
    let mut by_id: BTreeMap<u64, PostWithImage> =
      self.load()?.into_iter().map(|p| (p.id, p)).collect();

    for post in fetched {
      by_id.insert(post.id, post);
    }

    let merged: Vec<PostWithImage> = by_id.into_values().collect();
    self.save(&merged)
  }

  pub fn find(&self, id: u64) -> ApiResult<Option<PostWithImage>> {
    Ok(self.load()?.into_iter().find(|p| p.id == id))
  }

  /// Overwrite the cached copy of `post`. Returns false when it isn't cached.
  /// The cache timestamp is left alone.
  pub fn replace(&self, post: &PostWithImage) -> ApiResult<bool> {
    let mut posts = self.load()?;
    let Some(slot) = posts.iter_mut().find(|p| p.id == post.id) else {
      return Ok(false);
    };
    *slot = post.clone();
    write_posts(self.store.as_ref(), CACHE_PAYLOAD_KEY, &posts)?;
    Ok(true)
  }

  /// Drop a post from the cache, returning it if it was there.
  pub fn remove(&self, id: u64) -> ApiResult<Option<PostWithImage>> {
    let mut posts = self.load()?;
    let Some(index) = posts.iter().position(|p| p.id == id) else {
      return Ok(None);
    };
    let removed = posts.remove(index);
    write_posts(self.store.as_ref(), CACHE_PAYLOAD_KEY, &posts)?;
    Ok(Some(removed))
  }

  /// Remove both cache keys.
  pub fn clear(&self) -> ApiResult<()> {
    self.store.remove(CACHE_PAYLOAD_KEY)?;
    self.store.remove(CACHE_TIMESTAMP_KEY)?;
    Ok(())
  }
}
