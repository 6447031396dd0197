//! Post repository that reconciles the local store, the cache and the backend.

use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cache::{LocalPosts, PostCache};
use crate::store::KvStore;

use super::error::{ApiError, ApiResult};
use super::image::image_url;
use super::retry::RetryPolicy;
use super::transport::Transport;
use super::types::{
  Comment, NewComment, NewPost, Page, Post, PostPatch, PostWithImage, Source, LOCAL_ID_FLOOR,
};

/// Where an id-scoped operation is served from.
enum Route {
  /// Owned by the local store; `None` when the id is client-range but missing
  Local(Option<PostWithImage>),
  /// Cache first, then the backend
  Remote,
}

/// Unified read/write API over local posts, cached posts and the backend.
///
/// Posts owned by the local store never cause a network request. Everything
/// else is served from the cache while it is fresh and fetched otherwise.
/// Writes go to the backend first and fall back to the local store.
///
/// Operations assume they are issued one at a time; two concurrent writes can
/// interleave their store updates.
pub struct PostRepository {
  transport: Arc<dyn Transport>,
  cache: PostCache,
  local: LocalPosts,
  retry: RetryPolicy,
  next_local_id: AtomicU64,
  last_comment_id: AtomicU64,
  /// Fire-and-forget backend writes still in flight
  background: Mutex<JoinSet<()>>,
}

impl PostRepository {
  /// Create a repository over an opened store.
  ///
  /// The local id counter resumes after the highest persisted local id.
  pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn KvStore>) -> ApiResult<Self> {
    let local = LocalPosts::new(Arc::clone(&store));
    let next_local_id = local
      .max_id()?
      .map_or(LOCAL_ID_FLOOR, |max| (max + 1).max(LOCAL_ID_FLOOR));
    debug!(next_local_id, "post repository ready");

    Ok(Self {
      transport,
      cache: PostCache::new(store),
      local,
      retry: RetryPolicy::default(),
      next_local_id: AtomicU64::new(next_local_id),
      last_comment_id: AtomicU64::new(0),
      background: Mutex::new(JoinSet::new()),
    })
  }

  /// Set how long cached posts stay valid.
  pub fn with_cache_duration(mut self, duration: Duration) -> Self {
    self.cache = self.cache.with_duration(duration);
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  fn route(&self, id: u64) -> ApiResult<Route> {
    if let Some(post) = self.local.find(id)? {
      debug!(id, "routing to local store");
      return Ok(Route::Local(Some(post)));
    }
    if id >= LOCAL_ID_FLOOR {
      debug!(id, "client-range id missing from local store");
      return Ok(Route::Local(None));
    }
    Ok(Route::Remote)
  }

  /// Local posts followed by cached posts, newest id first.
  fn merged_view(&self) -> ApiResult<Vec<PostWithImage>> {
    let mut view = self.local.load()?;
    view.extend(self.cache.load()?);
    view.sort_by(|a, b| b.id.cmp(&a.id));
    Ok(view)
  }

  /// Decorate a fetched batch and merge it into the cache.
  ///
  /// Ids owned by the local store, and ids in the client range, are skipped so
  /// a post is never held by both stores.
  fn absorb(&self, fetched: Vec<Post>) -> ApiResult<()> {
    let local_ids: HashSet<u64> = self.local.load()?.iter().map(|p| p.id).collect();
    let batch: Vec<PostWithImage> = fetched
      .into_iter()
      .filter(|post| {
        let keep = post.id < LOCAL_ID_FLOOR && !local_ids.contains(&post.id);
        if !keep {
          debug!(id = post.id, "skipping fetched post owned by local store");
        }
        keep
      })
      .map(PostWithImage::from_remote)
      .collect();

    debug!(count = batch.len(), "merging fetched posts into cache");
    self.cache.merge(batch)
  }

  /// Every known post, fetching the listing when the cache is empty or stale.
  pub async fn list_all_with_images(&self) -> ApiResult<Vec<PostWithImage>> {
    if !self.cache.load()?.is_empty() {
      return self.merged_view();
    }

    let transport = &self.transport;
    let fetched = self
      .retry
      .run("list posts", move || transport.list_posts(None))
      .await?;
    self.absorb(fetched)?;
    self.merged_view()
  }

  /// One page of the merged view. When the merged view is too short to cover
  /// it, everything up to the end of the page is fetched as one backend page
  /// so the slice is backed by the same ordering.
  pub async fn list_paginated(&self, page: Page) -> ApiResult<Vec<PostWithImage>> {
    let view = self.merged_view()?;
    if view.len() >= page.required() {
      return Ok(slice(view, page));
    }

    let covering = Page {
      page: 1,
      limit: page.required(),
    };
    let transport = &self.transport;
    let fetched = self
      .retry
      .run("list page", move || transport.list_posts(Some(covering)))
      .await?;
    self.absorb(fetched)?;
    Ok(slice(self.merged_view()?, page))
  }

  pub async fn get_by_id_with_image(&self, id: u64) -> ApiResult<PostWithImage> {
    match self.route(id)? {
      Route::Local(post) => post.ok_or(ApiError::NotFound(id)),
      Route::Remote => {
        if let Some(post) = self.cache.find(id)? {
          return Ok(post);
        }
        let transport = &self.transport;
        let post = self
          .retry
          .run("get post", move || transport.get_post(id))
          .await?;
        Ok(PostWithImage::from_remote(post))
      }
    }
  }

  /// Like [`get_by_id_with_image`](Self::get_by_id_with_image), but a backend
  /// fetch also loads the comments. Both requests must succeed.
  pub async fn get_by_id_with_image_and_comments(&self, id: u64) -> ApiResult<PostWithImage> {
    match self.route(id)? {
      Route::Local(post) => post.ok_or(ApiError::NotFound(id)),
      Route::Remote => {
        if let Some(post) = self.cache.find(id)? {
          return Ok(post);
        }
        let transport = &self.transport;
        let (post, comments) = futures::try_join!(
          self.retry.run("get post", move || transport.get_post(id)),
          self
            .retry
            .run("get comments", move || transport.get_comments(id)),
        )?;

        let mut post = PostWithImage::from_remote(post);
        post.comments = comments;
        Ok(post)
      }
    }
  }

  /// Create a post locally. The backend is told in the background and its
  /// answer is ignored; creation succeeds regardless.
  pub async fn create(&self, new_post: NewPost) -> ApiResult<PostWithImage> {
    let id = self.next_local_id.fetch_add(1, Ordering::SeqCst);
    let post = PostWithImage {
      id,
      user_id: new_post.user_id,
      title: new_post.title.clone(),
      body: new_post.body.clone(),
      comments: Vec::new(),
      image_url: image_url(id),
      source: Source::Local,
    };
    self.local.insert_front(post.clone())?;
    info!(id, "created local post");

    let transport = Arc::clone(&self.transport);
    self.spawn_background(async move {
      match transport.create_post(&new_post).await {
        Ok(remote) => debug!(local_id = id, remote_id = remote.id, "backend accepted post"),
        Err(err) => warn!(
          local_id = id,
          category = %err.category(),
          error = %err,
          "backend rejected post, keeping local copy"
        ),
      }
    });

    Ok(post)
  }

  /// Edit a post.
  ///
  /// A cached post whose backend update fails is promoted into the local store
  /// with the edit applied and is served locally from then on.
  pub async fn update(&self, id: u64, patch: PostPatch) -> ApiResult<PostWithImage> {
    let cached = match self.route(id)? {
      Route::Local(None) => return Err(ApiError::NotFound(id)),
      Route::Local(Some(existing)) => {
        let updated = PostWithImage {
          image_url: image_url(id),
          ..existing.patched(&patch)
        };
        self.local.replace(&updated)?;
        return Ok(updated);
      }
      Route::Remote => self.cache.find(id)?,
    };

    // An unset author means "keep it"; the backend needs it spelled out
    let patch = match (&cached, patch.user_id) {
      (Some(cached), None) => PostPatch {
        user_id: Some(cached.user_id),
        ..patch
      },
      _ => patch,
    };

    match self.transport.update_post(id, &patch).await {
      Ok(remote) => {
        let mut updated = PostWithImage::from_remote(remote);
        updated.id = id;
        updated.image_url = image_url(id);
        if let Some(cached) = cached {
          updated.comments = cached.comments;
          self.cache.replace(&updated)?;
        }
        Ok(updated)
      }
      Err(err) => {
        warn!(
          id,
          category = %err.category(),
          error = %err,
          "remote update failed"
        );
        let Some(cached) = cached else {
          return Err(ApiError::UpdateFailed(id));
        };

        let promoted = PostWithImage {
          source: Source::Local,
          ..cached.patched(&patch)
        };
        self.local.insert_front(promoted.clone())?;
        self.cache.remove(id)?;
        info!(id, "promoted post to local store after failed update");
        Ok(promoted)
      }
    }
  }

  /// Delete a post. Backend failures are logged and otherwise ignored.
  pub async fn delete(&self, id: u64) -> ApiResult<()> {
    match self.route(id)? {
      Route::Local(Some(_)) => {
        self.local.remove(id)?;
        info!(id, "deleted local post");
      }
      Route::Local(None) => debug!(id, "nothing to delete"),
      Route::Remote => {
        self.cache.remove(id)?;
        if let Err(err) = self.transport.delete_post(id).await {
          warn!(
            id,
            category = %err.category(),
            error = %err,
            "remote delete failed"
          );
        }
      }
    }
    Ok(())
  }

  /// Append a comment to a local or cached post. Never touches the network.
  pub async fn add_comment(&self, post_id: u64, new_comment: NewComment) -> ApiResult<Comment> {
    let comment = Comment {
      id: self.next_comment_id(),
      post_id,
      name: new_comment.name,
      email: new_comment.email,
      body: new_comment.body,
    };

    match self.route(post_id)? {
      Route::Local(None) => return Err(ApiError::NotFound(post_id)),
      Route::Local(Some(mut post)) => {
        post.comments.push(comment.clone());
        self.local.replace(&post)?;
      }
      Route::Remote => {
        let Some(mut post) = self.cache.find(post_id)? else {
          return Err(ApiError::NotFound(post_id));
        };
        post.comments.push(comment.clone());
        self.cache.replace(&post)?;
      }
    }

    debug!(post_id, comment_id = comment.id, "added comment");
    Ok(comment)
  }

  /// Wait for background backend writes to finish.
  pub async fn settle(&self) {
    let mut pending = match self.background.lock() {
      Ok(mut set) => std::mem::take(&mut *set),
      Err(_) => return,
    };
    while pending.join_next().await.is_some() {}
  }

  fn spawn_background<F>(&self, task: F)
  where
    F: std::future::Future<Output = ()> + Send + 'static,
  {
    match self.background.lock() {
      Ok(mut set) => {
        set.spawn(task);
      }
      Err(_) => {
        tokio::spawn(task);
      }
    }
  }

  pub fn clear_cache(&self) -> ApiResult<()> {
    self.cache.clear()
  }

  pub fn clear_local(&self) -> ApiResult<()> {
    self.local.clear()
  }

  /// Millisecond timestamp, bumped when needed so ids never repeat.
  fn next_comment_id(&self) -> u64 {
    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let bump = |last: u64| now.max(last + 1);
    match self
      .last_comment_id
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(bump(last)))
    {
      Ok(last) | Err(last) => bump(last),
    }
  }
}

fn slice(view: Vec<PostWithImage>, page: Page) -> Vec<PostWithImage> {
  let (start, end) = page.bounds();
  view
    .into_iter()
    .skip(start)
    .take(end - start)
    .collect()
}
