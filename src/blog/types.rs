use serde::{Deserialize, Deserializer, Serialize};

/// Identifiers at or above this value are assigned by the client.
pub const LOCAL_ID_FLOOR: u64 = 101;

/// Which store currently owns a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  /// Created or promoted on this client; never touches the network again
  Local,
  /// Mirror of a remote read
  #[default]
  Cached,
}

/// A blog post as the backend knows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
  pub id: u64,
  #[serde(default, deserialize_with = "null_as_default")]
  pub user_id: u64,
  pub title: String,
  pub body: String,
}

/// Backends that echo request bodies may send `null` for absent fields.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A post decorated with its placeholder image, its comments and its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostWithImage {
  pub id: u64,
  pub user_id: u64,
  pub title: String,
  pub body: String,
  #[serde(default)]
  pub comments: Vec<Comment>,
  pub image_url: String,
  #[serde(default)]
  pub source: Source,
}

impl PostWithImage {
  /// Decorate a remote post. Comments start empty.
  pub fn from_remote(post: Post) -> Self {
    Self {
      image_url: super::image::image_url(post.id),
      id: post.id,
      user_id: post.user_id,
      title: post.title,
      body: post.body,
      comments: Vec::new(),
      source: Source::Cached,
    }
  }

  /// Copy of this post with title, body and author taken from `patch`.
  pub fn patched(&self, patch: &PostPatch) -> Self {
    Self {
      user_id: patch.user_id.unwrap_or(self.user_id),
      title: patch.title.clone(),
      body: patch.body.clone(),
      ..self.clone()
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub id: u64,
  pub post_id: u64,
  pub name: String,
  pub email: String,
  pub body: String,
}

/// Payload for creating a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
  pub user_id: u64,
  pub title: String,
  pub body: String,
}

/// Payload for editing a post. `user_id` of `None` keeps the current author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_id: Option<u64>,
  pub title: String,
  pub body: String,
}

/// Payload for adding a comment; id and post id are assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
  pub name: String,
  pub email: String,
  pub body: String,
}

/// One page of a paginated listing (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub page: usize,
  pub limit: usize,
}

impl Page {
  /// Index range of this page within a full listing. Saturates at
  /// `usize::MAX`.
  pub fn bounds(&self) -> (usize, usize) {
    let start = self.page.saturating_sub(1).saturating_mul(self.limit);
    (start, start.saturating_add(self.limit))
  }

  /// Entries needed in the merged view to serve this page without a fetch.
  pub fn required(&self) -> usize {
    self.page.max(1).saturating_mul(self.limit)
  }
}
