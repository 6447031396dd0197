//! Blog posts: domain types, the remote transport and the repository that
//! reconciles local, cached and remote posts.

pub mod client;
pub mod error;
pub mod image;
pub mod repository;
pub mod retry;
pub mod transport;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use client::HttpTransport;
pub use error::{ApiError, ApiResult};
pub use repository::PostRepository;
pub use retry::RetryPolicy;
pub use types::{Comment, NewComment, NewPost, Page, PostPatch, PostWithImage, Source};
