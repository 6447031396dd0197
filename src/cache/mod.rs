//! Client-side post storage.
//!
//! Two stores share the durable key/value backend:
//! - `PostCache` mirrors remote reads and expires as a whole after a fixed duration
//! - `LocalPosts` holds posts this client owns and never expires
//!
//! A post lives in at most one of them at a time.

mod blob;
mod layer;
mod local;

pub use layer::{PostCache, CACHE_PAYLOAD_KEY, CACHE_TIMESTAMP_KEY};
pub use local::{LocalPosts, LOCAL_POSTS_KEY};
