/// Deterministic placeholder image for a post.
pub fn image_url(post_id: u64) -> String {
  format!("https://picsum.photos/seed/{}/600/400", post_id)
}
