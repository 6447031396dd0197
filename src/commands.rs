//! CLI subcommands and their output.

use clap::Subcommand;
use color_eyre::{eyre::eyre, Result};
use tracing::info;

use crate::blog::{
  Comment, NewComment, NewPost, Page, PostPatch, PostRepository, PostWithImage, Source,
};
use crate::store::{KvStore, AUTH_TOKEN_KEY};

const MOCK_TOKEN: &str = "mock-jwt-token";

#[derive(Subcommand, Debug)]
pub enum Command {
  /// List posts, newest first
  #[command(alias = "ls")]
  List {
    /// Page number (1-based); requires --limit
    #[arg(long, requires = "limit", value_parser = clap::value_parser!(u64).range(1..))]
    page: Option<u64>,
    /// Posts per page
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    limit: Option<u64>,
  },
  /// Show a single post
  Show {
    id: u64,
    /// Include comments
    #[arg(short, long)]
    comments: bool,
  },
  /// Create a post
  Create {
    #[arg(long)]
    title: String,
    #[arg(long)]
    body: String,
    #[arg(long, default_value_t = 1)]
    user_id: u64,
  },
  /// Edit a post's title and body
  Edit {
    id: u64,
    #[arg(long)]
    title: String,
    #[arg(long)]
    body: String,
    #[arg(long)]
    user_id: Option<u64>,
  },
  /// Delete a post
  #[command(alias = "rm")]
  Delete { id: u64 },
  /// Add a comment to a post
  Comment {
    post_id: u64,
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    body: String,
  },
  /// Drop all cached posts
  ClearCache,
  /// Drop all locally created posts
  ClearLocal,
  /// Store a session token sent with every request
  Login {
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
  },
  /// Remove the session token
  Logout,
}

pub async fn run(command: Command, repo: &PostRepository, store: &dyn KvStore) -> Result<()> {
  match command {
    Command::List { page, limit } => {
      let posts = match (page, limit) {
        (page, Some(limit)) => {
          let page = Page {
            page: usize::try_from(page.unwrap_or(1))?,
            limit: usize::try_from(limit)?,
          };
          repo.list_paginated(page).await?
        }
        (_, None) => repo.list_all_with_images().await?,
      };
      if posts.is_empty() {
        println!("No posts.");
      }
      for post in &posts {
        println!("{}", summary_line(post));
      }
    }
    Command::Show { id, comments } => {
      let post = if comments {
        repo.get_by_id_with_image_and_comments(id).await?
      } else {
        repo.get_by_id_with_image(id).await?
      };
      print!("{}", detail(&post, comments));
    }
    Command::Create {
      title,
      body,
      user_id,
    } => {
      let post = repo
        .create(NewPost {
          user_id,
          title,
          body,
        })
        .await?;
      println!("Created post {}", post.id);
    }
    Command::Edit {
      id,
      title,
      body,
      user_id,
    } => {
      let post = repo
        .update(
          id,
          PostPatch {
            user_id,
            title,
            body,
          },
        )
        .await?;
      match post.source {
        Source::Local => println!("Updated post {} (saved locally)", post.id),
        Source::Cached => println!("Updated post {}", post.id),
      }
    }
    Command::Delete { id } => {
      repo.delete(id).await?;
      println!("Deleted post {}", id);
    }
    Command::Comment {
      post_id,
      name,
      email,
      body,
    } => {
      let comment = repo
        .add_comment(post_id, NewComment { name, email, body })
        .await?;
      println!("Added comment {} to post {}", comment.id, comment.post_id);
    }
    Command::ClearCache => {
      repo.clear_cache()?;
      println!("Cache cleared.");
    }
    Command::ClearLocal => {
      repo.clear_local()?;
      println!("Local posts cleared.");
    }
    Command::Login { username, password } => {
      login(store, &username, &password)?;
      println!("Logged in as {}", username);
    }
    Command::Logout => {
      store.remove(AUTH_TOKEN_KEY)?;
      info!("session token removed");
      println!("Logged out.");
    }
  }

  // Let background backend writes finish before the runtime shuts down
  repo.settle().await;
  Ok(())
}

/// Accepts any non-empty credentials and stores a mock token.
fn login(store: &dyn KvStore, username: &str, password: &str) -> Result<()> {
  if username.trim().is_empty() || password.is_empty() {
    return Err(eyre!("Username and password are required"));
  }
  store.set(AUTH_TOKEN_KEY, MOCK_TOKEN)?;
  info!(username, "session token stored");
  Ok(())
}

fn summary_line(post: &PostWithImage) -> String {
  let marker = match post.source {
    Source::Local => " [local]",
    Source::Cached => "",
  };
  format!("{:>5}  {}{}", post.id, post.title, marker)
}

fn detail(post: &PostWithImage, with_comments: bool) -> String {
  let mut out = format!(
    "#{} {}\nby user {}\nimage: {}\n\n{}\n",
    post.id, post.title, post.user_id, post.image_url, post.body
  );
  if with_comments {
    out.push_str(&format!("\n{} comment(s)\n", post.comments.len()));
    for comment in &post.comments {
      out.push_str(&comment_block(comment));
    }
  }
  out
}

fn comment_block(comment: &Comment) -> String {
  format!(
    "\n  {} <{}>\n  {}\n",
    comment.name,
    comment.email,
    comment.body.replace('\n', "\n  ")
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::blog::image::image_url;
  use crate::store::MemoryStore;

  fn post(source: Source) -> PostWithImage {
    PostWithImage {
      id: 101,
      user_id: 3,
      title: "Hello".into(),
      body: "World".into(),
      comments: vec![Comment {
        id: 1,
        post_id: 101,
        name: "Ann".into(),
        email: "ann@example.com".into(),
        body: "Nice".into(),
      }],
      image_url: image_url(101),
      source,
    }
  }

  #[test]
  fn test_summary_marks_local_posts() {
    assert_eq!(summary_line(&post(Source::Local)), "  101  Hello [local]");
    assert_eq!(summary_line(&post(Source::Cached)), "  101  Hello");
  }

  #[test]
  fn test_detail_includes_comments_on_request() {
    let text = detail(&post(Source::Local), true);
    assert!(text.contains("1 comment(s)"));
    assert!(text.contains("Ann <ann@example.com>"));
    assert!(!detail(&post(Source::Local), false).contains("Ann"));
  }

  #[test]
  fn test_login_requires_credentials() {
    let store = MemoryStore::new();
    assert!(login(&store, "", "secret").is_err());
    assert!(login(&store, "ann", "").is_err());
    assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), None);

    login(&store, "ann", "secret").unwrap();
    assert_eq!(
      store.get(AUTH_TOKEN_KEY).unwrap().as_deref(),
      Some(MOCK_TOKEN)
    );
  }
}
