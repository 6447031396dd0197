mod blog;
mod cache;
mod commands;
mod config;
mod logging;
mod store;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::blog::{HttpTransport, PostRepository};
use crate::store::{KvStore, MemoryStore, SqliteStore, AUTH_TOKEN_KEY};

#[derive(Parser, Debug)]
#[command(name = "blogline")]
#[command(about = "A command-line blog client with an offline-capable post cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/blogline/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Keep everything in memory for this run
  #[arg(long, global = true)]
  ephemeral: bool,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.logging)?;

  let store: Arc<dyn KvStore> = if args.ephemeral {
    Arc::new(MemoryStore::new())
  } else {
    Arc::new(SqliteStore::open(&config.store_path()?)?)
  };

  let token = store.get(AUTH_TOKEN_KEY)?;
  let transport = HttpTransport::new(&config, token)?;

  let repo = PostRepository::new(Arc::new(transport), Arc::clone(&store))?
    .with_cache_duration(config.cache_duration())
    .with_retry(config.retry_policy());

  commands::run(args.command, &repo, store.as_ref()).await
}
