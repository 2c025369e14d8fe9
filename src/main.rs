use clap::{Parser, Subcommand};
use color_eyre::Result;
use cordq::{ApiClient, Config, RequestOptions};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cordq")]
#[command(about = "Query the Discord REST API through a rate-limited, cached request queue")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/cordq/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show the current user
  Me,
  /// List the guilds the current user is in
  Guilds,
  /// List the channels of a guild
  Channels { guild_id: String },
  /// Show the latest messages of a channel
  Messages {
    channel_id: String,
    /// Number of messages (1-100, default from config)
    #[arg(short, long)]
    limit: Option<u32>,
  },
  /// List the members of a channel's guild
  Members { channel_id: String },
  /// Send a message to a channel
  Send { channel_id: String, content: String },
  /// GET an arbitrary API path, e.g. /users/@me/connections
  Get {
    path: String,
    /// Skip the cache lookup
    #[arg(long)]
    force: bool,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let _log_guard = init_logging(config.log_dir.as_deref());

  let token = Config::get_token()?;
  let client = ApiClient::new(&config.settings(), token)?;

  match args.command {
    Command::Me => print_json(&client.get_current_user().await?),
    Command::Guilds => print_json(&client.get_guilds().await?),
    Command::Channels { guild_id } => print_json(&client.get_guild_channels(&guild_id).await?),
    Command::Messages { channel_id, limit } => {
      print_json(&client.get_channel_messages(&channel_id, limit).await?)
    }
    Command::Members { channel_id } => print_json(&client.get_channel_members(&channel_id).await?),
    Command::Send {
      channel_id,
      content,
    } => print_json(&client.send_message(&channel_id, &content).await?),
    Command::Get { path, force } => {
      let options = RequestOptions::new().force(force);
      print_json(&client.request(&path, options).await?)
    }
  }
}

/// Log to a daily-rolling file under `log_dir`, or to stderr.
///
/// The returned guard must live until exit so buffered lines get flushed.
fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cordq=info"));

  match log_dir {
    Some(dir) => {
      let appender = tracing_appender::rolling::daily(dir, "cordq.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
      Some(guard)
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
      None
    }
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
