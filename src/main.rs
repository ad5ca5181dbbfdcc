//! wecom-notify - send WeCom application messages from the command line

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wecom_notify::{Config, TokenCache};

#[derive(Parser)]
#[command(name = "wecom-notify")]
#[command(about = "Send messages through a WeCom (WeChat Work) application", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Token cache file (defaults to the platform cache directory)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store application credentials
    Configure {
        /// Enterprise ID (corpid)
        #[arg(long)]
        corp_id: String,

        /// Application AgentId
        #[arg(long)]
        agent_id: String,

        /// Application secret
        #[arg(long)]
        corp_secret: String,

        /// API host override
        #[arg(long)]
        api_base: Option<String>,

        /// HTTP timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Send a text message
    Text {
        /// Recipient userids (repeat or comma-separate)
        #[arg(short, long = "to", required = true, value_delimiter = ',')]
        to: Vec<String>,

        /// Message content
        content: String,
    },

    /// Send a Markdown message
    Markdown {
        /// Recipient userids (repeat or comma-separate)
        #[arg(short, long = "to", required = true, value_delimiter = ',')]
        to: Vec<String>,

        /// Markdown content
        content: String,
    },

    /// Upload and send an image
    Image {
        /// Recipient userids (repeat or comma-separate)
        #[arg(short, long = "to", required = true, value_delimiter = ',')]
        to: Vec<String>,

        /// Local image path
        path: PathBuf,
    },

    /// Upload and send a file
    File {
        /// Recipient userids (repeat or comma-separate)
        #[arg(short, long = "to", required = true, value_delimiter = ',')]
        to: Vec<String>,

        /// Local file path
        path: PathBuf,
    },

    /// Look up a userid by mobile number
    Userid {
        mobile: String,
    },

    /// Show a member's details
    User {
        userid: String,
    },

    /// List departments
    Departments {
        /// Parent department id (all visible departments if omitted)
        #[arg(long)]
        id: Option<u64>,
    },

    /// List members of a department
    Members {
        #[arg(short, long, default_value = "1")]
        department: u64,
    },

    /// Show cached access token status
    Status,

    /// Clear the cached access token
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config_path = cli.config.as_deref();
    let cache_path = cli.cache.as_deref();

    match cli.command {
        Commands::Configure {
            corp_id,
            agent_id,
            corp_secret,
            api_base,
            timeout,
        } => {
            let config = Config {
                corp_id,
                agent_id,
                corp_secret,
                api_base,
                timeout_secs: timeout,
            };
            let path = config.save(config_path)?;
            println!("Saved config to {}", path.display());
        }
        Commands::Text { to, content } => {
            let client = load_client(config_path, cache_path)?;
            let resp = client.send_text(&content, to.as_slice()).await?;
            print_json(&resp)?;
        }
        Commands::Markdown { to, content } => {
            let client = load_client(config_path, cache_path)?;
            let resp = client.send_markdown(&content, to.as_slice()).await?;
            print_json(&resp)?;
        }
        Commands::Image { to, path } => {
            let client = load_client(config_path, cache_path)?;
            tracing::info!("Sending image {}...", path.display());
            let resp = client.send_image(&path, to.as_slice()).await?;
            print_json(&resp)?;
        }
        Commands::File { to, path } => {
            let client = load_client(config_path, cache_path)?;
            tracing::info!("Sending file {}...", path.display());
            let resp = client.send_file(&path, to.as_slice()).await?;
            print_json(&resp)?;
        }
        Commands::Userid { mobile } => {
            let client = load_client(config_path, cache_path)?;
            println!("{}", client.get_userid(&mobile).await?);
        }
        Commands::User { userid } => {
            let client = load_client(config_path, cache_path)?;
            print_json(&client.get_user_info(&userid).await?)?;
        }
        Commands::Departments { id } => {
            let client = load_client(config_path, cache_path)?;
            print_json(&client.list_departments(id).await?)?;
        }
        Commands::Members { department } => {
            let client = load_client(config_path, cache_path)?;
            print_json(&client.list_department_users(department).await?)?;
        }
        Commands::Status => {
            status(config_path, cache_path)?;
        }
        Commands::Logout => {
            let client = load_client(config_path, cache_path)?;
            client.invalidate_token().await?;
            println!("Token cache cleared.");
        }
    }

    Ok(())
}

fn load_client(
    config_path: Option<&Path>,
    cache_path: Option<&Path>,
) -> Result<wecom_notify::WeComClient<wecom_notify::FileTokenCache>> {
    let config = Config::load(config_path)?;
    config.build_client(cache_path)
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value).context("Failed to format response")?;
    println!("{}", pretty);
    Ok(())
}

/// Display cached token state without touching the network
fn status(config_path: Option<&Path>, cache_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let cache_path = match cache_path {
        Some(p) => p.to_path_buf(),
        None => Config::default_cache_path()?,
    };

    println!("Corp ID:     {}", config.corp_id);
    println!("Agent ID:    {}", config.agent_id);
    println!("Token cache: {}", cache_path.display());

    let cache = wecom_notify::FileTokenCache::new(&cache_path);
    match cache.load() {
        Ok(Some(token)) if token.is_valid_for(&config.credential().fingerprint()) => {
            let expires = chrono::DateTime::<chrono::Utc>::from_timestamp(token.expires_at, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| token.expires_at.to_string());
            println!("Token:       valid");
            println!("  expires_at: {}", expires);
        }
        Ok(Some(token)) if token.is_expired() => {
            println!("Token:       expired");
        }
        Ok(Some(_)) => {
            println!("Token:       issued for different credentials");
        }
        Ok(None) => {
            println!("Token:       none");
        }
        Err(e) => {
            println!("Token:       unreadable ({})", e);
        }
    }

    Ok(())
}
