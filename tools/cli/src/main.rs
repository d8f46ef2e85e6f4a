//! adrive CLI - Command line interface for drive operations.
//!
//! Every invocation exchanges the refresh token for an access token. The
//! service rotates the refresh token on each exchange, so the new one is
//! printed to stderr before exit.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use adrive_drive::{Drive, DriveConfig, Error, ListLimit, ListOptions, OrderBy, OrderDirection, RemoteItem};

#[derive(Parser)]
#[command(name = "adrive")]
#[command(about = "adrive - Cloud drive client")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Refresh token used to sign in.
    #[arg(long, env = "ADRIVE_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: String,

    /// JSON file with client configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortKey {
    Name,
    Created,
    Updated,
    Size,
}

impl From<SortKey> for OrderBy {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::Name => OrderBy::Name,
            SortKey::Created => OrderBy::CreatedAt,
            SortKey::Updated => OrderBy::UpdatedAt,
            SortKey::Size => OrderBy::Size,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the children of a folder.
    Ls {
        /// Folder ID (default: root).
        #[arg(default_value = "")]
        parent_id: String,

        /// Return a single page of at most this many items.
        #[arg(short, long)]
        limit: Option<u32>,

        /// Resume a limited listing from this marker.
        #[arg(short, long)]
        marker: Option<String>,

        /// Sort key.
        #[arg(short, long, value_enum, default_value = "name")]
        sort: SortKey,

        /// Sort ascending instead of descending.
        #[arg(long)]
        asc: bool,
    },

    /// Create a folder.
    Mkdir {
        /// Folder name.
        name: String,

        /// Parent folder ID.
        #[arg(short, long, default_value = "root")]
        parent_id: String,
    },

    /// Upload a local file.
    Upload {
        /// Local file to upload.
        source: PathBuf,

        /// Destination folder ID.
        #[arg(short, long, default_value = "root")]
        parent_id: String,
    },

    /// Download a file.
    Download {
        /// File ID.
        file_id: String,

        /// Destination path.
        #[arg(short, long)]
        dest: PathBuf,
    },

    /// Print a signed download URL.
    Url {
        /// File ID.
        file_id: String,
    },

    /// Move an item to the trash.
    Rm {
        /// Item ID.
        file_id: String,

        /// Delete permanently instead.
        #[arg(short, long)]
        force: bool,
    },

    /// Remove several items in one request.
    RmBatch {
        /// Item IDs.
        #[arg(required = true)]
        file_ids: Vec<String>,

        /// Delete permanently instead.
        #[arg(short, long)]
        force: bool,
    },

    /// Show item metadata.
    Info {
        /// Item ID.
        file_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref())?;
    let drive = Drive::new(config, cli.refresh_token).context("Failed to create drive client")?;

    let result = match cli.command {
        Commands::Ls {
            parent_id,
            limit,
            marker,
            sort,
            asc,
        } => cmd_ls(&drive, &parent_id, limit, marker.as_deref(), sort, asc).await,

        Commands::Mkdir { name, parent_id } => cmd_mkdir(&drive, &parent_id, &name).await,

        Commands::Upload { source, parent_id } => cmd_upload(&drive, &parent_id, &source).await,

        Commands::Download { file_id, dest } => cmd_download(&drive, &file_id, &dest).await,

        Commands::Url { file_id } => cmd_url(&drive, &file_id).await,

        Commands::Rm { file_id, force } => cmd_rm(&drive, &file_id, force).await,

        Commands::RmBatch { file_ids, force } => cmd_rm_batch(&drive, &file_ids, force).await,

        Commands::Info { file_id } => cmd_info(&drive, &file_id).await,
    };

    // The old refresh token is dead once any exchange succeeded.
    if drive.credentials().await.is_some() {
        eprintln!("Refresh token: {}", drive.refresh_token().await.expose());
    }

    if let Err(e) = &result {
        if e.downcast_ref::<Error>().is_some_and(Error::is_auth) {
            eprintln!("Sign-in failed; the refresh token may have expired or been used already.");
        }
    }

    result
}

/// Load the client configuration, falling back to defaults.
fn load_config(path: Option<&Path>) -> Result<DriveConfig> {
    let Some(path) = path else {
        return Ok(DriveConfig::default());
    };

    let raw = std::fs::read(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: DriveConfig = serde_json::from_slice(&raw).context("Invalid config file")?;
    config.validate().context("Invalid config")?;
    Ok(config)
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// List folder contents.
async fn cmd_ls(
    drive: &Drive,
    parent_id: &str,
    limit: Option<u32>,
    marker: Option<&str>,
    sort: SortKey,
    asc: bool,
) -> Result<()> {
    let options = ListOptions::default()
        .with_limit(limit.map_or(ListLimit::Unlimited, ListLimit::Limited))
        .with_order_by(sort.into())
        .with_order_direction(if asc {
            OrderDirection::Asc
        } else {
            OrderDirection::Desc
        });

    let page = drive
        .list_items(parent_id, marker, &options)
        .await
        .context("Failed to list folder")?;

    if page.items.is_empty() {
        println!("Folder is empty.");
    }
    for item in &page.items {
        if item.is_folder() {
            println!("  [DIR]  {:<40} {}/", item.file_id, item.name);
        } else {
            let size = item.size.map(|s| format!("{} bytes", s)).unwrap_or_default();
            println!(
                "  [FILE] {:<40} {} ({}, {})",
                item.file_id,
                item.name,
                size,
                format_time(item.updated_at)
            );
        }
    }
    if !page.next_marker.is_empty() {
        println!("Next marker: {}", page.next_marker);
    }

    Ok(())
}

/// Create a folder.
async fn cmd_mkdir(drive: &Drive, parent_id: &str, name: &str) -> Result<()> {
    let folder = drive
        .mkdir(parent_id, name)
        .await
        .context("Failed to create folder")?;

    println!("Folder created: {} ({})", folder.name, folder.file_id);
    Ok(())
}

/// Upload a local file.
async fn cmd_upload(drive: &Drive, parent_id: &str, source: &Path) -> Result<()> {
    info!("Uploading {}", source.display());

    let item = drive
        .upload_from_path(parent_id, source)
        .await
        .context("Failed to upload file")?;

    println!("File uploaded: {} ({})", item.name, item.file_id);
    Ok(())
}

/// Download a file.
async fn cmd_download(drive: &Drive, file_id: &str, dest: &Path) -> Result<()> {
    let written = drive
        .download_to_path(file_id, dest)
        .await
        .context("Failed to download file")?;

    println!("Downloaded {} bytes to {}", written, dest.display());
    Ok(())
}

/// Print a signed download URL.
async fn cmd_url(drive: &Drive, file_id: &str) -> Result<()> {
    let url = drive
        .download_url(file_id)
        .await
        .context("Failed to get download URL")?;

    println!("{}", url);
    Ok(())
}

/// Remove one item.
async fn cmd_rm(drive: &Drive, file_id: &str, force: bool) -> Result<()> {
    drive
        .remove(file_id, force)
        .await
        .context("Failed to remove item")?;

    if force {
        println!("Deleted: {}", file_id);
    } else {
        println!("Moved to trash: {}", file_id);
    }
    Ok(())
}

/// Remove several items.
async fn cmd_rm_batch(drive: &Drive, file_ids: &[String], force: bool) -> Result<()> {
    let verdicts = drive
        .batch_remove(file_ids, force)
        .await
        .context("Failed to remove items")?;

    let mut failed = 0;
    for (file_id, verdict) in file_ids.iter().zip(&verdicts) {
        match verdict {
            Ok(()) => println!("  [OK]   {}", file_id),
            Err(e) => {
                failed += 1;
                println!("  [FAIL] {}: {}", file_id, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} items were not removed", failed, file_ids.len());
    }
    Ok(())
}

/// Show item metadata.
async fn cmd_info(drive: &Drive, file_id: &str) -> Result<()> {
    let item = drive
        .get_item(file_id)
        .await
        .context("Failed to get item")?;

    print_item(&item);
    Ok(())
}

fn print_item(item: &RemoteItem) {
    println!("Item Information:");
    println!("  ID: {}", item.file_id);
    println!("  Name: {}", item.name);
    println!("  Kind: {:?}", item.kind);
    println!("  Parent: {}", item.parent_file_id);
    if let Some(size) = item.size {
        println!("  Size: {} bytes", size);
    }
    if let Some(hash) = &item.content_hash {
        println!(
            "  Hash: {} ({})",
            hash,
            item.content_hash_name.as_deref().unwrap_or("unknown")
        );
    }
    println!("  Created: {}", format_time(item.created_at));
    println!("  Modified: {}", format_time(item.updated_at));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_batch_remove() {
        let cli = Cli::try_parse_from([
            "adrive",
            "--refresh-token",
            "rt",
            "rm-batch",
            "--force",
            "a",
            "b",
        ])
        .unwrap();

        match cli.command {
            Commands::RmBatch { file_ids, force } => {
                assert_eq!(file_ids, vec!["a", "b"]);
                assert!(force);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_sort_key_mapping() {
        assert_eq!(OrderBy::from(SortKey::Updated), OrderBy::UpdatedAt);
        assert_eq!(OrderBy::from(SortKey::Size), OrderBy::Size);
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.root_id, "root");
    }

    #[test]
    fn test_partial_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, br#"{"part_size": 1048576}"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.part_size, 1048576);
        assert_eq!(config.root_id, "root");
    }
}
