use std::collections::HashSet;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use qo_core::{EntityKind, SyncContext};
use qo_storage::{MediaStore, MirrorStore};
use qo_sync::{reconciler_from_config, SyncConfig};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "qo-cli")]
#[command(about = "QuickOrder mirror command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP facade.
    Serve,
    /// Reconcile mirror contexts against the remote source.
    Sync {
        /// Context to sync: regular, virtual, or all.
        #[arg(long, default_value = "all")]
        context: String,
        /// Entity to sync: products, webphotos, or all.
        #[arg(long, default_value = "all")]
        entity: String,
    },
    /// Remove media files no mirror row references anymore.
    Cleanup {
        /// Context to clean: regular, virtual, or all.
        #[arg(long, default_value = "all")]
        context: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = SyncConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            info!(port = config.web_port, "starting http facade");
            qo_web::serve(config).await?;
        }
        Commands::Sync { context, entity } => {
            let (products, webphotos) = match entity.as_str() {
                "products" => (true, false),
                "webphotos" => (false, true),
                "all" => (true, true),
                other => bail!("unknown entity {other:?}"),
            };
            for context in parse_contexts(&context)? {
                let store = MirrorStore::open(&config.data_dir, context)?;
                let reconciler = reconciler_from_config(&config, context)?;
                if products {
                    let summary = reconciler.sync_products(&store, context).await?;
                    println!(
                        "products sync ({}): run_id={} count={} deleted={} failed={} media={}",
                        context,
                        summary.run_id,
                        summary.products_count,
                        summary.deleted_count,
                        summary.failed_count,
                        summary.downloaded_media,
                    );
                }
                if webphotos {
                    let summary = reconciler.sync_webphotos(&store, context).await?;
                    println!(
                        "webphotos sync ({}): run_id={} count={} deleted={} failed={} media={}",
                        context,
                        summary.run_id,
                        summary.web_photos_count,
                        summary.deleted_count,
                        summary.failed_count,
                        summary.downloaded_media,
                    );
                }
            }
        }
        Commands::Cleanup { context } => {
            let media = MediaStore::new(config.media_dir.clone());
            for context in parse_contexts(&context)? {
                let store = MirrorStore::open(&config.data_dir, context)?;
                let removed = cleanup_context(&store, &media, context).await?;
                println!("cleanup ({context}): removed {removed} orphaned files");
            }
        }
    }

    Ok(())
}

fn parse_contexts(raw: &str) -> Result<Vec<SyncContext>> {
    if raw == "all" {
        return Ok(SyncContext::ALL.to_vec());
    }
    match SyncContext::parse(raw) {
        Some(context) => Ok(vec![context]),
        None => bail!("unknown context {raw:?}"),
    }
}

async fn cleanup_context(
    store: &MirrorStore,
    media: &MediaStore,
    context: SyncContext,
) -> Result<usize> {
    let product_files: HashSet<String> = store
        .all_products()?
        .iter()
        .flat_map(|p| p.media.iter())
        .filter(|m| !m.is_remote())
        .map(|m| m.filename().to_string())
        .collect();
    let webphoto_files: HashSet<String> = store
        .all_webphotos()?
        .iter()
        .map(|w| qo_core::MediaRef::from_raw(w.url.clone()))
        .filter(|m| !m.is_remote())
        .map(|m| m.filename().to_string())
        .collect();

    let mut removed = media
        .cleanup_orphaned(context, EntityKind::Products, &product_files)
        .await?;
    removed += media
        .cleanup_orphaned(context, EntityKind::WebPhotos, &webphoto_files)
        .await?;
    Ok(removed)
}
