//! Crema CLI: run the image pipeline from a terminal.
//!
//! Reads the same environment as the relay service (`.env` is honoured).

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use crema_cli::{init_cli, load_image_file};
use crema_core::{
    select_for_asset, AppError, CompressionPreset, CompressionSettings, Config, DisplayTier,
    HostAllowList, ImageAsset, RenderError, SelectedImage,
};
use crema_processing::{compress_async, decode_dimensions, CompressionOptions, OutputFormat};
use crema_services::{HttpImageFetcher, ResilientImageLoader, UploadDispatcher};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "crema", about = "Café image pipeline CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Tier {
    Thumbnail,
    Card,
    Detail,
}

impl From<Tier> for DisplayTier {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Thumbnail => DisplayTier::Thumbnail,
            Tier::Card => DisplayTier::Card,
            Tier::Detail => DisplayTier::Detail,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    /// COMPRESS_* settings (1920x1080 at quality 0.8 by default)
    Upload,
    /// CATALOG_COMPRESS_* settings (1200x1200 at quality 0.7 by default)
    Catalog,
}

impl From<Preset> for CompressionPreset {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Upload => CompressionPreset::Upload,
            Preset::Catalog => CompressionPreset::Catalog,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, compress and upload an image to the configured provider
    Upload {
        /// Path to the image
        file: PathBuf,
        /// Upload the file as-is
        #[arg(long)]
        no_compress: bool,
        #[arg(long, value_enum, default_value = "upload")]
        preset: Preset,
    },
    /// Compress an image locally
    Compress {
        /// Path to the image
        input: PathBuf,
        /// Where to write the result (defaults to `<stem>.min.<ext>` beside the input)
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "upload")]
        preset: Preset,
    },
    /// Pick the URL to render from an image's stored variants
    Select {
        #[arg(long)]
        thumb: Option<String>,
        #[arg(long)]
        medium: Option<String>,
        #[arg(long)]
        display: Option<String>,
        #[arg(long)]
        original: Option<String>,
        #[arg(long)]
        legacy: Option<String>,
        #[arg(long, value_enum, default_value = "card")]
        tier: Tier,
    },
    /// Load an image the way the storefront does: retries, fallback, placeholder
    Probe {
        primary: String,
        #[arg(long)]
        fallback: Option<String>,
        /// Stall timeout in milliseconds
        #[arg(long, default_value = "5000")]
        stall_ms: u64,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn default_output(input: &std::path::Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    input.with_file_name(format!("{}.min.{}", stem, extension))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_cli();

    let cli = Cli::parse();

    match cli.command {
        Commands::Upload {
            file,
            no_compress,
            preset,
        } => {
            let mut config = Config::from_env().context("Failed to load configuration")?;
            if no_compress {
                config.0.compression.auto_compress = false;
            }

            let dispatcher = UploadDispatcher::from_config_with_preset(
                &config,
                reqwest::Client::new(),
                preset.into(),
            )
            .context("Upload provider is not configured")?;
            let image = load_image_file(&file)?;

            let result = dispatcher
                .upload_with_progress(image, |progress| {
                    tracing::info!(stage = ?progress.stage, percent = progress.percent, "Upload progress");
                })
                .await;
            print_json(&result)?;

            if !result.success {
                anyhow::bail!(result.error.unwrap_or_else(|| "Upload failed".to_string()));
            }
        }
        Commands::Compress {
            input,
            output,
            preset,
        } => {
            let settings = match Config::from_env() {
                Ok(config) => config.compression().clone(),
                Err(e) => {
                    tracing::warn!(error = %e, "Using default compression settings");
                    CompressionSettings::default()
                }
            };
            let image = load_image_file(&input)?;
            let original_size = image.size();

            // Always re-encode when asked explicitly
            let options = CompressionOptions {
                skip_below_bytes: 0,
                ..CompressionOptions::from_settings(&settings, preset.into())
            };
            let compressed = compress_async(image, options)
                .await
                .map_err(AppError::from)?;
            let (width, height) = decode_dimensions(&compressed.data)?;

            // The compressed file keeps its name; the container may differ
            let extension = OutputFormat::from_mime_type(&compressed.content_type)
                .map(|format| format.extension().to_string())
                .or_else(|| compressed.extension())
                .unwrap_or_else(|| "bin".to_string());
            let output = output.unwrap_or_else(|| default_output(&input, &extension));
            std::fs::write(&output, &compressed.data)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            print_json(&serde_json::json!({
                "output": output.display().to_string(),
                "content_type": compressed.content_type,
                "original_size": original_size,
                "compressed_size": compressed.size(),
                "width": width,
                "height": height,
            }))?;
        }
        Commands::Select {
            thumb,
            medium,
            display,
            original,
            legacy,
            tier,
        } => {
            let allow_list = match Config::from_env() {
                Ok(config) => HostAllowList::from_config(&config),
                Err(e) => {
                    tracing::warn!(error = %e, "Using default host allow-list");
                    HostAllowList::default()
                }
            };
            let asset = ImageAsset {
                thumb,
                medium,
                display,
                original,
                legacy,
                ..ImageAsset::default()
            };
            let selected: SelectedImage = select_for_asset(&asset, tier.into(), &allow_list);
            print_json(&selected)?;
        }
        Commands::Probe {
            primary,
            fallback,
            stall_ms,
        } => {
            let fetcher = Arc::new(HttpImageFetcher::new(reqwest::Client::new()));
            let reported: Arc<Mutex<Option<RenderError>>> = Arc::new(Mutex::new(None));
            let sink = Arc::clone(&reported);
            let loader = ResilientImageLoader::new(fetcher)
                .with_stall_timeout(Duration::from_millis(stall_ms))
                .on_error(move |err| {
                    if let Ok(mut slot) = sink.lock() {
                        *slot = Some(err.clone());
                    }
                });

            let selected = SelectedImage {
                fallback: fallback.unwrap_or_else(|| primary.clone()),
                primary,
            };
            let state = loader.load(&selected).await;

            print_json(&serde_json::json!({
                "phase": format!("{:?}", state.phase()),
                "source": state.source(),
                "using_fallback": state.is_using_fallback(),
                "error_reported": state.error_reported(),
            }))?;

            let failure = reported.lock().ok().and_then(|mut slot| slot.take());
            if let Some(err) = failure {
                return Err(AppError::from(err).into());
            }
        }
    }

    Ok(())
}
