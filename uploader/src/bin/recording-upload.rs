use clap::{Parser, Subcommand};
use eyre::Context;
use oauth2::TokenResponse;
use recording_uploader::config::{CLIENT_ID_VAR, CLIENT_SECRET_VAR, REFRESH_TOKEN_VAR};
use recording_uploader::oauth::OAuthManager;
use recording_uploader::{
    CancellationToken, Config, DeleteResult, PrivacyStatus, UploadError, UploadMetadata,
    UploadOptions, VideoBlob, VideoHostClient,
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recording-upload")]
#[command(about = "Upload screen recordings to the video host, or remove them again")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a recording and print the result as JSON
    Upload {
        /// Video file to upload
        file: PathBuf,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// May be given multiple times
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// public, unlisted or private
        #[arg(long)]
        privacy: Option<PrivacyStatus>,

        #[arg(long, value_name = "ID")]
        category: Option<String>,

        #[arg(long, default_value_t = 3)]
        max_retries: u32,

        /// Give up after this many seconds, retries included
        #[arg(long, default_value_t = 600)]
        timeout_secs: u64,
    },

    /// Delete a previously uploaded video and print the result as JSON
    Delete {
        asset_id: String,
    },

    /// Obtain a refresh token through the browser consent flow
    Authorize {
        #[arg(long, env = CLIENT_ID_VAR)]
        client_id: String,

        #[arg(long, env = CLIENT_SECRET_VAR, hide_env_values = true)]
        client_secret: String,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Upload {
            file,
            title,
            description,
            tags,
            privacy,
            category,
            max_retries,
            timeout_secs,
        } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("read {}", file.display()))?;
            let blob = VideoBlob::new(bytes, content_type_for(&file));
            let metadata = UploadMetadata {
                title,
                description,
                tags,
                privacy_status: privacy,
                category_id: category,
                duration_secs: None,
            };

            let cancel = CancellationToken::new();
            tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::warn!("interrupted, cancelling upload");
                        cancel.cancel();
                    }
                }
            });

            let options = UploadOptions::default()
                .max_retries(max_retries)
                .timeout(Duration::from_secs(timeout_secs))
                .cancel_with(cancel)
                .on_progress(|percent| tracing::info!("upload {percent:.0}% complete"));

            let client = VideoHostClient::new(Config::from_env());
            let result = client
                .upload_with_retry(&blob, metadata, options)
                .await
                .context("upload recording")?;
            print_json(&result)?;
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Delete { asset_id } => {
            let client = VideoHostClient::new(Config::from_env());
            let outcome = match client.delete_asset(&asset_id).await {
                Err(UploadError::RetryableAuth { .. }) => {
                    tracing::info!("retrying delete with the refreshed token");
                    client.delete_asset(&asset_id).await
                }
                other => other,
            }
            .context("delete video")?;
            print_json(&DeleteResult::from(outcome))?;
        }
        Command::Authorize {
            client_id,
            client_secret,
        } => {
            let config = Config::from_env();
            let token = OAuthManager::new(config.endpoints.token_url)
                .authorize(&client_id, &client_secret)
                .await?;
            let Some(refresh_token) = token.refresh_token() else {
                eyre::bail!("provider did not issue a refresh token; revoke access and try again");
            };
            println!("{REFRESH_TOKEN_VAR}={}", refresh_token.secret());
        }
    }

    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> eyre::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize result")?;
    println!("{json}");
    Ok(())
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("webm") => "video/webm",
        Some("mp4" | "m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        _ => "video/*",
    }
}
