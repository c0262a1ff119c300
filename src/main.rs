mod credentials;
mod dropbox;
mod error;
mod gmail;
mod logging;
mod pipeline;
mod poll_loop;
mod processed_threads;
mod settings;


use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use tokio::time::Duration;

use crate::credentials::{prompt_token, TokenVault};
use crate::dropbox::DropboxClient;
use crate::gmail::client::GmailClient;
use crate::pipeline::PipelineContext;
use crate::processed_threads::store::JsonFileStore;
use crate::processed_threads::ProcessedThreads;
use crate::settings::{LogConfig, SettingsSource};

/// Uploads spreadsheet attachments from a Gmail label to Dropbox and replies in-thread.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// YAML settings file
    #[arg(long, default_value = "settings.yaml")]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match settings::load_settings(&cli.config) {
        Ok((config, source)) => {
            logging::init(&config.log)?;
            if source == SettingsSource::Defaults {
                warn!("{} not found, using default settings", cli.config.display());
            }
            config
        }
        Err(failure) => {
            logging::init(&LogConfig::default())?;
            failure.log();
            return Err(failure.error);
        }
    };

    let vault = TokenVault::open(&config.state.encryption_key_file)?;
    let gmail_token = vault.load_or_prompt(&config.gmail.token_file, || prompt_token("gmail"))?;
    let dropbox_token =
        vault.load_or_prompt(&config.dropbox.token_file, || prompt_token("dropbox"))?;

    let store = JsonFileStore::open(&config.state.settings_file)
        .context("Cannot open the processed thread store")?;
    let processed = ProcessedThreads::load(store)?;
    info!("{} thread(s) already processed", processed.len());

    let mut ctx = PipelineContext {
        mail: GmailClient::new(
            &config.gmail.api_base_url,
            &config.mailbox.user_id,
            gmail_token,
        ),
        storage: DropboxClient::new(&config.dropbox.content_base_url, dropbox_token),
        processed,
        attachment_extension: config.mailbox.attachment_extension.clone(),
        max_part_depth: config.mailbox.max_part_depth,
    };

    let label_id = match poll_loop::resolve_label(&ctx.mail, &config.mailbox.label).await {
        Ok(label_id) => label_id,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    info!("Watching label {:?} ({})", config.mailbox.label, label_id);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    poll_loop::run(
        &mut ctx,
        &label_id,
        Duration::from_secs(config.mailbox.interval_seconds),
        config.mailbox.on_message_error,
        shutdown,
    )
    .await;

    Ok(())
}
