use serde::Deserialize;

use anyhow::Context;
use backtrace::Backtrace;
use log::error;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use crate::poll_loop::FailurePolicy;

// Main configuration struct
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub mailbox: MailboxConfig,
    pub gmail: GmailConfig,
    pub dropbox: DropboxConfig,
    pub state: StateConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MailboxConfig {
    pub label: String,
    pub attachment_extension: String,
    #[serde(rename = "check_interval")]
    pub interval_seconds: u64,
    pub max_part_depth: usize,
    pub user_id: String,
    pub on_message_error: FailurePolicy,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            label: "Air Flow Data".to_string(),
            attachment_extension: ".xlsx".to_string(),
            interval_seconds: 60,
            max_part_depth: 64,
            user_id: "me".to_string(),
            on_message_error: FailurePolicy::SkipMessage,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GmailConfig {
    pub api_base_url: String,
    pub token_file: PathBuf,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://gmail.googleapis.com/gmail/v1".to_string(),
            token_file: PathBuf::from(".gmail_token"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DropboxConfig {
    pub content_base_url: String,
    pub token_file: PathBuf,
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            content_base_url: "https://content.dropboxapi.com/2".to_string(),
            token_file: PathBuf::from(".dropbox_token"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StateConfig {
    pub settings_file: PathBuf,
    pub encryption_key_file: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            settings_file: PathBuf::from("settings.json"),
            encryption_key_file: PathBuf::from(".encryption_key"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: log::LevelFilter,
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: log::LevelFilter::Info,
            file: None,
        }
    }
}

/// Where the loaded settings came from. Nothing is logged while loading, since
/// the logger is configured from the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSource {
    File,
    Defaults,
}

/// A settings file that exists but cannot be used, with the backtrace of where it failed.
#[derive(Debug)]
pub struct SettingsFailure {
    pub error: anyhow::Error,
    pub backtrace: Backtrace,
}

impl SettingsFailure {
    fn new(error: anyhow::Error) -> Self {
        Self {
            error,
            backtrace: Backtrace::new(),
        }
    }

    pub fn log(&self) {
        error!("Error: {:#}", self.error);
        error!("Backtrace:\n{:?}", self.backtrace);
    }
}

pub fn load_settings(path: &Path) -> Result<(Config, SettingsSource), SettingsFailure> {
    // Open the YAML file
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Ok((Config::default(), SettingsSource::Defaults));
        }
        Err(err) => {
            return Err(SettingsFailure::new(
                anyhow::Error::new(err).context(format!("Cannot open settings {}", path.display())),
            ));
        }
    };

    let reader = BufReader::new(file);

    // Parse the YAML file into the Config struct
    serde_yaml::from_reader::<_, Config>(reader)
        .map(|config| (config, SettingsSource::File))
        .with_context(|| format!("Cannot deserialize settings {}", path.display()))
        .map_err(SettingsFailure::new)
}
