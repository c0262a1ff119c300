use anyhow::{Context, Result};

use crate::settings::LogConfig;

/// Stdout always, plus the configured file if any.
pub fn init(config: &LogConfig) -> Result<()> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(config.level)
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .chain(std::io::stdout());

    if let Some(path) = &config.file {
        let file = fern::log_file(path)
            .with_context(|| format!("Cannot open log file {}", path.display()))?;
        dispatch = dispatch.chain(file);
    }

    dispatch.apply().context("Logger already initialised")?;
    Ok(())
}
