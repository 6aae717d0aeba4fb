use std::fs::{self, OpenOptions};
use std::path::Path;

use env_logger::{Env, Target};

use crate::error::{ArcadeError, ArcadeResult};

/// Sends all log output to `path`. The terminal is in raw mode while a game is
/// running, so nothing may go to stderr.
pub fn init(path: &Path, verbosity: u8) -> ArcadeResult<()>
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    env_logger::Builder::from_env(Env::default().default_filter_or(default_level(verbosity)))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .map_err(|err| ArcadeError::Logger(err.to_string()))?;

    log::info!("dodo-arcade {} started", env!("CARGO_PKG_VERSION"));
    Ok(())
}

fn default_level(verbosity: u8) -> &'static str
{
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
