use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::scores::ScoreError;

pub type ArcadeResult<T> = Result<T, ArcadeError>;

#[derive(Debug, Error)]
pub enum ArcadeError
{
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scores(#[from] ScoreError),

    /// Raw mode, alternate screen or event polling failed.
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),

    #[error("failed to start logger: {0}")]
    Logger(String),

    #[error("unknown game '{0}'. Run `dodo-arcade list` to see the catalogue.")]
    UnknownGame(String),

    #[error("invalid selection '{0}'")]
    InvalidSelection(String),
}
