use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::Outcome;

const FILE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ScoreError
{
    #[error("failed to access score file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to encode scores: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which direction of score is the better one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ranking
{
    HigherIsBetter,
    /// Times, where the fastest round wins.
    LowerIsBetter,
}

impl Ranking
{
    pub fn beats(self, score: i64, best: i64) -> bool
    {
        match self {
            Ranking::HigherIsBetter => score > best,
            Ranking::LowerIsBetter => score < best,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreRecord
{
    pub best: Option<i64>,
    pub last: Option<i64>,
    pub played: u32,
    pub wins: u32,
}

impl ScoreRecord
{
    /// Whole percentage of rounds won, 0 before the first round.
    pub fn win_rate(&self) -> u32
    {
        if self.played == 0 {
            return 0;
        }
        ((self.wins as f64 / self.played as f64) * 100.0).round() as u32
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ScoreFile
{
    version: u32,
    #[serde(default)]
    games: BTreeMap<String, ScoreRecord>,
}

impl Default for ScoreFile
{
    fn default() -> Self
    {
        Self {
            version: FILE_VERSION,
            games: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recorded
{
    pub new_best: bool,
    pub previous_best: Option<i64>,
}

/// Per-game scores kept in one JSON file.
pub struct ScoreBook
{
    path: PathBuf,
    file: ScoreFile,
}

impl ScoreBook
{
    /// Opens the book at `path`. A missing file gives an empty book, and so
    /// does a file that no longer parses, after a warning in the log.
    pub fn open<P>(path: P) -> Result<Self, ScoreError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref().to_path_buf();
        let file = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<ScoreFile>(&raw) {
                Ok(file) => file,
                Err(err) => {
                    log::warn!("ignoring unreadable score file {}: {err}", path.display());
                    ScoreFile::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => ScoreFile::default(),
            Err(source) => return Err(ScoreError::Io { path, source }),
        };

        Ok(Self { path, file })
    }

    pub fn get(&self, game: &str) -> Option<&ScoreRecord>
    {
        self.file.games.get(game)
    }

    pub fn record(&mut self, game: &str, ranking: Ranking, outcome: &Outcome) -> Recorded
    {
        let record = self.file.games.entry(game.to_string()).or_default();
        let previous_best = record.best;
        record.played += 1;
        if outcome.won {
            record.wins += 1;
        }

        let mut new_best = false;
        if let Some(score) = outcome.score {
            record.last = Some(score);
            new_best = match previous_best {
                Some(best) => ranking.beats(score, best),
                None => true,
            };
            if new_best {
                record.best = Some(score);
            }
        }

        Recorded {
            new_best,
            previous_best,
        }
    }

    /// Forgets one game, or every game. Returns whether anything was removed.
    pub fn reset(&mut self, game: Option<&str>) -> bool
    {
        match game {
            Some(name) => self.file.games.remove(name).is_some(),
            None => {
                let had_any = !self.file.games.is_empty();
                self.file.games.clear();
                had_any
            }
        }
    }

    /// Writes the book through a temporary file so a crash never leaves a
    /// half-written score file behind.
    pub fn save(&self) -> Result<(), ScoreError>
    {
        let io_err = |source| ScoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let raw = serde_json::to_string_pretty(&self.file)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        log::debug!("scores saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn outcome(score: Option<i64>, won: bool) -> Outcome
    {
        Outcome::new(score, won)
    }

    #[test]
    fn missing_file_is_empty()
    {
        let dir = tempfile::tempdir().unwrap();
        let book = ScoreBook::open(dir.path().join("scores.json")).unwrap();
        assert!(book.get("snake").is_none());
    }

    #[test]
    fn corrupt_file_starts_empty()
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        fs::write(&path, "{ not json").unwrap();
        let book = ScoreBook::open(&path).unwrap();
        assert!(book.get("snake").is_none());
    }

    #[test]
    fn best_follows_ranking()
    {
        let dir = tempfile::tempdir().unwrap();
        let mut book = ScoreBook::open(dir.path().join("scores.json")).unwrap();

        let first = book.record("snake", Ranking::HigherIsBetter, &outcome(Some(300), false));
        assert!(first.new_best);
        assert_eq!(first.previous_best, None);
        let worse = book.record("snake", Ranking::HigherIsBetter, &outcome(Some(100), false));
        assert!(!worse.new_best);
        assert_eq!(book.get("snake").unwrap().best, Some(300));
        assert_eq!(book.get("snake").unwrap().last, Some(100));

        book.record("sweeper", Ranking::LowerIsBetter, &outcome(Some(40), true));
        let faster = book.record("sweeper", Ranking::LowerIsBetter, &outcome(Some(25), true));
        assert!(faster.new_best);
        assert_eq!(faster.previous_best, Some(40));
    }

    #[test]
    fn unscored_rounds_count_but_never_set_best()
    {
        let dir = tempfile::tempdir().unwrap();
        let mut book = ScoreBook::open(dir.path().join("scores.json")).unwrap();
        let result = book.record("sweeper", Ranking::LowerIsBetter, &outcome(None, false));
        assert!(!result.new_best);
        let record = book.get("sweeper").unwrap();
        assert_eq!(record.played, 1);
        assert_eq!(record.wins, 0);
        assert_eq!(record.best, None);
    }

    #[test]
    fn save_and_reopen()
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scores.json");
        let mut book = ScoreBook::open(&path).unwrap();
        book.record("wordle", Ranking::HigherIsBetter, &outcome(Some(4), true));
        book.record("wordle", Ranking::HigherIsBetter, &outcome(Some(0), false));
        book.save().unwrap();

        let reopened = ScoreBook::open(&path).unwrap();
        let record = reopened.get("wordle").unwrap();
        assert_eq!(record.best, Some(4));
        assert_eq!(record.played, 2);
        assert_eq!(record.win_rate(), 50);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn reset_one_or_all()
    {
        let dir = tempfile::tempdir().unwrap();
        let mut book = ScoreBook::open(dir.path().join("scores.json")).unwrap();
        book.record("snake", Ranking::HigherIsBetter, &outcome(Some(1), false));
        book.record("pong", Ranking::HigherIsBetter, &outcome(Some(2), false));
        assert!(book.reset(Some("snake")));
        assert!(!book.reset(Some("snake")));
        assert!(book.get("pong").is_some());
        assert!(book.reset(None));
        assert!(!book.reset(None));
    }

    #[test]
    fn win_rate_rounds()
    {
        let record = ScoreRecord {
            played: 3,
            wins: 2,
            ..ScoreRecord::default()
        };
        assert_eq!(record.win_rate(), 67);
        assert_eq!(ScoreRecord::default().win_rate(), 0);
    }
}
