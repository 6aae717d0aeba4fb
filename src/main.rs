mod analytics;
mod config;
mod engine;
mod error;
mod games;
mod geom;
mod input;
mod logging;
mod scores;
mod screen;
mod words;

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::analytics::{EventSink, LogSink, NullSink};
use crate::config::Config;
use crate::engine::Session;
use crate::error::{ArcadeError, ArcadeResult};
use crate::games::GameDescriptor;
use crate::scores::ScoreBook;

#[derive(Debug, Parser)]
#[command(name = "dodo-arcade", version, about = "Payment-themed arcade games for the terminal")]
struct Cli
{
    /// Config file to use instead of the per-user one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for scores and the log file.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// More log detail (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command
{
    /// List the available games.
    List,
    /// Play one game.
    Play {
        game: String,
        /// Fixed RNG seed for every round.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show best scores and win rates.
    Scores,
    /// Forget the scores of one game, or of all games.
    ResetScores {
        game: Option<String>,
    },
}

fn main()
{
    if let Err(err) = run(Cli::parse()) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> ArcadeResult<()>
{
    // listing games never touches the data dir
    if let Some(Command::List) = cli.command {
        list_games();
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(Command::Play { seed: Some(seed), .. }) = &cli.command {
        config.seed = Some(*seed);
    }
    if let Some(Command::Scores) = cli.command {
        print_scores(&ScoreBook::open(config.scores_path())?);
        return Ok(());
    }

    logging::init(&config.log_path(), cli.verbose)?;
    log::debug!("config: {config:?}");

    let mut book = ScoreBook::open(config.scores_path())?;
    match cli.command {
        None => interactive_menu(&config, &mut book),
        Some(Command::Play { game, .. }) => {
            let descriptor = games::find(&game).ok_or(ArcadeError::UnknownGame(game))?;
            run_game(&config, &mut book, descriptor)
        }
        Some(Command::ResetScores { game }) => reset_scores(&mut book, game.as_deref()),
        Some(Command::List | Command::Scores) => Ok(()),
    }
}

fn run_game(config: &Config, book: &mut ScoreBook, descriptor: &GameDescriptor) -> ArcadeResult<()>
{
    let mut log_sink = LogSink;
    let mut null_sink = NullSink;
    let sink: &mut dyn EventSink = if config.analytics {
        &mut log_sink
    } else {
        &mut null_sink
    };

    let mut session = Session {
        frame: Duration::from_millis(config.display.frame_ms),
        hold_ticks: config.input.hold_frames,
        seed: config.seed,
        scores: book,
        sink,
    };
    session.play(descriptor)
}

fn interactive_menu(config: &Config, book: &mut ScoreBook) -> ArcadeResult<()>
{
    let registry = games::registry();
    println!("Dodo Arcade");
    println!();
    println!("Select a game:");
    for (idx, game) in registry.iter().enumerate() {
        println!("  {:>2}. {:<18} {}", idx + 1, game.title, game.description);
    }
    println!();
    print!("Enter number or name (default 1, q to quit): ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    match choose(registry, input.trim())? {
        Some(descriptor) => run_game(config, book, descriptor),
        None => Ok(()),
    }
}

/// Resolves a menu answer. `None` means the player chose to quit.
fn choose<'a>(registry: &'a [GameDescriptor], choice: &str) -> ArcadeResult<Option<&'a GameDescriptor>>
{
    if choice.is_empty() {
        return Ok(registry.first());
    }
    if choice.eq_ignore_ascii_case("q") {
        return Ok(None);
    }
    if let Ok(index) = choice.parse::<usize>() {
        if index >= 1 && index <= registry.len() {
            return Ok(Some(&registry[index - 1]));
        }
    }
    registry
        .iter()
        .find(|game| game.name.eq_ignore_ascii_case(choice))
        .map(Some)
        .ok_or_else(|| ArcadeError::InvalidSelection(choice.to_string()))
}

fn list_games()
{
    println!("Available games:");
    for game in games::registry() {
        println!("  {:<10} - {}: {}", game.name, game.title, game.description);
    }
}

fn print_scores(book: &ScoreBook)
{
    println!("{:<10} {:>8} {:>8} {:>7} {:>5}", "game", "best", "last", "played", "won");
    for game in games::registry() {
        let Some(record) = book.get(game.name) else {
            println!("{:<10} {:>8} {:>8} {:>7} {:>5}", game.name, "-", "-", 0, "-");
            continue;
        };
        let show = |value: Option<i64>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
        println!(
            "{:<10} {:>8} {:>8} {:>7} {:>4}%",
            game.name,
            show(record.best),
            show(record.last),
            record.played,
            record.win_rate()
        );
    }
}

fn reset_scores(book: &mut ScoreBook, game: Option<&str>) -> ArcadeResult<()>
{
    if let Some(name) = game {
        if games::find(name).is_none() {
            return Err(ArcadeError::UnknownGame(name.to_string()));
        }
    }
    let key = game.map(str::to_ascii_lowercase);
    if book.reset(key.as_deref()) {
        book.save()?;
        log::info!("scores reset: {}", key.as_deref().unwrap_or("all games"));
        println!("Scores reset.");
    } else {
        println!("Nothing to reset.");
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn menu_accepts_numbers_names_and_default()
    {
        let registry = games::registry();
        assert_eq!(choose(registry, "").unwrap().unwrap().name, "wordle");
        assert_eq!(choose(registry, "2").unwrap().unwrap().name, "snake");
        assert_eq!(choose(registry, "Pong").unwrap().unwrap().name, "pong");
        assert!(choose(registry, "Q").unwrap().is_none());
    }

    #[test]
    fn menu_rejects_unknown_choices()
    {
        let registry = games::registry();
        for bad in ["0", "99", "tetris"] {
            assert!(matches!(choose(registry, bad), Err(ArcadeError::InvalidSelection(_))));
        }
    }

    #[test]
    fn cli_parses_play_with_seed()
    {
        let cli = Cli::try_parse_from(["dodo-arcade", "-vv", "play", "snake", "--seed", "7"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Command::Play { game, seed }) => {
                assert_eq!(game, "snake");
                assert_eq!(seed, Some(7));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn list_works_without_a_usable_data_dir()
    {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let data_dir = blocker.join("arcade");
        let cli = Cli::try_parse_from(["dodo-arcade", "--data-dir", data_dir.to_str().unwrap(), "list"]).unwrap();
        assert!(run(cli).is_ok());
        assert!(!data_dir.exists());
    }

    #[test]
    fn reset_rejects_unknown_game()
    {
        let dir = tempfile::tempdir().unwrap();
        let mut book = ScoreBook::open(dir.path().join("scores.json")).unwrap();
        let err = reset_scores(&mut book, Some("tetris")).unwrap_err();
        assert!(matches!(err, ArcadeError::UnknownGame(_)));
        assert!(reset_scores(&mut book, None).is_ok());
    }
}
