/// Gameplay milestones worth reporting. Games push `PowerUp` and
/// `WaveComplete` themselves; the engine emits the rest.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent
{
    GameStart {
        game: &'static str,
    },
    GameOver {
        game: &'static str,
        score: Option<i64>,
        extra: Vec<(&'static str, i64)>,
    },
    NewHighScore {
        game: &'static str,
        score: i64,
    },
    PowerUp {
        game: &'static str,
        power_up: &'static str,
    },
    WaveComplete {
        game: &'static str,
        wave: u32,
    },
}

impl GameEvent
{
    pub fn name(&self) -> &'static str
    {
        match self {
            GameEvent::GameStart { .. } => "game_start",
            GameEvent::GameOver { .. } => "game_over",
            GameEvent::NewHighScore { .. } => "new_high_score",
            GameEvent::PowerUp { .. } => "power_up_used",
            GameEvent::WaveComplete { .. } => "wave_complete",
        }
    }
}

pub trait EventSink
{
    fn emit(&mut self, event: GameEvent);
}

/// Writes events to the `analytics` log target.
pub struct LogSink;

impl EventSink for LogSink
{
    fn emit(&mut self, event: GameEvent)
    {
        match &event {
            GameEvent::GameStart { game } => {
                log::info!(target: "analytics", "{} game={game}", event.name());
            }
            GameEvent::GameOver { game, score, extra } => {
                let extra: Vec<String> = extra.iter().map(|(k, v)| format!("{k}={v}")).collect();
                log::info!(
                    target: "analytics",
                    "{} game={game} score={} {}",
                    event.name(),
                    score.map_or_else(|| "-".to_string(), |s| s.to_string()),
                    extra.join(" ")
                );
            }
            GameEvent::NewHighScore { game, score } => {
                log::info!(target: "analytics", "{} game={game} score={score}", event.name());
            }
            GameEvent::PowerUp { game, power_up } => {
                log::info!(target: "analytics", "{} game={game} power_up={power_up}", event.name());
            }
            GameEvent::WaveComplete { game, wave } => {
                log::info!(target: "analytics", "{} game={game} wave={wave}", event.name());
            }
        }
    }
}

/// Drops everything; used when analytics are switched off.
pub struct NullSink;

impl EventSink for NullSink
{
    fn emit(&mut self, _event: GameEvent) {}
}

#[cfg(test)]
pub mod testing
{
    use super::*;

    #[derive(Default)]
    pub struct Recorder
    {
        pub events: Vec<GameEvent>,
    }

    impl EventSink for Recorder
    {
        fn emit(&mut self, event: GameEvent)
        {
            self.events.push(event);
        }
    }
}
