pub mod blocks;
pub mod breaker;
pub mod checkout;
pub mod dash;
pub mod defense;
pub mod flappy;
pub mod hero;
pub mod invaders;
pub mod pong;
pub mod revenue;
pub mod snake;
pub mod sweeper;
pub mod tokens;
pub mod whacker;
pub mod wordle;

use crate::engine::Game;
use crate::scores::Ranking;

pub struct GameDescriptor
{
    /// Key used on the command line and in `scores.json`.
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub ranking: Ranking,
    /// Letter keys go to the game, so pause and restart need Ctrl.
    pub text_input: bool,
    pub build: fn(u64) -> Box<dyn Game>,
}

const fn arcade(
    name: &'static str,
    title: &'static str,
    description: &'static str,
    build: fn(u64) -> Box<dyn Game>,
) -> GameDescriptor
{
    GameDescriptor {
        name,
        title,
        description,
        ranking: Ranking::HigherIsBetter,
        text_input: false,
        build,
    }
}

static GAMES: [GameDescriptor; 15] = [
    GameDescriptor {
        name: "wordle",
        title: "API Wordle",
        description: "Guess the five-letter payments word in six tries",
        ranking: Ranking::HigherIsBetter,
        text_input: true,
        build: wordle::build,
    },
    arcade("snake", "Fraud-block Snake", "Eat transactions, dodge fraud blocks", snake::build),
    arcade("revenue", "Revenue 2048", "Merge revenue tiles all the way to a $1B exit", revenue::build),
    GameDescriptor {
        name: "sweeper",
        title: "Fraud Sweeper",
        description: "Flag every fraud cell, fastest clear wins",
        ranking: Ranking::LowerIsBetter,
        text_input: false,
        build: sweeper::build,
    },
    arcade("breaker", "Firewall Breaker", "Break the firewall with 2FA balls", breaker::build),
    arcade("blocks", "Ledger Blocks", "Stack ledger entries and clear rows", blocks::build),
    arcade("tokens", "Token Match", "Find the matching payment token pairs", tokens::build),
    arcade("whacker", "Fraud Whacker", "Block fraudsters before they slip through", whacker::build),
    arcade("pong", "Dodo Pong", "First to eleven against the processor", pong::build),
    arcade("flappy", "Dodo Flappy", "Flap the dodo through the pipes", flappy::build),
    arcade("dash", "Dodo Dash", "Jump and duck past the obstacles", dash::build),
    arcade("checkout", "Checkout Rush", "Serve customers with the right payment method", checkout::build),
    arcade("hero", "Merchant Hero", "Shoot down fraud and keep revenue flowing", hero::build),
    arcade("defense", "Gateway Defender", "Hold the gateway against bot traffic", defense::build),
    arcade("invaders", "Payment Invaders", "Defend the gateway from waves of threats", invaders::build),
];

/// All games in menu order.
pub fn registry() -> &'static [GameDescriptor]
{
    &GAMES
}

pub fn find(name: &str) -> Option<&'static GameDescriptor>
{
    GAMES.iter().find(|game| game.name.eq_ignore_ascii_case(name))
}
