//! A random computer opponent for single-player matches.
//!
//! The bot owns its rng so a seeded instance replays identically; it
//! places a generated fleet and fires at uniformly random legal cells.

use crate::board::Coord;
use crate::fleet::{self, Ship};
use crate::game::{GameError, Match, SideId};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub struct Bot {
    rng: StdRng,
}

impl Bot {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic bot for tests and replays.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Produce the bot's fleet layout.
    pub fn place_fleet(&mut self) -> Result<Vec<Ship>, GameError> {
        fleet::generate_fleet(&mut self.rng)
    }

    /// Choose the bot's next shot in `game`, playing as `side`.
    pub fn choose_target(&mut self, game: &Match, side: SideId) -> Result<Coord, GameError> {
        game.random_target(side, &mut self.rng)
    }
}

impl Default for Bot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MatchId;

    #[test]
    fn test_seeded_bot_is_deterministic() {
        let fleet_a = Bot::with_seed(42).place_fleet().unwrap();
        let fleet_b = Bot::with_seed(42).place_fleet().unwrap();
        assert_eq!(fleet_a, fleet_b);
    }

    #[test]
    fn test_bot_plays_a_full_game() {
        let mut bot = Bot::with_seed(99);
        let (bot_side, human) = (SideId::new(), SideId::new());
        let mut game = Match::new(MatchId::new(), bot_side, human);

        game.submit_fleet(bot_side, bot.place_fleet().unwrap()).unwrap();
        game.submit_fleet(human, bot.place_fleet().unwrap()).unwrap();

        // Let the bot fire for both sides until someone wins
        let mut shots = 0;
        while !game.is_finished() {
            let side = game.turn();
            let target = bot.choose_target(&game, side).unwrap();
            game.attack(side, target).unwrap();
            shots += 1;
            assert!(shots <= 200, "game did not converge");
        }
        assert!(game.winner().is_some());
    }
}
