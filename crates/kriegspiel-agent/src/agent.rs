//! Random-try decision logic

use kriegspiel_core::{
    DecisionBudget, GameDescriptor, Move, Result, SUPPORTED_PLAYER_COUNT, Seats, split_transport,
};
use rand::rngs::StdRng;
use rand::seq::{IteratorRandom, SliceRandom};
use rand::SeedableRng;
use tracing::debug;

/// Referee answer to a try that is impossible on the real board
pub const ILLEGAL_MOVE: &str = "Illegal move";

/// Description of a promotion try
pub const PROMOTE: &str = "Promote";

/// Everything the agent sees for one decision
#[derive(Debug, Clone)]
pub struct Position<'a> {
    /// Pseudo-legal tries; the referee knows which are really legal
    pub moves: &'a [Move],
    /// Legal pawn captures available to us this turn
    pub pawn_tries: i32,
    /// Pawn captures available to the opponent after our last legal move
    pub opponent_tries: i32,
    /// Referee messages about our tries, most recent last
    pub own_message: &'a str,
    /// Referee messages announced after the opponent's move
    pub referee_message: &'a str,
    pub budget: DecisionBudget,
}

/// Agent choosing uniformly among pseudo-legal tries
#[derive(Debug)]
pub struct RandomAgent {
    seats: Seats,
    rng: StdRng,
    last_try: Option<Move>,
    decisions: u64,
}

impl RandomAgent {
    /// Agent for seat `player`; `seed` fixes the move sequence
    pub fn new(player: u32, seed: Option<u64>) -> Result<Self> {
        let seats = Seats::assign(player, SUPPORTED_PLAYER_COUNT)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(u64::from(player))),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            seats,
            rng,
            last_try: None,
            decisions: 0,
        })
    }

    pub fn supports(game: &GameDescriptor) -> bool {
        game.is_kriegspiel_family() && game.num_players == SUPPORTED_PLAYER_COUNT
    }

    pub fn seats(&self) -> Seats {
        self.seats
    }

    /// Whether we play the white pieces
    pub fn plays_white(&self) -> bool {
        self.seats.player.get() == 1
    }

    pub fn decisions(&self) -> u64 {
        self.decisions
    }

    /// Pick the index of the next try, or `None` when nothing is offered
    pub fn select(&mut self, position: &Position<'_>) -> Option<usize> {
        if position.moves.is_empty() {
            return None;
        }

        let own_notes = split_transport(position.own_message);
        let rejected = own_notes.last().is_some_and(|note| note == ILLEGAL_MOVE);
        let chosen = if rejected {
            // Our previous try was impossible on the referee's board
            self.retry_after_illegal(position.moves)
        } else if position.moves[0].description == PROMOTE {
            // Only promotion tries are offered; pick a piece at random
            let promotions = position
                .moves
                .iter()
                .enumerate()
                .filter(|(_, mv)| mv.description == PROMOTE)
                .map(|(i, _)| i);
            promotions.choose(&mut self.rng)
        } else {
            debug!(
                "{} seat {} to move: pawn tries {}, opponent tries {}, referee \"{}\", budget {:?}",
                if self.plays_white() { "White" } else { "Black" },
                self.seats.player,
                position.pawn_tries,
                position.opponent_tries,
                position.referee_message,
                position.budget
            );
            self.any(position.moves)
        };

        if let Some(index) = chosen {
            self.last_try = Some(position.moves[index].clone());
            self.decisions += 1;
        }
        chosen
    }

    fn retry_after_illegal(&mut self, moves: &[Move]) -> Option<usize> {
        let Some(rejected) = &self.last_try else {
            return self.any(moves);
        };
        let fresh: Vec<usize> = moves
            .iter()
            .enumerate()
            .filter(|(_, mv)| *mv != rejected)
            .map(|(i, _)| i)
            .collect();
        match fresh.choose(&mut self.rng) {
            Some(&index) => Some(index),
            None => self.any(moves),
        }
    }

    fn any(&mut self, moves: &[Move]) -> Option<usize> {
        (0..moves.len()).collect::<Vec<_>>().choose(&mut self.rng).copied()
    }
}
