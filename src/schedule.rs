//! Deterministic round-robin scheduling.
//!
//! The generator is an infinite stream of game assignments: every unordered
//! player pair in lexicographic order, `num_games` games per pair, openings
//! spread evenly over those games. With `repeat` enabled games come in
//! colour-swapped couples sharing an opening, to cancel first-move bias.
//! After a full cycle the schedule starts over while `game_id` keeps
//! counting up, so each emitted assignment is a pure function of its index.

/// One scheduled game: which opening to use and who plays which colour
/// (`player1` is Black, `player2` is White).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameInfo {
    pub game_id: u64,
    pub opening: usize,
    pub player1: usize,
    pub player2: usize,
}

#[derive(Debug, Clone)]
pub struct RoundRobinGenerator {
    num_players: usize,
    num_games: u64,
    num_openings: usize,
    repeat: bool,
    game_id: u64,
}

impl RoundRobinGenerator {
    pub fn new(
        num_players: usize,
        num_games: u64,
        num_openings: usize,
        repeat: bool,
    ) -> RoundRobinGenerator {
        assert!(num_players >= 2, "a round robin needs at least 2 players");
        assert!(num_games >= 1);
        assert!(num_openings >= 1);
        RoundRobinGenerator {
            num_players,
            num_games,
            num_openings,
            repeat,
            game_id: 0,
        }
    }

    fn num_pairs(&self) -> u64 {
        let n = self.num_players as u64;
        n * (n - 1) / 2
    }

    /// Number of games in one full cycle of the schedule.
    pub fn expected(&self) -> u64 {
        self.num_pairs() * self.num_games
    }

    /// The `pair_idx`-th pair `(i, j)` with `i < j` in lexicographic order.
    fn pair(&self, mut pair_idx: u64) -> (usize, usize) {
        for i in 0..self.num_players - 1 {
            let span = (self.num_players - 1 - i) as u64;
            if pair_idx < span {
                return (i, i + 1 + pair_idx as usize);
            }
            pair_idx -= span;
        }
        unreachable!("pair index out of range");
    }

    /// Spreads `slots` opening slots over the configured pool.
    fn opening_for(&self, slot: u64, slots: u64) -> usize {
        let openings = self.num_openings as u64;
        let opening = if slots >= openings {
            slot * openings / slots
        } else {
            slot
        };
        opening.min(openings - 1) as usize
    }

    pub fn next_game(&mut self) -> GameInfo {
        let idx = self.game_id % self.expected();
        let pair_idx = idx / self.num_games;
        let game_idx = idx % self.num_games;
        let (i, j) = self.pair(pair_idx);

        let (opening, swap) = if self.repeat {
            // Games come in couples: the odd game replays the even game's
            // opening with the colours exchanged.
            let slots = (self.num_games / 2).max(1);
            (self.opening_for(game_idx / 2, slots), game_idx % 2 == 1)
        } else {
            (self.opening_for(game_idx, self.num_games), false)
        };

        let (player1, player2) = if swap { (j, i) } else { (i, j) };
        let info = GameInfo {
            game_id: self.game_id,
            opening,
            player1,
            player2,
        };
        self.game_id += 1;
        info
    }
}

impl Iterator for RoundRobinGenerator {
    type Item = GameInfo;

    fn next(&mut self) -> Option<GameInfo> {
        Some(self.next_game())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(game_id: u64, opening: usize, player1: usize, player2: usize) -> GameInfo {
        GameInfo {
            game_id,
            opening,
            player1,
            player2,
        }
    }

    #[test]
    fn two_players_repeat_cycles() {
        let mut gen = RoundRobinGenerator::new(2, 2, 2, true);
        assert_eq!(gen.expected(), 2);

        assert_eq!(gen.next_game(), info(0, 0, 0, 1));
        assert_eq!(gen.next_game(), info(1, 0, 1, 0));

        // The cycle restarts but the id keeps counting.
        assert_eq!(gen.next_game(), info(2, 0, 0, 1));
        assert_eq!(gen.next_game(), info(3, 0, 1, 0));
        assert_eq!(gen.next_game(), info(4, 0, 0, 1));
        assert_eq!(gen.next_game(), info(5, 0, 1, 0));
    }

    #[test]
    fn repeat_pairs_share_openings() {
        let mut gen = RoundRobinGenerator::new(2, 4, 2, true);
        assert_eq!(gen.expected(), 4);

        assert_eq!(gen.next_game(), info(0, 0, 0, 1));
        assert_eq!(gen.next_game(), info(1, 0, 1, 0));
        assert_eq!(gen.next_game(), info(2, 1, 0, 1));
        assert_eq!(gen.next_game(), info(3, 1, 1, 0));

        assert_eq!(gen.next_game(), info(4, 0, 0, 1));
        assert_eq!(gen.next_game(), info(5, 0, 1, 0));
        assert_eq!(gen.next_game(), info(6, 1, 0, 1));
        assert_eq!(gen.next_game(), info(7, 1, 1, 0));
    }

    #[test]
    fn four_players_enumerate_pairs_lexicographically() {
        let mut gen = RoundRobinGenerator::new(4, 2, 2, true);
        assert_eq!(gen.expected(), 12);

        assert_eq!(gen.next_game(), info(0, 0, 0, 1));
        assert_eq!(gen.next_game(), info(1, 0, 1, 0));
        assert_eq!(gen.next_game(), info(2, 0, 0, 2));
        assert_eq!(gen.next_game(), info(3, 0, 2, 0));
        assert_eq!(gen.next_game(), info(4, 0, 0, 3));
        assert_eq!(gen.next_game(), info(5, 0, 3, 0));

        assert_eq!(gen.next_game(), info(6, 0, 1, 2));
        assert_eq!(gen.next_game(), info(7, 0, 2, 1));
        assert_eq!(gen.next_game(), info(8, 0, 1, 3));
        assert_eq!(gen.next_game(), info(9, 0, 3, 1));

        assert_eq!(gen.next_game(), info(10, 0, 2, 3));
        assert_eq!(gen.next_game(), info(11, 0, 3, 2));

        assert_eq!(gen.next_game(), info(12, 0, 0, 1));
        assert_eq!(gen.next_game(), info(13, 0, 1, 0));
    }

    #[test]
    fn no_repeat_walks_openings_without_swapping() {
        let mut gen = RoundRobinGenerator::new(2, 2, 2, false);
        assert_eq!(gen.expected(), 2);

        assert_eq!(gen.next_game(), info(0, 0, 0, 1));
        assert_eq!(gen.next_game(), info(1, 1, 0, 1));

        assert_eq!(gen.next_game(), info(2, 0, 0, 1));
        assert_eq!(gen.next_game(), info(3, 1, 0, 1));
        assert_eq!(gen.next_game(), info(4, 0, 0, 1));
        assert_eq!(gen.next_game(), info(5, 1, 0, 1));
    }

    #[test]
    fn more_openings_than_slots_clamps() {
        let mut gen = RoundRobinGenerator::new(2, 2, 8, false);
        assert_eq!(gen.next_game().opening, 0);
        assert_eq!(gen.next_game().opening, 1);

        // Single game per pair, openings beyond index 0 are never reached.
        let mut single = RoundRobinGenerator::new(2, 1, 3, false);
        assert_eq!(single.next_game().opening, 0);
        assert_eq!(single.next_game().opening, 0);
    }

    #[test]
    fn sequence_is_a_pure_function_of_index() {
        let a: Vec<GameInfo> = RoundRobinGenerator::new(5, 6, 3, true).take(90).collect();
        let b: Vec<GameInfo> = RoundRobinGenerator::new(5, 6, 3, true).take(90).collect();
        assert_eq!(a, b);
        assert!(a.iter().enumerate().all(|(i, g)| g.game_id == i as u64));
    }
}
