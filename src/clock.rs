//! Per-game clock state for the timed search modes.
//!
//! The clock is a plain value updated between moves; it never measures time
//! itself. For Fischer controls the elapsed time is subtracted before the
//! flag check and the increment is only added to a side that survived it,
//! so increments never apply before a side's first move.

use crate::board::Side;
use crate::settings::SearchSettings;

#[derive(Debug, Clone)]
pub struct GameClock {
    settings: SearchSettings,
    timeout_buffer_ms: u64,
}

impl GameClock {
    pub fn new(settings: SearchSettings, timeout_buffer_ms: u64) -> GameClock {
        GameClock {
            settings,
            timeout_buffer_ms,
        }
    }

    /// Current limits, as they should be sent with the next `go`.
    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Wall-clock allowance for the side to move, if this mode has one.
    /// The driver hands this to the session watchdog.
    pub fn budget_ms(&self, side: Side) -> Option<u64> {
        match self.settings {
            SearchSettings::Movetime { ms } => Some(ms + self.timeout_buffer_ms),
            SearchSettings::Time { btime, wtime, .. } => {
                let remaining = match side {
                    Side::Black => btime,
                    Side::White => wtime,
                };
                Some(remaining.max(0) as u64 + self.timeout_buffer_ms)
            }
            _ => None,
        }
    }

    /// Books `elapsed_ms` against the side that just moved. Returns the
    /// flagged side if it ran out of time.
    pub fn after_move(&mut self, mover: Side, elapsed_ms: u64) -> Option<Side> {
        match &mut self.settings {
            SearchSettings::Movetime { ms } => {
                if elapsed_ms > *ms + self.timeout_buffer_ms {
                    Some(mover)
                } else {
                    None
                }
            }
            SearchSettings::Time {
                btime,
                wtime,
                binc,
                winc,
            } => {
                let (remaining, increment) = match mover {
                    Side::Black => (btime, binc),
                    Side::White => (wtime, winc),
                };
                *remaining -= elapsed_ms as i64;
                if *remaining <= 0 {
                    return Some(mover);
                }
                *remaining += *increment;
                None
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fischer(btime: i64, wtime: i64, binc: i64, winc: i64) -> SearchSettings {
        SearchSettings::Time {
            btime,
            wtime,
            binc,
            winc,
        }
    }

    #[test]
    fn movetime_flags_past_buffer() {
        let mut clock = GameClock::new(SearchSettings::Movetime { ms: 100 }, 50);
        assert_eq!(clock.after_move(Side::Black, 100), None);
        assert_eq!(clock.after_move(Side::Black, 150), None);
        assert_eq!(clock.after_move(Side::Black, 151), Some(Side::Black));
        // A larger buffer forgives the same overshoot.
        let mut lenient = GameClock::new(SearchSettings::Movetime { ms: 100 }, 200);
        assert_eq!(lenient.after_move(Side::Black, 200), None);
    }

    #[test]
    fn fischer_exhaustion() {
        // 400 + 400 + 300 ms against a 1000 ms budget with no increment.
        let mut clock = GameClock::new(fischer(1000, 1000, 0, 0), 0);
        assert_eq!(clock.after_move(Side::Black, 400), None);
        assert_eq!(clock.after_move(Side::White, 100), None);
        assert_eq!(clock.after_move(Side::Black, 400), None);
        assert_eq!(clock.after_move(Side::White, 100), None);
        assert_eq!(clock.after_move(Side::Black, 300), Some(Side::Black));
    }

    #[test]
    fn fischer_increment_after_surviving() {
        let mut clock = GameClock::new(fischer(500, 500, 250, 0), 0);
        assert_eq!(clock.after_move(Side::Black, 400), None);
        // 500 - 400 + 250 = 350 left; another 300 survives again.
        assert_eq!(clock.after_move(Side::Black, 300), None);
        match clock.settings() {
            SearchSettings::Time { btime, .. } => assert_eq!(*btime, 300),
            other => panic!("unexpected settings {:?}", other),
        }
    }

    #[test]
    fn fischer_no_increment_for_flagged_side() {
        let mut clock = GameClock::new(fischer(100, 100, 1000, 1000), 0);
        assert_eq!(clock.after_move(Side::White, 100), Some(Side::White));
        match clock.settings() {
            SearchSettings::Time { wtime, .. } => assert_eq!(*wtime, 0),
            other => panic!("unexpected settings {:?}", other),
        }
    }

    #[test]
    fn untimed_modes_never_flag() {
        let mut depth = GameClock::new(SearchSettings::Depth { plies: 5 }, 0);
        assert_eq!(depth.after_move(Side::Black, u64::MAX / 2), None);
        assert_eq!(depth.budget_ms(Side::Black), None);

        let mut infinite = GameClock::new(SearchSettings::Infinite, 0);
        assert_eq!(infinite.after_move(Side::White, 10_000), None);
    }

    #[test]
    fn budget_tracks_remaining_time() {
        let clock = GameClock::new(fischer(750, 250, 0, 0), 25);
        assert_eq!(clock.budget_ms(Side::Black), Some(775));
        assert_eq!(clock.budget_ms(Side::White), Some(275));

        let movetime = GameClock::new(SearchSettings::Movetime { ms: 100 }, 50);
        assert_eq!(movetime.budget_ms(Side::Black), Some(150));
    }
}
