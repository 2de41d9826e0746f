//! Cumulative tournament standings.
//!
//! `Results` is owned by the coordinator and only mutated under its lock,
//! so the totals after N games are the plain multiset sum of those games'
//! outcomes regardless of which worker finished when.

use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use crate::board::GameResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineScore {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl EngineScore {
    pub fn played(&self) -> u32 {
        self.wins + self.losses + self.draws
    }

    pub fn points(&self) -> f64 {
        self.wins as f64 + self.draws as f64 * 0.5
    }
}

/// Head-to-head tally for the pair `(a, b)` with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairScore {
    pub a: usize,
    pub b: usize,
    pub a_wins: u32,
    pub b_wins: u32,
    pub draws: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Results {
    names: Vec<String>,
    scores: Vec<EngineScore>,
    pairs: Vec<PairScore>,
    games: u32,
}

impl Results {
    pub fn new(names: Vec<String>) -> Results {
        let scores = vec![EngineScore::default(); names.len()];
        let pairs = (0..names.len())
            .tuple_combinations()
            .map(|(a, b)| PairScore {
                a,
                b,
                a_wins: 0,
                b_wins: 0,
                draws: 0,
            })
            .collect();
        Results {
            names,
            scores,
            pairs,
            games: 0,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn score(&self, engine: usize) -> &EngineScore {
        &self.scores[engine]
    }

    pub fn pair(&self, a: usize, b: usize) -> Option<&PairScore> {
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        self.pairs.iter().find(|p| p.a == a && p.b == b)
    }

    pub fn games_played(&self) -> u32 {
        self.games
    }

    /// Folds one finished game into the standings. `black` and `white` are
    /// engine indices; `black` moved first.
    pub fn add_game(&mut self, black: usize, white: usize, result: GameResult) {
        let (winner, loser) = match result {
            GameResult::BlackWin => (Some(black), Some(white)),
            GameResult::WhiteWin => (Some(white), Some(black)),
            GameResult::Draw | GameResult::None => (None, None),
        };

        match (winner, loser) {
            (Some(w), Some(l)) => {
                self.scores[w].wins += 1;
                self.scores[l].losses += 1;
            }
            _ => {
                self.scores[black].draws += 1;
                self.scores[white].draws += 1;
            }
        }

        let (lo, hi) = if black < white {
            (black, white)
        } else {
            (white, black)
        };
        if let Some(pair) = self.pairs.iter_mut().find(|p| p.a == lo && p.b == hi) {
            match winner {
                Some(w) if w == lo => pair.a_wins += 1,
                Some(_) => pair.b_wins += 1,
                None => pair.draws += 1,
            }
        }
        self.games += 1;
    }
}

impl fmt::Display for Results {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<20} {:>5} {:>5} {:>5} {:>7}", "Engine", "W", "L", "D", "Pts")?;
        for (name, score) in self.names.iter().zip(&self.scores) {
            writeln!(
                f,
                "{:<20} {:>5} {:>5} {:>5} {:>7.1}",
                name, score.wins, score.losses, score.draws, score.points()
            )?;
        }
        for pair in &self.pairs {
            if pair.a_wins + pair.b_wins + pair.draws == 0 {
                continue;
            }
            let (elo, lo, hi) =
                elo_difference(pair.a_wins as f64, pair.b_wins as f64, pair.draws as f64);
            write!(
                f,
                "{} vs {}: {}-{}-{}",
                self.names[pair.a], self.names[pair.b], pair.a_wins, pair.b_wins, pair.draws
            )?;
            if elo.is_finite() {
                writeln!(f, "  elo {:+.0} [{:+.0}, {:+.0}]", elo, lo, hi)?;
            } else {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Elo difference with a 95% confidence interval, from the first player's
/// perspective. Infinite when one side scored everything.
pub fn elo_difference(wins: f64, losses: f64, draws: f64) -> (f64, f64, f64) {
    let total = wins + losses + draws;
    if total == 0.0 {
        return (0.0, 0.0, 0.0);
    }

    let score = (wins + draws * 0.5) / total;
    let elo = if score >= 1.0 {
        f64::INFINITY
    } else if score <= 0.0 {
        f64::NEG_INFINITY
    } else {
        -400.0 * (1.0 / score - 1.0).log10()
    };

    let se = (score * (1.0 - score) / total).sqrt();
    let margin = 1.96 * se;
    let low = (score - margin).clamp(0.001, 0.999);
    let high = (score + margin).clamp(0.001, 0.999);

    (
        elo,
        -400.0 * (1.0 / low - 1.0).log10(),
        -400.0 * (1.0 / high - 1.0).log10(),
    )
}

/// Log-likelihood ratio of H1 "first player is ~10 elo stronger" against
/// H0 "equal strength". Above ~2.94 or below ~-2.94 is significant.
pub fn sprt_llr(wins: f64, losses: f64, draws: f64) -> f64 {
    let n = wins + losses + draws;
    if n == 0.0 {
        return 0.0;
    }

    let score = (wins + draws * 0.5) / n;
    if score <= 0.0 || score >= 1.0 {
        return if score > 0.5 { 10.0 } else { -10.0 };
    }

    let p0 = 0.5;
    let p1 = 1.0 / (1.0 + 10.0_f64.powf(-10.0 / 400.0));
    let ll = |p: f64| score * (score / p).ln() + (1.0 - score) * ((1.0 - score) / (1.0 - p)).ln();
    n * ll(p0) - n * ll(p1)
}
