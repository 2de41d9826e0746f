//! Parallel tournament coordination.
//!
//! A fixed pool of worker threads pulls assignments from the schedule
//! generator, plays them with freshly launched engines and folds the
//! outcomes into the shared standings. The generator, the remaining-games
//! counter and the standings sit behind one mutex that is only held for
//! short bookkeeping sections, never across engine i/o.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use log::{info, warn};

use crate::board::{Position, Side};
use crate::callbacks::Callbacks;
use crate::config::{ConfigError, TournamentConfig};
use crate::driver::{self, GameOutcome, ResultReason};
use crate::engine::{EngineError, EngineSession, LineObserver};
use crate::pgn::{self, PgnWriter};
use crate::results::Results;
use crate::schedule::RoundRobinGenerator;
use crate::settings::{AdjudicationSettings, EngineConfig, GameSettings, SearchSettings};

struct Shared {
    generator: RoundRobinGenerator,
    remaining: u64,
    results: Results,
}

pub struct Tournament {
    engines: Vec<EngineConfig>,
    openings: Vec<String>,
    tc: SearchSettings,
    adjudication: AdjudicationSettings,
    event: String,
    games: u64,
    repeat: bool,
    concurrency: usize,
    pgn: Option<(PgnWriter, bool)>,
    callbacks: Arc<Callbacks>,
    stop: Arc<AtomicBool>,
}

impl Tournament {
    /// Validates the whole configuration up front; any problem here aborts
    /// before a single engine is launched.
    pub fn new(config: &TournamentConfig, callbacks: Callbacks) -> Result<Tournament, ConfigError> {
        config.validate_counts()?;
        let engines = config.engine_configs()?;
        let openings = config.opening_fens()?;
        let tc = config.timecontrol.to_search_settings()?;

        let pgn = match &config.pgn {
            Some(out) => {
                let writer =
                    PgnWriter::append(&out.path).map_err(|source| ConfigError::PgnOutput {
                        path: out.path.clone(),
                        source,
                    })?;
                Some((writer, out.verbose))
            }
            None => None,
        };

        Ok(Tournament {
            engines,
            openings,
            tc,
            adjudication: config.adjudication.clone(),
            event: config.event.clone(),
            games: config.games,
            repeat: config.repeat,
            concurrency: config.concurrency,
            pgn,
            callbacks: Arc::new(callbacks),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Cooperative cancellation handle: workers finish their current game
    /// and exit before picking up another.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn expected_games(&self) -> u64 {
        self.generator().expected()
    }

    fn generator(&self) -> RoundRobinGenerator {
        RoundRobinGenerator::new(
            self.engines.len(),
            self.games,
            self.openings.len(),
            self.repeat,
        )
    }

    pub fn run(&self) -> Results {
        let generator = self.generator();
        let remaining = generator.expected();
        let names = self.engines.iter().map(|e| e.name.clone()).collect();
        let shared = Mutex::new(Shared {
            generator,
            remaining,
            results: Results::new(names),
        });

        info!(
            "running {} games with {} workers",
            remaining, self.concurrency
        );

        thread::scope(|scope| {
            for _ in 0..self.concurrency {
                scope.spawn(|| self.worker(&shared));
            }
        });

        shared.into_inner().unwrap().results
    }

    fn worker(&self, shared: &Mutex<Shared>) {
        loop {
            let assignment = {
                let mut state = shared.lock().unwrap();
                if state.remaining == 0 || self.stop.load(Ordering::Relaxed) {
                    return;
                }
                state.remaining -= 1;
                state.generator.next_game()
            };

            let game = GameSettings {
                engine1: self.engines[assignment.player1].clone(),
                engine2: self.engines[assignment.player2].clone(),
                fen: self.openings[assignment.opening].clone(),
            };

            (self.callbacks.on_game_started)(
                assignment.game_id,
                &game.fen,
                &game.engine1.name,
                &game.engine2.name,
            );

            let outcome = match self.play_one(&game) {
                Some(outcome) => outcome,
                None => continue,
            };

            {
                let mut state = shared.lock().unwrap();
                state
                    .results
                    .add_game(assignment.player1, assignment.player2, outcome.result);
                (self.callbacks.on_game_finished)(
                    assignment.game_id,
                    outcome.result,
                    &game.engine1.name,
                    &game.engine2.name,
                );
                (self.callbacks.on_results_update)(&state.results);
            }

            if let Some((writer, verbose)) = &self.pgn {
                let text = pgn::render(&self.event, *verbose, &self.tc, &game, &outcome);
                if let Err(err) = writer.write(&text) {
                    warn!("pgn output failed: {}", err);
                }
            }
            // Both sessions died with play_one; the next iteration starts
            // from clean processes.
        }
    }

    /// Plays one game, turning engine startup failures into a forfeit
    /// rather than an aborted tournament.
    fn play_one(&self, game: &GameSettings) -> Option<GameOutcome> {
        let mut engine1 = match self.launch(&game.engine1) {
            Ok(session) => session,
            Err(err) => return Some(self.forfeit(game, Side::Black, err)),
        };
        let mut engine2 = match self.launch(&game.engine2) {
            Ok(session) => session,
            Err(err) => return Some(self.forfeit(game, Side::White, err)),
        };

        match driver::play(
            &self.adjudication,
            &self.tc,
            game,
            &mut engine1,
            &mut engine2,
            &self.callbacks,
        ) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                // Openings are validated at construction, so this is a bug
                // worth surfacing but not worth poisoning the standings.
                warn!("unplayable opening {:?}: {}", game.fen, err);
                None
            }
        }
    }

    fn launch(&self, config: &EngineConfig) -> Result<EngineSession, EngineError> {
        (self.callbacks.on_engine_start)(&config.path);

        let callbacks = Arc::clone(&self.callbacks);
        let on_send: LineObserver = Arc::new(move |line: &str| (callbacks.on_info_send)(line));
        let callbacks = Arc::clone(&self.callbacks);
        let on_recv: LineObserver = Arc::new(move |line: &str| (callbacks.on_info_recv)(line));

        let mut session = EngineSession::spawn(config, Some(on_send), Some(on_recv))?;
        session.init()?;
        for (name, value) in &config.options {
            session.set_option(name, value)?;
        }
        Ok(session)
    }

    fn forfeit(&self, game: &GameSettings, loser: Side, err: EngineError) -> GameOutcome {
        let name = match loser {
            Side::Black => &game.engine1.name,
            Side::White => &game.engine2.name,
        };
        warn!("{} forfeits: {}", name, err);

        let startpos =
            Position::from_fen(&game.fen).unwrap_or_else(|_| Position::startpos());
        let final_material = startpos.material();
        GameOutcome {
            result: crate::board::GameResult::win_for(loser.other()),
            reason: ResultReason::EngineCrash,
            endpos: startpos.clone(),
            startpos,
            history: Vec::new(),
            ply_count: 0,
            final_material,
            illegal_token: None,
        }
    }
}
