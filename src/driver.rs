//! Drives a single game between two engine sessions to a terminal result.

use std::time::{Duration, Instant};

use log::warn;

use crate::adjudicate::{
    can_adjudicate_easyfill, can_adjudicate_gamelength, can_adjudicate_material, material_leader,
};
use crate::board::{FenError, GameResult, Move, Position, Side};
use crate::callbacks::Callbacks;
use crate::clock::GameClock;
use crate::engine::{EngineError, EngineSession};
use crate::settings::{AdjudicationSettings, GameSettings, SearchSettings};

/// Why a game ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultReason {
    Normal,
    OutOfTime,
    MaterialImbalance,
    EasyFill,
    Gamelength,
    IllegalMove,
    EngineCrash,
    None,
}

/// The record of one finished game.
#[derive(Debug, Clone)]
pub struct GameOutcome {
    pub result: GameResult,
    pub reason: ResultReason,
    pub startpos: Position,
    pub endpos: Position,
    /// Moves in order, each with the wall-clock milliseconds it took.
    pub history: Vec<(Move, u64)>,
    pub ply_count: u32,
    /// Black pieces minus white pieces in the final position.
    pub final_material: i32,
    /// The raw token of a rejected move, kept for reporting.
    pub illegal_token: Option<String>,
}

enum Ending {
    Adjudicated(GameResult, ResultReason),
    Illegal(Side, String),
    Flagged(Side),
    Natural,
}

/// Plays one game. `engine1` is Black and `engine2` is White for the whole
/// game; both sessions must already be initialised and have their options
/// set. Engine failures never propagate: they are folded into the outcome
/// as a loss for the side to move.
pub fn play(
    adjudication: &AdjudicationSettings,
    tc: &SearchSettings,
    game: &GameSettings,
    engine1: &mut EngineSession,
    engine2: &mut EngineSession,
    callbacks: &Callbacks,
) -> Result<GameOutcome, FenError> {
    assert!(!game.fen.is_empty());
    assert_ne!(game.engine1.id, game.engine2.id);

    let startpos = Position::from_fen(&game.fen)?;
    let mut pos = startpos.clone();
    let mut clock = GameClock::new(*tc, adjudication.timeout_buffer_ms);
    let mut ply_count: u32 = 0;
    let mut history: Vec<(Move, u64)> = Vec::new();

    let mut run = || -> Result<Ending, EngineError> {
        engine1.new_game()?;
        engine2.new_game()?;
        engine1.is_ready()?;
        engine2.is_ready()?;

        while !pos.is_gameover() {
            if let Some(limits) = &adjudication.material {
                if can_adjudicate_material(&pos, limits, ply_count) {
                    return Ok(Ending::Adjudicated(
                        GameResult::win_for(material_leader(&pos)),
                        ResultReason::MaterialImbalance,
                    ));
                }
            }
            if adjudication.easyfill && can_adjudicate_easyfill(&pos) {
                return Ok(Ending::Adjudicated(
                    GameResult::win_for(pos.turn().other()),
                    ResultReason::EasyFill,
                ));
            }
            if let Some(max_plies) = adjudication.gamelength {
                if can_adjudicate_gamelength(ply_count, max_plies) {
                    return Ok(Ending::Adjudicated(GameResult::Draw, ResultReason::Gamelength));
                }
            }

            let mover = pos.turn();
            let session: &mut EngineSession = match mover {
                Side::Black => &mut *engine1,
                Side::White => &mut *engine2,
            };

            session.position(&pos)?;
            session.is_ready()?;

            let budget = clock.budget_ms(mover).map(Duration::from_millis);
            let t0 = Instant::now();
            let movestr = session.go(clock.settings(), budget)?;
            let elapsed = t0.elapsed().as_millis() as u64;

            let mv = match Move::from_uai(movestr.trim()) {
                Ok(mv) if pos.is_legal_move(mv) => mv,
                _ => return Ok(Ending::Illegal(mover, movestr)),
            };

            ply_count += 1;
            history.push((mv, elapsed));
            (callbacks.on_move)(mv, elapsed);

            if let Some(flagged) = clock.after_move(mover, elapsed) {
                return Ok(Ending::Flagged(flagged));
            }

            pos.make_move(mv);
        }

        Ok(Ending::Natural)
    };

    let ending = run();

    let mut illegal_token = None;
    let (result, reason) = match ending {
        Ok(Ending::Natural) => (pos.result(), ResultReason::Normal),
        Ok(Ending::Adjudicated(result, reason)) => (result, reason),
        Ok(Ending::Flagged(loser)) => {
            (GameResult::win_for(loser.other()), ResultReason::OutOfTime)
        }
        Ok(Ending::Illegal(mover, token)) => {
            let offender = match mover {
                Side::Black => &game.engine1.name,
                Side::White => &game.engine2.name,
            };
            println!("Illegal move {:?} played by {}\n", token, offender);
            illegal_token = Some(token);
            (GameResult::win_for(mover.other()), ResultReason::IllegalMove)
        }
        Err(EngineError::Unresponsive) => {
            // The watchdog killed an engine that sat on its move; that is a
            // time loss, not a crash.
            (GameResult::win_for(pos.turn().other()), ResultReason::OutOfTime)
        }
        Err(err) => {
            warn!(
                "engine failure in {} vs {}: {}",
                game.engine1.name, game.engine2.name, err
            );
            (GameResult::win_for(pos.turn().other()), ResultReason::EngineCrash)
        }
    };

    let final_material = pos.material();
    Ok(GameOutcome {
        result,
        reason,
        startpos,
        endpos: pos,
        history,
        ply_count,
        final_material,
        illegal_token,
    })
}
