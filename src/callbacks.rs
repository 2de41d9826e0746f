//! Observer hooks fired by the coordinator and the game driver.
//!
//! The set is installed once at tournament start and shared by reference
//! between workers, so every hook must be callable from any thread.

use crate::board::{GameResult, Move};
use crate::results::Results;

pub struct Callbacks {
    /// A new engine process was launched; argument is its path.
    pub on_engine_start: Box<dyn Fn(&str) + Send + Sync>,
    /// Game id, opening FEN, Black engine name, White engine name.
    pub on_game_started: Box<dyn Fn(u64, &str, &str, &str) + Send + Sync>,
    pub on_game_finished: Box<dyn Fn(u64, GameResult, &str, &str) + Send + Sync>,
    pub on_results_update: Box<dyn Fn(&Results) + Send + Sync>,
    /// Raw protocol line going to an engine.
    pub on_info_send: Box<dyn Fn(&str) + Send + Sync>,
    /// Raw protocol line coming from an engine.
    pub on_info_recv: Box<dyn Fn(&str) + Send + Sync>,
    pub on_move: Box<dyn Fn(Move, u64) + Send + Sync>,
}

impl Default for Callbacks {
    fn default() -> Self {
        Callbacks {
            on_engine_start: Box::new(|_| {}),
            on_game_started: Box::new(|_, _, _, _| {}),
            on_game_finished: Box::new(|_, _, _, _| {}),
            on_results_update: Box::new(|_| {}),
            on_info_send: Box::new(|_| {}),
            on_info_recv: Box::new(|_| {}),
            on_move: Box::new(|_, _| {}),
        }
    }
}
