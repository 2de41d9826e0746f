//! Shared configuration types for engines, time controls and adjudication.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Wire protocol spoken by an engine. The variants differ only in their
/// token strings; see `engine::ProtocolTokens`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Uai,
    Ugi,
}

/// Search limits handed to an engine with `go`.
///
/// `Movetime` and `Time` are enforced by the driver; `Depth`, `Nodes` and
/// `Infinite` are passed through without timing enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSettings {
    Movetime { ms: u64 },
    Time { btime: i64, wtime: i64, binc: i64, winc: i64 },
    Depth { plies: u32 },
    Nodes { count: u64 },
    Infinite,
}

/// Material adjudication thresholds: the piece-count lead required and the
/// minimum number of halfmoves that must have been played first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialLimits {
    pub pieces: u32,
    pub plies: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjudicationSettings {
    pub material: Option<MaterialLimits>,
    pub gamelength: Option<u32>,
    pub easyfill: bool,
    pub timeout_buffer_ms: u64,
}

impl Default for AdjudicationSettings {
    fn default() -> Self {
        AdjudicationSettings {
            material: None,
            gamelength: None,
            easyfill: false,
            timeout_buffer_ms: 10,
        }
    }
}

/// One configured engine. `id` is unique within a tournament and doubles as
/// the index into the results table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub id: usize,
    pub name: String,
    pub path: String,
    pub args: Vec<String>,
    pub protocol: Protocol,
    pub options: BTreeMap<String, String>,
}

/// Everything the driver needs to play one game. `engine1` plays Black,
/// `engine2` plays White for the whole game.
#[derive(Debug, Clone)]
pub struct GameSettings {
    pub engine1: EngineConfig,
    pub engine2: EngineConfig,
    pub fen: String,
}
