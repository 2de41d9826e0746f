//! Tournament settings file (JSON) and its validation.
//!
//! A broken configuration is the only fatal error in the system: everything
//! is checked here, before any game starts, so the workers never have to
//! second-guess an engine list or an opening FEN.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::Deserialize;
use thiserror::Error;

use crate::board::{FenError, Position, STARTPOS_FEN};
use crate::settings::{AdjudicationSettings, EngineConfig, Protocol, SearchSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("a tournament needs at least two engines")]
    TooFewEngines,
    #[error("engine name {0:?} is used twice")]
    DuplicateName(String),
    #[error("concurrency must be at least 1")]
    NoWorkers,
    #[error("games per pairing must be at least 1")]
    NoGames,
    #[error("time control does not select exactly one mode")]
    AmbiguousTimeControl,
    #[error("opening {index} is not a valid position: {source}")]
    BadOpening { index: usize, source: FenError },
    #[error("cannot open pgn output {path}: {source}")]
    PgnOutput {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TournamentConfig {
    #[serde(default = "default_event")]
    pub event: String,
    /// Games per pairing in one schedule cycle.
    #[serde(default = "default_games")]
    pub games: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Play each opening twice with the colours swapped.
    #[serde(default = "default_repeat")]
    pub repeat: bool,
    pub timecontrol: TimeControlConfig,
    #[serde(default)]
    pub adjudication: AdjudicationSettings,
    /// Opening FENs, used in schedule order. Empty means the start position.
    #[serde(default)]
    pub openings: Vec<String>,
    /// File with one opening FEN per line; merged after `openings`.
    #[serde(default)]
    pub openings_file: Option<PathBuf>,
    #[serde(default)]
    pub pgn: Option<PgnOutput>,
    pub engines: Vec<EngineEntry>,
}

fn default_event() -> String {
    "ataxx-arena match".to_string()
}

fn default_games() -> u64 {
    2
}

fn default_concurrency() -> usize {
    1
}

fn default_repeat() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct PgnOutput {
    pub path: PathBuf,
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Flat time-control fields as they appear in the settings file; exactly
/// one mode must be selected.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TimeControlConfig {
    pub movetime: Option<u64>,
    pub btime: Option<i64>,
    pub wtime: Option<i64>,
    #[serde(default)]
    pub binc: i64,
    #[serde(default)]
    pub winc: i64,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    #[serde(default)]
    pub infinite: bool,
}

impl TimeControlConfig {
    pub fn to_search_settings(&self) -> Result<SearchSettings, ConfigError> {
        let fischer = self.btime.is_some() || self.wtime.is_some();
        let modes = [
            self.movetime.is_some(),
            fischer,
            self.depth.is_some(),
            self.nodes.is_some(),
            self.infinite,
        ];
        if modes.iter().filter(|&&m| m).count() != 1 {
            return Err(ConfigError::AmbiguousTimeControl);
        }

        if let Some(ms) = self.movetime {
            return Ok(SearchSettings::Movetime { ms });
        }
        if fischer {
            let btime = self.btime.ok_or(ConfigError::AmbiguousTimeControl)?;
            let wtime = self.wtime.ok_or(ConfigError::AmbiguousTimeControl)?;
            return Ok(SearchSettings::Time {
                btime,
                wtime,
                binc: self.binc,
                winc: self.winc,
            });
        }
        if let Some(plies) = self.depth {
            return Ok(SearchSettings::Depth { plies });
        }
        if let Some(count) = self.nodes {
            return Ok(SearchSettings::Nodes { count });
        }
        Ok(SearchSettings::Infinite)
    }
}

impl TournamentConfig {
    pub fn load(path: &Path) -> Result<TournamentConfig, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The engine list with tournament-unique ids assigned by position.
    pub fn engine_configs(&self) -> Result<Vec<EngineConfig>, ConfigError> {
        if self.engines.len() < 2 {
            return Err(ConfigError::TooFewEngines);
        }
        if let Some(name) = self.engines.iter().map(|e| &e.name).duplicates().next() {
            return Err(ConfigError::DuplicateName(name.clone()));
        }
        Ok(self
            .engines
            .iter()
            .enumerate()
            .map(|(id, entry)| EngineConfig {
                id,
                name: entry.name.clone(),
                path: entry.path.clone(),
                args: entry.args.clone(),
                protocol: entry.protocol,
                options: entry.options.clone(),
            })
            .collect())
    }

    /// All opening FENs, each verified to parse. Defaults to the standard
    /// start position when none are configured.
    pub fn opening_fens(&self) -> Result<Vec<String>, ConfigError> {
        let mut fens = self.openings.clone();
        if let Some(path) = &self.openings_file {
            let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            fens.extend(
                text.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from),
            );
        }
        if fens.is_empty() {
            fens.push(STARTPOS_FEN.to_string());
        }

        for (index, fen) in fens.iter().enumerate() {
            Position::from_fen(fen).map_err(|source| ConfigError::BadOpening { index, source })?;
        }
        Ok(fens)
    }

    pub fn validate_counts(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.games == 0 {
            return Err(ConfigError::NoGames);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> TournamentConfig {
        serde_json::from_str(json).unwrap()
    }

    const MINIMAL: &str = r#"{
        "timecontrol": {"movetime": 100},
        "engines": [
            {"name": "a", "path": "./a"},
            {"name": "b", "path": "./b", "protocol": "ugi", "options": {"hash": "16"}}
        ]
    }"#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = parse(MINIMAL);
        assert_eq!(config.games, 2);
        assert_eq!(config.concurrency, 1);
        assert!(config.repeat);
        config.validate_counts().unwrap();

        let engines = config.engine_configs().unwrap();
        assert_eq!(engines.len(), 2);
        assert_eq!(engines[0].id, 0);
        assert_eq!(engines[1].id, 1);
        assert_eq!(engines[1].protocol, Protocol::Ugi);
        assert_eq!(engines[1].options["hash"], "16");

        assert_eq!(config.opening_fens().unwrap(), vec![STARTPOS_FEN.to_string()]);
        assert_eq!(
            config.timecontrol.to_search_settings().unwrap(),
            SearchSettings::Movetime { ms: 100 }
        );
    }

    #[test]
    fn duplicate_names_are_fatal() {
        let config = parse(
            r#"{
                "timecontrol": {"movetime": 100},
                "engines": [
                    {"name": "same", "path": "./a"},
                    {"name": "same", "path": "./b"}
                ]
            }"#,
        );
        assert!(matches!(
            config.engine_configs(),
            Err(ConfigError::DuplicateName(name)) if name == "same"
        ));
    }

    #[test]
    fn one_engine_is_not_a_tournament() {
        let config = parse(
            r#"{
                "timecontrol": {"movetime": 100},
                "engines": [{"name": "solo", "path": "./a"}]
            }"#,
        );
        assert!(matches!(
            config.engine_configs(),
            Err(ConfigError::TooFewEngines)
        ));
    }

    #[test]
    fn bad_opening_is_fatal() {
        let mut config = parse(MINIMAL);
        config.openings = vec!["x5o/7/7/7/7/7/o5x x 0 1".to_string(), "nonsense".to_string()];
        assert!(matches!(
            config.opening_fens(),
            Err(ConfigError::BadOpening { index: 1, .. })
        ));
    }

    #[test]
    fn time_control_must_pick_one_mode() {
        let ambiguous = TimeControlConfig {
            movetime: Some(100),
            depth: Some(5),
            ..Default::default()
        };
        assert!(ambiguous.to_search_settings().is_err());

        let none = TimeControlConfig::default();
        assert!(none.to_search_settings().is_err());

        let fischer = TimeControlConfig {
            btime: Some(1000),
            wtime: Some(1000),
            binc: 10,
            winc: 10,
            ..Default::default()
        };
        assert_eq!(
            fischer.to_search_settings().unwrap(),
            SearchSettings::Time {
                btime: 1000,
                wtime: 1000,
                binc: 10,
                winc: 10
            }
        );
    }
}
