/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use log::warn;
use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::entity::MAX_SPEED;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub sim: SimConfig,
    pub stages_dir: PathBuf,
    pub verbose: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub tick_rate_ms: u64,      // fixed physics period
    pub initial_speed: f32,     // tiles per second at spawn
    pub max_speed: f32,
    pub teleport_cooldown: f32, // seconds frozen after a jump
    pub gravity: f32,
    pub player_half_extent: f32,
    pub trigger_half_extent: f32,
    pub fall_seed: Option<u64>,
}

impl SimConfig {
    /// Fixed tick length in seconds.
    pub fn dt(&self) -> f32 {
        self.tick_rate_ms as f32 / 1000.0
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        TomlSim::default().into()
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    sim: TomlSim,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlSim {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_initial_speed")]
    initial_speed: f32,
    #[serde(default = "default_max_speed")]
    max_speed: f32,
    #[serde(default = "default_teleport_cooldown")]
    teleport_cooldown: f32,
    #[serde(default = "default_gravity")]
    gravity: f32,
    #[serde(default = "default_player_half_extent")]
    player_half_extent: f32,
    #[serde(default = "default_trigger_half_extent")]
    trigger_half_extent: f32,
    #[serde(default)]
    fall_seed: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_stages_dir")]
    stages_dir: String,
    #[serde(default)]
    verbose: bool,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 20 }           // 50 Hz
fn default_initial_speed() -> f32 { 2.0 }
fn default_max_speed() -> f32 { 10.0 }
fn default_teleport_cooldown() -> f32 { 0.05 }
fn default_gravity() -> f32 { 9.81 }
fn default_player_half_extent() -> f32 { 0.25 }
fn default_trigger_half_extent() -> f32 { 0.1 } // small pad at tile centre
fn default_stages_dir() -> String { "stages".into() }

impl Default for TomlSim {
    fn default() -> Self {
        TomlSim {
            tick_rate_ms: default_tick_rate(),
            initial_speed: default_initial_speed(),
            max_speed: default_max_speed(),
            teleport_cooldown: default_teleport_cooldown(),
            gravity: default_gravity(),
            player_half_extent: default_player_half_extent(),
            trigger_half_extent: default_trigger_half_extent(),
            fall_seed: None,
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            stages_dir: default_stages_dir(),
            verbose: false,
        }
    }
}

/// Longest tick for which one step at `max_speed` cannot carry the player
/// past a trigger volume: the step must stay within the entry reach.
fn longest_tick_ms(max_speed: f32, reach: f32) -> u64 {
    if max_speed <= 0.0 {
        return u64::MAX;
    }
    // +0.001 ms absorbs f32 rounding in the extents (0.25 + 0.1 < 0.35)
    ((reach / max_speed) * 1000.0 + 0.001).floor().max(1.0) as u64
}

impl From<TomlSim> for SimConfig {
    fn from(t: TomlSim) -> Self {
        let max_speed = t.max_speed.clamp(0.0, MAX_SPEED);
        if max_speed != t.max_speed {
            warn!("max_speed {} out of range, using {max_speed}", t.max_speed);
        }
        let initial_speed = t.initial_speed.clamp(0.0, max_speed);

        let longest = longest_tick_ms(max_speed, t.player_half_extent + t.trigger_half_extent);
        let tick_rate_ms = t.tick_rate_ms.clamp(1, longest);
        if tick_rate_ms < t.tick_rate_ms {
            warn!("tick_rate_ms {} would skip triggers at speed {max_speed}, using {tick_rate_ms}", t.tick_rate_ms);
        }

        SimConfig {
            tick_rate_ms,
            initial_speed,
            max_speed,
            teleport_cooldown: t.teleport_cooldown,
            gravity: t.gravity,
            player_half_extent: t.player_half_extent,
            trigger_half_extent: t.trigger_half_extent,
            fall_seed: t.fall_seed,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) `~/.local/share/tilerunner`.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let stages_dir_str = &toml_cfg.general.stages_dir;
        let stages_dir = if PathBuf::from(stages_dir_str).is_absolute() {
            PathBuf::from(stages_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(stages_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(stages_dir_str))
        };

        GameConfig {
            sim: toml_cfg.sim.into(),
            stages_dir,
            verbose: toml_cfg.general.verbose,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + XDG data (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/tilerunner");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => return parse_toml(&text),
                Err(e) => warn!("could not read {}: {e}", path.display()),
            }
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("config.toml parse error, using defaults: {e}");
            TomlConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = GameConfig::resolve(parse_toml(""), &[]);
        assert_eq!(cfg.sim, SimConfig::default());
        assert_eq!(cfg.sim.tick_rate_ms, 20);
        assert_eq!(cfg.sim.teleport_cooldown, 0.05);
        assert_eq!(cfg.stages_dir, PathBuf::from("stages"));
        assert!(!cfg.verbose);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::resolve(
            parse_toml("[sim]\ninitial_speed = 4.0\nfall_seed = 9\n[general]\nverbose = true\n"),
            &[],
        );
        assert_eq!(cfg.sim.initial_speed, 4.0);
        assert_eq!(cfg.sim.fall_seed, Some(9));
        assert_eq!(cfg.sim.max_speed, 10.0);
        assert!(cfg.verbose);
    }

    #[test]
    fn malformed_file_falls_back() {
        let cfg = GameConfig::resolve(parse_toml("[sim\ntick_rate_ms = "), &[]);
        assert_eq!(cfg.sim, SimConfig::default());
    }

    #[test]
    fn zero_tick_rate_is_raised() {
        let cfg = GameConfig::resolve(parse_toml("[sim]\ntick_rate_ms = 0\n"), &[]);
        assert_eq!(cfg.sim.tick_rate_ms, 1);
    }

    #[test]
    fn speeds_clamped_to_ceiling() {
        let cfg = GameConfig::resolve(
            parse_toml("[sim]\nmax_speed = 25.0\ninitial_speed = 40.0\n"),
            &[],
        );
        assert_eq!(cfg.sim.max_speed, MAX_SPEED);
        assert_eq!(cfg.sim.initial_speed, MAX_SPEED);

        let cfg = GameConfig::resolve(
            parse_toml("[sim]\nmax_speed = 4.0\ninitial_speed = -1.0\n"),
            &[],
        );
        assert_eq!(cfg.sim.max_speed, 4.0);
        assert_eq!(cfg.sim.initial_speed, 0.0);
    }

    #[test]
    fn long_tick_capped_to_trigger_reach() {
        // reach 0.35 at 10 tiles/s: at most 35 ms per step
        let cfg = GameConfig::resolve(parse_toml("[sim]\ntick_rate_ms = 500\n"), &[]);
        assert_eq!(cfg.sim.tick_rate_ms, 35);
        let reach = cfg.sim.player_half_extent + cfg.sim.trigger_half_extent;
        assert!(cfg.sim.dt() * cfg.sim.max_speed <= reach + 1e-4);

        // a slower ceiling allows a longer tick
        let cfg = GameConfig::resolve(parse_toml("[sim]\ntick_rate_ms = 500\nmax_speed = 1.0\n"), &[]);
        assert_eq!(cfg.sim.tick_rate_ms, 350);

        let cfg = GameConfig::resolve(parse_toml("[sim]\ntick_rate_ms = 500\nmax_speed = 0.0\n"), &[]);
        assert_eq!(cfg.sim.tick_rate_ms, 500);
    }

    #[test]
    fn dt_is_in_seconds() {
        assert_eq!(SimConfig::default().dt(), 0.02);
    }
}
