//! Run configuration.
//!
//! Loaded from a TOML file. A missing or broken file falls back to defaults.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "thornvale-sim.toml";

/// Which encounter to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Scenario {
    /// One melee grunt
    #[default]
    Grunt,
    /// A tank and a gunner
    Squad,
    /// Two flying drones
    Drones,
    /// The village boss
    VillageBoss,
    /// The jungle boss
    JungleBoss,
    /// Grunt, gunner, drone, then the village boss further right
    Gauntlet,
}

impl Scenario {
    /// Archetype names and spawn x positions, in spawn order.
    #[must_use]
    pub fn roster(self) -> &'static [(&'static str, f32)] {
        match self {
            Self::Grunt => &[("melee_grunt", 5.0)],
            Self::Squad => &[("tank", 4.0), ("ranged_gunner", 9.0)],
            Self::Drones => &[("flying_drone", 5.0), ("flying_drone", 8.0)],
            Self::VillageBoss => &[("village_boss", 8.0)],
            Self::JungleBoss => &[("jungle_boss", 10.0)],
            Self::Gauntlet => &[
                ("melee_grunt", 5.0),
                ("ranged_gunner", 12.0),
                ("flying_drone", 18.0),
                ("village_boss", 28.0),
            ],
        }
    }
}

/// Settings of a headless run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Encounter to build
    pub scenario: Scenario,
    /// Time limit in seconds
    pub duration: f32,
    /// Ticks per second
    pub tick_rate: u32,
    /// Loot RNG seed
    pub seed: u64,
    /// Respawns allowed before the run counts as lost
    pub respawns: u32,
    /// Potions the player starts with
    pub starting_potions: u32,
    /// Drink below this fraction of max HP
    pub heal_below: f32,
    /// RON archetype library overriding the built-in presets
    pub archetype_file: Option<PathBuf>,
    /// RON player tuning overriding the defaults
    pub tuning_file: Option<PathBuf>,
    /// Print the summary as JSON
    pub json: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::default(),
            duration: 60.0,
            tick_rate: 64,
            seed: 7,
            respawns: 0,
            starting_potions: 1,
            heal_below: 0.4,
            archetype_file: None,
            tuning_file: None,
            json: false,
        }
    }
}

impl RunConfig {
    /// Loads configuration from `path`.
    /// Returns defaults if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Saves configuration to `path`, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamps values to sensible ranges.
    pub fn validate(&mut self) {
        self.duration = self.duration.clamp(1.0, 3_600.0);
        self.tick_rate = self.tick_rate.clamp(10, 480);
        self.respawns = self.respawns.min(99);
        self.heal_below = self.heal_below.clamp(0.0, 1.0);
    }

    /// Fixed timestep.
    #[must_use]
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Number of ticks in the time limit.
    #[must_use]
    pub fn total_ticks(&self) -> usize {
        (self.duration * self.tick_rate as f32).ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert_eq!(config.scenario, Scenario::Grunt);
        assert_eq!(config.tick_rate, 64);
        assert_eq!(config.total_ticks(), 3_840);
    }

    #[test]
    fn test_config_validation() {
        let mut config = RunConfig {
            duration: 0.0,
            tick_rate: 1,
            heal_below: 3.0,
            ..RunConfig::default()
        };
        config.validate();
        assert_eq!(config.duration, 1.0);
        assert_eq!(config.tick_rate, 10);
        assert_eq!(config.heal_below, 1.0);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join(CONFIG_FILE);

        let config = RunConfig {
            scenario: Scenario::Gauntlet,
            seed: 99,
            json: true,
            ..RunConfig::default()
        };
        config.save_to(&path).expect("Failed to save config");

        let loaded = RunConfig::load_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "scenario = \"village_boss\"\nduration = 30.0\n").expect("write");

        let loaded = RunConfig::load_from(&path);
        assert_eq!(loaded.scenario, Scenario::VillageBoss);
        assert_eq!(loaded.duration, 30.0);
        assert_eq!(loaded.tick_rate, 64);
    }

    #[test]
    fn test_config_load_missing_or_broken_file() {
        assert_eq!(RunConfig::load_from("/nonexistent/path/run.toml"), RunConfig::default());

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "scenario = [").expect("write");
        assert_eq!(RunConfig::load_from(&path), RunConfig::default());
    }

    #[test]
    fn test_every_roster_is_non_empty() {
        for scenario in [
            Scenario::Grunt,
            Scenario::Squad,
            Scenario::Drones,
            Scenario::VillageBoss,
            Scenario::JungleBoss,
            Scenario::Gauntlet,
        ] {
            assert!(!scenario.roster().is_empty());
        }
    }
}
