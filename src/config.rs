use crate::combat::damage::DamageType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug)]
pub struct AppConfig {
    pub root: PathBuf,
    pub combat_config: PathBuf,
    pub abilities: PathBuf,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        if args.len() < 2 {
            return Err("usage: tibia-combat <asset-root> [abilities.yaml]".to_string());
        }

        let root = Path::new(&args[1]).to_path_buf();
        let abilities = if args.len() > 2 {
            PathBuf::from(&args[2])
        } else {
            root.join("abilities.yaml")
        };
        let combat_config = std::env::var("TIBIA_COMBAT_CONFIG")
            .ok()
            .and_then(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(trimmed))
                }
            })
            .unwrap_or_else(|| root.join("combat.yaml"));
        Ok(Self {
            root,
            combat_config,
            abilities,
        })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid combat configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldType {
    #[default]
    Pvp,
    NoPvp,
    PvpEnforced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocationConfig {
    pub id: u16,
    pub name: String,
    pub allows_pvp: bool,
    /// Share of magical damage removed before equipment absorption.
    pub magic_defense_percent: u16,
    pub absorb_percent: HashMap<DamageType, i16>,
    pub reflect_percent: HashMap<DamageType, i16>,
}

impl Default for VocationConfig {
    fn default() -> Self {
        Self {
            id: 0,
            name: "none".to_string(),
            allows_pvp: true,
            magic_defense_percent: 0,
            absorb_percent: HashMap::new(),
            reflect_percent: HashMap::new(),
        }
    }
}

impl VocationConfig {
    pub fn absorb(&self, damage_type: DamageType) -> i16 {
        self.absorb_percent.get(&damage_type).copied().unwrap_or(0)
    }

    pub fn reflect(&self, damage_type: DamageType) -> i16 {
        self.reflect_percent.get(&damage_type).copied().unwrap_or(0)
    }
}

/// Immutable snapshot of every combat knob, passed into each entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub world_type: WorldType,
    pub pvp_damage_halving: bool,
    pub monster_friendly_fire: bool,
    pub protection_level: u16,
    pub max_absorb_percent: u16,
    pub death_assists: usize,
    pub damage_window_ms: u64,
    pub login_grace_ms: u64,
    pub fight_time_ms: u64,
    pub white_skull_time_ms: u64,
    pub frag_window_ms: u64,
    pub kills_to_red_skull: usize,
    pub kills_to_black_skull: usize,
    pub show_invisible_effects: bool,
    pub view_range_x: u16,
    pub view_range_y: u16,
    pub vocations: Vec<VocationConfig>,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            world_type: WorldType::Pvp,
            pvp_damage_halving: true,
            monster_friendly_fire: false,
            protection_level: 1,
            max_absorb_percent: 80,
            death_assists: 1,
            damage_window_ms: 60_000,
            login_grace_ms: 2_000,
            fight_time_ms: 60_000,
            white_skull_time_ms: 15 * 60_000,
            frag_window_ms: 24 * 60 * 60_000,
            kills_to_red_skull: 3,
            kills_to_black_skull: 6,
            show_invisible_effects: false,
            view_range_x: 8,
            view_range_y: 6,
            vocations: Vec::new(),
        }
    }
}

impl CombatConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Loads `path` if present, otherwise falls back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: CombatConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_absorb_percent > 100 {
            return Err(ConfigError::Invalid(format!(
                "max_absorb_percent {} exceeds 100",
                self.max_absorb_percent
            )));
        }
        if self.kills_to_black_skull != 0 && self.kills_to_black_skull < self.kills_to_red_skull {
            return Err(ConfigError::Invalid(format!(
                "kills_to_black_skull {} is below kills_to_red_skull {}",
                self.kills_to_black_skull, self.kills_to_red_skull
            )));
        }
        for vocation in &self.vocations {
            if vocation.magic_defense_percent > 100 {
                return Err(ConfigError::Invalid(format!(
                    "vocation {} magic_defense_percent {} exceeds 100",
                    vocation.name, vocation.magic_defense_percent
                )));
            }
        }
        let mut ids: Vec<u16> = self.vocations.iter().map(|vocation| vocation.id).collect();
        ids.sort_unstable();
        if ids.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::Invalid("duplicate vocation id".to_string()));
        }
        Ok(())
    }

    pub fn vocation(&self, id: u16) -> Option<&VocationConfig> {
        self.vocations.iter().find(|vocation| vocation.id == id)
    }
}
