/// Per-session tunables.
///
/// A `Settings` value is built once by the host (defaults, optionally a JSON
/// file, then command-line overrides) and copied into every new session, so
/// nothing carries over between games.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base emission multiplier for radial patterns.
    pub num_radial_projectiles: u32,
    /// Base emission multiplier for aimed patterns.
    pub num_aimed_projectiles: u32,
    pub radial_turret_number: u32,
    pub aimed_turret_number: u32,
    /// Delay between a fire request and the pattern it triggers.  Requests
    /// arriving inside this window replace the pending one.
    pub fire_debounce_ms: u64,
    pub radial_fire_interval_ms: u64,
    pub aimed_fire_interval_ms: u64,
    /// Every frame whose elapsed session time lands within this many ms
    /// after a multiple of a fire interval requests fire.
    pub fire_window_ms: u64,
    /// Adds the overtake wave to the aimed turrets' pattern table.
    pub overtake_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            num_radial_projectiles: 10,
            num_aimed_projectiles: 10,
            radial_turret_number: 1,
            aimed_turret_number: 1,
            fire_debounce_ms: 20,
            radial_fire_interval_ms: 5000,
            aimed_fire_interval_ms: 3000,
            fire_window_ms: 50,
            overtake_enabled: false,
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(text).context("invalid settings JSON")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.num_radial_projectiles > 0,
            "num_radial_projectiles must be at least 1"
        );
        ensure!(
            self.num_aimed_projectiles > 0,
            "num_aimed_projectiles must be at least 1"
        );
        ensure!(self.fire_debounce_ms > 0, "fire_debounce_ms must be positive");
        ensure!(
            self.fire_window_ms < self.radial_fire_interval_ms
                && self.fire_window_ms < self.aimed_fire_interval_ms,
            "fire_window_ms ({}) must be shorter than both fire intervals",
            self.fire_window_ms
        );
        Ok(())
    }
}
