use anyhow::Result;
use holostack_core::{Location, ObserverId, SimTick, WorldId};
use holostack_labels::LabelConfig;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/holostack.toml";

/// Everything the headless host needs: label flags, the stacks to place and
/// the observers walking around them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    pub labels: LabelConfig,
    pub stacks: Vec<StackSpec>,
    pub observers: Vec<ObserverSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StackSpec {
    pub location: Location,
    pub lines: Vec<String>,
    /// Append a status line and keep it updated once per second.
    #[serde(default)]
    pub uptime_line: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObserverSpec {
    pub id: ObserverId,
    #[serde(default)]
    pub world: WorldId,
    /// Closed loop of `[x, y, z]` points walked at `speed`.
    pub waypoints: Vec<[f64; 3]>,
    /// Blocks per tick.
    #[serde(default = "default_speed")]
    pub speed: f64,
}

fn default_speed() -> f64 {
    0.5
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            labels: LabelConfig {
                interaction_enabled: true,
                view_distance: 12.0,
                ..LabelConfig::default()
            },
            stacks: vec![
                StackSpec {
                    location: Location::new(WorldId::DEFAULT, 0.5, 65.0, 0.5),
                    lines: vec!["&6Diamond x1".into(), "&aBuy: &f120".into()],
                    uptime_line: true,
                },
                StackSpec {
                    location: Location::new(WorldId::DEFAULT, 40.5, 65.0, 0.5),
                    lines: vec!["&bEmerald x4".into(), "&cSell: &f60".into()],
                    uptime_line: false,
                },
            ],
            observers: vec![ObserverSpec {
                id: ObserverId(1),
                world: WorldId::DEFAULT,
                waypoints: vec![[-10.0, 64.0, 0.0], [50.0, 64.0, 0.0]],
                speed: default_speed(),
            }],
        }
    }
}

impl HostConfig {
    /// Load configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<HostConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    HostConfig::default()
                }
            },
            Err(err) => {
                if path != Path::new(DEFAULT_CONFIG_PATH)
                    || err.kind() != std::io::ErrorKind::NotFound
                {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!("Config not found at {}. Using defaults", path.display());
                }
                HostConfig::default()
            }
        }
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }
}

impl ObserverSpec {
    /// Position after walking for `tick` ticks along the waypoint loop.
    pub fn position_at(&self, tick: SimTick) -> Location {
        let point = |p: [f64; 3]| Location::new(self.world, p[0], p[1], p[2]);
        let Some(&first) = self.waypoints.first() else {
            return Location::new(self.world, 0.0, 0.0, 0.0);
        };
        if self.waypoints.len() == 1 || self.speed <= 0.0 {
            return point(first);
        }

        let legs: Vec<([f64; 3], [f64; 3], f64)> = self
            .waypoints
            .iter()
            .zip(self.waypoints.iter().cycle().skip(1))
            .map(|(&a, &b)| {
                let len = ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2) + (b[2] - a[2]).powi(2))
                    .sqrt();
                (a, b, len)
            })
            .collect();
        let lap: f64 = legs.iter().map(|leg| leg.2).sum();
        if lap <= 0.0 {
            return point(first);
        }

        let mut travelled = (self.speed * tick.0 as f64) % lap;
        for (a, b, len) in legs {
            if travelled <= len {
                let t = if len > 0.0 { travelled / len } else { 0.0 };
                return point([
                    a[0] + (b[0] - a[0]) * t,
                    a[1] + (b[1] - a[1]) * t,
                    a[2] + (b[2] - a[2]) * t,
                ]);
            }
            travelled -= len;
        }
        point(first)
    }
}
