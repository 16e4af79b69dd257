use std::fs;
use std::io;
use std::path::Path;

use aperture_shared::physics::{PlayerBody, DEFAULT_MAX_SUBSTEP_MS};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::portal::PlacementRules;

pub const SETTINGS_PATH: &str = "aperture.toml";

const MIN_PLAYER_SPEED: f64 = 0.001;
const MAX_PLAYER_SPEED: f64 = 0.2;
const MIN_PLAYER_RADIUS: f64 = 0.1;
const MAX_PLAYER_RADIUS: f64 = 5.0;
const MIN_PLAYER_HEIGHT: f64 = 0.0;
const MAX_PLAYER_HEIGHT: f64 = 10.0;
const MIN_SUBSTEP_MS: f64 = 1.0;
const MAX_SUBSTEP_MS: f64 = 50.0;
const MIN_LOOK_SENSITIVITY: f64 = 0.0001;
const MAX_LOOK_SENSITIVITY: f64 = 0.05;
const MIN_PORTALING_DISTANCE: f64 = 1.0;
const MAX_PORTALING_DISTANCE: f64 = 1000.0;
const MIN_PORTAL_SIZE: f64 = 0.5;
const MAX_PORTAL_SIZE: f64 = 50.0;
const MIN_PORTAL_OFFSET: f64 = 0.0001;
const MAX_PORTAL_OFFSET: f64 = 0.09;
const MIN_FOV: f64 = 20.0;
const MAX_FOV: f64 = 120.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSettings {
    /// World units per millisecond.
    #[serde(default = "default_player_speed")]
    pub player_speed: f64,
    #[serde(default = "default_player_radius")]
    pub player_radius: f64,
    #[serde(default = "default_player_height")]
    pub player_height: f64,
    #[serde(default = "default_max_substep_ms")]
    pub max_substep_ms: f64,
    /// Radians per pixel of pointer motion.
    #[serde(default = "default_look_sensitivity")]
    pub look_sensitivity: f64,
    #[serde(default = "default_max_portaling_distance")]
    pub max_portaling_distance: f64,
    #[serde(default = "default_portal_size")]
    pub portal_width: f64,
    #[serde(default = "default_portal_size")]
    pub portal_height: f64,
    #[serde(default = "default_portal_offset")]
    pub portal_offset: f64,
    #[serde(default = "default_fov_deg")]
    pub fov_deg: f64,
    #[serde(default = "default_render_portal_views")]
    pub render_portal_views: bool,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            player_speed: default_player_speed(),
            player_radius: default_player_radius(),
            player_height: default_player_height(),
            max_substep_ms: default_max_substep_ms(),
            look_sensitivity: default_look_sensitivity(),
            max_portaling_distance: default_max_portaling_distance(),
            portal_width: default_portal_size(),
            portal_height: default_portal_size(),
            portal_offset: default_portal_offset(),
            fov_deg: default_fov_deg(),
            render_portal_views: default_render_portal_views(),
        }
    }
}

impl SimSettings {
    /// Clamps every numeric field into range. Non-finite values fall back to
    /// the field's default.
    pub fn sanitize(mut self) -> Self {
        self.player_speed = bounded(
            self.player_speed,
            default_player_speed(),
            MIN_PLAYER_SPEED,
            MAX_PLAYER_SPEED,
        );
        self.player_radius = bounded(
            self.player_radius,
            default_player_radius(),
            MIN_PLAYER_RADIUS,
            MAX_PLAYER_RADIUS,
        );
        self.player_height = bounded(
            self.player_height,
            default_player_height(),
            MIN_PLAYER_HEIGHT,
            MAX_PLAYER_HEIGHT,
        );
        self.max_substep_ms = bounded(
            self.max_substep_ms,
            default_max_substep_ms(),
            MIN_SUBSTEP_MS,
            MAX_SUBSTEP_MS,
        );
        self.look_sensitivity = bounded(
            self.look_sensitivity,
            default_look_sensitivity(),
            MIN_LOOK_SENSITIVITY,
            MAX_LOOK_SENSITIVITY,
        );
        self.max_portaling_distance = bounded(
            self.max_portaling_distance,
            default_max_portaling_distance(),
            MIN_PORTALING_DISTANCE,
            MAX_PORTALING_DISTANCE,
        );
        self.portal_width = bounded(
            self.portal_width,
            default_portal_size(),
            MIN_PORTAL_SIZE,
            MAX_PORTAL_SIZE,
        );
        self.portal_height = bounded(
            self.portal_height,
            default_portal_size(),
            MIN_PORTAL_SIZE,
            MAX_PORTAL_SIZE,
        );
        self.portal_offset = bounded(
            self.portal_offset,
            default_portal_offset(),
            MIN_PORTAL_OFFSET,
            MAX_PORTAL_OFFSET,
        );
        self.fov_deg = bounded(self.fov_deg, default_fov_deg(), MIN_FOV, MAX_FOV);
        self
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let parsed = toml::from_str::<Self>(&contents).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to deserialize settings: {e}"),
            )
        })?;
        Ok(parsed.sanitize())
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let settings = self.clone().sanitize();
        let serialized = toml::to_string_pretty(&settings).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to serialize settings: {e}"),
            )
        })?;
        fs::write(path, serialized)
    }

    pub fn body(&self) -> PlayerBody {
        PlayerBody {
            radius: self.player_radius,
            height: self.player_height,
        }
    }

    pub fn placement_rules(&self) -> PlacementRules {
        PlacementRules {
            max_distance: self.max_portaling_distance,
            width: self.portal_width,
            height: self.portal_height,
            wall_offset: self.portal_offset,
        }
    }

    pub fn fov(&self) -> f64 {
        self.fov_deg.to_radians()
    }
}

fn bounded(value: f64, default: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        default
    }
}

fn default_player_speed() -> f64 {
    0.015
}

fn default_player_radius() -> f64 {
    1.0
}

fn default_player_height() -> f64 {
    2.0
}

fn default_max_substep_ms() -> f64 {
    DEFAULT_MAX_SUBSTEP_MS
}

fn default_look_sensitivity() -> f64 {
    0.005
}

fn default_max_portaling_distance() -> f64 {
    150.0
}

fn default_portal_size() -> f64 {
    5.0
}

fn default_portal_offset() -> f64 {
    0.01
}

fn default_fov_deg() -> f64 {
    45.0
}

fn default_render_portal_views() -> bool {
    true
}

pub fn load_or_create_settings(path: &Path) -> SimSettings {
    match SimSettings::load(path) {
        Ok(settings) => settings,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let settings = SimSettings::default();
            if let Err(save_err) = settings.save(path) {
                warn!(
                    "Failed to create default settings at {}: {save_err}",
                    path.display()
                );
            }
            settings
        }
        Err(err) => {
            warn!("Failed to load settings from {}: {err}", path.display());
            let settings = SimSettings::default();
            if let Err(save_err) = settings.save(path) {
                warn!(
                    "Failed to overwrite settings at {}: {save_err}",
                    path.display()
                );
            }
            settings
        }
    }
}
