//! Runtime settings: optional `pin_drop.{toml,yaml,yml,json}` files in the
//! working directory, overridden by `PIN_DROP_*` environment variables
//! (`PIN_DROP_MAP__SPAN=0.1`, `PIN_DROP_PERMISSION=granted`, ...).

use crate::coordinate::{Coordinate, ViewportRegion};
use crate::screen::MapOptions;
use crate::services::PermissionStatus;
use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const FILE_STEM: &str = "pin_drop";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),
    #[error("location {latitude}, {longitude} is not a valid position")]
    InvalidLocation { latitude: f64, longitude: f64 },
    #[error("map.span must be a positive number of degrees, got {0}")]
    InvalidSpan(f64),
    #[error("map.long_press_ms must be greater than zero")]
    InvalidLongPress,
}

/// How the location permission question gets answered.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PermissionMode {
    #[default]
    Prompt,
    Granted,
    Denied,
}

impl PermissionMode {
    /// Fixed answer, or `None` when the user is asked.
    pub fn preset(self) -> Option<PermissionStatus> {
        match self {
            PermissionMode::Prompt => None,
            PermissionMode::Granted => Some(PermissionStatus::Granted),
            PermissionMode::Denied => Some(PermissionStatus::Denied),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub permission: PermissionMode,
    pub location: LocationSettings,
    pub map: MapSettings,
    pub window: WindowSettings,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LocationSettings {
    pub latitude: f64,
    pub longitude: f64,
    pub acquire_delay_ms: u64,
    pub available: bool,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            latitude: 37.7749,
            longitude: -122.4194,
            acquire_delay_ms: 0,
            available: true,
        }
    }
}

impl LocationSettings {
    pub fn fix(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn acquire_delay(&self) -> Duration {
        Duration::from_millis(self.acquire_delay_ms)
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MapSettings {
    pub span: f64,
    pub long_press_ms: u64,
    pub show_user_location: bool,
    pub show_recenter_control: bool,
    pub show_graticule: bool,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            span: ViewportRegion::DEFAULT_SPAN,
            long_press_ms: 500,
            show_user_location: true,
            show_recenter_control: true,
            show_graticule: true,
        }
    }
}

impl MapSettings {
    pub fn options(&self) -> MapOptions {
        MapOptions {
            show_user_location: self.show_user_location,
            show_recenter_control: self.show_recenter_control,
        }
    }

    pub fn long_press_secs(&self) -> f64 {
        self.long_press_ms as f64 / 1000.0
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WindowSettings {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, SettingsError> {
        let mut b = Config::builder();
        b = add_source_files(b, FILE_STEM);
        b = b.add_source(
            Environment::with_prefix("PIN_DROP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        Self::from_builder(b)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.location.fix().is_valid() {
            return Err(SettingsError::InvalidLocation {
                latitude: self.location.latitude,
                longitude: self.location.longitude,
            });
        }
        if !(self.map.span.is_finite() && self.map.span > 0.0) {
            return Err(SettingsError::InvalidSpan(self.map.span));
        }
        if self.map.long_press_ms == 0 {
            return Err(SettingsError::InvalidLongPress);
        }
        Ok(())
    }
}

fn add_source_files(
    builder: ConfigBuilder<DefaultState>,
    name: &str,
) -> ConfigBuilder<DefaultState> {
    builder
        .add_source(File::new(&format!("{name}.toml"), FileFormat::Toml).required(false))
        .add_source(File::new(&format!("{name}.yaml"), FileFormat::Yaml).required(false))
        .add_source(File::new(&format!("{name}.yml"), FileFormat::Yaml).required(false))
        .add_source(File::new(&format!("{name}.json"), FileFormat::Json).required(false))
}
