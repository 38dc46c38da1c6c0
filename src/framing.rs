use crate::attractor::Family;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Camera scale used when the config leaves `initial_cam_scale` unset.
pub const DEFAULT_CAM_SCALE: f32 = 100.0;

/// Auto-framing knobs. Built once at startup, then only read.
#[derive(Debug, Clone, PartialEq)]
pub struct FramingConfig {
    /// Per-family framing factor, indexed by [`Family::index`].
    pub base_multipliers: [f32; Family::COUNT],
    pub screen_fill_factor: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub initial_cam_scale: Option<f32>,
    /// Breathing amplitude; 0 disables it.
    pub zoom_oscillation: f32,
    /// Velocity-reactive zoom coefficient; 0 disables it.
    pub dynamic_adjustment: f32,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            base_multipliers: [0.8, 0.8, 2.5, 1.2, 2.5],
            screen_fill_factor: 0.07,
            min_zoom: 60.0,
            max_zoom: 2000.0,
            initial_cam_scale: None,
            zoom_oscillation: 0.0,
            dynamic_adjustment: 0.0,
        }
    }
}

/// A framing value the camera cannot work with.
#[derive(Debug, Clone, PartialEq)]
pub struct FramingError {
    pub key: &'static str,
    pub message: String,
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.key, self.message)
    }
}

impl std::error::Error for FramingError {}

impl FramingConfig {
    /// Loads `path`. Missing or unreadable files give the defaults, and
    /// bad lines or values fall back one by one; loading never fails.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!("config file {} not found, using defaults", path.display());
                Self::default()
            }
            Err(err) => {
                warn!("could not read {}: {err}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Parses `key = value` lines. Lines that do not parse are skipped with
    /// a warning, then [`FramingConfig::sanitized`] repairs out-of-range values.
    pub fn parse(text: &str) -> Self {
        let mut cfg = Self::default();
        for (line_idx, raw) in text.lines().enumerate() {
            let line_no = line_idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key_raw, value_raw)) = line.split_once('=') else {
                warn!("config line {line_no}: expected <key> = <value>, skipping");
                continue;
            };
            let key = key_raw.trim();
            let Some(value) = value_raw
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
            else {
                warn!("config line {line_no}: value for '{key}' is not a finite number, skipping");
                continue;
            };

            if let Some(family) = Family::all()
                .into_iter()
                .find(|f| f.name().eq_ignore_ascii_case(key))
            {
                cfg.base_multipliers[family.index()] = value;
                continue;
            }
            match key {
                "screen_fill_factor" => cfg.screen_fill_factor = value,
                "min_zoom" => cfg.min_zoom = value,
                "max_zoom" => cfg.max_zoom = value,
                "zoom_oscillation" => cfg.zoom_oscillation = value,
                "dynamic_adjustment" => cfg.dynamic_adjustment = value,
                "initial_cam_scale" => {
                    cfg.initial_cam_scale = (value > 0.0).then_some(value);
                }
                _ => debug!("ignoring unknown config key '{key}' at line {line_no}"),
            }
        }

        cfg.sanitized()
    }

    /// Resets every value [`FramingConfig::validate`] would reject to its
    /// default, warning once per key.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.screen_fill_factor > 0.0) {
            warn!(
                "screen_fill_factor must be > 0, got {}; using {}",
                self.screen_fill_factor, defaults.screen_fill_factor
            );
            self.screen_fill_factor = defaults.screen_fill_factor;
        }
        if !(self.min_zoom > 0.0) {
            warn!("min_zoom must be > 0, got {}; using {}", self.min_zoom, defaults.min_zoom);
            self.min_zoom = defaults.min_zoom;
        }
        if !(self.min_zoom <= self.max_zoom) {
            warn!(
                "max_zoom {} is below min_zoom {}; using the default zoom range",
                self.max_zoom, self.min_zoom
            );
            self.max_zoom = defaults.max_zoom;
            if !(self.min_zoom <= self.max_zoom) {
                self.min_zoom = defaults.min_zoom;
            }
        }
        for family in Family::all() {
            let i = family.index();
            if !(self.base_multipliers[i] > 0.0) {
                warn!(
                    "{} multiplier must be > 0, got {}; using {}",
                    family.name(),
                    self.base_multipliers[i],
                    defaults.base_multipliers[i]
                );
                self.base_multipliers[i] = defaults.base_multipliers[i];
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), FramingError> {
        if !(self.screen_fill_factor > 0.0) {
            return Err(FramingError {
                key: "screen_fill_factor",
                message: format!("must be > 0, got {}", self.screen_fill_factor),
            });
        }
        if !(self.min_zoom > 0.0) {
            return Err(FramingError {
                key: "min_zoom",
                message: format!("must be > 0, got {}", self.min_zoom),
            });
        }
        if !(self.min_zoom <= self.max_zoom) {
            return Err(FramingError {
                key: "max_zoom",
                message: format!("must be >= min_zoom ({} < {})", self.max_zoom, self.min_zoom),
            });
        }
        if let Some(family) = Family::all()
            .into_iter()
            .find(|f| !(self.base_multipliers[f.index()] > 0.0))
        {
            return Err(FramingError {
                key: "base multiplier",
                message: format!(
                    "{} must be > 0, got {}",
                    family.name(),
                    self.base_multipliers[family.index()]
                ),
            });
        }
        Ok(())
    }

    pub fn base_multiplier(&self, family: Family) -> f32 {
        self.base_multipliers[family.index()]
    }

    pub fn initial_scale(&self) -> f32 {
        self.initial_cam_scale.unwrap_or(DEFAULT_CAM_SCALE)
    }

    /// One-line summary for startup logging.
    pub fn summary(&self) -> String {
        let mults = Family::all()
            .iter()
            .map(|f| format!("{}={:.2}", f.name().to_ascii_lowercase(), self.base_multiplier(*f)))
            .collect::<Vec<_>>()
            .join(" ");
        format!(
            "{mults} screen_fill={:.3} min_zoom={:.1} max_zoom={:.1}",
            self.screen_fill_factor, self.min_zoom, self.max_zoom
        )
    }
}
