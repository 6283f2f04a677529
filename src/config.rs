use crate::density::DEFAULT_RESOLUTION;
use crate::reliability::{MAX_SLOT_COUNT, MAX_WINDOW_HOURS, ReliabilityConfig};
use crate::selection::{MapContext, SelectionConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    // quiet period before a viewport move commits
    pub debounce_ms: u64,
    pub selection: SelectionConfig,
    pub reliability: ReliabilityConfig,
    // H3 resolution the density service aggregates at
    pub density_resolution: u8,
    // None means global search results are not capped client side
    pub max_global_results: Option<usize>,
    pub map_context: MapContext,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            selection: SelectionConfig::default(),
            reliability: ReliabilityConfig::default(),
            density_resolution: DEFAULT_RESOLUTION,
            max_global_results: None,
            map_context: MapContext::default(),
        }
    }
}

impl EngineConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_ron_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::Invalid("debounce_ms must be positive".to_string()));
        }
        if self.reliability.slot_count == 0 {
            return Err(ConfigError::Invalid("reliability.slot_count must be positive".to_string()));
        }
        if self.reliability.window_hours == 0 {
            return Err(ConfigError::Invalid("reliability.window_hours must be positive".to_string()));
        }
        if self.reliability.window_hours > MAX_WINDOW_HOURS {
            return Err(ConfigError::Invalid(format!(
                "reliability.window_hours {} is above the maximum of {}",
                self.reliability.window_hours, MAX_WINDOW_HOURS
            )));
        }
        if self.reliability.slot_count > MAX_SLOT_COUNT {
            return Err(ConfigError::Invalid(format!(
                "reliability.slot_count {} is above the maximum of {}",
                self.reliability.slot_count, MAX_SLOT_COUNT
            )));
        }
        if self.density_resolution > 15 {
            return Err(ConfigError::Invalid(format!(
                "density_resolution {} is above the H3 maximum of 15",
                self.density_resolution
            )));
        }

        let zooms = [
            ("selection.overview_close_zoom", self.selection.overview_close_zoom),
            ("selection.explorer_close_zoom", self.selection.explorer_close_zoom),
            ("selection.cluster_zoom_increment", self.selection.cluster_zoom_increment),
        ];
        for (name, value) in zooms {
            if !value.is_finite() || value < 0.0 || value > self.selection.max_zoom {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0 and max_zoom ({}), got {}",
                    name, self.selection.max_zoom, value
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.reliability.slot_count, 48);
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = EngineConfig::from_ron_str(
            "(debounce_ms: 250, map_context: overview, selection: (overview_close_zoom: 11.0))",
        )
        .unwrap();

        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.map_context, MapContext::Overview);
        assert_eq!(config.selection.overview_close_zoom, 11.0);
        assert_eq!(config.selection.explorer_close_zoom, 14.0);
        assert_eq!(config.reliability, ReliabilityConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            EngineConfig::from_ron_str("(reliability: (slot_count: 0))"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_ron_str("(reliability: (window_hours: 3000000000))"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_ron_str("(reliability: (slot_count: 4000000000))"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(EngineConfig::from_ron_str("(reliability: (window_hours: 8784, slot_count: 10000))").is_ok());
        assert!(matches!(
            EngineConfig::from_ron_str("(density_resolution: 16)"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_ron_str("(selection: (explorer_close_zoom: 25.0))"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_ron_str("(debounce_ms: \"fast\")"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = EngineConfig::from_ron_file(Path::new("/nonexistent/fleetmap.ron")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/fleetmap.ron"));
    }
}
