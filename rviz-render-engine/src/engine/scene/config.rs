use std::path::{Path, PathBuf};

use bevy::log::{info, warn};
use bevy::math::Vec2;
use constants::coordinate_system::DEFAULT_FIXED_FRAME;
use constants::interactive_markers::{DEFAULT_NODE_NAME, DEFAULT_TOPIC_ROOT};
use constants::render_settings::{MAP_TOPIC, MARKER_TOPIC, POINT_CLOUD_TOPIC};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Runtime settings for one visualisation scene.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct VisualizationConfig {
    pub fixed_frame: String,
    pub target_frame: Option<String>,
    /// Root of the interactive marker server's topics.
    pub marker_topic_root: String,
    pub marker_topic: String,
    pub point_cloud_topic: String,
    pub map_topic: String,
    /// Offset of the drawing surface inside the window, in pixels.
    pub display_offset: [f32; 2],
    /// Node name the feedback client id is derived from.
    pub node_name: String,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            fixed_frame: DEFAULT_FIXED_FRAME.to_string(),
            target_frame: None,
            marker_topic_root: DEFAULT_TOPIC_ROOT.to_string(),
            marker_topic: MARKER_TOPIC.to_string(),
            point_cloud_topic: POINT_CLOUD_TOPIC.to_string(),
            map_topic: MAP_TOPIC.to_string(),
            display_offset: [0.0, 0.0],
            node_name: DEFAULT_NODE_NAME.to_string(),
        }
    }
}

impl VisualizationConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given, falling back to defaults when it is missing or
    /// unreadable.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::from_file(path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn display_offset(&self) -> Vec2 {
        Vec2::from_array(self.display_offset)
    }
}
