//! Runtime settings

use canvas_compositor::RenderConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    #[serde(skip)]
    pub render: RenderConfig,
    /// Factor applied to wheel deltas before they reach scroll offsets
    pub wheel_multiplier: f32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            wheel_multiplier: 1.0,
        }
    }
}

impl RuntimeConfig {
    /// Read settings from a JSON object, keeping defaults for absent fields
    pub fn from_json(value: &serde_json::Value) -> serde_json::Result<Self> {
        Self::deserialize(value)
    }
}
