//! Codec configuration.

use serde::{Deserialize, Serialize};

/// Layout and safety knobs shared by export and import sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Spaces per nesting level
    pub indent: usize,
    /// Equal values allowed on one originating chain before emission is abandoned
    pub dead_loop_threshold: usize,
    /// Name of the root container element
    pub root_tag: String,
    /// Write the `<?xml ...?>` declaration before the root element
    pub write_declaration: bool,
    /// Format version written on the root element
    pub version: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            indent: 1,
            dead_loop_threshold: 7,
            root_tag: "recast".to_string(),
            write_declaration: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl CodecConfig {
    /// Parse a JSON configuration; absent fields keep their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON for this shape
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
