//! Configuration system
//!
//! Serde-backed configuration structs that can be read from and written to
//! TOML or RON files.

pub use serde::{Serialize, Deserialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;
        Self::load_from_str(path, &contents)
    }

    /// Parse configuration text, choosing the format from the file extension
    fn load_from_str(path: &str, contents: &str) -> Result<Self, ConfigError> {
        if path.ends_with(".toml") {
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values parsed but failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// # Renderer Configuration
///
/// Settings that shape the state cache and the planar effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Log filter handed to `env_logger` by applications
    pub log_level: String,
    /// Bits available in the stencil buffer. Planar effects tag plane `i`
    /// with stencil reference `i + 1`, so at most `2^bits - 1` planes fit.
    pub stencil_bits: u8,
    /// Depth range installed when the renderer starts
    pub default_depth_range: (f32, f32),
    /// Whether counter-clockwise triangles face the viewer
    pub front_face_ccw: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stencil_bits: 8,
            default_depth_range: (0.0, 1.0),
            front_face_ccw: true,
        }
    }
}

impl Config for RendererConfig {}

impl RendererConfig {
    /// Largest stencil reference value a planar effect may use
    pub fn max_stencil_reference(&self) -> u32 {
        if self.stencil_bits >= 32 {
            u32::MAX
        } else {
            (1u32 << self.stencil_bits) - 1
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stencil_bits == 0 {
            return Err(ConfigError::Invalid("stencil_bits must be at least 1".to_string()));
        }
        if self.stencil_bits > 32 {
            return Err(ConfigError::Invalid(format!(
                "stencil_bits {} exceeds 32", self.stencil_bits
            )));
        }
        let (near, far) = self.default_depth_range;
        if !(0.0..=1.0).contains(&near) || !(0.0..=1.0).contains(&far) {
            return Err(ConfigError::Invalid(format!(
                "depth range ({near}, {far}) must lie within [0, 1]"
            )));
        }
        Ok(())
    }
}
