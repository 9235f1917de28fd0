use serde::{Deserialize, Serialize};

use crate::effect::Effect;
use crate::error::ConfigError;

pub const DEFAULT_SIZE: u32 = 64;

/// Construction inputs for one effect renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    pub src: String,
    pub width: u32,
    pub height: u32,
    /// Effect name; unknown names fall back to refraction when resolved.
    pub effect: String,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            src: String::new(),
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            effect: Effect::default().name().to_owned(),
        }
    }
}

impl EffectConfig {
    pub fn new(src: impl Into<String>, width: u32, height: u32, effect: &str) -> Self {
        Self {
            src: src.into(),
            width,
            height,
            effect: effect.to_owned(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.src.trim().is_empty() {
            return Err(ConfigError::Invalid("src must not be empty".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "surface must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn resolved_effect(&self) -> Effect {
        Effect::from_name(&self.effect)
    }
}
