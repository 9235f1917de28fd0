use std::fmt;

use serde::{Deserialize, Serialize};

pub const VERTEX_SHADER: &str = include_str!("shaders/quad.vert");
pub const REFRACTION_SHADER: &str = include_str!("shaders/refraction.frag");
pub const SMOKE_SHADER: &str = include_str!("shaders/smoke.frag");
pub const PIXELATE_SHADER: &str = include_str!("shaders/pixelate.frag");

/// Closed set of distortion effects a renderer can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    #[default]
    Refraction,
    Smoke,
    Pixelate,
}

impl Effect {
    pub const ALL: [Effect; 3] = [Effect::Refraction, Effect::Smoke, Effect::Pixelate];

    /// Resolves an effect by name. Anything unrecognised renders as refraction.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "refraction" => Effect::Refraction,
            "smoke" => Effect::Smoke,
            "pixelate" => Effect::Pixelate,
            other => {
                tracing::debug!(effect = other, "unknown effect name, using refraction");
                Effect::Refraction
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Effect::Refraction => "refraction",
            Effect::Smoke => "smoke",
            Effect::Pixelate => "pixelate",
        }
    }

    pub fn sources(self) -> ShaderSources {
        let fragment = match self {
            Effect::Refraction => REFRACTION_SHADER,
            Effect::Smoke => SMOKE_SHADER,
            Effect::Pixelate => PIXELATE_SHADER,
        };
        ShaderSources {
            vertex: VERTEX_SHADER,
            fragment,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: &'static str,
    pub fragment: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_and_fallback() {
        for effect in Effect::ALL {
            assert_eq!(Effect::from_name(effect.name()), effect);
        }
        assert_eq!(Effect::from_name(""), Effect::Refraction);
        assert_eq!(Effect::from_name("SMOKE"), Effect::Refraction);
        assert_eq!(Effect::from_name("blur"), Effect::Refraction);
    }

    #[test]
    fn every_effect_shares_the_quad_vertex_stage() {
        for effect in Effect::ALL {
            let sources = effect.sources();
            assert_eq!(sources.vertex, VERTEX_SHADER);
            assert!(sources.fragment.contains("uniform float u_time;"));
            assert!(sources.fragment.contains("uniform sampler2D u_texture;"));
        }
    }
}
