//! Effects: shading model plus the render states a drawable is drawn with
//!
//! Shading models are a closed set selected by enum, so drawing never goes
//! through dynamic dispatch.

use crate::foundation::math::Vec4;
use crate::render::state::RenderStates;

/// Opaque handle to a texture owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Material colors for lit shading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialColors {
    /// Emissive color
    pub emissive: Vec4,
    /// Ambient reflectance
    pub ambient: Vec4,
    /// Diffuse reflectance; its alpha is the material's opacity
    pub diffuse: Vec4,
    /// Specular reflectance; alpha holds the shininess exponent
    pub specular: Vec4,
}

impl Default for MaterialColors {
    fn default() -> Self {
        Self {
            emissive: Vec4::new(0.0, 0.0, 0.0, 1.0),
            ambient: Vec4::new(0.2, 0.2, 0.2, 1.0),
            diffuse: Vec4::new(0.8, 0.8, 0.8, 1.0),
            specular: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

/// Shading model
#[derive(Debug, Clone, PartialEq)]
pub enum EffectKind {
    /// Per-vertex colors, no lighting
    VertexColor,
    /// A single constant color
    Unlit {
        /// RGBA color
        color: Vec4,
    },
    /// Lit material
    Material(MaterialColors),
    /// Texture lookup
    Textured {
        /// Texture to sample
        texture: TextureHandle,
    },
}

impl EffectKind {
    /// Color handed to the shader as the diffuse/base color
    pub fn diffuse(&self) -> Vec4 {
        match self {
            Self::Unlit { color } => *color,
            Self::Material(colors) => colors.diffuse,
            Self::VertexColor | Self::Textured { .. } => Vec4::new(1.0, 1.0, 1.0, 1.0),
        }
    }
}

/// Shading model plus render states
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    /// Shading model
    pub kind: EffectKind,
    /// States applied before drawing
    pub states: RenderStates,
}

impl Default for Effect {
    fn default() -> Self {
        Self::new(EffectKind::Material(MaterialColors::default()))
    }
}

impl Effect {
    /// Effect with default render states
    pub fn new(kind: EffectKind) -> Self {
        Self { kind, states: RenderStates::default() }
    }

    /// Constant-color effect
    pub fn unlit(color: Vec4) -> Self {
        Self::new(EffectKind::Unlit { color })
    }

    /// Material whose only contribution is a flat diffuse color, with the
    /// color's alpha as opacity. Used to paint projected shadows.
    pub fn flat_material(color: Vec4) -> Self {
        Self::new(EffectKind::Material(MaterialColors {
            emissive: Vec4::zeros(),
            ambient: Vec4::zeros(),
            diffuse: color,
            specular: Vec4::zeros(),
        }))
    }

    /// Replace the render states
    pub fn with_states(mut self, states: RenderStates) -> Self {
        self.states = states;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_material_diffuse_is_shadow_color() {
        let color = Vec4::new(0.0, 0.0, 0.0, 0.5);
        let effect = Effect::flat_material(color);
        assert_eq!(effect.kind.diffuse(), color);
        assert_eq!(effect.states, RenderStates::default());
    }

    #[test]
    fn test_textured_diffuse_is_white() {
        let effect = Effect::new(EffectKind::Textured { texture: TextureHandle(7) });
        assert_eq!(effect.kind.diffuse(), Vec4::new(1.0, 1.0, 1.0, 1.0));
    }
}
