//! Lighting system
//!
//! Lights are read-only inputs to the planar shadow projection; the light
//! type decides which projection is built.

use crate::foundation::math::Vec3;

/// Light types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    /// Directional light (like sunlight)
    Directional,
    /// Point light (like a lightbulb)
    Point,
    /// Spot light (like a flashlight)
    Spot,
}

/// Distance attenuation `1 / (constant + linear * d + quadratic * d²)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    /// Constant term
    pub constant: f32,
    /// Linear term
    pub linear: f32,
    /// Quadratic term
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self { constant: 1.0, linear: 0.0, quadratic: 0.0 }
    }
}

/// Light source
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Light type
    pub light_type: LightType,
    /// Light position (for point/spot lights)
    pub position: Vec3,
    /// Light direction (for directional/spot lights), unit length
    pub direction: Vec3,
    /// Ambient color
    pub ambient: Vec3,
    /// Diffuse color
    pub diffuse: Vec3,
    /// Specular color
    pub specular: Vec3,
    /// Distance attenuation (point/spot lights)
    pub attenuation: Attenuation,
    /// Outer cone angle for spot lights (in radians)
    pub spot_angle: f32,
    /// Spot falloff exponent
    pub spot_exponent: f32,
}

impl Light {
    /// Create a directional light
    pub fn directional(direction: Vec3, color: Vec3) -> Self {
        Self {
            light_type: LightType::Directional,
            position: Vec3::zeros(),
            direction: direction.normalize(),
            ambient: Vec3::zeros(),
            diffuse: color,
            specular: color,
            attenuation: Attenuation::default(),
            spot_angle: 0.0,
            spot_exponent: 0.0,
        }
    }

    /// Create a point light
    pub fn point(position: Vec3, color: Vec3, attenuation: Attenuation) -> Self {
        Self {
            light_type: LightType::Point,
            position,
            direction: Vec3::zeros(),
            ambient: Vec3::zeros(),
            diffuse: color,
            specular: color,
            attenuation,
            spot_angle: 0.0,
            spot_exponent: 0.0,
        }
    }

    /// Create a spot light
    pub fn spot(
        position: Vec3,
        direction: Vec3,
        color: Vec3,
        attenuation: Attenuation,
        spot_angle: f32,
        spot_exponent: f32,
    ) -> Self {
        Self {
            light_type: LightType::Spot,
            position,
            direction: direction.normalize(),
            ambient: Vec3::zeros(),
            diffuse: color,
            specular: color,
            attenuation,
            spot_angle,
            spot_exponent,
        }
    }
}
