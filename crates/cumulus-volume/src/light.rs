use glam::Vec3;

/// A directional light (the sun) the cloud volume can be bound to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels, i.e. the light's forward axis.
    pub forward: Vec3,
    /// Linear RGB color.
    pub color: Vec3,
    pub intensity: f32,
}

/// Light terms as the cloud shader consumes them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightVector {
    /// Unit vector pointing from the volume toward the light.
    pub direction: Vec3,
    /// Color premultiplied by intensity.
    pub color: Vec3,
}

impl LightVector {
    /// Straight-up white light used when no sun is bound.
    pub const DEFAULT: LightVector = LightVector {
        direction: Vec3::Y,
        color: Vec3::ONE,
    };

    pub fn resolve(sun: Option<&DirectionalLight>) -> Self {
        match sun {
            Some(light) => Self {
                direction: (-light.forward).try_normalize().unwrap_or(Vec3::Y),
                color: light.color * light.intensity,
            },
            None => Self::DEFAULT,
        }
    }
}
