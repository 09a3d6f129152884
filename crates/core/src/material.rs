use serde::{Deserialize, Serialize};

/// Surface tag carried by walls and obstacles. Affects how loud an impact sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Material {
    #[default]
    Standard,
    Wood,
    Metal,
    Rubber,
    Glass,
}

impl Material {
    /// Multiplier applied to impact intensity; `None` leaves it untouched.
    pub fn sound_amplification(self) -> Option<f32> {
        match self {
            Material::Standard => None,
            Material::Wood => Some(0.9),
            Material::Metal => Some(1.3),
            Material::Rubber => Some(0.7),
            Material::Glass => Some(1.15),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Material::Standard => "standard",
            Material::Wood => "wood",
            Material::Metal => "metal",
            Material::Rubber => "rubber",
            Material::Glass => "glass",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_has_no_amplification() {
        assert_eq!(Material::default(), Material::Standard);
        assert_eq!(Material::Standard.sound_amplification(), None);
    }

    #[test]
    fn rubber_dampens_metal_boosts() {
        assert_eq!(Material::Rubber.sound_amplification(), Some(0.7));
        assert_eq!(Material::Metal.sound_amplification(), Some(1.3));
    }
}
