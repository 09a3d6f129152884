/// Impacts at or below this speed (along the contact normal) are silent.
pub const IMPACT_THRESHOLD: f32 = 0.5;
/// Speed that maps to full intensity.
pub const INTENSITY_NORMALIZER: f32 = 10.0;
/// Gain applied to note dispatches so many simultaneous hits do not clip.
pub const NOTE_GAIN: f32 = 0.5;

/// `None` when `|velocity| <= threshold`, otherwise `min(|velocity| / 10, 1)`.
pub fn map_impact_to_intensity(velocity_along_normal: f32, threshold: f32) -> Option<f32> {
    let speed = velocity_along_normal.abs();
    if !speed.is_finite() || speed <= threshold {
        return None;
    }
    Some((speed / INTENSITY_NORMALIZER).clamp(0.0, 1.0))
}

/// [`map_impact_to_intensity`] with the default threshold.
pub fn impact_intensity(velocity_along_normal: f32) -> Option<f32> {
    map_impact_to_intensity(velocity_along_normal, IMPACT_THRESHOLD)
}

/// Apply an optional material amplification factor; the result stays within `[0, 1]`.
pub fn amplify(intensity: f32, amplification: Option<f32>) -> f32 {
    match amplification {
        Some(factor) if factor.is_finite() && factor >= 0.0 => (intensity * factor).clamp(0.0, 1.0),
        _ => intensity.clamp(0.0, 1.0),
    }
}
