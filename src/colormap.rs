//! Scalar-to-color encoding for substrate fields.
//!
//! Each named field owns a fixed color ramp chosen so distinct fields
//! stay visually distinguishable when shown one at a time. Alpha is
//! proportional to the normalized value times the caller's opacity, so
//! near-zero regions fade to transparent instead of rendering a flat
//! background wash.

/// Low/high endpoints of a field's color ramp (linear RGB).
fn ramp_for(field: &str) -> ([f32; 3], [f32; 3]) {
    match field {
        // Transport field: low oxygen reads blue, well-perfused reads red
        "oxygen" => ([0.05, 0.15, 0.8], [0.9, 0.15, 0.1]),
        // Drug family ramps toward violet/amber so doses pop against tissue
        "drug" => ([0.1, 0.0, 0.25], [0.7, 0.3, 0.95]),
        "drug_a" => ([0.15, 0.05, 0.3], [0.85, 0.45, 0.95]),
        "drug_b" => ([0.25, 0.12, 0.0], [1.0, 0.75, 0.2]),
        // Pheromone-style signals
        "trail" => ([0.0, 0.12, 0.02], [0.2, 0.95, 0.35]),
        "alarm" | "toxicity_signal" => ([0.2, 0.02, 0.02], [1.0, 0.12, 0.08]),
        "recruitment" | "chemokine_signal" => ([0.02, 0.05, 0.25], [0.25, 0.55, 1.0]),
        // Immune signaling
        "ifn_gamma" => ([0.0, 0.15, 0.15], [0.1, 0.9, 0.9]),
        "tnf_alpha" => ([0.2, 0.1, 0.0], [1.0, 0.55, 0.1]),
        "perforin" => ([0.15, 0.0, 0.12], [0.95, 0.2, 0.75]),
        // Unknown fields still render, on a neutral ramp
        _ => ([0.25, 0.25, 0.25], [0.95, 0.95, 0.95]),
    }
}

/// Encode one scalar as RGBA. `value` is clamped to `[0, max_value]`
/// and normalized; a degenerate `max_value <= 0` is treated as 1.
pub fn encode(value: f32, field: &str, max_value: f32, opacity: f32) -> [f32; 4] {
    let max = if max_value > 0.0 { max_value } else { 1.0 };
    let t = (value / max).clamp(0.0, 1.0);
    let (lo, hi) = ramp_for(field);
    [
        lo[0] + (hi[0] - lo[0]) * t,
        lo[1] + (hi[1] - lo[1]) * t,
        lo[2] + (hi[2] - lo[2]) * t,
        t * opacity.clamp(0.0, 1.0),
    ]
}

/// Encode straight to an RGBA8 texel for texture upload.
pub fn encode_rgba8(value: f32, field: &str, max_value: f32, opacity: f32) -> [u8; 4] {
    let c = encode(value, field, max_value, opacity);
    [
        (c[0] * 255.0).round() as u8,
        (c[1] * 255.0).round() as u8,
        (c[2] * 255.0).round() as u8,
        (c[3] * 255.0).round() as u8,
    ]
}

/// Representative swatch color for the HUD legend (full-value, opaque).
pub fn swatch(field: &str) -> [f32; 3] {
    ramp_for(field).1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_value_is_fully_transparent() {
        for field in ["oxygen", "drug", "trail", "alarm", "something_new"] {
            let c = encode(0.0, field, 10.0, 1.0);
            assert_eq!(c[3], 0.0, "field {field} should fade out at zero");
        }
    }

    #[test]
    fn alpha_is_monotonic_in_value() {
        let mut last = -1.0f32;
        for i in 0..=20 {
            let v = i as f32;
            let c = encode(v, "oxygen", 20.0, 0.8);
            assert!(c[3] >= last, "alpha must not decrease ({v})");
            last = c[3];
        }
        assert!((last - 0.8).abs() < 1e-6, "full value reaches the caller opacity");
    }

    #[test]
    fn value_is_clamped_to_max() {
        let at_max = encode(5.0, "drug", 5.0, 1.0);
        let over = encode(500.0, "drug", 5.0, 1.0);
        assert_eq!(at_max, over);
    }

    #[test]
    fn zero_max_is_treated_as_one() {
        let c = encode(0.5, "trail", 0.0, 1.0);
        assert!(c.iter().all(|v| v.is_finite()));
        assert!((c[3] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn distinct_fields_get_distinct_full_value_colors() {
        let oxygen = encode(1.0, "oxygen", 1.0, 1.0);
        let trail = encode(1.0, "trail", 1.0, 1.0);
        let recruitment = encode(1.0, "recruitment", 1.0, 1.0);
        assert_ne!(&oxygen[..3], &trail[..3]);
        assert_ne!(&trail[..3], &recruitment[..3]);
        assert_ne!(&oxygen[..3], &recruitment[..3]);
    }

    #[test]
    fn rgba8_round_trips_the_float_encoding() {
        let px = encode_rgba8(2.0, "oxygen", 4.0, 1.0);
        let c = encode(2.0, "oxygen", 4.0, 1.0);
        assert_eq!(px[3], (c[3] * 255.0).round() as u8);
    }
}
