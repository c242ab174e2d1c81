//! Color conversions shared by every pipeline stage.
//!
//! All similarity decisions in the crate go through OKLab: sRGB bytes are
//! gamma-decoded, mixed into a cone-response space, compressed by cube root
//! and mixed again, so plain Euclidean distance approximates perceived
//! difference. The heavy lifting is delegated to the `palette` crate; Lab
//! triples cross module boundaries as `[f32; 3]` so DTOs stay serde-plain.

use palette::{FromColor, LinSrgb, Oklab, Srgb};

/// Parse `#RRGGBB`, `RRGGBB`, `#RGB` or `RGB`. Shorthand digits are expanded
/// by doubling (`#F80` -> `#FF8800`). Returns `None` on malformed input.
pub fn hex_to_rgb(hex: &str) -> Option<[u8; 3]> {
    let trimmed = hex.trim().trim_start_matches('#');
    match trimmed.len() {
        3 => {
            let mut out = [0u8; 3];
            for (i, c) in trimmed.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 16 + v;
            }
            Some(out)
        }
        6 => {
            let r = u8::from_str_radix(&trimmed[0..2], 16).ok()?;
            let g = u8::from_str_radix(&trimmed[2..4], 16).ok()?;
            let b = u8::from_str_radix(&trimmed[4..6], 16).ok()?;
            Some([r, g, b])
        }
        _ => None,
    }
}

pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

/// Forward transform: sRGB bytes -> OKLab triple.
pub fn rgb_to_oklab(rgb: [u8; 3]) -> [f32; 3] {
    let linear: LinSrgb<f32> = Srgb::new(rgb[0], rgb[1], rgb[2]).into_linear();
    let lab = Oklab::from_color(linear);
    [lab.l, lab.a, lab.b]
}

/// Inverse transform: OKLab triple -> sRGB bytes, re-quantized with
/// round-to-nearest and clamped to the displayable range.
pub fn oklab_to_rgb(lab: [f32; 3]) -> [u8; 3] {
    let srgb: Srgb<f32> = Srgb::from_color(Oklab::new(lab[0], lab[1], lab[2]));
    [
        (srgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
        (srgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
        (srgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

/// Euclidean distance in OKLab. The sole perceptual metric used anywhere in
/// the pipeline.
pub fn delta_e(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dl = a[0] - b[0];
    let da = a[1] - b[1];
    let db = a[2] - b[2];
    (dl * dl + da * da + db * db).sqrt()
}

pub fn hex_to_oklab(hex: &str) -> Option<[f32; 3]> {
    hex_to_rgb(hex).map(rgb_to_oklab)
}

pub fn oklab_to_hex(lab: [f32; 3]) -> String {
    rgb_to_hex(oklab_to_rgb(lab))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        for hex in ["#000000", "#FFFFFF", "#FF8000", "#12AB9F", "#0000FF"] {
            let rgb = hex_to_rgb(hex).unwrap();
            assert_eq!(rgb_to_hex(rgb), hex);
        }
    }

    #[test]
    fn test_hex_shorthand_expansion() {
        assert_eq!(hex_to_rgb("#F80"), Some([255, 136, 0]));
        assert_eq!(hex_to_rgb("fff"), Some([255, 255, 255]));
        assert_eq!(hex_to_rgb("#000"), Some([0, 0, 0]));
    }

    #[test]
    fn test_hex_rejects_malformed() {
        assert_eq!(hex_to_rgb(""), None);
        assert_eq!(hex_to_rgb("#12345"), None);
        assert_eq!(hex_to_rgb("#GGGGGG"), None);
        assert_eq!(hex_to_rgb("#1234567"), None);
    }

    #[test]
    fn test_oklab_round_trip_within_one_step() {
        // Sample the 8-bit cube on a coarse grid; exhaustive would be 16M.
        let steps: Vec<u8> = (0..=255).step_by(15).collect();
        for &r in &steps {
            for &g in &steps {
                for &b in &steps {
                    let lab = rgb_to_oklab([r, g, b]);
                    let back = oklab_to_rgb(lab);
                    assert!(
                        (back[0] as i32 - r as i32).abs() <= 1
                            && (back[1] as i32 - g as i32).abs() <= 1
                            && (back[2] as i32 - b as i32).abs() <= 1,
                        "({}, {}, {}) came back as {:?}",
                        r,
                        g,
                        b,
                        back
                    );
                }
            }
        }
    }

    #[test]
    fn test_delta_e_zero_for_identical() {
        let lab = rgb_to_oklab([120, 45, 200]);
        assert_eq!(delta_e(lab, lab), 0.0);
    }

    #[test]
    fn test_delta_e_orders_similarity() {
        let red = rgb_to_oklab([255, 0, 0]);
        let dark_red = rgb_to_oklab([200, 0, 0]);
        let blue = rgb_to_oklab([0, 0, 255]);
        assert!(delta_e(red, dark_red) < delta_e(red, blue));
    }
}
