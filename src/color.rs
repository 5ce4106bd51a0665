//! Color types and the RGB/HSL conversions.
//!
//! `Rgba8` is the unpacked form every pixel format decodes to. Primitive
//! drawing routines take colors in the packed `0xRRGGBBAA` layout used by
//! SDL_gfx; [`Rgba8::from_gfx`] and [`Rgba8::to_gfx`] convert between the
//! two.

// ============================================================================
// Rgba8 (8-bit per channel)
// ============================================================================

/// RGBA color with u8 components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn new_opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Unpack a `0xRRGGBBAA` color.
    pub const fn from_gfx(c: u32) -> Self {
        Self {
            r: (c >> 24) as u8,
            g: (c >> 16) as u8,
            b: (c >> 8) as u8,
            a: c as u8,
        }
    }

    /// Pack into `0xRRGGBBAA`.
    pub const fn to_gfx(self) -> u32 {
        (self.r as u32) << 24 | (self.g as u32) << 16 | (self.b as u32) << 8 | self.a as u32
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// Channel-wise `255 - c` on the color channels, alpha kept.
    pub fn inverted(self) -> Self {
        Self::new(!self.r, !self.g, !self.b, self.a)
    }

    /// Interpolate `d` towards `s` by `a/256`, the blend step used by the
    /// primitive pixel writers: `d + ((s - d) * a >> 8)`.
    #[inline]
    pub fn gfx_lerp(d: u8, s: u8, a: u8) -> u8 {
        (d as i32 + (((s as i32 - d as i32) * a as i32) >> 8)) as u8
    }

    /// Squared RGB distance, used for nearest-palette lookup.
    #[inline]
    pub fn rgb_distance_sq(&self, other: &Rgba8) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

// ============================================================================
// HSL
// ============================================================================

/// Hue, saturation and lightness, each normalized to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

/// Convert 8-bit RGB to normalized HSL.
///
/// Achromatic input (`max == min`) yields `h = s = 0`.
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> Hsl {
    let r1 = r as f32 / 255.0;
    let g1 = g as f32 / 255.0;
    let b1 = b as f32 / 255.0;

    let min = r1.min(g1).min(b1);
    let max = r1.max(g1).max(b1);
    let delta = max - min;
    let l = (max + min) / 2.0;

    if delta == 0.0 {
        return Hsl { h: 0.0, s: 0.0, l };
    }

    let s = if l > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };

    let mut h = if max == r1 {
        (g1 - b1) / delta + if g1 < b1 { 6.0 } else { 0.0 }
    } else if max == g1 {
        (b1 - r1) / delta + 2.0
    } else {
        (r1 - g1) / delta + 4.0
    };
    h /= 6.0;

    Hsl { h, s, l }
}

#[inline]
fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

#[inline]
fn unit_to_u8(v: f32) -> u8 {
    (v * 255.0 + 0.5).clamp(0.0, 255.0) as u8
}

/// Convert normalized HSL back to 8-bit RGB, rounding to nearest.
pub fn hsl_to_rgb(hsl: Hsl) -> (u8, u8, u8) {
    let Hsl { h, s, l } = hsl;
    if s == 0.0 {
        let v = unit_to_u8(l);
        return (v, v, v);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    (
        unit_to_u8(hue_to_rgb(p, q, h + 1.0 / 3.0)),
        unit_to_u8(hue_to_rgb(p, q, h)),
        unit_to_u8(hue_to_rgb(p, q, h - 1.0 / 3.0)),
    )
}

impl Hsl {
    /// Apply hue/saturation/lightness deltas.
    ///
    /// Hue is additive and wraps around; saturation scales by `1 + ds`;
    /// lightness moves towards black for negative `dl` and towards white
    /// for positive `dl`. Zero deltas leave the component untouched.
    pub fn adjusted(self, dh: f32, ds: f32, dl: f32) -> Hsl {
        let Hsl { mut h, mut s, mut l } = self;
        if dh != 0.0 {
            h += dh;
            if h > 1.0 {
                h -= 1.0;
            } else if h < 0.0 {
                h += 1.0;
            }
        }
        if ds != 0.0 {
            s = (s * (1.0 + ds)).clamp(0.0, 1.0);
        }
        if dl != 0.0 {
            l = if dl < 0.0 { l * (1.0 + dl) } else { l * (1.0 - dl) + dl };
            l = l.clamp(0.0, 1.0);
        }
        Hsl { h, s, l }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_gfx_packing() {
        let c = Rgba8::from_gfx(0x11223344);
        assert_eq!(c, Rgba8::new(0x11, 0x22, 0x33, 0x44));
        assert_eq!(c.to_gfx(), 0x11223344);
    }

    #[test]
    fn test_gfx_lerp() {
        assert_eq!(Rgba8::gfx_lerp(0, 255, 255), 254);
        assert_eq!(Rgba8::gfx_lerp(100, 100, 77), 100);
        assert_eq!(Rgba8::gfx_lerp(200, 0, 128), 100);
        assert_eq!(Rgba8::gfx_lerp(0, 200, 128), 100);
    }

    #[test]
    fn test_inverted_keeps_alpha() {
        let c = Rgba8::new(200, 100, 50, 77).inverted();
        assert_eq!(c, Rgba8::new(55, 155, 205, 77));
    }

    #[test]
    fn test_hsl_primaries() {
        let red = rgb_to_hsl(255, 0, 0);
        assert_eq!(red.h, 0.0);
        assert!((red.s - 1.0).abs() < 1e-6);
        assert!((red.l - 0.5).abs() < 1e-6);

        let green = rgb_to_hsl(0, 255, 0);
        assert!((green.h - 1.0 / 3.0).abs() < 1e-6);

        let blue = rgb_to_hsl(0, 0, 255);
        assert!((blue.h - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_hsl_achromatic() {
        let gray = rgb_to_hsl(128, 128, 128);
        assert_eq!(gray.h, 0.0);
        assert_eq!(gray.s, 0.0);
        assert_eq!(hsl_to_rgb(gray), (128, 128, 128));
    }

    #[test]
    fn test_hsl_round_trip_grid() {
        for r in (0..=255u32).step_by(5) {
            for g in (0..=255u32).step_by(7) {
                for b in (0..=255u32).step_by(11) {
                    let (r, g, b) = (r as u8, g as u8, b as u8);
                    let (r2, g2, b2) = hsl_to_rgb(rgb_to_hsl(r, g, b));
                    assert!((r as i32 - r2 as i32).abs() <= 1, "{r},{g},{b}");
                    assert!((g as i32 - g2 as i32).abs() <= 1, "{r},{g},{b}");
                    assert!((b as i32 - b2 as i32).abs() <= 1, "{r},{g},{b}");
                }
            }
        }
    }

    #[quickcheck]
    fn hsl_round_trip_within_one(r: u8, g: u8, b: u8) -> bool {
        let (r2, g2, b2) = hsl_to_rgb(rgb_to_hsl(r, g, b));
        (r as i32 - r2 as i32).abs() <= 1
            && (g as i32 - g2 as i32).abs() <= 1
            && (b as i32 - b2 as i32).abs() <= 1
    }

    #[test]
    fn test_hsl_adjust_lightness() {
        let base = rgb_to_hsl(100, 50, 25);
        let white = base.adjusted(0.0, 0.0, 1.0);
        assert_eq!(hsl_to_rgb(white), (255, 255, 255));
        let black = base.adjusted(0.0, 0.0, -1.0);
        assert_eq!(hsl_to_rgb(black), (0, 0, 0));
    }

    #[test]
    fn test_hsl_adjust_hue_wraps() {
        let h = Hsl { h: 0.9, s: 1.0, l: 0.5 }.adjusted(0.2, 0.0, 0.0);
        assert!((h.h - 0.1).abs() < 1e-5);
        let h = Hsl { h: 0.1, s: 1.0, l: 0.5 }.adjusted(-0.2, 0.0, 0.0);
        assert!((h.h - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_hsl_adjust_saturation_clamps() {
        let h = Hsl { h: 0.3, s: 0.8, l: 0.5 }.adjusted(0.0, 1.0, 0.0);
        assert_eq!(h.s, 1.0);
        let h = Hsl { h: 0.3, s: 0.8, l: 0.5 }.adjusted(0.0, -1.0, 0.0);
        assert_eq!(h.s, 0.0);
    }
}
