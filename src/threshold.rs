//! Per-channel threshold matching.
//!
//! A source pixel matches when each of its R, G and B channels is within
//! the threshold of the reference: a fixed color, or the pixel at the same
//! position of a second surface. Alpha is not compared.

use crate::color::Rgba8;
use crate::error::{Error, Result};
use crate::surface::Surface;

/// What each source pixel is compared against.
#[derive(Debug, Clone, Copy)]
pub enum ThresholdTarget<'a> {
    Color(Rgba8),
    /// Same size as the source; compared position by position.
    Surface(&'a Surface),
}

/// What happens to the destination pixels selected by the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetBehavior {
    /// Only count matches; no destination is written.
    CountOnly,
    /// Write a flat color.
    SetColor(Rgba8),
    /// Write the reference pixel: the target surface's pixel when
    /// comparing against a surface, otherwise the source pixel.
    CopySource,
}

#[inline]
fn within(a: Rgba8, b: Rgba8, t: Rgba8) -> bool {
    (a.r as i32 - b.r as i32).abs() <= t.r as i32
        && (a.g as i32 - b.g as i32).abs() <= t.g as i32
        && (a.b as i32 - b.b as i32).abs() <= t.b as i32
}

/// Count the source pixels within `threshold` of `target`, writing `dst`
/// according to `behavior`.
///
/// By default the pixels *outside* the threshold are written; with
/// `inverse_set` the matching pixels are. `dst` must be given exactly when
/// `behavior` writes, must have the source's size and must not share
/// memory with the source. Returns the number of matching pixels.
pub fn threshold(
    dst: Option<&mut Surface>,
    src: &Surface,
    target: ThresholdTarget<'_>,
    threshold: Rgba8,
    behavior: SetBehavior,
    inverse_set: bool,
) -> Result<usize> {
    let (w, h) = (src.width(), src.height());
    let writes = behavior != SetBehavior::CountOnly;
    match (&dst, writes) {
        (Some(_), false) => return Err(Error::invalid("counting only, but a destination was given")),
        (None, true) => return Err(Error::invalid("set behavior needs a destination surface")),
        _ => {}
    }
    if let ThresholdTarget::Surface(search) = target {
        if search.width() != w || search.height() != h {
            return Err(Error::incompatible("search surface not the same size as the source"));
        }
    }
    if let Some(d) = &dst {
        if d.width() != w || d.height() != h {
            return Err(Error::incompatible("destination not the same size as the source"));
        }
        if d.shares_memory_with(src) {
            return Err(Error::incompatible("destination overlaps the source"));
        }
    }

    let _src_lock = src.lock();
    let sfmt = src.format();
    let mut dst = dst;
    let mut similar = 0;
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let here = sfmt.decode(src.get_raw(x, y));
            let (reference, copied) = match target {
                ThresholdTarget::Color(c) => (c, here),
                ThresholdTarget::Surface(search) => {
                    let c = search.format().decode(search.get_raw(x, y));
                    (c, c)
                }
            };

            let matched = within(here, reference, threshold);
            if matched {
                similar += 1;
            }
            if matched != inverse_set {
                continue;
            }
            if let Some(d) = dst.as_deref_mut() {
                let c = match behavior {
                    SetBehavior::SetColor(c) => c,
                    _ => copied,
                };
                let v = d.format().encode(c);
                d.put_raw(x, y, v);
            }
        }
    }
    Ok(similar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_format::PixelFormat;

    fn strip(colors: &[Rgba8]) -> Surface {
        let mut s = Surface::new(colors.len() as u32, 1, PixelFormat::argb8888()).unwrap();
        for (x, &c) in colors.iter().enumerate() {
            s.set_color(x as i32, 0, c).unwrap();
        }
        s
    }

    const RED: Rgba8 = Rgba8::new(200, 10, 10, 255);
    const NEAR: Rgba8 = Rgba8::new(195, 15, 10, 255);
    const BLUE: Rgba8 = Rgba8::new(0, 0, 250, 255);

    #[test]
    fn test_count_only() {
        let s = strip(&[RED, NEAR, BLUE]);
        let t = Rgba8::new(5, 5, 5, 0);
        assert_eq!(threshold(None, &s, ThresholdTarget::Color(RED), t, SetBehavior::CountOnly, false).unwrap(), 2);
        let tight = Rgba8::new(0, 0, 0, 0);
        assert_eq!(threshold(None, &s, ThresholdTarget::Color(RED), tight, SetBehavior::CountOnly, false).unwrap(), 1);
    }

    #[test]
    fn test_set_color_outside_by_default() {
        let s = strip(&[RED, NEAR, BLUE]);
        let mut d = strip(&[Rgba8::default(); 3]);
        let white = Rgba8::new(255, 255, 255, 255);
        let t = Rgba8::new(5, 5, 5, 0);
        let n = threshold(Some(&mut d), &s, ThresholdTarget::Color(RED), t, SetBehavior::SetColor(white), false).unwrap();
        assert_eq!(n, 2);
        assert_eq!(d.get_color(0, 0).unwrap(), Rgba8::default());
        assert_eq!(d.get_color(2, 0).unwrap(), white);

        let mut d = strip(&[Rgba8::default(); 3]);
        threshold(Some(&mut d), &s, ThresholdTarget::Color(RED), t, SetBehavior::SetColor(white), true).unwrap();
        assert_eq!(d.get_color(0, 0).unwrap(), white);
        assert_eq!(d.get_color(1, 0).unwrap(), white);
        assert_eq!(d.get_color(2, 0).unwrap(), Rgba8::default());
    }

    #[test]
    fn test_copy_from_search_surface() {
        let s = strip(&[RED, BLUE]);
        let search = strip(&[NEAR, RED]);
        let mut d = strip(&[Rgba8::default(); 2]);
        let t = Rgba8::new(10, 10, 10, 0);
        let n = threshold(Some(&mut d), &s, ThresholdTarget::Surface(&search), t, SetBehavior::CopySource, true).unwrap();
        assert_eq!(n, 1);
        assert_eq!(d.get_color(0, 0).unwrap(), NEAR);
        assert_eq!(d.get_color(1, 0).unwrap(), Rgba8::default());
    }

    #[test]
    fn test_copy_source_pixels() {
        let s = strip(&[RED, BLUE]);
        let mut d = Surface::new(2, 1, PixelFormat::rgb565()).unwrap();
        threshold(Some(&mut d), &s, ThresholdTarget::Color(RED), Rgba8::default(), SetBehavior::CopySource, false).unwrap();
        assert_eq!(d.get_at(0, 0).unwrap(), 0);
        assert_eq!(d.get_at(1, 0).unwrap(), d.format().encode(BLUE));
    }

    #[test]
    fn test_argument_checks() {
        let s = strip(&[RED, BLUE]);
        let mut d = strip(&[RED, BLUE]);
        let t = Rgba8::default();
        let target = ThresholdTarget::Color(RED);
        assert!(matches!(threshold(Some(&mut d), &s, target, t, SetBehavior::CountOnly, false), Err(Error::InvalidArgument(_))));
        assert!(matches!(threshold(None, &s, target, t, SetBehavior::CopySource, false), Err(Error::InvalidArgument(_))));
        let mut wrong = strip(&[RED]);
        assert!(matches!(threshold(Some(&mut wrong), &s, target, t, SetBehavior::CopySource, false), Err(Error::IncompatibleSurfaces(_))));
        let other = strip(&[RED, BLUE, BLUE]);
        assert!(matches!(
            threshold(None, &s, ThresholdTarget::Surface(&other), t, SetBehavior::CountOnly, false),
            Err(Error::IncompatibleSurfaces(_))
        ));
    }
}
