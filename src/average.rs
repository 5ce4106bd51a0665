//! Averages across surfaces and over a region of one surface.

use crate::basics::RectI;
use crate::color::Rgba8;
use crate::error::{try_zeroed, Error, Result};
use crate::surface::Surface;

// ============================================================================
// Average of several surfaces
// ============================================================================

/// Per-pixel mean of equally sized surfaces, written into a new surface
/// shaped like the first one.
///
/// Channels are summed as `u32` and divided by the surface count,
/// rounding to nearest. When the output and every input are indexed and
/// `palette_colors` is false, the raw indices are averaged instead of the
/// palette colors (grayscale ramps stored as palettes). Output pixels are
/// opaque.
pub fn average_surfaces(surfaces: &[&Surface], palette_colors: bool) -> Result<Surface> {
    let first = surfaces
        .first()
        .ok_or_else(|| Error::invalid("no surfaces to average"))?;
    let mut dst = first.new_like(first.width(), first.height())?;
    average_surfaces_into(surfaces, &mut dst, palette_colors)?;
    Ok(dst)
}

/// Per-pixel mean written into `dst`, which must match the inputs' size.
pub fn average_surfaces_into(surfaces: &[&Surface], dst: &mut Surface, palette_colors: bool) -> Result<()> {
    if surfaces.is_empty() {
        return Err(Error::invalid("no surfaces to average"));
    }
    let (w, h) = (dst.width(), dst.height());
    for s in surfaces {
        if s.width() != w || s.height() != h {
            return Err(Error::incompatible(format!(
                "surface is {}x{}, expected {w}x{h}",
                s.width(),
                s.height()
            )));
        }
        if s.shares_memory_with(dst) {
            return Err(Error::incompatible("destination overlaps an input surface"));
        }
    }

    let by_index = !palette_colors && dst.format().is_indexed() && surfaces.iter().all(|s| s.format().is_indexed());
    let channels = if by_index { 1 } else { 3 };
    let (wu, hu) = (w as usize, h as usize);
    let mut acc = try_zeroed::<u32>(wu * hu * channels, "average accumulator")?;

    for s in surfaces {
        let _lock = s.lock();
        let fmt = s.format();
        for y in 0..hu {
            for x in 0..wu {
                let raw = s.get_raw(x as i32, y as i32);
                let at = (y * wu + x) * channels;
                if by_index {
                    acc[at] += raw;
                } else {
                    let c = fmt.decode(raw);
                    acc[at] += c.r as u32;
                    acc[at + 1] += c.g as u32;
                    acc[at + 2] += c.b as u32;
                }
            }
        }
    }

    let n = surfaces.len() as u32;
    let mean = |sum: u32| ((sum + n / 2) / n).min(255) as u8;
    let _dst_lock = dst.lock();
    let dfmt = dst.format().clone();
    for y in 0..hu {
        for x in 0..wu {
            let at = (y * wu + x) * channels;
            let v = if by_index {
                mean(acc[at]) as u32
            } else {
                dfmt.map_rgb(mean(acc[at]), mean(acc[at + 1]), mean(acc[at + 2]))
            };
            dst.put_raw(x as i32, y as i32, v);
        }
    }
    Ok(())
}

// ============================================================================
// Average color of a region
// ============================================================================

/// Mean color over `rect` (the whole surface when `None`), clamped to the
/// surface. Divisions truncate.
///
/// With `consider_alpha` the color channels are weighted by alpha and
/// normalized by the sum of alphas, so transparent pixels do not pull the
/// color towards black. An empty region averages to transparent black.
pub fn average_color(src: &Surface, rect: Option<RectI>, consider_alpha: bool) -> Result<Rgba8> {
    let mut area = rect.unwrap_or_else(|| src.rect());
    area.normalize();
    if !area.clip(&src.rect()) {
        return Ok(Rgba8::default());
    }

    let _lock = src.lock();
    let fmt = src.format();
    let mut tot = [0u64; 4];
    for y in area.y1..=area.y2 {
        for x in area.x1..=area.x2 {
            let c = fmt.decode(src.get_raw(x, y));
            let weight = if consider_alpha { c.a as u64 } else { 1 };
            tot[0] += c.r as u64 * weight;
            tot[1] += c.g as u64 * weight;
            tot[2] += c.b as u64 * weight;
            tot[3] += c.a as u64;
        }
    }

    let size = (area.width() as u64) * (area.height() as u64);
    let rgb_div = if consider_alpha { tot[3] } else { size };
    let div = |v: u64, d: u64| if d == 0 { 0 } else { (v / d) as u8 };
    Ok(Rgba8::new(
        div(tot[0], rgb_div),
        div(tot[1], rgb_div),
        div(tot[2], rgb_div),
        div(tot[3], size),
    ))
}
