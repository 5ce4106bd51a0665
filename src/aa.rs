//! Anti-aliased outlines: Wu lines, ellipses and polygon outlines.
//!
//! Coverage is expressed as an 8-bit weight that scales the color alpha
//! (`a * weight >> 8`) before the pixel is blended, so every routine here
//! also honors the translucency of the requested color.

use crate::basics::lrint;
use crate::clip::clip_line;
use crate::color::Rgba8;
use crate::error::{Error, Result};
use crate::primitives::{hline, line, pixel, pixel_weight, vline};
use crate::surface::Surface;

// ============================================================================
// Wu line
// ============================================================================

/// Number of intensity bits taken from the top of the error accumulator.
const AA_BITS: u32 = 8;

/// Draw an anti-aliased line.
///
/// Interior pixels come in pairs straddling the ideal line with weights
/// `255 - w` and `w`, where `w` is the top byte of a 32-bit error
/// accumulator advanced by `(minor << 16) / major << 16` per major step.
/// The first pixel is always drawn at full color; the last one only when
/// `draw_endpoint` is set, which lets polygon outlines avoid blending
/// shared vertices twice.
pub fn aaline(
    surf: &mut Surface,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    color: Rgba8,
    draw_endpoint: bool,
) -> Result<()> {
    let clip = surf.clip_rect();
    if !clip.is_valid() {
        return Ok(());
    }
    let (mut x1, mut y1, mut x2, mut y2) = (x1, y1, x2, y2);
    if !clip_line(&clip, &mut x1, &mut y1, &mut x2, &mut y2) {
        return Ok(());
    }

    let (mut xx0, mut yy0, mut xx1, mut yy1) = (x1, y1, x2, y2);
    if yy0 > yy1 {
        std::mem::swap(&mut yy0, &mut yy1);
        std::mem::swap(&mut xx0, &mut xx1);
    }
    let mut dx = xx1 - xx0;
    let dy = yy1 - yy0;

    if dx == 0 {
        if draw_endpoint {
            return vline(surf, x1, y1, y2, color);
        }
        if dy > 0 {
            return vline(surf, x1, yy0, yy0 + dy, color);
        }
        return pixel(surf, x1, y1, color);
    }
    if dy == 0 {
        if draw_endpoint {
            return hline(surf, x1, x2, y1, color);
        }
        return hline(surf, xx0, xx0 + dx, y1, color);
    }
    if dx == dy && draw_endpoint {
        return line(surf, x1, y1, x2, y2, color);
    }

    let xdir = if dx >= 0 { 1 } else { -1 };
    dx = dx.abs();

    let intshift = 32 - AA_BITS;
    let mut erracc: u32 = 0;

    pixel(surf, x1, y1, color)?;

    if dy > dx {
        let erradj = ((((dx as u64) << 16) / dy as u64) << 16) as u32;
        let mut x0pxdir = xx0 + xdir;
        for _ in 1..dy {
            let prev = erracc;
            erracc = erracc.wrapping_add(erradj);
            if erracc <= prev {
                xx0 = x0pxdir;
                x0pxdir += xdir;
            }
            yy0 += 1;
            let wgt = (erracc >> intshift) & 255;
            pixel_weight(surf, xx0, yy0, color, 255 - wgt);
            pixel_weight(surf, x0pxdir, yy0, color, wgt);
        }
    } else {
        let erradj = ((((dy as u64) << 16) / dx as u64) << 16) as u32;
        let mut y0p1 = yy0 + 1;
        for _ in 1..dx {
            let prev = erracc;
            erracc = erracc.wrapping_add(erradj);
            if erracc <= prev {
                yy0 = y0p1;
                y0p1 += 1;
            }
            xx0 += xdir;
            let wgt = (erracc >> intshift) & 255;
            pixel_weight(surf, xx0, yy0, color, 255 - wgt);
            pixel_weight(surf, xx0, y0p1, color, wgt);
        }
    }

    if draw_endpoint {
        pixel(surf, x2, y2, color)?;
    }
    Ok(())
}

// ============================================================================
// Ellipse
// ============================================================================

/// Anti-aliased ellipse outline centred on (x, y).
///
/// A midpoint walk tracks the error term `d`; the coverage fraction
/// `|d| / |s|` (first octant pair) or `|d| / |t|` (second pair) becomes the
/// weight of the outer pixel while the inner pixel gets the complement.
/// The walk switches octants after `a² / sqrt(a² + b²)` steps.
pub fn aaellipse(surf: &mut Surface, x: i32, y: i32, rx: i32, ry: i32, color: Rgba8) -> Result<()> {
    if rx < 0 || ry < 0 {
        return Err(Error::invalid(format!("negative ellipse radius ({rx}, {ry})")));
    }
    let clip = surf.clip_rect();
    if !clip.is_valid() {
        return Ok(());
    }
    if rx == 0 {
        return vline(surf, x, y.saturating_sub(ry), y.saturating_add(ry), color);
    }
    if ry == 0 {
        return hline(surf, x.saturating_sub(rx), x.saturating_add(rx), y, color);
    }

    // Error terms grow with the cube of the radius; positions may leave
    // the i32 range for huge radii.
    let (x, y, rx, ry) = (x as i64, y as i64, rx as i64, ry as i64);
    if x + rx < clip.x1 as i64 || x - rx > clip.x2 as i64 || y + ry < clip.y1 as i64 || y - ry > clip.y2 as i64 {
        return Ok(());
    }

    let a2 = rx * rx;
    let b2 = ry * ry;
    let ds = 2 * a2;
    let dt = 2 * b2;
    let xc2 = 2 * x;
    let yc2 = 2 * y;
    let sab = ((a2 + b2) as f64).sqrt();
    let dxt = lrint(a2 as f64 / sab);
    let mut t = 0i64;
    let mut s = -2 * a2 * ry;
    let mut d = 0i64;
    let mut xp = x;
    let mut yp = y - ry;

    pixel(surf, coord(xp), coord(yp), color)?;
    pixel(surf, coord(xc2 - xp), coord(yp), color)?;
    pixel(surf, coord(xp), coord(yc2 - yp), color)?;
    pixel(surf, coord(xc2 - xp), coord(yc2 - yp), color)?;

    let mut plot = |px: i64, py: i64, weight: u32| {
        pixel_weight(surf, coord(px), coord(py), color, weight);
    };

    for _ in 1..=dxt {
        xp -= 1;
        d += t - b2;
        let ys;
        if d >= 0 {
            ys = yp - 1;
        } else if d - s - a2 > 0 {
            if 2 * d - s - a2 >= 0 {
                ys = yp + 1;
            } else {
                ys = yp;
                yp += 1;
                d -= s + a2;
                s += ds;
            }
        } else {
            yp += 1;
            ys = yp + 1;
            d -= s + a2;
            s += ds;
        }
        t -= dt;

        let (weight, iweight) = coverage(d, s);
        let xx = xc2 - xp;
        plot(xp, yp, iweight);
        plot(xx, yp, iweight);
        plot(xp, ys, weight);
        plot(xx, ys, weight);
        let yy = yc2 - yp;
        plot(xp, yy, iweight);
        plot(xx, yy, iweight);
        let yy = yc2 - ys;
        plot(xp, yy, weight);
        plot(xx, yy, weight);
    }

    let dyt = lrint(b2 as f64 / sab);
    for _ in 1..=dyt {
        yp += 1;
        d -= s + a2;
        let xs;
        if d <= 0 {
            xs = xp + 1;
        } else if d + t - b2 < 0 {
            if 2 * d + t - b2 <= 0 {
                xs = xp - 1;
            } else {
                xs = xp;
                xp -= 1;
                d += t - b2;
                t -= dt;
            }
        } else {
            xp -= 1;
            xs = xp - 1;
            d += t - b2;
            t -= dt;
        }
        s += ds;

        let (weight, iweight) = coverage(d, t);
        let xx = xc2 - xp;
        let yy = yc2 - yp;
        plot(xp, yp, iweight);
        plot(xx, yp, iweight);
        plot(xp, yy, iweight);
        plot(xx, yy, iweight);
        let xx = xc2 - xs;
        plot(xs, yp, weight);
        plot(xx, yp, weight);
        plot(xs, yy, weight);
        plot(xx, yy, weight);
    }
    Ok(())
}

/// Saturate a walk position to the pixel coordinate range; anything
/// clamped lies outside every surface.
#[inline]
fn coord(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Weight pair `(w, 255 - w)` for the coverage fraction `|d| / |den|`,
/// clamped to 1.
#[inline]
fn coverage(d: i64, den: i64) -> (u32, u32) {
    let cp = if den != 0 {
        (d.unsigned_abs() as f64 / den.unsigned_abs() as f64).min(1.0)
    } else {
        1.0
    };
    let weight = (cp * 255.0) as u32;
    (weight, 255 - weight)
}

// ============================================================================
// Polygon outlines
// ============================================================================

/// Closed anti-aliased outline through `points`. Each edge is drawn
/// without its endpoint so shared vertices are not blended twice.
pub fn aapolygon(surf: &mut Surface, points: &[(i32, i32)], color: Rgba8) -> Result<()> {
    if points.len() < 3 {
        return Err(Error::invalid(format!("polygon needs 3 points, got {}", points.len())));
    }
    if !surf.clip_rect().is_valid() {
        return Ok(());
    }
    for (i, &(x1, y1)) in points.iter().enumerate() {
        let (x2, y2) = points[(i + 1) % points.len()];
        aaline(surf, x1, y1, x2, y2, color, false)?;
    }
    Ok(())
}

/// Anti-aliased triangle outline.
pub fn aatrigon(
    surf: &mut Surface,
    p1: (i32, i32),
    p2: (i32, i32),
    p3: (i32, i32),
    color: Rgba8,
) -> Result<()> {
    aapolygon(surf, &[p1, p2, p3], color)
}
