//! Scanline polygon filling, polygon outlines and pie slices.
//!
//! Filling walks every integer row between the extreme vertices, collects
//! the x-intersections of the non-horizontal edges in 16.16 fixed point,
//! sorts them and fills between consecutive pairs. An edge counts on a row
//! when `y1 <= y < y2` (top inclusive, bottom exclusive) so shared vertices
//! are not counted twice; the bottom-most row is the exception and also
//! accepts `y == y2`.
//!
//! The intersection list lives in a [`RasterContext`] that only grows. Pass
//! your own context when drawing from several threads; the free functions
//! share a process-wide default behind a mutex.

use std::sync::Mutex;

use lazy_static::lazy_static;
use log::debug;

use crate::basics::RectI;
use crate::blit::blit;
use crate::color::Rgba8;
use crate::error::{Error, Result};
use crate::primitives::{hline, line};
use crate::surface::Surface;

// ============================================================================
// RasterContext
// ============================================================================

/// Scratch state for the polygon scanline filler.
#[derive(Debug, Default)]
pub struct RasterContext {
    ints: Vec<i64>,
}

lazy_static! {
    static ref DEFAULT_CONTEXT: Mutex<RasterContext> = Mutex::new(RasterContext::new());
}

/// Run `f` with the process-wide default context.
pub fn with_default_context<R>(f: impl FnOnce(&mut RasterContext) -> R) -> R {
    let mut guard = DEFAULT_CONTEXT.lock().unwrap_or_else(|e| e.into_inner());
    f(&mut guard)
}

impl RasterContext {
    pub fn new() -> Self {
        Self { ints: Vec::new() }
    }

    /// Number of intersections the scratch buffer holds without growing.
    pub fn capacity(&self) -> usize {
        self.ints.capacity()
    }

    fn reserve(&mut self, n: usize) -> Result<()> {
        if self.ints.capacity() >= n {
            return Ok(());
        }
        self.ints.clear();
        self.ints
            .try_reserve_exact(n)
            .map_err(|_| Error::alloc(format!("polygon scratch for {n} edges")))?;
        debug!("polygon scratch grown to {} intersections", self.ints.capacity());
        Ok(())
    }

    /// Walk the scanlines of `points`, handing each filled span
    /// `(xa, xb, y)` to `span`.
    fn scan<F>(&mut self, points: &[(i32, i32)], mut span: F) -> Result<()>
    where
        F: FnMut(i32, i32, i32) -> Result<()>,
    {
        let n = points.len();
        self.reserve(n)?;
        let miny = points.iter().map(|p| p.1).min().unwrap_or(0);
        let maxy = points.iter().map(|p| p.1).max().unwrap_or(-1);

        for y in miny..=maxy {
            self.ints.clear();
            for i in 0..n {
                let prev = if i == 0 { n - 1 } else { i - 1 };
                let (xa, ya) = points[prev];
                let (xb, yb) = points[i];
                let (x1, y1, x2, y2) = match ya.cmp(&yb) {
                    std::cmp::Ordering::Less => (xa, ya, xb, yb),
                    std::cmp::Ordering::Greater => (xb, yb, xa, ya),
                    std::cmp::Ordering::Equal => continue,
                };
                if (y >= y1 && y < y2) || (y == maxy && y > y1 && y <= y2) {
                    let (x1, y1, x2, y2) = (x1 as i64, y1 as i64, x2 as i64, y2 as i64);
                    let yy = y as i64;
                    self.ints.push(((65536 * (yy - y1)) / (y2 - y1)) * (x2 - x1) + 65536 * x1);
                }
            }
            self.ints.sort_unstable();
            for pair in self.ints.chunks_exact(2) {
                let xa = pair[0] + 1;
                let xa = (xa >> 16) + ((xa & 32768) >> 15);
                let xb = pair[1] - 1;
                let xb = (xb >> 16) + ((xb & 32768) >> 15);
                span(xa as i32, xb as i32, y)?;
            }
        }
        Ok(())
    }

    /// Fill the polygon through `points` (at least 3) with `color`.
    pub fn fill_polygon(&mut self, surf: &mut Surface, points: &[(i32, i32)], color: Rgba8) -> Result<()> {
        check_points(points)?;
        if !surf.clip_rect().is_valid() {
            return Ok(());
        }
        self.scan(points, |xa, xb, y| hline(surf, xa, xb, y, color))
    }

    /// Fill the polygon through `points` with pixels tiled from `texture`.
    ///
    /// The texture repeats in both directions; (`texture_dx`, `texture_dy`)
    /// shift the tiling. Each span is split into texture-row blits at the
    /// tile seams, so the texture's colorkey and blending apply.
    pub fn textured_polygon(
        &mut self,
        surf: &mut Surface,
        points: &[(i32, i32)],
        texture: &Surface,
        texture_dx: i32,
        texture_dy: i32,
    ) -> Result<()> {
        check_points(points)?;
        if !surf.clip_rect().is_valid() || texture.width() == 0 || texture.height() == 0 {
            return Ok(());
        }
        let minx = points.iter().map(|p| p.0).min().unwrap_or(0);
        let maxx = points.iter().map(|p| p.0).max().unwrap_or(0);
        let miny = points.iter().map(|p| p.1).min().unwrap_or(0);
        let maxy = points.iter().map(|p| p.1).max().unwrap_or(0);
        if maxx < 0 || minx > surf.width() as i32 || maxy < 0 || miny > surf.height() as i32 {
            return Ok(());
        }
        self.scan(points, |xa, xb, y| textured_span(surf, xa, xb, y, texture, texture_dx, texture_dy))
    }
}

fn check_points(points: &[(i32, i32)]) -> Result<()> {
    if points.len() < 3 {
        return Err(Error::invalid(format!("polygon needs 3 points, got {}", points.len())));
    }
    Ok(())
}

/// Blit one textured span, wrapping at the texture's right edge.
fn textured_span(
    surf: &mut Surface,
    x1: i32,
    x2: i32,
    y: i32,
    texture: &Surface,
    texture_dx: i32,
    texture_dy: i32,
) -> Result<()> {
    let clip = surf.clip_rect();
    let (mut x1, mut x2) = (x1.min(x2), x1.max(x2));
    if x2 < clip.x1 || x1 > clip.x2 || y < clip.y1 || y > clip.y2 {
        return Ok(());
    }
    x1 = x1.max(clip.x1);
    x2 = x2.min(clip.x2);

    let tw = texture.width() as i32;
    let th = texture.height() as i32;
    let w = x2 - x1 + 1;
    let tx = (x1 - texture_dx).rem_euclid(tw);
    let ty = (y + texture_dy).rem_euclid(th);

    if w <= tw - tx {
        blit(texture, surf, x1, y, Some(RectI::from_xywh(tx, ty, w, 1)))?;
        return Ok(());
    }
    let mut written = tw - tx;
    blit(texture, surf, x1, y, Some(RectI::from_xywh(tx, ty, written, 1)))?;
    while written < w {
        let seg = tw.min(w - written);
        blit(texture, surf, x1 + written, y, Some(RectI::from_xywh(0, ty, seg, 1)))?;
        written += seg;
    }
    Ok(())
}

// ============================================================================
// Free functions over the default context
// ============================================================================

/// Fill a polygon using the shared default context.
pub fn fill_polygon(surf: &mut Surface, points: &[(i32, i32)], color: Rgba8) -> Result<()> {
    with_default_context(|ctx| ctx.fill_polygon(surf, points, color))
}

/// Texture-fill a polygon using the shared default context.
pub fn textured_polygon(
    surf: &mut Surface,
    points: &[(i32, i32)],
    texture: &Surface,
    texture_dx: i32,
    texture_dy: i32,
) -> Result<()> {
    with_default_context(|ctx| ctx.textured_polygon(surf, points, texture, texture_dx, texture_dy))
}

/// Closed polygon outline made of exact lines.
pub fn polygon(surf: &mut Surface, points: &[(i32, i32)], color: Rgba8) -> Result<()> {
    check_points(points)?;
    if !surf.clip_rect().is_valid() {
        return Ok(());
    }
    for (i, &(x1, y1)) in points.iter().enumerate() {
        let (x2, y2) = points[(i + 1) % points.len()];
        line(surf, x1, y1, x2, y2, color)?;
    }
    Ok(())
}

/// Triangle outline.
pub fn trigon(surf: &mut Surface, p1: (i32, i32), p2: (i32, i32), p3: (i32, i32), color: Rgba8) -> Result<()> {
    polygon(surf, &[p1, p2, p3], color)
}

/// Filled triangle.
pub fn filled_trigon(
    surf: &mut Surface,
    p1: (i32, i32),
    p2: (i32, i32),
    p3: (i32, i32),
    color: Rgba8,
) -> Result<()> {
    fill_polygon(surf, &[p1, p2, p3], color)
}

// ============================================================================
// Pie slices
// ============================================================================

/// Vertices of a pie slice: the centre followed by arc points every
/// `3 / rad` radians from `start` to `end` degrees.
fn pie_vertices(x: i32, y: i32, rad: i32, start: i32, end: i32) -> Result<Vec<(i32, i32)>> {
    let dr = rad as f64;
    let delta = 3.0 / dr;
    let start_angle = start as f64 * (2.0 * std::f64::consts::PI / 360.0);
    let mut end_angle = end as f64 * (2.0 * std::f64::consts::PI / 360.0);
    if start > end {
        end_angle += 2.0 * std::f64::consts::PI;
    }

    let mut count = 2usize;
    let mut angle = start_angle;
    while angle < end_angle {
        angle += delta;
        count += 1;
    }

    let mut v = Vec::new();
    v.try_reserve_exact(count)
        .map_err(|_| Error::alloc(format!("pie vertex buffer of {count} points")))?;
    let arc_point = |a: f64| (x + (dr * a.cos()) as i32, y + (dr * a.sin()) as i32);
    v.push((x, y));
    v.push(arc_point(start_angle));
    let mut angle = start_angle;
    while v.len() < count {
        angle += delta;
        if angle > end_angle {
            angle = end_angle;
        }
        v.push(arc_point(angle));
    }
    Ok(v)
}

fn pie_impl(surf: &mut Surface, x: i32, y: i32, rad: i32, start: i32, end: i32, color: Rgba8, filled: bool) -> Result<()> {
    if rad < 0 {
        return Err(Error::invalid(format!("negative pie radius {rad}")));
    }
    let clip = surf.clip_rect();
    if !clip.is_valid() {
        return Ok(());
    }
    let start = start % 360;
    let end = end % 360;
    if rad == 0 {
        return crate::primitives::pixel(surf, x, y, color);
    }
    if x + rad < clip.x1 || x - rad > clip.x2 || y + rad < clip.y1 || y - rad > clip.y2 {
        return Ok(());
    }

    let v = pie_vertices(x, y, rad, start, end)?;
    if v.len() < 3 {
        return line(surf, v[0].0, v[0].1, v[1].0, v[1].1, color);
    }
    if filled {
        fill_polygon(surf, &v, color)
    } else {
        polygon(surf, &v, color)
    }
}

/// Pie slice outline between `start` and `end` degrees.
pub fn pie(surf: &mut Surface, x: i32, y: i32, rad: i32, start: i32, end: i32, color: Rgba8) -> Result<()> {
    pie_impl(surf, x, y, rad, start, end, color, false)
}

/// Filled pie slice between `start` and `end` degrees.
pub fn filled_pie(surf: &mut Surface, x: i32, y: i32, rad: i32, start: i32, end: i32, color: Rgba8) -> Result<()> {
    pie_impl(surf, x, y, rad, start, end, color, true)
}
