//! Surface-to-surface copy with colorkey, alpha blending and format
//! conversion.
//!
//! The textured polygon filler and the tests rely on this. It covers the
//! common cases of a software blitter:
//!
//! - identical formats without colorkey or blending copy whole row spans;
//! - a colorkey skips matching source pixels;
//! - [`BlendMode::Blend`] composites the source alpha (scaled by the
//!   surface alpha modulation) over the destination;
//! - differing formats convert through [`Rgba8`].

use crate::basics::RectI;
use crate::color::Rgba8;
use crate::error::Result;
use crate::surface::{BlendMode, Surface};

/// Blend one channel: `((s - d) * a + s) >> 8) + d`.
#[inline]
fn blend_channel(s: u8, d: u8, a: u8) -> u8 {
    let (s, d, a) = (s as i32, d as i32, a as i32);
    ((((s - d) * a + s) >> 8) + d) as u8
}

/// Alpha compositing of `s` over `d` with effective source alpha `a`.
#[inline]
pub(crate) fn blend_rgba(s: Rgba8, d: Rgba8, a: u8) -> Rgba8 {
    let out_a = if d.a != 0 {
        (d.a as u32 + a as u32 - d.a as u32 * a as u32 / 255) as u8
    } else {
        a
    };
    Rgba8::new(
        blend_channel(s.r, d.r, a),
        blend_channel(s.g, d.g, a),
        blend_channel(s.b, d.b, a),
        out_a,
    )
}

/// Copy `area` of `src` (whole surface when `None`) so that its top-left
/// corner lands at (`x`, `y`) in `dst`. Only the part inside the
/// destination clip rectangle is written; the written rectangle is
/// returned.
pub fn blit(src: &Surface, dst: &mut Surface, x: i32, y: i32, area: Option<RectI>) -> Result<RectI> {
    let mut from = area.unwrap_or_else(|| src.rect());
    from.normalize();
    // Moving the area origin moves the destination with it.
    let (mut dx, mut dy) = (x, y);
    let src_rect = src.rect();
    if from.x1 < 0 {
        dx -= from.x1;
    }
    if from.y1 < 0 {
        dy -= from.y1;
    }
    if !from.clip(&src_rect) {
        return Ok(RectI::empty());
    }

    let mut to = RectI::from_xywh(dx, dy, from.width(), from.height());
    let unclipped = to;
    if !to.clip(&dst.clip_rect()) {
        return Ok(RectI::empty());
    }
    let sx0 = from.x1 + (to.x1 - unclipped.x1);
    let sy0 = from.y1 + (to.y1 - unclipped.y1);

    if src.shares_memory_with(dst) {
        let tmp = src.copy()?;
        copy_region(&tmp, dst, sx0, sy0, to);
    } else {
        copy_region(src, dst, sx0, sy0, to);
    }
    Ok(to)
}

fn copy_region(src: &Surface, dst: &mut Surface, sx0: i32, sy0: i32, to: RectI) {
    let blend = src.blend_mode() == BlendMode::Blend && (src.format().has_alpha() || src.alpha_mod() != 255);
    let same_format = src.format() == dst.format();
    let sbpp = src.bytes_per_pixel();

    if same_format && !blend && src.colorkey().is_none() {
        let n = to.width() as usize * sbpp;
        for row in 0..to.height() {
            let s = src.offset_of(sx0, sy0 + row);
            let d = dst.offset_of(to.x1, to.y1 + row);
            dst.pixels_mut()[d..d + n].copy_from_slice(&src.pixels()[s..s + n]);
        }
        return;
    }

    let sfmt = src.format();
    let key = src.colorkey();
    let amod = src.alpha_mod() as u32;
    for row in 0..to.height() {
        for col in 0..to.width() {
            let raw = src.get_raw(sx0 + col, sy0 + row);
            if key == Some(raw) {
                continue;
            }
            let (px, py) = (to.x1 + col, to.y1 + row);
            if !blend {
                let v = if same_format { raw } else { dst.format().encode(sfmt.decode(raw)) };
                dst.put_raw(px, py, v);
                continue;
            }
            let s = sfmt.decode(raw);
            let a = (s.a as u32 * amod / 255) as u8;
            if a == 0 {
                continue;
            }
            let d = dst.format().decode(dst.get_raw(px, py));
            let out = blend_rgba(s, d, a);
            let v = dst.format().encode(out);
            dst.put_raw(px, py, v);
        }
    }
}
