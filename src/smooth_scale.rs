//! Smooth scaling for 24- and 32-bit surfaces.
//!
//! Each axis is handled independently: shrinking uses an area-averaging
//! box filter, expanding a bilinear filter. When both axes change, the X
//! pass writes into an intermediate buffer that the Y pass reads. 24-bit
//! pixels are widened to 4 bytes (fourth byte 0xff) for the passes and
//! narrowed again at the end.
//!
//! The filter passes come from the [`simd`](crate::simd) scale family.

use log::trace;

use crate::error::{try_zeroed, Error, Result};
use crate::simd::{self, Backend, KernelFamily, ScaleKernels};
use crate::surface::Surface;

// ============================================================================
// 24 <-> 32 bit staging
// ============================================================================

fn widen_rows(src: &Surface, out: &mut [u8]) {
    let w = src.width() as usize;
    for y in 0..src.height() {
        let dst = &mut out[y as usize * w * 4..(y as usize + 1) * w * 4];
        for (d, s) in dst.chunks_exact_mut(4).zip(src.row(y).chunks_exact(3)) {
            d[..3].copy_from_slice(s);
            d[3] = 0xff;
        }
    }
}

fn narrow_rows(buf: &[u8], dst: &mut Surface) {
    let w = dst.width() as usize;
    for y in 0..dst.height() {
        let src = &buf[y as usize * w * 4..(y as usize + 1) * w * 4];
        for (d, s) in dst.row_mut(y).chunks_exact_mut(3).zip(src.chunks_exact(4)) {
            d.copy_from_slice(&s[..3]);
        }
    }
}

// ============================================================================
// Two-pass driver
// ============================================================================

/// Run the X then Y passes over 4-byte pixels.
#[allow(clippy::too_many_arguments)]
fn scale_passes(
    k: &dyn ScaleKernels,
    src: &[u8],
    src_pitch: usize,
    (sw, sh): (usize, usize),
    dst: &mut [u8],
    dst_pitch: usize,
    (dw, dh): (usize, usize),
) -> Result<()> {
    let both = sw != dw && sh != dh;
    trace!(
        "smooth scale {sw}x{sh} -> {dw}x{dh} on {} (two pass: {both})",
        k.backend()
    );

    let mut temp = if both { try_zeroed::<u8>(dw * 4 * sh, "smooth scale intermediate")? } else { Vec::new() };
    let temp_pitch = dw * 4;

    if dw != sw {
        let (out, out_pitch) = if both { (&mut temp[..], temp_pitch) } else { (&mut dst[..], dst_pitch) };
        if dw < sw {
            k.shrink_x(src, src_pitch, out, out_pitch, sh, sw, dw)?;
        } else {
            k.expand_x(src, src_pitch, out, out_pitch, sh, sw, dw)?;
        }
    }

    if dh != sh {
        let (input, in_pitch) = if both { (&temp[..], temp_pitch) } else { (src, src_pitch) };
        if dh < sh {
            k.shrink_y(input, in_pitch, dst, dst_pitch, dw, sh, dh)?;
        } else {
            k.expand_y(input, in_pitch, dst, dst_pitch, dw, sh, dh)?;
        }
    }
    Ok(())
}

fn smooth_scale_with(k: &dyn ScaleKernels, src: &Surface, dst: &mut Surface) -> Result<()> {
    let (sw, sh) = (src.width() as usize, src.height() as usize);
    let (dw, dh) = (dst.width() as usize, dst.height() as usize);

    if src.bytes_per_pixel() == 4 {
        let (src_pitch, dst_pitch) = (src.pitch(), dst.pitch());
        return scale_passes(k, &src.pixels(), src_pitch, (sw, sh), &mut dst.pixels_mut(), dst_pitch, (dw, dh));
    }

    let mut wide = try_zeroed::<u8>(sw * sh * 4, "smooth scale 32-bit source")?;
    widen_rows(src, &mut wide);
    let mut out = try_zeroed::<u8>(dw * dh * 4, "smooth scale 32-bit destination")?;
    scale_passes(k, &wide, sw * 4, (sw, sh), &mut out, dw * 4, (dw, dh))?;
    narrow_rows(&out, dst);
    Ok(())
}

fn check_depth(src: &Surface) -> Result<()> {
    let bpp = src.bytes_per_pixel();
    if bpp != 3 && bpp != 4 {
        return Err(Error::unsupported(format!(
            "only 24-bit or 32-bit surfaces can be smoothly scaled, got {} bits",
            bpp * 8
        )));
    }
    Ok(())
}

// ============================================================================
// Public API
// ============================================================================

/// Smoothly scale `src` to `width` x `height` into a new surface.
pub fn smooth_scale(src: &Surface, width: i32, height: i32) -> Result<Surface> {
    if width < 0 || height < 0 {
        return Err(Error::invalid(format!("cannot scale to negative size {width}x{height}")));
    }
    check_depth(src)?;
    let mut dst = src.new_like(width as u32, height as u32)?;
    smooth_scale_into(src, &mut dst)?;
    Ok(dst)
}

/// Smoothly scale `src` onto the whole of `dst`.
///
/// The formats must be compatible (same bytes per pixel and RGB masks);
/// channels are filtered by byte position, never converted.
pub fn smooth_scale_into(src: &Surface, dst: &mut Surface) -> Result<()> {
    check_depth(src)?;
    if !src.format().is_compatible(dst.format()) {
        return Err(Error::incompatible("source and destination formats differ"));
    }
    if src.bytes_per_pixel() == 3 && dst.pitch() % 4 != 0 {
        return Err(Error::incompatible("destination pitch not 4-byte aligned"));
    }
    if src.shares_memory_with(dst) {
        return Err(Error::incompatible("destination overlaps the source"));
    }
    if dst.width() == 0 || dst.height() == 0 || src.width() == 0 || src.height() == 0 {
        return Ok(());
    }

    let _src_lock = src.lock();
    let _dst_lock = dst.lock();
    if src.width() == dst.width() && src.height() == dst.height() {
        for y in 0..src.height() {
            dst.row_mut(y).copy_from_slice(&src.row(y));
        }
        return Ok(());
    }
    smooth_scale_with(simd::scale_kernels(), src, dst)
}

/// Smoothly scale by independent factors; the size truncates toward zero.
pub fn smooth_scale_by(src: &Surface, factor_x: f32, factor_y: f32) -> Result<Surface> {
    let width = (src.width() as f32 * factor_x) as i32;
    let height = (src.height() as f32 * factor_y) as i32;
    smooth_scale(src, width, height)
}

/// Name of the backend serving the smooth-scale filters.
pub fn smooth_scale_backend() -> &'static str {
    simd::backend(KernelFamily::Scale).name()
}

/// Select the smooth-scale filter backend by name.
pub fn set_smooth_scale_backend(name: &str) -> Result<()> {
    simd::set_backend(KernelFamily::Scale, name)
}

/// Smooth scale with an explicit backend, bypassing the selection.
pub fn smooth_scale_using(backend: Backend, src: &Surface, width: i32, height: i32) -> Result<Surface> {
    let kernels = simd::scale_kernels_for(backend)?;
    if width < 0 || height < 0 {
        return Err(Error::invalid(format!("cannot scale to negative size {width}x{height}")));
    }
    check_depth(src)?;
    let mut dst = src.new_like(width as u32, height as u32)?;
    if width > 0 && height > 0 && src.width() > 0 && src.height() > 0 {
        smooth_scale_with(kernels, src, &mut dst)?;
    }
    Ok(dst)
}
