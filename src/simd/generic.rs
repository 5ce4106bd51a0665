//! Scalar kernels. Every other backend is checked against these.

use super::{Backend, ChannelShifts, ColorKernels, ScaleKernels};
use crate::error::{try_zeroed, Error, Result};

/// Portable scalar implementation of every kernel family.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericKernels;

/// One full source pixel in 16.16 window units.
pub(crate) const UNIT: u64 = 0x10000;

// ============================================================================
// Color
// ============================================================================

#[inline]
pub(crate) fn gray_level(r: u32, g: u32, b: u32) -> u32 {
    ((76 * r + 255) >> 8) + ((150 * g + 255) >> 8) + ((29 * b + 255) >> 8)
}

#[inline]
pub(crate) fn grayscale_pixel(px: u32, s: ChannelShifts) -> u32 {
    let gray = gray_level((px >> s.r) & 0xff, (px >> s.g) & 0xff, (px >> s.b) & 0xff);
    (px & !s.rgb_mask()) | (gray << s.r) | (gray << s.g) | (gray << s.b)
}

pub(crate) fn grayscale_tail(src: &[u8], dst: &mut [u8], shifts: ChannelShifts) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let px = u32::from_ne_bytes([s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&grayscale_pixel(px, shifts).to_ne_bytes());
    }
}

pub(crate) fn invert_tail(src: &[u8], dst: &mut [u8], rgb_mask: u32) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let px = u32::from_ne_bytes([s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&(px ^ rgb_mask).to_ne_bytes());
    }
}

impl ColorKernels for GenericKernels {
    fn backend(&self) -> Backend {
        Backend::Generic
    }

    fn grayscale_row(&self, src: &[u8], dst: &mut [u8], shifts: ChannelShifts) {
        grayscale_tail(src, dst, shifts);
    }

    fn invert_row(&self, src: &[u8], dst: &mut [u8], rgb_mask: u32) {
        invert_tail(src, dst, rgb_mask);
    }
}

// ============================================================================
// Scale: shared index math
// ============================================================================

/// Window width of one output sample when shrinking `src` to `dst`.
#[inline]
pub(crate) fn window(src: usize, dst: usize) -> u64 {
    UNIT * src as u64 / dst as u64
}

/// Rounded mean of a window: `acc` plus the partial tail weight.
#[inline]
pub(crate) fn window_mean(acc: u64, tail: u64, space: u64) -> u8 {
    ((acc + tail + space / 2) / space) as u8
}

/// Left source index and the weight of its right neighbour for output
/// position `i` of a bilinear expand from `src` to `dst`.
#[inline]
pub(crate) fn expand_tap(i: usize, src: usize, dst: usize) -> (usize, u32) {
    let num = i * (src - 1);
    let frac = (UNIT * (num % dst) as u64 / dst as u64) as u32;
    (num / dst, frac)
}

#[inline]
pub(crate) fn lerp16(s0: u8, s1: u8, w1: u32) -> u8 {
    ((s0 as u32 * (UNIT as u32 - w1) + s1 as u32 * w1) >> 16) as u8
}

// ============================================================================
// Scale kernels
// ============================================================================

impl ScaleKernels for GenericKernels {
    fn backend(&self) -> Backend {
        Backend::Generic
    }

    fn shrink_x(
        &self,
        src: &[u8],
        src_pitch: usize,
        dst: &mut [u8],
        dst_pitch: usize,
        height: usize,
        src_w: usize,
        dst_w: usize,
    ) -> Result<()> {
        let space = window(src_w, dst_w);
        for y in 0..height {
            let srow = &src[y * src_pitch..y * src_pitch + src_w * 4];
            let drow = &mut dst[y * dst_pitch..y * dst_pitch + dst_w * 4];
            let mut acc = [0u64; 4];
            let mut counter = space;
            let mut out = 0;
            for px in srow.chunks_exact(4) {
                if counter > UNIT {
                    for c in 0..4 {
                        acc[c] += px[c] as u64 * UNIT;
                    }
                    counter -= UNIT;
                } else {
                    let frac = UNIT - counter;
                    if out < dst_w {
                        for c in 0..4 {
                            drow[out * 4 + c] = window_mean(acc[c], px[c] as u64 * counter, space);
                        }
                        out += 1;
                    }
                    for c in 0..4 {
                        acc[c] = px[c] as u64 * frac;
                    }
                    counter = space - frac;
                }
            }
        }
        Ok(())
    }

    fn shrink_y(
        &self,
        src: &[u8],
        src_pitch: usize,
        dst: &mut [u8],
        dst_pitch: usize,
        width: usize,
        src_h: usize,
        dst_h: usize,
    ) -> Result<()> {
        let space = window(src_h, dst_h);
        let n = width * 4;
        let mut acc = try_zeroed::<u64>(n, "shrink accumulator line")?;
        let mut counter = space;
        let mut out = 0;
        for y in 0..src_h {
            let srow = &src[y * src_pitch..y * src_pitch + n];
            if counter > UNIT {
                for (a, &v) in acc.iter_mut().zip(srow) {
                    *a += v as u64 * UNIT;
                }
                counter -= UNIT;
            } else {
                let frac = UNIT - counter;
                if out < dst_h {
                    let drow = &mut dst[out * dst_pitch..out * dst_pitch + n];
                    for ((d, &a), &v) in drow.iter_mut().zip(&acc).zip(srow) {
                        *d = window_mean(a, v as u64 * counter, space);
                    }
                    out += 1;
                }
                for (a, &v) in acc.iter_mut().zip(srow) {
                    *a = v as u64 * frac;
                }
                counter = space - frac;
            }
        }
        Ok(())
    }

    fn expand_x(
        &self,
        src: &[u8],
        src_pitch: usize,
        dst: &mut [u8],
        dst_pitch: usize,
        height: usize,
        src_w: usize,
        dst_w: usize,
    ) -> Result<()> {
        let mut taps = Vec::new();
        taps.try_reserve_exact(dst_w)
            .map_err(|_| Error::alloc("expand index table"))?;
        taps.extend((0..dst_w).map(|x| expand_tap(x, src_w, dst_w)));

        for y in 0..height {
            let srow = &src[y * src_pitch..y * src_pitch + src_w * 4];
            let drow = &mut dst[y * dst_pitch..y * dst_pitch + dst_w * 4];
            for (d, &(i0, w1)) in drow.chunks_exact_mut(4).zip(&taps) {
                let s0 = &srow[i0 * 4..i0 * 4 + 4];
                let s1 = if w1 != 0 { &srow[i0 * 4 + 4..i0 * 4 + 8] } else { s0 };
                for c in 0..4 {
                    d[c] = lerp16(s0[c], s1[c], w1);
                }
            }
        }
        Ok(())
    }

    fn expand_y(
        &self,
        src: &[u8],
        src_pitch: usize,
        dst: &mut [u8],
        dst_pitch: usize,
        width: usize,
        src_h: usize,
        dst_h: usize,
    ) -> Result<()> {
        let n = width * 4;
        for y in 0..dst_h {
            let (i0, w1) = expand_tap(y, src_h, dst_h);
            let r0 = &src[i0 * src_pitch..i0 * src_pitch + n];
            let r1 = if w1 != 0 { &src[(i0 + 1) * src_pitch..(i0 + 1) * src_pitch + n] } else { r0 };
            let drow = &mut dst[y * dst_pitch..y * dst_pitch + n];
            for ((d, &a), &b) in drow.iter_mut().zip(r0).zip(r1) {
                *d = lerp16(a, b, w1);
            }
        }
        Ok(())
    }
}
