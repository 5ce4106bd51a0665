//! NEON kernels (aarch64).
//!
//! Color kernels are vectorized. The scale family shares the scalar
//! filter passes; the widening multiply-accumulate they need gains little
//! over what the compiler already emits for the generic loops.

use std::arch::aarch64::*;

use super::generic::{grayscale_tail, invert_tail, GenericKernels};
use super::{Backend, ChannelShifts, ColorKernels, ScaleKernels};
use crate::error::Result;

pub(crate) struct NeonKernels;

pub(crate) static NEON: NeonKernels = NeonKernels;

#[inline]
#[target_feature(enable = "neon")]
unsafe fn weigh(v: uint32x4_t, coef: u32) -> uint32x4_t {
    vshrq_n_u32::<8>(vaddq_u32(vmulq_n_u32(v, coef), vdupq_n_u32(255)))
}

#[target_feature(enable = "neon")]
unsafe fn grayscale_neon(src: &[u8], dst: &mut [u8], s: ChannelShifts) {
    let n = src.len().min(dst.len()) / 16 * 16;
    let ff = vdupq_n_u32(0xff);
    let keep = vdupq_n_u32(!s.rgb_mask());
    // vshlq with a negative count shifts right.
    let (rr, rg, rb) = (
        vdupq_n_s32(-(s.r as i32)),
        vdupq_n_s32(-(s.g as i32)),
        vdupq_n_s32(-(s.b as i32)),
    );
    let (lr, lg, lb) = (vdupq_n_s32(s.r as i32), vdupq_n_s32(s.g as i32), vdupq_n_s32(s.b as i32));

    let mut i = 0;
    while i < n {
        let px = vreinterpretq_u32_u8(vld1q_u8(src.as_ptr().add(i)));
        let r = vandq_u32(vshlq_u32(px, rr), ff);
        let g = vandq_u32(vshlq_u32(px, rg), ff);
        let b = vandq_u32(vshlq_u32(px, rb), ff);
        let gray = vaddq_u32(vaddq_u32(weigh(r, 76), weigh(g, 150)), weigh(b, 29));
        let rgb = vorrq_u32(vorrq_u32(vshlq_u32(gray, lr), vshlq_u32(gray, lg)), vshlq_u32(gray, lb));
        let out = vorrq_u32(vandq_u32(px, keep), rgb);
        vst1q_u8(dst.as_mut_ptr().add(i), vreinterpretq_u8_u32(out));
        i += 16;
    }
    grayscale_tail(&src[n..], &mut dst[n..], s);
}

#[target_feature(enable = "neon")]
unsafe fn invert_neon(src: &[u8], dst: &mut [u8], rgb_mask: u32) {
    let n = src.len().min(dst.len()) / 16 * 16;
    let mask = vdupq_n_u32(rgb_mask);
    let mut i = 0;
    while i < n {
        let px = vreinterpretq_u32_u8(vld1q_u8(src.as_ptr().add(i)));
        vst1q_u8(dst.as_mut_ptr().add(i), vreinterpretq_u8_u32(veorq_u32(px, mask)));
        i += 16;
    }
    invert_tail(&src[n..], &mut dst[n..], rgb_mask);
}

impl ColorKernels for NeonKernels {
    fn backend(&self) -> Backend {
        Backend::Neon
    }

    fn grayscale_row(&self, src: &[u8], dst: &mut [u8], shifts: ChannelShifts) {
        unsafe { grayscale_neon(src, dst, shifts) }
    }

    fn invert_row(&self, src: &[u8], dst: &mut [u8], rgb_mask: u32) {
        unsafe { invert_neon(src, dst, rgb_mask) }
    }
}

impl ScaleKernels for NeonKernels {
    fn backend(&self) -> Backend {
        Backend::Neon
    }

    fn shrink_x(&self, src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, height: usize, src_w: usize, dst_w: usize) -> Result<()> {
        GenericKernels.shrink_x(src, src_pitch, dst, dst_pitch, height, src_w, dst_w)
    }

    fn shrink_y(&self, src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, width: usize, src_h: usize, dst_h: usize) -> Result<()> {
        GenericKernels.shrink_y(src, src_pitch, dst, dst_pitch, width, src_h, dst_h)
    }

    fn expand_x(&self, src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, height: usize, src_w: usize, dst_w: usize) -> Result<()> {
        GenericKernels.expand_x(src, src_pitch, dst, dst_pitch, height, src_w, dst_w)
    }

    fn expand_y(&self, src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, width: usize, src_h: usize, dst_h: usize) -> Result<()> {
        GenericKernels.expand_y(src, src_pitch, dst, dst_pitch, width, src_h, dst_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_kernels_match_generic() {
        if !std::arch::is_aarch64_feature_detected!("neon") {
            return;
        }
        let src: Vec<u8> = (0..37 * 4).map(|i| (i * 53 + 11) as u8).collect();
        for shifts in [ChannelShifts { r: 16, g: 8, b: 0 }, ChannelShifts { r: 0, g: 8, b: 16 }] {
            let mut want = vec![0u8; src.len()];
            let mut got = vec![0u8; src.len()];
            GenericKernels.grayscale_row(&src, &mut want, shifts);
            NEON.grayscale_row(&src, &mut got, shifts);
            assert_eq!(got, want);
            GenericKernels.invert_row(&src, &mut want, shifts.rgb_mask());
            NEON.invert_row(&src, &mut got, shifts.rgb_mask());
            assert_eq!(got, want);
        }
    }
}
