//! SSE2 and AVX2 kernels.
//!
//! Only reachable through the dispatcher after runtime detection, which is
//! what makes the `target_feature` calls below sound. Row tails shorter
//! than one vector fall back to the scalar helpers.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use super::generic::{grayscale_tail, invert_tail, window, window_mean, expand_tap, UNIT};
use super::{Backend, ChannelShifts, ColorKernels, ScaleKernels};
use crate::error::{try_zeroed, Error, Result};

pub(crate) struct Sse2Kernels;
pub(crate) struct Avx2Kernels;

pub(crate) static SSE2: Sse2Kernels = Sse2Kernels;
pub(crate) static AVX2: Avx2Kernels = Avx2Kernels;

// ============================================================================
// Color: SSE2
// ============================================================================

#[inline]
#[target_feature(enable = "sse2")]
unsafe fn weigh_sse2(v: __m128i, coef: __m128i, round: __m128i) -> __m128i {
    // v < 256 and coef < 256 per 32-bit lane, so the 16-bit product is exact.
    _mm_srli_epi32::<8>(_mm_add_epi32(_mm_mullo_epi16(v, coef), round))
}

#[target_feature(enable = "sse2")]
unsafe fn grayscale_sse2(src: &[u8], dst: &mut [u8], s: ChannelShifts) {
    let n = src.len().min(dst.len()) / 16 * 16;
    let ff = _mm_set1_epi32(0xff);
    let keep = _mm_set1_epi32(!s.rgb_mask() as i32);
    let round = _mm_set1_epi32(255);
    let (cr, cg, cb) = (_mm_set1_epi32(76), _mm_set1_epi32(150), _mm_set1_epi32(29));
    let (sr, sg, sb) = (
        _mm_cvtsi32_si128(s.r as i32),
        _mm_cvtsi32_si128(s.g as i32),
        _mm_cvtsi32_si128(s.b as i32),
    );

    let mut i = 0;
    while i < n {
        let px = _mm_loadu_si128(src.as_ptr().add(i) as *const __m128i);
        let r = _mm_and_si128(_mm_srl_epi32(px, sr), ff);
        let g = _mm_and_si128(_mm_srl_epi32(px, sg), ff);
        let b = _mm_and_si128(_mm_srl_epi32(px, sb), ff);
        let gray = _mm_add_epi32(
            _mm_add_epi32(weigh_sse2(r, cr, round), weigh_sse2(g, cg, round)),
            weigh_sse2(b, cb, round),
        );
        let rgb = _mm_or_si128(
            _mm_or_si128(_mm_sll_epi32(gray, sr), _mm_sll_epi32(gray, sg)),
            _mm_sll_epi32(gray, sb),
        );
        let out = _mm_or_si128(_mm_and_si128(px, keep), rgb);
        _mm_storeu_si128(dst.as_mut_ptr().add(i) as *mut __m128i, out);
        i += 16;
    }
    grayscale_tail(&src[n..], &mut dst[n..], s);
}

#[target_feature(enable = "sse2")]
unsafe fn invert_sse2(src: &[u8], dst: &mut [u8], rgb_mask: u32) {
    let n = src.len().min(dst.len()) / 16 * 16;
    let mask = _mm_set1_epi32(rgb_mask as i32);
    let mut i = 0;
    while i < n {
        let px = _mm_loadu_si128(src.as_ptr().add(i) as *const __m128i);
        _mm_storeu_si128(dst.as_mut_ptr().add(i) as *mut __m128i, _mm_xor_si128(px, mask));
        i += 16;
    }
    invert_tail(&src[n..], &mut dst[n..], rgb_mask);
}

// ============================================================================
// Color: AVX2
// ============================================================================

#[inline]
#[target_feature(enable = "avx2")]
unsafe fn weigh_avx2(v: __m256i, coef: __m256i, round: __m256i) -> __m256i {
    _mm256_srli_epi32::<8>(_mm256_add_epi32(_mm256_mullo_epi16(v, coef), round))
}

#[target_feature(enable = "avx2")]
unsafe fn grayscale_avx2(src: &[u8], dst: &mut [u8], s: ChannelShifts) {
    let n = src.len().min(dst.len()) / 32 * 32;
    let ff = _mm256_set1_epi32(0xff);
    let keep = _mm256_set1_epi32(!s.rgb_mask() as i32);
    let round = _mm256_set1_epi32(255);
    let (cr, cg, cb) = (_mm256_set1_epi32(76), _mm256_set1_epi32(150), _mm256_set1_epi32(29));
    let (sr, sg, sb) = (
        _mm_cvtsi32_si128(s.r as i32),
        _mm_cvtsi32_si128(s.g as i32),
        _mm_cvtsi32_si128(s.b as i32),
    );

    let mut i = 0;
    while i < n {
        let px = _mm256_loadu_si256(src.as_ptr().add(i) as *const __m256i);
        let r = _mm256_and_si256(_mm256_srl_epi32(px, sr), ff);
        let g = _mm256_and_si256(_mm256_srl_epi32(px, sg), ff);
        let b = _mm256_and_si256(_mm256_srl_epi32(px, sb), ff);
        let gray = _mm256_add_epi32(
            _mm256_add_epi32(weigh_avx2(r, cr, round), weigh_avx2(g, cg, round)),
            weigh_avx2(b, cb, round),
        );
        let rgb = _mm256_or_si256(
            _mm256_or_si256(_mm256_sll_epi32(gray, sr), _mm256_sll_epi32(gray, sg)),
            _mm256_sll_epi32(gray, sb),
        );
        let out = _mm256_or_si256(_mm256_and_si256(px, keep), rgb);
        _mm256_storeu_si256(dst.as_mut_ptr().add(i) as *mut __m256i, out);
        i += 32;
    }
    grayscale_tail(&src[n..], &mut dst[n..], s);
}

#[target_feature(enable = "avx2")]
unsafe fn invert_avx2(src: &[u8], dst: &mut [u8], rgb_mask: u32) {
    let n = src.len().min(dst.len()) / 32 * 32;
    let mask = _mm256_set1_epi32(rgb_mask as i32);
    let mut i = 0;
    while i < n {
        let px = _mm256_loadu_si256(src.as_ptr().add(i) as *const __m256i);
        _mm256_storeu_si256(dst.as_mut_ptr().add(i) as *mut __m256i, _mm256_xor_si256(px, mask));
        i += 32;
    }
    invert_tail(&src[n..], &mut dst[n..], rgb_mask);
}

// ============================================================================
// Scale: SSE2 helpers
// ============================================================================

/// Four bytes to four u32 lanes.
#[inline]
#[target_feature(enable = "sse2")]
unsafe fn widen32(px: &[u8]) -> __m128i {
    let zero = _mm_setzero_si128();
    let v = _mm_cvtsi32_si128(i32::from_ne_bytes([px[0], px[1], px[2], px[3]]));
    _mm_unpacklo_epi16(_mm_unpacklo_epi8(v, zero), zero)
}

/// Four bytes to two registers of u64 lanes: (c0, c1) and (c2, c3).
#[inline]
#[target_feature(enable = "sse2")]
unsafe fn widen64(px: &[u8]) -> (__m128i, __m128i) {
    let zero = _mm_setzero_si128();
    let v = widen32(px);
    (_mm_unpacklo_epi32(v, zero), _mm_unpackhi_epi32(v, zero))
}

#[inline]
#[target_feature(enable = "sse2")]
unsafe fn weighted64(lanes: (__m128i, __m128i), w: u64) -> (__m128i, __m128i) {
    let wv = _mm_set1_epi32(w as i32);
    (_mm_mul_epu32(lanes.0, wv), _mm_mul_epu32(lanes.1, wv))
}

#[inline]
#[target_feature(enable = "sse2")]
unsafe fn add64(a: (__m128i, __m128i), b: (__m128i, __m128i)) -> (__m128i, __m128i) {
    (_mm_add_epi64(a.0, b.0), _mm_add_epi64(a.1, b.1))
}

#[inline]
#[target_feature(enable = "sse2")]
unsafe fn spill64(a: (__m128i, __m128i)) -> [u64; 4] {
    let mut out = [0u64; 4];
    _mm_storeu_si128(out.as_mut_ptr() as *mut __m128i, a.0);
    _mm_storeu_si128(out.as_mut_ptr().add(2) as *mut __m128i, a.1);
    out
}

#[inline]
#[target_feature(enable = "sse2")]
unsafe fn load64(p: &[u64]) -> (__m128i, __m128i) {
    (
        _mm_loadu_si128(p.as_ptr() as *const __m128i),
        _mm_loadu_si128(p.as_ptr().add(2) as *const __m128i),
    )
}

#[inline]
#[target_feature(enable = "sse2")]
unsafe fn store64(p: &mut [u64], a: (__m128i, __m128i)) {
    _mm_storeu_si128(p.as_mut_ptr() as *mut __m128i, a.0);
    _mm_storeu_si128(p.as_mut_ptr().add(2) as *mut __m128i, a.1);
}

/// `(s0 * (0x10000 - w1) + s1 * w1) >> 16` on four channels.
#[inline]
#[target_feature(enable = "sse2")]
unsafe fn lerp4(s0: &[u8], s1: &[u8], w1: u32, out: &mut [u8]) {
    let a = widen32(s0);
    let b = widen32(s1);
    let w0v = _mm_set1_epi32((UNIT as u32 - w1) as i32);
    let w1v = _mm_set1_epi32(w1 as i32);
    // Lanes 0 and 2, then lanes 1 and 3, each as u64 products.
    let even = _mm_add_epi64(_mm_mul_epu32(a, w0v), _mm_mul_epu32(b, w1v));
    let odd = _mm_add_epi64(
        _mm_mul_epu32(_mm_srli_epi64::<32>(a), w0v),
        _mm_mul_epu32(_mm_srli_epi64::<32>(b), w1v),
    );
    let lanes = _mm_or_si128(
        _mm_srli_epi64::<16>(even),
        _mm_slli_epi64::<32>(_mm_srli_epi64::<16>(odd)),
    );
    let packed = _mm_packus_epi16(_mm_packs_epi32(lanes, lanes), lanes);
    out[..4].copy_from_slice(&_mm_cvtsi128_si32(packed).to_ne_bytes());
}

// ============================================================================
// Scale: SSE2 passes
// ============================================================================

#[target_feature(enable = "sse2")]
unsafe fn shrink_x_sse2(src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, height: usize, src_w: usize, dst_w: usize) {
    let space = window(src_w, dst_w);
    let zero = (_mm_setzero_si128(), _mm_setzero_si128());
    for y in 0..height {
        let srow = &src[y * src_pitch..y * src_pitch + src_w * 4];
        let drow = &mut dst[y * dst_pitch..y * dst_pitch + dst_w * 4];
        let mut acc = zero;
        let mut counter = space;
        let mut out = 0;
        for px in srow.chunks_exact(4) {
            let lanes = widen64(px);
            if counter > UNIT {
                acc = add64(acc, weighted64(lanes, UNIT));
                counter -= UNIT;
            } else {
                let frac = UNIT - counter;
                if out < dst_w {
                    let sums = spill64(add64(acc, weighted64(lanes, counter)));
                    for c in 0..4 {
                        drow[out * 4 + c] = window_mean(sums[c], 0, space);
                    }
                    out += 1;
                }
                acc = weighted64(lanes, frac);
                counter = space - frac;
            }
        }
    }
}

#[target_feature(enable = "sse2")]
unsafe fn shrink_y_sse2(src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, width: usize, src_h: usize, dst_h: usize, acc: &mut [u64]) {
    let space = window(src_h, dst_h);
    let n = width * 4;
    let mut counter = space;
    let mut out = 0;
    for y in 0..src_h {
        let srow = &src[y * src_pitch..y * src_pitch + n];
        if counter > UNIT {
            for (px, a) in srow.chunks_exact(4).zip(acc.chunks_exact_mut(4)) {
                store64(a, add64(load64(a), weighted64(widen64(px), UNIT)));
            }
            counter -= UNIT;
        } else {
            let frac = UNIT - counter;
            if out < dst_h {
                let drow = &mut dst[out * dst_pitch..out * dst_pitch + n];
                for ((px, a), d) in srow.chunks_exact(4).zip(acc.chunks_exact(4)).zip(drow.chunks_exact_mut(4)) {
                    let sums = spill64(add64(load64(a), weighted64(widen64(px), counter)));
                    for c in 0..4 {
                        d[c] = window_mean(sums[c], 0, space);
                    }
                }
                out += 1;
            }
            for (px, a) in srow.chunks_exact(4).zip(acc.chunks_exact_mut(4)) {
                store64(a, weighted64(widen64(px), frac));
            }
            counter = space - frac;
        }
    }
}

#[target_feature(enable = "sse2")]
unsafe fn expand_x_sse2(src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, height: usize, taps: &[(usize, u32)], src_w: usize) {
    let dst_w = taps.len();
    for y in 0..height {
        let srow = &src[y * src_pitch..y * src_pitch + src_w * 4];
        let drow = &mut dst[y * dst_pitch..y * dst_pitch + dst_w * 4];
        for (d, &(i0, w1)) in drow.chunks_exact_mut(4).zip(taps) {
            let s0 = &srow[i0 * 4..i0 * 4 + 4];
            let s1 = if w1 != 0 { &srow[i0 * 4 + 4..i0 * 4 + 8] } else { s0 };
            lerp4(s0, s1, w1, d);
        }
    }
}

#[target_feature(enable = "sse2")]
unsafe fn expand_y_sse2(src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, width: usize, src_h: usize, dst_h: usize) {
    let n = width * 4;
    for y in 0..dst_h {
        let (i0, w1) = expand_tap(y, src_h, dst_h);
        let r0 = &src[i0 * src_pitch..i0 * src_pitch + n];
        let r1 = if w1 != 0 { &src[(i0 + 1) * src_pitch..(i0 + 1) * src_pitch + n] } else { r0 };
        let drow = &mut dst[y * dst_pitch..y * dst_pitch + n];
        for ((a, b), d) in r0.chunks_exact(4).zip(r1.chunks_exact(4)).zip(drow.chunks_exact_mut(4)) {
            lerp4(a, b, w1, d);
        }
    }
}

// ============================================================================
// Trait impls
// ============================================================================

impl ColorKernels for Sse2Kernels {
    fn backend(&self) -> Backend {
        Backend::Sse2
    }

    fn grayscale_row(&self, src: &[u8], dst: &mut [u8], shifts: ChannelShifts) {
        unsafe { grayscale_sse2(src, dst, shifts) }
    }

    fn invert_row(&self, src: &[u8], dst: &mut [u8], rgb_mask: u32) {
        unsafe { invert_sse2(src, dst, rgb_mask) }
    }
}

impl ColorKernels for Avx2Kernels {
    fn backend(&self) -> Backend {
        Backend::Avx2
    }

    fn grayscale_row(&self, src: &[u8], dst: &mut [u8], shifts: ChannelShifts) {
        unsafe { grayscale_avx2(src, dst, shifts) }
    }

    fn invert_row(&self, src: &[u8], dst: &mut [u8], rgb_mask: u32) {
        unsafe { invert_avx2(src, dst, rgb_mask) }
    }
}

impl ScaleKernels for Sse2Kernels {
    fn backend(&self) -> Backend {
        Backend::Sse2
    }

    fn shrink_x(&self, src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, height: usize, src_w: usize, dst_w: usize) -> Result<()> {
        unsafe { shrink_x_sse2(src, src_pitch, dst, dst_pitch, height, src_w, dst_w) };
        Ok(())
    }

    fn shrink_y(&self, src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, width: usize, src_h: usize, dst_h: usize) -> Result<()> {
        let mut acc = try_zeroed::<u64>(width * 4, "shrink accumulator line")?;
        unsafe { shrink_y_sse2(src, src_pitch, dst, dst_pitch, width, src_h, dst_h, &mut acc) };
        Ok(())
    }

    fn expand_x(&self, src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, height: usize, src_w: usize, dst_w: usize) -> Result<()> {
        let mut taps = Vec::new();
        taps.try_reserve_exact(dst_w)
            .map_err(|_| Error::alloc("expand index table"))?;
        taps.extend((0..dst_w).map(|x| expand_tap(x, src_w, dst_w)));
        unsafe { expand_x_sse2(src, src_pitch, dst, dst_pitch, height, &taps, src_w) };
        Ok(())
    }

    fn expand_y(&self, src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, width: usize, src_h: usize, dst_h: usize) -> Result<()> {
        unsafe { expand_y_sse2(src, src_pitch, dst, dst_pitch, width, src_h, dst_h) };
        Ok(())
    }
}
