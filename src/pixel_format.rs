//! Pixel format descriptor and the packed-pixel color codec.
//!
//! A [`PixelFormat`] describes how one pixel is laid out in 1 to 4 bytes:
//! a mask, shift and loss per channel, or a palette for indexed 8-bit
//! surfaces. [`PixelFormat::decode`] and [`PixelFormat::encode`] convert
//! between packed values and [`Rgba8`].

use crate::color::Rgba8;
use crate::error::{Error, Result};

/// Channel indices into the mask/shift/loss arrays.
pub const R: usize = 0;
pub const G: usize = 1;
pub const B: usize = 2;
pub const A: usize = 3;

// ============================================================================
// Palette
// ============================================================================

/// Ordered color table of an indexed surface (at most 256 entries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgba8>,
}

impl Palette {
    /// Build a palette; entries are forced opaque and truncated to 256.
    pub fn new(colors: &[Rgba8]) -> Self {
        let colors = colors
            .iter()
            .take(256)
            .map(|c| c.with_alpha(255))
            .collect();
        Self { colors }
    }

    /// The 256-level gray ramp.
    pub fn grayscale() -> Self {
        let ramp: Vec<Rgba8> = (0..=255u8).map(|v| Rgba8::new_opaque(v, v, v)).collect();
        Self::new(&ramp)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Rgba8] {
        &self.colors
    }

    /// Color of an index. Indices past the end read as opaque black.
    #[inline]
    pub fn get(&self, index: u8) -> Rgba8 {
        self.colors
            .get(index as usize)
            .copied()
            .unwrap_or(Rgba8::new_opaque(0, 0, 0))
    }

    /// Index of the entry closest to `c` in squared RGB distance.
    /// The lowest index wins a tie.
    pub fn nearest(&self, c: Rgba8) -> u8 {
        let mut best = 0usize;
        let mut best_d = u32::MAX;
        for (i, p) in self.colors.iter().enumerate() {
            let d = p.rgb_distance_sq(&c);
            if d < best_d {
                best_d = d;
                best = i;
                if d == 0 {
                    break;
                }
            }
        }
        best as u8
    }
}

// ============================================================================
// PixelFormat
// ============================================================================

/// Layout of a packed pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFormat {
    bits_per_pixel: u8,
    bytes_per_pixel: u8,
    masks: [u32; 4],
    shifts: [u8; 4],
    losses: [u8; 4],
    palette: Option<Palette>,
}

impl PixelFormat {
    /// Build a true-color format from channel masks.
    ///
    /// Masks must be contiguous, pairwise disjoint, at most 8 bits wide and
    /// fit in `bits_per_pixel`. A zero alpha mask means "no alpha".
    pub fn from_masks(bits_per_pixel: u8, rmask: u32, gmask: u32, bmask: u32, amask: u32) -> Result<Self> {
        if bits_per_pixel == 0 || bits_per_pixel > 32 {
            return Err(Error::unsupported(format!("{bits_per_pixel} bits per pixel")));
        }
        let masks = [rmask, gmask, bmask, amask];
        let limit = if bits_per_pixel == 32 {
            u32::MAX
        } else {
            (1u32 << bits_per_pixel) - 1
        };
        let mut seen = 0u32;
        let mut shifts = [0u8; 4];
        let mut losses = [8u8; 4];
        for (i, &m) in masks.iter().enumerate() {
            if m & !limit != 0 {
                return Err(Error::unsupported(format!("mask {m:#x} exceeds {bits_per_pixel} bits")));
            }
            if m & seen != 0 {
                return Err(Error::unsupported(format!("mask {m:#x} overlaps another channel")));
            }
            seen |= m;
            if m == 0 {
                continue;
            }
            let shift = m.trailing_zeros();
            let bits = m.count_ones();
            if (m >> shift).count_ones() != (m >> shift).trailing_ones() {
                return Err(Error::unsupported(format!("mask {m:#x} is not contiguous")));
            }
            if bits > 8 {
                return Err(Error::unsupported(format!("mask {m:#x} wider than 8 bits")));
            }
            shifts[i] = shift as u8;
            losses[i] = (8 - bits) as u8;
        }
        Ok(Self {
            bits_per_pixel,
            bytes_per_pixel: (bits_per_pixel + 7) / 8,
            masks,
            shifts,
            losses,
            palette: None,
        })
    }

    /// 8-bit palette-indexed format.
    pub fn indexed8(palette: Palette) -> Self {
        Self {
            bits_per_pixel: 8,
            bytes_per_pixel: 1,
            masks: [0; 4],
            shifts: [0; 4],
            losses: [8; 4],
            palette: Some(palette),
        }
    }

    fn preset(bits: u8, r: u32, g: u32, b: u32, a: u32) -> Self {
        Self::from_masks(bits, r, g, b, a).unwrap_or_else(|_| unreachable!("preset masks are valid"))
    }

    /// 32-bit, alpha in the top byte, then R, G, B.
    pub fn argb8888() -> Self {
        Self::preset(32, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000)
    }

    /// 32-bit, alpha in the top byte, then B, G, R (R in the low byte).
    pub fn abgr8888() -> Self {
        Self::preset(32, 0x0000_00FF, 0x0000_FF00, 0x00FF_0000, 0xFF00_0000)
    }

    /// 32-bit without alpha; the top byte is unused.
    pub fn xrgb8888() -> Self {
        Self::preset(32, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0)
    }

    /// 24-bit packed RGB.
    pub fn rgb888() -> Self {
        Self::preset(24, 0xFF_0000, 0x00_FF00, 0x00_00FF, 0)
    }

    /// 16-bit 5-6-5.
    pub fn rgb565() -> Self {
        Self::preset(16, 0xF800, 0x07E0, 0x001F, 0)
    }

    /// 16-bit 1-5-5-5 with a one-bit alpha.
    pub fn argb1555() -> Self {
        Self::preset(16, 0x7C00, 0x03E0, 0x001F, 0x8000)
    }

    /// 8-bit true color 3-3-2.
    pub fn rgb332() -> Self {
        Self::preset(8, 0xE0, 0x1C, 0x03, 0)
    }

    #[inline]
    pub fn bits_per_pixel(&self) -> u8 {
        self.bits_per_pixel
    }

    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_pixel as usize
    }

    #[inline]
    pub fn mask(&self, channel: usize) -> u32 {
        self.masks[channel]
    }

    #[inline]
    pub fn shift(&self, channel: usize) -> u32 {
        self.shifts[channel] as u32
    }

    #[inline]
    pub fn loss(&self, channel: usize) -> u32 {
        self.losses[channel] as u32
    }

    #[inline]
    pub fn has_alpha(&self) -> bool {
        self.masks[A] != 0
    }

    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.palette.is_some()
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    pub fn set_palette(&mut self, palette: Palette) -> Result<()> {
        if !self.is_indexed() {
            return Err(Error::unsupported("palette on a true-color format"));
        }
        self.palette = Some(palette);
        Ok(())
    }

    /// Union of the R, G and B masks.
    #[inline]
    pub fn rgb_mask(&self) -> u32 {
        self.masks[R] | self.masks[G] | self.masks[B]
    }

    /// Byte offset of a channel inside a pixel, when the channel occupies
    /// exactly one whole byte.
    pub fn channel_byte(&self, channel: usize) -> Option<usize> {
        let m = self.masks[channel];
        let s = self.shifts[channel] as u32;
        if m == 0 || s % 8 != 0 || m >> s != 0xFF {
            return None;
        }
        let idx = (s / 8) as usize;
        if cfg!(target_endian = "little") {
            Some(idx)
        } else {
            Some(self.bytes_per_pixel() - 1 - idx)
        }
    }

    /// Byte offsets of R, G, B (and A when present) for formats whose
    /// channels are all whole bytes.
    pub fn byte_layout(&self) -> Option<ByteLayout> {
        Some(ByteLayout {
            r: self.channel_byte(R)?,
            g: self.channel_byte(G)?,
            b: self.channel_byte(B)?,
            a: if self.has_alpha() {
                Some(self.channel_byte(A)?)
            } else {
                None
            },
        })
    }

    /// Same bytes per pixel and RGB masks. Alpha masks may differ.
    pub fn is_compatible(&self, other: &PixelFormat) -> bool {
        self.bytes_per_pixel == other.bytes_per_pixel
            && self.masks[R] == other.masks[R]
            && self.masks[G] == other.masks[G]
            && self.masks[B] == other.masks[B]
    }

    // ------------------------------------------------------------------------
    // Codec
    // ------------------------------------------------------------------------

    #[inline]
    fn expand(&self, pixel: u32, channel: usize) -> u8 {
        let m = self.masks[channel];
        if m == 0 {
            return if channel == A { 255 } else { 0 };
        }
        let bits = 8 - self.losses[channel] as u32;
        let v = (pixel & m) >> self.shifts[channel];
        let mut out = v << (8 - bits);
        let mut filled = bits;
        while filled < 8 {
            out |= out >> filled;
            filled *= 2;
        }
        out as u8
    }

    /// Unpack a pixel value into 8-bit channels.
    ///
    /// Low bits lost by narrow channels are filled by replicating the top
    /// bits, so full-scale values decode to 255.
    #[inline]
    pub fn decode(&self, pixel: u32) -> Rgba8 {
        if let Some(pal) = &self.palette {
            return pal.get(pixel as u8);
        }
        Rgba8::new(
            self.expand(pixel, R),
            self.expand(pixel, G),
            self.expand(pixel, B),
            self.expand(pixel, A),
        )
    }

    /// Pack 8-bit channels into a pixel value. Indexed formats pick the
    /// nearest palette entry.
    #[inline]
    pub fn encode(&self, c: Rgba8) -> u32 {
        if let Some(pal) = &self.palette {
            return pal.nearest(c) as u32;
        }
        let ch = [c.r, c.g, c.b, c.a];
        let mut out = 0u32;
        for i in 0..4 {
            let m = self.masks[i];
            if m != 0 {
                out |= ((ch[i] as u32 >> self.losses[i]) << self.shifts[i]) & m;
            }
        }
        out
    }

    /// Encode an opaque color.
    #[inline]
    pub fn map_rgb(&self, r: u8, g: u8, b: u8) -> u32 {
        self.encode(Rgba8::new_opaque(r, g, b))
    }
}

/// Byte offsets of each channel in a byte-aligned format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteLayout {
    pub r: usize,
    pub g: usize,
    pub b: usize,
    pub a: Option<usize>,
}
