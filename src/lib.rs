//! # surfgfx
//!
//! Software surface transforms and scanline rasterization.
//!
//! A [`Surface`] is an in-memory pixel buffer described by a
//! [`PixelFormat`]: 8-bit indexed, packed 16-bit, 24-bit or 32-bit
//! true color. Everything in this crate reads and writes surfaces
//! directly on the CPU:
//!
//! - SDL_gfx-style primitives: pixels, spans, Bresenham and Wu lines,
//!   anti-aliased ellipses, scanline polygon fills (solid and textured),
//!   pie slices and Bezier curves
//! - Geometric transforms: nearest and smooth scaling, Scale2x, rotation,
//!   filtered rotate-and-zoom, flipping and chopping
//! - Color filters: grayscale, invert, solid overlay, HSL adjustment,
//!   Laplacian edge detection, box and Gaussian blur, thresholding and
//!   averaging
//!
//! ## Accelerated kernels
//!
//! Grayscale, invert and the smooth-scale filter passes have SSE2, AVX2
//! and NEON variants next to the portable ones. The [`simd`] module
//! detects the CPU features once per kernel family and can be overridden by name;
//! every variant gives byte-identical results.
//!
//! ## Errors and logging
//!
//! Fallible operations return [`Result`]; preconditions are checked
//! before any destination pixel is written. Backend selection and scratch
//! growth are reported through the `log` facade.

// Foundation: errors, geometry, colors, formats
pub mod basics;
pub mod color;
pub mod error;
pub mod pixel_format;

// Surfaces
pub mod blit;
pub mod surface;

// Rasterizer
pub mod aa;
pub mod bezier;
pub mod clip;
pub mod polygon;
pub mod primitives;

// Geometric transforms
pub mod flip;
pub mod rotate;
pub mod scale;
pub mod scale2x;
pub mod smooth_scale;

// Color and filter transforms
pub mod average;
pub mod blur;
pub mod filters;
pub mod threshold;

// Kernel dispatch
pub mod simd;

pub use basics::{Rect, RectI};
pub use color::{Hsl, Rgba8};
pub use error::{Error, Result};
pub use pixel_format::{Palette, PixelFormat};
pub use polygon::RasterContext;
pub use surface::{BlendMode, Pixels, PixelsMut, Surface, SurfaceLock};
