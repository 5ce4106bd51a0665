//! Runtime selection of accelerated kernels.
//!
//! Kernels come in two families that are detected and selected
//! independently:
//!
//! - [`KernelFamily::Color`]: grayscale and invert over packed 32-bit rows.
//! - [`KernelFamily::Scale`]: the four smooth-scale filter passes.
//!
//! Each family starts unselected. The first query inspects the CPU once and
//! settles on the best [`Backend`]; the choice stays fixed until it is
//! overridden by name with [`set_backend`] or cleared with
//! [`reset_backends`]. Every accelerated kernel produces output
//! byte-identical to the generic one for the same input.

mod generic;
#[cfg(target_arch = "aarch64")]
mod neon;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86;

use std::sync::Mutex;

use lazy_static::lazy_static;
use log::{debug, warn};

use crate::error::{Error, Result};

pub use generic::GenericKernels;
pub(crate) use generic::gray_level;

// ============================================================================
// Backends and families
// ============================================================================

/// An implementation strategy for a kernel family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Generic,
    Sse2,
    Neon,
    Avx2,
}

impl Backend {
    /// Upper-case name as accepted by [`set_backend`].
    pub fn name(self) -> &'static str {
        match self {
            Backend::Generic => "GENERIC",
            Backend::Sse2 => "SSE2",
            Backend::Neon => "NEON",
            Backend::Avx2 => "AVX2",
        }
    }

    /// Parse a backend name. Case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "GENERIC" => Some(Backend::Generic),
            "SSE2" => Some(Backend::Sse2),
            "NEON" => Some(Backend::Neon),
            "AVX2" => Some(Backend::Avx2),
            _ => None,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Groups of kernels that share one backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelFamily {
    /// Grayscale and invert.
    Color,
    /// Smooth-scale shrink/expand passes.
    Scale,
}

impl KernelFamily {
    #[inline]
    fn index(self) -> usize {
        match self {
            KernelFamily::Color => 0,
            KernelFamily::Scale => 1,
        }
    }

    /// Detection order, best first.
    fn preference(self) -> &'static [Backend] {
        match self {
            KernelFamily::Color => &[Backend::Avx2, Backend::Sse2, Backend::Neon, Backend::Generic],
            KernelFamily::Scale => &[Backend::Sse2, Backend::Neon, Backend::Generic],
        }
    }
}

// ============================================================================
// Kernel interfaces
// ============================================================================

/// Byte shifts of the R, G and B channels inside a packed 32-bit pixel.
/// Each channel occupies exactly one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelShifts {
    pub r: u32,
    pub g: u32,
    pub b: u32,
}

impl ChannelShifts {
    /// Mask covering the three color bytes.
    #[inline]
    pub fn rgb_mask(&self) -> u32 {
        (0xff << self.r) | (0xff << self.g) | (0xff << self.b)
    }
}

/// Per-pixel color kernels over rows of native-endian 32-bit pixels.
///
/// `src` and `dst` have the same length, a multiple of 4. Bits outside the
/// RGB bytes are carried through unchanged.
pub trait ColorKernels: Sync {
    fn backend(&self) -> Backend;

    /// Replace R, G and B with
    /// `((76r + 255) >> 8) + ((150g + 255) >> 8) + ((29b + 255) >> 8)`.
    fn grayscale_row(&self, src: &[u8], dst: &mut [u8], shifts: ChannelShifts);

    /// Complement every bit selected by `rgb_mask`.
    fn invert_row(&self, src: &[u8], dst: &mut [u8], rgb_mask: u32);
}

/// Smooth-scale filter passes over 4-byte-per-pixel buffers.
///
/// Buffers are row-major with the given pitches. Shrink passes are exact
/// area-averaging box filters on a 16.16 moving window; expand passes are
/// bilinear with 16.16 weights.
pub trait ScaleKernels: Sync {
    fn backend(&self) -> Backend;

    /// Horizontal shrink of `height` rows from `src_w` to `dst_w < src_w`.
    fn shrink_x(&self, src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, height: usize, src_w: usize, dst_w: usize) -> Result<()>;

    /// Vertical shrink of `width` columns from `src_h` to `dst_h < src_h`.
    fn shrink_y(&self, src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, width: usize, src_h: usize, dst_h: usize) -> Result<()>;

    /// Horizontal expand of `height` rows from `src_w` to `dst_w > src_w`.
    fn expand_x(&self, src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, height: usize, src_w: usize, dst_w: usize) -> Result<()>;

    /// Vertical expand of `width` columns from `src_h` to `dst_h > src_h`.
    fn expand_y(&self, src: &[u8], src_pitch: usize, dst: &mut [u8], dst_pitch: usize, width: usize, src_h: usize, dst_h: usize) -> Result<()>;
}

// ============================================================================
// Detection
// ============================================================================

fn cpu_has(backend: Backend) -> bool {
    match backend {
        Backend::Generic => true,
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        Backend::Sse2 => is_x86_feature_detected!("sse2"),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        Backend::Avx2 => is_x86_feature_detected!("avx2"),
        #[cfg(target_arch = "aarch64")]
        Backend::Neon => std::arch::is_aarch64_feature_detected!("neon"),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

/// Whether `backend` can serve `family` on this CPU and build.
pub fn is_supported(family: KernelFamily, backend: Backend) -> bool {
    family.preference().contains(&backend) && cpu_has(backend)
}

// ============================================================================
// Selection state
// ============================================================================

lazy_static! {
    static ref SELECTED: Mutex<[Option<Backend>; 2]> = Mutex::new([None, None]);
}

fn with_selection<R>(f: impl FnOnce(&mut [Option<Backend>; 2]) -> R) -> R {
    let mut guard = SELECTED.lock().unwrap_or_else(|e| e.into_inner());
    f(&mut guard)
}

fn detect(family: KernelFamily) -> Backend {
    let chosen = family
        .preference()
        .iter()
        .copied()
        .find(|&b| cpu_has(b))
        .unwrap_or(Backend::Generic);
    debug!("{family:?} kernels: detected {chosen}");
    chosen
}

/// The backend currently serving `family`, probing on first use.
pub fn backend(family: KernelFamily) -> Backend {
    with_selection(|sel| *sel[family.index()].get_or_insert_with(|| detect(family)))
}

/// Force `family` onto the backend called `name`
/// (`"GENERIC"`, `"SSE2"`, `"NEON"` or `"AVX2"`).
pub fn set_backend(family: KernelFamily, name: &str) -> Result<()> {
    let Some(requested) = Backend::from_name(name) else {
        warn!("{family:?} kernels: unknown backend {name:?}");
        return Err(Error::invalid(format!("unknown backend {name:?}")));
    };
    if !is_supported(family, requested) {
        warn!("{family:?} kernels: {requested} not available");
        return Err(Error::BackendUnavailable(format!("{requested} for {family:?} kernels")));
    }
    with_selection(|sel| sel[family.index()] = Some(requested));
    debug!("{family:?} kernels: selected {requested}");
    Ok(())
}

/// Forget all selections; the next query detects again.
pub fn reset_backends() {
    with_selection(|sel| *sel = [None, None]);
}

// ============================================================================
// Kernel lookup
// ============================================================================

static GENERIC: GenericKernels = GenericKernels;

/// Color kernels for a specific backend.
pub fn color_kernels_for(backend: Backend) -> Result<&'static dyn ColorKernels> {
    if !is_supported(KernelFamily::Color, backend) {
        return Err(Error::BackendUnavailable(format!("{backend} color kernels")));
    }
    let kernels: &'static dyn ColorKernels = match backend {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        Backend::Sse2 => &x86::SSE2,
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        Backend::Avx2 => &x86::AVX2,
        #[cfg(target_arch = "aarch64")]
        Backend::Neon => &neon::NEON,
        _ => &GENERIC,
    };
    Ok(kernels)
}

/// Scale kernels for a specific backend.
pub fn scale_kernels_for(backend: Backend) -> Result<&'static dyn ScaleKernels> {
    if !is_supported(KernelFamily::Scale, backend) {
        return Err(Error::BackendUnavailable(format!("{backend} scale kernels")));
    }
    let kernels: &'static dyn ScaleKernels = match backend {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        Backend::Sse2 => &x86::SSE2,
        #[cfg(target_arch = "aarch64")]
        Backend::Neon => &neon::NEON,
        _ => &GENERIC,
    };
    Ok(kernels)
}

/// Color kernels of the selected backend.
pub fn color_kernels() -> &'static dyn ColorKernels {
    color_kernels_for(backend(KernelFamily::Color)).unwrap_or(&GENERIC)
}

/// Scale kernels of the selected backend.
pub fn scale_kernels() -> &'static dyn ScaleKernels {
    scale_kernels_for(backend(KernelFamily::Scale)).unwrap_or(&GENERIC)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    // Selection is process-wide; tests that change it hold this lock.
    lazy_static! {
        pub(crate) static ref SELECTION_LOCK: Mutex<()> = Mutex::new(());
    }

    pub(crate) fn serial() -> std::sync::MutexGuard<'static, ()> {
        SELECTION_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_names_round_trip() {
        for b in [Backend::Generic, Backend::Sse2, Backend::Neon, Backend::Avx2] {
            assert_eq!(Backend::from_name(b.name()), Some(b));
        }
        assert_eq!(Backend::from_name("sse2"), Some(Backend::Sse2));
        assert_eq!(Backend::from_name("MMX"), None);
    }

    #[test]
    fn test_generic_always_supported() {
        assert!(is_supported(KernelFamily::Color, Backend::Generic));
        assert!(is_supported(KernelFamily::Scale, Backend::Generic));
        assert!(!is_supported(KernelFamily::Scale, Backend::Avx2));
    }

    #[test]
    fn test_detection_is_stable() {
        let _g = serial();
        reset_backends();
        let first = backend(KernelFamily::Color);
        assert_eq!(backend(KernelFamily::Color), first);
        assert!(is_supported(KernelFamily::Color, first));
        assert_eq!(color_kernels().backend(), first);
    }

    #[test]
    fn test_override_and_reset() {
        let _g = serial();
        set_backend(KernelFamily::Scale, "GENERIC").unwrap();
        assert_eq!(backend(KernelFamily::Scale), Backend::Generic);
        assert_eq!(scale_kernels().backend(), Backend::Generic);
        reset_backends();
        assert!(is_supported(KernelFamily::Scale, backend(KernelFamily::Scale)));
    }

    #[test]
    fn test_rejected_override_keeps_selection() {
        let _g = serial();
        set_backend(KernelFamily::Scale, "GENERIC").unwrap();
        assert!(matches!(
            set_backend(KernelFamily::Scale, "AVX2"),
            Err(Error::BackendUnavailable(_))
        ));
        assert!(matches!(
            set_backend(KernelFamily::Color, "3DNOW"),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(backend(KernelFamily::Scale), Backend::Generic);
        reset_backends();
    }

    #[test]
    fn test_unavailable_lookup_fails() {
        assert!(scale_kernels_for(Backend::Avx2).is_err());
        assert!(color_kernels_for(Backend::Generic).is_ok());
    }
}
