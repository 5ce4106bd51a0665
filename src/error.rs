//! Error type shared by every fallible operation.
//!
//! Each variant is one error kind; the payload is a human-readable detail
//! string. Operations validate their preconditions and return the first
//! violation before touching any destination pixel.

use thiserror::Error;

/// Failure kinds reported by surface, rasterizer and transform operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Negative size/radius, too few points, out-of-range deltas.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Bit depth outside an algorithm's supported set.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Destination has the wrong size or format family, or overlaps the source.
    #[error("incompatible surfaces: {0}")]
    IncompatibleSurfaces(String),

    /// A scratch buffer or new surface could not be allocated.
    #[error("allocation failure: {0}")]
    AllocationFailure(String),

    /// An explicitly requested SIMD backend is not available.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Error::UnsupportedFormat(msg.into())
    }

    pub(crate) fn incompatible(msg: impl Into<String>) -> Self {
        Error::IncompatibleSurfaces(msg.into())
    }

    pub(crate) fn alloc(msg: impl Into<String>) -> Self {
        Error::AllocationFailure(msg.into())
    }
}

/// Allocate a zeroed vector, reporting failure instead of aborting.
pub(crate) fn try_zeroed<T: Clone + Default>(len: usize, what: &str) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| Error::alloc(format!("{what}: {len} elements")))?;
    v.resize(len, T::default());
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_kind() {
        let e = Error::invalid("radius must be >= 0");
        assert_eq!(e.to_string(), "invalid argument: radius must be >= 0");
        let e = Error::BackendUnavailable("AVX2".into());
        assert!(e.to_string().contains("AVX2"));
    }

    #[test]
    fn test_try_zeroed() {
        let v: Vec<u32> = try_zeroed(16, "scratch").unwrap();
        assert_eq!(v.len(), 16);
        assert!(v.iter().all(|&x| x == 0));
    }

    #[test]
    fn test_try_zeroed_huge_fails() {
        let r: Result<Vec<u64>> = try_zeroed(usize::MAX / 4, "huge");
        assert!(matches!(r, Err(Error::AllocationFailure(_))));
    }
}
