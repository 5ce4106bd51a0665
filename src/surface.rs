//! Surfaces: 2D pixel buffers with format metadata.
//!
//! A [`Surface`] either owns its pixel memory or observes a window into
//! memory it does not own:
//!
//! - [`Surface::new`] / [`Surface::from_vec`] allocate or adopt a buffer.
//! - [`Surface::from_raw`] wraps externally supplied memory (the caller
//!   keeps it alive).
//! - [`Surface::subsurface`] shares the parent's buffer and records the
//!   owner handle plus its offset; it never claims the memory.
//!
//! Row access follows the row-accessor pattern: `row(y)` / `row_mut(y)`
//! return exactly `width * bytes_per_pixel` bytes starting at
//! `y * pitch`. Slices come wrapped in [`Pixels`] / [`PixelsMut`] guards
//! that register their byte range with the shared buffer, so a subsurface
//! cannot write bytes its parent is reading (or the other way round).
//! Conflicting accessors panic like `RefCell`; the `try_` forms return
//! [`Error::IncompatibleSurfaces`] instead.
//!
//! Locking is a re-entrant counter on the shared buffer, held through a
//! scoped [`SurfaceLock`] guard. Surfaces are `Send` and `Sync`.

use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::basics::RectI;
use crate::color::Rgba8;
use crate::error::{try_zeroed, Error, Result};
use crate::pixel_format::PixelFormat;

// ============================================================================
// Raw pixel load/store
// ============================================================================

/// Load one packed pixel of `bpp` bytes (1..=4) from the front of `p`.
///
/// 24-bit pixels are assembled in native byte order so that a channel at
/// shift `s` lives at byte `s / 8` on little-endian hosts and at byte
/// `2 - s / 8` on big-endian hosts.
#[inline]
pub fn read_pixel(p: &[u8], bpp: usize) -> u32 {
    match bpp {
        1 => p[0] as u32,
        2 => u16::from_ne_bytes([p[0], p[1]]) as u32,
        3 => {
            if cfg!(target_endian = "little") {
                p[0] as u32 | (p[1] as u32) << 8 | (p[2] as u32) << 16
            } else {
                (p[0] as u32) << 16 | (p[1] as u32) << 8 | p[2] as u32
            }
        }
        _ => u32::from_ne_bytes([p[0], p[1], p[2], p[3]]),
    }
}

/// Store one packed pixel of `bpp` bytes (1..=4) at the front of `p`.
#[inline]
pub fn write_pixel(p: &mut [u8], bpp: usize, value: u32) {
    match bpp {
        1 => p[0] = value as u8,
        2 => p[..2].copy_from_slice(&(value as u16).to_ne_bytes()),
        3 => {
            if cfg!(target_endian = "little") {
                p[0] = value as u8;
                p[1] = (value >> 8) as u8;
                p[2] = (value >> 16) as u8;
            } else {
                p[0] = (value >> 16) as u8;
                p[1] = (value >> 8) as u8;
                p[2] = value as u8;
            }
        }
        _ => p[..4].copy_from_slice(&value.to_ne_bytes()),
    }
}

// ============================================================================
// Shared pixel storage
// ============================================================================

static NEXT_OWNER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle of the surface that owns (or first wrapped) a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

/// Byte range of the buffer currently handed out as a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Borrow {
    start: usize,
    end: usize,
    exclusive: bool,
}

impl Borrow {
    fn conflicts(&self, other: &Borrow) -> bool {
        (self.exclusive || other.exclusive) && self.start < other.end && other.start < self.end
    }
}

struct PixelStore {
    ptr: NonNull<u8>,
    len: usize,
    id: OwnerId,
    locks: AtomicU32,
    // Slices handed out by every surface viewing this buffer.
    borrows: Mutex<Vec<Borrow>>,
    // Keeps owned memory alive; `None` for wrapped external memory.
    _owned: Option<Vec<u8>>,
}

// The bytes behind `ptr` are only reached through `acquire`, which refuses
// a range that overlaps an outstanding exclusive borrow.
unsafe impl Send for PixelStore {}
unsafe impl Sync for PixelStore {}

impl PixelStore {
    fn owned(mut data: Vec<u8>) -> Self {
        let ptr = NonNull::new(data.as_mut_ptr()).unwrap_or_else(NonNull::dangling);
        let mut store = unsafe { Self::external(ptr, data.len()) };
        store._owned = Some(data);
        store
    }

    unsafe fn external(ptr: NonNull<u8>, len: usize) -> Self {
        Self {
            ptr,
            len,
            id: OwnerId(NEXT_OWNER_ID.fetch_add(1, Ordering::Relaxed)),
            locks: AtomicU32::new(0),
            borrows: Mutex::new(Vec::new()),
            _owned: None,
        }
    }

    fn acquire(&self, start: usize, len: usize, exclusive: bool) -> Result<Borrow> {
        debug_assert!(start + len <= self.len);
        let borrow = Borrow {
            start,
            end: start + len,
            exclusive,
        };
        if len == 0 {
            return Ok(borrow);
        }
        let mut active = self.borrows.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(held) = active.iter().find(|held| held.conflicts(&borrow)) {
            let how = if held.exclusive { "mutably" } else { "immutably" };
            return Err(Error::incompatible(format!(
                "bytes {}..{} are already borrowed {how} through a surface sharing this buffer",
                held.start, held.end
            )));
        }
        active.push(borrow);
        Ok(borrow)
    }

    fn release(&self, borrow: Borrow) {
        if borrow.start == borrow.end {
            return;
        }
        let mut active = self.borrows.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(i) = active.iter().position(|held| *held == borrow) {
            active.swap_remove(i);
        }
    }
}

/// Scoped pixel lock. Dropping it releases one level of locking.
pub struct SurfaceLock {
    store: Arc<PixelStore>,
}

impl Drop for SurfaceLock {
    fn drop(&mut self) {
        let _ = self
            .store
            .locks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)));
    }
}

/// Read-only pixel bytes of a surface.
///
/// While it lives, no surface sharing the buffer can hand out the same
/// bytes mutably.
pub struct Pixels<'a> {
    store: &'a PixelStore,
    borrow: Borrow,
    bytes: &'a [u8],
}

impl Deref for Pixels<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl Drop for Pixels<'_> {
    fn drop(&mut self) {
        self.store.release(self.borrow);
    }
}

/// Writable pixel bytes of a surface. No other view of the buffer may
/// touch these bytes while it lives.
pub struct PixelsMut<'a> {
    store: &'a PixelStore,
    borrow: Borrow,
    bytes: &'a mut [u8],
}

impl Deref for PixelsMut<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl DerefMut for PixelsMut<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        self.bytes
    }
}

impl Drop for PixelsMut<'_> {
    fn drop(&mut self) {
        self.store.release(self.borrow);
    }
}

// ============================================================================
// Surface
// ============================================================================

/// Whether alpha compositing is applied when this surface is blitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Opaque overwrite.
    #[default]
    None,
    /// Per-pixel alpha (times the surface alpha modulation) is composited.
    Blend,
}

/// Back-reference from a subsurface to the buffer owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsurfaceLink {
    pub owner: OwnerId,
    /// Offset inside the immediate parent.
    pub offset_x: i32,
    pub offset_y: i32,
}

/// An in-memory 2D pixel buffer with format metadata.
pub struct Surface {
    store: Arc<PixelStore>,
    offset: usize,
    width: u32,
    height: u32,
    pitch: usize,
    format: PixelFormat,
    clip: RectI,
    colorkey: Option<u32>,
    alpha_mod: u8,
    blend_mode: BlendMode,
    rle: bool,
    parent: Option<SubsurfaceLink>,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pitch", &self.pitch)
            .field("bpp", &self.format.bytes_per_pixel())
            .field("clip", &self.clip)
            .field("parent", &self.parent)
            .finish()
    }
}

impl Surface {
    /// Allocate a zero-filled surface. Rows are padded to 4 bytes.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        let bpp = format.bytes_per_pixel();
        let pitch = (width as usize * bpp + 3) & !3;
        let len = pitch
            .checked_mul(height as usize)
            .ok_or_else(|| Error::alloc(format!("{width}x{height} surface")))?;
        let data = try_zeroed::<u8>(len, "surface pixels")?;
        Ok(Self::with_store(Arc::new(PixelStore::owned(data)), 0, width, height, pitch, format))
    }

    /// Adopt an existing byte vector as the pixel buffer.
    pub fn from_vec(width: u32, height: u32, pitch: usize, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        Self::check_geometry(width, height, pitch, &format, data.len())?;
        Ok(Self::with_store(Arc::new(PixelStore::owned(data)), 0, width, height, pitch, format))
    }

    /// Wrap externally owned memory.
    ///
    /// # Safety
    /// `ptr` must point to at least `pitch * height` writable bytes that stay
    /// valid, and are not accessed through other paths while any surface
    /// created from them is in use.
    pub unsafe fn from_raw(
        ptr: *mut u8,
        width: u32,
        height: u32,
        pitch: usize,
        format: PixelFormat,
    ) -> Result<Self> {
        let ptr = NonNull::new(ptr).ok_or_else(|| Error::invalid("null pixel pointer"))?;
        let len = pitch
            .checked_mul(height as usize)
            .ok_or_else(|| Error::invalid(format!("pitch {pitch} times {height} rows overflows")))?;
        Self::check_geometry(width, height, pitch, &format, len)?;
        Ok(Self::with_store(Arc::new(PixelStore::external(ptr, len)), 0, width, height, pitch, format))
    }

    fn check_geometry(width: u32, height: u32, pitch: usize, format: &PixelFormat, len: usize) -> Result<()> {
        let row = width as usize * format.bytes_per_pixel();
        if pitch < row {
            return Err(Error::invalid(format!("pitch {pitch} shorter than row of {row} bytes")));
        }
        let needed = match height {
            0 => 0,
            h => pitch
                .checked_mul(h as usize - 1)
                .and_then(|n| n.checked_add(row))
                .ok_or_else(|| Error::invalid(format!("pitch {pitch} times {h} rows overflows")))?,
        };
        if len < needed {
            return Err(Error::invalid(format!("buffer of {len} bytes, need {needed}")));
        }
        Ok(())
    }

    fn with_store(
        store: Arc<PixelStore>,
        offset: usize,
        width: u32,
        height: u32,
        pitch: usize,
        format: PixelFormat,
    ) -> Self {
        Self {
            store,
            offset,
            width,
            height,
            pitch,
            format,
            clip: RectI::from_xywh(0, 0, width as i32, height as i32),
            colorkey: None,
            alpha_mod: 255,
            blend_mode: BlendMode::None,
            rle: false,
            parent: None,
        }
    }

    /// A view onto `rect` of this surface, sharing its memory.
    pub fn subsurface(&self, rect: RectI) -> Result<Self> {
        if !rect.is_valid() || rect.x1 < 0 || rect.y1 < 0 || rect.x2 >= self.width as i32 || rect.y2 >= self.height as i32
        {
            return Err(Error::invalid(format!("subsurface rectangle {rect:?} outside surface")));
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = self.offset + rect.y1 as usize * self.pitch + rect.x1 as usize * bpp;
        let mut sub = Self::with_store(
            Arc::clone(&self.store),
            offset,
            rect.width() as u32,
            rect.height() as u32,
            self.pitch,
            self.format.clone(),
        );
        sub.colorkey = self.colorkey;
        sub.alpha_mod = self.alpha_mod;
        sub.blend_mode = self.blend_mode;
        sub.parent = Some(SubsurfaceLink {
            owner: self.store.id,
            offset_x: rect.x1,
            offset_y: rect.y1,
        });
        Ok(sub)
    }

    /// New blank surface of the given size inheriting format, palette,
    /// colorkey, alpha modulation, blend mode and RLE flag.
    pub fn new_like(&self, width: u32, height: u32) -> Result<Self> {
        let mut out = Self::new(width, height, self.format.clone())?;
        out.colorkey = self.colorkey;
        out.alpha_mod = self.alpha_mod;
        out.blend_mode = self.blend_mode;
        out.rle = self.rle;
        Ok(out)
    }

    /// Deep copy into a freshly owned buffer.
    pub fn copy(&self) -> Result<Self> {
        let mut out = self.new_like(self.width, self.height)?;
        out.clip = self.clip;
        for y in 0..self.height {
            out.row_mut(y).copy_from_slice(&self.row(y));
        }
        Ok(out)
    }

    // ------------------------------------------------------------------------
    // Geometry and metadata
    // ------------------------------------------------------------------------

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    #[inline]
    pub fn format(&self) -> &PixelFormat {
        &self.format
    }

    /// Mutable format access, e.g. to replace a palette.
    pub fn format_mut(&mut self) -> &mut PixelFormat {
        &mut self.format
    }

    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    /// Bytes of pixel data in one row (without padding).
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// The full-surface rectangle.
    pub fn rect(&self) -> RectI {
        RectI::from_xywh(0, 0, self.width as i32, self.height as i32)
    }

    #[inline]
    pub fn clip_rect(&self) -> RectI {
        self.clip
    }

    /// Set the clip rectangle, clamped to the surface. `None` resets it to
    /// the full surface.
    pub fn set_clip_rect(&mut self, rect: Option<RectI>) {
        self.clip = match rect {
            Some(r) => r.intersect(&self.rect()),
            None => self.rect(),
        };
    }

    pub fn colorkey(&self) -> Option<u32> {
        self.colorkey
    }

    pub fn set_colorkey(&mut self, key: Option<u32>) {
        self.colorkey = key;
    }

    pub fn alpha_mod(&self) -> u8 {
        self.alpha_mod
    }

    pub fn set_alpha_mod(&mut self, alpha: u8) {
        self.alpha_mod = alpha;
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    pub fn has_rle(&self) -> bool {
        self.rle
    }

    pub fn set_rle(&mut self, rle: bool) {
        self.rle = rle;
    }

    pub fn parent(&self) -> Option<SubsurfaceLink> {
        self.parent
    }

    pub fn is_subsurface(&self) -> bool {
        self.parent.is_some()
    }

    /// Handle of the buffer owner this surface reads and writes through.
    pub fn owner_id(&self) -> OwnerId {
        self.store.id
    }

    /// Position of this surface's origin inside the owner's buffer.
    pub fn abs_offset(&self) -> (i32, i32) {
        if self.pitch == 0 {
            return (0, 0);
        }
        let y = self.offset / self.pitch;
        let x = (self.offset % self.pitch) / self.format.bytes_per_pixel();
        (x as i32, y as i32)
    }

    // ------------------------------------------------------------------------
    // Locking
    // ------------------------------------------------------------------------

    /// Acquire a re-entrant lock on the pixel memory. Subsurfaces lock the
    /// shared buffer, so the owner reports locked too.
    pub fn lock(&self) -> SurfaceLock {
        self.store.locks.fetch_add(1, Ordering::AcqRel);
        SurfaceLock {
            store: Arc::clone(&self.store),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock_count() > 0
    }

    pub fn lock_count(&self) -> u32 {
        self.store.locks.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------------
    // Raw memory access
    // ------------------------------------------------------------------------

    /// Length of the addressable window: full pitch for every row but the
    /// last, which ends at the last pixel.
    #[inline]
    fn window_len(&self) -> usize {
        if self.height == 0 {
            0
        } else {
            self.pitch * (self.height as usize - 1) + self.row_bytes()
        }
    }

    /// Address range `[start, end)` of this surface's pixel window.
    pub fn memory_range(&self) -> std::ops::Range<usize> {
        let start = self.store.ptr.as_ptr() as usize + self.offset;
        start..start + self.window_len()
    }

    /// True when both surfaces read or write any common byte range.
    pub fn shares_memory_with(&self, other: &Surface) -> bool {
        let a = self.memory_range();
        let b = other.memory_range();
        if a.is_empty() || b.is_empty() {
            return false;
        }
        a.start < b.end && b.start < a.end
    }

    /// Borrow `len` bytes starting `start` bytes into this surface's window.
    fn view(&self, start: usize, len: usize) -> Result<Pixels<'_>> {
        let at = self.offset + start;
        let borrow = self.store.acquire(at, len, false)?;
        let bytes = unsafe { std::slice::from_raw_parts(self.store.ptr.as_ptr().add(at), len) };
        Ok(Pixels {
            store: &self.store,
            borrow,
            bytes,
        })
    }

    fn view_mut(&mut self, start: usize, len: usize) -> Result<PixelsMut<'_>> {
        let at = self.offset + start;
        let borrow = self.store.acquire(at, len, true)?;
        let bytes = unsafe { std::slice::from_raw_parts_mut(self.store.ptr.as_ptr().add(at), len) };
        Ok(PixelsMut {
            store: &self.store,
            borrow,
            bytes,
        })
    }

    /// All pixel bytes, row-major with `pitch` stride, or an error when a
    /// surface sharing the buffer is writing any of them.
    pub fn try_pixels(&self) -> Result<Pixels<'_>> {
        self.view(0, self.window_len())
    }

    /// Mutable pixel bytes, or an error when a surface sharing the buffer
    /// holds any of them.
    pub fn try_pixels_mut(&mut self) -> Result<PixelsMut<'_>> {
        self.view_mut(0, self.window_len())
    }

    /// All pixel bytes, row-major with `pitch` stride.
    ///
    /// # Panics
    /// When a surface sharing the buffer holds any of these bytes mutably.
    pub fn pixels(&self) -> Pixels<'_> {
        self.try_pixels().unwrap_or_else(|e| panic!("{e}"))
    }

    /// Mutable pixel bytes, row-major with `pitch` stride.
    ///
    /// # Panics
    /// When a surface sharing the buffer holds any of these bytes.
    pub fn pixels_mut(&mut self) -> PixelsMut<'_> {
        self.try_pixels_mut().unwrap_or_else(|e| panic!("{e}"))
    }

    /// One row of pixel data.
    #[inline]
    pub fn row(&self, y: u32) -> Pixels<'_> {
        self.try_row(y).unwrap_or_else(|e| panic!("{e}"))
    }

    /// One mutable row of pixel data.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> PixelsMut<'_> {
        self.try_row_mut(y).unwrap_or_else(|e| panic!("{e}"))
    }

    /// [`row`](Self::row) reporting a conflicting borrow as an error.
    pub fn try_row(&self, y: u32) -> Result<Pixels<'_>> {
        assert!(y < self.height, "row {y} out of range");
        self.view(y as usize * self.pitch, self.row_bytes())
    }

    pub fn try_row_mut(&mut self, y: u32) -> Result<PixelsMut<'_>> {
        assert!(y < self.height, "row {y} out of range");
        let n = self.row_bytes();
        self.view_mut(y as usize * self.pitch, n)
    }

    /// Byte offset of (x, y) inside [`pixels`](Self::pixels), unchecked.
    #[inline]
    pub fn offset_of(&self, x: i32, y: i32) -> usize {
        y as usize * self.pitch + x as usize * self.format.bytes_per_pixel()
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Address of the pixel at (x, y).
    pub fn pixel_address(&self, x: i32, y: i32) -> Result<*mut u8> {
        if !self.in_bounds(x, y) {
            return Err(Error::invalid(format!("pixel ({x}, {y}) outside surface")));
        }
        Ok(unsafe { self.store.ptr.as_ptr().add(self.offset + self.offset_of(x, y)) })
    }

    /// Packed value of the pixel at (x, y).
    pub fn get_at(&self, x: i32, y: i32) -> Result<u32> {
        if !self.in_bounds(x, y) {
            return Err(Error::invalid(format!("pixel ({x}, {y}) outside surface")));
        }
        Ok(self.get_raw(x, y))
    }

    /// Store a packed value at (x, y). Writes outside the clip rectangle
    /// are ignored.
    pub fn set_at(&mut self, x: i32, y: i32, value: u32) -> Result<()> {
        if !self.in_bounds(x, y) {
            return Err(Error::invalid(format!("pixel ({x}, {y}) outside surface")));
        }
        if self.clip.hit_test(x, y) {
            self.put_raw(x, y, value);
        }
        Ok(())
    }

    /// Decoded color of the pixel at (x, y).
    pub fn get_color(&self, x: i32, y: i32) -> Result<Rgba8> {
        Ok(self.format.decode(self.get_at(x, y)?))
    }

    /// Encode and store a color at (x, y), honoring the clip rectangle.
    pub fn set_color(&mut self, x: i32, y: i32, c: Rgba8) -> Result<()> {
        let v = self.format.encode(c);
        self.set_at(x, y, v)
    }

    /// Unchecked load; (x, y) must be inside the surface.
    #[inline]
    pub(crate) fn get_raw(&self, x: i32, y: i32) -> u32 {
        let bpp = self.bytes_per_pixel();
        read_pixel(&self.view(self.offset_of(x, y), bpp).unwrap_or_else(|e| panic!("{e}")), bpp)
    }

    /// Unchecked store; (x, y) must be inside the surface.
    #[inline]
    pub(crate) fn put_raw(&mut self, x: i32, y: i32, value: u32) {
        let off = self.offset_of(x, y);
        let bpp = self.bytes_per_pixel();
        write_pixel(&mut self.view_mut(off, bpp).unwrap_or_else(|e| panic!("{e}")), bpp, value);
    }

    // ------------------------------------------------------------------------
    // Fills
    // ------------------------------------------------------------------------

    /// Fill the clip rectangle with a packed value.
    pub fn fill(&mut self, value: u32) -> RectI {
        self.fill_rect(None, value)
    }

    /// Fill `rect` (or the whole surface) intersected with the clip
    /// rectangle. Returns the area actually written.
    pub fn fill_rect(&mut self, rect: Option<RectI>, value: u32) -> RectI {
        let mut area = rect.unwrap_or_else(|| self.rect());
        area.normalize();
        if !area.clip(&self.clip) {
            return RectI::empty();
        }
        let bpp = self.bytes_per_pixel();
        let mut px = [0u8; 4];
        write_pixel(&mut px, bpp, value);
        for y in area.y1..=area.y2 {
            let start = self.offset_of(area.x1, y);
            let end = self.offset_of(area.x2 + 1, y);
            let mut line = self.view_mut(start, end - start).unwrap_or_else(|e| panic!("{e}"));
            if bpp == 1 {
                line.fill(px[0]);
            } else {
                for chunk in line.chunks_exact_mut(bpp) {
                    chunk.copy_from_slice(&px[..bpp]);
                }
            }
        }
        area
    }

    /// Pixel-for-pixel equality of the visible contents (padding ignored).
    pub fn same_pixels(&self, other: &Surface) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.bytes_per_pixel() == other.bytes_per_pixel()
            && (0..self.height).all(|y| *self.row(y) == *other.row(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_format::Palette;

    #[test]
    fn test_new_pads_pitch() {
        let s = Surface::new(3, 2, PixelFormat::rgb888()).unwrap();
        assert_eq!(s.pitch(), 12);
        assert_eq!(s.row_bytes(), 9);
        assert_eq!(s.row(1).len(), 9);
        assert!(s.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_vec_validates_geometry() {
        let f = PixelFormat::argb8888();
        assert!(Surface::from_vec(4, 4, 8, f.clone(), vec![0; 64]).is_err());
        assert!(Surface::from_vec(4, 4, 16, f.clone(), vec![0; 63]).is_err());
        assert!(Surface::from_vec(4, 4, 16, f, vec![0; 64]).is_ok());
    }

    #[test]
    fn test_read_write_pixel_all_widths() {
        for bpp in 1..=4usize {
            let mut buf = [0u8; 4];
            let v = 0x00A1_B2C3 & ((1u64 << (bpp * 8)) - 1) as u32;
            write_pixel(&mut buf, bpp, v);
            assert_eq!(read_pixel(&buf, bpp), v, "bpp {bpp}");
        }
    }

    #[test]
    fn test_24bit_channel_bytes_follow_shift() {
        let f = PixelFormat::rgb888();
        let mut s = Surface::new(1, 1, f.clone()).unwrap();
        s.set_color(0, 0, Rgba8::new_opaque(10, 20, 30)).unwrap();
        let p = s.row(0);
        assert_eq!(p[f.channel_byte(crate::pixel_format::R).unwrap()], 10);
        assert_eq!(p[f.channel_byte(crate::pixel_format::G).unwrap()], 20);
        assert_eq!(p[f.channel_byte(crate::pixel_format::B).unwrap()], 30);
    }

    #[test]
    fn test_get_set_bounds() {
        let mut s = Surface::new(4, 4, PixelFormat::argb8888()).unwrap();
        assert!(s.get_at(4, 0).is_err());
        assert!(s.get_at(-1, 0).is_err());
        assert!(s.set_at(0, 4, 1).is_err());
        assert!(s.pixel_address(3, 3).is_ok());
        assert!(s.pixel_address(3, 4).is_err());
        s.set_at(1, 2, 0xDEAD_BEEF).unwrap();
        assert_eq!(s.get_at(1, 2).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_pixel_address_matches_pitch() {
        let s = Surface::new(5, 3, PixelFormat::rgb888()).unwrap();
        let base = s.pixel_address(0, 0).unwrap() as usize;
        let p = s.pixel_address(2, 1).unwrap() as usize;
        assert_eq!(p - base, s.pitch() + 2 * 3);
    }

    #[test]
    fn test_set_at_respects_clip() {
        let mut s = Surface::new(4, 4, PixelFormat::argb8888()).unwrap();
        s.set_clip_rect(Some(RectI::new(1, 1, 2, 2)));
        s.set_at(0, 0, 7).unwrap();
        s.set_at(1, 1, 7).unwrap();
        assert_eq!(s.get_at(0, 0).unwrap(), 0);
        assert_eq!(s.get_at(1, 1).unwrap(), 7);
    }

    #[test]
    fn test_clip_clamped_to_surface() {
        let mut s = Surface::new(4, 4, PixelFormat::argb8888()).unwrap();
        s.set_clip_rect(Some(RectI::new(-5, 2, 10, 10)));
        assert_eq!(s.clip_rect(), RectI::new(0, 2, 3, 3));
        s.set_clip_rect(None);
        assert_eq!(s.clip_rect(), s.rect());
    }

    #[test]
    fn test_subsurface_shares_memory() {
        let mut parent = Surface::new(8, 8, PixelFormat::argb8888()).unwrap();
        let mut sub = parent.subsurface(RectI::new(2, 3, 5, 6)).unwrap();
        assert_eq!((sub.width(), sub.height()), (4, 4));
        assert_eq!(sub.abs_offset(), (2, 3));
        assert_eq!(sub.parent().unwrap().owner, parent.owner_id());
        assert!(sub.shares_memory_with(&parent));

        sub.set_at(0, 0, 0x1234_5678).unwrap();
        assert_eq!(parent.get_at(2, 3).unwrap(), 0x1234_5678);

        parent.set_at(5, 6, 42).unwrap();
        assert_eq!(sub.get_at(3, 3).unwrap(), 42);
    }

    #[test]
    fn test_subsurface_rejects_outside_rect() {
        let s = Surface::new(4, 4, PixelFormat::argb8888()).unwrap();
        assert!(s.subsurface(RectI::new(2, 2, 4, 3)).is_err());
        assert!(s.subsurface(RectI::new(-1, 0, 1, 1)).is_err());
    }

    #[test]
    fn test_nested_subsurface_offsets() {
        let s = Surface::new(10, 10, PixelFormat::argb8888()).unwrap();
        let a = s.subsurface(RectI::new(2, 2, 8, 8)).unwrap();
        let b = a.subsurface(RectI::new(1, 1, 3, 3)).unwrap();
        assert_eq!(b.parent().unwrap().offset_x, 1);
        assert_eq!(b.abs_offset(), (3, 3));
        assert_eq!(b.owner_id(), s.owner_id());
    }

    #[test]
    fn test_distinct_surfaces_do_not_share() {
        let a = Surface::new(4, 4, PixelFormat::argb8888()).unwrap();
        let b = Surface::new(4, 4, PixelFormat::argb8888()).unwrap();
        assert!(!a.shares_memory_with(&b));
        assert_ne!(a.owner_id(), b.owner_id());
    }

    #[test]
    fn test_lock_is_reentrant_and_scoped() {
        let s = Surface::new(2, 2, PixelFormat::argb8888()).unwrap();
        let sub = s.subsurface(RectI::new(0, 0, 0, 0)).unwrap();
        assert!(!s.is_locked());
        {
            let _a = s.lock();
            let _b = s.lock();
            assert_eq!(s.lock_count(), 2);
            let _c = sub.lock();
            assert_eq!(s.lock_count(), 3);
        }
        assert!(!s.is_locked());
    }

    #[test]
    fn test_from_raw_wraps_external_memory() {
        let mut mem = vec![0u8; 4 * 4 * 4];
        let mut s = unsafe { Surface::from_raw(mem.as_mut_ptr(), 4, 4, 16, PixelFormat::argb8888()).unwrap() };
        s.set_at(1, 0, 0x0102_0304).unwrap();
        drop(s);
        assert_eq!(u32::from_ne_bytes([mem[4], mem[5], mem[6], mem[7]]), 0x0102_0304);
    }

    #[test]
    fn test_from_raw_rejects_overflowing_geometry() {
        let mut mem = [0u8; 16];
        let r = unsafe { Surface::from_raw(mem.as_mut_ptr(), 1, u32::MAX, usize::MAX / 2, PixelFormat::argb8888()) };
        assert!(matches!(r, Err(Error::InvalidArgument(_))));
        let r = Surface::from_vec(1, 3, usize::MAX / 2, PixelFormat::argb8888(), vec![0; 16]);
        assert!(matches!(r, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_subsurface_cannot_write_bytes_parent_reads() {
        let parent = Surface::new(4, 4, PixelFormat::argb8888()).unwrap();
        let mut sub = parent.subsurface(RectI::new(0, 0, 1, 1)).unwrap();
        let shared = parent.row(0);
        assert!(matches!(sub.try_row_mut(0), Err(Error::IncompatibleSurfaces(_))));
        assert!(matches!(sub.try_pixels_mut(), Err(Error::IncompatibleSurfaces(_))));
        assert!(sub.try_row(0).is_ok());
        assert_eq!(shared[0], 0);
        drop(shared);

        sub.row_mut(0)[0] = 0xAB;
        assert_eq!(parent.row(0)[0], 0xAB);
    }

    #[test]
    fn test_parent_cannot_read_bytes_subsurface_writes() {
        let parent = Surface::new(4, 4, PixelFormat::argb8888()).unwrap();
        let mut sub = parent.subsurface(RectI::new(1, 1, 2, 2)).unwrap();
        let mut rows = sub.pixels_mut();
        rows[0] = 1;
        assert!(parent.try_row(1).is_err());
        assert!(parent.try_row(0).is_ok());
        drop(rows);
        assert_eq!(parent.row(1)[4], 1);
    }

    #[test]
    #[should_panic(expected = "already borrowed")]
    fn test_conflicting_row_access_panics() {
        let parent = Surface::new(4, 4, PixelFormat::argb8888()).unwrap();
        let mut sub = parent.subsurface(RectI::new(0, 0, 1, 1)).unwrap();
        let _shared = parent.row(0);
        sub.row_mut(0)[0] = 0xAB;
    }

    #[test]
    fn test_disjoint_rows_of_shared_buffer_coexist() {
        let parent = Surface::new(4, 4, PixelFormat::argb8888()).unwrap();
        let mut sub = parent.subsurface(RectI::new(0, 2, 3, 3)).unwrap();
        let top = parent.row(0);
        sub.row_mut(0).fill(7);
        assert_eq!(top[0], 0);
        drop(top);
        assert_eq!(parent.get_at(0, 2).unwrap(), 0x0707_0707);
    }

    #[test]
    fn test_surfaces_move_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Surface>();
        assert_send_sync::<SurfaceLock>();

        let parent = Surface::new(4, 4, PixelFormat::argb8888()).unwrap();
        let sub = parent.subsurface(RectI::new(0, 3, 3, 3)).unwrap();
        let worker = std::thread::spawn(move || {
            let mut sub = sub;
            sub.fill(0x0102_0304);
            sub.lock_count()
        });
        assert_eq!(worker.join().unwrap(), 0);
        assert_eq!(parent.get_at(3, 3).unwrap(), 0x0102_0304);
        assert_eq!(parent.get_at(3, 2).unwrap(), 0);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut s = Surface::new(6, 6, PixelFormat::rgb565()).unwrap();
        s.set_clip_rect(Some(RectI::new(1, 1, 4, 4)));
        let area = s.fill_rect(Some(RectI::new(3, 3, 10, 10)), 0xF800);
        assert_eq!(area, RectI::new(3, 3, 4, 4));
        assert_eq!(s.get_at(4, 4).unwrap(), 0xF800);
        assert_eq!(s.get_at(5, 5).unwrap(), 0);
        assert_eq!(s.get_at(2, 2).unwrap(), 0);
    }

    #[test]
    fn test_new_like_inherits_metadata() {
        let pal = Palette::grayscale();
        let mut s = Surface::new(2, 2, PixelFormat::indexed8(pal.clone())).unwrap();
        s.set_colorkey(Some(3));
        s.set_alpha_mod(99);
        s.set_blend_mode(BlendMode::Blend);
        s.set_rle(true);
        let n = s.new_like(5, 1).unwrap();
        assert_eq!(n.format().palette(), Some(&pal));
        assert_eq!(n.colorkey(), Some(3));
        assert_eq!(n.alpha_mod(), 99);
        assert_eq!(n.blend_mode(), BlendMode::Blend);
        assert!(n.has_rle());
        assert_eq!((n.width(), n.height()), (5, 1));
    }

    #[test]
    fn test_copy_is_deep() {
        let mut s = Surface::new(3, 3, PixelFormat::argb8888()).unwrap();
        s.fill(0xFF00_FF00);
        let c = s.copy().unwrap();
        assert!(c.same_pixels(&s));
        assert!(!c.shares_memory_with(&s));
    }
}
