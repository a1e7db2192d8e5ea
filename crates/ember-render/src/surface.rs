//! Viewport size tracking with deferred resize.
//!
//! Window systems deliver size changes at arbitrary points, sometimes several
//! per frame and sometimes with a zero dimension (minimized windows, Wayland
//! before the first configure). [`ResizeQueue`] keeps only the latest request
//! and hands it out at the next frame boundary.

/// Minimum surface dimension (prevents zero-size textures).
pub const MIN_SURFACE_DIMENSION: u32 = 1;

/// Physical pixel dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysicalSize {
    pub width: u32,
    pub height: u32,
}

impl PhysicalSize {
    /// Clamp each dimension to at least [`MIN_SURFACE_DIMENSION`].
    pub fn clamped(width: u32, height: u32) -> Self {
        Self {
            width: width.max(MIN_SURFACE_DIMENSION),
            height: height.max(MIN_SURFACE_DIMENSION),
        }
    }

    /// Width over height.
    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Latest requested viewport, applied once per frame.
#[derive(Clone, Debug)]
pub struct ResizeQueue {
    current: PhysicalSize,
    pending: Option<PhysicalSize>,
}

impl ResizeQueue {
    /// Start at the given size, clamped to at least 1x1.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            current: PhysicalSize::clamped(width, height),
            pending: None,
        }
    }

    /// Record a resize. Zero-area requests are dropped; the last request
    /// before a frame wins.
    pub fn request(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring zero-size resize {width}x{height}");
            return;
        }
        self.pending = Some(PhysicalSize { width, height });
    }

    /// Take the pending size if it differs from the applied one.
    pub fn take(&mut self) -> Option<PhysicalSize> {
        let next = self.pending.take()?;
        if next == self.current {
            return None;
        }
        self.current = next;
        Some(next)
    }

    /// Last applied size.
    pub fn current(&self) -> PhysicalSize {
        self.current
    }

    /// Whether a resize differing from the current size is waiting.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some_and(|p| p != self.current)
    }
}
