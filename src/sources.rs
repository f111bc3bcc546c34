//! Current-source records.
//!
//! Both records are `#[repr(C)]` with a documented field order so that a
//! numerical host driving this engine through a fixed binary record layout
//! can construct source arrays directly. The field order is a compatibility
//! contract: `WireSegment` is (start, end, current, radius) and `Ring` is
//! (height, major radius, minor radius, current). Do not reorder.

use num_traits::Float;

/// A straight finite wire segment with a circular conductor cross-section.
///
/// Degenerate segments (`a0 == a1`) are not valid sources; the direction
/// vector must be non-zero.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WireSegment<T> {
    /// (m) segment start point
    pub a0: [T; 3],
    /// (m) segment end point
    pub a1: [T; 3],
    /// (A) signed current, positive flowing from `a0` toward `a1`
    pub current: T,
    /// (m) conductor cross-section radius, >= 0
    pub radius: T,
}

impl<T: Float> WireSegment<T> {
    pub fn new(a0: [T; 3], a1: [T; 3], current: T, radius: T) -> Self {
        Self {
            a0,
            a1,
            current,
            radius,
        }
    }

    /// (m) direction vector from start to end, not normalized.
    #[inline]
    pub fn direction(&self) -> [T; 3] {
        [
            self.a1[0] - self.a0[0],
            self.a1[1] - self.a0[1],
            self.a1[2] - self.a0[2],
        ]
    }
}

/// A circular current loop centered on the z axis, lying in the plane
/// `z = height` with a circular conductor cross-section.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ring<T> {
    /// (m) offset of the loop plane along the symmetry (z) axis
    pub height: T,
    /// (m) loop major radius, > 0
    pub major_radius: T,
    /// (m) conductor cross-section (minor) radius, >= 0
    pub minor_radius: T,
    /// (A) signed loop current, positive counterclockwise seen from +z
    pub current: T,
}

impl<T: Float> Ring<T> {
    pub fn new(height: T, major_radius: T, minor_radius: T, current: T) -> Self {
        Self {
            height,
            major_radius,
            minor_radius,
            current,
        }
    }
}
