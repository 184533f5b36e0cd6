//=========================================================================
// Touch Geometry & Display Metrics
//=========================================================================
//
// Plain value types shared by touches and the dispatcher:
// - `Vec2`: 2D position / velocity in pixels
// - `DisplayMetrics`: clamp bounds and pixel density of the active display
// - `TapThresholds`: limits used by tap classification
//
//=========================================================================

//=== External Dependencies ===============================================

use std::ops::{Add, Div, Sub};

//=== Vec2 ================================================================

/// 2D vector in screen space (pixels, top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    #[inline]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Returns `true` if both components are finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Div<f32> for Vec2 {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

//=== DisplayMetrics ======================================================

/// Bounds and density of the display touches are reported on.
///
/// `pixel_density` is pixels per device-independent unit (e.g. DPI).
/// It is `None` when the platform cannot report it; tap classification
/// then refuses to answer instead of guessing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMetrics {
    pub width: f32,
    pub height: f32,
    pub pixel_density: Option<f32>,
}

impl DisplayMetrics {
    /// Metrics with unknown pixel density.
    pub const fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            pixel_density: None,
        }
    }

    /// Sets the pixel density (pixels per device-independent unit).
    pub const fn with_pixel_density(mut self, density: f32) -> Self {
        self.pixel_density = Some(density);
        self
    }

    /// Clamps `position` into `[0, width] x [0, height]`.
    pub fn clamp(&self, position: Vec2) -> Vec2 {
        Vec2::new(
            position.x.clamp(0.0, self.width.max(0.0)),
            position.y.clamp(0.0, self.height.max(0.0)),
        )
    }

    /// Converts a pixel length to device-independent units.
    ///
    /// Returns `None` if the density is unknown or not positive.
    pub fn to_units(&self, pixels: f32) -> Option<f32> {
        match self.pixel_density {
            Some(density) if density > 0.0 && density.is_finite() => Some(pixels / density),
            _ => None,
        }
    }
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

//=== TapThresholds =======================================================

/// Limits a touch must stay under to count as a tap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapThresholds {
    /// Maximum travel, in device-independent units (exclusive).
    pub max_distance: f32,

    /// Maximum duration, in seconds (exclusive).
    pub max_duration: f64,
}

impl TapThresholds {
    pub const DEFAULT: Self = Self {
        max_distance: 0.25,
        max_duration: 0.333,
    };
}

impl Default for TapThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
