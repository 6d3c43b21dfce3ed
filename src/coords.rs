//! Screen/page coordinate mapping
//!
//! Highlights are stored in stable page coordinates: the rectangle a drag
//! would have produced at scale 1.0. Screen rectangles are only meaningful
//! together with the render scale they were captured at.

use serde::{Deserialize, Serialize};

/// A point in screen pixels, relative to the top-left of the rendered page
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, top-left corner plus non-negative size
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning two arbitrary corners
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    /// Both sides are at least `min`
    pub fn meets_min_size(&self, min: f64) -> bool {
        self.width >= min && self.height >= min
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    pub fn approx_eq(&self, other: &Rect, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.width - other.width).abs() <= epsilon
            && (self.height - other.height).abs() <= epsilon
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            x: f(self.x),
            y: f(self.y),
            width: f(self.width),
            height: f(self.height),
        }
    }
}

/// Render scale, always finite and strictly positive
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Scale(f64);

impl Scale {
    pub const ONE: Scale = Scale(1.0);

    /// Returns `None` for zero, negative, NaN or infinite factors
    pub fn new(factor: f64) -> Option<Self> {
        (factor.is_finite() && factor > 0.0).then_some(Self(factor))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::ONE
    }
}

/// Convert a rectangle captured at `scale` into stable page coordinates
#[must_use]
pub fn to_stable(screen: Rect, scale: Scale) -> Rect {
    screen.map(|v| v / scale.get())
}

/// Project a stable rectangle onto a page rendered at `scale`
#[must_use]
pub fn to_screen(stable: Rect, scale: Scale) -> Rect {
    stable.map(|v| v * scale.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn scale(f: f64) -> Scale {
        Scale::new(f).unwrap()
    }

    #[test]
    fn test_scale_rejects_non_positive() {
        assert!(Scale::new(0.0).is_none());
        assert!(Scale::new(-1.5).is_none());
        assert!(Scale::new(f64::NAN).is_none());
        assert!(Scale::new(f64::INFINITY).is_none());
        assert_eq!(Scale::new(0.5).map(Scale::get), Some(0.5));
    }

    #[test]
    fn test_round_trip_across_scales() {
        let rects = [
            Rect::new(100.0, 100.0, 50.0, 30.0),
            Rect::new(0.0, 0.0, 5.0, 5.0),
            Rect::new(12.345, 987.5, 0.001, 4321.0),
        ];
        for factor in [0.1, 0.5, 1.0, 1.5, 2.75, 3.0, 17.0] {
            for rect in rects {
                let back = to_screen(to_stable(rect, scale(factor)), scale(factor));
                assert!(back.approx_eq(&rect, EPS), "{rect:?} at {factor} -> {back:?}");
            }
        }
    }

    #[test]
    fn test_stable_rect_reprojects_at_new_scale() {
        let stable = to_stable(Rect::new(100.0, 100.0, 50.0, 30.0), scale(1.5));
        assert!(stable.approx_eq(&Rect::new(66.666_666, 66.666_666, 33.333_333, 20.0), 1e-5));

        let screen = to_screen(stable, scale(3.0));
        assert!(screen.approx_eq(&Rect::new(200.0, 200.0, 100.0, 60.0), EPS));
    }

    #[test]
    fn test_from_corners_normalizes() {
        let r = Rect::from_corners(Point::new(40.0, 10.0), Point::new(10.0, 30.0));
        assert_eq!(r, Rect::new(10.0, 10.0, 30.0, 20.0));
        assert!(r.meets_min_size(5.0));
        assert!(!Rect::new(0.0, 0.0, 4.9, 100.0).meets_min_size(5.0));
    }
}
