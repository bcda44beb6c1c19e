//! Axis-aligned box geometry in normalized image coordinates.

/// Box stored as top-left corner plus size.
///
/// Coordinates are fractions of the image size and are not clamped, so
/// boxes near the border may extend below 0 or beyond 1.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoxGeom {
    pub x1: f32,
    pub y1: f32,
    pub width: f32,
    pub height: f32,
}

impl BoxGeom {
    pub fn new(x1: f32, y1: f32, width: f32, height: f32) -> Self {
        Self {
            x1,
            y1,
            width,
            height,
        }
    }

    /// Builds a box from its center and size.
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    /// Right edge.
    pub fn x2(&self) -> f32 {
        self.x1 + self.width
    }

    /// Bottom edge.
    pub fn y2(&self) -> f32 {
        self.y1 + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Overlap area; zero for disjoint boxes.
    pub fn intersection(&self, other: &BoxGeom) -> f32 {
        let left = self.x1.max(other.x1);
        let top = self.y1.max(other.y1);
        let right = self.x2().min(other.x2());
        let bottom = self.y2().min(other.y2());
        (right - left).max(0.0) * (bottom - top).max(0.0)
    }

    /// Intersection over union.
    ///
    /// Two zero-area boxes yield NaN, which compares false against any
    /// threshold.
    pub fn iou(&self, other: &BoxGeom) -> f32 {
        let inter = self.intersection(other);
        inter / (self.area() + other.area() - inter)
    }

    /// Clips the box to the unit square.
    pub fn clamped(&self) -> BoxGeom {
        let x1 = self.x1.clamp(0.0, 1.0);
        let y1 = self.y1.clamp(0.0, 1.0);
        let x2 = self.x2().clamp(0.0, 1.0);
        let y2 = self.y2().clamp(0.0, 1.0);
        BoxGeom::new(x1, y1, (x2 - x1).max(0.0), (y2 - y1).max(0.0))
    }
}
