//! Pointer-to-canvas coordinate mapping.
//!
//! Pointer positions arrive in screen pixels. The page canvas sits inside a
//! scrollable container, so its on-screen position differs from its pixel
//! buffer: subtract the container origin, then add the scroll offset.

/// A point in pixel space (screen or canvas, depending on context)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in canvas pixel space. Width and height are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// On-screen bounds of the container that hosts the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.y >= self.top
            && point.x < self.left + self.width
            && point.y < self.top + self.height
    }
}

/// How far the container has been scrolled, in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollOffset {
    pub x: f64,
    pub y: f64,
}

/// Map a screen-space pointer position into untransformed canvas pixel space
pub fn to_local_point(pointer: Point, container: Bounds, scroll: ScrollOffset) -> Point {
    Point {
        x: pointer.x - container.left + scroll.x,
        y: pointer.y - container.top + scroll.y,
    }
}

/// Top-left anchored rectangle spanning two drag points, whatever the drag direction
pub fn normalize_rect(start: Point, current: Point) -> Rect {
    Rect {
        x: start.x.min(current.x),
        y: start.y.min(current.y),
        width: (current.x - start.x).abs(),
        height: (current.y - start.y).abs(),
    }
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        normalize_rect(Point::new(x, y), Point::new(x + width, y + height))
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True when both sides are strictly larger than `min`; anything else is click noise
    pub fn exceeds(&self, min: f64) -> bool {
        self.width > min && self.height > min
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.y >= self.y && point.x < self.right() && point.y < self.bottom()
    }

    /// Integer pixel region `(x, y, width, height)` for bitmap operations
    pub fn pixel_region(&self) -> (i64, i64, u32, u32) {
        (
            self.x.round() as i64,
            self.y.round() as i64,
            self.width.round().max(0.0) as u32,
            self.height.round().max(0.0) as u32,
        )
    }
}
