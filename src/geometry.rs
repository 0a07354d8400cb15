//! Small geometry helpers shared by the cache, facade and gateway.
//!
//! Austin Shafer - 2020

/// An integer (x, y) position, surface-local unless documented otherwise.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }
}

/// An integer (width, height) extent.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Size { width, height }
    }
}

/// A rectangular region, tracked as position + size.
///
/// The wire protocol lets a client build a region out of an arbitrary
/// union/subtraction of rectangles. Per §9/§3 of the design this crate
/// reduces that to a single bounding rectangle: `add` grows the
/// rectangle to cover the new sub-rectangle (idempotent for repeated
/// identical input) and `subtract` is a documented no-op, matching the
/// source behavior this crate was grounded on. A client therefore
/// cannot express a concave input region today; see DESIGN.md.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Rect {
    pub pos: Position,
    pub size: Size,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect {
            pos: Position::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Grow this rectangle's bounding box to also cover `(x, y, w, h)`.
    ///
    /// Idempotent: adding the same rectangle twice leaves the bounding
    /// box unchanged.
    pub fn add(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if self.size.width == 0 && self.size.height == 0 {
            *self = Rect::new(x, y, width, height);
            return;
        }

        let min_x = self.pos.x.min(x);
        let min_y = self.pos.y.min(y);
        let max_x = (self.pos.x + self.size.width).max(x + width);
        let max_y = (self.pos.y + self.size.height).max(y + height);

        self.pos = Position::new(min_x, min_y);
        self.size = Size::new(max_x - min_x, max_y - min_y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_grows_bounding_box() {
        let mut r = Rect::default();
        r.add(10, 10, 20, 20);
        assert_eq!(r, Rect::new(10, 10, 20, 20));

        r.add(0, 0, 5, 5);
        assert_eq!(r, Rect::new(0, 0, 30, 30));
    }

    #[test]
    fn add_is_idempotent_for_identical_rects() {
        let mut r = Rect::default();
        r.add(5, 5, 10, 10);
        let once = r;
        r.add(5, 5, 10, 10);
        assert_eq!(r, once);
    }
}
