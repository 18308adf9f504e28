use std::ops::{Add, AddAssign};

use num::Num;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vector<T> {
    pub x: T,
    pub y: T,
}

impl<T> Vector<T>
where
    T: Num + Copy,
{
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    pub fn scale(&mut self, scale: T) {
        self.x = self.x * scale;
        self.y = self.y * scale;
    }

    pub fn scaled(self, scale: T) -> Vector<T> {
        let mut out = self;
        out.scale(scale);
        out
    }
}

impl<T> Add for Vector<T>
where
    T: Num + Copy,
{
    type Output = Vector<T>;

    fn add(self, rhs: Self) -> Self::Output {
        let mut out = self;
        out.add_assign(rhs);
        out
    }
}

impl<T> AddAssign for Vector<T>
where
    T: Num + Copy,
{
    fn add_assign(&mut self, rhs: Self) {
        self.x = self.x + rhs.x;
        self.y = self.y + rhs.y;
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Rect<T> {
    /// Top left
    pub x0: Vector<T>,
    /// Bottom right
    pub x1: Vector<T>,
}

impl<T> Rect<T>
where
    T: Num + Copy + std::fmt::Debug + PartialOrd,
{
    pub fn from_points(top_left: Vector<T>, bottom_right: Vector<T>) -> Self {
        Self {
            x0: top_left,
            x1: bottom_right,
        }
    }

    pub fn center(&self) -> Vector<T> {
        (self.x0 + self.x1).scaled(T::one() / (T::one() + T::one()))
    }

    pub fn height(&self) -> T {
        self.x1.y - self.x0.y
    }

    pub fn contains(&self, v: Vector<T>) -> bool {
        self.x0.x < v.x && self.x1.x > v.x && self.x0.y < v.y && self.x1.y > v.y
    }

    /// Whether the horizontal extent of this rectangle overlaps the span
    /// `[x_min, x_max]` at all.
    pub fn overlaps_x_span(&self, x_min: T, x_max: T) -> bool {
        !(self.x1.x < x_min || self.x0.x > x_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_center() {
        let r = Rect::from_points(Vector::new(0.0, 0.0), Vector::new(10.0, 4.0));
        assert_eq!(r.center(), Vector::new(5.0, 2.0));
    }

    #[test]
    fn test_rect_contains() {
        let r = Rect::from_points(Vector::new(1.0, 1.0), Vector::new(5.0, 5.0));
        assert!(r.contains(Vector::new(2.0, 2.0)));
        assert!(!r.contains(Vector::new(0.0, 2.0)));
    }

    #[test]
    fn test_overlaps_x_span() {
        let r = Rect::from_points(Vector::new(10.0, 0.0), Vector::new(20.0, 5.0));
        assert!(r.overlaps_x_span(15.0, 30.0));
        assert!(r.overlaps_x_span(0.0, 10.0));
        assert!(!r.overlaps_x_span(21.0, 40.0));
        assert!(!r.overlaps_x_span(0.0, 9.0));
    }
}
