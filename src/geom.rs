use std::ops::{Add, AddAssign, Mul, Sub};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2
{
    pub x: f32,
    pub y: f32,
}

impl Vec2
{
    pub const fn new(x: f32, y: f32) -> Self
    {
        Self { x, y }
    }

    pub fn length(self) -> f32
    {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector, or zero for a zero vector.
    pub fn normalized(self) -> Self
    {
        let len = self.length();
        if len == 0.0 {
            Self::default()
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    /// Velocity of magnitude `speed` at `angle` radians from straight up.
    pub fn from_angle_up(angle: f32, speed: f32) -> Self
    {
        Self::new(angle.sin() * speed, -angle.cos() * speed)
    }
}

impl Add for Vec2
{
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2
    {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2
{
    fn add_assign(&mut self, rhs: Vec2)
    {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2
{
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2
    {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2
{
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2
    {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect
{
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect
{
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self
    {
        Self { x, y, w, h }
    }

    /// Rectangle of size `w`×`h` centered on `center`.
    pub fn centered(center: Vec2, w: f32, h: f32) -> Self
    {
        Self::new(center.x - w / 2.0, center.y - h / 2.0, w, h)
    }

    pub fn right(&self) -> f32
    {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32
    {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2
    {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Strict overlap: touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool
    {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

pub fn distance(a: Vec2, b: Vec2) -> f32
{
    (a - b).length()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn touching_rects_do_not_intersect()
    {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(9.0, 9.0, 5.0, 5.0)));
    }

    #[test]
    fn centered_rect_round_trips_its_center()
    {
        let r = Rect::centered(Vec2::new(20.0, 10.0), 8.0, 4.0);
        assert_eq!(r, Rect::new(16.0, 8.0, 8.0, 4.0));
        assert_eq!(r.center(), Vec2::new(20.0, 10.0));
        assert_eq!(distance(Vec2::new(0.0, 0.0), Vec2::new(3.0, 4.0)), 5.0);
    }

    #[test]
    fn angle_up_points_up()
    {
        let v = Vec2::from_angle_up(0.0, 4.0);
        assert!(v.x.abs() < 1e-6);
        assert!((v.y + 4.0).abs() < 1e-6);
        assert!((Vec2::new(3.0, 4.0).normalized().length() - 1.0).abs() < 1e-6);
    }
}
