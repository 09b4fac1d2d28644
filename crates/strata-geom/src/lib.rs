//! Integer grid geometry shared by the engine crates.
#![forbid(unsafe_code)]

use core::fmt;
use core::ops::{Add, AddAssign, Mul, Sub, SubAssign};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct IVec2 {
    pub x: i32,
    pub z: i32,
}

impl IVec2 {
    pub const ZERO: IVec2 = IVec2 { x: 0, z: 0 };

    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    #[inline]
    pub const fn splat(v: i32) -> Self {
        Self { x: v, z: v }
    }

    #[inline]
    pub fn min(self, rhs: IVec2) -> IVec2 {
        IVec2::new(self.x.min(rhs.x), self.z.min(rhs.z))
    }

    #[inline]
    pub fn max(self, rhs: IVec2) -> IVec2 {
        IVec2::new(self.x.max(rhs.x), self.z.max(rhs.z))
    }

    #[inline]
    pub fn with_y(self, y: i32) -> IVec3 {
        IVec3::new(self.x, y, self.z)
    }
}

impl Add for IVec2 {
    type Output = IVec2;
    #[inline]
    fn add(self, rhs: IVec2) -> IVec2 {
        IVec2::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl AddAssign for IVec2 {
    #[inline]
    fn add_assign(&mut self, rhs: IVec2) {
        self.x += rhs.x;
        self.z += rhs.z;
    }
}

impl Sub for IVec2 {
    type Output = IVec2;
    #[inline]
    fn sub(self, rhs: IVec2) -> IVec2 {
        IVec2::new(self.x - rhs.x, self.z - rhs.z)
    }
}

impl SubAssign for IVec2 {
    #[inline]
    fn sub_assign(&mut self, rhs: IVec2) {
        self.x -= rhs.x;
        self.z -= rhs.z;
    }
}

impl Mul<i32> for IVec2 {
    type Output = IVec2;
    #[inline]
    fn mul(self, rhs: i32) -> IVec2 {
        IVec2::new(self.x * rhs, self.z * rhs)
    }
}

impl fmt::Display for IVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct IVec3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl IVec3 {
    pub const ZERO: IVec3 = IVec3 { x: 0, y: 0, z: 0 };

    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn splat(v: i32) -> Self {
        Self { x: v, y: v, z: v }
    }

    #[inline]
    pub fn xz(self) -> IVec2 {
        IVec2::new(self.x, self.z)
    }

    #[inline]
    pub fn min(self, rhs: IVec3) -> IVec3 {
        IVec3::new(self.x.min(rhs.x), self.y.min(rhs.y), self.z.min(rhs.z))
    }

    #[inline]
    pub fn max(self, rhs: IVec3) -> IVec3 {
        IVec3::new(self.x.max(rhs.x), self.y.max(rhs.y), self.z.max(rhs.z))
    }

    #[inline]
    pub fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[i32; 3]> for IVec3 {
    fn from(v: [i32; 3]) -> Self {
        IVec3::new(v[0], v[1], v[2])
    }
}

impl From<(i32, i32, i32)> for IVec3 {
    fn from(v: (i32, i32, i32)) -> Self {
        IVec3::new(v.0, v.1, v.2)
    }
}

impl Add for IVec3 {
    type Output = IVec3;
    #[inline]
    fn add(self, rhs: IVec3) -> IVec3 {
        IVec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for IVec3 {
    #[inline]
    fn add_assign(&mut self, rhs: IVec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for IVec3 {
    type Output = IVec3;
    #[inline]
    fn sub(self, rhs: IVec3) -> IVec3 {
        IVec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for IVec3 {
    #[inline]
    fn sub_assign(&mut self, rhs: IVec3) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

impl Mul<i32> for IVec3 {
    type Output = IVec3;
    #[inline]
    fn mul(self, rhs: i32) -> IVec3 {
        IVec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl fmt::Display for IVec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Half-open box `[min, max)` on the xz plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Box2 {
    pub min: IVec2,
    pub max: IVec2,
}

impl Box2 {
    #[inline]
    pub const fn new(min: IVec2, max: IVec2) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn size(&self) -> IVec2 {
        self.max - self.min
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.z <= self.min.z
    }

    #[inline]
    pub fn contains(&self, p: IVec2) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.z >= self.min.z && p.z < self.max.z
    }

    #[inline]
    pub fn expanded(&self, margin: i32) -> Box2 {
        Box2::new(self.min - IVec2::splat(margin), self.max + IVec2::splat(margin))
    }

    /// Overlap of two boxes, `None` when they do not share a cell.
    pub fn intersection(&self, other: &Box2) -> Option<Box2> {
        let b = Box2::new(self.min.max(other.min), self.max.min(other.max));
        if b.is_empty() { None } else { Some(b) }
    }

    #[inline]
    pub fn with_y(&self, y_min: i32, y_max: i32) -> Box3 {
        Box3::new(self.min.with_y(y_min), self.max.with_y(y_max))
    }
}

/// Half-open box `[min, max)` in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Box3 {
    pub min: IVec3,
    pub max: IVec3,
}

impl Box3 {
    #[inline]
    pub const fn new(min: IVec3, max: IVec3) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn size(&self) -> IVec3 {
        self.max - self.min
    }

    #[inline]
    pub fn volume(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let s = self.size();
        s.x as usize * s.y as usize * s.z as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y || self.max.z <= self.min.z
    }

    #[inline]
    pub fn contains(&self, p: IVec3) -> bool {
        p.x >= self.min.x
            && p.x < self.max.x
            && p.y >= self.min.y
            && p.y < self.max.y
            && p.z >= self.min.z
            && p.z < self.max.z
    }

    #[inline]
    pub fn expanded(&self, margin: i32) -> Box3 {
        Box3::new(self.min - IVec3::splat(margin), self.max + IVec3::splat(margin))
    }

    pub fn intersection(&self, other: &Box3) -> Option<Box3> {
        let b = Box3::new(self.min.max(other.min), self.max.min(other.max));
        if b.is_empty() { None } else { Some(b) }
    }

    #[inline]
    pub fn xz(&self) -> Box2 {
        Box2::new(self.min.xz(), self.max.xz())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn intersection_is_commutative(a: Box2, b: Box2) {
            prop_assert_eq!(a.intersection(&b), b.intersection(&a));
        }
    }

    #[test]
    fn touching_boxes_do_not_intersect() {
        let a = Box3::new(IVec3::ZERO, IVec3::new(4, 4, 4));
        let b = Box3::new(IVec3::new(4, 0, 0), IVec3::new(8, 4, 4));
        assert!(a.intersection(&b).is_none());
    }
}
