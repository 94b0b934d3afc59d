use std::ops::{Add, Mul, Sub};

/// World-space vector in engine units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn lerp(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Euler angles packed to 16 bits per axis (65536 units = 360 degrees)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PackedAngles(pub [u16; 3]);

/// Interpolate along the shorter arc of a 16-bit circular domain
pub fn lerp_wrapping_u16(from: u16, to: u16, t: f32) -> u16 {
    let delta = to.wrapping_sub(from) as i16 as f32;
    let value = (from as f32 + delta * t).round() as i64;
    value.rem_euclid(1 << 16) as u16
}

/// Interpolate along the shorter arc of an 8-bit circular domain
pub fn lerp_wrapping_u8(from: u8, to: u8, t: f32) -> u8 {
    let delta = to.wrapping_sub(from) as i8 as f32;
    let value = (from as f32 + delta * t).round() as i64;
    value.rem_euclid(1 << 8) as u8
}
