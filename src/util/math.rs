//! Math type re-exports and payload types missing from `glam`.
//!
//! Field payloads are plain `#[repr(C)]` values readable through `bytemuck`.
//! `glam` covers vectors, square matrices and quaternions; the complex number,
//! dual number and non-square matrix types used by 2D and compact transformation
//! fields live here.

pub use glam::{
    // Vectors
    Vec2, Vec3, Vec4,
    DVec2, DVec3, DVec4,
    IVec2, IVec3, IVec4,
    UVec2, UVec3, UVec4,
    // Square matrices
    Mat2, Mat3, Mat4,
    DMat2, DMat3, DMat4,
    // Quaternions
    Quat, DQuat,
};
pub use half::f16;

use bytemuck::{Pod, Zeroable};
use std::fmt;

// === Complex numbers ===

/// Complex number representing a 2D rotation.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Complex {
    pub re: f32,
    pub im: f32,
}

impl Complex {
    /// Zero rotation.
    pub const IDENTITY: Self = Self::new(1.0, 0.0);

    #[inline]
    pub const fn new(re: f32, im: f32) -> Self {
        Self { re, im }
    }

    /// Rotation by `angle` radians counterclockwise.
    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(cos, sin)
    }

    /// Rotation angle in radians.
    #[inline]
    pub fn angle(self) -> f32 {
        self.im.atan2(self.re)
    }

    /// Equivalent 2x2 rotation matrix.
    #[inline]
    pub fn to_mat2(self) -> Mat2 {
        Mat2::from_cols(Vec2::new(self.re, self.im), Vec2::new(-self.im, self.re))
    }
}

impl Default for Complex {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Double-precision [`Complex`].
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Complexd {
    pub re: f64,
    pub im: f64,
}

impl Complexd {
    pub const IDENTITY: Self = Self::new(1.0, 0.0);

    #[inline]
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Narrow to single precision.
    #[inline]
    pub fn as_complex(self) -> Complex {
        Complex::new(self.re as f32, self.im as f32)
    }
}

impl Default for Complexd {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Dual complex number: a 2D rotation followed by a translation.
///
/// The dual part stores the translation directly.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct DualComplex {
    pub real: Complex,
    pub dual: Complex,
}

impl DualComplex {
    pub const IDENTITY: Self = Self {
        real: Complex::IDENTITY,
        dual: Complex::new(0.0, 0.0),
    };

    #[inline]
    pub const fn new(real: Complex, dual: Complex) -> Self {
        Self { real, dual }
    }

    #[inline]
    pub fn from_rotation_translation(rotation: Complex, translation: Vec2) -> Self {
        Self::new(rotation, Complex::new(translation.x, translation.y))
    }

    #[inline]
    pub fn translation(self) -> Vec2 {
        Vec2::new(self.dual.re, self.dual.im)
    }

    /// Equivalent 2D affine transformation matrix.
    pub fn to_mat3(self) -> Mat3 {
        let rotation = self.real.to_mat2();
        Mat3::from_cols(
            rotation.x_axis.extend(0.0),
            rotation.y_axis.extend(0.0),
            self.translation().extend(1.0),
        )
    }
}

impl Default for DualComplex {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Double-precision [`DualComplex`].
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct DualComplexd {
    pub real: Complexd,
    pub dual: Complexd,
}

impl DualComplexd {
    #[inline]
    pub fn as_dual_complex(self) -> DualComplex {
        DualComplex::new(self.real.as_complex(), self.dual.as_complex())
    }
}

// === Dual quaternions ===

/// Dual quaternion: a 3D rotation followed by a translation.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct DualQuaternion {
    pub real: Quat,
    pub dual: Quat,
}

impl DualQuaternion {
    pub const IDENTITY: Self = Self {
        real: Quat::IDENTITY,
        dual: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
    };

    #[inline]
    pub const fn new(real: Quat, dual: Quat) -> Self {
        Self { real, dual }
    }

    pub fn from_rotation_translation(rotation: Quat, translation: Vec3) -> Self {
        let t = Quat::from_xyzw(translation.x, translation.y, translation.z, 0.0);
        Self::new(rotation, t * rotation * 0.5)
    }

    /// Translation part, `2 * dual * conj(real)`.
    pub fn translation(self) -> Vec3 {
        let t = self.dual * self.real.conjugate();
        Vec3::new(t.x, t.y, t.z) * 2.0
    }

    /// Equivalent 3D affine transformation matrix.
    pub fn to_mat4(self) -> Mat4 {
        Mat4::from_rotation_translation(self.real, self.translation())
    }
}

impl Default for DualQuaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Double-precision [`DualQuaternion`].
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct DualQuaterniond {
    pub real: DQuat,
    pub dual: DQuat,
}

impl DualQuaterniond {
    #[inline]
    pub fn as_dual_quaternion(self) -> DualQuaternion {
        DualQuaternion::new(self.real.as_quat(), self.dual.as_quat())
    }
}

// === Non-square matrices ===

/// 2D affine transformation without the constant last row, three columns of two rows.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Matrix3x2 {
    pub cols: [Vec2; 3],
}

impl Matrix3x2 {
    #[inline]
    pub const fn from_cols(x: Vec2, y: Vec2, z: Vec2) -> Self {
        Self { cols: [x, y, z] }
    }

    /// Expand to a full matrix with `(0, 0, 1)` as the last row.
    pub fn to_mat3(self) -> Mat3 {
        let [x, y, z] = self.cols;
        Mat3::from_cols(x.extend(0.0), y.extend(0.0), z.extend(1.0))
    }
}

/// Double-precision [`Matrix3x2`].
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Matrix3x2d {
    pub cols: [DVec2; 3],
}

impl Matrix3x2d {
    pub fn to_mat3(self) -> Mat3 {
        let [x, y, z] = self.cols.map(|c| c.as_vec2());
        Matrix3x2::from_cols(x, y, z).to_mat3()
    }
}

/// 3D affine transformation without the constant last row, four columns of three rows.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Matrix4x3 {
    pub cols: [Vec3; 4],
}

impl Matrix4x3 {
    #[inline]
    pub const fn from_cols(x: Vec3, y: Vec3, z: Vec3, w: Vec3) -> Self {
        Self { cols: [x, y, z, w] }
    }

    /// Expand to a full matrix with `(0, 0, 0, 1)` as the last row.
    pub fn to_mat4(self) -> Mat4 {
        let [x, y, z, w] = self.cols;
        Mat4::from_cols(x.extend(0.0), y.extend(0.0), z.extend(0.0), w.extend(1.0))
    }
}

/// Double-precision [`Matrix4x3`].
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Matrix4x3d {
    pub cols: [DVec3; 4],
}

impl Matrix4x3d {
    pub fn to_mat4(self) -> Mat4 {
        let [x, y, z, w] = self.cols.map(|c| c.as_vec3());
        Matrix4x3::from_cols(x, y, z, w).to_mat4()
    }
}

// === Opaque pointers ===

/// Opaque, importer-specific pointer stored as an address.
///
/// Never dereferenced by this crate.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Pointer(pub usize);

/// Mutable counterpart of [`Pointer`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct MutablePointer(pub usize);

impl From<MutablePointer> for Pointer {
    #[inline]
    fn from(p: MutablePointer) -> Self {
        Self(p.0)
    }
}

impl<T> From<&T> for Pointer {
    #[inline]
    fn from(r: &T) -> Self {
        Self(r as *const T as usize)
    }
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pointer({:#x})", self.0)
    }
}

impl fmt::Debug for MutablePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MutablePointer({:#x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Mat3, b: Mat3) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    #[test]
    fn test_complex_rotation() {
        let c = Complex::from_angle(std::f32::consts::FRAC_PI_2);
        let v = c.to_mat2() * Vec2::X;
        assert!(v.abs_diff_eq(Vec2::Y, 1e-6));
        assert!((c.angle() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_dual_complex_matrix() {
        let rotation = Complex::from_angle(0.5);
        let translation = Vec2::new(3.0, -1.0);
        let m = DualComplex::from_rotation_translation(rotation, translation).to_mat3();
        let expected = Mat3::from_translation(translation) * Mat3::from_angle(0.5);
        assert!(close(m, expected));
    }

    #[test]
    fn test_dual_quaternion_translation() {
        let rotation = Quat::from_rotation_z(0.7);
        let translation = Vec3::new(1.0, 2.0, 3.0);
        let dq = DualQuaternion::from_rotation_translation(rotation, translation);
        assert!(dq.translation().abs_diff_eq(translation, 1e-5));
        let expected = Mat4::from_rotation_translation(rotation, translation);
        assert!(dq.to_mat4().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_expand_matrices() {
        let m = Matrix3x2::from_cols(Vec2::X, Vec2::Y, Vec2::new(5.0, 6.0)).to_mat3();
        assert_eq!(m, Mat3::from_translation(Vec2::new(5.0, 6.0)));

        let m = Matrix4x3::from_cols(Vec3::X, Vec3::Y, Vec3::Z, Vec3::ONE).to_mat4();
        assert_eq!(m, Mat4::from_translation(Vec3::ONE));

        let m = Matrix4x3d {
            cols: [DVec3::X, DVec3::Y, DVec3::Z, DVec3::new(1.0, 2.0, 3.0)],
        }
        .to_mat4();
        assert_eq!(m, Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_pointer_layout() {
        assert_eq!(std::mem::size_of::<Pointer>(), std::mem::size_of::<usize>());
        let value = 5u32;
        let p = Pointer::from(&value);
        assert_eq!(p.0, &value as *const u32 as usize);
        assert_eq!(Pointer::from(MutablePointer(0x10)), Pointer(0x10));
    }
}
