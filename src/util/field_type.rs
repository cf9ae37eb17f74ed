//! Field types - the payload type of a scene field column.

use bytemuck::Pod;
use half::f16;
use std::fmt;

use super::math::*;
use super::{Error, Result};

/// Payload type of a field column.
///
/// Every type except [`Bit`](Self::Bit) has a fixed byte size and alignment.
/// The string types store offsets or ranges into a separate string blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum SceneFieldType {
    // Scalars
    Float = 1,
    Half = 2,
    Double = 3,
    UnsignedByte = 4,
    Byte = 5,
    UnsignedShort = 6,
    Short = 7,
    UnsignedInt = 8,
    Int = 9,
    UnsignedLong = 10,
    Long = 11,
    // Vectors
    Vector2 = 12,
    Vector2h = 13,
    Vector2d = 14,
    Vector2ub = 15,
    Vector2b = 16,
    Vector2us = 17,
    Vector2s = 18,
    Vector2ui = 19,
    Vector2i = 20,
    Vector3 = 21,
    Vector3h = 22,
    Vector3d = 23,
    Vector3ub = 24,
    Vector3b = 25,
    Vector3us = 26,
    Vector3s = 27,
    Vector3ui = 28,
    Vector3i = 29,
    Vector4 = 30,
    Vector4h = 31,
    Vector4d = 32,
    Vector4ub = 33,
    Vector4b = 34,
    Vector4us = 35,
    Vector4s = 36,
    Vector4ui = 37,
    Vector4i = 38,
    // Matrices, column-major, named columns x rows
    Matrix2x2 = 39,
    Matrix2x2h = 40,
    Matrix2x2d = 41,
    Matrix2x3 = 42,
    Matrix2x3h = 43,
    Matrix2x3d = 44,
    Matrix2x4 = 45,
    Matrix2x4h = 46,
    Matrix2x4d = 47,
    Matrix3x2 = 48,
    Matrix3x2h = 49,
    Matrix3x2d = 50,
    Matrix3x3 = 51,
    Matrix3x3h = 52,
    Matrix3x3d = 53,
    Matrix3x4 = 54,
    Matrix3x4h = 55,
    Matrix3x4d = 56,
    Matrix4x2 = 57,
    Matrix4x2h = 58,
    Matrix4x2d = 59,
    Matrix4x3 = 60,
    Matrix4x3h = 61,
    Matrix4x3d = 62,
    Matrix4x4 = 63,
    Matrix4x4h = 64,
    Matrix4x4d = 65,
    // Ranges (min, max)
    Range1D = 66,
    Range1Dh = 67,
    Range1Dd = 68,
    Range1Di = 69,
    Range2D = 70,
    Range2Dh = 71,
    Range2Dd = 72,
    Range2Di = 73,
    Range3D = 74,
    Range3Dh = 75,
    Range3Dd = 76,
    Range3Di = 77,
    // Rotations
    Complex = 78,
    Complexd = 79,
    DualComplex = 80,
    DualComplexd = 81,
    Quaternion = 82,
    Quaterniond = 83,
    DualQuaternion = 84,
    DualQuaterniond = 85,
    // Angles
    Deg = 86,
    Degh = 87,
    Degd = 88,
    Rad = 89,
    Radh = 90,
    Radd = 91,
    // Pointers
    Pointer = 92,
    MutablePointer = 93,
    // Single bit per row
    Bit = 94,
    // String encodings: offset of the end, (offset, size) pairs, or offset of a null-terminated string
    StringOffset8 = 95,
    StringOffset16 = 96,
    StringOffset32 = 97,
    StringOffset64 = 98,
    StringRange8 = 99,
    StringRange16 = 100,
    StringRange32 = 101,
    StringRange64 = 102,
    StringRangeNullTerminated8 = 103,
    StringRangeNullTerminated16 = 104,
    StringRangeNullTerminated32 = 105,
    StringRangeNullTerminated64 = 106,
}

impl SceneFieldType {
    /// Number of field types.
    pub const COUNT: usize = 106;

    /// All field types in tag order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Float, Self::Half, Self::Double, Self::UnsignedByte, Self::Byte,
        Self::UnsignedShort, Self::Short, Self::UnsignedInt, Self::Int, Self::UnsignedLong,
        Self::Long, Self::Vector2, Self::Vector2h, Self::Vector2d, Self::Vector2ub,
        Self::Vector2b, Self::Vector2us, Self::Vector2s, Self::Vector2ui, Self::Vector2i,
        Self::Vector3, Self::Vector3h, Self::Vector3d, Self::Vector3ub, Self::Vector3b,
        Self::Vector3us, Self::Vector3s, Self::Vector3ui, Self::Vector3i, Self::Vector4,
        Self::Vector4h, Self::Vector4d, Self::Vector4ub, Self::Vector4b, Self::Vector4us,
        Self::Vector4s, Self::Vector4ui, Self::Vector4i, Self::Matrix2x2, Self::Matrix2x2h,
        Self::Matrix2x2d, Self::Matrix2x3, Self::Matrix2x3h, Self::Matrix2x3d, Self::Matrix2x4,
        Self::Matrix2x4h, Self::Matrix2x4d, Self::Matrix3x2, Self::Matrix3x2h, Self::Matrix3x2d,
        Self::Matrix3x3, Self::Matrix3x3h, Self::Matrix3x3d, Self::Matrix3x4, Self::Matrix3x4h,
        Self::Matrix3x4d, Self::Matrix4x2, Self::Matrix4x2h, Self::Matrix4x2d, Self::Matrix4x3,
        Self::Matrix4x3h, Self::Matrix4x3d, Self::Matrix4x4, Self::Matrix4x4h, Self::Matrix4x4d,
        Self::Range1D, Self::Range1Dh, Self::Range1Dd, Self::Range1Di, Self::Range2D,
        Self::Range2Dh, Self::Range2Dd, Self::Range2Di, Self::Range3D, Self::Range3Dh,
        Self::Range3Dd, Self::Range3Di, Self::Complex, Self::Complexd, Self::DualComplex,
        Self::DualComplexd, Self::Quaternion, Self::Quaterniond, Self::DualQuaternion, Self::DualQuaterniond,
        Self::Deg, Self::Degh, Self::Degd, Self::Rad, Self::Radh,
        Self::Radd, Self::Pointer, Self::MutablePointer, Self::Bit, Self::StringOffset8,
        Self::StringOffset16, Self::StringOffset32, Self::StringOffset64, Self::StringRange8, Self::StringRange16,
        Self::StringRange32, Self::StringRange64, Self::StringRangeNullTerminated8, Self::StringRangeNullTerminated16, Self::StringRangeNullTerminated32,
        Self::StringRangeNullTerminated64,
    ];

    /// Scalar width and component count, `None` for [`Bit`](Self::Bit).
    const fn layout(self) -> Option<(usize, usize)> {
        use SceneFieldType::*;
        let layout = match self {
            UnsignedByte | Byte | StringOffset8 | StringRangeNullTerminated8 => (1, 1),
            Half | Degh | Radh | UnsignedShort | Short | StringOffset16
            | StringRangeNullTerminated16 => (2, 1),
            Float | Deg | Rad | UnsignedInt | Int | StringOffset32
            | StringRangeNullTerminated32 => (4, 1),
            Double | Degd | Radd | UnsignedLong | Long | StringOffset64
            | StringRangeNullTerminated64 => (8, 1),
            Pointer | MutablePointer => (std::mem::size_of::<usize>(), 1),

            Vector2ub | Vector2b | StringRange8 => (1, 2),
            Vector3ub | Vector3b => (1, 3),
            Vector4ub | Vector4b => (1, 4),

            Vector2h | Vector2us | Vector2s | Range1Dh | StringRange16 => (2, 2),
            Vector3h | Vector3us | Vector3s => (2, 3),
            Vector4h | Vector4us | Vector4s | Range2Dh | Matrix2x2h => (2, 4),
            Range3Dh | Matrix2x3h | Matrix3x2h => (2, 6),
            Matrix2x4h | Matrix4x2h => (2, 8),
            Matrix3x3h => (2, 9),
            Matrix3x4h | Matrix4x3h => (2, 12),
            Matrix4x4h => (2, 16),

            Vector2 | Vector2ui | Vector2i | Range1D | Range1Di | Complex | StringRange32 => (4, 2),
            Vector3 | Vector3ui | Vector3i => (4, 3),
            Vector4 | Vector4ui | Vector4i | Range2D | Range2Di | Quaternion | DualComplex
            | Matrix2x2 => (4, 4),
            Range3D | Range3Di | Matrix2x3 | Matrix3x2 => (4, 6),
            DualQuaternion | Matrix2x4 | Matrix4x2 => (4, 8),
            Matrix3x3 => (4, 9),
            Matrix3x4 | Matrix4x3 => (4, 12),
            Matrix4x4 => (4, 16),

            Vector2d | Range1Dd | Complexd | StringRange64 => (8, 2),
            Vector3d => (8, 3),
            Vector4d | Range2Dd | Quaterniond | DualComplexd | Matrix2x2d => (8, 4),
            Range3Dd | Matrix2x3d | Matrix3x2d => (8, 6),
            DualQuaterniond | Matrix2x4d | Matrix4x2d => (8, 8),
            Matrix3x3d => (8, 9),
            Matrix3x4d | Matrix4x3d => (8, 12),
            Matrix4x4d => (8, 16),

            Bit => return None,
        };
        Some(layout)
    }

    /// Size of one element in bytes. Fails for [`Bit`](Self::Bit).
    #[inline]
    pub const fn size(self) -> Result<usize> {
        match self.layout() {
            Some((scalar, count)) => Ok(scalar * count),
            None => Err(Error::NoFixedSize(self)),
        }
    }

    /// Required alignment of one element. Fails for [`Bit`](Self::Bit).
    #[inline]
    pub const fn alignment(self) -> Result<usize> {
        match self.layout() {
            Some((scalar, _)) => Ok(scalar),
            None => Err(Error::NoFixedSize(self)),
        }
    }

    /// Convert from the raw tag value. Zero and unknown tags are rejected.
    pub fn from_raw(tag: u16) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| *t as u16 == tag)
            .ok_or(Error::InvalidFieldType(tag))
    }

    /// Returns true for the single-bit type.
    #[inline]
    pub const fn is_bit(self) -> bool {
        matches!(self, Self::Bit)
    }

    /// Returns true for any of the string encodings.
    #[inline]
    pub const fn is_string(self) -> bool {
        self.string_index_size().is_some()
    }

    /// Returns true for the `StringOffset*` types.
    #[inline]
    pub const fn is_string_offset(self) -> bool {
        matches!(
            self,
            Self::StringOffset8 | Self::StringOffset16 | Self::StringOffset32 | Self::StringOffset64
        )
    }

    /// Returns true for the `StringRange*` types.
    #[inline]
    pub const fn is_string_range(self) -> bool {
        matches!(
            self,
            Self::StringRange8 | Self::StringRange16 | Self::StringRange32 | Self::StringRange64
        )
    }

    /// Returns true for the `StringRangeNullTerminated*` types.
    #[inline]
    pub const fn is_string_range_null_terminated(self) -> bool {
        matches!(
            self,
            Self::StringRangeNullTerminated8
                | Self::StringRangeNullTerminated16
                | Self::StringRangeNullTerminated32
                | Self::StringRangeNullTerminated64
        )
    }

    /// Width of a single string offset or size, `None` for non-string types.
    pub const fn string_index_size(self) -> Option<usize> {
        match self {
            Self::StringOffset8 | Self::StringRange8 | Self::StringRangeNullTerminated8 => Some(1),
            Self::StringOffset16 | Self::StringRange16 | Self::StringRangeNullTerminated16 => Some(2),
            Self::StringOffset32 | Self::StringRange32 | Self::StringRangeNullTerminated32 => Some(4),
            Self::StringOffset64 | Self::StringRange64 | Self::StringRangeNullTerminated64 => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for SceneFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl TryFrom<u16> for SceneFieldType {
    type Error = Error;

    fn try_from(tag: u16) -> Result<Self> {
        Self::from_raw(tag)
    }
}

/// Size of a field type given by its raw tag.
pub fn scene_field_type_size(tag: u16) -> Result<usize> {
    SceneFieldType::from_raw(tag)?.size()
}

/// Alignment of a field type given by its raw tag.
pub fn scene_field_type_alignment(tag: u16) -> Result<usize> {
    SceneFieldType::from_raw(tag)?.alignment()
}

// === Typed field values ===

/// Types that can be stored in, or viewed from, a field column.
///
/// The size of `Self` always equals the size of [`FIELD_TYPE`](Self::FIELD_TYPE).
pub trait SceneFieldValue: Pod {
    /// The corresponding field type.
    const FIELD_TYPE: SceneFieldType;
}

macro_rules! impl_field_value {
    ($($ty:ty => $field_type:ident),* $(,)?) => {
        $(
            impl SceneFieldValue for $ty {
                const FIELD_TYPE: SceneFieldType = SceneFieldType::$field_type;
            }
        )*
    };
}

impl_field_value! {
    f32 => Float,
    f16 => Half,
    f64 => Double,
    u8 => UnsignedByte,
    i8 => Byte,
    u16 => UnsignedShort,
    i16 => Short,
    u32 => UnsignedInt,
    i32 => Int,
    u64 => UnsignedLong,
    i64 => Long,

    Vec2 => Vector2,
    Vec3 => Vector3,
    Vec4 => Vector4,
    DVec2 => Vector2d,
    DVec3 => Vector3d,
    DVec4 => Vector4d,
    UVec2 => Vector2ui,
    UVec3 => Vector3ui,
    UVec4 => Vector4ui,
    IVec2 => Vector2i,
    IVec3 => Vector3i,
    IVec4 => Vector4i,
    [f16; 2] => Vector2h,
    [f16; 3] => Vector3h,
    [f16; 4] => Vector4h,
    [u8; 2] => Vector2ub,
    [u8; 3] => Vector3ub,
    [u8; 4] => Vector4ub,
    [i8; 2] => Vector2b,
    [i8; 3] => Vector3b,
    [i8; 4] => Vector4b,
    [u16; 2] => Vector2us,
    [u16; 3] => Vector3us,
    [u16; 4] => Vector4us,
    [i16; 2] => Vector2s,
    [i16; 3] => Vector3s,
    [i16; 4] => Vector4s,

    Mat2 => Matrix2x2,
    Mat3 => Matrix3x3,
    Mat4 => Matrix4x4,
    DMat2 => Matrix2x2d,
    DMat3 => Matrix3x3d,
    DMat4 => Matrix4x4d,
    Matrix3x2 => Matrix3x2,
    Matrix3x2d => Matrix3x2d,
    Matrix4x3 => Matrix4x3,
    Matrix4x3d => Matrix4x3d,

    Complex => Complex,
    Complexd => Complexd,
    DualComplex => DualComplex,
    DualComplexd => DualComplexd,
    Quat => Quaternion,
    DQuat => Quaterniond,
    DualQuaternion => DualQuaternion,
    DualQuaterniond => DualQuaterniond,

    Pointer => Pointer,
    MutablePointer => MutablePointer,
}
