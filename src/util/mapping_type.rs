//! Object mapping types - the integer width identifying which object a row belongs to.

use bytemuck::Pod;
use std::fmt;

use super::{Error, Result};

/// Width of the object identifiers stored in a mapping column.
///
/// All fields of one scene share a single mapping type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum SceneMappingType {
    /// 8-bit unsigned object ids
    UnsignedByte = 1,
    /// 16-bit unsigned object ids
    UnsignedShort = 2,
    /// 32-bit unsigned object ids
    UnsignedInt = 3,
    /// 64-bit unsigned object ids
    UnsignedLong = 4,
}

impl SceneMappingType {
    /// Size of one object id in bytes.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::UnsignedByte => 1,
            Self::UnsignedShort => 2,
            Self::UnsignedInt => 4,
            Self::UnsignedLong => 8,
        }
    }

    /// Required alignment of one object id. Equal to the size.
    #[inline]
    pub const fn alignment(self) -> usize {
        self.size()
    }

    /// Largest object bound this type can address.
    #[inline]
    pub const fn max_bound(self) -> u64 {
        match self {
            Self::UnsignedByte => 0xff,
            Self::UnsignedShort => 0xffff,
            Self::UnsignedInt => 0xffff_ffff,
            Self::UnsignedLong => u64::MAX,
        }
    }

    /// Mapping type for a given integer byte width.
    pub const fn from_width(width: usize) -> Option<Self> {
        match width {
            1 => Some(Self::UnsignedByte),
            2 => Some(Self::UnsignedShort),
            4 => Some(Self::UnsignedInt),
            8 => Some(Self::UnsignedLong),
            _ => None,
        }
    }

    /// Convert from the raw tag value. Zero and unknown tags are rejected.
    pub const fn from_raw(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(Self::UnsignedByte),
            2 => Ok(Self::UnsignedShort),
            3 => Ok(Self::UnsignedInt),
            4 => Ok(Self::UnsignedLong),
            _ => Err(Error::InvalidMappingType(tag)),
        }
    }

    /// Read one object id from native-endian bytes.
    ///
    /// `bytes` must hold at least [`size()`](Self::size) bytes.
    #[inline]
    pub(crate) fn read(self, bytes: &[u8]) -> u64 {
        match self {
            Self::UnsignedByte => bytes[0] as u64,
            Self::UnsignedShort => bytemuck::pod_read_unaligned::<u16>(&bytes[..2]) as u64,
            Self::UnsignedInt => bytemuck::pod_read_unaligned::<u32>(&bytes[..4]) as u64,
            Self::UnsignedLong => bytemuck::pod_read_unaligned::<u64>(&bytes[..8]),
        }
    }
}

impl fmt::Display for SceneMappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl TryFrom<u8> for SceneMappingType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        Self::from_raw(tag)
    }
}

/// Size of a mapping type given by its raw tag.
pub fn scene_mapping_type_size(tag: u8) -> Result<usize> {
    SceneMappingType::from_raw(tag).map(SceneMappingType::size)
}

/// Alignment of a mapping type given by its raw tag.
pub fn scene_mapping_type_alignment(tag: u8) -> Result<usize> {
    SceneMappingType::from_raw(tag).map(SceneMappingType::alignment)
}

// === Typed mapping values ===

/// Integer types usable as object ids in a mapping column.
pub trait SceneMappingValue: Pod + Copy + Default + Into<u64> {
    /// The corresponding mapping type.
    const MAPPING_TYPE: SceneMappingType;
}

impl SceneMappingValue for u8 {
    const MAPPING_TYPE: SceneMappingType = SceneMappingType::UnsignedByte;
}

impl SceneMappingValue for u16 {
    const MAPPING_TYPE: SceneMappingType = SceneMappingType::UnsignedShort;
}

impl SceneMappingValue for u32 {
    const MAPPING_TYPE: SceneMappingType = SceneMappingType::UnsignedInt;
}

impl SceneMappingValue for u64 {
    const MAPPING_TYPE: SceneMappingType = SceneMappingType::UnsignedLong;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_sizes() {
        assert_eq!(SceneMappingType::UnsignedByte.size(), 1);
        assert_eq!(SceneMappingType::UnsignedShort.size(), 2);
        assert_eq!(SceneMappingType::UnsignedInt.size(), 4);
        assert_eq!(SceneMappingType::UnsignedLong.size(), 8);
        assert_eq!(SceneMappingType::UnsignedInt.alignment(), 4);
    }

    #[test]
    fn test_mapping_raw_tags() {
        assert_eq!(scene_mapping_type_size(2), Ok(2));
        assert_eq!(scene_mapping_type_alignment(4), Ok(8));
        assert_eq!(scene_mapping_type_size(0), Err(Error::InvalidMappingType(0)));
        assert_eq!(
            scene_mapping_type_alignment(0x73),
            Err(Error::InvalidMappingType(0x73))
        );
        for tag in 1..=4u8 {
            assert_eq!(SceneMappingType::try_from(tag).map(|t| t as u8), Ok(tag));
        }
    }

    #[test]
    fn test_mapping_from_width() {
        assert_eq!(SceneMappingType::from_width(8), Some(SceneMappingType::UnsignedLong));
        assert_eq!(SceneMappingType::from_width(3), None);
        assert_eq!(SceneMappingType::from_width(0), None);
    }

    #[test]
    fn test_mapping_read() {
        let value = 0x1234_5678u32.to_ne_bytes();
        assert_eq!(SceneMappingType::UnsignedInt.read(&value), 0x1234_5678);
        let value = 0xabcdu16.to_ne_bytes();
        assert_eq!(SceneMappingType::UnsignedShort.read(&value), 0xabcd);
    }

    #[test]
    fn test_mapping_value_types() {
        assert_eq!(<u8 as SceneMappingValue>::MAPPING_TYPE, SceneMappingType::UnsignedByte);
        assert_eq!(<u64 as SceneMappingValue>::MAPPING_TYPE, SceneMappingType::UnsignedLong);
        assert_eq!(SceneMappingType::UnsignedShort.to_string(), "UnsignedShort");
    }
}
