//! Field names and per-field flags.

use bitflags::bitflags;
use std::fmt;

use crate::util::{Error, Result, SceneFieldType};

/// Bit marking a raw field name as custom.
const CUSTOM_BIT: u32 = 0x8000_0000;

/// Index of a custom field, always less than 2^31.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CustomField(u32);

impl CustomField {
    /// Largest valid custom index.
    pub const MAX: u32 = CUSTOM_BIT - 1;

    pub const fn new(id: u32) -> Option<Self> {
        if id <= Self::MAX {
            Some(Self(id))
        } else {
            None
        }
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Name of a scene field.
///
/// Well-known fields carry defined semantics and a restricted set of allowed
/// types. Custom fields are identified by a 31-bit index and accept any type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SceneField {
    /// Parent object, -1 for top-level objects
    Parent,
    /// Full 2D or 3D transformation relative to the parent
    Transformation,
    /// Translation part of the transformation
    Translation,
    /// Rotation part of the transformation
    Rotation,
    /// Scaling part of the transformation
    Scaling,
    /// Mesh index
    Mesh,
    /// Material index for the mesh at the same row, -1 for none
    MeshMaterial,
    /// Light index
    Light,
    /// Camera index
    Camera,
    /// Skin index
    Skin,
    /// Opaque importer-specific state
    ImporterState,
    /// Caller-defined field
    Custom(CustomField),
}

impl SceneField {
    /// Number of well-known fields.
    pub const WELL_KNOWN_COUNT: usize = 11;

    /// Custom field with index `id`. Fails if `id` doesn't fit into 31 bits.
    pub fn custom(id: u32) -> Result<Self> {
        CustomField::new(id)
            .map(Self::Custom)
            .ok_or(Error::CustomFieldOutOfRange(id))
    }

    #[inline]
    pub const fn is_custom(self) -> bool {
        matches!(self, Self::Custom(_))
    }

    /// Index of a custom field, `None` for well-known fields.
    #[inline]
    pub const fn custom_id(self) -> Option<u32> {
        match self {
            Self::Custom(id) => Some(id.get()),
            _ => None,
        }
    }

    /// Position among the well-known fields, `None` for custom fields.
    pub const fn well_known_index(self) -> Option<usize> {
        let index = match self {
            Self::Parent => 0,
            Self::Transformation => 1,
            Self::Translation => 2,
            Self::Rotation => 3,
            Self::Scaling => 4,
            Self::Mesh => 5,
            Self::MeshMaterial => 6,
            Self::Light => 7,
            Self::Camera => 8,
            Self::Skin => 9,
            Self::ImporterState => 10,
            Self::Custom(_) => return None,
        };
        Some(index)
    }

    /// Raw numeric name. Well-known fields are numbered from 1,
    /// custom fields have the highest bit set.
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::Custom(id) => CUSTOM_BIT | id.get(),
            _ => match self.well_known_index() {
                Some(index) => index as u32 + 1,
                None => 0,
            },
        }
    }

    /// Decode a raw numeric name.
    pub fn from_raw(raw: u32) -> Result<Self> {
        if raw & CUSTOM_BIT != 0 {
            return Ok(Self::Custom(CustomField(raw & !CUSTOM_BIT)));
        }
        let field = match raw {
            1 => Self::Parent,
            2 => Self::Transformation,
            3 => Self::Translation,
            4 => Self::Rotation,
            5 => Self::Scaling,
            6 => Self::Mesh,
            7 => Self::MeshMaterial,
            8 => Self::Light,
            9 => Self::Camera,
            10 => Self::Skin,
            11 => Self::ImporterState,
            _ => return Err(Error::InvalidFieldName(raw)),
        };
        Ok(field)
    }

    /// Whether `field_type` is allowed for this field.
    pub fn accepts_type(self, field_type: SceneFieldType) -> bool {
        use SceneFieldType as T;
        match self {
            Self::Parent => matches!(field_type, T::Byte | T::Short | T::Int | T::Long),
            Self::Transformation => matches!(
                field_type,
                T::Matrix3x3
                    | T::Matrix3x3d
                    | T::Matrix3x2
                    | T::Matrix3x2d
                    | T::DualComplex
                    | T::DualComplexd
                    | T::Matrix4x4
                    | T::Matrix4x4d
                    | T::Matrix4x3
                    | T::Matrix4x3d
                    | T::DualQuaternion
                    | T::DualQuaterniond
            ),
            Self::Translation | Self::Scaling => {
                matches!(field_type, T::Vector2 | T::Vector2d | T::Vector3 | T::Vector3d)
            }
            Self::Rotation => matches!(
                field_type,
                T::Complex | T::Complexd | T::Quaternion | T::Quaterniond
            ),
            Self::Mesh | Self::Light | Self::Camera | Self::Skin => {
                matches!(field_type, T::UnsignedByte | T::UnsignedShort | T::UnsignedInt)
            }
            Self::MeshMaterial => matches!(field_type, T::Byte | T::Short | T::Int),
            Self::ImporterState => matches!(field_type, T::Pointer | T::MutablePointer),
            Self::Custom(_) => true,
        }
    }

    /// Whether more than one row may reference the same object.
    pub const fn allows_multi_entry(self) -> bool {
        !matches!(
            self,
            Self::Parent
                | Self::Transformation
                | Self::Translation
                | Self::Rotation
                | Self::Scaling
                | Self::ImporterState
        )
    }

    /// Whether this is one of the transformation-related fields.
    pub const fn is_transformation(self) -> bool {
        matches!(
            self,
            Self::Transformation | Self::Translation | Self::Rotation | Self::Scaling
        )
    }
}

impl fmt::Display for SceneField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(id) => write!(f, "Custom({})", id.get()),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

impl From<CustomField> for SceneField {
    fn from(id: CustomField) -> Self {
        Self::Custom(id)
    }
}

bitflags! {
    /// Per-field flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct SceneFieldFlags: u8 {
        /// Addresses are offsets into a buffer supplied later.
        const OFFSET_ONLY = 1 << 0;
        /// The mapping column is sorted ascending.
        const ORDERED_MAPPING = 1 << 1;
        /// Row `i` belongs to object `i`. Implies an ordered mapping.
        const IMPLICIT_MAPPING = (1 << 2) | Self::ORDERED_MAPPING.bits();
        /// More than one row may reference the same object.
        const MULTI_ENTRY = 1 << 3;
        /// String ranges are offsets of null-terminated strings.
        const NULL_TERMINATED_STRING = 1 << 4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_fields() {
        let field = SceneField::custom(1337).unwrap();
        assert!(field.is_custom());
        assert_eq!(field.custom_id(), Some(1337));
        assert_eq!(field.to_raw(), 0x8000_0539);
        assert_eq!(SceneField::from_raw(0x8000_0539), Ok(field));
        assert_eq!(field.to_string(), "Custom(1337)");

        assert!(SceneField::custom(CustomField::MAX).is_ok());
        assert_eq!(
            SceneField::custom(0x8000_0000),
            Err(Error::CustomFieldOutOfRange(0x8000_0000))
        );
        assert_eq!(SceneField::Mesh.custom_id(), None);
    }

    #[test]
    fn test_raw_names() {
        for raw in 1..=SceneField::WELL_KNOWN_COUNT as u32 {
            let field = SceneField::from_raw(raw).unwrap();
            assert_eq!(field.to_raw(), raw);
            assert_eq!(field.well_known_index(), Some(raw as usize - 1));
        }
        assert!(SceneField::from_raw(0).is_err());
        assert!(SceneField::from_raw(12).is_err());
    }

    #[test]
    fn test_accepted_types() {
        assert!(SceneField::Parent.accepts_type(SceneFieldType::Long));
        assert!(!SceneField::Parent.accepts_type(SceneFieldType::UnsignedInt));
        assert!(SceneField::Rotation.accepts_type(SceneFieldType::Quaterniond));
        assert!(!SceneField::Rotation.accepts_type(SceneFieldType::Vector3));
        assert!(!SceneField::Transformation.accepts_type(SceneFieldType::Quaternion));
        assert!(SceneField::MeshMaterial.accepts_type(SceneFieldType::Int));
        assert!(!SceneField::Mesh.accepts_type(SceneFieldType::UnsignedLong));
        assert!(SceneField::custom(0).unwrap().accepts_type(SceneFieldType::Bit));
    }

    #[test]
    fn test_flags() {
        assert!(SceneFieldFlags::IMPLICIT_MAPPING.contains(SceneFieldFlags::ORDERED_MAPPING));
        assert!(!SceneFieldFlags::ORDERED_MAPPING.contains(SceneFieldFlags::IMPLICIT_MAPPING));
        assert!(!SceneField::Parent.allows_multi_entry());
        assert!(SceneField::Mesh.allows_multi_entry());
        assert!(SceneField::Scaling.is_transformation());
        assert!(!SceneField::Skin.is_transformation());
    }
}
