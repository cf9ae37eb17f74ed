//! Error types for scene data construction and access.

use crate::core::{SceneField, SceneFieldFlags};
use crate::util::{SceneFieldType, SceneMappingType};
use thiserror::Error;

/// Broad classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unrecognized or placeholder mapping/field type tag.
    InvalidType,
    /// A descriptor, table or hierarchy invariant was broken.
    ConstructionInvariantViolated,
    /// Field, object or mapping column absent.
    NotFound,
    /// Requested type, bit-ness or array-ness disagrees with the stored one.
    TypeMismatch,
    /// Mutable access to a read-only table.
    NotMutable,
    /// Index, offset or object argument exceeds its bound.
    OutOfRange,
}

/// Main error type for scene data operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // === Type registry ===
    /// Mapping type tag is zero or unknown
    #[error("invalid mapping type {0:#x}")]
    InvalidMappingType(u8),

    /// Field type tag is zero or unknown
    #[error("invalid field type {0:#x}")]
    InvalidFieldType(u16),

    /// Size or alignment queried for a type without a byte size
    #[error("{0} has no fixed byte size")]
    NoFixedSize(SceneFieldType),

    /// Custom field index doesn't fit into 31 bits
    #[error("index {0} is too large for a custom field")]
    CustomFieldOutOfRange(u32),

    /// Raw field name is neither well-known nor custom
    #[error("invalid field name {0:#x}")]
    InvalidFieldName(u32),

    // === Descriptor construction ===
    #[error("expected {name} mapping and field view to have the same size but got {mapping} and {field}")]
    SizeMismatch {
        name: SceneField,
        mapping: usize,
        field: usize,
    },

    #[error("expected {view} view stride of {name} to fit into 16 bits but got {stride}")]
    StrideOutOfRange {
        name: SceneField,
        view: &'static str,
        stride: isize,
    },

    #[error("expected bit offset of {name} to be less than 8 but got {bit_offset}")]
    BitOffsetOutOfRange { name: SceneField, bit_offset: usize },

    #[error("expected bit field size of {name} to fit into {bits} bits but got {size}")]
    BitSizeOutOfRange {
        name: SceneField,
        bits: u32,
        size: usize,
    },

    #[error("{field_type} is not a valid type for {name}")]
    InvalidFieldTypeForName {
        name: SceneField,
        field_type: SceneFieldType,
    },

    #[error("can't pass {flags:?} for {name} of {field_type}")]
    FlagsNotAllowed {
        name: SceneField,
        field_type: SceneFieldType,
        flags: SceneFieldFlags,
    },

    #[error("can't pass OFFSET_ONLY for a view of {name}")]
    OffsetOnlyNotAllowed { name: SceneField },

    /// Array arity requested for a field that can't be an array
    #[error("{name} can't be an array field")]
    NotAnArrayField { name: SceneField },

    #[error("array size of {name} can't be zero")]
    ZeroArraySize { name: SceneField },

    #[error("expected array size of {name} to fit into 16 bits but got {size}")]
    ArraySizeOutOfRange { name: SceneField, size: usize },

    #[error("{field_type} of {name} has to be constructed with {constructor}()")]
    WrongConstructor {
        name: SceneField,
        field_type: SceneFieldType,
        constructor: &'static str,
    },

    #[error("expected second mapping view dimension size 1, 2, 4 or 8 but got {width}")]
    MappingWidth { width: usize },

    #[error("expected second field view dimension size {expected} for {field_type} of {name} but got {width}")]
    FieldWidth {
        name: SceneField,
        field_type: SceneFieldType,
        expected: usize,
        width: usize,
    },

    #[error("second {view} view dimension of {name} is not contiguous")]
    NotContiguous {
        name: SceneField,
        view: &'static str,
    },

    #[error("expected string data distance of {name} to fit into 48 bits but got {distance}")]
    StringDistanceOutOfRange { name: SceneField, distance: i64 },

    #[error("the field {name} is offset-only, supply a data array")]
    OffsetOnlyRequiresBuffer { name: SceneField },

    // === Table construction ===
    #[error("{mapping_type} is too small for {bound} objects")]
    MappingBoundTooLarge {
        mapping_type: SceneMappingType,
        bound: u64,
    },

    #[error("inconsistent mapping type, got {got} for field {index} but expected {expected}")]
    InconsistentMappingType {
        index: usize,
        got: SceneMappingType,
        expected: SceneMappingType,
    },

    #[error("duplicate field {name} at index {index}")]
    DuplicateField { index: usize, name: SceneField },

    #[error("mapping data [{begin}:{end}] of field {index} ({name}) are not contained in passed data of size {size}")]
    MappingNotContained {
        index: usize,
        name: SceneField,
        begin: isize,
        end: isize,
        size: usize,
    },

    #[error("field data [{begin}:{end}] of field {index} ({name}) are not contained in passed data of size {size}")]
    FieldNotContained {
        index: usize,
        name: SceneField,
        begin: isize,
        end: isize,
        size: usize,
    },

    #[error("field bits [{begin}:{end}] of field {index} ({name}) are not contained in passed data of {size} bits")]
    BitsNotContained {
        index: usize,
        name: SceneField,
        begin: isize,
        end: isize,
        size: usize,
    },

    #[error("string data at {begin} of field {index} ({name}) are not contained in passed data of size {size}")]
    StringsNotContained {
        index: usize,
        name: SceneField,
        begin: isize,
        size: usize,
    },

    #[error("{name} mapping data are different from {other} mapping data")]
    MappingDataMismatch { name: SceneField, other: SceneField },

    #[error("expected a {dimensions}D {name} field but got {field_type}")]
    DimensionMismatch {
        name: SceneField,
        field_type: SceneFieldType,
        dimensions: u8,
    },

    #[error("a Skin field requires some transformation field to be present in order to disambiguate between 2D and 3D")]
    SkinWithoutTransformation,

    #[error("expected {what} destination to have {expected} elements but got {got}")]
    DestinationSizeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    // === Hierarchy ===
    #[error("hierarchy is sparse, only {reachable} of {size} objects are reachable from the root")]
    SparseHierarchy { reachable: usize, size: usize },

    #[error("hierarchy is cyclic, object {object} is reached more than once")]
    CyclicHierarchy { object: u64 },

    // === Lookup ===
    #[error("field {0} not found")]
    FieldNotFound(SceneField),

    #[error("object {object} not found in {name} starting at offset {offset}")]
    ObjectNotFound {
        object: u64,
        name: SceneField,
        offset: usize,
    },

    #[error("{name} has an implicit mapping without stored mapping data")]
    NoMappingData { name: SceneField },

    #[error("no transformation-related field found")]
    NoTransformationField,

    // === Typed access ===
    #[error("{name} mapping is {actual} but requested {requested}")]
    MappingTypeMismatch {
        name: SceneField,
        actual: SceneMappingType,
        requested: SceneMappingType,
    },

    #[error("{name} is {actual} but requested a type equivalent to {requested}")]
    FieldTypeMismatch {
        name: SceneField,
        actual: SceneFieldType,
        requested: SceneFieldType,
    },

    #[error("{name} is an array field, use an array accessor to access it")]
    IsAnArrayField { name: SceneField },

    #[error("{name} is a bit field, use a bit accessor to access it")]
    IsABitField { name: SceneField },

    #[error("{name} is {field_type}, not a bit field")]
    NotABitField {
        name: SceneField,
        field_type: SceneFieldType,
    },

    #[error("{name} is {field_type}, not a string field")]
    NotAStringField {
        name: SceneField,
        field_type: SceneFieldType,
    },

    #[error("{name} is {field_type}, use {accessor}() to access it")]
    WrongAccessorForType {
        name: SceneField,
        field_type: SceneFieldType,
        accessor: &'static str,
    },

    #[error("scene has a {dimensions}D transformation type")]
    SceneDimensionMismatch { dimensions: u8 },

    #[error("the scene is not {expected}D")]
    SceneNotDimensional { expected: u8 },

    /// Mutable access requested on a read-only table
    #[error("data not mutable")]
    NotMutable,

    // === Bounds ===
    #[error("index {index} out of range for {count} fields")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("object {object} out of bounds for {bound} objects")]
    ObjectOutOfRange { object: i128, bound: u64 },

    #[error("offset {offset} out of bounds for a field of size {size}")]
    OffsetOutOfRange { offset: usize, size: usize },

    #[error("view [{begin}:{end}] out of bounds for {size} bytes")]
    ViewOutOfBounds {
        begin: isize,
        end: isize,
        size: usize,
    },

    #[error("string {row} of {name} is out of bounds of the string data")]
    StringOutOfBounds { name: SceneField, row: usize },

    #[error("{column} row {row} could not be read")]
    UnreadableRow { column: &'static str, row: usize },
}

impl Error {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            InvalidMappingType(_)
            | InvalidFieldType(_)
            | NoFixedSize(_)
            | CustomFieldOutOfRange(_)
            | InvalidFieldName(_) => ErrorKind::InvalidType,
            SizeMismatch { .. }
            | StrideOutOfRange { .. }
            | BitOffsetOutOfRange { .. }
            | BitSizeOutOfRange { .. }
            | InvalidFieldTypeForName { .. }
            | FlagsNotAllowed { .. }
            | OffsetOnlyNotAllowed { .. }
            | NotAnArrayField { .. }
            | ZeroArraySize { .. }
            | ArraySizeOutOfRange { .. }
            | WrongConstructor { .. }
            | MappingWidth { .. }
            | FieldWidth { .. }
            | NotContiguous { .. }
            | StringDistanceOutOfRange { .. }
            | OffsetOnlyRequiresBuffer { .. }
            | MappingBoundTooLarge { .. }
            | InconsistentMappingType { .. }
            | DuplicateField { .. }
            | MappingNotContained { .. }
            | FieldNotContained { .. }
            | BitsNotContained { .. }
            | StringsNotContained { .. }
            | MappingDataMismatch { .. }
            | DimensionMismatch { .. }
            | SkinWithoutTransformation
            | DestinationSizeMismatch { .. }
            | SparseHierarchy { .. }
            | CyclicHierarchy { .. } => ErrorKind::ConstructionInvariantViolated,
            FieldNotFound(_) | ObjectNotFound { .. } | NoMappingData { .. } | NoTransformationField => {
                ErrorKind::NotFound
            }
            MappingTypeMismatch { .. }
            | FieldTypeMismatch { .. }
            | IsAnArrayField { .. }
            | IsABitField { .. }
            | NotABitField { .. }
            | NotAStringField { .. }
            | WrongAccessorForType { .. }
            | SceneDimensionMismatch { .. }
            | SceneNotDimensional { .. } => ErrorKind::TypeMismatch,
            NotMutable => ErrorKind::NotMutable,
            IndexOutOfRange { .. }
            | ObjectOutOfRange { .. }
            | OffsetOutOfRange { .. }
            | ViewOutOfBounds { .. }
            | StringOutOfBounds { .. }
            | UnreadableRow { .. } => ErrorKind::OutOfRange,
        }
    }
}

/// Result type alias for scene data operations.
pub type Result<T> = std::result::Result<T, Error>;
