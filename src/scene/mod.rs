//! Scene attribute table.
//!
//! [`SceneData`] holds one byte buffer and a set of field descriptors that
//! share a mapping type and an object bound. All cross-field invariants are
//! checked once in [`SceneData::new`]; afterwards the table only answers
//! queries through typed, bit, string and array accessors.
//!
//! Validated descriptors are stored offset-only, relative to the buffer, so
//! the table never points into memory it doesn't hold.
//!
//! Parent fields can be walked breadth- or depth-first and turned into
//! absolute transformations for any other field.
//!
//! ## Example
//!
//! ```
//! use scenedata::prelude::*;
//!
//! let mapping = [0u8, 1, 2];
//! let parents = [-1i8, 0, 0];
//! let mut data = Vec::new();
//! data.extend_from_slice(&mapping);
//! data.extend(parents.iter().map(|&p| p as u8));
//!
//! let parent = FieldData::offset_only(
//!     SceneField::Parent,
//!     3,
//!     SceneMappingType::UnsignedByte,
//!     OffsetView::new(0, 1),
//!     SceneFieldType::Byte,
//!     OffsetView::new(3, 1),
//!     SceneFieldFlags::empty(),
//! )?;
//! let scene = SceneData::new(SceneMappingType::UnsignedByte, 3, data, vec![parent])?;
//! assert_eq!(scene.parent_for(2)?, Some(0));
//! assert_eq!(scene.children_for(0)?, vec![1, 2]);
//! # Ok::<(), scenedata::Error>(())
//! ```

mod buffer;
mod convert;
mod hierarchy;
mod lookup;

pub use buffer::{DataFlags, SceneBuffer};

use std::collections::HashSet;
use std::mem::{self, size_of};

use crate::core::{FieldData, Placement, SceneField, SceneFieldFlags};
use crate::util::{
    BitView, BitView2D, BitView2DMut, BitViewMut, Error, Pointer, Result, SceneFieldType,
    SceneFieldValue, SceneMappingType, SceneMappingValue, StridedView, StridedView2D,
    StridedView2DMut, StridedViewMut,
};

/// Selects a field of a [`SceneData`], either by index or by name.
pub trait FieldKey: Copy {
    /// Index of the selected field.
    fn field_index(self, scene: &SceneData<'_>) -> Result<usize>;
}

impl FieldKey for usize {
    fn field_index(self, scene: &SceneData<'_>) -> Result<usize> {
        if self < scene.fields.len() {
            Ok(self)
        } else {
            Err(Error::IndexOutOfRange {
                index: self,
                count: scene.fields.len(),
            })
        }
    }
}

impl FieldKey for SceneField {
    fn field_index(self, scene: &SceneData<'_>) -> Result<usize> {
        scene.find_field_id(self).ok_or(Error::FieldNotFound(self))
    }
}

/// Dimensionality implied by a transformation-related field type.
const fn type_dimensions(field_type: SceneFieldType) -> u8 {
    use SceneFieldType as T;
    match field_type {
        T::Matrix3x3
        | T::Matrix3x3d
        | T::Matrix3x2
        | T::Matrix3x2d
        | T::DualComplex
        | T::DualComplexd
        | T::Vector2
        | T::Vector2d
        | T::Complex
        | T::Complexd => 2,
        _ => 3,
    }
}

/// Validated scene attribute table.
#[derive(Debug)]
pub struct SceneData<'a> {
    mapping_type: SceneMappingType,
    mapping_bound: u64,
    dimensions: u8,
    data: SceneBuffer<'a>,
    fields: Vec<FieldData<'static>>,
    importer_state: Option<Pointer>,
}

impl<'a> SceneData<'a> {
    // === Construction ===

    /// Validate `fields` against `data` and build the table.
    ///
    /// Direct descriptors have to view bytes inside `data`, offset-only
    /// descriptors are resolved against it. Fails if any field or cross-field
    /// invariant is broken; the error names the offending field.
    #[tracing::instrument(skip_all, fields(mapping_type = %mapping_type, mapping_bound = mapping_bound, fields = fields.len()))]
    pub fn new(
        mapping_type: SceneMappingType,
        mapping_bound: u64,
        data: impl Into<SceneBuffer<'a>>,
        fields: Vec<FieldData<'_>>,
    ) -> Result<Self> {
        if mapping_bound > mapping_type.max_bound() {
            return Err(Error::MappingBoundTooLarge {
                mapping_type,
                bound: mapping_bound,
            });
        }

        let data = data.into();
        let bytes = data.as_slice();

        // Well-known names in a bitset, custom ones in a set.
        let mut well_known: u16 = 0;
        let mut custom = HashSet::new();
        let mut stored = Vec::with_capacity(fields.len());

        for (index, field) in fields.iter().enumerate() {
            let name = field.name();
            if field.mapping_type() != mapping_type {
                return Err(Error::InconsistentMappingType {
                    index,
                    got: field.mapping_type(),
                    expected: mapping_type,
                });
            }

            let duplicate = match name.well_known_index() {
                Some(bit) => {
                    let seen = well_known & (1 << bit) != 0;
                    well_known |= 1 << bit;
                    seen
                }
                None => !custom.insert(name),
            };
            if duplicate {
                return Err(Error::DuplicateField { index, name });
            }

            let placement = field.placement(bytes);
            let placement = if field.size() == 0 {
                placement.emptied()
            } else {
                check_contained(index, field, &placement, bytes.len())?;
                placement
            };

            tracing::trace!(index, %name, field_type = %field.field_type(), size = field.size(), "field");
            stored.push(field.rebased(&placement));
        }

        let find = |name: SceneField| stored.iter().find(|f| f.name() == name);
        for (a, b) in [
            (SceneField::Translation, SceneField::Rotation),
            (SceneField::Translation, SceneField::Scaling),
            (SceneField::Rotation, SceneField::Scaling),
            (SceneField::Mesh, SceneField::MeshMaterial),
        ] {
            if let (Some(x), Some(y)) = (find(a), find(b)) {
                if x.mapping_key() != y.mapping_key() {
                    return Err(Error::MappingDataMismatch { name: b, other: a });
                }
            }
        }

        let mut dimensions = find(SceneField::Transformation)
            .map(|f| type_dimensions(f.field_type()))
            .unwrap_or(0);
        for name in [SceneField::Translation, SceneField::Rotation, SceneField::Scaling] {
            if let Some(field) = find(name) {
                let field_dimensions = type_dimensions(field.field_type());
                if dimensions != 0 && dimensions != field_dimensions {
                    return Err(Error::DimensionMismatch {
                        name,
                        field_type: field.field_type(),
                        dimensions,
                    });
                }
                dimensions = field_dimensions;
            }
        }
        if dimensions == 0 && find(SceneField::Skin).is_some() {
            return Err(Error::SkinWithoutTransformation);
        }

        tracing::debug!(dimensions, bytes = bytes.len(), "scene validated");
        Ok(Self {
            mapping_type,
            mapping_bound,
            dimensions,
            data,
            fields: stored,
            importer_state: None,
        })
    }

    /// Attach scene-level importer state.
    pub fn with_importer_state(mut self, state: impl Into<Pointer>) -> Self {
        self.importer_state = Some(state.into());
        self
    }

    // === Metadata ===

    #[inline]
    pub fn data_flags(&self) -> DataFlags {
        self.data.flags()
    }

    #[inline]
    pub fn mapping_type(&self) -> SceneMappingType {
        self.mapping_type
    }

    /// Upper bound on object ids in this scene.
    #[inline]
    pub fn mapping_bound(&self) -> u64 {
        self.mapping_bound
    }

    #[inline]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Whether transformation fields are 2D. Both this and [`is_3d()`](Self::is_3d)
    /// are `false` without transformation-related fields.
    #[inline]
    pub fn is_2d(&self) -> bool {
        self.dimensions == 2
    }

    #[inline]
    pub fn is_3d(&self) -> bool {
        self.dimensions == 3
    }

    #[inline]
    pub fn importer_state(&self) -> Option<Pointer> {
        self.importer_state
    }

    /// Raw buffer.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    pub fn mutable_data(&mut self) -> Result<&mut [u8]> {
        self.data.as_mut_slice().ok_or(Error::NotMutable)
    }

    /// Index of field `name`, if present.
    pub fn find_field_id(&self, name: SceneField) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    pub fn field_id(&self, name: SceneField) -> Result<usize> {
        name.field_index(self)
    }

    #[inline]
    pub fn has_field(&self, name: SceneField) -> bool {
        self.find_field_id(name).is_some()
    }

    fn entry(&self, key: impl FieldKey) -> Result<&FieldData<'static>> {
        let index = key.field_index(self)?;
        Ok(&self.fields[index])
    }

    pub fn field_name(&self, index: usize) -> Result<SceneField> {
        self.entry(index).map(|f| f.name())
    }

    pub fn field_flags(&self, key: impl FieldKey) -> Result<SceneFieldFlags> {
        self.entry(key).map(|f| f.flags())
    }

    pub fn field_type(&self, key: impl FieldKey) -> Result<SceneFieldType> {
        self.entry(key).map(|f| f.field_type())
    }

    /// Number of rows of a field.
    pub fn field_size(&self, key: impl FieldKey) -> Result<usize> {
        self.entry(key).map(|f| f.size())
    }

    pub fn field_array_size(&self, key: impl FieldKey) -> Result<u16> {
        self.entry(key).map(|f| f.field_array_size())
    }

    /// Descriptor of a field, resolved against the buffer.
    pub fn field_data(&self, key: impl FieldKey) -> Result<FieldData<'_>> {
        Ok(self.entry(key)?.resolved(self.data.as_slice()))
    }

    // === Read access ===

    /// Mapping column as rows of [`mapping_type()`](Self::mapping_type) bytes.
    pub fn mapping_bytes(&self, key: impl FieldKey) -> Result<StridedView2D<'_, u8>> {
        self.entry(key)?.mapping_data(Some(self.data.as_slice()))
    }

    /// Mapping column as `M`, which has to match the mapping type.
    pub fn mapping<M: SceneMappingValue>(&self, key: impl FieldKey) -> Result<StridedView<'_, M>> {
        let field = self.entry(key)?;
        let mismatch = Error::MappingTypeMismatch {
            name: field.name(),
            actual: field.mapping_type(),
            requested: M::MAPPING_TYPE,
        };
        if field.mapping_type() != M::MAPPING_TYPE {
            return Err(mismatch);
        }
        field
            .mapping_data(Some(self.data.as_slice()))?
            .cast::<M>()
            .ok_or(mismatch)
    }

    /// Field column as rows of element bytes. Fails for bit fields.
    pub fn field_bytes(&self, key: impl FieldKey) -> Result<StridedView2D<'_, u8>> {
        let field = self.entry(key)?;
        if field.field_type().is_bit() {
            return Err(Error::IsABitField { name: field.name() });
        }
        field.field_data(Some(self.data.as_slice()))
    }

    fn check_type<T: SceneFieldValue>(field: &FieldData<'_>) -> Result<()> {
        if field.field_type().is_bit() {
            return Err(Error::IsABitField { name: field.name() });
        }
        if field.field_type() != T::FIELD_TYPE {
            return Err(Error::FieldTypeMismatch {
                name: field.name(),
                actual: field.field_type(),
                requested: T::FIELD_TYPE,
            });
        }
        Ok(())
    }

    /// Field column as `T`. Fails for array and bit fields and on type mismatch.
    pub fn field<T: SceneFieldValue>(&self, key: impl FieldKey) -> Result<StridedView<'_, T>> {
        let field = self.entry(key)?;
        Self::check_type::<T>(field)?;
        if field.field_array_size() != 0 {
            return Err(Error::IsAnArrayField { name: field.name() });
        }
        field
            .field_data(Some(self.data.as_slice()))?
            .cast::<T>()
            .ok_or(Error::FieldTypeMismatch {
                name: field.name(),
                actual: field.field_type(),
                requested: T::FIELD_TYPE,
            })
    }

    /// Field column as rows of `T`. Non-array fields are one element wide.
    pub fn field_array<T: SceneFieldValue>(&self, key: impl FieldKey) -> Result<StridedView2D<'_, T>> {
        let field = self.entry(key)?;
        Self::check_type::<T>(field)?;
        let rows = field.field_data(Some(self.data.as_slice()))?;
        StridedView2D::from_bytes(
            rows.data(),
            rows.begin(),
            [rows.size()[0], field.field_array_size().max(1) as usize],
            [rows.stride()[0], size_of::<T>() as isize],
        )
    }

    /// Bit field column. Fails for bit array fields.
    pub fn field_bits(&self, key: impl FieldKey) -> Result<BitView<'_>> {
        let field = self.entry(key)?;
        if !field.field_type().is_bit() {
            return Err(Error::NotABitField {
                name: field.name(),
                field_type: field.field_type(),
            });
        }
        if field.field_array_size() != 0 {
            return Err(Error::IsAnArrayField { name: field.name() });
        }
        Ok(field.field_bit_data(Some(self.data.as_slice()))?.column())
    }

    /// Bit field column as rows of bits. Non-array bit fields are one bit wide.
    pub fn field_bit_arrays(&self, key: impl FieldKey) -> Result<BitView2D<'_>> {
        let field = self.entry(key)?;
        if !field.field_type().is_bit() {
            return Err(Error::NotABitField {
                name: field.name(),
                field_type: field.field_type(),
            });
        }
        field.field_bit_data(Some(self.data.as_slice()))
    }

    /// String data of a string field, from its start to the buffer end.
    pub fn field_string_data(&self, key: impl FieldKey) -> Result<&[u8]> {
        let field = self.string_entry(key)?;
        field.string_data(Some(self.data.as_slice()))
    }

    /// Decoded strings of a string field, one per row.
    pub fn field_strings(&self, key: impl FieldKey) -> Result<SceneStrings<'_>> {
        let field = self.string_entry(key)?;
        let base = Some(self.data.as_slice());
        Ok(SceneStrings {
            name: field.name(),
            field_type: field.field_type(),
            null_terminated: field.flags().contains(SceneFieldFlags::NULL_TERMINATED_STRING),
            rows: field.field_data(base)?,
            strings: field.string_data(base)?,
            index: 0,
        })
    }

    fn string_entry(&self, key: impl FieldKey) -> Result<&FieldData<'static>> {
        let field = self.entry(key)?;
        if !field.field_type().is_string() {
            return Err(Error::NotAStringField {
                name: field.name(),
                field_type: field.field_type(),
            });
        }
        Ok(field)
    }

    // === Write access ===

    fn check_mutable(&self) -> Result<()> {
        if !self.data_flags().contains(DataFlags::MUTABLE) {
            return Err(Error::NotMutable);
        }
        Ok(())
    }

    pub fn mutable_mapping_bytes(&mut self, key: impl FieldKey) -> Result<StridedView2DMut<'_, u8>> {
        self.check_mutable()?;
        let view = self.mapping_bytes(key)?;
        let (begin, size, stride) = (view.begin(), view.size(), view.stride());
        StridedView2DMut::from_bytes(self.mutable_data()?, begin, size, stride)
    }

    pub fn mutable_mapping<M: SceneMappingValue>(
        &mut self,
        key: impl FieldKey,
    ) -> Result<StridedViewMut<'_, M>> {
        self.check_mutable()?;
        let view = self.mapping::<M>(key)?;
        let (begin, size, stride) = (view.begin(), view.len(), view.stride());
        StridedViewMut::from_bytes(self.mutable_data()?, begin, size, stride)
    }

    pub fn mutable_field_bytes(&mut self, key: impl FieldKey) -> Result<StridedView2DMut<'_, u8>> {
        self.check_mutable()?;
        let view = self.field_bytes(key)?;
        let (begin, size, stride) = (view.begin(), view.size(), view.stride());
        StridedView2DMut::from_bytes(self.mutable_data()?, begin, size, stride)
    }

    pub fn mutable_field<T: SceneFieldValue>(&mut self, key: impl FieldKey) -> Result<StridedViewMut<'_, T>> {
        self.check_mutable()?;
        let view = self.field::<T>(key)?;
        let (begin, size, stride) = (view.begin(), view.len(), view.stride());
        StridedViewMut::from_bytes(self.mutable_data()?, begin, size, stride)
    }

    pub fn mutable_field_array<T: SceneFieldValue>(
        &mut self,
        key: impl FieldKey,
    ) -> Result<StridedView2DMut<'_, T>> {
        self.check_mutable()?;
        let view = self.field_array::<T>(key)?;
        let (begin, size, stride) = (view.begin(), view.size(), view.stride());
        StridedView2DMut::from_bytes(self.mutable_data()?, begin, size, stride)
    }

    pub fn mutable_field_bits(&mut self, key: impl FieldKey) -> Result<BitViewMut<'_>> {
        self.check_mutable()?;
        let view = self.field_bits(key)?;
        let (begin, size, stride) = (view.begin_byte() * 8 + view.bit_offset(), view.len(), view.stride());
        BitViewMut::from_bits(self.mutable_data()?, begin, size, stride)
    }

    pub fn mutable_field_bit_arrays(&mut self, key: impl FieldKey) -> Result<BitView2DMut<'_>> {
        self.check_mutable()?;
        let view = self.field_bit_arrays(key)?;
        let (begin, size, stride) = (view.begin_byte() * 8 + view.bit_offset(), view.size(), view.stride());
        BitView2DMut::from_bits(self.mutable_data()?, begin, size, stride)
    }

    // === Release ===

    /// Hand back the field descriptors, leaving the table without fields.
    ///
    /// The descriptors are offset-only and stay valid against the buffer.
    pub fn release_field_data(&mut self) -> Vec<FieldData<'static>> {
        tracing::debug!(fields = self.fields.len(), "releasing field data");
        mem::take(&mut self.fields)
    }

    /// Hand back the buffer, leaving the table with an empty read-only one.
    ///
    /// Metadata stays available; data access to non-empty fields fails.
    pub fn release_data(&mut self) -> SceneBuffer<'a> {
        tracing::debug!(bytes = self.data.len(), "releasing data");
        mem::take(&mut self.data)
    }

    // === Internal ===

    pub(crate) fn fields(&self) -> &[FieldData<'static>] {
        &self.fields
    }

    pub(crate) fn dimensions(&self) -> u8 {
        self.dimensions
    }
}

fn check_contained(index: usize, field: &FieldData<'_>, placement: &Placement, len: usize) -> Result<()> {
    let name = field.name();
    if let Some(mapping) = placement.mapping.filter(|m| !m.is_within(len)) {
        return Err(Error::MappingNotContained {
            index,
            name,
            begin: mapping.lo(),
            end: mapping.hi(),
            size: len,
        });
    }

    let extent = placement.field;
    if placement.bits {
        if !extent.is_within(len * 8) {
            return Err(Error::BitsNotContained {
                index,
                name,
                begin: extent.lo(),
                end: extent.hi(),
                size: len * 8,
            });
        }
    } else if !extent.is_within(len) {
        return Err(Error::FieldNotContained {
            index,
            name,
            begin: extent.lo(),
            end: extent.hi(),
            size: len,
        });
    }

    if let Some(begin) = placement.strings.filter(|&s| s < 0 || s as usize > len) {
        return Err(Error::StringsNotContained {
            index,
            name,
            begin,
            size: len,
        });
    }
    Ok(())
}

// === Strings ===

/// One decoded string of a string field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneString<'a> {
    bytes: &'a [u8],
    null_terminated: bool,
}

impl<'a> SceneString<'a> {
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Whether a zero byte is known to follow the string.
    #[inline]
    pub fn is_null_terminated(&self) -> bool {
        self.null_terminated
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_str(&self) -> std::result::Result<&'a str, std::str::Utf8Error> {
        std::str::from_utf8(self.bytes)
    }
}

/// Strings of a string field, see [`SceneData::field_strings`].
///
/// Rows pointing outside the string data yield an error for that row only.
#[derive(Clone, Debug)]
pub struct SceneStrings<'a> {
    name: SceneField,
    field_type: SceneFieldType,
    null_terminated: bool,
    rows: StridedView2D<'a, u8>,
    strings: &'a [u8],
    index: usize,
}

impl<'a> SceneStrings<'a> {
    /// Total number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.size()[0]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// String at `row`, `None` past the last row.
    pub fn get(&self, row: usize) -> Option<Result<SceneString<'a>>> {
        (row < self.len()).then(|| self.decode(row))
    }

    fn out_of_bounds(&self, row: usize) -> Error {
        Error::StringOutOfBounds {
            name: self.name,
            row,
        }
    }

    /// `part`-th index of `row`.
    fn index(&self, row: usize, part: usize) -> Result<usize> {
        let width = self.field_type.string_index_size().unwrap_or(1);
        let value = self
            .rows
            .row_bytes(row)
            .and_then(|bytes| bytes.get(part * width..(part + 1) * width))
            .zip(SceneMappingType::from_width(width))
            .map(|(bytes, reader)| reader.read(bytes))
            .ok_or_else(|| self.out_of_bounds(row))?;
        usize::try_from(value).map_err(|_| self.out_of_bounds(row))
    }

    fn decode(&self, row: usize) -> Result<SceneString<'a>> {
        let (begin, end, null_terminated) = if self.field_type.is_string_offset() {
            let end = self.index(row, 0)?;
            let begin = match row {
                0 => 0,
                _ => self.index(row - 1, 0)? + self.null_terminated as usize,
            };
            (begin, end, self.null_terminated)
        } else if self.field_type.is_string_range() {
            let begin = self.index(row, 0)?;
            let size = self.index(row, 1)?;
            let end = begin.checked_add(size).ok_or_else(|| self.out_of_bounds(row))?;
            (begin, end, self.null_terminated)
        } else {
            let begin = self.index(row, 0)?;
            let size = self
                .strings
                .get(begin..)
                .and_then(|tail| tail.iter().position(|&b| b == 0))
                .ok_or_else(|| self.out_of_bounds(row))?;
            (begin, begin + size, true)
        };

        if null_terminated && end >= self.strings.len() {
            return Err(self.out_of_bounds(row));
        }
        let bytes = self
            .strings
            .get(begin..end)
            .ok_or_else(|| self.out_of_bounds(row))?;
        Ok(SceneString {
            bytes,
            null_terminated,
        })
    }
}

impl<'a> Iterator for SceneStrings<'a> {
    type Item = Result<SceneString<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.len() - self.index;
        (left, Some(left))
    }
}

impl ExactSizeIterator for SceneStrings<'_> {}
