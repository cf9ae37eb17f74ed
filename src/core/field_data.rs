//! Field descriptors.
//!
//! A [`FieldData`] describes one column of a scene: its name, flags, row count,
//! the mapping column and the field column. Both columns are either direct
//! views into caller-owned bytes or offset-only views resolved against a
//! buffer at access time.

use bytemuck::Pod;

use crate::util::{
    clamp, span, BitView, BitView2D, Error, Result, SceneFieldType, SceneFieldValue, SceneMappingType,
    SceneMappingValue, StridedView, StridedView2D,
};

use super::{Address, SceneField, SceneFieldFlags};

/// Largest magnitude of the distance between a string field and its string data.
const STRING_DISTANCE_LIMIT: i64 = 1 << 47;

/// Bit fields can't have more rows than fit into this many bits.
const BIT_SIZE_BITS: u32 = usize::BITS - 3;

/// Byte offset and stride of an offset-only view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OffsetView {
    pub offset: usize,
    pub stride: isize,
}

impl OffsetView {
    #[inline]
    pub const fn new(offset: usize, stride: isize) -> Self {
        Self { offset, stride }
    }
}

/// Byte offset, bit offset inside that byte and stride in bits of an
/// offset-only bit view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OffsetBitView {
    pub offset: usize,
    pub bit_offset: usize,
    pub stride: isize,
}

impl OffsetBitView {
    #[inline]
    pub const fn new(offset: usize, bit_offset: usize, stride: isize) -> Self {
        Self {
            offset,
            bit_offset,
            stride,
        }
    }
}

/// Validated field column.
#[derive(Clone, Copy, Debug)]
enum Payload<'a> {
    Typed {
        data: Address<'a>,
        stride: i16,
    },
    Bit {
        data: Address<'a>,
        bit_offset: u8,
        stride: i16,
    },
    String {
        data: Address<'a>,
        stride: i16,
        strings: Address<'a>,
    },
}

/// Field column as passed to a constructor.
enum FieldView<'a> {
    Typed {
        data: Address<'a>,
        stride: isize,
    },
    Bit {
        data: Address<'a>,
        bit_offset: usize,
        stride: isize,
    },
    String {
        data: Address<'a>,
        stride: isize,
        strings: Address<'a>,
    },
}

/// Placement of a descriptor's columns relative to a buffer.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Placement {
    pub mapping: Option<Extent>,
    /// In bits for bit fields, bytes otherwise.
    pub field: Extent,
    pub bits: bool,
    pub strings: Option<isize>,
}

impl Placement {
    /// Placement of a field without rows, which touches no bytes.
    pub fn emptied(self) -> Self {
        let empty = |_: Extent| Extent { begin: 0, lo: 0, hi: 0 };
        Self {
            mapping: self.mapping.map(empty),
            field: empty(self.field),
            strings: self.strings.map(|_| 0),
            ..self
        }
    }
}

/// First-element position and the touched `[lo, hi)` range.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Extent {
    pub begin: isize,
    pub lo: i128,
    pub hi: i128,
}

impl Extent {
    pub fn is_within(&self, len: usize) -> bool {
        self.lo == self.hi || (self.lo >= 0 && self.hi <= len as i128)
    }

    pub fn lo(&self) -> isize {
        clamp(self.lo)
    }

    pub fn hi(&self) -> isize {
        clamp(self.hi)
    }
}

/// Description of one scene field.
///
/// Cheap to copy. Direct descriptors borrow the bytes they describe for `'a`,
/// offset-only descriptors borrow nothing.
#[derive(Clone, Copy, Debug)]
pub struct FieldData<'a> {
    name: SceneField,
    flags: SceneFieldFlags,
    size: usize,
    mapping_type: SceneMappingType,
    mapping: Option<Address<'a>>,
    mapping_stride: i16,
    field_type: SceneFieldType,
    array_size: u16,
    payload: Payload<'a>,
}

fn stride16(name: SceneField, view: &'static str, stride: isize) -> Result<i16> {
    i16::try_from(stride).map_err(|_| Error::StrideOutOfRange { name, view, stride })
}

fn check_sizes(name: SceneField, mapping: usize, field: usize) -> Result<()> {
    if mapping != field {
        return Err(Error::SizeMismatch {
            name,
            mapping,
            field,
        });
    }
    Ok(())
}

/// Mapping type selected by the second dimension of an erased 2D mapping.
fn erased_mapping_type(name: SceneField, mapping: &StridedView2D<'_, u8>) -> Result<SceneMappingType> {
    let width = mapping.size()[1];
    let mapping_type = SceneMappingType::from_width(width).ok_or(Error::MappingWidth { width })?;
    if !mapping.is_contiguous() {
        return Err(Error::NotContiguous {
            name,
            view: "mapping",
        });
    }
    Ok(mapping_type)
}

fn array_size16(name: SceneField, size: usize) -> Result<u16> {
    if size == 0 {
        return Err(Error::ZeroArraySize { name });
    }
    u16::try_from(size).map_err(|_| Error::ArraySizeOutOfRange { name, size })
}

fn view_address<'a, T: Pod>(view: &StridedView<'a, T>) -> (Address<'a>, isize) {
    (Address::absolute(view.data(), view.begin()), view.stride())
}

fn offset_mapping<'a>(mapping: OffsetView, flags: SceneFieldFlags) -> Option<(Address<'a>, isize)> {
    (!flags.contains(SceneFieldFlags::IMPLICIT_MAPPING))
        .then_some((Address::Relative(mapping.offset), mapping.stride))
}

impl<'a> FieldData<'a> {
    // === Shared validation ===

    #[allow(clippy::too_many_arguments)]
    fn build(
        name: SceneField,
        mut flags: SceneFieldFlags,
        offset_only: bool,
        size: usize,
        mapping_type: SceneMappingType,
        mapping: Option<(Address<'a>, isize)>,
        field_type: SceneFieldType,
        array_size: u16,
        field: FieldView<'a>,
    ) -> Result<Self> {
        if offset_only {
            flags |= SceneFieldFlags::OFFSET_ONLY;
        } else if flags.contains(SceneFieldFlags::OFFSET_ONLY) {
            return Err(Error::OffsetOnlyNotAllowed { name });
        }

        if !name.accepts_type(field_type) {
            return Err(Error::InvalidFieldTypeForName { name, field_type });
        }

        let constructor = match &field {
            FieldView::Typed { .. } if field_type.is_bit() => {
                Some(if offset_only { "offset_only_bits" } else { "new_bits" })
            }
            FieldView::Typed { .. } if field_type.is_string() => {
                Some(if offset_only { "offset_only_strings" } else { "new_strings" })
            }
            FieldView::String { .. } if !field_type.is_string() => {
                Some(if offset_only { "offset_only" } else { "new" })
            }
            _ => None,
        };
        if let Some(constructor) = constructor {
            return Err(Error::WrongConstructor {
                name,
                field_type,
                constructor,
            });
        }

        if array_size != 0 && (!name.is_custom() || field_type.is_string()) {
            return Err(Error::NotAnArrayField { name });
        }

        if flags.contains(SceneFieldFlags::MULTI_ENTRY) && !name.allows_multi_entry() {
            return Err(Error::FlagsNotAllowed {
                name,
                field_type,
                flags: SceneFieldFlags::MULTI_ENTRY,
            });
        }
        if flags.contains(SceneFieldFlags::NULL_TERMINATED_STRING) && !field_type.is_string() {
            return Err(Error::FlagsNotAllowed {
                name,
                field_type,
                flags: SceneFieldFlags::NULL_TERMINATED_STRING,
            });
        }
        if field_type.is_string_range_null_terminated() {
            flags |= SceneFieldFlags::NULL_TERMINATED_STRING;
        }

        let (mapping, mapping_stride) = match mapping {
            Some((address, stride)) => (Some(address), stride16(name, "mapping", stride)?),
            None => (None, 0),
        };

        let payload = match field {
            FieldView::Typed { data, stride } => Payload::Typed {
                data,
                stride: stride16(name, "field", stride)?,
            },
            FieldView::Bit {
                data,
                bit_offset,
                stride,
            } => {
                if bit_offset >= 8 {
                    return Err(Error::BitOffsetOutOfRange { name, bit_offset });
                }
                if size >> BIT_SIZE_BITS != 0 {
                    return Err(Error::BitSizeOutOfRange {
                        name,
                        bits: BIT_SIZE_BITS,
                        size,
                    });
                }
                Payload::Bit {
                    data,
                    bit_offset: bit_offset as u8,
                    stride: stride16(name, "field", stride)?,
                }
            }
            FieldView::String {
                data,
                stride,
                strings,
            } => {
                let stride = stride16(name, "field", stride)?;
                let distance = data.distance_to(&strings).unwrap_or(0);
                if !(-STRING_DISTANCE_LIMIT..STRING_DISTANCE_LIMIT).contains(&distance) {
                    return Err(Error::StringDistanceOutOfRange { name, distance });
                }
                Payload::String {
                    data,
                    stride,
                    strings,
                }
            }
        };

        Ok(Self {
            name,
            flags,
            size,
            mapping_type,
            mapping,
            mapping_stride,
            field_type,
            array_size,
            payload,
        })
    }

    // === Direct constructors ===

    /// Typed field. Mapping and field types follow from `M` and `T`.
    pub fn new<M: SceneMappingValue, T: SceneFieldValue>(
        name: SceneField,
        mapping: StridedView<'a, M>,
        field: StridedView<'a, T>,
        flags: SceneFieldFlags,
    ) -> Result<Self> {
        check_sizes(name, mapping.len(), field.len())?;
        let (data, stride) = view_address(&field);
        Self::build(
            name,
            flags,
            false,
            field.len(),
            M::MAPPING_TYPE,
            Some(view_address(&mapping)),
            T::FIELD_TYPE,
            0,
            FieldView::Typed { data, stride },
        )
    }

    /// Typed array field with `N` elements per row.
    pub fn new_array<M: SceneMappingValue, T: SceneFieldValue, const N: usize>(
        name: SceneField,
        mapping: StridedView<'a, M>,
        field: StridedView<'a, [T; N]>,
        flags: SceneFieldFlags,
    ) -> Result<Self>
    where
        [T; N]: Pod,
    {
        check_sizes(name, mapping.len(), field.len())?;
        let array_size = array_size16(name, N)?;
        let (data, stride) = view_address(&field);
        Self::build(
            name,
            flags,
            false,
            field.len(),
            M::MAPPING_TYPE,
            Some(view_address(&mapping)),
            T::FIELD_TYPE,
            array_size,
            FieldView::Typed { data, stride },
        )
    }

    /// Typed field without a stored mapping column, row `i` belongs to object `i`.
    pub fn new_implicit<T: SceneFieldValue>(
        name: SceneField,
        mapping_type: SceneMappingType,
        field: StridedView<'a, T>,
        flags: SceneFieldFlags,
    ) -> Result<Self> {
        let (data, stride) = view_address(&field);
        Self::build(
            name,
            flags | SceneFieldFlags::IMPLICIT_MAPPING,
            false,
            field.len(),
            mapping_type,
            None,
            T::FIELD_TYPE,
            0,
            FieldView::Typed { data, stride },
        )
    }

    /// Bit field, one bit per row.
    pub fn new_bits<M: SceneMappingValue>(
        name: SceneField,
        mapping: StridedView<'a, M>,
        field: BitView<'a>,
        flags: SceneFieldFlags,
    ) -> Result<Self> {
        check_sizes(name, mapping.len(), field.len())?;
        Self::build(
            name,
            flags,
            false,
            field.len(),
            M::MAPPING_TYPE,
            Some(view_address(&mapping)),
            SceneFieldType::Bit,
            0,
            FieldView::Bit {
                data: Address::absolute(field.data(), field.begin_byte()),
                bit_offset: field.bit_offset(),
                stride: field.stride(),
            },
        )
    }

    /// Bit array field, one row of consecutive bits per mapping entry.
    pub fn new_bit_arrays<M: SceneMappingValue>(
        name: SceneField,
        mapping: StridedView<'a, M>,
        field: BitView2D<'a>,
        flags: SceneFieldFlags,
    ) -> Result<Self> {
        let [rows, bits] = field.size();
        check_sizes(name, mapping.len(), rows)?;
        let array_size = array_size16(name, bits)?;
        if bits > 1 && field.stride()[1] != 1 {
            return Err(Error::NotContiguous {
                name,
                view: "field",
            });
        }
        Self::build(
            name,
            flags,
            false,
            rows,
            M::MAPPING_TYPE,
            Some(view_address(&mapping)),
            SceneFieldType::Bit,
            array_size,
            FieldView::Bit {
                data: Address::absolute(field.data(), field.begin_byte()),
                bit_offset: field.bit_offset(),
                stride: field.stride()[0],
            },
        )
    }

    /// String field. `field` holds offsets or ranges of `field_type` into `strings`.
    pub fn new_strings<M: SceneMappingValue>(
        name: SceneField,
        mapping: StridedView<'a, M>,
        strings: &'a [u8],
        field_type: SceneFieldType,
        field: StridedView<'a, u8>,
        flags: SceneFieldFlags,
    ) -> Result<Self> {
        check_sizes(name, mapping.len(), field.len())?;
        let (data, stride) = view_address(&field);
        Self::build(
            name,
            flags,
            false,
            field.len(),
            M::MAPPING_TYPE,
            Some(view_address(&mapping)),
            field_type,
            0,
            FieldView::String {
                data,
                stride,
                strings: Address::absolute(strings, 0),
            },
        )
    }

    /// Type-erased field over byte-granular views.
    ///
    /// Each element of `mapping` and `field` marks the first byte of a row.
    pub fn new_erased(
        name: SceneField,
        mapping_type: SceneMappingType,
        mapping: StridedView<'a, u8>,
        field_type: SceneFieldType,
        field: StridedView<'a, u8>,
        array_size: u16,
        flags: SceneFieldFlags,
    ) -> Result<Self> {
        check_sizes(name, mapping.len(), field.len())?;
        let (data, stride) = view_address(&field);
        Self::build(
            name,
            flags,
            false,
            field.len(),
            mapping_type,
            Some(view_address(&mapping)),
            field_type,
            array_size,
            FieldView::Typed { data, stride },
        )
    }

    /// Type-erased field over 2D byte views.
    ///
    /// The second dimension of `mapping` selects the mapping type width, the
    /// second dimension of `field` has to match the element size.
    pub fn new_erased_2d(
        name: SceneField,
        mapping: StridedView2D<'a, u8>,
        field_type: SceneFieldType,
        field: StridedView2D<'a, u8>,
        array_size: u16,
        flags: SceneFieldFlags,
    ) -> Result<Self> {
        let mapping_type = erased_mapping_type(name, &mapping)?;
        if field_type.is_string() {
            return Err(Error::WrongConstructor {
                name,
                field_type,
                constructor: "new_strings_erased_2d",
            });
        }

        let expected = match field_type.size() {
            Ok(size) => size * array_size.max(1) as usize,
            Err(_) => {
                return Err(Error::WrongConstructor {
                    name,
                    field_type,
                    constructor: "new_bit_arrays",
                })
            }
        };
        let width = field.size()[1];
        if width != expected {
            return Err(Error::FieldWidth {
                name,
                field_type,
                expected,
                width,
            });
        }
        if !field.is_contiguous() {
            return Err(Error::NotContiguous {
                name,
                view: "field",
            });
        }

        check_sizes(name, mapping.size()[0], field.size()[0])?;
        Self::build(
            name,
            flags,
            false,
            field.size()[0],
            mapping_type,
            Some((Address::absolute(mapping.data(), mapping.begin()), mapping.stride()[0])),
            field_type,
            array_size,
            FieldView::Typed {
                data: Address::absolute(field.data(), field.begin()),
                stride: field.stride()[0],
            },
        )
    }

    /// Type-erased string field over 2D byte views.
    ///
    /// The second dimension of `field` has to cover the whole index, i.e. the
    /// index size times the index count of `field_type`.
    pub fn new_strings_erased_2d(
        name: SceneField,
        mapping: StridedView2D<'a, u8>,
        strings: &'a [u8],
        field_type: SceneFieldType,
        field: StridedView2D<'a, u8>,
        flags: SceneFieldFlags,
    ) -> Result<Self> {
        let mapping_type = erased_mapping_type(name, &mapping)?;
        if !field_type.is_string() {
            return Err(Error::WrongConstructor {
                name,
                field_type,
                constructor: "new_erased_2d",
            });
        }

        let expected = field_type.size()?;
        let width = field.size()[1];
        if width != expected {
            return Err(Error::FieldWidth {
                name,
                field_type,
                expected,
                width,
            });
        }
        if !field.is_contiguous() {
            return Err(Error::NotContiguous {
                name,
                view: "field",
            });
        }

        check_sizes(name, mapping.size()[0], field.size()[0])?;
        Self::build(
            name,
            flags,
            false,
            field.size()[0],
            mapping_type,
            Some((Address::absolute(mapping.data(), mapping.begin()), mapping.stride()[0])),
            field_type,
            0,
            FieldView::String {
                data: Address::absolute(field.data(), field.begin()),
                stride: field.stride()[0],
                strings: Address::absolute(strings, 0),
            },
        )
    }

    // === Offset-only constructors ===

    /// Offset-only field, resolved against a buffer at access time.
    ///
    /// With [`IMPLICIT_MAPPING`](SceneFieldFlags::IMPLICIT_MAPPING) the mapping
    /// offset and stride are ignored and no mapping column is stored.
    pub fn offset_only(
        name: SceneField,
        size: usize,
        mapping_type: SceneMappingType,
        mapping: OffsetView,
        field_type: SceneFieldType,
        field: OffsetView,
        flags: SceneFieldFlags,
    ) -> Result<Self> {
        Self::offset_only_array(name, size, mapping_type, mapping, field_type, field, 0, flags)
    }

    /// Offset-only array field with `array_size` elements per row.
    #[allow(clippy::too_many_arguments)]
    pub fn offset_only_array(
        name: SceneField,
        size: usize,
        mapping_type: SceneMappingType,
        mapping: OffsetView,
        field_type: SceneFieldType,
        field: OffsetView,
        array_size: u16,
        flags: SceneFieldFlags,
    ) -> Result<Self> {
        Self::build(
            name,
            flags,
            true,
            size,
            mapping_type,
            offset_mapping(mapping, flags),
            field_type,
            array_size,
            FieldView::Typed {
                data: Address::Relative(field.offset),
                stride: field.stride,
            },
        )
    }

    /// Offset-only bit field. A non-zero `array_size` makes it a bit array field.
    pub fn offset_only_bits(
        name: SceneField,
        size: usize,
        mapping_type: SceneMappingType,
        mapping: OffsetView,
        field: OffsetBitView,
        array_size: u16,
        flags: SceneFieldFlags,
    ) -> Result<Self> {
        Self::build(
            name,
            flags,
            true,
            size,
            mapping_type,
            offset_mapping(mapping, flags),
            SceneFieldType::Bit,
            array_size,
            FieldView::Bit {
                data: Address::Relative(field.offset),
                bit_offset: field.bit_offset,
                stride: field.stride,
            },
        )
    }

    /// Offset-only string field with the string data at `string_offset`.
    #[allow(clippy::too_many_arguments)]
    pub fn offset_only_strings(
        name: SceneField,
        size: usize,
        mapping_type: SceneMappingType,
        mapping: OffsetView,
        string_offset: usize,
        field_type: SceneFieldType,
        field: OffsetView,
        flags: SceneFieldFlags,
    ) -> Result<Self> {
        Self::build(
            name,
            flags,
            true,
            size,
            mapping_type,
            offset_mapping(mapping, flags),
            field_type,
            0,
            FieldView::String {
                data: Address::Relative(field.offset),
                stride: field.stride,
                strings: Address::Relative(string_offset),
            },
        )
    }

    // === Metadata ===

    #[inline]
    pub fn name(&self) -> SceneField {
        self.name
    }

    #[inline]
    pub fn flags(&self) -> SceneFieldFlags {
        self.flags
    }

    /// Number of rows.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn mapping_type(&self) -> SceneMappingType {
        self.mapping_type
    }

    #[inline]
    pub fn field_type(&self) -> SceneFieldType {
        self.field_type
    }

    /// Elements per row, 0 for non-array fields.
    #[inline]
    pub fn field_array_size(&self) -> u16 {
        self.array_size
    }

    #[inline]
    pub fn is_offset_only(&self) -> bool {
        self.flags.contains(SceneFieldFlags::OFFSET_ONLY)
    }

    /// Whether a mapping column is stored.
    #[inline]
    pub fn has_mapping_data(&self) -> bool {
        self.mapping.is_some()
    }

    /// Offset, stride and row count identifying a rebased mapping column.
    pub(crate) fn mapping_key(&self) -> (Option<usize>, isize, usize) {
        let offset = match self.mapping {
            Some(Address::Relative(offset)) => Some(offset),
            _ => None,
        };
        (offset, self.mapping_stride as isize, self.size)
    }

    /// Bytes per row of a non-bit field.
    pub(crate) fn row_size(&self) -> usize {
        self.field_type.size().unwrap_or(0) * self.array_size.max(1) as usize
    }

    // === Data access ===

    fn resolve<'b>(&self, address: Address<'a>, base: Option<&'b [u8]>) -> Result<(&'b [u8], usize)>
    where
        'a: 'b,
    {
        address
            .resolve(base)
            .ok_or(Error::OffsetOnlyRequiresBuffer { name: self.name })
    }

    /// Mapping column, one row of [`mapping_type()`](Self::mapping_type) bytes per entry.
    ///
    /// `base` is required for offset-only descriptors and ignored otherwise.
    pub fn mapping_data<'b>(&self, base: Option<&'b [u8]>) -> Result<StridedView2D<'b, u8>>
    where
        'a: 'b,
    {
        let address = self.mapping.ok_or(Error::NoMappingData { name: self.name })?;
        let (data, begin) = self.resolve(address, base)?;
        StridedView2D::from_bytes(
            data,
            begin,
            [self.size, self.mapping_type.size()],
            [self.mapping_stride as isize, 1],
        )
    }

    /// Field column, one row of element bytes per entry. Fails for bit fields.
    pub fn field_data<'b>(&self, base: Option<&'b [u8]>) -> Result<StridedView2D<'b, u8>>
    where
        'a: 'b,
    {
        let (address, stride) = match self.payload {
            Payload::Typed { data, stride } | Payload::String { data, stride, .. } => (data, stride),
            Payload::Bit { .. } => {
                return Err(Error::WrongAccessorForType {
                    name: self.name,
                    field_type: self.field_type,
                    accessor: "field_bit_data",
                })
            }
        };
        let (data, begin) = self.resolve(address, base)?;
        StridedView2D::from_bytes(data, begin, [self.size, self.row_size()], [stride as isize, 1])
    }

    /// Bit column, one row of `max(array_size, 1)` bits per entry.
    pub fn field_bit_data<'b>(&self, base: Option<&'b [u8]>) -> Result<BitView2D<'b>>
    where
        'a: 'b,
    {
        let Payload::Bit {
            data,
            bit_offset,
            stride,
        } = self.payload
        else {
            return Err(Error::WrongAccessorForType {
                name: self.name,
                field_type: self.field_type,
                accessor: "field_data",
            });
        };
        let (bytes, begin) = self.resolve(data, base)?;
        BitView2D::from_bits(
            bytes,
            begin * 8 + bit_offset as usize,
            [self.size, self.array_size.max(1) as usize],
            [stride as isize, 1],
        )
    }

    /// String data, from its start to the end of the backing bytes.
    pub fn string_data<'b>(&self, base: Option<&'b [u8]>) -> Result<&'b [u8]>
    where
        'a: 'b,
    {
        let Payload::String { strings, .. } = self.payload else {
            return Err(Error::WrongAccessorForType {
                name: self.name,
                field_type: self.field_type,
                accessor: if self.field_type.is_bit() {
                    "field_bit_data"
                } else {
                    "field_data"
                },
            });
        };
        let (bytes, begin) = self.resolve(strings, base)?;
        bytes.get(begin..).ok_or(Error::ViewOutOfBounds {
            begin: begin as isize,
            end: begin as isize,
            size: bytes.len(),
        })
    }

    // === Rebasing ===

    /// Where the columns lie relative to the start of `base`.
    pub(crate) fn placement(&self, base: &[u8]) -> Placement {
        let mapping = self.mapping.map(|address| {
            let begin = address.position_in(base);
            let (lo, hi) = span(
                begin as i128,
                &[self.size],
                &[self.mapping_stride as isize],
                self.mapping_type.size(),
            );
            Extent { begin, lo, hi }
        });

        let (field, bits, strings) = match self.payload {
            Payload::Typed { data, stride } | Payload::String { data, stride, .. } => {
                let begin = data.position_in(base);
                let (lo, hi) = span(begin as i128, &[self.size], &[stride as isize], self.row_size());
                let strings = match self.payload {
                    Payload::String { strings, .. } => Some(strings.position_in(base)),
                    _ => None,
                };
                (Extent { begin, lo, hi }, false, strings)
            }
            Payload::Bit {
                data,
                bit_offset,
                stride,
            } => {
                let begin = data.position_in(base) * 8 + bit_offset as isize;
                let (lo, hi) = span(
                    begin as i128,
                    &[self.size, self.array_size.max(1) as usize],
                    &[stride as isize, 1],
                    1,
                );
                (Extent { begin, lo, hi }, true, None)
            }
        };

        Placement {
            mapping,
            field,
            bits,
            strings,
        }
    }

    /// Offset-only equivalent at the given placement.
    pub(crate) fn rebased(&self, placement: &Placement) -> FieldData<'static> {
        fn relative(begin: isize) -> Address<'static> {
            Address::Relative(begin.max(0) as usize)
        }

        let payload = match self.payload {
            Payload::Typed { stride, .. } => Payload::Typed {
                data: relative(placement.field.begin),
                stride,
            },
            Payload::Bit { stride, .. } => {
                let begin = placement.field.begin.max(0);
                Payload::Bit {
                    data: relative(begin / 8),
                    bit_offset: (begin % 8) as u8,
                    stride,
                }
            }
            Payload::String { stride, .. } => Payload::String {
                data: relative(placement.field.begin),
                stride,
                strings: relative(placement.strings.unwrap_or(0)),
            },
        };

        FieldData {
            name: self.name,
            flags: self.flags | SceneFieldFlags::OFFSET_ONLY,
            size: self.size,
            mapping_type: self.mapping_type,
            mapping: placement.mapping.map(|extent| relative(extent.begin)),
            mapping_stride: self.mapping_stride,
            field_type: self.field_type,
            array_size: self.array_size,
            payload,
        }
    }

    /// Equivalent offset-only descriptor for a buffer these views lie in.
    ///
    /// Fails if any column is not contained in `base`.
    pub fn to_offset_only(&self, base: &[u8]) -> Result<FieldData<'static>> {
        let placement = self.placement(base);
        let len = base.len();
        if let Some(mapping) = placement.mapping.filter(|m| !m.is_within(len)) {
            return Err(Error::ViewOutOfBounds {
                begin: mapping.lo(),
                end: mapping.hi(),
                size: len,
            });
        }
        let field_len = if placement.bits { len * 8 } else { len };
        if !placement.field.is_within(field_len) {
            return Err(Error::ViewOutOfBounds {
                begin: placement.field.lo(),
                end: placement.field.hi(),
                size: field_len,
            });
        }
        if let Some(strings) = placement.strings.filter(|s| *s < 0 || *s as usize > len) {
            return Err(Error::ViewOutOfBounds {
                begin: strings,
                end: strings,
                size: len,
            });
        }
        Ok(self.rebased(&placement))
    }

    /// Direct equivalent of an offset-only descriptor, viewing `base`.
    pub(crate) fn resolved<'b>(&self, base: &'b [u8]) -> FieldData<'b>
    where
        'a: 'b,
    {
        let direct = |address: Address<'a>| -> Address<'b> {
            match address {
                Address::Relative(offset) => Address::absolute(base, offset),
                Address::Absolute { data, begin } => Address::Absolute { data, begin },
            }
        };
        let payload = match self.payload {
            Payload::Typed { data, stride } => Payload::Typed {
                data: direct(data),
                stride,
            },
            Payload::Bit {
                data,
                bit_offset,
                stride,
            } => Payload::Bit {
                data: direct(data),
                bit_offset,
                stride,
            },
            Payload::String {
                data,
                stride,
                strings,
            } => Payload::String {
                data: direct(data),
                stride,
                strings: direct(strings),
            },
        };
        FieldData {
            name: self.name,
            flags: self.flags - SceneFieldFlags::OFFSET_ONLY,
            size: self.size,
            mapping_type: self.mapping_type,
            mapping: self.mapping.map(direct),
            mapping_stride: self.mapping_stride,
            field_type: self.field_type,
            array_size: self.array_size,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{Vec2, Vec3};

    fn custom(id: u32) -> SceneField {
        SceneField::custom(id).unwrap()
    }

    #[test]
    fn test_typed_field() {
        let mapping = [3u16, 0, 7];
        let translations = [Vec3::X, Vec3::Y, Vec3::Z];
        let field = FieldData::new(
            SceneField::Translation,
            StridedView::new(&mapping[..]),
            StridedView::new(&translations[..]),
            SceneFieldFlags::empty(),
        )
        .unwrap();

        assert_eq!(field.name(), SceneField::Translation);
        assert_eq!(field.flags(), SceneFieldFlags::empty());
        assert_eq!(field.size(), 3);
        assert_eq!(field.mapping_type(), SceneMappingType::UnsignedShort);
        assert_eq!(field.field_type(), SceneFieldType::Vector3);
        assert_eq!(field.field_array_size(), 0);
        assert!(!field.is_offset_only());

        let mapping_data = field.mapping_data(None).unwrap();
        assert_eq!(mapping_data.size(), [3, 2]);
        assert_eq!(mapping_data.cast::<u16>().unwrap().to_vec(), vec![3, 0, 7]);

        let field_data = field.field_data(None).unwrap();
        assert_eq!(field_data.size(), [3, 12]);
        assert_eq!(field_data.stride(), [12, 1]);
        assert_eq!(field_data.cast::<Vec3>().unwrap().get(2), Some(Vec3::Z));
    }

    #[test]
    fn test_size_mismatch() {
        let mapping = [0u8, 1];
        let meshes = [5u32];
        let err = FieldData::new(
            SceneField::Mesh,
            StridedView::new(&mapping[..]),
            StridedView::new(&meshes[..]),
            SceneFieldFlags::empty(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::SizeMismatch {
                name: SceneField::Mesh,
                mapping: 2,
                field: 1
            }
        );
    }

    #[test]
    fn test_invalid_type_for_name() {
        let mapping = [0u8];
        let rotations = [Vec3::ZERO];
        let err = FieldData::new(
            SceneField::Rotation,
            StridedView::new(&mapping[..]),
            StridedView::new(&rotations[..]),
            SceneFieldFlags::empty(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Vector3 is not a valid type for Rotation");
    }

    #[test]
    fn test_offset_only_flag_on_view() {
        let mapping = [0u8];
        let parents = [-1i32];
        let err = FieldData::new(
            SceneField::Parent,
            StridedView::new(&mapping[..]),
            StridedView::new(&parents[..]),
            SceneFieldFlags::OFFSET_ONLY,
        )
        .unwrap_err();
        assert_eq!(err, Error::OffsetOnlyNotAllowed { name: SceneField::Parent });
    }

    #[test]
    fn test_array_fields() {
        let mapping = [0u8, 1];
        let data = [[1i16, 2, 3], [4, 5, 6]];
        let err = FieldData::new_array(
            SceneField::MeshMaterial,
            StridedView::new(&mapping[..]),
            StridedView::new(&data[..]),
            SceneFieldFlags::empty(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "MeshMaterial can't be an array field");

        let field = FieldData::new_array(
            custom(3),
            StridedView::new(&mapping[..]),
            StridedView::new(&data[..]),
            SceneFieldFlags::empty(),
        )
        .unwrap();
        assert_eq!(field.field_type(), SceneFieldType::Short);
        assert_eq!(field.field_array_size(), 3);
        let rows = field.field_data(None).unwrap();
        assert_eq!(rows.size(), [2, 6]);
        assert_eq!(rows.cast::<[i16; 3]>().unwrap().get(1), Some([4, 5, 6]));
    }

    #[test]
    fn test_flag_compatibility() {
        let mapping = [0u8, 0];
        let parents = [-1i8, 0];
        let err = FieldData::new(
            SceneField::Parent,
            StridedView::new(&mapping[..]),
            StridedView::new(&parents[..]),
            SceneFieldFlags::MULTI_ENTRY,
        )
        .unwrap_err();
        assert!(matches!(err, Error::FlagsNotAllowed { flags, .. } if flags == SceneFieldFlags::MULTI_ENTRY));

        let meshes = [1u8, 2];
        assert!(FieldData::new(
            SceneField::Mesh,
            StridedView::new(&mapping[..]),
            StridedView::new(&meshes[..]),
            SceneFieldFlags::MULTI_ENTRY,
        )
        .is_ok());

        let err = FieldData::new(
            SceneField::Mesh,
            StridedView::new(&mapping[..]),
            StridedView::new(&meshes[..]),
            SceneFieldFlags::NULL_TERMINATED_STRING,
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::util::ErrorKind::ConstructionInvariantViolated);
    }

    #[test]
    fn test_stride_limits() {
        let bytes = vec![0u8; 65536];
        let ok = StridedView::<u8>::from_bytes(&bytes, 0, 2, 32767).unwrap();
        let too_big = StridedView::<u8>::from_bytes(&bytes, 0, 2, 32768).unwrap();
        assert!(FieldData::new(custom(0), ok, ok, SceneFieldFlags::empty()).is_ok());
        assert_eq!(
            FieldData::new(custom(0), ok, too_big, SceneFieldFlags::empty()).unwrap_err(),
            Error::StrideOutOfRange {
                name: custom(0),
                view: "field",
                stride: 32768
            }
        );
        assert_eq!(
            FieldData::new(custom(0), too_big, ok, SceneFieldFlags::empty()).unwrap_err(),
            Error::StrideOutOfRange {
                name: custom(0),
                view: "mapping",
                stride: 32768
            }
        );
    }

    #[test]
    fn test_offset_only_matches_direct() {
        #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
        #[repr(C)]
        struct Row {
            object: u32,
            translation: Vec2,
        }
        let rows = [
            Row { object: 2, translation: Vec2::new(1.0, 2.0) },
            Row { object: 0, translation: Vec2::new(3.0, 4.0) },
        ];
        let bytes: &[u8] = bytemuck::cast_slice(&rows);

        let direct = FieldData::new(
            SceneField::Translation,
            StridedView::<u32>::interleaved(&rows, 0).unwrap(),
            StridedView::<Vec2>::interleaved(&rows, 4).unwrap(),
            SceneFieldFlags::empty(),
        )
        .unwrap();
        let offset_only = FieldData::offset_only(
            SceneField::Translation,
            2,
            SceneMappingType::UnsignedInt,
            OffsetView::new(0, 12),
            SceneFieldType::Vector2,
            OffsetView::new(4, 12),
            SceneFieldFlags::empty(),
        )
        .unwrap();
        assert!(offset_only.is_offset_only());

        let a = direct.field_data(Some(bytes)).unwrap();
        let b = offset_only.field_data(Some(bytes)).unwrap();
        assert_eq!(a.size(), b.size());
        assert_eq!(a.stride(), b.stride());
        for i in 0..2 {
            assert_eq!(a.row_bytes(i), b.row_bytes(i));
        }

        let rebased = direct.to_offset_only(bytes).unwrap();
        assert!(rebased.is_offset_only());
        assert_eq!(
            rebased.mapping_data(Some(bytes)).unwrap().cast::<u32>().unwrap().to_vec(),
            vec![2, 0]
        );
    }

    #[test]
    fn test_offset_only_requires_buffer() {
        let field = FieldData::offset_only(
            SceneField::Light,
            3,
            SceneMappingType::UnsignedByte,
            OffsetView::new(0, 1),
            SceneFieldType::UnsignedByte,
            OffsetView::new(3, 1),
            SceneFieldFlags::empty(),
        )
        .unwrap();
        assert_eq!(
            field.field_data(None).unwrap_err().to_string(),
            "the field Light is offset-only, supply a data array"
        );
        assert!(field.mapping_data(None).is_err());
        let data = [0u8, 1, 2, 10, 11, 12];
        assert_eq!(field.field_data(Some(&data)).unwrap().row_bytes(2), Some(&[12u8][..]));
    }

    #[test]
    fn test_wrong_accessor() {
        let mapping = [0u8, 1, 2];
        let bits = [0b101u8];
        let field = FieldData::new_bits(
            custom(1),
            StridedView::new(&mapping[..]),
            BitView::from_bits(&bits, 0, 3, 1).unwrap(),
            SceneFieldFlags::empty(),
        )
        .unwrap();
        assert_eq!(field.field_type(), SceneFieldType::Bit);
        assert!(matches!(
            field.field_data(None),
            Err(Error::WrongAccessorForType { accessor: "field_bit_data", .. })
        ));
        assert_eq!(field.field_bit_data(None).unwrap().column().to_vec(), vec![true, false, true]);

        let meshes = [1u16, 2, 3];
        let field = FieldData::new(
            SceneField::Mesh,
            StridedView::new(&mapping[..]),
            StridedView::new(&meshes[..]),
            SceneFieldFlags::empty(),
        )
        .unwrap();
        assert!(matches!(
            field.field_bit_data(None),
            Err(Error::WrongAccessorForType { accessor: "field_data", .. })
        ));
        assert!(field.string_data(None).is_err());
    }

    #[test]
    fn test_bit_offset_budget() {
        let err = FieldData::offset_only_bits(
            custom(2),
            4,
            SceneMappingType::UnsignedByte,
            OffsetView::new(0, 1),
            OffsetBitView::new(4, 8, 1),
            0,
            SceneFieldFlags::empty(),
        )
        .unwrap_err();
        assert_eq!(err, Error::BitOffsetOutOfRange { name: custom(2), bit_offset: 8 });

        let field = FieldData::offset_only_bits(
            custom(2),
            4,
            SceneMappingType::UnsignedByte,
            OffsetView::new(0, 1),
            OffsetBitView::new(4, 7, 3),
            2,
            SceneFieldFlags::empty(),
        )
        .unwrap();
        assert_eq!(field.field_array_size(), 2);
        let data = [0u8, 1, 2, 3, 0b1000_0000, 0, 0];
        let bits = field.field_bit_data(Some(&data)).unwrap();
        assert_eq!(bits.size(), [4, 2]);
        assert_eq!(bits.get(0, 0), Some(true));
        assert_eq!(bits.get(0, 1), Some(false));

        let huge = |size| {
            FieldData::offset_only_bits(
                custom(1),
                size,
                SceneMappingType::UnsignedByte,
                OffsetView::new(0, 1),
                OffsetBitView::new(0, 0, 0),
                0,
                SceneFieldFlags::empty(),
            )
        };
        let limit = 1usize << BIT_SIZE_BITS;
        assert_eq!(
            huge(limit).unwrap_err(),
            Error::BitSizeOutOfRange {
                name: custom(1),
                bits: usize::BITS - 3,
                size: limit
            }
        );
        assert_eq!(huge(limit - 1).unwrap().size(), limit - 1);
    }

    #[test]
    fn test_bit_types_need_bit_constructor() {
        let err = FieldData::offset_only(
            custom(2),
            1,
            SceneMappingType::UnsignedByte,
            OffsetView::new(0, 1),
            SceneFieldType::Bit,
            OffsetView::new(1, 1),
            SceneFieldFlags::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::WrongConstructor { constructor: "offset_only_bits", .. }));
    }

    #[test]
    fn test_strings() {
        let mapping = [0u8, 1];
        let strings = b"helloworld";
        let ranges = [[0u8, 5], [5, 5]];
        let field = FieldData::new_strings(
            custom(4),
            StridedView::new(&mapping[..]),
            strings,
            SceneFieldType::StringRange8,
            StridedView::new(&ranges[..]).erased(),
            SceneFieldFlags::empty(),
        )
        .unwrap();
        assert_eq!(field.string_data(None).unwrap(), b"helloworld");
        assert_eq!(field.field_data(None).unwrap().row_bytes(1), Some(&[5u8, 5][..]));

        let field = FieldData::offset_only_strings(
            custom(4),
            2,
            SceneMappingType::UnsignedByte,
            OffsetView::new(0, 1),
            2,
            SceneFieldType::StringRangeNullTerminated8,
            OffsetView::new(0, 1),
            SceneFieldFlags::empty(),
        )
        .unwrap();
        assert!(field.flags().contains(SceneFieldFlags::NULL_TERMINATED_STRING));

        let err = FieldData::new_strings(
            SceneField::Mesh,
            StridedView::new(&mapping[..]),
            strings,
            SceneFieldType::UnsignedInt,
            StridedView::new(&ranges[..]).erased(),
            SceneFieldFlags::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::WrongConstructor { constructor: "new", .. }));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_string_distance_budget() {
        let limit = 1usize << 47;
        let make = |string_offset: usize| {
            FieldData::offset_only_strings(
                custom(5),
                1,
                SceneMappingType::UnsignedByte,
                OffsetView::new(0, 1),
                string_offset,
                SceneFieldType::StringOffset32,
                OffsetView::new(16, 4),
                SceneFieldFlags::empty(),
            )
        };
        assert!(make(16 + limit - 1).is_ok());
        assert_eq!(
            make(16 + limit).unwrap_err(),
            Error::StringDistanceOutOfRange {
                name: custom(5),
                distance: 1 << 47
            }
        );
    }

    #[test]
    fn test_erased_2d() {
        let mapping = [0u8, 0, 0, 0, 0, 1, 0, 0, 0, 0];
        let field = [0u8; 10];
        let bad_width = StridedView2D::<u8>::from_bytes(&mapping, 0, [2, 5], [5, 1]).unwrap();
        let fields = StridedView2D::<u8>::from_bytes(&field, 0, [2, 4], [5, 1]).unwrap();
        let err = FieldData::new_erased_2d(
            custom(0),
            bad_width,
            SceneFieldType::Float,
            fields,
            0,
            SceneFieldFlags::empty(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected second mapping view dimension size 1, 2, 4 or 8 but got 5"
        );

        let mapping4 = StridedView2D::<u8>::from_bytes(&mapping, 0, [2, 4], [5, 1]).unwrap();
        let sparse = StridedView2D::<u8>::from_bytes(&field, 0, [2, 4], [1, 2]).unwrap();
        let err = FieldData::new_erased_2d(
            custom(0),
            mapping4,
            SceneFieldType::Float,
            sparse,
            0,
            SceneFieldFlags::empty(),
        )
        .unwrap_err();
        assert_eq!(err, Error::NotContiguous { name: custom(0), view: "field" });

        let err = FieldData::new_erased_2d(
            custom(0),
            mapping4,
            SceneFieldType::Double,
            fields,
            0,
            SceneFieldFlags::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::FieldWidth { expected: 8, width: 4, .. }));

        let ok = FieldData::new_erased_2d(
            custom(0),
            mapping4,
            SceneFieldType::Float,
            fields,
            0,
            SceneFieldFlags::empty(),
        )
        .unwrap();
        assert_eq!(ok.mapping_type(), SceneMappingType::UnsignedInt);
        assert_eq!(ok.size(), 2);
    }

    #[test]
    fn test_placement_emptied() {
        let placement = Placement {
            mapping: Some(Extent { begin: 40, lo: 40, hi: 48 }),
            field: Extent { begin: -3, lo: -3, hi: 9 },
            bits: true,
            strings: Some(12),
        };
        let empty = placement.emptied();
        let mapping = empty.mapping.unwrap();
        assert_eq!((mapping.begin, mapping.lo, mapping.hi), (0, 0, 0));
        assert_eq!((empty.field.begin, empty.field.lo, empty.field.hi), (0, 0, 0));
        assert!(empty.field.is_within(0));
        assert!(empty.bits);
        assert_eq!(empty.strings, Some(0));
    }

    #[test]
    fn test_strings_erased_2d() {
        let strings = b"helloworld";
        let mapping = [3u8, 0, 7, 0];
        // (offset, size) pairs of u16, the last column is padding
        let field = [0u8, 0, 5, 0, 0xff, 5, 0, 5, 0, 0xff];
        let mapping2 = StridedView2D::<u8>::from_bytes(&mapping, 0, [2, 2], [2, 1]).unwrap();
        let ranges = StridedView2D::<u8>::from_bytes(&field, 0, [2, 4], [5, 1]).unwrap();
        let ok = FieldData::new_strings_erased_2d(
            custom(3),
            mapping2,
            strings,
            SceneFieldType::StringRange16,
            ranges,
            SceneFieldFlags::empty(),
        )
        .unwrap();
        assert_eq!(ok.mapping_type(), SceneMappingType::UnsignedShort);
        assert_eq!(ok.field_type(), SceneFieldType::StringRange16);
        assert_eq!(ok.size(), 2);
        assert_eq!(ok.string_data(None).unwrap(), b"helloworld");
        assert_eq!(ok.field_data(None).unwrap().row_bytes(1), Some(&[5u8, 0, 5, 0][..]));

        let narrow = StridedView2D::<u8>::from_bytes(&field, 0, [2, 2], [5, 1]).unwrap();
        let err = FieldData::new_strings_erased_2d(
            custom(3),
            mapping2,
            strings,
            SceneFieldType::StringRange16,
            narrow,
            SceneFieldFlags::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::FieldWidth { expected: 4, width: 2, .. }));

        let sparse = StridedView2D::<u8>::from_bytes(&field, 0, [2, 4], [1, 2]).unwrap();
        let err = FieldData::new_strings_erased_2d(
            custom(3),
            mapping2,
            strings,
            SceneFieldType::StringRange16,
            sparse,
            SceneFieldFlags::empty(),
        )
        .unwrap_err();
        assert_eq!(err, Error::NotContiguous { name: custom(3), view: "field" });

        let err = FieldData::new_strings_erased_2d(
            custom(3),
            mapping2,
            strings,
            SceneFieldType::UnsignedInt,
            ranges,
            SceneFieldFlags::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::WrongConstructor { constructor: "new_erased_2d", .. }));

        let err = FieldData::new_erased_2d(
            custom(3),
            mapping2,
            SceneFieldType::StringRange16,
            ranges,
            0,
            SceneFieldFlags::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::WrongConstructor { constructor: "new_strings_erased_2d", .. }));
    }

    #[test]
    fn test_implicit_mapping() {
        let meshes = [4u32, 5, 6];
        let field = FieldData::new_implicit(
            SceneField::Mesh,
            SceneMappingType::UnsignedShort,
            StridedView::new(&meshes[..]),
            SceneFieldFlags::empty(),
        )
        .unwrap();
        assert!(field.flags().contains(SceneFieldFlags::IMPLICIT_MAPPING));
        assert!(!field.has_mapping_data());
        assert_eq!(
            field.mapping_data(None).unwrap_err(),
            Error::NoMappingData { name: SceneField::Mesh }
        );

        let field = FieldData::offset_only(
            SceneField::Mesh,
            3,
            SceneMappingType::UnsignedShort,
            OffsetView::new(1000, 2),
            SceneFieldType::UnsignedInt,
            OffsetView::new(0, 4),
            SceneFieldFlags::IMPLICIT_MAPPING,
        )
        .unwrap();
        assert!(!field.has_mapping_data());
    }
}
