//! Strided views over byte buffers.
//!
//! A view is a backing byte slice plus the offset of the first element, an
//! element count and a signed stride. Zero strides broadcast a single element,
//! negative strides walk backwards. Every constructor checks that all elements
//! lie inside the backing slice, so element access never goes out of bounds.
//! Elements are read with unaligned loads, the backing bytes need no alignment.
//!
//! Bit views use the same scheme with the offset and stride counted in bits.

use bytemuck::Pod;
use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;

use super::{Error, Result};

/// Lowest and one-past-highest unit touched by `size` elements of `elem`
/// units starting at `begin`. Empty views touch nothing and return `(begin, begin)`.
pub(crate) fn span(begin: i128, size: &[usize], stride: &[isize], elem: usize) -> (i128, i128) {
    if size.iter().any(|&n| n == 0) {
        return (begin, begin);
    }
    let (mut lo, mut hi) = (begin, begin + elem as i128);
    for (&n, &s) in size.iter().zip(stride) {
        let last = s as i128 * (n as i128 - 1);
        lo += last.min(0);
        hi += last.max(0);
    }
    (lo, hi)
}

/// Checks that `size` elements of `elem` units starting at `begin` with
/// the given strides fit into `len` units.
pub(crate) fn check_span(
    len: usize,
    begin: usize,
    size: &[usize],
    stride: &[isize],
    elem: usize,
) -> Result<()> {
    let (lo, hi) = span(begin as i128, size, stride, elem);
    if lo == hi {
        return Ok(());
    }
    if lo < 0 || hi > len as i128 {
        return Err(Error::ViewOutOfBounds {
            begin: clamp(lo),
            end: clamp(hi),
            size: len,
        });
    }
    Ok(())
}

pub(crate) fn clamp(v: i128) -> isize {
    v.clamp(isize::MIN as i128, isize::MAX as i128) as isize
}

#[inline]
fn offset(begin: usize, i: usize, stride: isize) -> usize {
    (begin as isize + i as isize * stride) as usize
}

#[inline]
fn read<T: Pod>(data: &[u8], at: usize) -> T {
    bytemuck::pod_read_unaligned(&data[at..at + size_of::<T>()])
}

#[inline]
fn write<T: Pod>(data: &mut [u8], at: usize, value: T) {
    data[at..at + size_of::<T>()].copy_from_slice(bytemuck::bytes_of(&value));
}

// === Typed 1D views ===

/// Read-only strided view of `T` elements.
pub struct StridedView<'a, T> {
    data: &'a [u8],
    begin: usize,
    size: usize,
    stride: isize,
    _marker: PhantomData<T>,
}

impl<T> Clone for StridedView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StridedView<'_, T> {}

impl<'a, T: Pod> StridedView<'a, T> {
    /// Contiguous view of a slice.
    pub fn new(data: &'a [T]) -> Self {
        Self {
            data: bytemuck::cast_slice(data),
            begin: 0,
            size: data.len(),
            stride: size_of::<T>() as isize,
            _marker: PhantomData,
        }
    }

    /// View of `size` elements starting `begin` bytes into `data`.
    pub fn from_bytes(data: &'a [u8], begin: usize, size: usize, stride: isize) -> Result<Self> {
        check_span(data.len(), begin, &[size], &[stride], size_of::<T>())?;
        Ok(Self {
            data,
            begin,
            size,
            stride,
            _marker: PhantomData,
        })
    }

    /// View of one member of an interleaved struct array.
    ///
    /// `offset` is the byte offset of the member inside `S`.
    pub fn interleaved<S: Pod>(data: &'a [S], offset: usize) -> Result<Self> {
        Self::from_bytes(
            bytemuck::cast_slice(data),
            offset,
            data.len(),
            size_of::<S>() as isize,
        )
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Distance between consecutive elements in bytes.
    #[inline]
    pub fn stride(&self) -> isize {
        self.stride
    }

    /// Backing bytes.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Byte offset of the first element inside [`data()`](Self::data).
    #[inline]
    pub fn begin(&self) -> usize {
        self.begin
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<T> {
        (i < self.size).then(|| read(self.data, offset(self.begin, i, self.stride)))
    }

    pub fn iter(&self) -> StridedIter<'a, T> {
        StridedIter { view: *self, index: 0 }
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Sub-view of elements `start..end`, `None` if out of range.
    pub fn slice(&self, start: usize, end: usize) -> Option<Self> {
        if start > end || end > self.size {
            return None;
        }
        Some(Self {
            begin: if start == end { self.begin } else { offset(self.begin, start, self.stride) },
            size: end - start,
            ..*self
        })
    }

    /// Every `step`-th element, starting with the first.
    pub fn every(&self, step: usize) -> Self {
        let step = step.max(1);
        Self {
            size: self.size.div_ceil(step),
            stride: self.stride * step as isize,
            ..*self
        }
    }

    /// The same elements in reverse order.
    pub fn flipped(&self) -> Self {
        if self.size == 0 {
            return *self;
        }
        Self {
            begin: offset(self.begin, self.size - 1, self.stride),
            stride: -self.stride,
            ..*self
        }
    }

    /// Repeat the first element `size` times using a zero stride.
    pub fn broadcasted(&self, size: usize) -> Option<Self> {
        (!self.is_empty()).then(|| Self {
            size,
            stride: 0,
            ..*self
        })
    }

    /// Byte-granular view of the same elements.
    pub fn erased(&self) -> StridedView<'a, u8> {
        StridedView {
            data: self.data,
            begin: self.begin,
            size: self.size,
            stride: self.stride,
            _marker: PhantomData,
        }
    }
}

impl<T: Pod + fmt::Debug> fmt::Debug for StridedView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T: Pod> From<&'a [T]> for StridedView<'a, T> {
    fn from(data: &'a [T]) -> Self {
        Self::new(data)
    }
}

impl<'a, T: Pod, const N: usize> From<&'a [T; N]> for StridedView<'a, T> {
    fn from(data: &'a [T; N]) -> Self {
        Self::new(data)
    }
}

impl<'a, T: Pod> IntoIterator for StridedView<'a, T> {
    type Item = T;
    type IntoIter = StridedIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the elements of a [`StridedView`].
pub struct StridedIter<'a, T> {
    view: StridedView<'a, T>,
    index: usize,
}

impl<T: Pod> Iterator for StridedIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let value = self.view.get(self.index)?;
        self.index += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.view.size - self.index;
        (left, Some(left))
    }
}

impl<T: Pod> ExactSizeIterator for StridedIter<'_, T> {}

/// Mutable strided view of `T` elements.
#[derive(Debug)]
pub struct StridedViewMut<'a, T> {
    data: &'a mut [u8],
    begin: usize,
    size: usize,
    stride: isize,
    _marker: PhantomData<T>,
}

impl<'a, T: Pod> StridedViewMut<'a, T> {
    /// Contiguous view of a mutable slice.
    pub fn new(data: &'a mut [T]) -> Self {
        let size = data.len();
        Self {
            data: bytemuck::cast_slice_mut(data),
            begin: 0,
            size,
            stride: size_of::<T>() as isize,
            _marker: PhantomData,
        }
    }

    pub fn from_bytes(data: &'a mut [u8], begin: usize, size: usize, stride: isize) -> Result<Self> {
        check_span(data.len(), begin, &[size], &[stride], size_of::<T>())?;
        Ok(Self {
            data,
            begin,
            size,
            stride,
            _marker: PhantomData,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn stride(&self) -> isize {
        self.stride
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<T> {
        (i < self.size).then(|| read(self.data, offset(self.begin, i, self.stride)))
    }

    /// Overwrite element `i`.
    ///
    /// # Panics
    ///
    /// If `i` is out of range.
    pub fn set(&mut self, i: usize, value: T) {
        assert!(i < self.size, "index {i} out of range for {} elements", self.size);
        write(self.data, offset(self.begin, i, self.stride), value);
    }

    /// Read-only reborrow.
    pub fn as_view(&self) -> StridedView<'_, T> {
        StridedView {
            data: self.data,
            begin: self.begin,
            size: self.size,
            stride: self.stride,
            _marker: PhantomData,
        }
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.as_view().to_vec()
    }
}

// === Typed 2D views ===

/// Read-only 2D strided view, rows by columns.
///
/// Array fields and type-erased byte rows use this shape. The second
/// dimension is contiguous when its stride equals the element size.
pub struct StridedView2D<'a, T> {
    data: &'a [u8],
    begin: usize,
    size: [usize; 2],
    stride: [isize; 2],
    _marker: PhantomData<T>,
}

impl<T> Clone for StridedView2D<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StridedView2D<'_, T> {}

impl<'a, T: Pod> StridedView2D<'a, T> {
    pub fn from_bytes(
        data: &'a [u8],
        begin: usize,
        size: [usize; 2],
        stride: [isize; 2],
    ) -> Result<Self> {
        check_span(data.len(), begin, &size, &stride, size_of::<T>())?;
        Ok(Self {
            data,
            begin,
            size,
            stride,
            _marker: PhantomData,
        })
    }

    /// Contiguous rows of `N` elements each.
    pub fn from_rows<const N: usize>(rows: StridedView<'a, [T; N]>) -> Self {
        Self {
            data: rows.data,
            begin: rows.begin,
            size: [rows.size, N],
            stride: [rows.stride, size_of::<T>() as isize],
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn size(&self) -> [usize; 2] {
        self.size
    }

    #[inline]
    pub fn stride(&self) -> [isize; 2] {
        self.stride
    }

    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    #[inline]
    pub fn begin(&self) -> usize {
        self.begin
    }

    /// Whether the second dimension has no gaps between elements.
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.size[1] <= 1 || self.stride[1] == size_of::<T>() as isize
    }

    pub fn get(&self, i: usize, j: usize) -> Option<T> {
        if i >= self.size[0] || j >= self.size[1] {
            return None;
        }
        let row = offset(self.begin, i, self.stride[0]);
        Some(read(self.data, offset(row, j, self.stride[1])))
    }

    /// Row `i` as a 1D view.
    pub fn row(&self, i: usize) -> Option<StridedView<'a, T>> {
        (i < self.size[0]).then(|| StridedView {
            data: self.data,
            begin: offset(self.begin, i, self.stride[0]),
            size: self.size[1],
            stride: self.stride[1],
            _marker: PhantomData,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = StridedView<'a, T>> + '_ {
        (0..self.size[0]).filter_map(|i| self.row(i))
    }

    /// First column as a 1D view.
    pub fn column(&self) -> StridedView<'a, T> {
        StridedView {
            data: self.data,
            begin: self.begin,
            size: if self.size[1] == 0 { 0 } else { self.size[0] },
            stride: self.stride[0],
            _marker: PhantomData,
        }
    }
}

impl<'a> StridedView2D<'a, u8> {
    /// Bytes of row `i`. `None` if out of range or not contiguous.
    pub fn row_bytes(&self, i: usize) -> Option<&'a [u8]> {
        if i >= self.size[0] || !self.is_contiguous() {
            return None;
        }
        let at = offset(self.begin, i, self.stride[0]);
        Some(&self.data[at..at + self.size[1]])
    }

    /// Reinterpret contiguous byte rows as single elements of `U`.
    ///
    /// Fails if the row width doesn't match the size of `U`.
    pub fn cast<U: Pod>(&self) -> Option<StridedView<'a, U>> {
        if !self.is_contiguous() || self.size[1] != size_of::<U>() {
            return None;
        }
        Some(StridedView {
            data: self.data,
            begin: self.begin,
            size: self.size[0],
            stride: self.stride[0],
            _marker: PhantomData,
        })
    }
}

impl<T: Pod + fmt::Debug> fmt::Debug for StridedView2D<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rows()).finish()
    }
}

/// Mutable 2D strided view.
pub struct StridedView2DMut<'a, T> {
    data: &'a mut [u8],
    begin: usize,
    size: [usize; 2],
    stride: [isize; 2],
    _marker: PhantomData<T>,
}

impl<'a, T: Pod> StridedView2DMut<'a, T> {
    pub fn from_bytes(
        data: &'a mut [u8],
        begin: usize,
        size: [usize; 2],
        stride: [isize; 2],
    ) -> Result<Self> {
        check_span(data.len(), begin, &size, &stride, size_of::<T>())?;
        Ok(Self {
            data,
            begin,
            size,
            stride,
            _marker: PhantomData,
        })
    }

    #[inline]
    pub fn size(&self) -> [usize; 2] {
        self.size
    }

    #[inline]
    pub fn stride(&self) -> [isize; 2] {
        self.stride
    }

    pub fn get(&self, i: usize, j: usize) -> Option<T> {
        self.as_view().get(i, j)
    }

    /// Overwrite element `(i, j)`.
    ///
    /// # Panics
    ///
    /// If either index is out of range.
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        assert!(
            i < self.size[0] && j < self.size[1],
            "index ({i}, {j}) out of range for {:?}",
            self.size
        );
        let row = offset(self.begin, i, self.stride[0]);
        write(self.data, offset(row, j, self.stride[1]), value);
    }

    pub fn as_view(&self) -> StridedView2D<'_, T> {
        StridedView2D {
            data: self.data,
            begin: self.begin,
            size: self.size,
            stride: self.stride,
            _marker: PhantomData,
        }
    }
}

impl StridedView2DMut<'_, u8> {
    /// Mutable bytes of row `i`. `None` if out of range or not contiguous.
    pub fn row_bytes_mut(&mut self, i: usize) -> Option<&mut [u8]> {
        if i >= self.size[0] || !(self.size[1] <= 1 || self.stride[1] == 1) {
            return None;
        }
        let at = offset(self.begin, i, self.stride[0]);
        Some(&mut self.data[at..at + self.size[1]])
    }
}

// === Bit views ===

#[inline]
fn bit_index(begin: usize, i: usize, stride: isize) -> usize {
    offset(begin, i, stride)
}

#[inline]
fn read_bit(data: &[u8], bit: usize) -> bool {
    data[bit / 8] & (1 << (bit % 8)) != 0
}

#[inline]
fn write_bit(data: &mut [u8], bit: usize, value: bool) {
    let mask = 1u8 << (bit % 8);
    if value {
        data[bit / 8] |= mask;
    } else {
        data[bit / 8] &= !mask;
    }
}

/// Read-only strided view of single bits.
///
/// `begin` and `stride` are counted in bits from the start of the backing bytes.
#[derive(Clone, Copy)]
pub struct BitView<'a> {
    data: &'a [u8],
    begin: usize,
    size: usize,
    stride: isize,
}

impl<'a> BitView<'a> {
    /// All bits of `data`, contiguous, lowest bit first.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            begin: 0,
            size: data.len() * 8,
            stride: 1,
        }
    }

    /// View of `size` bits starting at bit `begin` of `data`.
    pub fn from_bits(data: &'a [u8], begin: usize, size: usize, stride: isize) -> Result<Self> {
        check_span(data.len() * 8, begin, &[size], &[stride], 1)?;
        Ok(Self {
            data,
            begin,
            size,
            stride,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Distance between consecutive bits.
    #[inline]
    pub fn stride(&self) -> isize {
        self.stride
    }

    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Byte containing the first bit.
    #[inline]
    pub fn begin_byte(&self) -> usize {
        self.begin / 8
    }

    /// Position of the first bit inside its byte, always less than 8.
    #[inline]
    pub fn bit_offset(&self) -> usize {
        self.begin % 8
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<bool> {
        (i < self.size).then(|| read_bit(self.data, bit_index(self.begin, i, self.stride)))
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + 'a {
        let view = *self;
        (0..view.size).map(move |i| read_bit(view.data, bit_index(view.begin, i, view.stride)))
    }

    pub fn to_vec(&self) -> Vec<bool> {
        self.iter().collect()
    }
}

impl fmt::Debug for BitView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Read-only 2D bit view, one row of bits per element.
#[derive(Clone, Copy)]
pub struct BitView2D<'a> {
    data: &'a [u8],
    begin: usize,
    size: [usize; 2],
    stride: [isize; 2],
}

impl<'a> BitView2D<'a> {
    pub fn from_bits(
        data: &'a [u8],
        begin: usize,
        size: [usize; 2],
        stride: [isize; 2],
    ) -> Result<Self> {
        check_span(data.len() * 8, begin, &size, &stride, 1)?;
        Ok(Self {
            data,
            begin,
            size,
            stride,
        })
    }

    #[inline]
    pub fn size(&self) -> [usize; 2] {
        self.size
    }

    #[inline]
    pub fn stride(&self) -> [isize; 2] {
        self.stride
    }

    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Byte containing the first bit.
    #[inline]
    pub fn begin_byte(&self) -> usize {
        self.begin / 8
    }

    /// Position of the first bit inside its byte, always less than 8.
    #[inline]
    pub fn bit_offset(&self) -> usize {
        self.begin % 8
    }

    pub fn get(&self, i: usize, j: usize) -> Option<bool> {
        if i >= self.size[0] || j >= self.size[1] {
            return None;
        }
        let row = bit_index(self.begin, i, self.stride[0]);
        Some(read_bit(self.data, bit_index(row, j, self.stride[1])))
    }

    pub fn row(&self, i: usize) -> Option<BitView<'a>> {
        (i < self.size[0]).then(|| BitView {
            data: self.data,
            begin: bit_index(self.begin, i, self.stride[0]),
            size: self.size[1],
            stride: self.stride[1],
        })
    }

    /// First bit of every row.
    pub fn column(&self) -> BitView<'a> {
        BitView {
            data: self.data,
            begin: self.begin,
            size: if self.size[1] == 0 { 0 } else { self.size[0] },
            stride: self.stride[0],
        }
    }
}

/// Mutable strided view of single bits.
pub struct BitViewMut<'a> {
    data: &'a mut [u8],
    begin: usize,
    size: usize,
    stride: isize,
}

impl<'a> BitViewMut<'a> {
    pub fn from_bits(data: &'a mut [u8], begin: usize, size: usize, stride: isize) -> Result<Self> {
        check_span(data.len() * 8, begin, &[size], &[stride], 1)?;
        Ok(Self {
            data,
            begin,
            size,
            stride,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, i: usize) -> Option<bool> {
        (i < self.size).then(|| read_bit(self.data, bit_index(self.begin, i, self.stride)))
    }

    /// # Panics
    ///
    /// If `i` is out of range.
    pub fn set(&mut self, i: usize, value: bool) {
        assert!(i < self.size, "index {i} out of range for {} bits", self.size);
        write_bit(self.data, bit_index(self.begin, i, self.stride), value);
    }

    pub fn as_view(&self) -> BitView<'_> {
        BitView {
            data: self.data,
            begin: self.begin,
            size: self.size,
            stride: self.stride,
        }
    }
}

/// Mutable 2D bit view.
pub struct BitView2DMut<'a> {
    data: &'a mut [u8],
    begin: usize,
    size: [usize; 2],
    stride: [isize; 2],
}

impl<'a> BitView2DMut<'a> {
    pub fn from_bits(
        data: &'a mut [u8],
        begin: usize,
        size: [usize; 2],
        stride: [isize; 2],
    ) -> Result<Self> {
        check_span(data.len() * 8, begin, &size, &stride, 1)?;
        Ok(Self {
            data,
            begin,
            size,
            stride,
        })
    }

    #[inline]
    pub fn size(&self) -> [usize; 2] {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> Option<bool> {
        self.as_view().get(i, j)
    }

    /// # Panics
    ///
    /// If either index is out of range.
    pub fn set(&mut self, i: usize, j: usize, value: bool) {
        assert!(
            i < self.size[0] && j < self.size[1],
            "index ({i}, {j}) out of range for {:?}",
            self.size
        );
        let row = bit_index(self.begin, i, self.stride[0]);
        write_bit(self.data, bit_index(row, j, self.stride[1]), value);
    }

    pub fn as_view(&self) -> BitView2D<'_> {
        BitView2D {
            data: self.data,
            begin: self.begin,
            size: self.size,
            stride: self.stride,
        }
    }
}
