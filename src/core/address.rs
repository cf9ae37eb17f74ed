//! Location of a column inside a byte buffer.

use std::fmt;

/// Where the first element of a view lives.
///
/// Direct descriptors carry the bytes they view. Offset-only descriptors carry
/// only a byte offset and are resolved against a buffer at access time.
#[derive(Clone, Copy)]
pub enum Address<'a> {
    /// Backing bytes and the offset of the first element inside them.
    Absolute { data: &'a [u8], begin: usize },
    /// Offset of the first element inside a buffer supplied later.
    Relative(usize),
}

impl<'a> Address<'a> {
    #[inline]
    pub const fn absolute(data: &'a [u8], begin: usize) -> Self {
        Self::Absolute { data, begin }
    }

    /// Backing bytes and first-element offset.
    ///
    /// Absolute addresses ignore `base`. Relative ones need it and resolve
    /// to `None` without one.
    pub fn resolve<'b>(self, base: Option<&'b [u8]>) -> Option<(&'b [u8], usize)>
    where
        'a: 'b,
    {
        match self {
            Self::Absolute { data, begin } => Some((data, begin)),
            Self::Relative(offset) => base.map(|base| (base, offset)),
        }
    }

    /// Signed byte distance of the first element from the start of `base`.
    pub fn position_in(&self, base: &[u8]) -> isize {
        match *self {
            Self::Absolute { data, begin } => {
                (data.as_ptr() as isize + begin as isize).wrapping_sub(base.as_ptr() as isize)
            }
            Self::Relative(offset) => offset as isize,
        }
    }

    /// Signed byte distance from `self` to `other`, when both are comparable.
    ///
    /// Two relative addresses, or two absolute ones, can be compared.
    pub(crate) fn distance_to(&self, other: &Address<'_>) -> Option<i64> {
        match (*self, *other) {
            (Self::Relative(a), Address::Relative(b)) => Some(b as i64 - a as i64),
            (Self::Absolute { data: a, begin: ab }, Address::Absolute { data: b, begin: bb }) => {
                let from = a.as_ptr() as i64 + ab as i64;
                let to = b.as_ptr() as i64 + bb as i64;
                Some(to.wrapping_sub(from))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Address<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute { data, begin } => {
                write!(f, "Absolute({:p} + {begin}, {} bytes)", data.as_ptr(), data.len())
            }
            Self::Relative(offset) => write!(f, "Relative({offset})"),
        }
    }
}
