//! Backing storage of a scene.

use bitflags::bitflags;

bitflags! {
    /// What a [`SceneData`](super::SceneData) may do with its buffer.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct DataFlags: u8 {
        /// The buffer is owned by the scene.
        const OWNED = 1 << 0;
        /// The buffer can be written through the mutable accessors.
        const MUTABLE = 1 << 1;
    }
}

/// Byte buffer a scene is built over.
#[derive(Debug)]
pub enum SceneBuffer<'a> {
    /// Owned and mutable.
    Owned(Vec<u8>),
    /// Borrowed, read-only.
    Borrowed(&'a [u8]),
    /// Borrowed and mutable.
    BorrowedMut(&'a mut [u8]),
}

impl<'a> SceneBuffer<'a> {
    pub fn flags(&self) -> DataFlags {
        match self {
            Self::Owned(_) => DataFlags::OWNED | DataFlags::MUTABLE,
            Self::Borrowed(_) => DataFlags::empty(),
            Self::BorrowedMut(_) => DataFlags::MUTABLE,
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Owned(data) => data,
            Self::Borrowed(data) => data,
            Self::BorrowedMut(data) => data,
        }
    }

    /// Mutable bytes, `None` for a read-only buffer.
    #[inline]
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::Owned(data) => Some(data),
            Self::Borrowed(_) => None,
            Self::BorrowedMut(data) => Some(data),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy into an owned buffer, keeping owned data as is.
    pub fn into_owned(self) -> Vec<u8> {
        match self {
            Self::Owned(data) => data,
            Self::Borrowed(data) => data.to_vec(),
            Self::BorrowedMut(data) => data.to_vec(),
        }
    }
}

impl Default for SceneBuffer<'_> {
    fn default() -> Self {
        Self::Borrowed(&[])
    }
}

impl From<Vec<u8>> for SceneBuffer<'_> {
    fn from(data: Vec<u8>) -> Self {
        Self::Owned(data)
    }
}

impl<'a> From<&'a [u8]> for SceneBuffer<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::Borrowed(data)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for SceneBuffer<'a> {
    fn from(data: &'a [u8; N]) -> Self {
        Self::Borrowed(data)
    }
}

impl<'a> From<&'a mut [u8]> for SceneBuffer<'a> {
    fn from(data: &'a mut [u8]) -> Self {
        Self::BorrowedMut(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let mut bytes = [1u8, 2, 3];
        assert_eq!(
            SceneBuffer::from(vec![0u8; 4]).flags(),
            DataFlags::OWNED | DataFlags::MUTABLE
        );
        assert_eq!(SceneBuffer::from(&bytes[..]).flags(), DataFlags::empty());
        let mut buffer = SceneBuffer::from(&mut bytes[..]);
        assert_eq!(buffer.flags(), DataFlags::MUTABLE);
        buffer.as_mut_slice().unwrap()[0] = 9;
        assert_eq!(buffer.into_owned(), vec![9, 2, 3]);
    }

    #[test]
    fn test_read_only() {
        let bytes = [5u8; 2];
        let mut buffer = SceneBuffer::from(&bytes);
        assert!(buffer.as_mut_slice().is_none());
        assert_eq!(buffer.len(), 2);
        assert!(SceneBuffer::default().is_empty());
    }
}
