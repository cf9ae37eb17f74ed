//! # scenedata
//!
//! Type-erased columnar store for per-object scene attributes.
//!
//! A scene is a set of named fields over one byte buffer. Every field is a
//! pair of columns: a mapping column naming the object each row belongs to,
//! and a field column holding the values. Columns are strided views, so data
//! can be interleaved, padded or shared between fields without copying.
//!
//! ## Modules
//!
//! - [`util`] - Type registry, strided views, math payload types, errors
//! - [`core`] - Field names, flags and the [`FieldData`] descriptor
//! - [`scene`] - The validated [`SceneData`] table and its queries
//!
//! ## Example
//!
//! ```
//! use scenedata::prelude::*;
//!
//! let objects = [0u16, 1, 2];
//! let meshes = [5u16, 5, 9];
//! let mut data = Vec::new();
//! data.extend_from_slice(bytemuck::cast_slice(&objects[..]));
//! data.extend_from_slice(bytemuck::cast_slice(&meshes[..]));
//!
//! let mesh = FieldData::offset_only(
//!     SceneField::Mesh,
//!     3,
//!     SceneMappingType::UnsignedShort,
//!     OffsetView::new(0, 2),
//!     SceneFieldType::UnsignedShort,
//!     OffsetView::new(6, 2),
//!     SceneFieldFlags::ORDERED_MAPPING,
//! )?;
//! let scene = SceneData::new(SceneMappingType::UnsignedShort, 3, data, vec![mesh])?;
//! assert_eq!(scene.meshes_materials_for(2)?.as_slice(), &[(9, -1)]);
//! # Ok::<(), scenedata::Error>(())
//! ```

pub mod util;
pub mod core;
pub mod scene;

// Re-export commonly used types
pub use crate::core::{FieldData, SceneField, SceneFieldFlags};
pub use scene::SceneData;
pub use util::{Error, ErrorKind, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{CustomField, FieldData, OffsetBitView, OffsetView, SceneField, SceneFieldFlags};
    pub use crate::scene::{DataFlags, FieldKey, SceneBuffer, SceneData, SceneString, SceneStrings};
    pub use crate::util::{
        BitView, BitView2D, Error, ErrorKind, Result, SceneFieldType, SceneFieldValue, SceneMappingType,
        SceneMappingValue, StridedView, StridedView2D,
    };
}
