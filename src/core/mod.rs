//! Field names, flags and field descriptors.
//!
//! - [`SceneField`] / [`SceneFieldFlags`] - field identity and flags
//! - [`FieldData`] - one column of a scene, direct or offset-only
//! - [`OffsetView`] / [`OffsetBitView`] - offset-only view descriptions

mod address;
mod field;
mod field_data;

pub(crate) use address::Address;
pub(crate) use field_data::Placement;
pub use field::{CustomField, SceneField, SceneFieldFlags};
pub use field_data::{FieldData, OffsetBitView, OffsetView};
