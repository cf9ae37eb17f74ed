//! Utility types shared by the scene layer.
//!
//! - [`SceneMappingType`] / [`SceneFieldType`] - type registry
//! - [`Error`] / [`Result`] - error handling
//! - [`StridedView`] and friends - strided views over bytes
//! - Math types, glam re-exports plus the ones glam lacks

mod error;
mod field_type;
mod mapping_type;
mod math;
mod strided;

pub use error::*;
pub use field_type::*;
pub use mapping_type::*;
pub use math::*;
pub use strided::*;
