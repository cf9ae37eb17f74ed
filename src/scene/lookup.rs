//! Object lookup and single-object queries.
//!
//! A row for an object is found in one of three ways depending on the field
//! flags: directly for implicit mappings, by binary search for ordered ones
//! and by a linear scan otherwise. All three return the lowest matching row
//! at or after the start offset.

use smallvec::SmallVec;

use super::convert::{integer, pointer};
use super::{FieldKey, SceneData};
use crate::core::{FieldData, SceneField, SceneFieldFlags};
use crate::util::{
    Complex, Error, Mat3, Mat4, Pointer, Quat, Result, SceneMappingType, StridedView2D, Vec2, Vec3,
};

/// Object ids of a field's rows, generated for implicit mappings.
pub(super) struct Objects<'b> {
    mapping_type: SceneMappingType,
    rows: Option<StridedView2D<'b, u8>>,
}

impl Objects<'_> {
    #[inline]
    pub(super) fn get(&self, row: usize) -> Result<u64> {
        match &self.rows {
            Some(rows) => rows
                .row_bytes(row)
                .map(|bytes| self.mapping_type.read(bytes))
                .ok_or(Error::UnreadableRow { column: "mapping", row }),
            None => Ok(row as u64),
        }
    }
}

impl SceneData<'_> {
    pub(super) fn objects(&self, field: &FieldData<'static>) -> Result<Objects<'_>> {
        let rows = match field.has_mapping_data() {
            true => Some(field.mapping_data(Some(self.data()))?),
            false => None,
        };
        Ok(Objects {
            mapping_type: field.mapping_type(),
            rows,
        })
    }

    fn check_object(&self, object: u64) -> Result<()> {
        if object >= self.mapping_bound() {
            return Err(Error::ObjectOutOfRange {
                object: object as i128,
                bound: self.mapping_bound(),
            });
        }
        Ok(())
    }

    /// First row of `field` at or after `offset` that belongs to `object`.
    pub(super) fn find(&self, field: &FieldData<'static>, object: u64, offset: usize) -> Result<Option<usize>> {
        let size = field.size();
        let flags = field.flags();

        if flags.contains(SceneFieldFlags::IMPLICIT_MAPPING) {
            let found = object >= offset as u64 && object < size as u64;
            return Ok(found.then_some(object as usize));
        }

        let objects = self.objects(field)?;
        if flags.contains(SceneFieldFlags::ORDERED_MAPPING) {
            let (mut lo, mut hi) = (offset, size);
            while lo < hi {
                let mid = lo + (hi - lo) / 2;
                if objects.get(mid)? < object {
                    lo = mid + 1;
                } else {
                    hi = mid;
                }
            }
            return Ok((lo < size && objects.get(lo)? == object).then_some(lo));
        }

        for row in offset..size {
            if objects.get(row)? == object {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    /// First row of a field at or after `offset` that belongs to `object`.
    ///
    /// Re-invoke with `found + 1` to get further rows for the same object.
    pub fn find_field_object_offset(
        &self,
        key: impl FieldKey,
        object: u64,
        offset: usize,
    ) -> Result<Option<usize>> {
        let field = &self.fields()[key.field_index(self)?];
        self.check_object(object)?;
        if offset > field.size() {
            return Err(Error::OffsetOutOfRange {
                offset,
                size: field.size(),
            });
        }
        self.find(field, object, offset)
    }

    /// Like [`find_field_object_offset()`](Self::find_field_object_offset), but
    /// a missing object is an error.
    pub fn field_object_offset(&self, key: impl FieldKey, object: u64, offset: usize) -> Result<usize> {
        let name = self.field_data(key)?.name();
        self.find_field_object_offset(key, object, offset)?
            .ok_or(Error::ObjectNotFound { object, name, offset })
    }

    pub fn has_field_object(&self, key: impl FieldKey, object: u64) -> Result<bool> {
        Ok(self.find_field_object_offset(key, object, 0)?.is_some())
    }

    // === Hierarchy ===

    /// Parent of `object`, `-1` for a root. `None` without a Parent entry.
    pub fn parent_for(&self, object: u64) -> Result<Option<i64>> {
        self.check_object(object)?;
        let Some(field) = self.named(SceneField::Parent) else {
            return Ok(None);
        };
        let Some(row) = self.find(field, object, 0)? else {
            return Ok(None);
        };
        self.column(field)?.get(row, integer).map(Some)
    }

    /// Objects whose parent is `object`, in row order. `-1` lists the roots.
    pub fn children_for(&self, object: i64) -> Result<Vec<u64>> {
        if object < -1 || (object >= 0 && object as u64 >= self.mapping_bound()) {
            return Err(Error::ObjectOutOfRange {
                object: object as i128,
                bound: self.mapping_bound(),
            });
        }
        let Some(field) = self.named(SceneField::Parent) else {
            return Ok(Vec::new());
        };
        let objects = self.objects(field)?;
        let parents = self.column(field)?;
        let mut out = Vec::new();
        for row in 0..field.size() {
            if parents.get(row, integer)? == object {
                out.push(objects.get(row)?);
            }
        }
        Ok(out)
    }

    // === Transformations ===

    /// Field whose row count all transformation queries share.
    pub fn transformation_field_size(&self) -> Result<usize> {
        [
            SceneField::Transformation,
            SceneField::Translation,
            SceneField::Rotation,
            SceneField::Scaling,
        ]
        .into_iter()
        .find_map(|name| self.named(name))
        .map(|field| field.size())
        .ok_or(Error::NoTransformationField)
    }

    /// Transformation of `object`, composed from TRS if there's no
    /// Transformation field. Fails on a 3D scene.
    pub fn transformation_2d_for(&self, object: u64) -> Result<Option<Mat3>> {
        self.check_object(object)?;
        self.check_dimensions(2)?;
        let Some((field, source)) = self.transform_source()? else {
            return Ok(None);
        };
        self.find(field, object, 0)?.map(|row| source.matrix_2d(row)).transpose()
    }

    /// Transformation of `object`. Fails on a 2D scene.
    pub fn transformation_3d_for(&self, object: u64) -> Result<Option<Mat4>> {
        self.check_object(object)?;
        self.check_dimensions(3)?;
        let Some((field, source)) = self.transform_source()? else {
            return Ok(None);
        };
        self.find(field, object, 0)?.map(|row| source.matrix_3d(row)).transpose()
    }

    /// Translation, rotation and scaling of `object`; absent parts are identity.
    ///
    /// `None` if the scene has no TRS fields or the object isn't in them.
    pub fn translation_rotation_scaling_2d_for(&self, object: u64) -> Result<Option<(Vec2, Complex, Vec2)>> {
        self.check_object(object)?;
        self.check_dimensions(2)?;
        let Some((field, trs)) = self.trs_source()? else {
            return Ok(None);
        };
        self.find(field, object, 0)?.map(|row| trs.at_2d(row)).transpose()
    }

    pub fn translation_rotation_scaling_3d_for(&self, object: u64) -> Result<Option<(Vec3, Quat, Vec3)>> {
        self.check_object(object)?;
        self.check_dimensions(3)?;
        let Some((field, trs)) = self.trs_source()? else {
            return Ok(None);
        };
        self.find(field, object, 0)?.map(|row| trs.at_3d(row)).transpose()
    }

    // === Attachments ===

    /// Every `(mesh, material)` attached to `object`, in row order.
    ///
    /// Material is `-1` without a MeshMaterial field.
    pub fn meshes_materials_for(&self, object: u64) -> Result<SmallVec<[(u32, i32); 4]>> {
        self.check_object(object)?;
        let mut out = SmallVec::new();
        let Some(field) = self.named(SceneField::Mesh) else {
            return Ok(out);
        };
        let meshes = self.column(field)?;
        let materials = self
            .named(SceneField::MeshMaterial)
            .map(|material| self.column(material))
            .transpose()?;

        let mut offset = 0;
        while let Some(row) = self.find(field, object, offset)? {
            let mesh = meshes.get(row, integer)? as u32;
            let material = match materials {
                Some(c) => c.get(row, integer)? as i32,
                None => -1,
            };
            out.push((mesh, material));
            offset = row + 1;
        }
        Ok(out)
    }

    fn indices_for(&self, name: SceneField, object: u64) -> Result<SmallVec<[u32; 4]>> {
        self.check_object(object)?;
        let mut out = SmallVec::new();
        let Some(field) = self.named(name) else {
            return Ok(out);
        };
        let values = self.column(field)?;
        let mut offset = 0;
        while let Some(row) = self.find(field, object, offset)? {
            out.push(values.get(row, integer)? as u32);
            offset = row + 1;
        }
        Ok(out)
    }

    /// Every light attached to `object`.
    pub fn lights_for(&self, object: u64) -> Result<SmallVec<[u32; 4]>> {
        self.indices_for(SceneField::Light, object)
    }

    pub fn cameras_for(&self, object: u64) -> Result<SmallVec<[u32; 4]>> {
        self.indices_for(SceneField::Camera, object)
    }

    pub fn skins_for(&self, object: u64) -> Result<SmallVec<[u32; 4]>> {
        self.indices_for(SceneField::Skin, object)
    }

    /// Importer state of `object`, first entry only.
    pub fn importer_state_for(&self, object: u64) -> Result<Option<Pointer>> {
        self.check_object(object)?;
        let Some(field) = self.named(SceneField::ImporterState) else {
            return Ok(None);
        };
        let Some(row) = self.find(field, object, 0)? else {
            return Ok(None);
        };
        self.column(field)?.get(row, pointer).map(Some)
    }
}
