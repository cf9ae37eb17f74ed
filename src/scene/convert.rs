//! Bulk queries.
//!
//! Every `*_into` call writes a window of rows starting at `offset` into
//! caller-supplied slices and returns the number of rows written. Empty
//! destinations are skipped, the others must all have the same length.
//! The `*_as_array` variants materialize the whole field.
//!
//! Values are produced by the same row readers the single-object queries in
//! [`lookup`](super::lookup) use, so both agree row by row.

use std::mem::size_of;
use std::ops::Range;

use bytemuck::Pod;

use super::{FieldKey, SceneData};
use crate::core::{FieldData, SceneField};
use crate::util::{
    Complex, Complexd, DMat3, DMat4, DQuat, DVec2, DVec3, DualComplex, DualComplexd, DualQuaternion,
    DualQuaterniond, Error, Mat2, Mat3, Mat4, Matrix3x2, Matrix3x2d, Matrix4x3, Matrix4x3d,
    Pointer, Quat, Result, SceneFieldType, StridedView2D, Vec2, Vec3,
};

// === Row readers ===

#[inline]
fn read<T: Pod>(bytes: &[u8]) -> Option<T> {
    bytes.get(..size_of::<T>()).map(bytemuck::pod_read_unaligned)
}

/// Any integer field value, widened.
pub(super) fn integer(field_type: SceneFieldType, bytes: &[u8]) -> Option<i64> {
    use SceneFieldType as T;
    match field_type {
        T::UnsignedByte => read::<u8>(bytes).map(i64::from),
        T::Byte => read::<i8>(bytes).map(i64::from),
        T::UnsignedShort => read::<u16>(bytes).map(i64::from),
        T::Short => read::<i16>(bytes).map(i64::from),
        T::UnsignedInt => read::<u32>(bytes).map(i64::from),
        T::Int => read::<i32>(bytes).map(i64::from),
        T::UnsignedLong => read::<u64>(bytes).map(|v| v as i64),
        T::Long => read::<i64>(bytes),
        _ => None,
    }
}

pub(super) fn pointer(field_type: SceneFieldType, bytes: &[u8]) -> Option<Pointer> {
    match field_type {
        SceneFieldType::Pointer | SceneFieldType::MutablePointer => read::<Pointer>(bytes),
        _ => None,
    }
}

fn transformation_2d(field_type: SceneFieldType, bytes: &[u8]) -> Option<Mat3> {
    use SceneFieldType as T;
    match field_type {
        T::Matrix3x3 => read::<Mat3>(bytes),
        T::Matrix3x3d => read::<DMat3>(bytes).map(|m| m.as_mat3()),
        T::Matrix3x2 => read::<Matrix3x2>(bytes).map(Matrix3x2::to_mat3),
        T::Matrix3x2d => read::<Matrix3x2d>(bytes).map(Matrix3x2d::to_mat3),
        T::DualComplex => read::<DualComplex>(bytes).map(DualComplex::to_mat3),
        T::DualComplexd => read::<DualComplexd>(bytes).map(|d| d.as_dual_complex().to_mat3()),
        _ => None,
    }
}

fn transformation_3d(field_type: SceneFieldType, bytes: &[u8]) -> Option<Mat4> {
    use SceneFieldType as T;
    match field_type {
        T::Matrix4x4 => read::<Mat4>(bytes),
        T::Matrix4x4d => read::<DMat4>(bytes).map(|m| m.as_mat4()),
        T::Matrix4x3 => read::<Matrix4x3>(bytes).map(Matrix4x3::to_mat4),
        T::Matrix4x3d => read::<Matrix4x3d>(bytes).map(Matrix4x3d::to_mat4),
        T::DualQuaternion => read::<DualQuaternion>(bytes).map(DualQuaternion::to_mat4),
        T::DualQuaterniond => {
            read::<DualQuaterniond>(bytes).map(|d| d.as_dual_quaternion().to_mat4())
        }
        _ => None,
    }
}

fn vector_2d(field_type: SceneFieldType, bytes: &[u8]) -> Option<Vec2> {
    match field_type {
        SceneFieldType::Vector2 => read::<Vec2>(bytes),
        SceneFieldType::Vector2d => read::<DVec2>(bytes).map(|v| v.as_vec2()),
        _ => None,
    }
}

fn vector_3d(field_type: SceneFieldType, bytes: &[u8]) -> Option<Vec3> {
    match field_type {
        SceneFieldType::Vector3 => read::<Vec3>(bytes),
        SceneFieldType::Vector3d => read::<DVec3>(bytes).map(|v| v.as_vec3()),
        _ => None,
    }
}

fn rotation_2d(field_type: SceneFieldType, bytes: &[u8]) -> Option<Complex> {
    match field_type {
        SceneFieldType::Complex => read::<Complex>(bytes),
        SceneFieldType::Complexd => read::<Complexd>(bytes).map(Complexd::as_complex),
        _ => None,
    }
}

fn rotation_3d(field_type: SceneFieldType, bytes: &[u8]) -> Option<Quat> {
    match field_type {
        SceneFieldType::Quaternion => read::<Quat>(bytes),
        SceneFieldType::Quaterniond => read::<DQuat>(bytes).map(|q| q.as_quat()),
        _ => None,
    }
}

/// `T * R * S` in 2D.
pub(super) fn compose_2d((translation, rotation, scaling): (Vec2, Complex, Vec2)) -> Mat3 {
    let rotation: Mat2 = rotation.to_mat2();
    Mat3::from_translation(translation) * Mat3::from_mat2(rotation) * Mat3::from_scale(scaling)
}

/// `T * R * S` in 3D.
pub(super) fn compose_3d((translation, rotation, scaling): (Vec3, Quat, Vec3)) -> Mat4 {
    Mat4::from_scale_rotation_translation(scaling, rotation, translation)
}

// === Columns ===

/// Rows of one field together with their type.
#[derive(Clone, Copy)]
pub(super) struct Column<'b> {
    field_type: SceneFieldType,
    rows: StridedView2D<'b, u8>,
}

impl Column<'_> {
    pub(super) fn get<T>(&self, row: usize, read: fn(SceneFieldType, &[u8]) -> Option<T>) -> Result<T> {
        self.rows
            .row_bytes(row)
            .and_then(|bytes| read(self.field_type, bytes))
            .ok_or(Error::UnreadableRow { column: "field", row })
    }
}

/// Value of an optional column at `row`, `default` without the column.
fn or_default<T>(
    column: Option<Column<'_>>,
    row: usize,
    read: fn(SceneFieldType, &[u8]) -> Option<T>,
    default: T,
) -> Result<T> {
    column.map_or(Ok(default), |c| c.get(row, read))
}

/// Translation, rotation and scaling columns sharing one mapping.
#[derive(Clone, Copy)]
pub(super) struct TrsColumns<'b> {
    translation: Option<Column<'b>>,
    rotation: Option<Column<'b>>,
    scaling: Option<Column<'b>>,
}

impl TrsColumns<'_> {
    /// Parts at `row`, absent ones defaulting to identity.
    pub(super) fn at_2d(&self, row: usize) -> Result<(Vec2, Complex, Vec2)> {
        Ok((
            or_default(self.translation, row, vector_2d, Vec2::ZERO)?,
            or_default(self.rotation, row, rotation_2d, Complex::IDENTITY)?,
            or_default(self.scaling, row, vector_2d, Vec2::ONE)?,
        ))
    }

    pub(super) fn at_3d(&self, row: usize) -> Result<(Vec3, Quat, Vec3)> {
        Ok((
            or_default(self.translation, row, vector_3d, Vec3::ZERO)?,
            or_default(self.rotation, row, rotation_3d, Quat::IDENTITY)?,
            or_default(self.scaling, row, vector_3d, Vec3::ONE)?,
        ))
    }
}

/// Where transformations of a scene come from.
#[derive(Clone, Copy)]
pub(super) enum TransformSource<'b> {
    Matrix(Column<'b>),
    Trs(TrsColumns<'b>),
}

impl TransformSource<'_> {
    pub(super) fn matrix_2d(&self, row: usize) -> Result<Mat3> {
        match self {
            Self::Matrix(column) => column.get(row, transformation_2d),
            Self::Trs(trs) => trs.at_2d(row).map(compose_2d),
        }
    }

    pub(super) fn matrix_3d(&self, row: usize) -> Result<Mat4> {
        match self {
            Self::Matrix(column) => column.get(row, transformation_3d),
            Self::Trs(trs) => trs.at_3d(row).map(compose_3d),
        }
    }
}

impl SceneData<'_> {
    pub(super) fn named(&self, name: SceneField) -> Option<&FieldData<'static>> {
        self.find_field_id(name).map(|id| &self.fields()[id])
    }

    pub(super) fn column(&self, field: &FieldData<'static>) -> Result<Column<'_>> {
        Ok(Column {
            field_type: field.field_type(),
            rows: field.field_data(Some(self.data()))?,
        })
    }

    fn named_column(&self, name: SceneField) -> Result<Option<Column<'_>>> {
        self.named(name).map(|field| self.column(field)).transpose()
    }

    /// TRS columns and the field whose mapping they share.
    pub(super) fn trs_source(&self) -> Result<Option<(&FieldData<'static>, TrsColumns<'_>)>> {
        let field = [SceneField::Scaling, SceneField::Rotation, SceneField::Translation]
            .into_iter()
            .find_map(|name| self.named(name));
        let Some(field) = field else {
            return Ok(None);
        };
        let columns = TrsColumns {
            translation: self.named_column(SceneField::Translation)?,
            rotation: self.named_column(SceneField::Rotation)?,
            scaling: self.named_column(SceneField::Scaling)?,
        };
        Ok(Some((field, columns)))
    }

    /// Transformation field if present, the TRS fields otherwise.
    pub(super) fn transform_source(&self) -> Result<Option<(&FieldData<'static>, TransformSource<'_>)>> {
        if let Some(field) = self.named(SceneField::Transformation) {
            return Ok(Some((field, TransformSource::Matrix(self.column(field)?))));
        }
        Ok(self
            .trs_source()?
            .map(|(field, trs)| (field, TransformSource::Trs(trs))))
    }

    /// Fails if the scene is known to have the other dimensionality.
    pub(super) fn check_dimensions(&self, dimensions: u8) -> Result<()> {
        match self.dimensions() {
            0 => Ok(()),
            d if d == dimensions => Ok(()),
            d => Err(Error::SceneDimensionMismatch { dimensions: d }),
        }
    }

    pub(super) fn required(&self, name: SceneField) -> Result<&FieldData<'static>> {
        self.named(name).ok_or(Error::FieldNotFound(name))
    }

    // === Windowing ===

    /// Rows to write for `offset` and the given destination lengths.
    fn window(&self, field: &FieldData<'_>, offset: usize, dests: &[(&'static str, usize)]) -> Result<Range<usize>> {
        let size = field.size();
        let mut expected = None;
        for &(what, len) in dests.iter().filter(|(_, len)| *len != 0) {
            match expected {
                None => expected = Some(len),
                Some(expected) if expected != len => {
                    return Err(Error::DestinationSizeMismatch {
                        what,
                        expected,
                        got: len,
                    })
                }
                Some(_) => {}
            }
        }
        if offset > size {
            return Err(Error::OffsetOutOfRange { offset, size });
        }
        let count = expected.unwrap_or(0).min(size - offset);
        Ok(offset..offset + count)
    }

    fn fill_mapping(&self, field: &FieldData<'static>, rows: Range<usize>, dest: &mut [u32]) -> Result<()> {
        if dest.is_empty() {
            return Ok(());
        }
        let objects = self.objects(field)?;
        for (out, row) in dest.iter_mut().zip(rows) {
            *out = objects.get(row)? as u32;
        }
        Ok(())
    }

    fn fill<T>(
        column: Option<Column<'_>>,
        rows: Range<usize>,
        dest: &mut [T],
        value: impl Fn(&Column<'_>, usize) -> Result<T>,
    ) -> Result<()> {
        let Some(column) = column else {
            return Ok(());
        };
        for (out, row) in dest.iter_mut().zip(rows) {
            *out = value(&column, row)?;
        }
        Ok(())
    }

    // === Mapping ===

    /// Objects of a field's rows starting at `offset`, as `u32`.
    pub fn mapping_into(&self, key: impl FieldKey, offset: usize, dest: &mut [u32]) -> Result<usize> {
        let field = &self.fields()[key.field_index(self)?];
        let rows = self.window(field, offset, &[("mapping", dest.len())])?;
        self.fill_mapping(field, rows.clone(), dest)?;
        Ok(rows.len())
    }

    pub fn mapping_as_array(&self, key: impl FieldKey) -> Result<Vec<u32>> {
        let mut out = vec![0; self.field_size(key)?];
        self.mapping_into(key, 0, &mut out)?;
        Ok(out)
    }

    // === Parents ===

    pub fn parents_into(&self, offset: usize, mapping: &mut [u32], parents: &mut [i32]) -> Result<usize> {
        let field = self.required(SceneField::Parent)?;
        let rows = self.window(field, offset, &[("mapping", mapping.len()), ("parent", parents.len())])?;
        self.fill_mapping(field, rows.clone(), mapping)?;
        Self::fill(Some(self.column(field)?), rows.clone(), parents, |c, row| {
            c.get(row, integer).map(|v| v as i32)
        })?;
        Ok(rows.len())
    }

    /// `(object, parent)` for every row of the Parent field.
    pub fn parents_as_array(&self) -> Result<Vec<(u32, i32)>> {
        let size = self.required(SceneField::Parent)?.size();
        let (mut mapping, mut parents) = (vec![0; size], vec![0; size]);
        self.parents_into(0, &mut mapping, &mut parents)?;
        Ok(mapping.into_iter().zip(parents).collect())
    }

    // === Transformations ===

    fn transform_field(&self, dimensions: u8) -> Result<(&FieldData<'static>, TransformSource<'_>)> {
        self.check_dimensions(dimensions)?;
        self.transform_source()?.ok_or(Error::NoTransformationField)
    }

    pub fn transformations_2d_into(
        &self,
        offset: usize,
        mapping: &mut [u32],
        transformations: &mut [Mat3],
    ) -> Result<usize> {
        let (field, source) = self.transform_field(2)?;
        let rows = self.window(
            field,
            offset,
            &[("mapping", mapping.len()), ("transformation", transformations.len())],
        )?;
        self.fill_mapping(field, rows.clone(), mapping)?;
        for (out, row) in transformations.iter_mut().zip(rows.clone()) {
            *out = source.matrix_2d(row)?;
        }
        Ok(rows.len())
    }

    /// `(object, transformation)` for every row, composed from TRS if needed.
    pub fn transformations_2d_as_array(&self) -> Result<Vec<(u32, Mat3)>> {
        let size = self.transformation_field_size()?;
        let (mut mapping, mut out) = (vec![0; size], vec![Mat3::IDENTITY; size]);
        self.transformations_2d_into(0, &mut mapping, &mut out)?;
        Ok(mapping.into_iter().zip(out).collect())
    }

    pub fn transformations_3d_into(
        &self,
        offset: usize,
        mapping: &mut [u32],
        transformations: &mut [Mat4],
    ) -> Result<usize> {
        let (field, source) = self.transform_field(3)?;
        let rows = self.window(
            field,
            offset,
            &[("mapping", mapping.len()), ("transformation", transformations.len())],
        )?;
        self.fill_mapping(field, rows.clone(), mapping)?;
        for (out, row) in transformations.iter_mut().zip(rows.clone()) {
            *out = source.matrix_3d(row)?;
        }
        Ok(rows.len())
    }

    pub fn transformations_3d_as_array(&self) -> Result<Vec<(u32, Mat4)>> {
        let size = self.transformation_field_size()?;
        let (mut mapping, mut out) = (vec![0; size], vec![Mat4::IDENTITY; size]);
        self.transformations_3d_into(0, &mut mapping, &mut out)?;
        Ok(mapping.into_iter().zip(out).collect())
    }

    fn trs_field(&self, dimensions: u8) -> Result<(&FieldData<'static>, TrsColumns<'_>)> {
        self.check_dimensions(dimensions)?;
        self.trs_source()?.ok_or(Error::NoTransformationField)
    }

    pub fn translations_rotations_scalings_2d_into(
        &self,
        offset: usize,
        mapping: &mut [u32],
        translations: &mut [Vec2],
        rotations: &mut [Complex],
        scalings: &mut [Vec2],
    ) -> Result<usize> {
        let (field, trs) = self.trs_field(2)?;
        let rows = self.window(
            field,
            offset,
            &[
                ("mapping", mapping.len()),
                ("translation", translations.len()),
                ("rotation", rotations.len()),
                ("scaling", scalings.len()),
            ],
        )?;
        self.fill_mapping(field, rows.clone(), mapping)?;
        for (i, row) in rows.clone().enumerate() {
            let (t, r, s) = trs.at_2d(row)?;
            if let Some(out) = translations.get_mut(i) {
                *out = t;
            }
            if let Some(out) = rotations.get_mut(i) {
                *out = r;
            }
            if let Some(out) = scalings.get_mut(i) {
                *out = s;
            }
        }
        Ok(rows.len())
    }

    pub fn translations_rotations_scalings_2d_as_array(&self) -> Result<Vec<(u32, (Vec2, Complex, Vec2))>> {
        let (field, trs) = self.trs_field(2)?;
        let objects = self.objects(field)?;
        (0..field.size())
            .map(|row| Ok((objects.get(row)? as u32, trs.at_2d(row)?)))
            .collect()
    }

    pub fn translations_rotations_scalings_3d_into(
        &self,
        offset: usize,
        mapping: &mut [u32],
        translations: &mut [Vec3],
        rotations: &mut [Quat],
        scalings: &mut [Vec3],
    ) -> Result<usize> {
        let (field, trs) = self.trs_field(3)?;
        let rows = self.window(
            field,
            offset,
            &[
                ("mapping", mapping.len()),
                ("translation", translations.len()),
                ("rotation", rotations.len()),
                ("scaling", scalings.len()),
            ],
        )?;
        self.fill_mapping(field, rows.clone(), mapping)?;
        for (i, row) in rows.clone().enumerate() {
            let (t, r, s) = trs.at_3d(row)?;
            if let Some(out) = translations.get_mut(i) {
                *out = t;
            }
            if let Some(out) = rotations.get_mut(i) {
                *out = r;
            }
            if let Some(out) = scalings.get_mut(i) {
                *out = s;
            }
        }
        Ok(rows.len())
    }

    pub fn translations_rotations_scalings_3d_as_array(&self) -> Result<Vec<(u32, (Vec3, Quat, Vec3))>> {
        let (field, trs) = self.trs_field(3)?;
        let objects = self.objects(field)?;
        (0..field.size())
            .map(|row| Ok((objects.get(row)? as u32, trs.at_3d(row)?)))
            .collect()
    }

    // === Meshes and materials ===

    /// Materials are `-1` when the scene has no MeshMaterial field.
    pub fn meshes_materials_into(
        &self,
        offset: usize,
        mapping: &mut [u32],
        meshes: &mut [u32],
        materials: &mut [i32],
    ) -> Result<usize> {
        let field = self.required(SceneField::Mesh)?;
        let rows = self.window(
            field,
            offset,
            &[
                ("mapping", mapping.len()),
                ("mesh", meshes.len()),
                ("mesh material", materials.len()),
            ],
        )?;
        self.fill_mapping(field, rows.clone(), mapping)?;
        Self::fill(Some(self.column(field)?), rows.clone(), meshes, |c, row| {
            c.get(row, integer).map(|v| v as u32)
        })?;
        let material = self.named_column(SceneField::MeshMaterial)?;
        if material.is_none() {
            materials.iter_mut().take(rows.len()).for_each(|m| *m = -1);
        }
        Self::fill(material, rows.clone(), materials, |c, row| {
            c.get(row, integer).map(|v| v as i32)
        })?;
        Ok(rows.len())
    }

    pub fn meshes_materials_as_array(&self) -> Result<Vec<(u32, (u32, i32))>> {
        let size = self.required(SceneField::Mesh)?.size();
        let (mut mapping, mut meshes, mut materials) = (vec![0; size], vec![0; size], vec![0; size]);
        self.meshes_materials_into(0, &mut mapping, &mut meshes, &mut materials)?;
        Ok(mapping
            .into_iter()
            .zip(meshes.into_iter().zip(materials))
            .collect())
    }

    // === Lights, cameras, skins ===

    fn indices_into(&self, name: SceneField, offset: usize, mapping: &mut [u32], values: &mut [u32]) -> Result<usize> {
        let field = self.required(name)?;
        let rows = self.window(field, offset, &[("mapping", mapping.len()), ("value", values.len())])?;
        self.fill_mapping(field, rows.clone(), mapping)?;
        Self::fill(Some(self.column(field)?), rows.clone(), values, |c, row| {
            c.get(row, integer).map(|v| v as u32)
        })?;
        Ok(rows.len())
    }

    fn indices_as_array(&self, name: SceneField) -> Result<Vec<(u32, u32)>> {
        let size = self.required(name)?.size();
        let (mut mapping, mut values) = (vec![0; size], vec![0; size]);
        self.indices_into(name, 0, &mut mapping, &mut values)?;
        Ok(mapping.into_iter().zip(values).collect())
    }

    pub fn lights_into(&self, offset: usize, mapping: &mut [u32], lights: &mut [u32]) -> Result<usize> {
        self.indices_into(SceneField::Light, offset, mapping, lights)
    }

    pub fn lights_as_array(&self) -> Result<Vec<(u32, u32)>> {
        self.indices_as_array(SceneField::Light)
    }

    pub fn cameras_into(&self, offset: usize, mapping: &mut [u32], cameras: &mut [u32]) -> Result<usize> {
        self.indices_into(SceneField::Camera, offset, mapping, cameras)
    }

    pub fn cameras_as_array(&self) -> Result<Vec<(u32, u32)>> {
        self.indices_as_array(SceneField::Camera)
    }

    pub fn skins_into(&self, offset: usize, mapping: &mut [u32], skins: &mut [u32]) -> Result<usize> {
        self.indices_into(SceneField::Skin, offset, mapping, skins)
    }

    pub fn skins_as_array(&self) -> Result<Vec<(u32, u32)>> {
        self.indices_as_array(SceneField::Skin)
    }

    // === Importer state ===

    pub fn importer_state_into(&self, offset: usize, mapping: &mut [u32], states: &mut [Pointer]) -> Result<usize> {
        let field = self.required(SceneField::ImporterState)?;
        let rows = self.window(field, offset, &[("mapping", mapping.len()), ("importer state", states.len())])?;
        self.fill_mapping(field, rows.clone(), mapping)?;
        Self::fill(Some(self.column(field)?), rows.clone(), states, |c, row| c.get(row, pointer))?;
        Ok(rows.len())
    }

    pub fn importer_state_as_array(&self) -> Result<Vec<(u32, Pointer)>> {
        let size = self.required(SceneField::ImporterState)?.size();
        let (mut mapping, mut states) = (vec![0; size], vec![Pointer::default(); size]);
        self.importer_state_into(0, &mut mapping, &mut states)?;
        Ok(mapping.into_iter().zip(states).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OffsetView, SceneFieldFlags};
    use crate::util::{ErrorKind, SceneMappingType, StridedView};

    fn push<T: Pod>(data: &mut Vec<u8>, values: &[T]) -> usize {
        let at = data.len();
        data.extend_from_slice(bytemuck::cast_slice(values));
        at
    }

    fn field(
        data: &[u8],
        name: SceneField,
        mapping: usize,
        field_type: SceneFieldType,
        at: usize,
        size: usize,
    ) -> FieldData<'static> {
        let stride = field_type.size().unwrap() as isize;
        assert!(at + size * stride as usize <= data.len());
        FieldData::offset_only(
            name,
            size,
            SceneMappingType::UnsignedShort,
            OffsetView::new(mapping, 2),
            field_type,
            OffsetView::new(at, stride),
            SceneFieldFlags::empty(),
        )
        .unwrap()
    }

    #[test]
    fn test_readers() {
        assert_eq!(integer(SceneFieldType::Byte, &[0xff]), Some(-1));
        assert_eq!(integer(SceneFieldType::UnsignedShort, &0xfffeu16.to_ne_bytes()), Some(0xfffe));
        assert_eq!(integer(SceneFieldType::Long, &(-5i64).to_ne_bytes()), Some(-5));
        assert_eq!(integer(SceneFieldType::Float, &[0; 4]), None);
        assert_eq!(integer(SceneFieldType::Int, &[0; 2]), None);

        let m = Matrix3x2::from_cols(Vec2::X, Vec2::Y, Vec2::new(3.0, 4.0));
        assert_eq!(
            transformation_2d(SceneFieldType::Matrix3x2, bytemuck::bytes_of(&m)),
            Some(Mat3::from_translation(Vec2::new(3.0, 4.0)))
        );
        let q = DQuat::IDENTITY;
        assert_eq!(rotation_3d(SceneFieldType::Quaterniond, bytemuck::bytes_of(&q)), Some(Quat::IDENTITY));
    }

    #[test]
    fn test_unreadable_column_row() {
        let data = [0u8; 8];
        let column = Column {
            field_type: SceneFieldType::Float,
            rows: StridedView2D::from_bytes(&data, 0, [2, 4], [4, 1]).unwrap(),
        };
        assert_eq!(
            column.get(0, integer),
            Err(Error::UnreadableRow { column: "field", row: 0 })
        );
        assert!(matches!(column.get(2, transformation_2d), Err(Error::UnreadableRow { row: 2, .. })));
    }

    #[test]
    fn test_compose() {
        let m = compose_2d((Vec2::new(1.0, 2.0), Complex::IDENTITY, Vec2::new(2.0, 3.0)));
        assert_eq!(m.transform_point2(Vec2::ONE), Vec2::new(3.0, 5.0));

        let rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let m = compose_3d((Vec3::X, rotation, Vec3::splat(2.0)));
        let p = m.transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-6);
    }

    /// Objects 4, 1, 6 with 2D TRS; mesh rows for objects 1, 1, 4.
    fn scene_bytes() -> (Vec<u8>, Vec<FieldData<'static>>) {
        let mut data = Vec::new();
        let objects = push(&mut data, &[4u16, 1, 6]);
        let mesh_objects = push(&mut data, &[1u16, 1, 4]);
        let translations = push(&mut data, &[Vec2::new(1.0, 0.0), Vec2::new(0.0, 2.0), Vec2::ZERO]);
        let scalings = push(&mut data, &[Vec2::ONE, Vec2::splat(2.0), Vec2::new(3.0, 1.0)]);
        let meshes = push(&mut data, &[7u8, 8, 9]);
        let fields = vec![
            field(&data, SceneField::Translation, objects, SceneFieldType::Vector2, translations, 3),
            field(&data, SceneField::Scaling, objects, SceneFieldType::Vector2, scalings, 3),
            field(&data, SceneField::Mesh, mesh_objects, SceneFieldType::UnsignedByte, meshes, 3),
        ];
        (data, fields)
    }

    #[test]
    fn test_transformations_2d() {
        let (data, fields) = scene_bytes();
        let scene = SceneData::new(SceneMappingType::UnsignedShort, 8, &data[..], fields).unwrap();
        assert!(scene.is_2d());
        assert_eq!(scene.transformation_field_size(), Ok(3));

        let all = scene.transformations_2d_as_array().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].0, 1);
        assert_eq!(
            all[1].1,
            Mat3::from_translation(Vec2::new(0.0, 2.0)) * Mat3::from_scale(Vec2::splat(2.0))
        );

        let trs = scene.translations_rotations_scalings_2d_as_array().unwrap();
        assert_eq!(trs[2], (6, (Vec2::ZERO, Complex::IDENTITY, Vec2::new(3.0, 1.0))));

        assert_eq!(
            scene.transformations_3d_as_array().unwrap_err(),
            Error::SceneDimensionMismatch { dimensions: 2 }
        );
    }

    #[test]
    fn test_windowed_into() {
        let (data, fields) = scene_bytes();
        let scene = SceneData::new(SceneMappingType::UnsignedShort, 8, &data[..], fields).unwrap();

        let (mut mapping, mut meshes, mut materials) = ([0u32; 2], [0u32; 2], [0i32; 2]);
        assert_eq!(scene.meshes_materials_into(2, &mut mapping, &mut meshes, &mut materials), Ok(1));
        assert_eq!((mapping[0], meshes[0], materials[0]), (4, 9, -1));
        // untouched past the written rows
        assert_eq!((mapping[1], meshes[1], materials[1]), (0, 0, 0));

        assert_eq!(scene.meshes_materials_into(3, &mut mapping, &mut [], &mut []), Ok(0));
        assert_eq!(
            scene.meshes_materials_into(4, &mut mapping, &mut [], &mut []),
            Err(Error::OffsetOutOfRange { offset: 4, size: 3 })
        );
        assert_eq!(
            scene.meshes_materials_into(0, &mut mapping, &mut [0; 3], &mut []),
            Err(Error::DestinationSizeMismatch {
                what: "mesh",
                expected: 2,
                got: 3
            })
        );

        let mut translations = [Vec2::NAN; 3];
        assert_eq!(
            scene.translations_rotations_scalings_2d_into(1, &mut [], &mut translations, &mut [], &mut []),
            Ok(2)
        );
        assert_eq!(translations[0], Vec2::new(0.0, 2.0));
        assert_eq!(translations[1], Vec2::ZERO);
        assert!(translations[2].is_nan());
    }

    #[test]
    fn test_missing_fields() {
        let (data, fields) = scene_bytes();
        let scene = SceneData::new(SceneMappingType::UnsignedShort, 8, &data[..], fields).unwrap();
        assert_eq!(scene.lights_as_array(), Err(Error::FieldNotFound(SceneField::Light)));
        assert_eq!(scene.parents_as_array().unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            scene.importer_state_into(0, &mut [], &mut []),
            Err(Error::FieldNotFound(SceneField::ImporterState))
        );

        let empty = SceneData::new(SceneMappingType::UnsignedShort, 8, Vec::new(), vec![]).unwrap();
        assert_eq!(empty.transformations_3d_as_array(), Err(Error::NoTransformationField));
        assert_eq!(
            empty.translations_rotations_scalings_2d_as_array(),
            Err(Error::NoTransformationField)
        );
    }

    #[test]
    fn test_implicit_mapping() {
        let cameras = [2u16, 0, 5];
        let bytes: &[u8] = bytemuck::cast_slice(&cameras[..]);
        let field = FieldData::new_implicit(
            SceneField::Camera,
            SceneMappingType::UnsignedByte,
            StridedView::<u16>::from_bytes(bytes, 0, 3, 2).unwrap(),
            SceneFieldFlags::empty(),
        )
        .unwrap();
        let scene = SceneData::new(SceneMappingType::UnsignedByte, 3, bytes, vec![field]).unwrap();
        assert_eq!(scene.cameras_as_array().unwrap(), vec![(0, 2), (1, 0), (2, 5)]);
        let mut mapping = [0u32; 2];
        assert_eq!(scene.mapping_into(0usize, 1, &mut mapping), Ok(2));
        assert_eq!(mapping, [1, 2]);
    }
}
