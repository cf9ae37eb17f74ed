//! Hierarchy traversal over the Parent field.
//!
//! Objects are bucketed by their parent once, in Parent field order, and then
//! walked either breadth-first, which lists every parent before its children,
//! or depth-first, which yields subtree sizes. Every object of the Parent
//! field has to be reachable from a root, and each object may appear at most
//! once.
//!
//! Absolute transformations compose the local ones down the parent chain,
//! `global * root * .. * parent * local`, and are returned per row of an
//! arbitrary field so e.g. meshes can be placed directly.

use super::{FieldKey, SceneData};
use crate::core::SceneField;
use crate::util::{Error, Mat3, Mat4, Result};

/// Parent field rows grouped by parent.
struct Children {
    /// `(object, parent)` per Parent field row.
    rows: Vec<(u32, i32)>,
    /// Children of parent `p` are `sorted[offsets[p + 1]..offsets[p + 2]]`,
    /// roots come first.
    offsets: Vec<usize>,
    /// Row indices ordered by parent, stable within a parent.
    sorted: Vec<usize>,
}

impl Children {
    fn new(rows: Vec<(u32, i32)>, bound: u64) -> Result<Self> {
        let mut offsets = vec![0usize; bound as usize + 2];
        let mut seen = vec![false; bound as usize];
        for &(object, parent) in &rows {
            let slot = seen.get_mut(object as usize).ok_or(Error::ObjectOutOfRange {
                object: object.into(),
                bound,
            })?;
            if *slot {
                return Err(Error::CyclicHierarchy { object: object.into() });
            }
            *slot = true;
            if parent < -1 || i64::from(parent) >= bound as i64 {
                return Err(Error::ObjectOutOfRange {
                    object: parent.into(),
                    bound,
                });
            }
            offsets[bucket(parent) + 1] += 1;
        }
        for i in 1..offsets.len() {
            offsets[i] += offsets[i - 1];
        }

        let mut next = offsets.clone();
        let mut sorted = vec![0; rows.len()];
        for (row, &(_, parent)) in rows.iter().enumerate() {
            let at = &mut next[bucket(parent)];
            sorted[*at] = row;
            *at += 1;
        }
        Ok(Self { rows, offsets, sorted })
    }

    /// Positions in `sorted` of the children of `parent`.
    fn span(&self, parent: i32) -> (usize, usize) {
        let b = bucket(parent);
        (self.offsets[b], self.offsets[b + 1])
    }

    fn of(&self, parent: i32) -> &[usize] {
        let (begin, end) = self.span(parent);
        &self.sorted[begin..end]
    }

    fn check_reachable(&self, reachable: usize) -> Result<()> {
        if reachable != self.rows.len() {
            tracing::debug!(reachable, size = self.rows.len(), "sparse hierarchy");
            return Err(Error::SparseHierarchy {
                reachable,
                size: self.rows.len(),
            });
        }
        Ok(())
    }
}

/// Bucket of `parent`, `-1` maps to the first one.
#[inline]
fn bucket(parent: i32) -> usize {
    (parent + 1) as usize
}

/// One expanded node of the depth-first walk.
struct Frame {
    /// Output position of the node, `None` for the virtual root.
    out: Option<usize>,
    next: usize,
    end: usize,
}

fn check_destination(what: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(Error::DestinationSizeMismatch { what, expected, got });
    }
    Ok(())
}

impl SceneData<'_> {
    fn children(&self) -> Result<Children> {
        Children::new(self.parents_as_array()?, self.mapping_bound())
    }

    // === Traversal ===

    /// `(object, parent)` pairs with every parent listed before its children.
    ///
    /// Roots come first in Parent field order, then the children of each
    /// listed object, clustered together. Fails with
    /// [`FieldNotFound`](Error::FieldNotFound) without a Parent field, with
    /// [`SparseHierarchy`](Error::SparseHierarchy) if some objects can't be
    /// reached from a root and with
    /// [`CyclicHierarchy`](Error::CyclicHierarchy) if an object appears twice.
    pub fn parents_breadth_first(&self) -> Result<Vec<(u32, i32)>> {
        let children = self.children()?;
        let mut out: Vec<(u32, i32)> = Vec::with_capacity(children.rows.len());
        out.extend(children.of(-1).iter().map(|&row| children.rows[row]));

        let mut i = 0;
        while i < out.len() {
            let parent = out[i].0 as i32;
            out.extend(children.of(parent).iter().map(|&row| children.rows[row]));
            i += 1;
        }

        children.check_reachable(out.len())?;
        Ok(out)
    }

    /// Like [`parents_breadth_first`](Self::parents_breadth_first), into
    /// destinations sized exactly to the Parent field.
    pub fn parents_breadth_first_into(&self, mapping: &mut [u32], parents: &mut [i32]) -> Result<()> {
        let size = self.required(SceneField::Parent)?.size();
        check_destination("mapping", size, mapping.len())?;
        check_destination("parent", size, parents.len())?;
        for ((object, parent), (m, p)) in self
            .parents_breadth_first()?
            .into_iter()
            .zip(mapping.iter_mut().zip(parents.iter_mut()))
        {
            *m = object;
            *p = parent;
        }
        Ok(())
    }

    /// `(object, nested child count)` pairs in depth-first preorder.
    ///
    /// The subtree of an object is the `count` entries right after it. Fails
    /// the same way as [`parents_breadth_first`](Self::parents_breadth_first).
    pub fn children_depth_first(&self) -> Result<Vec<(u32, u32)>> {
        let children = self.children()?;
        let mut out: Vec<(u32, u32)> = Vec::with_capacity(children.rows.len());
        let (next, end) = children.span(-1);
        let mut stack = vec![Frame { out: None, next, end }];

        while let Some(frame) = stack.last_mut() {
            if frame.next < frame.end {
                let (object, _) = children.rows[children.sorted[frame.next]];
                frame.next += 1;
                let (next, end) = children.span(object as i32);
                stack.push(Frame {
                    out: Some(out.len()),
                    next,
                    end,
                });
                out.push((object, 0));
            } else {
                let at = frame.out;
                stack.pop();
                if let Some(at) = at {
                    out[at].1 = (out.len() - at - 1) as u32;
                }
            }
        }

        children.check_reachable(out.len())?;
        Ok(out)
    }

    /// Like [`children_depth_first`](Self::children_depth_first), into
    /// destinations sized exactly to the Parent field.
    pub fn children_depth_first_into(&self, mapping: &mut [u32], counts: &mut [u32]) -> Result<()> {
        let size = self.required(SceneField::Parent)?.size();
        check_destination("mapping", size, mapping.len())?;
        check_destination("count", size, counts.len())?;
        for ((object, count), (m, c)) in self
            .children_depth_first()?
            .into_iter()
            .zip(mapping.iter_mut().zip(counts.iter_mut()))
        {
            *m = object;
            *c = count;
        }
        Ok(())
    }

    // === Absolute transformations ===

    /// Absolute transformation for every row of `key`, in its mapping order.
    ///
    /// Objects without a transformation contribute identity, objects outside
    /// the hierarchy get just `global`. Fails if the scene isn't 2D, if there's
    /// no Parent field or if the hierarchy is sparse or cyclic.
    pub fn absolute_field_transformations_2d(&self, key: impl FieldKey, global: Mat3) -> Result<Vec<Mat3>> {
        let mut out = vec![Mat3::IDENTITY; self.field_size(key)?];
        self.absolute_field_transformations_2d_into(key, &mut out, global)?;
        Ok(out)
    }

    /// Like [`absolute_field_transformations_2d`](Self::absolute_field_transformations_2d),
    /// into a destination sized exactly to the field.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn absolute_field_transformations_2d_into(
        &self,
        key: impl FieldKey,
        dest: &mut [Mat3],
        global: Mat3,
    ) -> Result<()> {
        let index = key.field_index(self)?;
        if !self.is_2d() {
            return Err(Error::SceneNotDimensional { expected: 2 });
        }
        check_destination("transformation", self.field_size(index)?, dest.len())?;
        let locals = transformations_or_empty(self.transformations_2d_as_array())?;
        let absolute = self.absolute(Mat3::IDENTITY, global, &locals)?;
        self.scatter(index, &absolute, global, dest)
    }

    /// 3D counterpart of [`absolute_field_transformations_2d`](Self::absolute_field_transformations_2d).
    pub fn absolute_field_transformations_3d(&self, key: impl FieldKey, global: Mat4) -> Result<Vec<Mat4>> {
        let mut out = vec![Mat4::IDENTITY; self.field_size(key)?];
        self.absolute_field_transformations_3d_into(key, &mut out, global)?;
        Ok(out)
    }

    #[tracing::instrument(level = "trace", skip_all)]
    pub fn absolute_field_transformations_3d_into(
        &self,
        key: impl FieldKey,
        dest: &mut [Mat4],
        global: Mat4,
    ) -> Result<()> {
        let index = key.field_index(self)?;
        if !self.is_3d() {
            return Err(Error::SceneNotDimensional { expected: 3 });
        }
        check_destination("transformation", self.field_size(index)?, dest.len())?;
        let locals = transformations_or_empty(self.transformations_3d_as_array())?;
        let absolute = self.absolute(Mat4::IDENTITY, global, &locals)?;
        self.scatter(index, &absolute, global, dest)
    }

    /// Absolute transformation per object, `global` for objects outside the
    /// hierarchy. The first transformation listed for an object wins.
    fn absolute<M>(&self, identity: M, global: M, locals: &[(u32, M)]) -> Result<Vec<Option<M>>>
    where
        M: Copy + std::ops::Mul<Output = M>,
    {
        let bound = self.mapping_bound() as usize;
        let mut local = vec![identity; bound];
        for &(object, transformation) in locals.iter().rev() {
            if let Some(slot) = local.get_mut(object as usize) {
                *slot = transformation;
            }
        }

        let mut absolute: Vec<Option<M>> = vec![None; bound];
        for (object, parent) in self.parents_breadth_first()? {
            let base = match parent {
                -1 => global,
                parent => absolute[parent as usize].unwrap_or(global),
            };
            absolute[object as usize] = Some(base * local[object as usize]);
        }
        Ok(absolute)
    }

    fn scatter<M: Copy>(&self, index: usize, absolute: &[Option<M>], global: M, dest: &mut [M]) -> Result<()> {
        for (out, object) in dest.iter_mut().zip(self.mapping_as_array(index)?) {
            *out = absolute.get(object as usize).copied().flatten().unwrap_or(global);
        }
        Ok(())
    }
}

/// Transformations of the scene, none if it has no transformation field.
fn transformations_or_empty<M>(result: Result<Vec<(u32, M)>>) -> Result<Vec<(u32, M)>> {
    match result {
        Err(Error::NoTransformationField) => Ok(Vec::new()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldData, OffsetView, SceneFieldFlags};
    use crate::util::{SceneFieldType, SceneMappingType, Vec2, Vec3};

    /// Scene with just a Parent field of u16 objects and i16 parents.
    fn parents_scene(pairs: &[(u16, i16)], bound: u64) -> SceneData<'static> {
        let mut data = Vec::new();
        for &(object, _) in pairs {
            data.extend_from_slice(&object.to_ne_bytes());
        }
        for &(_, parent) in pairs {
            data.extend_from_slice(&parent.to_ne_bytes());
        }
        let parent = FieldData::offset_only(
            SceneField::Parent,
            pairs.len(),
            SceneMappingType::UnsignedShort,
            OffsetView::new(0, 2),
            SceneFieldType::Short,
            OffsetView::new(2 * pairs.len(), 2),
            SceneFieldFlags::empty(),
        )
        .unwrap();
        SceneData::new(SceneMappingType::UnsignedShort, bound, data, vec![parent]).unwrap()
    }

    const TREE: [(u16, i16); 10] = [
        (5, 1),
        (6, 9),
        (3, -1),
        (1, -1),
        (9, 10),
        (10, 3),
        (7, 3),
        (157, 3),
        (143, 6),
        (2, -1),
    ];

    #[test]
    fn test_parents_breadth_first() {
        let scene = parents_scene(&TREE, 158);
        assert_eq!(
            scene.parents_breadth_first().unwrap(),
            vec![
                (3, -1),
                (1, -1),
                (2, -1),
                (10, 3),
                (7, 3),
                (157, 3),
                (5, 1),
                (9, 10),
                (6, 9),
                (143, 6)
            ]
        );

        let mut mapping = [0u32; 10];
        let mut parents = [0i32; 10];
        scene.parents_breadth_first_into(&mut mapping, &mut parents).unwrap();
        assert_eq!(mapping, [3, 1, 2, 10, 7, 157, 5, 9, 6, 143]);
        assert_eq!(parents, [-1, -1, -1, 3, 3, 3, 1, 10, 9, 6]);

        let mut short = [0u32; 9];
        assert_eq!(
            scene.parents_breadth_first_into(&mut short, &mut parents),
            Err(Error::DestinationSizeMismatch {
                what: "mapping",
                expected: 10,
                got: 9
            })
        );
    }

    #[test]
    fn test_children_depth_first() {
        let scene = parents_scene(&TREE, 158);
        assert_eq!(
            scene.children_depth_first().unwrap(),
            vec![
                (3, 6),
                (10, 3),
                (9, 2),
                (6, 1),
                (143, 0),
                (7, 0),
                (157, 0),
                (1, 1),
                (5, 0),
                (2, 0)
            ]
        );

        let mut mapping = [0u32; 10];
        let mut counts = [0u32; 11];
        assert_eq!(
            scene.children_depth_first_into(&mut mapping, &mut counts),
            Err(Error::DestinationSizeMismatch {
                what: "count",
                expected: 10,
                got: 11
            })
        );
        scene.children_depth_first_into(&mut mapping, &mut counts[..10]).unwrap();
        assert_eq!(counts[..10], [6, 3, 2, 1, 0, 0, 0, 1, 0, 0]);
    }

    #[test]
    fn test_single_branch() {
        let scene = parents_scene(&[(2, 1), (1, 0), (3, 2), (0, -1)], 4);
        assert_eq!(
            scene.parents_breadth_first().unwrap(),
            vec![(0, -1), (1, 0), (2, 1), (3, 2)]
        );
        assert_eq!(
            scene.children_depth_first().unwrap(),
            vec![(0, 3), (1, 2), (2, 1), (3, 0)]
        );
    }

    #[test]
    fn test_broken_hierarchies() {
        let empty = SceneData::new(SceneMappingType::UnsignedShort, 4, Vec::new(), vec![]).unwrap();
        assert_eq!(
            empty.parents_breadth_first(),
            Err(Error::FieldNotFound(SceneField::Parent))
        );
        assert_eq!(
            empty.children_depth_first(),
            Err(Error::FieldNotFound(SceneField::Parent))
        );

        let no_rows = parents_scene(&[], 4);
        assert_eq!(no_rows.parents_breadth_first(), Ok(vec![]));
        assert_eq!(no_rows.children_depth_first(), Ok(vec![]));

        // 13 is its own parent and never reached from a root
        let sparse = parents_scene(&[(0, -1), (1, 0), (13, 13)], 14);
        assert_eq!(
            sparse.parents_breadth_first(),
            Err(Error::SparseHierarchy { reachable: 2, size: 3 })
        );
        assert_eq!(
            sparse.children_depth_first(),
            Err(Error::SparseHierarchy { reachable: 2, size: 3 })
        );

        let twice = parents_scene(&[(13, -1), (5, 13), (13, 3)], 14);
        assert_eq!(
            twice.parents_breadth_first(),
            Err(Error::CyclicHierarchy { object: 13 })
        );
        assert_eq!(twice.children_depth_first().unwrap_err().kind(), crate::ErrorKind::ConstructionInvariantViolated);

        let out_of_range = parents_scene(&[(0, -1), (1, 7)], 4);
        assert_eq!(
            out_of_range.parents_breadth_first(),
            Err(Error::ObjectOutOfRange { object: 7, bound: 4 })
        );
    }

    #[test]
    fn test_absolute_transformations_3d() {
        // objects 0 -> 1 -> 2, Light rows on 2, 0 and 3 which is outside
        let mut data = vec![0u8, 1, 2];
        data.extend([-1i8, 0, 1].map(|p| p as u8));
        data.extend_from_slice(&[0u8; 2]);
        let matrices = [
            Mat4::from_translation(Vec3::X),
            Mat4::from_scale(Vec3::splat(2.0)),
        ];
        let matrices_at = data.len();
        data.extend_from_slice(bytemuck::cast_slice(&matrices[..]));
        let lights_at = data.len();
        data.extend_from_slice(&[2u8, 0, 3, 7, 8, 9]);

        let byte_field = |name, size, mapping, field_type, at, stride| {
            FieldData::offset_only(
                name,
                size,
                SceneMappingType::UnsignedByte,
                OffsetView::new(mapping, 1),
                field_type,
                OffsetView::new(at, stride),
                SceneFieldFlags::empty(),
            )
            .unwrap()
        };
        let fields = vec![
            byte_field(SceneField::Parent, 3, 0, SceneFieldType::Byte, 3, 1),
            byte_field(SceneField::Transformation, 2, 0, SceneFieldType::Matrix4x4, matrices_at, 64),
            byte_field(SceneField::Light, 3, lights_at, SceneFieldType::UnsignedByte, lights_at + 3, 1),
        ];
        let scene = SceneData::new(SceneMappingType::UnsignedByte, 4, data, fields).unwrap();

        let global = Mat4::from_translation(Vec3::Z);
        let out = scene.absolute_field_transformations_3d(SceneField::Light, global).unwrap();
        assert_eq!(out.len(), 3);
        // object 2 has no transformation of its own
        assert!(out[0].abs_diff_eq(global * matrices[0] * matrices[1], 1e-6));
        assert!(out[1].abs_diff_eq(global * matrices[0], 1e-6));
        assert_eq!(out[2], global);

        let mut dest = [Mat4::IDENTITY; 2];
        assert_eq!(
            scene.absolute_field_transformations_3d_into(SceneField::Light, &mut dest, global),
            Err(Error::DestinationSizeMismatch {
                what: "transformation",
                expected: 3,
                got: 2
            })
        );
        assert_eq!(
            scene.absolute_field_transformations_2d(SceneField::Light, Mat3::IDENTITY),
            Err(Error::SceneNotDimensional { expected: 2 })
        );
        assert_eq!(
            scene.absolute_field_transformations_3d(5usize, global),
            Err(Error::IndexOutOfRange { index: 5, count: 3 })
        );
    }

    #[test]
    fn test_absolute_transformations_need_dimensions() {
        let scene = parents_scene(&[(0, -1)], 1);
        assert_eq!(
            scene.absolute_field_transformations_2d(SceneField::Parent, Mat3::IDENTITY),
            Err(Error::SceneNotDimensional { expected: 2 })
        );
        assert_eq!(
            scene.absolute_field_transformations_3d(SceneField::Parent, Mat4::IDENTITY),
            Err(Error::SceneNotDimensional { expected: 3 })
        );
        assert_eq!(
            scene.absolute_field_transformations_2d(SceneField::Mesh, Mat3::from_translation(Vec2::ONE)),
            Err(Error::FieldNotFound(SceneField::Mesh))
        );
    }
}
