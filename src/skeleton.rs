use bevy::prelude::Resource;
use derive_more::Display;

use crate::{
    error::{ConvolutionError, Result},
    field::{GridSpec, ScalarField, accumulate},
    kernel::Kernel,
    types::{Point, Value},
};

/// Smallest half-size of the box used by [`Skeleton::bone_at`].
const MIN_PICK_TOLERANCE: Value = 2.0;

/// Stable index of a bone inside a [`Skeleton`].
///
/// Ids are never reused or shifted: removing a bone leaves an empty slot behind.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("bone {_0}")]
pub struct BoneId(pub usize);

/// A weighted point primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bone {
    pub position: Point,
    /// Always `>= 0`.
    pub radius: Value,
}

impl Bone {
    pub fn new(position: Point, radius: Value) -> Self {
        Self {
            position,
            radius: radius.max(0.0),
        }
    }
}

/// Skeleton edge between two bones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment(pub BoneId, pub BoneId);

impl Segment {
    pub fn contains(&self, id: BoneId) -> bool {
        self.0 == id || self.1 == id
    }
}

/// Skeleton face between three bones. Part of the topology only; it does not
/// contribute to the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triangle(pub BoneId, pub BoneId, pub BoneId);

impl Triangle {
    pub fn contains(&self, id: BoneId) -> bool {
        self.0 == id || self.1 == id || self.2 == id
    }
}

/// The bones of a convolution surface and the segments and triangles connecting them.
///
/// Bones live in slots addressed by [`BoneId`]. Removing a bone empties its slot
/// and drops every segment and triangle that referenced it, so the remaining
/// topology only ever refers to live bones.
///
/// ```rust,ignore
/// let mut skeleton = Skeleton::default();
/// let a = skeleton.add_bone(Point::new(40., 75.));
/// let b = skeleton.add_bone(Point::new(110., 75.));
/// skeleton.add_segment(a, b)?;
///
/// let field = skeleton.field(GridSpec::default(), &Kernel::default())?;
/// ```
#[derive(Resource, Debug, Clone)]
pub struct Skeleton {
    /// Radius given to bones created by [`add_bone`](Skeleton::add_bone).
    pub default_radius: Value,
    bones: Vec<Option<Bone>>,
    segments: Vec<Segment>,
    triangles: Vec<Triangle>,
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl Skeleton {
    /// Creates an empty skeleton.
    pub fn new(default_radius: Value) -> Self {
        Self {
            default_radius: default_radius.max(0.0),
            bones: Vec::new(),
            segments: Vec::new(),
            triangles: Vec::new(),
        }
    }

    /// Adds a bone with the [`default_radius`](Skeleton::default_radius).
    pub fn add_bone(&mut self, position: Point) -> BoneId {
        self.add_bone_with_radius(position, self.default_radius)
    }

    /// Adds a bone with the given radius, clamped at `0`.
    pub fn add_bone_with_radius(&mut self, position: Point, radius: Value) -> BoneId {
        self.bones.push(Some(Bone::new(position, radius)));
        BoneId(self.bones.len() - 1)
    }

    /// Returns the bone in slot `id`, or `None` if it was removed or never existed.
    pub fn bone(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(id.0).and_then(Option::as_ref)
    }

    fn bone_mut(&mut self, id: BoneId) -> Result<&mut Bone> {
        self.bones
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(ConvolutionError::MissingBone(id))
    }

    /// Iterates over the live bones.
    pub fn bones(&self) -> impl Iterator<Item = (BoneId, &Bone)> {
        self.bones
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|bone| (BoneId(i), bone)))
    }

    /// All bone slots, including the empty slots of removed bones.
    pub fn slots(&self) -> &[Option<Bone>] {
        &self.bones
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Number of live bones.
    pub fn len(&self) -> usize {
        self.bones.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moves bone `id` to `position`.
    pub fn move_bone(&mut self, id: BoneId, position: Point) -> Result<()> {
        self.bone_mut(id)?.position = position;
        Ok(())
    }

    /// Sets the radius of bone `id`, clamped at `0`.
    pub fn set_radius(&mut self, id: BoneId, radius: Value) -> Result<()> {
        self.bone_mut(id)?.radius = radius.max(0.0);
        Ok(())
    }

    /// Grows (or shrinks, for negative `delta`) the radius of bone `id`.
    ///
    /// The radius never drops below `0`. Returns the new radius.
    pub fn adjust_radius(&mut self, id: BoneId, delta: Value) -> Result<Value> {
        let bone = self.bone_mut(id)?;
        bone.radius = (bone.radius + delta).max(0.0);
        Ok(bone.radius)
    }

    /// Removes bone `id` together with every segment and triangle that uses it.
    pub fn remove_bone(&mut self, id: BoneId) -> Result<Bone> {
        let bone = self
            .bones
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(ConvolutionError::MissingBone(id))?;

        self.segments.retain(|s| !s.contains(id));
        self.triangles.retain(|t| !t.contains(id));

        Ok(bone)
    }

    fn check_live(&self, ids: &[BoneId]) -> Result<()> {
        for (n, &id) in ids.iter().enumerate() {
            if self.bone(id).is_none() {
                return Err(ConvolutionError::MissingBone(id));
            }
            if ids[..n].contains(&id) {
                return Err(ConvolutionError::DuplicateBone(id));
            }
        }
        Ok(())
    }

    /// Connects two distinct live bones with a segment.
    pub fn add_segment(&mut self, a: BoneId, b: BoneId) -> Result<()> {
        self.check_live(&[a, b])?;
        self.segments.push(Segment(a, b));
        Ok(())
    }

    /// Connects three distinct live bones with a triangle.
    pub fn add_triangle(&mut self, a: BoneId, b: BoneId, c: BoneId) -> Result<()> {
        self.check_live(&[a, b, c])?;
        self.triangles.push(Triangle(a, b, c));
        Ok(())
    }

    /// Returns the first live bone whose pick box contains `point`.
    ///
    /// The box is centred on the bone with a half-size of its radius, but never
    /// smaller than two units so that tiny bones stay reachable.
    pub fn bone_at(&self, point: Point) -> Option<BoneId> {
        self.bones()
            .find(|(_, bone)| {
                let tolerance = bone.radius.max(MIN_PICK_TOLERANCE);
                (point.x - bone.position.x).abs() <= tolerance
                    && (point.y - bone.position.y).abs() <= tolerance
            })
            .map(|(id, _)| id)
    }

    /// Iterates over the segments as pairs of bones.
    ///
    /// Segments whose bones are missing are skipped.
    pub fn resolved_segments(&self) -> impl Iterator<Item = (Bone, Bone)> + '_ {
        resolve_segments(&self.bones, &self.segments)
    }

    /// Samples the convolution field of this skeleton on `grid`.
    pub fn field(&self, grid: GridSpec, kernel: &Kernel) -> Result<ScalarField> {
        accumulate(&self.bones, &self.segments, grid, kernel)
    }
}

/// Looks up the bones of each segment, skipping segments that reference an
/// empty or out-of-range slot.
pub fn resolve_segments<'a>(
    bones: &'a [Option<Bone>],
    segments: &'a [Segment],
) -> impl Iterator<Item = (Bone, Bone)> + 'a {
    segments.iter().filter_map(move |&Segment(a, b)| {
        let bone_a = bones.get(a.0).copied().flatten()?;
        let bone_b = bones.get(b.0).copied().flatten()?;
        Some((bone_a, bone_b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (Skeleton, [BoneId; 3]) {
        let mut skeleton = Skeleton::default();
        let a = skeleton.add_bone(Point::new(10.0, 10.0));
        let b = skeleton.add_bone(Point::new(50.0, 10.0));
        let c = skeleton.add_bone(Point::new(30.0, 40.0));
        skeleton.add_segment(a, b).unwrap();
        skeleton.add_segment(b, c).unwrap();
        skeleton.add_triangle(a, b, c).unwrap();
        (skeleton, [a, b, c])
    }

    #[test]
    fn new_bones_use_default_radius() {
        let mut skeleton = Skeleton::new(7.0);
        let id = skeleton.add_bone(Point::new(1.0, 2.0));
        assert_eq!(skeleton.bone(id).unwrap().radius, 7.0);
    }

    #[test]
    fn removing_a_bone_cascades_and_keeps_ids_stable() {
        let (mut skeleton, [a, b, c]) = chain();

        skeleton.remove_bone(a).unwrap();

        assert!(skeleton.bone(a).is_none());
        assert_eq!(skeleton.bone(c).unwrap().position, Point::new(30.0, 40.0));
        assert_eq!(skeleton.segments(), &[Segment(b, c)]);
        assert!(skeleton.triangles().is_empty());
        assert_eq!(skeleton.len(), 2);
        assert_eq!(skeleton.slots().len(), 3);

        let d = skeleton.add_bone(Point::new(0.0, 0.0));
        assert_eq!(d, BoneId(3));
    }

    #[test]
    fn removed_bones_cannot_be_removed_or_linked_again() {
        let (mut skeleton, [a, b, _]) = chain();
        skeleton.remove_bone(a).unwrap();

        assert!(matches!(skeleton.remove_bone(a), Err(ConvolutionError::MissingBone(id)) if id == a));
        assert!(matches!(skeleton.add_segment(a, b), Err(ConvolutionError::MissingBone(_))));
        assert!(matches!(skeleton.move_bone(a, Point::origin()), Err(ConvolutionError::MissingBone(_))));
    }

    #[test]
    fn primitives_need_distinct_bones() {
        let (mut skeleton, [a, b, _]) = chain();
        assert!(matches!(skeleton.add_segment(a, a), Err(ConvolutionError::DuplicateBone(id)) if id == a));
        assert!(matches!(skeleton.add_triangle(a, b, b), Err(ConvolutionError::DuplicateBone(id)) if id == b));
    }

    #[test]
    fn radius_is_clamped_at_zero() {
        let (mut skeleton, [a, ..]) = chain();
        assert_eq!(skeleton.adjust_radius(a, 1.0).unwrap(), 6.0);
        assert_eq!(skeleton.adjust_radius(a, -10.0).unwrap(), 0.0);
        skeleton.set_radius(a, -3.0).unwrap();
        assert_eq!(skeleton.bone(a).unwrap().radius, 0.0);
        assert_eq!(Bone::new(Point::origin(), -1.0).radius, 0.0);
    }

    #[test]
    fn bone_at_uses_radius_box_with_minimum_tolerance() {
        let mut skeleton = Skeleton::default();
        let big = skeleton.add_bone(Point::new(20.0, 20.0));
        let tiny = skeleton.add_bone_with_radius(Point::new(60.0, 60.0), 0.5);

        assert_eq!(skeleton.bone_at(Point::new(24.0, 16.0)), Some(big));
        assert_eq!(skeleton.bone_at(Point::new(26.0, 20.0)), None);
        assert_eq!(skeleton.bone_at(Point::new(61.5, 58.5)), Some(tiny));

        skeleton.remove_bone(big).unwrap();
        assert_eq!(skeleton.bone_at(Point::new(20.0, 20.0)), None);
    }

    #[test]
    fn dangling_segments_are_skipped_when_resolving() {
        let bones = vec![Some(Bone::new(Point::new(0.0, 0.0), 1.0)), None];
        let segments = vec![Segment(BoneId(0), BoneId(1)), Segment(BoneId(0), BoneId(7))];
        assert_eq!(resolve_segments(&bones, &segments).count(), 0);

        let (skeleton, _) = chain();
        assert_eq!(skeleton.resolved_segments().count(), 2);
    }
}
