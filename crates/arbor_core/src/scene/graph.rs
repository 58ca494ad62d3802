//! # Scene Graph
//!
//! Local/world transforms and the parent/child hierarchy of every entity.
//!
//! Both directions of the hierarchy are plain entity handles into the same
//! dense store: a node lists its children, each child names its parent, and
//! neither owns the other. Every mutation keeps the two sides in agreement.
//!
//! ## Propagation
//!
//! Propagation is eager. Each mutator rebuilds the touched node's local
//! matrix and walks its whole subtree before returning, so world transforms
//! are never stale and reads never branch. A frequently moved node with a
//! large subtree pays O(subtree) per mutation.

use std::collections::HashSet;

use arbor_shared::constants::{
    AXIS_FORWARD, AXIS_PITCH, AXIS_RIGHT, AXIS_ROLL, AXIS_UP, AXIS_YAW,
};
use arbor_shared::math::{
    euler_degrees_from_quat, quat_from_axis_degrees, quat_from_euler_degrees, RigidTransform,
    Transform,
};
use glam::{Mat4, Quat, Vec3};
use tracing::{trace, warn};

use crate::ecs::{ComponentDataHolder, ComponentProcessor, Entity};
use crate::error::{EcsError, EcsResult};

/// Per-entity scene graph record.
#[derive(Clone, Debug)]
struct SceneNode {
    /// Derived; composition of the ancestors' locals and this local.
    world: Transform,
    /// Authored relative to the parent (or the world for roots).
    local: Transform,
    /// `local.combined` is out of date.
    local_dirty: bool,
    name: String,
    parent: Option<Entity>,
    children: Vec<Entity>,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            world: Transform::IDENTITY,
            local: Transform::IDENTITY,
            local_dirty: true,
            name: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

impl SceneNode {
    #[inline]
    fn rebuild_local(&mut self) {
        if self.local_dirty {
            self.local.rebuild_combined();
            self.local_dirty = false;
        }
    }
}

/// Owns the transform hierarchy of every transform-bearing entity.
///
/// # Example
///
/// ```rust,ignore
/// let mut graph = SceneGraphProcessor::new();
/// graph.add(parent);
/// graph.add(child);
/// graph.attach_child(parent, child);
/// graph.set_position(parent, Vec3::X);
/// assert_eq!(graph.world_position(child), Some(Vec3::X));
/// ```
#[derive(Debug, Default)]
pub struct SceneGraphProcessor {
    data: ComponentDataHolder<SceneNode>,
    /// Propagation work stack, kept to reuse its allocation.
    stack: Vec<Entity>,
}

impl SceneGraphProcessor {
    /// Creates an empty scene graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scene graph sized for `capacity` entities.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: ComponentDataHolder::with_capacity(capacity),
            stack: Vec::new(),
        }
    }

    /// Number of entities with a scene graph record.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks if no entity has a record.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entities with a record, in dense order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        self.data.holders()
    }

    // =========================================================================
    // Propagation
    // =========================================================================

    /// Recomputes `entity`'s world transform and that of its whole subtree.
    ///
    /// Each node is visited after its parent, so the parent world it reads
    /// is always the freshly computed one.
    fn propagate(&mut self, entity: Entity) {
        let mut stack = std::mem::take(&mut self.stack);
        stack.clear();
        stack.push(entity);

        while let Some(current) = stack.pop() {
            let inst = self.data.lookup(current);
            if !inst.is_valid() {
                continue;
            }

            let parent_world = self
                .data
                .instance_data(inst)
                .parent
                .and_then(|parent| self.data.get(parent))
                .map(|parent| parent.world);

            let node = self.data.instance_data_mut(inst);
            node.rebuild_local();
            node.world = match parent_world {
                Some(parent_world) => parent_world.compose(&node.local),
                None => node.local,
            };
            stack.extend_from_slice(&node.children);
        }

        self.stack = stack;
    }

    /// Applies `edit` to the local transform, marks it dirty and propagates.
    fn edit_local(&mut self, entity: Entity, op: &'static str, edit: impl FnOnce(&mut Transform)) {
        let Some(node) = self.data.get_mut(entity) else {
            warn!(%entity, op, "entity has no scene graph component");
            return;
        };
        edit(&mut node.local);
        node.local_dirty = true;
        self.propagate(entity);
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Sets the local position.
    pub fn set_position(&mut self, entity: Entity, position: Vec3) {
        self.edit_local(entity, "set_position", |t| t.position = position);
    }

    /// Sets the local per-axis scale.
    pub fn set_scale(&mut self, entity: Entity, scale: Vec3) {
        self.edit_local(entity, "set_scale", |t| t.scale = scale);
    }

    /// Sets a uniform local scale.
    pub fn set_scale_uniform(&mut self, entity: Entity, scale: f32) {
        self.set_scale(entity, Vec3::splat(scale));
    }

    /// Sets the local orientation.
    pub fn set_orientation(&mut self, entity: Entity, orientation: Quat) {
        self.edit_local(entity, "set_orientation", |t| t.orientation = orientation);
    }

    /// Sets the local orientation from Euler angles in degrees.
    pub fn set_orientation_euler(&mut self, entity: Entity, degrees: Vec3) {
        self.set_orientation(entity, quat_from_euler_degrees(degrees));
    }

    /// Offsets the local position.
    pub fn translate(&mut self, entity: Entity, offset: Vec3) {
        self.edit_local(entity, "translate", |t| t.position += offset);
    }

    /// Multiplies the local scale per axis.
    pub fn scale(&mut self, entity: Entity, factor: Vec3) {
        self.edit_local(entity, "scale", |t| t.scale *= factor);
    }

    /// Multiplies the local scale uniformly.
    pub fn scale_uniform(&mut self, entity: Entity, factor: f32) {
        self.scale(entity, Vec3::splat(factor));
    }

    /// Rotates around +Y by `degrees`.
    pub fn rotate_yaw(&mut self, entity: Entity, degrees: f32) {
        self.rotate_axis(entity, degrees, AXIS_YAW);
    }

    /// Rotates around +X by `degrees`.
    pub fn rotate_pitch(&mut self, entity: Entity, degrees: f32) {
        self.rotate_axis(entity, degrees, AXIS_PITCH);
    }

    /// Rotates around +Z by `degrees`.
    pub fn rotate_roll(&mut self, entity: Entity, degrees: f32) {
        self.rotate_axis(entity, degrees, AXIS_ROLL);
    }

    /// Rotates around `axis` by `degrees`, applied after the current
    /// orientation.
    pub fn rotate_axis(&mut self, entity: Entity, degrees: f32, axis: Vec3) {
        let q = quat_from_axis_degrees(axis, degrees);
        self.edit_local(entity, "rotate_axis", |t| t.orientation = q * t.orientation);
    }

    /// Applies a world transform computed by the physics simulation.
    ///
    /// The body carries no scale, so the entity's local scale is reused.
    /// The result becomes the new local transform, and children are
    /// re-propagated.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRoot`] if the entity has a parent,
    /// [`EcsError::ComponentMissing`] if it has no record.
    pub fn set_world_transform(&mut self, entity: Entity, body: RigidTransform) -> EcsResult<()> {
        let Some(node) = self.data.get_mut(entity) else {
            warn!(%entity, "set_world_transform: entity has no scene graph component");
            return Err(EcsError::ComponentMissing(entity));
        };
        if let Some(parent) = node.parent {
            warn!(%entity, %parent, "world transforms are only accepted for root entities");
            return Err(EcsError::NotRoot(entity));
        }

        let scale = node.local.scale;
        let world = Transform {
            combined: body.matrix() * Mat4::from_scale(scale),
            orientation: body.orientation,
            position: body.position,
            scale,
        };
        node.world = world;
        node.local = world;
        node.local_dirty = false;

        self.propagate(entity);
        Ok(())
    }

    /// Sets the entity's name.
    pub fn set_name(&mut self, entity: Entity, name: impl Into<String>) {
        match self.data.get_mut(entity) {
            Some(node) => node.name = name.into(),
            None => warn!(%entity, "set_name: entity has no scene graph component"),
        }
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    /// Checks if `ancestor` appears on `entity`'s parent chain.
    fn is_ancestor(&self, ancestor: Entity, entity: Entity) -> bool {
        let mut current = self.parent(entity);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Links `child` under `parent` without propagating.
    fn link(&mut self, parent: Entity, child: Entity) -> bool {
        if !self.data.contains(parent) || !self.data.contains(child) {
            warn!(%parent, %child, "can not attach child: both entities need a scene graph component");
            return false;
        }
        if let Some(existing) = self.parent(child) {
            warn!(%parent, %child, %existing, "can not attach child: entity already has a parent");
            return false;
        }
        // A childless entity is nobody's ancestor; skips the walk up a deep chain.
        let has_children = !self.children(child).is_empty();
        if parent == child || (has_children && self.is_ancestor(child, parent)) {
            warn!(%parent, %child, "can not attach child: hierarchy would contain a cycle");
            return false;
        }

        if let Some(node) = self.data.get_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.data.get_mut(child) {
            node.parent = Some(parent);
        }
        true
    }

    /// Makes `child` a child of `parent` and re-propagates from `parent`.
    ///
    /// Reparenting is not implicit: if `child` already has a parent this
    /// warns and does nothing.
    pub fn attach_child(&mut self, parent: Entity, child: Entity) {
        if self.link(parent, child) {
            self.propagate(parent);
        }
    }

    /// Attaches several children, propagating once.
    pub fn attach_children(&mut self, parent: Entity, children: &[Entity]) {
        let mut linked = false;
        for &child in children {
            linked |= self.link(parent, child);
        }
        if linked {
            self.propagate(parent);
        }
    }

    /// Removes `child` from `parent`'s children.
    ///
    /// The child's local transform is kept as is: it does not absorb the
    /// world transform it had under `parent`, so the child jumps to its local
    /// placement as a root unless the caller sets one explicitly.
    pub fn detach_child(&mut self, parent: Entity, child: Entity) {
        match self.parent(child) {
            None => {
                warn!(%parent, %child, "can not detach entity: entity has no parent");
                return;
            }
            Some(actual) if actual != parent => {
                warn!(%parent, %child, %actual, "can not detach entity: parent mismatch");
                return;
            }
            Some(_) => {}
        }

        if let Some(node) = self.data.get_mut(parent) {
            let found = node.children.iter().position(|&c| c == child);
            debug_assert!(found.is_some(), "child missing from its parent's children");
            if let Some(pos) = found {
                node.children.remove(pos);
            }
        }
        if let Some(node) = self.data.get_mut(child) {
            node.parent = None;
        }
        self.propagate(child);
    }

    /// Detaches every child of `entity`; each becomes a root.
    pub fn detach_all_children(&mut self, entity: Entity) {
        let Some(node) = self.data.get_mut(entity) else {
            warn!(%entity, "detach_all_children: entity has no scene graph component");
            return;
        };
        let children = std::mem::take(&mut node.children);
        for child in children {
            if let Some(node) = self.data.get_mut(child) {
                node.parent = None;
            }
            self.propagate(child);
        }
    }

    /// Cuts `entity` out of the hierarchy: its children become roots and it
    /// leaves its parent's children list. The record itself stays.
    fn unlink(&mut self, entity: Entity) {
        let Some(node) = self.data.get_mut(entity) else {
            return;
        };
        let children = std::mem::take(&mut node.children);
        let parent = node.parent.take();

        // Orphans are not handed to the grandparent.
        for child in children {
            if let Some(node) = self.data.get_mut(child) {
                node.parent = None;
            }
            self.propagate(child);
        }

        if let Some(parent) = parent {
            if let Some(node) = self.data.get_mut(parent) {
                node.children.retain(|&c| c != entity);
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Parent of `entity`, if any.
    #[inline]
    #[must_use]
    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.data.get(entity).and_then(|node| node.parent)
    }

    /// Children of `entity` in attachment order (empty if it has no record).
    #[inline]
    #[must_use]
    pub fn children(&self, entity: Entity) -> &[Entity] {
        self.data
            .get(entity)
            .map_or(&[][..], |node| node.children.as_slice())
    }

    /// Name of `entity`.
    #[must_use]
    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.data.get(entity).map(|node| node.name.as_str())
    }

    /// First root entity named `name`. Linear scan.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<Entity> {
        self.find_named(None, name)
    }

    /// First child of `parent` named `name`. Linear scan.
    #[must_use]
    pub fn get_by_name_in(&self, parent: Entity, name: &str) -> Option<Entity> {
        debug_assert!(!parent.is_null());
        self.find_named(Some(parent), name)
    }

    fn find_named(&self, parent: Option<Entity>, name: &str) -> Option<Entity> {
        if name.is_empty() {
            return None;
        }
        self.data
            .iter()
            .find(|(_, node)| node.parent == parent && node.name == name)
            .map(|(entity, _)| entity)
    }

    /// Full world transform.
    #[inline]
    #[must_use]
    pub fn world_transform(&self, entity: Entity) -> Option<Transform> {
        self.data.get(entity).map(|node| node.world)
    }

    /// World matrix, as read by the renderer.
    #[inline]
    #[must_use]
    pub fn world_transform_matrix(&self, entity: Entity) -> Option<Mat4> {
        self.data.get(entity).map(|node| node.world.combined)
    }

    /// World-space position.
    #[inline]
    #[must_use]
    pub fn world_position(&self, entity: Entity) -> Option<Vec3> {
        self.data.get(entity).map(|node| node.world.position)
    }

    /// World-space orientation.
    #[inline]
    #[must_use]
    pub fn world_orientation(&self, entity: Entity) -> Option<Quat> {
        self.data.get(entity).map(|node| node.world.orientation)
    }

    /// World-space orientation as Euler degrees.
    #[must_use]
    pub fn world_rotation(&self, entity: Entity) -> Option<Vec3> {
        self.world_orientation(entity).map(euler_degrees_from_quat)
    }

    /// Full local transform.
    #[inline]
    #[must_use]
    pub fn local_transform(&self, entity: Entity) -> Option<Transform> {
        self.data.get(entity).map(|node| node.local)
    }

    /// Local position.
    #[inline]
    #[must_use]
    pub fn local_position(&self, entity: Entity) -> Option<Vec3> {
        self.data.get(entity).map(|node| node.local.position)
    }

    /// Local scale.
    #[inline]
    #[must_use]
    pub fn local_scale(&self, entity: Entity) -> Option<Vec3> {
        self.data.get(entity).map(|node| node.local.scale)
    }

    /// Local orientation.
    #[inline]
    #[must_use]
    pub fn local_orientation(&self, entity: Entity) -> Option<Quat> {
        self.data.get(entity).map(|node| node.local.orientation)
    }

    /// Local orientation as Euler degrees.
    #[must_use]
    pub fn local_rotation(&self, entity: Entity) -> Option<Vec3> {
        self.local_orientation(entity).map(euler_degrees_from_quat)
    }

    /// World-space forward (-Z) direction.
    #[must_use]
    pub fn world_direction(&self, entity: Entity) -> Option<Vec3> {
        self.world_axis(entity, AXIS_FORWARD)
    }

    /// World-space up (+Y) direction.
    #[must_use]
    pub fn world_up(&self, entity: Entity) -> Option<Vec3> {
        self.world_axis(entity, AXIS_UP)
    }

    /// World-space right (+X) direction.
    #[must_use]
    pub fn world_right(&self, entity: Entity) -> Option<Vec3> {
        self.world_axis(entity, AXIS_RIGHT)
    }

    fn world_axis(&self, entity: Entity, axis: Vec3) -> Option<Vec3> {
        self.world_transform_matrix(entity)
            .map(|m| m.transform_vector3(axis).normalize_or_zero())
    }

    /// Fills `out` with `(entity, world matrix)` pairs in dense order.
    pub fn collect_world_matrices(&self, out: &mut Vec<(Entity, Mat4)>) {
        out.clear();
        out.extend(self.data.iter().map(|(entity, node)| (entity, node.world.combined)));
    }

    /// Fills `out` with every world matrix in dense order and returns the
    /// owning entities, parallel to `out`.
    pub fn write_world_matrices(&self, out: &mut Vec<Mat4>) -> &[Entity] {
        out.clear();
        out.extend(self.data.raw_data().iter().map(|node| node.world.combined));
        self.data.holders()
    }
}

impl ComponentProcessor for SceneGraphProcessor {
    fn has(&self, entity: Entity) -> bool {
        self.data.contains(entity)
    }

    fn add(&mut self, entity: Entity) {
        match self.data.add(entity, SceneNode::default()) {
            Ok(_) => self.propagate(entity),
            Err(err) => warn!(%entity, %err, "failed to add scene graph component"),
        }
    }

    fn remove(&mut self, entity: Entity) {
        if !self.data.contains(entity) {
            warn!(%entity, "remove: entity has no scene graph component");
            return;
        }
        self.unlink(entity);
        // Present: checked above.
        let _ = self.data.remove(entity);
    }

    // Transforms were already propagated by each mutator this frame.
    fn update(&mut self, _dt: f32) {}

    fn clean_step(&mut self, deleted: &HashSet<Entity>) {
        for &entity in deleted {
            self.unlink(entity);
        }
        let evicted = self.data.clean_step(deleted);
        trace!(evicted, "scene graph clean step");
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn graph_with(n: u32) -> (SceneGraphProcessor, Vec<Entity>) {
        let mut graph = SceneGraphProcessor::new();
        let entities: Vec<_> = (0..n).map(|i| Entity::new(i, 0)).collect();
        for &e in &entities {
            graph.add(e);
        }
        (graph, entities)
    }

    fn assert_consistent(graph: &SceneGraphProcessor) {
        for &e in graph.entities() {
            for &child in graph.children(e) {
                assert_eq!(graph.parent(child), Some(e));
            }
            if let Some(parent) = graph.parent(e) {
                assert_eq!(graph.children(parent).iter().filter(|&&c| c == e).count(), 1);
            }
        }
    }

    #[test]
    fn test_add_twice_is_noop() {
        let (mut graph, es) = graph_with(1);
        graph.set_position(es[0], Vec3::X);
        graph.add(es[0]);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.local_position(es[0]), Some(Vec3::X));
    }

    #[test]
    fn test_root_world_equals_local() {
        let (mut graph, es) = graph_with(1);
        graph.set_position(es[0], Vec3::new(1.0, 2.0, 3.0));
        graph.set_scale_uniform(es[0], 2.0);
        let world = graph.world_transform(es[0]).unwrap();
        let local = graph.local_transform(es[0]).unwrap();
        assert_eq!(world, local);
    }

    #[test]
    fn test_parent_translation_moves_child() {
        let (mut graph, es) = graph_with(2);
        let (a, b) = (es[0], es[1]);
        graph.set_position(b, Vec3::new(0.0, 5.0, 0.0));
        graph.attach_child(a, b);
        graph.set_position(a, Vec3::new(1.0, 0.0, 0.0));

        let expected = graph.local_position(b).unwrap() + Vec3::new(1.0, 0.0, 0.0);
        assert!(graph.world_position(b).unwrap().abs_diff_eq(expected, EPS));
    }

    #[test]
    fn test_parent_scale_scales_child_offset() {
        let (mut graph, es) = graph_with(2);
        let (a, b) = (es[0], es[1]);
        graph.set_scale_uniform(a, 2.0);
        graph.attach_child(a, b);
        graph.set_position(b, Vec3::new(1.0, 0.0, 0.0));

        assert!(graph
            .world_position(b)
            .unwrap()
            .abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), EPS));
        assert!(graph.world_transform(b).unwrap().scale.abs_diff_eq(Vec3::splat(2.0), EPS));
    }

    #[test]
    fn test_world_is_parent_times_local() {
        let (mut graph, es) = graph_with(3);
        graph.attach_child(es[0], es[1]);
        graph.attach_child(es[1], es[2]);
        graph.set_position(es[0], Vec3::new(1.0, 2.0, 3.0));
        graph.rotate_yaw(es[0], 90.0);
        graph.set_position(es[1], Vec3::new(0.0, 0.0, -4.0));
        graph.rotate_pitch(es[1], 30.0);
        graph.set_position(es[2], Vec3::new(2.0, 0.0, 0.0));
        graph.set_scale(es[2], Vec3::new(1.0, 3.0, 1.0));

        for &e in &es {
            let world = graph.world_transform_matrix(e).unwrap();
            let local = graph.local_transform(e).unwrap().combined;
            let expected = match graph.parent(e) {
                Some(p) => graph.world_transform_matrix(p).unwrap() * local,
                None => local,
            };
            assert!(world.abs_diff_eq(expected, EPS));
        }
    }

    #[test]
    fn test_world_orientation_composes_quaternions() {
        let (mut graph, es) = graph_with(2);
        graph.attach_child(es[0], es[1]);
        graph.rotate_yaw(es[0], 45.0);
        graph.rotate_yaw(es[1], 45.0);
        let expected = Quat::from_rotation_y(90f32.to_radians());
        assert!(graph.world_orientation(es[1]).unwrap().abs_diff_eq(expected, EPS));
    }

    #[test]
    fn test_rotations_pre_multiply() {
        let (mut graph, es) = graph_with(1);
        graph.rotate_yaw(es[0], 90.0);
        graph.rotate_pitch(es[0], 90.0);

        // Later rotations apply on the left, around the parent-space axes.
        let pitch = Quat::from_rotation_x(90f32.to_radians());
        let yaw = Quat::from_rotation_y(90f32.to_radians());
        let orientation = graph.local_orientation(es[0]).unwrap();
        assert!(orientation.abs_diff_eq(pitch * yaw, EPS));
        assert!(!orientation.abs_diff_eq(yaw * pitch, EPS));

        // Yaw turns -Z to -X, which the pitch leaves in place. The other
        // order would end up pointing at +Y.
        let direction = graph.world_direction(es[0]).unwrap();
        assert!(direction.abs_diff_eq(Vec3::NEG_X, EPS), "{direction}");
    }

    #[test]
    fn test_attach_rejects_second_parent() {
        let (mut graph, es) = graph_with(3);
        graph.attach_child(es[0], es[2]);
        graph.attach_child(es[1], es[2]);
        assert_eq!(graph.parent(es[2]), Some(es[0]));
        assert!(graph.children(es[1]).is_empty());
        assert_consistent(&graph);
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let (mut graph, es) = graph_with(3);
        graph.attach_child(es[0], es[1]);
        graph.attach_child(es[1], es[2]);
        graph.attach_child(es[2], es[0]);
        graph.attach_child(es[0], es[0]);
        assert_eq!(graph.parent(es[0]), None);
        assert_consistent(&graph);
    }

    #[test]
    fn test_detach_keeps_local_and_decouples() {
        let (mut graph, es) = graph_with(2);
        let (a, b) = (es[0], es[1]);
        graph.set_position(a, Vec3::new(10.0, 0.0, 0.0));
        graph.attach_child(a, b);
        graph.set_position(b, Vec3::new(1.0, 0.0, 0.0));

        graph.detach_child(a, b);
        assert_eq!(graph.parent(b), None);
        assert_eq!(graph.local_position(b), Some(Vec3::new(1.0, 0.0, 0.0)));
        // Local is not rebased: the child jumps to its local placement.
        let before = graph.world_transform(b).unwrap();
        assert!(before.position.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), EPS));

        graph.set_position(a, Vec3::new(-50.0, 3.0, 0.0));
        assert_eq!(graph.world_transform(b).unwrap(), before);
    }

    #[test]
    fn test_detach_non_child_is_noop() {
        let (mut graph, es) = graph_with(3);
        graph.attach_child(es[0], es[1]);
        graph.detach_child(es[2], es[1]);
        graph.detach_child(es[0], es[2]);
        assert_eq!(graph.parent(es[1]), Some(es[0]));
        assert_consistent(&graph);
    }

    #[test]
    fn test_remove_orphans_children() {
        let (mut graph, es) = graph_with(4);
        graph.attach_child(es[0], es[1]);
        graph.attach_child(es[1], es[2]);
        graph.attach_child(es[1], es[3]);
        graph.set_position(es[0], Vec3::new(5.0, 0.0, 0.0));
        graph.set_position(es[2], Vec3::new(0.0, 1.0, 0.0));

        graph.remove(es[1]);

        assert!(!graph.has(es[1]));
        assert!(graph.children(es[0]).is_empty());
        assert_eq!(graph.parent(es[2]), None);
        assert_eq!(graph.parent(es[3]), None);
        // Orphans are roots now: world == local.
        assert!(graph
            .world_position(es[2])
            .unwrap()
            .abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), EPS));
        assert_consistent(&graph);
    }

    #[test]
    fn test_set_world_transform_rejects_children() {
        let (mut graph, es) = graph_with(2);
        graph.attach_child(es[0], es[1]);
        let body = RigidTransform::new(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY);
        assert_eq!(graph.set_world_transform(es[1], body), Err(EcsError::NotRoot(es[1])));
        assert_eq!(graph.local_position(es[1]), Some(Vec3::ZERO));
    }

    #[test]
    fn test_set_world_transform_keeps_scale_and_moves_children() {
        let (mut graph, es) = graph_with(2);
        graph.set_scale_uniform(es[0], 3.0);
        graph.attach_child(es[0], es[1]);
        graph.set_position(es[1], Vec3::X);

        let body = RigidTransform::new(Vec3::new(0.0, 10.0, 0.0), Quat::IDENTITY);
        graph.set_world_transform(es[0], body).unwrap();

        assert_eq!(graph.local_scale(es[0]), Some(Vec3::splat(3.0)));
        assert_eq!(graph.local_position(es[0]), Some(Vec3::new(0.0, 10.0, 0.0)));
        assert!(graph
            .world_position(es[1])
            .unwrap()
            .abs_diff_eq(Vec3::new(3.0, 10.0, 0.0), EPS));
    }

    #[test]
    fn test_names() {
        let (mut graph, es) = graph_with(3);
        graph.set_name(es[0], "root");
        graph.set_name(es[1], "arm");
        graph.set_name(es[2], "arm");
        graph.attach_child(es[0], es[2]);

        assert_eq!(graph.get_by_name("root"), Some(es[0]));
        assert_eq!(graph.get_by_name("arm"), Some(es[1]));
        assert_eq!(graph.get_by_name_in(es[0], "arm"), Some(es[2]));
        assert_eq!(graph.get_by_name(""), None);
        assert_eq!(graph.name(es[1]), Some("arm"));
    }

    #[test]
    fn test_directions_follow_rotation() {
        let (mut graph, es) = graph_with(1);
        graph.rotate_yaw(es[0], 90.0);
        // -Z yawed +90 degrees points at -X.
        assert!(graph.world_direction(es[0]).unwrap().abs_diff_eq(Vec3::NEG_X, EPS));
        assert!(graph.world_up(es[0]).unwrap().abs_diff_eq(Vec3::Y, EPS));
        assert!(graph.world_right(es[0]).unwrap().abs_diff_eq(Vec3::NEG_Z, EPS));
    }

    #[test]
    fn test_clean_step_batch_unlinks() {
        let (mut graph, es) = graph_with(5);
        graph.attach_child(es[0], es[1]);
        graph.attach_child(es[1], es[2]);
        graph.attach_child(es[0], es[3]);
        graph.attach_child(es[3], es[4]);

        let deleted: HashSet<Entity> = [es[1], es[3]].into_iter().collect();
        graph.clean_step(&deleted);

        assert_eq!(graph.len(), 3);
        assert!(graph.children(es[0]).is_empty());
        assert_eq!(graph.parent(es[2]), None);
        assert_eq!(graph.parent(es[4]), None);
        assert_consistent(&graph);
    }

    #[test]
    fn test_write_world_matrices() {
        let (mut graph, es) = graph_with(2);
        graph.set_position(es[1], Vec3::Y);
        let mut out = Vec::new();
        let owners = graph.write_world_matrices(&mut out).to_vec();
        assert_eq!(out.len(), 2);
        let idx = owners.iter().position(|&e| e == es[1]).unwrap();
        assert!(out[idx].w_axis.truncate().abs_diff_eq(Vec3::Y, EPS));
    }
}
