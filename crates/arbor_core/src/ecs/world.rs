//! # ECS World
//!
//! The central container for entities and the processors that hold their
//! components.
//!
//! ## Frame order
//!
//! One [`World::update`] runs, unless paused:
//!
//! 1. physics step (pushes world transforms of root bodies)
//! 2. time-driven callbacks (see [`TimeManager`])
//! 3. user processors, in registration order
//! 4. engine processors: scene graph, then tags
//!
//! and then, paused or not, the clean step sweeping entities marked with
//! [`World::destroy_deferred`].

use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use tracing::{debug, trace, warn};

use super::entity::{Entity, EntityRegistry};
use super::processor::{ComponentProcessor, PhysicsStep};
use crate::config::WorldConfig;
use crate::error::{ConfigError, EcsError, EcsResult, LoadError};
use crate::loader::{self, ComponentLoader, EntityDescription, EntityLoader};
use crate::scene::SceneGraphProcessor;
use crate::tags::TagProcessor;
use crate::time::TimeManager;

struct UserProcessor {
    type_id: TypeId,
    name: &'static str,
    processor: Box<dyn ComponentProcessor>,
}

/// The ECS World - owner of every entity, processor and callback.
///
/// Every spawned entity gets a scene graph record immediately; the rest of
/// the engine relies on it.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new();
///
/// let ship = world.spawn();
/// let turret = world.spawn();
/// world.scene_graph_mut().attach_child(ship, turret);
/// world.scene_graph_mut().set_position(ship, Vec3::X);
///
/// world.update(1.0 / 60.0);
/// ```
pub struct World {
    config: WorldConfig,
    registry: EntityRegistry,

    // =========================================================================
    // Engine processors
    // =========================================================================
    scene_graph: SceneGraphProcessor,
    tags: TagProcessor,

    /// User processors in registration order.
    user_processors: Vec<UserProcessor>,

    time: TimeManager,
    physics: Option<Box<dyn PhysicsStep>>,
    loader: EntityLoader,

    /// Entities swept at the next clean step.
    deferred: HashSet<Entity>,
    paused: bool,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let processors: Vec<_> = self.user_processors.iter().map(|p| p.name).collect();
        f.debug_struct("World")
            .field("config", &self.config)
            .field("entities", &self.registry.len())
            .field("scene_graph", &self.scene_graph.len())
            .field("user_processors", &processors)
            .field("time", &self.time)
            .field("physics", &self.physics.is_some())
            .field("deferred", &self.deferred.len())
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}

impl World {
    /// Creates a world with the default [`WorldConfig`].
    #[must_use]
    pub fn new() -> Self {
        Self::from_valid_config(WorldConfig::default())
    }

    /// Creates a world from `config`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if `config` fails
    /// [`WorldConfig::validate`].
    pub fn with_config(config: WorldConfig) -> Result<Self, ConfigError> {
        if let Err(err) = config.validate() {
            warn!(%err, "rejected world config");
            return Err(err);
        }
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: WorldConfig) -> Self {
        Self {
            registry: EntityRegistry::with_capacity(config.initial_capacity),
            scene_graph: SceneGraphProcessor::with_capacity(config.initial_capacity),
            tags: TagProcessor::new(),
            user_processors: Vec::new(),
            time: TimeManager::new(),
            physics: None,
            loader: EntityLoader::new(),
            deferred: HashSet::new(),
            paused: config.start_paused,
            config,
        }
    }

    /// Settings this world was created with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Spawns a new entity with a scene graph record at the origin.
    pub fn spawn(&mut self) -> Entity {
        let entity = self.registry.create();
        self.scene_graph.add(entity);
        entity
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn alive(&self, entity: Entity) -> bool {
        self.registry.alive(entity)
    }

    /// Number of alive entities.
    #[inline]
    #[must_use]
    pub fn entities_count(&self) -> usize {
        self.registry.len()
    }

    /// Iterates over all alive entities.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.registry.iter_alive()
    }

    /// Destroys an entity immediately.
    ///
    /// Engine processors are asked first, then user processors; each that
    /// holds data for the entity removes it through its own `remove`. The
    /// entity's children are not destroyed: they become roots.
    ///
    /// Returns `false` (and warns) if the entity is not alive.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.registry.alive(entity) {
            warn!(%entity, "failed to destroy an entity: entity is not alive");
            return false;
        }

        if self.scene_graph.has(entity) {
            self.scene_graph.remove(entity);
        }
        if self.tags.has(entity) {
            self.tags.remove(entity);
        }
        for user in &mut self.user_processors {
            if user.processor.has(entity) {
                user.processor.remove(entity);
            }
        }

        self.deferred.remove(&entity);
        self.registry.destroy(entity)
    }

    /// Destroys an entity and its whole subtree, children first.
    ///
    /// Walks the subtree with an explicit stack, so depth is bounded only
    /// by memory.
    ///
    /// Returns `false` (and warns) if the entity is not alive.
    pub fn destroy_with_children(&mut self, entity: Entity) -> bool {
        if !self.registry.alive(entity) {
            warn!(%entity, "failed to destroy an entity: entity is not alive");
            return false;
        }

        // (entity, children already pushed)
        let mut stack = vec![(entity, false)];
        let mut root_destroyed = false;
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                let destroyed = self.destroy(current);
                if current == entity {
                    root_destroyed = destroyed;
                }
                continue;
            }
            stack.push((current, true));
            // Copied out: each child's destroy edits the live list.
            let children = self.scene_graph.children(current).to_vec();
            stack.extend(children.into_iter().rev().map(|child| (child, false)));
        }
        root_destroyed
    }

    /// Marks an entity for destruction at the next clean step.
    ///
    /// The entity stays alive and fully usable until then.
    pub fn destroy_deferred(&mut self, entity: Entity) {
        if !self.registry.alive(entity) {
            warn!(%entity, "failed to mark an entity for destruction: entity is not alive");
            return;
        }
        self.deferred.insert(entity);
    }

    /// Number of entities waiting for the next clean step.
    #[must_use]
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    /// Sweeps every entity marked with [`Self::destroy_deferred`] in one
    /// batch, then drops finished time callbacks.
    ///
    /// Run automatically at the end of [`Self::update`].
    pub fn clean_step(&mut self) {
        if !self.deferred.is_empty() {
            let deleted = std::mem::take(&mut self.deferred);

            self.scene_graph.clean_step(&deleted);
            self.tags.clean_step(&deleted);
            for user in &mut self.user_processors {
                user.processor.clean_step(&deleted);
            }

            for &entity in &deleted {
                self.registry.destroy(entity);
            }
            trace!(count = deleted.len(), "deferred entities destroyed");
        }

        self.time.clean_step();
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Advances the world by `dt` seconds of real time.
    ///
    /// `dt` is clamped to `[0, max_frame_delta]`.
    pub fn update(&mut self, dt: f32) {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.config.max_frame_delta)
        } else {
            0.0
        };

        if !self.paused {
            if let Some(physics) = self.physics.as_mut() {
                physics.step(dt, &mut self.scene_graph);
            }

            TimeManager::run(self, dt);

            for user in &mut self.user_processors {
                user.processor.update(dt);
            }

            self.scene_graph.update(dt);
            self.tags.update(dt);
        }

        self.clean_step();
    }

    /// Pauses or resumes the simulation. A paused world still runs its
    /// clean step.
    pub fn pause_simulation(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Checks if the simulation is paused.
    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Installs the physics collaborator, replacing any previous one.
    pub fn set_physics(&mut self, physics: impl PhysicsStep + 'static) {
        self.physics = Some(Box::new(physics));
    }

    // =========================================================================
    // Processors
    // =========================================================================

    /// The scene graph processor.
    #[inline]
    #[must_use]
    pub fn scene_graph(&self) -> &SceneGraphProcessor {
        &self.scene_graph
    }

    /// The scene graph processor, mutably.
    #[inline]
    pub fn scene_graph_mut(&mut self) -> &mut SceneGraphProcessor {
        &mut self.scene_graph
    }

    /// The tag processor.
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &TagProcessor {
        &self.tags
    }

    /// The tag processor, mutably.
    #[inline]
    pub fn tags_mut(&mut self) -> &mut TagProcessor {
        &mut self.tags
    }

    /// Labels a live entity with `tag`.
    ///
    /// Returns `false` (and warns) if the entity is not alive, so no tag
    /// outlives its entity.
    pub fn add_tag(&mut self, entity: Entity, tag: &str) -> bool {
        if !self.registry.alive(entity) {
            warn!(%entity, tag, "can not tag entity: entity is not alive");
            return false;
        }
        self.tags.add_tag(entity, tag);
        true
    }

    /// The time manager.
    #[inline]
    #[must_use]
    pub fn time(&self) -> &TimeManager {
        &self.time
    }

    /// The time manager, mutably.
    #[inline]
    pub fn time_mut(&mut self) -> &mut TimeManager {
        &mut self.time
    }

    /// Registers a user processor.
    ///
    /// # Errors
    ///
    /// [`EcsError::ProcessorExists`] if a processor of the same type is
    /// already registered.
    pub fn add_processor<P: ComponentProcessor>(&mut self, processor: P) -> EcsResult<()> {
        let type_id = TypeId::of::<P>();
        let name = std::any::type_name::<P>();
        if self.user_processors.iter().any(|p| p.type_id == type_id) {
            warn!(processor = name, "processor already registered");
            return Err(EcsError::ProcessorExists(name));
        }

        debug!(processor = name, "user processor registered");
        self.user_processors.push(UserProcessor {
            type_id,
            name,
            processor: Box::new(processor),
        });
        Ok(())
    }

    /// The user processor of type `P`, if registered.
    #[must_use]
    pub fn processor<P: ComponentProcessor>(&self) -> Option<&P> {
        self.user_processors
            .iter()
            .find(|p| p.type_id == TypeId::of::<P>())
            .and_then(|p| p.processor.as_any().downcast_ref::<P>())
    }

    /// The user processor of type `P`, mutably.
    pub fn processor_mut<P: ComponentProcessor>(&mut self) -> Option<&mut P> {
        self.user_processors
            .iter_mut()
            .find(|p| p.type_id == TypeId::of::<P>())
            .and_then(|p| p.processor.as_any_mut().downcast_mut::<P>())
    }

    // =========================================================================
    // Declarative spawning
    // =========================================================================

    /// Registers a loader for component entries of type `name`.
    pub fn register_component_loader(
        &mut self,
        name: impl Into<String>,
        loader: impl ComponentLoader + 'static,
    ) {
        self.loader.register(name, loader);
    }

    /// Spawns the entity tree `description` describes.
    ///
    /// # Errors
    ///
    /// Returns error if a component has no data or invalid data. Nothing
    /// spawned by the call survives a failure.
    pub fn spawn_from_description(&mut self, description: &EntityDescription) -> Result<Entity, LoadError> {
        // Loaders take the world mutably.
        let loader = std::mem::take(&mut self.loader);
        let result = loader.spawn(description, self);
        self.loader = loader;
        result
    }

    /// Parses a TOML description and spawns it.
    ///
    /// # Errors
    ///
    /// Returns error if the text does not parse or the load fails.
    pub fn spawn_from_toml(&mut self, text: &str) -> Result<Entity, LoadError> {
        let description = loader::parse_description(text)?;
        self.spawn_from_description(&description)
    }

    /// Reads a TOML description file and spawns it.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or the load
    /// fails.
    pub fn spawn_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Entity, LoadError> {
        let description = loader::read_description(path)?;
        self.spawn_from_description(&description)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::ecs::ComponentDataHolder;

    #[derive(Default)]
    struct Health {
        data: ComponentDataHolder<u32>,
        updates: u32,
    }

    impl ComponentProcessor for Health {
        fn has(&self, entity: Entity) -> bool {
            self.data.contains(entity)
        }
        fn add(&mut self, entity: Entity) {
            let _ = self.data.add(entity, 100);
        }
        fn remove(&mut self, entity: Entity) {
            let _ = self.data.remove(entity);
        }
        fn update(&mut self, _dt: f32) {
            self.updates += 1;
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    #[test]
    fn test_spawn_gets_scene_graph_record() {
        let mut world = World::new();
        let e = world.spawn();
        assert!(world.alive(e));
        assert!(world.scene_graph().has(e));
        assert_eq!(world.entities_count(), 1);
    }

    #[test]
    fn test_destroy_removes_from_every_processor() {
        let mut world = World::new();
        world.add_processor(Health::default()).unwrap();
        let e = world.spawn();
        world.tags_mut().add_tag(e, "enemy");
        world.processor_mut::<Health>().unwrap().add(e);

        assert!(world.destroy(e));

        assert!(!world.alive(e));
        assert!(!world.scene_graph().has(e));
        assert!(!world.tags().has_tag(e, "enemy"));
        assert!(!world.processor::<Health>().unwrap().has(e));
        assert!(!world.destroy(e));
    }

    #[test]
    fn test_add_tag_rejects_dead_entities() {
        let mut world = World::new();
        let e = world.spawn();
        world.destroy(e);
        let recycled = world.spawn();
        assert_eq!(recycled.index(), e.index());

        assert!(!world.add_tag(e, "ghost"));
        assert!(!world.add_tag(Entity::NULL, "ghost"));
        assert_eq!(world.tags().count_by_tag("ghost"), 0);
        assert!(!world.tags().has(e));

        assert!(world.add_tag(recycled, "enemy"));
        world.destroy(recycled);
        assert_eq!(world.tags().count_by_tag("enemy"), 0);
    }

    #[test]
    fn test_duplicate_processor_rejected() {
        let mut world = World::new();
        world.add_processor(Health::default()).unwrap();
        assert!(matches!(
            world.add_processor(Health::default()),
            Err(EcsError::ProcessorExists(_))
        ));
    }

    #[test]
    fn test_plain_destroy_orphans_children() {
        let mut world = World::new();
        let parent = world.spawn();
        let child = world.spawn();
        world.scene_graph_mut().attach_child(parent, child);

        world.destroy(parent);

        assert!(world.alive(child));
        assert_eq!(world.scene_graph().parent(child), None);
    }

    #[test]
    fn test_deferred_destroy_waits_for_clean_step() {
        let mut world = World::new();
        let e = world.spawn();
        world.destroy_deferred(e);
        assert!(world.alive(e));
        assert_eq!(world.deferred_count(), 1);

        world.update(0.016);
        assert!(!world.alive(e));
        assert!(world.scene_graph().is_empty());
    }

    #[test]
    fn test_update_order_and_pause() {
        let mut world = World::new();
        world.add_processor(Health::default()).unwrap();
        world.update(0.016);
        world.pause_simulation(true);
        world.update(0.016);
        assert!(world.is_paused());
        assert_eq!(world.processor::<Health>().unwrap().updates, 1);
    }

    #[test]
    fn test_with_config_rejects_invalid_values() {
        for max_frame_delta in [0.0, -0.5, f32::NAN, f32::INFINITY] {
            let config = WorldConfig {
                max_frame_delta,
                ..WorldConfig::default()
            };
            assert!(matches!(World::with_config(config), Err(ConfigError::Invalid(_))));
        }

        let config = WorldConfig {
            initial_capacity: usize::MAX,
            ..WorldConfig::default()
        };
        assert!(matches!(World::with_config(config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_with_config_applies_settings() {
        let config = WorldConfig {
            max_frame_delta: 0.05,
            start_paused: true,
            ..WorldConfig::default()
        };
        let mut world = World::with_config(config).unwrap();
        assert!(world.is_paused());

        world.pause_simulation(false);
        world.update(1.0);
        assert!((world.time().elapsed() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_dt_is_clamped() {
        let mut world = World::new();
        world.update(5.0);
        world.update(f32::NAN);
        world.update(-1.0);
        assert!((world.time().elapsed() - 0.1).abs() < 1e-6);
    }

    struct Falling;

    impl PhysicsStep for Falling {
        fn step(&mut self, dt: f32, scene: &mut SceneGraphProcessor) {
            let roots: Vec<_> = scene
                .entities()
                .iter()
                .copied()
                .filter(|&e| scene.parent(e).is_none())
                .collect();
            for e in roots {
                let mut body = scene.world_transform(e).map(|t| {
                    arbor_shared::RigidTransform::new(t.position, t.orientation)
                });
                if let Some(body) = body.as_mut() {
                    body.position.y -= dt;
                    let _ = scene.set_world_transform(e, *body);
                }
            }
        }
    }

    #[test]
    fn test_physics_moves_roots_and_children_follow() {
        let mut world = World::new();
        world.set_physics(Falling);
        let root = world.spawn();
        let child = world.spawn();
        world.scene_graph_mut().attach_child(root, child);
        world.scene_graph_mut().set_position(child, Vec3::X);

        world.update(0.1);

        let root_pos = world.scene_graph().world_position(root).unwrap();
        let child_pos = world.scene_graph().world_position(child).unwrap();
        assert!(root_pos.abs_diff_eq(Vec3::new(0.0, -0.1, 0.0), 1e-5));
        assert!(child_pos.abs_diff_eq(Vec3::new(1.0, -0.1, 0.0), 1e-5));
    }
}
