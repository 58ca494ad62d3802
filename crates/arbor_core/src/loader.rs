//! # Entity Loader
//!
//! Builds entity trees from declarative TOML descriptions.
//!
//! ```toml
//! [[components]]
//! type = "scenegraph"
//! [components.data]
//! name = "turret"
//! position = [1.0, 0.0, 0.0]
//! rotation = [0.0, 90.0, 0.0]   # Euler degrees
//! scale = 2.0                   # or [x, y, z]
//!
//! [[components]]
//! type = "tags"
//! [components.data]
//! tags = ["enemy"]
//!
//! [[children]]
//! # nested description, same shape
//! ```
//!
//! Each component entry is handed to the [`ComponentLoader`] registered
//! under its `type`. Unknown types are skipped with a warning; an entry
//! without `data` aborts the whole load.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ecs::{Entity, World};
use crate::error::LoadError;

/// One entity and its subtree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDescription {
    /// Components, applied in order.
    #[serde(default)]
    pub components: Vec<ComponentDescription>,
    /// Child entities, attached in order.
    #[serde(default)]
    pub children: Vec<EntityDescription>,
}

/// One component entry of an [`EntityDescription`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescription {
    /// Loader name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Loader-specific payload.
    #[serde(default)]
    pub data: Option<toml::Value>,
}

/// Applies one component type's data to a freshly spawned entity.
pub trait ComponentLoader {
    /// Reads `data` and attaches the component to `entity`.
    ///
    /// # Errors
    ///
    /// Returns error if `data` does not have the expected shape; the load
    /// is aborted and the entity destroyed.
    fn load(&self, data: &toml::Value, entity: Entity, world: &mut World) -> Result<(), LoadError>;
}

/// Name → loader registry.
#[derive(Default)]
pub struct EntityLoader {
    loaders: HashMap<String, Box<dyn ComponentLoader>>,
}

impl fmt::Debug for EntityLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.loaders.keys().collect();
        names.sort_unstable();
        f.debug_struct("EntityLoader").field("loaders", &names).finish()
    }
}

impl EntityLoader {
    /// Creates a loader with the built-in `scenegraph` and `tags` loaders.
    #[must_use]
    pub fn new() -> Self {
        let mut loader = Self::default();
        loader.register("scenegraph", SceneGraphLoader);
        loader.register("tags", TagsLoader);
        loader
    }

    /// Registers `loader` under `name`. The first registration wins.
    pub fn register(&mut self, name: impl Into<String>, loader: impl ComponentLoader + 'static) {
        let name = name.into();
        if self.loaders.contains_key(&name) {
            warn!(component = %name, "component loader already registered, keeping the first one");
            return;
        }
        debug!(component = %name, "component loader registered");
        self.loaders.insert(name, Box::new(loader));
    }

    /// Checks if a loader is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.loaders.contains_key(name)
    }

    /// Spawns the entity tree `description` describes.
    ///
    /// # Errors
    ///
    /// Returns error if any component in the tree has no data or invalid
    /// data. Every entity spawned by this call is destroyed first.
    pub fn spawn(&self, description: &EntityDescription, world: &mut World) -> Result<Entity, LoadError> {
        let entity = world.spawn();
        if let Err(err) = self.populate(description, entity, world) {
            warn!(%entity, %err, "failed to load entity, destroying it");
            world.destroy_with_children(entity);
            return Err(err);
        }
        Ok(entity)
    }

    fn populate(
        &self,
        description: &EntityDescription,
        entity: Entity,
        world: &mut World,
    ) -> Result<(), LoadError> {
        for component in &description.components {
            let Some(data) = &component.data else {
                return Err(LoadError::MissingData(component.kind.clone()));
            };
            match self.loaders.get(&component.kind) {
                Some(loader) => loader.load(data, entity, world)?,
                None => warn!(%entity, component = %component.kind, "unknown component type, skipping"),
            }
        }

        for child_description in &description.children {
            let child = self.spawn(child_description, world)?;
            world.scene_graph_mut().attach_child(entity, child);
        }
        Ok(())
    }
}

fn parse_data<T: for<'de> Deserialize<'de>>(component: &str, data: &toml::Value) -> Result<T, LoadError> {
    data.clone()
        .try_into()
        .map_err(|err: toml::de::Error| LoadError::InvalidData {
            component: component.to_owned(),
            reason: err.message().to_owned(),
        })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScaleData {
    Uniform(f32),
    PerAxis([f32; 3]),
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct SceneGraphData {
    name: Option<String>,
    position: Option<[f32; 3]>,
    rotation: Option<[f32; 3]>,
    scale: Option<ScaleData>,
}

/// Built-in `scenegraph` loader: name, position, Euler rotation in degrees,
/// uniform or per-axis scale.
struct SceneGraphLoader;

impl ComponentLoader for SceneGraphLoader {
    fn load(&self, data: &toml::Value, entity: Entity, world: &mut World) -> Result<(), LoadError> {
        let data: SceneGraphData = parse_data("scenegraph", data)?;
        let graph = world.scene_graph_mut();

        if let Some(name) = data.name {
            graph.set_name(entity, name);
        }
        if let Some(position) = data.position {
            graph.set_position(entity, Vec3::from_array(position));
        }
        if let Some(rotation) = data.rotation {
            graph.set_orientation_euler(entity, Vec3::from_array(rotation));
        }
        match data.scale {
            Some(ScaleData::Uniform(s)) => graph.set_scale_uniform(entity, s),
            Some(ScaleData::PerAxis(s)) => graph.set_scale(entity, Vec3::from_array(s)),
            None => {}
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TagsData {
    tags: Vec<String>,
}

/// Built-in `tags` loader.
struct TagsLoader;

impl ComponentLoader for TagsLoader {
    fn load(&self, data: &toml::Value, entity: Entity, world: &mut World) -> Result<(), LoadError> {
        let data: TagsData = parse_data("tags", data)?;
        for tag in &data.tags {
            world.add_tag(entity, tag);
        }
        Ok(())
    }
}

/// Parses a description from TOML text.
///
/// # Errors
///
/// Returns error if the text is not valid TOML or does not match the
/// description schema.
pub fn parse_description(text: &str) -> Result<EntityDescription, LoadError> {
    Ok(toml::from_str(text)?)
}

/// Reads and parses a description file.
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed.
pub fn read_description<P: AsRef<Path>>(path: P) -> Result<EntityDescription, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_description(&text)
}
