//! # Scene
//!
//! The transform hierarchy every entity lives in.

mod graph;

pub use graph::SceneGraphProcessor;
