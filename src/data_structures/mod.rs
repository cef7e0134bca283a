//! Scene data: geometry, materials, textures, instances and the scene graph.
//!
//! - `geometry` builds the primitive shapes and uploads them as meshes
//! - `model` contains mesh and material definitions, GPU resources for 3D models
//! - `texture` contains GPU texture wrapper and creation utilities
//! - `instance` holds per-instance transformation data
//! - `scene_graph` enables hierarchical scene organization

pub mod geometry;
pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
