//! haunted-house
//!
//! A small wgpu scene that runs natively and in the browser: a house made of
//! textured primitives on a displaced lawn, bushes around the porch, an
//! optional ring of graves and a glTF car, lit by a blue moon light and a
//! warm door light. The camera orbits the origin, a debug panel edits the
//! lights.
//!
//! High-level modules
//! - `camera`: camera, projection and the orbit controls
//! - `config`: runtime settings read from the environment
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: geometry, materials, instances and the scene graph
//! - `flow`: flows and the event loop driving them
//! - `gui`: the lights debug panel
//! - `house`: the scene description and the flow that builds it
//! - `lights`: light parameters and their uniform
//! - `pipelines`: render pipelines (standard, transparent, helper lines, gui)
//! - `render`: render composition and the frame pass
//! - `resources`: asset loading for textures and glTF models

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod gui;
pub mod house;
pub mod lights;
pub mod pipelines;
pub mod render;
pub mod resources;

use crate::{
    config::Settings,
    flow::{FlowConstructor, GraphicsFlow},
    gui::DebugPanelFlow,
    house::{HauntedHouse, SceneState},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// The scene's flows. The panel comes last so it sees input first.
pub fn flows() -> Vec<FlowConstructor<SceneState>> {
    let house: FlowConstructor<SceneState> = Box::new(|ctx| {
        Box::pin(async move {
            let flow: Box<dyn GraphicsFlow<SceneState>> = Box::new(HauntedHouse::new(ctx).await);
            flow
        })
    });
    let panel: FlowConstructor<SceneState> = Box::new(|ctx| {
        Box::pin(async move {
            let flow: Box<dyn GraphicsFlow<SceneState>> = Box::new(DebugPanelFlow::new(&ctx));
            flow
        })
    });
    vec![house, panel]
}

pub fn run() -> anyhow::Result<()> {
    flow::init_logger();
    let settings = Settings::from_env();
    log::info!("Starting with {settings:?}");
    flow::run(settings, flows())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    run().map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
