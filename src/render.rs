//! Render composition and pipeline batching.
//!
//! Flows describe what they want drawn with a [`Render`] tree. The render loop
//! flattens the trees of all flows into [`Batches`], one per pipeline, and
//! draws them in a fixed order: opaque meshes, transparent meshes (back to
//! front), light helper lines, then the debug panel.
//!
//! # Key types
//!
//! - [`Render<'a>`] is the primary enum describing render operations
//! - [`Instanced<'a>`] contains data for instanced rendering (model + instance buffer)
//! - [`Lines<'a>`] contains instanced line geometry for helpers
//! - [`Flat<'a>`] contains data for flat (2D / GUI) rendering (vertex + index buffers)

use std::ops::Range;

use cgmath::{InnerSpace, Vector3};

use crate::{
    camera::CameraResources,
    data_structures::{
        model::{DrawModel, Model},
        scene_graph::SceneNode,
    },
    pipelines::{Pipelines, light::LightResources},
};

/// Data for instanced object rendering: a model and its instance buffer.
///
/// Only the model's meshes in `meshes` are drawn. `origin` is the world
/// position used to order transparent objects.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub meshes: Range<usize>,
    pub amount: usize,
    pub origin: Vector3<f32>,
}

/// Line-list geometry drawn with its own instance buffer and vertex colours.
pub struct Lines<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub index: &'a wgpu::Buffer,
    pub instance: &'a wgpu::Buffer,
    pub indices: u32,
    pub amount: usize,
}

/// Screen-space coloured triangles with `u16` indices.
pub struct Flat<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub index: &'a wgpu::Buffer,
    pub amount: usize,
}

/// Specifies how a flow's objects should be rendered.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders a single opaque instanced object
/// - `Transparent(Instanced)` renders a single alpha blended instanced object
/// - `Lines(Lines)` renders helper wireframes
/// - `GUI(Flat)` renders 2D elements on top of everything
/// - `Composed(Vec<Render>)` recursively renders composition of multiple renders
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Transparent(Instanced<'a>),
    Lines(Lines<'a>),
    GUI(Flat<'a>),
    Composed(Vec<Render<'a>>),
}

/// Everything to draw this frame, grouped by pipeline.
pub(crate) struct Batches<'a> {
    pub basics: Vec<Instanced<'a>>,
    pub trans: Vec<Instanced<'a>>,
    pub lines: Vec<Lines<'a>>,
    pub guis: Vec<Flat<'a>>,
}

impl<'a> Batches<'a> {
    pub fn new() -> Self {
        Self {
            basics: Vec::new(),
            trans: Vec::new(),
            lines: Vec::new(),
            guis: Vec::new(),
        }
    }
}

impl<'a> Render<'a> {
    pub(crate) fn set_pipelines(self, batches: &mut Batches<'a>) {
        match self {
            Render::Default(instanced) => batches.basics.push(instanced),
            Render::Transparent(instanced) => batches.trans.push(instanced),
            Render::Lines(lines) => batches.lines.push(lines),
            Render::GUI(flat) => batches.guis.push(flat),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(batches)),
            Render::None => (),
        }
    }
}

impl<'a> From<&'a dyn SceneNode> for Render<'a> {
    fn from(sn: &'a dyn SceneNode) -> Self {
        sn.get_render()
    }
}

/// Attachments of one frame.
pub struct Frame<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
    pub clear: wgpu::Color,
}

/// Record one render pass drawing `renders` into `frame`.
///
/// `eye` is the camera position in world space, transparent objects are
/// drawn from the farthest to the nearest one.
pub fn draw_frame<'a>(
    encoder: &mut wgpu::CommandEncoder,
    frame: Frame<'_>,
    pipelines: &Pipelines,
    camera: &CameraResources,
    lights: &LightResources,
    eye: Vector3<f32>,
    renders: impl IntoIterator<Item = Render<'a>>,
) {
    let mut batches = Batches::new();
    renders
        .into_iter()
        .for_each(|render| render.set_pipelines(&mut batches));
    sort_back_to_front(&mut batches.trans, eye, |instanced| instanced.origin);

    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Render Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: frame.color,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(frame.clear),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: frame.depth,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        occlusion_query_set: None,
        timestamp_writes: None,
    });

    for (pipeline, batch) in [
        (&pipelines.basic, &batches.basics),
        (&pipelines.transparent, &batches.trans),
    ] {
        render_pass.set_pipeline(pipeline);
        for instanced in batch {
            if instanced.amount == 0 || instanced.instance.size() == 0 {
                log::warn!("you attempted to render something with zero instances");
                continue;
            }
            render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
            render_pass.draw_model_instanced(
                instanced.model,
                instanced.meshes.clone(),
                0..instanced.amount as u32,
                &camera.bind_group,
                &lights.bind_group,
            );
        }
    }

    render_pass.set_pipeline(&pipelines.lines);
    render_pass.set_bind_group(0, &camera.bind_group, &[]);
    for lines in &batches.lines {
        render_pass.set_vertex_buffer(0, lines.vertex.slice(..));
        render_pass.set_vertex_buffer(1, lines.instance.slice(..));
        render_pass.set_index_buffer(lines.index.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..lines.indices, 0, 0..lines.amount as u32);
    }

    render_pass.set_pipeline(&pipelines.gui);
    for flat in &batches.guis {
        if flat.amount == 0 {
            continue;
        }
        render_pass.set_vertex_buffer(0, flat.vertex.slice(..));
        render_pass.set_index_buffer(flat.index.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..flat.amount as u32, 0, 0..1);
    }
}

/// Order `items` so the one farthest from `eye` comes first.
pub fn sort_back_to_front<T>(
    items: &mut [T],
    eye: Vector3<f32>,
    origin: impl Fn(&T) -> Vector3<f32>,
) {
    items.sort_by(|a, b| {
        let da = (origin(a) - eye).magnitude2();
        let db = (origin(b) - eye).magnitude2();
        db.total_cmp(&da)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn farthest_first() {
        let eye = Vector3::new(5.0, 5.0, 5.0);
        // ground at the origin, door in front of the house
        let mut origins = vec![
            Vector3::new(0.0, 0.9, 2.01),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(4.0, 4.0, 4.0),
        ];
        sort_back_to_front(&mut origins, eye, |o| *o);
        assert_eq!(origins[0], Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(origins[2], Vector3::new(4.0, 4.0, 4.0));
    }

    #[test]
    fn nan_origins_do_not_panic() {
        let mut origins = vec![Vector3::new(f32::NAN, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)];
        sort_back_to_front(&mut origins, Vector3::new(0.0, 0.0, 0.0), |o| *o);
        assert_eq!(origins.len(), 2);
    }
}
