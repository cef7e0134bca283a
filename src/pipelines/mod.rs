//! Render pipelines, built once per surface format.
//!
//! - `basic`: opaque standard material and the shared pipeline builder
//! - `transparent`: alpha blended standard material
//! - `light`: light uniform, helper geometry and the line pipeline
//! - `gui`: flat coloured quads of the debug panel

pub mod basic;
pub mod gui;
pub mod light;
pub mod transparent;

#[derive(Debug)]
pub struct Pipelines {
    pub basic: wgpu::RenderPipeline,
    pub transparent: wgpu::RenderPipeline,
    pub lines: wgpu::RenderPipeline,
    pub gui: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        material_layout: &wgpu::BindGroupLayout,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self {
            basic: basic::mk_basic_pipeline(
                device,
                config,
                material_layout,
                camera_bind_group_layout,
                light_bind_group_layout,
            ),
            transparent: transparent::mk_transparent_pipeline(
                device,
                config,
                material_layout,
                camera_bind_group_layout,
                light_bind_group_layout,
            ),
            lines: light::mk_lines_pipeline(device, config, camera_bind_group_layout),
            gui: gui::mk_gui_pipeline(device, config),
        }
    }
}
