//! GPU and window context shared by all flows.
//!
//! [`Context`] owns the surface, device and queue together with the camera,
//! the light uniform and every render pipeline. Flows only get read access
//! after `on_init`; while they are being constructed they receive an
//! [`InitContext`] with what they need to load assets.

use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources, Projection},
    config::{Settings, drawing_buffer_size},
    data_structures::texture,
    lights::SceneLights,
    pipelines::{Pipelines, light::LightResources},
    resources::{Assets, texture::material_layout},
};

pub const FOVY_DEG: f32 = 50.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 1000.0;

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub lights: LightResources,
    pub pipelines: Pipelines,
    pub material_layout: wgpu::BindGroupLayout,
    pub clear_colour: wgpu::Color,
    pub settings: Settings,
}

impl Context {
    pub async fn new(window: Arc<Window>, settings: Settings) -> anyhow::Result<Self> {
        let size = drawing_buffer_size(
            window.inner_size(),
            window.scale_factor(),
            settings.max_pixel_ratio,
        );

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("could not create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable graphics adapter")?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("could not open the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Colours are written unconverted, so a linear surface keeps them as authored
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface supports no texture format")?;
        let alpha_mode = if surface_caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::Opaque)
        {
            wgpu::CompositeAlphaMode::Opaque
        } else {
            surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto)
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera = Camera::scene_start();
        let projection = Projection::new(
            config.width,
            config.height,
            cgmath::Deg(FOVY_DEG),
            Z_NEAR,
            Z_FAR,
        );
        let camera = CameraResources::new(&device, camera, &projection);

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let lights = LightResources::new(&device, &SceneLights::default());
        let material_layout = material_layout(&device);
        let pipelines = Pipelines::new(
            &device,
            &config,
            &material_layout,
            &camera.bind_group_layout,
            &lights.bind_group_layout,
        );

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            lights,
            pipelines,
            material_layout,
            clear_colour: wgpu::Color::BLACK,
            settings,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Height of the viewport in physical pixels, used to scale pointer drags.
    pub fn viewport_height(&self) -> f32 {
        self.window.inner_size().height as f32
    }

    /// Reconfigure the surface for the current window size. Zero sized
    /// windows (minimised) are ignored and `false` is returned.
    pub fn resize(&mut self) -> bool {
        let size = drawing_buffer_size(
            self.window.inner_size(),
            self.window.scale_factor(),
            self.settings.max_pixel_ratio,
        );
        if size.width == 0 || size.height == 0 {
            return false;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.projection.resize(size.width, size.height);
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = texture::Texture::create_depth_texture(
            &self.device,
            [size.width, size.height],
            "depth_texture",
        );
        true
    }
}

/// What a flow may use while it is being constructed.
///
/// Device and queue are internally reference counted, cloning them is cheap.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub material_layout: wgpu::BindGroupLayout,
    pub settings: Settings,
    pub assets: Assets,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            material_layout: ctx.material_layout.clone(),
            settings: ctx.settings.clone(),
            assets: Assets::new(ctx.settings.asset_root.clone()),
        }
    }
}
