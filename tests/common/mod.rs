//! Offscreen rendering without a window.

use cgmath::EuclideanSpace;
use haunted_house::{
    camera::{Camera, CameraResources, Projection},
    context::{FOVY_DEG, Z_FAR, Z_NEAR},
    data_structures::texture::Texture,
    lights::SceneLights,
    pipelines::{Pipelines, light::LightResources},
    render::{Frame, Render, draw_frame},
    resources::texture::material_layout,
};

pub const SIZE: u32 = 64;
pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub struct Headless {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub pipelines: Pipelines,
    pub camera: CameraResources,
    pub lights: LightResources,
    pub material_layout: wgpu::BindGroupLayout,
    target: wgpu::Texture,
    depth: Texture,
}

impl Headless {
    pub async fn new() -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .expect("no adapter available for offscreen rendering");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .expect("could not open a device");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: FORMAT,
            width: SIZE,
            height: SIZE,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Opaque,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let projection = Projection::new(SIZE, SIZE, cgmath::Deg(FOVY_DEG), Z_NEAR, Z_FAR);
        let camera = CameraResources::new(&device, Camera::scene_start(), &projection);
        let lights = LightResources::new(&device, &SceneLights::default());
        let material_layout = material_layout(&device);
        let pipelines = Pipelines::new(
            &device,
            &config,
            &material_layout,
            &camera.bind_group_layout,
            &lights.bind_group_layout,
        );

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen target"),
            size: wgpu::Extent3d {
                width: SIZE,
                height: SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = Texture::create_depth_texture(&device, [SIZE, SIZE], "offscreen depth");

        Self {
            device,
            queue,
            pipelines,
            camera,
            lights,
            material_layout,
            target,
            depth,
        }
    }

    /// Draw `renders` over `clear` and read the frame back as RGBA rows.
    pub async fn render<'a>(
        &self,
        clear: wgpu::Color,
        renders: impl IntoIterator<Item = Render<'a>>,
    ) -> image::RgbaImage {
        let view = self
            .target
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        draw_frame(
            &mut encoder,
            Frame {
                color: &view,
                depth: &self.depth.view,
                clear,
            },
            &self.pipelines,
            &self.camera,
            &self.lights,
            self.camera.camera.position.to_vec(),
            renders,
        );

        // SIZE * 4 is a multiple of 256, rows need no padding
        let output = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("offscreen readback"),
            size: (SIZE * SIZE * 4) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(SIZE * 4),
                    rows_per_image: Some(SIZE),
                },
            },
            wgpu::Extent3d {
                width: SIZE,
                height: SIZE,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = output.slice(..);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).unwrap();
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .expect("device lost while rendering");
        rx.receive().await.unwrap().unwrap();

        let data = slice.get_mapped_range().to_vec();
        output.unmap();
        image::RgbaImage::from_raw(SIZE, SIZE, data).expect("readback has the frame's size")
    }
}

pub fn to_rgba8(colour: wgpu::Color) -> image::Rgba<u8> {
    let f = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    image::Rgba([f(colour.r), f(colour.g), f(colour.b), f(colour.a)])
}
