#![cfg(feature = "integration-tests")]

mod common;

use common::{Headless, SIZE, to_rgba8};
use haunted_house::{
    data_structures::{
        geometry::Shape,
        instance::Instance,
        model::{MapSlot, Material, MaterialParams, Model},
        scene_graph::{ModelNode, SceneNode},
        texture::Texture,
    },
    gui::{DebugPanel, Viewport},
    lights::{Color, SceneLights},
    render::{Flat, Render},
};
use wgpu::util::DeviceExt;

#[tokio::test]
async fn should_render_clear_colour() {
    let gpu = Headless::new().await;
    let clear = wgpu::Color::WHITE;
    let frame = gpu.render(clear, [Render::None]).await;
    let expected = to_rgba8(clear);
    assert!(frame.pixels().all(|pixel| *pixel == expected));
}

#[tokio::test]
async fn panel_is_drawn_in_the_top_right_corner() {
    let gpu = Headless::new().await;
    let viewport = Viewport {
        width: SIZE as f32,
        height: SIZE as f32,
        scale: 0.2,
    };
    let mut panel = DebugPanel::default();
    panel.toggle(0);
    let (vertices, indices) = panel.quads(&mut SceneLights::default(), viewport);
    let vertex = gpu
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("panel vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
    let index = gpu
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("panel indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

    let clear = wgpu::Color::WHITE;
    let frame = gpu
        .render(
            clear,
            [Render::GUI(Flat {
                vertex: &vertex,
                index: &index,
                amount: indices.len(),
            })],
        )
        .await;

    let white = to_rgba8(clear);
    let corner = frame.get_pixel(SIZE - 2, 1);
    assert!(corner[0] < 128, "panel missing, found {corner:?}");
    assert_eq!(*frame.get_pixel(1, 1), white);
    assert_eq!(*frame.get_pixel(SIZE - 2, SIZE - 2), white);
}

#[tokio::test]
async fn lit_box_covers_the_centre() {
    let gpu = Headless::new().await;
    let textures = MapSlot::ALL
        .map(|slot| Texture::solid(slot.fallback_rgba(), "box", &gpu.device, &gpu.queue));
    let material = Material::new(
        &gpu.device,
        "box",
        MaterialParams::coloured(Color::WHITE),
        &textures,
        &gpu.material_layout,
    );
    let mesh = Shape::Cuboid {
        width: 2.0,
        height: 2.0,
        depth: 2.0,
    }
    .build()
    .upload(&gpu.device, "box", 0);
    let model = Model {
        meshes: vec![mesh],
        materials: vec![material],
    };
    let mut node = ModelNode::from_model("box", &gpu.device, model, vec![Instance::new()]);
    node.update_world_transform_all();
    node.write_to_buffers(&gpu.queue, &gpu.device);

    let clear = wgpu::Color::BLUE;
    let frame = gpu.render(clear, [node.get_render()]).await;

    let centre = frame.get_pixel(SIZE / 2, SIZE / 2);
    assert_ne!(*centre, to_rgba8(clear));
    assert!(centre[0] > 0, "box is unlit: {centre:?}");
    assert_eq!(*frame.get_pixel(0, 0), to_rgba8(clear));
}
