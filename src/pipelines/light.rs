//! Light uniform on the GPU and the wireframe helpers that show where the
//! moon and the door light are.

use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        geometry::{sphere, wireframe_indices},
        instance::{Instance, InstanceRaw},
        model::Vertex,
    },
    lights::{Color, LightUniform, SceneLights},
    pipelines::basic::mk_render_pipeline,
    render::{Lines, Render},
};

#[derive(Debug)]
pub struct LightResources {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, lights: &SceneLights) -> Self {
        let uniform = LightUniform::from(lights);
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, lights: &SceneLights) {
        let uniform = LightUniform::from(lights);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Uniform Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct HelperVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex for HelperVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<HelperVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Line geometry as vertices plus `LineList` indices.
pub type HelperGeometry = (Vec<HelperVertex>, Vec<u32>);

/// Coarse wire sphere of radius 1 around a point light.
pub fn point_helper_geometry(color: Color) -> HelperGeometry {
    let wire = sphere(1.0, 4, 2);
    let vertices = wire
        .vertices
        .iter()
        .map(|v| HelperVertex {
            position: v.position,
            color: color.scaled(1.0),
        })
        .collect();
    (vertices, wireframe_indices(&wire.indices))
}

/// Square of half size 1 in the XY plane, facing +Z.
pub fn directional_helper_geometry(color: Color) -> HelperGeometry {
    let color = color.scaled(1.0);
    let corners = [[-1.0, 1.0], [1.0, 1.0], [1.0, -1.0], [-1.0, -1.0]];
    let vertices = corners
        .iter()
        .map(|[x, y]| HelperVertex {
            position: [*x, *y, 0.0],
            color,
        })
        .collect();
    (vertices, vec![0, 1, 1, 2, 2, 3, 3, 0])
}

/// Unit line along +Z, stretched to the light's target at runtime.
pub fn target_line_geometry(color: Color) -> HelperGeometry {
    let color = color.scaled(1.0);
    (
        vec![
            HelperVertex {
                position: [0.0, 0.0, 0.0],
                color,
            },
            HelperVertex {
                position: [0.0, 0.0, 1.0],
                color,
            },
        ],
        vec![0, 1],
    )
}

/// One helper on the GPU: its lines and a single instance transform.
#[derive(Debug)]
pub struct HelperMesh {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    instance: wgpu::Buffer,
    indices: u32,
}

impl HelperMesh {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        (vertices, indices): HelperGeometry,
        transform: &Instance,
    ) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Helper Vertex Buffer")),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Helper Index Buffer")),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Helper Instance Buffer")),
            contents: bytemuck::cast_slice(&[transform.to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            vertex,
            index,
            instance,
            indices: indices.len() as u32,
        }
    }

    pub fn set_transform(&self, queue: &wgpu::Queue, transform: &Instance) {
        queue.write_buffer(&self.instance, 0, bytemuck::cast_slice(&[transform.to_raw()]));
    }

    pub fn render(&self) -> Render<'_> {
        Render::Lines(Lines {
            vertex: &self.vertex,
            index: &self.index,
            instance: &self.instance,
            indices: self.indices,
            amount: 1,
        })
    }
}

/// Helpers of the moon and the door light, following the lights every frame.
#[derive(Debug)]
pub struct LightHelpers {
    door: HelperMesh,
    moon: HelperMesh,
    moon_target: HelperMesh,
}

impl LightHelpers {
    pub fn new(device: &wgpu::Device, lights: &SceneLights) -> Self {
        Self {
            door: HelperMesh::new(
                device,
                "Door light",
                point_helper_geometry(lights.door.color),
                &lights.door.helper_transform(),
            ),
            moon: HelperMesh::new(
                device,
                "Moon light",
                directional_helper_geometry(lights.moon.color),
                &lights.moon.helper_transform(),
            ),
            moon_target: HelperMesh::new(
                device,
                "Moon light target",
                target_line_geometry(lights.moon.color),
                &lights.moon.target_line_transform(),
            ),
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, lights: &SceneLights) {
        self.door.set_transform(queue, &lights.door.helper_transform());
        self.moon.set_transform(queue, &lights.moon.helper_transform());
        self.moon_target
            .set_transform(queue, &lights.moon.target_line_transform());
    }

    pub fn render(&self) -> Render<'_> {
        Render::Composed(vec![
            self.door.render(),
            self.moon.render(),
            self.moon_target.render(),
        ])
    }
}

pub fn mk_lines_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Light Helper Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Light Helper Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("light.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        config.format,
        Some(wgpu::BlendState::REPLACE),
        Some(crate::data_structures::texture::Texture::DEPTH_FORMAT),
        &[HelperVertex::desc(), InstanceRaw::desc()],
        shader,
        wgpu::PrimitiveTopology::LineList,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_helper_is_a_closed_wire_sphere() {
        let (vertices, indices) = point_helper_geometry(Color::hex(0xe67e22));
        assert_eq!(indices.len() % 2, 0);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
        for v in &vertices {
            let r = v.position.iter().map(|c| c * c).sum::<f32>().sqrt();
            assert!((r - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn directional_helper_is_a_square_outline() {
        let (vertices, indices) = directional_helper_geometry(Color::WHITE);
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices.len(), 8);
        assert!(vertices.iter().all(|v| v.position[2] == 0.0));
    }
}
