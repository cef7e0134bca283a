//! Meshes, materials and the models that pair them.
//!
//! A [`Model`] owns GPU meshes plus the materials they index into. Materials
//! follow the metal/rough "standard" model: a base colour factor, optional
//! texture maps for colour, normals, roughness, metalness, ambient occlusion,
//! alpha and displacement, and per-map UV repeat.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::{Texture, Wrap},
    lights::Color,
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
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
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 11]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: usize,
}

/// Texture slots of the standard material, in bind group order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MapSlot {
    Color,
    Normal,
    Roughness,
    Metalness,
    AmbientOcclusion,
    Alpha,
    Displacement,
}

impl MapSlot {
    pub const ALL: [MapSlot; 7] = [
        MapSlot::Color,
        MapSlot::Normal,
        MapSlot::Roughness,
        MapSlot::Metalness,
        MapSlot::AmbientOcclusion,
        MapSlot::Alpha,
        MapSlot::Displacement,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Binding of the texture view; the sampler sits right after it.
    pub fn texture_binding(self) -> u32 {
        1 + 2 * self as u32
    }

    /// Value used when the slot has no texture. Only the normal map needs
    /// something other than white, and it is gated by a flag anyway.
    pub fn fallback_rgba(self) -> [u8; 4] {
        match self {
            MapSlot::Normal => [127, 127, 255, 255],
            _ => [255, 255, 255, 255],
        }
    }
}

/// A texture referenced by a material: where to load it from and how to sample it.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureRef {
    pub path: String,
    pub repeat: [f32; 2],
    pub wrap: Wrap,
}

impl TextureRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            repeat: [1.0, 1.0],
            wrap: Wrap::ClampToEdge,
        }
    }

    /// Tile the texture `u` x `v` times with repeat wrapping.
    pub fn tiled(path: impl Into<String>, u: f32, v: f32) -> Self {
        Self {
            path: path.into(),
            repeat: [u, v],
            wrap: Wrap::Repeat,
        }
    }
}

/// CPU-side description of a standard material.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialParams {
    pub color: Color,
    pub opacity: f32,
    pub roughness: f32,
    pub metalness: f32,
    pub displacement_scale: f32,
    pub transparent: bool,
    pub maps: [Option<TextureRef>; 7],
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            opacity: 1.0,
            roughness: 1.0,
            metalness: 0.0,
            displacement_scale: 1.0,
            transparent: false,
            maps: Default::default(),
        }
    }
}

impl MaterialParams {
    pub fn coloured(color: Color) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    pub fn with_map(mut self, slot: MapSlot, texture: TextureRef) -> Self {
        self.maps[slot.index()] = Some(texture);
        self
    }

    pub fn map(&self, slot: MapSlot) -> Option<&TextureRef> {
        self.maps[slot.index()].as_ref()
    }

    pub fn to_uniform(&self) -> MaterialUniform {
        let mut repeats = [[1.0; 4]; 4];
        for slot in MapSlot::ALL {
            if let Some(texture) = self.map(slot) {
                let packed = &mut repeats[slot.index() / 2];
                let offset = (slot.index() % 2) * 2;
                packed[offset] = texture.repeat[0];
                packed[offset + 1] = texture.repeat[1];
            }
        }
        let mut flags = 0;
        if self.map(MapSlot::Normal).is_some() {
            flags |= MaterialUniform::FLAG_NORMAL_MAP;
        }
        MaterialUniform {
            color: [self.color.r, self.color.g, self.color.b, self.opacity],
            roughness: self.roughness,
            metalness: self.metalness,
            // Without a height map the displacement is meaningless
            displacement_scale: if self.map(MapSlot::Displacement).is_some() {
                self.displacement_scale
            } else {
                0.0
            },
            flags,
            repeats,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    color: [f32; 4],
    roughness: f32,
    metalness: f32,
    displacement_scale: f32,
    flags: u32,
    // Two slots per vec4 to satisfy the 16 byte array stride of uniforms
    repeats: [[f32; 4]; 4],
}

impl MaterialUniform {
    pub const FLAG_NORMAL_MAP: u32 = 1;
}

#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub params: MaterialParams,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    /// `textures` must hold one texture per [`MapSlot`], fallbacks included.
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        params: MaterialParams,
        textures: &[Texture; 7],
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} material uniform")),
            contents: bytemuck::cast_slice(&[params.to_uniform()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }];
        for slot in MapSlot::ALL {
            let texture = &textures[slot.index()];
            entries.push(wgpu::BindGroupEntry {
                binding: slot.texture_binding(),
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: slot.texture_binding() + 1,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &entries,
            label: Some(name),
        });

        Self {
            name: name.to_string(),
            params,
            uniform_buffer,
            bind_group,
        }
    }

    /// Push `params` to the GPU after they were changed in place.
    pub fn write_to_buffer(&self, queue: &wgpu::Queue) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[self.params.to_uniform()]),
        );
    }
}

#[derive(Clone, Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    /// Reorder the meshes so opaque ones come first, judged by the material
    /// each mesh uses. Returns the index of the first transparent mesh.
    pub fn sort_by_pass(&mut self) -> usize {
        let transparent: Vec<bool> = self
            .materials
            .iter()
            .map(|material| material.params.transparent)
            .collect();
        order_by_pass(&mut self.meshes, |mesh| mesh.material, &transparent)
    }
}

/// Stable partition of `meshes` into opaque then transparent ones, returning
/// the split index. A mesh whose material index is out of range is opaque.
pub fn order_by_pass<M>(
    meshes: &mut Vec<M>,
    material_of: impl Fn(&M) -> usize,
    transparent: &[bool],
) -> usize {
    let (opaque, blended): (Vec<M>, Vec<M>) = meshes
        .drain(..)
        .partition(|mesh| !transparent.get(material_of(mesh)).copied().unwrap_or(false));
    let split = opaque.len();
    meshes.extend(opaque);
    meshes.extend(blended);
    split
}

pub trait DrawModel {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &Mesh,
        material: &Material,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    );

    fn draw_model_instanced(
        &mut self,
        model: &Model,
        meshes: Range<usize>,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    );
}

impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &Mesh,
        material: &Material,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_model_instanced(
        &mut self,
        model: &Model,
        meshes: Range<usize>,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    ) {
        for mesh in model.meshes.get(meshes).unwrap_or_default() {
            let Some(material) = model.materials.get(mesh.material) else {
                log::warn!("Mesh {} references a missing material", mesh.name);
                continue;
            };
            self.draw_mesh_instanced(
                mesh,
                material,
                instances.clone(),
                camera_bind_group,
                light_bind_group,
            );
        }
    }
}
