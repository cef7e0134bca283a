//! glTF 2.0 loading into the scene graph.
//!
//! Buffers and images referenced by URI are resolved next to the `.gltf`
//! file. Materials are mapped onto the standard material: the base colour
//! texture fills the colour slot, the metallic-roughness texture fills both
//! the roughness (green channel) and metalness (blue channel) slots and the
//! occlusion texture the AO slot (red channel).

use anyhow::{Context, bail};
use futures::future::join_all;
use gltf::{Gltf, image::Source};

use crate::{
    data_structures::{
        geometry::Geometry,
        instance::Instance,
        model::{MapSlot, Material, MaterialParams, Mesh, Model, ModelVertex, TextureRef},
        scene_graph::{ContainerNode, ModelNode, SceneNode},
        texture::{Texture, Wrap},
    },
    lights::Color,
    resources::{Assets, extension, sibling},
};

/// Encoded image plus an optional decoder hint.
struct ImageData {
    bytes: Vec<u8>,
    format: Option<String>,
}

pub async fn load_model_gltf(
    assets: &Assets,
    path: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<Box<dyn SceneNode>> {
    let data = assets.load_binary(path).await?;
    let gltf = Gltf::from_slice(&data).with_context(|| format!("could not parse {path}"))?;

    let buffers = load_buffers(assets, path, &gltf).await?;
    let images = load_images(assets, path, &gltf, &buffers).await;

    let mut materials: Vec<Material> = gltf
        .materials()
        .map(|material| load_material(path, &material, &images, device, queue, layout))
        .collect();
    // Primitives without a material use this one
    let default_material = materials.len();
    let textures = MapSlot::ALL
        .map(|slot| Texture::solid(slot.fallback_rgba(), "default material", device, queue));
    materials.push(Material::new(
        device,
        &format!("{path} default"),
        MaterialParams::default(),
        &textures,
        layout,
    ));

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .with_context(|| format!("{path} contains no scene"))?;
    let mut root = ContainerNode::new(path);
    for node in scene.nodes() {
        root.add_child(to_scene_node(
            node,
            &buffers,
            &materials,
            default_material,
            device,
        ));
    }
    Ok(Box::new(root))
}

async fn load_buffers(assets: &Assets, path: &str, gltf: &Gltf) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf
                .blob
                .clone()
                .with_context(|| format!("{path} references a missing binary chunk"))?,
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                bail!("{path}: embedded data URIs are not supported")
            }
            gltf::buffer::Source::Uri(uri) => assets.load_binary(&sibling(path, uri)).await?,
        };
        if data.len() < buffer.length() {
            bail!(
                "buffer {} of {path} holds {} bytes, {} expected",
                buffer.index(),
                data.len(),
                buffer.length()
            );
        }
        buffers.push(data);
    }
    Ok(buffers)
}

/// Images that cannot be read are `None`; materials fall back to neutral textures.
async fn load_images(
    assets: &Assets,
    path: &str,
    gltf: &Gltf,
    buffers: &[Vec<u8>],
) -> Vec<Option<ImageData>> {
    let loads = gltf.images().map(|image| async move {
        match image.source() {
            Source::View { view, mime_type } => {
                let start = view.offset();
                let end = start + view.length();
                let bytes = buffers
                    .get(view.buffer().index())
                    .and_then(|buffer| buffer.get(start..end));
                match bytes {
                    Some(bytes) => Some(ImageData {
                        bytes: bytes.to_vec(),
                        format: mime_type.rsplit('/').next().map(str::to_string),
                    }),
                    None => {
                        log::warn!("Image {} of {path} lies outside its buffer", image.index());
                        None
                    }
                }
            }
            Source::Uri { uri, mime_type } => {
                let location = sibling(path, uri);
                match assets.load_binary(&location).await {
                    Ok(bytes) => Some(ImageData {
                        bytes,
                        format: mime_type
                            .and_then(|mime| mime.rsplit('/').next())
                            .map(str::to_string)
                            .or_else(|| extension(&location)),
                    }),
                    Err(e) => {
                        log::warn!("Image {location} of {path} could not be loaded: {e:#}");
                        None
                    }
                }
            }
        }
    });
    join_all(loads).await
}

fn wrap_of(texture: &gltf::Texture) -> Wrap {
    match texture.sampler().wrap_s() {
        gltf::texture::WrappingMode::ClampToEdge => Wrap::ClampToEdge,
        _ => Wrap::Repeat,
    }
}

fn load_material(
    path: &str,
    material: &gltf::Material,
    images: &[Option<ImageData>],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> Material {
    let name = format!(
        "{path}#{}",
        material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| material.index().unwrap_or_default().to_string())
    );
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();
    let mut params = MaterialParams {
        color: Color::rgb(r, g, b),
        opacity: a,
        roughness: pbr.roughness_factor(),
        metalness: pbr.metallic_factor(),
        transparent: material.alpha_mode() == gltf::material::AlphaMode::Blend,
        ..Default::default()
    };

    let mut sources: [Option<gltf::Texture>; 7] = Default::default();
    sources[MapSlot::Color.index()] = pbr.base_color_texture().map(|info| info.texture());
    sources[MapSlot::Normal.index()] = material.normal_texture().map(|info| info.texture());
    let metallic_roughness = pbr.metallic_roughness_texture().map(|info| info.texture());
    sources[MapSlot::Roughness.index()] = metallic_roughness.clone();
    sources[MapSlot::Metalness.index()] = metallic_roughness;
    sources[MapSlot::AmbientOcclusion.index()] =
        material.occlusion_texture().map(|info| info.texture());

    let textures = MapSlot::ALL.map(|slot| {
        let fallback = || Texture::solid(slot.fallback_rgba(), &name, device, queue);
        let Some(texture) = &sources[slot.index()] else {
            return fallback();
        };
        let Some(image) = images.get(texture.source().index()).and_then(Option::as_ref) else {
            return fallback();
        };
        let label = format!("{name} {slot:?}");
        let wrap = wrap_of(texture);
        match Texture::from_bytes(device, queue, &image.bytes, &label, image.format.as_deref(), wrap) {
            Ok(loaded) => {
                params.maps[slot.index()] = Some(TextureRef {
                    path: label,
                    repeat: [1.0, 1.0],
                    wrap,
                });
                loaded
            }
            Err(e) => {
                log::warn!("{e:#}");
                fallback()
            }
        }
    });

    Material::new(device, &name, params, &textures, layout)
}

fn read_primitive(
    primitive: &gltf::Primitive,
    buffers: &[Vec<u8>],
) -> Option<Geometry> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!("Skipping primitive {} with mode {:?}", primitive.index(), primitive.mode());
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let mut vertices: Vec<ModelVertex> = reader
        .read_positions()?
        .map(|position| ModelVertex {
            position,
            normal: [0.0, 1.0, 0.0],
            ..Default::default()
        })
        .collect();
    if let Some(normals) = reader.read_normals() {
        for (vertex, normal) in vertices.iter_mut().zip(normals) {
            vertex.normal = normal;
        }
    }
    if let Some(tex_coords) = reader.read_tex_coords(0) {
        for (vertex, uv) in vertices.iter_mut().zip(tex_coords.into_f32()) {
            vertex.tex_coords = uv;
        }
    }
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    if indices.iter().any(|&i| i as usize >= vertices.len()) {
        log::warn!("Skipping primitive {} with out of range indices", primitive.index());
        return None;
    }

    let mut geometry = Geometry { vertices, indices };
    match reader.read_tangents() {
        Some(tangents) => {
            // w holds the handedness of the bitangent
            for (vertex, [x, y, z, w]) in geometry.vertices.iter_mut().zip(tangents) {
                let tangent = cgmath::Vector3::new(x, y, z);
                let normal = cgmath::Vector3::from(vertex.normal);
                vertex.tangent = tangent.into();
                vertex.bitangent = (normal.cross(tangent) * w).into();
            }
        }
        None => geometry.compute_tangents(),
    }
    Some(geometry)
}

fn to_scene_node(
    node: gltf::Node,
    buffers: &[Vec<u8>],
    materials: &[Material],
    default_material: usize,
    device: &wgpu::Device,
) -> Box<dyn SceneNode> {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node {}", node.index()));
    let (translation, [x, y, z, w], scale) = node.transform().decomposed();
    let local = Instance {
        position: translation.into(),
        rotation: cgmath::Quaternion::new(w, x, y, z),
        scale: scale.into(),
    };

    let mut scene_node: Box<dyn SceneNode> = match node.mesh() {
        Some(mesh) => {
            let meshes: Vec<Mesh> = mesh
                .primitives()
                .filter_map(|primitive| {
                    let geometry = read_primitive(&primitive, buffers)?;
                    let material = primitive.material().index().unwrap_or(default_material);
                    Some(geometry.upload(device, &name, material))
                })
                .collect();
            let model = Model {
                meshes,
                materials: materials.to_vec(),
            };
            Box::new(ModelNode::from_model(name, device, model, vec![local]))
        }
        None => Box::new(ContainerNode::new(name).with_transform(local)),
    };

    for child in node.children() {
        scene_node.add_child(to_scene_node(
            child,
            buffers,
            materials,
            default_material,
            device,
        ));
    }
    scene_node
}
