use futures::future::join_all;

use crate::{
    data_structures::{
        model::{MapSlot, MaterialParams},
        texture::{Texture, Wrap},
    },
    resources::{Assets, extension},
};

/// Bind group layout of the standard material: the uniform at binding 0
/// followed by one texture/sampler pair per [`MapSlot`].
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }];
    for slot in MapSlot::ALL {
        // Height maps are read while displacing vertices
        let visibility = match slot {
            MapSlot::Displacement => wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            _ => wgpu::ShaderStages::FRAGMENT,
        };
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: slot.texture_binding(),
            visibility,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: slot.texture_binding() + 1,
            visibility,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &entries,
        label: Some("Standard material bind_group_layout"),
    })
}

pub async fn load_texture(
    assets: &Assets,
    path: &str,
    wrap: Wrap,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    let data = assets.load_binary(path).await?;
    let ext = extension(path);
    Texture::from_bytes(device, queue, &data, path, ext.as_deref(), wrap)
}

/// Load every map of `params` concurrently.
///
/// Missing or broken files never fail the material: they are logged and
/// replaced by the slot's neutral 1x1 texture.
pub async fn load_material_textures(
    assets: &Assets,
    name: &str,
    params: &MaterialParams,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> [Texture; 7] {
    let loads = MapSlot::ALL.map(|slot| async move {
        let fallback = || Texture::solid(slot.fallback_rgba(), &format!("{name} {slot:?}"), device, queue);
        match params.map(slot) {
            None => fallback(),
            Some(texture) => {
                match load_texture(assets, &texture.path, texture.wrap, device, queue).await {
                    Ok(loaded) => loaded,
                    Err(e) => {
                        log::warn!("Texture {} of {name} could not be loaded: {e:#}", texture.path);
                        fallback()
                    }
                }
            }
        }
    });
    let textures = join_all(loads).await;
    let mut textures = textures.into_iter();
    MapSlot::ALL.map(|slot| {
        textures
            .next()
            .unwrap_or_else(|| Texture::solid(slot.fallback_rgba(), name, device, queue))
    })
}
