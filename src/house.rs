//! The haunted house scene.
//!
//! [`Blueprint`] is the GPU-free description of everything in the scene:
//! shapes, materials, textures and placements. [`HauntedHouse`] turns it into
//! scene graph nodes, keeps the light uniform and helpers in sync with
//! [`SceneState`] and renders the result.

use std::f32::consts::PI;

use futures::future::join_all;
use instant::Duration;
use rand::{Rng, SeedableRng, rngs::StdRng};
use winit::event::WindowEvent;

use crate::{
    config::Settings,
    context::{Context, InitContext},
    data_structures::{
        geometry::Shape,
        instance::Instance,
        model::{MapSlot, Material, MaterialParams, Model, TextureRef},
        scene_graph::{ContainerNode, ModelNode, SceneNode},
    },
    flow::{GraphicsFlow, Out},
    lights::{Color, SceneLights},
    pipelines::light::LightHelpers,
    render::Render,
    resources::{gltf::load_model_gltf, texture::load_material_textures},
};

/// State shared by the flows: the lights the debug panel edits.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneState {
    pub lights: SceneLights,
}

pub const BUSH_COLOR: Color = Color::hex(0x103b1d);
pub const GRAVE_COLOR: Color = Color::hex(0xb1b3c2);

/// One shape with one material, drawn once per instance.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshSpec {
    pub name: String,
    pub shape: Shape,
    pub material: MaterialParams,
    pub instances: Vec<Instance>,
}

/// A transform shared by its meshes.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupSpec {
    pub name: String,
    pub transform: Instance,
    pub meshes: Vec<MeshSpec>,
}

/// A glTF model loaded from the asset root.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSpec {
    pub name: String,
    pub path: String,
    pub transform: Instance,
    /// Replaces the metalness of every material of the model.
    pub metalness: Option<f32>,
}

impl ModelSpec {
    /// Apply the per-model parameter overrides to one of its loaded materials.
    pub fn override_material(&self, params: &mut MaterialParams) {
        if let Some(metalness) = self.metalness {
            params.metalness = metalness;
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Blueprint {
    pub meshes: Vec<MeshSpec>,
    pub groups: Vec<GroupSpec>,
    pub models: Vec<ModelSpec>,
    /// Grave placements, generated even when the graves stay out of the scene.
    pub graves: Vec<Instance>,
}

/// Random generator for the grave scatter, seeded from the settings if requested.
pub fn rng_for(settings: &Settings) -> StdRng {
    match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// `count` graves on a ring of radius [3, 9) around the house.
pub fn scatter_graves(rng: &mut impl Rng, count: usize) -> Vec<Instance> {
    (0..count)
        .map(|_| {
            let angle = rng.r#gen::<f32>() * PI * 2.0;
            let radius = 3.0 + rng.r#gen::<f32>() * 6.0;
            Instance::at(angle.cos() * radius, 0.3, angle.sin() * radius)
        })
        .collect()
}

fn tiled(path: &str) -> TextureRef {
    TextureRef::tiled(path, 3.0, 3.0)
}

fn mesh(name: &str, shape: Shape, material: MaterialParams, instances: Vec<Instance>) -> MeshSpec {
    MeshSpec {
        name: name.to_string(),
        shape,
        material,
        instances,
    }
}

impl Blueprint {
    pub fn haunted_house(settings: &Settings, rng: &mut impl Rng) -> Self {
        let ground = mesh(
            "ground",
            Shape::Plane {
                width: 20.0,
                height: 20.0,
                width_segments: 1,
                height_segments: 1,
            },
            MaterialParams {
                transparent: true,
                displacement_scale: 0.1,
                ..Default::default()
            }
            .with_map(MapSlot::Color, tiled("/textures/grass/color.jpg"))
            .with_map(MapSlot::Displacement, tiled("/textures/grass/height.png"))
            .with_map(MapSlot::Normal, tiled("/textures/grass/normal.exr"))
            .with_map(MapSlot::Roughness, tiled("/textures/grass/roughness.exr")),
            vec![Instance::new().with_euler(-PI * 0.5, 0.0, 0.0)],
        );

        let walls = mesh(
            "walls",
            Shape::Cuboid {
                width: 4.0,
                height: 2.5,
                depth: 4.0,
            },
            MaterialParams::default()
                .with_map(MapSlot::Color, TextureRef::new("/textures/bricks/color.jpg"))
                .with_map(
                    MapSlot::AmbientOcclusion,
                    TextureRef::new("/textures/bricks/ambientOcclusion.jpg"),
                )
                .with_map(MapSlot::Normal, TextureRef::new("/textures/bricks/normal.jpg"))
                .with_map(MapSlot::Roughness, TextureRef::new("/textures/bricks/roughness.jpg")),
            vec![Instance::at(0.0, 2.5 / 2.0, 0.0)],
        );

        let roof = mesh(
            "roof",
            Shape::Cone {
                radius: 4.0,
                height: 1.0,
                radial_segments: 4,
            },
            MaterialParams::default()
                .with_map(MapSlot::Color, tiled("/textures/roof/color.jpg"))
                .with_map(MapSlot::Roughness, tiled("/textures/roof/roughness.jpg"))
                .with_map(MapSlot::Normal, TextureRef::new("/textures/roof/normal.exr")),
            vec![Instance::at(0.0, 2.5 + 0.5, 0.0).with_euler(0.0, PI * 0.25, 0.0)],
        );

        let door = mesh(
            "door",
            Shape::Plane {
                width: 2.0,
                height: 2.0,
                width_segments: 100,
                height_segments: 100,
            },
            MaterialParams {
                transparent: true,
                displacement_scale: 0.1,
                ..Default::default()
            }
            .with_map(MapSlot::Alpha, TextureRef::new("/textures/door/alpha.jpg"))
            .with_map(
                MapSlot::AmbientOcclusion,
                TextureRef::new("/textures/door/ambientOcclusion.jpg"),
            )
            .with_map(MapSlot::Color, TextureRef::new("/textures/door/color.jpg"))
            .with_map(MapSlot::Displacement, TextureRef::new("/textures/door/height.jpg"))
            .with_map(MapSlot::Metalness, TextureRef::new("/textures/door/metalness.jpg"))
            .with_map(MapSlot::Normal, TextureRef::new("/textures/door/normal.jpg"))
            .with_map(MapSlot::Roughness, TextureRef::new("/textures/door/roughness.jpg")),
            vec![Instance::at(0.0, 0.9, 2.0 + 0.01)],
        );

        let bushes = mesh(
            "bushes",
            Shape::Sphere {
                radius: 1.0,
                width_segments: 16,
                height_segments: 16,
            },
            MaterialParams::coloured(BUSH_COLOR),
            vec![
                Instance::at(1.5, 0.0, 2.5).with_uniform_scale(0.5),
                Instance::at(1.0, 0.0, 2.5).with_uniform_scale(0.25),
                Instance::at(-1.5, -0.1, 2.5).with_uniform_scale(0.5),
                Instance::at(-1.0, -0.2, 2.5).with_uniform_scale(0.4),
            ],
        );

        let graves = scatter_graves(rng, settings.grave_count);
        let mut meshes = vec![ground];
        if settings.graves {
            meshes.push(mesh(
                "graves",
                Shape::Cuboid {
                    width: 0.6,
                    height: 0.8,
                    depth: 0.2,
                },
                MaterialParams::coloured(GRAVE_COLOR),
                graves.clone(),
            ));
        }

        Self {
            meshes,
            groups: vec![GroupSpec {
                name: "house".to_string(),
                transform: Instance::new(),
                meshes: vec![walls, roof, door, bushes],
            }],
            models: vec![ModelSpec {
                name: "car".to_string(),
                path: "/models/bmw/scene.gltf".to_string(),
                transform: Instance::at(0.0, 0.0, 7.0).with_euler(0.0, PI, 0.0),
                metalness: Some(0.0),
            }],
            graves,
        }
    }

    /// Find a mesh by name, top level or inside a group.
    pub fn mesh(&self, name: &str) -> Option<&MeshSpec> {
        self.meshes
            .iter()
            .chain(self.groups.iter().flat_map(|group| group.meshes.iter()))
            .find(|mesh| mesh.name == name)
    }

    pub fn group(&self, name: &str) -> Option<&GroupSpec> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn model(&self, name: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|model| model.name == name)
    }
}

async fn build_mesh(ctx: &InitContext, spec: &MeshSpec) -> ModelNode {
    let textures = load_material_textures(
        &ctx.assets,
        &spec.name,
        &spec.material,
        &ctx.device,
        &ctx.queue,
    )
    .await;
    let material = Material::new(
        &ctx.device,
        &spec.name,
        spec.material.clone(),
        &textures,
        &ctx.material_layout,
    );
    let mesh = spec.shape.build().upload(&ctx.device, &spec.name, 0);
    let model = Model {
        meshes: vec![mesh],
        materials: vec![material],
    };
    ModelNode::from_model(&spec.name, &ctx.device, model, spec.instances.clone())
}

async fn build_group(ctx: &InitContext, spec: &GroupSpec) -> ContainerNode {
    let mut group = ContainerNode::new(&spec.name).with_transform(spec.transform.clone());
    for node in join_all(spec.meshes.iter().map(|mesh| build_mesh(ctx, mesh))).await {
        group.add_child(Box::new(node));
    }
    group
}

/// `None` if the model could not be loaded; the scene goes on without it.
async fn build_model(ctx: &InitContext, spec: &ModelSpec) -> Option<ContainerNode> {
    let loaded = load_model_gltf(
        &ctx.assets,
        &spec.path,
        &ctx.device,
        &ctx.queue,
        &ctx.material_layout,
    )
    .await;
    let mut node = match loaded {
        Ok(node) => node,
        Err(e) => {
            log::warn!("Model {} could not be loaded: {e:#}", spec.path);
            return None;
        }
    };
    node.for_each_material_mut(&mut |material: &mut Material| {
        spec.override_material(&mut material.params);
        material.write_to_buffer(&ctx.queue);
    });
    let mut container = ContainerNode::new(&spec.name).with_transform(spec.transform.clone());
    container.add_child(node);
    Some(container)
}

/// The scene itself plus the light helpers.
pub struct HauntedHouse {
    scene: ContainerNode,
    helpers: LightHelpers,
}

impl HauntedHouse {
    pub async fn new(ctx: InitContext) -> Self {
        let blueprint = Blueprint::haunted_house(&ctx.settings, &mut rng_for(&ctx.settings));
        log::info!(
            "Building {} meshes, {} groups and {} models",
            blueprint.meshes.len(),
            blueprint.groups.len(),
            blueprint.models.len()
        );

        let (meshes, groups, models) = futures::join!(
            join_all(blueprint.meshes.iter().map(|spec| build_mesh(&ctx, spec))),
            join_all(blueprint.groups.iter().map(|spec| build_group(&ctx, spec))),
            join_all(blueprint.models.iter().map(|spec| build_model(&ctx, spec))),
        );

        let mut scene = ContainerNode::new("scene");
        for node in meshes {
            scene.add_child(Box::new(node));
        }
        for node in groups {
            scene.add_child(Box::new(node));
        }
        for node in models.into_iter().flatten() {
            scene.add_child(Box::new(node));
        }
        scene.update_world_transform_all();
        scene.write_to_buffers(&ctx.queue, &ctx.device);

        Self {
            scene,
            helpers: LightHelpers::new(&ctx.device, &SceneLights::default()),
        }
    }

    pub fn scene(&self) -> &dyn SceneNode {
        &self.scene
    }
}

impl GraphicsFlow<SceneState> for HauntedHouse {
    fn on_init(&mut self, ctx: &mut Context, state: &mut SceneState) {
        ctx.clear_colour = wgpu::Color::BLACK;
        ctx.lights.write(&ctx.queue, &state.lights);
        self.helpers.update(&ctx.queue, &state.lights);
    }

    fn on_update(&mut self, ctx: &Context, state: &mut SceneState, _: Duration) {
        ctx.lights.write(&ctx.queue, &state.lights);
        self.helpers.update(&ctx.queue, &state.lights);
    }

    fn on_window_events(&mut self, _: &Context, _: &mut SceneState, _: &WindowEvent) -> Out {
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        Render::Composed(vec![self.scene.get_render(), self.helpers.render()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graves_scatter_on_the_ring() {
        let mut rng = StdRng::seed_from_u64(42);
        let graves = scatter_graves(&mut rng, 200);
        assert_eq!(graves.len(), 200);
        for grave in graves {
            let radius = (grave.position.x.powi(2) + grave.position.z.powi(2)).sqrt();
            assert!((3.0 - 1e-4..9.0 + 1e-4).contains(&radius), "radius {radius}");
            assert_eq!(grave.position.y, 0.3);
        }
    }

    #[test]
    fn car_materials_lose_their_metalness() {
        let scene = Blueprint::haunted_house(&Settings::default(), &mut StdRng::seed_from_u64(1));
        let car = scene.model("car").unwrap();
        let mut paint = MaterialParams {
            metalness: 1.0,
            roughness: 0.3,
            ..Default::default()
        };
        car.override_material(&mut paint);
        assert_eq!(paint.metalness, 0.0);
        assert_eq!(paint.roughness, 0.3);
    }

    #[test]
    fn models_without_overrides_keep_their_materials() {
        let spec = ModelSpec {
            name: "lamp".to_string(),
            path: "/models/lamp/scene.gltf".to_string(),
            transform: Instance::new(),
            metalness: None,
        };
        let mut chrome = MaterialParams {
            metalness: 1.0,
            ..Default::default()
        };
        spec.override_material(&mut chrome);
        assert_eq!(chrome.metalness, 1.0);
    }

    #[test]
    fn same_seed_same_graves() {
        let settings = Settings {
            seed: Some(3),
            ..Default::default()
        };
        let a = Blueprint::haunted_house(&settings, &mut rng_for(&settings));
        let b = Blueprint::haunted_house(&settings, &mut rng_for(&settings));
        assert_eq!(a.graves, b.graves);
    }
}
