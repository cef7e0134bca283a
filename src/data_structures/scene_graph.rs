//! Scene graph and hierarchical scene organization.
//!
//! A scene is a tree of [`SceneNode`]s. Groups ([`ContainerNode`]) only carry a
//! transform, meshes ([`ModelNode`]) carry a model and one or more instances
//! that are drawn with a single instanced call. Every node keeps pairs of
//! `(local, world)` transforms; world transforms are refreshed top-down with
//! [`SceneNode::update_world_transforms`].

use log::warn;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::{Instance, InstanceRaw},
        model::{self, Material},
    },
    render::{Instanced, Render},
};

/// `(local, world)` transform pairs of one node.
///
/// Children hang off the first instance, further instances are leaves (e.g. the
/// four bushes sharing one sphere).
#[derive(Clone, Debug, PartialEq)]
pub struct Transforms {
    entries: Vec<(Instance, Instance)>,
}

impl Transforms {
    pub fn new(amount: usize) -> Self {
        Self {
            entries: (0..amount)
                .map(|_| (Instance::default(), Instance::default()))
                .collect(),
        }
    }

    pub fn from_locals(locals: Vec<Instance>) -> Self {
        Self {
            entries: locals
                .into_iter()
                .map(|local| (local.clone(), local))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn local(&self, idx: usize) -> Option<&Instance> {
        self.entries.get(idx).map(|(local, _)| local)
    }

    pub fn set_local(&mut self, idx: usize, instance: Instance) {
        match self.entries.get_mut(idx) {
            Some((local, _)) => *local = instance,
            None => warn!(
                "You tried to set transform {} but there are only {} instances.",
                idx,
                self.entries.len()
            ),
        }
    }

    pub fn worlds(&self) -> Vec<Instance> {
        self.entries.iter().map(|(_, world)| world).cloned().collect()
    }

    /// Recompute all world transforms and return the one children inherit.
    pub fn propagate(&mut self, parent: &Instance) -> Instance {
        for (local, world) in self.entries.iter_mut() {
            *world = parent * &*local;
        }
        self.entries
            .first()
            .map(|(_, world)| world.clone())
            .unwrap_or_else(|| parent.clone())
    }

    fn to_raw(&self) -> Vec<InstanceRaw> {
        self.entries.iter().map(|(_, world)| world.to_raw()).collect()
    }
}

pub trait SceneNode {
    fn name(&self) -> &str;

    fn get_world_transforms(&self) -> Vec<Instance>;

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    /// Recompute world transforms of this node and its subtree.
    fn update_world_transforms(&mut self, parent: &Instance);

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device);

    /// Visit every material of the subtree, e.g. to override a parameter after loading.
    fn for_each_material_mut(&mut self, f: &mut dyn FnMut(&mut Material));

    fn get_render(&self) -> Render<'_>;

    fn update_world_transform_all(&mut self) {
        self.update_world_transforms(&Instance::default());
    }

    /// Depth-first search by name, including `self`.
    fn find(&self, name: &str) -> Option<&dyn SceneNode> {
        if self.name() == name {
            return Some(self.as_dyn());
        }
        self.get_children()
            .iter()
            .find_map(|child| child.find(name))
    }

    fn as_dyn(&self) -> &dyn SceneNode;
}

pub struct ContainerNode {
    name: String,
    pub children: Vec<Box<dyn SceneNode>>,
    transforms: Transforms,
}

impl ContainerNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: vec![],
            transforms: Transforms::new(1),
        }
    }

    pub fn with_transform(mut self, local: Instance) -> Self {
        self.transforms.set_local(0, local);
        self
    }
}

impl SceneNode for ContainerNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_world_transforms(&self) -> Vec<Instance> {
        self.transforms.worlds()
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn update_world_transforms(&mut self, parent: &Instance) {
        let world = self.transforms.propagate(parent);
        for child in self.children.iter_mut() {
            child.update_world_transforms(&world);
        }
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue, device));
    }

    fn for_each_material_mut(&mut self, f: &mut dyn FnMut(&mut Material)) {
        self.children
            .iter_mut()
            .for_each(|child| child.for_each_material_mut(f));
    }

    fn get_render(&self) -> Render<'_> {
        Render::Composed(self.children.iter().map(|child| child.get_render()).collect())
    }

    fn as_dyn(&self) -> &dyn SceneNode {
        self
    }
}

pub struct ModelNode {
    name: String,
    children: Vec<Box<dyn SceneNode>>,
    instance_buffer: wgpu::Buffer,
    transforms: Transforms,
    model: model::Model,
    // Meshes before this index are opaque, the rest are blended
    first_transparent: usize,
}

impl ModelNode {
    /// Wrap `model` drawn once per entry of `locals`.
    ///
    /// Each mesh is drawn in the pass of its own material. The pass is
    /// decided here; changing `transparent` on a material later has no effect.
    pub fn from_model(
        name: impl Into<String>,
        device: &wgpu::Device,
        mut model: model::Model,
        locals: Vec<Instance>,
    ) -> Self {
        let first_transparent = model.sort_by_pass();
        let name = name.into();
        let transforms = Transforms::from_locals(locals);
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Instance Buffer")),
            contents: bytemuck::cast_slice(&transforms.to_raw()),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            name,
            children: vec![],
            instance_buffer,
            transforms,
            model,
            first_transparent,
        }
    }

    pub fn model(&self) -> &model::Model {
        &self.model
    }
}

impl SceneNode for ModelNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_world_transforms(&self) -> Vec<Instance> {
        self.transforms.worlds()
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn update_world_transforms(&mut self, parent: &Instance) {
        let world = self.transforms.propagate(parent);
        for child in self.children.iter_mut() {
            child.update_world_transforms(&world);
        }
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&self.transforms.to_raw()),
        );
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue, device));
    }

    fn for_each_material_mut(&mut self, f: &mut dyn FnMut(&mut Material)) {
        self.model.materials.iter_mut().for_each(|material| f(material));
        self.children
            .iter_mut()
            .for_each(|child| child.for_each_material_mut(f));
    }

    fn get_render(&self) -> Render<'_> {
        let origin = self
            .transforms
            .worlds()
            .first()
            .map(|world| world.position)
            .unwrap_or(cgmath::Vector3::new(0.0, 0.0, 0.0));
        let (instance, model, amount) = (&self.instance_buffer, &self.model, self.transforms.len());
        let instanced = move |meshes| Instanced {
            instance,
            model,
            meshes,
            amount,
            origin,
        };
        let split = self.first_transparent;
        let total = self.model.meshes.len();
        let mut renders = Vec::with_capacity(2 + self.children.len());
        if split > 0 {
            renders.push(Render::Default(instanced(0..split)));
        }
        if split < total {
            renders.push(Render::Transparent(instanced(split..total)));
        }
        renders.extend(self.children.iter().map(|child| child.get_render()));
        match renders.len() {
            0 => Render::None,
            1 => renders.remove(0),
            _ => Render::Composed(renders),
        }
    }

    fn as_dyn(&self) -> &dyn SceneNode {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    #[test]
    fn worlds_follow_the_parent() {
        let mut bushes = Transforms::from_locals(vec![
            Instance::at(1.5, 0.0, 2.5).with_uniform_scale(0.5),
            Instance::at(1.0, 0.0, 2.5).with_uniform_scale(0.25),
        ]);
        let house = Instance::at(0.0, 0.0, -1.0);
        bushes.propagate(&house);
        let worlds = bushes.worlds();
        assert_relative_eq!(worlds[0].position.z, 1.5);
        assert_relative_eq!(worlds[1].position.x, 1.0);
        assert_relative_eq!(worlds[1].scale.y, 0.25);
    }

    #[test]
    fn children_inherit_the_first_instance() {
        let mut node = Transforms::from_locals(vec![
            Instance::at(0.0, 0.0, 7.0).with_euler(0.0, PI, 0.0),
            Instance::at(100.0, 0.0, 0.0),
        ]);
        let inherited = node.propagate(&Instance::default());
        assert_relative_eq!(inherited.position.z, 7.0);
    }

    #[test]
    fn empty_transforms_pass_the_parent_through() {
        let mut empty = Transforms::new(0);
        let parent = Instance::at(1.0, 2.0, 3.0);
        assert_eq!(empty.propagate(&parent), parent);
    }

    #[test]
    fn out_of_range_set_is_ignored() {
        let mut transforms = Transforms::new(1);
        transforms.set_local(3, Instance::at(1.0, 1.0, 1.0));
        assert_eq!(transforms.len(), 1);
        assert_eq!(transforms.local(0), Some(&Instance::default()));
    }

    #[test]
    fn groups_propagate_through_nested_groups() {
        let mut scene = ContainerNode::new("scene");
        let mut house = ContainerNode::new("house").with_transform(Instance::at(0.0, 1.0, 0.0));
        house.add_child(Box::new(
            ContainerNode::new("porch").with_transform(Instance::at(0.0, 0.0, 2.0)),
        ));
        scene.add_child(Box::new(house));

        scene.update_world_transform_all();

        let porch = scene.find("porch").expect("porch is part of the scene");
        let world = &porch.get_world_transforms()[0];
        assert_relative_eq!(world.position.y, 1.0);
        assert_relative_eq!(world.position.z, 2.0);
        assert!(scene.find("attic").is_none());
    }

    #[test]
    fn empty_groups_batch_nothing() {
        let mut scene = ContainerNode::new("scene");
        scene.add_child(Box::new(ContainerNode::new("house")));
        let mut batches = crate::render::Batches::new();
        scene.get_render().set_pipelines(&mut batches);
        assert!(batches.basics.is_empty());
        assert!(batches.trans.is_empty());
        assert!(batches.lines.is_empty() && batches.guis.is_empty());
    }
}
