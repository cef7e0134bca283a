use std::f32::consts::PI;

use approx::assert_relative_eq;
use cgmath::{InnerSpace, Rotation, Vector3};
use haunted_house::{
    config::Settings,
    data_structures::{geometry::Shape, model::MapSlot, texture::Wrap},
    house::{BUSH_COLOR, Blueprint, GRAVE_COLOR, rng_for},
};

fn blueprint(settings: &Settings) -> Blueprint {
    Blueprint::haunted_house(settings, &mut rng_for(settings))
}

fn seeded() -> Settings {
    Settings {
        seed: Some(7),
        ..Default::default()
    }
}

#[test]
fn house_group_holds_walls_roof_door_and_bushes() {
    let scene = blueprint(&seeded());
    let house = scene.group("house").unwrap();
    let names: Vec<_> = house.meshes.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["walls", "roof", "door", "bushes"]);
    assert_eq!(house.transform.position, Vector3::new(0.0, 0.0, 0.0));
}

#[test]
fn roof_sits_on_the_walls() {
    let scene = blueprint(&seeded());
    let walls = scene.mesh("walls").unwrap();
    let roof = scene.mesh("roof").unwrap();

    let Shape::Cuboid { height: wall_height, .. } = walls.shape else {
        panic!("walls are not a box");
    };
    let Shape::Cone { height: roof_height, radial_segments, .. } = roof.shape else {
        panic!("roof is not a cone");
    };
    assert_eq!(radial_segments, 4);

    // Walls rest on the ground
    assert_relative_eq!(walls.instances[0].position.y - wall_height / 2.0, 0.0);
    // Roof base touches the top of the walls
    assert_relative_eq!(
        roof.instances[0].position.y - roof_height / 2.0,
        wall_height,
        epsilon = 1e-6
    );

    // A quarter turn of the pyramid aligns its edges with the walls
    let turned = roof.instances[0].rotation.rotate_vector(Vector3::unit_x());
    assert_relative_eq!(turned.x, (PI / 4.0).cos(), epsilon = 1e-6);
    assert_relative_eq!(turned.z, -(PI / 4.0).sin(), epsilon = 1e-6);
}

#[test]
fn door_sits_just_in_front_of_the_wall() {
    let scene = blueprint(&seeded());
    let door = scene.mesh("door").unwrap();
    let Shape::Cuboid { depth, .. } = scene.mesh("walls").unwrap().shape else {
        panic!("walls are not a box");
    };

    let position = door.instances[0].position;
    assert!(position.z > depth / 2.0);
    assert_relative_eq!(position.z, 2.01, epsilon = 1e-6);
    assert_relative_eq!(position.y, 0.9);

    assert!(door.material.transparent);
    assert_relative_eq!(door.material.displacement_scale, 0.1);
    for slot in MapSlot::ALL {
        assert!(door.material.map(slot).is_some(), "door misses its {slot:?} map");
    }
    assert!(matches!(
        door.shape,
        Shape::Plane {
            width_segments: 100,
            height_segments: 100,
            ..
        }
    ));
}

#[test]
fn four_bushes_around_the_porch() {
    let scene = blueprint(&seeded());
    let bushes = scene.mesh("bushes").unwrap();
    assert_eq!(bushes.instances.len(), 4);
    assert_eq!(bushes.material.color, BUSH_COLOR);
    let scales: Vec<f32> = bushes.instances.iter().map(|b| b.scale.x).collect();
    assert_eq!(scales, [0.5, 0.25, 0.5, 0.4]);
    assert!(bushes.instances.iter().all(|b| b.position.z == 2.5));
}

#[test]
fn ground_faces_up_and_tiles_its_grass() {
    let scene = blueprint(&seeded());
    let ground = scene.mesh("ground").unwrap();
    assert!(ground.material.transparent);

    let normal = ground.instances[0]
        .rotation
        .rotate_vector(Vector3::unit_z())
        .normalize();
    assert_relative_eq!(normal.y, 1.0, epsilon = 1e-6);

    for slot in [MapSlot::Color, MapSlot::Displacement, MapSlot::Normal, MapSlot::Roughness] {
        let map = ground.material.map(slot).unwrap();
        assert_eq!(map.repeat, [3.0, 3.0]);
        assert_eq!(map.wrap, Wrap::Repeat);
        assert!(map.path.starts_with("/textures/grass/"));
    }
}

#[test]
fn only_the_roof_normal_map_is_not_tiled() {
    let scene = blueprint(&seeded());
    let roof = &scene.mesh("roof").unwrap().material;
    assert_eq!(roof.map(MapSlot::Color).unwrap().repeat, [3.0, 3.0]);
    assert_eq!(roof.map(MapSlot::Roughness).unwrap().repeat, [3.0, 3.0]);
    let normal = roof.map(MapSlot::Normal).unwrap();
    assert_eq!(normal.repeat, [1.0, 1.0]);
    assert_eq!(normal.wrap, Wrap::ClampToEdge);
}

#[test]
fn graves_are_generated_but_left_out_by_default() {
    let scene = blueprint(&seeded());
    assert_eq!(scene.graves.len(), 50);
    assert!(scene.mesh("graves").is_none());
}

#[test]
fn graves_join_the_scene_when_enabled() {
    let settings = Settings {
        graves: true,
        grave_count: 12,
        ..seeded()
    };
    let scene = blueprint(&settings);
    let graves = scene.mesh("graves").unwrap();
    assert_eq!(graves.instances.len(), 12);
    assert_eq!(graves.instances, scene.graves);
    assert_eq!(graves.material.color, GRAVE_COLOR);
    assert!(!graves.material.transparent);
}

#[test]
fn car_is_turned_around_behind_the_house() {
    let scene = blueprint(&seeded());
    let car = scene.model("car").unwrap();
    assert_eq!(car.path, "/models/bmw/scene.gltf");
    assert_eq!(car.transform.position, Vector3::new(0.0, 0.0, 7.0));
    assert_eq!(car.metalness, Some(0.0));

    let forward = car.transform.rotation.rotate_vector(Vector3::unit_z());
    assert_relative_eq!(forward.z, -1.0, epsilon = 1e-6);
}
