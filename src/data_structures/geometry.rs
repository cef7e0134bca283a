//! Procedural primitive geometry.
//!
//! Generators produce CPU-side [`Geometry`] (vertices + `u32` indices) that is
//! uploaded once and shared by every instance drawing it. Conventions:
//!
//! - triangles are counter-clockwise when seen from outside (back faces are culled)
//! - texture coordinates use the wgpu convention, `v` grows downwards
//! - tangents and bitangents are always filled in so normal maps work on every primitive

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector2, Vector3};
use wgpu::util::DeviceExt;

use crate::data_structures::model::{Mesh, ModelVertex};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

/// Shapes the scene is built from.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Plane {
        width: f32,
        height: f32,
        width_segments: u32,
        height_segments: u32,
    },
    Cuboid {
        width: f32,
        height: f32,
        depth: f32,
    },
    Cone {
        radius: f32,
        height: f32,
        radial_segments: u32,
    },
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
}

impl Shape {
    pub fn build(&self) -> Geometry {
        match *self {
            Shape::Plane {
                width,
                height,
                width_segments,
                height_segments,
            } => plane(width, height, width_segments, height_segments),
            Shape::Cuboid {
                width,
                height,
                depth,
            } => cuboid(width, height, depth),
            Shape::Cone {
                radius,
                height,
                radial_segments,
            } => cone(radius, height, radial_segments),
            Shape::Sphere {
                radius,
                width_segments,
                height_segments,
            } => sphere(radius, width_segments, height_segments),
        }
    }
}

fn vertex(position: Vector3<f32>, normal: Vector3<f32>, u: f32, v: f32) -> ModelVertex {
    ModelVertex {
        position: position.into(),
        tex_coords: [u, v],
        normal: normal.into(),
        tangent: [0.0; 3],
        bitangent: [0.0; 3],
    }
}

/// A plane in the XY plane facing +Z, centred on the origin.
pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let grid_x = width_segments.max(1);
    let grid_y = height_segments.max(1);
    let segment_width = width / grid_x as f32;
    let segment_height = height / grid_y as f32;

    let mut vertices = Vec::with_capacity(((grid_x + 1) * (grid_y + 1)) as usize);
    for iy in 0..=grid_y {
        let y = iy as f32 * segment_height - height / 2.0;
        for ix in 0..=grid_x {
            let x = ix as f32 * segment_width - width / 2.0;
            vertices.push(vertex(
                Vector3::new(x, -y, 0.0),
                Vector3::unit_z(),
                ix as f32 / grid_x as f32,
                iy as f32 / grid_y as f32,
            ));
        }
    }

    let row = grid_x + 1;
    let mut indices = Vec::with_capacity((grid_x * grid_y * 6) as usize);
    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = ix + row * iy;
            let b = ix + row * (iy + 1);
            let c = (ix + 1) + row * (iy + 1);
            let d = (ix + 1) + row * iy;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    let mut geometry = Geometry { vertices, indices };
    geometry.compute_tangents();
    geometry
}

/// An axis aligned box centred on the origin, one quad per face.
pub fn cuboid(width: f32, height: f32, depth: f32) -> Geometry {
    // (normal, u axis, v axis) with u x v pointing along the normal
    let faces = [
        (Vector3::unit_x(), Vector3::new(0.0, 0.0, -depth), Vector3::new(0.0, height, 0.0)),
        (-Vector3::unit_x(), Vector3::new(0.0, 0.0, depth), Vector3::new(0.0, height, 0.0)),
        (Vector3::unit_y(), Vector3::new(width, 0.0, 0.0), Vector3::new(0.0, 0.0, -depth)),
        (-Vector3::unit_y(), Vector3::new(width, 0.0, 0.0), Vector3::new(0.0, 0.0, depth)),
        (Vector3::unit_z(), Vector3::new(width, 0.0, 0.0), Vector3::new(0.0, height, 0.0)),
        (-Vector3::unit_z(), Vector3::new(-width, 0.0, 0.0), Vector3::new(0.0, height, 0.0)),
    ];
    let half = Vector3::new(width, height, depth) * 0.5;

    let mut geometry = Geometry::default();
    for (normal, u_axis, v_axis) in faces {
        let centre = Vector3::new(normal.x * half.x, normal.y * half.y, normal.z * half.z);
        let start = geometry.vertices.len() as u32;
        for (s, t) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            let position = centre + u_axis * (s - 0.5) + v_axis * (t - 0.5);
            geometry
                .vertices
                .push(vertex(position, normal, s, 1.0 - t));
        }
        geometry
            .indices
            .extend_from_slice(&[start, start + 1, start + 2, start, start + 2, start + 3]);
    }
    geometry.compute_tangents();
    geometry
}

/// A cone with its apex pointing up, centred on the origin, with a closed base.
pub fn cone(radius: f32, height: f32, radial_segments: u32) -> Geometry {
    let segments = radial_segments.max(3);
    let half_height = height / 2.0;
    let slope = radius / height;

    let mut geometry = Geometry::default();

    // Torso: row 0 is the apex, row 1 the rim
    for row in 0..=1u32 {
        let v = row as f32;
        let ring_radius = v * radius;
        for x in 0..=segments {
            let u = x as f32 / segments as f32;
            let theta = u * 2.0 * PI;
            let (sin, cos) = theta.sin_cos();
            let position = Vector3::new(ring_radius * sin, -v * height + half_height, ring_radius * cos);
            let normal = Vector3::new(sin, slope, cos).normalize();
            geometry.vertices.push(vertex(position, normal, u, v));
        }
    }
    let row = segments + 1;
    for x in 0..segments {
        let b = row + x;
        let c = row + x + 1;
        let d = x + 1;
        geometry.indices.extend_from_slice(&[b, c, d]);
    }

    // Base cap facing down
    let centre = geometry.vertices.len() as u32;
    geometry.vertices.push(vertex(
        Vector3::new(0.0, -half_height, 0.0),
        -Vector3::unit_y(),
        0.5,
        0.5,
    ));
    let ring = geometry.vertices.len() as u32;
    for x in 0..=segments {
        let theta = x as f32 / segments as f32 * 2.0 * PI;
        let (sin, cos) = theta.sin_cos();
        geometry.vertices.push(vertex(
            Vector3::new(radius * sin, -half_height, radius * cos),
            -Vector3::unit_y(),
            cos * 0.5 + 0.5,
            sin * 0.5 + 0.5,
        ));
    }
    for x in 0..segments {
        geometry
            .indices
            .extend_from_slice(&[centre, ring + x + 1, ring + x]);
    }

    geometry.compute_tangents();
    geometry
}

/// A UV sphere centred on the origin.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);

    let mut geometry = Geometry::default();
    let mut grid = Vec::with_capacity(height_segments as usize + 1);
    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        // Poles get shifted UVs so the texture does not pinch on one side
        let u_offset = if iy == 0 {
            0.5 / width_segments as f32
        } else if iy == height_segments {
            -0.5 / width_segments as f32
        } else {
            0.0
        };
        let mut row = Vec::with_capacity(width_segments as usize + 1);
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let position = Vector3::new(
                -radius * (u * 2.0 * PI).cos() * (v * PI).sin(),
                radius * (v * PI).cos(),
                radius * (u * 2.0 * PI).sin() * (v * PI).sin(),
            );
            let normal = if position.magnitude2() > 0.0 {
                position.normalize()
            } else {
                Vector3::unit_y()
            };
            row.push(geometry.vertices.len() as u32);
            geometry.vertices.push(vertex(position, normal, u + u_offset, v));
        }
        grid.push(row);
    }

    for iy in 0..height_segments as usize {
        for ix in 0..width_segments as usize {
            let a = grid[iy][ix + 1];
            let b = grid[iy][ix];
            let c = grid[iy + 1][ix];
            let d = grid[iy + 1][ix + 1];
            if iy != 0 {
                geometry.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments as usize - 1 {
                geometry.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    geometry.compute_tangents();
    geometry
}

/// Unique edges of a triangle list, suitable for a `LineList` draw.
pub fn wireframe_indices(indices: &[u32]) -> Vec<u32> {
    let mut edges: Vec<(u32, u32)> = indices
        .chunks_exact(3)
        .flat_map(|t| [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])])
        .map(|(a, b)| (a.min(b), a.max(b)))
        .filter(|(a, b)| a != b)
        .collect();
    edges.sort_unstable();
    edges.dedup();
    edges.into_iter().flat_map(|(a, b)| [a, b]).collect()
}

fn any_orthogonal(normal: Vector3<f32>) -> Vector3<f32> {
    let helper = if normal.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };
    normal.cross(helper).normalize()
}

impl Geometry {
    /**
     * Calculates per-vertex tangents and bitangents from the triangles' UV
     * gradients so that normal maps can be applied.
     *
     * Degenerate triangles (zero UV area) are skipped and vertices without a
     * usable contribution get an arbitrary tangent orthogonal to their normal,
     * which keeps the shader free of NaNs.
     */
    pub fn compute_tangents(&mut self) {
        let vertices = &mut self.vertices;
        let mut tangents = vec![Vector3::new(0.0, 0.0, 0.0); vertices.len()];
        let mut bitangents = vec![Vector3::new(0.0, 0.0, 0.0); vertices.len()];

        for c in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
            let pos0: Vector3<f32> = vertices[i0].position.into();
            let pos1: Vector3<f32> = vertices[i1].position.into();
            let pos2: Vector3<f32> = vertices[i2].position.into();

            let uv0: Vector2<f32> = vertices[i0].tex_coords.into();
            let uv1: Vector2<f32> = vertices[i1].tex_coords.into();
            let uv2: Vector2<f32> = vertices[i2].tex_coords.into();

            let delta_pos1 = pos1 - pos0;
            let delta_pos2 = pos2 - pos0;
            let delta_uv1 = uv1 - uv0;
            let delta_uv2 = uv2 - uv0;

            // delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
            // delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
            // Flipped to get right-handed normal maps with the wgpu texture coordinate system
            let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

            for i in [i0, i1, i2] {
                tangents[i] += tangent;
                bitangents[i] += bitangent;
            }
        }

        for (i, v) in vertices.iter_mut().enumerate() {
            let normal: Vector3<f32> = v.normal.into();
            let tangent = if tangents[i].magnitude2() > f32::EPSILON {
                tangents[i].normalize()
            } else {
                any_orthogonal(normal)
            };
            let bitangent = if bitangents[i].magnitude2() > f32::EPSILON {
                bitangents[i].normalize()
            } else {
                normal.cross(tangent)
            };
            v.tangent = tangent.into();
            v.bitangent = bitangent.into();
        }
    }

    pub fn upload(&self, device: &wgpu::Device, name: &str, material: usize) -> Mesh {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Vertex Buffer")),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Index Buffer")),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Mesh {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: self.indices.len() as u32,
            material,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle_normal(geometry: &Geometry, t: &[u32]) -> Vector3<f32> {
        let p = |i: u32| Vector3::from(geometry.vertices[i as usize].position);
        (p(t[1]) - p(t[0])).cross(p(t[2]) - p(t[0]))
    }

    fn centroid(geometry: &Geometry, t: &[u32]) -> Vector3<f32> {
        t.iter()
            .map(|&i| Vector3::from(geometry.vertices[i as usize].position))
            .fold(Vector3::new(0.0, 0.0, 0.0), |acc, p| acc + p)
            / 3.0
    }

    /// Every non-degenerate triangle of a convex shape centred on the origin
    /// must face away from the origin.
    fn assert_outward(geometry: &Geometry) {
        for t in geometry.indices.chunks_exact(3) {
            let n = triangle_normal(geometry, t);
            if n.magnitude() < 1e-6 {
                continue;
            }
            assert!(
                n.dot(centroid(geometry, t)) > 0.0,
                "triangle {t:?} faces inwards"
            );
        }
    }

    fn assert_finite_frames(geometry: &Geometry) {
        for v in &geometry.vertices {
            let n = Vector3::from(v.normal);
            let t = Vector3::from(v.tangent);
            let b = Vector3::from(v.bitangent);
            assert_relative_eq!(n.magnitude(), 1.0, epsilon = 1e-4);
            assert!(t.x.is_finite() && t.y.is_finite() && t.z.is_finite());
            assert!(b.x.is_finite() && b.y.is_finite() && b.z.is_finite());
            assert!(t.magnitude() > 0.5);
        }
    }

    #[test]
    fn plane_counts_and_facing() {
        let door = plane(2.0, 2.0, 100, 100);
        assert_eq!(door.vertices.len(), 101 * 101);
        assert_eq!(door.indices.len(), 100 * 100 * 6);
        for t in door.indices.chunks_exact(3) {
            assert!(triangle_normal(&door, t).z > 0.0);
        }
        assert_finite_frames(&door);
    }

    #[test]
    fn plane_spans_its_size_and_maps_the_whole_texture() {
        let ground = plane(20.0, 20.0, 1, 1);
        assert_eq!(ground.vertices.len(), 4);
        let xs: Vec<f32> = ground.vertices.iter().map(|v| v.position[0]).collect();
        assert!(xs.contains(&-10.0) && xs.contains(&10.0));
        // Top-left corner samples the top-left texel
        let top_left = ground
            .vertices
            .iter()
            .find(|v| v.position[0] < 0.0 && v.position[1] > 0.0)
            .unwrap();
        assert_eq!(top_left.tex_coords, [0.0, 0.0]);
    }

    #[test]
    fn plane_tangent_follows_u() {
        let ground = plane(1.0, 1.0, 1, 1);
        for v in &ground.vertices {
            assert_relative_eq!(v.tangent[0], 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn cuboid_is_closed_and_outward() {
        let walls = cuboid(4.0, 2.5, 4.0);
        assert_eq!(walls.vertices.len(), 24);
        assert_eq!(walls.indices.len(), 36);
        assert_outward(&walls);
        assert_finite_frames(&walls);
        let max_y = walls
            .vertices
            .iter()
            .map(|v| v.position[1])
            .fold(f32::MIN, f32::max);
        assert_relative_eq!(max_y, 1.25);
    }

    #[test]
    fn four_sided_cone_is_a_pyramid() {
        let roof = cone(4.0, 1.0, 4);
        // 4 torso triangles + 4 base triangles
        assert_eq!(roof.indices.len(), 8 * 3);
        assert_outward(&roof);
        assert_finite_frames(&roof);
        let apex = roof
            .vertices
            .iter()
            .map(|v| v.position[1])
            .fold(f32::MIN, f32::max);
        assert_relative_eq!(apex, 0.5);
    }

    #[test]
    fn sphere_vertices_lie_on_the_radius() {
        let bush = sphere(1.0, 16, 16);
        assert_eq!(bush.vertices.len(), 17 * 17);
        // Poles contribute a single triangle per segment
        assert_eq!(bush.indices.len(), (16 * 14 * 2 + 16 * 2) * 3);
        for v in &bush.vertices {
            assert_relative_eq!(Vector3::from(v.position).magnitude(), 1.0, epsilon = 1e-5);
        }
        assert_outward(&bush);
        assert_finite_frames(&bush);
    }

    #[test]
    fn wireframe_shares_edges() {
        // Two triangles sharing the diagonal of a quad
        let edges = wireframe_indices(&[0, 1, 2, 0, 2, 3]);
        assert_eq!(edges.len(), 5 * 2);
    }

    #[test]
    fn degenerate_uvs_fall_back_to_orthogonal_tangent() {
        let mut geometry = Geometry {
            vertices: vec![
                vertex(Vector3::new(0.0, 0.0, 0.0), Vector3::unit_y(), 0.0, 0.0),
                vertex(Vector3::new(1.0, 0.0, 0.0), Vector3::unit_y(), 0.0, 0.0),
                vertex(Vector3::new(0.0, 0.0, 1.0), Vector3::unit_y(), 0.0, 0.0),
            ],
            indices: vec![0, 1, 2],
        };
        geometry.compute_tangents();
        for v in &geometry.vertices {
            let t = Vector3::from(v.tangent);
            assert_relative_eq!(t.dot(Vector3::unit_y()), 0.0, epsilon = 1e-6);
            assert_relative_eq!(t.magnitude(), 1.0, epsilon = 1e-6);
        }
    }
}
