//! Instance transformation data for GPU rendering.
//!
//! Per-instance data like position, rotation, and scale is stored as
//! GPU buffers and passed to shaders so that shared geometry (the bushes,
//! the graves) is drawn with a single instanced call.

use std::ops::Mul;

use cgmath::{Euler, One, Rad, SquareMatrix};

use crate::data_structures::model;

/// Per-instance transformation: position, rotation (as quaternion), and scale.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        cgmath::Vector3::new(x, y, z).into()
    }

    /// Rotation given as Euler angles in radians, applied in X, Y, Z order.
    pub fn with_euler(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = euler_to_quaternion([x, y, z]);
        self
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = cgmath::Vector3::new(scale, scale, scale);
        self
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        let world_matrix = self.to_matrix();
        let handedness = world_matrix.determinant().signum();
        InstanceRaw {
            model: world_matrix.into(),
            normal: cgmath::Matrix3::from(self.rotation).into(),
            handedness,
        }
    }
}

pub fn euler_to_quaternion(angles: [f32; 3]) -> cgmath::Quaternion<f32> {
    Euler::new(Rad(angles[0]), Rad(angles[1]), Rad(angles[2])).into()
}

impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    fn mul(self, rhs: &'b Instance) -> Self::Output {
        let new_rotation = self.rotation * rhs.rotation;

        let new_scale = cgmath::Vector3::new(
            self.scale.x * rhs.scale.x,
            self.scale.y * rhs.scale.y,
            self.scale.z * rhs.scale.z,
        );
        let scaled_rhs_pos = cgmath::Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        let new_position = self.position + (self.rotation * scaled_rhs_pos);

        Instance {
            position: new_position,
            rotation: new_rotation,
            scale: new_scale,
        }
    }
}

impl Mul<Instance> for Instance {
    type Output = Self;

    fn mul(self, rhs: Instance) -> Self::Output {
        &self * &rhs
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
    handedness: f32,
}

/**
 * As we store vertex data directly in the GPU memory we need to tell what the bytes refer to:
 *
 * offset: zero as we want to use the full space.
 * stride: length of an instance
 *
 * Stride layout here: position + rotation + scale as 4x4 matrix (hence the four 4d vectors),
 * followed by the rotation-only normal matrix and the sign of the determinant.
 */
impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // Shaders only advance to the next instance when a new instance starts
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // A mat4 takes up 4 vertex slots as it is technically 4 vec4s.
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 25]>() as wgpu::BufferAddress,
                    shader_location: 12,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{InnerSpace, Vector3};
    use std::f32::consts::PI;

    #[test]
    fn parent_scale_and_rotation_apply_to_child_position() {
        let parent = Instance::at(0.0, 1.0, 0.0)
            .with_euler(0.0, PI * 0.5, 0.0)
            .with_uniform_scale(2.0);
        let child = Instance::at(1.0, 0.0, 0.0);

        let world = &parent * &child;

        // +X rotated a quarter turn about Y points to -Z
        assert_relative_eq!(world.position.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(world.position.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(world.position.z, -2.0, epsilon = 1e-5);
        assert_relative_eq!(world.scale.x, 2.0);
    }

    #[test]
    fn identity_is_neutral() {
        let child = Instance::at(3.0, -1.0, 0.5).with_euler(0.3, 0.2, 0.1);
        let world = Instance::new() * child.clone();
        assert_relative_eq!((world.position - child.position).magnitude(), 0.0);
        assert_relative_eq!(world.rotation.s, child.rotation.s, epsilon = 1e-6);
    }

    #[test]
    fn ground_rotation_turns_plane_normal_up() {
        let ground = Instance::new().with_euler(-PI * 0.5, 0.0, 0.0);
        let normal = ground.rotation * Vector3::unit_z();
        assert_relative_eq!(normal.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn mirrored_scale_flips_handedness() {
        let mut mirrored = Instance::new();
        mirrored.scale.x = -1.0;
        assert_eq!(mirrored.to_raw().handedness, -1.0);
        assert_eq!(Instance::new().to_raw().handedness, 1.0);
    }
}
