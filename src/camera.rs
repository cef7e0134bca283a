//! Perspective camera orbiting a target point.
//!
//! The [`OrbitController`] mirrors the usual "orbit controls" behaviour:
//! left drag rotates around the target, middle drag and the wheel dolly
//! towards or away from it, right drag pans the target in screen space.
//! Input is accumulated while events arrive and applied once per frame in
//! [`OrbitController::update`].

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const EPS: f32 = 0.000001;

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: P, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    /// Start pose of the scene: on the (5, 5, 5) diagonal, looking at the origin.
    pub fn scene_start() -> Self {
        Self::new((5.0, 5.0, 5.0), (0.0, 0.0, 0.0))
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    /// Unit vectors pointing right and up on screen.
    fn screen_axes(&self) -> (Vector3<f32>, Vector3<f32>) {
        let forward = (self.target - self.position).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward);
        (right, up)
    }
}

#[derive(Clone, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Spherical coordinates with the polar angle measured from +Y.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
}

impl Spherical {
    pub fn from_vector(v: Vector3<f32>) -> Self {
        let radius = v.magnitude();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_vector(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Drag {
    Rotate,
    Dolly,
    Pan,
}

#[derive(Clone, Debug)]
pub struct OrbitController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub enable_damping: bool,
    pub damping_factor: f32,
    spherical_delta: Spherical,
    scale: f32,
    pan_offset: Vector3<f32>,
    drag: Option<Drag>,
    cursor: Option<PhysicalPosition<f64>>,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new()
    }
}

impl OrbitController {
    pub fn new() -> Self {
        Self {
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            enable_damping: false,
            damping_factor: 0.05,
            spherical_delta: Spherical::default(),
            scale: 1.0,
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
            drag: None,
            cursor: None,
        }
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.zoom_speed)
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    /// Move closer to the target by `dolly_scale` (< 1).
    pub fn dolly_in(&mut self, dolly_scale: f32) {
        self.scale *= dolly_scale;
    }

    pub fn dolly_out(&mut self, dolly_scale: f32) {
        self.scale /= dolly_scale;
    }

    /// Pan by a screen-space pixel delta so the scene follows the cursor.
    pub fn pan(
        &mut self,
        delta_x: f32,
        delta_y: f32,
        camera: &Camera,
        projection: &Projection,
        viewport_height: f32,
    ) {
        let (right, up) = camera.screen_axes();
        let target_distance =
            (camera.position - camera.target).magnitude() * (projection.fovy().0 / 2.0).tan();
        let height = viewport_height.max(1.0);
        self.pan_offset += right * (-2.0 * delta_x * target_distance / height);
        self.pan_offset += up * (2.0 * delta_y * target_distance / height);
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Feed a window event. Returns true if the event moved the camera.
    pub fn handle_window_events(
        &mut self,
        event: &WindowEvent,
        camera: &Camera,
        projection: &Projection,
        viewport_height: f32,
    ) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let drag = match button {
                    MouseButton::Left => Drag::Rotate,
                    MouseButton::Middle => Drag::Dolly,
                    MouseButton::Right => Drag::Pan,
                    _ => return false,
                };
                match state {
                    ElementState::Pressed => self.drag = Some(drag),
                    ElementState::Released if self.drag == Some(drag) => self.drag = None,
                    ElementState::Released => (),
                }
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                let last = self.cursor.replace(*position);
                let (Some(drag), Some(last)) = (self.drag, last) else {
                    return false;
                };
                let dx = (position.x - last.x) as f32;
                let dy = (position.y - last.y) as f32;
                self.on_drag(drag, dx, dy, camera, projection, viewport_height);
                dx != 0.0 || dy != 0.0
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
                };
                if scroll > 0.0 {
                    self.dolly_in(self.zoom_scale());
                } else if scroll < 0.0 {
                    self.dolly_out(self.zoom_scale());
                }
                scroll != 0.0
            }
            _ => false,
        }
    }

    fn on_drag(
        &mut self,
        drag: Drag,
        dx: f32,
        dy: f32,
        camera: &Camera,
        projection: &Projection,
        viewport_height: f32,
    ) {
        let height = viewport_height.max(1.0);
        match drag {
            Drag::Rotate => {
                self.rotate_left(2.0 * PI * dx * self.rotate_speed / height);
                self.rotate_up(2.0 * PI * dy * self.rotate_speed / height);
            }
            Drag::Dolly => {
                if dy > 0.0 {
                    self.dolly_out(self.zoom_scale());
                } else if dy < 0.0 {
                    self.dolly_in(self.zoom_scale());
                }
            }
            Drag::Pan => self.pan(
                dx * self.pan_speed,
                dy * self.pan_speed,
                camera,
                projection,
                viewport_height,
            ),
        }
    }

    /// Apply the accumulated input to `camera`. Returns true if it moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        let offset = camera.position - camera.target;
        let mut spherical = Spherical::from_vector(offset);

        spherical.theta += self.spherical_delta.theta * factor;
        spherical.phi += self.spherical_delta.phi * factor;
        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(EPS, PI - EPS);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        let target = camera.target + self.pan_offset * factor;
        let position = target + spherical.to_vector();
        let moved = (position - camera.position).magnitude2() > EPS
            || (target - camera.target).magnitude2() > EPS;
        camera.target = target;
        camera.position = position;

        if self.enable_damping {
            self.spherical_delta.theta *= 1.0 - self.damping_factor;
            self.spherical_delta.phi *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vector3::new(0.0, 0.0, 0.0);
        }
        self.scale = 1.0;
        moved
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, camera: Camera, projection: &Projection) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            controller: OrbitController::new(),
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write_to_buffer(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{Deg, EuclideanSpace};
    use winit::event::DeviceId;

    fn scene_camera() -> (Camera, Projection) {
        (
            Camera::scene_start(),
            Projection::new(800, 600, Deg(50.0), 0.1, 1000.0),
        )
    }

    fn distance(camera: &Camera) -> f32 {
        (camera.position - camera.target).magnitude()
    }

    #[test]
    fn scene_starts_on_the_diagonal_facing_the_door_corner() {
        let camera = Camera::scene_start();
        assert_eq!(camera.position, Point3::new(5.0, 5.0, 5.0));
        assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));
        // The door faces +Z and the side wall +X, both are in view
        let forward = (camera.target - camera.position).normalize();
        assert!(forward.x < 0.0 && forward.z < 0.0);
    }

    #[test]
    fn spherical_round_trip_keeps_the_offset() {
        let offset = Vector3::new(5.0, 5.0, 5.0);
        let back = Spherical::from_vector(offset).to_vector();
        assert_relative_eq!(back.x, offset.x, epsilon = 1e-4);
        assert_relative_eq!(back.y, offset.y, epsilon = 1e-4);
        assert_relative_eq!(back.z, offset.z, epsilon = 1e-4);
    }

    #[test]
    fn update_without_input_keeps_the_camera() {
        let (mut camera, _) = scene_camera();
        let mut controller = OrbitController::new();
        assert!(!controller.update(&mut camera));
        assert_relative_eq!(camera.position.x, 5.0, epsilon = 1e-4);
        assert_relative_eq!(camera.position.y, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn wheel_up_dollies_in() {
        let (mut camera, projection) = scene_camera();
        let before = distance(&camera);
        let mut controller = OrbitController::new();
        let wheel = WindowEvent::MouseWheel {
            device_id: unsafe { DeviceId::dummy() },
            delta: MouseScrollDelta::LineDelta(0.0, 1.0),
            phase: winit::event::TouchPhase::Moved,
        };
        assert!(controller.handle_window_events(&wheel, &camera, &projection, 600.0));
        controller.update(&mut camera);
        assert_relative_eq!(distance(&camera), before * 0.95, epsilon = 1e-4);
    }

    #[test]
    fn dolly_out_and_in_cancel() {
        let (mut camera, _) = scene_camera();
        let before = distance(&camera);
        let mut controller = OrbitController::new();
        controller.dolly_out(0.95);
        controller.dolly_in(0.95);
        controller.update(&mut camera);
        assert_relative_eq!(distance(&camera), before, epsilon = 1e-4);
    }

    #[test]
    fn rotation_orbits_at_constant_distance() {
        let (mut camera, _) = scene_camera();
        let before = distance(&camera);
        let mut controller = OrbitController::new();
        controller.rotate_left(PI / 2.0);
        assert!(controller.update(&mut camera));
        assert_relative_eq!(distance(&camera), before, epsilon = 1e-4);
        assert_relative_eq!(camera.position.y, 5.0, epsilon = 1e-4);
        assert_eq!(camera.target, Point3::origin());
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let (mut camera, _) = scene_camera();
        let mut controller = OrbitController::new();
        controller.rotate_up(10.0);
        controller.update(&mut camera);
        let spherical = Spherical::from_vector(camera.position - camera.target);
        assert!(spherical.phi > 0.0);
        assert!(camera.position.x.is_finite());
        assert!(camera.position.y > 0.0);
    }

    #[test]
    fn panning_moves_target_and_camera_together() {
        let (mut camera, projection) = scene_camera();
        let offset_before = camera.position - camera.target;
        let mut controller = OrbitController::new();
        controller.pan(100.0, 0.0, &camera, &projection, 600.0);
        controller.update(&mut camera);
        let offset_after = camera.position - camera.target;
        assert_relative_eq!(offset_after.x, offset_before.x, epsilon = 1e-4);
        assert_relative_eq!(offset_after.z, offset_before.z, epsilon = 1e-4);
        // Dragging right moves the target to the camera's left
        let (right, _) = Camera::new((5.0, 5.0, 5.0), (0.0, 0.0, 0.0)).screen_axes();
        assert!(camera.target.to_vec().dot(right) < 0.0);
    }

    #[test]
    fn left_drag_rotates() {
        let (mut camera, projection) = scene_camera();
        let mut controller = OrbitController::new();
        let device_id = unsafe { DeviceId::dummy() };
        let at = |x: f64, y: f64| WindowEvent::CursorMoved {
            device_id,
            position: PhysicalPosition::new(x, y),
        };
        controller.handle_window_events(&at(100.0, 100.0), &camera, &projection, 600.0);
        controller.handle_window_events(
            &WindowEvent::MouseInput {
                device_id,
                state: ElementState::Pressed,
                button: MouseButton::Left,
            },
            &camera,
            &projection,
            600.0,
        );
        assert!(controller.is_dragging());
        assert!(controller.handle_window_events(&at(160.0, 100.0), &camera, &projection, 600.0));
        assert!(controller.update(&mut camera));
        assert_relative_eq!(camera.position.y, 5.0, epsilon = 1e-4);
    }
}
