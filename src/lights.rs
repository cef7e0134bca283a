//! Light sources of the scene and their GPU representation.
//!
//! Lights are plain data that the debug panel mutates in place. Once per
//! frame they are packed into a [`LightUniform`] and written to the GPU.

use std::str::FromStr;

use anyhow::{Context, bail};
use cgmath::{InnerSpace, Quaternion, Vector3, Zero};

use crate::data_structures::instance::{Instance, euler_to_quaternion};

/// A linear RGB colour.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// `0xRRGGBB` with every channel mapped to `[0, 1]` unchanged.
    pub const fn hex(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xff) as f32 / 255.0,
            g: ((value >> 8) & 0xff) as f32 / 255.0,
            b: (value & 0xff) as f32 / 255.0,
        }
    }

    pub fn scaled(self, intensity: f32) -> [f32; 3] {
        [self.r * intensity, self.g * intensity, self.b * intensity]
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    /// Parses `#rrggbb` (the leading `#` is optional).
    fn from_str(s: &str) -> anyhow::Result<Self> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("expected a colour like #rrggbb, got {s:?}");
        }
        let value = u32::from_str_radix(digits, 16).with_context(|| format!("invalid colour {s:?}"))?;
        Ok(Color::hex(value))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

/// Parallel light shining from `position` towards `target`.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Vector3<f32>,
    /// Euler XYZ in radians. Only turns the helper, the light direction is fixed by the target.
    pub rotation: Vector3<f32>,
    pub target: Vector3<f32>,
}

impl DirectionalLight {
    /// Unit vector from the lit surface towards the light.
    pub fn direction_to_light(&self) -> Vector3<f32> {
        let offset = self.position - self.target;
        if offset.magnitude2() <= f32::EPSILON {
            return Vector3::unit_y();
        }
        offset.normalize()
    }

    /// Transform of the square helper at the light's position.
    pub fn helper_transform(&self) -> Instance {
        Instance {
            position: self.position,
            rotation: self.facing_target() * euler_to_quaternion(self.rotation.into()),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Transform that stretches a unit line along +Z from the light to its target.
    pub fn target_line_transform(&self) -> Instance {
        let length = (self.target - self.position).magnitude();
        Instance {
            position: self.position,
            rotation: self.facing_target(),
            scale: Vector3::new(1.0, 1.0, length),
        }
    }

    fn facing_target(&self) -> Quaternion<f32> {
        Quaternion::from_arc(Vector3::unit_z(), -self.direction_to_light(), None)
    }
}

/// Light radiating from a point, fading out with distance.
#[derive(Clone, Debug, PartialEq)]
pub struct PointLight {
    pub color: Color,
    pub intensity: f32,
    /// Cutoff range; zero means unlimited.
    pub distance: f32,
    pub decay: f32,
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
}

impl PointLight {
    /// Attenuation at `distance` from the light as evaluated by the shader:
    /// inverse power falloff windowed smoothly to zero at the cutoff.
    pub fn attenuation(&self, distance: f32) -> f32 {
        let falloff = 1.0 / distance.powf(self.decay).max(0.01);
        if self.distance > 0.0 {
            let window = (1.0 - (distance / self.distance).powi(4)).clamp(0.0, 1.0);
            falloff * window * window
        } else {
            falloff
        }
    }

    pub fn helper_transform(&self) -> Instance {
        Instance {
            position: self.position,
            rotation: euler_to_quaternion(self.rotation.into()),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

/// Every light of the haunted house.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneLights {
    pub ambient: AmbientLight,
    pub moon: DirectionalLight,
    pub door: PointLight,
}

impl Default for SceneLights {
    fn default() -> Self {
        Self {
            ambient: AmbientLight {
                color: Color::hex(0xffffff),
                intensity: 0.3,
            },
            moon: DirectionalLight {
                color: Color::hex(0xffffff),
                intensity: 0.3,
                position: Vector3::new(4.0, 5.0, -2.0),
                rotation: Vector3::zero(),
                target: Vector3::zero(),
            },
            door: PointLight {
                color: Color::hex(0xe67e22),
                intensity: 1.0,
                distance: 12.0,
                decay: 2.0,
                position: Vector3::new(0.0, 2.2, 2.7),
                rotation: Vector3::zero(),
            },
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    ambient: [f32; 4],
    // w: unused
    moon_direction: [f32; 4],
    moon_color: [f32; 4],
    // w: cutoff distance
    door_position: [f32; 4],
    // w: decay exponent
    door_color: [f32; 4],
}

impl From<&SceneLights> for LightUniform {
    fn from(lights: &SceneLights) -> Self {
        let [ar, ag, ab] = lights.ambient.color.scaled(lights.ambient.intensity);
        let direction = lights.moon.direction_to_light();
        let [mr, mg, mb] = lights.moon.color.scaled(lights.moon.intensity);
        let door = lights.door.position;
        let [dr, dg, db] = lights.door.color.scaled(lights.door.intensity);
        Self {
            ambient: [ar, ag, ab, 0.0],
            moon_direction: [direction.x, direction.y, direction.z, 0.0],
            moon_color: [mr, mg, mb, 0.0],
            door_position: [door.x, door.y, door.z, lights.door.distance],
            door_color: [dr, dg, db, lights.door.decay],
        }
    }
}
