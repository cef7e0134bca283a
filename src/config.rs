//! Runtime settings.
//!
//! Defaults reproduce the scene exactly. A handful of environment variables
//! (read once at start-up) override them:
//!
//! | variable | meaning |
//! |---|---|
//! | `HAUNTED_HOUSE_ASSETS` | asset root (native only) |
//! | `HAUNTED_HOUSE_GRAVES` | `1`, `true` or `yes` adds the graves |
//! | `HAUNTED_HOUSE_GRAVE_COUNT` | number of graves scattered |
//! | `HAUNTED_HOUSE_SEED` | seed for a reproducible grave scatter |
//! | `HAUNTED_HOUSE_MAX_PIXEL_RATIO` | cap of the device pixel ratio |

use std::str::FromStr;

use winit::dpi::PhysicalSize;

const PREFIX: &str = "HAUNTED_HOUSE_";

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub asset_root: String,
    pub graves: bool,
    pub grave_count: usize,
    /// `None` seeds the scatter from entropy.
    pub seed: Option<u64>,
    pub max_pixel_ratio: f64,
    pub title: String,
    /// CSS selector of the canvas on the web.
    pub canvas_selector: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            asset_root: "assets".to_string(),
            graves: false,
            grave_count: 50,
            seed: None,
            max_pixel_ratio: 2.0,
            title: "Haunted House".to_string(),
            canvas_selector: "canvas.webgl".to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build settings from `(name, value)` pairs. Unknown names are ignored,
    /// malformed values are logged and keep their default.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();
            match name {
                "ASSETS" if !value.is_empty() => settings.asset_root = value.to_string(),
                "GRAVES" => settings.graves = parse_flag(value),
                "GRAVE_COUNT" => parse_into(name, value, &mut settings.grave_count),
                "SEED" => match value.parse() {
                    Ok(seed) => settings.seed = Some(seed),
                    Err(_) => log::warn!("Ignoring {PREFIX}{name}={value}: not a valid seed"),
                },
                "MAX_PIXEL_RATIO" => {
                    let mut ratio = settings.max_pixel_ratio;
                    parse_into(name, value, &mut ratio);
                    if ratio.is_finite() && ratio > 0.0 {
                        settings.max_pixel_ratio = ratio;
                    } else {
                        log::warn!("Ignoring {PREFIX}{name}={value}: must be positive");
                    }
                }
                _ => log::debug!("Unknown setting {PREFIX}{name}"),
            }
        }
        settings
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_into<T: FromStr>(name: &str, value: &str, target: &mut T) {
    match value.parse() {
        Ok(parsed) => *target = parsed,
        Err(_) => log::warn!("Ignoring {PREFIX}{name}={value}: not a valid value"),
    }
}

/// Size of the drawing buffer for a window of `physical` pixels whose device
/// pixel ratio is `scale_factor`, with the ratio capped at `max_ratio`.
pub fn drawing_buffer_size(
    physical: PhysicalSize<u32>,
    scale_factor: f64,
    max_ratio: f64,
) -> PhysicalSize<u32> {
    if scale_factor <= max_ratio || scale_factor <= 0.0 {
        return physical;
    }
    let logical = physical.to_logical::<f64>(scale_factor);
    logical.to_physical(max_ratio)
}
