//! Debug panel for the lights.
//!
//! A small immediate-style panel in the top-right corner with one folder per
//! light. Every slider is a direct binding to a light field: moving it writes
//! the clamped value into [`SceneLights`] and nothing else. Folders start
//! collapsed, `h` hides the whole panel.
//!
//! Geometry is laid out in physical window pixels and converted to normalized
//! device coordinates when the quads are built.

use instant::Duration;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, WindowEvent},
    keyboard::{Key, NamedKey},
};

use crate::{
    context::{Context, InitContext},
    flow::{GraphicsFlow, Out},
    house::SceneState,
    lights::SceneLights,
    pipelines::gui::GuiVertex,
    render::{Flat, Render},
};

/// Width in logical pixels.
pub const PANEL_WIDTH: f32 = 245.0;
pub const ROW_HEIGHT: f32 = 27.0;
/// Share of a slider row taken by its label.
const LABEL_SHARE: f32 = 0.4;
const PADDING: f32 = 4.0;
const MAX_QUADS: usize = 96;

const BACKGROUND: [f32; 4] = [0.1, 0.1, 0.1, 0.9];
const TITLE: [f32; 4] = [0.0, 0.0, 0.0, 0.95];
const TITLE_OPEN: [f32; 4] = [0.07, 0.07, 0.07, 0.95];
const TRACK: [f32; 4] = [0.19, 0.19, 0.19, 1.0];
const FILL: [f32; 4] = [0.18, 0.63, 0.84, 1.0];
const SELECTED: [f32; 4] = [0.9, 0.9, 0.9, 1.0];

pub type Binding = fn(&mut SceneLights) -> &mut f32;

#[derive(Clone, Copy)]
pub struct Slider {
    pub label: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    binding: Binding,
}

impl std::fmt::Debug for Slider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slider")
            .field("label", &self.label)
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

impl Slider {
    pub fn new(label: &'static str, min: f32, max: f32, binding: Binding) -> Self {
        Self {
            label,
            min,
            max,
            step: 0.1,
            binding,
        }
    }

    pub fn get(&self, lights: &mut SceneLights) -> f32 {
        *(self.binding)(lights)
    }

    /// Assign `value` clamped to the slider range and return what was written.
    pub fn set(&self, lights: &mut SceneLights, value: f32) -> f32 {
        let value = value.clamp(self.min, self.max);
        *(self.binding)(lights) = value;
        value
    }

    /// Position of `value` inside the range, in [0, 1].
    pub fn fraction(&self, value: f32) -> f32 {
        if self.max <= self.min {
            return 0.0;
        }
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug)]
pub struct Folder {
    pub title: &'static str,
    pub open: bool,
    pub sliders: Vec<Slider>,
}

/// Which part of the panel a row shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Row {
    Title(usize),
    Slider(usize, usize),
}

/// Axis aligned rectangle in physical pixels, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.w && y >= self.y && y < self.y + self.h
    }
}

/// Window metrics the layout depends on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl Viewport {
    fn of(ctx: &Context) -> Self {
        let size = ctx.window().inner_size();
        Self {
            width: size.width as f32,
            height: size.height as f32,
            scale: ctx.window().scale_factor() as f32,
        }
    }
}

macro_rules! light_folder {
    ($title:expr, $light:ident) => {
        Folder {
            title: $title,
            open: false,
            sliders: vec![
                Slider::new("position.x", -5.0, 5.0, |l| &mut l.$light.position.x),
                Slider::new("position.y", -5.0, 5.0, |l| &mut l.$light.position.y),
                Slider::new("position.z", -5.0, 5.0, |l| &mut l.$light.position.z),
                Slider::new("rotation.x", -5.0, 5.0, |l| &mut l.$light.rotation.x),
                Slider::new("rotation.y", -5.0, 5.0, |l| &mut l.$light.rotation.y),
                Slider::new("rotation.z", -5.0, 5.0, |l| &mut l.$light.rotation.z),
            ],
        }
    };
}

#[derive(Clone, Debug)]
pub struct DebugPanel {
    pub folders: Vec<Folder>,
    pub visible: bool,
    selected: Option<(usize, usize)>,
    dragging: Option<(usize, usize)>,
    cursor: Option<PhysicalPosition<f64>>,
}

impl Default for DebugPanel {
    fn default() -> Self {
        Self::new(vec![
            light_folder!("Moon light", moon),
            light_folder!("Door light", door),
        ])
    }
}

impl DebugPanel {
    pub fn new(folders: Vec<Folder>) -> Self {
        Self {
            folders,
            visible: true,
            selected: None,
            dragging: None,
            cursor: None,
        }
    }

    pub fn slider(&self, folder: usize, slider: usize) -> Option<&Slider> {
        self.folders.get(folder)?.sliders.get(slider)
    }

    pub fn selected(&self) -> Option<(usize, usize)> {
        self.selected
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    pub fn toggle(&mut self, folder: usize) {
        if let Some(f) = self.folders.get_mut(folder) {
            f.open = !f.open;
            if !f.open && self.selected.is_some_and(|(sf, _)| sf == folder) {
                self.selected = None;
            }
        }
    }

    /// Rows from top to bottom with their rectangles. Empty when hidden.
    pub fn layout(&self, viewport: Viewport) -> Vec<(Row, Rect)> {
        if !self.visible {
            return Vec::new();
        }
        let width = PANEL_WIDTH * viewport.scale;
        let height = ROW_HEIGHT * viewport.scale;
        let x = viewport.width - width;
        let mut y = 0.0;
        let mut rows = Vec::new();
        for (f, folder) in self.folders.iter().enumerate() {
            rows.push((Row::Title(f), Rect { x, y, w: width, h: height }));
            y += height;
            if !folder.open {
                continue;
            }
            for s in 0..folder.sliders.len() {
                rows.push((Row::Slider(f, s), Rect { x, y, w: width, h: height }));
                y += height;
            }
        }
        rows
    }

    pub fn hit(&self, x: f32, y: f32, viewport: Viewport) -> Option<Row> {
        self.layout(viewport)
            .into_iter()
            .find(|(_, rect)| rect.contains(x, y))
            .map(|(row, _)| row)
    }

    /// Part of a slider row that maps to the value range.
    fn track(row: Rect, scale: f32) -> Rect {
        let padding = PADDING * scale;
        let left = row.x + row.w * LABEL_SHARE;
        Rect {
            x: left,
            y: row.y + padding,
            w: (row.x + row.w - padding - left).max(1.0),
            h: (row.h - 2.0 * padding).max(1.0),
        }
    }

    fn slider_rect(&self, folder: usize, slider: usize, viewport: Viewport) -> Option<Rect> {
        self.layout(viewport)
            .into_iter()
            .find(|(row, _)| *row == Row::Slider(folder, slider))
            .map(|(_, rect)| rect)
    }

    /// Set the dragged slider from the cursor's horizontal position.
    fn drag_to(&self, (f, s): (usize, usize), x: f32, viewport: Viewport, lights: &mut SceneLights) {
        let (Some(slider), Some(rect)) = (self.slider(f, s), self.slider_rect(f, s, viewport)) else {
            return;
        };
        let track = Self::track(rect, viewport.scale);
        let fraction = ((x - track.x) / track.w).clamp(0.0, 1.0);
        slider.set(lights, slider.min + fraction * (slider.max - slider.min));
    }

    /// Sliders reachable by keyboard, in display order.
    fn visible_sliders(&self) -> Vec<(usize, usize)> {
        self.folders
            .iter()
            .enumerate()
            .filter(|(_, folder)| folder.open)
            .flat_map(|(f, folder)| (0..folder.sliders.len()).map(move |s| (f, s)))
            .collect()
    }

    fn select_next(&mut self, forward: bool) {
        let sliders = self.visible_sliders();
        if sliders.is_empty() {
            self.selected = None;
            return;
        }
        let next = match self.selected.and_then(|current| sliders.iter().position(|s| *s == current)) {
            Some(idx) if forward => (idx + 1) % sliders.len(),
            Some(idx) => (idx + sliders.len() - 1) % sliders.len(),
            None if forward => 0,
            None => sliders.len() - 1,
        };
        self.selected = Some(sliders[next]);
    }

    fn nudge(&self, lights: &mut SceneLights, steps: f32) {
        if let Some(slider) = self.selected.and_then(|(f, s)| self.slider(f, s)) {
            let value = slider.get(lights);
            slider.set(lights, value + steps * slider.step);
        }
    }

    /// Feed a window event. Returns true if the panel consumed it.
    pub fn handle_event(
        &mut self,
        event: &WindowEvent,
        lights: &mut SceneLights,
        viewport: Viewport,
    ) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some(*position);
                match self.dragging {
                    Some(dragged) => {
                        self.drag_to(dragged, position.x as f32, viewport, lights);
                        true
                    }
                    None => false,
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                false
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if *state == ElementState::Released {
                    return *button == MouseButton::Left && self.dragging.take().is_some();
                }
                let Some(row) = self.hovered(viewport) else {
                    return false;
                };
                if *button == MouseButton::Left {
                    match row {
                        Row::Title(f) => self.toggle(f),
                        Row::Slider(f, s) => {
                            self.selected = Some((f, s));
                            // The label only selects, dragging starts on the track
                            let on_track = self
                                .cursor
                                .zip(self.slider_rect(f, s, viewport))
                                .is_some_and(|(cursor, rect)| {
                                    cursor.x as f32 >= Self::track(rect, viewport.scale).x
                                });
                            if let (true, Some(cursor)) = (on_track, self.cursor) {
                                self.dragging = Some((f, s));
                                self.drag_to((f, s), cursor.x as f32, viewport, lights);
                            }
                        }
                    }
                }
                true
            }
            WindowEvent::MouseWheel { .. } => self.hovered(viewport).is_some(),
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match &event.logical_key {
                    Key::Character(c) if c.eq_ignore_ascii_case("h") => {
                        self.visible = !self.visible;
                        self.dragging = None;
                        true
                    }
                    Key::Named(named) if self.visible => match named {
                        NamedKey::ArrowDown => {
                            self.select_next(true);
                            true
                        }
                        NamedKey::ArrowUp => {
                            self.select_next(false);
                            true
                        }
                        NamedKey::ArrowRight if self.selected.is_some() => {
                            self.nudge(lights, 1.0);
                            true
                        }
                        NamedKey::ArrowLeft if self.selected.is_some() => {
                            self.nudge(lights, -1.0);
                            true
                        }
                        _ => false,
                    },
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn hovered(&self, viewport: Viewport) -> Option<Row> {
        let cursor = self.cursor?;
        self.hit(cursor.x as f32, cursor.y as f32, viewport)
    }

    /// Label and value of the selected slider, e.g. `Door light position.y = 2.20`.
    pub fn status(&self, lights: &mut SceneLights) -> Option<String> {
        let (f, s) = self.selected?;
        let folder = self.folders.get(f)?;
        let slider = folder.sliders.get(s)?;
        Some(format!(
            "{} {} = {:.2}",
            folder.title,
            slider.label,
            slider.get(lights)
        ))
    }

    /// Coloured quads of the panel as vertices and `u16` indices.
    pub fn quads(&self, lights: &mut SceneLights, viewport: Viewport) -> (Vec<GuiVertex>, Vec<u16>) {
        let mut quads: Vec<(Rect, [f32; 4])> = Vec::new();
        let rows = self.layout(viewport);
        if let (Some((_, first)), Some((_, last))) = (rows.first(), rows.last()) {
            quads.push((
                Rect {
                    h: last.y + last.h - first.y,
                    ..*first
                },
                BACKGROUND,
            ));
        }
        for (row, rect) in rows {
            match row {
                Row::Title(f) => {
                    let open = self.folders.get(f).is_some_and(|folder| folder.open);
                    quads.push((rect, if open { TITLE_OPEN } else { TITLE }));
                }
                Row::Slider(f, s) => {
                    let Some(slider) = self.slider(f, s) else {
                        continue;
                    };
                    let track = Self::track(rect, viewport.scale);
                    quads.push((track, TRACK));
                    let fraction = slider.fraction(slider.get(lights));
                    if fraction > 0.0 {
                        quads.push((
                            Rect {
                                w: track.w * fraction,
                                ..track
                            },
                            FILL,
                        ));
                    }
                    if self.selected == Some((f, s)) {
                        quads.push((
                            Rect {
                                w: 3.0 * viewport.scale,
                                ..rect
                            },
                            SELECTED,
                        ));
                    }
                }
            }
        }
        quads.truncate(MAX_QUADS);

        let mut vertices = Vec::with_capacity(quads.len() * 4);
        let mut indices = Vec::with_capacity(quads.len() * 6);
        let ndc = |x: f32, y: f32| {
            [
                x / viewport.width.max(1.0) * 2.0 - 1.0,
                1.0 - y / viewport.height.max(1.0) * 2.0,
            ]
        };
        for (rect, color) in quads {
            let start = vertices.len() as u16;
            for (x, y) in [
                (rect.x, rect.y),
                (rect.x, rect.y + rect.h),
                (rect.x + rect.w, rect.y + rect.h),
                (rect.x + rect.w, rect.y),
            ] {
                vertices.push(GuiVertex {
                    position: ndc(x, y),
                    color,
                });
            }
            indices.extend_from_slice(&[start, start + 1, start + 2, start, start + 2, start + 3]);
        }
        (vertices, indices)
    }
}

/// The debug panel as a flow: edits [`SceneState::lights`] and shows the
/// selected slider in the window title.
pub struct DebugPanelFlow {
    panel: DebugPanel,
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    indices: usize,
    title: String,
    shown_title: String,
}

impl DebugPanelFlow {
    pub fn new(ctx: &InitContext) -> Self {
        use wgpu::util::DeviceExt;

        let vertex = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Panel Vertex Buffer"),
            contents: bytemuck::cast_slice(&[GuiVertex {
                position: [0.0; 2],
                color: [0.0; 4],
            }; MAX_QUADS * 4]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let index = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Panel Index Buffer"),
            contents: bytemuck::cast_slice(&[0u16; MAX_QUADS * 6]),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            panel: DebugPanel::default(),
            vertex,
            index,
            indices: 0,
            title: ctx.settings.title.clone(),
            shown_title: ctx.settings.title.clone(),
        }
    }
}

impl GraphicsFlow<SceneState> for DebugPanelFlow {
    fn on_init(&mut self, _: &mut Context, _: &mut SceneState) {}

    fn on_update(&mut self, ctx: &Context, state: &mut SceneState, _: Duration) {
        let (vertices, indices) = self.panel.quads(&mut state.lights, Viewport::of(ctx));
        if !indices.is_empty() {
            ctx.queue
                .write_buffer(&self.vertex, 0, bytemuck::cast_slice(&vertices));
            ctx.queue
                .write_buffer(&self.index, 0, bytemuck::cast_slice(&indices));
        }
        self.indices = indices.len();

        let title = match self.panel.status(&mut state.lights) {
            Some(status) if self.panel.visible => format!("{} | {status}", self.title),
            _ => self.title.clone(),
        };
        if title != self.shown_title {
            ctx.window().set_title(&title);
            self.shown_title = title;
        }
    }

    fn on_window_events(&mut self, ctx: &Context, state: &mut SceneState, event: &WindowEvent) -> Out {
        if self
            .panel
            .handle_event(event, &mut state.lights, Viewport::of(ctx))
        {
            Out::Consumed
        } else {
            Out::Empty
        }
    }

    fn on_render(&self) -> Render<'_> {
        if self.indices == 0 {
            return Render::None;
        }
        Render::GUI(Flat {
            vertex: &self.vertex,
            index: &self.index,
            amount: self.indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    const VIEWPORT: Viewport = Viewport {
        width: 1000.0,
        height: 800.0,
        scale: 1.0,
    };

    fn centre(rect: Rect) -> (f32, f32) {
        (rect.x + rect.w / 2.0, rect.y + rect.h / 2.0)
    }

    fn row_rect(panel: &DebugPanel, row: Row) -> Rect {
        panel
            .layout(VIEWPORT)
            .into_iter()
            .find(|(r, _)| *r == row)
            .map(|(_, rect)| rect)
            .unwrap()
    }

    #[test]
    fn two_folders_of_six_sliders() {
        let panel = DebugPanel::default();
        let titles: Vec<_> = panel.folders.iter().map(|f| f.title).collect();
        assert_eq!(titles, ["Moon light", "Door light"]);
        for folder in &panel.folders {
            assert_eq!(folder.sliders.len(), 6);
            assert!(folder.sliders.iter().all(|s| s.min == -5.0 && s.max == 5.0));
        }
    }

    #[test]
    fn sliders_assign_directly_and_clamp() {
        let panel = DebugPanel::default();
        let mut lights = SceneLights::default();
        let before = lights.clone();

        let door_y = panel.slider(1, 1).unwrap();
        assert_eq!(door_y.get(&mut lights), 2.2);
        assert_eq!(door_y.set(&mut lights, 3.5), 3.5);
        assert_eq!(lights.door.position, Vector3::new(0.0, 3.5, 2.7));
        // Everything else is untouched
        assert_eq!(lights.moon, before.moon);
        assert_eq!(lights.door.intensity, before.door.intensity);

        let moon_rot_z = panel.slider(0, 5).unwrap();
        assert_eq!(moon_rot_z.set(&mut lights, 12.0), 5.0);
        assert_eq!(lights.moon.rotation.z, 5.0);
        assert_eq!(moon_rot_z.set(&mut lights, -7.0), -5.0);
    }

    #[test]
    fn panel_sits_in_the_top_right_corner() {
        let panel = DebugPanel::default();
        let rows = panel.layout(VIEWPORT);
        // Collapsed: only the titles
        assert_eq!(rows.len(), 2);
        let (_, first) = rows[0];
        assert_eq!(first.x + first.w, VIEWPORT.width);
        assert_eq!(first.y, 0.0);
        assert!(panel.hit(10.0, 10.0, VIEWPORT).is_none());
    }

    #[test]
    fn clicking_a_title_toggles_the_folder() {
        let mut panel = DebugPanel::default();
        let mut lights = SceneLights::default();
        let (x, y) = centre(row_rect(&panel, Row::Title(1)));
        let moved = WindowEvent::CursorMoved {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            position: PhysicalPosition::new(x as f64, y as f64),
        };
        let press = WindowEvent::MouseInput {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            state: ElementState::Pressed,
            button: MouseButton::Left,
        };
        assert!(!panel.handle_event(&moved, &mut lights, VIEWPORT));
        assert!(panel.handle_event(&press, &mut lights, VIEWPORT));
        assert!(panel.folders[1].open);
        assert_eq!(panel.layout(VIEWPORT).len(), 8);
        assert!(panel.handle_event(&press, &mut lights, VIEWPORT));
        assert!(!panel.folders[1].open);
    }

    #[test]
    fn dragging_a_slider_sets_the_value() {
        let mut panel = DebugPanel::default();
        panel.toggle(0);
        let mut lights = SceneLights::default();
        let rect = row_rect(&panel, Row::Slider(0, 0));
        let track = DebugPanel::track(rect, 1.0);
        let device_id = unsafe { winit::event::DeviceId::dummy() };
        let at = |x: f32| WindowEvent::CursorMoved {
            device_id,
            position: PhysicalPosition::new(x as f64, (rect.y + rect.h / 2.0) as f64),
        };
        let button = |state| WindowEvent::MouseInput {
            device_id,
            state,
            button: MouseButton::Left,
        };

        panel.handle_event(&at(track.x + track.w / 2.0), &mut lights, VIEWPORT);
        assert!(panel.handle_event(&button(ElementState::Pressed), &mut lights, VIEWPORT));
        assert!(panel.is_dragging());
        assert!((lights.moon.position.x - 0.0).abs() < 1e-3);

        // Dragging past the end clamps to the maximum
        assert!(panel.handle_event(&at(VIEWPORT.width + 50.0), &mut lights, VIEWPORT));
        assert_eq!(lights.moon.position.x, 5.0);

        assert!(panel.handle_event(&button(ElementState::Released), &mut lights, VIEWPORT));
        assert!(!panel.is_dragging());
        assert!(!panel.handle_event(&at(10.0), &mut lights, VIEWPORT));
        assert_eq!(lights.moon.position.x, 5.0);
    }

    #[test]
    fn pressing_a_label_selects_without_changing_the_value() {
        let mut panel = DebugPanel::default();
        panel.toggle(1);
        let mut lights = SceneLights::default();
        let rect = row_rect(&panel, Row::Slider(1, 1));
        let device_id = unsafe { winit::event::DeviceId::dummy() };
        let moved = WindowEvent::CursorMoved {
            device_id,
            position: PhysicalPosition::new((rect.x + 10.0) as f64, (rect.y + rect.h / 2.0) as f64),
        };
        let press = WindowEvent::MouseInput {
            device_id,
            state: ElementState::Pressed,
            button: MouseButton::Left,
        };
        panel.handle_event(&moved, &mut lights, VIEWPORT);
        assert!(panel.handle_event(&press, &mut lights, VIEWPORT));
        assert_eq!(lights.door.position.y, 2.2);
        assert_eq!(panel.selected(), Some((1, 1)));
        assert!(!panel.is_dragging());
    }

    #[test]
    fn hidden_panel_consumes_no_pointer_events() {
        let mut panel = DebugPanel::default();
        panel.visible = false;
        let mut lights = SceneLights::default();
        let (x, y) = centre(row_rect(&DebugPanel::default(), Row::Title(0)));
        let device_id = unsafe { winit::event::DeviceId::dummy() };
        let moved = WindowEvent::CursorMoved {
            device_id,
            position: PhysicalPosition::new(x as f64, y as f64),
        };
        let press = WindowEvent::MouseInput {
            device_id,
            state: ElementState::Pressed,
            button: MouseButton::Left,
        };
        assert!(!panel.handle_event(&moved, &mut lights, VIEWPORT));
        assert!(!panel.handle_event(&press, &mut lights, VIEWPORT));
        assert!(panel.layout(VIEWPORT).is_empty());
        assert_eq!(lights, SceneLights::default());
    }

    #[test]
    fn keyboard_selects_and_nudges() {
        let mut panel = DebugPanel::default();
        let mut lights = SceneLights::default();
        // Nothing to select while every folder is collapsed
        panel.select_next(true);
        assert_eq!(panel.selected(), None);

        panel.toggle(1);
        panel.select_next(true);
        assert_eq!(panel.selected(), Some((1, 0)));
        panel.select_next(false);
        assert_eq!(panel.selected(), Some((1, 5)));
        panel.select_next(true);
        panel.select_next(true);
        assert_eq!(panel.selected(), Some((1, 1)));

        panel.nudge(&mut lights, 1.0);
        assert!((lights.door.position.y - 2.3).abs() < 1e-5);
        assert_eq!(
            panel.status(&mut lights).as_deref(),
            Some("Door light position.y = 2.30")
        );

        panel.toggle(1);
        assert_eq!(panel.selected(), None);
    }

    #[test]
    fn quads_stay_inside_clip_space() {
        let mut panel = DebugPanel::default();
        panel.toggle(0);
        panel.toggle(1);
        let mut lights = SceneLights::default();
        let (vertices, indices) = panel.quads(&mut lights, VIEWPORT);
        assert_eq!(indices.len() % 6, 0);
        assert_eq!(vertices.len() / 4, indices.len() / 6);
        assert!(indices.len() <= MAX_QUADS * 6);
        for v in &vertices {
            assert!((-1.0..=1.0).contains(&v.position[0]));
            assert!((-1.0..=1.0).contains(&v.position[1]));
        }
    }
}
