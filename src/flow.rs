//! Flow control and application event loop.
//!
//! A "flow" is a self-contained part of the application: it owns GPU
//! resources, reacts to input, updates shared state every frame and describes
//! what it wants drawn. The [`App`] drives all flows from the winit event loop.
//!
//! # Lifecycle
//!
//! Each frame:
//! 1. window events are offered to the flows, the last registered flow first;
//!    a flow returning [`Out::Consumed`] hides the event from the flows below
//!    and from the orbit controls
//! 2. `on_update` runs on every flow
//! 3. the orbit controls move the camera
//! 4. the flows' renders are batched and drawn in one pass
//! 5. the frame is presented and the next one requested

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use cgmath::EuclideanSpace;
use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    config::Settings,
    context::{Context, InitContext},
    render::{Frame, Render, draw_frame},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Result of offering a window event to a flow.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Out {
    /// The event was handled and must not reach anyone else.
    Consumed,
    #[default]
    Empty,
}

/// Trait for a part of the scene that updates and renders itself.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once after every flow was constructed
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_update()` is called every frame
/// 4. `on_render()` is called every frame and specifies how to render `self`
pub trait GraphicsFlow<S> {
    /// The only place with mutable access to the context, e.g. to change the clear colour.
    fn on_init(&mut self, ctx: &mut Context, state: &mut S);

    /// Called every frame with the time elapsed since the previous one.
    fn on_update(&mut self, ctx: &Context, state: &mut S, dt: Duration);

    fn on_window_events(&mut self, ctx: &Context, state: &mut S, event: &WindowEvent) -> Out;

    fn on_render(&self) -> Render<'_>;
}

impl<S> Debug for dyn GraphicsFlow<S> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Asynchronous factory of a flow, run once the GPU context exists.
pub type FlowConstructor<S> =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<S>>>>>>;

/// GPU context plus the state shared by all flows.
#[derive(Debug)]
pub struct AppState<S: 'static> {
    pub(crate) ctx: Context,
    state: S,
    is_surface_configured: bool,
}

impl<S: Default> AppState<S> {
    async fn new(window: Arc<Window>, settings: Settings) -> anyhow::Result<Self> {
        let ctx = Context::new(window, settings).await?;
        Ok(Self {
            ctx,
            state: S::default(),
            is_surface_configured: false,
        })
    }

    fn resize(&mut self) {
        self.is_surface_configured = self.ctx.resize();
    }

    fn update(&mut self, graphics_flows: &mut [Box<dyn GraphicsFlow<S>>], dt: Duration) {
        for flow in graphics_flows.iter_mut() {
            flow.on_update(&self.ctx, &mut self.state, dt);
        }
        let camera = &mut self.ctx.camera;
        camera.controller.update(&mut camera.camera);
        camera.write_to_buffer(&self.ctx.queue, &self.ctx.projection);
    }

    fn render(
        &mut self,
        graphics_flows: &[Box<dyn GraphicsFlow<S>>],
    ) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        draw_frame(
            &mut encoder,
            Frame {
                color: &view,
                depth: &self.ctx.depth_texture.view,
                clear: self.ctx.clear_colour,
            },
            &self.ctx.pipelines,
            &self.ctx.camera,
            &self.ctx.lights,
            self.ctx.camera.camera.position.to_vec(),
            graphics_flows.iter().map(|flow| flow.on_render()),
        );
        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    /// Offer `event` to the flows, topmost first. Returns true if one consumed it.
    fn dispatch(&mut self, graphics_flows: &mut [Box<dyn GraphicsFlow<S>>], event: &WindowEvent) -> bool {
        offer_topmost_first(graphics_flows, |flow| {
            flow.on_window_events(&self.ctx, &mut self.state, event)
        })
    }
}

/// Offer an event to `flows` from last to first until one consumes it.
fn offer_topmost_first<T>(flows: &mut [T], mut offer: impl FnMut(&mut T) -> Out) -> bool {
    flows.iter_mut().rev().any(|flow| offer(flow) == Out::Consumed)
}

/// Whether the orbit controls see `event` after the flows had their turn.
///
/// The controls always track the cursor so a drag that ends on the panel
/// does not make the camera jump afterwards.
fn reaches_controls(event: &WindowEvent, consumed: bool) -> bool {
    !consumed || matches!(event, WindowEvent::CursorMoved { .. })
}

pub(crate) enum FlowEvent<S: 'static> {
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    Initialized {
        state: AppState<S>,
        flows: Vec<Box<dyn GraphicsFlow<S>>>,
    },
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    Exit,
}

impl<S> Debug for FlowEvent<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Exit => f.write_str("Exit"),
        }
    }
}

pub struct App<S: 'static> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent<S>>,
    settings: Settings,
    state: Option<AppState<S>>,
    graphics_flows: Vec<Box<dyn GraphicsFlow<S>>>,
    // Taken on the first `resumed`
    constructors: Option<Vec<FlowConstructor<S>>>,
    last_time: Instant,
}

impl<S: 'static + Default> App<S> {
    fn new(
        event_loop: &EventLoop<FlowEvent<S>>,
        settings: Settings,
        constructors: Vec<FlowConstructor<S>>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            settings,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            last_time: Instant::now(),
        })
    }

    fn start(&mut self, mut state: AppState<S>, flows: Vec<Box<dyn GraphicsFlow<S>>>) {
        self.graphics_flows = flows;
        state.resize();
        for flow in self.graphics_flows.iter_mut() {
            flow.on_init(&mut state.ctx, &mut state.state);
        }
        state.ctx.window.request_redraw();
        self.last_time = Instant::now();
        self.state = Some(state);
    }
}

#[cfg(target_arch = "wasm32")]
fn find_canvas(selector: &str) -> Option<web_sys::HtmlCanvasElement> {
    use wasm_bindgen::JsCast;

    let document = web_sys::window()?.document()?;
    let element = document.query_selector(selector).ok()??;
    element.dyn_into::<web_sys::HtmlCanvasElement>().ok()
}

impl<S: 'static + Default> ApplicationHandler<FlowEvent<S>> for App<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes =
            Window::default_attributes().with_title(self.settings.title.clone());

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            let Some(canvas) = find_canvas(&self.settings.canvas_selector) else {
                log::warn!(
                    "No canvas matches {}, nothing will be rendered",
                    self.settings.canvas_selector
                );
                event_loop.exit();
                return;
            };
            window_attributes = window_attributes.with_canvas(Some(canvas));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        let settings = self.settings.clone();
        let init_future = async move {
            let app_state = AppState::<S>::new(window, settings).await?;
            let flow_futures: Vec<_> = constructors
                .into_iter()
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows = futures::future::join_all(flow_futures).await;
            anyhow::Ok((app_state, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((state, flows)) => self.start(state, flows),
                Err(e) => {
                    log::error!("Initialization failed: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok((state, flows)) => FlowEvent::Initialized { state, flows },
                    Err(e) => {
                        log::error!("Initialization failed: {e:#}");
                        FlowEvent::Exit
                    }
                };
                if proxy.send_event(event).is_err() {
                    log::error!("The event loop closed during initialization");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent<S>) {
        match event {
            FlowEvent::Initialized { state, flows } => self.start(state, flows),
            FlowEvent::Exit => event_loop.exit(),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        let consumed = state.dispatch(&mut self.graphics_flows, &event);
        if reaches_controls(&event, consumed) {
            let ctx = &mut state.ctx;
            let viewport_height = ctx.viewport_height();
            ctx.camera.controller.handle_window_events(
                &event,
                &ctx.camera.camera,
                &ctx.projection,
                viewport_height,
            );
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => state.resize(),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                state.update(&mut self.graphics_flows, dt);
                match state.render(&self.graphics_flows) {
                    Ok(()) => (),
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => state.resize(),
                    Err(e) => log::error!("Unable to render {e}"),
                }
            }
            _ => {}
        }
    }
}

/// Install the logger: `env_logger` natively (default filter `info`, override
/// with `RUST_LOG`), the browser console on the web.
pub fn init_logger() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let env = env_logger::Env::default().default_filter_or("info");
        if let Err(e) = env_logger::Builder::from_env(env).try_init() {
            eprintln!("Warning: Could not initialize logger: {e}");
        }
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&JsValue::from_str(&e.to_string()));
        }
    }
}

/// Open the window and run `constructors` until the window is closed.
pub fn run<S: 'static + Default>(
    settings: Settings,
    constructors: Vec<FlowConstructor<S>>,
) -> anyhow::Result<()> {
    let event_loop: EventLoop<FlowEvent<S>> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, settings, constructors)?;

    #[cfg(not(target_arch = "wasm32"))]
    event_loop.run_app(&mut app)?;

    #[cfg(target_arch = "wasm32")]
    {
        use winit::platform::web::EventLoopExtWebSys;
        event_loop.spawn_app(app);
    }

    Ok(())
}
