use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::window::{Window, WindowId};

use crate::graphics::Graphics;
use crate::platform;
use crate::{App, Context, Pt, WindowConfig};

type AppFactory = Box<dyn FnOnce(&mut Context) -> anyhow::Result<Box<dyn App>>>;

pub(crate) struct WinitApp {
    config: WindowConfig,
    instance: wgpu::Instance,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    context: Context,
    app: Option<Box<dyn App>>,
    factory: Option<AppFactory>,
    last_tick: Option<Instant>,
}

impl WinitApp {
    pub(crate) fn new<T: App + 'static>(config: WindowConfig) -> Self {
        Self {
            config,
            instance: platform::create_wgpu_instance(),
            window: None,
            surface: None,
            context: Context::new(),
            app: None,
            factory: Some(Box::new(|ctx| {
                Ok(Box::new(T::initialize(ctx)?) as Box<dyn App>)
            })),
            last_tick: None,
        }
    }

    fn tick(&mut self) {
        let now = Instant::now();
        let dt = self
            .last_tick
            .map(|t| now.duration_since(t))
            .unwrap_or_default();
        self.last_tick = Some(now);

        self.context.begin_frame();
        if let Some(app) = self.app.as_mut() {
            app.update(&mut self.context, dt);
            app.draw(&mut self.context);
        }

        if let Some(surface) = self.surface.as_ref() {
            let result = platform::with_graphics(|g| g.draw_context(surface, &self.context));
            match result {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    if let Some(window) = self.window.as_ref() {
                        let size = window.inner_size();
                        platform::with_graphics(|g| g.resize(surface, size.width, size.height));
                    }
                }
                Err(err) => log::warn!("frame skipped: {err}"),
            }
        }

        self.context.input_mut().end_frame();
    }
}

impl ApplicationHandler for WinitApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(
                self.config.width.as_f32() as f64,
                self.config.height.as_f32() as f64,
            ))
            .with_resizable(self.config.resizable);
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .expect("failed to create window"),
        );
        window.set_cursor_visible(self.config.cursor_visible);

        let surface = self
            .instance
            .create_surface(Arc::clone(&window))
            .expect("failed to create surface");

        let size = window.inner_size();
        let graphics = platform::block_on(Graphics::new(
            &self.instance,
            &surface,
            size.width,
            size.height,
        ))
        .expect("failed to initialize graphics");
        if platform::set_global_graphics(graphics).is_err() {
            panic!("global Graphics already initialized");
        }

        if let Err(err) = platform::with_audio(|a| a.start_output()) {
            log::warn!("audio output unavailable, running silent: {err:#}");
        }

        self.context.set_scale_factor(window.scale_factor());
        self.context
            .set_window_logical_size(self.config.width, self.config.height);

        if let Some(factory) = self.factory.take() {
            match factory(&mut self.context) {
                Ok(app) => self.app = Some(app),
                Err(err) => {
                    log::error!("initialization failed: {err:#}");
                    std::process::exit(1);
                }
            }
        }

        self.window = Some(window);
        self.surface = Some(surface);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(new_size) => {
                if let Some(surface) = self.surface.as_ref() {
                    platform::with_graphics(|g| {
                        g.resize(surface, new_size.width, new_size.height)
                    });
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.context.set_scale_factor(scale_factor);
            }
            WindowEvent::Focused(focused) => {
                self.context.input_mut().handle_focus(focused);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let sf = self.context.scale_factor();
                self.context.input_mut().handle_cursor_moved(
                    Pt::from_physical_px(position.x, sf),
                    Pt::from_physical_px(position.y, sf),
                );
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.context.input_mut().handle_mouse_input(state, button);
            }
            WindowEvent::RedrawRequested => self.tick(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Surface must not outlive the window.
        self.surface.take();
        self.window.take();
    }
}
