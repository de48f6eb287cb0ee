use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use pixels::{Pixels, SurfaceTexture};
use riftlab_core::{DeviceError, Rgb, Side, StimulusMask};
use riftlab_experiment::{InputHost, Key};
use riftlab_render::{Compositor, Placement, PresentInfo, PresentationHost};
use riftlab_timing::{HighPrecisionTimer, Timer};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::EventLoopExtPumpEvents;
use winit::window::{Fullscreen, Window, WindowId};

/// Winit-side state. The event loop is pumped cooperatively from inside
/// `present` and `is_down`, so the blocking session loop stays the only
/// logical thread and never races the window system.
struct HostApp {
    background: Rgb,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    compositor: Option<Compositor>,
    held: HashSet<KeyCode>,
    refresh_rate_hz: Option<f64>,
    close_requested: bool,
}

impl HostApp {
    fn new(background: Rgb) -> Self {
        Self {
            background,
            window: None,
            pixels: None,
            compositor: None,
            held: HashSet::new(),
            refresh_rate_hz: None,
            close_requested: false,
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .context("no monitor available")?;

        self.refresh_rate_hz = monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let attributes = Window::default_attributes()
            .with_title("Riftlab")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);
        self.compositor = Compositor::new(size.width, size.height, self.background);
        if self.compositor.is_none() {
            bail!("display reported a zero-sized surface");
        }

        window.set_cursor_visible(false);
        self.window = Some(window);
        Ok(())
    }
}

impl ApplicationHandler for HostApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.create_window_and_surface(event_loop) {
                tracing::error!(%err, "failed to create window and surface");
                self.close_requested = true;
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.close_requested = true,
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            self.held.insert(code);
                        }
                        ElementState::Released => {
                            self.held.remove(&code);
                        }
                    }
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(pixels) = &mut self.pixels {
                    if let Err(err) = pixels.resize_surface(size.width, size.height) {
                        tracing::warn!(%err, "failed to resize surface");
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {}
}

struct Inner {
    event_loop: EventLoop<()>,
    app: HostApp,
    timer: HighPrecisionTimer,
    probe_radius_px: f32,
    left: Placement,
    right: Placement,
}

impl Inner {
    fn pump(&mut self) {
        let _ = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.app);
    }
}

/// The session's display seam, backed by a fullscreen winit window and a
/// pixels swapchain.
pub struct DisplayHost {
    inner: Rc<RefCell<Inner>>,
}

/// The session's keyboard seam over the same window.
pub struct KeyboardHost {
    inner: Rc<RefCell<Inner>>,
}

/// Opens the fullscreen window and splits it into its display and keyboard
/// seams. Both handles pump the same event loop; neither outlives `main`.
pub fn open(
    background: Rgb,
    probe_radius_px: f32,
    timer: HighPrecisionTimer,
) -> Result<(DisplayHost, KeyboardHost, Option<f64>)> {
    let event_loop = EventLoop::new()?;
    let mut inner = Inner {
        event_loop,
        app: HostApp::new(background),
        timer,
        probe_radius_px,
        left: Placement { x: 0.0, y: 0.0 },
        right: Placement { x: 0.0, y: 0.0 },
    };

    // The window appears on the first few pumps; give slow compositors a
    // generous grace period.
    let start = std::time::Instant::now();
    while inner.app.window.is_none() && !inner.app.close_requested {
        inner.pump();
        if start.elapsed() > Duration::from_secs(10) {
            bail!("window did not appear within 10 s");
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    if inner.app.close_requested {
        bail!("window closed before the session started");
    }

    let compositor = inner
        .app
        .compositor
        .as_ref()
        .context("compositor missing after window creation")?;
    let (w, h) = (compositor.width() as f32, compositor.height() as f32);
    inner.left = Placement {
        x: w * 0.25,
        y: h * 0.5,
    };
    inner.right = Placement {
        x: w * 0.75,
        y: h * 0.5,
    };
    let refresh_rate_hz = inner.app.refresh_rate_hz;

    let inner = Rc::new(RefCell::new(inner));
    Ok((
        DisplayHost {
            inner: Rc::clone(&inner),
        },
        KeyboardHost { inner },
        refresh_rate_hz,
    ))
}

fn closed_err() -> DeviceError {
    DeviceError("display window was closed".into())
}

impl PresentationHost for DisplayHost {
    fn clear(&mut self) -> Result<(), DeviceError> {
        let mut inner = self.inner.borrow_mut();
        let compositor = inner.app.compositor.as_mut().ok_or_else(closed_err)?;
        compositor.clear();
        Ok(())
    }

    fn draw(
        &mut self,
        placement: Placement,
        mask: &StimulusMask,
        tint: Rgb,
    ) -> Result<(), DeviceError> {
        let mut inner = self.inner.borrow_mut();
        let compositor = inner.app.compositor.as_mut().ok_or_else(closed_err)?;
        compositor.blit_mask(mask, tint, placement);
        Ok(())
    }

    fn draw_fixation(&mut self) -> Result<(), DeviceError> {
        let mut inner = self.inner.borrow_mut();
        let compositor = inner.app.compositor.as_mut().ok_or_else(closed_err)?;
        let center = compositor.center();
        compositor.draw_fixation(center);
        Ok(())
    }

    fn draw_probe(&mut self, placement: Placement) -> Result<(), DeviceError> {
        let mut inner = self.inner.borrow_mut();
        let radius = inner.probe_radius_px;
        let compositor = inner.app.compositor.as_mut().ok_or_else(closed_err)?;
        compositor.draw_dot(placement, radius, [1.0, 1.0, 1.0]);
        Ok(())
    }

    fn present(&mut self) -> Result<PresentInfo, DeviceError> {
        let mut inner = self.inner.borrow_mut();
        inner.pump();
        if inner.app.close_requested {
            return Err(closed_err());
        }

        let app = &mut inner.app;
        let pixels = app.pixels.as_mut().ok_or_else(closed_err)?;
        let compositor = app.compositor.as_ref().ok_or_else(closed_err)?;
        pixels.frame_mut().copy_from_slice(compositor.data());
        pixels
            .render()
            .map_err(|err| DeviceError(format!("swapchain present failed: {err}")))?;

        Ok(PresentInfo {
            timestamp_ns: inner.timer.now(),
            missed_hint: false,
        })
    }

    fn placement(&self, side: Side) -> Placement {
        let inner = self.inner.borrow();
        match side {
            Side::Left => inner.left,
            Side::Right => inner.right,
        }
    }
}

fn key_code(key: Key) -> KeyCode {
    match key {
        Key::Left => KeyCode::ArrowLeft,
        Key::Right => KeyCode::ArrowRight,
        Key::Same => KeyCode::KeyS,
        Key::Different => KeyCode::KeyD,
        Key::Abort => KeyCode::Escape,
    }
}

impl InputHost for KeyboardHost {
    fn is_down(&mut self, key: Key) -> Result<bool, DeviceError> {
        let mut inner = self.inner.borrow_mut();
        inner.pump();
        // A closed window reads as an abort so the session winds down
        // instead of presenting into nothing.
        if inner.app.close_requested {
            return Ok(key == Key::Abort);
        }
        Ok(inner.app.held.contains(&key_code(key)))
    }
}
