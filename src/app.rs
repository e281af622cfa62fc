//! Windowing shell: event loop, pointer capture and the frame callback.

use crate::config::GameConfig;
use crate::error::AppError;
use crate::game::Director;
use crate::gpu::GpuContext;
use crate::math::mix;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

/// Create the event loop and run until close, escape, or a fatal error.
pub fn run(config: GameConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    match app.failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct App {
    config: GameConfig,
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    director: Option<Director>,
    time: f32,
    dt: f32,
    last_frame: Option<Instant>,
    run_start: Option<Instant>,
    frames: u32,
    fps_window: f32,
    failure: Option<AppError>,
}

impl App {
    fn new(config: GameConfig) -> Self {
        Self {
            config,
            window: None,
            gpu: None,
            director: None,
            time: 0.0,
            dt: 1.0 / 60.0,
            last_frame: None,
            run_start: None,
            frames: 0,
            fps_window: 0.0,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: AppError) {
        log::error!("{}", error);
        self.failure = Some(error);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let attrs = Window::default_attributes()
            .with_title("Slipstream")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = Arc::new(event_loop.create_window(attrs)?);

        // Mouse-look wants raw deltas without the cursor hitting an edge.
        if window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
            .is_err()
        {
            log::warn!("cursor grab unavailable; steering may escape the window");
        }
        window.set_cursor_visible(false);

        let gpu = GpuContext::new(window.clone())?;
        let director = Director::new(&gpu, self.config.clone());

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.director = Some(director);
        self.run_start = Some(Instant::now());
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(gpu), Some(director)) = (self.gpu.as_mut(), self.director.as_mut()) else {
            return;
        };

        let now = Instant::now();
        let raw = self
            .last_frame
            .map(|t| now.duration_since(t).as_secs_f32())
            .unwrap_or(1.0 / 60.0)
            .min(0.1);
        self.last_frame = Some(now);
        // Smoothed timestep: one hitchy frame must not kick the simulation.
        self.dt = mix(self.dt, raw, 0.1);
        self.time += self.dt;

        self.frames += 1;
        self.fps_window += raw;
        if self.fps_window >= 2.0 {
            log::debug!("fps {:.1}", self.frames as f32 / self.fps_window);
            self.frames = 0;
            self.fps_window = 0.0;
        }

        let frame = match gpu.acquire_frame() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.reconfigure();
                return;
            }
            Err(e @ wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, AppError::Gpu(crate::error::GpuError::Surface(e)));
                return;
            }
            Err(e) => {
                log::warn!("dropped frame: {:?}", e);
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        match director.frame(gpu, &view, self.time, self.dt) {
            Ok(report) => {
                frame.present();
                if report.just_finished {
                    let elapsed = self
                        .run_start
                        .map(|t| t.elapsed().as_secs_f32())
                        .unwrap_or(0.0);
                    log::info!("run finished in {}", format_clock(elapsed));
                }
            }
            Err(e) => self.fail(event_loop, e),
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if let Some(director) = &mut self.director {
                director.state.on_mouse_move(dx, dy);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                    && event.state == ElementState::Pressed
                {
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Run timer as `mm:ss:mmm`.
fn format_clock(seconds: f32) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0) as u64;
    format!(
        "{:02}:{:02}:{:03}",
        total_ms / 60_000,
        (total_ms / 1000) % 60,
        total_ms % 1000
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "00:00:000");
        assert_eq!(format_clock(61.5), "01:01:500");
        assert_eq!(format_clock(600.042), "10:00:042");
        assert_eq!(format_clock(-3.0), "00:00:000");
    }
}
