// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::Parser;
use lumen_core::init_tracing;
use lumen_platform::winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};
use lumen_platform::{framebuffer_size, window_attributes};
use lumen_render::{Renderer, RendererConfig};
use lumen_render_vk::VkRenderer;
use tracing::{error, info};

mod config;

use config::{AppConfig, SceneCfg};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file
    #[arg(long, default_value = "lumen.toml")]
    config: PathBuf,
    /// Frames recorded ahead of the GPU (1..=4)
    #[arg(long)]
    frames_in_flight: Option<usize>,
    #[arg(long, value_enum)]
    scene: Option<SceneCfg>,
    /// Enable the Khronos validation layer
    #[arg(long)]
    validation: bool,
}

impl Args {
    fn apply(&self, cfg: &mut AppConfig) {
        if let Some(n) = self.frames_in_flight {
            cfg.render.frames_in_flight = n;
        }
        if let Some(scene) = self.scene {
            cfg.render.scene = scene;
        }
        if self.validation {
            cfg.render.validation = true;
        }
    }
}

struct App {
    cfg: AppConfig,
    renderer_cfg: RendererConfig,
    // Dropped before the window.
    renderer: Option<VkRenderer>,
    window: Option<Window>,

    focused: bool,
    failed: bool,
    frames: u32,
    last_fps_instant: Instant,
}

impl App {
    fn new(cfg: AppConfig) -> Self {
        let renderer_cfg = cfg.renderer_config();
        Self {
            cfg,
            renderer_cfg,
            renderer: None,
            window: None,
            focused: true,
            failed: false,
            frames: 0,
            last_fps_instant: Instant::now(),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.failed = true;
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.renderer = None;
        self.window = None;
        event_loop.exit();
    }

    fn create(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = event_loop.create_window(window_attributes("lumen"))?;
        let size = framebuffer_size(window.inner_size());
        let renderer = VkRenderer::new(&window, &window, size, &self.renderer_cfg)?;
        self.renderer = Some(renderer);
        self.window = Some(window);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.create(event_loop) {
            self.fail(event_loop, e.context("renderer init"));
            return;
        }
        event_loop.set_control_flow(ControlFlow::Poll);
        info!(
            "present_mode = {:?}, frames_in_flight = {}",
            self.cfg.render.present_mode, self.cfg.render.frames_in_flight
        );
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                if let Some(r) = &mut self.renderer {
                    if let Err(e) = r.resize(framebuffer_size(new_size)) {
                        self.fail(event_loop, e);
                    }
                }
            }

            WindowEvent::Focused(focused) => {
                if self.focused != focused && self.cfg.render.vsync_when_unfocused {
                    info!("Focused({focused})");
                    if let Some(r) = &mut self.renderer {
                        r.set_vsync(!focused);
                    }
                }
                self.focused = focused;
            }

            WindowEvent::RedrawRequested => {
                let Some(r) = &mut self.renderer else { return };
                match r.render() {
                    Ok(()) => self.frames = self.frames.saturating_add(1),
                    Err(e) => self.fail(event_loop, e.context("render")),
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(w) = &self.window {
            w.request_redraw();
        }

        let now = Instant::now();
        if now.duration_since(self.last_fps_instant).as_secs_f32() >= 1.0 {
            info!("fps ~ {}", self.frames);
            self.frames = 0;
            self.last_fps_instant = now;
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut cfg = AppConfig::load(&args.config);
    args.apply(&mut cfg);

    let event_loop: EventLoop<()> = EventLoop::new()?;
    let mut app = App::new(cfg);
    event_loop.run_app(&mut app)?;

    if app.failed {
        bail!("exited after a fatal renderer error");
    }
    Ok(())
}
