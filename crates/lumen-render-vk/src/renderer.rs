// SPDX-License-Identifier: CEPL-1.0
use std::sync::Arc;

use anyhow::{Context, Result};
use lumen_render::{PresentPreference, RenderSize, Renderer, RendererConfig, SceneKind};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info, trace, warn};

use crate::command::{DrawKind, OverlayDraw};
use crate::context::{InstanceConfig, VkContext};
use crate::error::PresentResult;
use crate::frame_loop::{FrameLoop, FrameStatus, WindowSurface};
use crate::gpu::Gpu;
use crate::pipeline::{GraphicsPipeline, VertexInput};
use crate::vertex::{VertexBuffer, TRIANGLE};

pub const MAX_FRAMES_IN_FLIGHT_LIMIT: usize = 4;

/// Last size reported by the windowing layer.
#[derive(Debug, Default)]
struct WindowState {
    size: RenderSize,
    resized: bool,
}

impl WindowSurface for WindowState {
    fn framebuffer_size(&self) -> RenderSize {
        self.size
    }

    fn take_resized(&mut self) -> bool {
        std::mem::take(&mut self.resized)
    }
}

pub(crate) fn clamp_frames_in_flight(requested: usize) -> usize {
    let frames = requested.clamp(1, MAX_FRAMES_IN_FLIGHT_LIMIT);
    if frames != requested {
        warn!(requested, using = frames, "frames_in_flight out of range");
    }
    frames
}

pub struct VkRenderer {
    // Dropped first: idles the device, then releases every layer.
    frame_loop: FrameLoop,
    vertices: Option<VertexBuffer>,
    ctx: Arc<VkContext>,
    window: WindowState,
    preference: PresentPreference,
}

impl VkRenderer {
    /// Composites `overlay` over the scene in the same submission.
    pub fn add_overlay(&mut self, overlay: Box<dyn OverlayDraw>) -> PresentResult<()> {
        self.frame_loop.add_layer(DrawKind::Overlay(overlay))?;
        Ok(())
    }

    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frame_loop
    }

    pub fn context(&self) -> &Arc<VkContext> {
        &self.ctx
    }
}

impl Renderer for VkRenderer {
    fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        size: RenderSize,
        cfg: &RendererConfig,
    ) -> Result<Self> {
        let instance_cfg = InstanceConfig {
            app_name: cfg.app_name.clone(),
            validation: cfg.validation,
            ..Default::default()
        };
        let ctx = Arc::new(VkContext::new(window, display, &instance_cfg).context("vulkan context")?);
        let gpu: Arc<dyn Gpu> = ctx.clone();

        let frames = clamp_frames_in_flight(cfg.frames_in_flight);
        let mut frame_loop = FrameLoop::new(gpu, size, cfg.present, frames)?;

        let (kind, input, vertices) = match cfg.scene {
            SceneKind::Procedural => (DrawKind::Plain, VertexInput::None, None),
            SceneKind::VertexBuffer => {
                let vb = VertexBuffer::upload(&ctx, &TRIANGLE).context("vertex upload")?;
                let kind = DrawKind::Buffered {
                    buffer: vb.handle(),
                    vertex_count: vb.len(),
                };
                (kind, VertexInput::PosColor, Some(vb))
            }
        };

        let layer = frame_loop.add_layer(kind)?;
        let pipeline = GraphicsPipeline::new(ctx.clone(), layer.render_pass().handle(), &cfg.shaders, input)
            .context("scene pipeline")?;
        layer.set_pipeline(Box::new(pipeline));
        frame_loop.set_clear_color(cfg.clear_color);

        let sc = frame_loop.swapchain();
        info!(
            "Vulkan renderer ready ({}x{}, {} images, {} frames in flight, {:?} scene)",
            sc.extent().width,
            sc.extent().height,
            sc.num_images(),
            frames,
            cfg.scene
        );

        Ok(Self {
            frame_loop,
            vertices,
            ctx,
            window: WindowState { size, resized: false },
            preference: cfg.present,
        })
    }

    fn resize(&mut self, size: RenderSize) -> Result<()> {
        debug!(width = size.width, height = size.height, "resize requested");
        self.window.size = size;
        self.window.resized = true;
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        match self.frame_loop.tick(&mut self.window)? {
            FrameStatus::Presented { slot, image } => trace!(slot, image, "presented"),
            FrameStatus::Recreated => debug!("frame skipped for swapchain recreation"),
            FrameStatus::Suspended => trace!("window has no area"),
        }
        Ok(())
    }

    fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.frame_loop.set_clear_color(rgba);
    }

    fn set_vsync(&mut self, on: bool) {
        let preference = if on { PresentPreference::Fifo } else { self.preference };
        self.frame_loop.set_present_preference(preference);
    }
}
