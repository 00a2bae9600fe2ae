// SPDX-License-Identifier: CEPL-1.0
//! The per-tick acquire → record → submit → present cycle and the swapchain
//! recreation protocol.
//!
//! ```text
//! Idle → Acquiring ─┬─ stale ─────────────────────────────→ Recreating
//!                   └→ Recording → Submitted → Presenting ─┬→ Idle
//!                                                          └→ Recreating (stale/resized)
//! Recreating ─┬─ zero-sized window → Recreating (next tick retries)
//!             └→ Idle
//! ```

use std::sync::Arc;

use ash::vk;
use lumen_render::{PresentPreference, RenderSize};
use tracing::{debug, info, trace, warn};

use crate::command::{CommandRecorder, DrawKind};
use crate::error::{PresentError, PresentResult};
use crate::gpu::{Gpu, Submission};
use crate::render_pass::RenderPass;
use crate::swapchain::{Acquire, Presented, SwapChain};
use crate::sync::FrameSynchronizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Acquiring,
    Recording,
    Submitted,
    Presenting,
    Recreating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented { slot: usize, image: u32 },
    /// The swapchain was rebuilt; nothing was drawn this tick.
    Recreated,
    /// The window has a zero dimension. Recreation is retried next tick.
    Suspended,
}

/// What the loop needs from the window each tick.
pub trait WindowSurface {
    fn framebuffer_size(&self) -> RenderSize;
    /// Returns and clears the "resized since last asked" flag.
    fn take_resized(&mut self) -> bool;
}

/// A graphics pipeline bound by a layer.
pub trait LayerPipeline {
    fn handle(&self) -> vk::Pipeline;
    /// Called after the layer's render pass was rebuilt.
    fn render_pass_changed(
        &mut self,
        render_pass: vk::RenderPass,
        format_changed: bool,
    ) -> PresentResult<()>;
}

/// One render pass with its recorder, drawn in submission order.
pub struct Layer {
    render_pass: RenderPass,
    recorder: CommandRecorder,
    pipeline: Option<Box<dyn LayerPipeline>>,
}

impl Layer {
    pub fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    pub fn recorder(&self) -> &CommandRecorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut CommandRecorder {
        &mut self.recorder
    }

    pub fn set_pipeline(&mut self, pipeline: Box<dyn LayerPipeline>) {
        self.pipeline = Some(pipeline);
    }
}

pub struct FrameLoop {
    state: FrameState,
    slot: usize,
    // Field order is drop order.
    layers: Vec<Layer>,
    sync: FrameSynchronizer,
    swapchain: SwapChain,
    gpu: Arc<dyn Gpu>,
    submit_scratch: Vec<vk::CommandBuffer>,
}

impl FrameLoop {
    pub fn new(
        gpu: Arc<dyn Gpu>,
        window: RenderSize,
        preference: PresentPreference,
        frames_in_flight: usize,
    ) -> PresentResult<Self> {
        let swapchain = SwapChain::new(gpu.clone(), window, preference)?;
        let sync = FrameSynchronizer::new(gpu.clone(), swapchain.num_images(), frames_in_flight)?;
        Ok(Self {
            state: FrameState::Idle,
            slot: 0,
            layers: Vec::new(),
            sync,
            swapchain,
            gpu,
            submit_scratch: Vec::new(),
        })
    }

    /// Appends a layer drawn after the existing ones.
    pub fn add_layer(&mut self, kind: DrawKind) -> PresentResult<&mut Layer> {
        let render_pass = RenderPass::new(self.gpu.clone(), &self.swapchain, kind.load_op())?;
        let count = self.command_buffer_count(&render_pass);
        let recorder = CommandRecorder::new(self.gpu.clone(), kind, count)?;
        debug!(kind = recorder.kind().name(), count, "layer added");
        self.layers.push(Layer {
            render_pass,
            recorder,
            pipeline: None,
        });
        let last = self.layers.len() - 1;
        Ok(&mut self.layers[last])
    }

    fn command_buffer_count(&self, render_pass: &RenderPass) -> usize {
        render_pass
            .framebuffer_count()
            .max(self.sync.frames_in_flight())
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn swapchain(&self) -> &SwapChain {
        &self.swapchain
    }

    pub fn synchronizer(&self) -> &FrameSynchronizer {
        &self.sync
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        for layer in &mut self.layers {
            layer.recorder.set_clear_color(rgba);
        }
    }

    /// Rebuilds the swapchain with `preference` at the start of the next tick.
    pub fn set_present_preference(&mut self, preference: PresentPreference) {
        self.swapchain.set_preference(preference);
        self.request_recreate();
    }

    pub fn request_recreate(&mut self) {
        self.state = FrameState::Recreating;
    }

    /// Runs one frame, or one recreation attempt if a previous tick left the
    /// loop in [`FrameState::Recreating`].
    pub fn tick(&mut self, window: &mut dyn WindowSurface) -> PresentResult<FrameStatus> {
        if self.state == FrameState::Recreating {
            return self.recreate(window);
        }

        let slot = self.slot;
        self.state = FrameState::Acquiring;
        self.sync.wait_for_slot(slot)?;

        let (image, suboptimal) = match self.swapchain.acquire(self.sync.image_available(slot))? {
            Acquire::Image { index, suboptimal } => (index, suboptimal),
            Acquire::Stale => {
                debug!("acquire reported out-of-date swapchain");
                return self.recreate(window);
            }
        };

        self.state = FrameState::Recording;
        self.sync.track_image(image as usize, slot)?;
        self.record(slot, image as usize)?;

        self.sync.reset_slot(slot)?;
        self.gpu
            .queue_submit(&Submission {
                wait: self.sync.image_available(slot),
                wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                command_buffers: &self.submit_scratch,
                signal: self.sync.render_finished(slot),
                fence: self.sync.in_flight_fence(slot),
            })
            .map_err(PresentError::device("submit"))?;
        let epoch = self.sync.mark_submitted(slot);
        self.state = FrameState::Submitted;
        trace!(slot, image, epoch, "frame submitted");

        self.state = FrameState::Presenting;
        let presented = self.swapchain.present(image, self.sync.render_finished(slot))?;
        let resized = window.take_resized();

        if presented == Presented::Stale {
            debug!("present reported stale swapchain");
            return self.recreate(window);
        }

        self.slot = (slot + 1) % self.sync.frames_in_flight();
        self.state = FrameState::Idle;
        if suboptimal || resized {
            debug!(suboptimal, resized, "recreating after present");
            self.recreate(window)?;
        }
        Ok(FrameStatus::Presented { slot, image })
    }

    fn record(&mut self, slot: usize, image: usize) -> PresentResult<()> {
        let extent = self.swapchain.extent();
        self.submit_scratch.clear();
        for layer in &mut self.layers {
            let pipeline = layer.pipeline.as_ref().map(|p| p.handle());
            let cmd = layer
                .recorder
                .record(slot, image, &layer.render_pass, extent, pipeline)?;
            self.submit_scratch.push(cmd);
        }
        Ok(())
    }

    fn recreate(&mut self, window: &mut dyn WindowSurface) -> PresentResult<FrameStatus> {
        self.state = FrameState::Recreating;
        self.gpu
            .device_wait_idle()
            .map_err(PresentError::device("wait for device idle"))?;
        self.sync.mark_idle();

        let size = window.framebuffer_size();
        if size.is_empty() {
            trace!(width = size.width, height = size.height, "window has no area, deferring recreation");
            return Ok(FrameStatus::Suspended);
        }
        window.take_resized();

        let last_use = self.sync.submitted_epoch();
        let old_format = self.swapchain.image_format();
        let old_images = self.swapchain.num_images();
        self.swapchain.recreate(size, last_use)?;
        let format_changed = self.swapchain.image_format() != old_format;

        for i in 0..self.layers.len() {
            self.layers[i]
                .render_pass
                .recreate(&self.swapchain, last_use)?;
            let count = self.command_buffer_count(&self.layers[i].render_pass);
            let layer = &mut self.layers[i];
            if let Some(pipeline) = layer.pipeline.as_mut() {
                pipeline.render_pass_changed(layer.render_pass.handle(), format_changed)?;
            }
            layer.recorder.recreate_command_buffers(count)?;
        }

        if self.swapchain.num_images() != old_images {
            debug!(from = old_images, to = self.swapchain.num_images(), "image count changed");
        }
        self.sync.resize_images(self.swapchain.num_images());

        // The device is idle, so no queued frame can still reference the
        // retired handles.
        for layer in &mut self.layers {
            layer.render_pass.cleanup_old();
        }
        self.swapchain.cleanup_old();

        let extent = self.swapchain.extent();
        info!("swapchain recreated ({}x{})", extent.width, extent.height);
        self.state = FrameState::Idle;
        Ok(FrameStatus::Recreated)
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        if let Err(e) = self.gpu.device_wait_idle() {
            warn!("device_wait_idle during teardown failed: {e}");
        }
    }
}
