// SPDX-License-Identifier: CEPL-1.0
//! Single-subpass colour render pass plus one framebuffer per swapchain view.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::error::{PresentError, PresentResult};
use crate::gpu::{Gpu, RenderPassDesc};
use crate::retire::{Epoch, Generations};
use crate::swapchain::SwapChain;

pub struct RenderPass {
    gpu: Arc<dyn Gpu>,
    load_op: vk::AttachmentLoadOp,
    format: vk::Format,
    handles: Generations<vk::RenderPass>,
    framebuffers: Vec<vk::Framebuffer>,
}

/// `CLEAR` for the first pass of a frame, `DONT_CARE` for passes that
/// composite over what an earlier pass drew.
pub fn describe(format: vk::Format, load_op: vk::AttachmentLoadOp) -> RenderPassDesc {
    RenderPassDesc {
        attachment: vk::AttachmentDescription {
            format,
            samples: vk::SampleCountFlags::TYPE_1,
            load_op,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
            ..Default::default()
        },
        // Colour writes wait until the presentation engine is done reading.
        dependency: vk::SubpassDependency {
            src_subpass: vk::SUBPASS_EXTERNAL,
            dst_subpass: 0,
            src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            src_access_mask: vk::AccessFlags::empty(),
            dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            ..Default::default()
        },
    }
}

impl RenderPass {
    pub fn new(
        gpu: Arc<dyn Gpu>,
        swapchain: &SwapChain,
        load_op: vk::AttachmentLoadOp,
    ) -> PresentResult<Self> {
        let format = swapchain.image_format();
        let handle = gpu
            .create_render_pass(&describe(format, load_op))
            .map_err(PresentError::init("render pass"))?;
        let mut rp = Self {
            gpu,
            load_op,
            format,
            handles: Generations::new(handle),
            framebuffers: Vec::new(),
        };
        rp.create_framebuffers(swapchain)?;
        Ok(rp)
    }

    fn create_framebuffers(&mut self, swapchain: &SwapChain) -> PresentResult<()> {
        let render_pass = self.handles.current();
        let extent = swapchain.extent();
        self.framebuffers.reserve(swapchain.num_image_views());
        for &view in swapchain.image_views() {
            let fb = self
                .gpu
                .create_framebuffer(render_pass, view, extent)
                .map_err(PresentError::init("framebuffer"))?;
            self.framebuffers.push(fb);
        }
        Ok(())
    }

    fn destroy_framebuffers(&mut self) {
        for fb in self.framebuffers.drain(..) {
            self.gpu.destroy_framebuffer(fb);
        }
    }

    /// Rebuilds the pass and its framebuffers against the swapchain's current
    /// views. The previous pass is parked until `last_use` completes.
    pub fn recreate(&mut self, swapchain: &SwapChain, last_use: Epoch) -> PresentResult<()> {
        self.destroy_framebuffers();
        self.cleanup_old();

        let format = swapchain.image_format();
        let handle = self
            .gpu
            .create_render_pass(&describe(format, self.load_op))
            .map_err(PresentError::init("render pass"))?;
        if let Some(stale) = self.handles.rotate(handle, last_use) {
            self.gpu.destroy_render_pass(stale);
        }
        if format != self.format {
            debug!(?format, "render pass colour format changed");
        }
        self.format = format;
        self.create_framebuffers(swapchain)
    }

    pub fn cleanup_old(&mut self) {
        if let Some(old) = self.handles.release() {
            self.gpu.destroy_render_pass(old);
        }
    }

    pub fn cleanup_old_if_complete(&mut self, completed: Epoch) {
        if let Some(old) = self.handles.release_if_complete(completed) {
            self.gpu.destroy_render_pass(old);
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::RenderPass {
        self.handles.current()
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn load_op(&self) -> vk::AttachmentLoadOp {
        self.load_op
    }

    /// # Panics
    /// If `index` is not below [`Self::framebuffer_count`].
    #[inline]
    pub fn framebuffer(&self, index: usize) -> vk::Framebuffer {
        self.framebuffers[index]
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        self.destroy_framebuffers();
        self.cleanup_old();
        self.gpu.destroy_render_pass(self.handles.current());
    }
}
