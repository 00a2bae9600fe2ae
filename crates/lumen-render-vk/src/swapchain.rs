// SPDX-License-Identifier: CEPL-1.0
//! The rotating set of presentable images and their views.

use std::sync::Arc;

use ash::vk;
use lumen_render::{PresentPreference, RenderSize};
use tracing::{debug, info};

use crate::error::{is_stale, PresentError, PresentResult};
use crate::gpu::{Gpu, SwapchainDesc};
use crate::retire::{Epoch, Generations};
use crate::surface::{choose_extent, choose_image_count, choose_present_mode, choose_surface_format};

/// Outcome of asking the presentation engine for the next image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// `suboptimal` images are still drawable; the chain should be rebuilt
    /// after this frame is presented.
    Image { index: u32, suboptimal: bool },
    /// Out of date. Nothing was acquired and the semaphore was not signalled.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presented {
    Ok,
    Stale,
}

pub struct SwapChain {
    gpu: Arc<dyn Gpu>,
    preference: PresentPreference,
    handles: Generations<vk::SwapchainKHR>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
}

struct Built {
    handle: vk::SwapchainKHR,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
}

impl SwapChain {
    pub fn new(
        gpu: Arc<dyn Gpu>,
        window: RenderSize,
        preference: PresentPreference,
    ) -> PresentResult<Self> {
        let built = build(gpu.as_ref(), window, preference, vk::SwapchainKHR::null())?;
        Ok(Self {
            gpu,
            preference,
            handles: Generations::new(built.handle),
            format: built.format,
            extent: built.extent,
            present_mode: built.present_mode,
            images: built.images,
            views: built.views,
        })
    }

    /// Builds a replacement chain from `old`. The old chain is parked until
    /// [`Self::cleanup_old_if_complete`] sees `last_use` finish, or
    /// [`Self::cleanup_old`] is called.
    pub fn recreate(&mut self, window: RenderSize, last_use: Epoch) -> PresentResult<()> {
        for view in self.views.drain(..) {
            self.gpu.destroy_image_view(view);
        }
        self.images.clear();

        let built = build(self.gpu.as_ref(), window, self.preference, self.handles.current())?;
        if let Some(stale) = self.handles.rotate(built.handle, last_use) {
            self.gpu.destroy_swapchain(stale);
        }
        self.format = built.format;
        self.extent = built.extent;
        self.present_mode = built.present_mode;
        self.images = built.images;
        self.views = built.views;
        Ok(())
    }

    /// Takes effect on the next [`Self::recreate`].
    pub fn set_preference(&mut self, preference: PresentPreference) {
        self.preference = preference;
    }

    pub fn cleanup_old(&mut self) {
        if let Some(old) = self.handles.release() {
            debug!("destroying retired swapchain");
            self.gpu.destroy_swapchain(old);
        }
    }

    pub fn cleanup_old_if_complete(&mut self, completed: Epoch) {
        if let Some(old) = self.handles.release_if_complete(completed) {
            debug!(completed, "destroying retired swapchain");
            self.gpu.destroy_swapchain(old);
        }
    }

    pub fn acquire(&self, signal: vk::Semaphore) -> PresentResult<Acquire> {
        match self.gpu.acquire_next_image(self.handles.current(), signal) {
            Ok((index, suboptimal)) => Ok(Acquire::Image { index, suboptimal }),
            Err(e) if is_stale(e) => Ok(Acquire::Stale),
            Err(e) => Err(PresentError::device("acquire")(e)),
        }
    }

    pub fn present(&self, image_index: u32, wait: vk::Semaphore) -> PresentResult<Presented> {
        match self.gpu.queue_present(self.handles.current(), image_index, wait) {
            Ok(false) => Ok(Presented::Ok),
            Ok(true) => Ok(Presented::Stale),
            Err(e) if is_stale(e) => Ok(Presented::Stale),
            Err(e) => Err(PresentError::device("present")(e)),
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handles.current()
    }

    pub fn retiring(&self) -> Option<vk::SwapchainKHR> {
        self.handles.retiring()
    }

    #[inline]
    pub fn image_format(&self) -> vk::Format {
        self.format.format
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    pub fn num_images(&self) -> usize {
        self.images.len()
    }

    pub fn num_image_views(&self) -> usize {
        self.views.len()
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.views
    }
}

impl Drop for SwapChain {
    fn drop(&mut self) {
        for view in self.views.drain(..) {
            self.gpu.destroy_image_view(view);
        }
        self.cleanup_old();
        self.gpu.destroy_swapchain(self.handles.current());
    }
}

fn build(
    gpu: &dyn Gpu,
    window: RenderSize,
    preference: PresentPreference,
    old: vk::SwapchainKHR,
) -> PresentResult<Built> {
    let support = gpu
        .surface_support()
        .map_err(PresentError::init("surface capabilities"))?;
    if !support.is_adequate() {
        return Err(PresentError::Unsupported(
            "surface reports no formats or present modes".into(),
        ));
    }

    let caps = &support.capabilities;
    let desc = SwapchainDesc {
        min_image_count: choose_image_count(caps),
        format: choose_surface_format(&support.formats),
        extent: choose_extent(caps, window),
        present_mode: choose_present_mode(&support.present_modes, preference),
        pre_transform: caps.current_transform,
        old_swapchain: old,
    };

    let handle = gpu
        .create_swapchain(&desc)
        .map_err(PresentError::init("swapchain"))?;
    let images = match gpu.swapchain_images(handle) {
        Ok(images) => images,
        Err(e) => {
            gpu.destroy_swapchain(handle);
            return Err(PresentError::init("swapchain images")(e));
        }
    };

    let mut views = Vec::with_capacity(images.len());
    for &image in &images {
        match gpu.create_image_view(image, desc.format.format) {
            Ok(view) => views.push(view),
            Err(e) => {
                for view in views {
                    gpu.destroy_image_view(view);
                }
                gpu.destroy_swapchain(handle);
                return Err(PresentError::init("image view")(e));
            }
        }
    }

    info!(
        "swapchain ready ({}x{}, {} images, {:?}, {:?})",
        desc.extent.width,
        desc.extent.height,
        images.len(),
        desc.format.format,
        desc.present_mode
    );

    Ok(Built {
        handle,
        format: desc.format,
        extent: desc.extent,
        present_mode: desc.present_mode,
        images,
        views,
    })
}
