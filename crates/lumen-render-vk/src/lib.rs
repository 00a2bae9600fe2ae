// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
//! Vulkan presentation: swapchain, render passes, per-frame synchronization
//! and command recording, driven one tick at a time by [`FrameLoop`].

pub mod command;
pub mod context;
pub mod error;
pub mod frame_loop;
pub mod gpu;
pub mod pipeline;
pub mod render_pass;
pub mod renderer;
pub mod retire;
pub mod shaders;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod vertex;

#[cfg(test)]
mod mock;

pub use command::{run_immediate, CommandRecorder, DrawKind, OverlayDraw};
pub use context::{InstanceConfig, VkContext};
pub use error::{PresentError, PresentResult};
pub use frame_loop::{FrameLoop, FrameState, FrameStatus, Layer, LayerPipeline, WindowSurface};
pub use gpu::Gpu;
pub use pipeline::{GraphicsPipeline, VertexInput};
pub use render_pass::RenderPass;
pub use renderer::VkRenderer;
pub use swapchain::SwapChain;
pub use sync::{FrameSynchronizer, MAX_FRAMES_IN_FLIGHT};
pub use vertex::{Vertex, VertexBuffer, TRIANGLE};
