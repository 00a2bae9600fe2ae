// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use thiserror::Error;

/// Everything that can escape the presentation core.
///
/// Surface staleness is deliberately absent: an out-of-date or suboptimal
/// swapchain is an expected outcome that the frame loop repairs by itself.
#[derive(Debug, Error)]
pub enum PresentError {
    /// Creating a swapchain, render pass, framebuffer, command pool or sync
    /// primitive failed. Startup cannot continue.
    #[error("failed to create {what}: {source}")]
    Initialization {
        what: &'static str,
        #[source]
        source: vk::Result,
    },

    /// Acquire, submit, present or a fence wait returned something other than
    /// success or staleness.
    #[error("device error during {op}: {source}")]
    Device {
        op: &'static str,
        #[source]
        source: vk::Result,
    },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid SPIR-V: {0}")]
    Shader(#[from] std::io::Error),

    #[error("window handle unavailable: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),
}

impl PresentError {
    pub(crate) fn init(what: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |source| Self::Initialization { what, source }
    }

    pub(crate) fn device(op: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |source| Self::Device { op, source }
    }

    /// Nothing recoverable is ever surfaced, so every variant is fatal.
    pub fn is_fatal(&self) -> bool {
        true
    }
}

pub type PresentResult<T> = Result<T, PresentError>;

/// True for the results that mean "rebuild the swapchain", not "the device
/// is broken".
pub(crate) fn is_stale(result: vk::Result) -> bool {
    matches!(
        result,
        vk::Result::ERROR_OUT_OF_DATE_KHR | vk::Result::SUBOPTIMAL_KHR
    )
}
