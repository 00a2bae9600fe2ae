// SPDX-License-Identifier: CEPL-1.0
pub use winit;

use lumen_render::RenderSize;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::window::{Window, WindowAttributes};

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;

pub fn window_attributes(title: &str) -> WindowAttributes {
    Window::default_attributes()
        .with_title(title)
        .with_inner_size(LogicalSize::new(DEFAULT_WIDTH, DEFAULT_HEIGHT))
        .with_resizable(true)
}

/// Framebuffer size in pixels. Zero in either dimension while minimized.
pub fn framebuffer_size(size: PhysicalSize<u32>) -> RenderSize {
    RenderSize::new(size.width, size.height)
}
