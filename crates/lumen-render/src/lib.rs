// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A minimized window reports a zero dimension; nothing can be presented
    /// into it.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Which present mode the swapchain should ask for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PresentPreference {
    /// MAILBOX when the surface offers it, FIFO otherwise.
    #[default]
    LowLatency,
    /// Always FIFO (blocking vsync).
    Fifo,
}

/// What the scene layer draws each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SceneKind {
    /// Three vertices generated in the vertex shader, no bound buffer.
    Procedural,
    /// A vertex buffer uploaded once at startup.
    #[default]
    VertexBuffer,
}

/// SPIR-V for the scene pipeline. Opaque bytes at this layer.
#[derive(Clone, Debug, Default)]
pub struct ShaderSet {
    pub vertex: Vec<u8>,
    pub fragment: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub app_name: String,
    pub clear_color: [f32; 4],
    pub frames_in_flight: usize,
    pub present: PresentPreference,
    pub scene: SceneKind,
    pub validation: bool,
    pub shaders: ShaderSet,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "lumen".to_owned(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            frames_in_flight: 2,
            present: PresentPreference::LowLatency,
            scene: SceneKind::VertexBuffer,
            validation: false,
            shaders: ShaderSet::default(),
        }
    }
}

pub trait Renderer {
    fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        size: RenderSize,
        cfg: &RendererConfig,
    ) -> Result<Self>
    where
        Self: Sized;

    fn resize(&mut self, size: RenderSize) -> Result<()>;
    fn render(&mut self) -> Result<()>;
    fn set_clear_color(&mut self, rgba: [f32; 4]);
    fn set_vsync(&mut self, _on: bool) {}
}
