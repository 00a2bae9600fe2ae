// SPDX-License-Identifier: CEPL-1.0
//! Per-slot command buffers and the draw strategies recorded into them.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, trace};

use crate::error::{PresentError, PresentResult};
use crate::gpu::{Gpu, Submission};
use crate::render_pass::RenderPass;

/// Hook for an immediate-mode UI renderer. Called inside an active render
/// pass whose attachment already holds the scene.
pub trait OverlayDraw {
    fn record(&mut self, cmd: vk::CommandBuffer, extent: vk::Extent2D);
}

/// What a [`CommandRecorder`] draws between begin and end render pass.
pub enum DrawKind {
    /// Three vertices generated in the vertex shader; nothing bound.
    Plain,
    /// A caller-owned vertex buffer.
    Buffered {
        buffer: vk::Buffer,
        vertex_count: u32,
    },
    /// Composited over earlier layers by an external UI subsystem.
    Overlay(Box<dyn OverlayDraw>),
}

impl DrawKind {
    pub fn load_op(&self) -> vk::AttachmentLoadOp {
        match self {
            DrawKind::Plain | DrawKind::Buffered { .. } => vk::AttachmentLoadOp::CLEAR,
            DrawKind::Overlay(_) => vk::AttachmentLoadOp::DONT_CARE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DrawKind::Plain => "plain",
            DrawKind::Buffered { .. } => "buffered",
            DrawKind::Overlay(_) => "overlay",
        }
    }
}

pub struct CommandRecorder {
    gpu: Arc<dyn Gpu>,
    pool: vk::CommandPool,
    buffers: Vec<vk::CommandBuffer>,
    kind: DrawKind,
    clear: [f32; 4],
}

impl CommandRecorder {
    pub fn new(gpu: Arc<dyn Gpu>, kind: DrawKind, count: usize) -> PresentResult<Self> {
        let pool = gpu
            .create_command_pool()
            .map_err(PresentError::init("command pool"))?;
        let mut rec = Self {
            gpu,
            pool,
            buffers: Vec::new(),
            kind,
            clear: [0.0, 0.0, 0.0, 1.0],
        };
        rec.allocate(count)?;
        Ok(rec)
    }

    fn allocate(&mut self, count: usize) -> PresentResult<()> {
        self.buffers = self
            .gpu
            .allocate_command_buffers(self.pool, count as u32)
            .map_err(PresentError::init("command buffers"))?;
        Ok(())
    }

    fn free(&mut self) {
        if !self.buffers.is_empty() {
            self.gpu.free_command_buffers(self.pool, &self.buffers);
            self.buffers.clear();
        }
    }

    /// Reallocates the buffer array when `count` differs from the current
    /// size. Every buffer is re-recorded before each submission, so an
    /// unchanged count keeps the existing buffers.
    pub fn recreate_command_buffers(&mut self, count: usize) -> PresentResult<()> {
        if count == self.buffers.len() {
            return Ok(());
        }
        debug!(from = self.buffers.len(), to = count, kind = self.kind.name(), "reallocating command buffers");
        self.free();
        self.allocate(count)
    }

    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.clear = rgba;
    }

    pub fn kind(&self) -> &DrawKind {
        &self.kind
    }

    /// Swaps the vertex source of a buffered recorder. Ignored otherwise.
    pub fn set_vertices(&mut self, buffer: vk::Buffer, vertex_count: u32) {
        if let DrawKind::Buffered { buffer: b, vertex_count: n } = &mut self.kind {
            *b = buffer;
            *n = vertex_count;
        }
    }

    /// # Panics
    /// If `index` is out of range.
    pub fn command(&self, index: usize) -> vk::CommandBuffer {
        self.buffers[index]
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn pool(&self) -> vk::CommandPool {
        self.pool
    }

    /// Re-records the buffer of `slot` to draw into the framebuffer of
    /// `image_index`. The slot's fence must have signalled.
    pub fn record(
        &mut self,
        slot: usize,
        image_index: usize,
        render_pass: &RenderPass,
        extent: vk::Extent2D,
        pipeline: Option<vk::Pipeline>,
    ) -> PresentResult<vk::CommandBuffer> {
        let cmd = self.buffers[slot];
        let gpu = self.gpu.as_ref();

        gpu.reset_command_buffer(cmd)
            .map_err(PresentError::device("reset command buffer"))?;
        gpu.begin_command_buffer(cmd, vk::CommandBufferUsageFlags::empty())
            .map_err(PresentError::device("begin command buffer"))?;

        gpu.cmd_begin_render_pass(
            cmd,
            render_pass.handle(),
            render_pass.framebuffer(image_index),
            extent,
            self.clear,
        );
        if let Some(p) = pipeline {
            gpu.cmd_bind_pipeline(cmd, p);
        }
        gpu.cmd_set_viewport_scissor(cmd, extent);

        match &mut self.kind {
            DrawKind::Plain if pipeline.is_some() => gpu.cmd_draw(cmd, 3),
            DrawKind::Buffered { buffer, vertex_count } if pipeline.is_some() => {
                gpu.cmd_bind_vertex_buffer(cmd, *buffer);
                gpu.cmd_draw(cmd, *vertex_count);
            }
            DrawKind::Overlay(overlay) => overlay.record(cmd, extent),
            _ => trace!(slot, "no pipeline bound; recording clear only"),
        }

        gpu.cmd_end_render_pass(cmd);
        gpu.end_command_buffer(cmd)
            .map_err(PresentError::device("end command buffer"))?;
        Ok(cmd)
    }
}

impl Drop for CommandRecorder {
    fn drop(&mut self) {
        self.free();
        self.gpu.destroy_command_pool(self.pool);
    }
}

/// Records `f` into a throwaway buffer from `pool`, submits it and blocks
/// until the queue drains. Meant for uploads outside the frame cycle.
pub fn run_immediate<R>(
    gpu: &dyn Gpu,
    pool: vk::CommandPool,
    f: impl FnOnce(vk::CommandBuffer) -> R,
) -> PresentResult<R> {
    let buffers = gpu
        .allocate_command_buffers(pool, 1)
        .map_err(PresentError::init("one-shot command buffer"))?;
    let cmd = buffers[0];

    let result = (|| -> PresentResult<R> {
        gpu.begin_command_buffer(cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
            .map_err(PresentError::device("begin one-shot"))?;
        let out = f(cmd);
        gpu.end_command_buffer(cmd)
            .map_err(PresentError::device("end one-shot"))?;
        gpu.queue_submit(&Submission {
            wait: vk::Semaphore::null(),
            wait_stage: vk::PipelineStageFlags::empty(),
            command_buffers: &buffers,
            signal: vk::Semaphore::null(),
            fence: vk::Fence::null(),
        })
        .map_err(PresentError::device("submit one-shot"))?;
        gpu.queue_wait_idle()
            .map_err(PresentError::device("wait for one-shot"))?;
        Ok(out)
    })();

    gpu.free_command_buffers(pool, &buffers);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{desktop_support, Call, Kind, MockGpu};
    use crate::swapchain::SwapChain;
    use ash::vk::Handle;
    use lumen_render::{PresentPreference, RenderSize};
    use std::sync::Mutex;

    struct Setup {
        mock: Arc<MockGpu>,
        _sc: SwapChain,
        rp: RenderPass,
        extent: vk::Extent2D,
    }

    fn setup(load_op: vk::AttachmentLoadOp) -> Setup {
        let mock = MockGpu::new(desktop_support(2, 0));
        let sc = SwapChain::new(mock.clone(), RenderSize::new(320, 240), PresentPreference::LowLatency)
            .unwrap();
        let rp = RenderPass::new(mock.clone(), &sc, load_op).unwrap();
        let extent = sc.extent();
        Setup { mock, _sc: sc, rp, extent }
    }

    fn draws(calls: &[Call]) -> Vec<u32> {
        calls
            .iter()
            .filter_map(|c| match c {
                Call::Draw { vertices, .. } => Some(*vertices),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn plain_draws_three_vertices_without_a_buffer() {
        let s = setup(vk::AttachmentLoadOp::CLEAR);
        let mut rec = CommandRecorder::new(s.mock.clone(), DrawKind::Plain, 3).unwrap();
        s.mock.clear_calls();

        let pipeline = vk::Pipeline::from_raw(0x77);
        let cmd = rec.record(1, 2, &s.rp, s.extent, Some(pipeline)).unwrap();
        let calls = s.mock.calls();

        assert_eq!(cmd, rec.command(1));
        assert_eq!(
            calls,
            vec![
                Call::ResetCmd(cmd.as_raw()),
                Call::Begin { cmd: cmd.as_raw(), one_time: false },
                Call::BeginRenderPass {
                    cmd: cmd.as_raw(),
                    render_pass: s.rp.handle().as_raw(),
                    framebuffer: s.rp.framebuffer(2).as_raw(),
                    extent: (320, 240),
                },
                Call::BindPipeline(cmd.as_raw()),
                Call::SetViewportScissor { cmd: cmd.as_raw(), extent: (320, 240) },
                Call::Draw { cmd: cmd.as_raw(), vertices: 3 },
                Call::EndRenderPass(cmd.as_raw()),
                Call::End(cmd.as_raw()),
            ]
        );
    }

    #[test]
    fn buffered_binds_and_draws_vertex_count() {
        let s = setup(vk::AttachmentLoadOp::CLEAR);
        let kind = DrawKind::Buffered {
            buffer: vk::Buffer::from_raw(0x55),
            vertex_count: 6,
        };
        let mut rec = CommandRecorder::new(s.mock.clone(), kind, 2).unwrap();
        s.mock.clear_calls();
        rec.record(0, 0, &s.rp, s.extent, Some(vk::Pipeline::from_raw(1))).unwrap();

        let calls = s.mock.calls();
        assert!(calls.iter().any(|c| matches!(c, Call::BindVertexBuffer(_))));
        assert_eq!(draws(&calls), vec![6]);

        rec.set_vertices(vk::Buffer::from_raw(0x56), 9);
        s.mock.clear_calls();
        rec.record(0, 0, &s.rp, s.extent, Some(vk::Pipeline::from_raw(1))).unwrap();
        assert_eq!(draws(&s.mock.calls()), vec![9]);
    }

    #[test]
    fn missing_pipeline_records_clear_only() {
        let s = setup(vk::AttachmentLoadOp::CLEAR);
        let mut rec = CommandRecorder::new(s.mock.clone(), DrawKind::Plain, 1).unwrap();
        s.mock.clear_calls();
        rec.record(0, 0, &s.rp, s.extent, None).unwrap();
        let calls = s.mock.calls();
        assert!(draws(&calls).is_empty());
        assert!(!calls.iter().any(|c| matches!(c, Call::BindPipeline(_))));
        assert!(calls.iter().any(|c| matches!(c, Call::EndRenderPass(_))));
    }

    struct CountingOverlay(Arc<Mutex<Vec<vk::Extent2D>>>);

    impl OverlayDraw for CountingOverlay {
        fn record(&mut self, _cmd: vk::CommandBuffer, extent: vk::Extent2D) {
            self.0.lock().unwrap().push(extent);
        }
    }

    #[test]
    fn overlay_hands_recording_to_its_hook() {
        let s = setup(vk::AttachmentLoadOp::DONT_CARE);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let kind = DrawKind::Overlay(Box::new(CountingOverlay(seen.clone())));
        assert_eq!(kind.load_op(), vk::AttachmentLoadOp::DONT_CARE);

        let mut rec = CommandRecorder::new(s.mock.clone(), kind, 2).unwrap();
        s.mock.clear_calls();
        rec.record(1, 1, &s.rp, s.extent, None).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![s.extent]);
        assert!(draws(&s.mock.calls()).is_empty());
    }

    #[test]
    fn reallocates_only_when_count_changes() {
        let s = setup(vk::AttachmentLoadOp::CLEAR);
        let mut rec = CommandRecorder::new(s.mock.clone(), DrawKind::Plain, 3).unwrap();
        let before = rec.command(0);
        s.mock.clear_calls();

        rec.recreate_command_buffers(3).unwrap();
        assert!(s.mock.calls().is_empty());
        assert_eq!(rec.command(0), before);

        rec.recreate_command_buffers(4).unwrap();
        assert_eq!(rec.len(), 4);
        assert_eq!(s.mock.live(Kind::CommandBuffer), 4);
        assert!(matches!(s.mock.calls()[0], Call::Free(ref v) if v.len() == 3));
    }

    #[test]
    fn one_shot_submits_and_frees() {
        let s = setup(vk::AttachmentLoadOp::CLEAR);
        let rec = CommandRecorder::new(s.mock.clone(), DrawKind::Plain, 1).unwrap();
        s.mock.clear_calls();

        let mut recorded = None;
        let out = run_immediate(s.mock.as_ref(), rec.pool(), |cmd| {
            recorded = Some(cmd);
            42
        })
        .unwrap();
        assert_eq!(out, 42);

        let cmd = recorded.unwrap().as_raw();
        assert_eq!(
            s.mock.calls(),
            vec![
                Call::Allocate(vec![cmd]),
                Call::Begin { cmd, one_time: true },
                Call::End(cmd),
                Call::Submit { wait: 0, signal: 0, fence: 0, cmds: vec![cmd] },
                Call::QueueWaitIdle,
                Call::Free(vec![cmd]),
            ]
        );
        assert_eq!(s.mock.live(Kind::CommandBuffer), 1);
    }

    #[test]
    fn drop_frees_buffers_and_pool() {
        let s = setup(vk::AttachmentLoadOp::CLEAR);
        let rec = CommandRecorder::new(s.mock.clone(), DrawKind::Plain, 2).unwrap();
        drop(rec);
        assert_eq!(s.mock.live(Kind::CommandBuffer), 0);
        assert_eq!(s.mock.live(Kind::CommandPool), 0);
    }
}
