// SPDX-License-Identifier: CEPL-1.0
//! Scripted [`Gpu`] for unit tests (no device required).
//!
//! Handles are unique integers. The fake enforces the rules a validation
//! layer would: destroying a handle twice, waiting on a fence nothing will
//! signal, resetting or resubmitting an in-flight fence, and re-recording a
//! command buffer that the GPU may still be executing all panic.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use ash::prelude::VkResult;
use ash::vk::{self, Handle};

use crate::gpu::{Gpu, RenderPassDesc, Submission, SwapchainDesc};
use crate::surface::{SurfaceSupport, PREFERRED_FORMAT, UNDEFINED_EXTENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Swapchain,
    ImageView,
    RenderPass,
    Framebuffer,
    CommandPool,
    CommandBuffer,
    Semaphore,
    Fence,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateSwapchain { handle: u64, old: u64, images: u32, extent: (u32, u32) },
    DestroySwapchain(u64),
    CreateRenderPass { handle: u64, load_op: vk::AttachmentLoadOp },
    DestroyRenderPass(u64),
    CreateFramebuffer { handle: u64, render_pass: u64, extent: (u32, u32) },
    DestroyFramebuffer(u64),
    Allocate(Vec<u64>),
    Free(Vec<u64>),
    WaitFence(u64),
    ResetFence(u64),
    DeviceWaitIdle,
    QueueWaitIdle,
    Acquire { swapchain: u64, semaphore: u64 },
    Submit { wait: u64, signal: u64, fence: u64, cmds: Vec<u64> },
    Present { swapchain: u64, image: u32, wait: u64 },
    ResetCmd(u64),
    Begin { cmd: u64, one_time: bool },
    End(u64),
    BeginRenderPass { cmd: u64, render_pass: u64, framebuffer: u64, extent: (u32, u32) },
    EndRenderPass(u64),
    BindPipeline(u64),
    SetViewportScissor { cmd: u64, extent: (u32, u32) },
    BindVertexBuffer(u64),
    Draw { cmd: u64, vertices: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Unsignaled,
    Pending,
    Signaled,
}

#[derive(Default)]
struct State {
    next_handle: u64,
    live: HashMap<Kind, HashSet<u64>>,
    fences: HashMap<u64, FenceState>,
    cmd_fence: HashMap<u64, u64>,
    swapchain_images: HashMap<u64, Vec<vk::Image>>,
    next_image: u32,
    support: SurfaceSupport,
    acquire_script: VecDeque<VkResult<(u32, bool)>>,
    present_script: VecDeque<VkResult<bool>>,
    fail_create: Option<(Kind, vk::Result)>,
    calls: Vec<Call>,
}

pub struct MockGpu {
    state: Mutex<State>,
}

pub fn extent_pair(e: vk::Extent2D) -> (u32, u32) {
    (e.width, e.height)
}

/// A desktop-like surface: size follows the window, 2..=8 images, MAILBOX.
pub fn desktop_support(min_images: u32, max_images: u32) -> SurfaceSupport {
    SurfaceSupport {
        capabilities: vk::SurfaceCapabilitiesKHR {
            min_image_count: min_images,
            max_image_count: max_images,
            current_extent: vk::Extent2D {
                width: UNDEFINED_EXTENT,
                height: UNDEFINED_EXTENT,
            },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        },
        formats: vec![PREFERRED_FORMAT],
        present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
    }
}

impl MockGpu {
    pub fn new(support: SurfaceSupport) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                next_handle: 0x1000,
                support,
                ..Default::default()
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn set_support(&self, support: SurfaceSupport) {
        self.lock().support = support;
    }

    pub fn script_acquire(&self, result: VkResult<(u32, bool)>) {
        self.lock().acquire_script.push_back(result);
    }

    pub fn script_present(&self, result: VkResult<bool>) {
        self.lock().present_script.push_back(result);
    }

    pub fn fail_next_create(&self, kind: Kind, result: vk::Result) {
        self.lock().fail_create = Some((kind, result));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn live(&self, kind: Kind) -> usize {
        self.lock().live.get(&kind).map_or(0, HashSet::len)
    }

    pub fn is_live(&self, kind: Kind, raw: u64) -> bool {
        self.lock()
            .live
            .get(&kind)
            .is_some_and(|set| set.contains(&raw))
    }

    pub fn fence_signaled(&self, fence: vk::Fence) -> bool {
        self.lock().fences.get(&fence.as_raw()) == Some(&FenceState::Signaled)
    }
}

impl State {
    fn create(&mut self, kind: Kind) -> VkResult<u64> {
        if let Some((k, err)) = self.fail_create {
            if k == kind {
                self.fail_create = None;
                return Err(err);
            }
        }
        self.next_handle += 1;
        let raw = self.next_handle;
        self.live.entry(kind).or_default().insert(raw);
        Ok(raw)
    }

    fn destroy(&mut self, kind: Kind, raw: u64) {
        let removed = self.live.get_mut(&kind).is_some_and(|s| s.remove(&raw));
        assert!(removed, "destroying {kind:?} {raw:#x} that is not live");
    }

    fn assert_live(&self, kind: Kind, raw: u64) {
        assert!(
            self.live.get(&kind).is_some_and(|s| s.contains(&raw)),
            "{kind:?} {raw:#x} used after destruction"
        );
    }
}

impl Gpu for MockGpu {
    fn surface_support(&self) -> VkResult<SurfaceSupport> {
        Ok(self.lock().support.clone())
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR> {
        let mut s = self.lock();
        if desc.old_swapchain != vk::SwapchainKHR::null() {
            s.assert_live(Kind::Swapchain, desc.old_swapchain.as_raw());
        }
        assert!(desc.extent.width > 0 && desc.extent.height > 0, "zero-extent swapchain");
        let raw = s.create(Kind::Swapchain)?;
        let images = (0..desc.min_image_count)
            .map(|i| vk::Image::from_raw(0x9000_0000 + raw * 16 + u64::from(i)))
            .collect();
        s.swapchain_images.insert(raw, images);
        s.next_image = 0;
        s.calls.push(Call::CreateSwapchain {
            handle: raw,
            old: desc.old_swapchain.as_raw(),
            images: desc.min_image_count,
            extent: extent_pair(desc.extent),
        });
        Ok(vk::SwapchainKHR::from_raw(raw))
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        let s = self.lock();
        Ok(s.swapchain_images
            .get(&swapchain.as_raw())
            .cloned()
            .unwrap_or_default())
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        let mut s = self.lock();
        s.destroy(Kind::Swapchain, swapchain.as_raw());
        s.calls.push(Call::DestroySwapchain(swapchain.as_raw()));
    }

    fn create_image_view(&self, _image: vk::Image, _format: vk::Format) -> VkResult<vk::ImageView> {
        self.lock().create(Kind::ImageView).map(vk::ImageView::from_raw)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.lock().destroy(Kind::ImageView, view.as_raw());
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        let mut s = self.lock();
        s.assert_live(Kind::Swapchain, swapchain.as_raw());
        s.calls.push(Call::Acquire {
            swapchain: swapchain.as_raw(),
            semaphore: signal.as_raw(),
        });
        if let Some(scripted) = s.acquire_script.pop_front() {
            return scripted;
        }
        let count = s
            .swapchain_images
            .get(&swapchain.as_raw())
            .map_or(1, |v| v.len() as u32);
        let index = s.next_image % count;
        s.next_image += 1;
        Ok((index, false))
    }

    fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool> {
        let mut s = self.lock();
        s.assert_live(Kind::Swapchain, swapchain.as_raw());
        s.calls.push(Call::Present {
            swapchain: swapchain.as_raw(),
            image: image_index,
            wait: wait.as_raw(),
        });
        s.present_script.pop_front().unwrap_or(Ok(false))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> VkResult<vk::RenderPass> {
        let mut s = self.lock();
        let raw = s.create(Kind::RenderPass)?;
        s.calls.push(Call::CreateRenderPass {
            handle: raw,
            load_op: desc.attachment.load_op,
        });
        Ok(vk::RenderPass::from_raw(raw))
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        let mut s = self.lock();
        s.destroy(Kind::RenderPass, render_pass.as_raw());
        s.calls.push(Call::DestroyRenderPass(render_pass.as_raw()));
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> VkResult<vk::Framebuffer> {
        let mut s = self.lock();
        s.assert_live(Kind::RenderPass, render_pass.as_raw());
        s.assert_live(Kind::ImageView, view.as_raw());
        let raw = s.create(Kind::Framebuffer)?;
        s.calls.push(Call::CreateFramebuffer {
            handle: raw,
            render_pass: render_pass.as_raw(),
            extent: extent_pair(extent),
        });
        Ok(vk::Framebuffer::from_raw(raw))
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        let mut s = self.lock();
        s.destroy(Kind::Framebuffer, framebuffer.as_raw());
        s.calls.push(Call::DestroyFramebuffer(framebuffer.as_raw()));
    }

    fn create_command_pool(&self) -> VkResult<vk::CommandPool> {
        self.lock().create(Kind::CommandPool).map(vk::CommandPool::from_raw)
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        self.lock().destroy(Kind::CommandPool, pool.as_raw());
    }

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        let mut s = self.lock();
        s.assert_live(Kind::CommandPool, pool.as_raw());
        let mut raws = Vec::with_capacity(count as usize);
        for _ in 0..count {
            raws.push(s.create(Kind::CommandBuffer)?);
        }
        s.calls.push(Call::Allocate(raws.clone()));
        Ok(raws.into_iter().map(vk::CommandBuffer::from_raw).collect())
    }

    fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        let mut s = self.lock();
        s.assert_live(Kind::CommandPool, pool.as_raw());
        for b in buffers {
            s.destroy(Kind::CommandBuffer, b.as_raw());
        }
        s.calls
            .push(Call::Free(buffers.iter().map(|b| b.as_raw()).collect()));
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        self.lock().create(Kind::Semaphore).map(vk::Semaphore::from_raw)
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.lock().destroy(Kind::Semaphore, semaphore.as_raw());
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let mut s = self.lock();
        let raw = s.create(Kind::Fence)?;
        let state = if signaled {
            FenceState::Signaled
        } else {
            FenceState::Unsignaled
        };
        s.fences.insert(raw, state);
        Ok(vk::Fence::from_raw(raw))
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        let mut s = self.lock();
        assert_ne!(
            s.fences.get(&fence.as_raw()),
            Some(&FenceState::Pending),
            "destroying a fence the GPU has not signaled"
        );
        s.destroy(Kind::Fence, fence.as_raw());
        s.fences.remove(&fence.as_raw());
    }

    fn wait_for_fence(&self, fence: vk::Fence) -> VkResult<()> {
        let mut s = self.lock();
        let raw = fence.as_raw();
        s.calls.push(Call::WaitFence(raw));
        match s.fences.get(&raw).copied() {
            Some(FenceState::Pending) | Some(FenceState::Signaled) => {
                s.fences.insert(raw, FenceState::Signaled);
                Ok(())
            }
            Some(FenceState::Unsignaled) => panic!("waiting on fence {raw:#x} that nothing will signal"),
            None => panic!("waiting on unknown fence {raw:#x}"),
        }
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        let mut s = self.lock();
        let raw = fence.as_raw();
        s.calls.push(Call::ResetFence(raw));
        assert_ne!(
            s.fences.get(&raw),
            Some(&FenceState::Pending),
            "resetting an in-flight fence"
        );
        s.fences.insert(raw, FenceState::Unsignaled);
        Ok(())
    }

    fn device_wait_idle(&self) -> VkResult<()> {
        let mut s = self.lock();
        s.calls.push(Call::DeviceWaitIdle);
        for state in s.fences.values_mut() {
            if *state == FenceState::Pending {
                *state = FenceState::Signaled;
            }
        }
        Ok(())
    }

    fn queue_submit(&self, submission: &Submission<'_>) -> VkResult<()> {
        let mut s = self.lock();
        let fence = submission.fence.as_raw();
        if fence != 0 {
            assert_eq!(
                s.fences.get(&fence),
                Some(&FenceState::Unsignaled),
                "submission fence must be reset before submit"
            );
            s.fences.insert(fence, FenceState::Pending);
        }
        for cmd in submission.command_buffers {
            s.assert_live(Kind::CommandBuffer, cmd.as_raw());
            s.cmd_fence.insert(cmd.as_raw(), fence);
        }
        s.calls.push(Call::Submit {
            wait: submission.wait.as_raw(),
            signal: submission.signal.as_raw(),
            fence,
            cmds: submission.command_buffers.iter().map(|c| c.as_raw()).collect(),
        });
        Ok(())
    }

    fn queue_wait_idle(&self) -> VkResult<()> {
        let mut s = self.lock();
        s.calls.push(Call::QueueWaitIdle);
        for state in s.fences.values_mut() {
            if *state == FenceState::Pending {
                *state = FenceState::Signaled;
            }
        }
        Ok(())
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        let mut s = self.lock();
        let raw = cmd.as_raw();
        s.assert_live(Kind::CommandBuffer, raw);
        if let Some(fence) = s.cmd_fence.get(&raw).copied() {
            assert_ne!(
                s.fences.get(&fence),
                Some(&FenceState::Pending),
                "re-recording command buffer {raw:#x} while the GPU may still execute it"
            );
        }
        s.calls.push(Call::ResetCmd(raw));
        Ok(())
    }

    fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        usage: vk::CommandBufferUsageFlags,
    ) -> VkResult<()> {
        let mut s = self.lock();
        s.assert_live(Kind::CommandBuffer, cmd.as_raw());
        s.calls.push(Call::Begin {
            cmd: cmd.as_raw(),
            one_time: usage.contains(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT),
        });
        Ok(())
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.lock().calls.push(Call::End(cmd.as_raw()));
        Ok(())
    }

    fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        _clear: [f32; 4],
    ) {
        let mut s = self.lock();
        s.assert_live(Kind::RenderPass, render_pass.as_raw());
        s.assert_live(Kind::Framebuffer, framebuffer.as_raw());
        s.calls.push(Call::BeginRenderPass {
            cmd: cmd.as_raw(),
            render_pass: render_pass.as_raw(),
            framebuffer: framebuffer.as_raw(),
            extent: extent_pair(extent),
        });
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        self.lock().calls.push(Call::EndRenderPass(cmd.as_raw()));
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, _pipeline: vk::Pipeline) {
        self.lock().calls.push(Call::BindPipeline(cmd.as_raw()));
    }

    fn cmd_set_viewport_scissor(&self, cmd: vk::CommandBuffer, extent: vk::Extent2D) {
        self.lock().calls.push(Call::SetViewportScissor {
            cmd: cmd.as_raw(),
            extent: extent_pair(extent),
        });
    }

    fn cmd_bind_vertex_buffer(&self, cmd: vk::CommandBuffer, _buffer: vk::Buffer) {
        self.lock().calls.push(Call::BindVertexBuffer(cmd.as_raw()));
    }

    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32) {
        self.lock().calls.push(Call::Draw {
            cmd: cmd.as_raw(),
            vertices: vertex_count,
        });
    }
}
