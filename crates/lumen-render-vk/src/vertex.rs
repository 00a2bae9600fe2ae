// SPDX-License-Identifier: CEPL-1.0
use std::mem::{offset_of, size_of};
use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use tracing::debug;

use crate::command::run_immediate;
use crate::context::VkContext;
use crate::error::{PresentError, PresentResult};
use crate::gpu::Gpu;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub color: [f32; 3],
}

/// Clockwise in framebuffer space (y down), matching the pipeline's front face.
pub const TRIANGLE: [Vertex; 3] = [
    Vertex { pos: [0.0, -0.5, 0.0], color: [1.0, 0.0, 0.0] },
    Vertex { pos: [0.5, 0.5, 0.0], color: [0.0, 1.0, 0.0] },
    Vertex { pos: [-0.5, 0.5, 0.0], color: [0.0, 0.0, 1.0] },
];

impl Vertex {
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        [
            vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Vertex, pos) as u32,
            },
            vk::VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Vertex, color) as u32,
            },
        ]
    }
}

/// Device-local vertex buffer filled once through a staging copy.
pub struct VertexBuffer {
    ctx: Arc<VkContext>,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    count: u32,
}

impl VertexBuffer {
    pub fn upload(ctx: &Arc<VkContext>, vertices: &[Vertex]) -> PresentResult<Self> {
        if vertices.is_empty() {
            return Err(PresentError::Unsupported("empty vertex buffer".into()));
        }
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let size = bytes.len() as vk::DeviceSize;

        let (staging, staging_mem) = ctx.create_buffer(
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        let result = Self::fill(ctx, staging, staging_mem, bytes, vertices.len() as u32);
        ctx.destroy_buffer(staging, staging_mem);
        result
    }

    fn fill(
        ctx: &Arc<VkContext>,
        staging: vk::Buffer,
        staging_mem: vk::DeviceMemory,
        bytes: &[u8],
        count: u32,
    ) -> PresentResult<Self> {
        let size = bytes.len() as vk::DeviceSize;
        ctx.write_memory(staging_mem, bytes)?;

        let (buffer, memory) = ctx.create_buffer(
            size,
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        let vb = Self {
            ctx: ctx.clone(),
            buffer,
            memory,
            count,
        };

        let pool = ctx
            .create_command_pool()
            .map_err(PresentError::init("upload command pool"))?;
        let copied = run_immediate(ctx.as_ref(), pool, |cmd| {
            ctx.cmd_copy_buffer(cmd, staging, buffer, size)
        });
        ctx.destroy_command_pool(pool);
        copied?;

        debug!(vertices = count, bytes = size, "vertex buffer uploaded");
        Ok(vb)
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn len(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        self.ctx.destroy_buffer(self.buffer, self.memory);
    }
}
