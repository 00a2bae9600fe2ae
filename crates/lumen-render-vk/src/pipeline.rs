// SPDX-License-Identifier: CEPL-1.0
//! Triangle-list graphics pipeline with dynamic viewport and scissor.

use std::io::Cursor;
use std::sync::Arc;

use ash::util::read_spv;
use ash::vk;
use lumen_render::ShaderSet;
use tracing::{debug, info};

use crate::context::VkContext;
use crate::error::{PresentError, PresentResult};
use crate::frame_loop::LayerPipeline;
use crate::vertex::Vertex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexInput {
    /// Positions come from `gl_VertexIndex`.
    None,
    /// [`Vertex`] at binding 0.
    PosColor,
}

impl VertexInput {
    pub fn bindings(self) -> Vec<vk::VertexInputBindingDescription> {
        match self {
            VertexInput::None => Vec::new(),
            VertexInput::PosColor => vec![Vertex::binding_description()],
        }
    }

    pub fn attributes(self) -> Vec<vk::VertexInputAttributeDescription> {
        match self {
            VertexInput::None => Vec::new(),
            VertexInput::PosColor => Vertex::attribute_descriptions().to_vec(),
        }
    }
}

pub struct GraphicsPipeline {
    ctx: Arc<VkContext>,
    vertex: Vec<u32>,
    fragment: Vec<u32>,
    input: VertexInput,
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

impl GraphicsPipeline {
    pub fn new(
        ctx: Arc<VkContext>,
        render_pass: vk::RenderPass,
        shaders: &ShaderSet,
        input: VertexInput,
    ) -> PresentResult<Self> {
        let vertex = read_spv(&mut Cursor::new(&shaders.vertex[..]))?;
        let fragment = read_spv(&mut Cursor::new(&shaders.fragment[..]))?;

        let layout_info = vk::PipelineLayoutCreateInfo::default();
        // SAFETY: empty layout on a live device.
        let layout = unsafe { ctx.device().create_pipeline_layout(&layout_info, None) }
            .map_err(PresentError::init("pipeline layout"))?;

        let mut p = Self {
            ctx,
            vertex,
            fragment,
            input,
            layout,
            pipeline: vk::Pipeline::null(),
        };
        p.pipeline = p.build(render_pass)?;
        info!(?input, "graphics pipeline ready");
        Ok(p)
    }

    fn shader_module(&self, code: &[u32]) -> PresentResult<vk::ShaderModule> {
        let info = vk::ShaderModuleCreateInfo::default().code(code);
        // SAFETY: `code` was validated by `read_spv`.
        unsafe { self.ctx.device().create_shader_module(&info, None) }
            .map_err(PresentError::init("shader module"))
    }

    fn build(&self, render_pass: vk::RenderPass) -> PresentResult<vk::Pipeline> {
        let device = self.ctx.device();
        let vs = self.shader_module(&self.vertex)?;
        let fs = match self.shader_module(&self.fragment) {
            Ok(fs) => fs,
            Err(e) => {
                unsafe { device.destroy_shader_module(vs, None) };
                return Err(e);
            }
        };

        let stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vs)
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fs)
                .name(c"main"),
        ];

        let bindings = self.input.bindings();
        let attributes = self.input.attributes();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST);
        let dyn_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dyn_states);
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        let raster = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE)
            .line_width(1.0);
        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);
        let blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(
                vk::ColorComponentFlags::R
                    | vk::ColorComponentFlags::G
                    | vk::ColorComponentFlags::B
                    | vk::ColorComponentFlags::A,
            )
            .blend_enable(false);
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
            .attachments(std::slice::from_ref(&blend_attachment));

        let info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&raster)
            .multisample_state(&multisample)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(self.layout)
            .render_pass(render_pass)
            .subpass(0);

        // SAFETY: every referenced state struct lives until the call returns.
        let created = unsafe {
            device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                std::slice::from_ref(&info),
                None,
            )
        };
        unsafe {
            device.destroy_shader_module(vs, None);
            device.destroy_shader_module(fs, None);
        }
        match created {
            Ok(pipelines) => Ok(pipelines[0]),
            Err((_, e)) => Err(PresentError::init("graphics pipeline")(e)),
        }
    }

    pub fn input(&self) -> VertexInput {
        self.input
    }
}

impl LayerPipeline for GraphicsPipeline {
    fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// A pipeline stays valid with any render pass compatible with the one it
    /// was built against; a new pass with the same single colour format is
    /// compatible, and viewport/scissor are dynamic. Only a format change
    /// forces a rebuild.
    fn render_pass_changed(
        &mut self,
        render_pass: vk::RenderPass,
        format_changed: bool,
    ) -> PresentResult<()> {
        if !format_changed {
            return Ok(());
        }
        debug!("colour format changed, rebuilding pipeline");
        let next = self.build(render_pass)?;
        // SAFETY: called during recreation, after the device went idle.
        unsafe { self.ctx.device().destroy_pipeline(self.pipeline, None) };
        self.pipeline = next;
        Ok(())
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        // SAFETY: the owning frame loop idles the device before layers drop.
        unsafe {
            let d = self.ctx.device();
            d.destroy_pipeline(self.pipeline, None);
            d.destroy_pipeline_layout(self.layout, None);
        }
    }
}
