// SPDX-License-Identifier: CEPL-1.0
//! Instance, surface, device and queues, and the [`Gpu`] implementation over
//! them.
//!
//! Creation order matters: the surface comes from this instance, and the
//! physical device is chosen against that surface.

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;

use ash::ext::debug_utils as ext_debug;
use ash::khr::{surface, swapchain};
use ash::prelude::VkResult;
use ash::{vk, Entry, Instance};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use tracing::{debug, error, info, trace, warn};

use crate::error::{PresentError, PresentResult};
use crate::gpu::{Gpu, RenderPassDesc, Submission, SwapchainDesc};
use crate::surface::SurfaceSupport;

pub const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Startup options for [`VkContext::new`].
#[derive(Clone, Debug)]
pub struct InstanceConfig {
    pub app_name: String,
    /// Enables `VK_EXT_debug_utils` and `validation_layers`.
    pub validation: bool,
    pub validation_layers: Vec<String>,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            app_name: "lumen".into(),
            validation: cfg!(debug_assertions),
            validation_layers: vec![VALIDATION_LAYER.into()],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    fn shared(&self) -> bool {
        self.graphics == self.present
    }
}

struct DebugMessenger {
    loader: ext_debug::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

pub struct VkContext {
    _entry: Entry,
    instance: Instance,
    debug: Option<DebugMessenger>,
    surface_loader: surface::Instance,
    surface: vk::SurfaceKHR,
    phys: vk::PhysicalDevice,
    device: ash::Device,
    families: QueueFamilies,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    swapchain_loader: swapchain::Device,
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut c_void,
) -> vk::Bool32 {
    if data.is_null() {
        return vk::FALSE;
    }
    // SAFETY: the loader hands us a valid callback struct for this call.
    let p_message = unsafe { (*data).p_message };
    if p_message.is_null() {
        return vk::FALSE;
    }
    let msg = unsafe { CStr::from_ptr(p_message) }.to_string_lossy();
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!(target: "vulkan", "{msg}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!(target: "vulkan", "{msg}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        debug!(target: "vulkan", "{msg}");
    } else {
        trace!(target: "vulkan", "{msg}");
    }
    vk::FALSE
}

fn cstrings(names: &[String]) -> PresentResult<Vec<CString>> {
    names
        .iter()
        .map(|n| CString::new(n.as_str()).map_err(|_| PresentError::Unsupported(format!("bad name {n:?}"))))
        .collect()
}

fn create_instance(
    entry: &Entry,
    display: RawDisplayHandle,
    cfg: &InstanceConfig,
) -> PresentResult<Instance> {
    let app_name = CString::new(cfg.app_name.as_str()).unwrap_or_else(|_| c"lumen".to_owned());
    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .engine_name(c"lumen")
        .api_version(vk::API_VERSION_1_0);

    let mut extensions = ash_window::enumerate_required_extensions(display)
        .map_err(PresentError::init("window-system extension list"))?
        .to_vec();

    let layers = if cfg.validation {
        let wanted = cstrings(&cfg.validation_layers)?;
        // SAFETY: plain enumeration on a loaded entry.
        let available = unsafe { entry.enumerate_instance_layer_properties() }
            .map_err(PresentError::init("instance layer list"))?;
        for layer in &wanted {
            let found = available
                .iter()
                .any(|p| p.layer_name_as_c_str().is_ok_and(|n| n == layer.as_c_str()));
            if !found {
                return Err(PresentError::Unsupported(format!(
                    "validation layer {} is not installed",
                    layer.to_string_lossy()
                )));
            }
        }
        extensions.push(ext_debug::NAME.as_ptr());
        wanted
    } else {
        Vec::new()
    };
    let layer_ptrs: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extensions)
        .enabled_layer_names(&layer_ptrs);

    // SAFETY: every pointer in `create_info` outlives the call.
    unsafe { entry.create_instance(&create_info, None) }.map_err(PresentError::init("instance"))
}

fn create_debug_messenger(entry: &Entry, instance: &Instance) -> PresentResult<DebugMessenger> {
    let loader = ext_debug::Instance::new(entry, instance);
    let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback));
    // SAFETY: the instance was created with VK_EXT_debug_utils enabled.
    let messenger = unsafe { loader.create_debug_utils_messenger(&info, None) }
        .map_err(PresentError::init("debug messenger"))?;
    Ok(DebugMessenger { loader, messenger })
}

fn has_swapchain_extension(instance: &Instance, phys: vk::PhysicalDevice) -> bool {
    // SAFETY: `phys` was enumerated from `instance`.
    unsafe { instance.enumerate_device_extension_properties(phys) }
        .unwrap_or_default()
        .iter()
        .any(|e| e.extension_name_as_c_str().is_ok_and(|n| n == swapchain::NAME))
}

fn query_support(
    loader: &surface::Instance,
    phys: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> VkResult<SurfaceSupport> {
    // SAFETY: `surface` and `phys` belong to the same instance as `loader`.
    unsafe {
        Ok(SurfaceSupport {
            capabilities: loader.get_physical_device_surface_capabilities(phys, surface)?,
            formats: loader.get_physical_device_surface_formats(phys, surface)?,
            present_modes: loader.get_physical_device_surface_present_modes(phys, surface)?,
        })
    }
}

/// First adapter with graphics and present queues, the swapchain extension
/// and at least one surface format and present mode.
fn pick_device(
    instance: &Instance,
    loader: &surface::Instance,
    surface: vk::SurfaceKHR,
) -> PresentResult<(vk::PhysicalDevice, QueueFamilies)> {
    // SAFETY: enumeration on a live instance.
    let devices = unsafe { instance.enumerate_physical_devices() }
        .map_err(PresentError::init("physical device list"))?;

    for phys in devices {
        // SAFETY: `phys` came from `instance`.
        let props = unsafe { instance.get_physical_device_properties(phys) };
        let name = props
            .device_name_as_c_str()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let queues = unsafe { instance.get_physical_device_queue_family_properties(phys) };
        let graphics = queues
            .iter()
            .position(|q| q.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|i| i as u32);
        let presents = |i: u32| unsafe {
            loader
                .get_physical_device_surface_support(phys, i, surface)
                .unwrap_or(false)
        };
        // Same family for both if it can present.
        let present = match graphics {
            Some(g) if presents(g) => Some(g),
            _ => (0..queues.len() as u32).find(|&i| presents(i)),
        };

        let (Some(graphics), Some(present)) = (graphics, present) else {
            debug!(device = %name, "skipped: missing graphics or present queue");
            continue;
        };
        if !has_swapchain_extension(instance, phys) {
            debug!(device = %name, "skipped: no VK_KHR_swapchain");
            continue;
        }
        match query_support(loader, phys, surface) {
            Ok(s) if s.is_adequate() => {}
            _ => {
                debug!(device = %name, "skipped: surface has no formats or present modes");
                continue;
            }
        }

        info!(device = %name, graphics, present, "selected physical device");
        return Ok((phys, QueueFamilies { graphics, present }));
    }
    Err(PresentError::Unsupported(
        "no physical device can present to this surface".into(),
    ))
}

fn create_device(
    instance: &Instance,
    phys: vk::PhysicalDevice,
    families: QueueFamilies,
) -> PresentResult<ash::Device> {
    let priorities = [1.0_f32];
    let mut queue_infos = vec![vk::DeviceQueueCreateInfo::default()
        .queue_family_index(families.graphics)
        .queue_priorities(&priorities)];
    if !families.shared() {
        queue_infos.push(
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(families.present)
                .queue_priorities(&priorities),
        );
    }
    let extensions = [swapchain::NAME.as_ptr()];
    let info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_infos)
        .enabled_extension_names(&extensions);
    // SAFETY: `phys` supports every requested queue family and extension.
    unsafe { instance.create_device(phys, &info, None) }.map_err(PresentError::init("logical device"))
}

impl VkContext {
    pub fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        cfg: &InstanceConfig,
    ) -> PresentResult<Self> {
        let dh = display.display_handle()?.as_raw();
        let wh = window.window_handle()?.as_raw();

        let entry = Entry::linked();
        let instance = create_instance(&entry, dh, cfg)?;
        let debug = if cfg.validation {
            match create_debug_messenger(&entry, &instance) {
                Ok(d) => Some(d),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        let surface_loader = surface::Instance::new(&entry, &instance);
        // SAFETY: the handles come from a live window that outlives the context.
        let surface = match unsafe { ash_window::create_surface(&entry, &instance, dh, wh, None) } {
            Ok(s) => s,
            Err(e) => {
                destroy_instance(&instance, debug.as_ref());
                return Err(PresentError::init("surface")(e));
            }
        };

        let picked = pick_device(&instance, &surface_loader, surface)
            .and_then(|(phys, families)| Ok((phys, families, create_device(&instance, phys, families)?)));
        let (phys, families, device) = match picked {
            Ok(p) => p,
            Err(e) => {
                unsafe { surface_loader.destroy_surface(surface, None) };
                destroy_instance(&instance, debug.as_ref());
                return Err(e);
            }
        };

        // SAFETY: both families were requested with one queue each.
        let graphics_queue = unsafe { device.get_device_queue(families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(families.present, 0) };
        let swapchain_loader = swapchain::Device::new(&instance, &device);

        Ok(Self {
            _entry: entry,
            instance,
            debug,
            surface_loader,
            surface,
            phys,
            device,
            families,
            graphics_queue,
            present_queue,
            swapchain_loader,
        })
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn queue_families(&self) -> QueueFamilies {
        self.families
    }

    fn find_memory_type(&self, type_bits: u32, wanted: vk::MemoryPropertyFlags) -> Option<u32> {
        // SAFETY: `phys` belongs to `instance`.
        let mem = unsafe { self.instance.get_physical_device_memory_properties(self.phys) };
        (0..mem.memory_type_count).find(|&i| {
            type_bits & (1 << i) != 0
                && mem.memory_types[i as usize].property_flags.contains(wanted)
        })
    }

    /// A buffer with its own dedicated allocation.
    pub fn create_buffer(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        props: vk::MemoryPropertyFlags,
    ) -> PresentResult<(vk::Buffer, vk::DeviceMemory)> {
        let info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let d = &self.device;
        // SAFETY: plain object creation on a live device; failures are unwound.
        unsafe {
            let buffer = d.create_buffer(&info, None).map_err(PresentError::init("buffer"))?;
            let req = d.get_buffer_memory_requirements(buffer);
            let Some(memory_type_index) = self.find_memory_type(req.memory_type_bits, props) else {
                d.destroy_buffer(buffer, None);
                return Err(PresentError::Unsupported(format!("no memory type with {props:?}")));
            };
            let alloc = vk::MemoryAllocateInfo::default()
                .allocation_size(req.size)
                .memory_type_index(memory_type_index);
            let memory = match d.allocate_memory(&alloc, None) {
                Ok(m) => m,
                Err(e) => {
                    d.destroy_buffer(buffer, None);
                    return Err(PresentError::init("buffer memory")(e));
                }
            };
            if let Err(e) = d.bind_buffer_memory(buffer, memory, 0) {
                d.destroy_buffer(buffer, None);
                d.free_memory(memory, None);
                return Err(PresentError::init("buffer binding")(e));
            }
            Ok((buffer, memory))
        }
    }

    /// Copies `bytes` into host-visible, host-coherent `memory`.
    pub fn write_memory(&self, memory: vk::DeviceMemory, bytes: &[u8]) -> PresentResult<()> {
        // SAFETY: the mapping covers `bytes.len()` and is released before return.
        unsafe {
            let ptr = self
                .device
                .map_memory(memory, 0, bytes.len() as vk::DeviceSize, vk::MemoryMapFlags::empty())
                .map_err(PresentError::device("map memory"))?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
            self.device.unmap_memory(memory);
        }
        Ok(())
    }

    pub fn destroy_buffer(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) {
        // SAFETY: callers only destroy buffers no pending work references.
        unsafe {
            self.device.destroy_buffer(buffer, None);
            self.device.free_memory(memory, None);
        }
    }

    pub fn cmd_copy_buffer(&self, cmd: vk::CommandBuffer, src: vk::Buffer, dst: vk::Buffer, size: vk::DeviceSize) {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        // SAFETY: `cmd` is recording.
        unsafe {
            self.device
                .cmd_copy_buffer(cmd, src, dst, std::slice::from_ref(&region))
        };
    }
}

fn destroy_instance(instance: &Instance, debug: Option<&DebugMessenger>) {
    // SAFETY: nothing created from the instance is alive any more.
    unsafe {
        if let Some(d) = debug {
            d.loader.destroy_debug_utils_messenger(d.messenger, None);
        }
        instance.destroy_instance(None);
    }
}

impl Drop for VkContext {
    fn drop(&mut self) {
        // SAFETY: every component holding this context has been dropped.
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
        }
        destroy_instance(&self.instance, self.debug.as_ref());
    }
}

// Every method forwards to `ash`. Handles passed in were created through the
// same context, which is the safety contract of each call.
impl Gpu for VkContext {
    fn surface_support(&self) -> VkResult<SurfaceSupport> {
        query_support(&self.surface_loader, self.phys, self.surface)
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR> {
        let families = [self.families.graphics, self.families.present];
        let mut info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(desc.min_image_count)
            .image_format(desc.format.format)
            .image_color_space(desc.format.color_space)
            .image_extent(desc.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(desc.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(desc.present_mode)
            .clipped(true)
            .old_swapchain(desc.old_swapchain);
        info = if self.families.shared() {
            info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        } else {
            info.image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&families)
        };
        unsafe { self.swapchain_loader.create_swapchain(&info, None) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        unsafe { self.swapchain_loader.get_swapchain_images(swapchain) }
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) }
    }

    fn create_image_view(&self, image: vk::Image, format: vk::Format) -> VkResult<vk::ImageView> {
        let info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        unsafe { self.device.create_image_view(&info, None) }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) }
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        unsafe {
            self.swapchain_loader
                .acquire_next_image(swapchain, u64::MAX, signal, vk::Fence::null())
        }
    }

    fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool> {
        let waits = [wait];
        let swapchains = [swapchain];
        let indices = [image_index];
        let info = vk::PresentInfoKHR::default()
            .wait_semaphores(&waits)
            .swapchains(&swapchains)
            .image_indices(&indices);
        unsafe { self.swapchain_loader.queue_present(self.present_queue, &info) }
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> VkResult<vk::RenderPass> {
        let color_ref = vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        };
        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(std::slice::from_ref(&color_ref));
        let info = vk::RenderPassCreateInfo::default()
            .attachments(std::slice::from_ref(&desc.attachment))
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&desc.dependency));
        unsafe { self.device.create_render_pass(&info, None) }
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.device.destroy_render_pass(render_pass, None) }
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> VkResult<vk::Framebuffer> {
        let info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(std::slice::from_ref(&view))
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        unsafe { self.device.create_framebuffer(&info, None) }
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.device.destroy_framebuffer(framebuffer, None) }
    }

    fn create_command_pool(&self) -> VkResult<vk::CommandPool> {
        let info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(self.families.graphics);
        unsafe { self.device.create_command_pool(&info, None) }
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.device.destroy_command_pool(pool, None) }
    }

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);
        unsafe { self.device.allocate_command_buffers(&info) }
    }

    fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        unsafe { self.device.free_command_buffers(pool, buffers) }
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        unsafe {
            self.device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
        }
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) }
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        unsafe {
            self.device
                .create_fence(&vk::FenceCreateInfo::default().flags(flags), None)
        }
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) }
    }

    fn wait_for_fence(&self, fence: vk::Fence) -> VkResult<()> {
        unsafe { self.device.wait_for_fences(&[fence], true, u64::MAX) }
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        unsafe { self.device.reset_fences(&[fence]) }
    }

    fn device_wait_idle(&self) -> VkResult<()> {
        unsafe { self.device.device_wait_idle() }
    }

    fn queue_submit(&self, submission: &Submission<'_>) -> VkResult<()> {
        let waits = [submission.wait];
        let stages = [submission.wait_stage];
        let signals = [submission.signal];
        let mut info = vk::SubmitInfo::default().command_buffers(submission.command_buffers);
        if submission.wait != vk::Semaphore::null() {
            info = info.wait_semaphores(&waits).wait_dst_stage_mask(&stages);
        }
        if submission.signal != vk::Semaphore::null() {
            info = info.signal_semaphores(&signals);
        }
        unsafe {
            self.device
                .queue_submit(self.graphics_queue, std::slice::from_ref(&info), submission.fence)
        }
    }

    fn queue_wait_idle(&self) -> VkResult<()> {
        unsafe { self.device.queue_wait_idle(self.graphics_queue) }
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        unsafe {
            self.device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
        }
    }

    fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        usage: vk::CommandBufferUsageFlags,
    ) -> VkResult<()> {
        let info = vk::CommandBufferBeginInfo::default().flags(usage);
        unsafe { self.device.begin_command_buffer(cmd, &info) }
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        unsafe { self.device.end_command_buffer(cmd) }
    }

    fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear: [f32; 4],
    ) {
        let clears = [vk::ClearValue {
            color: vk::ClearColorValue { float32: clear },
        }];
        let info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clears);
        unsafe {
            self.device
                .cmd_begin_render_pass(cmd, &info, vk::SubpassContents::INLINE)
        }
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        unsafe { self.device.cmd_end_render_pass(cmd) }
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline)
        }
    }

    fn cmd_set_viewport_scissor(&self, cmd: vk::CommandBuffer, extent: vk::Extent2D) {
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        unsafe {
            self.device.cmd_set_viewport(cmd, 0, &[viewport]);
            self.device.cmd_set_scissor(cmd, 0, &[scissor]);
        }
    }

    fn cmd_bind_vertex_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer) {
        unsafe { self.device.cmd_bind_vertex_buffers(cmd, 0, &[buffer], &[0]) }
    }

    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32) {
        unsafe { self.device.cmd_draw(cmd, vertex_count, 1, 0, 0) }
    }
}
