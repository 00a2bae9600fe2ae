// SPDX-License-Identifier: CEPL-1.0
//! Per-slot semaphores and fences, plus the image → slot fence map.

use std::sync::Arc;

use ash::vk;
use tracing::trace;

use crate::error::{PresentError, PresentResult};
use crate::gpu::Gpu;
use crate::retire::Epoch;

pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

struct Slot {
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
    /// Epoch of the last submission that signals `in_flight`.
    epoch: Epoch,
}

pub struct FrameSynchronizer {
    gpu: Arc<dyn Gpu>,
    slots: Vec<Slot>,
    /// For each swapchain image, the slot whose fence guards its last use.
    images_in_flight: Vec<Option<usize>>,
    submitted: Epoch,
    completed: Epoch,
}

impl FrameSynchronizer {
    /// Fences start signalled so the first wait on every slot returns.
    pub fn new(gpu: Arc<dyn Gpu>, num_images: usize, max_frames: usize) -> PresentResult<Self> {
        if max_frames == 0 {
            return Err(PresentError::Unsupported(
                "at least one frame in flight is required".into(),
            ));
        }
        let mut sync = Self {
            gpu,
            slots: Vec::with_capacity(max_frames),
            images_in_flight: vec![None; num_images],
            submitted: 0,
            completed: 0,
        };
        for _ in 0..max_frames {
            let slot = sync.create_slot()?;
            sync.slots.push(slot);
        }
        Ok(sync)
    }

    fn create_slot(&self) -> PresentResult<Slot> {
        let image_available = self
            .gpu
            .create_semaphore()
            .map_err(PresentError::init("semaphore"))?;
        let render_finished = match self.gpu.create_semaphore() {
            Ok(s) => s,
            Err(e) => {
                self.gpu.destroy_semaphore(image_available);
                return Err(PresentError::init("semaphore")(e));
            }
        };
        let in_flight = match self.gpu.create_fence(true) {
            Ok(f) => f,
            Err(e) => {
                self.gpu.destroy_semaphore(image_available);
                self.gpu.destroy_semaphore(render_finished);
                return Err(PresentError::init("fence")(e));
            }
        };
        Ok(Slot {
            image_available,
            render_finished,
            in_flight,
            epoch: 0,
        })
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    pub fn num_images(&self) -> usize {
        self.images_in_flight.len()
    }

    pub fn image_available(&self, slot: usize) -> vk::Semaphore {
        self.slots[slot].image_available
    }

    pub fn render_finished(&self, slot: usize) -> vk::Semaphore {
        self.slots[slot].render_finished
    }

    pub fn in_flight_fence(&self, slot: usize) -> vk::Fence {
        self.slots[slot].in_flight
    }

    /// Blocks until the previous submission from `slot` has finished.
    pub fn wait_for_slot(&mut self, slot: usize) -> PresentResult<()> {
        let s = &self.slots[slot];
        self.gpu
            .wait_for_fence(s.in_flight)
            .map_err(PresentError::device("wait for frame fence"))?;
        self.completed = self.completed.max(s.epoch);
        Ok(())
    }

    /// Waits on whichever slot last rendered `image` (if it is not `slot`
    /// itself), then records `slot` as its new owner.
    pub fn track_image(&mut self, image: usize, slot: usize) -> PresentResult<()> {
        if let Some(owner) = self.images_in_flight[image] {
            if owner != slot {
                trace!(image, owner, slot, "image still owned by another slot");
                self.wait_for_slot(owner)?;
            }
        }
        self.images_in_flight[image] = Some(slot);
        Ok(())
    }

    /// Call immediately before the submission that will signal the fence.
    pub fn reset_slot(&mut self, slot: usize) -> PresentResult<()> {
        self.gpu
            .reset_fence(self.slots[slot].in_flight)
            .map_err(PresentError::device("reset frame fence"))
    }

    /// Stamps `slot` with the next epoch and returns it.
    pub fn mark_submitted(&mut self, slot: usize) -> Epoch {
        self.submitted += 1;
        self.slots[slot].epoch = self.submitted;
        self.submitted
    }

    /// Everything submitted so far has completed.
    pub fn mark_idle(&mut self) {
        self.completed = self.submitted;
    }

    pub fn submitted_epoch(&self) -> Epoch {
        self.submitted
    }

    pub fn completed_epoch(&self) -> Epoch {
        self.completed
    }

    /// Only valid while the device is idle; every entry is forgotten.
    pub fn resize_images(&mut self, num_images: usize) {
        self.images_in_flight.clear();
        self.images_in_flight.resize(num_images, None);
    }

    pub fn image_owner(&self, image: usize) -> Option<usize> {
        self.images_in_flight[image]
    }
}

impl Drop for FrameSynchronizer {
    fn drop(&mut self) {
        for s in self.slots.drain(..) {
            self.gpu.destroy_semaphore(s.image_available);
            self.gpu.destroy_semaphore(s.render_finished);
            self.gpu.destroy_fence(s.in_flight);
        }
    }
}
