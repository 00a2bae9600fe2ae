// SPDX-License-Identifier: CEPL-1.0
//! Two-slot arena for handles whose replacement is built while frames may
//! still reference the old one.

/// Monotonic submission counter. Epoch `n` is the `n`-th frame submitted;
/// epoch 0 means "nothing submitted yet".
pub type Epoch = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Retiring<H> {
    handle: H,
    last_use: Epoch,
}

#[derive(Debug)]
pub struct Generations<H: Copy> {
    current: H,
    retiring: Option<Retiring<H>>,
}

impl<H: Copy> Generations<H> {
    pub fn new(current: H) -> Self {
        Self {
            current,
            retiring: None,
        }
    }

    #[inline]
    pub fn current(&self) -> H {
        self.current
    }

    pub fn retiring(&self) -> Option<H> {
        self.retiring.map(|r| r.handle)
    }

    /// Makes `next` current and parks the old one until `last_use` completes.
    /// Returns a handle that was still parked from an earlier rotation; the
    /// caller destroys it.
    #[must_use]
    pub fn rotate(&mut self, next: H, last_use: Epoch) -> Option<H> {
        let stale = self.retiring.take().map(|r| r.handle);
        self.retiring = Some(Retiring {
            handle: self.current,
            last_use,
        });
        self.current = next;
        stale
    }

    /// Releases the parked handle once every frame up to its last use has
    /// finished on the GPU.
    #[must_use]
    pub fn release_if_complete(&mut self, completed: Epoch) -> Option<H> {
        match self.retiring {
            Some(r) if r.last_use <= completed => self.retiring.take().map(|r| r.handle),
            _ => None,
        }
    }

    /// Releases the parked handle unconditionally. `None` the second time.
    #[must_use]
    pub fn release(&mut self) -> Option<H> {
        self.retiring.take().map(|r| r.handle)
    }
}
