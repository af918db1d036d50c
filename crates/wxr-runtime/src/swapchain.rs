//! Swapchain image ring and the acquire/wait/release lease protocol.
//!
//! Lease life cycle of one image:
//!
//! ```text
//! Free --acquire--> Acquired --wait--> Ready --release--> PendingPresent
//!   ^                                                         |
//!   +------ superseded by a newer release or present ---------+
//! ```
//!
//! An image stays `PendingPresent` while it is the latest released image of
//! the swapchain or the one the compositor is showing, so the cursor can
//! never hand it back to the application early.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, warn};
use wxr_core::config::{ExhaustedPolicy, SwapchainConfig};
use wxr_core::{Status, XrError, XrResult};

use crate::backend::{BackendImage, PresentationBackend};
use crate::sync::{CancelReason, WaitOutcome};
use crate::types::SwapchainDesc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lease {
    Free,
    Acquired,
    Ready,
    PendingPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired(u32),
    /// The blocking policy gave up waiting for the compositor.
    TimedOut,
}

struct Ring {
    leases: Vec<Lease>,
    /// Round-robin cursor: the next image handed out.
    next: usize,
    /// Acquired but not yet waited, oldest first.
    acquired: VecDeque<usize>,
    waited: Option<usize>,
    latest_released: Option<usize>,
    presenting: Option<usize>,
    cancelled: Option<CancelReason>,
}

impl Ring {
    fn held_by_app(&self) -> usize {
        self.acquired.len() + usize::from(self.waited.is_some())
    }

    fn check_cancelled(&self) -> XrResult<()> {
        match self.cancelled {
            None => Ok(()),
            Some(CancelReason::Destroyed) => {
                Err(XrError::HandleInvalid("swapchain destroyed".into()))
            }
            Some(CancelReason::Lost) => Err(XrError::SessionLost),
        }
    }

    /// Free `index` unless something still needs it on screen.
    fn retire(&mut self, index: usize) -> bool {
        if self.presenting == Some(index) || self.latest_released == Some(index) {
            return false;
        }
        self.leases[index] = Lease::Free;
        true
    }
}

pub struct Swapchain {
    session: u64,
    desc: SwapchainDesc,
    images: Vec<BackendImage>,
    queue_depth: usize,
    policy: ExhaustedPolicy,
    acquire_timeout: Duration,
    ring: Mutex<Ring>,
    freed: Condvar,
    backend: Arc<dyn PresentationBackend>,
}

impl Swapchain {
    /// Allocate the image ring. `desc` has already been validated against
    /// the system limits.
    pub fn new(
        session: u64,
        desc: SwapchainDesc,
        config: &SwapchainConfig,
        backend: Arc<dyn PresentationBackend>,
    ) -> XrResult<Self> {
        let count = config.image_count.max(2);
        let images = backend.allocate_images(&desc, count)?;
        if images.len() < 2 {
            backend.free_images(&images);
            return Err(XrError::RuntimeFailure(format!(
                "backend allocated {} images, need at least 2",
                images.len()
            )));
        }
        let queue_depth = (config.queue_depth as usize).clamp(1, images.len() - 1);
        Ok(Self {
            session,
            desc,
            queue_depth,
            policy: config.exhausted_policy,
            acquire_timeout: Duration::from_millis(config.acquire_timeout_ms),
            ring: Mutex::new(Ring {
                leases: vec![Lease::Free; images.len()],
                next: 0,
                acquired: VecDeque::new(),
                waited: None,
                latest_released: None,
                presenting: None,
                cancelled: None,
            }),
            freed: Condvar::new(),
            images,
            backend,
        })
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn desc(&self) -> &SwapchainDesc {
        &self.desc
    }

    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    /// GL texture names in image index order.
    pub fn textures(&self) -> Vec<u32> {
        self.images.iter().map(|image| image.texture).collect()
    }

    pub fn leases(&self) -> Vec<Lease> {
        self.ring.lock().leases.clone()
    }

    /// Whether a released image is available for composition.
    pub fn has_released(&self) -> bool {
        self.ring.lock().latest_released.is_some()
    }

    pub fn acquire(&self) -> XrResult<AcquireOutcome> {
        let deadline = Instant::now() + self.acquire_timeout;
        let mut ring = self.ring.lock();
        let index = loop {
            ring.check_cancelled()?;
            if ring.held_by_app() >= self.queue_depth {
                return Err(XrError::CallOrderInvalid(format!(
                    "{} image(s) already acquired, queue depth is {}",
                    ring.held_by_app(),
                    self.queue_depth
                )));
            }
            let index = ring.next;
            if ring.leases[index] == Lease::Free {
                break index;
            }
            match self.policy {
                ExhaustedPolicy::Fail => {
                    warn!("acquire: image {} is still held by the compositor", index);
                    return Err(XrError::CallOrderInvalid(format!(
                        "image {} is still held by the compositor",
                        index
                    )));
                }
                ExhaustedPolicy::Block => {
                    if self.freed.wait_until(&mut ring, deadline).timed_out()
                        && ring.leases[ring.next] != Lease::Free
                    {
                        ring.check_cancelled()?;
                        return Ok(AcquireOutcome::TimedOut);
                    }
                }
            }
        };

        ring.leases[index] = Lease::Acquired;
        ring.acquired.push_back(index);
        ring.next = (index + 1) % ring.leases.len();
        self.backend.image_acquired(&self.images[index]);
        debug!("acquired image {}", index);
        Ok(AcquireOutcome::Acquired(index as u32))
    }

    /// Wait for the oldest acquired image. `None` waits forever.
    pub fn wait(&self, timeout: Option<Duration>) -> XrResult<Status> {
        let (index, fence) = {
            let ring = self.ring.lock();
            ring.check_cancelled()?;
            if ring.waited.is_some() {
                return Err(XrError::CallOrderInvalid(
                    "an image is already waited and not yet released".into(),
                ));
            }
            let Some(&index) = ring.acquired.front() else {
                return Err(XrError::CallOrderInvalid("no image is acquired".into()));
            };
            (index, Arc::clone(&self.images[index].fence))
        };

        match fence.wait(timeout) {
            WaitOutcome::Signaled => {}
            WaitOutcome::TimedOut => return Ok(Status::Timeout),
            WaitOutcome::Cancelled => {
                self.ring.lock().check_cancelled()?;
                return Err(XrError::RuntimeFailure("image fence cancelled".into()));
            }
        }

        let mut ring = self.ring.lock();
        ring.check_cancelled()?;
        if ring.acquired.front() != Some(&index) || ring.waited.is_some() {
            return Err(XrError::CallOrderInvalid(
                "swapchain changed during wait".into(),
            ));
        }
        ring.acquired.pop_front();
        ring.leases[index] = Lease::Ready;
        ring.waited = Some(index);
        Ok(Status::Success)
    }

    pub fn release(&self) -> XrResult<u32> {
        let mut ring = self.ring.lock();
        ring.check_cancelled()?;
        let Some(index) = ring.waited.take() else {
            return Err(XrError::CallOrderInvalid("no image has been waited".into()));
        };
        ring.leases[index] = Lease::PendingPresent;
        if let Some(previous) = ring.latest_released.replace(index) {
            if previous != index && ring.retire(previous) {
                self.freed.notify_all();
            }
        }
        debug!("released image {}", index);
        Ok(index as u32)
    }

    /// Hand the latest released image to the compositor and return its index.
    /// The image it replaces goes back to the application.
    pub fn present(&self) -> Option<u32> {
        let staged = self.stage_present()?;
        let index = staged.index();
        staged.commit();
        Some(index)
    }

    /// Lock the ring with the latest released image picked for the
    /// compositor. Nothing changes until [`StagedPresent::commit`].
    pub fn stage_present(&self) -> Option<StagedPresent<'_>> {
        let ring = self.ring.lock();
        let index = ring.latest_released?;
        Some(StagedPresent {
            swapchain: self,
            ring,
            index,
        })
    }

    /// Return every image to `Free` and fail current and future lease calls.
    pub fn cancel(&self, reason: CancelReason) {
        let mut ring = self.ring.lock();
        ring.cancelled.get_or_insert(reason);
        if reason == CancelReason::Destroyed {
            ring.leases.fill(Lease::Free);
            ring.acquired.clear();
            ring.waited = None;
            ring.latest_released = None;
            ring.presenting = None;
        }
        for image in &self.images {
            image.fence.cancel();
        }
        self.freed.notify_all();
    }
}

/// A present waiting on the compositor. Dropping it without committing
/// leaves the ring untouched.
pub struct StagedPresent<'a> {
    swapchain: &'a Swapchain,
    ring: MutexGuard<'a, Ring>,
    index: usize,
}

impl StagedPresent<'_> {
    pub fn index(&self) -> u32 {
        self.index as u32
    }

    pub fn commit(mut self) {
        let index = self.index;
        if let Some(old) = self.ring.presenting.replace(index) {
            if old != index && self.ring.retire(old) {
                self.swapchain.freed.notify_all();
            }
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.backend.free_images(&self.images);
    }
}
