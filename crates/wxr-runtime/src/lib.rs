//! The wxr runtime proper: instance and system queries, the session state
//! machine, swapchain leasing, frame pacing and space location, all behind a
//! Rust API. The `wxr-openxr` crate exposes it through the OpenXR C ABI.

pub mod backend;
pub mod clock;
pub mod enumerate;
pub mod event;
pub mod headless;
pub mod instance;
pub mod runtime;
pub mod session;
pub mod space;
pub mod swapchain;
pub mod sync;
pub mod time;
pub mod types;

pub use backend::{BackendEvent, PresentationBackend};
pub use headless::HeadlessBackend;
pub use runtime::Runtime;
pub use session::Session;
pub use swapchain::{AcquireOutcome, Lease, Swapchain};
