use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::{XrError, XrResult};

/// Object type tag carried in the top byte of every handle, so a handle of one
/// kind passed where another is expected is rejected without a table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectKind {
    Instance = 1,
    Session = 2,
    Space = 3,
    Swapchain = 4,
    ActionSet = 5,
    Action = 6,
}

impl ObjectKind {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Instance),
            2 => Some(Self::Session),
            3 => Some(Self::Space),
            4 => Some(Self::Swapchain),
            5 => Some(Self::ActionSet),
            6 => Some(Self::Action),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Instance => "XrInstance",
            Self::Session => "XrSession",
            Self::Space => "XrSpace",
            Self::Swapchain => "XrSwapchain",
            Self::ActionSet => "XrActionSet",
            Self::Action => "XrAction",
        }
    }
}

// Handle layout: kind (8) | generation (24) | slot (32)
const KIND_SHIFT: u32 = 56;
const GENERATION_SHIFT: u32 = 32;
const GENERATION_MASK: u32 = (1 << 24) - 1;

fn encode(kind: ObjectKind, generation: u32, slot: u32) -> u64 {
    ((kind as u64) << KIND_SHIFT) | ((generation as u64) << GENERATION_SHIFT) | slot as u64
}

fn next_generation(generation: u32) -> u32 {
    match (generation + 1) & GENERATION_MASK {
        0 => 1,
        g => g,
    }
}

/// Returns the object kind encoded in a raw handle, if any.
pub fn kind_of(raw: u64) -> Option<ObjectKind> {
    ObjectKind::from_tag((raw >> KIND_SHIFT) as u8)
}

struct Slot<T> {
    generation: u32,
    object: Arc<T>,
}

/// Generation-tagged mapping from opaque handles to runtime objects.
///
/// Resolution hands out an `Arc`, so an object unregistered while another
/// thread is mid-call stays alive until that call drops its reference.
/// Freed slots are reused with a bumped generation; stale handles to a reused
/// slot fail the generation check.
pub struct HandleTable<T> {
    kind: ObjectKind,
    live: DashMap<u32, Slot<T>>,
    /// Freed slots paired with the generation their next occupant gets.
    free: Mutex<Vec<(u32, u32)>>,
    next_slot: AtomicU32,
}

impl<T> HandleTable<T> {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            live: DashMap::new(),
            free: Mutex::new(Vec::new()),
            next_slot: AtomicU32::new(0),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Register an object and return a fresh handle for it.
    pub fn register(&self, object: T) -> u64 {
        self.register_arc(Arc::new(object))
    }

    /// Register an already shared object.
    pub fn register_arc(&self, object: Arc<T>) -> u64 {
        self.register_with(|_| object)
    }

    /// Register an object that needs to know its own handle.
    pub fn register_with(&self, make: impl FnOnce(u64) -> Arc<T>) -> u64 {
        let reused = self.free.lock().pop();
        let (slot, generation) =
            reused.unwrap_or_else(|| (self.next_slot.fetch_add(1, Ordering::Relaxed), 1));
        let raw = encode(self.kind, generation, slot);
        let object = make(raw);
        self.live.insert(slot, Slot { generation, object });
        raw
    }

    /// Look up a live object by handle.
    pub fn resolve(&self, raw: u64) -> XrResult<Arc<T>> {
        let (slot, generation) = self.split(raw)?;
        match self.live.get(&slot) {
            Some(entry) if entry.generation == generation => Ok(Arc::clone(&entry.object)),
            _ => Err(self.invalid(raw)),
        }
    }

    /// Remove a handle. The returned reference may be the last one, in which
    /// case dropping it releases the object.
    pub fn unregister(&self, raw: u64) -> XrResult<Arc<T>> {
        let (slot, generation) = self.split(raw)?;
        match self
            .live
            .remove_if(&slot, |_, entry| entry.generation == generation)
        {
            Some((_, entry)) => {
                self.free.lock().push((slot, next_generation(generation)));
                Ok(entry.object)
            }
            None => Err(self.invalid(raw)),
        }
    }

    pub fn contains(&self, raw: u64) -> bool {
        self.resolve(raw).is_ok()
    }

    /// Handles of every live object, in no particular order.
    pub fn handles(&self) -> Vec<u64> {
        self.live
            .iter()
            .map(|entry| encode(self.kind, entry.value().generation, *entry.key()))
            .collect()
    }

    /// Return number of live handles.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    fn split(&self, raw: u64) -> XrResult<(u32, u32)> {
        if raw == 0 {
            return Err(XrError::HandleInvalid(format!("null {}", self.kind.name())));
        }
        if kind_of(raw) != Some(self.kind) {
            return Err(self.invalid(raw));
        }
        let generation = ((raw >> GENERATION_SHIFT) as u32) & GENERATION_MASK;
        Ok((raw as u32, generation))
    }

    fn invalid(&self, raw: u64) -> XrError {
        XrError::HandleInvalid(format!("{} {:#018x}", self.kind.name(), raw))
    }
}
