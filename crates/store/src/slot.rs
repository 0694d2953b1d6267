use std::panic::{AssertUnwindSafe, catch_unwind};

/// Handle for a registered subscriber, used to unsubscribe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(pub u64);

type Callback<T> = Box<dyn FnMut(&T)>;

/// One observable state slice.
///
/// Contract:
/// - `subscribe` replays the current value synchronously if one exists.
/// - `set` fans out to subscribers in registration order, synchronously,
///   in `set()` call order.
/// - A panicking subscriber must not prevent delivery to the others: each
///   callback invocation is individually guarded.
/// - Every `set` bumps a write generation, so callers can detect whether a
///   slice was written between two points in time.
pub struct Slot<T> {
    value: Option<T>,
    generation: u64,
    next_subscriber: u64,
    subscribers: Vec<(SubscriberId, Callback<T>)>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            value: None,
            generation: 0,
            next_subscriber: 0,
            subscribers: Vec::new(),
        }
    }
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Monotonic write counter; 0 means never written.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
        self.generation += 1;
        if let Some(current) = &self.value {
            for (_id, cb) in &mut self.subscribers {
                let _ = catch_unwind(AssertUnwindSafe(|| cb(current)));
            }
        }
    }

    pub fn subscribe(&mut self, mut cb: impl FnMut(&T) + 'static) -> SubscriberId {
        if let Some(current) = &self.value {
            let _ = catch_unwind(AssertUnwindSafe(|| cb(current)));
        }
        let id = SubscriberId(self.next_subscriber);
        self.next_subscriber += 1;
        self.subscribers.push((id, Box::new(cb)));
        id
    }

    /// Returns `true` if the subscriber was still registered.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("value", &self.value)
            .field("generation", &self.generation)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
