use std::collections::HashMap;

/// Opaque handle into a [`HandleStore`]. Zero is never issued.
pub type Handle = u64;

/// Handle store mapping opaque u64 handles to GPU resources.
/// The web runtime keeps these handles on its scene primitives and passes
/// them back in draw items.
pub struct HandleStore<T> {
    items: HashMap<Handle, T>,
    next: Handle,
}

impl<T> HandleStore<T> {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            next: 1,
        }
    }

    /// Insert an item and return its handle.
    pub fn insert(&mut self, item: T) -> Handle {
        let handle = self.next;
        self.next += 1;
        self.items.insert(handle, item);
        handle
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.items.get(&handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.items.get_mut(&handle)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for HandleStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
