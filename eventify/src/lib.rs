//! Callback registry shared by the axis and the schedule.
//!
//! A registry is a slab of handlers; subscribing returns an opaque
//! [`CallbackHandle`] and freed slots are reused. Unsubscription clears by
//! slot index, so a stale handle can at worst clear a slot that was
//! re-issued after its own unsubscribe.

/// Opaque subscription handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallbackHandle(usize);

type Handler<T> = Box<dyn Fn(&T) + Send + Sync>;

pub struct CallbackRegistry<T> {
    slots: Vec<Option<Handler<T>>>,
}

impl<T> CallbackRegistry<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn subscribe(&mut self, handler: impl Fn(&T) + Send + Sync + 'static) -> CallbackHandle {
        let handler: Handler<T> = Box::new(handler);
        match self.slots.iter().position(|slot| slot.is_none()) {
            Some(index) => {
                self.slots[index] = Some(handler);
                CallbackHandle(index)
            }
            None => {
                self.slots.push(Some(handler));
                CallbackHandle(self.slots.len() - 1)
            }
        }
    }

    /// Clears the slot the handle names. Returns false for a handle that is
    /// already cleared or was never issued by this registry.
    pub fn unsubscribe(&mut self, handle: CallbackHandle) -> bool {
        match self.slots.get_mut(handle.0) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn trigger(&self, arg: &T) {
        for handler in self.slots.iter().flatten() {
            handler(arg);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for CallbackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
