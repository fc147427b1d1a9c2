//! Thread-scoped typed key/value store
//!
//! Each live thread owns one `AmbientContextStore`; values installed on a
//! thread stay installed until explicitly removed or the thread ends. Code that
//! hands work to another thread copies the values it needs and reinstalls them
//! there — stores are never shared between threads, which is why no locking
//! exists here.
//!
//! Pooled threads are reused: whoever installs keys on a pool thread must
//! remove them (or call [`clear`]) before the thread is returned to the pool,
//! otherwise context leaks into the next task run on that thread.

use std::any::{Any, TypeId};
use std::cell::RefCell;

use ahash::AHashMap;

use crate::core::error::LookupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SlotKey {
    type_id: TypeId,
    tag: Option<&'static str>,
}

impl SlotKey {
    fn of<T: Any>(tag: Option<&'static str>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            tag,
        }
    }
}

/// Typed key/value store confined to a single thread.
///
/// Keys are `(type, optional discriminator tag)`; installing overwrites.
#[derive(Default)]
pub struct AmbientContextStore {
    slots: AHashMap<SlotKey, Box<dyn Any + Send>>,
}

impl AmbientContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install<T: Any + Send>(&mut self, value: T) {
        self.slots.insert(SlotKey::of::<T>(None), Box::new(value));
    }

    pub fn install_tagged<T: Any + Send>(&mut self, tag: &'static str, value: T) {
        self.slots.insert(SlotKey::of::<T>(Some(tag)), Box::new(value));
    }

    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        self.get_slot::<T>(None)
    }

    pub fn get_tagged<T: Any + Clone>(&self, tag: &'static str) -> Option<T> {
        self.get_slot::<T>(Some(tag))
    }

    /// Borrowed access without cloning
    pub fn with<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.slots
            .get(&SlotKey::of::<T>(None))
            .and_then(|slot| slot.downcast_ref::<T>())
            .map(f)
    }

    /// Like [`get`](Self::get) but absence is a programmer error
    pub fn require<T: Any + Clone>(&self) -> Result<T, LookupError> {
        self.get::<T>()
            .ok_or_else(|| LookupError::for_type(std::any::type_name::<T>()))
    }

    pub fn require_tagged<T: Any + Clone>(&self, tag: &'static str) -> Result<T, LookupError> {
        self.get_tagged::<T>(tag)
            .ok_or_else(|| LookupError::for_type(std::any::type_name::<T>()))
    }

    pub fn remove<T: Any>(&mut self) -> Option<T> {
        self.remove_slot::<T>(None)
    }

    pub fn remove_tagged<T: Any>(&mut self, tag: &'static str) -> Option<T> {
        self.remove_slot::<T>(Some(tag))
    }

    pub fn is_installed<T: Any>(&self) -> bool {
        self.slots.contains_key(&SlotKey::of::<T>(None))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn get_slot<T: Any + Clone>(&self, tag: Option<&'static str>) -> Option<T> {
        self.slots
            .get(&SlotKey::of::<T>(tag))
            .and_then(|slot| slot.downcast_ref::<T>())
            .cloned()
    }

    fn remove_slot<T: Any>(&mut self, tag: Option<&'static str>) -> Option<T> {
        self.slots
            .remove(&SlotKey::of::<T>(tag))
            .and_then(|slot| slot.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }
}

thread_local! {
    static STORE: RefCell<AmbientContextStore> = RefCell::new(AmbientContextStore::new());
}

// Accessors for the current thread's store. The closures passed to `with` and
// `get_or_install_with` run while the store is borrowed and must not call back
// into this module.

pub fn install<T: Any + Send>(value: T) {
    STORE.with(|store| store.borrow_mut().install(value));
}

pub fn install_tagged<T: Any + Send>(tag: &'static str, value: T) {
    STORE.with(|store| store.borrow_mut().install_tagged(tag, value));
}

pub fn get<T: Any + Clone>() -> Option<T> {
    STORE.with(|store| store.borrow().get::<T>())
}

pub fn get_tagged<T: Any + Clone>(tag: &'static str) -> Option<T> {
    STORE.with(|store| store.borrow().get_tagged::<T>(tag))
}

pub fn with<T: Any, R>(f: impl FnOnce(&T) -> R) -> Option<R> {
    STORE.with(|store| store.borrow().with(f))
}

pub fn require<T: Any + Clone>() -> Result<T, LookupError> {
    STORE.with(|store| store.borrow().require::<T>())
}

pub fn require_tagged<T: Any + Clone>(tag: &'static str) -> Result<T, LookupError> {
    STORE.with(|store| store.borrow().require_tagged::<T>(tag))
}

pub fn remove<T: Any>() -> Option<T> {
    STORE.with(|store| store.borrow_mut().remove::<T>())
}

pub fn remove_tagged<T: Any>(tag: &'static str) -> Option<T> {
    STORE.with(|store| store.borrow_mut().remove_tagged::<T>(tag))
}

pub fn is_installed<T: Any>() -> bool {
    STORE.with(|store| store.borrow().is_installed::<T>())
}

pub fn clear() {
    STORE.with(|store| store.borrow_mut().clear());
}

/// Return the installed value, computing and installing it on first access
pub fn get_or_install_with<T: Any + Send + Clone>(init: impl FnOnce() -> T) -> T {
    STORE.with(|store| {
        let mut store = store.borrow_mut();
        match store.get::<T>() {
            Some(value) => value,
            None => {
                let value = init();
                store.install(value.clone());
                value
            }
        }
    })
}

/// Clears the current thread's store when dropped.
///
/// Pooled workers create one before installing anything so the store is empty
/// again on every exit path, including unwinds.
pub struct ClearGuard(());

impl ClearGuard {
    pub fn new() -> Self {
        Self(())
    }
}

impl Default for ClearGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ClearGuard {
    fn drop(&mut self) {
        clear();
    }
}
