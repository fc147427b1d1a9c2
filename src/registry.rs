//! Process-wide component registry
//!
//! Maps types to shared instances. Interceptor factories resolve their extra
//! constructor parameters here; collaborators populate it once at startup and
//! only read afterwards.

use std::any::{Any, TypeId};
use std::sync::Arc;

use ahash::AHashMap;

use crate::core::error::ComponentLookupError;

#[derive(Default)]
pub struct ComponentRegistry {
    components: AHashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Any + Send + Sync>(&mut self, component: T) {
        self.register_arc(Arc::new(component));
    }

    pub fn register_arc<T: Any + Send + Sync>(&mut self, component: Arc<T>) {
        self.components.insert(TypeId::of::<T>(), component);
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.components
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|component| component.downcast::<T>().ok())
    }

    pub fn require<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ComponentLookupError> {
        self.get::<T>()
            .ok_or(ComponentLookupError(std::any::type_name::<T>()))
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
