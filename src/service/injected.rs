use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::errors::ServiceResult;
use crate::service::di_container::{ServiceContainer, ServiceSlot};

/// Accessor bound to one slot of one container.
///
/// Holds no instance of its own: every `read` goes through
/// [`ServiceContainer::get`] and every `write` through [`ServiceContainer::set`],
/// so a handle stays valid across `reset`.
pub struct Injected<S: ServiceSlot> {
    container: Arc<ServiceContainer>,
    _slot: PhantomData<fn() -> S>,
}

impl<S: ServiceSlot> Injected<S> {
    pub fn new(container: Arc<ServiceContainer>) -> Self {
        Self { container, _slot: PhantomData }
    }

    pub fn read(&self) -> ServiceResult<Arc<S::Service>> {
        self.container.get::<S>()
    }

    pub fn write(&self, instance: Arc<S::Service>) {
        self.container.set::<S>(instance)
    }

    pub fn slot_name(&self) -> &'static str {
        S::NAME
    }

    pub fn container(&self) -> &Arc<ServiceContainer> {
        &self.container
    }
}

impl<S: ServiceSlot> Clone for Injected<S> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.container))
    }
}

impl<S: ServiceSlot> fmt::Debug for Injected<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injected").field("slot", &S::NAME).finish()
    }
}
