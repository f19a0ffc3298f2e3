//! Service container: a registry of lazily-constructed, shared service slots.
//!
//! Each slot is keyed by a zero-sized marker type implementing [`ServiceSlot`].
//! A slot is `Absent` until first requested, `Resolving` while its
//! constructor runs, and `Present` once built. Constructors run with the
//! table lock released so they can pull their own dependencies through
//! [`ServiceContainer::get`]; re-entering a slot that the same thread is
//! already resolving is reported as [`ServiceError::CycleDetected`]. So is
//! waiting on a slot whose owner is, directly or transitively, waiting on us.

use parking_lot::{Condvar, Mutex};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, info, warn};

use crate::core::config::AppConfig;
use crate::core::errors::{ServiceError, ServiceResult};
use crate::core::state::InitializationState;
use crate::service::injected::Injected;
use crate::service::slots;

/// A named binding from a capability type to at most one live instance.
pub trait ServiceSlot: 'static {
    /// Capability handed out for this slot, usually `dyn Trait`.
    type Service: ?Sized + Send + Sync + 'static;

    const NAME: &'static str;

    /// Default constructor. May request other slots from `container`.
    fn construct(container: &ServiceContainer) -> ServiceResult<Arc<Self::Service>>;
}

/// Type-erased `Arc<S::Service>`.
type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&ServiceContainer) -> ServiceResult<Instance> + Send + Sync>;

enum SlotState {
    Absent,
    Resolving(ThreadId),
    Present(Instance),
}

struct SlotEntry {
    name: &'static str,
    factory: Factory,
    state: SlotState,
}

#[derive(Default)]
struct SlotTable {
    entries: HashMap<TypeId, SlotEntry>,
    /// Registration order, used by `warm_up` and listings.
    order: Vec<TypeId>,
    /// Bumped by `reset`; constructions started under an older generation are not installed.
    generation: u64,
    /// Slot names each thread is currently constructing, outermost first.
    stacks: HashMap<ThreadId, Vec<&'static str>>,
    /// Slot each blocked thread is waiting on.
    waiting: HashMap<ThreadId, TypeId>,
    init_state: InitializationState,
}

impl SlotTable {
    /// Slots from `me`'s outermost construction to `name`, continued through
    /// other threads' stacks along the wait-for edges until the loop closes.
    fn cycle_chain(&self, me: ThreadId, key: TypeId, name: &'static str) -> Vec<&'static str> {
        let mut chain = self.stacks.get(&me).cloned().unwrap_or_default();
        chain.push(name);
        let (mut target, mut target_name) = (key, name);
        for _ in 0..=self.entries.len() {
            let owner = match self.entries.get(&target) {
                Some(SlotEntry { state: SlotState::Resolving(owner), .. }) if *owner != me => *owner,
                _ => break,
            };
            if let Some(stack) = self.stacks.get(&owner) {
                let after = stack.iter().position(|n| *n == target_name).map_or(0, |i| i + 1);
                chain.extend_from_slice(&stack[after..]);
            }
            match self.waiting.get(&owner).and_then(|k| self.entries.get(k).map(|e| (*k, e.name))) {
                Some((next, next_name)) => {
                    chain.push(next_name);
                    target = next;
                    target_name = next_name;
                }
                None => break,
            }
        }
        chain
    }

    /// Whether waiting on a slot owned by `owner` would make `me` wait on itself.
    fn wait_closes_loop(&self, me: ThreadId, mut owner: ThreadId) -> bool {
        for _ in 0..=self.entries.len() {
            if owner == me {
                return true;
            }
            match self.waiting.get(&owner).and_then(|key| self.entries.get(key)) {
                Some(SlotEntry { state: SlotState::Resolving(next), .. }) => owner = *next,
                _ => return false,
            }
        }
        false
    }
}

fn erase<S: ServiceSlot>(instance: Arc<S::Service>) -> Instance {
    Arc::new(instance)
}

fn downcast<S: ServiceSlot>(instance: &Instance) -> ServiceResult<Arc<S::Service>> {
    instance
        .downcast_ref::<Arc<S::Service>>()
        .cloned()
        .ok_or(ServiceError::TypeMismatch(S::NAME))
}

fn default_factory<S: ServiceSlot>() -> Factory {
    Arc::new(|container: &ServiceContainer| S::construct(container).map(erase::<S>))
}

/// Builder used to register slots before the container is shared.
pub struct ContainerBuilder {
    config: AppConfig,
    registrations: Vec<(TypeId, &'static str, Factory)>,
}

impl ContainerBuilder {
    fn add(mut self, key: TypeId, name: &'static str, factory: Factory) -> Self {
        match self.registrations.iter_mut().find(|(k, _, _)| *k == key) {
            Some(existing) => existing.2 = factory,
            None => self.registrations.push((key, name, factory)),
        }
        self
    }

    /// Register `S` with its default constructor.
    pub fn register<S: ServiceSlot>(self) -> Self {
        self.add(TypeId::of::<S>(), S::NAME, default_factory::<S>())
    }

    /// Register `S` with a custom constructor, replacing any earlier registration.
    pub fn with_factory<S, F>(self, factory: F) -> Self
    where
        S: ServiceSlot,
        F: Fn(&ServiceContainer) -> ServiceResult<Arc<S::Service>> + Send + Sync + 'static,
    {
        let factory: Factory =
            Arc::new(move |container: &ServiceContainer| factory(container).map(erase::<S>));
        self.add(TypeId::of::<S>(), S::NAME, factory)
    }

    pub fn build(self) -> ServiceContainer {
        let mut table = SlotTable::default();
        for (key, name, factory) in self.registrations {
            table.order.push(key);
            table.entries.insert(key, SlotEntry { name, factory, state: SlotState::Absent });
        }
        ServiceContainer { config: self.config, slots: Mutex::new(table), settled: Condvar::new() }
    }
}

/// Owns every service slot. Share it as `Arc<ServiceContainer>`.
pub struct ServiceContainer {
    config: AppConfig,
    slots: Mutex<SlotTable>,
    settled: Condvar,
}

impl ServiceContainer {
    /// Container with the five standard slots registered.
    pub fn new(config: AppConfig) -> Self {
        slots::register_standard(Self::builder(config)).build()
    }

    /// Empty builder; nothing is registered until asked.
    pub fn builder(config: AppConfig) -> ContainerBuilder {
        ContainerBuilder { config, registrations: Vec::new() }
    }

    /// Settings captured at construction.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Live instance for `S`, constructing it (and its dependencies) on first use.
    pub fn get<S: ServiceSlot>(&self) -> ServiceResult<Arc<S::Service>> {
        let instance = self.resolve(TypeId::of::<S>(), S::NAME)?;
        downcast::<S>(&instance)
    }

    /// Install `instance` directly, replacing whatever the slot held.
    /// An unregistered slot is registered with its default constructor.
    pub fn set<S: ServiceSlot>(&self, instance: Arc<S::Service>) {
        let key = TypeId::of::<S>();
        let mut table = self.slots.lock();
        let t = &mut *table;
        match t.entries.get_mut(&key) {
            Some(entry) => entry.state = SlotState::Present(erase::<S>(instance)),
            None => {
                t.order.push(key);
                t.entries.insert(
                    key,
                    SlotEntry {
                        name: S::NAME,
                        factory: default_factory::<S>(),
                        state: SlotState::Present(erase::<S>(instance)),
                    },
                );
            }
        }
        info!(slot = S::NAME, "slot overridden");
        self.settled.notify_all();
    }

    /// Drop every constructed instance. The next `get` rebuilds.
    ///
    /// Slots whose constructor is running are left to finish; their result is
    /// handed to the waiting caller but not installed.
    pub fn reset(&self) {
        let mut table = self.slots.lock();
        let mut cleared = 0usize;
        for entry in table.entries.values_mut() {
            if let SlotState::Present(_) = entry.state {
                entry.state = SlotState::Absent;
                cleared += 1;
            }
        }
        table.generation = table.generation.wrapping_add(1);
        table.init_state = InitializationState::NotStarted;
        info!(cleared, "service container reset");
        self.settled.notify_all();
    }

    /// Bound accessor for `S`.
    pub fn inject<S: ServiceSlot>(self: &Arc<Self>) -> Injected<S> {
        Injected::new(Arc::clone(self))
    }

    pub fn is_resolved<S: ServiceSlot>(&self) -> bool {
        let table = self.slots.lock();
        matches!(
            table.entries.get(&TypeId::of::<S>()),
            Some(SlotEntry { state: SlotState::Present(_), .. })
        )
    }

    /// Names of all registered slots, in registration order.
    pub fn registered_slots(&self) -> Vec<&'static str> {
        let table = self.slots.lock();
        table.order.iter().filter_map(|k| table.entries.get(k)).map(|e| e.name).collect()
    }

    /// Names of slots currently holding an instance, in registration order.
    pub fn resolved_slots(&self) -> Vec<&'static str> {
        let table = self.slots.lock();
        table
            .order
            .iter()
            .filter_map(|k| table.entries.get(k))
            .filter(|e| matches!(e.state, SlotState::Present(_)))
            .map(|e| e.name)
            .collect()
    }

    pub fn initialization_state(&self) -> InitializationState {
        self.slots.lock().init_state.clone()
    }

    /// Resolve every registered slot in registration order.
    pub fn warm_up(&self) -> ServiceResult<()> {
        let keys = {
            let mut table = self.slots.lock();
            match &table.init_state {
                InitializationState::Ready => return Ok(()),
                InitializationState::Failed { reason } => {
                    return Err(ServiceError::Config(format!(
                        "initialization already failed ({}); reset before retrying",
                        reason
                    )))
                }
                _ => {}
            }
            Self::advance(&mut table, InitializationState::Initializing);
            table
                .order
                .iter()
                .filter_map(|k| table.entries.get(k).map(|e| (*k, e.name)))
                .collect::<Vec<_>>()
        };

        for (key, name) in keys {
            if let Err(err) = self.resolve(key, name) {
                let mut table = self.slots.lock();
                Self::advance(&mut table, InitializationState::failed(err.to_string()));
                return Err(err);
            }
        }

        let mut table = self.slots.lock();
        Self::advance(&mut table, InitializationState::Ready);
        Ok(())
    }

    fn advance(table: &mut SlotTable, next: InitializationState) {
        if table.init_state.can_transition_to(&next) {
            debug!(from = %table.init_state, to = %next, "container state");
            table.init_state = next;
        }
    }

    fn resolve(&self, key: TypeId, name: &'static str) -> ServiceResult<Instance> {
        let me = thread::current().id();
        let mut table = self.slots.lock();

        let (factory, generation) = loop {
            let t = &mut *table;
            let entry = t.entries.get_mut(&key).ok_or(ServiceError::NotRegistered(name))?;
            match entry.state {
                SlotState::Present(ref instance) => return Ok(Arc::clone(instance)),
                SlotState::Resolving(owner) => {
                    if t.wait_closes_loop(me, owner) {
                        let chain = t.cycle_chain(me, key, name);
                        warn!(slot = name, chain = ?chain, "configuration cycle detected");
                        return Err(ServiceError::CycleDetected { slot: name, chain });
                    }
                    t.waiting.insert(me, key);
                    self.settled.wait(&mut table);
                    table.waiting.remove(&me);
                }
                SlotState::Absent => {
                    entry.state = SlotState::Resolving(me);
                    let factory = Arc::clone(&entry.factory);
                    t.stacks.entry(me).or_default().push(name);
                    break (factory, t.generation);
                }
            }
        };
        drop(table);

        debug!(slot = name, "constructing service");
        let guard = Resolution { container: self, key, name, me, generation, finished: false };
        let built = (*factory)(self);
        guard.finish(built)
    }

    /// Record the outcome of a construction started by `resolve`.
    fn settle(
        &self,
        key: TypeId,
        name: &'static str,
        me: ThreadId,
        generation: u64,
        built: Option<ServiceResult<Instance>>,
    ) -> ServiceResult<Instance> {
        let mut table = self.slots.lock();
        let t = &mut *table;
        if let Some(stack) = t.stacks.get_mut(&me) {
            stack.pop();
            if stack.is_empty() {
                t.stacks.remove(&me);
            }
        }
        let current_generation = t.generation;
        let entry = t.entries.get_mut(&key).ok_or(ServiceError::NotRegistered(name))?;
        let owned = matches!(entry.state, SlotState::Resolving(owner) if owner == me);

        let result = match built {
            Some(Ok(instance)) => {
                if owned && current_generation == generation {
                    entry.state = SlotState::Present(Arc::clone(&instance));
                    debug!(slot = name, "service constructed");
                    Ok(instance)
                } else if let SlotState::Present(existing) = &entry.state {
                    debug!(slot = name, "slot was set during construction; keeping installed instance");
                    Ok(Arc::clone(existing))
                } else {
                    debug!(slot = name, "container reset during construction; instance not installed");
                    if owned {
                        entry.state = SlotState::Absent;
                    }
                    Ok(instance)
                }
            }
            Some(Err(err)) => {
                if owned {
                    entry.state = SlotState::Absent;
                }
                warn!(slot = name, error = %err, "service construction failed");
                Err(err)
            }
            None => {
                if owned {
                    entry.state = SlotState::Absent;
                }
                warn!(slot = name, "service constructor panicked");
                Err(ServiceError::Construction { slot: name, reason: "constructor panicked".into() })
            }
        };
        self.settled.notify_all();
        result
    }
}

/// Returns a slot to `Absent` if its constructor unwinds.
struct Resolution<'a> {
    container: &'a ServiceContainer,
    key: TypeId,
    name: &'static str,
    me: ThreadId,
    generation: u64,
    finished: bool,
}

impl Resolution<'_> {
    fn finish(mut self, built: ServiceResult<Instance>) -> ServiceResult<Instance> {
        self.finished = true;
        self.container.settle(self.key, self.name, self.me, self.generation, Some(built))
    }
}

impl Drop for Resolution<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.container.settle(self.key, self.name, self.me, self.generation, None);
        }
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("network", &self.config.network)
            .field("registered", &self.registered_slots())
            .field("resolved", &self.resolved_slots())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Counter: Send + Sync {
        fn id(&self) -> usize;
    }

    struct Numbered(usize);

    impl Counter for Numbered {
        fn id(&self) -> usize {
            self.0
        }
    }

    static BUILT: AtomicUsize = AtomicUsize::new(0);

    struct CounterSlot;

    impl ServiceSlot for CounterSlot {
        type Service = dyn Counter;
        const NAME: &'static str = "Counter";

        fn construct(_: &ServiceContainer) -> ServiceResult<Arc<dyn Counter>> {
            Ok(Arc::new(Numbered(BUILT.fetch_add(1, Ordering::SeqCst))))
        }
    }

    struct Left;
    struct Right;

    impl ServiceSlot for Left {
        type Service = dyn Counter;
        const NAME: &'static str = "Left";

        fn construct(c: &ServiceContainer) -> ServiceResult<Arc<dyn Counter>> {
            c.get::<Right>()
        }
    }

    impl ServiceSlot for Right {
        type Service = dyn Counter;
        const NAME: &'static str = "Right";

        fn construct(c: &ServiceContainer) -> ServiceResult<Arc<dyn Counter>> {
            c.get::<Left>()
        }
    }

    #[test]
    fn test_get_memoizes() {
        let c = ServiceContainer::builder(AppConfig::default()).register::<CounterSlot>().build();
        let a = c.get::<CounterSlot>().unwrap();
        let b = c.get::<CounterSlot>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(c.resolved_slots(), vec!["Counter"]);
    }

    #[test]
    fn test_unregistered_slot() {
        let c = ServiceContainer::builder(AppConfig::default()).build();
        match c.get::<CounterSlot>() {
            Err(ServiceError::NotRegistered(name)) => assert_eq!(name, "Counter"),
            other => panic!("unexpected: {:?}", other.map(|s| s.id())),
        }
    }

    #[test]
    fn test_cycle_chain_reported() {
        let c = ServiceContainer::builder(AppConfig::default())
            .register::<Left>()
            .register::<Right>()
            .build();
        match c.get::<Left>() {
            Err(ServiceError::CycleDetected { slot, chain }) => {
                assert_eq!(slot, "Left");
                assert_eq!(chain, vec!["Left", "Right", "Left"]);
            }
            other => panic!("unexpected: {:?}", other.map(|s| s.id())),
        }
        assert!(c.resolved_slots().is_empty());
        assert!(c.slots.lock().stacks.is_empty());
    }

    #[test]
    fn test_panicking_constructor_leaves_slot_absent() {
        let c = ServiceContainer::builder(AppConfig::default())
            .with_factory::<CounterSlot, _>(|_| panic!("boom"))
            .build();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = c.get::<CounterSlot>();
        }));
        assert!(result.is_err());
        assert!(!c.is_resolved::<CounterSlot>());
        assert!(matches!(
            c.slots.lock().entries.get(&TypeId::of::<CounterSlot>()).map(|e| &e.state),
            Some(SlotState::Absent)
        ));
    }

    #[test]
    fn test_reset_inside_constructor_does_not_install() {
        let c = ServiceContainer::builder(AppConfig::default())
            .with_factory::<CounterSlot, _>(|c| {
                c.reset();
                Ok(Arc::new(Numbered(7)) as Arc<dyn Counter>)
            })
            .build();
        let first = c.get::<CounterSlot>().unwrap();
        assert_eq!(first.id(), 7);
        assert!(!c.is_resolved::<CounterSlot>());
    }
}
