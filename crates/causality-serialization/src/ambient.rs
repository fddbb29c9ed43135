//! Ambient factory and context for the current thread.
//!
//! Nested serialization (a codec recursing into a field, a custom serializer
//! serializing a sub-object) needs the factory and context that started the
//! outer operation. Rather than threading them through every codec call, the
//! outer operation installs them here for the duration of a closure.
//!
//! Slots are thread-local, so concurrently running call chains never observe
//! each other's values. Scopes are synchronous closures, so no async task can
//! be suspended inside one. Every scope restores the previous value when it
//! ends, whether the closure returns normally or unwinds.

use std::cell::RefCell;
use std::sync::Arc;

use tracing::trace;

use crate::context::SerializationContext;
use crate::factory::SerializationFactory;

// Thread-local storage of the ambient factory and context
thread_local! {
    static CURRENT_FACTORY: RefCell<Option<Arc<dyn SerializationFactory>>> = RefCell::new(None);
    static CURRENT_CONTEXT: RefCell<Option<SerializationContext>> = RefCell::new(None);
}

/// Restores the factory slot to its previous value on drop
struct FactoryScope {
    previous: Option<Arc<dyn SerializationFactory>>,
}

impl FactoryScope {
    fn enter(factory: Arc<dyn SerializationFactory>) -> Self {
        let previous = CURRENT_FACTORY.with(|slot| slot.replace(Some(factory)));
        trace!(nested = previous.is_some(), "entered serialization factory scope");
        Self { previous }
    }
}

impl Drop for FactoryScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // the slot may already be gone during thread teardown
        let _ = CURRENT_FACTORY.try_with(|slot| {
            *slot.borrow_mut() = previous;
        });
    }
}

/// Restores the context slot to its previous value on drop
struct ContextScope {
    previous: Option<SerializationContext>,
}

impl ContextScope {
    fn enter(context: SerializationContext) -> Self {
        let previous = CURRENT_CONTEXT.with(|slot| slot.replace(Some(context)));
        trace!(nested = previous.is_some(), "entered serialization context scope");
        Self { previous }
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = CURRENT_CONTEXT.try_with(|slot| {
            *slot.borrow_mut() = previous;
        });
    }
}

/// Run `block` with `factory` installed as the ambient factory.
///
/// The previously ambient factory is restored on every exit path before the
/// block's result (or panic) propagates.
pub fn as_current<R>(
    factory: &Arc<dyn SerializationFactory>,
    block: impl FnOnce(&Arc<dyn SerializationFactory>) -> R,
) -> R {
    let _scope = FactoryScope::enter(factory.clone());
    block(factory)
}

/// Run `block` with `context` installed as the ambient context.
///
/// With `None` the block runs and the ambient context is left as it is.
pub fn with_current_context<R>(context: Option<&SerializationContext>, block: impl FnOnce() -> R) -> R {
    match context {
        Some(context) => {
            let _scope = ContextScope::enter(context.clone());
            block()
        }
        None => block(),
    }
}

/// Ambient factory of the calling thread, if any
pub fn current_factory() -> Option<Arc<dyn SerializationFactory>> {
    CURRENT_FACTORY.with(|slot| slot.borrow().clone())
}

/// Ambient context of the calling thread, if any
pub fn current_context() -> Option<SerializationContext> {
    CURRENT_CONTEXT.with(|slot| slot.borrow().clone())
}
