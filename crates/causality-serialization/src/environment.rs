// Serialization environment
//
// The process-wide handle exposing the default factory and one default
// context per use case. The node bootstrap installs it once; tests may
// override it per thread for the duration of a closure.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::context::SerializationContext;
use crate::error::{SerializationError, SerializationResult};
use crate::factory::SerializationFactory;
use crate::use_case::UseCase;

/// Default factory and per-use-case contexts
#[derive(Debug, Clone)]
pub struct SerializationEnvironment {
    serialization_factory: Arc<dyn SerializationFactory>,
    p2p_context: SerializationContext,
    rpc_server_context: Option<SerializationContext>,
    rpc_client_context: Option<SerializationContext>,
    storage_context: Option<SerializationContext>,
    testing_context: Option<SerializationContext>,
}

impl SerializationEnvironment {
    /// Start building an environment; the P2P context is mandatory
    pub fn builder(
        serialization_factory: Arc<dyn SerializationFactory>,
        p2p_context: SerializationContext,
    ) -> SerializationEnvironmentBuilder {
        SerializationEnvironmentBuilder {
            env: SerializationEnvironment {
                serialization_factory,
                p2p_context,
                rpc_server_context: None,
                rpc_client_context: None,
                storage_context: None,
                testing_context: None,
            },
        }
    }

    pub fn serialization_factory(&self) -> &Arc<dyn SerializationFactory> {
        &self.serialization_factory
    }

    pub fn p2p_context(&self) -> &SerializationContext {
        &self.p2p_context
    }

    pub fn rpc_server_context(&self) -> SerializationResult<&SerializationContext> {
        configured(&self.rpc_server_context, UseCase::RpcServer)
    }

    pub fn rpc_client_context(&self) -> SerializationResult<&SerializationContext> {
        configured(&self.rpc_client_context, UseCase::RpcClient)
    }

    pub fn storage_context(&self) -> SerializationResult<&SerializationContext> {
        configured(&self.storage_context, UseCase::Storage)
    }

    pub fn testing_context(&self) -> SerializationResult<&SerializationContext> {
        configured(&self.testing_context, UseCase::Testing)
    }

    /// Default context for `use_case`
    pub fn context_for(&self, use_case: UseCase) -> SerializationResult<SerializationContext> {
        let context = match use_case {
            UseCase::P2p => &self.p2p_context,
            UseCase::RpcServer => self.rpc_server_context()?,
            UseCase::RpcClient => self.rpc_client_context()?,
            UseCase::Storage => self.storage_context()?,
            UseCase::Testing => self.testing_context()?,
        };
        Ok(context.clone())
    }

    /// Use cases with a configured context
    pub fn configured_use_cases(&self) -> Vec<UseCase> {
        UseCase::ALL
            .into_iter()
            .filter(|use_case| self.context_for(*use_case).is_ok())
            .collect()
    }
}

fn configured(slot: &Option<SerializationContext>, use_case: UseCase) -> SerializationResult<&SerializationContext> {
    slot.as_ref().ok_or(SerializationError::ContextNotConfigured(use_case))
}

/// Builder for [`SerializationEnvironment`]
#[derive(Debug)]
pub struct SerializationEnvironmentBuilder {
    env: SerializationEnvironment,
}

impl SerializationEnvironmentBuilder {
    pub fn rpc_server_context(mut self, context: SerializationContext) -> Self {
        self.env.rpc_server_context = Some(context);
        self
    }

    pub fn rpc_client_context(mut self, context: SerializationContext) -> Self {
        self.env.rpc_client_context = Some(context);
        self
    }

    pub fn storage_context(mut self, context: SerializationContext) -> Self {
        self.env.storage_context = Some(context);
        self
    }

    pub fn testing_context(mut self, context: SerializationContext) -> Self {
        self.env.testing_context = Some(context);
        self
    }

    /// Fill the slot for `use_case`; P2P replaces the mandatory context
    pub fn context(mut self, use_case: UseCase, context: SerializationContext) -> Self {
        match use_case {
            UseCase::P2p => self.env.p2p_context = context,
            UseCase::RpcServer => self.env.rpc_server_context = Some(context),
            UseCase::RpcClient => self.env.rpc_client_context = Some(context),
            UseCase::Storage => self.env.storage_context = Some(context),
            UseCase::Testing => self.env.testing_context = Some(context),
        }
        self
    }

    pub fn build(self) -> SerializationEnvironment {
        self.env
    }
}

static GLOBAL_ENVIRONMENT: RwLock<Option<Arc<SerializationEnvironment>>> = parking_lot::const_rwlock(None);

thread_local! {
    static THREAD_ENVIRONMENT: RefCell<Option<Arc<SerializationEnvironment>>> = RefCell::new(None);
}

/// Install the process-wide environment.
///
/// Fails if one is already installed; call [`uninstall`] first to replace it.
pub fn install(env: SerializationEnvironment) -> SerializationResult<Arc<SerializationEnvironment>> {
    let mut global = GLOBAL_ENVIRONMENT.write();
    if global.is_some() {
        return Err(SerializationError::EnvironmentAlreadyInstalled);
    }
    let env = Arc::new(env);
    *global = Some(env.clone());
    info!(use_cases = ?env.configured_use_cases(), "installed serialization environment");
    Ok(env)
}

/// Remove the process-wide environment, returning it if one was installed
pub fn uninstall() -> Option<Arc<SerializationEnvironment>> {
    let previous = GLOBAL_ENVIRONMENT.write().take();
    if previous.is_some() {
        info!("uninstalled serialization environment");
    }
    previous
}

/// The process-wide environment
pub fn installed() -> SerializationResult<Arc<SerializationEnvironment>> {
    GLOBAL_ENVIRONMENT
        .read()
        .clone()
        .ok_or(SerializationError::EnvironmentNotInstalled)
}

/// The environment seen by the calling thread: its override if present,
/// otherwise the process-wide one
pub fn effective() -> SerializationResult<Arc<SerializationEnvironment>> {
    if let Some(env) = THREAD_ENVIRONMENT.with(|slot| slot.borrow().clone()) {
        return Ok(env);
    }
    installed()
}

/// Restores the thread override on drop
struct ThreadEnvironmentScope {
    previous: Option<Arc<SerializationEnvironment>>,
}

impl Drop for ThreadEnvironmentScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = THREAD_ENVIRONMENT.try_with(|slot| {
            *slot.borrow_mut() = previous;
        });
    }
}

/// Run `block` with `env` overriding the process-wide environment on this thread
pub fn with_thread_environment<R>(env: Arc<SerializationEnvironment>, block: impl FnOnce() -> R) -> R {
    let previous = THREAD_ENVIRONMENT.with(|slot| slot.replace(Some(env)));
    let _scope = ThreadEnvironmentScope { previous };
    block()
}
