// Scheme registry factory
//
// Concrete codecs plug in as serialization schemes. The registry factory
// reads the format header, picks the first registered scheme that accepts
// (header, use case), caches the choice and runs the scheme with itself and
// the operation's context installed as ambient state.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::ambient;
use crate::context::SerializationContext;
use crate::encoding::SerializationMagic;
use crate::error::{SerializationError, SerializationResult};
use crate::factory::{ObjectWithCompatibleContext, SerializationFactory};
use crate::types::TypeDescriptor;
use crate::use_case::UseCase;

/// A concrete wire format implementation
pub trait SerializationScheme: Debug + Send + Sync {
    /// Whether this scheme handles payloads with header `magic` for `use_case`
    fn can_deserialize_version(&self, magic: SerializationMagic, use_case: UseCase) -> bool;

    fn serialize(
        &self,
        obj: &dyn Any,
        ty: TypeDescriptor,
        context: &SerializationContext,
    ) -> SerializationResult<Vec<u8>>;

    fn deserialize(
        &self,
        bytes: &[u8],
        target: TypeDescriptor,
        context: &SerializationContext,
    ) -> SerializationResult<Box<dyn Any + Send>>;
}

type SchemeKey = (SerializationMagic, UseCase);

/// Factory dispatching to registered schemes by format header
#[derive(Debug)]
pub struct SchemeRegistryFactory {
    me: Weak<SchemeRegistryFactory>,
    registered: RwLock<Vec<Arc<dyn SerializationScheme>>>,
    resolved: RwLock<HashMap<SchemeKey, Arc<dyn SerializationScheme>>>,
}

impl SchemeRegistryFactory {
    /// Create an empty registry. Factories are always shared, since they
    /// install themselves as the ambient factory.
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            registered: RwLock::new(Vec::new()),
            resolved: RwLock::new(HashMap::new()),
        })
    }

    /// Register a scheme. All schemes must be registered before the first
    /// lookup, so cached choices never go stale.
    pub fn register_scheme(&self, scheme: Arc<dyn SerializationScheme>) -> SerializationResult<()> {
        // hold the resolved lock so no lookup can race the registration
        let resolved = self.resolved.read();
        if !resolved.is_empty() {
            return Err(SerializationError::SchemeRegistrationClosed);
        }
        debug!(scheme = ?scheme, "registering serialization scheme");
        self.registered.write().push(scheme);
        Ok(())
    }

    /// Number of registered schemes
    pub fn scheme_count(&self) -> usize {
        self.registered.read().len()
    }

    fn scheme_for(&self, magic: SerializationMagic, use_case: UseCase) -> SerializationResult<Arc<dyn SerializationScheme>> {
        let key = (magic, use_case);
        if let Some(scheme) = self.resolved.read().get(&key) {
            return Ok(scheme.clone());
        }

        let mut resolved = self.resolved.write();
        if let Some(scheme) = resolved.get(&key) {
            return Ok(scheme.clone());
        }

        let registered = self.registered.read();
        match registered.iter().find(|s| s.can_deserialize_version(magic, use_case)) {
            Some(scheme) => {
                debug!(%magic, %use_case, "resolved serialization scheme");
                resolved.insert(key, scheme.clone());
                Ok(scheme.clone())
            }
            None => {
                warn!(
                    %magic,
                    %use_case,
                    known_prefix = magic.has_platform_prefix(),
                    registered = registered.len(),
                    "cannot find serialization scheme"
                );
                Err(SerializationError::UnsupportedScheme { magic, use_case })
            }
        }
    }

    fn scheme_for_payload(
        &self,
        bytes: &[u8],
        use_case: UseCase,
    ) -> SerializationResult<(Arc<dyn SerializationScheme>, SerializationMagic)> {
        let magic = SerializationMagic::peek(bytes)
            .ok_or_else(|| SerializationError::UnknownFormat(hex::encode(bytes)))?;
        Ok((self.scheme_for(magic, use_case)?, magic))
    }

    /// Run `block` with this factory and `context` as ambient state
    fn scoped<R>(
        &self,
        context: &SerializationContext,
        block: impl FnOnce() -> SerializationResult<R>,
    ) -> SerializationResult<R> {
        match self.me.upgrade() {
            Some(me) => {
                let me: Arc<dyn SerializationFactory> = me;
                ambient::as_current(&me, |_| ambient::with_current_context(Some(context), block))
            }
            // only reachable while the last handle is being dropped
            None => ambient::with_current_context(Some(context), block),
        }
    }
}

impl SerializationFactory for SchemeRegistryFactory {
    fn serialize(
        &self,
        obj: &dyn Any,
        ty: TypeDescriptor,
        context: &SerializationContext,
    ) -> SerializationResult<Vec<u8>> {
        self.scoped(context, || {
            let scheme = self.scheme_for(context.preferred_serialization_version(), context.use_case())?;
            scheme.serialize(obj, ty, context)
        })
    }

    fn deserialize(
        &self,
        bytes: &[u8],
        target: TypeDescriptor,
        context: &SerializationContext,
    ) -> SerializationResult<Box<dyn Any + Send>> {
        self.scoped(context, || {
            let (scheme, _) = self.scheme_for_payload(bytes, context.use_case())?;
            scheme.deserialize(bytes, target, context)
        })
    }

    fn deserialize_with_compatible_context(
        &self,
        bytes: &[u8],
        target: TypeDescriptor,
        context: &SerializationContext,
    ) -> SerializationResult<ObjectWithCompatibleContext<Box<dyn Any + Send>>> {
        self.scoped(context, || {
            let (scheme, magic) = self.scheme_for_payload(bytes, context.use_case())?;
            let object = scheme.deserialize(bytes, target, context)?;
            Ok(ObjectWithCompatibleContext {
                object,
                context: context.with_preferred_serialization_version(magic),
            })
        })
    }
}
