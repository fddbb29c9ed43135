//! The serialization factory boundary.
//!
//! A [`SerializationFactory`] is the dispatcher codecs plug into. Objects
//! cross it type-erased (`&dyn Any` plus a [`TypeDescriptor`]) so factories
//! can be shared as `Arc<dyn SerializationFactory>` and installed as the
//! ambient factory; the typed helpers on `dyn SerializationFactory` restore
//! static types at the call site.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use crate::ambient;
use crate::context::SerializationContext;
use crate::environment;
use crate::error::{SerializationError, SerializationResult};
use crate::types::TypeDescriptor;
use crate::use_case::UseCase;

/// A deserialized object together with the context that produced it
#[derive(Debug)]
pub struct ObjectWithCompatibleContext<T> {
    pub object: T,
    pub context: SerializationContext,
}

/// Dispatcher between callers and the concrete codec
pub trait SerializationFactory: Debug + Send + Sync {
    /// Serialize `obj`, whose type is `ty`, under `context`.
    ///
    /// Codec failures are returned unchanged.
    fn serialize(
        &self,
        obj: &dyn Any,
        ty: TypeDescriptor,
        context: &SerializationContext,
    ) -> SerializationResult<Vec<u8>>;

    /// Deserialize an object of type `target` from `bytes`.
    ///
    /// `bytes` must begin with a recognized format header.
    fn deserialize(
        &self,
        bytes: &[u8],
        target: TypeDescriptor,
        context: &SerializationContext,
    ) -> SerializationResult<Box<dyn Any + Send>>;

    /// Like [`SerializationFactory::deserialize`], also returning the context
    /// that was actually used
    fn deserialize_with_compatible_context(
        &self,
        bytes: &[u8],
        target: TypeDescriptor,
        context: &SerializationContext,
    ) -> SerializationResult<ObjectWithCompatibleContext<Box<dyn Any + Send>>> {
        let object = self.deserialize(bytes, target, context)?;
        Ok(ObjectWithCompatibleContext {
            object,
            context: context.clone(),
        })
    }
}

impl dyn SerializationFactory {
    pub fn serialize_object<T: Any>(&self, obj: &T, context: &SerializationContext) -> SerializationResult<Vec<u8>> {
        self.serialize(obj, TypeDescriptor::of::<T>(), context)
    }

    pub fn deserialize_object<T: Any + Send>(
        &self,
        bytes: &[u8],
        context: &SerializationContext,
    ) -> SerializationResult<T> {
        let object = self.deserialize(bytes, TypeDescriptor::of::<T>(), context)?;
        downcast(object)
    }

    pub fn deserialize_object_with_compatible_context<T: Any + Send>(
        &self,
        bytes: &[u8],
        context: &SerializationContext,
    ) -> SerializationResult<ObjectWithCompatibleContext<T>> {
        let result = self.deserialize_with_compatible_context(bytes, TypeDescriptor::of::<T>(), context)?;
        Ok(ObjectWithCompatibleContext {
            object: downcast(result.object)?,
            context: result.context,
        })
    }
}

fn downcast<T: Any>(object: Box<dyn Any + Send>) -> SerializationResult<T> {
    object
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| SerializationError::TypeMismatch {
            expected: std::any::type_name::<T>(),
        })
}

/// The ambient factory if one is installed, otherwise the environment's factory
pub fn default_factory() -> SerializationResult<Arc<dyn SerializationFactory>> {
    if let Some(factory) = ambient::current_factory() {
        return Ok(factory);
    }
    Ok(environment::effective()?.serialization_factory().clone())
}

/// The ambient context if one is installed, otherwise the environment's P2P context
pub fn default_context() -> SerializationResult<SerializationContext> {
    if let Some(context) = ambient::current_context() {
        return Ok(context);
    }
    environment::effective()?.context_for(UseCase::P2p)
}
