//! Convenience wrappers over the serialization factory.
//!
//! Each helper takes an optional factory and context. A missing factory is
//! resolved through [`default_factory`], a missing context through
//! [`default_context`], so code running inside a serialization scope reuses
//! the scope's factory and context automatically.

use std::any::Any;
use std::sync::Arc;

use crate::bytes::SerializedBytes;
use crate::context::SerializationContext;
use crate::error::{SerializationError, SerializationResult};
use crate::factory::{default_context, default_factory, ObjectWithCompatibleContext, SerializationFactory};

fn resolve(
    factory: Option<&Arc<dyn SerializationFactory>>,
    context: Option<&SerializationContext>,
) -> SerializationResult<(Arc<dyn SerializationFactory>, SerializationContext)> {
    let factory = match factory {
        Some(factory) => factory.clone(),
        None => default_factory()?,
    };
    let context = match context {
        Some(context) => context.clone(),
        None => default_context()?,
    };
    Ok((factory, context))
}

/// Serialize `obj`
pub fn serialize<T: Any>(
    obj: &T,
    factory: Option<&Arc<dyn SerializationFactory>>,
    context: Option<&SerializationContext>,
) -> SerializationResult<SerializedBytes<T>> {
    let (factory, context) = resolve(factory, context)?;
    factory.serialize_object(obj, &context).map(SerializedBytes::new)
}

/// Deserialize a `T` from `bytes`.
///
/// Empty input fails with [`SerializationError::EmptyInput`] before any
/// factory is consulted.
pub fn deserialize<T: Any + Send>(
    bytes: &[u8],
    factory: Option<&Arc<dyn SerializationFactory>>,
    context: Option<&SerializationContext>,
) -> SerializationResult<T> {
    if bytes.is_empty() {
        return Err(SerializationError::EmptyInput);
    }
    let (factory, context) = resolve(factory, context)?;
    factory.deserialize_object(bytes, &context)
}

/// Deserialize a `T` from `bytes`, also returning the context actually used
pub fn deserialize_with_compatible_context<T: Any + Send>(
    bytes: &[u8],
    factory: Option<&Arc<dyn SerializationFactory>>,
    context: Option<&SerializationContext>,
) -> SerializationResult<ObjectWithCompatibleContext<T>> {
    if bytes.is_empty() {
        return Err(SerializationError::EmptyInput);
    }
    let (factory, context) = resolve(factory, context)?;
    factory.deserialize_object_with_compatible_context(bytes, &context)
}
