// Typed serialized bytes

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::api;
use crate::context::SerializationContext;
use crate::error::SerializationResult;
use crate::factory::SerializationFactory;

/// Bytes produced by serializing a `T`
pub struct SerializedBytes<T> {
    bytes: Vec<u8>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerializedBytes<T> {
    /// Wrap bytes that are known to hold a serialized `T`
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            _marker: PhantomData,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl<T: Any + Send> SerializedBytes<T> {
    /// Deserialize back into a `T`, defaulting the factory and context
    pub fn deserialize(
        &self,
        factory: Option<&Arc<dyn SerializationFactory>>,
        context: Option<&SerializationContext>,
    ) -> SerializationResult<T> {
        api::deserialize::<T>(&self.bytes, factory, context)
    }
}

impl<T> Clone for SerializedBytes<T> {
    fn clone(&self) -> Self {
        Self::new(self.bytes.clone())
    }
}

impl<T> PartialEq for SerializedBytes<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<T> Eq for SerializedBytes<T> {}

impl<T> AsRef<[u8]> for SerializedBytes<T> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<T> fmt::Debug for SerializedBytes<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerializedBytes<{}>({} bytes)", std::any::type_name::<T>(), self.bytes.len())
    }
}
