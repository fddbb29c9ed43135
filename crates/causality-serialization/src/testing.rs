//! Test doubles for the serialization layer.
//!
//! Simple policy objects, an in-memory attachment store, a factory that only
//! records calls, and [`BincodeScheme`], a small reference scheme that
//! enforces the context's whitelists so rejection paths can be tested end
//! to end.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::context::SerializationContext;
use crate::encoding::{Encoding, SerializationMagic};
use crate::error::{SerializationError, SerializationResult};
use crate::factory::SerializationFactory;
use crate::policy::{Attachment, AttachmentStore, ClassLoader, ClassWhitelist, EncodingWhitelist};
use crate::scheme::SerializationScheme;
use crate::types::{AttachmentId, TypeDescriptor};
use crate::use_case::UseCase;

//-----------------------------------------------------------------------------
// Policies
//-----------------------------------------------------------------------------

/// Whitelist accepting every type
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllWhitelist;

impl ClassWhitelist for AllowAllWhitelist {
    fn has_listed(&self, _ty: &TypeDescriptor) -> bool {
        true
    }
}

/// Whitelist rejecting every type
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowNoneWhitelist;

impl ClassWhitelist for AllowNoneWhitelist {
    fn has_listed(&self, _ty: &TypeDescriptor) -> bool {
        false
    }
}

/// Whitelist accepting an explicit set of types
#[derive(Debug, Clone, Default)]
pub struct TypeSetWhitelist {
    types: Vec<TypeDescriptor>,
}

impl TypeSetWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type<T: Any + ?Sized>(mut self) -> Self {
        self.types.push(TypeDescriptor::of::<T>());
        self
    }
}

impl ClassWhitelist for TypeSetWhitelist {
    fn has_listed(&self, ty: &TypeDescriptor) -> bool {
        self.types.contains(ty)
    }
}

/// Encoding whitelist accepting a fixed set of encodings
#[derive(Debug, Clone)]
pub struct AcceptedEncodings {
    accepted: Vec<Encoding>,
}

impl AcceptedEncodings {
    pub fn all() -> Self {
        Self::only(&[Encoding::Deflate, Encoding::Snappy])
    }

    pub fn none() -> Self {
        Self::only(&[])
    }

    pub fn only(encodings: &[Encoding]) -> Self {
        Self {
            accepted: encodings.to_vec(),
        }
    }
}

impl EncodingWhitelist for AcceptedEncodings {
    fn accept_encoding(&self, encoding: Encoding) -> bool {
        self.accepted.contains(&encoding)
    }
}

/// Class loader resolving a fixed set of types by name
#[derive(Debug, Clone, Default)]
pub struct StaticClassLoader {
    types: HashMap<&'static str, TypeDescriptor>,
}

impl StaticClassLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader resolving the primitive and standard library types tests
    /// commonly serialize
    pub fn with_std_types() -> Self {
        Self::new()
            .with_type::<bool>()
            .with_type::<u8>()
            .with_type::<u16>()
            .with_type::<u32>()
            .with_type::<u64>()
            .with_type::<i32>()
            .with_type::<i64>()
            .with_type::<String>()
            .with_type::<Vec<u8>>()
    }

    pub fn with_type<T: Any>(mut self) -> Self {
        let ty = TypeDescriptor::of::<T>();
        self.types.insert(ty.name(), ty);
        self
    }
}

impl ClassLoader for StaticClassLoader {
    fn resolve(&self, type_name: &str) -> Option<TypeDescriptor> {
        self.types.get(type_name).copied()
    }
}

/// Context with permissive whitelists, the default header and a class
/// loader resolving [`StaticClassLoader::with_std_types`]
pub fn test_context(use_case: UseCase) -> SerializationContext {
    SerializationContext::new(
        SerializationMagic::AMQP_V1,
        Arc::new(StaticClassLoader::with_std_types()),
        Arc::new(AllowAllWhitelist),
        Arc::new(AcceptedEncodings::all()),
        use_case,
    )
}

//-----------------------------------------------------------------------------
// Attachments
//-----------------------------------------------------------------------------

/// Attachment contributing a set of types
#[derive(Debug, Clone)]
pub struct InMemoryAttachment {
    id: AttachmentId,
    types: Vec<TypeDescriptor>,
}

impl InMemoryAttachment {
    pub fn new(id: AttachmentId) -> Self {
        Self { id, types: Vec::new() }
    }

    pub fn with_type<T: Any>(mut self) -> Self {
        self.types.push(TypeDescriptor::of::<T>());
        self
    }
}

impl Attachment for InMemoryAttachment {
    fn id(&self) -> AttachmentId {
        self.id
    }
}

/// In-memory attachment store
#[derive(Debug, Default)]
pub struct InMemoryAttachmentStore {
    attachments: RwLock<HashMap<AttachmentId, Arc<InMemoryAttachment>>>,
}

impl InMemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, attachment: InMemoryAttachment) {
        self.attachments.write().insert(attachment.id, Arc::new(attachment));
    }
}

impl AttachmentStore for InMemoryAttachmentStore {
    fn open_attachment(&self, id: &AttachmentId) -> Option<Arc<dyn Attachment>> {
        let attachment = self.attachments.read().get(id).cloned()?;
        Some(attachment)
    }

    fn class_loader(
        &self,
        attachments: &[Arc<dyn Attachment>],
        parent: Arc<dyn ClassLoader>,
    ) -> Arc<dyn ClassLoader> {
        let stored = self.attachments.read();
        let types = attachments
            .iter()
            .filter_map(|a| stored.get(&a.id()))
            .flat_map(|a| a.types.iter().copied())
            .map(|ty| (ty.name(), ty))
            .collect();
        Arc::new(AttachmentsClassLoader { types, parent })
    }
}

/// Resolves attachment types first, then delegates to the parent
#[derive(Debug)]
struct AttachmentsClassLoader {
    types: HashMap<&'static str, TypeDescriptor>,
    parent: Arc<dyn ClassLoader>,
}

impl ClassLoader for AttachmentsClassLoader {
    fn resolve(&self, type_name: &str) -> Option<TypeDescriptor> {
        self.types
            .get(type_name)
            .copied()
            .or_else(|| self.parent.resolve(type_name))
    }
}

//-----------------------------------------------------------------------------
// Factories and schemes
//-----------------------------------------------------------------------------

/// Factory that records calls and performs no encoding
#[derive(Debug, Default)]
pub struct RecordingFactory {
    serialize_calls: AtomicUsize,
    deserialize_calls: AtomicUsize,
    last_use_case: Mutex<Option<UseCase>>,
}

impl RecordingFactory {
    pub fn serialize_calls(&self) -> usize {
        self.serialize_calls.load(Ordering::SeqCst)
    }

    pub fn deserialize_calls(&self) -> usize {
        self.deserialize_calls.load(Ordering::SeqCst)
    }

    /// Use case of the context passed to the most recent call
    pub fn last_use_case(&self) -> Option<UseCase> {
        *self.last_use_case.lock()
    }
}

impl SerializationFactory for RecordingFactory {
    fn serialize(
        &self,
        _obj: &dyn Any,
        _ty: TypeDescriptor,
        context: &SerializationContext,
    ) -> SerializationResult<Vec<u8>> {
        self.serialize_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_use_case.lock() = Some(context.use_case());
        Ok(context.preferred_serialization_version().as_bytes().to_vec())
    }

    fn deserialize(
        &self,
        _bytes: &[u8],
        target: TypeDescriptor,
        context: &SerializationContext,
    ) -> SerializationResult<Box<dyn Any + Send>> {
        self.deserialize_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_use_case.lock() = Some(context.use_case());
        Err(SerializationError::UnsupportedType(target.name().to_string()))
    }
}

type SerializeFn = Box<dyn Fn(&dyn Any, &SerializationContext) -> SerializationResult<Vec<u8>> + Send + Sync>;
type DeserializeFn =
    Box<dyn Fn(&[u8], &SerializationContext) -> SerializationResult<Box<dyn Any + Send>> + Send + Sync>;

struct Handler {
    ty: TypeDescriptor,
    serialize: SerializeFn,
    deserialize: DeserializeFn,
}

/// Reference scheme for tests.
///
/// Wire layout: header, encoding tag (0 for none), big-endian `u16` type name
/// length, type name, payload. The type name is resolved through the
/// context's class loader on deserialize. The encoding is recorded but the payload is
/// never compressed.
pub struct BincodeScheme {
    magic: SerializationMagic,
    use_cases: Option<Vec<UseCase>>,
    handlers: HashMap<TypeId, Handler>,
}

impl BincodeScheme {
    /// Scheme for header `magic`, serving every use case
    pub fn new(magic: SerializationMagic) -> Self {
        Self {
            magic,
            use_cases: None,
            handlers: HashMap::new(),
        }
    }

    /// Restrict the scheme to the given use cases
    pub fn for_use_cases(mut self, use_cases: &[UseCase]) -> Self {
        self.use_cases = Some(use_cases.to_vec());
        self
    }

    /// Handle `T` with bincode
    pub fn register<T>(self) -> Self
    where
        T: Serialize + DeserializeOwned + Any + Send,
    {
        self.register_with::<T>(
            |value, _| bincode::serialize(value).map_err(|e| SerializationError::SerializationFailed(e.to_string())),
            |bytes, _| bincode::deserialize(bytes).map_err(|e| SerializationError::DeserializationFailed(e.to_string())),
        )
    }

    /// Handle `T` with custom payload functions
    pub fn register_with<T: Any + Send>(
        mut self,
        serialize: impl Fn(&T, &SerializationContext) -> SerializationResult<Vec<u8>> + Send + Sync + 'static,
        deserialize: impl Fn(&[u8], &SerializationContext) -> SerializationResult<T> + Send + Sync + 'static,
    ) -> Self {
        let ty = TypeDescriptor::of::<T>();
        let handler = Handler {
            ty,
            serialize: Box::new(move |obj, context| {
                let value = obj
                    .downcast_ref::<T>()
                    .ok_or(SerializationError::TypeMismatch { expected: ty.name() })?;
                serialize(value, context)
            }),
            deserialize: Box::new(move |bytes, context| {
                let value = deserialize(bytes, context)?;
                Ok(Box::new(value) as Box<dyn Any + Send>)
            }),
        };
        self.handlers.insert(ty.id(), handler);
        self
    }

    fn handler(&self, ty: &TypeDescriptor) -> SerializationResult<&Handler> {
        self.handlers
            .get(&ty.id())
            .ok_or_else(|| SerializationError::UnsupportedType(ty.name().to_string()))
    }
}

fn truncated() -> SerializationError {
    SerializationError::DeserializationFailed("truncated payload".to_string())
}

impl SerializationScheme for BincodeScheme {
    fn can_deserialize_version(&self, magic: SerializationMagic, use_case: UseCase) -> bool {
        magic == self.magic
            && self
                .use_cases
                .as_ref()
                .map_or(true, |use_cases| use_cases.contains(&use_case))
    }

    fn serialize(
        &self,
        obj: &dyn Any,
        ty: TypeDescriptor,
        context: &SerializationContext,
    ) -> SerializationResult<Vec<u8>> {
        if !context.whitelist().has_listed(&ty) {
            return Err(SerializationError::NotWhitelisted(ty.name().to_string()));
        }
        let payload = (self.handler(&ty)?.serialize)(obj, context)?;

        let name = ty.name().as_bytes();
        let name_len = u16::try_from(name.len())
            .map_err(|_| SerializationError::SerializationFailed(format!("type name too long: {}", ty)))?;

        let mut out = Vec::with_capacity(SerializationMagic::SIZE + 3 + name.len() + payload.len());
        out.extend_from_slice(self.magic.as_bytes());
        out.push(context.encoding().map_or(0, Encoding::tag));
        out.extend_from_slice(&name_len.to_be_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(&payload);
        Ok(out)
    }

    fn deserialize(
        &self,
        bytes: &[u8],
        target: TypeDescriptor,
        context: &SerializationContext,
    ) -> SerializationResult<Box<dyn Any + Send>> {
        let body = bytes.get(SerializationMagic::SIZE..).ok_or_else(truncated)?;
        let (&tag, rest) = body.split_first().ok_or_else(truncated)?;
        if tag != 0 {
            let encoding = Encoding::from_tag(tag).ok_or_else(|| {
                SerializationError::DeserializationFailed(format!("unknown encoding tag {}", tag))
            })?;
            if !context.encoding_whitelist().accept_encoding(encoding) {
                return Err(SerializationError::EncodingNotAccepted(encoding));
            }
        }

        let len_bytes = rest.get(..2).ok_or_else(truncated)?;
        let name_len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
        let name_bytes = rest.get(2..2 + name_len).ok_or_else(truncated)?;
        let name = std::str::from_utf8(name_bytes)
            .map_err(|e| SerializationError::DeserializationFailed(e.to_string()))?;
        let payload = &rest[2 + name_len..];

        // only types the context's loader can see may be materialized
        let ty = context
            .deserialization_class_loader()
            .resolve(name)
            .ok_or_else(|| SerializationError::UnsupportedType(name.to_string()))?;
        if !context.whitelist().has_listed(&ty) {
            return Err(SerializationError::NotWhitelisted(ty.name().to_string()));
        }
        if ty != target {
            return Err(SerializationError::TypeMismatch { expected: target.name() });
        }

        (self.handler(&ty)?.deserialize)(payload, context)
    }
}

impl fmt::Debug for BincodeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.handlers.values().map(|h| h.ty.name()).collect();
        types.sort_unstable();
        f.debug_struct("BincodeScheme")
            .field("magic", &self.magic)
            .field("use_cases", &self.use_cases)
            .field("types", &types)
            .finish()
    }
}
