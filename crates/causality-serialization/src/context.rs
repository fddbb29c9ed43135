//! Immutable serialization context.
//!
//! A [`SerializationContext`] bundles every parameter that governs one
//! serialize or deserialize call. It is never modified after construction:
//! each `with_*` operation returns a new context that shares the unchanged
//! fields with the original, so a context may be captured by any number of
//! concurrent operations.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::encoding::{Encoding, SerializationMagic};
use crate::error::{SerializationError, SerializationResult};
use crate::policy::{AttachmentStore, ClassLoader, ClassWhitelist, EncodingWhitelist, ExtendedWhitelist};
use crate::types::{AttachmentId, TypeDescriptor};
use crate::use_case::UseCase;

/// Parameters governing a single serialization operation
#[derive(Debug, Clone)]
pub struct SerializationContext {
    preferred_serialization_version: SerializationMagic,
    encoding: Option<Encoding>,
    deserialization_class_loader: Arc<dyn ClassLoader>,
    whitelist: Arc<dyn ClassWhitelist>,
    encoding_whitelist: Arc<dyn EncodingWhitelist>,
    properties: Arc<BTreeMap<String, serde_json::Value>>,
    object_references_enabled: bool,
    carpenter_enabled: bool,
    lenient_carpenter_enabled: bool,
    use_case: UseCase,
}

impl SerializationContext {
    /// Create a context with no encoding, no properties, object references
    /// and the carpenter enabled, and strict carpenter mode.
    pub fn new(
        preferred_serialization_version: SerializationMagic,
        deserialization_class_loader: Arc<dyn ClassLoader>,
        whitelist: Arc<dyn ClassWhitelist>,
        encoding_whitelist: Arc<dyn EncodingWhitelist>,
        use_case: UseCase,
    ) -> Self {
        Self {
            preferred_serialization_version,
            encoding: None,
            deserialization_class_loader,
            whitelist,
            encoding_whitelist,
            properties: Arc::new(BTreeMap::new()),
            object_references_enabled: true,
            carpenter_enabled: true,
            lenient_carpenter_enabled: false,
            use_case,
        }
    }

    pub fn preferred_serialization_version(&self) -> SerializationMagic {
        self.preferred_serialization_version
    }

    pub fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    pub fn deserialization_class_loader(&self) -> &Arc<dyn ClassLoader> {
        &self.deserialization_class_loader
    }

    pub fn whitelist(&self) -> &Arc<dyn ClassWhitelist> {
        &self.whitelist
    }

    pub fn encoding_whitelist(&self) -> &Arc<dyn EncodingWhitelist> {
        &self.encoding_whitelist
    }

    pub fn properties(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    pub fn object_references_enabled(&self) -> bool {
        self.object_references_enabled
    }

    pub fn carpenter_enabled(&self) -> bool {
        self.carpenter_enabled
    }

    pub fn lenient_carpenter_enabled(&self) -> bool {
        self.lenient_carpenter_enabled
    }

    pub fn use_case(&self) -> UseCase {
        self.use_case
    }

    /// Copy with `properties[key] = value`, replacing any previous value
    pub fn with_property(&self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.properties).insert(key.into(), value);
        next
    }

    /// Copy that serializes repeated objects as separate trees
    pub fn without_references(&self) -> Self {
        Self {
            object_references_enabled: false,
            ..self.clone()
        }
    }

    /// Copy whose carpenter tolerates unmapped interface methods
    pub fn with_lenient_carpenter(&self) -> Self {
        Self {
            lenient_carpenter_enabled: true,
            ..self.clone()
        }
    }

    /// Copy that refuses to synthesize types for unknown schemas
    pub fn without_carpenter(&self) -> Self {
        Self {
            carpenter_enabled: false,
            ..self.clone()
        }
    }

    pub fn with_class_loader(&self, loader: Arc<dyn ClassLoader>) -> Self {
        Self {
            deserialization_class_loader: loader,
            ..self.clone()
        }
    }

    /// Copy whose class loader resolves types from the given attachments.
    ///
    /// Every hash must be present in `store`; otherwise the call fails with
    /// [`SerializationError::MissingAttachments`] naming the absent hashes in
    /// request order. The current class loader becomes the parent of the new one.
    pub fn with_attachments_class_loader(
        &self,
        store: &dyn AttachmentStore,
        attachment_ids: &[AttachmentId],
    ) -> SerializationResult<Self> {
        if attachment_ids.is_empty() {
            return Ok(self.clone());
        }

        let mut missing = Vec::new();
        let mut attachments = Vec::with_capacity(attachment_ids.len());
        for id in attachment_ids {
            match store.open_attachment(id) {
                Some(attachment) => attachments.push(attachment),
                None => missing.push(*id),
            }
        }

        if !missing.is_empty() {
            debug!(
                requested = attachment_ids.len(),
                missing = missing.len(),
                "cannot build attachments class loader"
            );
            return Err(SerializationError::MissingAttachments(missing));
        }

        let loader = store.class_loader(&attachments, self.deserialization_class_loader.clone());
        Ok(self.with_class_loader(loader))
    }

    /// Copy whose whitelist additionally accepts `ty`
    pub fn with_whitelisted(&self, ty: TypeDescriptor) -> Self {
        Self {
            whitelist: Arc::new(ExtendedWhitelist::new(self.whitelist.clone(), ty)),
            ..self.clone()
        }
    }

    pub fn with_encoding(&self, encoding: Option<Encoding>) -> Self {
        Self {
            encoding,
            ..self.clone()
        }
    }

    pub fn with_encoding_whitelist(&self, encoding_whitelist: Arc<dyn EncodingWhitelist>) -> Self {
        Self {
            encoding_whitelist,
            ..self.clone()
        }
    }

    pub fn with_preferred_serialization_version(&self, magic: SerializationMagic) -> Self {
        Self {
            preferred_serialization_version: magic,
            ..self.clone()
        }
    }

    /// Whether both contexts hold identical values and share the same policy objects
    pub fn same_as(&self, other: &Self) -> bool {
        self.preferred_serialization_version == other.preferred_serialization_version
            && self.encoding == other.encoding
            && Arc::ptr_eq(&self.deserialization_class_loader, &other.deserialization_class_loader)
            && Arc::ptr_eq(&self.whitelist, &other.whitelist)
            && Arc::ptr_eq(&self.encoding_whitelist, &other.encoding_whitelist)
            && self.properties == other.properties
            && self.object_references_enabled == other.object_references_enabled
            && self.carpenter_enabled == other.carpenter_enabled
            && self.lenient_carpenter_enabled == other.lenient_carpenter_enabled
            && self.use_case == other.use_case
    }
}
