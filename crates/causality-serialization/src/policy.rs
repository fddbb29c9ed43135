// Policy and resolution interfaces carried by a serialization context
//
// Concrete whitelists, class loaders and attachment stores are supplied by
// the embedding node; this layer stores and forwards them only.

use std::fmt::Debug;
use std::sync::Arc;

use crate::encoding::Encoding;
use crate::types::{AttachmentId, TypeDescriptor};

/// Security policy deciding which types may cross the wire
pub trait ClassWhitelist: Debug + Send + Sync {
    /// Whether `ty` may be serialized or deserialized
    fn has_listed(&self, ty: &TypeDescriptor) -> bool;
}

/// Security policy deciding which encodings are acceptable on deserialize
pub trait EncodingWhitelist: Debug + Send + Sync {
    fn accept_encoding(&self, encoding: Encoding) -> bool;
}

/// Resolves type names found in a payload to local types
pub trait ClassLoader: Debug + Send + Sync {
    fn resolve(&self, type_name: &str) -> Option<TypeDescriptor>;
}

/// Content-addressed bundle of code and data
pub trait Attachment: Debug + Send + Sync {
    fn id(&self) -> AttachmentId;
}

/// External attachment storage
pub trait AttachmentStore: Send + Sync {
    /// Open the attachment with the given hash, if it is present locally
    fn open_attachment(&self, id: &AttachmentId) -> Option<Arc<dyn Attachment>>;

    /// Build a class loader over `attachments`, falling back to `parent`
    fn class_loader(
        &self,
        attachments: &[Arc<dyn Attachment>],
        parent: Arc<dyn ClassLoader>,
    ) -> Arc<dyn ClassLoader>;
}

/// Whitelist that accepts one extra type on top of another whitelist.
///
/// The extra type is matched by `TypeId`; type names are not unique.
#[derive(Debug)]
pub(crate) struct ExtendedWhitelist {
    base: Arc<dyn ClassWhitelist>,
    extra: TypeDescriptor,
}

impl ExtendedWhitelist {
    pub(crate) fn new(base: Arc<dyn ClassWhitelist>, extra: TypeDescriptor) -> Self {
        Self { base, extra }
    }
}

impl ClassWhitelist for ExtendedWhitelist {
    fn has_listed(&self, ty: &TypeDescriptor) -> bool {
        self.base.has_listed(ty) || *ty == self.extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Nothing;

    impl ClassWhitelist for Nothing {
        fn has_listed(&self, _ty: &TypeDescriptor) -> bool {
            false
        }
    }

    #[test]
    fn test_extended_whitelist_adds_exactly_one_type() {
        let base: Arc<dyn ClassWhitelist> = Arc::new(Nothing);
        let extended = ExtendedWhitelist::new(base.clone(), TypeDescriptor::of::<String>());

        assert!(extended.has_listed(&TypeDescriptor::of::<String>()));
        assert!(!extended.has_listed(&TypeDescriptor::of::<u32>()));
        assert!(!base.has_listed(&TypeDescriptor::of::<String>()));
    }

    fn descriptor_of<T: 'static>(_: &T) -> TypeDescriptor {
        TypeDescriptor::of::<T>()
    }

    #[test]
    fn test_extended_whitelist_ignores_types_sharing_a_name() {
        let first = || 1u8;
        let second = || 2u8;
        let listed = descriptor_of(&first);
        let other = descriptor_of(&second);

        // two closures in one function render the same type name
        assert_eq!(listed.name(), other.name());
        assert_ne!(listed, other);

        let extended = ExtendedWhitelist::new(Arc::new(Nothing), listed);
        assert!(extended.has_listed(&listed));
        assert!(!extended.has_listed(&other));
    }
}
