// Causality Serialization
//
// Context propagation and policy layer in front of the platform's binary
// serialization codecs. Decides which configuration governs each
// serialize/deserialize call and makes it available to nested calls.

// Error Handling
// Serialization error kinds and their codes in the Causality error framework
pub mod error;

// Value Types
// Use cases, format headers, encodings and type/attachment identifiers
pub mod use_case;
pub mod encoding;
pub mod types;

// Policies
// Whitelist, class loader and attachment store interfaces carried by contexts
pub mod policy;

// Serialization Context
// The immutable bundle of parameters governing one operation
pub mod context;

// Ambient State
// Per-thread current factory and context with scoped restoration
pub mod ambient;

// Factory and Schemes
// The codec boundary and the header-dispatching registry factory
pub mod factory;
pub mod scheme;

// Environment
// Process-wide default factory and per-use-case contexts
pub mod environment;

// Convenience API
// Typed wrappers resolving default factory and context
pub mod bytes;
pub mod api;

// Configuration
// TOML-driven per-use-case context settings
pub mod config;

// Logging
pub mod logging;

// Test doubles
pub mod testing;

// Re-export important types for easier access
pub use ambient::{as_current, current_context, current_factory, with_current_context};
pub use api::{deserialize, deserialize_with_compatible_context, serialize};
pub use bytes::SerializedBytes;
pub use config::{ContextConfig, ContextPolicies, SerializationConfig};
pub use context::SerializationContext;
pub use encoding::{Encoding, SerializationMagic};
pub use environment::{SerializationEnvironment, SerializationEnvironmentBuilder};
pub use error::{SerializationError, SerializationResult};
pub use factory::{default_context, default_factory, ObjectWithCompatibleContext, SerializationFactory};
pub use policy::{Attachment, AttachmentStore, ClassLoader, ClassWhitelist, EncodingWhitelist};
pub use scheme::{SchemeRegistryFactory, SerializationScheme};
pub use types::{AttachmentId, TypeDescriptor};
pub use use_case::UseCase;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
