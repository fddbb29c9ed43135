//! Serialization configuration
//!
//! Per-use-case context settings loaded from TOML. Policy objects (class
//! loader, whitelists) are code, not configuration, and are supplied
//! separately through [`ContextPolicies`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::SerializationContext;
use crate::encoding::{Encoding, SerializationMagic};
use crate::environment::SerializationEnvironment;
use crate::error::{SerializationError, SerializationResult};
use crate::factory::SerializationFactory;
use crate::policy::{ClassLoader, ClassWhitelist, EncodingWhitelist};
use crate::use_case::UseCase;

/// Settings for one use case's default context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Compression applied when serializing
    pub encoding: Option<Encoding>,

    /// Preserve object identity on the wire
    pub object_references: bool,

    /// Allow synthesis of types for unknown schemas
    pub carpenter: bool,

    /// Tolerate unmapped interface methods during synthesis
    pub lenient_carpenter: bool,

    /// Use-case-specific extension data
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            encoding: None,
            object_references: true,
            carpenter: true,
            lenient_carpenter: false,
            properties: BTreeMap::new(),
        }
    }
}

impl ContextConfig {
    /// Derive a context from `base` with these settings applied
    pub fn apply(&self, base: &SerializationContext) -> SerializationContext {
        let mut context = base.with_encoding(self.encoding);
        if !self.object_references {
            context = context.without_references();
        }
        if !self.carpenter {
            context = context.without_carpenter();
        }
        if self.lenient_carpenter {
            context = context.with_lenient_carpenter();
        }
        for (key, value) in &self.properties {
            context = context.with_property(key.clone(), value.clone());
        }
        context
    }
}

/// Context settings for every use case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationConfig {
    pub p2p: ContextConfig,
    pub rpc_server: ContextConfig,
    pub rpc_client: ContextConfig,
    pub storage: ContextConfig,
    pub testing: ContextConfig,
}

impl SerializationConfig {
    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> SerializationResult<Self> {
        toml::from_str(s).map_err(|e| SerializationError::InvalidConfig(e.to_string()))
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> SerializationResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SerializationError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn for_use_case(&self, use_case: UseCase) -> &ContextConfig {
        match use_case {
            UseCase::P2p => &self.p2p,
            UseCase::RpcServer => &self.rpc_server,
            UseCase::RpcClient => &self.rpc_client,
            UseCase::Storage => &self.storage,
            UseCase::Testing => &self.testing,
        }
    }

    /// Build the default context for `use_case`
    pub fn build_context(&self, use_case: UseCase, policies: &ContextPolicies) -> SerializationContext {
        self.for_use_case(use_case).apply(&policies.base_context(use_case))
    }

    /// Build an environment with a context in every slot
    pub fn build_environment(
        &self,
        factory: Arc<dyn SerializationFactory>,
        policies: &ContextPolicies,
    ) -> SerializationEnvironment {
        let mut builder = SerializationEnvironment::builder(factory, self.build_context(UseCase::P2p, policies));
        for use_case in UseCase::ALL {
            builder = builder.context(use_case, self.build_context(use_case, policies));
        }
        builder.build()
    }
}

/// Policy objects shared by every context built from configuration
#[derive(Debug, Clone)]
pub struct ContextPolicies {
    pub preferred_serialization_version: SerializationMagic,
    pub class_loader: Arc<dyn ClassLoader>,
    pub whitelist: Arc<dyn ClassWhitelist>,
    pub encoding_whitelist: Arc<dyn EncodingWhitelist>,
}

impl ContextPolicies {
    fn base_context(&self, use_case: UseCase) -> SerializationContext {
        SerializationContext::new(
            self.preferred_serialization_version,
            self.class_loader.clone(),
            self.whitelist.clone(),
            self.encoding_whitelist.clone(),
            use_case,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AcceptedEncodings, AllowAllWhitelist, RecordingFactory, StaticClassLoader};
    use serde_json::json;

    fn policies() -> ContextPolicies {
        ContextPolicies {
            preferred_serialization_version: SerializationMagic::AMQP_V1,
            class_loader: Arc::new(StaticClassLoader::new()),
            whitelist: Arc::new(AllowAllWhitelist),
            encoding_whitelist: Arc::new(AcceptedEncodings::all()),
        }
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = SerializationConfig::from_toml_str("").unwrap();
        assert_eq!(config, SerializationConfig::default());
        assert!(config.p2p.object_references);
        assert!(config.storage.carpenter);
    }

    #[test]
    fn test_sections_map_onto_contexts() {
        let config = SerializationConfig::from_toml_str(
            r#"
            [p2p]
            encoding = "snappy"

            [storage]
            object_references = false
            lenient_carpenter = true

            [rpc_client]
            carpenter = false

            [rpc_client.properties]
            client_version = 4
            "#,
        )
        .unwrap();

        let policies = policies();
        let p2p = config.build_context(UseCase::P2p, &policies);
        assert_eq!(p2p.encoding(), Some(Encoding::Snappy));
        assert!(p2p.object_references_enabled());

        let storage = config.build_context(UseCase::Storage, &policies);
        assert_eq!(storage.use_case(), UseCase::Storage);
        assert!(!storage.object_references_enabled());
        assert!(storage.lenient_carpenter_enabled());

        let client = config.build_context(UseCase::RpcClient, &policies);
        assert!(!client.carpenter_enabled());
        assert_eq!(client.property("client_version"), Some(&json!(4)));
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = SerializationConfig::from_toml_str("[p2p]\nencoding = \"lz4\"").unwrap_err();
        assert!(matches!(err, SerializationError::InvalidConfig(_)));
    }

    #[test]
    fn test_build_environment_fills_every_slot() {
        let env = SerializationConfig::default()
            .build_environment(Arc::new(RecordingFactory::default()), &policies());

        for use_case in UseCase::ALL {
            assert_eq!(env.context_for(use_case).unwrap().use_case(), use_case);
        }
    }
}
