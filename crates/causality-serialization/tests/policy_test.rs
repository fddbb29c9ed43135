//! Whitelist, encoding and attachment policies enforced end to end through
//! the registry factory and the reference scheme

use std::sync::Arc;

use causality_serialization::testing::{
    test_context, AcceptedEncodings, AllowNoneWhitelist, BincodeScheme, InMemoryAttachment, InMemoryAttachmentStore,
    StaticClassLoader, TypeSetWhitelist,
};
use causality_serialization::{
    api, AttachmentId, ClassLoader, Encoding, SchemeRegistryFactory, SerializationContext, SerializationError,
    SerializationFactory, SerializationMagic, SerializedBytes, TypeDescriptor, UseCase,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Transfer {
    from: String,
    to: String,
    amount: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ContractState {
    owner: String,
}

fn transfer() -> Transfer {
    Transfer {
        from: "alice".to_string(),
        to: "bob".to_string(),
        amount: 250,
    }
}

fn factory() -> Arc<dyn SerializationFactory> {
    let factory = SchemeRegistryFactory::new();
    factory
        .register_scheme(Arc::new(
            BincodeScheme::new(SerializationMagic::AMQP_V1)
                .register::<Transfer>()
                .register::<ContractState>(),
        ))
        .unwrap();
    factory
}

fn transfer_loader() -> Arc<StaticClassLoader> {
    Arc::new(StaticClassLoader::with_std_types().with_type::<Transfer>())
}

/// Permissive context whose loader knows `Transfer` but not `ContractState`
fn transfer_context() -> SerializationContext {
    test_context(UseCase::P2p).with_class_loader(transfer_loader())
}

#[test]
fn test_whitelist_rejects_unlisted_types() {
    let factory = factory();
    let strict = SerializationContext::new(
        SerializationMagic::AMQP_V1,
        transfer_loader(),
        Arc::new(AllowNoneWhitelist),
        Arc::new(AcceptedEncodings::all()),
        UseCase::P2p,
    );

    let err = api::serialize(&transfer(), Some(&factory), Some(&strict)).unwrap_err();
    assert_eq!(err, SerializationError::NotWhitelisted(std::any::type_name::<Transfer>().to_string()));

    // extending the whitelist admits exactly the named type
    let extended = strict.with_whitelisted(TypeDescriptor::of::<Transfer>());
    let bytes = api::serialize(&transfer(), Some(&factory), Some(&extended)).unwrap();
    assert_eq!(bytes.deserialize(Some(&factory), Some(&extended)).unwrap(), transfer());

    let other = ContractState {
        owner: "carol".to_string(),
    };
    assert!(matches!(
        api::serialize(&other, Some(&factory), Some(&extended)),
        Err(SerializationError::NotWhitelisted(_))
    ));

    // the original context is untouched
    assert!(matches!(
        api::serialize(&transfer(), Some(&factory), Some(&strict)),
        Err(SerializationError::NotWhitelisted(_))
    ));
}

#[test]
fn test_reader_whitelist_applies_on_deserialize() {
    let factory = factory();
    let writer = transfer_context();
    let reader = SerializationContext::new(
        SerializationMagic::AMQP_V1,
        transfer_loader(),
        Arc::new(TypeSetWhitelist::new().with_type::<ContractState>()),
        Arc::new(AcceptedEncodings::all()),
        UseCase::P2p,
    );

    let bytes = api::serialize(&transfer(), Some(&factory), Some(&writer)).unwrap();
    assert!(matches!(
        bytes.deserialize(Some(&factory), Some(&reader)),
        Err(SerializationError::NotWhitelisted(_))
    ));
}

#[test]
fn test_encoding_whitelist_rejects_encoded_payloads() {
    let factory = factory();
    let writer = transfer_context().with_encoding(Some(Encoding::Snappy));
    let bytes = api::serialize(&transfer(), Some(&factory), Some(&writer)).unwrap();

    let deflate_only = writer.with_encoding_whitelist(Arc::new(AcceptedEncodings::only(&[Encoding::Deflate])));
    assert_eq!(
        bytes.deserialize(Some(&factory), Some(&deflate_only)).unwrap_err(),
        SerializationError::EncodingNotAccepted(Encoding::Snappy)
    );

    let snappy = writer.with_encoding_whitelist(Arc::new(AcceptedEncodings::only(&[Encoding::Snappy])));
    assert_eq!(bytes.deserialize(Some(&factory), Some(&snappy)).unwrap(), transfer());

    // unencoded payloads pass a whitelist that accepts nothing
    let plain = api::serialize(&transfer(), Some(&factory), Some(&transfer_context())).unwrap();
    let none = writer.with_encoding_whitelist(Arc::new(AcceptedEncodings::none()));
    assert_eq!(plain.deserialize(Some(&factory), Some(&none)).unwrap(), transfer());
}

#[test]
fn test_attachment_class_loader_resolves_attachment_types() {
    let factory = factory();
    let store = InMemoryAttachmentStore::new();
    let contract = AttachmentId::new([0x11; 32]);
    store.insert(InMemoryAttachment::new(contract).with_type::<ContractState>());

    let base = transfer_context();
    let with_contract = base.with_attachments_class_loader(&store, &[contract]).unwrap();
    let name = std::any::type_name::<ContractState>();
    assert_eq!(
        with_contract.deserialization_class_loader().resolve(name),
        Some(TypeDescriptor::of::<ContractState>())
    );
    assert_eq!(base.deserialization_class_loader().resolve(name), None);

    let state = ContractState {
        owner: "carol".to_string(),
    };
    let bytes: SerializedBytes<ContractState> = api::serialize(&state, Some(&factory), Some(&base)).unwrap();
    assert_eq!(bytes.deserialize(Some(&factory), Some(&with_contract)).unwrap(), state);

    // without the attachment the type cannot be materialized
    assert_eq!(
        bytes.deserialize(Some(&factory), Some(&base)).unwrap_err(),
        SerializationError::UnsupportedType(name.to_string())
    );
}

#[test]
fn test_missing_attachments_are_all_reported() {
    let store = InMemoryAttachmentStore::new();
    let present = AttachmentId::new([0x01; 32]);
    let missing_a = AttachmentId::new([0x02; 32]);
    let missing_b = AttachmentId::new([0x03; 32]);
    store.insert(InMemoryAttachment::new(present));

    let err = transfer_context()
        .with_attachments_class_loader(&store, &[missing_a, present, missing_b])
        .unwrap_err();
    assert_eq!(err, SerializationError::MissingAttachments(vec![missing_a, missing_b]));
}

#[test]
fn test_compatible_context_carries_header_read() {
    let factory = factory();
    let legacy = SerializationMagic::versioned(0, 9);
    let context = transfer_context().with_preferred_serialization_version(legacy);

    let bytes = api::serialize(&transfer(), Some(&factory), Some(&transfer_context())).unwrap();
    let result = api::deserialize_with_compatible_context::<Transfer>(bytes.as_bytes(), Some(&factory), Some(&context))
        .unwrap();

    assert_eq!(result.object, transfer());
    assert_eq!(result.context.preferred_serialization_version(), SerializationMagic::AMQP_V1);
    assert_eq!(context.preferred_serialization_version(), legacy);
}
