//! Process-wide environment tests.
//!
//! The global handle is shared by every test in this binary, so the whole
//! install/uninstall lifecycle runs inside a single test.

use std::sync::Arc;

use causality_serialization::environment::{self, with_thread_environment};
use causality_serialization::logging::init_test_logging;
use causality_serialization::testing::{test_context, BincodeScheme, RecordingFactory};
use causality_serialization::{
    api, default_context, default_factory, SchemeRegistryFactory, SerializationEnvironment, SerializationError,
    SerializationFactory, SerializationMagic, UseCase,
};
use serde_json::json;

#[test]
fn test_global_environment_lifecycle() {
    init_test_logging();

    // nothing installed yet
    assert!(environment::uninstall().is_none());
    assert_eq!(environment::installed().unwrap_err(), SerializationError::EnvironmentNotInstalled);
    assert_eq!(default_factory().unwrap_err(), SerializationError::EnvironmentNotInstalled);
    assert_eq!(
        api::serialize(&7u64, None, None).unwrap_err(),
        SerializationError::EnvironmentNotInstalled
    );

    let factory = SchemeRegistryFactory::new();
    factory
        .register_scheme(Arc::new(BincodeScheme::new(SerializationMagic::AMQP_V1).register::<u64>()))
        .unwrap();
    let factory: Arc<dyn SerializationFactory> = factory;
    let p2p = test_context(UseCase::P2p).with_property("network", json!("main"));
    let env = SerializationEnvironment::builder(factory.clone(), p2p.clone())
        .storage_context(test_context(UseCase::Storage))
        .build();

    let installed = environment::install(env.clone()).unwrap();
    assert_eq!(
        environment::install(env).unwrap_err(),
        SerializationError::EnvironmentAlreadyInstalled
    );

    // defaults resolve to the installed factory and its P2P context
    assert!(Arc::ptr_eq(&default_factory().unwrap(), &factory));
    assert!(default_context().unwrap().same_as(&p2p));

    let bytes = api::serialize(&7u64, None, None).unwrap();
    assert_eq!(&bytes.as_bytes()[..SerializationMagic::SIZE], SerializationMagic::AMQP_V1.as_bytes());
    assert_eq!(bytes.deserialize(None, None).unwrap(), 7u64);

    // a thread override shadows the global environment
    let recording = Arc::new(RecordingFactory::default());
    let override_env = Arc::new(
        SerializationEnvironment::builder(recording.clone(), test_context(UseCase::Testing)).build(),
    );
    with_thread_environment(override_env, || {
        api::serialize(&7u64, None, None).unwrap();
    });
    assert_eq!(recording.serialize_calls(), 1);
    assert_eq!(recording.last_use_case(), Some(UseCase::Testing));

    // other threads see the global environment
    let seen_elsewhere = std::thread::spawn(|| environment::installed().map(|env| env.p2p_context().use_case()))
        .join()
        .unwrap();
    assert_eq!(seen_elsewhere, Ok(UseCase::P2p));

    let removed = environment::uninstall().unwrap();
    assert!(Arc::ptr_eq(&removed, &installed));
    assert_eq!(default_context().unwrap_err(), SerializationError::EnvironmentNotInstalled);
}
