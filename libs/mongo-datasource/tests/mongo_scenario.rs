//! End-to-end checks against a real MongoDB started with testcontainers
//!
//! Run with `cargo test -p mongo_datasource -- --ignored` on a host with Docker.

use mongo_datasource::mongodb::{
    ConnectionOptions, Document, LifecycleEvent, LifecycleSink, ManagerSettings, MongoClient,
    MongoConfig, MongoDbManager, get_manager, get_model,
};
use mongo_datasource::{DatasourceError, ManagerRegistry};
use mongodb::bson::doc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_utils::{TestDataBuilder, TestMongo};
use tokio::net::TcpListener;

/// Keeps every lifecycle event in arrival order
#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl LifecycleSink for RecordingSink {
    fn record(&self, _manager: &str, event: LifecycleEvent, _detail: &str) {
        self.events.lock().unwrap().push(event);
    }
}

fn short_timeouts() -> ConnectionOptions {
    ConnectionOptions {
        server_selection_timeout_secs: Some(1),
        connect_timeout_secs: Some(1),
        ..Default::default()
    }
}

async fn registered_manager(mongo: &TestMongo, test: &str) -> (ManagerRegistry, String) {
    let names = TestDataBuilder::from_test_name(test);
    let manager_name = names.manager_name("primary");
    let url = mongo.url_for(&names.database("scenario"));

    let manager = MongoDbManager::new(ManagerSettings::named(&manager_name, MongoConfig::new(url)))
        .await
        .expect("manager should build");

    let registry = ManagerRegistry::new(&manager_name);
    registry
        .register(&manager_name, Arc::new(manager))
        .expect("name should be free");

    (registry, manager_name)
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_insert_count_delete_round_trip() {
    let mongo = TestMongo::new().await;
    let (registry, _) = registered_manager(&mongo, "round_trip").await;

    let manager = get_manager::<MongoClient, _>(&registry, None).unwrap();
    manager.connect().await.unwrap();

    let movies = get_model::<MongoClient, _>(&registry, "movies").unwrap();
    let before = movies.count_documents(doc! {}).await.unwrap();

    movies.insert_one(doc! { "title": "X" }).await.unwrap();
    assert_eq!(movies.count_documents(doc! {}).await.unwrap(), before + 1);

    movies.delete_one(doc! { "title": "X" }).await.unwrap();
    assert_eq!(movies.count_documents(doc! {}).await.unwrap(), before);

    manager.close_connection(false).await.unwrap();
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_cross_database_model_lands_in_named_database() {
    let mongo = TestMongo::new().await;
    let (registry, manager_name) = registered_manager(&mongo, "cross_database").await;
    let manager = get_manager::<MongoClient, _>(&registry, Some(&manager_name)).unwrap();
    manager.connect().await.unwrap();

    let other_db = TestDataBuilder::from_test_name("cross_database").database("other");
    let model = manager.model(&format!("{}.movies", other_db)).unwrap();
    model.insert_one(doc! { "title": "Y" }).await.unwrap();

    let direct = mongo
        .client()
        .database(&other_db)
        .collection::<Document>("movies");
    assert_eq!(direct.count_documents(doc! { "title": "Y" }).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_health_check_against_live_server() {
    let mongo = TestMongo::new().await;
    let (registry, _) = registered_manager(&mongo, "live_health").await;
    let manager = get_manager::<MongoClient, _>(&registry, None).unwrap();
    manager.connect().await.unwrap();

    assert!(manager.is_connected().await);

    let result = manager.health_check().await;
    assert!(result.healthy);
    assert!(result.details.is_ready);
    assert!(result.details.ping_response.is_some());
}

#[tokio::test]
async fn test_unreachable_server_is_unhealthy_not_an_error() {
    let config = MongoConfig::new("mongodb://127.0.0.1:9/unreachable").with_options(short_timeouts());
    let manager = MongoDbManager::new(config).await.unwrap();

    assert!(!manager.is_connected().await);

    let result = manager.health_check().await;
    assert!(!result.healthy);
    assert!(result.timestamp > 0);
    assert!(result.details.error.is_some());
    assert!(manager.connect().await.is_err());
}

#[tokio::test]
async fn test_health_check_timeout_option_bounds_the_probe() {
    let config = MongoConfig::new("mongodb://127.0.0.1:9/unreachable").with_options(
        ConnectionOptions::default().with_health_check_timeout(Duration::from_millis(50)),
    );
    let manager = MongoDbManager::new(config).await.unwrap();

    let result = manager.health_check().await;
    assert!(!result.healthy);
    assert!(result.latency < 5_000);
    assert!(result.details.error.unwrap().contains("within 50ms"));
}

#[tokio::test]
async fn test_missing_manager_lookup() {
    let registry = ManagerRegistry::default();
    let err = get_manager::<MongoClient, _>(&registry, Some("missing")).unwrap_err();
    assert!(matches!(err, DatasourceError::ManagerNotFound { ref manager } if manager == "missing"));
}

#[tokio::test]
async fn test_building_a_manager_opens_no_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let sink = Arc::new(RecordingSink::default());

    let config = MongoConfig::new(format!("mongodb://{}/lazy?directConnection=true", address))
        .with_options(short_timeouts());
    let manager = Arc::new(
        MongoDbManager::with_sink(ManagerSettings::named("lazy", config), sink.clone())
            .await
            .unwrap(),
    );
    assert_eq!(manager.default_database(), "lazy");

    let early = tokio::time::timeout(Duration::from_millis(500), listener.accept()).await;
    assert!(early.is_err(), "a socket was opened before connect()");
    assert!(sink.events().is_empty());
    assert!(!manager.connection().is_started());

    let connecting = Arc::clone(&manager);
    let attempt = tokio::spawn(async move { connecting.connect().await });

    let accepted = tokio::time::timeout(Duration::from_secs(5), listener.accept()).await;
    assert!(accepted.is_ok(), "connect() never reached the server");
    assert!(manager.connection().is_started());

    // The listener never answers the handshake.
    assert!(attempt.await.unwrap().is_err());
    assert!(sink.events().contains(&LifecycleEvent::Connecting));
    manager.close_connection(true).await.unwrap();
}

#[tokio::test]
async fn test_driver_events_reach_the_sink() {
    let sink = Arc::new(RecordingSink::default());
    let config = MongoConfig::new("mongodb://127.0.0.1:9/unreachable").with_options(short_timeouts());
    let manager = MongoDbManager::with_sink(ManagerSettings::named("observed", config), sink.clone())
        .await
        .unwrap();

    assert!(manager.connect().await.is_err());
    assert!(!manager.health_check().await.healthy);
    manager.close_connection(true).await.unwrap();

    // Driver events are delivered from a background task.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let events = sink.events();
    for expected in [
        LifecycleEvent::Connecting,
        LifecycleEvent::ServerOpening,
        LifecycleEvent::Error,
        LifecycleEvent::ServerClosed,
        LifecycleEvent::Closed,
    ] {
        assert!(events.contains(&expected), "{} missing from {:?}", expected, events);
    }
}
