//! MongoDB test infrastructure
//!
//! Provides a `TestMongo` helper that starts a MongoDB container for testing.

use mongodb::Client;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::mongo::Mongo;

/// Test MongoDB wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
///
/// # Example
///
/// ```no_run
/// use test_utils::TestMongo;
///
/// # async fn example() {
/// let mongo = TestMongo::new().await;
/// let url = mongo.url_for("movies_test");
/// // Build a manager from `url`
/// # }
/// ```
pub struct TestMongo {
    #[allow(dead_code)]
    container: ContainerAsync<Mongo>,
    client: Client,
    connection_string: String,
}

impl TestMongo {
    /// Create a new test MongoDB instance
    ///
    /// Uses the MongoDB 7 image.
    pub async fn new() -> Self {
        let container = Mongo::default()
            .with_tag("7")
            .start()
            .await
            .expect("Failed to start MongoDB container");

        let host_port = container
            .get_host_port_ipv4(27017)
            .await
            .expect("Failed to get MongoDB port");

        let connection_string = format!("mongodb://127.0.0.1:{}", host_port);

        let client = Client::with_uri_str(&connection_string)
            .await
            .expect("Failed to create MongoDB client");

        tracing::info!(port = host_port, "Test MongoDB ready (mongo:7)");

        Self {
            container,
            client,
            connection_string,
        }
    }

    /// A client independent of whatever the test builds, for assertions
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Connection string without a default database
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Connection string with `database` as the default database
    pub fn url_for(&self, database: &str) -> String {
        format!("{}/{}", self.connection_string(), database)
    }
}

// Container is automatically cleaned up when TestMongo is dropped
impl Drop for TestMongo {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test MongoDB container");
    }
}
