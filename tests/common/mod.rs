use std::sync::Arc;

use tempfile::TempDir;

use gamedock::blob::BlobStorage;
use gamedock::bootstrap::ensure_seed_data;
use gamedock::server::{AppState, create_router};
use gamedock::store::{SqliteStore, Store};

/// An in-process server on an ephemeral port, with the seed data (QUIZ and
/// TYPING categories, admin/student accounts) already in place.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    _temp_dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().unwrap();

        let store = SqliteStore::new(temp_dir.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        ensure_seed_data(&store).unwrap();

        let blobs = BlobStorage::new(temp_dir.path(), "scratch-games");
        blobs.ensure_bucket().await.unwrap();

        let state = Arc::new(AppState {
            store: Arc::new(store),
            blobs,
            public_base_url: None,
        });
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            _temp_dir: temp_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}
