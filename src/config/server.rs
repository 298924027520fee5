use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Object bucket holding uploaded game files.
    pub bucket: String,
    /// Public base URL for external access (e.g., "https://games.example.com").
    /// Used when building play/thumbnail URLs. If not set, URLs are relative.
    pub public_base_url: Option<String>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("gamedock.db")
    }

    #[must_use]
    pub fn blob_storage(&self) -> crate::blob::BlobStorage {
        crate::blob::BlobStorage::new(&self.data_dir, &self.bucket)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            bucket: "scratch-games".to_string(),
            public_base_url: None,
        }
    }
}
