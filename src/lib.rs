//! # Gamedock
//!
//! A browser-game portal backend, usable both as a standalone binary and as a
//! library. Games are uploaded as single HTML files or zip bundles, unpacked
//! into an object bucket, and served straight to the browser; the portal
//! tracks categories, likes, comments, play history, and leaderboards.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use gamedock::blob::BlobStorage;
//! use gamedock::server::{AppState, create_router};
//! use gamedock::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/gamedock.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//!     blobs: BlobStorage::new(&PathBuf::from("./data"), "scratch-games"),
//!     public_base_url: None,
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```

pub mod auth;
pub mod blob;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod ingest;
pub mod server;
pub mod store;
pub mod types;
