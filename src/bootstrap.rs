//! First-run provisioning: the object bucket and the seed rows the portal
//! expects to exist.

use tracing::{info, warn};

use crate::auth::hash_password;
use crate::blob::BlobStorage;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{GameCategory, Role, User};

/// Ensures the bucket exists with its public-read policy marker. Failure is
/// logged and swallowed so the server still comes up; uploads will surface
/// the underlying error when they actually hit the bucket.
pub async fn provision_bucket(blobs: &BlobStorage) {
    match blobs.ensure_bucket().await {
        Ok(()) => info!("Bucket ready at {}", blobs.bucket_path().display()),
        Err(e) => warn!("Bucket provisioning failed, continuing: {e}"),
    }
}

/// Idempotently seeds the default categories and accounts. Categories are
/// only created when the table is completely empty so that deactivating a
/// seed category sticks across restarts.
pub fn ensure_seed_data(store: &dyn Store) -> Result<()> {
    if store.count_categories()? == 0 {
        for (name, description, icon) in [
            ("QUIZ", "Quiz and trivia games to test your knowledge", "🧩"),
            ("TYPING", "Typing speed and accuracy games", "⌨️"),
        ] {
            store.create_category(&GameCategory {
                id: 0,
                name: name.to_string(),
                description: Some(description.to_string()),
                icon: Some(icon.to_string()),
                is_active: true,
            })?;
        }
        info!("Seeded default game categories");
    }

    seed_user(store, "admin", "admin123", Role::Admin)?;
    seed_user(store, "student", "student123", Role::Student)?;

    Ok(())
}

fn seed_user(store: &dyn Store, username: &str, password: &str, role: Role) -> Result<()> {
    if store.get_user_by_username(username)?.is_some() {
        return Ok(());
    }

    let password_hash =
        hash_password(password).map_err(|e| Error::Config(format!("seed password hash: {e}")))?;

    store.create_user(&User {
        id: 0,
        username: username.to_string(),
        password_hash,
        email: None,
        role,
        created_at: chrono::Utc::now(),
        total_score: 0,
        games_played: 0,
    })?;

    info!("Seeded {} account '{}'", role.as_str(), username);
    Ok(())
}
