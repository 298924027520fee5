mod auth;
mod categories;
pub mod dto;
mod games;
mod portal;
pub mod response;
mod router;
mod storage;
mod students;

pub use auth::auth_router;
pub use categories::categories_router;
pub use games::games_router;
pub use portal::portal_router;
pub use router::{AppState, create_router};
pub use storage::storage_router;
pub use students::students_router;
