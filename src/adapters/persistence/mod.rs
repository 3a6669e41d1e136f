//! Postgres implementations of the repository traits.

use sqlx::PgPool;

pub mod content;
pub mod plan;
pub mod subscription;
pub mod usage;
pub mod user;

/// One pool-holding struct implements every repository trait; the use-case
/// layer sees it only as trait objects.
#[derive(Clone)]
pub struct PostgresPersistence {
    pub pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
