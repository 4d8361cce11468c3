//! Repository layer for database operations

pub mod events;
pub mod fines;
pub mod holds;
pub mod items;
pub mod loans;
pub mod renewals;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub items: items::ItemsRepository,
    pub users: users::UsersRepository,
    pub loans: loans::LoansRepository,
    pub holds: holds::HoldsRepository,
    pub fines: fines::FinesRepository,
    pub renewals: renewals::RenewalsRepository,
    pub events: events::EventsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            items: items::ItemsRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            holds: holds::HoldsRepository::new(pool.clone()),
            fines: fines::FinesRepository::new(pool.clone()),
            renewals: renewals::RenewalsRepository::new(pool.clone()),
            events: events::EventsRepository::new(pool.clone()),
            pool,
        }
    }
}
