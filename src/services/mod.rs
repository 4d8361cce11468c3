//! Business logic services

pub mod circulation;
pub mod holds;
pub mod notifications;
pub mod scheduler;

use std::sync::Arc;

use crate::{
    config::{CirculationConfig, EmailConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub circulation: circulation::CirculationService,
    pub holds: holds::HoldsService,
    pub scheduler: scheduler::SchedulerService,
    pub notifications: notifications::NotificationDispatcher,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        circulation_config: CirculationConfig,
        email_config: EmailConfig,
    ) -> Self {
        let transport = Arc::new(notifications::EmailTransport::new(email_config));
        let notifications =
            notifications::NotificationDispatcher::new(transport, repository.clone());
        let holds = holds::HoldsService::new(
            repository.clone(),
            notifications.clone(),
            circulation_config.clone(),
        );

        Self {
            circulation: circulation::CirculationService::new(
                repository.clone(),
                notifications.clone(),
                holds.clone(),
                circulation_config.clone(),
            ),
            scheduler: scheduler::SchedulerService::new(
                repository.clone(),
                notifications.clone(),
                circulation_config,
            ),
            holds,
            notifications,
            repository,
        }
    }
}
