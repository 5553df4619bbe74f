use std::sync::Arc;

use adapter::notifier::{MailNotifier, NoopNotifier};
use adapter::repository::booking::BookingRepositoryImpl;
use adapter::repository::facility::FacilityRepositoryImpl;
use adapter::{database::ConnectionPool, repository::health::HealthCheckRepositoryImpl};
use kernel::model::policy::BookingPolicy;
use kernel::notifier::NotificationSink;
use kernel::repository::booking::BookingRepository;
use kernel::repository::facility::FacilityRepository;
use kernel::repository::health::HealthCheckRepository;
use shared::config::AppConfig;

#[derive(Clone)]
pub struct AppRegistry {
    health_check_repository: Arc<dyn HealthCheckRepository>,
    facility_repository: Arc<dyn FacilityRepository>,
    booking_repository: Arc<dyn BookingRepository>,
    notification_sink: Arc<dyn NotificationSink>,
    booking_policy: BookingPolicy,
}

impl AppRegistry {
    pub fn new(pool: ConnectionPool, app_config: AppConfig) -> Self {
        let health_check_repository = Arc::new(HealthCheckRepositoryImpl::new(pool.clone()));
        let facility_repository = Arc::new(FacilityRepositoryImpl::new(pool.clone()));
        let booking_repository = Arc::new(BookingRepositoryImpl::new(pool.clone()));
        let notification_sink: Arc<dyn NotificationSink> = if app_config.mail.enabled {
            Arc::new(MailNotifier::new(app_config.mail))
        } else {
            Arc::new(NoopNotifier)
        };
        let booking_policy = BookingPolicy {
            min_lead_time_hours: app_config.booking.min_lead_time_hours,
            max_duration_hours: app_config.booking.max_duration_hours,
            buffer_minutes: app_config.booking.buffer_minutes,
        };
        Self {
            health_check_repository,
            facility_repository,
            booking_repository,
            notification_sink,
            booking_policy,
        }
    }

    pub fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    pub fn facility_repository(&self) -> Arc<dyn FacilityRepository> {
        self.facility_repository.clone()
    }

    pub fn booking_repository(&self) -> Arc<dyn BookingRepository> {
        self.booking_repository.clone()
    }

    pub fn notification_sink(&self) -> Arc<dyn NotificationSink> {
        self.notification_sink.clone()
    }

    pub fn booking_policy(&self) -> BookingPolicy {
        self.booking_policy
    }
}
