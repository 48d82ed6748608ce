//! Shared application state handed to every handler and middleware.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::{Database, Page};
use crate::services::audit::AuditService;
use crate::services::buckets::BucketService;
use crate::services::calendar::CalendarService;
use crate::services::impersonation::ImpersonationService;
use crate::services::notifications::{NotificationService, Notifier};
use crate::services::organizations::OrganizationService;
use crate::services::push::{ExpoPushSender, NoopPushSender, PushSender};
use crate::services::realtime::RealtimeHub;
use crate::services::sessions::SessionService;
use crate::services::tasks::TaskService;
use crate::services::uploads::{HttpImageHost, ImageHost, UploadService};
use crate::services::users::UserService;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub notifier: Notifier,
    pub image_host: Option<Arc<dyn ImageHost>>,
}

impl AppState {
    /// Wire up push delivery and image hosting from configuration.
    pub fn build(db: Database, config: AppConfig) -> anyhow::Result<Self> {
        let push: Arc<dyn PushSender> = if config.notifications.push_enabled {
            Arc::new(ExpoPushSender::new(&config.notifications)?)
        } else {
            Arc::new(NoopPushSender)
        };
        let image_host = HttpImageHost::from_config(&config.uploads)?
            .map(|host| Arc::new(host) as Arc<dyn ImageHost>);

        Ok(Self::with_parts(db, config, push, image_host))
    }

    pub fn with_parts(
        db: Database,
        config: AppConfig,
        push: Arc<dyn PushSender>,
        image_host: Option<Arc<dyn ImageHost>>,
    ) -> Self {
        let hub = RealtimeHub::new(config.notifications.realtime_buffer);
        let notifier = Notifier::new(db.pool().clone(), hub, push);
        Self {
            db,
            config: Arc::new(config),
            notifier,
            image_host,
        }
    }

    /// Clamp client pagination to the configured limits.
    pub fn page(&self, page: Option<u32>, limit: Option<u32>) -> Page {
        Page::resolve(page, limit, self.config.api.default_page_size, self.config.api.max_page_size)
    }

    pub fn sessions(&self) -> SessionService {
        SessionService::new(self.db.pool().clone(), Arc::clone(&self.config))
    }

    pub fn impersonation(&self) -> ImpersonationService {
        ImpersonationService::new(self.db.pool().clone(), Arc::clone(&self.config))
    }

    pub fn organizations(&self) -> OrganizationService {
        OrganizationService::new(self.db.pool().clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.db.pool().clone())
    }

    pub fn buckets(&self) -> BucketService {
        BucketService::new(self.db.pool().clone())
    }

    pub fn tasks(&self) -> TaskService {
        TaskService::new(self.db.pool().clone(), self.notifier.clone())
    }

    pub fn notifications(&self) -> NotificationService {
        NotificationService::new(self.db.pool().clone())
    }

    pub fn audit(&self) -> AuditService {
        AuditService::new(self.db.pool().clone())
    }

    pub fn calendar(&self) -> CalendarService {
        CalendarService::new(self.db.pool().clone())
    }

    pub fn uploads(&self) -> UploadService {
        UploadService::new(self.image_host.clone(), self.config.uploads.max_upload_bytes)
    }
}
