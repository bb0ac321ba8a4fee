//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use plansync_common::dedupe::DedupeGuard;
use plansync_core::{
    AuditLog, PollingService, ProjectRepository, ProvisioningWorkflow, Reconciler, SheetService,
    WbsRepository,
};
use plansync_domain::{Config, Result};
use plansync_infra::{
    DbManager, PollScheduler, PollSchedulerConfig, RemoteSheetClient, SqliteAuditLog,
    SqliteProjectRepository, SqliteWbsRepository,
};

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub projects: Arc<dyn ProjectRepository>,
    pub audit: Arc<dyn AuditLog>,
    pub reconciler: Arc<Reconciler>,
    pub provisioning: Arc<ProvisioningWorkflow>,
    pub polling: Arc<PollingService>,
    pub scheduler: Arc<PollScheduler>,
}

impl AppContext {
    /// Wire repositories, the remote client, and the core services from
    /// configuration. The database schema is applied here.
    pub fn new(config: Config) -> Result<Arc<Self>> {
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let dedupe = Arc::new(DedupeGuard::default());
        let sheets: Arc<dyn SheetService> =
            Arc::new(RemoteSheetClient::new(&config.remote, dedupe)?);

        Self::with_sheet_service(config, db, sheets)
    }

    /// Wiring variant that accepts any sheet-service implementation.
    /// Tests inject fakes through this path.
    pub fn with_sheet_service(
        config: Config,
        db: Arc<DbManager>,
        sheets: Arc<dyn SheetService>,
    ) -> Result<Arc<Self>> {
        let wbs: Arc<dyn WbsRepository> = Arc::new(SqliteWbsRepository::new(Arc::clone(&db)));
        let projects: Arc<dyn ProjectRepository> =
            Arc::new(SqliteProjectRepository::new(Arc::clone(&db)));
        let audit: Arc<dyn AuditLog> = Arc::new(SqliteAuditLog::new(Arc::clone(&db)));

        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&wbs),
            Arc::clone(&projects),
            Arc::clone(&sheets),
            Arc::clone(&audit),
        ));
        let provisioning = Arc::new(ProvisioningWorkflow::new(
            Arc::clone(&sheets),
            Arc::clone(&projects),
            Arc::clone(&audit),
            config.provisioning.clone(),
        ));
        let polling = Arc::new(PollingService::new(
            Arc::clone(&projects),
            Arc::clone(&sheets),
            Arc::clone(&provisioning),
            Arc::clone(&reconciler),
            config.provisioning.clone(),
        ));
        let scheduler = Arc::new(PollScheduler::new(
            Arc::clone(&polling),
            PollSchedulerConfig {
                interval: Duration::from_secs(config.polling.interval_seconds.max(1)),
                enabled: config.polling.enabled,
            },
        ));

        Ok(Arc::new(Self {
            config,
            db,
            projects,
            audit,
            reconciler,
            provisioning,
            polling,
            scheduler,
        }))
    }
}
