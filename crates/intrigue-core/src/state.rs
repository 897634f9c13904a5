//! Shared application state for the axum server and the CLI.

use std::sync::Arc;

use crate::approval::ApprovalService;
use crate::config::AppConfig;
use crate::db::Database;
use crate::distribution::{DistributionPoster, SocialPoster, XApiClient};
use crate::scheduler::ScheduleRunner;
use crate::store::{
    AgentStore, AuthorStore, DistributionStore, ExecutionStore, IssueStore, ScheduleStore, SubscriberStore,
    WorkflowStore, XPostStore,
};
use crate::workflow::{
    AgentStepExecutor, HttpImageGenerator, HttpTextGenerator, ImageGenerator, TextGenerator, WorkflowOrchestrator,
};

/// Shared state accessible by all API handlers.
pub struct AppStateInner {
    pub db: Database,
    pub config: AppConfig,
    pub agent_store: AgentStore,
    pub workflow_store: WorkflowStore,
    pub schedule_store: ScheduleStore,
    pub execution_store: ExecutionStore,
    pub issue_store: IssueStore,
    pub subscriber_store: SubscriberStore,
    pub distribution_store: DistributionStore,
    pub x_post_store: XPostStore,
    pub author_store: AuthorStore,
    pub image_generator: Arc<dyn ImageGenerator>,
    pub scheduler: ScheduleRunner,
    pub poster: DistributionPoster,
    pub approvals: ApprovalService,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    /// Wire up the HTTP-backed text, image and X clients from `config`.
    pub fn new(db: Database, config: AppConfig) -> Self {
        let text: Arc<dyn TextGenerator> = Arc::new(HttpTextGenerator::new(config.text_gen.clone()));
        let images: Arc<dyn ImageGenerator> = Arc::new(HttpImageGenerator::new(config.image_gen.clone()));
        let social: Arc<dyn SocialPoster> = Arc::new(XApiClient::new(config.x.base_url.clone()));
        Self::with_services(db, config, text, images, social)
    }

    /// Same as `new`, with the external collaborators supplied by the caller.
    pub fn with_services(
        db: Database,
        config: AppConfig,
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageGenerator>,
        social: Arc<dyn SocialPoster>,
    ) -> Self {
        let steps = AgentStepExecutor::new(text, Arc::clone(&images), config.text_gen.default_model.clone());
        let orchestrator = Arc::new(WorkflowOrchestrator::new(steps));
        let scheduler = ScheduleRunner::new(&db, orchestrator, config.cron.due_tolerance);
        let poster = DistributionPoster::new(
            XPostStore::new(db.clone()),
            DistributionStore::new(db.clone()),
            AuthorStore::new(db.clone()),
            social,
            config.x.author_agent_id.clone(),
        );

        Self {
            agent_store: AgentStore::new(db.clone()),
            workflow_store: WorkflowStore::new(db.clone()),
            schedule_store: ScheduleStore::new(db.clone()),
            execution_store: ExecutionStore::new(db.clone()),
            issue_store: IssueStore::new(db.clone()),
            subscriber_store: SubscriberStore::new(db.clone()),
            distribution_store: DistributionStore::new(db.clone()),
            x_post_store: XPostStore::new(db.clone()),
            author_store: AuthorStore::new(db.clone()),
            approvals: ApprovalService::new(IssueStore::new(db.clone())),
            image_generator: images,
            scheduler,
            poster,
            config,
            db,
        }
    }
}
