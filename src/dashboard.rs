//! Dashboard - the main entry point for Crosslist.
//!
//! The dashboard owns the storage backend, the content generator, the event
//! queue and the two services built on them. Nothing is global: every caller
//! constructs its own dashboard.

use std::sync::Arc;

use tokio::{runtime::Runtime, sync::broadcast};
use tracing::info;

use crate::{
    Config, CrosslistError, DashboardBuilder, Result, StoreType,
    common::BroadcastQueue,
    content::ContentGenerator,
    events::Event,
    flow::FlowService,
    post::PostFlow,
    store::{DbStore, MemStore, SqliteStore, Store},
};

/// Capacity of the event broadcast queue.
const EVENT_QUEUE_SIZE: usize = 256;

/// Cross-posting dashboard core.
///
/// # Example
///
/// ```rust,ignore
/// let dashboard = Dashboard::new_with_config(Config::default())?;
///
/// let project = dashboard.posts().create_project(&NewProject::new("Brass lamp", "home"))?;
/// dashboard.posts().run_deep_research(&project.id)?;
///
/// let validation = dashboard.flows().validate("flow-id")?;
/// ```
pub struct Dashboard {
    store: Arc<Store>,
    posts: PostFlow,
    flows: FlowService,
    events: Arc<BroadcastQueue<Event>>,
    /// Drives the SQLite pool; kept alive for the dashboard's lifetime.
    #[allow(dead_code)]
    runtime: Arc<Runtime>,
}

impl Dashboard {
    /// Creates a dashboard with the built-in template generator.
    pub fn new_with_config(config: Config) -> Result<Self> {
        DashboardBuilder::new().config(config).build()
    }

    pub(crate) fn new(
        config: Config,
        generator: Arc<dyn ContentGenerator>,
        runtime: Arc<Runtime>,
    ) -> Result<Self> {
        let store = Store::new();
        let db: Box<dyn DbStore> = match config.store.store_type {
            StoreType::Mem => Box::new(MemStore::new()),
            StoreType::Sqlite => {
                let sqlite = config
                    .store
                    .sqlite
                    .as_ref()
                    .ok_or_else(|| CrosslistError::Config("[store.sqlite] is required when store_type is sqlite".to_string()))?;
                Box::new(SqliteStore::new(&sqlite.database_url, sqlite.max_connections, runtime.clone())?)
            }
        };
        db.init(&store)?;
        info!("dashboard store ready ({:?})", config.store.store_type);

        let store = Arc::new(store);
        let events = BroadcastQueue::new(EVENT_QUEUE_SIZE);
        let posts = PostFlow::new(store.clone(), generator, events.clone(), &config);
        let flows = FlowService::new(store.clone(), events.clone());

        Ok(Self {
            store,
            posts,
            flows,
            events,
            runtime,
        })
    }

    /// Post-creation workflow operations.
    pub fn posts(&self) -> &PostFlow {
        &self.posts
    }

    /// Automation flow operations.
    pub fn flows(&self) -> &FlowService {
        &self.flows
    }

    /// Direct access to the record store.
    pub fn store(&self) -> Arc<Store> {
        self.store.clone()
    }

    /// Receives every project and flow event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::{FlowEvent, ProjectAction},
        model::{FlowConnection, FlowModel, FlowNode, FlowStatus, GenerateContent, NewProject, NodeType, Stage},
    };

    #[test]
    fn test_dashboard_mem_store() {
        let dashboard = Dashboard::new_with_config(Config::default()).unwrap();
        let project = dashboard.posts().create_project(&NewProject::new("Brass lamp", "home")).unwrap();
        let project = dashboard.posts().generate_content(&project.id, &GenerateContent::new(&["ebay"])).unwrap();
        assert_eq!(project.stage, Stage::Writing);
        assert!(dashboard.store().projects().exists(&project.id).unwrap());
    }

    #[test]
    fn test_dashboard_sqlite_store() {
        let config = Config::load_from_str(
            r#"
            [store]
            store_type = "sqlite"

            [store.sqlite]
            database_url = "sqlite::memory:"
            "#,
        )
        .unwrap();
        let dashboard = Dashboard::new_with_config(config).unwrap();

        let project = dashboard.posts().create_project(&NewProject::new("Brass lamp", "home")).unwrap();
        dashboard.posts().run_deep_research(&project.id).unwrap();
        assert_eq!(dashboard.posts().get_project(&project.id).unwrap().stage, Stage::Research);
        assert_eq!(dashboard.posts().research_history(&project.id).unwrap()[0].kind, "deep");
    }

    #[test]
    fn test_subscribers_see_both_kinds() {
        let dashboard = Dashboard::new_with_config(Config::default()).unwrap();
        let mut rx = dashboard.subscribe();

        dashboard.posts().create_project(&NewProject::new("Brass lamp", "home")).unwrap();
        let flow = dashboard
            .flows()
            .create_flow(FlowModel {
                name: "Follow-up".to_string(),
                nodes: vec![FlowNode::new("n1", NodeType::Trigger, "New lead"), FlowNode::new("n2", NodeType::Email, "Mail")],
                connections: vec![FlowConnection::new("c1", "n1", "n2")],
                ..Default::default()
            })
            .unwrap();
        dashboard.flows().activate(&flow.id).unwrap();

        assert!(matches!(rx.try_recv().unwrap(), Event::Project(e) if e.action == ProjectAction::Created));
        assert!(matches!(rx.try_recv().unwrap(), Event::Flow(FlowEvent { status: FlowStatus::Draft, .. })));
        assert!(matches!(rx.try_recv().unwrap(), Event::Flow(FlowEvent { status: FlowStatus::Active, deleted: false, .. })));
    }
}
