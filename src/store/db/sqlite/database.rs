use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::{debug, trace};

use crate::{
    CrosslistError, Result,
    store::{Change, ChangeSet, DbCollection, DbCommit, DbStore, Record, Store, StoreIden, data::*},
};

use super::{
    DbInit, DbStatement, TxStatement,
    collection::{self, *},
    synclient::SynClient,
};

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<SynClient>,

    projects: Arc<ProjectCollection>,
    research: Arc<ResearchCollection>,
    images: Arc<ImageCollection>,
    posts: Arc<PostCollection>,
    flows: Arc<FlowCollection>,
}

impl DbStore for SqliteStore {
    fn init(
        &self,
        s: &Store,
    ) -> Result<()> {
        self.projects.init()?;
        self.research.init()?;
        self.images.init()?;
        self.posts.init()?;
        self.flows.init()?;
        debug!("sqlite tables ready");

        s.register(self.projects());
        s.register(self.research());
        s.register(self.images());
        s.register(self.posts());
        s.register(self.flows());
        s.register_committer(Arc::new(self.clone()));
        Ok(())
    }
}

impl DbCommit for SqliteStore {
    fn commit(
        &self,
        changes: &ChangeSet,
    ) -> Result<()> {
        trace!("sqlite::commit({} changes)", changes.len());
        let statements = changes.iter().map(|change| self.statement(change)).collect::<Result<Vec<_>>>()?;
        match self.conn.transaction(statements).map_err(collection::map_db_err)? {
            None => Ok(()),
            Some(i) => match changes.get(i) {
                Some(change) => Err(self.unmatched(change)?),
                None => Err(CrosslistError::Store(format!("commit rolled back at change {}", i))),
            },
        }
    }
}

impl SqliteStore {
    pub fn new(
        db_url: &str,
        max_connections: u32,
        runtime: Arc<Runtime>,
    ) -> Result<Self> {
        let conn = Arc::new(SynClient::connect(db_url, max_connections, runtime).map_err(collection::map_db_err)?);
        let projects = ProjectCollection::new(&conn);
        let research = ResearchCollection::new(&conn);
        let images = ImageCollection::new(&conn);
        let posts = PostCollection::new(&conn);
        let flows = FlowCollection::new(&conn);

        Ok(Self {
            conn,
            projects: Arc::new(projects),
            research: Arc::new(research),
            images: Arc::new(images),
            posts: Arc::new(posts),
            flows: Arc::new(flows),
        })
    }

    pub fn projects(&self) -> Arc<dyn DbCollection<Item = Project> + Send + Sync> {
        self.projects.clone()
    }

    pub fn research(&self) -> Arc<dyn DbCollection<Item = Research> + Send + Sync> {
        self.research.clone()
    }

    pub fn images(&self) -> Arc<dyn DbCollection<Item = Image> + Send + Sync> {
        self.images.clone()
    }

    pub fn posts(&self) -> Arc<dyn DbCollection<Item = PostHistory> + Send + Sync> {
        self.posts.clone()
    }

    pub fn flows(&self) -> Arc<dyn DbCollection<Item = Flow> + Send + Sync> {
        self.flows.clone()
    }

    fn statement(
        &self,
        change: &Change,
    ) -> Result<TxStatement> {
        let stmt = match change {
            Change::Create(record) => {
                let sql = match record {
                    Record::Project(r) => self.projects.insert_sql(r)?,
                    Record::Research(r) => self.research.insert_sql(r)?,
                    Record::Image(r) => self.images.insert_sql(r)?,
                    Record::Post(r) => self.posts.insert_sql(r)?,
                    Record::Flow(r) => self.flows.insert_sql(r)?,
                };
                TxStatement::new(sql, false)
            }
            Change::Update(record) => {
                let sql = match record {
                    Record::Project(r) => self.projects.update_sql(r),
                    Record::Research(r) => self.research.update_sql(r),
                    Record::Image(r) => self.images.update_sql(r),
                    Record::Post(r) => self.posts.update_sql(r),
                    Record::Flow(r) => self.flows.update_sql(r),
                };
                TxStatement::new(sql, true)
            }
            Change::UpdateIf(record, expected) => {
                let sql = match record {
                    Record::Project(r) => self.projects.update_if_sql(r, *expected),
                    Record::Flow(r) => self.flows.update_if_sql(r, *expected),
                    other => return Err(CrosslistError::Store(format!("{} records cannot be updated conditionally", other.iden().as_ref()))),
                };
                TxStatement::new(sql, true)
            }
            Change::Delete(iden, id) => {
                let sql = match iden {
                    StoreIden::Projects => self.projects.delete_sql(id),
                    StoreIden::Research => self.research.delete_sql(id),
                    StoreIden::Images => self.images.delete_sql(id),
                    StoreIden::Posts => self.posts.delete_sql(id),
                    StoreIden::Flows => self.flows.delete_sql(id),
                };
                TxStatement::new(sql, false)
            }
        };
        Ok(stmt)
    }

    /// Error for an update that matched no row: the row is gone, or a
    /// guarded update lost to another writer.
    fn unmatched(
        &self,
        change: &Change,
    ) -> Result<CrosslistError> {
        let (iden, id) = change.target();
        let exists = match iden {
            StoreIden::Projects => self.projects.exists(id)?,
            StoreIden::Research => self.research.exists(id)?,
            StoreIden::Images => self.images.exists(id)?,
            StoreIden::Posts => self.posts.exists(id)?,
            StoreIden::Flows => self.flows.exists(id)?,
        };
        if exists {
            Ok(CrosslistError::Conflict(format!("{} {} was modified concurrently", iden.as_ref(), id)))
        } else {
            Ok(CrosslistError::NotFound(format!("{} {} not found", iden.as_ref(), id)))
        }
    }
}
