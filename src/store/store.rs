use std::{
    any::Any,
    collections::HashMap,
    convert::AsRef,
    sync::{Arc, RwLock},
};

use tracing::trace;

use crate::{
    CrosslistError, Result, ShareLock,
    model::{FlowModel, PostProject},
};

use super::{ChangeSet, DbCollection, DbCollectionIden, DbCommit, StoreIden, data::*, query::*};

#[derive(Clone)]
pub struct DynDbSetRef<T>(Arc<dyn DbCollection<Item = T>>);

pub struct Store {
    collections: ShareLock<HashMap<StoreIden, Arc<dyn Any + Send + Sync + 'static>>>,
    committer: ShareLock<Option<Arc<dyn DbCommit>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            committer: Arc::new(RwLock::new(None)),
        }
    }

    pub fn collection<DATA>(&self) -> Arc<dyn DbCollection<Item = DATA>>
    where
        DATA: DbCollectionIden + Send + Sync + 'static,
    {
        let collections = self.collections.read().unwrap();

        #[allow(clippy::expect_fun_call)]
        let collection = collections.get(&DATA::iden()).expect(&format!("fail to get collection: {}", DATA::iden().as_ref()));

        #[allow(clippy::expect_fun_call)]
        collection.downcast_ref::<DynDbSetRef<DATA>>().map(|v| v.0.clone()).expect(&format!("fail to get collection: {}", DATA::iden().as_ref()))
    }

    pub fn register<DATA>(
        &self,
        collection: Arc<dyn DbCollection<Item = DATA> + Send + Sync + 'static>,
    ) where
        DATA: DbCollectionIden + 'static,
    {
        let mut collections = self.collections.write().unwrap();
        collections.insert(DATA::iden(), Arc::new(DynDbSetRef::<DATA>(collection)));
    }

    pub fn register_committer(
        &self,
        committer: Arc<dyn DbCommit>,
    ) {
        let mut slot = self.committer.write().unwrap();
        *slot = Some(committer);
    }

    pub fn projects(&self) -> Arc<dyn DbCollection<Item = Project>> {
        self.collection()
    }

    pub fn research(&self) -> Arc<dyn DbCollection<Item = Research>> {
        self.collection()
    }

    pub fn images(&self) -> Arc<dyn DbCollection<Item = Image>> {
        self.collection()
    }

    pub fn posts(&self) -> Arc<dyn DbCollection<Item = PostHistory>> {
        self.collection()
    }

    pub fn flows(&self) -> Arc<dyn DbCollection<Item = Flow>> {
        self.collection()
    }

    /// Applies every change in `changes` atomically.
    pub fn commit(
        &self,
        changes: &ChangeSet,
    ) -> Result<()> {
        trace!("store::commit({} changes)", changes.len());
        if changes.is_empty() {
            return Ok(());
        }
        let committer = self.committer.read().unwrap().clone();
        match committer {
            Some(c) => c.commit(changes),
            None => Err(CrosslistError::Store("no storage backend registered".to_string())),
        }
    }

    /// Loads and decodes a post project.
    pub fn load_project(
        &self,
        id: &str,
    ) -> Result<PostProject> {
        trace!("store::load_project({})", id);
        match self.projects().find(id) {
            Ok(row) => row.to_model(),
            Err(CrosslistError::NotFound(_)) => Err(CrosslistError::NotFound(format!("Project {} not found", id))),
            Err(e) => Err(e),
        }
    }

    /// Loads and decodes a flow.
    pub fn load_flow(
        &self,
        id: &str,
    ) -> Result<FlowModel> {
        trace!("store::load_flow({})", id);
        match self.flows().find(id) {
            Ok(row) => row.to_model(),
            Err(CrosslistError::NotFound(_)) => Err(CrosslistError::NotFound(format!("Flow {} not found", id))),
            Err(e) => Err(e),
        }
    }

    /// All side-table rows of one project, oldest first.
    pub fn project_rows<DATA>(
        &self,
        pid: &str,
    ) -> Result<Vec<DATA>>
    where
        DATA: DbCollectionIden + Send + Sync + 'static,
    {
        self.query_all(&Query::new().filter("pid", pid).order_by("timestamp", false))
    }

    /// Every row matching `q`, read page by page. The paging of `q` itself
    /// is ignored.
    pub fn query_all<DATA>(
        &self,
        q: &Query,
    ) -> Result<Vec<DATA>>
    where
        DATA: DbCollectionIden + Send + Sync + 'static,
    {
        let collection = self.collection::<DATA>();
        let mut rows = Vec::new();
        loop {
            let page = collection.query(&q.clone().offset(rows.len()).limit(MAX_LIMIT))?;
            let fetched = page.rows.len();
            rows.extend(page.rows);
            if fetched < MAX_LIMIT || rows.len() >= page.count {
                return Ok(rows);
            }
        }
    }
}
