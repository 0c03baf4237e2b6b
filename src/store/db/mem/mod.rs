mod collect;
mod r#impl;

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;
use tracing::trace;

use crate::{
    CrosslistError, Result,
    store::{Change, ChangeSet, DbCollection, DbCommit, DbStore, Record, Store, StoreIden, data::*},
};
pub use collect::Collect;

#[derive(Debug, Clone)]
pub struct MemStore {
    projects: Arc<Collect<Project>>,
    research: Arc<Collect<Research>>,
    images: Arc<Collect<Image>>,
    posts: Arc<Collect<PostHistory>>,
    flows: Arc<Collect<Flow>>,

    commit_lock: Arc<Mutex<()>>,
}

pub(crate) trait DbDocument: Serialize + DeserializeOwned {
    fn id(&self) -> &str;
    fn doc(&self) -> Result<HashMap<String, JsonValue>>;
}

impl DbStore for MemStore {
    fn init(
        &self,
        s: &Store,
    ) -> Result<()> {
        s.register(self.projects());
        s.register(self.research());
        s.register(self.images());
        s.register(self.posts());
        s.register(self.flows());
        s.register_committer(Arc::new(self.clone()));
        Ok(())
    }
}

impl DbCommit for MemStore {
    fn commit(
        &self,
        changes: &ChangeSet,
    ) -> Result<()> {
        let _guard = self.commit_lock.lock().unwrap();
        trace!("mem::commit({} changes)", changes.len());

        // Check every change against the state it will see before touching anything.
        let mut created: HashSet<(StoreIden, String)> = HashSet::new();
        let mut deleted: HashSet<(StoreIden, String)> = HashSet::new();
        for change in changes {
            let (iden, id) = change.target();
            let key = (iden, id.to_string());
            let exists = (created.contains(&key) || self.exists(iden, id)?) && !deleted.contains(&key);
            match change {
                Change::Create(_) => {
                    if exists {
                        return Err(CrosslistError::Store(format!("{} {} already exists", iden.as_ref(), id)));
                    }
                    deleted.remove(&key);
                    created.insert(key);
                }
                Change::Update(_) => {
                    if !exists {
                        return Err(CrosslistError::NotFound(format!("{} {} not found", iden.as_ref(), id)));
                    }
                }
                Change::UpdateIf(record, expected) => {
                    if !exists {
                        return Err(CrosslistError::NotFound(format!("{} {} not found", iden.as_ref(), id)));
                    }
                    if !created.contains(&key) && self.stored_update_time(record)? != *expected {
                        return Err(CrosslistError::Conflict(format!("{} {} was modified concurrently", iden.as_ref(), id)));
                    }
                }
                Change::Delete(..) => {
                    if exists {
                        created.remove(&key);
                        deleted.insert(key);
                    }
                }
            }
        }

        for change in changes {
            match change {
                Change::Create(record) => self.apply_create(record)?,
                Change::Update(record) | Change::UpdateIf(record, _) => self.apply_update(record)?,
                Change::Delete(iden, id) => self.apply_delete(*iden, id)?,
            };
        }
        Ok(())
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        let projects = Collect::new("projects");
        let research = Collect::new("research");
        let images = Collect::new("images");
        let posts = Collect::new("posts");
        let flows = Collect::new("flows");

        Self {
            projects: Arc::new(projects),
            research: Arc::new(research),
            images: Arc::new(images),
            posts: Arc::new(posts),
            flows: Arc::new(flows),
            commit_lock: Arc::new(Mutex::new(())),
        }
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

    fn exists(
        &self,
        iden: StoreIden,
        id: &str,
    ) -> Result<bool> {
        match iden {
            StoreIden::Projects => self.projects.exists(id),
            StoreIden::Research => self.research.exists(id),
            StoreIden::Images => self.images.exists(id),
            StoreIden::Posts => self.posts.exists(id),
            StoreIden::Flows => self.flows.exists(id),
        }
    }

    fn stored_update_time(
        &self,
        record: &Record,
    ) -> Result<i64> {
        match record {
            Record::Project(r) => Ok(self.projects.find(&r.id)?.update_time),
            Record::Flow(r) => Ok(self.flows.find(&r.id)?.update_time),
            other => Err(CrosslistError::Store(format!("{} records cannot be updated conditionally", other.iden().as_ref()))),
        }
    }

    fn apply_create(
        &self,
        record: &Record,
    ) -> Result<bool> {
        match record {
            Record::Project(r) => self.projects.create(r),
            Record::Research(r) => self.research.create(r),
            Record::Image(r) => self.images.create(r),
            Record::Post(r) => self.posts.create(r),
            Record::Flow(r) => self.flows.create(r),
        }
    }

    fn apply_update(
        &self,
        record: &Record,
    ) -> Result<bool> {
        match record {
            Record::Project(r) => self.projects.update(r),
            Record::Research(r) => self.research.update(r),
            Record::Image(r) => self.images.update(r),
            Record::Post(r) => self.posts.update(r),
            Record::Flow(r) => self.flows.update(r),
        }
    }

    fn apply_delete(
        &self,
        iden: StoreIden,
        id: &str,
    ) -> Result<bool> {
        match iden {
            StoreIden::Projects => self.projects.delete(id),
            StoreIden::Research => self.research.delete(id),
            StoreIden::Images => self.images.delete(id),
            StoreIden::Posts => self.posts.delete(id),
            StoreIden::Flows => self.flows.delete(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::query::{MAX_LIMIT, Query};

    fn store() -> Store {
        let store = Store::new();
        MemStore::new().init(&store).unwrap();
        store
    }

    fn research(
        id: &str,
        pid: &str,
        timestamp: i64,
    ) -> Research {
        Research {
            id: id.to_string(),
            pid: pid.to_string(),
            kind: "search".to_string(),
            data: "{}".to_string(),
            timestamp,
        }
    }

    #[test]
    fn test_mem_collection_crud() {
        let store = store();
        let collection = store.research();

        assert!(collection.create(&research("r1", "p1", 1)).unwrap());
        assert!(collection.exists("r1").unwrap());
        assert!(collection.create(&research("r1", "p1", 1)).is_err());

        let mut row = collection.find("r1").unwrap();
        row.kind = "deep".to_string();
        assert!(collection.update(&row).unwrap());
        assert_eq!(collection.find("r1").unwrap().kind, "deep");

        assert!(collection.delete("r1").unwrap());
        assert!(!collection.delete("r1").unwrap());
        assert!(collection.find("r1").unwrap_err().is_not_found());
    }

    #[test]
    fn test_mem_query_filter_order_page() {
        let store = store();
        let collection = store.research();
        collection.create(&research("r1", "p1", 30)).unwrap();
        collection.create(&research("r2", "p2", 10)).unwrap();
        collection.create(&research("r3", "p1", 20)).unwrap();
        collection.create(&research("r4", "p1", 10)).unwrap();

        let page = collection.query(&Query::new().filter("pid", "p1").order_by("timestamp", false).limit(2)).unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.page_count, 2);
        assert_eq!(page.rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["r4", "r3"]);

        let page = collection.query(&Query::new().filter("pid", "p1").order_by("timestamp", true).offset(2).limit(2)).unwrap();
        assert_eq!(page.page_num, 2);
        assert_eq!(page.rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["r4"]);
    }

    #[test]
    fn test_mem_commit_applies_all_changes() {
        let store = store();
        store.research().create(&research("old", "p1", 1)).unwrap();

        let mut changes = ChangeSet::new();
        changes.create(research("r1", "p1", 2)).create(research("r2", "p1", 3)).delete(StoreIden::Research, "old");
        store.commit(&changes).unwrap();

        assert_eq!(store.project_rows::<Research>("p1").unwrap().len(), 2);
        assert!(!store.research().exists("old").unwrap());
    }

    #[test]
    fn test_mem_commit_is_all_or_nothing() {
        let store = store();

        let mut changes = ChangeSet::new();
        changes.create(research("r1", "p1", 2)).update(research("missing", "p1", 3));
        let err = store.commit(&changes).unwrap_err();

        assert!(err.is_not_found());
        assert!(!store.research().exists("r1").unwrap());
    }

    #[test]
    fn test_mem_commit_guarded_update() {
        let store = store();
        let project = Project {
            id: "p1".to_string(),
            name: "Brass lamp".to_string(),
            category: "home".to_string(),
            stage: "draft".to_string(),
            data: "{}".to_string(),
            create_time: 1,
            update_time: 1,
        };
        store.projects().create(&project).unwrap();

        let mut first = project.clone();
        first.stage = "research".to_string();
        first.update_time = 2;
        let mut changes = ChangeSet::new();
        changes.update_if(first, 1);
        store.commit(&changes).unwrap();

        // a second writer still holding the stamp it read
        let mut stale = project.clone();
        stale.stage = "writing".to_string();
        stale.update_time = 3;
        let mut changes = ChangeSet::new();
        changes.create(research("r1", "p1", 3)).update_if(stale, 1);
        assert!(store.commit(&changes).unwrap_err().is_conflict());
        assert!(!store.research().exists("r1").unwrap());
        assert_eq!(store.projects().find("p1").unwrap().stage, "research");
    }

    #[test]
    fn test_project_rows_reads_past_one_page() {
        let store = store();
        let total = MAX_LIMIT + 5;
        let mut changes = ChangeSet::new();
        for i in 0..total {
            changes.create(research(&format!("r{}", i), "p1", i as i64));
        }
        changes.create(research("other", "p2", 0));
        store.commit(&changes).unwrap();

        let rows = store.project_rows::<Research>("p1").unwrap();
        assert_eq!(rows.len(), total);
        assert_eq!(rows.last().map(|r| r.timestamp), Some(total as i64 - 1));
    }

    #[test]
    fn test_mem_commit_create_after_delete() {
        let store = store();
        store.research().create(&research("r1", "p1", 1)).unwrap();

        let mut changes = ChangeSet::new();
        changes.delete(StoreIden::Research, "r1").create(research("r1", "p1", 5));
        store.commit(&changes).unwrap();
        assert_eq!(store.research().find("r1").unwrap().timestamp, 5);
    }
}
