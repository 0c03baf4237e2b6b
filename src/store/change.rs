use crate::store::{DbCollectionIden, StoreIden, data::*};

/// Any stored record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Project(Project),
    Research(Research),
    Image(Image),
    Post(PostHistory),
    Flow(Flow),
}

impl Record {
    pub fn id(&self) -> &str {
        match self {
            Record::Project(r) => &r.id,
            Record::Research(r) => &r.id,
            Record::Image(r) => &r.id,
            Record::Post(r) => &r.id,
            Record::Flow(r) => &r.id,
        }
    }

    /// Last-write stamp of records that carry one (projects and flows).
    pub fn update_time(&self) -> Option<i64> {
        match self {
            Record::Project(r) => Some(r.update_time),
            Record::Flow(r) => Some(r.update_time),
            _ => None,
        }
    }

    pub fn iden(&self) -> StoreIden {
        match self {
            Record::Project(_) => Project::iden(),
            Record::Research(_) => Research::iden(),
            Record::Image(_) => Image::iden(),
            Record::Post(_) => PostHistory::iden(),
            Record::Flow(_) => Flow::iden(),
        }
    }
}

impl From<Project> for Record {
    fn from(value: Project) -> Self {
        Record::Project(value)
    }
}

impl From<Research> for Record {
    fn from(value: Research) -> Self {
        Record::Research(value)
    }
}

impl From<Image> for Record {
    fn from(value: Image) -> Self {
        Record::Image(value)
    }
}

impl From<PostHistory> for Record {
    fn from(value: PostHistory) -> Self {
        Record::Post(value)
    }
}

impl From<Flow> for Record {
    fn from(value: Flow) -> Self {
        Record::Flow(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Create(Record),
    Update(Record),
    /// Update that only applies while the stored `update_time` still equals
    /// the given stamp.
    UpdateIf(Record, i64),
    Delete(StoreIden, String),
}

impl Change {
    /// Collection and id the change touches.
    pub fn target(&self) -> (StoreIden, &str) {
        match self {
            Change::Create(r) | Change::Update(r) | Change::UpdateIf(r, _) => (r.iden(), r.id()),
            Change::Delete(iden, id) => (*iden, id.as_str()),
        }
    }
}

/// Ordered list of writes committed as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        record: impl Into<Record>,
    ) -> &mut Self {
        self.changes.push(Change::Create(record.into()));
        self
    }

    pub fn update(
        &mut self,
        record: impl Into<Record>,
    ) -> &mut Self {
        self.changes.push(Change::Update(record.into()));
        self
    }

    /// Queues an update guarded by the `update_time` the record was read with.
    pub fn update_if(
        &mut self,
        record: impl Into<Record>,
        expected: i64,
    ) -> &mut Self {
        self.changes.push(Change::UpdateIf(record.into(), expected));
        self
    }

    pub fn delete(
        &mut self,
        iden: StoreIden,
        id: impl Into<String>,
    ) -> &mut Self {
        self.changes.push(Change::Delete(iden, id.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn get(
        &self,
        index: usize,
    ) -> Option<&Change> {
        self.changes.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
