use std::{
    cmp::Ordering,
    sync::{Arc, RwLock},
};

use serde_json::Value as JsonValue;

use crate::{
    CrosslistError, Result, ShareLock,
    store::{DbCollection, PageData, query::Query},
};

use super::DbDocument;

/// In-memory collection keeping records in insertion order.
#[derive(Debug)]
pub struct Collect<T> {
    name: String,
    items: ShareLock<Vec<T>>,
}

impl<T> Collect<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            items: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

fn cmp_json(
    a: Option<&JsonValue>,
    b: Option<&JsonValue>,
) -> Ordering {
    match (a, b) {
        (Some(JsonValue::Number(a)), Some(JsonValue::Number(b))) => a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal),
        (Some(JsonValue::String(a)), Some(JsonValue::String(b))) => a.cmp(b),
        (Some(JsonValue::Null) | None, Some(JsonValue::Null) | None) => Ordering::Equal,
        (Some(JsonValue::Null) | None, _) => Ordering::Less,
        (_, Some(JsonValue::Null) | None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

impl<T> DbCollection for Collect<T>
where
    T: DbDocument + Clone + Send + Sync,
{
    type Item = T;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        let items = self.items.read().unwrap();
        Ok(items.iter().any(|item| item.id() == id))
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        let items = self.items.read().unwrap();
        items.iter().find(|item| item.id() == id).cloned().ok_or(CrosslistError::NotFound(format!("{} {} not found", self.name, id)))
    }

    fn query(
        &self,
        q: &Query,
    ) -> Result<PageData<Self::Item>> {
        let items = self.items.read().unwrap();

        let mut matched = Vec::new();
        for item in items.iter() {
            let doc = item.doc()?;
            if q.filters().iter().all(|(field, value)| doc.get(field) == Some(value)) {
                matched.push((doc, item));
            }
        }

        // stable sort keeps insertion order between equal keys
        matched.sort_by(|(a, _), (b, _)| {
            for (field, rev) in q.orders() {
                let ord = cmp_json(a.get(field), b.get(field));
                let ord = if *rev {
                    ord.reverse()
                } else {
                    ord
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        let count = matched.len();
        let rows = matched.into_iter().skip(q.skip()).take(q.page_size()).map(|(_, item)| item.clone()).collect::<Vec<_>>();
        Ok(PageData::new(q, count, rows))
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let mut items = self.items.write().unwrap();
        if items.iter().any(|item| item.id() == data.id()) {
            return Err(CrosslistError::Store(format!("{} {} already exists", self.name, data.id())));
        }
        items.push(data.clone());
        Ok(true)
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let mut items = self.items.write().unwrap();
        match items.iter_mut().find(|item| item.id() == data.id()) {
            Some(item) => {
                *item = data.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        let mut items = self.items.write().unwrap();
        let len = items.len();
        items.retain(|item| item.id() != id);
        Ok(items.len() < len)
    }
}
