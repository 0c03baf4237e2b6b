mod flow;
mod image;
mod post;
mod project;
mod research;

use std::sync::Arc;

use sea_query::{Alias as SeaAlias, Condition, Expr as SeaExpr};
use serde_json::Value as JsonValue;

use crate::{
    CrosslistError,
    store::{db::sqlite::synclient::SynClient, query::Query},
};

pub(crate) use crate::store::map_db_err;
pub use flow::FlowCollection;
pub use image::ImageCollection;
pub use post::PostCollection;
pub use project::ProjectCollection;
pub use research::ResearchCollection;

pub type DbConnection = Arc<SynClient>;

/// Translates equality filters into a sea-query condition.
pub fn into_query(q: &Query) -> Condition {
    let mut cond = Condition::all();
    for (field, value) in q.filters() {
        let col = SeaExpr::col(SeaAlias::new(field.as_str()));
        cond = match value {
            JsonValue::String(s) => cond.add(col.eq(s.clone())),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => cond.add(col.eq(i)),
                None => cond.add(col.eq(n.as_f64().unwrap_or_default())),
            },
            JsonValue::Bool(b) => cond.add(col.eq(*b)),
            JsonValue::Null => cond.add(col.is_null()),
            other => cond.add(col.eq(other.to_string())),
        };
    }
    cond
}

/// Maps a lookup failure, turning a missing row into `NotFound`.
pub fn map_find_err(
    table: &str,
    id: &str,
) -> impl FnOnce(sqlx::Error) -> CrosslistError {
    let message = format!("{} {} not found", table, id);
    move |err| match err {
        sqlx::Error::RowNotFound => CrosslistError::NotFound(message),
        e => map_db_err(e),
    }
}
