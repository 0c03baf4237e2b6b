use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

/// One scheduled or published listing on one platform.
#[derive(Default, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PostHistory {
    pub id: String,
    pub pid: String,
    pub platform: String,
    pub content: String,

    pub status: String,
    pub scheduled_at: i64,
    pub posted_at: Option<i64>,
    pub timestamp: i64,
}

impl DbCollectionIden for PostHistory {
    fn iden() -> StoreIden {
        StoreIden::Posts
    }
}
