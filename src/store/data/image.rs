use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

#[derive(Default, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Image {
    pub id: String,
    pub pid: String,
    pub source: String,
    pub processed: String,
    pub position: i64,

    pub timestamp: i64,
}

impl DbCollectionIden for Image {
    fn iden() -> StoreIden {
        StoreIden::Images
    }
}
