use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

/// Research result log entry; `kind` is `search` or `deep`.
#[derive(Default, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Research {
    pub id: String,
    pub pid: String,
    pub kind: String,
    pub data: String,

    pub timestamp: i64,
}

impl DbCollectionIden for Research {
    fn iden() -> StoreIden {
        StoreIden::Research
    }
}
