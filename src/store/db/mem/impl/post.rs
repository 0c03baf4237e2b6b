use std::collections::HashMap;

use serde_json::{Value as JsonValue, json};

use crate::{
    Result,
    store::{data::PostHistory, db::mem::DbDocument},
};

impl DbDocument for PostHistory {
    fn id(&self) -> &str {
        &self.id
    }

    fn doc(&self) -> Result<HashMap<String, JsonValue>> {
        let mut map = HashMap::new();
        map.insert("id".to_string(), json!(self.id.clone()));
        map.insert("pid".to_string(), json!(self.pid.clone()));
        map.insert("platform".to_string(), json!(self.platform.clone()));
        map.insert("status".to_string(), json!(self.status.clone()));
        map.insert("scheduled_at".to_string(), json!(self.scheduled_at));
        map.insert("posted_at".to_string(), json!(self.posted_at));
        map.insert("timestamp".to_string(), json!(self.timestamp));
        Ok(map)
    }
}
