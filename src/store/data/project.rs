use serde::{Deserialize, Serialize};

use crate::{
    Result,
    model::PostProject,
    store::{DbCollectionIden, StoreIden},
};

/// Stored form of a post project: indexed columns plus the JSON document.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub category: String,
    pub stage: String,
    pub data: String,
    pub create_time: i64,
    pub update_time: i64,
}

impl Project {
    pub fn from_model(model: &PostProject) -> Result<Self> {
        Ok(Self {
            id: model.id.clone(),
            name: model.item_name.clone(),
            category: model.category.clone(),
            stage: model.stage.as_ref().to_string(),
            data: model.to_json()?,
            create_time: model.create_time,
            update_time: model.update_time,
        })
    }

    pub fn to_model(&self) -> Result<PostProject> {
        PostProject::from_json(&self.data)
    }
}

impl DbCollectionIden for Project {
    fn iden() -> StoreIden {
        StoreIden::Projects
    }
}
