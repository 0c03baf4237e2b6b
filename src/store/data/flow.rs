use serde::{Deserialize, Serialize};

use crate::{
    Result,
    model::FlowModel,
    store::{DbCollectionIden, StoreIden},
};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Flow {
    pub id: String,
    pub name: String,
    pub status: String,
    pub data: String,
    pub create_time: i64,
    pub update_time: i64,
}

impl Flow {
    pub fn from_model(model: &FlowModel) -> Result<Self> {
        Ok(Self {
            id: model.id.clone(),
            name: model.name.clone(),
            status: model.status.as_ref().to_string(),
            data: serde_json::to_string(model)?,
            create_time: model.create_time,
            update_time: model.update_time,
        })
    }

    pub fn to_model(&self) -> Result<FlowModel> {
        FlowModel::from_json(&self.data)
    }
}

impl DbCollectionIden for Flow {
    fn iden() -> StoreIden {
        StoreIden::Flows
    }
}
