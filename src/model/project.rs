use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CrosslistError, Result, model::Stage, utils};

/// A seller's item as it moves through the posting stages.
///
/// Serialized in camelCase, the shape the dashboard reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostProject {
    pub id: String,
    pub item_name: String,
    pub category: String,
    pub condition: String,
    pub description: String,
    pub stage: Stage,
    pub platforms: Vec<String>,
    pub tags: Vec<String>,
    pub research: Option<Value>,
    pub pricing_strategy: Option<Value>,
    pub content_strategy: Option<Value>,
    pub images: Vec<String>,
    pub generated_content: BTreeMap<String, String>,
    pub customizations: BTreeMap<String, Value>,
    /// platform -> scheduled epoch millis
    pub schedule: BTreeMap<String, i64>,
    pub performance: BTreeMap<String, Value>,
    pub create_time: i64,
    pub update_time: i64,
}

impl PostProject {
    /// Builds a fresh `draft` project from validated input.
    pub fn new(input: &NewProject) -> Result<Self> {
        input.validate()?;

        Ok(Self {
            id: utils::longid(),
            item_name: input.item_name.trim().to_string(),
            category: input.category.trim().to_string(),
            condition: input.condition.trim().to_string(),
            description: input.description.clone(),
            stage: Stage::Draft,
            tags: input.tags.clone(),
            research: input.research.clone(),
            create_time: utils::time::time_millis(),
            ..Default::default()
        })
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<PostProject>(s).map_err(|e| CrosslistError::Convert(format!("invalid project data: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Listing text for a platform, preferring a customized override at
    /// `customizations.content.<platform>`.
    pub fn content_for(
        &self,
        platform: &str,
    ) -> Option<String> {
        let custom = self.customizations.get("content").and_then(|c| c.get(platform)).and_then(Value::as_str).map(str::to_string);

        custom.or_else(|| self.generated_content.get(platform).cloned())
    }
}

/// Input for the pre-draft discovery search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    pub item_name: String,
    pub category: Option<String>,
    pub condition: Option<String>,
}

impl SearchRequest {
    pub fn new(item_name: impl Into<String>) -> Self {
        Self {
            item_name: item_name.into(),
            ..Default::default()
        }
    }

    /// Cache key: item name, category and condition, trimmed and lowercased.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.item_name.trim().to_lowercase(),
            self.category.as_deref().unwrap_or_default().trim().to_lowercase(),
            self.condition.as_deref().unwrap_or_default().trim().to_lowercase()
        )
    }
}

/// Input for `create_project`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewProject {
    pub item_name: String,
    pub category: String,
    pub condition: String,
    pub description: String,
    pub tags: Vec<String>,
    /// research blob from an earlier `search`, if any
    pub research: Option<Value>,
}

impl NewProject {
    pub fn new(
        item_name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            item_name: item_name.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.item_name.trim().is_empty() {
            errors.push("Item name is required".to_string());
        }
        if self.category.trim().is_empty() {
            errors.push("Category is required".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CrosslistError::Validation(errors))
        }
    }
}

/// Input for `generate_content`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateContent {
    pub platforms: Vec<String>,
}

impl GenerateContent {
    pub fn new<S: AsRef<str>>(platforms: &[S]) -> Self {
        Self {
            platforms: platforms.iter().map(|p| p.as_ref().to_string()).collect(),
        }
    }
}

/// Input for `process_images`: raw image references as uploaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessImages {
    pub images: Vec<String>,
}

/// Input for `confirm_post`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfirmPost {
    /// explicit platform -> epoch millis; missing platforms are staggered from now
    pub schedule: BTreeMap<String, i64>,
}
