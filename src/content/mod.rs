//! Content generation for listings.
//!
//! The post workflow never produces research or copy itself; it asks a
//! [`ContentGenerator`]. [`TemplateGenerator`] is the built-in implementation
//! that fills per-platform listing templates with randomized figures.

mod placeholder;
mod template;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Result,
    model::{PostProject, SearchRequest},
};

pub use placeholder::TemplateGenerator;
pub use template::{render_json_value, render_template};

/// Output of a deep research pass over one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepResearch {
    pub research: Value,
    pub pricing_strategy: Value,
    pub content_strategy: Value,
}

/// Produces research, listing copy and processed images.
pub trait ContentGenerator: Send + Sync {
    /// Market research for an item that has no project yet.
    fn research(
        &self,
        request: &SearchRequest,
    ) -> Result<Value>;

    /// Research plus pricing and content strategy for a project.
    fn deep_research(
        &self,
        project: &PostProject,
    ) -> Result<DeepResearch>;

    /// Listing text for one platform.
    fn generate(
        &self,
        project: &PostProject,
        platform: &str,
    ) -> Result<String>;

    /// Returns the processed reference for one uploaded image.
    fn process_image(
        &self,
        project: &PostProject,
        image: &str,
    ) -> Result<String>;
}
