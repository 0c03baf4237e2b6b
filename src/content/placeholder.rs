use std::collections::HashMap;

use rand::Rng;
use serde_json::{Value, json};
use tracing::trace;

use crate::{
    CrosslistError, Result,
    content::{ContentGenerator, DeepResearch, render_json_value, render_template},
    model::{PostProject, SearchRequest},
};

const DEFAULT_TEMPLATE: &str = "{{#itemName#}} ({{#condition#}})\n\n{{#description#}}\n\nAsking ${{#price#}}. Listed on {{$PLATFORM$}}.";

const PLATFORM_TEMPLATES: [(&str, &str); 4] = [
    ("ebay", "{{#itemName#}} - {{#condition#}} - {{#category#}}\n\n{{#description#}}\n\nBuy It Now: ${{#price#}}\nTags: {{#tags#}}"),
    ("facebook", "{{#itemName#}} for ${{#price#}}\n\n{{#description#}}\n\nCondition: {{#condition#}}. Message me if interested!"),
    ("mercari", "{{#itemName#}}\n\n{{#description#}}\n\nCondition: {{#condition#}}\nPrice: ${{#price#}}\n#{{#category#}}"),
    ("craigslist", "{{#itemName#}} - ${{#price#}}\n\n{{#description#}}\n\nCondition: {{#condition#}}. Cash or app payment, local pickup."),
];

/// Placeholder generator: random price figures and fixed listing templates.
#[derive(Debug, Clone)]
pub struct TemplateGenerator {
    templates: HashMap<String, String>,
}

impl Default for TemplateGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateGenerator {
    pub fn new() -> Self {
        Self {
            templates: PLATFORM_TEMPLATES.iter().map(|(p, t)| (p.to_string(), t.to_string())).collect(),
        }
    }

    /// Overrides (or adds) the listing template for a platform.
    pub fn with_template(
        mut self,
        platform: &str,
        template: &str,
    ) -> Self {
        self.templates.insert(platform.to_lowercase(), template.to_string());
        self
    }

    fn price_range(&self) -> (i64, i64) {
        let mut rng = rand::thread_rng();
        let low = rng.gen_range(10..80);
        let high = low + rng.gen_range(10..120);
        (low, high)
    }

    fn context(
        &self,
        project: &PostProject,
    ) -> Value {
        let price = project
            .pricing_strategy
            .as_ref()
            .and_then(|p| p.get("listPrice"))
            .or_else(|| project.research.as_ref().and_then(|r| r.pointer("/priceRange/average")))
            .cloned()
            .unwrap_or(Value::Null);

        json!({
            "itemName": project.item_name,
            "category": project.category,
            "condition": project.condition,
            "description": project.description,
            "tags": project.tags,
            "price": price,
        })
    }
}

impl ContentGenerator for TemplateGenerator {
    fn research(
        &self,
        request: &SearchRequest,
    ) -> Result<Value> {
        trace!("TemplateGenerator::research({})", request.item_name);
        let (low, high) = self.price_range();
        let comparables = rand::thread_rng().gen_range(3..40u32);

        Ok(json!({
            "itemName": request.item_name.trim(),
            "category": request.category,
            "condition": request.condition,
            "priceRange": {
                "low": low,
                "high": high,
                "average": (low + high) / 2,
            },
            "comparableListings": comparables,
        }))
    }

    fn deep_research(
        &self,
        project: &PostProject,
    ) -> Result<DeepResearch> {
        trace!("TemplateGenerator::deep_research({})", project.id);
        let (low, high) = self.price_range();
        let average = (low + high) / 2;
        let research = json!({
            "priceRange": {
                "low": low,
                "high": high,
                "average": average,
            },
            "demand": if high - low > 60 { "volatile" } else { "steady" },
        });

        let pricing_strategy = json!({
            "listPrice": average + (high - average) / 2,
            "floorPrice": low,
            "negotiable": true,
        });

        let mut with_pricing = project.clone();
        with_pricing.pricing_strategy = Some(pricing_strategy.clone());
        let content_strategy = render_json_value(
            &self.context(&with_pricing),
            &HashMap::new(),
            &json!({
                "headline": "{{#itemName#}} in {{#condition#}} condition",
                "keywords": ["{{#itemName#}}", "{{#category#}}"],
                "tone": "friendly",
            }),
        )?;

        Ok(DeepResearch {
            research,
            pricing_strategy,
            content_strategy,
        })
    }

    fn generate(
        &self,
        project: &PostProject,
        platform: &str,
    ) -> Result<String> {
        trace!("TemplateGenerator::generate({}, {})", project.id, platform);
        let template = self.templates.get(platform).map(String::as_str).unwrap_or(DEFAULT_TEMPLATE);
        let vars = HashMap::from([("PLATFORM".to_string(), platform.to_string())]);

        let text = render_template(&self.context(project), &vars, template)?;
        Ok(text.trim().to_string())
    }

    fn process_image(
        &self,
        project: &PostProject,
        image: &str,
    ) -> Result<String> {
        let image = image.trim();
        if image.is_empty() {
            return Err(CrosslistError::Content("image reference is empty".to_string()));
        }
        let name = image.rsplit('/').next().unwrap_or(image);
        Ok(format!("processed/{}/{}", project.id, name))
    }
}
