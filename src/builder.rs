use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::{
    Config, CrosslistError, Dashboard, Result,
    content::{ContentGenerator, TemplateGenerator},
};

#[derive(Default)]
pub struct DashboardBuilder {
    config: Config,
    generator: Option<Arc<dyn ContentGenerator>>,
    rt: Option<Arc<Runtime>>,
}

impl DashboardBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn async_worker_thread_number(
        mut self,
        n: u16,
    ) -> Self {
        self.config.async_worker_thread_number = n;
        self
    }

    /// Content generator to use instead of [`TemplateGenerator`].
    pub fn generator(
        mut self,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn runtime(
        mut self,
        runtime: Arc<Runtime>,
    ) -> Self {
        self.rt = Some(runtime);
        self
    }

    pub fn build(self) -> Result<Dashboard> {
        let runtime = match self.rt {
            Some(rt) => rt,
            None => Arc::new(
                Builder::new_multi_thread()
                    .worker_threads(self.config.async_worker_thread_number.max(1).into())
                    .enable_all()
                    .build()
                    .map_err(|e| CrosslistError::Engine(format!("failed to build runtime: {}", e)))?,
            ),
        };
        let generator = self.generator.unwrap_or_else(|| Arc::new(TemplateGenerator::new()));

        Dashboard::new(self.config, generator, runtime)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::{
        content::DeepResearch,
        model::{NewProject, PostProject, SearchRequest},
    };

    struct FixedGenerator;

    impl ContentGenerator for FixedGenerator {
        fn research(
            &self,
            _request: &SearchRequest,
        ) -> Result<Value> {
            Ok(json!({"average": 10}))
        }

        fn deep_research(
            &self,
            _project: &PostProject,
        ) -> Result<DeepResearch> {
            Ok(DeepResearch::default())
        }

        fn generate(
            &self,
            _project: &PostProject,
            platform: &str,
        ) -> Result<String> {
            Ok(format!("fixed {}", platform))
        }

        fn process_image(
            &self,
            _project: &PostProject,
            image: &str,
        ) -> Result<String> {
            Ok(image.to_string())
        }
    }

    #[test]
    fn test_builder_with_generator() {
        let dashboard = DashboardBuilder::new().async_worker_thread_number(1).generator(Arc::new(FixedGenerator)).build().unwrap();
        assert_eq!(dashboard.posts().search(&SearchRequest::new("lamp")).unwrap(), json!({"average": 10}));

        let project = dashboard.posts().create_project(&NewProject::new("lamp", "home")).unwrap();
        let project = dashboard.posts().generate_content(&project.id, &crate::model::GenerateContent::new(&["ebay"])).unwrap();
        assert_eq!(project.generated_content["ebay"], "fixed ebay");
    }

    #[test]
    fn test_builder_sqlite_without_section() {
        let mut config = Config::default();
        config.store.store_type = crate::StoreType::Sqlite;
        assert!(matches!(DashboardBuilder::new().config(config).build(), Err(CrosslistError::Config(_))));
    }
}
