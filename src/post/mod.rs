//! Post-creation workflow.
//!
//! A project walks `draft → research → writing → images → customize →
//! confirm → posted → archived`. Each operation checks its inputs, writes
//! them onto the project and commits the project together with any
//! side-table rows in one [`ChangeSet`].
//!
//! Earlier operations may be repeated while the project is still before
//! `confirm`; the stage never moves backwards. From `confirm` on the listing
//! content is frozen.

use std::{cmp::max, collections::BTreeMap, sync::Arc};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    Config, CrosslistError, Result,
    common::{BroadcastQueue, MemCache},
    content::ContentGenerator,
    events::{Event, ProjectAction},
    model::{ConfirmPost, GenerateContent, NewProject, PostProject, PostStatus, ProcessImages, SearchRequest, Stage},
    store::{
        ChangeSet, Store, StoreIden,
        data::{Image, PostHistory, Project, Research},
        query::Query,
    },
    utils,
};

const RESEARCH_SEARCH: &str = "search";
const RESEARCH_DEEP: &str = "deep";

/// Drives post projects through their stages.
pub struct PostFlow {
    store: Arc<Store>,
    generator: Arc<dyn ContentGenerator>,
    search_cache: MemCache<String, Value>,
    /// gap between platforms when confirm has no explicit schedule
    stagger_millis: i64,
    events: Arc<BroadcastQueue<Event>>,
}

impl PostFlow {
    pub fn new(
        store: Arc<Store>,
        generator: Arc<dyn ContentGenerator>,
        events: Arc<BroadcastQueue<Event>>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            generator,
            search_cache: MemCache::new(config.search.cache_capacity),
            stagger_millis: i64::try_from(config.posting.schedule_stagger_secs).unwrap_or(i64::MAX).saturating_mul(1000),
            events,
        }
    }

    /// Pre-draft market research, cached per normalized item.
    pub fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<Value> {
        if request.item_name.trim().is_empty() {
            return Err(CrosslistError::validation("Item name is required"));
        }

        let key = request.cache_key();
        if let Some(cached) = self.search_cache.get(&key) {
            debug!("search cache hit: {}", key);
            return Ok(cached);
        }

        let research = self.generator.research(request)?;
        self.search_cache.set(key, research.clone());
        Ok(research)
    }

    /// Creates a project in `draft`. Research from an earlier search is
    /// attached and logged.
    pub fn create_project(
        &self,
        input: &NewProject,
    ) -> Result<PostProject> {
        let mut project = PostProject::new(input).inspect_err(|e| warn!("create_project rejected: {}", e))?;
        project.update_time = project.create_time;

        let mut changes = ChangeSet::new();
        changes.create(Project::from_model(&project)?);
        if let Some(research) = &project.research {
            changes.create(self.research_row(&project.id, RESEARCH_SEARCH, research)?);
        }
        self.store.commit(&changes)?;

        info!("project {} created ({})", project.id, project.item_name);
        self.publish(&project, ProjectAction::Created);
        Ok(project)
    }

    /// Attaches research, pricing and content strategy. Moves to `research`.
    pub fn run_deep_research(
        &self,
        pid: &str,
    ) -> Result<PostProject> {
        let mut project = self.load_open(pid, "deep research")?;

        let deep = self.generator.deep_research(&project)?;
        let mut changes = ChangeSet::new();
        changes.create(self.research_row(pid, RESEARCH_DEEP, &serde_json::to_value(&deep)?)?);

        project.research = Some(deep.research);
        project.pricing_strategy = Some(deep.pricing_strategy);
        project.content_strategy = Some(deep.content_strategy);

        self.advance(project, Stage::Research, changes)
    }

    /// Generates listing text for every requested platform. Moves to `writing`.
    pub fn generate_content(
        &self,
        pid: &str,
        request: &GenerateContent,
    ) -> Result<PostProject> {
        let mut project = self.load_open(pid, "content generation")?;

        let platforms = utils::normalize_platforms(&request.platforms);
        if platforms.is_empty() {
            warn!("generate_content({}) rejected: no platforms", pid);
            return Err(CrosslistError::validation("At least one platform is required"));
        }

        let mut generated = BTreeMap::new();
        for platform in platforms.iter() {
            generated.insert(platform.clone(), self.generator.generate(&project, platform)?);
        }
        project.platforms = platforms;
        project.generated_content = generated;

        self.advance(project, Stage::Writing, ChangeSet::new())
    }

    /// Processes uploaded images in order. Moves to `images`.
    pub fn process_images(
        &self,
        pid: &str,
        request: &ProcessImages,
    ) -> Result<PostProject> {
        let mut project = self.load_open(pid, "image processing")?;

        if request.images.iter().any(|image| image.trim().is_empty()) {
            return Err(CrosslistError::validation("Image reference must not be empty"));
        }

        let timestamp = utils::time::time_millis();
        let mut changes = ChangeSet::new();
        let mut processed = Vec::with_capacity(request.images.len());
        for (position, source) in request.images.iter().enumerate() {
            let image = self.generator.process_image(&project, source)?;
            changes.create(Image {
                id: utils::longid(),
                pid: pid.to_string(),
                source: source.clone(),
                processed: image.clone(),
                position: position as i64,
                timestamp,
            });
            processed.push(image);
        }
        project.images = processed;

        self.advance(project, Stage::Images, changes)
    }

    /// Merges user customizations, later keys overwriting. Moves to `customize`.
    pub fn customize(
        &self,
        pid: &str,
        customizations: BTreeMap<String, Value>,
    ) -> Result<PostProject> {
        let mut project = self.load_open(pid, "customization")?;
        project.customizations.extend(customizations);

        self.advance(project, Stage::Customize, ChangeSet::new())
    }

    /// Schedules one post per platform. Moves to `confirm`.
    ///
    /// Platforms missing from the request schedule are staggered from now in
    /// platform order.
    pub fn confirm_post(
        &self,
        pid: &str,
        request: &ConfirmPost,
    ) -> Result<PostProject> {
        let mut project = self.load_open(pid, "confirmation")?;

        if project.platforms.is_empty() || project.generated_content.is_empty() {
            warn!("confirm_post({}) rejected: no generated content", pid);
            return Err(CrosslistError::validation("Generate content before confirming the post"));
        }

        let requested: BTreeMap<String, i64> = request.schedule.iter().map(|(platform, at)| (platform.trim().to_lowercase(), *at)).collect();
        let now = utils::time::time_millis();
        let mut changes = ChangeSet::new();
        let mut schedule = BTreeMap::new();
        for (i, platform) in project.platforms.iter().enumerate() {
            let content = project.content_for(platform).ok_or_else(|| CrosslistError::validation(format!("No content generated for {}", platform)))?;
            let offset = i64::try_from(i).unwrap_or(i64::MAX).saturating_mul(self.stagger_millis);
            let scheduled_at = requested.get(platform).copied().unwrap_or(now.saturating_add(offset));

            changes.create(PostHistory {
                id: utils::longid(),
                pid: pid.to_string(),
                platform: platform.clone(),
                content,
                status: PostStatus::Scheduled.as_ref().to_string(),
                scheduled_at,
                posted_at: None,
                timestamp: now,
            });
            schedule.insert(platform.clone(), scheduled_at);
        }
        project.schedule = schedule;

        self.advance(project, Stage::Confirm, changes)
    }

    /// Marks every scheduled post as posted. Moves to `posted`.
    pub fn mark_posted(
        &self,
        pid: &str,
    ) -> Result<PostProject> {
        let project = self.store.load_project(pid)?;
        if project.stage != Stage::Confirm {
            warn!("mark_posted({}) rejected at stage {}", pid, project.stage);
            return Err(CrosslistError::validation(format!("Project must be confirmed before posting (stage is {})", project.stage)));
        }

        let now = utils::time::time_millis();
        let changes = self.restatus_scheduled(pid, PostStatus::Posted, Some(now))?;
        self.advance(project, Stage::Posted, changes)
    }

    /// Records that the scheduled post for `platform` did not go out. The
    /// stage stays `confirm`; `mark_posted` leaves failed posts as they are.
    pub fn mark_failed(
        &self,
        pid: &str,
        platform: &str,
    ) -> Result<PostProject> {
        let project = self.store.load_project(pid)?;
        if project.stage != Stage::Confirm {
            warn!("mark_failed({}) rejected at stage {}", pid, project.stage);
            return Err(CrosslistError::validation(format!("Only confirmed posts can fail (stage is {})", project.stage)));
        }

        let platform = platform.trim().to_lowercase();
        let mut changes = ChangeSet::new();
        for mut row in self.store.project_rows::<PostHistory>(pid)? {
            if row.platform == platform && row.status == PostStatus::Scheduled.as_ref() {
                row.status = PostStatus::Failed.as_ref().to_string();
                changes.update(row);
            }
        }
        if changes.is_empty() {
            return Err(CrosslistError::NotFound(format!("No scheduled {} post for project {}", platform, pid)));
        }
        self.advance(project, Stage::Confirm, changes)
    }

    /// Archives the project, cancelling posts that never went out.
    pub fn archive_project(
        &self,
        pid: &str,
    ) -> Result<PostProject> {
        let project = self.store.load_project(pid)?;
        if project.stage == Stage::Archived {
            return Err(CrosslistError::validation("Project is already archived"));
        }

        let changes = self.restatus_scheduled(pid, PostStatus::Cancelled, None)?;
        self.advance(project, Stage::Archived, changes)
    }

    /// Merges post-hoc performance metrics. The stage is unchanged.
    pub fn update_performance(
        &self,
        pid: &str,
        metrics: BTreeMap<String, Value>,
    ) -> Result<PostProject> {
        let mut project = self.store.load_project(pid)?;
        let read_at = project.update_time;
        project.performance.extend(metrics);
        project.update_time = utils::time::stamp_after(read_at);

        let mut changes = ChangeSet::new();
        changes.update_if(Project::from_model(&project)?, read_at);
        self.store.commit(&changes)?;

        debug!("project {} performance updated", pid);
        self.publish(&project, ProjectAction::Updated);
        Ok(project)
    }

    pub fn get_project(
        &self,
        pid: &str,
    ) -> Result<PostProject> {
        self.store.load_project(pid)
    }

    /// Projects, newest first, optionally limited to one stage.
    pub fn list_projects(
        &self,
        stage: Option<Stage>,
    ) -> Result<Vec<PostProject>> {
        let mut q = Query::new().order_by("create_time", true);
        if let Some(stage) = stage {
            q = q.filter("stage", stage.as_ref());
        }

        self.store.query_all::<Project>(&q)?.iter().map(Project::to_model).collect()
    }

    pub fn research_history(
        &self,
        pid: &str,
    ) -> Result<Vec<Research>> {
        self.ensure_project(pid)?;
        self.store.project_rows::<Research>(pid)
    }

    /// Processed images, oldest batch first, in upload order within a batch.
    pub fn images(
        &self,
        pid: &str,
    ) -> Result<Vec<Image>> {
        self.ensure_project(pid)?;
        let mut rows = self.store.project_rows::<Image>(pid)?;
        rows.sort_by_key(|r| (r.timestamp, r.position));
        Ok(rows)
    }

    /// Post history, oldest confirmation first, by scheduled time within one.
    pub fn post_history(
        &self,
        pid: &str,
    ) -> Result<Vec<PostHistory>> {
        self.ensure_project(pid)?;
        let mut rows = self.store.project_rows::<PostHistory>(pid)?;
        rows.sort_by_key(|r| (r.timestamp, r.scheduled_at));
        Ok(rows)
    }

    /// Removes the project and all of its side-table rows.
    pub fn delete_project(
        &self,
        pid: &str,
    ) -> Result<()> {
        let project = self.store.load_project(pid)?;

        let mut changes = ChangeSet::new();
        for row in self.store.project_rows::<Research>(pid)? {
            changes.delete(StoreIden::Research, row.id);
        }
        for row in self.store.project_rows::<Image>(pid)? {
            changes.delete(StoreIden::Images, row.id);
        }
        for row in self.store.project_rows::<PostHistory>(pid)? {
            changes.delete(StoreIden::Posts, row.id);
        }
        changes.delete(StoreIden::Projects, pid);
        self.store.commit(&changes)?;

        info!("project {} deleted ({} records)", pid, changes.len());
        self.publish(&project, ProjectAction::Deleted);
        Ok(())
    }

    /// Loads a project whose content may still change.
    fn load_open(
        &self,
        pid: &str,
        operation: &str,
    ) -> Result<PostProject> {
        let project = self.store.load_project(pid)?;
        if project.stage.is_locked() {
            warn!("{} for {} rejected at stage {}", operation, pid, project.stage);
            return Err(CrosslistError::validation(format!("Project is already {}; {} is no longer allowed", project.stage, operation)));
        }
        Ok(project)
    }

    fn ensure_project(
        &self,
        pid: &str,
    ) -> Result<()> {
        if self.store.projects().exists(pid)? {
            Ok(())
        } else {
            Err(CrosslistError::NotFound(format!("Project {} not found", pid)))
        }
    }

    /// Commits `changes` plus the project moved to at least `target`.
    ///
    /// The project update only applies if nobody wrote the project since it
    /// was loaded; otherwise nothing is applied and the call fails with
    /// `Conflict`.
    fn advance(
        &self,
        mut project: PostProject,
        target: Stage,
        mut changes: ChangeSet,
    ) -> Result<PostProject> {
        let from = project.stage;
        let read_at = project.update_time;
        project.stage = max(from, target);
        project.update_time = utils::time::stamp_after(read_at);

        changes.update_if(Project::from_model(&project)?, read_at);
        self.store.commit(&changes)?;

        info!("project {}: {} -> {}", project.id, from, project.stage);
        self.publish(&project, ProjectAction::Advanced);
        Ok(project)
    }

    fn research_row(
        &self,
        pid: &str,
        kind: &str,
        data: &Value,
    ) -> Result<Research> {
        Ok(Research {
            id: utils::longid(),
            pid: pid.to_string(),
            kind: kind.to_string(),
            data: serde_json::to_string(data)?,
            timestamp: utils::time::time_millis(),
        })
    }

    fn restatus_scheduled(
        &self,
        pid: &str,
        status: PostStatus,
        posted_at: Option<i64>,
    ) -> Result<ChangeSet> {
        let mut changes = ChangeSet::new();
        for mut row in self.store.project_rows::<PostHistory>(pid)? {
            if row.status == PostStatus::Scheduled.as_ref() {
                row.status = status.as_ref().to_string();
                row.posted_at = posted_at;
                changes.update(row);
            }
        }
        Ok(changes)
    }

    fn publish(
        &self,
        project: &PostProject,
        action: ProjectAction,
    ) {
        // no subscribers is not an error for the caller
        let _ = self.events.send(Event::project(&project.id, action, project.stage));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        content::TemplateGenerator,
        events::ProjectEvent,
        store::{DbStore, MemStore},
    };

    fn post_flow() -> (PostFlow, Arc<Store>) {
        let store = Store::new();
        MemStore::new().init(&store).unwrap();
        let store = Arc::new(store);
        let flow = PostFlow::new(store.clone(), Arc::new(TemplateGenerator::new()), BroadcastQueue::new(64), &Config::default());
        (flow, store)
    }

    fn new_project() -> NewProject {
        let mut input = NewProject::new("Brass lamp", "home");
        input.condition = "good".to_string();
        input.description = "Solid brass, rewired.".to_string();
        input
    }

    fn to_confirm(flow: &PostFlow) -> PostProject {
        let project = flow.create_project(&new_project()).unwrap();
        flow.run_deep_research(&project.id).unwrap();
        flow.generate_content(&project.id, &GenerateContent::new(&["eBay", "mercari"])).unwrap();
        flow.process_images(
            &project.id,
            &ProcessImages {
                images: vec!["a.jpg".into(), "b.jpg".into()],
            },
        )
        .unwrap();
        flow.customize(&project.id, BTreeMap::new()).unwrap();
        flow.confirm_post(&project.id, &ConfirmPost::default()).unwrap()
    }

    #[test]
    fn test_stages_advance_monotonically() {
        let (flow, _) = post_flow();
        let project = flow.create_project(&new_project()).unwrap();
        assert_eq!(project.stage, Stage::Draft);

        let mut stages = vec![project.stage];
        stages.push(flow.run_deep_research(&project.id).unwrap().stage);
        stages.push(flow.generate_content(&project.id, &GenerateContent::new(&["ebay"])).unwrap().stage);
        stages.push(flow.process_images(&project.id, &ProcessImages::default()).unwrap().stage);
        stages.push(flow.customize(&project.id, BTreeMap::new()).unwrap().stage);
        stages.push(flow.confirm_post(&project.id, &ConfirmPost::default()).unwrap().stage);

        assert_eq!(stages, [Stage::Draft, Stage::Research, Stage::Writing, Stage::Images, Stage::Customize, Stage::Confirm]);
        assert_eq!(flow.get_project(&project.id).unwrap().stage, Stage::Confirm);
    }

    #[test]
    fn test_generate_content_without_platforms() {
        let (flow, _) = post_flow();
        let project = flow.create_project(&new_project()).unwrap();
        flow.run_deep_research(&project.id).unwrap();

        let err = flow.generate_content(&project.id, &GenerateContent::new(&[" ", ""])).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.messages(), ["At least one platform is required"]);

        let stored = flow.get_project(&project.id).unwrap();
        assert_eq!(stored.stage, Stage::Research);
        assert!(stored.generated_content.is_empty());
    }

    #[test]
    fn test_unknown_project_is_not_found() {
        let (flow, _) = post_flow();
        let err = flow.generate_content("missing", &GenerateContent::new::<&str>(&[])).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Project missing not found");
        assert!(flow.run_deep_research("missing").unwrap_err().is_not_found());
        assert!(flow.post_history("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_create_project_validation() {
        let (flow, store) = post_flow();
        let err = flow.create_project(&NewProject::new("", "home")).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(store.projects().query(&Query::new()).unwrap().count, 0);
    }

    #[test]
    fn test_create_project_logs_search_research() {
        let (flow, _) = post_flow();
        let research = flow.search(&SearchRequest::new("Brass lamp")).unwrap();
        let mut input = new_project();
        input.research = Some(research.clone());

        let project = flow.create_project(&input).unwrap();
        let history = flow.research_history(&project.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, "search");
        assert_eq!(serde_json::from_str::<Value>(&history[0].data).unwrap(), research);
    }

    #[test]
    fn test_search_is_cached() {
        let (flow, _) = post_flow();
        let first = flow.search(&SearchRequest::new("Brass Lamp")).unwrap();
        let second = flow.search(&SearchRequest::new(" brass lamp ")).unwrap();
        assert_eq!(first, second);
        assert!(flow.search(&SearchRequest::new("  ")).unwrap_err().is_validation());
    }

    #[test]
    fn test_redo_keeps_later_stage() {
        let (flow, _) = post_flow();
        let project = flow.create_project(&new_project()).unwrap();
        flow.run_deep_research(&project.id).unwrap();
        flow.generate_content(&project.id, &GenerateContent::new(&["ebay"])).unwrap();

        let project = flow.run_deep_research(&project.id).unwrap();
        assert_eq!(project.stage, Stage::Writing);
        assert_eq!(flow.research_history(&project.id).unwrap().len(), 2);

        let project = flow.generate_content(&project.id, &GenerateContent::new(&["Mercari", "mercari"])).unwrap();
        assert_eq!(project.platforms, ["mercari"]);
        assert_eq!(project.generated_content.keys().collect::<Vec<_>>(), ["mercari"]);
    }

    #[test]
    fn test_confirm_requires_content() {
        let (flow, _) = post_flow();
        let project = flow.create_project(&new_project()).unwrap();
        let err = flow.confirm_post(&project.id, &ConfirmPost::default()).unwrap_err();
        assert!(err.is_validation());
        assert!(flow.post_history(&project.id).unwrap().is_empty());
        assert_eq!(flow.get_project(&project.id).unwrap().stage, Stage::Draft);
    }

    #[test]
    fn test_confirm_schedules_every_platform() {
        let (flow, _) = post_flow();
        let project = flow.create_project(&new_project()).unwrap();
        flow.generate_content(&project.id, &GenerateContent::new(&["ebay", "mercari", "facebook"])).unwrap();
        flow.customize(&project.id, BTreeMap::from([("content".to_string(), json!({"mercari": "My own words"}))])).unwrap();

        let request = ConfirmPost {
            schedule: BTreeMap::from([("EBAY".to_string(), 42)]),
        };
        let project = flow.confirm_post(&project.id, &request).unwrap();
        assert_eq!(project.schedule["ebay"], 42);
        assert_eq!(project.schedule["facebook"] - project.schedule["mercari"], 300_000);

        let history = flow.post_history(&project.id).unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|h| h.status == "scheduled" && h.posted_at.is_none()));
        let mercari = history.iter().find(|h| h.platform == "mercari").unwrap();
        assert_eq!(mercari.content, "My own words");
    }

    #[test]
    fn test_locked_after_confirm() {
        let (flow, _) = post_flow();
        let project = to_confirm(&flow);

        let err = flow.customize(&project.id, BTreeMap::new()).unwrap_err();
        assert!(err.is_validation());
        assert!(flow.generate_content(&project.id, &GenerateContent::new(&["ebay"])).unwrap_err().is_validation());
        assert!(flow.confirm_post(&project.id, &ConfirmPost::default()).unwrap_err().is_validation());
        assert_eq!(flow.post_history(&project.id).unwrap().len(), 2);
    }

    #[test]
    fn test_mark_posted_and_archive() {
        let (flow, _) = post_flow();
        let draft = flow.create_project(&new_project()).unwrap();
        assert!(flow.mark_posted(&draft.id).unwrap_err().is_validation());

        let project = to_confirm(&flow);
        let project = flow.mark_posted(&project.id).unwrap();
        assert_eq!(project.stage, Stage::Posted);
        assert!(flow.post_history(&project.id).unwrap().iter().all(|h| h.status == "posted" && h.posted_at.is_some()));

        let project = flow.archive_project(&project.id).unwrap();
        assert_eq!(project.stage, Stage::Archived);
        assert!(flow.post_history(&project.id).unwrap().iter().all(|h| h.status == "posted"));
        assert!(flow.archive_project(&project.id).unwrap_err().is_validation());
    }

    #[test]
    fn test_failed_post_survives_mark_posted() {
        let (flow, _) = post_flow();
        let project = to_confirm(&flow);

        let failed = flow.mark_failed(&project.id, "Mercari").unwrap();
        assert_eq!(failed.stage, Stage::Confirm);
        assert!(flow.mark_failed(&project.id, "mercari").unwrap_err().is_not_found());

        flow.mark_posted(&project.id).unwrap();
        let history = flow.post_history(&project.id).unwrap();
        let status = |platform: &str| history.iter().find(|h| h.platform == platform).map(|h| h.status.clone()).unwrap();
        assert_eq!(status("ebay"), "posted");
        assert_eq!(status("mercari"), "failed");
        assert!(flow.mark_failed(&project.id, "ebay").unwrap_err().is_validation());
    }

    #[test]
    fn test_concurrent_confirm_writes_one_schedule() {
        let (flow, _) = post_flow();
        let project = flow.create_project(&new_project()).unwrap();
        flow.generate_content(&project.id, &GenerateContent::new(&["ebay", "mercari"])).unwrap();

        let results: Vec<Result<PostProject>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| flow.confirm_post(&project.id, &ConfirmPost::default()))).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| e.is_conflict() || e.is_validation()));
        assert_eq!(flow.post_history(&project.id).unwrap().len(), 2);
    }

    #[test]
    fn test_stale_transition_applies_nothing() {
        let (flow, store) = post_flow();
        let project = flow.create_project(&new_project()).unwrap();
        let stale = store.load_project(&project.id).unwrap();
        flow.generate_content(&project.id, &GenerateContent::new(&["ebay"])).unwrap();

        let err = flow.advance(stale, Stage::Research, ChangeSet::new()).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(flow.get_project(&project.id).unwrap().stage, Stage::Writing);
    }

    #[test]
    fn test_stagger_saturates() {
        let store = Store::new();
        MemStore::new().init(&store).unwrap();
        let mut config = Config::default();
        config.posting.schedule_stagger_secs = u64::MAX;
        let flow = PostFlow::new(Arc::new(store), Arc::new(TemplateGenerator::new()), BroadcastQueue::new(8), &config);
        assert_eq!(flow.stagger_millis, i64::MAX);

        let project = flow.create_project(&new_project()).unwrap();
        flow.generate_content(&project.id, &GenerateContent::new(&["ebay", "mercari"])).unwrap();
        let project = flow.confirm_post(&project.id, &ConfirmPost::default()).unwrap();
        assert_eq!(project.schedule["mercari"], i64::MAX);
        assert!(project.schedule["ebay"] > 0);
    }

    #[test]
    fn test_archive_cancels_scheduled_posts() {
        let (flow, _) = post_flow();
        let project = to_confirm(&flow);
        flow.archive_project(&project.id).unwrap();
        assert!(flow.post_history(&project.id).unwrap().iter().all(|h| h.status == "cancelled"));
    }

    #[test]
    fn test_images_keep_upload_order() {
        let (flow, _) = post_flow();
        let project = flow.create_project(&new_project()).unwrap();
        let request = ProcessImages {
            images: vec!["c.jpg".into(), "a.jpg".into(), "b.jpg".into()],
        };
        let project = flow.process_images(&project.id, &request).unwrap();
        assert_eq!(project.images.len(), 3);

        let rows = flow.images(&project.id).unwrap();
        assert_eq!(rows.iter().map(|r| r.source.as_str()).collect::<Vec<_>>(), ["c.jpg", "a.jpg", "b.jpg"]);

        let bad = ProcessImages {
            images: vec!["d.jpg".into(), " ".into()],
        };
        assert!(flow.process_images(&project.id, &bad).unwrap_err().is_validation());
        assert_eq!(flow.images(&project.id).unwrap().len(), 3);
    }

    #[test]
    fn test_update_performance_keeps_stage() {
        let (flow, _) = post_flow();
        let project = to_confirm(&flow);
        let project = flow.update_performance(&project.id, BTreeMap::from([("views".to_string(), json!(120))])).unwrap();
        assert_eq!(project.stage, Stage::Confirm);
        assert_eq!(flow.get_project(&project.id).unwrap().performance["views"], json!(120));
    }

    #[test]
    fn test_list_projects_by_stage() {
        let (flow, _) = post_flow();
        let a = flow.create_project(&new_project()).unwrap();
        let b = flow.create_project(&new_project()).unwrap();
        flow.run_deep_research(&b.id).unwrap();

        assert_eq!(flow.list_projects(None).unwrap().len(), 2);
        let drafts = flow.list_projects(Some(Stage::Draft)).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, a.id);
    }

    #[test]
    fn test_delete_project_removes_side_rows() {
        let (flow, store) = post_flow();
        let project = to_confirm(&flow);
        let other = to_confirm(&flow);

        flow.delete_project(&project.id).unwrap();
        assert!(flow.get_project(&project.id).unwrap_err().is_not_found());
        assert!(store.project_rows::<PostHistory>(&project.id).unwrap().is_empty());
        assert!(store.project_rows::<Image>(&project.id).unwrap().is_empty());
        assert!(store.project_rows::<Research>(&project.id).unwrap().is_empty());
        assert_eq!(flow.post_history(&other.id).unwrap().len(), 2);
        assert!(flow.delete_project(&project.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_transitions_publish_events() {
        let (flow, _) = post_flow();
        let mut rx = flow.events.subscribe();
        let project = flow.create_project(&new_project()).unwrap();
        flow.run_deep_research(&project.id).unwrap();

        let created = rx.try_recv().unwrap();
        let advanced = rx.try_recv().unwrap();
        assert!(matches!(created, Event::Project(ProjectEvent { action: ProjectAction::Created, stage: Stage::Draft, .. })));
        assert!(matches!(advanced, Event::Project(ProjectEvent { action: ProjectAction::Advanced, stage: Stage::Research, .. })));
    }
}
