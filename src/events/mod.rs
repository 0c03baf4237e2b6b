//! Events published to dashboard subscribers after a change is committed.

use serde::Serialize;

use crate::model::{FlowStatus, Stage};

/// Top-level dashboard event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Project(ProjectEvent),
    Flow(FlowEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEvent {
    pub pid: String,
    pub action: ProjectAction,
    pub stage: Stage,
    pub timestamp: i64,
}

/// What happened to a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectAction {
    Created,
    Advanced,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEvent {
    pub fid: String,
    pub status: FlowStatus,
    pub deleted: bool,
    pub timestamp: i64,
}

impl Event {
    pub fn project(
        pid: &str,
        action: ProjectAction,
        stage: Stage,
    ) -> Self {
        Event::Project(ProjectEvent {
            pid: pid.to_string(),
            action,
            stage,
            timestamp: crate::utils::time::time_millis(),
        })
    }

    pub fn flow(
        fid: &str,
        status: FlowStatus,
        deleted: bool,
    ) -> Self {
        Event::Flow(FlowEvent {
            fid: fid.to_string(),
            status,
            deleted,
            timestamp: crate::utils::time::time_millis(),
        })
    }
}
