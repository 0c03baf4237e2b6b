use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{CrosslistError, Result};

/// Lifecycle status of an automation flow.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlowStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Archived,
}

/// Type tag of a flow node.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeType {
    Trigger,
    #[default]
    Action,
    Condition,
    Delay,
    Webhook,
    Email,
    Sms,
    Notification,
}

/// Canvas position, presentation only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl FlowNode {
    pub fn new(
        id: impl Into<String>,
        node_type: NodeType,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn is_trigger(&self) -> bool {
        self.node_type == NodeType::Trigger
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowConnection {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FlowConnection {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowSettings {
    /// execution timeout in milliseconds
    pub timeout: u64,
    pub retry_count: u32,
    /// delay between retries in milliseconds
    pub retry_delay: u64,
    pub max_executions: u64,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            timeout: 30_000,
            retry_count: 3,
            retry_delay: 1_000,
            max_executions: 1_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowStats {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    /// running mean in milliseconds
    pub average_duration: f64,
    pub last_executed: Option<i64>,
}

/// A user-authored automation graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowModel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: FlowStatus,
    pub nodes: Vec<FlowNode>,
    pub connections: Vec<FlowConnection>,
    pub variables: HashMap<String, serde_json::Value>,
    pub settings: FlowSettings,
    pub stats: FlowStats,
    pub create_time: i64,
    pub update_time: i64,
}

impl FlowModel {
    pub fn from_json(s: &str) -> Result<Self> {
        let flow = serde_json::from_str::<FlowModel>(s);
        match flow {
            Ok(v) => Ok(v),
            Err(e) => Err(CrosslistError::Convert(format!("invalid flow data: {}", e))),
        }
    }

    pub fn node(
        &self,
        id: &str,
    ) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_node(
        &self,
        id: &str,
    ) -> bool {
        self.node(id).is_some()
    }
}
