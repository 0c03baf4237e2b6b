use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    CrosslistError, Result,
    common::BroadcastQueue,
    events::Event,
    flow::{FlowValidation, validate_flow},
    model::{FlowConnection, FlowModel, FlowNode, FlowStatus, Position},
    store::{
        ChangeSet, Store, StoreIden,
        data::Flow,
        query::Query,
    },
    utils,
};

/// Stores automation flows and applies editor operations to them.
pub struct FlowService {
    store: Arc<Store>,
    events: Arc<BroadcastQueue<Event>>,
}

impl FlowService {
    pub fn new(
        store: Arc<Store>,
        events: Arc<BroadcastQueue<Event>>,
    ) -> Self {
        Self {
            store,
            events,
        }
    }

    /// Stores a new flow in `draft`. An empty id is generated.
    pub fn create_flow(
        &self,
        mut flow: FlowModel,
    ) -> Result<FlowModel> {
        if flow.name.trim().is_empty() {
            return Err(CrosslistError::validation("Flow name is required"));
        }
        if flow.id.is_empty() {
            flow.id = utils::longid();
        } else if self.store.flows().exists(&flow.id)? {
            return Err(CrosslistError::validation(format!("Flow {} already exists", flow.id)));
        }

        let now = utils::time::time_millis();
        flow.status = FlowStatus::Draft;
        flow.stats = Default::default();
        flow.create_time = now;
        flow.update_time = now;

        let mut changes = ChangeSet::new();
        changes.create(Flow::from_model(&flow)?);
        self.store.commit(&changes)?;

        info!("flow {} created ({})", flow.id, flow.name);
        self.publish(&flow, false);
        Ok(flow)
    }

    pub fn get_flow(
        &self,
        fid: &str,
    ) -> Result<FlowModel> {
        self.store.load_flow(fid)
    }

    /// Flows, most recently updated first, optionally limited to one status.
    pub fn list_flows(
        &self,
        status: Option<FlowStatus>,
    ) -> Result<Vec<FlowModel>> {
        let mut q = Query::new().order_by("update_time", true);
        if let Some(status) = status {
            q = q.filter("status", status.as_ref());
        }

        self.store.query_all::<Flow>(&q)?.iter().map(Flow::to_model).collect()
    }

    /// Replaces the editable definition of a stored flow. Status and
    /// statistics stay as stored.
    pub fn save_flow(
        &self,
        flow: &FlowModel,
    ) -> Result<FlowModel> {
        self.edit(&flow.id, |stored| {
            if flow.name.trim().is_empty() {
                return Err(CrosslistError::validation("Flow name is required"));
            }
            stored.name = flow.name.clone();
            stored.description = flow.description.clone();
            stored.nodes = flow.nodes.clone();
            stored.connections = flow.connections.clone();
            stored.variables = flow.variables.clone();
            stored.settings = flow.settings.clone();
            Ok(())
        })
    }

    pub fn delete_flow(
        &self,
        fid: &str,
    ) -> Result<()> {
        let flow = self.store.load_flow(fid)?;

        let mut changes = ChangeSet::new();
        changes.delete(StoreIden::Flows, fid);
        self.store.commit(&changes)?;

        info!("flow {} deleted", fid);
        self.publish(&flow, true);
        Ok(())
    }

    /// Appends a node. An empty node id is generated.
    pub fn add_node(
        &self,
        fid: &str,
        mut node: FlowNode,
    ) -> Result<FlowModel> {
        self.edit(fid, |flow| {
            if node.id.is_empty() {
                node.id = utils::longid();
            } else if flow.has_node(&node.id) {
                return Err(CrosslistError::validation(format!("Node {} already exists", node.id)));
            }
            flow.nodes.push(node);
            Ok(())
        })
    }

    pub fn move_node(
        &self,
        fid: &str,
        nid: &str,
        position: Position,
    ) -> Result<FlowModel> {
        self.edit(fid, |flow| {
            let node = flow.nodes.iter_mut().find(|n| n.id == nid).ok_or_else(|| node_not_found(nid))?;
            node.position = position;
            Ok(())
        })
    }

    /// Removes a node and every connection touching it.
    pub fn remove_node(
        &self,
        fid: &str,
        nid: &str,
    ) -> Result<FlowModel> {
        self.edit(fid, |flow| {
            if !flow.has_node(nid) {
                return Err(node_not_found(nid));
            }
            flow.nodes.retain(|n| n.id != nid);
            flow.connections.retain(|c| c.source != nid && c.target != nid);
            Ok(())
        })
    }

    /// Connects two existing nodes. An empty connection id is generated.
    pub fn add_connection(
        &self,
        fid: &str,
        mut connection: FlowConnection,
    ) -> Result<FlowModel> {
        self.edit(fid, |flow| {
            for endpoint in [&connection.source, &connection.target] {
                if !flow.has_node(endpoint) {
                    return Err(node_not_found(endpoint));
                }
            }
            if flow.connections.iter().any(|c| c.source == connection.source && c.target == connection.target) {
                return Err(CrosslistError::validation(format!("Connection from {} to {} already exists", connection.source, connection.target)));
            }
            if connection.id.is_empty() {
                connection.id = utils::longid();
            } else if flow.connections.iter().any(|c| c.id == connection.id) {
                return Err(CrosslistError::validation(format!("Connection {} already exists", connection.id)));
            }
            flow.connections.push(connection);
            Ok(())
        })
    }

    pub fn remove_connection(
        &self,
        fid: &str,
        cid: &str,
    ) -> Result<FlowModel> {
        self.edit(fid, |flow| {
            let before = flow.connections.len();
            flow.connections.retain(|c| c.id != cid);
            if flow.connections.len() == before {
                return Err(CrosslistError::NotFound(format!("Connection {} not found", cid)));
            }
            Ok(())
        })
    }

    pub fn validate(
        &self,
        fid: &str,
    ) -> Result<FlowValidation> {
        let flow = self.store.load_flow(fid)?;
        Ok(validate_flow(&flow))
    }

    /// Activates a flow that passes validation; otherwise fails with the
    /// validator's messages.
    pub fn activate(
        &self,
        fid: &str,
    ) -> Result<FlowModel> {
        self.set_status(fid, FlowStatus::Active, |flow| {
            if flow.status == FlowStatus::Archived {
                return Err(CrosslistError::validation("Archived flows cannot be activated"));
            }
            let validation = validate_flow(flow);
            if !validation.is_valid {
                warn!("flow {} activation rejected: {}", flow.id, validation.errors.join("; "));
                return Err(CrosslistError::Validation(validation.errors));
            }
            Ok(())
        })
    }

    pub fn pause(
        &self,
        fid: &str,
    ) -> Result<FlowModel> {
        self.set_status(fid, FlowStatus::Paused, |flow| {
            if flow.status != FlowStatus::Active {
                return Err(CrosslistError::validation(format!("Only active flows can be paused (status is {})", flow.status)));
            }
            Ok(())
        })
    }

    pub fn archive(
        &self,
        fid: &str,
    ) -> Result<FlowModel> {
        self.set_status(fid, FlowStatus::Archived, |flow| {
            if flow.status == FlowStatus::Archived {
                return Err(CrosslistError::validation("Flow is already archived"));
            }
            Ok(())
        })
    }

    /// Counts one execution and folds its duration into the running average.
    pub fn record_execution(
        &self,
        fid: &str,
        success: bool,
        duration_ms: u64,
    ) -> Result<FlowModel> {
        let mut flow = self.store.load_flow(fid)?;
        let read_at = flow.update_time;
        let stats = &mut flow.stats;
        if stats.total_executions >= flow.settings.max_executions {
            return Err(CrosslistError::validation(format!("Flow has reached its execution limit of {}", flow.settings.max_executions)));
        }

        let n = stats.total_executions as f64;
        stats.average_duration = (stats.average_duration * n + duration_ms as f64) / (n + 1.0);
        stats.total_executions += 1;
        if success {
            stats.successful_executions += 1;
        } else {
            stats.failed_executions += 1;
        }
        let now = utils::time::stamp_after(read_at);
        stats.last_executed = Some(now);
        flow.update_time = now;

        self.commit(&flow, read_at)?;
        debug!("flow {} execution recorded (success: {}, {}ms)", fid, success, duration_ms);
        Ok(flow)
    }

    /// Loads a flow that may still be edited, applies `f` and stores it.
    /// An active flow must still validate after the edit.
    fn edit<F>(
        &self,
        fid: &str,
        f: F,
    ) -> Result<FlowModel>
    where
        F: FnOnce(&mut FlowModel) -> Result<()>,
    {
        let mut flow = self.store.load_flow(fid)?;
        if flow.status == FlowStatus::Archived {
            return Err(CrosslistError::validation("Archived flows cannot be edited"));
        }
        let read_at = flow.update_time;
        f(&mut flow)?;
        if flow.status == FlowStatus::Active {
            let validation = validate_flow(&flow);
            if !validation.is_valid {
                warn!("edit of active flow {} rejected: {}", fid, validation.errors.join("; "));
                return Err(CrosslistError::Validation(validation.errors));
            }
        }
        flow.update_time = utils::time::stamp_after(read_at);

        self.commit(&flow, read_at)?;
        debug!("flow {} updated", fid);
        self.publish(&flow, false);
        Ok(flow)
    }

    fn set_status<F>(
        &self,
        fid: &str,
        status: FlowStatus,
        check: F,
    ) -> Result<FlowModel>
    where
        F: FnOnce(&FlowModel) -> Result<()>,
    {
        let mut flow = self.store.load_flow(fid)?;
        check(&flow)?;

        let from = flow.status;
        let read_at = flow.update_time;
        flow.status = status;
        flow.update_time = utils::time::stamp_after(read_at);
        self.commit(&flow, read_at)?;

        info!("flow {}: {} -> {}", fid, from, status);
        self.publish(&flow, false);
        Ok(flow)
    }

    /// Writes `flow` back unless it changed since it was read at `read_at`.
    fn commit(
        &self,
        flow: &FlowModel,
        read_at: i64,
    ) -> Result<()> {
        let mut changes = ChangeSet::new();
        changes.update_if(Flow::from_model(flow)?, read_at);
        self.store.commit(&changes)
    }

    fn publish(
        &self,
        flow: &FlowModel,
        deleted: bool,
    ) {
        let _ = self.events.send(Event::flow(&flow.id, flow.status, deleted));
    }
}

fn node_not_found(nid: &str) -> CrosslistError {
    CrosslistError::NotFound(format!("Node {} not found", nid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::NodeType,
        store::{DbStore, MemStore},
    };

    fn service() -> FlowService {
        let store = Store::new();
        MemStore::new().init(&store).unwrap();
        FlowService::new(Arc::new(store), BroadcastQueue::new(64))
    }

    fn new_flow(service: &FlowService) -> FlowModel {
        let flow = FlowModel {
            name: "Lead follow-up".to_string(),
            ..Default::default()
        };
        service.create_flow(flow).unwrap()
    }

    fn valid_flow(service: &FlowService) -> FlowModel {
        let flow = new_flow(service);
        service.add_node(&flow.id, FlowNode::new("n1", NodeType::Trigger, "New lead")).unwrap();
        service.add_node(&flow.id, FlowNode::new("n2", NodeType::Sms, "Text buyer")).unwrap();
        service.add_connection(&flow.id, FlowConnection::new("c1", "n1", "n2")).unwrap()
    }

    #[test]
    fn test_create_flow() {
        let service = service();
        let flow = new_flow(&service);
        assert!(!flow.id.is_empty());
        assert_eq!(flow.status, FlowStatus::Draft);
        assert_eq!(service.get_flow(&flow.id).unwrap(), flow);

        let err = service.create_flow(FlowModel::default()).unwrap_err();
        assert_eq!(err.messages(), ["Flow name is required"]);
    }

    #[test]
    fn test_unknown_flow() {
        let service = service();
        let err = service.get_flow("nope").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Flow nope not found");
        assert!(service.activate("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_node_edits() {
        let service = service();
        let flow = valid_flow(&service);

        let flow = service.move_node(&flow.id, "n2", Position { x: 4.0, y: 2.0 }).unwrap();
        assert_eq!(flow.node("n2").unwrap().position, Position { x: 4.0, y: 2.0 });
        assert!(service.move_node(&flow.id, "n9", Position::default()).unwrap_err().is_not_found());
        assert!(service.add_node(&flow.id, FlowNode::new("n1", NodeType::Action, "Dup")).unwrap_err().is_validation());

        let flow = service.remove_node(&flow.id, "n2").unwrap();
        assert_eq!(flow.nodes.len(), 1);
        assert!(flow.connections.is_empty());
    }

    #[test]
    fn test_connection_edits() {
        let service = service();
        let flow = valid_flow(&service);

        assert!(service.add_connection(&flow.id, FlowConnection::new("c2", "n1", "ghost")).unwrap_err().is_not_found());
        assert!(service.add_connection(&flow.id, FlowConnection::new("c2", "n1", "n2")).unwrap_err().is_validation());

        let flow = service.add_connection(&flow.id, FlowConnection::new("", "n2", "n1")).unwrap();
        assert_eq!(flow.connections.len(), 2);
        assert!(!flow.connections[1].id.is_empty());

        let flow = service.remove_connection(&flow.id, "c1").unwrap();
        assert_eq!(flow.connections.len(), 1);
        assert!(service.remove_connection(&flow.id, "c1").unwrap_err().is_not_found());
    }

    #[test]
    fn test_activate_requires_valid_flow() {
        let service = service();
        let flow = new_flow(&service);
        service.add_node(&flow.id, FlowNode::new("n1", NodeType::Trigger, "New lead")).unwrap();
        service.add_node(&flow.id, FlowNode::new("n2", NodeType::Action, "Reply")).unwrap();

        let err = service.activate(&flow.id).unwrap_err();
        assert_eq!(err.messages(), ["Node \"Reply\" is not connected to the flow"]);
        assert_eq!(service.get_flow(&flow.id).unwrap().status, FlowStatus::Draft);

        service.add_connection(&flow.id, FlowConnection::new("c1", "n1", "n2")).unwrap();
        assert!(service.validate(&flow.id).unwrap().is_valid);
        assert_eq!(service.activate(&flow.id).unwrap().status, FlowStatus::Active);
    }

    #[test]
    fn test_save_active_flow_must_stay_valid() {
        let service = service();
        let flow = valid_flow(&service);
        service.activate(&flow.id).unwrap();

        let mut edited = service.get_flow(&flow.id).unwrap();
        edited.connections.clear();
        assert!(service.save_flow(&edited).unwrap_err().is_validation());

        let mut renamed = service.get_flow(&flow.id).unwrap();
        renamed.name = "Lead follow-up v2".to_string();
        renamed.status = FlowStatus::Archived;
        let saved = service.save_flow(&renamed).unwrap();
        assert_eq!(saved.name, "Lead follow-up v2");
        assert_eq!(saved.status, FlowStatus::Active);
    }

    #[test]
    fn test_edits_keep_active_flow_valid() {
        let service = service();
        let flow = valid_flow(&service);
        let active = service.activate(&flow.id).unwrap();

        let err = service.remove_connection(&flow.id, "c1").unwrap_err();
        assert_eq!(err.messages(), ["Node \"Text buyer\" is not connected to the flow"]);
        assert_eq!(service.get_flow(&flow.id).unwrap(), active);

        let err = service.add_connection(&flow.id, FlowConnection::new("c2", "n2", "n2")).unwrap_err();
        assert!(err.is_validation());
        assert!(service.add_node(&flow.id, FlowNode::new("n3", NodeType::Email, "Mail")).unwrap_err().is_validation());
        assert_eq!(service.get_flow(&flow.id).unwrap(), active);

        // paused flows may pass through invalid states
        service.pause(&flow.id).unwrap();
        let flow = service.remove_connection(&flow.id, "c1").unwrap();
        assert!(flow.connections.is_empty());
        assert!(service.activate(&flow.id).unwrap_err().is_validation());
    }

    #[test]
    fn test_stale_write_is_rejected() {
        let service = service();
        let flow = valid_flow(&service);
        let stale = service.get_flow(&flow.id).unwrap();
        service.move_node(&flow.id, "n1", Position { x: 1.0, y: 1.0 }).unwrap();

        let mut changes = ChangeSet::new();
        changes.update_if(Flow::from_model(&stale).unwrap(), stale.update_time);
        assert!(service.store.commit(&changes).unwrap_err().is_conflict());
        assert_eq!(service.get_flow(&flow.id).unwrap().node("n1").unwrap().position, Position { x: 1.0, y: 1.0 });
    }

    #[test]
    fn test_status_changes() {
        let service = service();
        let flow = valid_flow(&service);
        assert!(service.pause(&flow.id).unwrap_err().is_validation());

        service.activate(&flow.id).unwrap();
        assert_eq!(service.pause(&flow.id).unwrap().status, FlowStatus::Paused);
        assert_eq!(service.archive(&flow.id).unwrap().status, FlowStatus::Archived);
        assert!(service.archive(&flow.id).unwrap_err().is_validation());
        assert!(service.activate(&flow.id).unwrap_err().is_validation());
        assert!(service.add_node(&flow.id, FlowNode::new("n3", NodeType::Email, "Mail")).unwrap_err().is_validation());
    }

    #[test]
    fn test_list_and_delete() {
        let service = service();
        let a = valid_flow(&service);
        let b = new_flow(&service);
        service.activate(&a.id).unwrap();

        assert_eq!(service.list_flows(None).unwrap().len(), 2);
        let active = service.list_flows(Some(FlowStatus::Active)).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, a.id);

        service.delete_flow(&b.id).unwrap();
        assert!(service.get_flow(&b.id).unwrap_err().is_not_found());
        assert!(service.delete_flow(&b.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_record_execution() {
        let service = service();
        let mut flow = valid_flow(&service);
        flow.settings.max_executions = 2;
        service.save_flow(&flow).unwrap();

        service.record_execution(&flow.id, true, 100).unwrap();
        let flow = service.record_execution(&flow.id, false, 300).unwrap();
        assert_eq!(flow.stats.total_executions, 2);
        assert_eq!(flow.stats.successful_executions, 1);
        assert_eq!(flow.stats.failed_executions, 1);
        assert_eq!(flow.stats.average_duration, 200.0);
        assert!(flow.stats.last_executed.is_some());

        let err = service.record_execution(&flow.id, true, 10).unwrap_err();
        assert_eq!(err.messages(), ["Flow has reached its execution limit of 2"]);
    }
}
