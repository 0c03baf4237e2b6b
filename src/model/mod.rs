mod flow;
mod project;
mod stage;

pub use flow::{FlowConnection, FlowModel, FlowNode, FlowSettings, FlowStats, FlowStatus, NodeType, Position};
pub use project::{ConfirmPost, GenerateContent, NewProject, PostProject, ProcessImages, SearchRequest};
pub use stage::{PostStatus, Stage};
