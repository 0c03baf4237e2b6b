mod flow;
mod image;
mod post;
mod project;
mod research;

pub use flow::Flow;
pub use image::Image;
pub use post::PostHistory;
pub use project::Project;
pub use research::Research;
