//! # Crosslist
//!
//! Crosslist is the core of a marketplace cross-posting dashboard. A seller
//! enters an item once; the crate researches it, generates listing copy per
//! platform, processes images, schedules the posts and tracks the outcome.
//! It also stores and validates the lead-automation flows the dashboard edits.
//!
//! ## Core Features
//!
//! - **Post workflow**: `draft → research → writing → images → customize →
//!   confirm → posted → archived`, each step gated on its inputs
//! - **Flow validation**: trigger presence, orphaned nodes and cycle detection
//! - **Atomic transitions**: every stage change commits as one change set
//! - **Pluggable storage**: in-memory storage (testing) and SQLite (persistent)
//! - **Pluggable content**: research and copy come from a [`ContentGenerator`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crosslist::{Config, Dashboard, GenerateContent, NewProject};
//!
//! let dashboard = Dashboard::new_with_config(Config::default())?;
//! let posts = dashboard.posts();
//!
//! let project = posts.create_project(&NewProject::new("Brass lamp", "home"))?;
//! posts.run_deep_research(&project.id)?;
//! posts.generate_content(&project.id, &GenerateContent::new(&["ebay", "mercari"]))?;
//! ```

mod builder;
mod common;
mod config;
pub mod content;
mod dashboard;
mod error;
pub mod events;
pub mod flow;
mod model;
pub mod post;
pub mod response;
pub mod store;
mod utils;

use std::sync::{Arc, RwLock};

pub use builder::DashboardBuilder;
pub use config::{Config, PostingConfig, SearchConfig, SqliteConfig, StoreConfig, StoreType};
pub use content::{ContentGenerator, DeepResearch, TemplateGenerator};
pub use dashboard::Dashboard;
pub use error::CrosslistError;
pub use events::{Event, FlowEvent, ProjectAction, ProjectEvent};
pub use flow::{FlowService, FlowValidation, validate_flow};
pub use model::*;
pub use post::PostFlow;
pub use response::ApiResponse;

/// Result type alias for Crosslist operations.
pub type Result<T> = std::result::Result<T, CrosslistError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
