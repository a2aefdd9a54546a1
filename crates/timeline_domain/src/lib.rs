pub mod columns;
pub mod credentials;
pub mod grouping;
pub mod layout;
pub mod position;
pub mod range;
pub mod service;
pub mod source;
pub mod status;
pub mod task;

pub use crate::layout::{build_layout, LayoutConfig, TimelineLayout};
pub use crate::service::{TimelineService, TimelineServiceBuilder};
pub use crate::task::{Task, NO_PLAN};
