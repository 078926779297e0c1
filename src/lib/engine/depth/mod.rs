//! Depth records and the readers that produce them.

pub mod reader;
pub mod record;

pub use reader::{DepthFormat, DepthReader};
pub use record::{Coverage, DepthRecord};
