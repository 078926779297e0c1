pub mod batch;
pub mod calculate;
pub mod common;
pub mod db;
pub mod export;
pub mod link;
pub mod load;
pub mod sambamba;

pub use batch::{run_batch, BatchArgs};
pub use calculate::{run_calculate, CalculateArgs};
pub use common::GlobalArgs;
pub use db::{run_db, DbArgs};
pub use export::{run_export, ExportArgs};
pub use link::{run_link, LinkArgs};
pub use load::{run_load, LoadArgs};
pub use sambamba::{run_sambamba, SambambaArgs};
