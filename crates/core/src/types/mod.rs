//! Domain types for the presence sensor

mod command;
mod event;
mod link;
mod report;

pub use command::CommandFrame;
pub use event::DisplayEvent;
pub use link::LinkState;
pub use report::{DataType, ReportFrame, TargetStatus};
