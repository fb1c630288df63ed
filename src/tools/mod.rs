//! Tools the ReAct loop can call: a mock calendar and a mock contact directory.

pub mod calendar;
pub mod contact;
pub mod registry;
pub mod tool;

pub use calendar::{CalendarResult, MockCalendar, ReadCalendarTool};
pub use contact::{ContactDirectory, ContactResult, LookupContactTool};
pub use registry::ToolRegistry;
pub use tool::Tool;
