//! The fallback browser-automation tool surface: the static catalog, page
//! discovery, semantic locators, and the tool executor dispatcher.

pub mod catalog;
pub mod discovery;
pub mod executor;
pub mod locator;

pub use catalog::{category_for, fallback_catalog, ToolCategory, ToolDescriptor};
pub use discovery::{discover, DiscoveryResult};
pub use executor::{execute, ExecutionContext, ToolResult};
pub use locator::Locator;
