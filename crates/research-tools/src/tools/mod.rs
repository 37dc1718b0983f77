//! Research Tools
//!
//! The capabilities offered to the reasoning model:
//!
//! - `quick_search` - fast snippet search for simple factual queries
//! - `deep_search` - multi-source search with full page content
//! - `think` - records a reflection, no external call

mod deep_search;
mod quick_search;
mod think;

pub use deep_search::DeepSearchTool;
pub use quick_search::QuickSearchTool;
pub use think::ThinkTool;
