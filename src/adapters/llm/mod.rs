//! Language model adapters.

pub mod extraction;
pub mod universal;

pub use extraction::{extract_content, strategies_for, ExtractionStrategy, ResponsePath};
pub use universal::UniversalChatClient;
