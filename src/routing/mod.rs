//! Task classification
//!
//! [`TaskClassifier`] picks a [`TaskCategory`] for each prompt. The default
//! implementation asks an LLM through [`LlmClassifier`].

pub mod category;
pub mod classifier;
pub mod schema;

pub use category::{parse_label, TaskCategory};
pub use classifier::{LlmClassifier, TaskClassifier};
pub use schema::ClassificationOutput;
