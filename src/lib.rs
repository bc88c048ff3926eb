//! grapheus - A CLI tool that writes git commit messages from staged changes.
//!
//! # Overview
//!
//! grapheus inspects the staged diff, strips noise (binary, minified, and
//! vendored files), sends the remainder to one of ~24 interchangeable LLM
//! backends through a single provider abstraction, and commits the result
//! after interactive confirmation. It can also partition the staged files
//! into several logical commits in one run.

pub mod config;
pub mod diff;
pub mod error;
pub mod git;
pub mod grouping;
pub mod json;
pub mod prompt;
pub mod provider;
pub mod secrets;
pub mod workflow;

// Re-export commonly used types
pub use config::{GenerationConfig, ModelId};
pub use error::{AiError, ErrorKind, GitError, GroupingError};
pub use git::RepoSnapshot;
pub use grouping::{CommitGroup, GroupingPlan};
pub use provider::{GenerationRequest, HttpGenerator, Message, ProviderKind, TextGenerator};
