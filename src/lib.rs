//! CodeBuddy - multi-provider AI response orchestration for coding assistants
//!
//! This library turns an editor action (comment, review, refactor, explain, fix
//! and friends) plus the user's selection into a prompt, sends it to the
//! configured generative-model backend with per-provider conversation memory,
//! and delivers the formatted answer to a display surface.

#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::format_push_string)] // Performance improvement but stylistic
#![allow(clippy::return_self_not_must_use)] // Builder pattern is clear enough
#![allow(clippy::items_after_statements)] // Locally-scoped use statements are fine

pub mod actions;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod host;
pub mod llm_providers;
pub mod logger;
pub mod memory;
pub mod orchestrator;
pub mod prompts;
pub mod providers;

// Re-export important structs and functions for easier testing
pub use actions::{Action, ActionKind, PromptAction};
pub use config::{Config, ConfigResolver};
pub use error::{BuddyError, ErrorKind};
pub use history::{ChatRole, ChatTurn, ConversationHistory};
pub use memory::SessionMemoryCache;
pub use orchestrator::{Outcome, ResponseOrchestrator};
pub use providers::{ProviderKind, ProviderSelection};
