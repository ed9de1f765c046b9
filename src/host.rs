//! Narrow interfaces onto the host: where selected text comes from, where
//! answers are displayed and how the user is notified.
//!
//! Console implementations back the `codebuddy` binary; editor hosts supply
//! their own.

use crate::providers::ProviderKind;
use async_trait::async_trait;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

/// Source of the user's current text selection
pub trait SelectionSource: Send + Sync {
    fn get_selected_text(&self) -> Option<String>;
}

/// Fire-and-forget user notifications
pub trait Notifier: Send + Sync {
    fn show_error(&self, text: &str);
    fn show_info(&self, text: &str);
}

/// Kind of message posted to a display surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    UserInput,
    BotResponse,
}

/// Payload posted to a display surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub message: String,
}

impl DisplayMessage {
    pub fn user_input(message: impl Into<String>) -> Self {
        Self {
            kind: MessageType::UserInput,
            message: message.into(),
        }
    }

    pub fn bot_response(message: impl Into<String>) -> Self {
        Self {
            kind: MessageType::BotResponse,
            message: message.into(),
        }
    }
}

/// A chat panel that renders delivered answers
#[async_trait]
pub trait DisplaySurface: Send + Sync {
    /// Post a message; `false` means the surface did not accept it
    async fn post_message(&self, message: DisplayMessage) -> bool;
}

/// One display surface per provider kind
#[derive(Clone, Default)]
pub struct DisplayRegistry {
    surfaces: HashMap<ProviderKind, Arc<dyn DisplaySurface>>,
}

impl DisplayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The same surface for every provider kind
    pub fn shared(surface: Arc<dyn DisplaySurface>) -> Self {
        let mut registry = Self::new();
        for kind in ProviderKind::ALL {
            registry.register(*kind, surface.clone());
        }
        registry
    }

    pub fn register(&mut self, kind: ProviderKind, surface: Arc<dyn DisplaySurface>) {
        self.surfaces.insert(kind, surface);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn DisplaySurface>> {
        self.surfaces.get(&kind).cloned()
    }
}

/// Fixed selection, as handed over by an embedding host
#[derive(Debug, Clone, Default)]
pub struct StaticSelection(pub Option<String>);

impl SelectionSource for StaticSelection {
    fn get_selected_text(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Selection read from a file, or from stdin when no path is given
#[derive(Debug, Clone)]
pub struct ConsoleSelection {
    path: Option<PathBuf>,
}

impl ConsoleSelection {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl SelectionSource for ConsoleSelection {
    fn get_selected_text(&self) -> Option<String> {
        let text = match &self.path {
            Some(path) => std::fs::read_to_string(path).ok()?,
            None => {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer).ok()?;
                buffer
            }
        };
        Some(text).filter(|t| !t.trim().is_empty())
    }
}

/// Prints delivered answers to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleDisplay;

#[async_trait]
impl DisplaySurface for ConsoleDisplay {
    async fn post_message(&self, message: DisplayMessage) -> bool {
        println!("{}", message.message);
        true
    }
}

/// Prints notifications to stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier {
    pub quiet: bool,
}

impl Notifier for ConsoleNotifier {
    fn show_error(&self, text: &str) {
        eprintln!("{} {}", "✖".bright_red().bold(), text.bright_red());
    }

    fn show_info(&self, text: &str) {
        if !self.quiet {
            eprintln!("{}", text.bright_cyan());
        }
    }
}
