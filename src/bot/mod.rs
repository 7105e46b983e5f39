//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules for better organization:
//! - `message_handler`: Handles the `/waves`, `/wavesummary` and `/help` commands
//! - `callback_handler`: Handles inline keyboard callback queries from the wizard menu
//! - `ui_builder`: Renders wizard menus and formats messages
//! - `dialogue_manager`: The wave wizard state machine
//! - `access`: Authorization gate for starting the wizard

pub mod access;
pub mod callback_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::catalog::CatalogLoader;
use crate::config::AccessConfig;
use crate::dialogue::SessionStore;
use crate::storage::ConfigStore;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::{message_handler, Command};

// Re-export utility functions that might be used elsewhere
pub use dialogue_manager::{EventOutcome, Notice, WavesWizard, WizardAction};
pub use ui_builder::{format_saved_summary, render_menu, Menu};

/// Shared state handed to every handler through the dispatcher
#[derive(Clone)]
pub struct WavesState {
    pub sessions: Arc<Mutex<SessionStore>>,
    pub catalog: Arc<CatalogLoader>,
    pub store: Arc<ConfigStore>,
    pub access: Arc<AccessConfig>,
}

impl WavesState {
    pub fn new(catalog: CatalogLoader, store: ConfigStore, access: AccessConfig) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(SessionStore::new())),
            catalog: Arc::new(catalog),
            store: Arc::new(store),
            access: Arc::new(access),
        }
    }
}
