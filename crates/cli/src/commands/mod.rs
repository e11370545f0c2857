//! Subcommand implementations.
//!
//! Every mutating command goes through [`ThemeApp::dispatch`], the same table
//! the theme's interactive elements use. Results are reported through
//! `tracing`.

use scifi_theme_storefront::config::ConfigError;
use scifi_theme_storefront::{AppError, Command, DispatchOutcome, ThemeApp};
use thiserror::Error;

pub mod cart;
pub mod search;
pub mod variant;
pub mod wishlist;

/// Errors that end a CLI run with exit code 1.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    App(#[from] AppError),

    /// A dispatched command failed; the message is the shopper-facing one.
    #[error("{0}")]
    Failed(String),
}

/// Dispatch and turn a failure into an error.
async fn dispatch(app: &ThemeApp, command: Command) -> Result<DispatchOutcome, CommandError> {
    match app.dispatch(command).await {
        DispatchOutcome::Failed { message } => Err(CommandError::Failed(message)),
        DispatchOutcome::Dropped => {
            tracing::warn!("Command dropped, another change was in progress");
            Ok(DispatchOutcome::Dropped)
        }
        outcome => Ok(outcome),
    }
}
