//! Ticket intake robot for LanDocs.
//!
//! Each ticket folder is reconciled on disk (spreadsheets bucketed and
//! converted, documents parsed) and every resulting document is filed into
//! LanDocs by driving its UI through accessibility APIs.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod converter;
pub mod counterparty;
pub mod element;
pub mod errors;
pub mod filename;
pub mod landocs;
pub mod locator;
pub mod pipeline;
pub mod platforms;
pub mod reconcile;
pub mod selector;
pub mod session;
#[cfg(test)]
mod tests;
pub mod ticket;
pub mod workflow;

pub use config::{OrganizationMap, RobotConfig};
pub use converter::SpreadsheetConverter;
pub use element::{Capability, ControlType, UIElement, UIElementAttributes};
pub use errors::{AutomationError, ConverterError, ErrorKind, RobotError};
pub use locator::Locator;
pub use pipeline::{LandocsDriver, Robot, RunSummary};
pub use platforms::{AccessibilityEngine, InputSimulator, KeyChord};
pub use selector::Selector;
pub use session::{AppLauncher, ApplicationSession, SessionConfig};
pub use workflow::{Orchestrator, WorkflowOptions, WorkflowReport};

/// How a click was delivered and where.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClickResult {
    pub method: String,
    pub coordinates: Option<(f64, f64)>,
    pub details: String,
}

/// Entry point to the accessibility tree of the current desktop.
#[derive(Clone)]
pub struct Desktop {
    engine: Arc<dyn AccessibilityEngine>,
    input: Arc<dyn InputSimulator>,
}

impl Desktop {
    /// Connects to the platform provider.
    pub fn new() -> Result<Self, AutomationError> {
        let (engine, input) = platforms::create_engine()?;
        Ok(Self { engine, input })
    }

    /// Wraps an existing provider, e.g. an in-memory tree.
    pub fn with_provider(
        engine: Arc<dyn AccessibilityEngine>,
        input: Arc<dyn InputSimulator>,
    ) -> Self {
        Self { engine, input }
    }

    pub fn root(&self) -> Result<UIElement, AutomationError> {
        self.engine.get_root_element()
    }

    pub fn focused_element(&self) -> Result<UIElement, AutomationError> {
        self.engine.get_focused_element()
    }

    /// A locator searching from the desktop root.
    pub fn locator(&self, selector: impl Into<Selector>) -> Result<Locator, AutomationError> {
        Ok(Locator::new(self.root()?, selector))
    }

    pub fn engine(&self) -> Arc<dyn AccessibilityEngine> {
        self.engine.clone()
    }

    pub fn orchestrator(&self, options: WorkflowOptions) -> Orchestrator {
        Orchestrator::new(self.engine.clone(), self.input.clone()).with_options(options)
    }

    /// Waits for a direct child of the desktop named `name`.
    pub async fn wait_for_window(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<UIElement, RobotError> {
        session::find_top_level_window(
            self.engine.as_ref(),
            name,
            timeout,
            locator::DEFAULT_POLL_INTERVAL,
        )
        .await
    }
}
