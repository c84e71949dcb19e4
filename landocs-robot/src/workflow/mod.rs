//! Step runner for the LanDocs workflow.
//!
//! A workflow is a flat list of [`Step`]s. Each step locates one element,
//! applies its interactions in order and checks an optional post-condition.
//! The first failing step abandons the run; the caller decides what that
//! means for the ticket.

mod dialog;
mod step;

pub use dialog::{inspect_error_dialog, ErrorDialog, MISSING_DIALOG_MESSAGE};
pub use step::{
    Abandon, Interaction, LocateSpec, PostCondition, Scope, Step, StepOutcome, StepState, Target,
    WorkflowOptions, WorkflowReport, WorkflowStatus, DEFAULT_STEP_TIMEOUT,
};

use crate::counterparty::{self, CandidateRecord, CounterpartyQuery};
use crate::element::{Capability, ControlType, ExpandCollapseState, ToggleState, UIElement};
use crate::errors::{AutomationError, RobotError};
use crate::locator::Locator;
use crate::platforms::{AccessibilityEngine, InputSimulator};
use crate::selector::Selector;
use crate::ClickResult;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// How an `Invoke` interaction ended. Only a provider-side refusal to even
/// start is an error; everything else is logged and the step goes on.
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeOutcome {
    Invoked,
    /// The node has no invoke capability; a physical click was issued instead.
    ClickedInstead(ClickResult),
    /// The call did not return within the invoke timeout and may still be running.
    TimedOut,
    Disabled,
    Failed(String),
}

/// Elements bound by earlier steps, by anchor name.
pub type Anchors = HashMap<&'static str, UIElement>;

/// Drives a workflow against one accessibility engine and input simulator.
pub struct Orchestrator {
    engine: Arc<dyn AccessibilityEngine>,
    input: Arc<dyn InputSimulator>,
    options: WorkflowOptions,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn AccessibilityEngine>, input: Arc<dyn InputSimulator>) -> Self {
        Self {
            engine,
            input,
            options: WorkflowOptions::default(),
        }
    }

    pub fn with_options(mut self, options: WorkflowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &WorkflowOptions {
        &self.options
    }

    pub fn engine(&self) -> &Arc<dyn AccessibilityEngine> {
        &self.engine
    }

    /// Runs `steps` in order and stops at the first failure.
    #[instrument(level = "info", skip(self, steps), fields(steps = steps.len()))]
    pub async fn run(&self, workflow: &str, steps: &[Step]) -> WorkflowReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut anchors = Anchors::new();
        let mut outcomes = Vec::with_capacity(steps.len());

        for step in steps {
            let (outcome, result) = self.run_step(step, &mut anchors).await;
            outcomes.push(outcome);
            if let Err(e) = result {
                error!(step = %step.name, "workflow '{workflow}' abandoned: {e}");
                return WorkflowReport {
                    run_id,
                    workflow: workflow.to_string(),
                    steps: outcomes,
                    status: WorkflowStatus::Abandoned(Abandon {
                        step: step.name.clone(),
                        kind: e.kind(),
                        reason: e.to_string(),
                    }),
                };
            }
        }

        info!("workflow '{workflow}' completed");
        WorkflowReport {
            run_id,
            workflow: workflow.to_string(),
            steps: outcomes,
            status: WorkflowStatus::Completed,
        }
    }

    async fn run_step(
        &self,
        step: &Step,
        anchors: &mut Anchors,
    ) -> (StepOutcome, Result<(), RobotError>) {
        let started = Instant::now();
        let mut trace = vec![StepState::Locating];
        let mut notes = Vec::new();
        debug!(step = %step.name, locate = %step.locate, "locating");

        let result = match self.locate(&step.locate, anchors).await {
            Err(e) => {
                trace.push(if matches!(e, RobotError::NotFound(_)) {
                    StepState::NotFound
                } else {
                    StepState::Failed
                });
                Err(e)
            }
            Ok(mut element) => {
                trace.push(StepState::Found);
                let result = self
                    .interact_and_verify(step, anchors, &mut element, &mut trace, &mut notes)
                    .await;
                if result.is_ok() {
                    if let Some(anchor) = step.bind {
                        anchors.insert(anchor, element);
                    }
                }
                trace.push(if result.is_ok() {
                    StepState::Done
                } else {
                    StepState::Failed
                });
                result
            }
        };

        let state = trace.last().copied().unwrap_or(StepState::Failed);
        match &result {
            Ok(()) => info!(step = %step.name, "step done"),
            Err(e) => warn!(step = %step.name, ?state, "step failed: {e}"),
        }
        let outcome = StepOutcome {
            step: step.name.clone(),
            state,
            trace,
            elapsed_ms: started.elapsed().as_millis() as u64,
            notes,
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        (outcome, result)
    }

    async fn interact_and_verify(
        &self,
        step: &Step,
        anchors: &Anchors,
        element: &mut UIElement,
        trace: &mut Vec<StepState>,
        notes: &mut Vec<String>,
    ) -> Result<(), RobotError> {
        if !step.interactions.is_empty() {
            trace.push(StepState::Interacting);
        }
        for interaction in &step.interactions {
            if let Some(note) = self
                .interact(step, anchors, element, interaction)
                .await?
            {
                notes.push(note);
            }
        }
        if let Some(post) = &step.post {
            trace.push(StepState::Verifying);
            verify(element, post)?;
        }
        Ok(())
    }

    /// Resolves a locate spec against the live tree.
    pub async fn locate(&self, spec: &LocateSpec, anchors: &Anchors) -> Result<UIElement, RobotError> {
        let scope = match &spec.scope {
            Scope::Desktop => self.engine.get_root_element()?,
            Scope::Focused => self.engine.get_focused_element().map_err(not_found)?,
            Scope::Anchor(name) => anchors.get(name).cloned().ok_or_else(|| {
                RobotError::NotFound(format!("anchor '{name}' was not bound by an earlier step"))
            })?,
        };
        match &spec.target {
            Target::Scope => Ok(scope),
            Target::Chain(chain) => {
                let mut current = scope;
                for selector in chain {
                    current = self.wait_for(current, selector, spec.timeout).await?;
                }
                Ok(current)
            }
            Target::FirstOf(options) => {
                let mut last_error = RobotError::NotFound(format!("no alternatives in {spec}"));
                for selector in options {
                    match self.wait_for(scope.clone(), selector, spec.timeout).await {
                        Ok(found) => return Ok(found),
                        Err(e) => {
                            debug!("alternative {selector} not found: {e}");
                            last_error = e;
                        }
                    }
                }
                Err(last_error)
            }
        }
    }

    async fn wait_for(
        &self,
        root: UIElement,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<UIElement, RobotError> {
        Locator::new(root, selector.clone())
            .set_default_timeout(timeout)
            .poll_interval(self.options.poll_interval)
            .wait(None)
            .await
            .map_err(not_found)
    }

    async fn interact(
        &self,
        step: &Step,
        anchors: &Anchors,
        element: &mut UIElement,
        interaction: &Interaction,
    ) -> Result<Option<String>, RobotError> {
        match interaction {
            Interaction::Invoke => {
                let outcome = self.invoke(element).await?;
                Ok(Some(format!("invoke: {outcome:?}")))
            }
            Interaction::ClickAtCenter => {
                let click = self.click_at_center(element).await?;
                Ok(Some(click.details))
            }
            Interaction::SetValue(text) => self.set_value(element, text).map(|_| None),
            Interaction::Expand => Ok(element.expand().map(|_| None)?),
            Interaction::Collapse => Ok(element.collapse().map(|_| None)?),
            Interaction::Toggle => Ok(element.toggle().map(|_| None)?),
            Interaction::Select => Ok(element.select().map(|_| None)?),
            Interaction::SetFocus => Ok(element.focus().map(|_| None)?),
            Interaction::Pause(wait) => {
                sleep(self.options.scaled(*wait)).await;
                Ok(None)
            }
            Interaction::SendChord(chord) => {
                self.input.press_chord(chord)?;
                Ok(Some(format!("sent {chord}")))
            }
            Interaction::EnsureExpanded => ensure_expanded(element).map(Some),
            Interaction::JournalScrollSearch { target } => {
                self.journal_scroll_search(element, target).await.map(Some)
            }
            Interaction::InvokeChildWithValue(value) => {
                let child = child_with_value(element, value)?;
                let outcome = self.invoke(&child).await?;
                Ok(Some(format!("invoked child '{value}': {outcome:?}")))
            }
            Interaction::ResolveCounterparty(query) => {
                self.resolve_counterparty(element, query).await.map(Some)
            }
            Interaction::LegacySelectFirstChild => {
                first_child(element)?.legacy_select()?;
                Ok(None)
            }
            Interaction::ToggleFirstChildOn => {
                let child = first_child(element)?;
                let note = if child.toggle_state()? == ToggleState::On {
                    "first child already on".to_string()
                } else {
                    child.toggle()?;
                    "first child toggled on".to_string()
                };
                sleep(self.options.scaled(self.options.toggle_wait)).await;
                Ok(Some(note))
            }
            Interaction::AwaitEnabled { attempts, wait } => {
                self.await_enabled(step, anchors, element, *attempts, *wait)
                    .await
                    .map(Some)
            }
        }
    }

    /// Programmatic invoke with a hard cap; see [`InvokeOutcome`].
    #[instrument(level = "debug", skip(self, element), fields(element = ?element.name()))]
    pub async fn invoke(&self, element: &UIElement) -> Result<InvokeOutcome, RobotError> {
        if !element.supports(Capability::Invokable) {
            debug!("element has no invoke capability, clicking instead");
            return Ok(InvokeOutcome::ClickedInstead(self.click_at_center(element).await?));
        }
        if !element.is_enabled()? {
            warn!("element {:?} is disabled, invoke skipped", element.name());
            return Ok(InvokeOutcome::Disabled);
        }

        let target = element.clone();
        let call = tokio::task::spawn_blocking(move || target.invoke());
        match tokio::time::timeout(self.options.invoke_timeout, call).await {
            Ok(Ok(Ok(()))) => Ok(InvokeOutcome::Invoked),
            Ok(Ok(Err(e))) => {
                warn!("invoke on {:?} failed: {e}", element.name());
                Ok(InvokeOutcome::Failed(e.to_string()))
            }
            Ok(Err(join)) => Err(AutomationError::Internal(format!("invoke task failed: {join}")).into()),
            Err(_) => {
                // No click fallback: a modal opened by the invoke blocks the call
                // and a second activation would act on the new window.
                warn!(
                    "invoke on {:?} did not return within {:?}",
                    element.name(),
                    self.options.invoke_timeout
                );
                Ok(InvokeOutcome::TimedOut)
            }
        }
    }

    /// Left click at the midpoint of the element's bounding rectangle.
    #[instrument(level = "debug", skip(self, element), fields(element = ?element.name()))]
    pub async fn click_at_center(&self, element: &UIElement) -> Result<ClickResult, RobotError> {
        let (x, y, width, height) = element.bounds()?;
        let (cx, cy) = (x + width / 2.0, y + height / 2.0);
        self.input.move_cursor(cx.round() as i32, cy.round() as i32)?;
        sleep(self.options.scaled(self.options.click_settle)).await;
        self.input.left_down()?;
        sleep(self.options.scaled(self.options.click_hold)).await;
        self.input.left_up()?;
        Ok(ClickResult {
            method: "ClickAtCenter".to_string(),
            coordinates: Some((cx, cy)),
            details: format!("clicked ({cx:.0}, {cy:.0}) within {width:.0}x{height:.0} at ({x:.0}, {y:.0})"),
        })
    }

    /// Value pattern when available, otherwise focus and type.
    pub fn set_value(&self, element: &UIElement, text: &str) -> Result<(), RobotError> {
        if element.supports(Capability::ValueEditable) {
            element.set_value(text)?;
        } else {
            debug!("element {:?} is not value-editable, typing instead", element.name());
            element.focus()?;
            self.input.type_text(text)?;
        }
        Ok(())
    }

    /// Scans the children of `container` for `target` and selects it,
    /// scrolling one large increment at a time until the end is reached.
    pub async fn journal_scroll_search(
        &self,
        container: &UIElement,
        target: &str,
    ) -> Result<String, RobotError> {
        let wanted = normalize_journal_name(target);
        let mut last_percent: Option<f64> = None;
        loop {
            for child in container.children()? {
                let name = child.legacy_name()?.unwrap_or_default();
                if normalize_journal_name(&name) != wanted {
                    continue;
                }
                info!("journal '{target}' found");
                if child.supports(Capability::ScrollItem) {
                    child.scroll_into_view()?;
                    sleep(self.options.scaled(self.options.scroll_settle)).await;
                }
                if child.supports(Capability::Selectable) {
                    child.focus()?;
                    child.select()?;
                }
                return Ok(format!("journal '{name}' selected"));
            }

            let percent = if container.supports(Capability::Scrollable) {
                container.vertical_scroll_percent()?
            } else {
                None
            };
            match percent {
                Some(p) if p < 100.0 => {
                    if last_percent.is_some_and(|last| p <= last) {
                        return Err(AutomationError::ScrollFailed(format!(
                            "scroll position stuck at {p:.1}% while looking for journal '{target}'"
                        ))
                        .into());
                    }
                    last_percent = Some(p);
                    debug!("journal '{target}' not visible at {p:.1}%, scrolling");
                    container.scroll_down_large()?;
                    sleep(self.options.scaled(self.options.scroll_settle)).await;
                }
                _ => {
                    return Err(RobotError::NotFound(format!(
                        "journal '{target}' not found under {:?}",
                        container.name()
                    )))
                }
            }
        }
    }

    /// Reads every row of the data panel, resolves the counterparty and opens
    /// the matching row.
    pub async fn resolve_counterparty(
        &self,
        panel: &UIElement,
        query: &CounterpartyQuery,
    ) -> Result<String, RobotError> {
        let mut rows = Vec::new();
        let mut candidates = Vec::new();
        for row in panel.children()? {
            let Some(item) = row.children_of_kind(ControlType::DataItem)?.into_iter().next() else {
                continue;
            };
            let Some(value) = item.value().ok().flatten() else {
                continue;
            };
            candidates.push(CandidateRecord::from_value(rows.len(), &value));
            rows.push(item);
        }
        debug!("{} counterparty candidates", candidates.len());

        let index = counterparty::resolve(&candidates, query).ok_or_else(|| {
            RobotError::NotFound(format!(
                "no counterparty with tax id {} among {} candidates",
                query.tax_id,
                candidates.len()
            ))
        })?;
        let item = &rows[index];
        item.focus()?;
        let outcome = self.invoke(item).await?;
        Ok(format!("counterparty row {index} opened: {outcome:?}"))
    }

    async fn await_enabled(
        &self,
        step: &Step,
        anchors: &Anchors,
        element: &mut UIElement,
        attempts: u32,
        wait: Duration,
    ) -> Result<String, RobotError> {
        let attempts = attempts.max(1);
        for attempt in 1..=attempts {
            if element.is_enabled()? {
                return Ok(format!("enabled after {attempt} check(s)"));
            }
            if attempt < attempts {
                info!("{:?} is disabled, waiting {wait:?}", element.name());
                sleep(self.options.scaled(wait)).await;
                *element = self.locate(&step.locate, anchors).await?;
            }
        }
        Err(RobotError::VerificationFailure(format!(
            "{:?} still disabled after {attempts} checks",
            element.name()
        )))
    }
}

fn not_found(error: AutomationError) -> RobotError {
    if error.is_not_found() {
        RobotError::NotFound(error.to_string())
    } else {
        RobotError::ProviderFailure(error)
    }
}

fn verify(element: &UIElement, post: &PostCondition) -> Result<(), RobotError> {
    match post {
        PostCondition::NameEquals(expected) => {
            let actual = element.name().unwrap_or_default();
            if &actual == expected {
                Ok(())
            } else {
                Err(RobotError::VerificationFailure(format!(
                    "expected name '{expected}', found '{actual}'"
                )))
            }
        }
        PostCondition::NameNotEmpty => match element.name() {
            Some(name) if !name.trim().is_empty() => Ok(()),
            _ => Err(RobotError::VerificationFailure(
                "element name is empty".to_string(),
            )),
        },
        PostCondition::Enabled => {
            if element.is_enabled()? {
                Ok(())
            } else {
                Err(RobotError::VerificationFailure(format!(
                    "{:?} is not enabled",
                    element.name()
                )))
            }
        }
    }
}

fn ensure_expanded(element: &UIElement) -> Result<String, RobotError> {
    if !element.supports(Capability::Expandable) {
        return Err(AutomationError::UnsupportedOperation(format!(
            "{:?} cannot be expanded",
            element.name()
        ))
        .into());
    }
    let state = element.expand_collapse_state()?;
    match state {
        ExpandCollapseState::Collapsed | ExpandCollapseState::PartiallyExpanded => {
            element.expand()?;
            Ok(format!("expanded from {state:?}"))
        }
        ExpandCollapseState::Expanded | ExpandCollapseState::LeafNode => {
            Ok(format!("already {state:?}"))
        }
        ExpandCollapseState::Unknown(raw) => {
            warn!("unexpected expand/collapse state {raw} on {:?}", element.name());
            Ok(format!("unexpected state {raw}, left as is"))
        }
    }
}

fn first_child(element: &UIElement) -> Result<UIElement, RobotError> {
    element.children()?.into_iter().next().ok_or_else(|| {
        RobotError::NotFound(format!("{:?} has no children", element.name()))
    })
}

fn child_with_value(element: &UIElement, value: &str) -> Result<UIElement, RobotError> {
    for child in element.children()? {
        if child.value().ok().flatten().as_deref() == Some(value) {
            return Ok(child);
        }
    }
    Err(RobotError::NotFound(format!(
        "no child of {:?} has value '{value}'",
        element.name()
    )))
}

/// Journal names compare trimmed, lowercased and without spaces.
pub fn normalize_journal_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "")
}

/// `{ppud-prefix}.Договоры`, where the prefix is everything before the first dot.
pub fn journal_name_for(ppud: &str) -> String {
    let prefix = ppud.split('.').next().unwrap_or_default();
    format!("{prefix}.Договоры")
}
