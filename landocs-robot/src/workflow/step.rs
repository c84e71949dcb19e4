use crate::counterparty::CounterpartyQuery;
use crate::errors::{ErrorKind, RobotError};
use crate::platforms::KeyChord;
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default budget for locating a step's target.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(60);

/// Where a lookup starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The desktop root.
    Desktop,
    /// Whatever element has keyboard focus when the step starts.
    Focused,
    /// An element bound by an earlier step of the same run.
    Anchor(&'static str),
}

/// What to find under the scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// The scope element itself.
    Scope,
    /// Each selector is resolved under the previous match.
    Chain(Vec<Selector>),
    /// Alternatives tried in order, each with the full timeout.
    FirstOf(Vec<Selector>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocateSpec {
    pub scope: Scope,
    pub target: Target,
    pub timeout: Duration,
}

impl LocateSpec {
    pub fn new(scope: Scope, target: Target) -> Self {
        Self {
            scope,
            target,
            timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Display for LocateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Scope::Desktop => f.write_str("desktop")?,
            Scope::Focused => f.write_str("focused")?,
            Scope::Anchor(anchor) => write!(f, "@{anchor}")?,
        }
        match &self.target {
            Target::Scope => Ok(()),
            Target::Chain(chain) => chain.iter().try_for_each(|s| write!(f, " > {s}")),
            Target::FirstOf(options) => {
                f.write_str(" > ")?;
                for (i, s) in options.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{s}")?;
                }
                Ok(())
            }
        }
    }
}

/// Operation applied to the located element, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    /// Programmatic invoke bounded by the invoke timeout.
    Invoke,
    /// Physical left click at the midpoint of the bounding rectangle.
    ClickAtCenter,
    /// Value pattern when present, typed text otherwise.
    SetValue(String),
    Expand,
    Collapse,
    Toggle,
    Select,
    SetFocus,
    Pause(Duration),
    SendChord(KeyChord),
    /// Expands a Collapsed or PartiallyExpanded node; other states are left alone.
    EnsureExpanded,
    /// Scroll-and-scan the children for `target` by normalized legacy name.
    JournalScrollSearch { target: String },
    /// Invokes the first child whose value equals the given text.
    InvokeChildWithValue(String),
    /// Resolves the counterparty among the element's rows and opens it.
    ResolveCounterparty(CounterpartyQuery),
    LegacySelectFirstChild,
    /// Switches the first child's toggle on if it is not already.
    ToggleFirstChildOn,
    /// Checks the enabled flag up to `attempts` times, re-locating the target between checks.
    AwaitEnabled { attempts: u32, wait: Duration },
}

/// Check run after all interactions of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostCondition {
    NameEquals(String),
    NameNotEmpty,
    Enabled,
}

/// One named unit of the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    pub locate: LocateSpec,
    pub interactions: Vec<Interaction>,
    pub post: Option<PostCondition>,
    /// Stores the located element under this anchor for later steps.
    pub bind: Option<&'static str>,
}

impl Step {
    pub fn new(name: impl Into<String>, locate: LocateSpec) -> Self {
        Self {
            name: name.into(),
            locate,
            interactions: Vec::new(),
            post: None,
            bind: None,
        }
    }

    pub fn then(mut self, interaction: Interaction) -> Self {
        self.interactions.push(interaction);
        self
    }

    pub fn verify(mut self, post: PostCondition) -> Self {
        self.post = Some(post);
        self
    }

    pub fn bind(mut self, anchor: &'static str) -> Self {
        self.bind = Some(anchor);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Locating,
    Found,
    Interacting,
    Verifying,
    Done,
    NotFound,
    Failed,
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepState::Done | StepState::NotFound | StepState::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: String,
    pub state: StepState,
    /// States the step passed through, ending with `state`.
    pub trace: Vec<StepState>,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Timings used by the orchestrator. Tests shrink them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowOptions {
    #[serde(with = "millis")]
    pub poll_interval: Duration,
    #[serde(with = "millis")]
    pub invoke_timeout: Duration,
    #[serde(with = "millis")]
    pub click_settle: Duration,
    #[serde(with = "millis")]
    pub click_hold: Duration,
    #[serde(with = "millis")]
    pub toggle_wait: Duration,
    #[serde(with = "millis")]
    pub scroll_settle: Duration,
    /// Scales every fixed wait of the workflow; 1.0 keeps them as declared.
    pub pause_scale: f64,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            poll_interval: crate::locator::DEFAULT_POLL_INTERVAL,
            invoke_timeout: Duration::from_secs(5),
            click_settle: Duration::from_millis(100),
            click_hold: Duration::from_millis(200),
            toggle_wait: Duration::from_secs(1),
            scroll_settle: Duration::from_millis(500),
            pause_scale: 1.0,
        }
    }
}

impl WorkflowOptions {
    pub(crate) fn scaled(&self, wait: Duration) -> Duration {
        wait.mul_f64(self.pause_scale.max(0.0))
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Why a run stopped early.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Abandon {
    pub step: String,
    pub kind: ErrorKind,
    pub reason: String,
}

impl Abandon {
    pub fn into_error(self) -> RobotError {
        RobotError::Abandoned {
            step: self.step,
            kind: self.kind,
            reason: self.reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkflowStatus {
    Completed,
    Abandoned(Abandon),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub run_id: String,
    pub workflow: String,
    pub steps: Vec<StepOutcome>,
    #[serde(flatten)]
    pub status: WorkflowStatus,
}

impl WorkflowReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, WorkflowStatus::Completed)
    }

    pub fn abandon(&self) -> Option<&Abandon> {
        match &self.status {
            WorkflowStatus::Completed => None,
            WorkflowStatus::Abandoned(abandon) => Some(abandon),
        }
    }
}
