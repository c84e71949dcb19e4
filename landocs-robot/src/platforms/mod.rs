use crate::{AutomationError, UIElement};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub mod memory;
#[cfg(target_os = "windows")]
pub mod windows;

/// Read access to the live accessibility tree.
///
/// The tree belongs to another process and changes underneath every call;
/// nothing returned here is cached by the robot beyond a single lookup.
pub trait AccessibilityEngine: Send + Sync {
    /// Get the root UI element (the desktop)
    fn get_root_element(&self) -> Result<UIElement, AutomationError>;

    /// Get the currently focused element
    fn get_focused_element(&self) -> Result<UIElement, AutomationError>;

    /// Enable downcasting to concrete engine types
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Synthetic keyboard and mouse input.
pub trait InputSimulator: Send + Sync {
    fn move_cursor(&self, x: i32, y: i32) -> Result<(), AutomationError>;
    fn left_down(&self) -> Result<(), AutomationError>;
    fn left_up(&self) -> Result<(), AutomationError>;
    fn press_chord(&self, chord: &KeyChord) -> Result<(), AutomationError>;
    fn type_text(&self, text: &str) -> Result<(), AutomationError>;
}

/// A key pressed while holding modifiers, written as `ctrl+f`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub key: char,
}

impl KeyChord {
    pub fn ctrl(key: char) -> Self {
        Self {
            ctrl: true,
            alt: false,
            shift: false,
            key,
        }
    }
}

impl FromStr for KeyChord {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chord = KeyChord {
            ctrl: false,
            alt: false,
            shift: false,
            key: '\0',
        };
        for part in s.split('+').map(|p| p.trim().to_lowercase()) {
            match part.as_str() {
                "ctrl" | "control" => chord.ctrl = true,
                "alt" => chord.alt = true,
                "shift" => chord.shift = true,
                key if key.chars().count() == 1 => {
                    chord.key = key.chars().next().unwrap_or_default();
                }
                other => {
                    return Err(AutomationError::InvalidArgument(format!(
                        "unsupported key '{other}' in chord '{s}'"
                    )))
                }
            }
        }
        if chord.key == '\0' {
            return Err(AutomationError::InvalidArgument(format!(
                "chord '{s}' has no key"
            )));
        }
        Ok(chord)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("ctrl+")?;
        }
        if self.alt {
            f.write_str("alt+")?;
        }
        if self.shift {
            f.write_str("shift+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// Create the engine and input simulator for the current platform
pub fn create_engine() -> Result<(Arc<dyn AccessibilityEngine>, Arc<dyn InputSimulator>), AutomationError>
{
    #[cfg(target_os = "windows")]
    {
        let engine = windows::WindowsEngine::new()?;
        Ok((Arc::new(engine), Arc::new(windows::WindowsInput)))
    }
    #[cfg(not(target_os = "windows"))]
    {
        Err(AutomationError::UnsupportedPlatform(
            "LanDocs automation requires Windows UI Automation".to_string(),
        ))
    }
}
