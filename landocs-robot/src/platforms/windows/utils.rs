use crate::AutomationError;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::debug;
use uiautomation::UIAutomation;
use windows::core::HRESULT;
use windows::Win32::System::Com::{CoInitializeEx, COINIT_MULTITHREADED};

/// `RPC_E_CHANGED_MODE`: COM was already initialized on this thread.
const COM_ALREADY_INITIALIZED: HRESULT = HRESULT(0x80010106u32 as i32);

/// Joins the multithreaded apartment on the calling thread and creates a
/// UIAutomation client. Blocking-pool threads call this before their first
/// COM use.
pub(crate) fn create_ui_automation_with_com_init() -> Result<UIAutomation, AutomationError> {
    unsafe {
        let hr = CoInitializeEx(None, COINIT_MULTITHREADED);
        if hr.is_err() && hr != COM_ALREADY_INITIALIZED {
            return Err(AutomationError::PlatformError(format!(
                "Failed to initialize COM in multithreaded mode: {hr}"
            )));
        }
        if hr == COM_ALREADY_INITIALIZED {
            debug!("COM already initialized in this thread");
        }
    }
    UIAutomation::new_direct().map_err(|e| AutomationError::PlatformError(e.to_string()))
}

/// Identity of a node within one session, derived from its runtime id.
pub(crate) fn element_id(element: &uiautomation::UIElement) -> usize {
    let mut hasher = DefaultHasher::new();
    match element.get_runtime_id() {
        Ok(runtime_id) => runtime_id.hash(&mut hasher),
        Err(_) => {
            // No runtime id: fall back to what the node looks like.
            element.get_name().unwrap_or_default().hash(&mut hasher);
            element.get_classname().unwrap_or_default().hash(&mut hasher);
            if let Ok(rect) = element.get_bounding_rectangle() {
                (rect.get_left(), rect.get_top(), rect.get_width(), rect.get_height())
                    .hash(&mut hasher);
            }
        }
    }
    hasher.finish() as usize
}
