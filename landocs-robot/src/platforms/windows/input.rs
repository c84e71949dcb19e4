use crate::platforms::{InputSimulator, KeyChord};
use crate::AutomationError;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_KEYUP, KEYEVENTF_UNICODE, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE, MOUSE_EVENT_FLAGS, MOUSEINPUT, VIRTUAL_KEY, VK_CONTROL,
    VK_MENU, VK_SHIFT,
};
use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

/// Mouse and keyboard through `SendInput`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsInput;

fn to_absolute(x: i32, y: i32) -> (i32, i32) {
    let screen_w = unsafe { GetSystemMetrics(SM_CXSCREEN) }.max(1);
    let screen_h = unsafe { GetSystemMetrics(SM_CYSCREEN) }.max(1);
    let abs_x = ((x as f64 / screen_w as f64) * 65535.0).round() as i32;
    let abs_y = ((y as f64 / screen_h as f64) * 65535.0).round() as i32;
    (abs_x, abs_y)
}

fn mouse(dx: i32, dy: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn key(vk: VIRTUAL_KEY, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn send(inputs: &[INPUT]) -> Result<(), AutomationError> {
    let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
    if sent as usize != inputs.len() {
        return Err(AutomationError::PlatformError(format!(
            "SendInput accepted {sent} of {} events",
            inputs.len()
        )));
    }
    Ok(())
}

impl InputSimulator for WindowsInput {
    fn move_cursor(&self, x: i32, y: i32) -> Result<(), AutomationError> {
        let (abs_x, abs_y) = to_absolute(x, y);
        send(&[mouse(abs_x, abs_y, MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE)])
    }

    fn left_down(&self) -> Result<(), AutomationError> {
        send(&[mouse(0, 0, MOUSEEVENTF_LEFTDOWN)])
    }

    fn left_up(&self) -> Result<(), AutomationError> {
        send(&[mouse(0, 0, MOUSEEVENTF_LEFTUP)])
    }

    fn press_chord(&self, chord: &KeyChord) -> Result<(), AutomationError> {
        if !chord.key.is_ascii_alphanumeric() {
            return Err(AutomationError::InvalidArgument(format!(
                "chord key '{}' has no virtual key code",
                chord.key
            )));
        }
        let main = VIRTUAL_KEY(chord.key.to_ascii_uppercase() as u16);
        let modifiers: Vec<VIRTUAL_KEY> = [
            (chord.ctrl, VK_CONTROL),
            (chord.alt, VK_MENU),
            (chord.shift, VK_SHIFT),
        ]
        .into_iter()
        .filter_map(|(held, vk)| held.then_some(vk))
        .collect();

        let mut inputs = Vec::with_capacity(modifiers.len() * 2 + 2);
        inputs.extend(modifiers.iter().map(|vk| key(*vk, 0, KEYBD_EVENT_FLAGS(0))));
        inputs.push(key(main, 0, KEYBD_EVENT_FLAGS(0)));
        inputs.push(key(main, 0, KEYEVENTF_KEYUP));
        inputs.extend(modifiers.iter().rev().map(|vk| key(*vk, 0, KEYEVENTF_KEYUP)));
        send(&inputs)
    }

    fn type_text(&self, text: &str) -> Result<(), AutomationError> {
        let inputs: Vec<INPUT> = text
            .encode_utf16()
            .flat_map(|unit| {
                [
                    key(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE),
                    key(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP),
                ]
            })
            .collect();
        if inputs.is_empty() {
            return Ok(());
        }
        send(&inputs)
    }
}
