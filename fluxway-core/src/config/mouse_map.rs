use crate::cmd::Action;
use crate::config::key_map::{mode_matches, KEYMOD_MASK};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
pub enum MouseContext {
    Desktop,
    Window,
    Titlebar,
    Handle,
    Toolbar,
    Slit,
    Tabs,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
pub enum MouseEventKind {
    Press,
    Release,
    Motion,
}

#[derive(Debug, Clone)]
pub struct MouseBinding {
    pub context: MouseContext,
    pub event: MouseEventKind,
    pub button: u32,
    pub modifiers: u32,
    pub action: Action,
    pub arg: i32,
    pub cmd: Option<String>,
    pub mode: Option<String>,
}

impl MouseBinding {
    #[must_use]
    pub fn new(
        context: MouseContext,
        event: MouseEventKind,
        button: u32,
        modifiers: u32,
        action: Action,
        arg: i32,
        cmd: Option<&str>,
    ) -> Self {
        MouseBinding {
            context,
            event,
            button,
            modifiers: modifiers & KEYMOD_MASK,
            action,
            arg,
            cmd: cmd.map(str::to_string),
            mode: None,
        }
    }
}

/// Reverse insertion order, same as keys: later entries override earlier.
#[must_use]
pub fn match_button(
    bindings: &[MouseBinding],
    context: MouseContext,
    event: MouseEventKind,
    button: u32,
    modifiers: u32,
    current_mode: Option<&str>,
) -> Option<usize> {
    let modifiers = modifiers & KEYMOD_MASK;
    bindings
        .iter()
        .enumerate()
        .rev()
        .find(|(_, b)| {
            b.context == context
                && b.event == event
                && b.button == button
                && b.modifiers == modifiers
                && mode_matches(b.mode.as_deref(), current_mode)
        })
        .map(|(i, _)| i)
}
