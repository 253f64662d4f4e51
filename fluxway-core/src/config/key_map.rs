use crate::cmd::Action;
use xkeysym::Keysym;

/// Modifier mask bits shared by key and mouse bindings.
pub const MOD_SHIFT: u32 = 1 << 0;
pub const MOD_CTRL: u32 = 1 << 2;
pub const MOD_ALT: u32 = 1 << 3;
pub const MOD_MOD2: u32 = 1 << 4;
pub const MOD_MOD3: u32 = 1 << 5;
pub const MOD_LOGO: u32 = 1 << 6;
pub const MOD_MOD5: u32 = 1 << 7;

/// Bindings only see these bits; lock-style modifiers are masked away.
pub const KEYMOD_MASK: u32 =
    MOD_SHIFT | MOD_CTRL | MOD_ALT | MOD_LOGO | MOD_MOD2 | MOD_MOD3 | MOD_MOD5;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BindKind {
    /// Matches the incoming key symbol, lower-cased.
    Keysym,
    /// Matches the raw keycode.
    Keycode,
    /// Modifier-only fallback, chosen when nothing key-specific matched.
    Placeholder,
    /// Fires on the head's workspace-changed signal, not on keys.
    ChangeWorkspace,
}

#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub kind: BindKind,
    pub sym: u32,
    pub keycode: u32,
    pub modifiers: u32,
    pub action: Action,
    pub arg: i32,
    pub cmd: Option<String>,
    pub mode: Option<String>,
}

impl KeyBinding {
    #[must_use]
    pub fn keysym(sym: Keysym, modifiers: u32, action: Action, arg: i32, cmd: Option<&str>) -> Self {
        KeyBinding {
            kind: BindKind::Keysym,
            sym: keysym_to_lower(u32::from(sym)),
            keycode: 0,
            modifiers: modifiers & KEYMOD_MASK,
            action,
            arg,
            cmd: cmd.map(str::to_string),
            mode: None,
        }
    }

    #[must_use]
    pub fn keycode(keycode: u32, modifiers: u32, action: Action, arg: i32, cmd: Option<&str>) -> Self {
        KeyBinding {
            kind: BindKind::Keycode,
            sym: 0,
            keycode,
            modifiers: modifiers & KEYMOD_MASK,
            action,
            arg,
            cmd: cmd.map(str::to_string),
            mode: None,
        }
    }

    #[must_use]
    pub fn placeholder(modifiers: u32, action: Action, arg: i32, cmd: Option<&str>) -> Self {
        KeyBinding {
            kind: BindKind::Placeholder,
            sym: 0,
            keycode: 0,
            modifiers: modifiers & KEYMOD_MASK,
            action,
            arg,
            cmd: cmd.map(str::to_string),
            mode: None,
        }
    }

    #[must_use]
    pub fn change_workspace(action: Action, arg: i32, cmd: Option<&str>) -> Self {
        KeyBinding {
            kind: BindKind::ChangeWorkspace,
            sym: 0,
            keycode: 0,
            modifiers: 0,
            action,
            arg,
            cmd: cmd.map(str::to_string),
            mode: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: Option<&str>) -> Self {
        self.mode = mode.map(str::to_string);
        self
    }
}

fn mode_is_default(mode: Option<&str>) -> bool {
    match mode {
        None => true,
        Some(m) => m.is_empty() || m.eq_ignore_ascii_case("default"),
    }
}

#[must_use]
pub fn mode_matches(binding_mode: Option<&str>, current_mode: Option<&str>) -> bool {
    let binding_default = mode_is_default(binding_mode);
    let current_default = mode_is_default(current_mode);
    if binding_default && current_default {
        return true;
    }
    if binding_default || current_default {
        return false;
    }
    binding_mode == current_mode
}

/// Lower-case a keysym value: ASCII letters and the Latin-1 range, which is
/// all the binding tables deal in.
#[must_use]
pub fn keysym_to_lower(sym: u32) -> u32 {
    if (0x41..=0x5a).contains(&sym) {
        return sym + 0x20;
    }
    // Latin-1 capitals, skipping the multiplication sign
    if (0xc0..=0xde).contains(&sym) && sym != 0xd7 {
        return sym + 0x20;
    }
    sym
}

/// Outcome of a key lookup: the binding index plus the keycode to forward to
/// placeholder-carried actions such as `MarkWindow`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct KeyMatch {
    pub index: usize,
    pub placeholder_keycode: u32,
    pub placeholder_sym: u32,
}

/// Match in reverse insertion order so later entries override earlier ones.
/// Placeholders only fire when no keysym/keycode entry matched.
#[must_use]
pub fn match_key(
    bindings: &[KeyBinding],
    keycode: u32,
    sym: u32,
    modifiers: u32,
    current_mode: Option<&str>,
) -> Option<KeyMatch> {
    let sym = keysym_to_lower(sym);
    let modifiers = modifiers & KEYMOD_MASK;
    let mut placeholder = None;
    for (index, binding) in bindings.iter().enumerate().rev() {
        if !mode_matches(binding.mode.as_deref(), current_mode) {
            continue;
        }
        if binding.modifiers != modifiers {
            continue;
        }
        match binding.kind {
            BindKind::Placeholder => {
                if placeholder.is_none() {
                    placeholder = Some(index);
                }
            }
            BindKind::Keycode => {
                if binding.keycode == keycode {
                    return Some(KeyMatch {
                        index,
                        placeholder_keycode: 0,
                        placeholder_sym: 0,
                    });
                }
            }
            BindKind::Keysym => {
                if binding.sym == sym {
                    return Some(KeyMatch {
                        index,
                        placeholder_keycode: 0,
                        placeholder_sym: 0,
                    });
                }
            }
            BindKind::ChangeWorkspace => {}
        }
    }
    placeholder.map(|index| KeyMatch {
        index,
        placeholder_keycode: keycode,
        placeholder_sym: sym,
    })
}

/// First change-workspace entry for the current mode, latest wins.
#[must_use]
pub fn match_change_workspace(
    bindings: &[KeyBinding],
    current_mode: Option<&str>,
) -> Option<usize> {
    bindings
        .iter()
        .enumerate()
        .rev()
        .find(|(_, b)| {
            b.kind == BindKind::ChangeWorkspace
                && b.modifiers == 0
                && mode_matches(b.mode.as_deref(), current_mode)
        })
        .map(|(i, _)| i)
}

/// Resolve a configured key name: single characters use the X11 rule that a
/// printable character is its own keysym, everything else goes through the
/// named-specials table.
#[must_use]
pub fn keysym_from_name(name: &str) -> Option<Keysym> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        let u = c as u32;
        if (0x20..=0x7e).contains(&u) || (0xa0..=0xff).contains(&u) {
            return Some(Keysym::from(keysym_to_lower(u)));
        }
    }
    let sym = match name.to_ascii_lowercase().as_str() {
        "return" | "enter" => Keysym::Return,
        "escape" => Keysym::Escape,
        "space" => Keysym::space,
        "tab" => Keysym::Tab,
        "backspace" => Keysym::BackSpace,
        "delete" => Keysym::Delete,
        "home" => Keysym::Home,
        "end" => Keysym::End,
        "prior" | "pageup" => Keysym::Prior,
        "next" | "pagedown" => Keysym::Next,
        "left" => Keysym::Left,
        "right" => Keysym::Right,
        "up" => Keysym::Up,
        "down" => Keysym::Down,
        "print" => Keysym::Print,
        "comma" => Keysym::comma,
        "period" => Keysym::period,
        "f1" => Keysym::F1,
        "f2" => Keysym::F2,
        "f3" => Keysym::F3,
        "f4" => Keysym::F4,
        "f5" => Keysym::F5,
        "f6" => Keysym::F6,
        "f7" => Keysym::F7,
        "f8" => Keysym::F8,
        "f9" => Keysym::F9,
        "f10" => Keysym::F10,
        "f11" => Keysym::F11,
        "f12" => Keysym::F12,
        _ => return None,
    };
    Some(sym)
}

#[cfg(test)]
mod tests {
    use super::{
        keysym_from_name, keysym_to_lower, match_change_workspace, match_key, KeyBinding,
        BindKind, MOD_ALT, MOD_CTRL,
    };
    use crate::cmd::Action;
    use xkeysym::Keysym;

    fn sym(c: char) -> Keysym {
        keysym_from_name(&c.to_string()).unwrap()
    }

    #[test]
    fn later_entries_override_earlier() {
        let bindings = vec![
            KeyBinding::keysym(sym('m'), MOD_ALT, Action::ToggleMaximize, 0, None),
            KeyBinding::keysym(sym('m'), MOD_ALT, Action::ToggleMinimize, 0, None),
        ];
        let m = match_key(&bindings, 58, u32::from(sym('m')), MOD_ALT, None).unwrap();
        assert_eq!(1, m.index);
    }

    #[test]
    fn modifier_mask_is_exact() {
        let bindings = vec![KeyBinding::keysym(
            sym('m'),
            MOD_ALT,
            Action::ToggleMaximize,
            0,
            None,
        )];
        assert!(match_key(&bindings, 58, u32::from(sym('m')), MOD_ALT | MOD_CTRL, None).is_none());
        assert!(match_key(&bindings, 58, u32::from(sym('m')), 0, None).is_none());
    }

    #[test]
    fn incoming_sym_is_lower_cased() {
        let bindings = vec![KeyBinding::keysym(
            sym('m'),
            MOD_ALT,
            Action::ToggleMaximize,
            0,
            None,
        )];
        assert!(match_key(&bindings, 58, 'M' as u32, MOD_ALT, None).is_some());
    }

    #[test]
    fn placeholder_only_fires_without_specific_match() {
        let bindings = vec![
            KeyBinding::placeholder(MOD_ALT, Action::MarkWindow, 0, None),
            KeyBinding::keysym(sym('g'), MOD_ALT, Action::GotoMarkedWindow, 0, None),
        ];
        let m = match_key(&bindings, 42, u32::from(sym('g')), MOD_ALT, None).unwrap();
        assert_eq!(1, m.index);
        assert_eq!(0, m.placeholder_keycode);
        let m = match_key(&bindings, 43, u32::from(sym('h')), MOD_ALT, None).unwrap();
        assert_eq!(0, m.index);
        assert_eq!(43, m.placeholder_keycode);
    }

    #[test]
    fn mode_scoping() {
        let bindings = vec![
            KeyBinding::keysym(sym('x'), MOD_ALT, Action::Close, 0, None),
            KeyBinding::keysym(sym('x'), MOD_ALT, Action::Kill, 0, None).with_mode(Some("danger")),
        ];
        let m = match_key(&bindings, 10, u32::from(sym('x')), MOD_ALT, None).unwrap();
        assert_eq!(0, m.index);
        let m = match_key(&bindings, 10, u32::from(sym('x')), MOD_ALT, Some("danger")).unwrap();
        assert_eq!(1, m.index);
        // "default" and empty both mean the default mode
        let m = match_key(&bindings, 10, u32::from(sym('x')), MOD_ALT, Some("default")).unwrap();
        assert_eq!(0, m.index);
    }

    #[test]
    fn change_workspace_entries_are_key_inert() {
        let bindings = vec![KeyBinding::change_workspace(Action::Exec, 0, Some("true"))];
        assert_eq!(BindKind::ChangeWorkspace, bindings[0].kind);
        assert!(match_key(&bindings, 10, 'a' as u32, 0, None).is_none());
        assert_eq!(Some(0), match_change_workspace(&bindings, None));
        assert_eq!(None, match_change_workspace(&bindings, Some("other")));
    }

    #[test]
    fn keysym_helpers() {
        assert_eq!('a' as u32, keysym_to_lower('A' as u32));
        assert_eq!('a' as u32, keysym_to_lower('a' as u32));
        assert_eq!(0xd7, keysym_to_lower(0xd7));
        assert_eq!(Some(Keysym::Return), keysym_from_name("Return"));
        assert_eq!(Some(Keysym::F9), keysym_from_name("F9"));
        assert_eq!(None, keysym_from_name("NoSuchKey"));
        assert_eq!(
            u32::from(keysym_from_name("m").unwrap()),
            u32::from(keysym_from_name("M").unwrap())
        );
    }
}
