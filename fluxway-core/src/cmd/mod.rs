pub mod lang;

use crate::state::layer::{
    LAYER_NUM_ABOVE_DOCK, LAYER_NUM_BOTTOM, LAYER_NUM_DESKTOP, LAYER_NUM_DOCK, LAYER_NUM_NORMAL,
    LAYER_NUM_OVERLAY, LAYER_NUM_TOP,
};

/// Every action the command language can produce. The executor has exactly
/// one arm per variant; payloads travel separately as `(arg, cmd)` the way
/// the resolver emits them.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Action {
    Exit,
    Restart,
    Exec,
    SetEnv,
    CommandDialog,
    Reconfigure,
    ReloadStyle,
    SetStyle,
    SaveRc,
    SetResourceValue,
    SetResourceValueDialog,
    KeyMode,
    FocusNext,
    FocusPrev,
    FocusNextGroup,
    FocusPrevGroup,
    GotoWindow,
    Attach,
    ShowDesktop,
    ArrangeWindows,
    Unclutter,
    TabNext,
    TabPrev,
    TabGoto,
    TabActivate,
    MoveTabLeft,
    MoveTabRight,
    DetachClient,
    ToggleMaximize,
    ToggleMaximizeHorizontal,
    ToggleMaximizeVertical,
    ToggleFullscreen,
    ToggleMinimize,
    Deiconify,
    MarkWindow,
    GotoMarkedWindow,
    Close,
    Kill,
    CloseAllWindows,
    ToggleShade,
    ShadeOn,
    ShadeOff,
    ToggleStick,
    StickOn,
    StickOff,
    SetAlpha,
    ToggleDecor,
    SetDecor,
    SetTitle,
    SetTitleDialog,
    WindowMenu,
    RootMenu,
    WorkspaceMenu,
    ClientMenu,
    HideMenus,
    AddWorkspace,
    RemoveLastWorkspace,
    SetWorkspaceName,
    SetWorkspaceNameDialog,
    ToggleToolbarHidden,
    ToggleToolbarAbove,
    ToggleSlitHidden,
    ToggleSlitAbove,
    WorkspaceSwitch,
    WorkspaceNext,
    WorkspacePrev,
    SendToWorkspace,
    TakeToWorkspace,
    SendToRelWorkspace,
    TakeToRelWorkspace,
    SetHead,
    SendToRelHead,
    Raise,
    Lower,
    RaiseLayer,
    LowerLayer,
    SetLayer,
    Focus,
    FocusDir,
    SetXProp,
    StartMoving,
    StartResizing,
    StartTabbing,
    MoveTo,
    MoveRel,
    ResizeTo,
    ResizeRel,
    If,
    Foreach,
    ToggleCmd,
    Delay,
    Macro,
}

// ArrangeWindows methods.
pub const ARRANGE_UNSPECIFIED: i32 = 0;
pub const ARRANGE_VERTICAL: i32 = 1;
pub const ARRANGE_HORIZONTAL: i32 = 2;
pub const ARRANGE_STACK_LEFT: i32 = 3;
pub const ARRANGE_STACK_RIGHT: i32 = 4;
pub const ARRANGE_STACK_TOP: i32 = 5;
pub const ARRANGE_STACK_BOTTOM: i32 = 6;

// FocusDir directions, matching `geometry::Direction::from_arg`.
pub const FOCUS_DIR_LEFT: i32 = 0;
pub const FOCUS_DIR_RIGHT: i32 = 1;
pub const FOCUS_DIR_UP: i32 = 2;
pub const FOCUS_DIR_DOWN: i32 = 3;

/// A resolved command line: tagged action plus optional integer argument and
/// payload text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub action: Action,
    pub arg: i32,
    pub cmd: Option<String>,
}

impl Resolved {
    fn plain(action: Action) -> Self {
        Resolved {
            action,
            arg: 0,
            cmd: None,
        }
    }

    fn with_arg(action: Action, arg: i32) -> Self {
        Resolved {
            action,
            arg,
            cmd: None,
        }
    }

    fn with_cmd(action: Action, cmd: &str) -> Self {
        Resolved {
            action,
            arg: 0,
            cmd: Some(cmd.to_string()),
        }
    }

    fn with_arg_cmd(action: Action, arg: i32, cmd: &str) -> Self {
        Resolved {
            action,
            arg,
            cmd: Some(cmd.to_string()),
        }
    }
}

const INT_ARG_LIMIT: i64 = 100_000;

/// Workspace arguments are one-based in command text, zero-based internally.
/// Zero and negative indices are malformed.
fn parse_one_based(s: &str) -> Option<i32> {
    let s = s.trim_start();
    let (digits, _) = split_leading_int(s)?;
    let ws: i64 = digits.parse().ok()?;
    if !(1..=INT_ARG_LIMIT).contains(&ws) {
        return None;
    }
    Some((ws - 1) as i32)
}

/// Leading integer with a default when the string is empty; trailing text is
/// allowed, an unparseable head is not.
fn parse_leading_int(s: &str, default: i32) -> Option<i32> {
    let s = s.trim_start();
    if s.is_empty() {
        return Some(default);
    }
    let (digits, _) = split_leading_int(s)?;
    let v: i64 = digits.parse().ok()?;
    if !(-INT_ARG_LIMIT..=INT_ARG_LIMIT).contains(&v) {
        return None;
    }
    Some(v as i32)
}

fn split_leading_int(s: &str) -> Option<(&str, &str)> {
    let mut end = 0;
    let bytes = s.as_bytes();
    if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
        end += 1;
    }
    let digit_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digit_start {
        return None;
    }
    Some((&s[..end], &s[end..]))
}

fn parse_layer_arg(s: &str) -> Option<i32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some((digits, rest)) = split_leading_int(s) {
        if rest.trim().is_empty() {
            return digits.parse().ok();
        }
    }
    let layer = match s.to_ascii_lowercase().as_str() {
        "menu" | "overlay" => LAYER_NUM_OVERLAY,
        "abovedock" => LAYER_NUM_ABOVE_DOCK,
        "dock" => LAYER_NUM_DOCK,
        "top" => LAYER_NUM_TOP,
        "normal" => LAYER_NUM_NORMAL,
        "bottom" => LAYER_NUM_BOTTOM,
        "desktop" | "background" => LAYER_NUM_DESKTOP,
        _ => return None,
    };
    Some(layer)
}

fn nonempty(args: &str) -> Option<&str> {
    let trimmed = args.trim_start();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn has_tokens(args: &str, min: usize) -> bool {
    args.split_whitespace().count() >= min
}

/// Resolve one textual command token plus argument string. Name matching is
/// case-insensitive; `None` means unrecognized or obviously malformed input
/// and the caller does nothing.
#[must_use]
pub fn resolve(cmd_name: &str, cmd_args: &str) -> Option<Resolved> {
    if cmd_name.is_empty() {
        return None;
    }
    let name = cmd_name.to_ascii_lowercase();
    let out = match name.as_str() {
        "execcommand" | "exec" | "execute" => {
            Resolved::with_cmd(Action::Exec, nonempty(cmd_args)?)
        }
        "setenv" | "export" => Resolved::with_cmd(Action::SetEnv, nonempty(cmd_args)?),
        "commanddialog" | "rundialog" => Resolved::plain(Action::CommandDialog),
        "exit" | "quit" => Resolved::plain(Action::Exit),
        "restart" => match nonempty(cmd_args) {
            Some(rest) => Resolved::with_cmd(Action::Restart, rest),
            None => Resolved::plain(Action::Restart),
        },
        "reconfig" | "reconfigure" => Resolved::plain(Action::Reconfigure),
        "reloadstyle" => Resolved::plain(Action::ReloadStyle),
        "setstyle" => Resolved::with_cmd(Action::SetStyle, nonempty(cmd_args)?),
        "saverc" => Resolved::plain(Action::SaveRc),
        "setresourcevalue" => Resolved::with_cmd(Action::SetResourceValue, nonempty(cmd_args)?),
        "setresourcevaluedialog" => Resolved::plain(Action::SetResourceValueDialog),
        "keymode" => Resolved::with_cmd(Action::KeyMode, nonempty(cmd_args)?),
        "nextwindow" => opt_cmd(Action::FocusNext, cmd_args),
        "prevwindow" => opt_cmd(Action::FocusPrev, cmd_args),
        "nextgroup" => opt_cmd(Action::FocusNextGroup, cmd_args),
        "prevgroup" => opt_cmd(Action::FocusPrevGroup, cmd_args),
        "gotowindow" => {
            let rest = nonempty(cmd_args)?;
            let (digits, tail) = split_leading_int(rest)?;
            let num: i64 = digits.parse().ok()?;
            let tail = tail.trim_start();
            if tail.is_empty() {
                Resolved::with_arg(Action::GotoWindow, num as i32)
            } else {
                Resolved::with_arg_cmd(Action::GotoWindow, num as i32, tail)
            }
        }
        "attach" => opt_cmd(Action::Attach, cmd_args),
        "showdesktop" => Resolved::plain(Action::ShowDesktop),
        "arrangewindows" => arrange(ARRANGE_UNSPECIFIED, cmd_args),
        "arrangewindowsvertical" => arrange(ARRANGE_VERTICAL, cmd_args),
        "arrangewindowshorizontal" => arrange(ARRANGE_HORIZONTAL, cmd_args),
        "arrangewindowsstackleft" => arrange(ARRANGE_STACK_LEFT, cmd_args),
        "arrangewindowsstackright" => arrange(ARRANGE_STACK_RIGHT, cmd_args),
        "arrangewindowsstacktop" => arrange(ARRANGE_STACK_TOP, cmd_args),
        "arrangewindowsstackbottom" => arrange(ARRANGE_STACK_BOTTOM, cmd_args),
        "unclutter" => opt_cmd(Action::Unclutter, cmd_args),
        "nexttab" => Resolved::plain(Action::TabNext),
        "prevtab" => Resolved::plain(Action::TabPrev),
        "tab" => {
            let mut tab0 = 0;
            if let Some(rest) = nonempty(cmd_args) {
                let (digits, tail) = split_leading_int(rest)?;
                if !tail.trim().is_empty() {
                    return None;
                }
                let tab: i64 = digits.parse().ok()?;
                if !(1..=INT_ARG_LIMIT).contains(&tab) {
                    return None;
                }
                tab0 = (tab - 1) as i32;
            }
            Resolved::with_arg(Action::TabGoto, tab0)
        }
        "activatetab" => Resolved::plain(Action::TabActivate),
        "movetableft" => Resolved::plain(Action::MoveTabLeft),
        "movetabright" => Resolved::plain(Action::MoveTabRight),
        "detachclient" => Resolved::plain(Action::DetachClient),
        "maximize" | "maximizewindow" => Resolved::plain(Action::ToggleMaximize),
        "maximizehorizontal" => Resolved::plain(Action::ToggleMaximizeHorizontal),
        "maximizevertical" => Resolved::plain(Action::ToggleMaximizeVertical),
        "fullscreen" => Resolved::plain(Action::ToggleFullscreen),
        "minimize" | "minimizewindow" | "iconify" => Resolved::plain(Action::ToggleMinimize),
        "deiconify" => opt_cmd(Action::Deiconify, cmd_args),
        "markwindow" => Resolved::plain(Action::MarkWindow),
        "gotomarkedwindow" => Resolved::plain(Action::GotoMarkedWindow),
        "close" => Resolved::plain(Action::Close),
        "kill" | "killwindow" => Resolved::plain(Action::Kill),
        "closeallwindows" => Resolved::plain(Action::CloseAllWindows),
        "shade" | "shadewindow" => Resolved::plain(Action::ToggleShade),
        "shadeon" => Resolved::plain(Action::ShadeOn),
        "shadeoff" => Resolved::plain(Action::ShadeOff),
        "stick" | "stickwindow" => Resolved::plain(Action::ToggleStick),
        "stickon" => Resolved::plain(Action::StickOn),
        "stickoff" => Resolved::plain(Action::StickOff),
        "setalpha" => opt_cmd(Action::SetAlpha, cmd_args),
        "toggledecor" => Resolved::plain(Action::ToggleDecor),
        "setdecor" => Resolved::with_cmd(Action::SetDecor, nonempty(cmd_args)?),
        "settitle" => opt_cmd(Action::SetTitle, cmd_args),
        "settitledialog" => Resolved::plain(Action::SetTitleDialog),
        "windowmenu" => Resolved::plain(Action::WindowMenu),
        "rootmenu" => Resolved::plain(Action::RootMenu),
        "custommenu" => Resolved::with_cmd(Action::RootMenu, nonempty(cmd_args)?),
        "workspacemenu" => Resolved::plain(Action::WorkspaceMenu),
        "clientmenu" => opt_cmd(Action::ClientMenu, cmd_args),
        "hidemenu" | "hidemenus" => Resolved::plain(Action::HideMenus),
        "addworkspace" => Resolved::plain(Action::AddWorkspace),
        "removelastworkspace" => Resolved::plain(Action::RemoveLastWorkspace),
        "setworkspacename" => match nonempty(cmd_args) {
            Some(rest) => Resolved::with_cmd(Action::SetWorkspaceName, rest),
            None => Resolved::plain(Action::SetWorkspaceName),
        },
        "setworkspacenamedialog" => Resolved::plain(Action::SetWorkspaceNameDialog),
        "toggletoolbarhidden" | "toggletoolbarvisible" => {
            Resolved::plain(Action::ToggleToolbarHidden)
        }
        "toggletoolbarabove" => Resolved::plain(Action::ToggleToolbarAbove),
        "toggleslithidden" => Resolved::plain(Action::ToggleSlitHidden),
        "toggleslitabove" | "toggleslitbarabove" => Resolved::plain(Action::ToggleSlitAbove),
        "workspace" => Resolved::with_arg(Action::WorkspaceSwitch, parse_one_based(cmd_args)?),
        "nextworkspace" => {
            Resolved::with_arg(Action::WorkspaceNext, parse_leading_int(cmd_args, 1)?)
        }
        "prevworkspace" => {
            Resolved::with_arg(Action::WorkspacePrev, parse_leading_int(cmd_args, 1)?)
        }
        "rightworkspace" => Resolved::with_arg_cmd(
            Action::WorkspaceNext,
            parse_leading_int(cmd_args, 1)?,
            "nowrap",
        ),
        "leftworkspace" => Resolved::with_arg_cmd(
            Action::WorkspacePrev,
            parse_leading_int(cmd_args, 1)?,
            "nowrap",
        ),
        "sendtoworkspace" => {
            Resolved::with_arg(Action::SendToWorkspace, parse_one_based(cmd_args)?)
        }
        "taketoworkspace" => {
            Resolved::with_arg(Action::TakeToWorkspace, parse_one_based(cmd_args)?)
        }
        "sendtonextworkspace" => {
            Resolved::with_arg(Action::SendToRelWorkspace, parse_leading_int(cmd_args, 1)?)
        }
        "sendtoprevworkspace" => {
            Resolved::with_arg(Action::SendToRelWorkspace, -parse_leading_int(cmd_args, 1)?)
        }
        "taketonextworkspace" => {
            Resolved::with_arg(Action::TakeToRelWorkspace, parse_leading_int(cmd_args, 1)?)
        }
        "taketoprevworkspace" => {
            Resolved::with_arg(Action::TakeToRelWorkspace, -parse_leading_int(cmd_args, 1)?)
        }
        "sethead" => Resolved::with_arg(Action::SetHead, parse_leading_int(cmd_args, 1)?),
        "sendtonexthead" => {
            Resolved::with_arg(Action::SendToRelHead, parse_leading_int(cmd_args, 1)?)
        }
        "sendtoprevhead" => {
            Resolved::with_arg(Action::SendToRelHead, -parse_leading_int(cmd_args, 1)?)
        }
        "raise" => Resolved::plain(Action::Raise),
        "lower" => Resolved::plain(Action::Lower),
        "raiselayer" => Resolved::with_arg(Action::RaiseLayer, parse_leading_int(cmd_args, 1)?),
        "lowerlayer" => Resolved::with_arg(Action::LowerLayer, parse_leading_int(cmd_args, 1)?),
        "setlayer" => Resolved::with_arg(Action::SetLayer, parse_layer_arg(cmd_args)?),
        "activate" | "focus" => match nonempty(cmd_args) {
            Some(rest) => Resolved::with_arg_cmd(Action::GotoWindow, 1, rest),
            None => Resolved::plain(Action::Focus),
        },
        "focusleft" => Resolved::with_arg(Action::FocusDir, FOCUS_DIR_LEFT),
        "focusright" => Resolved::with_arg(Action::FocusDir, FOCUS_DIR_RIGHT),
        "focusup" => Resolved::with_arg(Action::FocusDir, FOCUS_DIR_UP),
        "focusdown" => Resolved::with_arg(Action::FocusDir, FOCUS_DIR_DOWN),
        "moveto" => {
            if !has_tokens(cmd_args, 2) {
                return None;
            }
            Resolved::with_cmd(Action::MoveTo, cmd_args)
        }
        "move" => Resolved::with_arg_cmd(Action::MoveRel, 0, cmd_args),
        "moveright" => Resolved::with_arg_cmd(Action::MoveRel, 1, cmd_args),
        "moveleft" => Resolved::with_arg_cmd(Action::MoveRel, 2, cmd_args),
        "moveup" => Resolved::with_arg_cmd(Action::MoveRel, 3, cmd_args),
        "movedown" => Resolved::with_arg_cmd(Action::MoveRel, 4, cmd_args),
        "resizeto" => {
            if !has_tokens(cmd_args, 2) {
                return None;
            }
            Resolved::with_cmd(Action::ResizeTo, cmd_args)
        }
        "resize" => {
            if !has_tokens(cmd_args, 2) {
                return None;
            }
            Resolved::with_arg_cmd(Action::ResizeRel, 0, cmd_args)
        }
        "resizehorizontal" => {
            if !has_tokens(cmd_args, 1) {
                return None;
            }
            Resolved::with_arg_cmd(Action::ResizeRel, 1, cmd_args)
        }
        "resizevertical" => {
            if !has_tokens(cmd_args, 1) {
                return None;
            }
            Resolved::with_arg_cmd(Action::ResizeRel, 2, cmd_args)
        }
        "setxprop" => {
            let rest = nonempty(cmd_args)?;
            if rest.len() < 2 || rest.starts_with('=') {
                return None;
            }
            Resolved::with_cmd(Action::SetXProp, rest)
        }
        "startmoving" => Resolved::plain(Action::StartMoving),
        "startresizing" => opt_cmd(Action::StartResizing, cmd_args),
        "starttabbing" => Resolved::plain(Action::StartTabbing),
        "if" | "cond" => Resolved::with_cmd(Action::If, nonempty(cmd_args)?),
        "foreach" | "map" => Resolved::with_cmd(Action::Foreach, nonempty(cmd_args)?),
        "togglecmd" => Resolved::with_cmd(Action::ToggleCmd, nonempty(cmd_args)?),
        "delay" => Resolved::with_cmd(Action::Delay, nonempty(cmd_args)?),
        "macrocmd" => Resolved::with_cmd(Action::Macro, nonempty(cmd_args)?),
        _ => return None,
    };
    Some(out)
}

fn opt_cmd(action: Action, args: &str) -> Resolved {
    match nonempty(args) {
        Some(rest) => Resolved::with_cmd(action, rest),
        None => Resolved::plain(action),
    }
}

fn arrange(method: i32, args: &str) -> Resolved {
    match nonempty(args) {
        Some(rest) => Resolved::with_arg_cmd(Action::ArrangeWindows, method, rest),
        None => Resolved::with_arg(Action::ArrangeWindows, method),
    }
}

/// Split a command line into the name token and the rest.
#[must_use]
pub fn split_command_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.find(char::is_whitespace) {
        Some(pos) => Some((&line[..pos], line[pos..].trim())),
        None => Some((line, "")),
    }
}

/// Resolve a whole command line.
#[must_use]
pub fn resolve_line(line: &str) -> Option<Resolved> {
    let (name, args) = split_command_line(line)?;
    resolve(name, args)
}

#[cfg(test)]
mod tests {
    use super::{
        resolve, resolve_line, Action, Resolved, ARRANGE_STACK_LEFT, ARRANGE_VERTICAL,
        FOCUS_DIR_DOWN, FOCUS_DIR_RIGHT,
    };

    fn ok(line: &str) -> Resolved {
        resolve_line(line).unwrap_or_else(|| panic!("{line} did not resolve"))
    }

    #[test]
    fn workspace_commands_are_one_based() {
        assert_eq!(
            Resolved {
                action: Action::WorkspaceSwitch,
                arg: 2,
                cmd: None
            },
            ok("Workspace 3")
        );
        assert_eq!(0, ok("Workspace 1").arg);
        // One-based input: zero and garbage are rejected
        assert!(resolve("workspace", "0").is_none());
        assert!(resolve("workspace", "-2").is_none());
        assert!(resolve("workspace", "abc").is_none());
        assert!(resolve("workspace", "").is_none());
        assert_eq!(0, ok("SendToWorkspace 1").arg);
        assert_eq!(4, ok("TakeToWorkspace 5").arg);
    }

    #[test]
    fn relative_workspace_commands() {
        assert_eq!(
            Resolved {
                action: Action::WorkspaceNext,
                arg: 2,
                cmd: None
            },
            ok("NextWorkspace 2")
        );
        assert_eq!(1, ok("NextWorkspace").arg);
        let right = ok("RightWorkspace");
        assert_eq!(Action::WorkspaceNext, right.action);
        assert_eq!(1, right.arg);
        assert_eq!(Some("nowrap".to_string()), right.cmd);
        assert_eq!(Some("nowrap".to_string()), ok("LeftWorkspace 2").cmd);
        assert_eq!(-3, ok("SendToPrevWorkspace 3").arg);
        assert_eq!(2, ok("TakeToNextWorkspace 2").arg);
    }

    #[test]
    fn layer_keywords_map_to_numbers() {
        assert_eq!(6, ok("SetLayer Top").arg);
        assert_eq!(0, ok("SetLayer overlay").arg);
        assert_eq!(0, ok("SetLayer Menu").arg);
        assert_eq!(12, ok("SetLayer background").arg);
        assert_eq!(4, ok("SetLayer dock").arg);
        assert_eq!(8, ok("SetLayer 8").arg);
        assert!(resolve("setlayer", "floating").is_none());
        assert!(resolve("setlayer", "").is_none());
    }

    #[test]
    fn tabs_and_arrange() {
        assert_eq!(
            Resolved {
                action: Action::TabGoto,
                arg: 3,
                cmd: None
            },
            ok("Tab 4")
        );
        assert_eq!(0, ok("Tab").arg);
        assert!(resolve("tab", "0").is_none());
        assert!(resolve("tab", "2 extra").is_none());
        let arr = ok("ArrangeWindowsVertical");
        assert_eq!(Action::ArrangeWindows, arr.action);
        assert_eq!(ARRANGE_VERTICAL, arr.arg);
        let arr = ok("ArrangeWindowsStackLeft (class=term)");
        assert_eq!(ARRANGE_STACK_LEFT, arr.arg);
        assert_eq!(Some("(class=term)".to_string()), arr.cmd);
    }

    #[test]
    fn exec_and_aliases() {
        for name in ["exec", "Execute", "ExecCommand"] {
            let r = resolve(name, "xterm -e top").unwrap();
            assert_eq!(Action::Exec, r.action);
            assert_eq!(Some("xterm -e top".to_string()), r.cmd);
        }
        assert!(resolve("exec", "").is_none());
        assert_eq!(Action::Exit, ok("quit").action);
        assert_eq!(Action::Reconfigure, ok("Reconfig").action);
        assert_eq!(Action::Reconfigure, ok("reconfigure").action);
        assert_eq!(Action::SetEnv, ok("Export FOO=bar").action);
        assert_eq!(Action::Kill, ok("KillWindow").action);
    }

    #[test]
    fn activate_with_pattern_becomes_goto_window() {
        let r = ok("Activate (class=Firefox)");
        assert_eq!(Action::GotoWindow, r.action);
        assert_eq!(1, r.arg);
        assert_eq!(Some("(class=Firefox)".to_string()), r.cmd);
        assert_eq!(Action::Focus, ok("Focus").action);
        assert_eq!(FOCUS_DIR_RIGHT, ok("FocusRight").arg);
        assert_eq!(FOCUS_DIR_DOWN, ok("FocusDown").arg);
    }

    #[test]
    fn move_resize_argument_validation() {
        assert!(resolve("moveto", "10").is_none());
        assert_eq!(Action::MoveTo, ok("MoveTo 10 20").action);
        assert_eq!(1, ok("MoveRight 10").arg);
        assert_eq!(4, ok("MoveDown 10").arg);
        assert!(resolve("resize", "5").is_none());
        assert_eq!(2, ok("ResizeVertical 5").arg);
        assert!(resolve("resizehorizontal", "").is_none());
    }

    #[test]
    fn setxprop_validation() {
        assert_eq!(Action::SetXProp, ok("SetXProp _MY_PROP=on").action);
        assert!(resolve("setxprop", "=x").is_none());
        assert!(resolve("setxprop", "").is_none());
    }

    #[test]
    fn goto_window_takes_index_and_optional_pattern() {
        let r = ok("GotoWindow 2 (class=term)");
        assert_eq!(Action::GotoWindow, r.action);
        assert_eq!(2, r.arg);
        assert_eq!(Some("(class=term)".to_string()), r.cmd);
        assert_eq!(None, ok("GotoWindow 2").cmd);
        assert!(resolve("gotowindow", "pattern-only").is_none());
    }

    #[test]
    fn language_commands_require_args() {
        for name in ["if", "cond", "foreach", "map", "togglecmd", "delay", "macrocmd"] {
            assert!(resolve(name, "").is_none(), "{name} with empty args");
            assert!(resolve(name, "{ x }").is_some());
        }
    }

    #[test]
    fn unknown_commands_do_not_resolve() {
        assert!(resolve("frobnicate", "").is_none());
        assert!(resolve_line("").is_none());
        assert!(resolve_line("   ").is_none());
    }

    #[test]
    fn head_commands() {
        assert_eq!(2, ok("SetHead 2").arg);
        assert_eq!(1, ok("SetHead").arg);
        assert_eq!(-1, ok("SendToPrevHead").arg);
        assert_eq!(3, ok("SendToNextHead 3").arg);
    }
}
