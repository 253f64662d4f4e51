//! The protocol shim. The core never pokes the wire; it records the calls
//! the per-kind surface handles would make and the embedding (or a test)
//! drains them. Incoming protocol traffic arrives as `ShimEvent`s.

use fluxway_core::state::view::{ViewId, ViewKind};

/// Outbound protocol effects: native toplevels take sizes and state,
/// legacy toplevels take full configures and X-side property writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolOp {
    /// Native: request a new content size.
    SetSize { id: ViewId, w: i32, h: i32 },
    /// Legacy: position and size in one configure.
    Configure {
        id: ViewId,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
    },
    SetMaximized { id: ViewId, h: bool, v: bool },
    SetFullscreen { id: ViewId, on: bool },
    SetMinimized { id: ViewId, on: bool },
    SetActivated { id: ViewId, on: bool },
    SendClose { id: ViewId, force: bool },
    ScheduleConfigure { id: ViewId },
    SetXProp {
        id: ViewId,
        name: String,
        value: String,
    },
    ForeignSetMaximized { id: ViewId, on: bool },
    ForeignSetMinimized { id: ViewId, on: bool },
    ForeignSetActivated { id: ViewId, on: bool },
    ForeignSetTitle { id: ViewId, title: String },
    ForeignOutputEnter { id: ViewId, output: String },
}

/// Requests to the embedding compositor for surfaces the core does not own:
/// menus, dialogs, lifecycle. Absence of a consumer means no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiRequest {
    Terminate,
    Restart { cmd: Option<String> },
    OpenRootMenu {
        x: i32,
        y: i32,
        menu_file: Option<String>,
    },
    OpenWindowMenu { id: ViewId, x: i32, y: i32 },
    OpenWorkspaceMenu { x: i32, y: i32 },
    OpenClientMenu {
        x: i32,
        y: i32,
        pattern: Option<String>,
    },
    CloseMenus { why: &'static str },
    CommandDialog { prompt: String, initial: String },
    KeyModeChanged { mode: Option<String> },
    ToggleToolbarHidden,
    ToggleToolbarAbove,
    ToggleSlitHidden,
    ToggleSlitAbove,
}

/// Inbound surface lifecycle and request traffic, already decoded from the
/// wire by the hosting compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShimEvent {
    SurfaceNew { kind: ViewKind },
    Map { id: ViewId },
    Unmap { id: ViewId },
    Destroy { id: ViewId },
    /// A committed content size.
    Commit { id: ViewId, w: i32, h: i32 },
    TitleChanged { id: ViewId, title: String },
    AppIdChanged { id: ViewId, app_id: String },
    RequestMaximize { id: ViewId, on: bool },
    RequestFullscreen { id: ViewId, on: bool },
    RequestMinimize { id: ViewId, on: bool },
    RequestActivate { id: ViewId },
    RequestClose { id: ViewId },
    /// Legacy urgency (demands-attention or hint) changed.
    UrgencyChanged { id: ViewId, urgent: bool },
    /// Legacy configure request.
    RequestConfigure {
        id: ViewId,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
    },
}
