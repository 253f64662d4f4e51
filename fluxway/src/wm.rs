use std::time::{Duration, Instant};

use fluxway_core::geometry::head_map::Output;
use fluxway_core::state::view::DecorHitKind;
use fluxway_core::state::view::ViewId;

use crate::error::{Error, Result};
use crate::server::shim::{ProtocolOp, ShimEvent, UiRequest};
use crate::server::Server;
use fluxway_core::config::mouse_map::{MouseContext, MouseEventKind};

/// Input and lifecycle traffic from the hosting compositor backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BackendEvent {
    Shim(ShimEvent),
    Key {
        keycode: u32,
        sym: u32,
        modifiers: u32,
    },
    PointerMotion {
        x: i32,
        y: i32,
    },
    PointerButton {
        button: u32,
        modifiers: u32,
        pressed: bool,
    },
    OutputsChanged(Vec<Output>),
    Closed,
}

/// The compositor side of the fence: event intake plus the sink for the
/// core's queued protocol and UI effects.
pub(crate) trait Backend {
    fn initial_outputs(&self) -> Vec<Output>;
    fn poll_events(&mut self) -> Vec<BackendEvent>;
    fn dispatch(&mut self, ops: Vec<ProtocolOp>, ui: &[UiRequest]);
    /// Fd to block on between events, when the backend has one.
    fn event_fd(&self) -> Option<std::os::unix::io::RawFd> {
        None
    }
}

/// A build without a compositor backend: no outputs, immediate close.
struct NullBackend;

impl Backend for NullBackend {
    fn initial_outputs(&self) -> Vec<Output> {
        Vec::new()
    }

    fn poll_events(&mut self) -> Vec<BackendEvent> {
        vec![BackendEvent::Closed]
    }

    fn dispatch(&mut self, _ops: Vec<ProtocolOp>, _ui: &[UiRequest]) {}
}

pub(crate) fn run_wm() -> Result<()> {
    #[cfg(feature = "config-file")]
    let cfg = fluxway_core::config::load_cfg::load_cfg(
        std::env::var("XDG_CONFIG_HOME").ok().as_deref(),
        std::env::var("HOME").ok().as_deref(),
    )
    .unwrap_or_default();
    #[cfg(not(feature = "config-file"))]
    let cfg = fluxway_core::config::Cfg::default();

    let mut backend = NullBackend;
    let mut server = Server::new(cfg, backend.initial_outputs())?;
    server.config_dir = Server::default_config_dir();
    match run_session(&mut backend, &mut server) {
        Err(Error::GracefulShutdown) | Ok(()) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Pump backend events and timers until the session ends. Within one event
/// all actions run to completion before the next is looked at.
pub(crate) fn run_session<B: Backend>(backend: &mut B, server: &mut Server) -> Result<()> {
    loop {
        for event in backend.poll_events() {
            handle_event(server, event)?;
            flush_effects(backend, server)?;
        }
        server.tick(Instant::now());
        flush_effects(backend, server)?;

        let timeout = server
            .timers
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()));
        wait_for_event(backend.event_fd(), timeout)?;
    }
}

fn flush_effects<B: Backend>(backend: &mut B, server: &mut Server) -> Result<()> {
    if server.ops.is_empty() && server.ui.is_empty() {
        return Ok(());
    }
    let ops = std::mem::take(&mut server.ops);
    let ui = std::mem::take(&mut server.ui);
    backend.dispatch(ops, &ui);
    for request in &ui {
        match request {
            UiRequest::Terminate => return Err(Error::GracefulShutdown),
            UiRequest::Restart { .. } => return Err(Error::FullRestart),
            _ => {}
        }
    }
    Ok(())
}

fn handle_event(server: &mut Server, event: BackendEvent) -> Result<()> {
    match event {
        BackendEvent::Shim(ev) => server.handle_shim_event(ev),
        BackendEvent::Key {
            keycode,
            sym,
            modifiers,
        } => {
            let _ = server.handle_key(keycode, sym, modifiers);
        }
        BackendEvent::PointerMotion { x, y } => server.handle_motion(x, y),
        BackendEvent::PointerButton {
            button,
            modifiers,
            pressed,
        } => {
            if pressed {
                let (context, target) = mousebinding_context_at(server);
                let handled = server.handle_button(
                    context,
                    MouseEventKind::Press,
                    button,
                    modifiers,
                    target,
                );
                // An unbound press falls through to click focus
                if !handled {
                    server.handle_click_focus();
                }
            } else {
                server.handle_button_release(button);
            }
        }
        BackendEvent::OutputsChanged(outputs) => server.outputs_changed(outputs),
        BackendEvent::Closed => return Err(Error::GracefulShutdown),
    }
    Ok(())
}

/// Mouse binding context under the cursor: desktop when nothing is hit,
/// titlebar/handle when a decoration is, the window otherwise.
fn mousebinding_context_at(server: &Server) -> (MouseContext, Option<ViewId>) {
    let (x, y) = server.cursor;
    let Some(id) = server
        .scene
        .view_at(&server.core, &server.decor_theme, x, y)
    else {
        return (MouseContext::Desktop, None);
    };
    let Some(view) = server.core.view(id) else {
        return (MouseContext::Desktop, None);
    };
    let hit = view.decor_hit_test(&server.decor_theme, x, y);
    let context = match hit.kind {
        DecorHitKind::Titlebar => MouseContext::Titlebar,
        DecorHitKind::Resize => MouseContext::Handle,
        _ => MouseContext::Window,
    };
    (context, Some(id))
}

fn wait_for_event(
    fd: Option<std::os::unix::io::RawFd>,
    timeout: Option<Duration>,
) -> Result<bool> {
    const IDLE_DEADLINE: Duration = Duration::from_millis(1000);
    let deadline = timeout.unwrap_or(IDLE_DEADLINE).min(IDLE_DEADLINE);
    let Some(fd) = fd else {
        std::thread::sleep(deadline);
        return Ok(false);
    };

    use std::os::raw::c_int;

    use nix::poll::{poll, PollFd, PollFlags};

    let start = Instant::now();
    let mut poll_fds = [PollFd::new(fd, PollFlags::POLLIN)];
    loop {
        if let Some(timeout_millis) = deadline
            .checked_sub(start.elapsed())
            .map(|remaining| c_int::try_from(remaining.as_millis()).unwrap_or(c_int::MAX))
        {
            match poll(&mut poll_fds, timeout_millis) {
                Ok(_) => {
                    if poll_fds[0]
                        .revents()
                        .unwrap_or_else(PollFlags::empty)
                        .contains(PollFlags::POLLIN)
                    {
                        return Ok(true);
                    }
                }
                // try again
                Err(nix::Error::EINTR) => {}
                Err(e) => return Err(e.into()),
            }
        } else {
            return Ok(false);
        }
        if start.elapsed() >= deadline {
            return Ok(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{run_session, Backend, BackendEvent};
    use crate::error::Error;
    use crate::server::shim::{ProtocolOp, ShimEvent, UiRequest};
    use crate::server::Server;
    use fluxway_core::config::Cfg;
    use fluxway_core::geometry::head_map::Output;
    use fluxway_core::geometry::Rect;
    use fluxway_core::state::view::ViewKind;

    struct ScriptedBackend {
        script: Vec<Vec<BackendEvent>>,
        pub ops_seen: Vec<ProtocolOp>,
        pub ui_seen: Vec<UiRequest>,
    }

    impl Backend for ScriptedBackend {
        fn initial_outputs(&self) -> Vec<Output> {
            vec![Output::new("HEADLESS-1", Rect::new(0, 0, 1280, 720))]
        }

        fn poll_events(&mut self) -> Vec<BackendEvent> {
            if self.script.is_empty() {
                vec![BackendEvent::Closed]
            } else {
                self.script.remove(0)
            }
        }

        fn dispatch(&mut self, ops: Vec<ProtocolOp>, ui: &[UiRequest]) {
            self.ops_seen.extend(ops);
            self.ui_seen.extend(ui.iter().cloned());
        }
    }

    #[test]
    fn session_maps_a_surface_and_shuts_down() {
        let mut backend = ScriptedBackend {
            script: vec![vec![
                BackendEvent::Shim(ShimEvent::SurfaceNew {
                    kind: ViewKind::Native,
                }),
                BackendEvent::Shim(ShimEvent::Commit {
                    id: fluxway_core::state::view::ViewId(1),
                    w: 400,
                    h: 300,
                }),
                BackendEvent::Shim(ShimEvent::Map {
                    id: fluxway_core::state::view::ViewId(1),
                }),
            ]],
            ops_seen: Vec::new(),
            ui_seen: Vec::new(),
        };
        let mut server = Server::new(Cfg::default(), backend.initial_outputs()).unwrap();
        let result = run_session(&mut backend, &mut server);
        assert!(matches!(result, Err(Error::GracefulShutdown)));
        assert_eq!(1, server.core.map_order().len());
        assert!(server.core.focused.is_some());
        // The activation reached the shim queue
        assert!(backend
            .ops_seen
            .iter()
            .any(|op| matches!(op, ProtocolOp::SetActivated { on: true, .. })));
    }

    #[test]
    fn exit_binding_terminates_the_session() {
        let mut backend = ScriptedBackend {
            script: vec![vec![BackendEvent::Key {
                keycode: 9,
                sym: u32::from(xkeysym::Keysym::Escape),
                modifiers: fluxway_core::config::key_map::MOD_ALT,
            }]],
            ops_seen: Vec::new(),
            ui_seen: Vec::new(),
        };
        let mut server = Server::new(Cfg::default(), backend.initial_outputs()).unwrap();
        let result = run_session(&mut backend, &mut server);
        assert!(matches!(result, Err(Error::GracefulShutdown)));
        assert!(backend
            .ui_seen
            .iter()
            .any(|r| matches!(r, UiRequest::Terminate)));
    }
}
