#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::let_underscore_drop)]
#![allow(clippy::too_many_lines)]
// Layout coordinates and protocol sizes use mixed integer widths fairly interchangeably
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]

pub(crate) mod error;
mod server;
mod wm;

use crate::error::{Error, Result};
use crate::wm::run_wm;
use fluxway_core::debug;

fn main() -> Result<()> {
    debug!("Starting fluxway");
    if check_cfg() {
        return Ok(());
    }
    loop {
        return match run_wm() {
            Ok(()) => {
                debug!("Exiting WM");
                Ok(())
            }
            Err(e) => {
                if let Error::FullRestart = e {
                    debug!("Restarting WM");
                    continue;
                }
                debug!("Fatal error {e}");
                Err(e)
            }
        };
    }
}

#[cfg(feature = "config-file")]
fn check_cfg() -> bool {
    if std::env::args().any(|arg| arg == "--check-cfg") {
        match fluxway_core::config::load_cfg::load_cfg(
            std::env::var("XDG_CONFIG_HOME").ok().as_deref(),
            std::env::var("HOME").ok().as_deref(),
        ) {
            Ok(cfg) => match (cfg.build_key_bindings(), cfg.build_mouse_bindings()) {
                (Ok(_), Ok(_)) => {
                    println!("Config OK");
                }
                (Err(e), _) | (_, Err(e)) => {
                    println!("Bad config: {e}");
                }
            },
            Err(e) => {
                println!("Bad config: {e}");
            }
        }
        return true;
    }
    false
}

#[cfg(not(feature = "config-file"))]
fn check_cfg() -> bool {
    false
}
