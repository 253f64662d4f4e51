use std::process::Stdio;

use crate::error::Result;

/// Fork-exec a command line through the shell, fully detached from our
/// stdio so client chatter never lands in the compositor log.
pub fn spawn(cmd: &str) -> Result<()> {
    let cmd = cmd.trim();
    if cmd.is_empty() {
        return Ok(());
    }
    std::process::Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    fluxway_core::debug!("Spawned {}", cmd);
    Ok(())
}
