//! The persisted resource ("init") file: `key: value` lines with `#` and
//! `!` comments. Saving replaces matching keys in place, appends missing
//! ones, and writes atomically via a temp file + fsync + rename so a crash
//! never leaves a truncated config behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::Result;

pub struct InitUpdate<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

/// Key of a `key: value` line; comments and malformed lines yield `None`.
#[must_use]
pub fn parse_key_from_line(line: &str) -> Option<&str> {
    let s = line.trim_start();
    if s.is_empty() || s.starts_with('#') || s.starts_with('!') {
        return None;
    }
    let colon = s.find(':')?;
    let key = s[..colon].trim_end();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

fn format_kv_line(key: &str, value: &str) -> String {
    format!("{key}: {value}")
}

/// Read the file into lines; a missing file is an empty one.
pub fn load_lines(path: &Path) -> Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content.lines().map(str::to_string).collect()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

/// Replace matching keys in place (case-insensitive key compare), append
/// the rest at the end.
pub fn apply_updates(lines: &mut Vec<String>, updates: &[InitUpdate]) {
    let mut found = vec![false; updates.len()];
    for line in lines.iter_mut() {
        let Some(key) = parse_key_from_line(line).map(str::to_string) else {
            continue;
        };
        for (j, update) in updates.iter().enumerate() {
            if update.key.is_empty() {
                continue;
            }
            if key.eq_ignore_ascii_case(update.key) {
                *line = format_kv_line(update.key, update.value);
                found[j] = true;
            }
        }
    }
    for (j, update) in updates.iter().enumerate() {
        if update.key.is_empty() || found[j] {
            continue;
        }
        lines.push(format_kv_line(update.key, update.value));
    }
}

static TMP_SEQ: AtomicU32 = AtomicU32::new(0);

fn tmp_path_for(path: &Path) -> PathBuf {
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id();
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".tmp{pid}.{seq}"));
    PathBuf::from(name)
}

/// Atomic rewrite preserving the pre-existing file mode.
pub fn write_lines_atomic(path: &Path, lines: &[String]) -> Result<()> {
    let tmp = tmp_path_for(path);
    let write_result = (|| -> Result<()> {
        let mut file = fs::File::create(&tmp)?;
        #[cfg(unix)]
        if let Ok(meta) = fs::metadata(path) {
            use std::os::unix::fs::PermissionsExt;
            let mode = meta.permissions().mode() & 0o777;
            let _ = fs::set_permissions(&tmp, fs::Permissions::from_mode(mode));
        }
        for line in lines {
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")?;
        }
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();
    if write_result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    write_result
}

/// Load, patch, write back. The whole SaveRC path funnels through here.
pub fn update_file(path: &Path, updates: &[InitUpdate]) -> Result<()> {
    let mut lines = load_lines(path)?;
    apply_updates(&mut lines, updates);
    write_lines_atomic(path, &lines)
}

/// Value of a key, for consumers re-reading persisted state.
#[must_use]
pub fn lookup(lines: &[String], key: &str) -> Option<String> {
    for line in lines {
        let Some(line_key) = parse_key_from_line(line) else {
            continue;
        };
        if line_key.eq_ignore_ascii_case(key) {
            let colon = line.find(':')?;
            return Some(line[colon + 1..].trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{apply_updates, load_lines, lookup, parse_key_from_line, update_file, InitUpdate};

    #[test]
    fn key_parsing_skips_comments() {
        assert_eq!(Some("session.keyFile"), parse_key_from_line("session.keyFile: ~/.keys"));
        assert_eq!(Some("a"), parse_key_from_line("  a : b"));
        assert_eq!(None, parse_key_from_line("# comment: x"));
        assert_eq!(None, parse_key_from_line("! old style comment"));
        assert_eq!(None, parse_key_from_line("no colon here"));
        assert_eq!(None, parse_key_from_line(": empty key"));
    }

    #[test]
    fn updates_replace_in_place_and_append_missing() {
        let mut lines = vec![
            "# fluxway init".to_string(),
            "session.screen0.workspaces: 4".to_string(),
            "session.keyFile: keys".to_string(),
        ];
        apply_updates(
            &mut lines,
            &[
                InitUpdate {
                    key: "session.screen0.workspaces",
                    value: "6",
                },
                InitUpdate {
                    key: "session.appsFile",
                    value: "apps",
                },
            ],
        );
        assert_eq!(
            vec![
                "# fluxway init".to_string(),
                "session.screen0.workspaces: 6".to_string(),
                "session.keyFile: keys".to_string(),
                "session.appsFile: apps".to_string(),
            ],
            lines
        );
        // Key compare is case-insensitive, replacement normalizes the key
        apply_updates(
            &mut lines,
            &[InitUpdate {
                key: "SESSION.KEYFILE",
                value: "keys2",
            }],
        );
        assert_eq!("SESSION.KEYFILE: keys2", lines[2]);
        assert_eq!(Some("keys2".to_string()), lookup(&lines, "session.keyfile"));
    }

    #[test]
    fn save_then_save_again_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("init");
        std::fs::write(&path, "# header\nsession.keyFile: old\n").unwrap();
        let updates = [
            InitUpdate {
                key: "session.keyFile",
                value: "keys",
            },
            InitUpdate {
                key: "session.screen0.workspaces",
                value: "4",
            },
        ];
        update_file(&path, &updates).unwrap();
        let first = std::fs::read(&path).unwrap();
        update_file(&path, &updates).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
        let lines = load_lines(&path).unwrap();
        assert_eq!(Some("keys".to_string()), lookup(&lines, "session.keyFile"));
        assert_eq!(
            Some("4".to_string()),
            lookup(&lines, "session.screen0.workspaces")
        );
        // Comments survive the rewrite
        assert_eq!("# header", lines[0]);
    }

    #[test]
    fn missing_file_reads_empty_and_writes_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("init");
        assert!(load_lines(&path).unwrap().is_empty());
        update_file(
            &path,
            &[InitUpdate {
                key: "session.styleFile",
                value: "",
            }],
        )
        .unwrap();
        assert_eq!("session.styleFile: \n", std::fs::read_to_string(&path).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn rewrite_preserves_file_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("init");
        std::fs::write(&path, "a: b\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        update_file(
            &path,
            &[InitUpdate {
                key: "a",
                value: "c",
            }],
        )
        .unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(0o600, mode);
    }
}
