//! Resolution of a `Host` alias from an OpenSSH client config file.
//!
//! Only the keywords needed to open a tunnel are understood: `Host`,
//! `HostName`, `Port`, `User` and `IdentityFile`, plus `Include`, which is
//! inlined when the file is read. As in OpenSSH, the first value obtained
//! for a keyword wins and `IdentityFile` accumulates. `Match` blocks are
//! skipped with a warning.

use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_SSH_PORT: u16 = 22;

const MAX_INCLUDE_DEPTH: usize = 16;

/// Where and how to reach an ssh host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub host_name: String,
    pub port: u16,
    pub user: String,
    pub identity_files: Vec<PathBuf>,
}

#[derive(Default)]
struct Resolved {
    host_name: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    identity_files: Vec<PathBuf>,
}

/// Resolve `alias` against the content of an ssh client config.
pub fn resolve(content: &str, alias: &str) -> HostConfig {
    let mut resolved = Resolved::default();
    // Options before the first Host line apply to every host.
    let mut active = true;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (keyword, value) = split_keyword(line);
        match keyword.to_ascii_lowercase().as_str() {
            "host" => active = host_matches(value, alias),
            "match" => {
                warn!("ssh config: Match blocks are not supported, skipping `{}`", line);
                active = false;
            }
            _ if !active => {}
            "hostname" => {
                resolved.host_name.get_or_insert_with(|| value.replace("%h", alias));
            }
            "port" => {
                if resolved.port.is_none() {
                    resolved.port = value.parse().ok();
                }
            }
            "user" => {
                resolved.user.get_or_insert_with(|| value.to_string());
            }
            "identityfile" => resolved.identity_files.push(expand_home(value)),
            _ => {}
        }
    }

    HostConfig {
        host_name: resolved.host_name.unwrap_or_else(|| alias.to_string()),
        port: resolved.port.unwrap_or(DEFAULT_SSH_PORT),
        user: resolved
            .user
            .unwrap_or_else(|| envmnt::get_or("USER", "root")),
        identity_files: resolved.identity_files,
    }
}

/// Read an ssh client config, replacing `Include` lines with the content of
/// the files they name. Relative paths are looked up in `~/.ssh`, and `*` or
/// `?` in the file name select every matching file, in lexical order.
/// Included files that cannot be read are skipped, like OpenSSH does.
pub fn read_with_includes(path: &Path) -> io::Result<String> {
    let mut content = String::new();
    inline(&fs::read_to_string(path)?, 0, &mut content);

    Ok(content)
}

fn inline(source: &str, depth: usize, out: &mut String) {
    for line in source.lines() {
        let (keyword, value) = split_keyword(line.trim());
        if !keyword.eq_ignore_ascii_case("include") {
            out.push_str(line);
            out.push('\n');
            continue;
        }

        if depth >= MAX_INCLUDE_DEPTH {
            warn!("ssh config: Include nested too deeply, skipping `{}`", value);
            continue;
        }

        for pattern in value.split_whitespace() {
            for path in include_paths(pattern) {
                match fs::read_to_string(&path) {
                    Ok(included) => inline(&included, depth + 1, out),
                    Err(e) => debug!("ssh config: skipping include {:?}: {}", path, e),
                }
            }
        }
    }
}

fn include_paths(pattern: &str) -> Vec<PathBuf> {
    let path = expand_home(pattern);
    let path = if path.is_absolute() {
        path
    } else {
        expand_home("~/.ssh").join(path)
    };

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if !name.contains(['*', '?']) {
        return vec![path.clone()];
    }
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut paths: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| glob_match(name, n))
            })
            .collect(),
        Err(_) => vec![],
    };
    paths.sort();

    paths
}

/// Split `Keyword value`, `Keyword=value` or `Keyword = value`.
fn split_keyword(line: &str) -> (&str, &str) {
    let end = line
        .find(|c: char| c.is_whitespace() || c == '=')
        .unwrap_or(line.len());
    let (keyword, rest) = line.split_at(end);

    let rest = rest.trim_start();
    let rest = rest.strip_prefix('=').unwrap_or(rest).trim();
    let value = rest
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(rest);

    (keyword, value)
}

/// Whether a `Host` pattern list selects `alias`.
fn host_matches(patterns: &str, alias: &str) -> bool {
    let mut matched = false;

    for pattern in patterns.split_whitespace() {
        match pattern.strip_prefix('!') {
            Some(negated) if glob_match(negated, alias) => return false,
            Some(_) => {}
            None => matched = matched || glob_match(pattern, alias),
        }
    }

    matched
}

/// `*` and `?` wildcard match.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            let home = envmnt::get_or("HOME", "");
            PathBuf::from(format!("{}{}", home, rest))
        }
        _ => PathBuf::from(path),
    }
}
