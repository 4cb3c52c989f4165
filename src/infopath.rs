//! Finding manuals on disk.
//!
//! `INFOPATH` is a colon separated directory list. The element `PATH`
//! stands for the `share/info` and `info` siblings of every `$PATH`
//! directory, and a trailing colon appends the built-in default list.

use std::collections::HashSet;
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::config::Config;
use crate::document::Document;
use crate::error::{NavigationError, Result};
use crate::io::{COMPRESSION_SUFFIXES, strip_compression_suffix};
use crate::nav::{IndexMatch, Session};
use crate::pattern::Pattern;

/// Directories searched when neither `INFOPATH` nor the config names any.
pub const DEFAULT_INFOPATH: &[&str] = &[
    "/usr/local/share/info",
    "/usr/local/info",
    "/usr/share/info",
    "/usr/info",
    "/opt/local/share/info",
    "/usr/local/texlive/texmf/doc/info",
];

/// Directory list from the environment and `config`.
pub fn search_dirs(config: &Config) -> Vec<PathBuf> {
    let infopath = env::var_os("INFOPATH");
    let path = env::var_os("PATH");
    build_search_dirs(infopath.as_deref(), path.as_deref(), &config.infopath())
}

/// Assemble the search list: `INFOPATH` entries, then configured
/// directories, then the defaults. Duplicates keep their first position.
pub fn build_search_dirs(
    infopath: Option<&OsStr>,
    path: Option<&OsStr>,
    configured: &[PathBuf],
) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut defaults = true;

    if let Some(infopath) = infopath.filter(|p| !p.is_empty()) {
        let raw = infopath.to_string_lossy();
        defaults = raw.ends_with(':');
        for element in env::split_paths(infopath) {
            if element.as_os_str().is_empty() {
                continue;
            }
            if element == Path::new("PATH") {
                dirs.extend(path_info_dirs(path));
            } else {
                dirs.push(element);
            }
        }
    }

    dirs.extend(configured.iter().cloned());
    if defaults {
        dirs.extend(DEFAULT_INFOPATH.iter().map(PathBuf::from));
    }

    let mut seen = HashSet::new();
    dirs.retain(|d| seen.insert(d.clone()));
    dirs
}

fn path_info_dirs(path: Option<&OsStr>) -> Vec<PathBuf> {
    let Some(path) = path else {
        return Vec::new();
    };
    env::split_paths(path)
        .filter_map(|bin| bin.parent().map(Path::to_path_buf))
        .flat_map(|prefix| [prefix.join("share").join("info"), prefix.join("info")])
        .collect()
}

/// Find the file for manual `name`.
///
/// Tries `name`, then `name.info`, each bare and with every compression
/// suffix; a directory called `name` is tried for an `index` file. A name
/// containing a path separator is used as given.
pub fn locate(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let as_path = Path::new(name);
    if as_path.components().count() > 1 || as_path.is_absolute() {
        return candidates(as_path).find(|p| p.is_file());
    }

    for dir in dirs {
        let base = dir.join(name);
        let info = dir.join(format!("{name}.info"));
        let nested = base.join("index");

        let found = candidates(&base)
            .chain(candidates(&info))
            .chain(candidates(&nested))
            .find(|p| p.is_file());
        if let Some(found) = found {
            debug!("found manual {name:?} at {}", found.display());
            return Some(found);
        }
    }
    debug!("manual {name:?} not found in {} directories", dirs.len());
    None
}

fn candidates(base: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    std::iter::once(base.to_path_buf()).chain(COMPRESSION_SUFFIXES.iter().map(move |suffix| {
        let mut name = base.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }))
}

/// An index entry found by [`apropos`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AproposMatch {
    pub manual: String,
    #[serde(flatten)]
    pub entry: IndexMatch,
}

/// Every manual in `dirs` as `(name, path)`, in directory order.
///
/// A manual found in several directories keeps its first location. The
/// `dir` file and the subfiles of split manuals are left out.
pub fn manuals(dirs: &[PathBuf]) -> Vec<(String, PathBuf)> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for dir in dirs {
        let Ok(entries) = fs::read_dir(dir) else {
            continue;
        };
        let mut files: Vec<(String, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter_map(|path| {
                let file_name = path.file_name()?.to_str()?;
                let name = manual_name(file_name)?.to_string();
                Some((name, path))
            })
            .collect();
        files.sort();

        let names: HashSet<&str> = files.iter().map(|(name, _)| name.as_str()).collect();
        let parts: HashSet<String> = files
            .iter()
            .filter(|(name, _)| is_split_part(name, &names))
            .map(|(name, _)| name.clone())
            .collect();
        for (name, path) in files {
            if !parts.contains(&name) && seen.insert(name.clone()) {
                found.push((name, path));
            }
        }
    }
    found
}

fn manual_name(file_name: &str) -> Option<&str> {
    if file_name.starts_with('.') {
        return None;
    }
    let name = strip_compression_suffix(file_name);
    let name = name.strip_suffix(".info").unwrap_or(name);
    (!name.is_empty() && name != "dir").then_some(name)
}

/// `make.info-2` and `make-2` are parts of `make` when `make` is present.
fn is_split_part(name: &str, manuals: &HashSet<&str>) -> bool {
    let Some((base, number)) = name.rsplit_once('-') else {
        return false;
    };
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    manuals.contains(base.strip_suffix(".info").unwrap_or(base))
}

/// Look `topic` up in the indices of every manual in `dirs`.
///
/// Entries whose topic contains `topic`, ignoring case, are returned in
/// manual order. Manuals that cannot be read are skipped.
pub fn apropos(topic: &str, dirs: &[PathBuf]) -> Result<Vec<AproposMatch>> {
    let pattern = Pattern::new(topic, false, false)?;
    let mut matches = Vec::new();

    for (manual, path) in manuals(dirs) {
        let entries = match index_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("apropos: skipping {}: {e}", path.display());
                continue;
            }
        };
        matches.extend(
            entries
                .into_iter()
                .filter(|entry| pattern.is_match(&entry.topic))
                .map(|entry| AproposMatch {
                    manual: manual.clone(),
                    entry,
                }),
        );
    }
    debug!("apropos {topic:?}: {} entries", matches.len());
    Ok(matches)
}

fn index_entries(path: &Path) -> std::result::Result<Vec<IndexMatch>, NavigationError> {
    let document = Arc::new(Document::open(path)?);
    Session::new(document)?.index_entries()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn test_defaults_when_unset() {
        let dirs = build_search_dirs(None, None, &[]);
        assert_eq!(dirs.len(), DEFAULT_INFOPATH.len());
    }

    #[test]
    fn test_infopath_replaces_defaults() {
        let infopath = OsString::from("/a:/b");
        let dirs = build_search_dirs(Some(&infopath), None, &[]);
        assert_eq!(dirs, [PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn test_trailing_colon_appends_defaults() {
        let infopath = OsString::from("/a:");
        let dirs = build_search_dirs(Some(&infopath), None, &[]);
        assert_eq!(dirs[0], PathBuf::from("/a"));
        assert_eq!(dirs.len(), 1 + DEFAULT_INFOPATH.len());
    }

    #[test]
    fn test_path_element_expands() {
        let infopath = OsString::from("PATH");
        let path = OsString::from("/opt/tool/bin");
        let dirs = build_search_dirs(Some(&infopath), Some(&path), &[]);
        assert_eq!(
            dirs,
            [
                PathBuf::from("/opt/tool/share/info"),
                PathBuf::from("/opt/tool/info")
            ]
        );
    }

    #[test]
    fn test_configured_dirs_follow_infopath() {
        let infopath = OsString::from("/a");
        let dirs = build_search_dirs(Some(&infopath), None, &[PathBuf::from("/c")]);
        assert_eq!(dirs, [PathBuf::from("/a"), PathBuf::from("/c")]);
    }

    #[test]
    fn test_locate_variants() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("make.info.gz"), b"").unwrap();
        std::fs::write(first.path().join("sed"), b"").unwrap();
        std::fs::create_dir(first.path().join("coreutils")).unwrap();
        std::fs::write(first.path().join("coreutils").join("index"), b"").unwrap();

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(
            locate("make", &dirs),
            Some(second.path().join("make.info.gz"))
        );
        assert_eq!(locate("sed", &dirs), Some(first.path().join("sed")));
        assert_eq!(
            locate("coreutils", &dirs),
            Some(first.path().join("coreutils").join("index"))
        );
        assert_eq!(locate("nothing", &dirs), None);
    }

    const SAMPLE: &[u8] = include_bytes!("../tests/fixtures/sample.info");

    #[test]
    fn test_manuals_skip_dir_and_split_parts() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(first.path().join("sample.info"), SAMPLE).unwrap();
        std::fs::write(first.path().join("dir"), b"").unwrap();
        std::fs::write(first.path().join("notes.info.gz"), b"").unwrap();
        std::fs::write(first.path().join("notes.info-1.gz"), b"").unwrap();
        std::fs::write(second.path().join("sample"), SAMPLE).unwrap();
        std::fs::write(second.path().join("lone-2"), b"").unwrap();

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let found = manuals(&dirs);
        let names: Vec<&str> = found.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["notes", "sample", "lone-2"]);
        assert_eq!(found[1].1, first.path().join("sample.info"));
    }

    #[test]
    fn test_apropos_searches_every_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sample.info"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("broken.info"), b"not an info file").unwrap();

        let matches = apropos("EXIT", &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].manual, "sample");
        assert_eq!(matches[0].entry.topic, "exit status");
        assert_eq!(matches[0].entry.target.node, "Invoking sample");
        assert_eq!(matches[0].entry.index_node, "Concept Index");

        assert!(apropos("no such topic", &[dir.path().to_path_buf()]).unwrap().is_empty());
    }

    #[test]
    fn test_locate_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("local.info");
        std::fs::write(&file, b"").unwrap();
        let name = file.to_string_lossy().into_owned();
        assert_eq!(locate(&name, &[]), Some(file));
    }
}
