//! Path containment.
//!
//! Every candidate is canonicalized (symlinks followed) before it is compared
//! with the canonical base directory, so a link sitting inside the base that
//! points elsewhere is judged by where it lands, not where it sits.
//!
//! Absolute candidates are not refused on sight: they are taken as the literal
//! target and pass or fail on containment like everything else.

use crate::errors::{ErrorKind, Rejection, SanitizeError, SanitizeResult};
use regex::Regex;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Longest candidate accepted, in bytes.
pub const MAX_CANDIDATE_LEN: usize = 4096;

static URL_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub canonical_absolute: PathBuf,
    pub base_relative_posix: String,
    pub existed: bool,
}

/// A base directory canonicalized once for the duration of a call.
#[derive(Debug, Clone)]
pub struct BaseDir {
    canonical: PathBuf,
}

impl BaseDir {
    pub fn new(path: impl AsRef<Path>) -> SanitizeResult<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(SanitizeError::MissingBaseDirectory);
        }
        let canonical = dunce::canonicalize(path).map_err(|source| SanitizeError::BaseDirectory {
            path: path.to_path_buf(),
            source,
        })?;
        if !canonical.is_dir() {
            return Err(SanitizeError::BaseNotADirectory(canonical));
        }
        Ok(Self { canonical })
    }

    pub fn canonical(&self) -> &Path {
        &self.canonical
    }

    pub fn contains(&self, path: &Path) -> bool {
        // component-wise, so /data/images2 is not under /data/images
        path.starts_with(&self.canonical)
    }

    pub fn resolve(&self, candidate: &str) -> Result<ResolvedPath, Rejection> {
        check_lexical(candidate)?;

        let normalized = normalize_separators(candidate);
        let literal = Path::new(&normalized);
        let joined = if literal.is_absolute() {
            literal.to_path_buf()
        } else {
            self.canonical.join(literal)
        };
        // `..` is settled before any lookup, so every entry left in the path
        // is either canonicalized below or does not exist
        let target = fold_lexically(&joined);

        match dunce::canonicalize(&target) {
            Ok(canonical) => {
                if !self.contains(&canonical) {
                    return Err(Rejection::new(
                        ErrorKind::ResolvedPathEscapesBase,
                        format!("{candidate:?} resolves outside the base directory"),
                    ));
                }
                self.finish(canonical, true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let (parent, leaf) = resolve_missing(&target)?;
                if !self.contains(&parent) {
                    return Err(Rejection::new(
                        ErrorKind::ParentDirectoryEscapesBase,
                        format!("parent of {candidate:?} lies outside the base directory"),
                    ));
                }
                self.finish(parent.join(leaf), false)
            }
            Err(e) if e.kind() == io::ErrorKind::NotADirectory => Err(Rejection::new(
                ErrorKind::FileMissingOrNotRegular,
                format!("{candidate:?} descends through a non-directory"),
            )),
            Err(e) => Err(Rejection::io("canonicalize", e)),
        }
    }

    fn finish(&self, canonical: PathBuf, existed: bool) -> Result<ResolvedPath, Rejection> {
        let rel = canonical.strip_prefix(&self.canonical).map_err(|_| {
            Rejection::new(ErrorKind::ResolvedPathEscapesBase, "path is not under the base directory")
        })?;
        let base_relative_posix = if rel.as_os_str().is_empty() {
            ".".to_string()
        } else {
            posix_string(rel)
        };
        Ok(ResolvedPath { canonical_absolute: canonical, base_relative_posix, existed })
    }
}

fn check_lexical(candidate: &str) -> Result<(), Rejection> {
    if candidate.is_empty() {
        return Err(Rejection::new(ErrorKind::InvalidInput, "empty path"));
    }
    if candidate.len() > MAX_CANDIDATE_LEN {
        return Err(Rejection::new(
            ErrorKind::InvalidInput,
            format!("path longer than {MAX_CANDIDATE_LEN} bytes"),
        ));
    }
    if candidate.contains('\0') {
        return Err(Rejection::new(ErrorKind::InvalidInput, "path contains NUL byte"));
    }
    if looks_like_url(candidate) {
        return Err(Rejection::new(
            ErrorKind::UrlOrAbsoluteRejected,
            format!("{candidate:?} looks like a URL"),
        ));
    }
    Ok(())
}

pub fn looks_like_url(s: &str) -> bool {
    URL_SCHEME.is_match(s)
}

/// Backslashes become slashes and leading `./` segments are dropped.
pub fn normalize_separators(candidate: &str) -> String {
    let mut s = candidate.replace('\\', "/");
    while let Some(rest) = s.strip_prefix("./") {
        s = rest.trim_start_matches('/').to_string();
    }
    s
}

/// Drop `.` and apply `..` without touching the filesystem.
fn fold_lexically(path: &Path) -> PathBuf {
    let mut folded = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                folded.pop();
            }
            other => folded.push(other),
        }
    }
    folded
}

/// Canonicalize the deepest existing ancestor of an already folded `target`.
/// Returns the canonical parent of the leaf and the leaf name.
fn resolve_missing(target: &Path) -> Result<(PathBuf, OsString), Rejection> {
    let components: Vec<Component<'_>> = target.components().collect();
    for split in (1..components.len()).rev() {
        let ancestor: PathBuf = components[..split].iter().collect();
        let mut parent = match dunce::canonicalize(&ancestor) {
            Ok(p) => p,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(Rejection::io("canonicalize parent", e)),
        };
        if !parent.is_dir() {
            return Err(Rejection::new(
                ErrorKind::FilesystemError,
                format!("{} is not a directory", parent.display()),
            ));
        }
        // an entry that lstat sees but canonicalize could not follow is a dangling link
        if let Component::Normal(first) = components[split] {
            if fs::symlink_metadata(parent.join(first)).is_ok() {
                return Err(Rejection::new(
                    ErrorKind::ResolvedPathEscapesBase,
                    format!("{} is a dangling symlink", parent.join(first).display()),
                ));
            }
        }

        // the first missing entry has no children, and the folded tail holds
        // only plain names, so nothing past it can be a link
        let mut tail: Vec<OsString> = components[split..]
            .iter()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_os_string()),
                _ => None,
            })
            .collect();
        let Some(leaf) = tail.pop() else { break };
        for name in tail {
            parent.push(name);
        }
        return Ok((parent, leaf));
    }
    Err(Rejection::new(
        ErrorKind::FilesystemError,
        format!("no existing ancestor for {}", target.display()),
    ))
}

/// Case-insensitive match of the extension against the allowlist.
/// Entries may carry a leading dot.
pub fn has_allowed_extension(path: &Path, allowlist: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_lowercase();
    allowlist
        .iter()
        .any(|allowed| allowed.trim_start_matches('.').to_lowercase() == ext)
}

pub fn ensure_regular_file(path: &Path) -> Result<(), Rejection> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(Rejection::new(
            ErrorKind::FileMissingOrNotRegular,
            format!("{} is not a regular file", path.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Rejection::new(
            ErrorKind::FileMissingOrNotRegular,
            format!("{} does not exist", path.display()),
        )),
        Err(e) => Err(Rejection::io("stat", e)),
    }
}

/// Sniff the format from magic bytes, then parse the header.
pub fn verify_content_type(path: &Path) -> Result<image::ImageFormat, Rejection> {
    let not_image = |why: String| Rejection::new(ErrorKind::ContentNotRecognizedAsImage, why);
    let reader = image::ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| not_image(format!("cannot open {}: {e}", path.display())))?;
    let format = reader
        .format()
        .ok_or_else(|| not_image(format!("{} has no recognizable image signature", path.display())))?;
    reader
        .into_dimensions()
        .map_err(|e| not_image(format!("{} failed to parse as {format:?}: {e}", path.display())))?;
    Ok(format)
}

pub fn posix_string(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}
