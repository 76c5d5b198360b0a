//! Read-only filesystem seam used by discovery and loading
//!
//! Everything the registry learns about the disk goes through [`SkillFs`],
//! so indexing can run against [`MemoryFs`] in tests.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Maximum symlink hops [`MemoryFs`] follows before giving up
const MAX_LINK_HOPS: usize = 8;

/// Kind of a directory entry, as seen without following symlinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Dir,
    /// Symbolic link, target not inspected
    Symlink,
    /// Sockets, devices and the like
    Other,
}

/// A single directory listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    /// File name of the entry
    pub name: String,
    /// Full path of the entry
    pub path: PathBuf,
    /// Entry kind (symlinks are reported as such, not resolved)
    pub kind: EntryKind,
}

impl FsEntry {
    /// Whether the entry name starts with a dot
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Narrow read-only view of a filesystem
pub trait SkillFs: Send + Sync + fmt::Debug {
    /// List the immediate children of `path`
    fn read_dir(&self, path: &Path) -> io::Result<Vec<FsEntry>>;

    /// Read a whole file as UTF-8
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Whether `path` is a regular file (follows symlinks)
    fn is_file(&self, path: &Path) -> bool;

    /// Whether `path` is a directory (follows symlinks)
    fn is_dir(&self, path: &Path) -> bool;

    /// Canonical form of `path`, falling back to lexical normalization when
    /// the path cannot be resolved (e.g. it does not exist)
    fn canonicalize(&self, path: &Path) -> PathBuf;
}

/// Lexically normalize a path: drop `.` components and fold `..`
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ============================================================================
// OS filesystem
// ============================================================================

/// [`SkillFs`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl SkillFs for OsFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<FsEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Dir
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };

            entries.push(FsEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                kind,
            });
        }
        Ok(entries)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn canonicalize(&self, path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| normalize_path(path))
    }
}

// ============================================================================
// In-memory filesystem
// ============================================================================

#[derive(Debug, Clone)]
enum Node {
    File(String),
    Dir,
    Symlink(PathBuf),
}

/// In-memory [`SkillFs`] for tests and embedding
///
/// Paths are normalized lexically. Only a symlink at the final path
/// component is followed; symlinks in the middle of a path are not.
#[derive(Debug, Default)]
pub struct MemoryFs {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
}

impl MemoryFs {
    /// Create an empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    fn nodes(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert_parents(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            nodes.entry(dir.to_path_buf()).or_insert(Node::Dir);
            current = dir.parent();
        }
    }

    /// Create a directory and all of its parents
    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        let path = normalize_path(path.as_ref());
        let mut nodes = self.nodes();
        Self::insert_parents(&mut nodes, &path);
        nodes.insert(path, Node::Dir);
        drop(nodes);
        self
    }

    /// Create or replace a file, creating parent directories as needed
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) -> &Self {
        let path = normalize_path(path.as_ref());
        let mut nodes = self.nodes();
        Self::insert_parents(&mut nodes, &path);
        nodes.insert(path, Node::File(content.into()));
        drop(nodes);
        self
    }

    /// Create a symlink at `path` pointing to `target`
    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl AsRef<Path>) -> &Self {
        let path = normalize_path(path.as_ref());
        let mut nodes = self.nodes();
        Self::insert_parents(&mut nodes, &path);
        nodes.insert(path, Node::Symlink(normalize_path(target.as_ref())));
        drop(nodes);
        self
    }

    /// Remove a path and everything below it
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = normalize_path(path.as_ref());
        self.nodes().retain(|p, _| !p.starts_with(&path));
    }

    /// Follow a symlink chain at the final component
    fn resolve(&self, path: &Path) -> Option<(PathBuf, Node)> {
        let nodes = self.nodes();
        let mut current = normalize_path(path);
        for _ in 0..=MAX_LINK_HOPS {
            match nodes.get(&current)? {
                Node::Symlink(target) => current = target.clone(),
                node => return Some((current, node.clone())),
            }
        }
        None
    }
}

impl SkillFs for MemoryFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<FsEntry>> {
        let dir = match self.resolve(path) {
            Some((dir, Node::Dir)) => dir,
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("not a directory: {}", path.display()),
                ))
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such directory: {}", path.display()),
                ))
            }
        };

        let listed = normalize_path(path);
        let entries = self
            .nodes()
            .iter()
            .filter(|(p, _)| p.parent() == Some(dir.as_path()))
            .filter_map(|(p, node)| {
                let name = p.file_name()?.to_string_lossy().into_owned();
                let kind = match node {
                    Node::File(_) => EntryKind::File,
                    Node::Dir => EntryKind::Dir,
                    Node::Symlink(_) => EntryKind::Symlink,
                };
                Some(FsEntry {
                    path: listed.join(&name),
                    name,
                    kind,
                })
            })
            .collect();

        Ok(entries)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        match self.resolve(path) {
            Some((_, Node::File(content))) => Ok(content),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("not a file: {}", path.display()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )),
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.resolve(path), Some((_, Node::File(_))))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.resolve(path), Some((_, Node::Dir)))
    }

    fn canonicalize(&self, path: &Path) -> PathBuf {
        self.resolve(path)
            .map(|(resolved, _)| resolved)
            .unwrap_or_else(|| normalize_path(path))
    }
}
