//! The versioned release store
//!
//! Releases live under `dist/` as `v<N>-<hash8>` directories, each holding
//! the merged-values snapshot (`values.yaml`) and the rendered manifests
//! (`docker/...`). Versions only ever grow: reuse happens when the content
//! hash of the newest release matches, rollback copies an old release into
//! a brand-new highest-numbered directory, and the retention sweep trims
//! from the oldest end.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::values::hash8;

/// Name of the values snapshot inside a release directory
pub const SNAPSHOT_FILE: &str = "values.yaml";

/// Subdirectory holding rendered manifests
pub const MANIFESTS_DIR: &str = "docker";

/// Basename of a rendered compose manifest
pub const MANIFEST_FILE: &str = "docker-compose.yml";

/// One entry in the release listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEntry {
    /// Full directory name, `v<N>-<hash8>`
    pub name: String,
    /// Parsed version number
    pub version: u32,
    /// 8-hex-char content hash
    pub hash: String,
    /// Modification time of the values snapshot
    pub modified: Option<DateTime<Local>>,
}

impl ReleaseEntry {
    fn parse(name: &str, modified: Option<DateTime<Local>>) -> Option<Self> {
        let rest = name.strip_prefix('v')?;
        let (version, hash) = rest.split_once('-')?;
        let version: u32 = version.parse().ok()?;
        if hash.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            version,
            hash: hash.to_string(),
            modified,
        })
    }
}

/// What to do for a freshly computed content hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleasePlan {
    /// Newest release already holds this content; skip rendering
    Reuse { name: String },
    /// Allocate a new monotonically numbered release
    Create { version: u32, name: String },
}

impl ReleasePlan {
    /// Directory name of the release this plan points at
    pub fn name(&self) -> &str {
        match self {
            ReleasePlan::Reuse { name } | ReleasePlan::Create { name, .. } => name,
        }
    }
}

/// Content-addressed, append-only release directory store
pub struct ReleaseStore {
    dist_dir: PathBuf,
    max_releases: usize,
}

impl ReleaseStore {
    pub fn new<P: AsRef<Path>>(dist_dir: P, max_releases: usize) -> Self {
        Self {
            dist_dir: dist_dir.as_ref().to_path_buf(),
            max_releases: max_releases.max(1),
        }
    }

    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    /// Absolute path of a release directory
    pub fn release_dir(&self, name: &str) -> PathBuf {
        self.dist_dir.join(name)
    }

    /// Absolute path of a release's manifests directory
    pub fn manifests_dir(&self, name: &str) -> PathBuf {
        self.release_dir(name).join(MANIFESTS_DIR)
    }

    /// Enumerate release directories, newest (highest version) first.
    /// Directories that do not parse as `v<N>-<hash8>` are ignored.
    pub fn list(&self) -> Result<Vec<ReleaseEntry>> {
        let mut entries = Vec::new();
        let dir = match std::fs::read_dir(&self.dist_dir) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };

        for entry in dir {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let modified = std::fs::metadata(entry.path().join(SNAPSHOT_FILE))
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Local>::from);
            if let Some(parsed) = ReleaseEntry::parse(&name, modified) {
                entries.push(parsed);
            }
        }

        entries.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(entries)
    }

    /// Newest release, if any
    pub fn latest(&self) -> Result<Option<ReleaseEntry>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Decide between reusing the newest release and allocating a new one.
    /// A forced run always allocates `max+1`, even for an unchanged hash,
    /// so release names never collide.
    pub fn plan(&self, hash: &str, force: bool) -> Result<ReleasePlan> {
        let entries = self.list()?;
        if let Some(newest) = entries.first() {
            if newest.hash == hash && !force {
                debug!(release = %newest.name, "no changes detected, reusing newest release");
                return Ok(ReleasePlan::Reuse {
                    name: newest.name.clone(),
                });
            }
            let version = newest.version + 1;
            Ok(ReleasePlan::Create {
                version,
                name: format!("v{version}-{hash}"),
            })
        } else {
            Ok(ReleasePlan::Create {
                version: 1,
                name: format!("v1-{hash}"),
            })
        }
    }

    /// Persist a planned release: the values snapshot plus every rendered
    /// manifest, keyed by path relative to the manifests directory.
    ///
    /// Planned names embed a fresh version number, so the target directory
    /// never exists yet, forced runs included.
    pub fn persist<'a, I>(&self, plan: &ReleasePlan, snapshot_yaml: &str, manifests: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let dir = self.release_dir(plan.name());
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(SNAPSHOT_FILE), snapshot_yaml)?;

        let manifests_dir = dir.join(MANIFESTS_DIR);
        std::fs::create_dir_all(&manifests_dir)?;
        for (rel_path, content) in manifests {
            let out = manifests_dir.join(rel_path);
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, content)?;
        }

        Ok(dir)
    }

    /// Retention sweep: delete every release beyond the newest
    /// `max_releases`. Deletion failures are logged, never fatal.
    pub fn retain(&self) -> Result<()> {
        let entries = self.list()?;
        for stale in entries.iter().skip(self.max_releases) {
            debug!(release = %stale.name, "removing old release");
            if let Err(e) = std::fs::remove_dir_all(self.release_dir(&stale.name)) {
                warn!(release = %stale.name, error = %e, "failed to remove old release");
            }
        }
        Ok(())
    }

    /// Resolve a rollback target: an explicit release name, or the
    /// second-newest release when unspecified.
    pub fn resolve_rollback_target(&self, target: Option<&str>) -> Result<ReleaseEntry> {
        let entries = self.list()?;
        match target {
            Some(name) => entries
                .into_iter()
                .find(|e| e.name == name)
                .ok_or_else(|| CoreError::ReleaseNotFound {
                    name: name.to_string(),
                }),
            None => entries.into_iter().nth(1).ok_or(CoreError::NoRollbackTarget),
        }
    }

    /// Roll back to `target` (or the previous release) by copying its tree
    /// byte-for-byte into a brand-new highest-numbered release directory.
    ///
    /// The new release's hash is the SHA-1 of the copied snapshot's raw
    /// bytes, not a re-merge, so history is preserved exactly. Returns the
    /// new release's name.
    pub fn rollback(&self, target: Option<&str>) -> Result<String> {
        let entries = self.list()?;
        let target = self.resolve_rollback_target(target)?;

        let next_version = entries.first().map(|e| e.version + 1).unwrap_or(1);

        let snapshot = std::fs::read(self.release_dir(&target.name).join(SNAPSHOT_FILE))?;
        let hash = hash8(&snapshot);

        let new_name = format!("v{next_version}-{hash}");
        debug!(from = %target.name, to = %new_name, "rolling back");
        copy_tree(
            &self.release_dir(&target.name),
            &self.release_dir(&new_name),
        )?;

        Ok(new_name)
    }

    /// Relative manifest paths inside a release, root manifest first, for
    /// the runtime's manifest-search-path convention.
    pub fn compose_files(&self, name: &str) -> Result<Vec<String>> {
        let manifests_dir = self.manifests_dir(name);
        let mut files = Vec::new();

        if manifests_dir.join(MANIFEST_FILE).exists() {
            files.push(MANIFEST_FILE.to_string());
        }

        let mut children: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&manifests_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir()
                && entry.path().join(MANIFEST_FILE).exists()
                && let Some(name) = entry.file_name().to_str()
            {
                children.push(format!("{name}/{MANIFEST_FILE}"));
            }
        }
        children.sort();
        files.extend(children);

        Ok(files)
    }
}

/// Recursive byte-for-byte directory copy
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(src) {
        let entry = entry.map_err(|e| {
            CoreError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::other("walkdir error without io cause")
            }))
        })?;
        let rel = match entry.path().strip_prefix(src) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
