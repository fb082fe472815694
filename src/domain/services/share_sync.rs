//! Share synchronization and linking
//!
//! Shares live at `<shares_root>/<stage>/<path>`. `sync` mirrors them from one
//! stage to another on a files host; `link` points a release's copy of each
//! share path at the stage's share directory.

use std::path::{Component, Path};

use tracing::{debug, info, warn};

use crate::domain::entities::Host;
use crate::domain::ports::{CommandSpec, Executor};
use crate::domain::services::relative_link::share_link_target;
use crate::domain::value_objects::{ShareExclusions, EXCLUSION_FILE};
use crate::error::{CutoverError, CutoverResult};

/// rsync: "partial transfer due to error" / "some source files vanished"
const RSYNC_PARTIAL: i32 = 23;
const RSYNC_VANISHED: i32 = 24;

/// What `sync` did with each configured path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub mirrored: Vec<String>,
    pub copied: Vec<String>,
    pub excluded: Vec<String>,
    /// Directories whose source turned out to be empty or absent
    pub tolerated: Vec<String>,
}

pub struct ShareSynchronizer<'a> {
    executor: &'a dyn Executor,
    host: &'a Host,
    shares_root: String,
}

impl<'a> ShareSynchronizer<'a> {
    pub fn new(executor: &'a dyn Executor, host: &'a Host, shares_root: impl Into<String>) -> Self {
        Self {
            executor,
            host,
            shares_root: shares_root.into().trim_end_matches('/').to_string(),
        }
    }

    fn exclusion_file(&self) -> String {
        format!("{}/{}", self.shares_root, EXCLUSION_FILE)
    }

    fn has_exclusion_file(&self) -> CutoverResult<bool> {
        self.executor.test(
            self.host,
            &CommandSpec::new("test").args(["-f", &self.exclusion_file()]),
        )
    }

    /// Load `.syncignore` from the shares root, if present
    pub fn exclusions(&self) -> CutoverResult<ShareExclusions> {
        if !self.has_exclusion_file()? {
            return Ok(ShareExclusions::empty());
        }
        let file = self.exclusion_file();
        let content = self
            .executor
            .run(self.host, &CommandSpec::new("cat").arg(&file))?;
        ShareExclusions::from_content(Path::new(&file), &content).map_err(|e| {
            CutoverError::InvalidConfig {
                file: file.clone().into(),
                message: e.to_string(),
            }
        })
    }

    /// Mirror `paths` from `source` stage into `dest` stage
    pub fn sync(&self, source: &str, dest: &str, paths: &[String]) -> CutoverResult<SyncReport> {
        let mut report = SyncReport::default();
        if source == dest {
            debug!(stage = dest, "source and destination stage match, nothing to sync");
            return Ok(report);
        }

        let exclusions = self.exclusions()?;
        let exclude_from = (!exclusions.is_empty()).then(|| self.exclusion_file());

        for path in paths {
            validate_share_path(path)?;
            if exclusions.is_excluded(path, true) {
                info!(path = %path, "excluded by {}", EXCLUSION_FILE);
                report.excluded.push(path.clone());
                continue;
            }

            let src = format!("{}/{}/{}", self.shares_root, source, path);
            let dst = format!("{}/{}/{}", self.shares_root, dest, path);

            if self.is_dir(&src)? {
                if self.mirror_dir(&src, &dst, exclude_from.as_deref())? {
                    report.mirrored.push(path.clone());
                } else {
                    report.tolerated.push(path.clone());
                }
            } else if self.is_file(&src)? {
                self.copy_file(&src, &dst)?;
                report.copied.push(path.clone());
            } else {
                return Err(CutoverError::SyncSourceMissing {
                    path: path.clone(),
                    source_stage: source.to_string(),
                });
            }
        }

        Ok(report)
    }

    /// Returns `false` when rsync reported the source as absent
    fn mirror_dir(&self, src: &str, dst: &str, exclude_from: Option<&str>) -> CutoverResult<bool> {
        self.executor
            .run(self.host, &CommandSpec::new("mkdir").args(["-p", dst]))?;

        let mut rsync = CommandSpec::new("rsync").args(["-a", "--delete"]);
        if let Some(file) = exclude_from {
            rsync = rsync.arg(format!("--exclude-from={}", file));
        }
        let rsync = rsync
            .args([format!("{}/", src), format!("{}/", dst)])
            .unbounded();

        info!(host = %self.host, from = src, to = dst, "mirroring share");
        match self.executor.run(self.host, &rsync) {
            Ok(_) => Ok(true),
            Err(err) if is_missing_source(&err) => {
                warn!(path = src, "source has nothing to mirror yet");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn copy_file(&self, src: &str, dst: &str) -> CutoverResult<()> {
        if let Some(parent) = Path::new(dst).parent() {
            self.executor.run(
                self.host,
                &CommandSpec::new("mkdir").args(["-p", &parent.to_string_lossy()]),
            )?;
        }
        info!(host = %self.host, from = src, to = dst, "copying share file");
        self.executor.run(
            self.host,
            &CommandSpec::new("cp").args(["-f", src, dst]).unbounded(),
        )?;
        Ok(())
    }

    fn is_dir(&self, path: &str) -> CutoverResult<bool> {
        self.executor
            .test(self.host, &CommandSpec::new("test").args(["-d", path]))
    }

    fn is_file(&self, path: &str) -> CutoverResult<bool> {
        self.executor
            .test(self.host, &CommandSpec::new("test").args(["-f", path]))
    }

    /// Replace each share path inside `release_dir` with a relative symlink
    /// into the stage's share directory
    pub fn link(
        &self,
        stage: &str,
        release_dir: &str,
        paths: &[String],
    ) -> CutoverResult<Vec<String>> {
        let exclusions = self.exclusions()?;
        let shares_dir = format!("{}/{}", self.shares_root, stage);
        let mut linked = Vec::new();

        for path in paths {
            validate_share_path(path)?;
            if exclusions.is_excluded(path, true) {
                debug!(path = %path, "not linking excluded share");
                continue;
            }

            let path = path.trim_start_matches("./").trim_end_matches('/');
            let target = share_link_target(release_dir, &shares_dir, path);

            self.executor.run(
                self.host,
                &CommandSpec::new("rm")
                    .args(["-rf", path])
                    .current_dir(release_dir),
            )?;
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                self.executor.run(
                    self.host,
                    &CommandSpec::new("mkdir")
                        .args(["-p", &parent.to_string_lossy()])
                        .current_dir(release_dir),
                )?;
            }
            self.executor.run(
                self.host,
                &CommandSpec::new("ln")
                    .args(["-s", &target, path])
                    .current_dir(release_dir),
            )?;

            debug!(path = %path, target = %target, "linked share");
            linked.push(path.to_string());
        }

        Ok(linked)
    }
}

fn is_missing_source(err: &CutoverError) -> bool {
    match err {
        CutoverError::CommandFailed {
            code: Some(RSYNC_VANISHED),
            ..
        } => true,
        CutoverError::CommandFailed {
            code: Some(RSYNC_PARTIAL),
            stderr,
            ..
        } => stderr.contains("No such file or directory"),
        _ => false,
    }
}

/// Share paths are relative and never climb out of their stage directory
pub fn validate_share_path(path: &str) -> CutoverResult<()> {
    let p = Path::new(path);
    let invalid = path.trim().is_empty()
        || p.is_absolute()
        || p
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if invalid {
        return Err(CutoverError::InvalidConfig {
            file: "share".into(),
            message: format!("share path '{}' must be relative and stay inside the share", path),
        });
    }
    Ok(())
}
