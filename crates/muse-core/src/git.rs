use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::GenerationFailure;

/// Conventional trunk names, in resolution order.
pub const TRUNK_BRANCHES: [&str; 2] = ["main", "master"];

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git command failed: {cmd}: {stderr}")]
    CommandFailed { cmd: String, stderr: String },
    #[error("git command io error: {cmd}: {source}")]
    CommandIo { cmd: String, source: std::io::Error },
    #[error("git output was not utf-8")]
    OutputNotUtf8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingTreeStatus {
    pub staged: Vec<String>,
    pub unstaged: Vec<String>,
    pub untracked: Vec<String>,
    pub conflicted: Vec<String>,
}

impl WorkingTreeStatus {
    pub fn has_changes(&self) -> bool {
        !(self.staged.is_empty()
            && self.unstaged.is_empty()
            && self.untracked.is_empty()
            && self.conflicted.is_empty())
    }

    /// Parse `git status --porcelain=v1 -z` output.
    pub fn parse_porcelain(output: &str) -> Self {
        let mut status = WorkingTreeStatus::default();
        let mut entries = output.split('\0').filter(|entry| !entry.is_empty());

        while let Some(entry) = entries.next() {
            if entry.len() < 4 {
                continue;
            }
            let mut codes = entry.chars();
            let (index, worktree) = match (codes.next(), codes.next()) {
                (Some(index), Some(worktree)) => (index, worktree),
                _ => continue,
            };
            let path = entry[3..].to_string();

            // Renames and copies carry the original path as the next entry.
            if matches!(index, 'R' | 'C') || matches!(worktree, 'R' | 'C') {
                entries.next();
            }

            if is_conflict(index, worktree) {
                status.conflicted.push(path);
                continue;
            }
            if index == '?' && worktree == '?' {
                status.untracked.push(path);
                continue;
            }
            if index == '!' {
                continue;
            }
            if index != ' ' {
                status.staged.push(path.clone());
            }
            if worktree != ' ' {
                status.unstaged.push(path);
            }
        }

        status
    }
}

fn is_conflict(index: char, worktree: char) -> bool {
    matches!(
        (index, worktree),
        ('D', 'D') | ('A', 'U') | ('U', 'D') | ('U', 'A') | ('D', 'U') | ('A', 'A') | ('U', 'U')
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    /// `None` on a detached HEAD.
    pub branch: Option<String>,
    pub status: WorkingTreeStatus,
}

impl RepoInfo {
    pub fn has_changes(&self) -> bool {
        self.status.has_changes()
    }
}

/// Read-only view of a version-control working tree.
pub trait Vcs {
    fn status(&self) -> Result<WorkingTreeStatus, GitError>;
    fn diff(&self, args: &[&str]) -> Result<String, GitError>;
    /// `None` on a detached HEAD.
    fn current_branch(&self) -> Result<Option<String>, GitError>;
    fn revparse_verify(&self, reference: &str) -> Result<bool, GitError>;
}

/// `Vcs` backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo: PathBuf,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }
}

impl Vcs for GitCli {
    fn status(&self) -> Result<WorkingTreeStatus, GitError> {
        let output = run_git(&self.repo, &["status", "--porcelain=v1", "-z"])?;
        Ok(WorkingTreeStatus::parse_porcelain(&output))
    }

    fn diff(&self, args: &[&str]) -> Result<String, GitError> {
        let mut full = vec!["diff"];
        full.extend_from_slice(args);
        run_git_allowing_exit_1(&self.repo, &full)
    }

    fn current_branch(&self) -> Result<Option<String>, GitError> {
        let output = run_git_allowing_exit_1(&self.repo, &["symbolic-ref", "--short", "-q", "HEAD"])?;
        let branch = output.trim();
        if branch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(branch.to_string()))
        }
    }

    fn revparse_verify(&self, reference: &str) -> Result<bool, GitError> {
        let output = git_output(&self.repo, &["rev-parse", "--verify", "--quiet", reference])?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(GitError::CommandFailed {
                cmd: format!("git rev-parse --verify --quiet {reference}"),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            }),
        }
    }
}

/// Acquires the diffs the pipeline summarizes. Never writes to the repository.
pub struct DiffSource<V> {
    vcs: V,
}

impl DiffSource<GitCli> {
    pub fn open(repo: impl Into<PathBuf>) -> Self {
        Self::new(GitCli::new(repo))
    }
}

impl<V: Vcs> DiffSource<V> {
    pub fn new(vcs: V) -> Self {
        Self { vcs }
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn staged_diff(&self) -> Result<Option<String>, GenerationFailure> {
        let status = self.vcs.status()?;
        if status.staged.is_empty() {
            debug!("no staged files");
            return Ok(None);
        }

        let diff = self.vcs.diff(&["--cached"])?;
        Ok(non_blank(diff))
    }

    pub fn branch_diff(&self) -> Result<Option<String>, GenerationFailure> {
        let branch = match self.vcs.current_branch()? {
            Some(branch) => branch,
            None => {
                debug!("detached HEAD, no branch diff");
                return Ok(None);
            }
        };
        if TRUNK_BRANCHES.contains(&branch.as_str()) {
            debug!(branch = %branch, "on trunk branch, no branch diff");
            return Ok(None);
        }

        let base = if self.vcs.revparse_verify(TRUNK_BRANCHES[0])? {
            TRUNK_BRANCHES[0]
        } else {
            TRUNK_BRANCHES[1]
        };
        let range = format!("{base}...{branch}");
        debug!(range = %range, "computing branch diff");
        let diff = self.vcs.diff(&[range.as_str()])?;
        Ok(non_blank(diff))
    }

    pub fn repo_info(&self) -> Result<RepoInfo, GenerationFailure> {
        let status = self.vcs.status()?;
        let branch = self.vcs.current_branch()?;
        Ok(RepoInfo { branch, status })
    }
}

fn non_blank(diff: String) -> Option<String> {
    if diff.trim().is_empty() {
        None
    } else {
        Some(diff)
    }
}

fn git_output(repo: &Path, args: &[&str]) -> Result<std::process::Output, GitError> {
    Command::new("git")
        .current_dir(repo)
        .args(args)
        .output()
        .map_err(|source| GitError::CommandIo {
            cmd: format!("git {}", args.join(" ")),
            source,
        })
}

fn run_git_with(repo: &Path, args: &[&str], allow_exit_1: bool) -> Result<String, GitError> {
    let output = git_output(repo, args)?;

    let status_ok = output.status.success()
        || (allow_exit_1 && matches!(output.status.code(), Some(1)));
    if !status_ok {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(GitError::CommandFailed {
            cmd: format!("git {}", args.join(" ")),
            stderr,
        });
    }

    String::from_utf8(output.stdout).map_err(|_| GitError::OutputNotUtf8)
}

fn run_git(repo: &Path, args: &[&str]) -> Result<String, GitError> {
    run_git_with(repo, args, false)
}

fn run_git_allowing_exit_1(repo: &Path, args: &[&str]) -> Result<String, GitError> {
    run_git_with(repo, args, true)
}
