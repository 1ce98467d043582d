use super::oracle::{Oracle, Walk};
use crate::config::LogRange;
use crate::error::{Result, StatsError};
use crate::model::ContentId;
use gix::discover;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::debug;

const COMMIT_LOG_FORMAT: &str = "--pretty=format:%at %ai %aN <%aE>";
const TREE_LOG_FORMAT: &str = "--pretty=format:%at %T";
const HEADER_FORMAT: &str = "--pretty=format:%at %aN";

/// A discovered repository queried through the `git` executable.
pub struct GitRepo {
    path: PathBuf,
    git_dir: PathBuf,
}

impl GitRepo {
    /// Open a repository at `path`, or current dir if `None`
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let repo_path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or(std::env::current_dir()?);

        let repo = discover(&repo_path)?;
        let git_dir = repo.git_dir().to_path_buf();
        let path = repo.workdir().unwrap_or_else(|| repo.git_dir()).to_path_buf();

        Ok(Self { path, git_dir })
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<(std::process::Output, String)> {
        let label = format!(
            "git {}",
            args.iter().map(|a| a.as_ref()).collect::<Vec<_>>().join(" ")
        );
        let started = Instant::now();
        let output = Command::new("git")
            .args(args.iter().map(|a| a.as_ref()))
            .current_dir(&self.path)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .output()
            .map_err(|source| StatsError::Spawn {
                command: label.clone(),
                source,
            })?;
        debug!(command = %label, elapsed_ms = started.elapsed().as_millis() as u64, "oracle query");
        Ok((output, label))
    }

    fn bytes<S: AsRef<str>>(&self, args: &[S]) -> Result<Vec<u8>> {
        let (output, label) = self.run(args)?;
        if !output.status.success() {
            return Err(StatsError::Oracle {
                command: label,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    fn text<S: AsRef<str>>(&self, args: &[S]) -> Result<String> {
        self.bytes(args)
            .map(|out| String::from_utf8_lossy(&out).into_owned())
    }

    fn with_range(prefix: &[&str], range: &LogRange) -> Vec<String> {
        let mut args: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
        args.extend(range.args());
        args
    }
}

impl Oracle for GitRepo {
    fn tag_refs(&self) -> Result<String> {
        let (output, label) = self.run(&["show-ref", "--tags"])?;
        // show-ref exits 1 when nothing matches.
        if output.status.success() || (output.status.code() == Some(1) && output.stdout.is_empty()) {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        Err(StatsError::Oracle {
            command: label,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    fn revision_header(&self, revision: &str) -> Result<String> {
        self.text(&["log", revision, HEADER_FORMAT, "-n", "1", "--"])
    }

    fn shortlog(&self, revisions: &[String]) -> Result<String> {
        let mut args = vec!["shortlog".to_string(), "-s".to_string()];
        args.extend(revisions.iter().cloned());
        args.push("--".to_string());
        self.text(&args)
    }

    fn commit_log(&self, range: &LogRange) -> Result<String> {
        self.text(&Self::with_range(&["rev-list", COMMIT_LOG_FORMAT], range))
    }

    fn tree_log(&self, range: &LogRange) -> Result<String> {
        self.text(&Self::with_range(&["rev-list", TREE_LOG_FORMAT], range))
    }

    fn shortstat_log(&self, range: &LogRange, walk: Walk) -> Result<String> {
        let prefix: &[&str] = match walk {
            Walk::Mainline => &["log", "--shortstat", "--first-parent", "-m", HEADER_FORMAT],
            Walk::Full => &["log", "--shortstat", "--date-order", HEADER_FORMAT],
        };
        self.text(&Self::with_range(prefix, range))
    }

    fn tree_listing(&self, revision: &str) -> Result<String> {
        self.text(&["ls-tree", "-r", "-l", "-z", revision])
    }

    fn count_files_in_tree(&self, tree: &ContentId) -> Result<u64> {
        let out = self.bytes(&["ls-tree", "-r", "-z", "--name-only", tree.as_str()])?;
        Ok(out.split(|&b| b == 0).filter(|entry| !entry.is_empty()).count() as u64)
    }

    fn count_lines_in_blob(&self, blob: &ContentId) -> Result<u64> {
        let out = self.bytes(&["cat-file", "blob", blob.as_str()])?;
        Ok(out.iter().filter(|&&b| b == b'\n').count() as u64)
    }
}
