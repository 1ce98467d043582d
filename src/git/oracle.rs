use crate::config::LogRange;
use crate::error::Result;
use crate::model::ContentId;

/// Traversal used for a shortstat log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// First parents only (`--first-parent -m`), one linear order.
    Mainline,
    /// Every commit in date order.
    Full,
}

/// Read-only queries against the version-control history. Each call returns
/// the raw text of one command; interpretation belongs to `crate::parse`.
///
/// Implementations must be shareable across the resolver's workers.
pub trait Oracle: Sync {
    /// `<revision-id> refs/tags/<name>` per tag. Empty when there are none.
    fn tag_refs(&self) -> Result<String>;

    /// `<epoch> <author>` of one revision.
    fn revision_header(&self, revision: &str) -> Result<String>;

    /// `shortlog -s` over `revisions`, e.g. `["v2", "^v1"]`.
    fn shortlog(&self, revisions: &[String]) -> Result<String>;

    /// `<epoch> <date> <time> <tz> <name> <<email>>` per commit.
    fn commit_log(&self, range: &LogRange) -> Result<String>;

    /// `<epoch> <tree-id>` per commit.
    fn tree_log(&self, range: &LogRange) -> Result<String>;

    /// `<epoch> <author>` per commit, each followed by its shortstat line
    /// when the commit changed anything.
    fn shortstat_log(&self, range: &LogRange, walk: Walk) -> Result<String>;

    /// Recursive, NUL-delimited `<mode> <type> <id> <size>\t<path>` listing.
    fn tree_listing(&self, revision: &str) -> Result<String>;

    fn count_files_in_tree(&self, tree: &ContentId) -> Result<u64>;

    fn count_lines_in_blob(&self, blob: &ContentId) -> Result<u64>;
}
