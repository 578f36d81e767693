//! Hosts-file redirection for hard-mode site blocking.
//!
//! The redirect entries live in one region bounded by [`MARKER_START`] and
//! [`MARKER_END`]. Patching always strips any existing region first, so a
//! block left behind by a crashed session is replaced rather than duplicated,
//! and unpatching a freshly patched file gives back the original bytes.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

pub const MARKER_START: &str = "# BUGGYFOCUS-START";
pub const MARKER_END: &str = "# BUGGYFOCUS-END";

/// Remove every marker region from `content`.
///
/// A region runs from a start marker to the first end marker after it. The
/// newline that [`insert_block`] puts in front of the start marker is removed
/// with the region. A start marker that reaches another start marker (or the
/// end of the file) before any end marker is unterminated and left alone,
/// together with the lines after it.
pub fn strip_block(content: &str) -> String {
    let mut out = content.to_string();
    let mut cursor = 0;
    while let Some(found) = out[cursor..].find(MARKER_START) {
        let start = cursor + found;
        let body = start + MARKER_START.len();
        let end = out[body..].find(MARKER_END).map(|i| body + i);
        let next_start = out[body..].find(MARKER_START).map(|i| body + i);

        match end {
            Some(end) if next_start.map_or(true, |next| end < next) => {
                let from = if out[..start].ends_with('\n') {
                    start - 1
                } else {
                    start
                };
                out.replace_range(from..end + MARKER_END.len(), "");
                cursor = from;
            }
            _ => {
                warn!("Hosts file has a start marker without an end marker; leaving it untouched");
                cursor = body;
            }
        }
    }
    out
}

/// Render the marker region for `sites`, each redirected along with its
/// `www.` variant.
pub fn render_block(sites: &[String], redirect: &str) -> String {
    let mut lines = Vec::with_capacity(sites.len() * 2 + 2);
    lines.push(MARKER_START.to_string());
    for site in sites {
        let host = site.trim().trim_start_matches("www.");
        if host.is_empty() {
            continue;
        }
        lines.push(format!("{redirect} {host}"));
        lines.push(format!("{redirect} www.{host}"));
    }
    lines.push(MARKER_END.to_string());
    lines.join("\n")
}

/// Strip any existing region and append a fresh one for `sites`.
pub fn insert_block(content: &str, sites: &[String], redirect: &str) -> String {
    let mut out = strip_block(content);
    out.push('\n');
    out.push_str(&render_block(sites, redirect));
    out
}

/// A hosts file on disk.
#[derive(Debug, Clone)]
pub struct HostsFile {
    path: PathBuf,
    redirect: String,
}

impl HostsFile {
    pub fn new(path: impl Into<PathBuf>, redirect: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            redirect: redirect.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Redirect `sites` to the loopback address.
    ///
    /// Returns `false` if the file could not be read or written (usually
    /// missing privileges). Never panics or propagates.
    pub fn block(&self, sites: &[String]) -> bool {
        let result = fs::read_to_string(&self.path)
            .and_then(|content| fs::write(&self.path, insert_block(&content, sites, &self.redirect)));
        match result {
            Ok(()) => {
                info!(path = %self.path.display(), sites = sites.len(), "Hosts block applied");
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not write hosts file");
                false
            }
        }
    }

    /// Remove the marker region. Returns `false` if the file could not be
    /// rewritten. A file without a region is left untouched.
    pub fn unblock(&self) -> bool {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not read hosts file");
                return false;
            }
        };
        let stripped = strip_block(&content);
        if stripped == content {
            return true;
        }
        match fs::write(&self.path, stripped) {
            Ok(()) => {
                info!(path = %self.path.display(), "Hosts block removed");
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not clean hosts file");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE: &str = "127.0.0.1 localhost\n::1 localhost\n";

    fn sites(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn block_contains_site_and_www_variant() {
        let out = insert_block(BASE, &sites(&["reddit.com"]), "127.0.0.1");
        assert!(out.starts_with(BASE));
        assert!(out.contains("127.0.0.1 reddit.com\n127.0.0.1 www.reddit.com"));
        assert!(out.ends_with(MARKER_END));
    }

    #[test]
    fn www_prefix_is_not_doubled() {
        let block = render_block(&sites(&["www.youtube.com"]), "0.0.0.0");
        assert!(block.contains("0.0.0.0 youtube.com"));
        assert!(!block.contains("www.www."));
    }

    #[test]
    fn insert_then_strip_restores_original_bytes() {
        for original in [BASE, "127.0.0.1 localhost", ""] {
            let patched = insert_block(original, &sites(&["x.com"]), "127.0.0.1");
            assert_eq!(strip_block(&patched), original);
        }
    }

    #[test]
    fn inserting_twice_leaves_one_region() {
        let once = insert_block(BASE, &sites(&["a.com"]), "127.0.0.1");
        let twice = insert_block(&once, &sites(&["b.com"]), "127.0.0.1");
        assert_eq!(twice.matches(MARKER_START).count(), 1);
        assert_eq!(twice.matches(MARKER_END).count(), 1);
        assert!(!twice.contains("a.com"));
        assert_eq!(strip_block(&twice), BASE);
    }

    #[test]
    fn strip_removes_duplicate_leftovers() {
        let region = render_block(&sites(&["a.com"]), "127.0.0.1");
        let messy = format!("{BASE}\n{region}\n{region}");
        assert_eq!(strip_block(&messy), BASE);
    }

    #[test]
    fn unterminated_region_is_left_alone() {
        let broken = format!("{BASE}{MARKER_START}\n127.0.0.1 a.com\n");
        assert_eq!(strip_block(&broken), broken);
    }

    #[test]
    fn stale_start_marker_does_not_swallow_user_lines() {
        let original = format!("127.0.0.1 localhost\n{MARKER_START}\n127.0.0.1 stale.com\n# user line\n");
        let patched = insert_block(&original, &sites(&["reddit.com"]), "127.0.0.1");
        assert_eq!(patched.matches(MARKER_START).count(), 2);
        assert_eq!(strip_block(&patched), original);

        let again = insert_block(&patched, &sites(&["reddit.com"]), "127.0.0.1");
        assert_eq!(again, patched);
    }

    #[test]
    fn hosts_file_block_and_unblock_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts");
        fs::write(&path, BASE).unwrap();

        let hosts = HostsFile::new(&path, "127.0.0.1");
        assert!(hosts.block(&sites(&["reddit.com", "youtube.com"])));
        assert!(hosts.block(&sites(&["reddit.com", "youtube.com"])));
        let patched = fs::read_to_string(&path).unwrap();
        assert_eq!(patched.matches(MARKER_START).count(), 1);

        assert!(hosts.unblock());
        assert_eq!(fs::read_to_string(&path).unwrap(), BASE);
        assert!(hosts.unblock());
    }

    #[test]
    fn missing_file_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let hosts = HostsFile::new(dir.path().join("nope").join("hosts"), "127.0.0.1");
        assert!(!hosts.block(&sites(&["reddit.com"])));
        assert!(!hosts.unblock());
    }

    proptest! {
        #[test]
        fn strip_inverts_insert(
            base in "[a-z0-9 .:#\n]{0,200}",
            lone_start in proptest::option::of(0usize..=200),
            list in proptest::collection::vec("[a-z]{1,10}\\.(com|org|net)", 0..5),
        ) {
            // A crash mid-write can leave a start marker with no end marker.
            let mut original = base;
            if let Some(at) = lone_start {
                let at = at.min(original.len());
                original.insert_str(at, MARKER_START);
            }
            let patched = insert_block(&original, &list, "127.0.0.1");
            prop_assert_eq!(strip_block(&patched), original.clone());
            let again = insert_block(&patched, &list, "127.0.0.1");
            prop_assert_eq!(again, patched);
        }
    }
}
