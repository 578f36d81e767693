//! Distraction detection from visible window titles.
//!
//! Each blocked site is reduced to a keyword (the lower-cased part before the
//! first dot, so `reddit.com` becomes `reddit`). A leading `www.` is dropped
//! first, as the hosts block does. A poll checks the keywords in
//! configured order against all titles and reports at most one site.

use std::time::{Duration, Instant};

/// A site and the keyword searched for in window titles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTarget {
    pub site: String,
    pub keyword: String,
}

impl BlockTarget {
    /// `None` when the site yields no usable keyword (e.g. `".com"`).
    pub fn from_site(site: &str) -> Option<Self> {
        let site = site.trim();
        let lower = site.to_lowercase();
        let host = lower.trim_start_matches("www.");
        let keyword = host.split('.').next()?.trim().to_string();
        if keyword.is_empty() {
            return None;
        }
        Some(Self {
            site: site.to_string(),
            keyword,
        })
    }
}

/// A debounced detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub site: String,
}

#[derive(Debug, Clone)]
pub struct DistractionMonitor {
    targets: Vec<BlockTarget>,
    debounce: Duration,
    last: Option<(String, Instant)>,
}

impl DistractionMonitor {
    pub fn new(sites: &[String], debounce: Duration) -> Self {
        Self {
            targets: sites.iter().filter_map(|s| BlockTarget::from_site(s)).collect(),
            debounce,
            last: None,
        }
    }

    pub fn targets(&self) -> &[BlockTarget] {
        &self.targets
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Forget the last detection.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// First target (in configured order) whose keyword appears in any title.
    pub fn first_match<S: AsRef<str>>(&self, titles: &[S]) -> Option<&BlockTarget> {
        let lowered: Vec<String> = titles.iter().map(|t| t.as_ref().to_lowercase()).collect();
        self.targets
            .iter()
            .find(|target| lowered.iter().any(|title| title.contains(&target.keyword)))
    }

    /// Check one poll's titles at time `now`.
    ///
    /// A match on the same site as the previous detection is suppressed until
    /// the debounce window has fully elapsed; a different site fires at once.
    pub fn observe<S: AsRef<str>>(&mut self, titles: &[S], now: Instant) -> Option<Detection> {
        let site = self.first_match(titles)?.site.clone();
        if let Some((last_site, at)) = &self.last {
            if *last_site == site && now.saturating_duration_since(*at) <= self.debounce {
                return None;
            }
        }
        self.last = Some((site.clone(), now));
        Some(Detection { site })
    }
}
