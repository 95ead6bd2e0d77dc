//! Package grouping.
//!
//! Collects, per selected package name, the entry modules of every copy of
//! that package the host discovers.

use super::recorder::DependencyRecorder;
use crate::config::Selector;
use crate::ids::{NodeId, PackageName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

/// Default entry when a manifest declares no `main`.
const DEFAULT_MAIN: &str = "index.js";

/// A package manifest the host has loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageEvent {
    /// Package name, if the manifest declares one.
    #[serde(default)]
    pub name: Option<PackageName>,
    /// Directory containing the manifest.
    pub dir: String,
    /// Declared `main` entry, relative to `dir`.
    #[serde(default)]
    pub main: Option<String>,
    /// Manifest came from a warm cache, so no file event will follow it.
    #[serde(default)]
    pub cached: bool,
}

impl PackageEvent {
    /// A freshly discovered package.
    pub fn new(name: &str, dir: impl Into<String>) -> Self {
        Self {
            name: Some(PackageName::from(name)),
            dir: dir.into(),
            main: None,
            cached: false,
        }
    }

    /// Set the declared main entry.
    #[must_use]
    pub fn with_main(mut self, main: impl Into<String>) -> Self {
        self.main = Some(main.into());
        self
    }

    /// Mark the manifest as served from the warm cache.
    #[must_use]
    pub fn cached(mut self) -> Self {
        self.cached = true;
        self
    }
}

/// An entry module candidate for a package group.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Candidate {
    /// Reported by the file event that followed the package event.
    Observed(NodeId),
    /// Derived from a cached manifest: identities to try, in order.
    Declared(Vec<NodeId>),
}

/// Groups entry modules by package name.
#[derive(Debug, Default)]
pub struct PackageGrouper {
    selector: Selector,
    /// Packages waiting for the next file event.
    pending: Vec<PackageName>,
    /// Candidates per package, in first-seen order.
    groups: BTreeMap<PackageName, Vec<Candidate>>,
}

impl PackageGrouper {
    #[must_use]
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            ..Default::default()
        }
    }

    /// Observe a package manifest.
    pub fn observe_package(&mut self, event: &PackageEvent) {
        let Some(name) = &event.name else {
            return;
        };
        if !self.selector.matches(name) {
            return;
        }

        if event.cached {
            let probes = entry_candidates(&event.dir, event.main.as_deref());
            trace!(package = %name, dir = %event.dir, "Cached package, entry derived from main");
            self.add(name.clone(), Candidate::Declared(probes));
        } else {
            self.pending.push(name.clone());
        }
    }

    /// Observe a file. The first file after a package event is that package's entry.
    pub fn observe_file(&mut self, id: &NodeId) {
        for name in std::mem::take(&mut self.pending) {
            debug!(package = %name, node = %id, "Grouped package entry");
            self.add(name, Candidate::Observed(id.clone()));
        }
    }

    fn add(&mut self, name: PackageName, candidate: Candidate) {
        let members = self.groups.entry(name).or_default();
        if !members.contains(&candidate) {
            members.push(candidate);
        }
    }

    /// Number of package names seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Settle every group against the recorded graph.
    ///
    /// Cached candidates resolve to the first probe the dependency stream
    /// reported; those that match nothing are dropped.
    pub fn into_groups(self, recorder: &DependencyRecorder) -> Vec<(PackageName, Vec<NodeId>)> {
        self.groups
            .into_iter()
            .map(|(name, candidates)| {
                let mut members: Vec<NodeId> = Vec::with_capacity(candidates.len());
                for candidate in candidates {
                    let id = match candidate {
                        Candidate::Observed(id) => Some(id),
                        Candidate::Declared(probes) => {
                            let found = probes.into_iter().find(|p| recorder.contains(p));
                            if found.is_none() {
                                debug!(package = %name, "Declared entry never reported, dropping candidate");
                            }
                            found
                        }
                    };
                    if let Some(id) = id {
                        if !members.contains(&id) {
                            members.push(id);
                        }
                    }
                }
                (name, members)
            })
            .collect()
    }
}

/// Identities a cached package's entry may have, most specific first.
fn entry_candidates(dir: &str, main: Option<&str>) -> Vec<NodeId> {
    let main = main.filter(|m| !m.trim().is_empty()).unwrap_or(DEFAULT_MAIN);
    let entry = normalize(&Path::new(dir).join(main));
    let entry_str = entry.to_string_lossy().into_owned();

    let mut probes = vec![NodeId::new(entry_str.clone())];
    if !entry_str.ends_with(".js") {
        probes.push(NodeId::new(format!("{entry_str}.js")));
    }
    probes.push(NodeId::new(
        entry.join(DEFAULT_MAIN).to_string_lossy().into_owned(),
    ));
    probes.dedup();
    probes
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedupe::recorder::EdgeMap;

    fn groups(grouper: PackageGrouper, recorder: &DependencyRecorder) -> Vec<(String, Vec<String>)> {
        grouper
            .into_groups(recorder)
            .into_iter()
            .map(|(name, ids)| {
                (
                    name.to_string(),
                    ids.into_iter().map(|id| id.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_next_file_is_entry() {
        let mut grouper = PackageGrouper::new(Selector::packages(["lib-a"]));
        grouper.observe_package(&PackageEvent::new("lib-a", "/n/lib-a"));
        grouper.observe_file(&"/n/lib-a/index.js".into());
        grouper.observe_file(&"/n/lib-a/other.js".into());

        assert_eq!(
            groups(grouper, &DependencyRecorder::new()),
            vec![("lib-a".to_string(), vec!["/n/lib-a/index.js".to_string()])]
        );
    }

    #[test]
    fn test_unselected_package_ignored() {
        let mut grouper = PackageGrouper::new(Selector::packages(["lib-a"]));
        grouper.observe_package(&PackageEvent::new("lib-ab", "/n/lib-ab"));
        grouper.observe_file(&"/n/lib-ab/index.js".into());
        assert!(grouper.is_empty());
    }

    #[test]
    fn test_nameless_package_ignored() {
        let mut grouper = PackageGrouper::new(Selector::All);
        let mut event = PackageEvent::new("x", "/n/x");
        event.name = None;
        grouper.observe_package(&event);
        grouper.observe_file(&"/n/x/index.js".into());
        assert!(grouper.is_empty());
    }

    #[test]
    fn test_candidate_recorded_once() {
        let mut grouper = PackageGrouper::new(Selector::All);
        for _ in 0..2 {
            grouper.observe_package(&PackageEvent::new("lib-a", "/n/lib-a"));
            grouper.observe_file(&"/n/lib-a/index.js".into());
        }
        let out = groups(grouper, &DependencyRecorder::new());
        assert_eq!(out[0].1.len(), 1);
    }

    #[test]
    fn test_cached_package_matches_recorded_entry() {
        let mut grouper = PackageGrouper::new(Selector::All);
        grouper.observe_package(
            &PackageEvent::new("lib-a", "/n/lib-a")
                .with_main("./lib/main")
                .cached(),
        );

        let mut recorder = DependencyRecorder::new();
        recorder.record("/n/lib-a/lib/main.js".into(), EdgeMap::new());

        assert_eq!(
            groups(grouper, &recorder),
            vec![("lib-a".to_string(), vec!["/n/lib-a/lib/main.js".to_string()])]
        );
    }

    #[test]
    fn test_cached_package_without_match_dropped() {
        let mut grouper = PackageGrouper::new(Selector::All);
        grouper.observe_package(&PackageEvent::new("lib-a", "/n/lib-a").cached());

        let out = groups(grouper, &DependencyRecorder::new());
        assert!(out[0].1.is_empty());
    }

    #[test]
    fn test_entry_candidates() {
        let probes = entry_candidates("/n/pkg", Some("../pkg/./dist/index"));
        let probes: Vec<&str> = probes.iter().map(NodeId::as_str).collect();
        assert_eq!(
            probes,
            vec!["/n/pkg/dist/index", "/n/pkg/dist/index.js", "/n/pkg/dist/index/index.js"]
        );

        let probes = entry_candidates("/n/pkg", None);
        assert_eq!(probes[0].as_str(), "/n/pkg/index.js");
        assert_eq!(probes.len(), 2);
    }
}
