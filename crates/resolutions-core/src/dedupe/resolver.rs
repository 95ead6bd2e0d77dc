//! Canonical selection and transitive propagation.
//!
//! Runs once per pass, after the dependency stream has ended.

use super::annotate::SortAnnotator;
use super::recorder::{DependencyRecorder, EdgeMap};
use crate::ids::{NodeId, PackageName, Target};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, trace};

/// Role assigned to a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "role", content = "target", rename_all = "lowercase")]
pub enum Role {
    /// The copy that stays in the bundle.
    Canonical,
    /// Replaced by a reference to the given canonical module.
    Duplicate(NodeId),
}

/// One entry of a resolution, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionEntry {
    pub node: NodeId,
    #[serde(flatten)]
    pub role: Role,
}

/// Outcome of one pass: the role of every module that took part in dedupe.
///
/// Duplicates always point at a canonical module, so following a duplicate
/// link never leads to another duplicate.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    roles: BTreeMap<NodeId, Role>,
    graph: DependencyRecorder,
}

impl Resolution {
    /// Role of a module, if it took part in dedupe.
    #[must_use]
    pub fn role(&self, id: &NodeId) -> Option<&Role> {
        self.roles.get(id)
    }

    /// The canonical module a duplicate is replaced by.
    #[must_use]
    pub fn duplicate_target(&self, id: &NodeId) -> Option<&NodeId> {
        match self.roles.get(id) {
            Some(Role::Duplicate(target)) => Some(target),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_duplicate(&self, id: &NodeId) -> bool {
        self.duplicate_target(id).is_some()
    }

    #[must_use]
    pub fn is_canonical(&self, id: &NodeId) -> bool {
        matches!(self.roles.get(id), Some(Role::Canonical))
    }

    /// All canonical modules, sorted by identity.
    pub fn canonicals(&self) -> impl Iterator<Item = &NodeId> {
        self.roles
            .iter()
            .filter(|(_, role)| **role == Role::Canonical)
            .map(|(id, _)| id)
    }

    /// All duplicate -> canonical pairs, sorted by duplicate identity.
    pub fn duplicates(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> {
        self.roles.iter().filter_map(|(id, role)| match role {
            Role::Duplicate(target) => Some((id, target)),
            Role::Canonical => None,
        })
    }

    /// Entries for reporting, sorted by identity.
    #[must_use]
    pub fn entries(&self) -> Vec<ResolutionEntry> {
        self.roles
            .iter()
            .map(|(node, role)| ResolutionEntry {
                node: node.clone(),
                role: role.clone(),
            })
            .collect()
    }

    /// Recorded edges of a module.
    #[must_use]
    pub fn edges(&self, id: &NodeId) -> Option<&EdgeMap> {
        self.graph.edges(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Whether a row deduped to `target` may simply re-export it.
    ///
    /// Re-exporting shares the target's instance, which is only safe when the
    /// target is canonical and every dependency of the row is itself a
    /// duplicate. Otherwise the row could end up bound to a subtree that was
    /// kept separately.
    #[must_use]
    pub fn reexport_eligible(&self, target: &NodeId, deps: &EdgeMap) -> bool {
        self.is_canonical(target)
            && deps
                .values()
                .all(|dep| dep.node().is_some_and(|id| self.is_duplicate(id)))
    }

    /// Start annotating the host's sorted rows.
    #[must_use]
    pub fn annotator(&self) -> SortAnnotator<'_> {
        SortAnnotator::new(self)
    }
}

/// Resolve package groups into canonical and duplicate modules.
pub fn resolve(groups: Vec<(PackageName, Vec<NodeId>)>, graph: DependencyRecorder) -> Resolution {
    let mut roles: BTreeMap<NodeId, Role> = BTreeMap::new();
    let mut frontier: VecDeque<(NodeId, NodeId)> = VecDeque::new();

    // Shortest path first; the sort is stable so ties keep first-seen order.
    let groups: Vec<(PackageName, Vec<NodeId>)> = groups
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(name, mut members)| {
            members.sort_by_key(NodeId::path_len);
            (name, members)
        })
        .collect();

    // Every canonical is placed before any duplicate so no canonical can be
    // overwritten by a later group.
    for (_, members) in &groups {
        roles.entry(members[0].clone()).or_insert(Role::Canonical);
    }

    for (name, members) in &groups {
        let canonical = &members[0];
        debug!(package = %name, canonical = %canonical, count = members.len() - 1, "Resolved package group");
        for dup in &members[1..] {
            if roles.contains_key(dup) {
                debug!(package = %name, node = %dup, "Module already resolved, keeping its role");
                continue;
            }
            roles.insert(dup.clone(), Role::Duplicate(canonical.clone()));
            frontier.push_back((dup.clone(), canonical.clone()));
        }
    }

    while let Some((dup, canonical)) = frontier.pop_front() {
        propagate(&graph, &mut roles, &mut frontier, &dup, &canonical);
    }

    Resolution { roles, graph }
}

/// Align the dependencies of `dup` with those of `canonical`.
fn propagate(
    graph: &DependencyRecorder,
    roles: &mut BTreeMap<NodeId, Role>,
    frontier: &mut VecDeque<(NodeId, NodeId)>,
    dup: &NodeId,
    canonical: &NodeId,
) {
    let Some(dup_edges) = graph.edges(dup) else {
        return;
    };

    for (specifier, target) in dup_edges {
        let Target::Node(dep) = target else {
            continue;
        };
        if roles.contains_key(dep) {
            continue;
        }

        let counterpart = match graph.target(canonical, specifier) {
            Some(Target::Node(id)) => id,
            Some(Target::External) => {
                debug!(node = %dep, specifier = %specifier, "Counterpart is external, not deduping");
                continue;
            }
            None => {
                trace!(node = %dep, specifier = %specifier, "No counterpart in canonical subtree");
                continue;
            }
        };
        if counterpart == dep || matches!(roles.get(counterpart), Some(Role::Duplicate(_))) {
            continue;
        }

        trace!(node = %dep, target = %counterpart, "Propagated duplicate");
        roles
            .entry(counterpart.clone())
            .or_insert(Role::Canonical);
        roles.insert(dep.clone(), Role::Duplicate(counterpart.clone()));
        frontier.push_back((dep.clone(), counterpart.clone()));
    }
}
