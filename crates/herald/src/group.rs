//! Command groups and overload-resolving dispatch
//!
//! A [`CommandGroup`] holds three things:
//!
//! - local commands, bucketed by name (one bucket per overload set)
//! - merged peer groups, whose commands behave as if they were local for
//!   dispatch and enumeration
//! - child groups keyed by a path segment, reached only by consuming that
//!   segment from the command text
//!
//! # Dispatch
//!
//! ```text
//! "admin ban Bob being rude"
//!      │
//!      ├─ candidates named "admin" (local + merged), sorted by score
//!      │     each: tokenize to arity → coerce → invoke; first Handled wins
//!      │
//!      └─ nobody handled it → child "admin" dispatches "ban Bob being rude"
//!                               with path "admin"
//! ```
//!
//! Candidates are ordered by `priority * 1000 + arity`, highest first. Equal
//! scores keep collection order: local entries in registration order, then
//! each merged group in the order it was merged.
//!
//! # Concurrency
//!
//! Group state sits behind a `parking_lot::RwLock`. Dispatch snapshots the
//! candidate list and child links before calling any handler, so handlers
//! may register or unregister commands without deadlocking. A dispatch that
//! is already running keeps using the snapshot it took.
//!
//! # Cycles
//!
//! Merging or attaching a group that can already reach the receiver is
//! rejected with [`CommandError::Cycle`]. Traversals also carry an ancestor
//! guard and stop with a warning if a cycle is met anyway.

use crate::bundle::CommandBundle;
use crate::coercion::{Actor, CoercionRegistry};
use crate::entry::{CommandEntry, CommandRoute, Params};
use crate::error::{CommandError, Result};
use crate::tokenize::{join_path, split_command, tokenize_params, DELIMITER};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::fmt;
use std::ptr;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

struct GroupState<A> {
    commands: IndexMap<String, Vec<Arc<CommandEntry<A>>>>,
    merged: Vec<Arc<CommandGroup<A>>>,
    children: IndexMap<String, Arc<CommandGroup<A>>>,
}

/// A composable namespace of commands.
///
/// Groups are always handled through `Arc` so they can be merged into or
/// attached under several parents.
pub struct CommandGroup<A> {
    registry: Arc<CoercionRegistry<A>>,
    state: RwLock<GroupState<A>>,
}

impl<A: Actor> CommandGroup<A> {
    /// Create an empty group that coerces parameters with `registry`.
    pub fn new(registry: Arc<CoercionRegistry<A>>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            state: RwLock::new(GroupState {
                commands: IndexMap::new(),
                merged: Vec::new(),
                children: IndexMap::new(),
            }),
        })
    }

    /// Create an empty group sharing this group's registry.
    pub fn peer(&self) -> Arc<Self> {
        Self::new(Arc::clone(&self.registry))
    }

    /// The registry used for coercion and registration checks.
    #[must_use]
    pub fn registry(&self) -> &Arc<CoercionRegistry<A>> {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Add an overload to the bucket for its name.
    ///
    /// Identical signatures are not de-duplicated; both will be tried.
    /// Fails if a parameter kind has no parser in this group's registry.
    pub fn register_command(&self, entry: CommandEntry<A>) -> Result<()> {
        self.check_kinds(&entry)?;
        debug!(
            command = entry.name(),
            arity = entry.arity(),
            priority = entry.priority(),
            "registered command"
        );
        self.state
            .write()
            .commands
            .entry(entry.name().to_string())
            .or_default()
            .push(Arc::new(entry));
        Ok(())
    }

    /// Register every entry a bundle declares.
    ///
    /// All entries are validated before any is added, so a bundle with one
    /// bad entry registers nothing. Returns the number of entries added.
    pub fn register_commands<B>(&self, bundle: Arc<B>) -> Result<usize>
    where
        B: CommandBundle<A> + ?Sized,
    {
        let entries = bundle.command_entries()?;
        for entry in &entries {
            self.check_kinds(entry)?;
        }

        let count = entries.len();
        let mut state = self.state.write();
        for entry in entries {
            state
                .commands
                .entry(entry.name().to_string())
                .or_default()
                .push(Arc::new(entry));
        }
        debug!(count, "registered command bundle");
        Ok(count)
    }

    /// Merge `group` as a peer. Merging the same group twice is a no-op.
    ///
    /// Fails with [`CommandError::Cycle`] if this group is reachable from
    /// `group` through merges or children, so a child can never merge one of
    /// its ancestors. Every entry visible through `group` must have parsers
    /// in this group's registry; entries added to the peer after the merge
    /// are checked against the peer's own registry only.
    pub fn register_group(&self, group: &Arc<Self>) -> Result<()> {
        if group.can_reach(self) {
            return Err(CommandError::Cycle { segment: None });
        }
        let mut visible = Vec::new();
        group.collect_visible("", None, &mut Vec::new(), &mut visible);
        for route in &visible {
            self.check_kinds(&route.entry)?;
        }

        let mut state = self.state.write();
        if !state.merged.iter().any(|g| Arc::ptr_eq(g, group)) {
            state.merged.push(Arc::clone(group));
        }
        Ok(())
    }

    /// Remove a merged peer. Returns whether it was merged.
    pub fn unregister_group(&self, group: &Arc<Self>) -> bool {
        let mut state = self.state.write();
        let before = state.merged.len();
        state.merged.retain(|g| !Arc::ptr_eq(g, group));
        before != state.merged.len()
    }

    /// Whether `group` is merged into this group.
    #[must_use]
    pub fn contains_group(&self, group: &Arc<Self>) -> bool {
        self.state.read().merged.iter().any(|g| Arc::ptr_eq(g, group))
    }

    /// Attach `group` under the path segment `name`, replacing any group
    /// already there.
    pub fn register_child_group(&self, group: &Arc<Self>, name: &str) -> Result<()> {
        if name.is_empty() || name.contains(DELIMITER) {
            return Err(CommandError::InvalidName {
                name: name.to_string(),
            });
        }
        if group.can_reach(self) {
            return Err(CommandError::Cycle {
                segment: Some(name.to_string()),
            });
        }
        let replaced = self
            .state
            .write()
            .children
            .insert(name.to_string(), Arc::clone(group));
        if replaced.is_some() {
            debug!(segment = name, "replaced child group");
        }
        Ok(())
    }

    /// Detach `group` from every segment it is attached under.
    ///
    /// Removal is by identity across all names, unlike registration which is
    /// per name. Returns the number of segments removed.
    pub fn unregister_child_group(&self, group: &Arc<Self>) -> usize {
        let mut state = self.state.write();
        let before = state.children.len();
        state.children.retain(|_, g| !Arc::ptr_eq(g, group));
        before - state.children.len()
    }

    /// Whether `group` is attached under any segment.
    #[must_use]
    pub fn contains_child_group(&self, group: &Arc<Self>) -> bool {
        self.state
            .read()
            .children
            .values()
            .any(|g| Arc::ptr_eq(g, group))
    }

    /// The child group attached at `name`.
    #[must_use]
    pub fn child_group(&self, name: &str) -> Option<Arc<Self>> {
        self.state.read().children.get(name).cloned()
    }

    /// Local command names, in registration order.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        self.state.read().commands.keys().cloned().collect()
    }

    /// Number of local entries across all names.
    #[must_use]
    pub fn local_command_count(&self) -> usize {
        self.state.read().commands.values().map(Vec::len).sum()
    }

    /// Whether the group has no local commands, peers or children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let state = self.state.read();
        state.commands.is_empty() && state.merged.is_empty() && state.children.is_empty()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Dispatch a full command line. Returns whether a handler handled it.
    ///
    /// Unknown commands, arity mismatches, coercion failures and handler
    /// faults are all absorbed; the only outcome is the boolean.
    pub fn dispatch(&self, actor: &A, command_text: &str) -> bool {
        self.dispatch_at("", actor, command_text)
    }

    /// Dispatch with the command name already split off.
    pub fn dispatch_command(&self, actor: &A, command: &str, param_text: &str) -> bool {
        self.dispatch_split("", actor, command.trim(), param_text)
    }

    fn dispatch_at(&self, path: &str, actor: &A, command_text: &str) -> bool {
        match split_command(command_text) {
            Some((command, remainder)) => self.dispatch_split(path, actor, command, remainder),
            None => false,
        }
    }

    fn dispatch_split(&self, path: &str, actor: &A, command: &str, param_text: &str) -> bool {
        for route in self.candidates(path, command) {
            if self.try_candidate(&route, actor, param_text) {
                return true;
            }
        }

        let Some(child) = self.child_group(command) else {
            trace!(path, command, "no handler and no child group");
            return false;
        };
        let child_path = join_path(path, command);
        debug!(path = %child_path, "routing to child group");
        child.dispatch_at(&child_path, actor, param_text)
    }

    fn try_candidate(&self, route: &CommandRoute<A>, actor: &A, param_text: &str) -> bool {
        let entry = &route.entry;
        let Some(tokens) = tokenize_params(param_text, entry.arity()) else {
            trace!(command = entry.name(), arity = entry.arity(), "arity mismatch");
            return false;
        };

        let params = match self.registry.parse_all(entry.param_kinds(), &tokens) {
            Ok(values) => Params::new(values),
            Err(err) => {
                trace!(command = entry.name(), error = %err, "coercion failed");
                return false;
            }
        };

        match entry.invoke(actor, &params) {
            Ok(outcome) => outcome.is_handled(),
            Err(err) => {
                error!(
                    path = %route.path,
                    command = entry.name(),
                    "command handler failed: {err:#}"
                );
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Lookup and enumeration
    // ------------------------------------------------------------------

    /// Every entry reachable from this group with the path it is reached at.
    ///
    /// With a filter, only entries whose path starts with it are returned;
    /// child groups are still descended so deeper matches are found.
    pub fn list_entries(&self, path_filter: Option<&str>) -> Vec<CommandRoute<A>> {
        let mut routes = Vec::new();
        self.collect_entries("", path_filter.unwrap_or(""), &mut Vec::new(), &mut routes);
        routes
    }

    /// The ordered candidates dispatch would consider for `command_text`,
    /// at every level it could route through, without invoking anything.
    pub fn match_candidates(&self, command_text: &str) -> Vec<CommandRoute<A>> {
        let mut routes = Vec::new();
        self.collect_matches("", command_text, &mut routes);
        routes
    }

    fn collect_matches(&self, path: &str, command_text: &str, out: &mut Vec<CommandRoute<A>>) {
        let Some((command, remainder)) = split_command(command_text) else {
            return;
        };
        out.extend(self.candidates(path, command));

        if remainder.is_empty() {
            return;
        }
        if let Some(child) = self.child_group(command) {
            child.collect_matches(&join_path(path, command), remainder, out);
        }
    }

    /// Local and merged entries named `command`, sorted by descending score.
    fn candidates(&self, path: &str, command: &str) -> Vec<CommandRoute<A>> {
        let mut routes = Vec::new();
        self.collect_visible(path, Some(command), &mut Vec::new(), &mut routes);
        // Stable sort: equal scores stay in collection order.
        routes.sort_by_key(|route| Reverse(route.entry.score()));
        routes
    }

    /// Local entries plus, recursively, those of merged groups. Children are
    /// not followed.
    fn collect_visible(
        &self,
        path: &str,
        command: Option<&str>,
        ancestors: &mut Vec<*const Self>,
        out: &mut Vec<CommandRoute<A>>,
    ) {
        if self.on_stack(ancestors) {
            warn!(path, "merged group cycle detected, skipping");
            return;
        }

        let merged = {
            let state = self.state.read();
            match command {
                Some(command) => {
                    if let Some(bucket) = state.commands.get(command) {
                        out.extend(bucket.iter().map(|e| CommandRoute::new(path, Arc::clone(e))));
                    }
                }
                None => {
                    for bucket in state.commands.values() {
                        out.extend(bucket.iter().map(|e| CommandRoute::new(path, Arc::clone(e))));
                    }
                }
            }
            state.merged.clone()
        };

        ancestors.push(self as *const Self);
        for group in merged {
            group.collect_visible(path, command, ancestors, out);
        }
        ancestors.pop();
    }

    fn collect_entries(
        &self,
        path: &str,
        filter: &str,
        ancestors: &mut Vec<*const Self>,
        out: &mut Vec<CommandRoute<A>>,
    ) {
        if self.on_stack(ancestors) {
            warn!(path, "child group cycle detected, skipping");
            return;
        }
        if path.starts_with(filter) {
            self.collect_visible(path, None, ancestors, out);
        }

        let children: Vec<(String, Arc<Self>)> = self
            .state
            .read()
            .children
            .iter()
            .map(|(segment, group)| (segment.clone(), Arc::clone(group)))
            .collect();

        ancestors.push(self as *const Self);
        for (segment, child) in children {
            child.collect_entries(&join_path(path, &segment), filter, ancestors, out);
        }
        ancestors.pop();
    }

    fn on_stack(&self, ancestors: &[*const Self]) -> bool {
        ancestors.iter().any(|a| ptr::eq(*a, self))
    }

    fn links(&self) -> Vec<Arc<Self>> {
        let state = self.state.read();
        state
            .merged
            .iter()
            .chain(state.children.values())
            .cloned()
            .collect()
    }

    /// Whether `target` is this group or reachable through merges or children.
    fn can_reach(&self, target: &Self) -> bool {
        if ptr::eq(self, target) {
            return true;
        }
        let mut seen: Vec<*const Self> = vec![self as *const Self];
        let mut pending = self.links();
        while let Some(group) = pending.pop() {
            let group_ptr = Arc::as_ptr(&group);
            if ptr::eq(group_ptr, target) {
                return true;
            }
            if seen.contains(&group_ptr) {
                continue;
            }
            seen.push(group_ptr);
            pending.extend(group.links());
        }
        false
    }

    fn check_kinds(&self, entry: &CommandEntry<A>) -> Result<()> {
        match entry
            .param_kinds()
            .iter()
            .find(|kind| !self.registry.contains(**kind))
        {
            Some(kind) => Err(CommandError::UnregisteredKind {
                command: entry.name().to_string(),
                kind: *kind,
            }),
            None => Ok(()),
        }
    }
}

impl<A> fmt::Debug for CommandGroup<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("CommandGroup")
            .field("commands", &state.commands.keys().collect::<Vec<_>>())
            .field("merged", &state.merged.len())
            .field("children", &state.children.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coercion::ParamKind;
    use crate::entry::Outcome;

    fn group() -> Arc<CommandGroup<u32>> {
        CommandGroup::new(Arc::new(CoercionRegistry::standard()))
    }

    fn entry(name: &str, arity: usize, priority: i32) -> CommandEntry<u32> {
        (0..arity)
            .fold(CommandEntry::builder(name), |b, i| {
                b.param(format!("p{i}"), ParamKind::String)
            })
            .priority(priority)
            .handler(|_, _| Ok(Outcome::Handled))
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_command_buckets() {
        let root = group();
        root.register_command(entry("help", 0, 0)).unwrap();
        root.register_command(entry("help", 1, 0)).unwrap();
        root.register_command(entry("help", 1, 0)).unwrap();
        root.register_command(entry("say", 1, 0)).unwrap();
        assert_eq!(root.local_command_count(), 4);
        assert_eq!(root.command_names(), vec!["help", "say"]);
    }

    #[test]
    fn test_register_rejects_unregistered_kind() {
        let root = group();
        let entry = CommandEntry::builder("kick")
            .param("target", ParamKind::Actor)
            .handler(|_, _| Ok(Outcome::Handled))
            .build()
            .unwrap();
        assert!(matches!(
            root.register_command(entry),
            Err(CommandError::UnregisteredKind {
                kind: ParamKind::Actor,
                ..
            })
        ));
        assert!(root.is_empty());
    }

    #[test]
    fn test_candidates_sorted_by_score() {
        let root = group();
        root.register_command(entry("kick", 1, 0)).unwrap();
        root.register_command(entry("kick", 2, 10)).unwrap();
        root.register_command(entry("kick", 3, 0)).unwrap();
        let order: Vec<i64> = root
            .candidates("", "kick")
            .iter()
            .map(|r| r.entry.score())
            .collect();
        assert_eq!(order, vec![10_002, 3, 1]);
    }

    #[test]
    fn test_equal_scores_keep_registration_order() {
        let root = group();
        let peer = root.peer();
        root.register_command(entry("x", 1, 0)).unwrap();
        peer.register_command(entry("x", 1, 0)).unwrap();
        root.register_group(&peer).unwrap();
        root.register_command(entry("x", 1, 0)).unwrap();

        let local: Vec<_> = root.state.read().commands["x"].clone();
        let candidates = root.candidates("", "x");
        assert_eq!(candidates.len(), 3);
        assert!(Arc::ptr_eq(&candidates[0].entry, &local[0]));
        assert!(Arc::ptr_eq(&candidates[1].entry, &local[1]));
    }

    #[test]
    fn test_self_merge_and_cycles_rejected() {
        let a = group();
        let b = a.peer();
        let c = a.peer();
        assert!(matches!(
            a.register_group(&a),
            Err(CommandError::Cycle { segment: None })
        ));
        a.register_group(&b).unwrap();
        b.register_child_group(&c, "deep").unwrap();
        assert!(c.register_group(&a).is_err());
        assert!(matches!(
            c.register_child_group(&a, "up"),
            Err(CommandError::Cycle { segment: Some(_) })
        ));
    }

    #[test]
    fn test_merge_checks_kinds_against_receiver_registry() {
        let strict: Arc<CommandGroup<u32>> = CommandGroup::new(Arc::new(CoercionRegistry::new()));
        let peer = group();
        let nested = group();
        nested.register_command(entry("say", 1, 0)).unwrap();
        peer.register_group(&nested).unwrap();

        assert!(matches!(
            strict.register_group(&peer),
            Err(CommandError::UnregisteredKind {
                kind: ParamKind::String,
                ..
            })
        ));
        assert!(!strict.contains_group(&peer));

        strict.registry().register(ParamKind::String, |s| {
            Ok(crate::coercion::ParamValue::String(s.to_string()))
        });
        strict.register_group(&peer).unwrap();
        assert!(strict.dispatch(&0, "say hi"));
    }

    #[test]
    fn test_diamond_merge_is_not_a_cycle() {
        let root = group();
        let left = root.peer();
        let right = root.peer();
        let shared = root.peer();
        left.register_group(&shared).unwrap();
        right.register_group(&shared).unwrap();
        root.register_group(&left).unwrap();
        root.register_group(&right).unwrap();
        shared.register_command(entry("ping", 0, 0)).unwrap();
        assert_eq!(root.candidates("", "ping").len(), 2);
    }

    #[test]
    fn test_child_segment_validation() {
        let root = group();
        let child = root.peer();
        assert!(root.register_child_group(&child, "").is_err());
        assert!(root.register_child_group(&child, "two words").is_err());
    }
}
