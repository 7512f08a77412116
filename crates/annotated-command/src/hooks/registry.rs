//! The hook registry.
//!
//! [`HookManager`] maps `(scope, kind)` to an ordered list of handlers. A
//! scope is a command name or alias, a command-file identity, or the
//! wildcard [`WILDCARD`] which applies to every command.
//!
//! # Resolution order
//!
//! [`HookManager::get`] resolves a stage for a list of scopes (the wildcard is
//! always appended last) phase-major, scope-minor:
//!
//! ```text
//! pre-alter  @ test:hook, pre-alter  @ MyCommands, pre-alter  @ *
//! alter      @ test:hook, alter      @ MyCommands, alter      @ *
//! post-alter @ test:hook, ...
//! ```
//!
//! so every pre hook runs before any main hook, and every main hook before
//! any post hook. Within one slot, handlers run in registration order.
//! Registering the same handler twice runs it twice.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::handlers::{
    CommandEventHook, Hook, InitializeHook, InteractHook, OptionHook, OutputExtractor,
    ResultProcessor, StatusDeterminer, Validator,
};
use super::kind::{HookKind, HookStage};
use crate::input::CommandCallback;

/// Scope that applies a hook to every command.
pub const WILDCARD: &str = "*";

/// Registry of hook handlers keyed by scope and kind.
#[derive(Clone, Default)]
pub struct HookManager {
    hooks: HashMap<String, HashMap<HookKind, Vec<Hook>>>,
}

impl HookManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `hook` to the `scope`/`kind` slot. An empty scope means
    /// [`WILDCARD`].
    ///
    /// No check is made that the handler fits `kind`; a handler that does
    /// not is skipped when the stage is dispatched.
    pub fn add(&mut self, hook: Hook, kind: HookKind, scope: &str) {
        let scope = if scope.is_empty() { WILDCARD } else { scope };
        tracing::debug!(%kind, scope, handler = hook.variant_name(), "registering hook");
        self.hooks
            .entry(scope.to_string())
            .or_default()
            .entry(kind)
            .or_default()
            .push(hook);
    }

    /// Appends `hook` to the wildcard scope.
    pub fn add_global(&mut self, hook: Hook, kind: HookKind) {
        self.add(hook, kind, WILDCARD);
    }

    pub fn add_command_event(&mut self, hook: impl CommandEventHook + 'static, scope: &str) {
        self.add(Hook::CommandEvent(Rc::new(hook)), HookKind::CommandEvent, scope);
    }

    pub fn add_initializer(&mut self, hook: impl InitializeHook + 'static, scope: &str) {
        self.add(Hook::Initialize(Rc::new(hook)), HookKind::Initialize, scope);
    }

    pub fn add_interactor(&mut self, hook: impl InteractHook + 'static, scope: &str) {
        self.add(Hook::Interact(Rc::new(hook)), HookKind::Interact, scope);
    }

    pub fn add_option_hook(&mut self, hook: impl OptionHook + 'static, scope: &str) {
        self.add(Hook::Options(Rc::new(hook)), HookKind::Option, scope);
    }

    pub fn add_validator(&mut self, validator: impl Validator + 'static, scope: &str) {
        self.add(Hook::Validate(Rc::new(validator)), HookKind::Validate, scope);
    }

    pub fn add_result_processor(&mut self, processor: impl ResultProcessor + 'static, scope: &str) {
        self.add(Hook::Process(Rc::new(processor)), HookKind::Process, scope);
    }

    pub fn add_alter_result(&mut self, alterer: impl ResultProcessor + 'static, scope: &str) {
        self.add(Hook::Process(Rc::new(alterer)), HookKind::Alter, scope);
    }

    pub fn add_status_determiner(
        &mut self,
        determiner: impl StatusDeterminer + 'static,
        scope: &str,
    ) {
        self.add(Hook::Status(Rc::new(determiner)), HookKind::Status, scope);
    }

    pub fn add_output_extractor(&mut self, extractor: impl OutputExtractor + 'static, scope: &str) {
        self.add(Hook::Extract(Rc::new(extractor)), HookKind::Extract, scope);
    }

    pub fn add_replace_command(&mut self, callback: impl CommandCallback + 'static, scope: &str) {
        self.add(
            Hook::ReplaceCommand(Rc::new(callback)),
            HookKind::ReplaceCommand,
            scope,
        );
    }

    /// Handlers registered in exactly one slot.
    pub fn hooks_for(&self, scope: &str, kind: HookKind) -> &[Hook] {
        self.hooks
            .get(scope)
            .and_then(|kinds| kinds.get(&kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Resolves one kind across `scopes` followed by the wildcard.
    pub fn get_kind(&self, scopes: &[String], kind: HookKind) -> Vec<Hook> {
        let mut resolved = Vec::new();
        for scope in effective_scopes(scopes) {
            resolved.extend(self.hooks_for(scope, kind).iter().cloned());
        }
        resolved
    }

    /// Resolves every kind of `stage` across `scopes` followed by the
    /// wildcard, phase-major.
    pub fn get(&self, scopes: &[String], stage: HookStage) -> Vec<Hook> {
        let resolved: Vec<Hook> = stage
            .kinds()
            .iter()
            .flat_map(|kind| self.get_kind(scopes, *kind))
            .collect();
        tracing::trace!(%stage, ?scopes, count = resolved.len(), "resolved hooks");
        resolved
    }

    /// Whether any handler is registered for `stage` under `scopes` or the
    /// wildcard.
    pub fn has(&self, scopes: &[String], stage: HookStage) -> bool {
        effective_scopes(scopes).any(|scope| {
            stage
                .kinds()
                .iter()
                .any(|kind| !self.hooks_for(scope, *kind).is_empty())
        })
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.hooks
            .values()
            .flat_map(|kinds| kinds.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `scopes` in order without repeats, then the wildcard.
fn effective_scopes(scopes: &[String]) -> impl Iterator<Item = &str> {
    let mut seen: Vec<&str> = Vec::with_capacity(scopes.len() + 1);
    for scope in scopes.iter().map(String::as_str).chain([WILDCARD]) {
        if !scope.is_empty() && !seen.contains(&scope) {
            seen.push(scope);
        }
    }
    seen.retain(|s| *s != WILDCARD);
    seen.push(WILDCARD);
    seen.into_iter()
}

impl fmt::Debug for HookManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut slots: Vec<String> = self
            .hooks
            .iter()
            .flat_map(|(scope, kinds)| {
                kinds
                    .iter()
                    .map(move |(kind, hooks)| format!("{}@{}={}", kind, scope, hooks.len()))
            })
            .collect();
        slots.sort();
        f.debug_struct("HookManager").field("slots", &slots).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::CommandResult;
    use std::cell::RefCell;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// An alterer that records `label` when it runs.
    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> Hook {
        let log = log.clone();
        Hook::alter(move |_, _| {
            log.borrow_mut().push(label);
            Ok(None)
        })
    }

    fn run_all(hooks: &[Hook]) {
        let data = crate::input::CommandData::default();
        for hook in hooks {
            if let Hook::Process(p) = hook {
                p.process(&CommandResult::Empty, &data).unwrap();
            }
        }
    }

    #[test]
    fn test_empty_registry() {
        let manager = HookManager::new();
        assert!(manager.is_empty());
        assert!(manager.get(&names(&["cmd"]), HookStage::Alter).is_empty());
        assert!(!manager.has(&names(&["cmd"]), HookStage::Alter));
    }

    #[test]
    fn test_wildcard_applies_to_every_command() {
        let mut manager = HookManager::new();
        manager.add_status_determiner(|_: &CommandResult| Some(1), WILDCARD);
        assert_eq!(manager.get(&names(&["a"]), HookStage::Status).len(), 1);
        assert_eq!(manager.get(&names(&["b", "alias"]), HookStage::Status).len(), 1);
        assert_eq!(manager.get(&[], HookStage::Status).len(), 1);
    }

    #[test]
    fn test_empty_scope_means_wildcard() {
        let mut manager = HookManager::new();
        manager.add(Hook::extract(|_| None), HookKind::Extract, "");
        assert_eq!(manager.hooks_for(WILDCARD, HookKind::Extract).len(), 1);
    }

    #[test]
    fn test_phase_major_ordering() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut manager = HookManager::new();
        // Registered in reverse phase order on purpose
        manager.add(recorder(&log, "post-cmd"), HookKind::PostCommand, "cmd");
        manager.add(recorder(&log, "post-alter-wild"), HookKind::PostAlter, WILDCARD);
        manager.add(recorder(&log, "alter-wild"), HookKind::Alter, WILDCARD);
        manager.add(recorder(&log, "alter-cmd"), HookKind::Alter, "cmd");
        manager.add(recorder(&log, "pre-alter-cmd"), HookKind::PreAlter, "cmd");

        run_all(&manager.get(&names(&["cmd"]), HookStage::Alter));

        assert_eq!(
            *log.borrow(),
            vec![
                "pre-alter-cmd",
                "alter-cmd",
                "alter-wild",
                "post-alter-wild",
                "post-cmd"
            ]
        );
    }

    #[test]
    fn test_scope_order_follows_given_names() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut manager = HookManager::new();
        manager.add(recorder(&log, "file"), HookKind::Alter, "MyCommands");
        manager.add(recorder(&log, "alias"), HookKind::Alter, "h");
        manager.add(recorder(&log, "name"), HookKind::Alter, "test:hook");

        run_all(&manager.get(&names(&["test:hook", "h", "MyCommands"]), HookStage::Alter));

        assert_eq!(*log.borrow(), vec!["name", "alias", "file"]);
    }

    #[test]
    fn test_duplicate_registration_runs_twice() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut manager = HookManager::new();
        let hook = recorder(&log, "dup");
        manager.add(hook.clone(), HookKind::Alter, "cmd");
        manager.add(hook, HookKind::Alter, "cmd");

        run_all(&manager.get(&names(&["cmd"]), HookStage::Alter));
        assert_eq!(*log.borrow(), vec!["dup", "dup"]);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_repeated_scopes_resolved_once() {
        let mut manager = HookManager::new();
        manager.add(Hook::extract(|_| None), HookKind::Extract, "cmd");
        manager.add(Hook::extract(|_| None), HookKind::Extract, WILDCARD);
        let resolved = manager.get(&names(&["cmd", "cmd", "*"]), HookStage::Extract);
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_other_commands_not_affected() {
        let mut manager = HookManager::new();
        manager.add_validator(
            |_: &crate::input::CommandData| -> anyhow::Result<Option<crate::input::CommandArgs>> {
                Ok(None)
            },
            "only:this",
        );
        assert!(manager.has(&names(&["only:this"]), HookStage::Validate));
        assert!(!manager.has(&names(&["other"]), HookStage::Validate));
    }
}
