//! Command definitions and per-mode command tables.
//!
//! Tables are built once at startup and never mutated afterwards; modes
//! share them across every session.

use super::args::{ArgPattern, Args};
use crate::error::HandlerResult;
use crate::state::{Hall, PlayerId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Authorization predicate: a pure read of session state. A false result
/// routes to the mode's unknown-command response.
pub type Guard = fn(&Hall, PlayerId) -> bool;

/// A command handler.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, hall: &mut Hall, call: Call) -> HandlerResult;
}

/// One dispatched invocation.
pub struct Call {
    /// The invoking session.
    pub player: PlayerId,
    /// The raw input line.
    pub raw: String,
    /// Captured arguments; absent optional captures are `None`.
    pub args: Args,
}

/// A registered command: identity, argument shape, authorization and
/// handler.
pub struct Command {
    name: &'static str,
    aliases: &'static [&'static str],
    pattern: Option<ArgPattern>,
    usage: Option<&'static str>,
    guard: Option<Guard>,
    handler: Arc<dyn CommandHandler>,
}

impl Command {
    pub fn new(name: &'static str, handler: impl CommandHandler + 'static) -> Self {
        Self {
            name,
            aliases: &[],
            pattern: None,
            usage: None,
            guard: None,
            handler: Arc::new(handler),
        }
    }

    /// Alternate names resolving to this command.
    pub fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    /// Argument pattern applied to the text after the command name.
    pub fn args(mut self, pattern: &str) -> Self {
        self.pattern = Some(ArgPattern::new(pattern));
        self
    }

    /// Message shown when the argument pattern fails to match. Without
    /// one, a failed match takes the unknown-command path.
    pub fn usage(mut self, usage: &'static str) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Authorization predicate evaluated before argument binding.
    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn pattern(&self) -> Option<&ArgPattern> {
        self.pattern.as_ref()
    }

    pub(crate) fn usage_message(&self) -> Option<&'static str> {
        self.usage
    }

    pub(crate) fn guard_fn(&self) -> Option<Guard> {
        self.guard
    }

    pub(crate) fn handler(&self) -> Arc<dyn CommandHandler> {
        self.handler.clone()
    }
}

/// An immutable mapping from command name (with aliases) to command.
#[derive(Default)]
pub struct CommandTable {
    commands: HashMap<&'static str, Arc<Command>>,
    aliases: HashMap<&'static str, &'static str>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command and its aliases. Duplicate names are a
    /// programming error caught at startup in debug builds.
    pub fn register(&mut self, command: Command) {
        let name = command.name;
        let aliases = command.aliases;
        let previous = self.commands.insert(name, Arc::new(command));
        debug_assert!(previous.is_none(), "duplicate command: {name}");
        for &alias in aliases {
            let previous = self.aliases.insert(alias, name);
            debug_assert!(previous.is_none(), "duplicate alias: {alias}");
        }
    }

    /// Resolve a candidate name through the alias table to a command.
    pub fn resolve(&self, candidate: &str) -> Option<Arc<Command>> {
        let canonical = self.aliases.get(candidate).copied().unwrap_or(candidate);
        self.commands.get(canonical).cloned()
    }

    /// Fill gaps from a more general table; existing entries win. This is
    /// how specialized modes borrow the general command set, resolved once
    /// at construction rather than chained at dispatch time.
    pub fn merge_missing(&mut self, general: &CommandTable) {
        for (&name, command) in &general.commands {
            if !self.commands.contains_key(name) {
                self.commands.insert(name, command.clone());
            }
        }
        for (&alias, &target) in &general.aliases {
            if !self.aliases.contains_key(alias)
                && !self.commands.contains_key(alias)
                && self.commands.contains_key(target)
            {
                self.aliases.insert(alias, target);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerResult;

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn handle(&self, _hall: &mut Hall, _call: Call) -> HandlerResult {
            Ok(())
        }
    }

    #[test]
    fn test_alias_resolution() {
        let mut table = CommandTable::new();
        table.register(Command::new("score", Noop).aliases(&["sc"]));
        assert!(table.resolve("score").is_some());
        assert!(table.resolve("sc").is_some());
        assert!(table.resolve("scr").is_none());
    }

    #[test]
    fn test_merge_missing_prefers_specialized() {
        let mut general = CommandTable::new();
        general.register(Command::new("leave", Noop));
        general.register(Command::new("who", Noop).aliases(&["w"]));

        let mut specialized = CommandTable::new();
        specialized.register(Command::new("leave", Noop).guard(|_, _| false));
        specialized.merge_missing(&general);

        assert_eq!(specialized.len(), 2);
        // The specialized entry kept its own guard.
        let leave = specialized.resolve("leave").expect("leave registered");
        assert!(leave.guard_fn().is_some());
        // Borrowed commands keep their aliases.
        assert!(specialized.resolve("w").is_some());
    }
}
