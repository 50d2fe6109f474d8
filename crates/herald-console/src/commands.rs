//! Console command set
//!
//! Builds the command tree the console dispatches into:
//!
//! - root: `help`, `say`, `msg`, `color`, `which`
//! - merged `utility` peer: `add` (integer and float overloads), `upper`
//! - `admin` child group: `kick`, `ban`, `bans`, accepted only from admins
//!
//! Handlers write their output to a shared [`Transcript`] that the session
//! drains after each line.

use crate::roster::{Player, Roster};
use anyhow::anyhow;
use herald::{
    CoercionRegistry, CommandBundle, CommandEntry, CommandGroup, Outcome, ParamKind, Params,
};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Output lines produced by handlers.
#[derive(Debug, Clone, Default)]
pub struct Transcript(Arc<Mutex<Vec<String>>>);

impl Transcript {
    /// Append a line.
    pub fn say(&self, line: impl Into<String>) {
        self.0.lock().push(line.into());
    }

    /// Take every line written so far.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

/// Build the full command tree.
pub fn build_command_tree(
    roster: Arc<Roster>,
    transcript: &Transcript,
) -> herald::Result<Arc<CommandGroup<Player>>> {
    let registry = CoercionRegistry::standard().with_actor_directory(roster);
    let root = CommandGroup::new(Arc::new(registry));

    root.register_commands(Arc::new(CoreCommands {
        root: Arc::downgrade(&root),
        transcript: transcript.clone(),
    }))?;

    let utility = root.peer();
    utility.register_commands(Arc::new(UtilityCommands {
        transcript: transcript.clone(),
    }))?;
    root.register_group(&utility)?;

    let admin = root.peer();
    admin.register_commands(Arc::new(AdminCommands {
        transcript: transcript.clone(),
        banned: Mutex::new(BTreeSet::new()),
    }))?;
    root.register_child_group(&admin, "admin")?;

    Ok(root)
}

// ----------------------------------------------------------------------------
// Core
// ----------------------------------------------------------------------------

struct CoreCommands {
    root: Weak<CommandGroup<Player>>,
    transcript: Transcript,
}

impl CoreCommands {
    fn root(&self) -> anyhow::Result<Arc<CommandGroup<Player>>> {
        self.root
            .upgrade()
            .ok_or_else(|| anyhow!("command tree has been dropped"))
    }

    fn help(&self, topic: Option<&str>) -> anyhow::Result<Outcome> {
        let routes = self.root()?.list_entries(None);
        let mut usages: Vec<String> = routes
            .iter()
            .filter(|r| topic.map_or(true, |t| r.full_name().starts_with(t)))
            .map(|r| r.usage())
            .collect();
        usages.dedup();

        if usages.is_empty() {
            self.transcript
                .say(format!("No help for {:?}", topic.unwrap_or_default()));
        } else {
            self.transcript.say("Commands:");
            for usage in usages {
                self.transcript.say(format!("  {usage}"));
            }
        }
        Ok(Outcome::Handled)
    }

    fn which(&self, text: &str) -> anyhow::Result<Outcome> {
        let routes = self.root()?.match_candidates(text);
        if routes.is_empty() {
            self.transcript.say(format!("No command matches {text:?}"));
        }
        for route in routes {
            self.transcript
                .say(format!("  [{}] {}", route.entry.score(), route.usage()));
        }
        Ok(Outcome::Handled)
    }
}

impl CommandBundle<Player> for CoreCommands {
    fn command_entries(self: Arc<Self>) -> herald::Result<Vec<CommandEntry<Player>>> {
        let help = Arc::clone(&self);
        let help_topic = Arc::clone(&self);
        let say = Arc::clone(&self);
        let msg = Arc::clone(&self);
        let color = Arc::clone(&self);
        let which = Arc::clone(&self);

        Ok(vec![
            CommandEntry::builder("help")
                .handler(move |_, _| help.help(None))
                .build()?,
            CommandEntry::builder("help")
                .param("topic", ParamKind::String)
                .handler(move |_, params| help_topic.help(Some(params.string(0)?)))
                .build()?,
            CommandEntry::builder("say")
                .param("message", ParamKind::String)
                .handler(move |actor: &Player, params| {
                    say.transcript
                        .say(format!("<{}> {}", actor.name, params.string(0)?));
                    Ok(Outcome::Handled)
                })
                .build()?,
            CommandEntry::builder("msg")
                .param("target", ParamKind::Actor)
                .param("text", ParamKind::String)
                .handler(move |actor: &Player, params| {
                    let target = params.actor(0)?;
                    msg.transcript.say(format!(
                        "[{} -> {}] {}",
                        actor.name,
                        target.name,
                        params.string(1)?
                    ));
                    Ok(Outcome::Handled)
                })
                .build()?,
            CommandEntry::builder("color")
                .param("rgba", ParamKind::Color)
                .handler(move |_, params| {
                    let c = params.color(0)?;
                    color.transcript.say(format!(
                        "#{c} r={} g={} b={} a={}",
                        c.r(),
                        c.g(),
                        c.b(),
                        c.a()
                    ));
                    Ok(Outcome::Handled)
                })
                .build()?,
            CommandEntry::builder("which")
                .param("command", ParamKind::String)
                .handler(move |_, params| which.which(params.string(0)?))
                .build()?,
        ])
    }
}

// ----------------------------------------------------------------------------
// Utility
// ----------------------------------------------------------------------------

struct UtilityCommands {
    transcript: Transcript,
}

impl CommandBundle<Player> for UtilityCommands {
    fn command_entries(self: Arc<Self>) -> herald::Result<Vec<CommandEntry<Player>>> {
        let ints = Arc::clone(&self);
        let floats = Arc::clone(&self);
        let upper = Arc::clone(&self);

        Ok(vec![
            // Integers first; overflow faults and falls back to floats.
            CommandEntry::builder("add")
                .param("a", ParamKind::I64)
                .param("b", ParamKind::I64)
                .priority(1)
                .handler(move |_, params| {
                    let sum = params
                        .int(0)?
                        .checked_add(params.int(1)?)
                        .ok_or_else(|| anyhow!("integer overflow"))?;
                    ints.transcript.say(sum.to_string());
                    Ok(Outcome::Handled)
                })
                .build()?,
            CommandEntry::builder("add")
                .param("a", ParamKind::F64)
                .param("b", ParamKind::F64)
                .handler(move |_, params| {
                    floats
                        .transcript
                        .say((params.float(0)? + params.float(1)?).to_string());
                    Ok(Outcome::Handled)
                })
                .build()?,
            CommandEntry::builder("upper")
                .param("text", ParamKind::String)
                .handler(move |_, params| {
                    upper.transcript.say(params.string(0)?.to_uppercase());
                    Ok(Outcome::Handled)
                })
                .build()?,
        ])
    }
}

// ----------------------------------------------------------------------------
// Admin
// ----------------------------------------------------------------------------

struct AdminCommands {
    transcript: Transcript,
    banned: Mutex<BTreeSet<String>>,
}

impl AdminCommands {
    fn kick(&self, actor: &Player, params: &Params<Player>) -> anyhow::Result<Outcome> {
        if !actor.admin {
            debug!(actor = %actor.name, "kick refused for non-admin");
            return Ok(Outcome::NotHandled);
        }
        let target = params.actor(0)?;
        let line = match params.string(1) {
            Ok(reason) => format!("* {} was kicked by {} ({reason})", target.name, actor.name),
            Err(_) => format!("* {} was kicked by {}", target.name, actor.name),
        };
        self.transcript.say(line);
        Ok(Outcome::Handled)
    }
}

impl CommandBundle<Player> for AdminCommands {
    fn command_entries(self: Arc<Self>) -> herald::Result<Vec<CommandEntry<Player>>> {
        let kick = Arc::clone(&self);
        let kick_reason = Arc::clone(&self);
        let ban = Arc::clone(&self);
        let bans = Arc::clone(&self);

        Ok(vec![
            CommandEntry::builder("kick")
                .param("target", ParamKind::Actor)
                .handler(move |actor, params| kick.kick(actor, params))
                .build()?,
            CommandEntry::builder("kick")
                .param("target", ParamKind::Actor)
                .param("reason", ParamKind::String)
                .priority(10)
                .handler(move |actor, params| kick_reason.kick(actor, params))
                .build()?,
            CommandEntry::builder("ban")
                .param("target", ParamKind::Actor)
                .param("reason", ParamKind::String)
                .handler(move |actor: &Player, params| {
                    if !actor.admin {
                        return Ok(Outcome::NotHandled);
                    }
                    let target = params.actor(0)?;
                    ban.banned.lock().insert(target.name.clone());
                    ban.transcript.say(format!(
                        "* {} was banned by {} ({})",
                        target.name,
                        actor.name,
                        params.string(1)?
                    ));
                    Ok(Outcome::Handled)
                })
                .build()?,
            CommandEntry::builder("bans")
                .handler(move |actor: &Player, _| {
                    if !actor.admin {
                        return Ok(Outcome::NotHandled);
                    }
                    let banned = bans.banned.lock();
                    if banned.is_empty() {
                        bans.transcript.say("No bans");
                    }
                    for name in banned.iter() {
                        bans.transcript.say(format!("  {name}"));
                    }
                    Ok(Outcome::Handled)
                })
                .build()?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActorConfig;

    fn setup() -> (Arc<CommandGroup<Player>>, Transcript, Arc<Roster>) {
        let roster = Arc::new(Roster::from_config(&[
            ActorConfig {
                id: 0,
                name: "Alice".into(),
                admin: true,
            },
            ActorConfig {
                id: 1,
                name: "Bob".into(),
                admin: false,
            },
        ]));
        let transcript = Transcript::default();
        let root = build_command_tree(Arc::clone(&roster), &transcript).unwrap();
        (root, transcript, roster)
    }

    fn actor(roster: &Roster, name: &str) -> Player {
        roster.find(name).cloned().unwrap()
    }

    #[test]
    fn test_say_and_msg() {
        let (root, transcript, roster) = setup();
        let alice = actor(&roster, "Alice");
        assert!(root.dispatch(&alice, "say hi all"));
        assert!(root.dispatch(&alice, "msg bob see  you"));
        assert!(!root.dispatch(&alice, "msg carol hello"));
        assert_eq!(
            transcript.drain(),
            vec!["<Alice> hi all", "[Alice -> Bob] see  you"]
        );
    }

    #[test]
    fn test_add_overloads() {
        let (root, transcript, roster) = setup();
        let bob = actor(&roster, "Bob");
        assert!(root.dispatch(&bob, "add 2 3"));
        assert!(root.dispatch(&bob, "add 2.5 0.5"));
        assert!(root.dispatch(&bob, "add 9223372036854775807 1"));
        assert!(!root.dispatch(&bob, "add two three"));
        let lines = transcript.drain();
        assert_eq!(lines[0], "5");
        assert_eq!(lines[1], "3");
        assert!(lines[2].starts_with("9223372036854776"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_admin_commands_require_admin() {
        let (root, transcript, roster) = setup();
        let alice = actor(&roster, "Alice");
        let bob = actor(&roster, "Bob");

        assert!(!root.dispatch(&bob, "admin kick Alice"));
        assert!(root.dispatch(&alice, "admin kick Bob"));
        assert!(root.dispatch(&alice, "admin kick 1 too loud"));
        assert!(root.dispatch(&alice, "admin ban Bob spam"));
        assert!(root.dispatch(&alice, "admin bans"));
        assert_eq!(
            transcript.drain(),
            vec![
                "* Bob was kicked by Alice",
                "* Bob was kicked by Alice (too loud)",
                "* Bob was banned by Alice (spam)",
                "  Bob",
            ]
        );
    }

    #[test]
    fn test_help_lists_nested_usage() {
        let (root, transcript, roster) = setup();
        let bob = actor(&roster, "Bob");
        assert!(root.dispatch(&bob, "help admin"));
        let lines = transcript.drain();
        assert_eq!(lines[0], "Commands:");
        assert!(lines.contains(&"  admin kick <target> <reason>".to_string()));
        assert!(lines.iter().skip(1).all(|l| l.starts_with("  admin ")));

        assert!(root.dispatch(&bob, "help"));
        let all = transcript.drain();
        assert!(all.contains(&"  add <a> <b>".to_string()));
        assert!(all.contains(&"  which <command>".to_string()));
    }

    #[test]
    fn test_which_reports_scores() {
        let (root, transcript, roster) = setup();
        let bob = actor(&roster, "Bob");
        assert!(root.dispatch(&bob, "which admin kick Bob"));
        assert_eq!(
            transcript.drain(),
            vec![
                "  [10002] admin kick <target> <reason>",
                "  [1] admin kick <target>",
            ]
        );
    }

    #[test]
    fn test_color() {
        let (root, transcript, roster) = setup();
        let bob = actor(&roster, "Bob");
        assert!(root.dispatch(&bob, "color FF000080"));
        assert!(!root.dispatch(&bob, "color red"));
        assert_eq!(transcript.drain(), vec!["#FF000080 r=255 g=0 b=0 a=128"]);
    }
}
