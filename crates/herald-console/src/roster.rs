//! In-memory actor roster
//!
//! Backs the `actor` parameter kind: tokens resolve by numeric id first, then
//! by case-insensitive name.

use crate::config::ActorConfig;
use herald::ActorDirectory;

/// An actor the console knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Numeric id
    pub id: u32,
    /// Display name
    pub name: String,
    /// Whether admin commands accept this actor
    pub admin: bool,
}

/// Actors loaded from configuration.
#[derive(Debug, Default)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    /// Build a roster from configured actors.
    pub fn from_config(actors: &[ActorConfig]) -> Self {
        Self {
            players: actors
                .iter()
                .map(|a| Player {
                    id: a.id,
                    name: a.name.clone(),
                    admin: a.admin,
                })
                .collect(),
        }
    }

    /// All players, in configuration order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Look up a player by id or name.
    pub fn find(&self, token: &str) -> Option<&Player> {
        if let Ok(id) = token.parse::<u32>() {
            if let Some(player) = self.players.iter().find(|p| p.id == id) {
                return Some(player);
            }
        }
        self.players
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(token))
    }
}

impl ActorDirectory<Player> for Roster {
    fn resolve(&self, token: &str) -> Option<Player> {
        self.find(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster::from_config(&[
            ActorConfig {
                id: 7,
                name: "Alice".into(),
                admin: true,
            },
            ActorConfig {
                id: 8,
                name: "Bob".into(),
                admin: false,
            },
            ActorConfig {
                id: 9,
                name: "7".into(),
                admin: false,
            },
        ])
    }

    #[test]
    fn test_resolve_by_id_then_name() {
        let roster = roster();
        assert_eq!(roster.resolve("8").map(|p| p.name), Some("Bob".into()));
        assert_eq!(roster.resolve("alice").map(|p| p.id), Some(7));
        // Ids win over names that look like ids.
        assert_eq!(roster.resolve("7").map(|p| p.name), Some("Alice".into()));
        assert!(roster.resolve("Carol").is_none());
        assert!(roster.resolve("42").is_none());
    }
}
