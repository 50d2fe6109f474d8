//! Declarative command bundles
//!
//! A bundle is an object that owns some state and declares the commands
//! operating on it. Registration asks the bundle for its entries once; each
//! handler captures the `Arc` it is given to reach the bundle afterwards.
//!
//! ```ignore
//! struct Moderation { bans: Mutex<Vec<String>> }
//!
//! impl CommandBundle<Player> for Moderation {
//!     fn command_entries(self: Arc<Self>) -> herald::Result<Vec<CommandEntry<Player>>> {
//!         let this = Arc::clone(&self);
//!         Ok(vec![CommandEntry::builder("ban")
//!             .param("target", ParamKind::Actor)
//!             .handler(move |_, params| {
//!                 this.bans.lock().push(params.actor(0)?.name.clone());
//!                 Ok(Outcome::Handled)
//!             })
//!             .build()?])
//!     }
//! }
//! ```

use crate::coercion::Actor;
use crate::entry::CommandEntry;
use crate::error::Result;
use std::sync::Arc;

/// An object that declares a set of commands.
///
/// The actor is always the handler's first argument and is not part of an
/// entry's parameter list.
pub trait CommandBundle<A: Actor>: Send + Sync + 'static {
    /// Build the entries this bundle provides.
    fn command_entries(self: Arc<Self>) -> Result<Vec<CommandEntry<A>>>;
}
