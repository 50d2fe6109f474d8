//! Herald - Overload-Resolving Command Dispatch
//!
//! Routes a raw command line typed by an actor to the best matching handler
//! in a tree of composable command groups.
//!
//! - [`CoercionRegistry`]: converts parameter tokens to typed [`ParamValue`]s
//! - [`CommandEntry`]: one overload with its parameter kinds, priority and
//!   handler
//! - [`CommandGroup`]: local overloads, merged peer groups and path-keyed
//!   child groups; dispatch, enumeration and match lookup
//! - [`CommandBundle`]: declarative registration of several entries at once
//!
//! # Example
//!
//! ```
//! use herald::{CoercionRegistry, CommandEntry, CommandGroup, Outcome, ParamKind};
//! use std::sync::Arc;
//!
//! let root: Arc<CommandGroup<String>> = CommandGroup::new(Arc::new(CoercionRegistry::standard()));
//! root.register_command(
//!     CommandEntry::builder("say")
//!         .param("message", ParamKind::String)
//!         .handler(|actor: &String, params| {
//!             println!("<{actor}> {}", params.string(0)?);
//!             Ok(Outcome::Handled)
//!         })
//!         .build()?,
//! )?;
//!
//! assert!(root.dispatch(&"alice".to_string(), "say hello there"));
//! assert!(!root.dispatch(&"alice".to_string(), "shout hello"));
//! # Ok::<(), herald::CommandError>(())
//! ```

pub mod bundle;
pub mod coercion;
pub mod entry;
pub mod error;
pub mod group;
pub mod tokenize;

pub use bundle::CommandBundle;
pub use coercion::{Actor, ActorDirectory, CoercionRegistry, Color, ParamKind, ParamValue, Parser};
pub use entry::{
    CommandEntry, CommandEntryBuilder, CommandRoute, Handler, HandlerResult, Outcome, Params,
    PRIORITY_WEIGHT,
};
pub use error::{CommandError, Result};
pub use group::CommandGroup;
