//! Command entries, handler outcomes and coerced parameters
//!
//! A [`CommandEntry`] is one overload: a name, an ordered parameter list, a
//! priority and the handler to call. Entries are immutable once built and
//! are shared as `Arc` between the owning group and in-flight dispatches.

use crate::coercion::{Actor, Color, ParamKind, ParamValue};
use crate::error::{CommandError, Result};
use crate::tokenize::{join_path, DELIMITER};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Multiplier applied to priority when scoring candidates.
///
/// Large enough that priority always dominates arity.
pub const PRIORITY_WEIGHT: i64 = 1000;

/// What a handler did with the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The command was consumed; dispatch stops.
    Handled,
    /// The handler declined; dispatch tries the next candidate.
    NotHandled,
}

impl Outcome {
    /// Whether dispatch should stop.
    #[must_use]
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled)
    }
}

impl From<bool> for Outcome {
    fn from(handled: bool) -> Self {
        if handled {
            Self::Handled
        } else {
            Self::NotHandled
        }
    }
}

/// Result of a handler call. `Err` is a fault: it is logged and treated as
/// [`Outcome::NotHandled`].
pub type HandlerResult = anyhow::Result<Outcome>;

/// Handler callable: `(actor, params)`.
pub type Handler<A> = Arc<dyn Fn(&A, &Params<A>) -> HandlerResult + Send + Sync>;

/// One registered command overload.
pub struct CommandEntry<A> {
    name: String,
    param_kinds: Vec<ParamKind>,
    param_names: Vec<String>,
    priority: i32,
    handler: Handler<A>,
}

impl<A: Actor> CommandEntry<A> {
    /// Start building an entry named `name`.
    pub fn builder(name: impl Into<String>) -> CommandEntryBuilder<A> {
        CommandEntryBuilder {
            name: name.into(),
            param_kinds: Vec::new(),
            param_names: Vec::new(),
            priority: 0,
            handler: None,
        }
    }

    /// Create an entry from parallel kind and name lists.
    pub fn new<F>(
        name: impl Into<String>,
        param_kinds: Vec<ParamKind>,
        param_names: Vec<String>,
        priority: i32,
        handler: F,
    ) -> Result<Self>
    where
        F: Fn(&A, &Params<A>) -> HandlerResult + Send + Sync + 'static,
    {
        let name = name.into();
        validate_name(&name)?;
        if param_kinds.len() != param_names.len() {
            return Err(CommandError::ParamNameCount {
                command: name,
                kinds: param_kinds.len(),
                names: param_names.len(),
            });
        }
        Ok(Self {
            name,
            param_kinds,
            param_names,
            priority,
            handler: Arc::new(handler),
        })
    }

    /// Command name matched against the first input token.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter kinds, actor excluded.
    #[must_use]
    pub fn param_kinds(&self) -> &[ParamKind] {
        &self.param_kinds
    }

    /// Parameter names, for help text only.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Priority; higher is tried first.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Number of parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.param_kinds.len()
    }

    /// Sort key: `priority * PRIORITY_WEIGHT + arity`.
    #[must_use]
    pub fn score(&self) -> i64 {
        i64::from(self.priority) * PRIORITY_WEIGHT + self.arity() as i64
    }

    /// Call the handler, turning a panic into a fault.
    pub fn invoke(&self, actor: &A, params: &Params<A>) -> HandlerResult {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.handler)(actor, params))) {
            Ok(result) => result,
            Err(payload) => Err(anyhow::anyhow!(
                "handler panicked: {}",
                panic_message(payload.as_ref())
            )),
        }
    }
}

impl<A> fmt::Debug for CommandEntry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("name", &self.name)
            .field("param_kinds", &self.param_kinds)
            .field("param_names", &self.param_names)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CommandEntry`].
pub struct CommandEntryBuilder<A> {
    name: String,
    param_kinds: Vec<ParamKind>,
    param_names: Vec<String>,
    priority: i32,
    handler: Option<Handler<A>>,
}

impl<A: Actor> CommandEntryBuilder<A> {
    /// Append a parameter.
    pub fn param(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.param_names.push(name.into());
        self.param_kinds.push(kind);
        self
    }

    /// Set the priority (default 0).
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the handler.
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&A, &Params<A>) -> HandlerResult + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Finish the entry.
    pub fn build(self) -> Result<CommandEntry<A>> {
        validate_name(&self.name)?;
        let handler = self.handler.ok_or_else(|| CommandError::MissingHandler {
            command: self.name.clone(),
        })?;
        Ok(CommandEntry {
            name: self.name,
            param_kinds: self.param_kinds,
            param_names: self.param_names,
            priority: self.priority,
            handler,
        })
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(DELIMITER) {
        return Err(CommandError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Coerced parameters handed to a handler, in declaration order.
#[derive(Debug, Clone)]
pub struct Params<A> {
    values: Vec<ParamValue<A>>,
}

impl<A: Actor> Params<A> {
    /// Wrap coerced values.
    pub fn new(values: Vec<ParamValue<A>>) -> Self {
        Self { values }
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ParamValue<A>> {
        self.values.get(index)
    }

    /// Iterate over raw values.
    pub fn iter(&self) -> impl Iterator<Item = &ParamValue<A>> {
        self.values.iter()
    }

    /// String parameter.
    pub fn string(&self, index: usize) -> Result<&str> {
        match self.get(index) {
            Some(ParamValue::String(s)) => Ok(s),
            _ => Err(CommandError::param_mismatch(index, "a string")),
        }
    }

    /// Any integer parameter, widened to `i64`.
    pub fn int(&self, index: usize) -> Result<i64> {
        match self.get(index) {
            Some(ParamValue::I8(v)) => Ok(i64::from(*v)),
            Some(ParamValue::I16(v)) => Ok(i64::from(*v)),
            Some(ParamValue::I32(v)) => Ok(i64::from(*v)),
            Some(ParamValue::I64(v)) => Ok(*v),
            _ => Err(CommandError::param_mismatch(index, "an integer")),
        }
    }

    /// Any float parameter, widened to `f64`.
    pub fn float(&self, index: usize) -> Result<f64> {
        match self.get(index) {
            Some(ParamValue::F32(v)) => Ok(f64::from(*v)),
            Some(ParamValue::F64(v)) => Ok(*v),
            _ => Err(CommandError::param_mismatch(index, "a float")),
        }
    }

    /// Character parameter.
    pub fn char(&self, index: usize) -> Result<char> {
        match self.get(index) {
            Some(ParamValue::Char(c)) => Ok(*c),
            _ => Err(CommandError::param_mismatch(index, "a char")),
        }
    }

    /// Actor parameter.
    pub fn actor(&self, index: usize) -> Result<&A> {
        match self.get(index) {
            Some(ParamValue::Actor(a)) => Ok(a),
            _ => Err(CommandError::param_mismatch(index, "an actor")),
        }
    }

    /// Color parameter.
    pub fn color(&self, index: usize) -> Result<Color> {
        match self.get(index) {
            Some(ParamValue::Color(c)) => Ok(*c),
            _ => Err(CommandError::param_mismatch(index, "a color")),
        }
    }

    /// Custom parameter downcast to `T`.
    pub fn custom<T: Any>(&self, index: usize) -> Result<&T> {
        match self.get(index) {
            Some(ParamValue::Custom(v)) => v
                .downcast_ref::<T>()
                .ok_or_else(|| CommandError::param_mismatch(index, std::any::type_name::<T>())),
            _ => Err(CommandError::param_mismatch(index, "a custom value")),
        }
    }
}

/// An entry together with the path it is reached at.
///
/// Returned by enumeration and match lookup; the path is empty for the
/// root group.
#[derive(Debug)]
pub struct CommandRoute<A> {
    /// Space-separated child segments leading to the entry
    pub path: String,
    /// The entry itself
    pub entry: Arc<CommandEntry<A>>,
}

impl<A> Clone for CommandRoute<A> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            entry: Arc::clone(&self.entry),
        }
    }
}

impl<A: Actor> CommandRoute<A> {
    /// Create a route.
    pub fn new(path: impl Into<String>, entry: Arc<CommandEntry<A>>) -> Self {
        Self {
            path: path.into(),
            entry,
        }
    }

    /// Path and command name, e.g. `admin kick`.
    #[must_use]
    pub fn full_name(&self) -> String {
        join_path(&self.path, self.entry.name())
    }

    /// Usage line, e.g. `admin kick <target> <reason>`.
    #[must_use]
    pub fn usage(&self) -> String {
        self.entry
            .param_names()
            .iter()
            .fold(self.full_name(), |mut usage, name| {
                usage.push_str(" <");
                usage.push_str(name);
                usage.push('>');
                usage
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &u32, _: &Params<u32>) -> HandlerResult {
        Ok(Outcome::Handled)
    }

    #[test]
    fn test_builder_and_score() {
        let entry = CommandEntry::<u32>::builder("kick")
            .param("target", ParamKind::Actor)
            .param("reason", ParamKind::String)
            .priority(10)
            .handler(noop)
            .build()
            .unwrap();
        assert_eq!(entry.name(), "kick");
        assert_eq!(entry.arity(), 2);
        assert_eq!(entry.score(), 10_002);

        let low = CommandEntry::<u32>::builder("kick")
            .priority(-1)
            .handler(noop)
            .build()
            .unwrap();
        assert_eq!(low.score(), -1000);
    }

    #[test]
    fn test_priority_dominates_arity() {
        let many = CommandEntry::<u32>::new(
            "x",
            vec![ParamKind::String; 9],
            (0..9).map(|i| format!("p{i}")).collect(),
            0,
            noop,
        )
        .unwrap();
        let prioritized = CommandEntry::<u32>::builder("x")
            .priority(1)
            .handler(noop)
            .build()
            .unwrap();
        assert!(prioritized.score() > many.score());
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            CommandEntry::<u32>::builder("").handler(noop).build(),
            Err(CommandError::InvalidName { .. })
        ));
        assert!(matches!(
            CommandEntry::<u32>::builder("two words").handler(noop).build(),
            Err(CommandError::InvalidName { .. })
        ));
        assert!(matches!(
            CommandEntry::<u32>::builder("help").build(),
            Err(CommandError::MissingHandler { .. })
        ));
        assert!(matches!(
            CommandEntry::<u32>::new("help", vec![ParamKind::I32], vec![], 0, noop),
            Err(CommandError::ParamNameCount { kinds: 1, names: 0, .. })
        ));
    }

    #[test]
    fn test_invoke_catches_panic() {
        let entry = CommandEntry::<u32>::builder("boom")
            .handler(|_, _| panic!("exploded"))
            .build()
            .unwrap();
        let err = entry.invoke(&1, &Params::new(vec![])).unwrap_err();
        assert!(err.to_string().contains("exploded"));
    }

    #[test]
    fn test_params_accessors() {
        let params: Params<u32> = Params::new(vec![
            ParamValue::Actor(7),
            ParamValue::I16(-3),
            ParamValue::F32(1.5),
            ParamValue::String("hi there".to_string()),
            ParamValue::Color(Color::from_rgba(0xFF0000FF)),
            ParamValue::custom(42u8),
        ]);
        assert_eq!(params.len(), 6);
        assert_eq!(params.actor(0).unwrap(), &7);
        assert_eq!(params.int(1).unwrap(), -3);
        assert!((params.float(2).unwrap() - 1.5).abs() < f64::EPSILON);
        assert_eq!(params.string(3).unwrap(), "hi there");
        assert_eq!(params.color(4).unwrap().r(), 0xFF);
        assert_eq!(params.custom::<u8>(5).unwrap(), &42);

        assert!(params.string(0).is_err());
        assert!(params.custom::<u16>(5).is_err());
        assert!(params.int(9).is_err());
    }

    #[test]
    fn test_route_usage() {
        let entry = CommandEntry::<u32>::builder("ban")
            .param("target", ParamKind::Actor)
            .param("reason", ParamKind::String)
            .handler(noop)
            .build()
            .unwrap();
        let route = CommandRoute::new("admin", Arc::new(entry));
        assert_eq!(route.full_name(), "admin ban");
        assert_eq!(route.usage(), "admin ban <target> <reason>");

        let root = CommandRoute::new("", Arc::clone(&route.entry));
        assert_eq!(root.usage(), "ban <target> <reason>");
    }

    #[test]
    fn test_outcome_from_bool() {
        assert_eq!(Outcome::from(true), Outcome::Handled);
        assert!(!Outcome::from(false).is_handled());
    }
}
