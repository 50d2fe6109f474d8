//! Parameter kinds and the string coercion registry
//!
//! Every command parameter is declared with a [`ParamKind`]. During dispatch
//! each token is converted through the [`CoercionRegistry`] of the group doing
//! the dispatch; a failed conversion only disqualifies the candidate being
//! tried.
//!
//! The set of kinds is closed, with [`ParamKind::Custom`] as the extension
//! point for application-specific parsers.

use crate::error::{CommandError, Result};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Bounds every actor handle must satisfy.
///
/// The actor is opaque to the dispatcher: it is cloned into coerced
/// parameters and handed to handlers, nothing else.
pub trait Actor: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> Actor for T {}

/// Resolves an actor reference typed by a user (name or numeric id).
///
/// Implemented by the host; the registry only calls it.
pub trait ActorDirectory<A>: Send + Sync {
    /// Resolve `token` to a live actor.
    fn resolve(&self, token: &str) -> Option<A>;
}

/// Semantic type of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKind {
    /// 8-bit signed integer
    I8,
    /// 16-bit signed integer
    I16,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// First character of the token
    Char,
    /// The token verbatim
    String,
    /// Actor looked up by name or id
    Actor,
    /// Hexadecimal RGBA color
    Color,
    /// Application-defined kind, keyed by name
    Custom(&'static str),
}

impl ParamKind {
    /// Short lowercase label used in usage strings and errors.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::String => "string",
            Self::Actor => "actor",
            Self::Color => "color",
            Self::Custom(name) => *name,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 32-bit RGBA color, red in the most significant byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(u32);

impl Color {
    /// Create a color from a packed RGBA value.
    #[must_use]
    pub const fn from_rgba(value: u32) -> Self {
        Self(value)
    }

    /// Create a color from its components.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | a as u32)
    }

    /// Packed RGBA value.
    #[must_use]
    pub const fn rgba(&self) -> u32 {
        self.0
    }

    /// Red component.
    #[must_use]
    pub const fn r(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Green component.
    #[must_use]
    pub const fn g(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Blue component.
    #[must_use]
    pub const fn b(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Alpha component.
    #[must_use]
    pub const fn a(&self) -> u8 {
        self.0 as u8
    }
}

impl FromStr for Color {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        u32::from_str_radix(s, 16).map(Self)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// A coerced parameter value.
#[derive(Clone)]
pub enum ParamValue<A> {
    /// [`ParamKind::I8`]
    I8(i8),
    /// [`ParamKind::I16`]
    I16(i16),
    /// [`ParamKind::I32`]
    I32(i32),
    /// [`ParamKind::I64`]
    I64(i64),
    /// [`ParamKind::F32`]
    F32(f32),
    /// [`ParamKind::F64`]
    F64(f64),
    /// [`ParamKind::Char`]
    Char(char),
    /// [`ParamKind::String`]
    String(String),
    /// [`ParamKind::Actor`]
    Actor(A),
    /// [`ParamKind::Color`]
    Color(Color),
    /// [`ParamKind::Custom`]
    Custom(Arc<dyn Any + Send + Sync>),
}

impl<A> ParamValue<A> {
    /// Wrap an application value for a custom kind.
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Self::Custom(Arc::new(value))
    }
}

impl<A: fmt::Debug> fmt::Debug for ParamValue<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I8(v) => f.debug_tuple("I8").field(v).finish(),
            Self::I16(v) => f.debug_tuple("I16").field(v).finish(),
            Self::I32(v) => f.debug_tuple("I32").field(v).finish(),
            Self::I64(v) => f.debug_tuple("I64").field(v).finish(),
            Self::F32(v) => f.debug_tuple("F32").field(v).finish(),
            Self::F64(v) => f.debug_tuple("F64").field(v).finish(),
            Self::Char(v) => f.debug_tuple("Char").field(v).finish(),
            Self::String(v) => f.debug_tuple("String").field(v).finish(),
            Self::Actor(v) => f.debug_tuple("Actor").field(v).finish(),
            Self::Color(v) => f.debug_tuple("Color").field(v).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Conversion function from a token to a value.
pub type Parser<A> = Arc<dyn Fn(&str) -> Result<ParamValue<A>> + Send + Sync>;

/// Maps each [`ParamKind`] to its string parser.
///
/// Shared between groups through `Arc`; parsers can be added at any time.
pub struct CoercionRegistry<A> {
    parsers: RwLock<HashMap<ParamKind, Parser<A>>>,
}

impl<A: Actor> CoercionRegistry<A> {
    /// Create a registry with no parsers at all.
    pub fn new() -> Self {
        Self {
            parsers: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with every built-in kind except [`ParamKind::Actor`],
    /// which needs a directory (see [`Self::with_actor_directory`]).
    pub fn standard() -> Self {
        let registry = Self::new();
        registry.register(ParamKind::String, |s| Ok(ParamValue::String(s.to_string())));
        registry.register(ParamKind::I8, |s| {
            parse_number(ParamKind::I8, s, s).map(ParamValue::I8)
        });
        registry.register(ParamKind::I16, |s| {
            parse_number(ParamKind::I16, s, s).map(ParamValue::I16)
        });
        registry.register(ParamKind::I32, |s| {
            parse_number(ParamKind::I32, s, s).map(ParamValue::I32)
        });
        registry.register(ParamKind::I64, |s| {
            parse_number(ParamKind::I64, s, s).map(ParamValue::I64)
        });
        // Floats tolerate surrounding whitespace, integers do not.
        registry.register(ParamKind::F32, |s| {
            parse_number(ParamKind::F32, s, s.trim()).map(ParamValue::F32)
        });
        registry.register(ParamKind::F64, |s| {
            parse_number(ParamKind::F64, s, s.trim()).map(ParamValue::F64)
        });
        registry.register(ParamKind::Char, |s| {
            s.chars()
                .next()
                .map(ParamValue::Char)
                .ok_or_else(|| CommandError::invalid_token(ParamKind::Char, s, "empty token"))
        });
        registry.register(ParamKind::Color, |s| {
            parse_number(ParamKind::Color, s, s).map(ParamValue::Color)
        });
        registry
    }

    /// Add the [`ParamKind::Actor`] parser backed by `directory`.
    pub fn with_actor_directory(self, directory: Arc<dyn ActorDirectory<A>>) -> Self {
        self.set_actor_directory(directory);
        self
    }

    /// Install or replace the [`ParamKind::Actor`] parser.
    pub fn set_actor_directory(&self, directory: Arc<dyn ActorDirectory<A>>) {
        self.register(ParamKind::Actor, move |s| {
            directory
                .resolve(s)
                .map(ParamValue::Actor)
                .ok_or_else(|| CommandError::ActorNotFound(s.to_string()))
        });
    }

    /// Register `parser` for `kind`, replacing any previous parser.
    pub fn register<F>(&self, kind: ParamKind, parser: F)
    where
        F: Fn(&str) -> Result<ParamValue<A>> + Send + Sync + 'static,
    {
        self.parsers.write().insert(kind, Arc::new(parser));
    }

    /// Whether a parser exists for `kind`.
    #[must_use]
    pub fn contains(&self, kind: ParamKind) -> bool {
        self.parsers.read().contains_key(&kind)
    }

    /// Convert `token` into a value of `kind`.
    pub fn parse(&self, kind: ParamKind, token: &str) -> Result<ParamValue<A>> {
        // The lock is released before the parser runs so parsers may consult
        // the registry themselves.
        let parser = self
            .parsers
            .read()
            .get(&kind)
            .cloned()
            .ok_or(CommandError::UnknownKind(kind))?;
        parser(token)
    }

    /// Convert each token against the kind at the same position.
    ///
    /// Stops at the first failure. `kinds` and `tokens` must have equal
    /// length; extra items on either side are ignored.
    pub fn parse_all(&self, kinds: &[ParamKind], tokens: &[&str]) -> Result<Vec<ParamValue<A>>> {
        kinds
            .iter()
            .zip(tokens)
            .map(|(kind, token)| self.parse(*kind, token))
            .collect()
    }
}

impl<A: Actor> Default for CoercionRegistry<A> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<A> fmt::Debug for CoercionRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<ParamKind> = self.parsers.read().keys().copied().collect();
        kinds.sort();
        f.debug_struct("CoercionRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

fn parse_number<T>(kind: ParamKind, token: &str, text: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    text.parse()
        .map_err(|e| CommandError::invalid_token(kind, token, e))
}
