//! Entity resolution: mapping raw names from data files to canonical entities
//!
//! A [`Resolver`] is the policy applied when a name is not already known.
//! [`ResolveContext`] wraps every call: it consults the session cache, then
//! the store (exact name, then synonym), and only on a miss hands the request
//! to the resolver. Creation always goes through the context so that every
//! path searches before it inserts and survives a concurrent writer.

pub mod cache;
pub mod context;
pub mod default;
pub mod flow;
pub mod fuzzy;
pub mod interactive;
pub mod prompt;
pub mod session;

pub use cache::{CacheStats, ResolutionCache};
pub use context::ResolveContext;
pub use default::DefaultResolver;
pub use fuzzy::{FuzzyMatcher, MatchTier, Suggestion, Suggestions};
pub use interactive::InteractiveResolver;
pub use prompt::{Choice, Prompt, PromptError, Scripted, ScriptedPrompt, TerminalPrompt, Typed};
pub use session::{ImportSession, UnitScope};

use miette::Diagnostic;
use thiserror::Error;

use crate::core::config::{Config, ResolverKind};
use crate::core::entity::{Hints, ResolvedEntity};
use crate::core::identity::EntityKind;
use crate::core::name::NameKey;
use crate::core::store::StoreError;

/// Result of a resolver's policy path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Resolved(ResolvedEntity),
    /// The operator backed out of the outermost menu for this request
    Abandoned,
}

/// A raw name plus whatever the file parser could tell us about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub kind: EntityKind,
    /// Raw name as it appeared in the file; `None` when the file had none
    pub name: Option<String>,
    pub hints: Hints,
}

impl ResolutionRequest {
    pub fn new(kind: EntityKind, name: Option<&str>, hints: Hints) -> Self {
        Self {
            kind,
            name: name.map(str::to_string),
            hints,
        }
    }

    pub fn named(kind: EntityKind, name: &str) -> Self {
        Self::new(kind, Some(name), Hints::default())
    }

    /// A request with no name, as when a dependency must be chosen from scratch
    pub fn nameless(kind: EntityKind) -> Self {
        Self::new(kind, None, Hints::default())
    }

    /// Normalized name, or `None` for missing and blank names
    pub fn key(&self) -> Option<NameKey> {
        self.name.as_deref().and_then(NameKey::new)
    }
}

/// Errors raised while resolving names
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error("resolution of {kind} abandoned by operator")]
    #[diagnostic(
        code(tir::resolve::aborted),
        help("everything imported from the current file has been rolled back")
    )]
    AbortedByOperator { kind: EntityKind },

    #[error("'{name}' matches several {kind} entities ignoring case: {}", .matches.join(", "))]
    #[diagnostic(
        code(tir::resolve::ambiguous),
        help("use the exact canonical name, or record a synonym with `tir synonym add`")
    )]
    AmbiguousName {
        kind: EntityKind,
        name: String,
        matches: Vec<String>,
    },

    #[error("could not create {kind} '{name}': the name was taken again after a retry")]
    #[diagnostic(code(tir::resolve::constraint_violation))]
    ConstraintViolation { kind: EntityKind, name: String },

    #[error("cannot record '{alias}' as a {kind} synonym: {reason}")]
    #[diagnostic(code(tir::resolve::invalid_synonym))]
    InvalidSynonym {
        kind: EntityKind,
        alias: String,
        reason: String,
    },

    #[error("a {kind} name cannot be blank")]
    #[diagnostic(
        code(tir::resolve::blank_name),
        help("leave the name out to resolve it interactively or by default")
    )]
    BlankName { kind: EntityKind },

    #[error("no {kind} named '{name}'")]
    #[diagnostic(code(tir::resolve::unknown_entity))]
    UnknownEntity { kind: EntityKind, name: String },

    #[error(transparent)]
    #[diagnostic(code(tir::store))]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(code(tir::prompt))]
    Prompt(#[from] PromptError),
}

/// Resolution policy for names the cache and store do not already know
///
/// Implementations are invoked by [`ResolveContext`] on a miss; they create
/// entities through the context, never through the store directly.
pub trait Resolver {
    fn resolve_platform(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError>;

    fn resolve_sensor(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError>;

    fn resolve_datafile(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError>;

    fn resolve_privacy(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError>;

    fn resolve_nationality(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError>;

    fn resolve_platform_type(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError>;

    fn resolve_sensor_type(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError>;

    fn resolve_datafile_type(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError>;

    /// Route a request to the operation for its kind
    fn dispatch(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError> {
        match request.kind {
            EntityKind::Platform => self.resolve_platform(cx, request),
            EntityKind::Sensor => self.resolve_sensor(cx, request),
            EntityKind::Datafile => self.resolve_datafile(cx, request),
            EntityKind::Privacy => self.resolve_privacy(cx, request),
            EntityKind::Nationality => self.resolve_nationality(cx, request),
            EntityKind::PlatformType => self.resolve_platform_type(cx, request),
            EntityKind::SensorType => self.resolve_sensor_type(cx, request),
            EntityKind::DatafileType => self.resolve_datafile_type(cx, request),
        }
    }
}

/// Build the resolver a configuration selects
pub fn resolver_for(config: &Config) -> Box<dyn Resolver> {
    match config.resolver() {
        ResolverKind::Interactive => Box::new(InteractiveResolver::new(TerminalPrompt::new())),
        ResolverKind::Default => Box::new(DefaultResolver::new(config.defaults.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_key_normalizes() {
        let request = ResolutionRequest::named(EntityKind::Sensor, "  GPS   1 ");
        assert_eq!(request.key().unwrap().as_str(), "GPS 1");
        assert!(ResolutionRequest::named(EntityKind::Sensor, " ").key().is_none());
        assert!(ResolutionRequest::nameless(EntityKind::Sensor).key().is_none());
    }

    #[test]
    fn test_ambiguous_name_lists_matches() {
        let err = ResolveError::AmbiguousName {
            kind: EntityKind::Nationality,
            name: "uk".to_string(),
            matches: vec!["UK".to_string(), "Uk".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "'uk' matches several nationality entities ignoring case: UK, Uk"
        );
    }
}
