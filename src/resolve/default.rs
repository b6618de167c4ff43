//! Non-interactive resolver: every miss resolves to a deterministic entity

use super::context::ResolveContext;
use super::{Outcome, ResolutionRequest, ResolveError, Resolver};
use crate::core::config::DefaultNames;
use crate::core::entity::{
    abbreviate, Attributes, DatafileAttributes, NewEntity, PlatformAttributes, ResolvedEntity,
    SensorAttributes,
};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::name::NameKey;

/// Resolves unknown names without asking anyone
///
/// A named request resolves to an entity of that name, found by a unique
/// case-insensitive match or created. A nameless request resolves to the
/// configured default name for its kind. Dependencies come from the
/// request's hints, falling back to the defaults.
#[derive(Debug, Clone, Default)]
pub struct DefaultResolver {
    defaults: DefaultNames,
}

impl DefaultResolver {
    pub fn new(defaults: DefaultNames) -> Self {
        Self { defaults }
    }

    fn run(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError> {
        let kind = request.kind;
        let key = match request.key() {
            Some(key) => key,
            None => NameKey::new(self.defaults.name(kind))
                .ok_or(ResolveError::BlankName { kind })?,
        };

        if let Some(found) = cx.find_folded(kind, &key)? {
            return Ok(Outcome::Resolved(found));
        }

        let attributes = match kind {
            EntityKind::Platform => Attributes::Platform(PlatformAttributes {
                trigraph: Some(
                    request
                        .hints
                        .trigraph
                        .clone()
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| abbreviate(key.as_str(), 3)),
                ),
                quadgraph: Some(
                    request
                        .hints
                        .quadgraph
                        .clone()
                        .filter(|q| !q.trim().is_empty())
                        .unwrap_or_else(|| abbreviate(key.as_str(), 4)),
                ),
                pennant_number: request
                    .hints
                    .pennant_number
                    .clone()
                    .filter(|p| !p.trim().is_empty()),
                nationality: self.dependency(cx, request, EntityKind::Nationality)?,
                platform_type: self.dependency(cx, request, EntityKind::PlatformType)?,
                privacy: self.dependency(cx, request, EntityKind::Privacy)?,
            }),
            EntityKind::Sensor => Attributes::Sensor(SensorAttributes {
                sensor_type: self.dependency(cx, request, EntityKind::SensorType)?,
                privacy: self.dependency(cx, request, EntityKind::Privacy)?,
                host: self.host(cx, request)?.map(|h| h.id),
            }),
            EntityKind::Datafile => Attributes::Datafile(DatafileAttributes {
                datafile_type: self.dependency(cx, request, EntityKind::DatafileType)?,
                privacy: self.dependency(cx, request, EntityKind::Privacy)?,
            }),
            _ => Attributes::Reference,
        };

        let entity = cx.create(NewEntity {
            kind,
            name: key.to_string(),
            attributes,
        })?;
        Ok(Outcome::Resolved(entity))
    }

    /// Hinted name if there is one, otherwise the default for the kind
    fn dependency(
        &self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
        kind: EntityKind,
    ) -> Result<EntityId, ResolveError> {
        let name = request
            .hints
            .dependency(kind)
            .unwrap_or_else(|| self.defaults.name(kind));
        Ok(cx.get_or_create(kind, name)?.id)
    }

    /// A sensor's host platform, only when the parser named one
    fn host(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Option<ResolvedEntity>, ResolveError> {
        let Some(host) = request.hints.dependency(EntityKind::Platform) else {
            return Ok(None);
        };
        let host = ResolutionRequest::named(EntityKind::Platform, host);
        match cx.resolve_dependency(self, &host)? {
            Outcome::Resolved(entity) => Ok(Some(entity)),
            Outcome::Abandoned => Ok(None),
        }
    }
}

impl Resolver for DefaultResolver {
    fn resolve_platform(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError> {
        self.run(cx, request)
    }

    fn resolve_sensor(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError> {
        self.run(cx, request)
    }

    fn resolve_datafile(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError> {
        self.run(cx, request)
    }

    fn resolve_privacy(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError> {
        self.run(cx, request)
    }

    fn resolve_nationality(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError> {
        self.run(cx, request)
    }

    fn resolve_platform_type(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError> {
        self.run(cx, request)
    }

    fn resolve_sensor_type(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError> {
        self.run(cx, request)
    }

    fn resolve_datafile_type(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError> {
        self.run(cx, request)
    }
}
