//! Menu-driven resolver: the operator searches, confirms or creates

use tracing::debug;

use super::context::ResolveContext;
use super::flow::{self, Answer, Draft, Seed, State, REVIEW_OPTIONS};
use super::fuzzy::FuzzyMatcher;
use super::prompt::{Choice, Prompt, Typed};
use super::{Outcome, ResolutionRequest, ResolveError, Resolver};
use crate::core::entity::{abbreviate, Attributes, ResolvedEntity};
use crate::core::identity::EntityKind;

pub struct InteractiveResolver<P: Prompt> {
    prompt: P,
}

impl<P: Prompt> InteractiveResolver<P> {
    pub fn new(prompt: P) -> Self {
        Self { prompt }
    }

    fn run(
        &mut self,
        cx: &mut ResolveContext<'_>,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError> {
        let seed = Seed::new(request);
        let mut state = State::Start;

        loop {
            state = match state {
                State::Found {
                    entity,
                    keep_synonym,
                } => {
                    if keep_synonym {
                        if let Some(alias) = &seed.name {
                            cx.add_synonym(alias, &entity)?;
                            self.prompt
                                .notice(&format!("'{}' added to Synonyms!", alias));
                        }
                    }
                    return Ok(Outcome::Resolved(entity));
                }
                State::Create { draft } => match draft.to_new_entity() {
                    Some(new) => return cx.create(new).map(Outcome::Resolved),
                    None => State::Collect { draft },
                },
                State::Abandoned => return Ok(Outcome::Abandoned),
                current => {
                    let answer = self.ask(cx, &current, &seed)?;
                    debug!(kind = %seed.kind, depth = cx.depth(), ?answer, "menu answer");
                    flow::transition(current, answer, &seed)
                }
            };
        }
    }

    fn ask(
        &mut self,
        cx: &mut ResolveContext<'_>,
        state: &State,
        seed: &Seed,
    ) -> Result<Answer, ResolveError> {
        let label = seed.kind.label();
        match state {
            State::Start => {
                let (title, options) = match &seed.name {
                    Some(name) => (
                        format!("{} '{}' not found. Do you wish to:", capitalize(label), name),
                        vec![
                            format!("Search for existing {}", label),
                            format!("Add a new {}, titled '{}'", label, name),
                        ],
                    ),
                    None => (
                        format!("Please provide {}:", label),
                        vec![
                            format!("Search for existing {}", label),
                            format!("Add a new {}", label),
                        ],
                    ),
                };
                Ok(Answer::Choice(self.prompt.choose(&title, &options, true)?))
            }

            State::Search => {
                let (matcher, owners) = candidates(cx, seed.kind)?;
                let typed = self
                    .prompt
                    .typeahead("Please start typing to show suggested values", &matcher)?;
                Ok(match typed {
                    Typed::Picked(index) => match owners.get(index) {
                        Some(entity) => Answer::Picked(entity.clone()),
                        None => Answer::Choice(Choice::Cancelled),
                    },
                    Typed::Entered(text) => Answer::Typed(text),
                    Typed::Cancelled => Answer::Choice(Choice::Cancelled),
                })
            }

            State::ConfirmSynonym { target } => {
                let title = match &seed.name {
                    Some(name) => format!(
                        "Do you wish to keep {} as synonym for {}?",
                        name, target.name
                    ),
                    None => format!("Use {} '{}'?", label, target.name),
                };
                let options = vec!["Yes".to_string(), "No".to_string()];
                Ok(Answer::Choice(self.prompt.choose(&title, &options, true)?))
            }

            State::Collect { draft } => self.collect(draft.clone()),

            State::Dependencies { draft } => self.dependencies(cx, draft.clone()),

            State::Review { draft } => {
                self.prompt
                    .notice(&format!("Input complete. About to create this {}:", label));
                for (field, value) in draft.summary() {
                    self.prompt.notice(&format!("{}: {}", field, value));
                }
                let options: Vec<String> = REVIEW_OPTIONS.iter().map(|o| o.to_string()).collect();
                let title = format!("Create this {}?", label);
                Ok(Answer::Choice(self.prompt.choose(&title, &options, true)?))
            }

            // Terminal states never reach the menus
            State::Found { .. } | State::Create { .. } | State::Abandoned => Ok(Answer::Back),
        }
    }

    /// Name and kind-specific fields
    fn collect(&mut self, mut draft: Draft) -> Result<Answer, ResolveError> {
        let label = draft.kind.label();

        if draft.name.is_none() || draft.editing {
            let name = self.prompt.free_text(
                &format!("Please type name of new {}", label),
                draft.name.as_deref(),
            )?;
            if name.is_empty() {
                self.prompt.notice("Returning to the previous menu");
                return Ok(Answer::Back);
            }
            draft.name = Some(name);
        }

        if draft.kind == EntityKind::Platform {
            let name = draft.name.clone().unwrap_or_default();

            let default = draft.trigraph.clone().unwrap_or_else(|| abbreviate(&name, 3));
            let trigraph = self
                .prompt
                .free_text("Please type trigraph of platform", Some(&default))?;
            draft.trigraph = Some(trigraph).filter(|t| !t.is_empty());

            let default = draft.quadgraph.clone().unwrap_or_else(|| abbreviate(&name, 4));
            let quadgraph = self
                .prompt
                .free_text("Please type quadgraph of platform", Some(&default))?;
            draft.quadgraph = Some(quadgraph).filter(|q| !q.is_empty());

            let pennant = self.prompt.free_text(
                "Please type pennant number of platform",
                draft.pennant_number.as_deref(),
            )?;
            draft.pennant_number = Some(pennant).filter(|p| !p.is_empty());
        }

        draft.editing = false;
        Ok(Answer::Collected(draft))
    }

    /// Resolve every dependency of the draft, nested menus included
    fn dependencies(
        &mut self,
        cx: &mut ResolveContext<'_>,
        mut draft: Draft,
    ) -> Result<Answer, ResolveError> {
        for &kind in draft.kind.dependencies() {
            if draft.dependency(kind).is_some() {
                continue;
            }
            let entity = match draft.hints.dependency(kind).map(str::to_string) {
                // A hinted name skips the menus for that dependency
                Some(name) => cx.get_or_create(kind, &name)?,
                None => match cx.resolve_dependency(self, &ResolutionRequest::nameless(kind))? {
                    Outcome::Resolved(entity) => entity,
                    Outcome::Abandoned => {
                        self.prompt.notice("Returning to the previous menu");
                        return Ok(Answer::Back);
                    }
                },
            };
            draft.set_dependency(entity);
        }

        if draft.kind == EntityKind::Sensor && draft.host.is_none() {
            if let Some(host) = draft.hints.dependency(EntityKind::Platform).map(str::to_string) {
                let request = ResolutionRequest::named(EntityKind::Platform, &host);
                match cx.resolve_dependency(self, &request)? {
                    Outcome::Resolved(entity) => draft.host = Some(entity),
                    Outcome::Abandoned => {
                        self.prompt.notice("Returning to the previous menu");
                        return Ok(Answer::Back);
                    }
                }
            }
        }

        Ok(Answer::Resolved(draft))
    }
}

/// Searchable labels for a kind and the entity each label stands for
///
/// Platforms are also searchable by trigraph and quadgraph.
fn candidates(
    cx: &ResolveContext<'_>,
    kind: EntityKind,
) -> Result<(FuzzyMatcher, Vec<ResolvedEntity>), ResolveError> {
    let mut labels: Vec<String> = Vec::new();
    let mut owners: Vec<ResolvedEntity> = Vec::new();

    for stored in cx.store().entities(kind)? {
        let mut names = vec![stored.entity.name.clone()];
        if let Attributes::Platform(p) = &stored.attributes {
            names.extend(p.trigraph.iter().cloned());
            names.extend(p.quadgraph.iter().cloned());
        }
        for name in names {
            if !name.trim().is_empty() && !labels.contains(&name) {
                labels.push(name);
                owners.push(stored.entity.clone());
            }
        }
    }

    Ok((FuzzyMatcher::new(labels), owners))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl<P: Prompt> Resolver for InteractiveResolver<P> {
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
