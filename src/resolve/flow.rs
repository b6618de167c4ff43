//! State machine behind the interactive resolver
//!
//! Menus are states and operator answers are data, so back-navigation and
//! cancellation are plain transitions that can be tested without a terminal.
//!
//! ```text
//! Start ──search──▶ Search ──pick──▶ ConfirmSynonym ──yes──▶ Found
//!   │                 │                   └──no──▶ Collect
//!   │                 └──new name──▶ Collect
//!   └──add new──▶ Collect ──▶ Dependencies ──▶ Review ──yes──▶ Create
//!                    ▲                          │ edit
//!                    └──────────────────────────┘
//! ```
//!
//! Cancel in any nested menu returns to the menu that opened it; cancel at
//! `Start` abandons the request.

use crate::core::entity::{
    abbreviate, Attributes, DatafileAttributes, Hints, NewEntity, PlatformAttributes,
    ResolvedEntity, SensorAttributes,
};
use crate::core::identity::EntityKind;
use crate::core::name::NameKey;

use super::prompt::Choice;
use super::ResolutionRequest;

/// Options of the review menu, in menu order
pub const REVIEW_OPTIONS: [&str; 3] = ["Yes", "No", "Make further edits"];

/// The fixed facts of one interactive resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    pub kind: EntityKind,
    pub name: Option<NameKey>,
    pub hints: Hints,
}

impl Seed {
    pub fn new(request: &ResolutionRequest) -> Self {
        Self {
            kind: request.kind,
            name: request.key(),
            hints: request.hints.clone(),
        }
    }

    /// A fresh draft pre-filled from the request
    pub fn draft(&self) -> Draft {
        Draft {
            kind: self.kind,
            name: self.name.as_ref().map(|n| n.to_string()),
            trigraph: self.hints.trigraph.clone(),
            quadgraph: self.hints.quadgraph.clone(),
            pennant_number: self.hints.pennant_number.clone(),
            hints: self.hints.clone(),
            dependencies: Vec::new(),
            host: None,
            editing: false,
        }
    }
}

/// An entity being assembled in the create path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub kind: EntityKind,
    pub name: Option<String>,
    pub trigraph: Option<String>,
    pub quadgraph: Option<String>,
    pub pennant_number: Option<String>,
    pub hints: Hints,
    /// Resolved dependency entities, one per kind in `kind.dependencies()`
    pub dependencies: Vec<ResolvedEntity>,
    /// Host platform of a sensor
    pub host: Option<ResolvedEntity>,
    /// True when the operator asked to make further edits
    pub editing: bool,
}

impl Draft {
    pub fn dependency(&self, kind: EntityKind) -> Option<&ResolvedEntity> {
        self.dependencies.iter().find(|d| d.kind == kind)
    }

    /// Set a dependency, replacing any earlier one of the same kind
    pub fn set_dependency(&mut self, entity: ResolvedEntity) {
        self.dependencies.retain(|d| d.kind != entity.kind);
        self.dependencies.push(entity);
    }

    /// True once every dependency of the kind is resolved
    pub fn is_complete(&self) -> bool {
        self.kind
            .dependencies()
            .iter()
            .all(|kind| self.dependency(*kind).is_some())
    }

    /// Start over for "make further edits": keep typed values, forget hints and dependencies
    fn reopen(mut self) -> Self {
        self.hints = Hints::default();
        self.dependencies.clear();
        self.host = None;
        self.editing = true;
        self
    }

    /// The entity to insert, once name and dependencies are all present
    pub fn to_new_entity(&self) -> Option<NewEntity> {
        if !self.is_complete() {
            return None;
        }
        let name = NameKey::new(self.name.as_deref()?)?.to_string();
        let dep = |kind| self.dependency(kind).map(|d| d.id);

        let attributes = match self.kind {
            EntityKind::Platform => Attributes::Platform(PlatformAttributes {
                trigraph: Some(
                    self.trigraph
                        .clone()
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| abbreviate(&name, 3)),
                ),
                quadgraph: Some(
                    self.quadgraph
                        .clone()
                        .filter(|q| !q.trim().is_empty())
                        .unwrap_or_else(|| abbreviate(&name, 4)),
                ),
                pennant_number: self.pennant_number.clone().filter(|p| !p.trim().is_empty()),
                nationality: dep(EntityKind::Nationality)?,
                platform_type: dep(EntityKind::PlatformType)?,
                privacy: dep(EntityKind::Privacy)?,
            }),
            EntityKind::Sensor => Attributes::Sensor(SensorAttributes {
                sensor_type: dep(EntityKind::SensorType)?,
                privacy: dep(EntityKind::Privacy)?,
                host: self.host.as_ref().map(|h| h.id),
            }),
            EntityKind::Datafile => Attributes::Datafile(DatafileAttributes {
                datafile_type: dep(EntityKind::DatafileType)?,
                privacy: dep(EntityKind::Privacy)?,
            }),
            _ => Attributes::Reference,
        };

        Some(NewEntity {
            kind: self.kind,
            name,
            attributes,
        })
    }

    /// Printable review lines, labelled the way operators know them
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let name = self.name.clone().unwrap_or_default();
        let dep = |kind| {
            self.dependency(kind)
                .map(|d| d.name.clone())
                .unwrap_or_default()
        };

        match self.kind {
            EntityKind::Platform => vec![
                ("Name", name.clone()),
                (
                    "Trigraph",
                    self.trigraph.clone().unwrap_or_else(|| abbreviate(&name, 3)),
                ),
                (
                    "Quadgraph",
                    self.quadgraph.clone().unwrap_or_else(|| abbreviate(&name, 4)),
                ),
                ("Pennant Number", self.pennant_number.clone().unwrap_or_default()),
                ("Nationality", dep(EntityKind::Nationality)),
                ("Class", dep(EntityKind::PlatformType)),
                ("Classification", dep(EntityKind::Privacy)),
            ],
            EntityKind::Sensor => vec![
                ("Name", name),
                ("Type", dep(EntityKind::SensorType)),
                (
                    "Host",
                    self.host.as_ref().map(|h| h.name.clone()).unwrap_or_default(),
                ),
                ("Classification", dep(EntityKind::Privacy)),
            ],
            EntityKind::Datafile => vec![
                ("Reference", name),
                ("Type", dep(EntityKind::DatafileType)),
                ("Classification", dep(EntityKind::Privacy)),
            ],
            _ => vec![("Name", name)],
        }
    }
}

/// Where the interactive resolution currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Search for an existing entity or add a new one
    Start,
    /// Typeahead over existing names
    Search,
    /// Keep the request's name as an alias of the picked entity?
    ConfirmSynonym { target: ResolvedEntity },
    /// Name and kind-specific fields
    Collect { draft: Draft },
    /// Nested resolutions of nationality, types, privacy, host
    Dependencies { draft: Draft },
    /// Last gate before any write
    Review { draft: Draft },
    Found {
        entity: ResolvedEntity,
        keep_synonym: bool,
    },
    Create { draft: Draft },
    Abandoned,
}

impl State {
    /// Terminal states end the loop
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            State::Found { .. } | State::Create { .. } | State::Abandoned
        )
    }
}

/// What the operator (or a nested resolution) answered in a state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Choice(Choice),
    /// An existing entity chosen in the search menu
    Picked(ResolvedEntity),
    /// Search text that names no existing entity
    Typed(String),
    Collected(Draft),
    Resolved(Draft),
    /// A nested step was cancelled
    Back,
}

/// Apply one answer; combinations that make no sense leave the state unchanged
pub fn transition(state: State, answer: Answer, seed: &Seed) -> State {
    use Answer as A;
    use Choice::{Cancelled, Selected};

    match (state, answer) {
        (State::Start, A::Choice(Selected(0))) => State::Search,
        (State::Start, A::Choice(Selected(1))) => State::Collect {
            draft: seed.draft(),
        },
        (State::Start, A::Choice(Cancelled)) => State::Abandoned,

        (State::Search, A::Picked(entity)) => match &seed.name {
            Some(name) if NameKey::new(&entity.name).as_ref() != Some(name) => {
                State::ConfirmSynonym { target: entity }
            }
            _ => State::Found {
                entity,
                keep_synonym: false,
            },
        },
        (State::Search, A::Typed(text)) => {
            let mut draft = seed.draft();
            draft.name = Some(text);
            State::Collect { draft }
        }
        (State::Search, A::Choice(Cancelled)) => State::Start,

        (State::ConfirmSynonym { target }, A::Choice(Selected(0))) => State::Found {
            entity: target,
            keep_synonym: true,
        },
        (State::ConfirmSynonym { .. }, A::Choice(Selected(1))) => State::Collect {
            draft: seed.draft(),
        },
        (State::ConfirmSynonym { .. }, A::Choice(Cancelled)) => State::Search,

        (State::Collect { .. }, A::Collected(draft)) => State::Dependencies { draft },
        (State::Collect { .. }, A::Back) => State::Start,

        (State::Dependencies { .. }, A::Resolved(draft)) => State::Review { draft },
        (State::Dependencies { .. }, A::Back) => State::Start,

        (State::Review { draft }, A::Choice(Selected(0))) => State::Create { draft },
        (State::Review { .. }, A::Choice(Selected(1))) => State::Start,
        (State::Review { draft }, A::Choice(Selected(2))) => State::Collect {
            draft: draft.reopen(),
        },
        (State::Review { .. }, A::Choice(Cancelled)) => State::Start,

        (state, _) => state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityId;

    fn seed(name: Option<&str>) -> Seed {
        Seed::new(&ResolutionRequest::new(
            EntityKind::Platform,
            name,
            Hints::default().with_nationality("UK"),
        ))
    }

    fn entity(kind: EntityKind, name: &str) -> ResolvedEntity {
        ResolvedEntity {
            kind,
            id: EntityId::new(kind),
            name: name.to_string(),
        }
    }

    fn complete_draft() -> Draft {
        let mut draft = seed(Some("HMS Foo")).draft();
        draft.set_dependency(entity(EntityKind::Nationality, "UK"));
        draft.set_dependency(entity(EntityKind::PlatformType, "Frigate"));
        draft.set_dependency(entity(EntityKind::Privacy, "Public"));
        draft
    }

    #[test]
    fn test_start_menu() {
        let s = seed(Some("HMS Foo"));
        assert_eq!(
            transition(State::Start, Answer::Choice(Choice::Selected(0)), &s),
            State::Search
        );
        assert_eq!(
            transition(State::Start, Answer::Choice(Choice::Selected(1)), &s),
            State::Collect { draft: s.draft() }
        );
        assert_eq!(
            transition(State::Start, Answer::Choice(Choice::Cancelled), &s),
            State::Abandoned
        );
    }

    #[test]
    fn test_pick_with_different_name_asks_for_synonym() {
        let s = seed(Some("HMS Foo"));
        let target = entity(EntityKind::Platform, "HMS FOO");

        let state = transition(State::Search, Answer::Picked(target.clone()), &s);
        assert_eq!(state, State::ConfirmSynonym { target: target.clone() });

        let yes = transition(state.clone(), Answer::Choice(Choice::Selected(0)), &s);
        assert_eq!(
            yes,
            State::Found {
                entity: target.clone(),
                keep_synonym: true
            }
        );
        assert!(yes.is_terminal());

        let no = transition(state.clone(), Answer::Choice(Choice::Selected(1)), &s);
        assert_eq!(no, State::Collect { draft: s.draft() });

        let cancel = transition(state, Answer::Choice(Choice::Cancelled), &s);
        assert_eq!(cancel, State::Search);
    }

    #[test]
    fn test_pick_without_name_is_found_directly() {
        let s = seed(None);
        let target = entity(EntityKind::Platform, "HMS FOO");
        assert_eq!(
            transition(State::Search, Answer::Picked(target.clone()), &s),
            State::Found {
                entity: target,
                keep_synonym: false
            }
        );
    }

    #[test]
    fn test_typed_search_text_becomes_new_name() {
        let s = seed(Some("HMS Foo"));
        match transition(State::Search, Answer::Typed("HMS Bar".to_string()), &s) {
            State::Collect { draft } => assert_eq!(draft.name.as_deref(), Some("HMS Bar")),
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(
            transition(State::Search, Answer::Choice(Choice::Cancelled), &s),
            State::Start
        );
    }

    #[test]
    fn test_nested_cancel_returns_to_start() {
        let s = seed(Some("HMS Foo"));
        let draft = s.draft();
        assert_eq!(
            transition(State::Collect { draft: draft.clone() }, Answer::Back, &s),
            State::Start
        );
        assert_eq!(
            transition(State::Dependencies { draft: draft.clone() }, Answer::Back, &s),
            State::Start
        );
        assert_eq!(
            transition(State::Review { draft }, Answer::Choice(Choice::Cancelled), &s),
            State::Start
        );
    }

    #[test]
    fn test_review_menu() {
        let s = seed(Some("HMS Foo"));
        let draft = complete_draft();
        let review = State::Review {
            draft: draft.clone(),
        };

        assert_eq!(
            transition(review.clone(), Answer::Choice(Choice::Selected(0)), &s),
            State::Create {
                draft: draft.clone()
            }
        );
        assert_eq!(
            transition(review.clone(), Answer::Choice(Choice::Selected(1)), &s),
            State::Start
        );
        match transition(review, Answer::Choice(Choice::Selected(2)), &s) {
            State::Collect { draft } => {
                assert!(draft.editing);
                assert!(draft.dependencies.is_empty());
                assert_eq!(draft.hints, Hints::default());
                assert_eq!(draft.name.as_deref(), Some("HMS Foo"));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_invalid_answers_leave_state_unchanged() {
        let s = seed(Some("HMS Foo"));
        assert_eq!(transition(State::Start, Answer::Back, &s), State::Start);
        assert_eq!(
            transition(State::Search, Answer::Choice(Choice::Selected(0)), &s),
            State::Search
        );
        assert_eq!(
            transition(State::Abandoned, Answer::Choice(Choice::Selected(0)), &s),
            State::Abandoned
        );
    }

    #[test]
    fn test_platform_draft_defaults_graphs() {
        let new = complete_draft().to_new_entity().unwrap();
        match new.attributes {
            Attributes::Platform(p) => {
                assert_eq!(p.trigraph.as_deref(), Some("HMS"));
                assert_eq!(p.quadgraph.as_deref(), Some("HMS"));
                assert_eq!(p.pennant_number, None);
            }
            other => panic!("unexpected attributes {other:?}"),
        }
    }

    #[test]
    fn test_incomplete_draft_has_no_entity() {
        let mut draft = complete_draft();
        draft.dependencies.pop();
        assert!(!draft.is_complete());
        assert!(draft.to_new_entity().is_none());

        let mut draft = complete_draft();
        draft.name = Some("  ".to_string());
        assert!(draft.to_new_entity().is_none());
    }

    #[test]
    fn test_summary_labels() {
        let labels: Vec<_> = complete_draft().summary().into_iter().map(|(l, _)| l).collect();
        assert_eq!(
            labels,
            vec![
                "Name",
                "Trigraph",
                "Quadgraph",
                "Pennant Number",
                "Nationality",
                "Class",
                "Classification"
            ]
        );
    }
}
