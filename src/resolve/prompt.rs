//! Menu primitive used by the interactive resolver
//!
//! The resolver only ever sees tagged answers: a selected index or an explicit
//! cancel. [`TerminalPrompt`] renders menus with dialoguer; [`ScriptedPrompt`]
//! replays a fixed list of answers so the whole state machine runs without a
//! terminal.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use console::style;
use dialoguer::{theme::ColorfulTheme, Completion, Input, Select};
use thiserror::Error;

use super::fuzzy::FuzzyMatcher;

/// How many ranked suggestions the terminal offers after a non-exact entry
const MAX_SUGGESTIONS: usize = 7;

/// Answer to a numbered menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Selected(usize),
    Cancelled,
}

/// Answer to a typeahead search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Typed {
    /// Index of the chosen candidate
    Picked(usize),
    /// Text that names none of the candidates
    Entered(String),
    Cancelled,
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("terminal interaction failed: {0}")]
    Terminal(#[from] dialoguer::Error),

    #[error("no scripted answer left for '{0}'")]
    Exhausted(String),

    #[error("scripted answer {answer} does not fit '{title}'")]
    Unexpected { title: String, answer: String },
}

/// Operator interaction needed by the interactive resolver
pub trait Prompt {
    /// Numbered choice among `options`; cancel is only offered when `allow_cancel`
    fn choose(
        &mut self,
        title: &str,
        options: &[String],
        allow_cancel: bool,
    ) -> Result<Choice, PromptError>;

    /// Free typing with ranked suggestions from `matcher`
    fn typeahead(&mut self, title: &str, matcher: &FuzzyMatcher) -> Result<Typed, PromptError>;

    /// One line of text; an empty answer falls back to `default`
    fn free_text(&mut self, prompt: &str, default: Option<&str>) -> Result<String, PromptError>;

    /// Informational message, no answer expected
    fn notice(&mut self, message: &str);
}

/// Tab-completes typed text to the best fuzzy suggestion
struct MatcherCompletion<'a> {
    matcher: &'a FuzzyMatcher,
}

impl Completion for MatcherCompletion<'_> {
    fn get(&self, input: &str) -> Option<String> {
        if input.trim().is_empty() {
            return None;
        }
        self.matcher.best(input).map(|s| s.label.to_string())
    }
}

/// Interactive terminal menus
pub struct TerminalPrompt {
    theme: ColorfulTheme,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt for TerminalPrompt {
    fn choose(
        &mut self,
        title: &str,
        options: &[String],
        allow_cancel: bool,
    ) -> Result<Choice, PromptError> {
        let select = Select::with_theme(&self.theme)
            .with_prompt(title)
            .items(options)
            .default(0);

        if allow_cancel {
            // Esc or q cancels
            Ok(match select.interact_opt()? {
                Some(index) => Choice::Selected(index),
                None => Choice::Cancelled,
            })
        } else {
            Ok(Choice::Selected(select.interact()?))
        }
    }

    fn typeahead(&mut self, title: &str, matcher: &FuzzyMatcher) -> Result<Typed, PromptError> {
        let completion = MatcherCompletion { matcher };
        let text: String = Input::with_theme(&self.theme)
            .with_prompt(format!("{} (Tab completes, empty input cancels)", title))
            .allow_empty(true)
            .completion_with(&completion)
            .interact_text()?;

        let text = text.trim();
        if text.is_empty() {
            return Ok(Typed::Cancelled);
        }
        if let Some(index) = matcher.position(text) {
            return Ok(Typed::Picked(index));
        }

        let top: Vec<_> = matcher.suggestions(text).take(MAX_SUGGESTIONS).collect();
        if top.is_empty() {
            return Ok(Typed::Entered(text.to_string()));
        }

        let mut items: Vec<String> = top.iter().map(|s| s.label.to_string()).collect();
        items.push(format!("None of these, use '{}'", text));

        let picked = Select::with_theme(&self.theme)
            .with_prompt("Did you mean")
            .items(&items)
            .default(0)
            .interact_opt()?;

        Ok(match picked {
            Some(i) if i < top.len() => Typed::Picked(top[i].index),
            Some(_) => Typed::Entered(text.to_string()),
            None => Typed::Cancelled,
        })
    }

    fn free_text(&mut self, prompt: &str, default: Option<&str>) -> Result<String, PromptError> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?.trim().to_string())
    }

    fn notice(&mut self, message: &str) {
        println!("{}", style(message).cyan());
    }
}

/// One scripted operator answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    /// Pick a menu option
    Select(usize),
    /// Back out of the current menu
    Cancel,
    /// Type text and accept it as typed
    Type(String),
    /// Type a query, then pick the suggestion at this rank
    Pick(String, usize),
    /// Accept the default of a free-text prompt
    Accept,
}

#[derive(Debug, Default)]
struct Script {
    answers: VecDeque<Scripted>,
    transcript: Vec<String>,
}

/// Replays scripted answers and records what was asked
///
/// Clones share the same script, so a test can keep a handle while the
/// resolver owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompt {
    script: Rc<RefCell<Script>>,
}

impl ScriptedPrompt {
    pub fn new(answers: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Rc::new(RefCell::new(Script {
                answers: answers.into_iter().collect(),
                transcript: Vec::new(),
            })),
        }
    }

    /// Everything shown so far: menu titles, offered suggestions, notices
    pub fn transcript(&self) -> Vec<String> {
        self.script.borrow().transcript.clone()
    }

    /// Answers not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.borrow().answers.len()
    }

    fn next(&self, title: &str) -> Result<Scripted, PromptError> {
        let mut script = self.script.borrow_mut();
        script.transcript.push(title.to_string());
        script
            .answers
            .pop_front()
            .ok_or_else(|| PromptError::Exhausted(title.to_string()))
    }

    fn record(&self, line: String) {
        self.script.borrow_mut().transcript.push(line);
    }
}

fn unexpected(title: &str, answer: &Scripted) -> PromptError {
    PromptError::Unexpected {
        title: title.to_string(),
        answer: format!("{:?}", answer),
    }
}

impl Prompt for ScriptedPrompt {
    fn choose(
        &mut self,
        title: &str,
        options: &[String],
        allow_cancel: bool,
    ) -> Result<Choice, PromptError> {
        match self.next(title)? {
            Scripted::Select(index) if index < options.len() => Ok(Choice::Selected(index)),
            Scripted::Cancel if allow_cancel => Ok(Choice::Cancelled),
            other => Err(unexpected(title, &other)),
        }
    }

    fn typeahead(&mut self, title: &str, matcher: &FuzzyMatcher) -> Result<Typed, PromptError> {
        match self.next(title)? {
            Scripted::Cancel => Ok(Typed::Cancelled),
            Scripted::Type(text) => Ok(match matcher.position(&text) {
                Some(index) => Typed::Picked(index),
                None => Typed::Entered(text.trim().to_string()),
            }),
            Scripted::Pick(query, rank) => {
                let offered: Vec<_> = matcher.suggestions(&query).collect();
                self.record(format!(
                    "suggested: {}",
                    offered.iter().map(|s| s.label).collect::<Vec<_>>().join(", ")
                ));
                offered
                    .get(rank)
                    .map(|s| Typed::Picked(s.index))
                    .ok_or_else(|| unexpected(title, &Scripted::Pick(query.clone(), rank)))
            }
            other => Err(unexpected(title, &other)),
        }
    }

    fn free_text(&mut self, prompt: &str, default: Option<&str>) -> Result<String, PromptError> {
        match self.next(prompt)? {
            Scripted::Type(text) => Ok(text.trim().to_string()),
            Scripted::Accept => Ok(default.unwrap_or_default().to_string()),
            other => Err(unexpected(prompt, &other)),
        }
    }

    fn notice(&mut self, message: &str) {
        self.record(message.to_string());
    }
}
