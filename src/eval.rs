use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use serde_with::SerializeDisplay;

use crate::serve::{HitResult, VariationIndex, Warning};
use crate::store::Store;
use crate::toggle::Toggle;
use crate::toggle_value::{ToggleValue, ValueKind};
use crate::user::User;

const PREALLOCATED_SEGMENT_CHAIN_SIZE: usize = 20;

pub(crate) struct EvaluationStack {
    pub(crate) segment_chain: HashSet<String>,
}

impl EvaluationStack {
    fn new() -> Self {
        // Preallocate some space for segment_chain. We can get up to that many levels of nested
        // segments before inserting causes a reallocation.
        Self {
            segment_chain: HashSet::with_capacity(PREALLOCATED_SEGMENT_CHAIN_SIZE),
        }
    }
}

impl Default for EvaluationStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate a toggle for the specified [User].
///
/// The evaluator does not know anything about readiness, lookups by key or event reporting; that
/// is the responsibility of the caller (see [crate::Client]). `store` is only consulted to
/// resolve segments referenced by conditions. When no variation is served, the value of the
/// returned detail is `default`.
pub fn evaluate(
    store: &dyn Store,
    toggle: &Toggle,
    user: &User,
    default: ToggleValue,
) -> Detail<ToggleValue> {
    evaluate_variation(store, toggle, user)
        .map(ToggleValue::clone)
        .or(default)
}

pub(crate) fn evaluate_variation<'a>(
    store: &dyn Store,
    toggle: &'a Toggle,
    user: &User,
) -> Detail<&'a ToggleValue> {
    if !toggle.enabled {
        return toggle.serve_value(toggle.disabled_serve.as_ref(), user, Reason::Disabled);
    }

    let mut evaluation_stack = EvaluationStack::default();
    let mut warning = None;
    for (rule_index, rule) in toggle.rules.iter().enumerate() {
        match rule.hit_internal(user, store, &toggle.key, &mut evaluation_stack) {
            HitResult::Hit(index) => {
                return toggle.variation(index, Reason::RuleHit { rule_index }, Some(rule_index))
            }
            HitResult::Miss(Some(w)) => warning = Some(w),
            HitResult::Miss(None) => (),
        }
    }

    toggle.serve_value(
        toggle.default_serve.as_ref(),
        user,
        Reason::Default { warning },
    )
}

/// A Detail instance is returned from [evaluate], combining the result of a toggle evaluation
/// with an explanation of how it was calculated.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detail<T> {
    /// The result of the evaluation. Only None before a caller default has been applied.
    pub value: Option<T>,

    /// Zero-based index of the rule that produced the value.
    pub rule_index: Option<usize>,

    /// The index of the returned value within the toggle's list of variations. This is None
    /// whenever the caller's default value was returned, which is different from a value of 0.
    pub variation_index: Option<VariationIndex>,

    /// Version of the toggle that was evaluated; None if there was no toggle to evaluate.
    pub version: Option<u64>,

    pub reason: Reason,
}

impl<T> Detail<T> {
    /// Returns a detail with every optional field set to None.
    pub fn empty(reason: Reason) -> Detail<T> {
        Detail {
            value: None,
            rule_index: None,
            variation_index: None,
            version: None,
            reason,
        }
    }

    /// Returns a detail response using the provided default as the value and the provided error
    /// as the [Detail::reason].
    pub fn err_default(error: Error, default: T) -> Detail<T> {
        Detail {
            value: Some(default),
            ..Detail::empty(Reason::Error(error))
        }
    }

    /// Returns a new instance of this detail with the provided function `f` applied to
    /// [Detail::value].
    pub fn map<U, F>(self, f: F) -> Detail<U>
    where
        F: FnOnce(T) -> U,
    {
        Detail {
            value: self.value.map(f),
            rule_index: self.rule_index,
            variation_index: self.variation_index,
            version: self.version,
            reason: self.reason,
        }
    }

    /// Sets the [Detail::reason] to the provided error if the current detail instance does not
    /// have a value set.
    pub fn should_have_value(mut self, e: Error) -> Detail<T> {
        if self.value.is_none() {
            self.reason = Reason::Error(e);
        }
        self
    }

    /// Set the [Detail::value] to `default` if it does not exist.
    ///
    /// The reason is left untouched: a default rule that served nothing still reports itself.
    pub fn or(mut self, default: T) -> Detail<T> {
        if self.value.is_none() {
            self.value = Some(default);
            self.variation_index = None;
        }
        self
    }
}

/// Reason describes why an evaluation produced a particular value. It serializes as its
/// human-readable text.
#[derive(Clone, Debug, PartialEq, SerializeDisplay)]
pub enum Reason {
    /// The toggle is disabled and served its disabled serve.
    Disabled,
    /// The user matched the rule at `rule_index`.
    RuleHit { rule_index: usize },
    /// No rule matched. `warning` is the last warning raised by a non-matching rule.
    Default { warning: Option<Warning> },
    /// The toggle could not be evaluated; the value is the caller's default.
    Error(Error),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Disabled => f.write_str("Toggle disabled"),
            Reason::RuleHit { rule_index } => write!(f, "Rule {} hit", rule_index),
            Reason::Default { warning: None } => f.write_str("Default rule hit."),
            Reason::Default {
                warning: Some(warning),
            } => write!(f, "Default rule hit. {}", warning),
            Reason::Error(error) => write!(f, "{}", error),
        }
    }
}

/// Error is returned via a [Reason::Error] when a toggle could not be evaluated.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// The repository has not received a complete snapshot yet.
    NotInitialized,
    /// No toggle with the requested key exists.
    ToggleNotFound { key: String },
    /// The served variation is not of the requested type.
    WrongType { value: String, expected: ValueKind },
    /// A serve selected a variation the toggle doesn't have.
    MalformedToggle { index: VariationIndex },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotInitialized => f.write_str("Repository not initialized"),
            Error::ToggleNotFound { key } => write!(f, "Toggle '{}' not exist", key),
            Error::WrongType { value, expected } => write!(
                f,
                "Value [{}] type mismatch, target type: {}",
                value, expected
            ),
            Error::MalformedToggle { index } => {
                write!(f, "Variation index {} is out of range", index)
            }
        }
    }
}
