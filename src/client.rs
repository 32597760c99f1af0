use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::eval::{self, Detail, Error};
use crate::repository::RepositoryHandle;
use crate::serve::INVALID_INDEX;
use crate::store::Store;
use crate::toggle_value::{ToggleValue, ValueKind};
use crate::user::User;

/// The outcome of one successful evaluation, as handed to an [EvaluationRecorder].
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationEvent {
    pub time: DateTime<Utc>,
    pub key: String,
    pub value: ToggleValue,
    /// Variation index, or -1 when the caller's default was returned.
    pub index: i64,
    /// Toggle version, or 0 when unknown.
    pub version: u64,
    pub reason: String,
}

/// Trait used by [Client] to report evaluations, e.g. to an access event pipeline.
pub trait EvaluationRecorder: Send + Sync {
    /// Record the result of an evaluation.
    fn record(&self, event: EvaluationEvent);
}

/// Evaluates toggles by key against whatever snapshot the [RepositoryHandle] currently holds.
pub struct Client {
    repository: Arc<RepositoryHandle>,
    recorder: Option<Arc<dyn EvaluationRecorder>>,
}

impl Client {
    pub fn new(repository: Arc<RepositoryHandle>) -> Self {
        Client {
            repository,
            recorder: None,
        }
    }

    pub fn with_recorder(
        repository: Arc<RepositoryHandle>,
        recorder: Arc<dyn EvaluationRecorder>,
    ) -> Self {
        Client {
            repository,
            recorder: Some(recorder),
        }
    }

    /// Whether a complete snapshot has been received.
    pub fn initialized(&self) -> bool {
        self.repository.load().initialized()
    }

    /// Drop the current snapshot; evaluations afterwards return the caller's default.
    pub fn close(&self) {
        debug!("closing client");
        self.repository.clear();
    }

    /// Evaluate `toggle_key` for `user` without constraining the type of the result.
    pub fn detail(
        &self,
        toggle_key: &str,
        user: &User,
        default: ToggleValue,
    ) -> Detail<ToggleValue> {
        self.evaluate(toggle_key, user, default, None)
    }

    // The typed variants below only ever see values of the requested kind: anything else has
    // already been replaced by the default in `evaluate`.

    pub fn bool_detail(&self, toggle_key: &str, user: &User, default: bool) -> Detail<bool> {
        self.evaluate(toggle_key, user, default.into(), Some(ValueKind::Bool))
            .map(|v| v.as_bool().unwrap_or(default))
    }

    pub fn number_detail(&self, toggle_key: &str, user: &User, default: f64) -> Detail<f64> {
        self.evaluate(toggle_key, user, default.into(), Some(ValueKind::Number))
            .map(|v| v.as_f64().unwrap_or(default))
    }

    pub fn str_detail(&self, toggle_key: &str, user: &User, default: String) -> Detail<String> {
        self.evaluate(
            toggle_key,
            user,
            default.clone().into(),
            Some(ValueKind::Str),
        )
        .map(|v| match v {
            ToggleValue::Str(s) => s,
            _ => default,
        })
    }

    pub fn json_detail(
        &self,
        toggle_key: &str,
        user: &User,
        default: serde_json::Value,
    ) -> Detail<serde_json::Value> {
        self.evaluate(toggle_key, user, default.into(), Some(ValueKind::Json))
            .map(|v| v.as_json())
    }

    pub fn bool_value(&self, toggle_key: &str, user: &User, default: bool) -> bool {
        self.bool_detail(toggle_key, user, default)
            .value
            .unwrap_or(default)
    }

    pub fn number_value(&self, toggle_key: &str, user: &User, default: f64) -> f64 {
        self.number_detail(toggle_key, user, default)
            .value
            .unwrap_or(default)
    }

    pub fn str_value(&self, toggle_key: &str, user: &User, default: String) -> String {
        self.str_detail(toggle_key, user, default.clone())
            .value
            .unwrap_or(default)
    }

    pub fn json_value(
        &self,
        toggle_key: &str,
        user: &User,
        default: serde_json::Value,
    ) -> serde_json::Value {
        self.json_detail(toggle_key, user, default.clone())
            .value
            .unwrap_or(default)
    }

    fn evaluate(
        &self,
        toggle_key: &str,
        user: &User,
        default: ToggleValue,
        kind: Option<ValueKind>,
    ) -> Detail<ToggleValue> {
        // one snapshot for the whole evaluation
        let repository = self.repository.load();
        if !repository.initialized() {
            return Detail::err_default(Error::NotInitialized, default);
        }

        let toggle = match repository.toggle(toggle_key) {
            Some(toggle) => toggle,
            None => {
                return Detail::err_default(
                    Error::ToggleNotFound {
                        key: toggle_key.to_string(),
                    },
                    default,
                )
            }
        };

        let detail = eval::evaluate(repository.as_ref(), toggle, user, default.clone());
        if let (Some(kind), Some(value)) = (kind, &detail.value) {
            if !value.is_kind(kind) {
                warn!(
                    "toggle {} served {} where a {} was expected",
                    toggle_key, value, kind
                );
                return Detail::err_default(
                    Error::WrongType {
                        value: value.to_string(),
                        expected: kind,
                    },
                    default,
                );
            }
        }

        self.record(toggle_key, &detail);
        detail
    }

    fn record(&self, toggle_key: &str, detail: &Detail<ToggleValue>) {
        let (recorder, value) = match (&self.recorder, &detail.value) {
            (Some(recorder), Some(value)) => (recorder, value),
            _ => return,
        };

        recorder.record(EvaluationEvent {
            time: Utc::now(),
            key: toggle_key.to_string(),
            value: value.clone(),
            index: detail
                .variation_index
                .and_then(|i| i64::try_from(i).ok())
                .unwrap_or(INVALID_INDEX),
            version: detail.version.unwrap_or(0),
            reason: detail.reason.to_string(),
        });
    }
}
