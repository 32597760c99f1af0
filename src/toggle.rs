use log::error;
use serde::Deserialize;

use crate::eval::{self, Detail, Reason};
use crate::rule::Rule;
use crate::serve::{Serve, VariationIndex};
use crate::store::Store;
use crate::toggle_value::ToggleValue;
use crate::user::User;

fn default_version() -> u64 {
    1
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toggle {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub(crate) enabled: bool,
    #[serde(default = "default_version")]
    pub version: u64,
    #[serde(default)]
    pub for_client: bool,

    pub(crate) disabled_serve: Option<Serve>,
    pub(crate) default_serve: Option<Serve>,
    #[serde(default)]
    pub(crate) rules: Vec<Rule>,
    #[serde(default)]
    variations: Vec<ToggleValue>,
}

impl Toggle {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn variations(&self) -> &[ToggleValue] {
        &self.variations
    }

    /// Evaluate this toggle for `user`, falling back to `default` when no variation is served.
    pub fn eval(
        &self,
        user: &User,
        segments: &dyn Store,
        default: ToggleValue,
    ) -> Detail<ToggleValue> {
        eval::evaluate(segments, self, user, default)
    }

    pub(crate) fn variation(
        &self,
        index: VariationIndex,
        reason: Reason,
        rule_index: Option<usize>,
    ) -> Detail<&ToggleValue> {
        let detail = Detail {
            value: self.variations.get(index),
            rule_index,
            variation_index: Some(index),
            version: Some(self.version),
            reason,
        };
        if detail.value.is_none() {
            error!(
                "toggle {} selected variation {} but only has {}",
                self.key,
                index,
                self.variations.len()
            );
        }
        detail.should_have_value(eval::Error::MalformedToggle { index })
    }

    /// Resolve a disabled or default serve; a miss leaves the value empty.
    pub(crate) fn serve_value(
        &self,
        serve: Option<&Serve>,
        user: &User,
        reason: Reason,
    ) -> Detail<&ToggleValue> {
        match serve.and_then(|s| s.resolve(user, &self.key).index()) {
            Some(index) => self.variation(index, reason, None),
            None => Detail {
                version: Some(self.version),
                ..Detail::empty(reason)
            },
        }
    }

    #[cfg(test)]
    pub fn new_boolean_toggle(key: &str, rules: Vec<Rule>) -> Self {
        Self {
            key: key.to_string(),
            enabled: true,
            version: 1,
            for_client: false,
            disabled_serve: Some(Serve::Select { select: 0 }),
            default_serve: Some(Serve::Select { select: 0 }),
            rules,
            variations: vec![ToggleValue::Bool(false), ToggleValue::Bool(true)],
        }
    }
}
