use log::warn;
use serde::Deserialize;

use crate::eval::EvaluationStack;
use crate::rule::Rule;
use crate::store::Store;
use crate::user::User;

/// A named cohort of users. A user is in the segment when all conditions of at least one of its
/// rules hold; serves attached to segment rules are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub unique_id: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    rules: Vec<Rule>,
}

impl Segment {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn contains(&self, user: &User, segments: &dyn Store) -> bool {
        self.contains_internal(user, segments, &mut EvaluationStack::default())
    }

    pub(crate) fn contains_internal(
        &self,
        user: &User,
        segments: &dyn Store,
        evaluation_stack: &mut EvaluationStack,
    ) -> bool {
        if evaluation_stack.segment_chain.contains(&self.key) {
            warn!(
                "segment {} references itself through nested segment conditions; treating the user as not a member",
                self.key
            );
            return false;
        }

        evaluation_stack.segment_chain.insert(self.key.clone());
        let contained = self
            .rules
            .iter()
            .any(|rule| rule.matches_all(user, segments, evaluation_stack));
        evaluation_stack.segment_chain.remove(&self.key);

        contained
    }
}
