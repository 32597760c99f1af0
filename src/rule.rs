use chrono::Utc;
use log::warn;
use regex::Regex;
use semver::{BuildMetadata, Version};
use serde::Deserialize;

use crate::eval::EvaluationStack;
use crate::serve::{HitResult, Serve, Warning};
use crate::store::Store;
use crate::user::User;
use crate::util::{parse_float_lenient, parse_int_lenient};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringOp {
    IsOneOf,
    StartsWith,
    EndsWith,
    Contains,
    MatchesRegex,
}

/// A string operator, optionally negated: `does not start with` is `StartsWith` negated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StringPredicate {
    pub op: StringOp,
    pub negate: bool,
}

/// Comparison shared by number and semver conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatetimePredicate {
    After,
    Before,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentPredicate {
    IsIn,
    IsNotIn,
}

/// What a condition compares and how. Anything the engine doesn't understand is kept as
/// [ConditionKind::Unsupported] and never matches.
#[derive(Clone, Debug, PartialEq)]
pub enum ConditionKind {
    String(StringPredicate),
    Number(CompareOp),
    Datetime(DatetimePredicate),
    Semver(CompareOp),
    Segment(SegmentPredicate),
    Unsupported { kind: String, predicate: String },
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(from = "ConditionRepr")]
pub struct Condition {
    subject: String,
    objects: Vec<String>,
    kind: ConditionKind,
}

// Wire form of a condition: the kind and its predicate arrive as two loose strings.
#[derive(Deserialize)]
struct ConditionRepr {
    #[serde(default)]
    subject: String,
    #[serde(default)]
    objects: Vec<String>,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    predicate: String,
}

impl From<ConditionRepr> for Condition {
    fn from(repr: ConditionRepr) -> Self {
        Condition {
            kind: ConditionKind::parse(&repr.kind, &repr.predicate),
            subject: repr.subject,
            objects: repr.objects,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Rule {
    #[serde(default)]
    conditions: Vec<Condition>,
    serve: Option<Serve>,
}

impl StringPredicate {
    fn parse(predicate: &str) -> Option<Self> {
        let (op, negate) = match predicate {
            "is one of" => (StringOp::IsOneOf, false),
            "is not any of" => (StringOp::IsOneOf, true),
            "starts with" => (StringOp::StartsWith, false),
            "does not start with" => (StringOp::StartsWith, true),
            "ends with" => (StringOp::EndsWith, false),
            "does not end with" => (StringOp::EndsWith, true),
            "contains" => (StringOp::Contains, false),
            "does not contain" => (StringOp::Contains, true),
            "matches regex" => (StringOp::MatchesRegex, false),
            "does not match regex" => (StringOp::MatchesRegex, true),
            _ => return None,
        };
        Some(StringPredicate { op, negate })
    }

    fn maybe_negate(&self, v: bool) -> bool {
        if self.negate {
            !v
        } else {
            v
        }
    }
}

impl CompareOp {
    fn parse(predicate: &str) -> Option<Self> {
        Some(match predicate {
            "=" => CompareOp::Equal,
            "!=" => CompareOp::NotEqual,
            ">" => CompareOp::GreaterThan,
            ">=" => CompareOp::GreaterThanOrEqual,
            "<" => CompareOp::LessThan,
            "<=" => CompareOp::LessThanOrEqual,
            _ => return None,
        })
    }

    /// Applies the comparison against a list of operands: true if any operand compares
    /// accordingly, except for [CompareOp::NotEqual] which requires that none is equal.
    fn any<T, I>(&self, lhs: &T, rhs: I) -> bool
    where
        T: PartialOrd,
        I: IntoIterator<Item = T>,
    {
        let mut rhs = rhs.into_iter();
        match self {
            CompareOp::Equal => rhs.any(|r| *lhs == r),
            CompareOp::NotEqual => !rhs.any(|r| *lhs == r),
            CompareOp::GreaterThan => rhs.any(|r| *lhs > r),
            CompareOp::GreaterThanOrEqual => rhs.any(|r| *lhs >= r),
            CompareOp::LessThan => rhs.any(|r| *lhs < r),
            CompareOp::LessThanOrEqual => rhs.any(|r| *lhs <= r),
        }
    }

    /// Like [CompareOp::any] over operands that may have failed to parse. Operands are walked in
    /// order and a failed one reached before the outcome is decided yields `None`.
    fn try_any<T, I>(&self, lhs: &T, rhs: I) -> Option<bool>
    where
        T: PartialOrd,
        I: IntoIterator<Item = Option<T>>,
    {
        let (op, negate) = match self {
            CompareOp::NotEqual => (CompareOp::Equal, true),
            op => (*op, false),
        };
        for r in rhs {
            if op.any(lhs, Some(r?)) {
                return Some(!negate);
            }
        }
        Some(negate)
    }
}

impl ConditionKind {
    pub fn parse(kind: &str, predicate: &str) -> Self {
        let parsed = match kind {
            "string" => StringPredicate::parse(predicate).map(ConditionKind::String),
            "number" => CompareOp::parse(predicate).map(ConditionKind::Number),
            "semver" => CompareOp::parse(predicate).map(ConditionKind::Semver),
            "datetime" => match predicate {
                "after" => Some(ConditionKind::Datetime(DatetimePredicate::After)),
                "before" => Some(ConditionKind::Datetime(DatetimePredicate::Before)),
                _ => None,
            },
            "segment" => match predicate {
                "is in" => Some(ConditionKind::Segment(SegmentPredicate::IsIn)),
                "is not in" => Some(ConditionKind::Segment(SegmentPredicate::IsNotIn)),
                _ => None,
            },
            _ => None,
        };

        parsed.unwrap_or_else(|| {
            warn!(
                "unsupported condition type '{}' with predicate '{}', it will never match",
                kind, predicate
            );
            ConditionKind::Unsupported {
                kind: kind.to_string(),
                predicate: predicate.to_string(),
            }
        })
    }

    fn kind_name(&self) -> &str {
        match self {
            ConditionKind::String(_) => "string",
            ConditionKind::Number(_) => "number",
            ConditionKind::Datetime(_) => "datetime",
            ConditionKind::Semver(_) => "semver",
            ConditionKind::Segment(_) => "segment",
            ConditionKind::Unsupported { kind, .. } => kind,
        }
    }

    pub(crate) fn is_segment(&self) -> bool {
        self.kind_name() == "segment"
    }

    // Segment conditions look at no attribute at all, and datetime conditions fall back to the
    // current time.
    pub(crate) fn requires_attribute(&self) -> bool {
        !matches!(self.kind_name(), "segment" | "datetime")
    }
}

impl Condition {
    pub fn new(subject: impl Into<String>, kind: ConditionKind, objects: Vec<String>) -> Self {
        Condition {
            subject: subject.into(),
            objects,
            kind,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn kind(&self) -> &ConditionKind {
        &self.kind
    }

    /// Whether `user` satisfies this condition. Segment conditions need a `segments` lookup and
    /// never match without one.
    pub fn meet(&self, user: &User, segments: Option<&dyn Store>) -> bool {
        self.meet_internal(user, segments, &mut EvaluationStack::default())
    }

    pub(crate) fn meet_internal(
        &self,
        user: &User,
        segments: Option<&dyn Store>,
        evaluation_stack: &mut EvaluationStack,
    ) -> bool {
        match &self.kind {
            ConditionKind::String(predicate) => self.matches_string(predicate, user),
            ConditionKind::Number(op) => self.matches_number(op, user),
            ConditionKind::Datetime(predicate) => self.matches_datetime(predicate, user),
            ConditionKind::Semver(op) => self.matches_semver(op, user),
            ConditionKind::Segment(predicate) => match segments {
                Some(store) => self.matches_segment(predicate, user, store, evaluation_stack),
                None => false,
            },
            ConditionKind::Unsupported { .. } => false,
        }
    }

    fn matches_string(&self, predicate: &StringPredicate, user: &User) -> bool {
        let user_val = match user.value_of(&self.subject) {
            Some(v) if !v.trim().is_empty() => v,
            _ => return false,
        };

        let any_match = self
            .objects
            .iter()
            .any(|object| predicate.op.matches(user_val, object));
        predicate.maybe_negate(any_match)
    }

    fn matches_number(&self, op: &CompareOp, user: &User) -> bool {
        let user_val = match user.value_of(&self.subject).and_then(parse_float_lenient) {
            Some(v) if !v.is_nan() => v,
            _ => return false,
        };

        op.any(
            &user_val,
            self.objects.iter().filter_map(|o| parse_float_lenient(o)),
        )
    }

    fn matches_datetime(&self, predicate: &DatetimePredicate, user: &User) -> bool {
        let user_val = match user.value_of(&self.subject) {
            None => Utc::now().timestamp_millis() as f64 / 1000.0,
            Some(v) => match parse_float_lenient(v) {
                Some(v) if !v.is_nan() => v,
                _ => return false,
            },
        };

        let mut thresholds = self.objects.iter().filter_map(|o| parse_int_lenient(o));
        match predicate {
            DatetimePredicate::After => thresholds.any(|t| user_val >= t),
            DatetimePredicate::Before => thresholds.any(|t| user_val < t),
        }
    }

    fn matches_semver(&self, op: &CompareOp, user: &User) -> bool {
        let user_val = match user.value_of(&self.subject).and_then(parse_semver) {
            Some(v) => v,
            None => return false,
        };

        let objects = self.objects.iter().map(|o| parse_semver(o));
        match op.try_any(&user_val, objects) {
            Some(matched) => matched,
            None => {
                warn!("invalid semver operand in {:?}", self.objects);
                false
            }
        }
    }

    fn matches_segment(
        &self,
        predicate: &SegmentPredicate,
        user: &User,
        store: &dyn Store,
        evaluation_stack: &mut EvaluationStack,
    ) -> bool {
        let in_any = self.objects.iter().any(|segment_key| {
            store
                .segment(segment_key)
                .map(|segment| segment.contains_internal(user, store, evaluation_stack))
                .unwrap_or(false)
        });
        match predicate {
            SegmentPredicate::IsIn => in_any,
            SegmentPredicate::IsNotIn => !in_any,
        }
    }
}

impl StringOp {
    fn matches(&self, lhs: &str, rhs: &str) -> bool {
        match self {
            StringOp::IsOneOf => lhs == rhs,
            StringOp::StartsWith => lhs.starts_with(rhs),
            StringOp::EndsWith => lhs.ends_with(rhs),
            StringOp::Contains => lhs.contains(rhs),
            StringOp::MatchesRegex => match Regex::new(rhs) {
                Ok(re) => re.is_match(lhs),
                Err(e) => {
                    warn!("invalid regex {:?} ignored: {}", rhs, e);
                    false
                }
            },
        }
    }
}

/// Strict semantic version with build metadata dropped, since build metadata takes no part in
/// precedence.
fn parse_semver(s: &str) -> Option<Version> {
    let s = s.trim();
    let mut version = Version::parse(s.strip_prefix('v').unwrap_or(s)).ok()?;
    version.build = BuildMetadata::EMPTY;
    Some(version)
}

impl Rule {
    pub fn new(conditions: Vec<Condition>, serve: Option<Serve>) -> Self {
        Rule { conditions, serve }
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Whether `user` passes every condition of this rule, and if so which variation the rule
    /// serves. A miss may carry a [Warning] explaining it.
    pub fn hit(&self, user: &User, segments: &dyn Store, toggle_key: &str) -> HitResult {
        self.hit_internal(user, segments, toggle_key, &mut EvaluationStack::default())
    }

    pub(crate) fn hit_internal(
        &self,
        user: &User,
        store: &dyn Store,
        toggle_key: &str,
        evaluation_stack: &mut EvaluationStack,
    ) -> HitResult {
        // rules match if _all_ of their conditions do
        for condition in &self.conditions {
            if condition.kind.requires_attribute() && !user.has_attr(&condition.subject) {
                return HitResult::missing_attribute(user, &condition.subject);
            }
            if !condition.meet_internal(user, Some(store), evaluation_stack) {
                return HitResult::Miss(None);
            }
        }

        match &self.serve {
            Some(serve) => serve.resolve(user, toggle_key),
            None => HitResult::Miss(Some(Warning::MissingServe)),
        }
    }

    /// Membership variant used by segments: a rule without a serve still counts, and a missing
    /// attribute is simply a failed condition.
    pub(crate) fn matches_all(
        &self,
        user: &User,
        store: &dyn Store,
        evaluation_stack: &mut EvaluationStack,
    ) -> bool {
        self.conditions.iter().all(|condition| {
            (condition.kind.is_segment() || user.has_attr(&condition.subject))
                && condition.meet_internal(user, Some(store), evaluation_stack)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serve::Split;
    use crate::test_common::TestStore;
    use spectral::prelude::*;
    use test_case::test_case;

    fn condition(kind: &str, predicate: &str, subject: &str, objects: &[&str]) -> Condition {
        Condition::new(
            subject,
            ConditionKind::parse(kind, predicate),
            objects.iter().map(|o| o.to_string()).collect(),
        )
    }

    fn user_with(attr: &str, value: &str) -> User {
        User::with_key("key").attr(attr, value).build()
    }

    fn now_secs() -> f64 {
        Utc::now().timestamp_millis() as f64 / 1000.0
    }

    #[test]
    fn parse_condition() {
        let cond: Condition = serde_json::from_str(
            r#"{"subject": "name", "objects": ["a", "b"], "type": "string", "predicate": "is not any of"}"#,
        )
        .expect("should parse");
        assert_that!(cond.kind()).is_equal_to(&ConditionKind::String(StringPredicate {
            op: StringOp::IsOneOf,
            negate: true,
        }));
        assert_that!(cond.subject()).is_equal_to("name");

        let cond: Condition =
            serde_json::from_str(r#"{"subject": "v", "type": "semver", "predicate": ">="}"#)
                .expect("should parse");
        assert_that!(cond.kind())
            .is_equal_to(&ConditionKind::Semver(CompareOp::GreaterThanOrEqual));
        assert_that!(cond.objects).is_empty();

        let cond: Condition =
            serde_json::from_str(r#"{"subject": "v", "type": "geo", "predicate": "near"}"#)
                .expect("should parse");
        assert_that!(cond.kind()).is_equal_to(&ConditionKind::Unsupported {
            kind: "geo".into(),
            predicate: "near".into(),
        });
    }

    #[test_case("is one of", "world", true)]
    #[test_case("is one of", "worlds", false)]
    #[test_case("is not any of", "no", true)]
    #[test_case("is not any of", "hello", false)]
    #[test_case("ends with", "the world", true)]
    #[test_case("ends with", "the word", false)]
    #[test_case("does not end with", "world111", true)]
    #[test_case("does not end with", "my world", false)]
    #[test_case("starts with", "world!", true)]
    #[test_case("starts with", "the word", false)]
    #[test_case("does not start with", "1world111", true)]
    #[test_case("does not start with", "world1", false)]
    #[test_case("contains", "1world111", true)]
    #[test_case("contains", "ord", false)]
    #[test_case("does not contain", "the wor1d", true)]
    #[test_case("does not contain", "1world111", false)]
    fn string_predicates(predicate: &str, value: &str, expected: bool) {
        let cond = condition("string", predicate, "name", &["hello", "world"]);
        assert_that!(cond.meet(&user_with("name", value), None)).is_equal_to(expected);
    }

    #[test]
    fn string_requires_non_blank_attribute() {
        let cond = condition("string", "is not any of", "name", &["hello", "world"]);
        assert!(!cond.meet(&User::with_key("key").build(), None));
        assert!(!cond.meet(&user_with("name", "   "), None));
        let cond = condition("string", "is one of", "name", &["a"]);
        asserting!("matching is done on the untrimmed value")
            .that(&cond.meet(&user_with("name", " a"), None))
            .is_false();
    }

    #[test]
    fn regex_predicates() {
        let cond = condition(
            "string",
            "matches regex",
            "name",
            &["hello\\d", "world.+", "^strict$"],
        );
        assert!(cond.meet(&user_with("name", "1world111"), None));
        assert!(cond.meet(&user_with("name", "a  hello1\n"), None));
        assert!(!cond.meet(&user_with("name", "2world"), None));
        assert!(!cond.meet(&user_with("name", " strict "), None));

        let negated = condition(
            "string",
            "does not match regex",
            "name",
            &["hello\\d", "world.+", "^strict$"],
        );
        assert!(negated.meet(&user_with("name", "1world"), None));
        assert!(!negated.meet(&user_with("name", "strict"), None));
    }

    #[test]
    fn invalid_regex_is_a_non_match() {
        let cond = condition("string", "matches regex", "name", &[r"\\\"]);
        assert!(!cond.meet(&user_with("name", r"\\\"), None));

        let mixed = condition("string", "matches regex", "name", &["***bad regex", "^ok$"]);
        asserting!("other patterns are still tried")
            .that(&mixed.meet(&user_with("name", "ok"), None))
            .is_true();
    }

    #[test_case("=", "5", true ; "eq 5")]
    #[test_case("=", "4", false ; "eq 4")]
    #[test_case("!=", "5", false ; "ne 5")]
    #[test_case("!=", "4", true ; "ne 4")]
    fn number_equality(predicate: &str, value: &str, expected: bool) {
        let cond = condition("number", predicate, "count", &["1", "2", "5"]);
        assert_that!(cond.meet(&user_with("count", value), None)).is_equal_to(expected);
    }

    #[test_case(">", "1", false ; "gt 1")]
    #[test_case(">", "\n1.000001 ", true ; "gt newline 1.000001")]
    #[test_case(">=", "0.9", false ; "ge 0.9")]
    #[test_case(">=", "10e-1", true ; "ge 10e-1")]
    #[test_case("<", "3", true ; "lt 3")]
    #[test_case("<", "7", false ; "lt 7")]
    #[test_case("<=", "1", true ; "le 1")]
    #[test_case("<=", "10e-100", true ; "le 10e-100")]
    #[test_case("<=", "10e100", false ; "le 10e100")]
    fn number_ordering(predicate: &str, value: &str, expected: bool) {
        let cond = condition("number", predicate, "count", &["1.e0", "2", "5"]);
        assert_that!(cond.meet(&user_with("count", value), None)).is_equal_to(expected);
    }

    #[test]
    fn number_boundary_above_all_thresholds_only() {
        let cond = condition("number", ">", "count", &["2", "5"]);
        assert!(!cond.meet(&user_with("count", "1.000001"), None));
    }

    #[test]
    fn invalid_number_condition() {
        let cond = condition("number", "?=", "count", &["1.e0", "2", "5"]);
        asserting!("unknown predicate")
            .that(&cond.meet(&user_with("count", "1"), None))
            .is_false();

        let cond = condition("number", "=", "count", &["1.e0", "2", "5"]);
        assert!(!cond.meet(&user_with("count", "foo"), None));

        let cond = condition("number", "=", "count", &["foo", "bar"]);
        assert!(!cond.meet(&user_with("count", "foo"), None));
        assert!(!cond.meet(&user_with("count", "2"), None));

        let cond = condition("number", "=", "count", &["foo", "bar", "2"]);
        asserting!("unparsable operands are skipped")
            .that(&cond.meet(&user_with("count", "2"), None))
            .is_true();
    }

    #[test]
    fn datetime_before() {
        let now = now_secs();
        let threshold = (now + 10.0).to_string();
        let cond = condition("datetime", "before", "created", &[threshold.as_str()]);

        asserting!("missing attribute uses the current time")
            .that(&cond.meet(&User::with_key("key").build(), None))
            .is_true();
        assert!(cond.meet(&user_with("created", &now.to_string()), None));
        assert!(!cond.meet(&user_with("created", &(now + 10.0).to_string()), None));
    }

    #[test]
    fn datetime_after() {
        let now = now_secs();
        let cond = condition("datetime", "after", "created", &[now.to_string().as_str()]);

        assert!(cond.meet(&User::with_key("key").build(), None));
        assert!(cond.meet(&user_with("created", &now.to_string()), None));
        assert!(cond.meet(&user_with("created", &(now + 1.0).to_string()), None));
        assert!(!cond.meet(&user_with("created", &(now - 10.0).to_string()), None));
    }

    #[test]
    fn datetime_invalid_values() {
        let now = now_secs();
        let cond = condition("datetime", "before", "created", &[now.to_string().as_str()]);
        assert!(!cond.meet(&user_with("created", "foo"), None));

        let cond = condition("datetime", "before", "created", &["foo"]);
        assert!(!cond.meet(&user_with("created", &now.to_string()), None));
    }

    const VERSIONS: &[&str] = &["1.0.0-rc1", "2.0.1", "2.1.0-beta2+build1201293821"];

    #[test_case("=", "1.0.0-rc1+build212", true ; "eq 1.0.0-rc1+build212")]
    #[test_case("=", "2.0.1+build3232231", true ; "eq 2.0.1+build3232231")]
    #[test_case("=", "2.0.1-rc3", false ; "eq 2.0.1-rc3")]
    #[test_case("!=", "1.1.0", true ; "ne 1.1.0")]
    #[test_case("!=", "2.0.1", false ; "ne 2.0.1")]
    #[test_case("!=", "1.0.0-rc1+foo", false ; "ne 1.0.0-rc1+foo")]
    #[test_case("!=", "2.1.0-beta2", false ; "ne 2.1.0-beta2")]
    #[test_case(">", "1.0.0-rc2", true ; "gt 1.0.0-rc2")]
    #[test_case(">", "1.0.0-rc1", false ; "gt 1.0.0-rc1")]
    #[test_case(">=", "1.1.0", true ; "ge 1.1.0")]
    #[test_case(">=", "2.0.1", true ; "ge 2.0.1")]
    #[test_case(">=", "0.1.0", false ; "ge 0.1.0")]
    #[test_case("<", "1.1.0", true ; "lt 1.1.0")]
    #[test_case("<", "2.1.0-beta2", false ; "lt 2.1.0-beta2")]
    #[test_case("<=", "1.0.0", true ; "le 1.0.0")]
    #[test_case("<=", "2.0.1-alpha1", true ; "le 2.0.1-alpha1")]
    #[test_case("<=", "2.1.0-beta2", true ; "le 2.1.0-beta2")]
    #[test_case("<=", "2.1.0-beta3", false ; "le 2.1.0-beta3")]
    fn semver_predicates(predicate: &str, value: &str, expected: bool) {
        let cond = condition("semver", predicate, "ver", VERSIONS);
        assert_that!(cond.meet(&user_with("ver", value), None)).is_equal_to(expected);
    }

    #[test]
    fn invalid_semver_condition() {
        let cond = condition("semver", ">=", "ver", &["foo"]);
        assert!(!cond.meet(&user_with("ver", "1.0.0"), None));
        assert!(!cond.meet(&user_with("ver", "foo"), None));

        let cond = condition("semver", ">=", "ver", &["1.2.1"]);
        assert!(!cond.meet(&user_with("ver", "foo"), None));
        asserting!("versions are parsed strictly")
            .that(&cond.meet(&user_with("ver", "2.0"), None))
            .is_false();

        let cond = condition("semver", "~", "ver", &["1.2.1"]);
        assert!(!cond.meet(&user_with("ver", "1.2.1"), None));
    }

    #[test_case("=", &["1.0.0", "bad"], true ; "eq match before bad operand")]
    #[test_case("=", &["bad", "1.0.0"], false ; "eq bad operand before match")]
    #[test_case(">=", &["0.1.0", "bad"], true ; "ge match before bad operand")]
    #[test_case("<", &["0.1.0", "bad"], false ; "lt bad operand reached")]
    #[test_case("!=", &["1.0.0", "bad"], false ; "ne equal before bad operand")]
    #[test_case("!=", &["2.0.0", "bad"], false ; "ne bad operand reached")]
    #[test_case("!=", &["2.0.0", "3.0.0"], true ; "ne no bad operand")]
    fn semver_operands_are_walked_in_order(predicate: &str, objects: &[&str], expected: bool) {
        let cond = condition("semver", predicate, "ver", objects);
        assert_that!(cond.meet(&user_with("ver", "1.0.0"), None)).is_equal_to(expected);
    }

    #[test]
    fn segment_condition_without_segments() {
        let user = user_with("city", "100");
        for predicate in ["is in", "is not in", "invalid"] {
            let cond = condition("segment", predicate, "city?", &[]);
            assert_that!(cond.meet(&user, None)).is_false();
        }
    }

    #[test]
    fn segment_condition_with_store() {
        let store = TestStore::new();
        let in_city = user_with("city", "4");
        let elsewhere = user_with("city", "100");

        let is_in = condition("segment", "is in", "", &["some_segment1-fjoaefjaam"]);
        assert!(is_in.meet(&in_city, Some(&store)));
        assert!(!is_in.meet(&elsewhere, Some(&store)));

        let is_not_in = condition("segment", "is not in", "", &["some_segment1-fjoaefjaam"]);
        assert!(!is_not_in.meet(&in_city, Some(&store)));
        assert!(is_not_in.meet(&elsewhere, Some(&store)));
    }

    #[test]
    fn unknown_segment_is_not_a_member() {
        let store = TestStore::new();
        let user = user_with("city", "4");
        assert!(!condition("segment", "is in", "", &["nope"]).meet(&user, Some(&store)));
        assert!(condition("segment", "is not in", "", &["nope"]).meet(&user, Some(&store)));
    }

    #[test]
    fn unknown_type_never_matches() {
        let cond = condition("geo", "near", "city", &["4"]);
        assert!(!cond.meet(&user_with("city", "4"), None));
    }

    #[test]
    fn rule_hit_reports_missing_attribute() {
        let store = TestStore::new();
        let rule = Rule::new(
            vec![
                condition("string", "is one of", "city", &["1"]),
                condition("string", "is one of", "os", &["linux"]),
            ],
            Some(Serve::Select { select: 1 }),
        );

        let both = User::with_key("key").attr("city", "1").attr("os", "linux").build();
        assert_that!(rule.hit(&both, &store, "t"))
            .is_equal_to(HitResult::Hit(1));

        let only_city = user_with("city", "1");
        assert_that!(rule.hit(&only_city, &store, "t"))
            .is_equal_to(HitResult::Miss(Some(Warning::MissingAttribute {
                user_key: "key".into(),
                attribute: "os".into(),
            })));

        let wrong_city = User::with_key("key").attr("city", "2").attr("os", "linux").build();
        assert_that!(rule.hit(&wrong_city, &store, "t"))
            .is_equal_to(HitResult::Miss(None));
    }

    #[test]
    fn rule_hit_does_not_require_datetime_or_segment_attributes() {
        let store = TestStore::new();
        let rule = Rule::new(
            vec![
                condition("datetime", "after", "created", &["0"]),
                condition("segment", "is not in", "whatever", &["nope"]),
            ],
            Some(Serve::Select { select: 0 }),
        );
        let user = User::with_key("key").build();
        assert_that!(rule.hit(&user, &store, "t"))
            .is_equal_to(HitResult::Hit(0));
    }

    #[test]
    fn rule_without_serve_misses() {
        let store = TestStore::new();
        let rule = Rule::new(vec![], None);
        let user = User::with_key("key").build();
        assert_that!(rule.hit(&user, &store, "t"))
            .is_equal_to(HitResult::Miss(Some(Warning::MissingServe)));
    }

    #[test]
    fn rule_delegates_to_split() {
        let store = TestStore::new();
        // user1 salted with "t" lands somewhere in [0, 10000), a single full range catches it
        let rule = Rule::new(
            vec![],
            Some(Serve::Split {
                split: Split::new(vec![vec![], vec![[0, 10_000]]], None, None),
            }),
        );
        let user = User::with_key("user1").build();
        assert_that!(rule.hit(&user, &store, "t"))
            .is_equal_to(HitResult::Hit(1));
    }
}
