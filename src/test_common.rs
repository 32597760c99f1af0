#![cfg(test)]

use std::collections::HashMap;
use std::sync::Mutex;

use crate::client::{EvaluationEvent, EvaluationRecorder};
use crate::segment::Segment;
use crate::store::Store;
use crate::toggle::Toggle;

const TOGGLES_JSON: &str = r#"{
    "json_toggle": {
        "key": "json_toggle",
        "enabled": true,
        "version": 3,
        "forClient": true,
        "disabledServe": {"select": 0},
        "defaultServe": {"select": 0},
        "rules": [
            {
                "serve": {"select": 1},
                "conditions": [
                    {
                        "type": "segment",
                        "subject": "user",
                        "predicate": "is in",
                        "objects": ["some_segment1-fjoaefjaam"]
                    }
                ]
            }
        ],
        "variations": [{"variation_0": "v1"}, {"variation_1": "v2"}]
    },
    "not_in_segment": {
        "key": "not_in_segment",
        "enabled": true,
        "version": 1,
        "disabledServe": {"select": 0},
        "defaultServe": {"select": 0},
        "rules": [
            {
                "serve": {"select": 1},
                "conditions": [
                    {
                        "type": "segment",
                        "subject": "user",
                        "predicate": "is not in",
                        "objects": ["some_segment1-fjoaefjaam"]
                    }
                ]
            }
        ],
        "variations": [{"not_in": false}, {"not_in": true}]
    },
    "multi_condition_toggle": {
        "key": "multi_condition_toggle",
        "enabled": true,
        "version": 1,
        "disabledServe": {"select": 1},
        "defaultServe": {"select": 1},
        "rules": [
            {
                "serve": {"select": 0},
                "conditions": [
                    {"type": "string", "subject": "city", "predicate": "is one of", "objects": ["1"]},
                    {"type": "string", "subject": "os", "predicate": "is one of", "objects": ["linux"]}
                ]
            }
        ],
        "variations": [{"variation_0": ""}, {"variation_1": ""}]
    },
    "disabled_toggle": {
        "key": "disabled_toggle",
        "enabled": false,
        "version": 2,
        "disabledServe": {"select": 1},
        "defaultServe": {"select": 0},
        "rules": [],
        "variations": [false, true]
    },
    "warning_toggle": {
        "key": "warning_toggle",
        "enabled": true,
        "version": 1,
        "disabledServe": {"select": 0},
        "defaultServe": {"select": 0},
        "rules": [
            {
                "serve": {"select": 1},
                "conditions": [
                    {"type": "string", "subject": "os", "predicate": "is one of", "objects": ["linux"]}
                ]
            },
            {
                "serve": {"select": 1},
                "conditions": [
                    {"type": "string", "subject": "city", "predicate": "is one of", "objects": ["1"]}
                ]
            }
        ],
        "variations": [false, true]
    },
    "rule_order_toggle": {
        "key": "rule_order_toggle",
        "enabled": true,
        "version": 1,
        "disabledServe": {"select": 0},
        "defaultServe": {"select": 0},
        "rules": [
            {
                "serve": {"select": 1},
                "conditions": [
                    {"type": "number", "subject": "count", "predicate": ">", "objects": ["10"]}
                ]
            },
            {
                "serve": {"select": 0},
                "conditions": [
                    {"type": "string", "subject": "name", "predicate": "starts with", "objects": ["vip"]}
                ]
            }
        ],
        "variations": ["zero", "one"]
    },
    "split_toggle": {
        "key": "split_toggle",
        "enabled": true,
        "version": 1,
        "disabledServe": {"select": 0},
        "defaultServe": {
            "split": {"distribution": [[[0, 5000]], [[5000, 10000]]]}
        },
        "rules": [],
        "variations": ["red", "blue"]
    },
    "gap_toggle": {
        "key": "gap_toggle",
        "enabled": true,
        "version": 1,
        "disabledServe": {"select": 0},
        "defaultServe": {
            "split": {"distribution": [[[0, 5000]], [[5000, 9000]]], "salt": "toggle"}
        },
        "rules": [],
        "variations": ["red", "blue"]
    },
    "bucket_by_toggle": {
        "key": "bucket_by_toggle",
        "enabled": true,
        "version": 1,
        "disabledServe": {"select": 1},
        "defaultServe": {"select": 1},
        "rules": [
            {
                "serve": {
                    "split": {"distribution": [[[0, 10000]]], "bucketBy": "name"}
                },
                "conditions": []
            }
        ],
        "variations": ["named", "fallback"]
    },
    "number_toggle": {
        "key": "number_toggle",
        "enabled": true,
        "version": 1,
        "disabledServe": {"select": 0},
        "defaultServe": {"select": 1},
        "rules": [],
        "variations": [1, 2.5]
    },
    "no_default_toggle": {
        "key": "no_default_toggle",
        "enabled": true,
        "version": 1,
        "rules": [],
        "variations": [true]
    },
    "bad_index_toggle": {
        "key": "bad_index_toggle",
        "enabled": true,
        "version": 1,
        "disabledServe": {"select": 0},
        "defaultServe": {"select": 5},
        "rules": [],
        "variations": [true, false]
    }
}"#;

const SEGMENTS_JSON: &str = r#"{
    "some_segment1-fjoaefjaam": {
        "key": "some_segment1-fjoaefjaam",
        "uniqueId": "some_segment1-fjoaefjaam-unique",
        "version": 2,
        "rules": [
            {
                "conditions": [
                    {"type": "string", "subject": "city", "predicate": "is one of", "objects": ["1", "2", "3", "4"]}
                ]
            }
        ]
    },
    "nested_segment": {
        "key": "nested_segment",
        "uniqueId": "nested_segment-unique",
        "version": 1,
        "rules": [
            {
                "conditions": [
                    {"type": "segment", "subject": "user", "predicate": "is in", "objects": ["some_segment1-fjoaefjaam"]}
                ]
            }
        ]
    },
    "cycle_a": {
        "key": "cycle_a",
        "rules": [
            {
                "conditions": [
                    {"type": "segment", "subject": "user", "predicate": "is in", "objects": ["cycle_b"]}
                ]
            }
        ]
    },
    "cycle_b": {
        "key": "cycle_b",
        "rules": [
            {
                "conditions": [
                    {"type": "segment", "subject": "user", "predicate": "is in", "objects": ["cycle_a"]}
                ]
            }
        ]
    }
}"#;

/// The fixture toggles and segments as one snapshot document.
pub fn snapshot_json() -> String {
    format!(
        r#"{{"toggles": {}, "segments": {}}}"#,
        TOGGLES_JSON, SEGMENTS_JSON
    )
}

pub struct TestStore {
    toggles: HashMap<String, Toggle>,
    segments: HashMap<String, Segment>,
}

impl TestStore {
    pub fn new() -> Self {
        Self::new_from_json_str(TOGGLES_JSON, SEGMENTS_JSON)
    }

    pub fn new_from_json_str(toggle_json: &str, segment_json: &str) -> Self {
        let toggles = serde_json::from_str(toggle_json).unwrap();
        let segments = serde_json::from_str(segment_json).unwrap();

        Self { toggles, segments }
    }

    pub fn update_toggle(&mut self, toggle_key: &str, fun: fn(&mut Toggle)) {
        let toggle = self.toggles.get_mut(toggle_key).unwrap();
        fun(toggle);
    }
}

impl Store for TestStore {
    fn toggle(&self, toggle_key: &str) -> Option<&Toggle> {
        self.toggles.get(toggle_key)
    }

    fn segment(&self, segment_key: &str) -> Option<&Segment> {
        self.segments.get(segment_key)
    }
}

#[derive(Default)]
pub struct InMemoryEvaluationRecorder {
    pub events: Mutex<Vec<EvaluationEvent>>,
}

impl InMemoryEvaluationRecorder {
    pub fn events(&self) -> Vec<EvaluationEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EvaluationRecorder for InMemoryEvaluationRecorder {
    fn record(&self, event: EvaluationEvent) {
        self.events.lock().unwrap().push(event);
    }
}
