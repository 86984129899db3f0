//! Arrival notifications: the push trigger between stages.
//!
//! RULE: Stages never call each other. A committed artifact produces a
//! notification; the claims stage runs once per notification it receives.
//! Delivery is at-least-once and unordered.
//!
//! The wire shape is the object-store event envelope:
//!
//! ```json
//! {"Records":[{"s3":{"bucket":{"name":"claims-risk-leakage"},
//!                    "object":{"key":"raw/fnol_events/fnol_20250615_120000.json"}}}]}
//! ```

use crate::{
    error::{PipelineError, PipelineResult},
    types::ObjectKey,
};
use serde::{Deserialize, Serialize};

/// One newly committed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalNotification {
    pub bucket: String,
    pub key: ObjectKey,
}

#[derive(Debug, Serialize, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "Records", default)]
    records: Vec<EventRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EventRecord {
    s3: StorageEntity,
}

#[derive(Debug, Serialize, Deserialize)]
struct StorageEntity {
    bucket: BucketRef,
    object: ObjectRef,
}

#[derive(Debug, Serialize, Deserialize)]
struct BucketRef {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectRef {
    key: String,
}

impl ArrivalNotification {
    pub fn new(bucket: impl Into<String>, key: impl Into<ObjectKey>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse an event envelope. Only the first record is consumed; one
    /// notification drives exactly one invocation.
    pub fn from_event_json(json: &str) -> PipelineResult<Self> {
        let envelope: EventEnvelope =
            serde_json::from_str(json).map_err(|e| PipelineError::InvalidNotification {
                reason: e.to_string(),
            })?;
        let first = envelope
            .records
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::InvalidNotification {
                reason: "event carries no records".into(),
            })?;
        if first.s3.object.key.is_empty() {
            return Err(PipelineError::InvalidNotification {
                reason: "object key is empty".into(),
            });
        }
        Ok(Self::new(first.s3.bucket.name, first.s3.object.key))
    }

    pub fn to_event_json(&self) -> PipelineResult<String> {
        let envelope = EventEnvelope {
            records: vec![EventRecord {
                s3: StorageEntity {
                    bucket: BucketRef {
                        name: self.bucket.clone(),
                    },
                    object: ObjectRef {
                        key: self.key.clone(),
                    },
                },
            }],
        };
        Ok(serde_json::to_string(&envelope)?)
    }
}

/// Which committed keys a consumer wants to hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub prefix: String,
    pub suffix: String,
}

impl Subscription {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        key.starts_with(&self.prefix) && key.ends_with(&self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_record_only() {
        let json = r#"{"Records":[
            {"eventName":"ObjectCreated:Put","s3":{"bucket":{"name":"b1","arn":"x"},"object":{"key":"raw/fnol_events/a.json","size":10}}},
            {"s3":{"bucket":{"name":"b2"},"object":{"key":"raw/fnol_events/b.json"}}}
        ]}"#;
        let n = ArrivalNotification::from_event_json(json).unwrap();
        assert_eq!(n, ArrivalNotification::new("b1", "raw/fnol_events/a.json"));
    }

    #[test]
    fn event_json_round_trips() {
        let n = ArrivalNotification::new("claims-risk-leakage", "raw/fnol_events/fnol_1.json");
        let back = ArrivalNotification::from_event_json(&n.to_event_json().unwrap()).unwrap();
        assert_eq!(back, n);
    }

    #[test]
    fn empty_or_garbled_events_rejected() {
        for json in [r#"{"Records":[]}"#, "{}", "not json", r#"{"Records":[{"s3":{}}]}"#] {
            assert!(matches!(
                ArrivalNotification::from_event_json(json),
                Err(PipelineError::InvalidNotification { .. })
            ));
        }
    }

    #[test]
    fn subscription_filters_prefix_and_suffix() {
        let sub = Subscription::new("raw/fnol_events/", ".json");
        assert!(sub.matches("raw/fnol_events/fnol_1.json"));
        assert!(!sub.matches("raw/fnol_events/fnol_1.csv"));
        assert!(!sub.matches("raw/claims_history/claims_1.json"));
    }
}
