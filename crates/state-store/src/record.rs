use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{AggregateId, Version};

/// The persisted form of one aggregate instance.
///
/// Holds the serialized state together with the version it was at when
/// written. No event history is kept alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub aggregate_id: AggregateId,
    /// Together with `aggregate_id`, the storage key ("Order", "Kitchen", ...).
    pub aggregate_type: String,
    /// Number of events applied to `state`, and the token the next writer must present.
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: serde_json::Value,
}

impl StateRecord {
    /// Serializes `state` into a record ready for [`StateStore::save`](crate::StateStore::save).
    pub fn from_state<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        version: Version,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            version,
            created_at,
            updated_at,
            state: serde_json::to_value(state)?,
        })
    }

    /// Decodes the stored JSON back into the aggregate's state type.
    pub fn to_state<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        count: u32,
    }

    #[test]
    fn record_round_trips_state() {
        let id = AggregateId::new();
        let now = Utc::now();
        let record =
            StateRecord::from_state(id, "Counter", Version::new(3), now, now, &Counter { count: 3 })
                .unwrap();

        assert_eq!(record.aggregate_id, id);
        assert_eq!(record.aggregate_type, "Counter");
        assert_eq!(record.version, Version::new(3));
        assert_eq!(record.to_state::<Counter>().unwrap(), Counter { count: 3 });
    }

    #[test]
    fn to_state_reports_shape_mismatch() {
        let now = Utc::now();
        let record = StateRecord {
            aggregate_id: AggregateId::new(),
            aggregate_type: "Counter".to_string(),
            version: Version::first(),
            created_at: now,
            updated_at: now,
            state: serde_json::json!({"unexpected": true}),
        };
        assert!(record.to_state::<Counter>().is_err());
    }
}
