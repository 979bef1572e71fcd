use serde::{Deserialize, Serialize};

use crate::id::Id;

/// Identity and timestamp block embedded in most models.
///
/// The timestamps are logical: their unit and source belong to the caller.
/// keyline never sets them, it only reads them for the default list order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseInfo {
    #[serde(default, skip_serializing_if = "Id::is_empty")]
    pub id: Id,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub create_time: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub update_time: i64,
}

impl BaseInfo {
    pub fn new(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_times(mut self, create_time: i64, update_time: i64) -> Self {
        self.create_time = create_time;
        self.update_time = update_time;
        self
    }
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}
