use serde::Serialize;
use serde_json::Value;

use crate::actor::DatasetItem;

/// Stand-in for any field the actor did not return
pub const PLACEHOLDER: &str = "N/A";

/// Dataset keys flattened into a record, in output order:
/// title, salary, employment type, organization, location, rating,
/// description, external link
pub const RECORD_FIELDS: [&str; 8] = [
    "positionName",
    "salary",
    "jobType",
    "company",
    "location",
    "rating",
    "description",
    "externalApplyLink",
];

/// One job posting flattened to a fixed 8-column row
///
/// Serialized as a JSON array so spreadsheet exporters always see the same
/// column layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord([Value; 8]);

impl JobRecord {
    /// Flatten a dataset item. Missing and `null` fields become [`PLACEHOLDER`];
    /// present values keep their JSON type.
    pub fn from_item(item: &DatasetItem) -> Self {
        Self(RECORD_FIELDS.map(|key| match item.get(key) {
            Some(value) if !value.is_null() => value.clone(),
            _ => Value::String(PLACEHOLDER.to_string()),
        }))
    }

    pub fn fields(&self) -> &[Value; 8] {
        &self.0
    }

    /// Value of a column by its dataset key
    pub fn get(&self, key: &str) -> Option<&Value> {
        RECORD_FIELDS
            .iter()
            .position(|field| *field == key)
            .map(|i| &self.0[i])
    }
}
