use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Storage keys shared by the workflow screens. One owner, one schema; the
/// screens never invent their own key names.
pub mod keys {
    pub const CURRENT_PROJECT: &str = "workflow.current_project";
    pub const CURRENT_PROPERTY: &str = "workflow.current_property";
    pub const SELECTED_SERVICE: &str = "workflow.selected_service";
    pub const COMMON_DOCS: &str = "workflow.common_docs";
    pub const ACTIVE_SERVICE_REQUEST: &str = "workflow.active_service_request";
    pub const SELECTED_CHARGE_TYPE: &str = "workflow.selected_charge_type";

    pub fn payment_status(service_request_id: uuid::Uuid) -> String {
        format!("workflow.payment_status.{service_request_id}")
    }
}

/// Version stamped into every stored draft envelope. Bump when a draft record
/// changes shape; stale envelopes then read back as absent instead of
/// misparsing.
pub const DRAFT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    record: T,
}

/// Session-scoped key-value store for in-progress entities. Decoding failures
/// and version mismatches are treated as absence; nothing in the workflow may
/// assume a stored draft survives.
#[derive(Debug, Default)]
pub struct DraftStore {
    entries: BTreeMap<String, String>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes `record` under `key`, silently overwriting any previous
    /// value.
    pub fn put<T: Serialize>(&mut self, key: &str, record: &T) {
        let envelope = Envelope {
            version: DRAFT_SCHEMA_VERSION,
            record,
        };
        if let Ok(encoded) = serde_json::to_string(&envelope) {
            self.entries.insert(key.to_string(), encoded);
        }
    }

    /// Returns the decoded record, or `None` when the key is absent, the
    /// stored bytes are corrupt, or the envelope carries a different schema
    /// version.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.entries.get(key)?;
        let envelope: Envelope<T> = serde_json::from_str(raw).ok()?;
        (envelope.version == DRAFT_SCHEMA_VERSION).then_some(envelope.record)
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Raw insert bypassing the envelope. Exists so tests and migrations can
    /// model corrupt or foreign entries.
    pub fn put_raw(&mut self, key: &str, raw: impl Into<String>) {
        self.entries.insert(key.to_string(), raw.into());
    }
}

/// A project as drafted on the create-project screen. `remote_id` is set once
/// the record has been reconciled with the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub client_id: Uuid,
    pub remote_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub pr_number: Option<String>,
}

impl ProjectDraft {
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            remote_id: None,
            title: title.into(),
            description,
            pr_number: None,
        }
    }
}

/// Structured postal address captured by the property form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressFields {
    pub door_no: String,
    pub building_name: String,
    pub cross_road: String,
    pub main_road: String,
    pub landmark: String,
    pub area_name: String,
    pub state: String,
    pub zone: String,
    pub district: String,
    pub taluk: String,
    pub area_type: String,
    pub municipal_type: String,
    pub ward_or_panchayath: String,
    pub post_office: String,
    pub pincode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDraft {
    pub client_id: Uuid,
    pub remote_id: Option<Uuid>,
    pub property_type: String,
    pub property_name: String,
    pub size_unit: Option<String>,
    pub size_value: Option<f64>,
    pub address: AddressFields,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PropertyDraft {
    pub fn new(property_type: impl Into<String>, property_name: impl Into<String>) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            remote_id: None,
            property_type: property_type.into(),
            property_name: property_name.into(),
            size_unit: None,
            size_value: None,
            address: AddressFields::default(),
            latitude: None,
            longitude: None,
        }
    }
}

/// The main/sub service pair chosen on the selection screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSelection {
    pub main_service_id: String,
    pub main_service_label: String,
    pub sub_service: Option<String>,
}

/// File names recorded for the fixed common-document slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonDocs {
    pub entries: BTreeMap<String, String>,
}

impl CommonDocs {
    pub fn record(&mut self, doc_name: &str, file_name: &str) {
        self.entries
            .insert(doc_name.to_string(), file_name.to_string());
    }

    pub fn is_recorded(&self, doc_name: &str) -> bool {
        self.entries.contains_key(doc_name)
    }
}
