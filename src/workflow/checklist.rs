use uuid::Uuid;

use super::drafts::CommonDocs;

/// Document groups as stored on the server rows.
pub const GROUP_COMMON: &str = "common";
pub const GROUP_REQUIRED: &str = "required";
pub const GROUP_OTHER: &str = "other";

/// Fixed slots on the common-documents screen. Every service collects these
/// six regardless of sub-service.
pub const COMMON_DOCUMENTS: &[&str] = &[
    "Proof of Identity (Front)",
    "Proof of Identity (Back)",
    "Proof of Address (Front)",
    "Proof of Address (Back)",
    "DOB Certificate (Front)",
    "DOB Certificate (Back)",
];

/// Required documents per sub-service. The table is configuration carried
/// over verbatim; unlisted sub-services fall back to the default list.
const REQUIRED_DOCUMENTS: &[(&str, &[&str])] = &[
    (
        "New E-Katha Registration",
        &[
            "Pan Card",
            "Aadhar Card",
            "Birth Certificate",
            "Sale Deed",
            "Land Deed",
        ],
    ),
    (
        "Khata Bifurcation",
        &[
            "Pan Card",
            "Aadhar Card",
            "Existing Khata",
            "Property Documents",
            "NOC from Co-owners",
        ],
    ),
    (
        "Khata Amalgamation",
        &[
            "Pan Card",
            "Aadhar Card",
            "All Khata Certificates",
            "Property Documents",
            "Amalgamation Request Letter",
        ],
    ),
];

const DEFAULT_REQUIRED_DOCUMENTS: &[&str] = &[
    "Pan Card",
    "Aadhar Card",
    "Birth Certificate",
    "Sale Deed",
    "Land Deed",
];

/// Canonical required-document names for a sub-service. Lookup is by exact
/// label; unknown labels get the default list.
pub fn required_documents(sub_service: &str) -> &'static [&'static str] {
    REQUIRED_DOCUMENTS
        .iter()
        .find(|entry| entry.0 == sub_service)
        .map(|entry| entry.1)
        .unwrap_or(DEFAULT_REQUIRED_DOCUMENTS)
}

/// The common-documents screen only advances once every fixed slot has a
/// recorded file.
pub fn common_docs_complete(docs: &CommonDocs) -> bool {
    COMMON_DOCUMENTS.iter().all(|name| docs.is_recorded(name))
}

/// What the checklist needs to know about one stored document row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFacts {
    pub name: String,
    pub uploaded: bool,
    pub not_available: bool,
    pub document_id: Option<Uuid>,
}

/// Per-name completion state derived from the loaded rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentStatus {
    pub uploaded: bool,
    pub not_available: bool,
    pub document_id: Option<Uuid>,
}

pub fn status(name: &str, documents: &[DocumentFacts]) -> DocumentStatus {
    documents
        .iter()
        .find(|doc| doc.name == name)
        .map(|doc| DocumentStatus {
            uploaded: doc.uploaded,
            not_available: doc.not_available,
            document_id: doc.document_id,
        })
        .unwrap_or_default()
}

/// The sole gate for submission: every required name must be uploaded or
/// explicitly marked not-available. Extra documents are ignored.
pub fn is_complete(required: &[&str], documents: &[DocumentFacts]) -> bool {
    required.iter().all(|name| {
        let s = status(name, documents);
        s.uploaded || s.not_available
    })
}

/// Required names that fail the completeness check, in table order.
pub fn missing_documents<'a>(required: &[&'a str], documents: &[DocumentFacts]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|name| {
            let s = status(name, documents);
            !s.uploaded && !s.not_available
        })
        .collect()
}

/// Lifecycle of a single document tile on the review screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    Empty,
    /// A network upload is outstanding. Transient and cancel-free.
    Uploading,
    Uploaded,
    NotAvailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileEvent {
    UploadStarted,
    UploadSucceeded,
    UploadFailed(String),
    Delete,
    MarkNotAvailable,
    ClearNotAvailable,
}

/// One tile: its state plus any inline error from the last failed upload.
/// Tiles are independent; a failure on one never touches its siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub name: String,
    pub state: TileState,
    pub error: Option<String>,
}

impl Tile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: TileState::Empty,
            error: None,
        }
    }

    /// Applies an event, returning whether it was legal in the current state.
    /// Illegal events leave the tile untouched.
    pub fn apply(&mut self, event: TileEvent) -> bool {
        use TileState::*;
        let next = match (self.state, &event) {
            (Empty, TileEvent::UploadStarted) => Some(Uploading),
            (Uploading, TileEvent::UploadSucceeded) => Some(Uploaded),
            (Uploading, TileEvent::UploadFailed(_)) => Some(Empty),
            (Uploaded, TileEvent::Delete) => Some(Empty),
            (Empty, TileEvent::MarkNotAvailable) => Some(NotAvailable),
            (NotAvailable, TileEvent::ClearNotAvailable) => Some(Empty),
            _ => None,
        };

        match next {
            Some(state) => {
                self.error = match event {
                    TileEvent::UploadFailed(message) => Some(message),
                    _ => None,
                };
                self.state = state;
                true
            }
            None => false,
        }
    }
}
