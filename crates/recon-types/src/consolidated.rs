use serde::{Deserialize, Serialize};

use crate::contact::ContactId;

/// Aggregated view of one identity.
///
/// `emails` and `phone_numbers` hold distinct values with the primary's own
/// values first. `secondary_contact_ids` lists every contact linked to the
/// primary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedContact {
    pub primary_contact_id: ContactId,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub secondary_contact_ids: Vec<ContactId>,
}

impl ConsolidatedContact {
    /// Returns `true` if `id` is the primary or one of the secondaries.
    pub fn contains(&self, id: ContactId) -> bool {
        self.primary_contact_id == id || self.secondary_contact_ids.contains(&id)
    }
}

/// Body of a successful identify call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyResponse {
    pub contact: ConsolidatedContact,
}

impl From<ConsolidatedContact> for IdentifyResponse {
    fn from(contact: ConsolidatedContact) -> Self {
        Self { contact }
    }
}
