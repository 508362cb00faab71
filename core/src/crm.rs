//! CRM collaborator interface.
//!
//! The CRM is an external system reached through a request/response
//! interface keyed by contact id. The core treats every id it returns as an
//! opaque string; eligibility decisions go through the catalog resolver.

use crate::types::{ContactId, CustomObjectId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// CRM collaborator failures; always transient from the core's view.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CrmError {
    /// The CRM was unreachable or answered with a server error.
    #[error("CRM request failed: {0}")]
    Transport(String),

    /// The CRM answered with data the core could not interpret.
    #[error("CRM returned malformed data: {0}")]
    Malformed(String),
}

/// A CRM contact record, as much of it as the booking flow needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Contact id, echoed back opaque.
    pub id: ContactId,
    /// Contact email address.
    pub email: String,
    /// Preferred language (catalog variant selector), e.g. `"it"`.
    pub language: String,
}

/// A CRM custom object associated with a contact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomObject {
    /// Custom-object id; may be numeric-looking, treated as opaque.
    pub id: CustomObjectId,
    /// Loose property bag.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// Request/response interface to the CRM.
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Looks up a contact record; `None` when the CRM has no such contact.
    ///
    /// # Errors
    ///
    /// `CrmError` when the CRM cannot be reached or answers garbage.
    async fn lookup_contact(&self, contact_id: &ContactId)
        -> Result<Option<ContactRecord>, CrmError>;

    /// Custom objects associated with a contact.
    ///
    /// # Errors
    ///
    /// `CrmError` when the CRM cannot be reached or answers garbage.
    async fn associated_custom_objects(
        &self,
        contact_id: &ContactId,
    ) -> Result<Vec<CustomObject>, CrmError>;

    /// Writes properties back onto the contact (e.g. last booking ref).
    ///
    /// # Errors
    ///
    /// `CrmError` when the CRM cannot be reached.
    async fn update_contact_properties(
        &self,
        contact_id: &ContactId,
        properties: &HashMap<String, String>,
    ) -> Result<(), CrmError>;
}

/// In-memory CRM double for tests and local runs.
#[derive(Default)]
pub struct InMemoryCrm {
    contacts: RwLock<HashMap<ContactId, ContactRecord>>,
    associations: RwLock<HashMap<ContactId, Vec<CustomObject>>>,
    properties: RwLock<HashMap<ContactId, HashMap<String, String>>>,
}

impl InMemoryCrm {
    /// Creates an empty CRM double.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a contact with its custom-object associations.
    pub async fn seed_contact(
        &self,
        record: ContactRecord,
        custom_object_ids: &[&str],
    ) {
        let objects = custom_object_ids
            .iter()
            .map(|id| CustomObject {
                id: CustomObjectId::new(*id),
                properties: HashMap::new(),
            })
            .collect();
        self.associations
            .write()
            .await
            .insert(record.id.clone(), objects);
        self.contacts.write().await.insert(record.id.clone(), record);
    }

    /// Properties written back for a contact so far.
    pub async fn written_properties(&self, contact_id: &ContactId) -> HashMap<String, String> {
        self.properties
            .read()
            .await
            .get(contact_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CrmClient for InMemoryCrm {
    async fn lookup_contact(
        &self,
        contact_id: &ContactId,
    ) -> Result<Option<ContactRecord>, CrmError> {
        Ok(self.contacts.read().await.get(contact_id).cloned())
    }

    async fn associated_custom_objects(
        &self,
        contact_id: &ContactId,
    ) -> Result<Vec<CustomObject>, CrmError> {
        Ok(self
            .associations
            .read()
            .await
            .get(contact_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_contact_properties(
        &self,
        contact_id: &ContactId,
        properties: &HashMap<String, String>,
    ) -> Result<(), CrmError> {
        self.properties
            .write()
            .await
            .entry(contact_id.clone())
            .or_default()
            .extend(properties.clone());
        Ok(())
    }
}
