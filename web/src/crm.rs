//! HTTP-backed CRM collaborator.
//!
//! Talks to the CRM gateway over JSON. The gateway is loosely typed:
//! custom-object ids arrive as numbers or strings interchangeably, so the
//! wire layer stringifies them once, here, and everything downstream sees
//! opaque strings.

use crate::config::CrmConfig;
use async_trait::async_trait;
use openday_core::crm::{ContactRecord, CrmClient, CrmError, CustomObject};
use openday_core::{ContactId, CustomObjectId};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// CRM client over a JSON HTTP gateway.
pub struct HttpCrmClient {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

/// Contact as the gateway serializes it.
#[derive(Debug, Deserialize)]
struct ContactDto {
    id: serde_json::Value,
    email: String,
    #[serde(default = "default_language")]
    language: String,
}

/// Custom object as the gateway serializes it; `id` may be a number.
#[derive(Debug, Deserialize)]
struct CustomObjectDto {
    id: serde_json::Value,
    #[serde(default)]
    properties: HashMap<String, String>,
}

fn default_language() -> String {
    "it".to_string()
}

/// Stringifies a loosely-typed gateway id.
fn id_to_string(value: &serde_json::Value) -> Result<String, CrmError> {
    match value {
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(CrmError::Malformed(format!(
            "id is neither string nor number: {other}"
        ))),
    }
}

impl HttpCrmClient {
    /// Builds a client from config.
    ///
    /// # Errors
    ///
    /// `CrmError::Transport` when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: &CrmConfig) -> Result<Self, CrmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| CrmError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            client,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

#[async_trait]
impl CrmClient for HttpCrmClient {
    async fn lookup_contact(
        &self,
        contact_id: &ContactId,
    ) -> Result<Option<ContactRecord>, CrmError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/contacts/{contact_id}"),
            )
            .send()
            .await
            .map_err(|e| CrmError::Transport(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| CrmError::Transport(e.to_string()))?;
        let dto: ContactDto = response
            .json()
            .await
            .map_err(|e| CrmError::Malformed(e.to_string()))?;

        Ok(Some(ContactRecord {
            id: ContactId::new(id_to_string(&dto.id)?),
            email: dto.email,
            language: dto.language,
        }))
    }

    async fn associated_custom_objects(
        &self,
        contact_id: &ContactId,
    ) -> Result<Vec<CustomObject>, CrmError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/contacts/{contact_id}/custom-objects"),
            )
            .send()
            .await
            .map_err(|e| CrmError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| CrmError::Transport(e.to_string()))?;

        let dtos: Vec<CustomObjectDto> = response
            .json()
            .await
            .map_err(|e| CrmError::Malformed(e.to_string()))?;

        dtos.into_iter()
            .map(|dto| {
                Ok(CustomObject {
                    id: CustomObjectId::new(id_to_string(&dto.id)?),
                    properties: dto.properties,
                })
            })
            .collect()
    }

    async fn update_contact_properties(
        &self,
        contact_id: &ContactId,
        properties: &HashMap<String, String>,
    ) -> Result<(), CrmError> {
        self.request(
            reqwest::Method::PATCH,
            &format!("/contacts/{contact_id}/properties"),
        )
        .json(properties)
        .send()
        .await
        .map_err(|e| CrmError::Transport(e.to_string()))?
        .error_for_status()
        .map_err(|e| CrmError::Transport(e.to_string()))?;
        Ok(())
    }
}
