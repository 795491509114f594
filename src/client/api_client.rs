//! HTTP client for the appointment API.

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use super::ClientError;
use crate::models::{Appointment, AppointmentFields};

#[derive(Debug, Clone)]
pub struct AppointmentsClient {
    base_url: String,
    client: reqwest::Client,
}

impl AppointmentsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/api/appointments", self.base_url)
    }

    fn item_url(&self, id: &Uuid) -> String {
        format!("{}/api/appointments/{id}", self.base_url)
    }

    pub async fn list(&self) -> Result<Vec<Appointment>, ClientError> {
        let response = self
            .client
            .get(self.collection_url())
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        decode(response).await
    }

    pub async fn create(&self, fields: &AppointmentFields) -> Result<Appointment, ClientError> {
        let response = self
            .client
            .post(self.collection_url())
            .json(fields)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        decode(response).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Appointment, ClientError> {
        let response = self
            .client
            .get(self.item_url(id))
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        decode(response).await
    }

    /// Partial update; `changes` holds only the fields to replace.
    pub async fn update(&self, id: &Uuid, changes: &Value) -> Result<Appointment, ClientError> {
        let response = self
            .client
            .put(self.item_url(id))
            .json(changes)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        decode(response).await
    }

    /// Returns the server's confirmation message.
    pub async fn delete(&self, id: &Uuid) -> Result<String, ClientError> {
        let response = self
            .client
            .delete(self.item_url(id))
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let body: Value = decode(response).await?;
        Ok(body["message"].as_str().unwrap_or_default().to_string())
    }
}

/// Map non-2xx statuses to `ClientError::Http` carrying the server's
/// `message`, and decode success bodies as `T`.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v["message"].as_str().map(str::to_string))
            .unwrap_or(text);
        return Err(ClientError::Http {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}
