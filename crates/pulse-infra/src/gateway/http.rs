//! Live gateway - talks to the hosted feed backend over HTTP/JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use pulse_core::GatewayError;
use pulse_core::domain::RecordId;
use pulse_core::ports::{Collection, EntityGateway, Fields, ListQuery, Record};
use pulse_shared::ApiResponse;

const PROJECT_ID_HEADER: &str = "x-project-id";
const PUBLIC_KEY_HEADER: &str = "x-public-key";

/// Connection settings for the feed backend.
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    pub base_url: String,
    pub project_id: Option<String>,
    pub public_key: Option<String>,
    pub timeout: Duration,
}

impl HttpGatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            project_id: None,
            public_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP implementation of the entity gateway.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            (PROJECT_ID_HEADER, &config.project_id),
            (PUBLIC_KEY_HEADER, &config.public_key),
        ] {
            if let Some(value) = value {
                let value = HeaderValue::from_str(value)
                    .map_err(|e| GatewayError::Transport(format!("invalid {name} header: {e}")))?;
                headers.insert(HeaderName::from_static(name), value);
            }
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.base_url, collection.table_name())
    }

    fn record_url(&self, collection: Collection, id: RecordId) -> String {
        format!("{}/{}/{}", self.base_url, collection.table_name(), id)
    }

    /// Send a request and unwrap transport-level failures. `id` names the
    /// record a 404 refers to.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        collection: Collection,
        id: Option<RecordId>,
    ) -> Result<ApiResponse<T>, GatewayError> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(match id {
                Some(id) => GatewayError::NotFound { collection, id },
                None => GatewayError::Transport(format!("{collection} endpoint not found")),
            });
        }

        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ApiResponse<serde_json::Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or(body);
            return Err(GatewayError::Validation(reason));
        }

        if !status.is_success() {
            tracing::warn!(%collection, %status, "Feed backend returned an error status");
            return Err(GatewayError::Transport(format!("backend returned {status}")));
        }

        response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

/// Extract the payload of a successful envelope. `rejected` builds the error
/// for `success: false`.
fn payload<T>(envelope: ApiResponse<T>, rejected: fn(String) -> GatewayError) -> Result<T, GatewayError> {
    if !envelope.success {
        return Err(rejected(envelope.reason().to_string()));
    }
    envelope
        .data
        .ok_or_else(|| GatewayError::Decode("response envelope has no data".to_string()))
}

#[async_trait]
impl EntityGateway for HttpGateway {
    async fn list(&self, collection: Collection, query: &ListQuery) -> Result<Vec<Record>, GatewayError> {
        let request = self
            .client
            .post(format!("{}/query", self.collection_url(collection)))
            .json(query);
        let envelope = self.execute::<Vec<Record>>(request, collection, None).await?;

        if !envelope.success {
            return Err(GatewayError::Transport(envelope.reason().to_string()));
        }
        // An empty collection may come back without `data`.
        Ok(envelope.data.unwrap_or_default())
    }

    async fn get_by_id(&self, collection: Collection, id: RecordId) -> Result<Option<Record>, GatewayError> {
        let request = self.client.get(self.record_url(collection, id));

        match self.execute::<Record>(request, collection, Some(id)).await {
            Ok(envelope) if envelope.success => Ok(envelope.data),
            Ok(envelope) => Err(GatewayError::Transport(envelope.reason().to_string())),
            Err(GatewayError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, collection: Collection, fields: Fields) -> Result<Record, GatewayError> {
        let request = self.client.post(self.collection_url(collection)).json(&fields);
        let envelope = self.execute::<Record>(request, collection, None).await?;
        payload(envelope, GatewayError::Validation)
    }

    async fn update(&self, collection: Collection, id: RecordId, fields: Fields) -> Result<Record, GatewayError> {
        let request = self.client.patch(self.record_url(collection, id)).json(&fields);
        let envelope = self.execute::<Record>(request, collection, Some(id)).await?;
        payload(envelope, GatewayError::Transport)
    }

    async fn delete(&self, collection: Collection, id: RecordId) -> Result<bool, GatewayError> {
        let request = self.client.delete(self.record_url(collection, id));
        let envelope = self.execute::<bool>(request, collection, Some(id)).await?;
        payload(envelope, GatewayError::Transport)
    }
}
