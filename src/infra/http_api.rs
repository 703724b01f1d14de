//! `ItemsApi` over HTTP.

use async_trait::async_trait;
use itembank_api_types::{
    ApiErrorBody, ItemIdsRequest, ListItemsRequest, ListItemsResponse, MutationResponse,
    PurgeResponse,
};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::application::repos::{ApiError, ItemPage, ItemsApi, MutationOutcome};
use crate::config::ApiSettings;
use crate::domain::entities::ItemRecord;

use super::error::InfraError;

const LIST_PATH: &str = "items";
const DELETE_PATH: &str = "items/delete";
const RESTORE_PATH: &str = "items/restore";
const PURGE_PATH: &str = "items/permanent-delete";

#[derive(Debug, Clone)]
pub struct HttpItemsApi {
    client: Client,
    base: Url,
}

impl HttpItemsApi {
    pub fn new(settings: &ApiSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self {
            client,
            base: settings.base_url.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("itembank/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|err| ApiError::network(format!("invalid request url: {err}")))
    }

    async fn post_ids<T: DeserializeOwned>(&self, path: &str, ids: &[Uuid]) -> Result<T, ApiError> {
        let url = self.url(path)?;
        debug!(%url, count = ids.len(), "Posting item mutation");
        let body = ItemIdsRequest { ids: ids.to_vec() };
        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        handle(resp).await
    }
}

#[async_trait]
impl ItemsApi for HttpItemsApi {
    async fn list_items(&self, request: &ListItemsRequest) -> Result<ItemPage, ApiError> {
        let mut url = self.url(LIST_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(organization_id) = request.organization_id {
                query.append_pair("organizationId", &organization_id.to_string());
            }
            if let Some(item_type) = request.item_type {
                query.append_pair("type", item_type.as_str());
            }
            if let Some(status) = request.status {
                query.append_pair("status", status.as_str());
            }
            if let Some(search) = request.search.as_deref() {
                query.append_pair("search", search);
            }
            query.append_pair("showDeleted", if request.show_deleted { "true" } else { "false" });
            query.append_pair("limit", &request.limit.to_string());
            query.append_pair("offset", &request.offset.to_string());
        }

        debug!(%url, "Listing items");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        let page: ListItemsResponse = handle(resp).await?;
        Ok(ItemPage {
            items: page.items.into_iter().map(ItemRecord::from).collect(),
            total: page.total,
        })
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<MutationOutcome, ApiError> {
        let resp: MutationResponse = self.post_ids(DELETE_PATH, ids).await?;
        Ok(outcome(resp))
    }

    async fn restore(&self, ids: &[Uuid]) -> Result<MutationOutcome, ApiError> {
        let resp: MutationResponse = self.post_ids(RESTORE_PATH, ids).await?;
        Ok(outcome(resp))
    }

    async fn permanent_delete(&self, ids: &[Uuid]) -> Result<u64, ApiError> {
        let resp: PurgeResponse = self.post_ids(PURGE_PATH, ids).await?;
        Ok(resp.count)
    }
}

fn outcome(resp: MutationResponse) -> MutationOutcome {
    MutationOutcome {
        count: resp.count,
        items: resp.items.into_iter().map(ItemRecord::from).collect(),
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    ApiError::network(err.to_string())
}

async fn handle<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    let bytes = resp.bytes().await.map_err(transport_error)?;
    if !status.is_success() {
        let message = match serde_json::from_slice::<ApiErrorBody>(&bytes) {
            Ok(body) => body.message,
            Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
        };
        return Err(status_error(status, message));
    }
    serde_json::from_slice(&bytes)
        .map_err(|err| ApiError::decode(format!("failed to parse body: {err}")))
}

fn status_error(status: StatusCode, message: String) -> ApiError {
    let message = if message.trim().is_empty() {
        status.to_string()
    } else {
        message
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::permission(message),
        StatusCode::NOT_FOUND => ApiError::not_found(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::validation(message)
        }
        _ => ApiError::network(format!("status {status}: {message}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_error_taxonomy() {
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "no role".into()),
            ApiError::Permission { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            ApiError::Permission { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "gone".into()),
            ApiError::NotFound { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, "bad ids".into()),
            ApiError::Validation { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "upstream".into()),
            ApiError::Network { .. }
        ));
    }

    #[test]
    fn empty_message_falls_back_to_status_text() {
        let err = status_error(StatusCode::NOT_FOUND, "  ".into());
        assert_eq!(err, ApiError::not_found("404 Not Found"));
    }
}
