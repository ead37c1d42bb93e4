use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::debug;

use super::{BackendError, DataService, Filter, Query, Row, Table};
use crate::config::{BackendConfig, ConfigError};
use crate::session::Session;

/// HTTP client for the hosted table API (`<base>/rest/v1/<table>`).
#[derive(Clone)]
pub struct RestDataService {
    client: Client,
    base_url: String,
    api_key: String,
    bearer: Option<String>,
}

impl RestDataService {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("unistay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            bearer: None,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, RestSetupError> {
        let url = config.url.as_deref().ok_or(ConfigError::MissingBackendUrl)?;
        Ok(Self::new(url, config.api_key.clone(), config.timeout)?)
    }

    /// A copy of this client that authenticates as the signed-in user.
    pub fn for_session(&self, session: &Session) -> Self {
        let mut scoped = self.clone();
        scoped.bearer = session.access_token.clone();
        scoped
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn request(&self, method: Method, table: Table) -> RequestBuilder {
        let token = self.bearer.as_deref().unwrap_or(&self.api_key);
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .header("Prefer", "return=representation")
    }

    async fn read_rows(response: Response) -> Result<Vec<Row>, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<Vec<Row>>().await?)
    }
}

/// Failure to build a client from configuration.
#[derive(Debug, thiserror::Error)]
pub enum RestSetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[async_trait]
impl DataService for RestDataService {
    async fn select(&self, query: Query) -> Result<Vec<Row>, BackendError> {
        debug!(table = query.table.name(), "select");
        let response = self
            .request(Method::GET, query.table)
            .query(&query.to_params())
            .send()
            .await?;
        Self::read_rows(response).await
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, BackendError> {
        debug!(table = table.name(), "insert");
        let response = self
            .request(Method::POST, table)
            .json(&row)
            .send()
            .await?;
        Self::read_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("insert returned no representation".to_string()))
    }

    async fn update(
        &self,
        table: Table,
        filter: Filter,
        patch: Row,
    ) -> Result<Vec<Row>, BackendError> {
        debug!(table = table.name(), "update");
        let response = self
            .request(Method::PATCH, table)
            .query(&filter.to_query_pairs())
            .json(&patch)
            .send()
            .await?;
        Self::read_rows(response).await
    }

    async fn delete(&self, table: Table, filter: Filter) -> Result<Vec<Row>, BackendError> {
        debug!(table = table.name(), "delete");
        let response = self
            .request(Method::DELETE, table)
            .query(&filter.to_query_pairs())
            .send()
            .await?;
        Self::read_rows(response).await
    }
}
