use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, Response,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::DatabaseError;
use crate::query::QueryBuilder;

#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.anon_key) {
            headers.insert("apikey", key);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, bearer);
            }
        }

        headers
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<Response, DatabaseError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token);
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => DatabaseError::Unauthorized(error_text),
                404 => DatabaseError::NotFound(error_text),
                409 => DatabaseError::Conflict(error_text),
                code => DatabaseError::Api { status: code, body: error_text },
            });
        }

        Ok(response)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         headers: Option<HeaderMap>)
                                         -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        let response = self.send(method, path, auth_token, body, headers).await?;
        let bytes = response.bytes().await?;
        let data = serde_json::from_slice::<T>(&bytes)?;
        Ok(data)
    }

    /// Rows of `table` matching `query`.
    pub async fn select<T>(&self, table: &str, query: &QueryBuilder, auth_token: &str)
                           -> Result<Vec<T>, DatabaseError>
    where T: DeserializeOwned {
        self.request(Method::GET, &query.to_path(table), Some(auth_token), None).await
    }

    /// First row of `table` matching `query`, if any.
    pub async fn select_one<T>(&self, table: &str, query: QueryBuilder, auth_token: &str)
                               -> Result<Option<T>, DatabaseError>
    where T: DeserializeOwned {
        let rows: Vec<T> = self.select(table, &query.limit(1), auth_token).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn exists(&self, table: &str, query: QueryBuilder, auth_token: &str)
                        -> Result<bool, DatabaseError> {
        let rows: Vec<Value> = self.select(table, &query.select("id").limit(1), auth_token).await?;
        Ok(!rows.is_empty())
    }

    pub async fn count(&self, table: &str, query: QueryBuilder, auth_token: &str)
                       -> Result<usize, DatabaseError> {
        let rows: Vec<Value> = self.select(table, &query.select("id"), auth_token).await?;
        Ok(rows.len())
    }

    /// Insert one row and return the stored representation.
    pub async fn insert<T>(&self, table: &str, row: Value, auth_token: &str)
                           -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        let rows: Vec<T> = self.request_with_headers(
            Method::POST,
            &format!("/rest/v1/{}", table),
            Some(auth_token),
            Some(row),
            Some(Self::representation_headers()),
        ).await?;

        rows.into_iter().next().ok_or_else(|| DatabaseError::EmptyResult(table.to_string()))
    }

    pub async fn insert_many(&self, table: &str, rows: Vec<Value>, auth_token: &str)
                             -> Result<Vec<Value>, DatabaseError> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        self.request_with_headers(
            Method::POST,
            &format!("/rest/v1/{}", table),
            Some(auth_token),
            Some(Value::Array(rows)),
            Some(Self::representation_headers()),
        ).await
    }

    /// Patch matching rows and return the first updated one; `None` when
    /// nothing matched.
    pub async fn update<T>(&self, table: &str, query: &QueryBuilder, patch: Value, auth_token: &str)
                           -> Result<Option<T>, DatabaseError>
    where T: DeserializeOwned {
        let rows: Vec<T> = self.request_with_headers(
            Method::PATCH,
            &query.to_path(table),
            Some(auth_token),
            Some(patch),
            Some(Self::representation_headers()),
        ).await?;

        Ok(rows.into_iter().next())
    }

    pub async fn delete(&self, table: &str, query: &QueryBuilder, auth_token: &str)
                        -> Result<(), DatabaseError> {
        if query.is_empty() {
            return Err(DatabaseError::UnfilteredDelete(table.to_string()));
        }
        self.send(Method::DELETE, &query.to_path(table), Some(auth_token), None, None).await?;
        Ok(())
    }

    /// Call a database function through `/rest/v1/rpc/<name>`.
    pub async fn rpc<T>(&self, function: &str, args: Value, auth_token: &str)
                        -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        self.request(
            Method::POST,
            &format!("/rest/v1/rpc/{}", function),
            Some(auth_token),
            Some(args),
        ).await
    }

    pub async fn get_user_profile(&self, auth_token: &str) -> Result<Value, DatabaseError> {
        self.request::<Value>(
            Method::GET,
            "/auth/v1/user",
            Some(auth_token),
            None,
        ).await
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
