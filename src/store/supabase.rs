//! Supabase REST API client using service_role key

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use super::StoreError;
use crate::config::SupabaseConfig;

/// Supabase client for server-side database operations
/// Uses service_role key which bypasses RLS - handle with care!
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            service_role_key: config.service_role_key.clone(),
        }
    }

    /// Get the REST API URL for a table
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Start an authenticated request against a table
    fn request(&self, method: Method, table: &str, params: &[(String, String)]) -> RequestBuilder {
        self.client
            .request(method, self.rest_url(table))
            .query(params)
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .header("Content-Type", "application/json")
    }

    async fn send(request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.send().await.map_err(StoreError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status: status.as_u16(), body });
        }

        Ok(response)
    }

    /// Make an authenticated GET request
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(String, String)],
    ) -> Result<Vec<T>, StoreError> {
        let response = Self::send(self.request(Method::GET, table, params)).await?;
        response.json().await.map_err(StoreError::Parse)
    }

    /// Make an authenticated GET request expecting a single row
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(String, String)],
    ) -> Result<Option<T>, StoreError> {
        let request = self
            .request(Method::GET, table, params)
            .header("Accept", "application/vnd.pgrst.object+json");

        match Self::send(request).await {
            // No rows found
            Err(StoreError::Api { status, .. })
                if status == StatusCode::NOT_ACCEPTABLE.as_u16() =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
            Ok(response) => response.json().await.map(Some).map_err(StoreError::Parse),
        }
    }

    /// Make an authenticated POST request (insert)
    pub async fn insert<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        table: &str,
        data: &T,
    ) -> Result<R, StoreError> {
        let request = self
            .request(Method::POST, table, &[])
            .header("Prefer", "return=representation")
            .json(data);

        // PostgREST returns an array, get first element
        let results: Vec<R> = Self::send(request)
            .await?
            .json()
            .await
            .map_err(StoreError::Parse)?;
        results.into_iter().next().ok_or(StoreError::NoRowReturned)
    }

    /// Make an authenticated PATCH request (update), returning the updated rows
    pub async fn update<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(String, String)],
        data: &T,
    ) -> Result<Vec<R>, StoreError> {
        let request = self
            .request(Method::PATCH, table, params)
            .header("Prefer", "return=representation")
            .json(data);

        Self::send(request).await?.json().await.map_err(StoreError::Parse)
    }

    /// Make an authenticated DELETE request, returning the removed rows
    pub async fn delete<R: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(String, String)],
    ) -> Result<Vec<R>, StoreError> {
        let request = self
            .request(Method::DELETE, table, params)
            .header("Prefer", "return=representation");

        Self::send(request).await?.json().await.map_err(StoreError::Parse)
    }
}
