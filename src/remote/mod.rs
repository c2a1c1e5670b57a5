//! HTTP client for the hosted backend: row store, blob storage and remote
//! function invocation. Rows come back as loosely-typed JSON; callers decode
//! them into typed records with [`decode_rows`] and get a structured error on
//! shape mismatch.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("unexpected row shape in {table}: {source}")]
    RowShape {
        table: String,
        source: serde_json::Error,
    },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shared handle to the backend. Cheap to clone per screen is not needed:
/// every screen borrows the one handle owned by the app.
pub struct Remote {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Remote {
    /// `base_url` should be like `https://xyz.supabase.co` (no trailing slash).
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Start a row query against a named collection.
    pub fn table(&self, name: &str) -> TableQuery<'_> {
        TableQuery {
            remote: self,
            table: name.to_string(),
            params: Vec::new(),
        }
    }

    /// Insert one row, returning the stored representation.
    pub async fn insert(&self, table: &str, body: &Value) -> Result<Vec<Value>, RemoteError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        debug!(table, "inserting row");
        let resp = self
            .authed(self.http.post(&url))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        Self::rows_from(resp).await
    }

    /// Update rows matching `id`, returning the stored representation.
    pub async fn update_by_id(
        &self,
        table: &str,
        id: &str,
        body: &Value,
    ) -> Result<Vec<Value>, RemoteError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        debug!(table, id, "updating row");
        let resp = self
            .authed(self.http.patch(&url))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        Self::rows_from(resp).await
    }

    pub async fn delete_by_id(&self, table: &str, id: &str) -> Result<(), RemoteError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        debug!(table, id, "deleting row");
        let resp = self
            .authed(self.http.delete(&url))
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Upload bytes to blob storage under `bucket/path`.
    pub async fn storage_upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), RemoteError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);
        debug!(bucket, path, size = bytes.len(), "uploading object");
        let resp = self
            .authed(self.http.post(&url))
            .header("Content-Type", content_type.to_string())
            .body(bytes)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Public retrieval URL for a stored object. No request is made; the
    /// bucket is assumed public.
    pub fn storage_public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }

    /// Invoke a remote function with a JSON payload and parse the JSON reply.
    pub async fn invoke(&self, function: &str, body: &Value) -> Result<Value, RemoteError> {
        let url = format!("{}/functions/v1/{}", self.base_url, function);
        debug!(function, "invoking remote function");
        let resp = self.authed(self.http.post(&url)).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }

    async fn rows_from(resp: reqwest::Response) -> Result<Vec<Value>, RemoteError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }
}

/// Builder for PostgREST-style row queries.
pub struct TableQuery<'a> {
    remote: &'a Remote,
    table: String,
    params: Vec<(String, String)>,
}

impl<'a> TableQuery<'a> {
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".into(), columns.into()));
        self
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.params.push((column.into(), format!("eq.{value}")));
        self
    }

    pub fn gte(mut self, column: &str, value: &str) -> Self {
        self.params.push((column.into(), format!("gte.{value}")));
        self
    }

    pub fn lte(mut self, column: &str, value: &str) -> Self {
        self.params.push((column.into(), format!("lte.{value}")));
        self
    }

    pub fn in_list(mut self, column: &str, values: &[&str]) -> Self {
        self.params
            .push((column.into(), format!("in.({})", values.join(","))));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.params.push((column.into(), "is.null".into()));
        self
    }

    pub fn not_null(mut self, column: &str) -> Self {
        self.params.push((column.into(), "not.is.null".into()));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.params.push(("order".into(), format!("{column}.asc")));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.params.push(("order".into(), format!("{column}.desc")));
        self
    }

    /// Query parameters accumulated so far, in insertion order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub async fn fetch(self) -> Result<Vec<Value>, RemoteError> {
        let url = format!("{}/rest/v1/{}", self.remote.base_url, self.table);
        debug!(table = %self.table, "fetching rows");
        let resp = self
            .remote
            .authed(self.remote.http.get(&url))
            .query(&self.params)
            .send()
            .await?;
        Remote::rows_from(resp).await
    }
}

/// Decode loosely-typed rows into typed records, failing fast on the first
/// shape mismatch.
pub fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Result<Vec<T>, RemoteError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|source| RemoteError::RowShape {
                table: table.to_string(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn remote() -> Remote {
        Remote::new("https://example.supabase.co/", "anon")
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let r = remote();
        assert_eq!(
            r.storage_public_url("site-photos", "p1/a.jpg"),
            "https://example.supabase.co/storage/v1/object/public/site-photos/p1/a.jpg"
        );
    }

    #[test]
    fn query_builder_composes_filters_in_order() {
        let r = remote();
        let q = r
            .table("work_logs")
            .select("*,projects(project_name,client_name)")
            .eq("project_id", "p1")
            .eq("work_cate1", "tiling")
            .order_desc("work_date");
        assert_eq!(
            q.params(),
            &[
                (
                    "select".to_string(),
                    "*,projects(project_name,client_name)".to_string()
                ),
                ("project_id".to_string(), "eq.p1".to_string()),
                ("work_cate1".to_string(), "eq.tiling".to_string()),
                ("order".to_string(), "work_date.desc".to_string()),
            ]
        );
    }

    #[test]
    fn query_builder_supports_range_null_and_set_filters() {
        let r = remote();
        let q = r
            .table("projects")
            .gte("start_date", "2025-01-01")
            .lte("start_date", "2025-12-31")
            .in_list("status", &["estimate", "in_progress"])
            .is_null("project_id")
            .not_null("worker_name");
        assert_eq!(
            q.params(),
            &[
                ("start_date".to_string(), "gte.2025-01-01".to_string()),
                ("start_date".to_string(), "lte.2025-12-31".to_string()),
                (
                    "status".to_string(),
                    "in.(estimate,in_progress)".to_string()
                ),
                ("project_id".to_string(), "is.null".to_string()),
                ("worker_name".to_string(), "not.is.null".to_string()),
            ]
        );
    }

    #[derive(Debug, Deserialize)]
    struct Row {
        id: String,
        amount: f64,
    }

    #[test]
    fn decode_rows_parses_well_shaped_rows() {
        let rows = vec![json!({"id": "a", "amount": 1200.0})];
        let parsed: Vec<Row> = decode_rows("expense_approvals", rows).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].id, "a");
        assert_eq!(parsed[0].amount, 1200.0);
    }

    #[test]
    fn decode_rows_fails_fast_on_shape_mismatch() {
        let rows = vec![
            json!({"id": "a", "amount": 1200.0}),
            json!({"id": "b", "amount": "not a number"}),
        ];
        let err = decode_rows::<Row>("expense_approvals", rows).unwrap_err();
        match err {
            RemoteError::RowShape { table, .. } => assert_eq!(table, "expense_approvals"),
            other => panic!("expected RowShape, got {other}"),
        }
    }
}
