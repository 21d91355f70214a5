//! Supabase PostgREST client
//!
//! Thin HTTP plumbing for the two learning tables. Query semantics follow
//! PostgREST conventions: `eq.` equality filters, `order=col.desc`, embedded
//! parent columns via `select=*,parent(cols)`, and `Prefer` headers on
//! mutations.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::BackendError;

/// Connection settings for a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub project_url: String,
    pub anon_key: String,
    /// User JWT from the identity provider. The anon key is used when absent.
    pub access_token: Option<String>,
}

impl SupabaseConfig {
    pub fn new(project_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            project_url: project_url.into(),
            anon_key: anon_key.into(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// Blocking REST client. Callers needing concurrency run operations on
/// blocking tasks (see `history::load_history`).
#[derive(Clone)]
pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

const OBJECT_ACCEPT: &str = "application/vnd.pgrst.object+json";

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Self {
        let raw = config.project_url.trim();
        let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };

        Self {
            base_url: with_scheme.trim_end_matches('/').to_string(),
            anon_key: config.anon_key,
            access_token: config.access_token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_header(&self) -> String {
        match &self.access_token {
            Some(token) => format!("Bearer {token}"),
            None => format!("Bearer {}", self.anon_key),
        }
    }

    fn request(&self, method: &str, table: &str, params: &[(&str, &str)]) -> ureq::Request {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let mut request = ureq::request(method, &url)
            .set("apikey", &self.anon_key)
            .set("Authorization", &self.auth_header());
        for (name, value) in params {
            request = request.query(name, value);
        }
        request
    }

    /// GET returning all matching rows. An empty result is an empty vec.
    pub fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, BackendError> {
        let response = self
            .request("GET", table, params)
            .call()
            .map_err(read_error)?;
        parse_body(response)
    }

    /// GET expecting exactly one row. PostgREST answers zero rows with the
    /// `PGRST116` error code, which maps to `Ok(None)` here.
    pub fn get_single<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<T>, BackendError> {
        let result = self
            .request("GET", table, params)
            .set("Accept", OBJECT_ACCEPT)
            .call();

        match result {
            Ok(response) => Ok(Some(parse_body(response)?)),
            Err(err) => {
                let backend = read_error(err);
                if backend.is_no_rows() {
                    Ok(None)
                } else {
                    Err(backend)
                }
            }
        }
    }

    /// POST one row and return the stored representation.
    pub fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<R, BackendError> {
        let response = self
            .request("POST", table, &[])
            .set("Prefer", "return=representation")
            .set("Accept", OBJECT_ACCEPT)
            .send_json(row)
            .map_err(read_error)?;
        parse_body(response)
    }

    /// PATCH matching rows; the response body is not needed.
    pub fn update<T: Serialize>(
        &self,
        table: &str,
        params: &[(&str, &str)],
        patch: &T,
    ) -> Result<(), BackendError> {
        self.request("PATCH", table, params)
            .set("Prefer", "return=minimal")
            .send_json(patch)
            .map_err(read_error)?;
        Ok(())
    }

    /// DELETE matching rows. Deleting nothing is a success, like the
    /// underlying API.
    pub fn delete(&self, table: &str, params: &[(&str, &str)]) -> Result<(), BackendError> {
        self.request("DELETE", table, params)
            .call()
            .map_err(read_error)?;
        Ok(())
    }
}

fn parse_body<T: DeserializeOwned>(response: ureq::Response) -> Result<T, BackendError> {
    let text = response
        .into_string()
        .map_err(|e| BackendError::Network(format!("failed to read response: {e}")))?;
    Ok(serde_json::from_str(&text)?)
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

fn read_error(err: ureq::Error) -> BackendError {
    match err {
        ureq::Error::Status(status, response) => {
            let text = response.into_string().unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<ErrorBody>(&text) {
                if body.code.is_some() || body.message.is_some() {
                    return BackendError::Api {
                        code: body.code.unwrap_or_else(|| status.to_string()),
                        message: body.message.unwrap_or_else(|| text.clone()),
                    };
                }
            }
            BackendError::Api {
                code: status.to_string(),
                message: if text.is_empty() {
                    format!("HTTP {status}")
                } else {
                    text
                },
            }
        }
        other => BackendError::Network(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_is_defaulted_and_slash_trimmed() {
        let client = SupabaseClient::new(SupabaseConfig::new("abc.supabase.co/", "anon"));
        assert_eq!(client.base_url(), "https://abc.supabase.co");

        let client = SupabaseClient::new(SupabaseConfig::new("http://localhost:54321", "anon"));
        assert_eq!(client.base_url(), "http://localhost:54321");
    }

    #[test]
    fn access_token_wins_over_anon_key() {
        let config = SupabaseConfig::new("https://abc.supabase.co", "anon").with_access_token("jwt");
        let client = SupabaseClient::new(config);
        assert_eq!(client.auth_header(), "Bearer jwt");

        let anon_only = SupabaseClient::new(SupabaseConfig::new("https://abc.supabase.co", "anon"));
        assert_eq!(anon_only.auth_header(), "Bearer anon");
    }
}
