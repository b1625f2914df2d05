//! `reqwest` implementation of [`CatalogApi`].

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use encore_auth::Credential;
use encore_catalog::{Artist, ArtistDraft, Event, EventAction, EventDraft};
use encore_core::{ArtistId, EventId};

use super::{CatalogApi, Registration};
use crate::config::ClientConfig;
use crate::error::ApiError;

const REGISTERED: &str = "Registration complete. You can now log in.";

/// Whether a request to `path` carries the credential.
///
/// Public paths and the authentication endpoint never do.
pub fn requires_credential(path: &str) -> bool {
    !(path.contains("/public/") || path.contains("/auth/"))
}

#[derive(Debug, Clone)]
pub struct HttpCatalogApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCatalogApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            base_url: config.api_url.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request and returns the response body of a 2xx answer.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        credential: Option<&Credential>,
        body: Option<Value>,
    ) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method.clone(), &url);

        if let Some(credential) = credential.filter(|_| requires_credential(path)) {
            req = req.header(reqwest::header::AUTHORIZATION, credential.authorization_header());
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        tracing::debug!(%method, path, "remote request");
        let resp = req.send().await.map_err(|err| {
            tracing::error!(%method, path, error = %err, "remote request failed");
            ApiError::from(err)
        })?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            tracing::debug!(%method, path, status = status.as_u16(), "remote rejected request");
            return Err(ApiError::status(status.as_u16(), error_detail(&text)));
        }
        Ok(text)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        credential: Option<&Credential>,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let text = self.execute(method, path, credential, body).await?;
        parse(&text)
    }
}

fn parse<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Picks a human readable detail out of an error body.
fn error_detail(body: &str) -> String {
    let body = body.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error", "mensaje"] {
            if let Some(Value::String(detail)) = map.get(key) {
                return detail.clone();
            }
        }
        return String::new();
    }
    body.chars().take(200).collect()
}

#[derive(Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

#[derive(Deserialize)]
struct MessageResponse {
    message: Option<String>,
}

#[async_trait]
impl CatalogApi for HttpCatalogApi {
    async fn login(&self, email: &str, password: &str) -> Result<Credential, ApiError> {
        let body = json!({ "email": email, "password": password });
        let resp: LoginResponse = self.fetch(Method::POST, "/api/auth/login", None, Some(body)).await?;
        resp.token
            .and_then(Credential::parse)
            .ok_or_else(|| ApiError::Decode("login response carried no token".to_string()))
    }

    async fn register(&self, registration: &Registration) -> Result<String, ApiError> {
        let text = self
            .execute(
                Method::POST,
                "/api/public/registrarUsuario",
                None,
                Some(to_body(registration)?),
            )
            .await?;
        let message = serde_json::from_str::<MessageResponse>(&text)
            .ok()
            .and_then(|resp| resp.message)
            .filter(|m| !m.trim().is_empty());
        Ok(message.unwrap_or_else(|| REGISTERED.to_string()))
    }

    async fn public_events(&self) -> Result<Vec<Event>, ApiError> {
        self.fetch(Method::GET, "/api/public/eventos", None, None).await
    }

    async fn public_event(&self, id: EventId) -> Result<Event, ApiError> {
        self.fetch(Method::GET, &format!("/api/public/evento/{id}"), None, None)
            .await
    }

    async fn public_artist(&self, id: ArtistId) -> Result<Artist, ApiError> {
        self.fetch(Method::GET, &format!("/api/artist/public/{id}"), None, None)
            .await
    }

    async fn artists(&self, credential: Option<&Credential>) -> Result<Vec<Artist>, ApiError> {
        self.fetch(Method::GET, "/api/artist/all", credential, None).await
    }

    async fn events(&self, credential: &Credential) -> Result<Vec<Event>, ApiError> {
        self.fetch(Method::GET, "/api/event/all", Some(credential), None).await
    }

    async fn event(&self, credential: &Credential, id: EventId) -> Result<Event, ApiError> {
        self.fetch(Method::GET, &format!("/api/event/{id}"), Some(credential), None)
            .await
    }

    async fn create_event(&self, credential: &Credential, draft: &EventDraft) -> Result<Event, ApiError> {
        self.fetch(Method::POST, "/api/event/create", Some(credential), Some(to_body(draft)?))
            .await
    }

    async fn apply_event_action(
        &self,
        credential: &Credential,
        id: EventId,
        action: &EventAction,
    ) -> Result<Event, ApiError> {
        let (method, path, body) = match action {
            EventAction::Confirm => (Method::PUT, format!("/api/event/{id}/confirmed"), None),
            EventAction::Reschedule(date) => (
                Method::PUT,
                format!("/api/event/{id}/rescheduled"),
                Some(Value::String(date.format("%Y-%m-%d").to_string())),
            ),
            EventAction::Cancel => (Method::PUT, format!("/api/event/{id}/canceled"), None),
            EventAction::AssignArtist(artist_id) => (
                Method::POST,
                format!("/api/event/{id}/artists"),
                Some(json!({ "artistId": artist_id })),
            ),
            EventAction::UnassignArtist(artist_id) => (
                Method::DELETE,
                format!("/api/event/{id}/artists/{artist_id}"),
                None,
            ),
        };

        let text = self.execute(method, &path, Some(credential), body).await?;
        if text.trim().is_empty() {
            // Some actions answer with an empty body; ask for the event instead.
            return self.event(credential, id).await;
        }
        parse(&text)
    }

    async fn create_artist(&self, credential: &Credential, draft: &ArtistDraft) -> Result<Artist, ApiError> {
        self.fetch(Method::POST, "/api/artist/create", Some(credential), Some(to_body(draft)?))
            .await
    }

    async fn update_artist(
        &self,
        credential: &Credential,
        id: ArtistId,
        draft: &ArtistDraft,
    ) -> Result<Artist, ApiError> {
        self.fetch(
            Method::PUT,
            &format!("/api/artist/{id}"),
            Some(credential),
            Some(to_body(draft)?),
        )
        .await
    }

    async fn delete_artist(&self, credential: &Credential, id: ArtistId) -> Result<(), ApiError> {
        self.execute(Method::DELETE, &format!("/api/artist/{id}"), Some(credential), None)
            .await
            .map(drop)
    }

    async fn follow_artist(&self, credential: &Credential, id: ArtistId) -> Result<(), ApiError> {
        self.execute(Method::POST, &format!("/api/user/me/seguidos/{id}"), Some(credential), None)
            .await
            .map(drop)
    }

    async fn unfollow_artist(&self, credential: &Credential, id: ArtistId) -> Result<(), ApiError> {
        self.execute(Method::DELETE, &format!("/api/user/me/seguidos/{id}"), Some(credential), None)
            .await
            .map(drop)
    }

    async fn followed_artists(&self, credential: &Credential) -> Result<Vec<Artist>, ApiError> {
        self.fetch(Method::GET, "/api/user/me/seguidos-artistas", Some(credential), None)
            .await
    }

    async fn favorite_event(&self, credential: &Credential, id: EventId) -> Result<(), ApiError> {
        self.execute(Method::POST, &format!("/api/user/me/favoritos/{id}"), Some(credential), None)
            .await
            .map(drop)
    }

    async fn unfavorite_event(&self, credential: &Credential, id: EventId) -> Result<(), ApiError> {
        self.execute(Method::DELETE, &format!("/api/user/me/favoritos/{id}"), Some(credential), None)
            .await
            .map(drop)
    }

    async fn favorite_events(&self, credential: &Credential) -> Result<Vec<Event>, ApiError> {
        self.fetch(Method::GET, "/api/user/me/favoritos", Some(credential), None)
            .await
    }
}
