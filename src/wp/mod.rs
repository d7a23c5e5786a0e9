//! WordPress REST endpoints: the JWT handshake and the easydeals plugin.

use crate::error::Error;
use crate::model::data::{TokenRequest, TokenResponse};
use crate::model::session::Session;
use crate::Result;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response};

pub mod entries;
pub mod settings;

const TOKEN_PATH: &str = "/wp-json/jwt-auth/v1/token";
const API_PATH: &str = "/wp-json/easydeals/v1";

#[derive(Clone)]
pub struct WpClient {
    http: Client,
    base_url: String,
}

impl WpClient {
    pub fn new(base_url: &str) -> WpClient {
        WpClient {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<TokenResponse> {
        let res = self
            .http
            .post(format!("{}{TOKEN_PATH}", self.base_url))
            .json(&TokenRequest { username, password })
            .send()
            .await?;

        if !res.status().is_success() {
            warn!("sign-in for {username} rejected: {}", res.status());
            return Err(Error::AuthFailed);
        }

        let auth = res.json::<TokenResponse>().await?;
        if auth.token.as_deref().is_none_or(str::is_empty) {
            return Err(Error::AuthFailed);
        }
        debug!("signed in as {:?}", auth.user_display_name);
        Ok(auth)
    }

    /// Client for the easydeals endpoints, authorized by `session`.
    pub fn easydeals(&self, session: &Session) -> EasyDeals {
        EasyDeals {
            http: self.http.clone(),
            api_url: format!("{}{API_PATH}", self.base_url),
            token: session.token.clone(),
        }
    }
}

/// Bearer-authorized calls against `/wp-json/easydeals/v1`. One round trip
/// per call, nothing is retried.
pub struct EasyDeals {
    http: Client,
    api_url: String,
    token: String,
}

impl EasyDeals {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.token))
    }
}

async fn ensure_success(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(Error::Fetch(status, body))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn session(token: &str) -> Session {
        let now = NaiveDateTime::parse_from_str("2025-05-01 09:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        Session {
            chat_id: 1,
            user_id: 7,
            display_name: "Selger".into(),
            email: "selger@example.no".into(),
            token: token.into(),
            created_on: now,
            expires_on: now,
        }
    }

    #[tokio::test]
    async fn authenticate_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_json(json!({"username": "selger", "password": "hemmelig"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "jwt-token",
                "user_id": 7,
                "user_display_name": "Selger",
                "user_email": "selger@example.no"
            })))
            .mount(&server)
            .await;

        let wp = WpClient::new(&format!("{}/", server.uri()));
        let auth = wp.authenticate("selger", "hemmelig").await.unwrap();
        assert_eq!(auth.token.as_deref(), Some("jwt-token"));
        assert_eq!(auth.user_display_name.as_deref(), Some("Selger"));
    }

    #[tokio::test]
    async fn authenticate_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "code": "[jwt_auth] incorrect_password"
            })))
            .mount(&server)
            .await;

        let wp = WpClient::new(&server.uri());
        let err = wp.authenticate("selger", "feil").await.unwrap_err();
        assert!(matches!(err, Error::AuthFailed));
    }

    #[tokio::test]
    async fn authenticate_without_token_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_id": 7})))
            .mount(&server)
            .await;

        let wp = WpClient::new(&server.uri());
        assert!(matches!(
            wp.authenticate("selger", "hemmelig").await,
            Err(Error::AuthFailed)
        ));
    }
}
