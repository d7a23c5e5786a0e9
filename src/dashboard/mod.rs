//! Staff dashboard served over Telegram. One chat is one dashboard session:
//! it holds the cached lead list, the active filter and any open dialog.

use crate::error::Error;
use crate::model::entry::Entry;
use crate::model::session::Session;
use crate::model::view::{apply, Filter, Mutation};
use crate::model::Db;
use crate::wp::settings::{SettingKey, Settings};
use crate::wp::{EasyDeals, WpClient};
use crate::Result;
use chrono::Local;
use log::{debug, error};
use std::collections::HashMap;
use teloxide::types::{ChatId, MessageId};
use tokio::sync::Mutex;

pub mod callback;
pub mod handlers;
pub mod input;
pub mod render;
pub mod settings;

/// Text input the chat is expected to send next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    OfferPrice(u64),
    Setting(SettingKey),
}

#[derive(Debug, Default)]
pub struct ViewState {
    pub mounted: bool,
    pub entries: Vec<Entry>,
    pub filter: Filter,
    pub page: usize,
    pub pending: Option<Pending>,
    pub board: Option<MessageId>,
    pub dialog: Option<MessageId>,
    pub settings: Option<Settings>,
    pub settings_message: Option<MessageId>,
}

pub struct App {
    pub db: Db,
    pub wp: WpClient,
    session_days: i64,
    views: Mutex<HashMap<ChatId, ViewState>>,
}

impl App {
    pub fn new(db: Db, wp: WpClient, session_days: i64) -> App {
        App {
            db,
            wp,
            session_days,
            views: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `f` on the chat's view state. The lock is never held across a
    /// network call.
    pub async fn with_view<R>(&self, chat: ChatId, f: impl FnOnce(&mut ViewState) -> R) -> R {
        let mut views = self.views.lock().await;
        f(views.entry(chat).or_default())
    }

    pub async fn session(&self, chat: ChatId) -> Result<Option<Session>> {
        self.db.read_session(chat.0, Local::now().naive_local()).await
    }

    pub async fn login(&self, chat: ChatId, username: &str, password: &str) -> Result<Session> {
        let auth = self.wp.authenticate(username, password).await?;
        let session = Session::issue(chat.0, auth, Local::now().naive_local(), self.session_days)?;
        self.db.save_session(&session).await?;
        self.with_view(chat, |v| *v = ViewState::default()).await;
        Ok(session)
    }

    pub async fn logout(&self, chat: ChatId) -> Result<bool> {
        self.views.lock().await.remove(&chat);
        self.db.delete_session(chat.0).await
    }

    /// Fetches the full list. A failed fetch leaves an empty list behind.
    pub async fn mount(&self, chat: ChatId, deals: &EasyDeals) -> Result<usize> {
        let (entries, outcome) = match deals.list().await {
            Ok(entries) => {
                let count = entries.len();
                (entries, Ok(count))
            }
            Err(e) => {
                error!("Failed to load entries: {e}");
                (Vec::new(), Err(e))
            }
        };
        self.with_view(chat, |v| {
            v.mounted = true;
            v.entries = entries;
            v.page = 1;
        })
        .await;
        outcome
    }

    pub async fn entry(&self, chat: ChatId, id: u64) -> Option<Entry> {
        self.with_view(chat, |v| v.entries.iter().find(|e| e.id == id).cloned())
            .await
    }

    /// Sends the change to the backend and, once it is confirmed, replaces
    /// the cached list with the reduced one.
    pub async fn perform(&self, chat: ChatId, deals: &EasyDeals, mutation: Mutation) -> Result<()> {
        match &mutation {
            Mutation::Deleted { id } => deals.delete(*id).await?,
            Mutation::OfferSent { id, price } => {
                let email = self
                    .entry(chat, *id)
                    .await
                    .and_then(|e| e.contact.email)
                    .ok_or(Error::MissingEmail(*id))?;
                deals.send_offer(*id, *price, &email).await?
            }
            Mutation::StatusChanged { id, status } => deals.set_status(*id, *status).await?,
        }
        debug!("applying {:?} for chat {}", mutation, chat.0);
        self.with_view(chat, |v| v.entries = apply(&v.entries, &mutation))
            .await;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::entry::Status;
    use crate::wp::tests::session;
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CHAT: ChatId = ChatId(42);

    pub(crate) async fn app(server: &MockServer) -> App {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let db = Db::from_pool(pool).await.unwrap();
        App::new(db, WpClient::new(&server.uri()), 7)
    }

    async fn mount_three(server: &MockServer, app: &App) -> EasyDeals {
        Mock::given(method("GET"))
            .and(path("/wp-json/easydeals/v1/entries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "status": 1, "content": {"Navn": "Ola", "E-post": "ola@example.no"}},
                {"id": 2, "status": 2, "content": {"Navn": "Kari"}},
                {"id": 3, "status": 4, "content": {"Navn": "Per"}}
            ])))
            .mount(server)
            .await;
        let deals = app.wp.easydeals(&session("jwt-token"));
        assert_eq!(app.mount(CHAT, &deals).await.unwrap(), 3);
        deals
    }

    async fn statuses(app: &App) -> Vec<(u64, Status)> {
        app.with_view(CHAT, |v| v.entries.iter().map(|e| (e.id, e.status)).collect())
            .await
    }

    #[tokio::test]
    async fn offer_moves_entry_to_awaiting() {
        let server = MockServer::start().await;
        let app = app(&server).await;
        let deals = mount_three(&server, &app).await;
        Mock::given(method("POST"))
            .and(path("/wp-json/easydeals/v1/offer/1"))
            .and(body_json(json!({"price": 15000, "email": "ola@example.no"})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        app.perform(CHAT, &deals, Mutation::OfferSent { id: 1, price: 15000 })
            .await
            .unwrap();
        let entry = app.entry(CHAT, 1).await.unwrap();
        assert_eq!(entry.status, Status::OfferSent);
        assert_eq!(entry.offer_price, Some(15000));
    }

    #[tokio::test]
    async fn offer_without_email_never_reaches_backend() {
        let server = MockServer::start().await;
        let app = app(&server).await;
        let deals = mount_three(&server, &app).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = app
            .perform(CHAT, &deals, Mutation::OfferSent { id: 2, price: 15000 })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingEmail(2)));
        assert_eq!(app.entry(CHAT, 2).await.unwrap().status, Status::OfferSent);
    }

    #[tokio::test]
    async fn completing_accepted_entry() {
        let server = MockServer::start().await;
        let app = app(&server).await;
        let deals = mount_three(&server, &app).await;
        Mock::given(method("POST"))
            .and(path("/wp-json/easydeals/v1/offer/3/status"))
            .and(body_json(json!({"status": 3})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        app.perform(
            CHAT,
            &deals,
            Mutation::StatusChanged {
                id: 3,
                status: Status::Completed,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            statuses(&app).await,
            vec![(1, Status::Unhandled), (2, Status::OfferSent), (3, Status::Completed)]
        );
    }

    #[tokio::test]
    async fn failed_delete_keeps_entry() {
        let server = MockServer::start().await;
        let app = app(&server).await;
        let deals = mount_three(&server, &app).await;
        Mock::given(method("DELETE"))
            .and(path("/wp-json/easydeals/v1/entries/2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = app
            .perform(CHAT, &deals, Mutation::Deleted { id: 2 })
            .await
            .unwrap_err();
        assert!(err.is_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(app.entry(CHAT, 2).await.is_some());
        assert_eq!(statuses(&app).await.len(), 3);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let server = MockServer::start().await;
        let app = app(&server).await;
        let deals = mount_three(&server, &app).await;
        Mock::given(method("DELETE"))
            .and(path("/wp-json/easydeals/v1/entries/2"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        app.perform(CHAT, &deals, Mutation::Deleted { id: 2 })
            .await
            .unwrap();
        assert!(app.entry(CHAT, 2).await.is_none());
    }

    #[tokio::test]
    async fn failed_mount_leaves_empty_list() {
        let server = MockServer::start().await;
        let app = app(&server).await;
        Mock::given(method("GET"))
            .and(path("/wp-json/easydeals/v1/entries"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let deals = app.wp.easydeals(&session("jwt-token"));
        assert!(app.mount(CHAT, &deals).await.is_err());
        assert!(app.with_view(CHAT, |v| v.mounted && v.entries.is_empty()).await);
    }

    #[tokio::test]
    async fn login_stores_session_and_logout_drops_it() {
        let server = MockServer::start().await;
        let app = app(&server).await;
        Mock::given(method("POST"))
            .and(path("/wp-json/jwt-auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "jwt-token",
                "user_id": "7",
                "user_display_name": "Selger",
                "user_email": "selger@example.no"
            })))
            .mount(&server)
            .await;

        let session = app.login(CHAT, "selger", "hemmelig").await.unwrap();
        assert_eq!(session.token, "jwt-token");
        assert_eq!(app.session(CHAT).await.unwrap(), Some(session));

        assert!(app.logout(CHAT).await.unwrap());
        assert_eq!(app.session(CHAT).await.unwrap(), None);
    }
}
