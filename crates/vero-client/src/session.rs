//! The appliance session.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_bus::InMemoryEventBus;
use tracing::{info, warn};

use crate::capture::Capture;
use crate::error::ClientError;
use crate::generator::SignalGenerator;
use crate::http::ApiClient;
use crate::routes;
use crate::settings::Settings;
use crate::ws::EventFeed;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// A session with one appliance.
///
/// ```rust,ignore
/// let vero = Vero::new("10.0.0.5")?;
/// vero.login("user", "user").await?;
/// let profiles = vero.signal_generator().profiles().get_all().await?;
/// vero.close().await;
/// ```
pub struct Vero {
    api: ApiClient,
    bus: Arc<InMemoryEventBus>,
    feed: Mutex<Option<EventFeed>>,
}

impl Vero {
    /// Create a session for `address` (host, host:port, or URL).
    ///
    /// No network traffic happens until [`Vero::login`].
    pub fn new(address: &str) -> Result<Self, ClientError> {
        let base_url = routes::base_url(address)?;
        Ok(Self {
            api: ApiClient::new(base_url)?,
            bus: Arc::new(InMemoryEventBus::new()),
            feed: Mutex::new(None),
        })
    }

    /// Authenticate and open the event feed.
    ///
    /// A feed that cannot be opened is logged and skipped; the session then
    /// works without events and every awaiter runs into its timeout.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let response: LoginResponse = self
            .api
            .post_json(routes::LOGIN, &LoginRequest { username, password })
            .await?;
        self.api.set_token(Some(response.token));
        info!(user = username, url = %self.api.base_url(), "Logged in");

        let feed_url = routes::event_feed_url(self.api.base_url())?;
        let token = self.api.token();
        match EventFeed::connect(&feed_url, token.as_deref(), self.bus.clone()).await {
            Ok(feed) => {
                *self.feed.lock() = Some(feed);
            }
            Err(e) => warn!(error = %e, url = %feed_url, "Event feed unavailable"),
        }
        Ok(())
    }

    /// Close the event feed and forget the token. Safe to call repeatedly.
    pub async fn close(&self) {
        let feed = self.feed.lock().take();
        if let Some(feed) = feed {
            feed.shutdown().await;
        }
        self.api.set_token(None);
    }

    /// Whether the event feed is up.
    #[must_use]
    pub fn has_event_feed(&self) -> bool {
        self.feed
            .lock()
            .as_ref()
            .is_some_and(EventFeed::is_connected)
    }

    /// The bus carrying every event received on the feed.
    #[must_use]
    pub fn events(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    /// Appliance settings.
    #[must_use]
    pub fn settings(&self) -> Settings<'_> {
        Settings::new(self)
    }

    /// Signal generator control.
    #[must_use]
    pub fn signal_generator(&self) -> SignalGenerator<'_> {
        SignalGenerator::new(self)
    }

    /// Capture control.
    #[must_use]
    pub fn capture(&self) -> Capture<'_> {
        Capture::new(self)
    }

    pub(crate) fn api(&self) -> &ApiClient {
        &self.api
    }
}
