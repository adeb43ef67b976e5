//! Operator API client (game operator → wagering server).

use reqwest::Client;
use url::Url;

use super::{parse_optional_response, ClientError, TRACE_ID_HEADER};
use crate::objects::{DrawRequest, GameEventData, GameEventRequest};

/// Typed HTTP client for the operator endpoints that drive the round
/// lifecycle and submit draw results.
#[derive(Debug, Clone)]
pub struct OperatorClient {
    http: Client,
    base_url: Url,
}

impl OperatorClient {
    /// Create a new `OperatorClient`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/game_event` — advance the round lifecycle.
    ///
    /// Returns the betting window for `game_start`; `None` for all other
    /// events.
    pub async fn game_event(
        &self,
        event: &GameEventRequest,
        trace_id: &str,
    ) -> Result<Option<GameEventData>, ClientError> {
        let url = self.base_url.join("/api/game_event")?;
        let resp = self
            .http
            .post(url)
            .header(TRACE_ID_HEADER, trace_id)
            .json(event)
            .send()
            .await?;
        parse_optional_response(resp).await
    }

    /// `POST /api/drawresult` — submit the outcome and settle the round.
    pub async fn draw_result(&self, draw: &DrawRequest, trace_id: &str) -> Result<(), ClientError> {
        let url = self.base_url.join("/api/drawresult")?;
        let resp = self
            .http
            .post(url)
            .header(TRACE_ID_HEADER, trace_id)
            .json(draw)
            .send()
            .await?;
        parse_optional_response::<serde_json::Value>(resp).await.map(|_| ())
    }
}
