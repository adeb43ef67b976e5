//! Platform API client (integrating platform backend → wagering server).
//!
//! The platform identity is asserted by upstream authentication and
//! travels as plain headers; this client attaches them to every request.

use reqwest::Client;
use url::Url;

use super::{
    parse_response, ClientError, PLATFORM_ID_HEADER, PLATFORM_USER_ID_HEADER,
    PLATFORM_USER_NAME_HEADER, TRACE_ID_HEADER,
};
use crate::objects::{BalanceData, BetData, BetRecordsData, BetRequest, RoundDetail};

/// Typed HTTP client for the platform-facing endpoints.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: Client,
    base_url: Url,
    platform_id: i16,
    platform_user_id: String,
    platform_user_name: Option<String>,
}

impl PlatformClient {
    /// Create a new `PlatformClient` acting as one platform user.
    pub fn new(base_url: Url, platform_id: i16, platform_user_id: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            platform_id,
            platform_user_id: platform_user_id.into(),
            platform_user_name: None,
        }
    }

    /// Attach a display name, forwarded on first-contact auto-registration.
    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.platform_user_name = Some(name.into());
        self
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    fn identity(&self, req: reqwest::RequestBuilder, trace_id: &str) -> reqwest::RequestBuilder {
        let req = req
            .header(PLATFORM_ID_HEADER, self.platform_id.to_string())
            .header(PLATFORM_USER_ID_HEADER, &self.platform_user_id)
            .header(TRACE_ID_HEADER, trace_id);
        match &self.platform_user_name {
            Some(name) => req.header(PLATFORM_USER_NAME_HEADER, name),
            None => req,
        }
    }

    /// `POST /api/bet` — place a wager.
    pub async fn place_bet(&self, bet: &BetRequest, trace_id: &str) -> Result<BetData, ClientError> {
        let url = self.base_url.join("/api/bet")?;
        let resp = self.identity(self.http.post(url), trace_id).json(bet).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/user/balance` — current balance of this platform user.
    pub async fn balance(&self, trace_id: &str) -> Result<BalanceData, ClientError> {
        let url = self.base_url.join("/api/user/balance")?;
        let resp = self.identity(self.http.get(url), trace_id).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/user/bets` — recent bets, optionally scoped to a round.
    pub async fn bets(
        &self,
        game_round_id: Option<&str>,
        limit: Option<u32>,
        trace_id: &str,
    ) -> Result<BetRecordsData, ClientError> {
        let mut url = self.base_url.join("/api/user/bets")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(round) = game_round_id {
                query.append_pair("game_round_id", round);
            }
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
        }
        let resp = self.identity(self.http.get(url), trace_id).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/round/{round_id}` — round info and draw result.
    pub async fn round(&self, round_id: &str, trace_id: &str) -> Result<RoundDetail, ClientError> {
        let url = self.base_url.join(&format!("/api/round/{round_id}"))?;
        let resp = self.identity(self.http.get(url), trace_id).send().await?;
        parse_response(resp).await
    }
}
