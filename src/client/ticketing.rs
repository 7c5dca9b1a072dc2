use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::client::error::TicketingError;
use crate::client::request::{
    CaptchaRequest, DaySelectRequest, SeatConfirmRequest, SeatHoldRequest,
};
use crate::client::response::{DaySelectResponse, SeatConfirmResponse, SeatHoldResponse};

/// The four outbound calls of the purchase protocol.
///
/// This trait intentionally hides transport, retries and error formats;
/// implementations normalize every non-2xx into [`TicketingError::Api`].
#[async_trait]
pub trait TicketingApi: Send + Sync + 'static {
    async fn join_queue(
        &self,
        match_id: i64,
        req: &DaySelectRequest,
        user_id: i64,
    ) -> Result<DaySelectResponse, TicketingError>;

    async fn validate_captcha(
        &self,
        match_id: i64,
        req: &CaptchaRequest,
    ) -> Result<(), TicketingError>;

    async fn hold_seats(
        &self,
        match_id: i64,
        req: &SeatHoldRequest,
    ) -> Result<SeatHoldResponse, TicketingError>;

    async fn confirm_seats(
        &self,
        match_id: i64,
        req: &SeatConfirmRequest,
    ) -> Result<SeatConfirmResponse, TicketingError>;
}

#[derive(Clone)]
pub struct HttpTicketingClient {
    http: Client,
    base_url: String,
}

impl HttpTicketingClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TicketingError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(100)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, TicketingError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let resp = self.http.post(&url).json(body).send().await?;
        decode(resp).await
    }
}

/// Reads the body once, maps non-2xx to an api error carrying it, otherwise
/// decodes JSON (an empty success body decodes as the type's default).
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, TicketingError> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(TicketingError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    if body.is_empty() {
        return Ok(serde_json::from_str("{}")?);
    }
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl TicketingApi for HttpTicketingClient {
    #[instrument(skip(self, req), level = "debug")]
    async fn join_queue(
        &self,
        match_id: i64,
        req: &DaySelectRequest,
        user_id: i64,
    ) -> Result<DaySelectResponse, TicketingError> {
        let url = format!("{}/ticketing/queue/{match_id}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("userId", user_id)])
            .json(req)
            .send()
            .await?;

        let out: DaySelectResponse = decode(resp).await?;
        debug!(status = %out.status, position_ahead = out.position_ahead, "queue joined");
        Ok(out)
    }

    async fn validate_captcha(
        &self,
        match_id: i64,
        req: &CaptchaRequest,
    ) -> Result<(), TicketingError> {
        let url = format!("{}/ticketing/matches/{match_id}/captcha/validate", self.base_url);
        let resp = self.http.post(&url).json(req).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TicketingError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self, req), fields(user_id = req.user_id), level = "debug")]
    async fn hold_seats(
        &self,
        match_id: i64,
        req: &SeatHoldRequest,
    ) -> Result<SeatHoldResponse, TicketingError> {
        self.post(&format!("/ticketing/matches/{match_id}/hold"), req)
            .await
    }

    async fn confirm_seats(
        &self,
        match_id: i64,
        req: &SeatConfirmRequest,
    ) -> Result<SeatConfirmResponse, TicketingError> {
        self.post(&format!("/ticketing/matches/{match_id}/seats/confirm"), req)
            .await
    }
}
