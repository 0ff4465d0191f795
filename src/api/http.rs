use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::*;
use crate::config::ClientConfig;

/// [`GameApi`] over HTTPS with bearer authentication.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base: String,
    token: String,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            client,
            base: config.api_url.trim_end_matches('/').to_string(),
            token: config.access_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let resp = req.bearer_auth(&self.token).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(body.to_vec())
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R, ApiError> {
        debug!(path, "POST");
        let bytes = self.send(self.client.post(self.url(path)).json(body)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn post_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        debug!(path, "POST");
        self.send(self.client.post(self.url(path)).json(body)).await?;
        Ok(())
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let bytes = self.send(self.client.get(self.url(path))).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Pull a readable message out of an error body (`detail`, `message` or `error`).
fn error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    String::from_utf8_lossy(body).trim().chars().take(200).collect()
}

#[async_trait]
impl GameApi for HttpApi {
    async fn roll_dice(&self) -> Result<DiceRoll, ApiError> {
        self.post("/dice/roll", &serde_json::json!({})).await
    }

    async fn make_move(&self, req: &MoveRequest) -> Result<MoveResponse, ApiError> {
        self.post("/players/current/moves", req).await
    }

    async fn set_next_turn_state(&self, req: &NextTurnStateRequest) -> Result<(), ApiError> {
        self.post_unit("/players/current/turn-state", req).await
    }

    async fn receive_bonus_card(&self, req: &CardRequest) -> Result<(), ApiError> {
        self.post_unit("/bonus-cards", req).await
    }

    async fn use_bonus_card(&self, req: &CardRequest) -> Result<(), ApiError> {
        self.post_unit("/bonus-cards/use", req).await
    }

    async fn steal_bonus_card(&self, req: &StealCardRequest) -> Result<(), ApiError> {
        self.post_unit("/bonus-cards/steal", req).await
    }

    async fn lose_bonus_card(&self, req: &LoseCardRequest) -> Result<(), ApiError> {
        self.post_unit("/bonus-cards/lose", req).await
    }

    async fn activate_instant_card(&self, req: &InstantCardRequest) -> Result<InstantCardResponse, ApiError> {
        self.post("/bonus-cards/instant", req).await
    }

    async fn submit_game_review(&self, req: &GameReviewRequest) -> Result<(), ApiError> {
        self.post_unit("/games", req).await
    }

    async fn fetch_players(&self) -> Result<Vec<Player>, ApiError> {
        #[derive(serde::Deserialize)]
        struct Players {
            players: Vec<Player>,
        }
        let body: Players = self.get("/players").await?;
        Ok(body.players)
    }

    async fn fetch_current_player(&self) -> Result<Player, ApiError> {
        self.get("/players/current").await
    }
}
