//! Scene loading from the hub

use crate::hub::protocol::{HubRequest, HubResponse};
use anyhow::{Context, Result, anyhow};
use async_tungstenite::tokio::connect_async;
use async_tungstenite::tungstenite::Message;
use futures_util::{SinkExt, StreamExt};
use log::debug;
use serde_json::Value;

/// Client for the media hub holding the scene library.
#[derive(Debug, Clone)]
pub struct HubClient {
    url: String,
    password: String,
}

impl HubClient {
    pub fn new(url: String, password: String) -> Self {
        Self { url, password }
    }

    /// Fetch a scene document by id.
    ///
    /// One request/response exchange per call; the connection is not kept
    /// open between loads.
    pub async fn load_scene(&self, scene_id: &str) -> Result<Value> {
        debug!("loading scene {scene_id} from {}", self.url);

        let (mut socket, _) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("connecting to hub at {}", self.url))?;

        let request = HubRequest::LoadScene {
            scene_id: scene_id.to_string(),
            password: self.password.clone(),
        };
        socket
            .send(Message::text(serde_json::to_string(&request)?))
            .await
            .context("sending loadScene request")?;

        let outcome = loop {
            let Some(frame) = socket.next().await else {
                break Err(anyhow!("hub closed the connection before answering"));
            };
            match frame? {
                Message::Text(text) => {
                    let response: HubResponse = serde_json::from_str(text.as_str())
                        .context("parsing hub response")?;
                    break match response {
                        HubResponse::Scene { scene } => Ok(scene),
                        HubResponse::Error { message } => {
                            Err(anyhow!("hub refused loadScene for {scene_id}: {message}"))
                        }
                    };
                }
                Message::Close(_) => {
                    break Err(anyhow!("hub closed the connection before answering"));
                }
                _ => continue,
            }
        };

        let _ = socket.close(None).await;
        outcome
    }
}
