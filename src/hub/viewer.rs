//! Viewer-facing service
//!
//! One WebSocket per display-wall viewer. Each accepted connection gets its
//! own scheduler instance; inbound frames are viewer requests, outbound
//! frames are show/transition events. Connections never share state, so a
//! misbehaving viewer only ever breaks its own rotation.

use crate::config::Settings;
use crate::hub::HubClient;
use crate::hub::protocol::{ViewerEvent, ViewerRequest};
use crate::rotation::{QueueEvent, SceneOptions, Scheduler, SchedulerHandle, TagList};
use crate::utils::shutdown::SignalOfStop;
use anyhow::{Context, Result};
use async_tungstenite::tokio::accept_async;
use async_tungstenite::tungstenite::Message;
use futures_util::{SinkExt, StreamExt};
use local_ip_address::local_ip;
use log::{info, warn};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Accept viewer connections until the shutdown signal fires.
pub async fn serve(settings: Settings, sos: SignalOfStop) -> Result<()> {
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, settings.port))
        .await
        .with_context(|| format!("binding viewer service to port {}", settings.port))?;

    match local_ip() {
        Ok(ip) => info!("viewer service listening on {ip}:{}", settings.port),
        Err(_) => info!("viewer service listening on port {}", settings.port),
    }

    let hub = Arc::new(HubClient::new(
        settings.hub_url.clone(),
        settings.hub_password.clone(),
    ));

    loop {
        let (stream, peer) = listener.accept().await.context("accepting connection")?;
        info!("viewer connected from {peer}");

        let hub = hub.clone();
        let defaults = settings.default_display_counts.clone();
        sos.spawn(async move {
            match handle_viewer(stream, hub, defaults).await {
                Ok(()) => info!("viewer {peer} disconnected"),
                Err(error) => warn!("viewer {peer}: connection ended: {error:#}"),
            }
        });
    }
}

/// Per-connection bootstrap: one scheduler, one socket, one pump loop.
async fn handle_viewer(
    stream: TcpStream,
    hub: Arc<HubClient>,
    defaults: HashMap<String, usize>,
) -> Result<()> {
    let socket = accept_async(stream).await.context("websocket handshake")?;
    let (mut sink, mut source) = socket.split();

    let (events, mut inbox) = mpsc::unbounded_channel::<QueueEvent>();
    let scheduler = Scheduler::spawn(defaults, events);

    loop {
        tokio::select! {
            event = inbox.recv() => {
                let Some(event) = event else { break };
                let frame = serde_json::to_string(&ViewerEvent::from(event))?;
                sink.send(Message::text(frame)).await?;
            }
            frame = source.next() => {
                let Some(frame) = frame else { break };
                match frame? {
                    Message::Text(text) => match serde_json::from_str::<ViewerRequest>(text.as_str()) {
                        Ok(request) => handle_request(request, &scheduler, &hub).await,
                        Err(error) => warn!("ignoring unintelligible viewer request: {error}"),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    // disarm the timer; the task itself dies with the last handle
    scheduler.stop();
    Ok(())
}

/// Apply one viewer request. Failures are reported and the connection kept:
/// a scene that fails to load or parse leaves the previous one playing.
async fn handle_request(request: ViewerRequest, scheduler: &SchedulerHandle, hub: &HubClient) {
    match request {
        ViewerRequest::PlayScene {
            scene_id,
            retire_active,
        } => {
            let raw = match hub.load_scene(&scene_id).await {
                Ok(raw) => raw,
                Err(error) => {
                    warn!("scene {scene_id} could not be loaded: {error:#}");
                    return;
                }
            };
            match scheduler
                .set_scene(raw, SceneOptions { retire_active })
                .await
            {
                Ok(()) => scheduler.play(),
                Err(error) => warn!("scene {scene_id} was rejected: {error}"),
            }
        }
        ViewerRequest::Stop => scheduler.stop(),
        ViewerRequest::MediaTransitioning { id } => scheduler.media_transitioning(id),
        ViewerRequest::MediaDone { id } => scheduler.media_done(id),
        ViewerRequest::SetTagFilter { tags } => {
            scheduler.set_tag_filter(Arc::new(TagList::new(tags)));
        }
    }
}
