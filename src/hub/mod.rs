//! Transport glue between viewers, this controller and the media hub
//!
//! Everything in here is interface-boundary plumbing: JSON-over-WebSocket
//! framing, the per-connection bootstrap and the scene-library client. The
//! rotation rules themselves live in [`crate::rotation`].

pub mod client;
pub mod protocol;
pub mod viewer;

pub use client::HubClient;

use crate::config::Settings;
use crate::utils::shutdown::SignalOfStop;
use anyhow::Result;

/// Run the controller service until the shutdown signal fires.
pub async fn run(settings: Settings, sos: SignalOfStop) -> Result<()> {
    tokio::select! {
        _ = sos.wait_cancellation() => Ok(()),
        outcome = viewer::serve(settings, sos.clone()) => outcome,
    }
}
