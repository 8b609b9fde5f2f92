use crate::config::{
    DEFAULT_DISPLAY_COUNTS, ENV_HUB_PASSWORD, ENV_HUB_URL, ENV_PORT, Settings,
    VIEWER_SERVICE_PORT, app_name, version,
};
use crate::utils::shutdown::SignalOfStop;
use clap::{Arg, ArgMatches, Command};
use log::error;
use std::{env, panic, process};

pub mod config;
pub mod hub;
pub mod rotation;
pub mod scene;
pub mod utils;

fn main() {
    tracing_subscriber::fmt::init();

    let matches = Command::new(app_name())
        .version(version())
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port of the viewer-facing WebSocket service.")
                .required(false),
        )
        .arg(
            Arg::new("hub-url")
                .long("hub-url")
                .value_name("URL")
                .help("WebSocket address of the media hub holding the scene library.")
                .required(false),
        )
        .arg(
            Arg::new("hub-password")
                .long("hub-password")
                .value_name("PASSWORD")
                .help("Password presented to the hub on loadScene requests.")
                .required(false),
        )
        .get_matches();

    let settings = match resolve_settings(&matches) {
        Ok(settings) => settings,
        Err(message) => {
            error!("{message}");
            process::exit(2);
        }
    };

    // kill the main thread as soon as a secondary thread panics
    let orig_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // invoke the default handler and exit the process
        orig_hook(panic_info);
        process::exit(105);
    }));

    let sos = SignalOfStop::new();

    // gracefully close the app when receiving SIGINT, SIGTERM, or SIGHUP
    let cancel = sos.clone();
    ctrlc::set_handler(move || {
        cancel.cancel();
    })
    .expect("Error setting Ctrl-C handler");

    let runtime = tokio::runtime::Runtime::new().expect("Failed to start the tokio runtime");
    if let Err(error) = runtime.block_on(hub::run(settings, sos)) {
        error!("service failed: {error:#}");
        process::exit(1);
    }
}

/// CLI flags win over environment variables; the hub address is the only
/// setting without a built-in default.
fn resolve_settings(matches: &ArgMatches) -> Result<Settings, String> {
    let port = match matches
        .get_one::<String>("port")
        .cloned()
        .or_else(|| env::var(ENV_PORT).ok())
    {
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|_| format!("invalid port: {raw}"))?,
        None => VIEWER_SERVICE_PORT,
    };

    let hub_url = matches
        .get_one::<String>("hub-url")
        .cloned()
        .or_else(|| env::var(ENV_HUB_URL).ok())
        .ok_or_else(|| format!("no hub address given (--hub-url or {ENV_HUB_URL})"))?;

    let hub_password = matches
        .get_one::<String>("hub-password")
        .cloned()
        .or_else(|| env::var(ENV_HUB_PASSWORD).ok())
        .unwrap_or_default();

    Ok(Settings {
        port,
        hub_url,
        hub_password,
        default_display_counts: DEFAULT_DISPLAY_COUNTS.clone(),
    })
}
