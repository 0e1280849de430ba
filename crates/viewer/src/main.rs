use anyhow::Context;
use clap::Parser;
use common::{Environment, LogLevel};
use protocol::TransportDescriptor;
use viewer::{Capability, ConnectionState, NegotiationClient, RenderState, StreamSession};

/// Watch a remote object detection stream from the terminal.
#[derive(Parser, Debug)]
#[command(name = "viewer", version)]
struct Args {
    /// Address of the camera to stream, e.g. 192.168.1.100
    camera_address: String,

    /// Negotiation endpoint
    #[arg(
        long,
        env = "VIEWER_NEGOTIATOR_URL",
        default_value = "http://127.0.0.1:8080/negotiate"
    )]
    negotiator: String,

    /// Token of the signed-in session; negotiation is refused without one
    #[arg(long, env = "VIEWER_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,

    /// Show relay setup instructions
    #[arg(long)]
    admin: bool,

    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    common::setup_logging("viewer", log_level, Environment::Development);

    let capability = if args.admin {
        Capability::Admin
    } else {
        Capability::Viewer
    };

    let has_session = args
        .session_token
        .as_deref()
        .is_some_and(|token| !token.is_empty());

    let client = NegotiationClient::new(&args.negotiator);
    let descriptor = client
        .negotiate(&has_session, &args.camera_address)
        .await
        .context("failed to negotiate a stream session")?;

    show_setup(capability, &descriptor);

    let mut session = StreamSession::new();
    let mut updates = session.subscribe();
    session.connect(&descriptor).await;

    let mut last_view = String::new();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                report(&state, &mut last_view);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping viewer");
                break;
            }
        }
    }

    session.disconnect().await;
    Ok(())
}

fn show_setup(capability: Capability, descriptor: &TransportDescriptor) {
    for line in capability.setup_lines(descriptor) {
        tracing::info!("{}", line);
    }
}

fn report(state: &ConnectionState, last_view: &mut String) {
    let view = state.render();
    let summary = view.to_string();
    if summary != *last_view {
        tracing::info!(phase = ?state.phase, "{}", summary);
        *last_view = summary;
    }

    if let RenderState::Live {
        frame: Some(frame),
        detections,
    } = view
    {
        let rows: Vec<String> = detections.iter().map(|d| d.label()).collect();
        tracing::debug!(
            bytes = frame.bytes().len(),
            dimensions = ?frame.dimensions(),
            detections = ?rows,
            "Frame"
        );
    }
}
