//! Commands that talk to a running server.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use facility_protocol::{Request, Response};

use crate::config::ServerSettings;
use crate::error::{ClientError, ClientResult};
use crate::invoker::InvocationClient;
use crate::output;

/// How replies are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Text,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

/// Resolves the server from settings and applies the retry policy.
pub async fn connect(settings: &ServerSettings) -> ClientResult<InvocationClient> {
    let client = InvocationClient::resolve(&settings.host, settings.port)
        .await?
        .with_timeout(settings.timeout())
        .with_max_attempts(settings.max_attempts);
    debug!(server = %client.server(), local = %client.local_addr()?, "Client ready");
    Ok(client)
}

/// Prints a reply and turns a failure status into an error.
fn emit(response: Response, mode: OutputMode) -> ClientResult<()> {
    match mode {
        OutputMode::Json => print_json(&response)?,
        OutputMode::Text if response.is_success() => {
            print!("{}", output::render_response(&response))
        }
        OutputMode::Text => {}
    }
    if response.is_success() {
        Ok(())
    } else {
        Err(ClientError::Server {
            status: response.status,
            message: response.message,
        })
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> ClientResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::Output(format!("failed to serialize output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

/// Lists the catalogue.
pub fn facilities() -> ClientResult<()> {
    print!("{}", output::render_facilities());
    Ok(())
}

pub async fn request(
    client: &mut InvocationClient,
    request: Request,
    mode: OutputMode,
) -> ClientResult<()> {
    let response = client.invoke(&request).await?;
    emit(response, mode)
}

/// Registers for updates and prints each one until the interval ends.
pub async fn observe(
    client: &mut InvocationClient,
    facility: &str,
    minutes: i32,
    mode: OutputMode,
) -> ClientResult<()> {
    let response = client.observe(facility, minutes).await?;
    emit(response, mode)?;

    let interval = Duration::from_secs(u64::try_from(minutes).unwrap_or(0) * 60);
    let deadline = Instant::now() + interval;
    info!(facility, minutes, "Waiting for updates");

    while let Some(update) = client.next_update(deadline).await? {
        match mode {
            OutputMode::Json => print_json(&update)?,
            OutputMode::Text => print!("{}", output::render_update(&update)),
        }
    }
    info!(facility, "Observation interval ended");
    Ok(())
}

/// Prints whether the server answered.
pub async fn ping(client: &mut InvocationClient) -> ClientResult<()> {
    if client.ping().await? {
        println!("Server at {} is alive.", client.server());
        Ok(())
    } else {
        Err(ClientError::RequestFailed {
            attempts: client.max_attempts(),
        })
    }
}
