use crate::prelude::*;
use crate::status;

use std::time::Duration;
use tokio::sync::broadcast;

/// What the CLI was asked to fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Command(String),
    Status,
    SerialNumber,
}

impl Request {
    /// Runs the request against the inverter and renders it for printing. Blocking.
    pub fn render(&self, session: &InverterSession) -> Result<String> {
        match self {
            Request::Command(text) => {
                let execution = session.execute(text)?;
                Ok(render_execution(&execution))
            }
            Request::Status => Ok(serde_json::to_string_pretty(&status::report(session)?)?),
            Request::SerialNumber => Ok(session
                .serial_number()?
                .unwrap_or_else(|| "unknown".to_string())),
        }
    }
}

pub fn render_execution(execution: &Execution) -> String {
    if let Some(e) = execution.error() {
        return format!("{}: no response ({})", execution.command(), e);
    }
    match execution.fields() {
        Ok(fields) => fields
            .iter()
            .map(|f| format!("{:<40}\t{}\t{}", f.key, f.value, f.unit).trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        Err(e) => {
            debug!("{}", e);
            format!(
                "{}: {:?}",
                execution.command(),
                String::from_utf8_lossy(execution.response().unwrap_or_default())
            )
        }
    }
}

/// Repeats a request on a fixed interval until shut down.
pub struct Scheduler {
    session: Arc<InverterSession>,
    request: Request,
    interval: Duration,
}

impl Scheduler {
    pub fn new(session: Arc<InverterSession>, request: Request, interval: Duration) -> Self {
        Self {
            session,
            request,
            interval,
        }
    }

    /// Runs the request once on the blocking pool.
    pub async fn run_once(&self) -> Result<String> {
        let session = self.session.clone();
        let request = self.request.clone();
        tokio::task::spawn_blocking(move || request.render(&session)).await?
    }

    pub async fn start(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.run_once().await {
                        Ok(output) => println!("{}", output),
                        Err(e) => error!("{:?} failed: {:#}", self.request, e),
                    }
                }
                _ = shutdown.recv() => {
                    info!("scheduler received shutdown signal");
                    break;
                }
            }
        }

        Ok(())
    }
}
