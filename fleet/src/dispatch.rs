//! Fan one operation out across a device set
//!
//! Every device gets its own tokio task. Tasks are not gated here: the
//! [`ConcurrencyGate`](crate::exec::ConcurrencyGate) inside the bridge caps
//! how many external processes run, not how many device tasks exist. The
//! call joins every task before returning, and a failed or panicking task
//! still leaves an entry for its device.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use fleet_common::FleetResult;
use futures_util::future::join_all;
use thiserror::Error;
use tracing::{info, warn};

use crate::sink::OutputSink;

/// Why a device produced no value
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),

    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Outcome of one dispatch call, exactly one entry per device
pub type ResultSet<T> = BTreeMap<String, Result<T, TaskError>>;

pub struct Dispatcher {
    sink: Arc<OutputSink>,
    announce: bool,
}

impl Dispatcher {
    pub fn new(sink: Arc<OutputSink>) -> Self {
        Self {
            sink,
            announce: true,
        }
    }

    /// Keep the device count out of the sink (it is still logged)
    pub fn quiet(mut self) -> Self {
        self.announce = false;
        self
    }

    /// Run `op(device, args)` for every device concurrently and wait for all.
    ///
    /// Duplicate identifiers are collapsed. `args` is shared by reference
    /// count between the tasks.
    pub async fn dispatch_all<A, T, F, Fut>(
        &self,
        devices: impl IntoIterator<Item = String>,
        args: A,
        op: F,
    ) -> ResultSet<T>
    where
        A: Send + Sync + 'static,
        T: Send + 'static,
        F: Fn(String, Arc<A>) -> Fut,
        Fut: Future<Output = FleetResult<T>> + Send + 'static,
    {
        let devices: BTreeSet<String> = devices.into_iter().collect();

        if self.announce {
            self.sink
                .print_line(format!("running on {} devices.", devices.len()));
        }
        info!(devices = devices.len(), "Dispatching operation");

        if devices.is_empty() {
            return BTreeMap::new();
        }

        let args = Arc::new(args);
        let (ids, handles): (Vec<_>, Vec<_>) = devices
            .into_iter()
            .map(|device| {
                let task = tokio::spawn(op(device.clone(), args.clone()));
                (device, task)
            })
            .unzip();

        let joined = join_all(handles).await;

        ids.into_iter()
            .zip(joined)
            .map(|(device, joined)| {
                let outcome = match joined {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => {
                        warn!(device = %device, "Device task failed: {}", e);
                        Err(TaskError::Failed(e.to_string()))
                    }
                    Err(e) if e.is_panic() => {
                        let message = panic_message(e.into_panic());
                        warn!(device = %device, "Device task panicked: {}", message);
                        Err(TaskError::Panicked(message))
                    }
                    // Tasks are never aborted here, so any other join error is a runtime fault.
                    Err(e) => {
                        warn!(device = %device, "Device task did not complete: {}", e);
                        Err(TaskError::Failed(e.to_string()))
                    }
                };
                (device, outcome)
            })
            .collect()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
