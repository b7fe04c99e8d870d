//! Scripted [`CommandRunner`] for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fleet_common::{FleetError, FleetResult};

use crate::exec::{CommandRunner, ExecResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub argv: Vec<String>,
    pub timeout: Option<Duration>,
}

/// Shared record of every command line the fake saw
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn all(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.all()
            .iter()
            .filter(|c| c.argv.join(" ").contains(needle))
            .count()
    }

    pub fn find(&self, needle: &str) -> Option<Call> {
        self.all()
            .into_iter()
            .find(|c| c.argv.join(" ").contains(needle))
    }
}

/// Records the highest number of simultaneous `run` calls
#[derive(Clone, Default)]
pub struct ConcurrencyProbe {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

enum Response {
    Output(String),
    Sequence(Mutex<VecDeque<String>>),
    Fail,
    Timeout,
}

/// Fake bridge: the first rule whose needle occurs in the joined command
/// line decides the response; unmatched commands succeed with no output.
#[derive(Default)]
pub struct FakeRunner {
    rules: Vec<(String, Response)>,
    calls: CallLog,
    delay: Option<Duration>,
    probe: ConcurrencyProbe,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, needle: &str, stdout: &str) -> Self {
        self.rules
            .push((needle.to_string(), Response::Output(stdout.to_string())));
        self
    }

    /// Successive matches return successive outputs; the last one repeats
    pub fn respond_sequence(mut self, needle: &str, outputs: Vec<String>) -> Self {
        self.rules.push((
            needle.to_string(),
            Response::Sequence(Mutex::new(outputs.into())),
        ));
        self
    }

    pub fn fail_on(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Response::Fail));
        self
    }

    pub fn time_out_on(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Response::Timeout));
        self
    }

    /// Every call sleeps this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }

    pub fn probe(&self) -> ConcurrencyProbe {
        self.probe.clone()
    }

    fn respond_to(&self, argv: &[String]) -> FleetResult<ExecResult> {
        let line = argv.join(" ");
        let Some((_, response)) = self.rules.iter().find(|(needle, _)| line.contains(needle.as_str()))
        else {
            return Ok(ExecResult::completed("", "", 0));
        };

        match response {
            Response::Output(stdout) => Ok(ExecResult::completed(stdout.clone(), "", 0)),
            Response::Sequence(outputs) => {
                let mut outputs = outputs.lock().unwrap();
                let stdout = if outputs.len() > 1 {
                    outputs.pop_front().unwrap_or_default()
                } else {
                    outputs.front().cloned().unwrap_or_default()
                };
                Ok(ExecResult::completed(stdout, "", 0))
            }
            Response::Fail => Err(FleetError::spawn(
                argv,
                std::io::Error::new(std::io::ErrorKind::NotFound, "fake launch failure"),
            )),
            Response::Timeout => Ok(ExecResult {
                timed_out: true,
                ..ExecResult::absent()
            }),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, argv: &[String], timeout: Option<Duration>) -> FleetResult<ExecResult> {
        self.calls.0.lock().unwrap().push(Call {
            argv: argv.to_vec(),
            timeout,
        });

        self.probe.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.respond_to(argv);
        self.probe.exit();
        result
    }
}

/// Device source returning a fixed set of handles
pub struct StaticDevices(pub Vec<String>);

impl StaticDevices {
    pub fn new(handles: &[&str]) -> Self {
        Self(handles.iter().map(|h| h.to_string()).collect())
    }
}

#[async_trait]
impl crate::adb::DeviceSource for StaticDevices {
    async fn list_devices(
        &self,
        allow: &[String],
    ) -> FleetResult<std::collections::BTreeMap<String, crate::adb::Device>> {
        Ok(self
            .0
            .iter()
            .filter(|h| allow.is_empty() || allow.contains(h))
            .map(|h| {
                (
                    h.clone(),
                    crate::adb::Device {
                        handle: h.clone(),
                        state: "device".to_string(),
                    },
                )
            })
            .collect())
    }
}
