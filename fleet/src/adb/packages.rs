use serde::Serialize;

use crate::bridge::Bridge;
use crate::exec::ExecResult;

pub const DEFAULT_ACTIVITY: &str = "MainActivity";

/// Parameters for `am start`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartRequest {
    pub package: String,
    pub activity: String,
    pub action: Option<String>,
    pub data: Option<String>,
    /// String extras passed as `-e key value`, in order
    pub extras: Vec<(String, String)>,
}

impl StartRequest {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            activity: DEFAULT_ACTIVITY.to_string(),
            action: None,
            data: None,
            extras: Vec::new(),
        }
    }

    /// Shell arguments; empty action or data strings are left out
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "am".to_string(),
            "start".to_string(),
            "-n".to_string(),
            format!("{}/.{}", self.package, self.activity),
        ];

        if let Some(data) = self.data.as_deref().filter(|d| !d.is_empty()) {
            args.push("-d".to_string());
            args.push(data.to_string());
        }
        if let Some(action) = self.action.as_deref().filter(|a| !a.is_empty()) {
            args.push("-a".to_string());
            args.push(action.to_string());
        }
        for (key, value) in &self.extras {
            args.push("-e".to_string());
            args.push(key.clone());
            args.push(value.clone());
        }

        args
    }
}

/// Whether any line of a package or process listing ends with `package`
pub fn lists_package(output: &str, package: &str) -> bool {
    output.lines().any(|line| line.trim_end().ends_with(package))
}

/// `install -r <apk>`; `apk` should already be an absolute path
pub async fn install(bridge: &Bridge, handle: &str, apk: &str) -> ExecResult {
    let argv = bridge.device_command(handle, &["install", "-r", apk]);
    bridge.run(&argv, bridge.install_options()).await
}

/// Uninstall, echoing the command and the bridge's answer
pub async fn uninstall(bridge: &Bridge, handle: &str, package: &str) -> ExecResult {
    let argv = bridge.device_command(handle, &["uninstall", package]);
    bridge.run(&argv, bridge.default_options().echoed()).await
}

pub async fn has(bridge: &Bridge, handle: &str, package: &str) -> bool {
    let result = bridge.shell(handle, &["pm", "list", "packages"]).await;
    lists_package(result.stdout_str(), package)
}

pub async fn running(bridge: &Bridge, handle: &str, package: &str) -> bool {
    let result = bridge.shell(handle, &["ps"]).await;
    lists_package(result.stdout_str(), package)
}

pub async fn start(bridge: &Bridge, handle: &str, request: &StartRequest) -> ExecResult {
    bridge.shell(handle, &request.args()).await
}

pub async fn stop(bridge: &Bridge, handle: &str, package: &str) -> ExecResult {
    bridge.shell(handle, &["am", "force-stop", package]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::exec::ConcurrencyGate;
    use crate::sink::OutputSink;
    use crate::test_support::{CallLog, FakeRunner};

    fn bridge_with(runner: FakeRunner) -> (Bridge, CallLog) {
        let calls = runner.calls();
        let (sink, _) = OutputSink::buffer();
        let bridge = Bridge::new(
            "adb",
            Arc::new(runner),
            ConcurrencyGate::default(),
            Arc::new(sink),
        );
        (bridge, calls)
    }

    #[test]
    fn test_start_args_default_activity() {
        let request = StartRequest::new("com.example.app");
        assert_eq!(
            request.args(),
            vec!["am", "start", "-n", "com.example.app/.MainActivity"]
        );
    }

    #[test]
    fn test_start_args_full() {
        let request = StartRequest {
            package: "com.example.app".to_string(),
            activity: "Splash".to_string(),
            action: Some("android.intent.action.VIEW".to_string()),
            data: Some("example://open".to_string()),
            extras: vec![("mode".to_string(), "kiosk".to_string())],
        };
        assert_eq!(
            request.args(),
            vec![
                "am",
                "start",
                "-n",
                "com.example.app/.Splash",
                "-d",
                "example://open",
                "-a",
                "android.intent.action.VIEW",
                "-e",
                "mode",
                "kiosk"
            ]
        );
    }

    #[test]
    fn test_start_args_skip_empty_strings() {
        let mut request = StartRequest::new("p");
        request.action = Some(String::new());
        request.data = Some(String::new());
        assert_eq!(request.args().len(), 4);
    }

    #[test]
    fn test_lists_package() {
        let listing = "package:com.android.settings\r\npackage:com.example.app\r\n";
        assert!(lists_package(listing, "com.example.app"));
        assert!(!lists_package(listing, "com.example"));
        assert!(!lists_package("", "com.example.app"));
    }

    #[tokio::test]
    async fn test_install_uses_install_timeout() {
        let (bridge, calls) = bridge_with(FakeRunner::new());
        install(&bridge, "dev", "/tmp/app.apk").await;

        let call = &calls.all()[0];
        assert_eq!(call.argv, vec!["adb", "-s", "dev", "install", "-r", "/tmp/app.apk"]);
        assert_eq!(call.timeout, Some(crate::bridge::INSTALL_TIMEOUT));
    }

    #[tokio::test]
    async fn test_running_reads_process_list() {
        let ps = "USER PID PPID VSIZE RSS WCHAN PC NAME\n\
            u0_a12 1234 200 100 10 0 0 S com.example.app\n";
        let (bridge, calls) = bridge_with(FakeRunner::new().respond("shell ps", ps));

        assert!(running(&bridge, "dev", "com.example.app").await);
        assert!(!running(&bridge, "dev", "com.other").await);
        assert_eq!(calls.count_matching("shell ps"), 2);
    }

    #[tokio::test]
    async fn test_stop_force_stops() {
        let (bridge, calls) = bridge_with(FakeRunner::new());
        stop(&bridge, "dev", "com.example.app").await;
        assert_eq!(
            calls.all()[0].argv,
            vec!["adb", "-s", "dev", "shell", "am", "force-stop", "com.example.app"]
        );
    }
}
