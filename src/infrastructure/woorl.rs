use crate::domain::endpoint::Endpoint;
use crate::domain::ports::{CallOutcome, RpcArg, RpcTransport};
use crate::domain::service::{ServiceDescriptor, ServiceRegistry};
use crate::error::{OpsError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Extra time the child gets past its own deadline before it is killed.
pub const PROCESS_GRACE: Duration = Duration::from_secs(30);

/// Raw result of one woorl process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Exit status; `None` if the process was terminated by a signal.
    pub status: Option<i32>,
    /// Stdout followed by stderr.
    pub output: String,
}

impl Invocation {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Calls Thrift services by running the `woorl` command line client.
///
/// One process per call; calls never overlap because every caller awaits the
/// previous one before issuing the next.
pub struct WoorlGateway {
    registry: Arc<ServiceRegistry>,
    endpoint: Endpoint,
    command: Vec<String>,
    deadline: Duration,
    grace: Duration,
    dry_run: bool,
}

impl WoorlGateway {
    /// `command` is the woorl invocation, split on whitespace so that wrappers
    /// such as `docker run ... woorl` work. Empty means plain `woorl`.
    pub fn new(registry: Arc<ServiceRegistry>, endpoint: Endpoint, command: &str) -> Self {
        let mut command: Vec<String> = command.split_whitespace().map(str::to_string).collect();
        if command.is_empty() {
            command.push("woorl".to_string());
        }
        Self {
            registry,
            endpoint,
            command,
            deadline: DEFAULT_DEADLINE,
            grace: PROCESS_GRACE,
            dry_run: false,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// How long a child may outlive its deadline before it is killed.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Log every command instead of running it.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Full argv for calling `function` on `descriptor` at `url`.
    pub fn command_line(
        &self,
        url: &str,
        descriptor: &ServiceDescriptor,
        function: &str,
        args: &[RpcArg],
    ) -> Vec<String> {
        let mut argv = self.command.clone();
        argv.push(format!("--deadline={}s", self.deadline.as_secs()));
        argv.push("-s".to_string());
        argv.push(descriptor.schema.display().to_string());
        argv.push(url.to_string());
        argv.push(descriptor.interface.clone());
        argv.push(function.to_string());
        argv.extend(args.iter().map(RpcArg::to_wire));
        argv
    }

    /// Runs one call and returns its exit status and output.
    pub async fn invoke(
        &self,
        url: &str,
        descriptor: &ServiceDescriptor,
        function: &str,
        args: &[RpcArg],
    ) -> Result<Invocation> {
        let argv = self.command_line(url, descriptor, function, args);

        if self.dry_run {
            info!(command = %argv.join(" "), "dry run, call skipped");
            return Ok(Invocation {
                status: Some(0),
                output: String::new(),
            });
        }
        debug!(command = %argv.join(" "), "calling woorl");

        let child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OpsError::Spawn {
                program: argv[0].clone(),
                source,
            })?;

        let limit = self.deadline + self.grace;
        let output = tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| OpsError::Timeout {
                service: descriptor.interface.clone(),
                function: function.to_string(),
                secs: limit.as_secs(),
            })??;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(Invocation {
            status: output.status.code(),
            output: text,
        })
    }

    async fn run(&self, service: &str, function: &str, args: &[RpcArg]) -> Result<Invocation> {
        let descriptor = self.registry.resolve(service)?;
        let url = self.endpoint.url(descriptor);
        self.invoke(&url, descriptor, function, args).await
    }
}

#[async_trait]
impl RpcTransport for WoorlGateway {
    async fn call(&self, service: &str, function: &str, args: &[RpcArg]) -> Result<String> {
        let invocation = self.run(service, function, args).await?;
        if invocation.success() {
            Ok(invocation.output)
        } else {
            Err(OpsError::CallFailed {
                service: service.to_string(),
                function: function.to_string(),
                status: invocation.status.unwrap_or(1),
                output: invocation.output.trim().to_string(),
            })
        }
    }

    async fn call_tolerant(
        &self,
        service: &str,
        function: &str,
        args: &[RpcArg],
    ) -> Result<CallOutcome> {
        let invocation = match self.run(service, function, args).await {
            Ok(invocation) => invocation,
            Err(e @ OpsError::Timeout { .. }) => {
                warn!(service, function, "{e}");
                return Ok(CallOutcome::Failed);
            }
            Err(e) => return Err(e),
        };
        if invocation.success() {
            Ok(CallOutcome::Completed(invocation.output))
        } else {
            warn!(
                service,
                function,
                status = ?invocation.status,
                output = %invocation.output.trim(),
                "call rejected"
            );
            Ok(CallOutcome::Failed)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::application::purge::{PurgeOrchestrator, PurgeOutcome};
    use crate::domain::service::DOMAIN_CONFIG_REPOSITORY;
    use serde_json::json;

    fn gateway(command: &str) -> WoorlGateway {
        let endpoint = Endpoint {
            host: "dominant".to_string(),
            port: 8022,
        };
        WoorlGateway::new(Arc::new(ServiceRegistry::builtin()), endpoint, command)
    }

    #[test]
    fn test_command_line_layout() {
        let gw = gateway("");
        let registry = ServiceRegistry::builtin();
        let descriptor = registry.resolve(DOMAIN_CONFIG_REPOSITORY).unwrap();
        let argv = gw.command_line(
            "http://dominant:8022/v1/domain/repository",
            descriptor,
            "Commit",
            &[RpcArg::from("7".to_string()), RpcArg::from(json!({"ops": []}))],
        );
        assert_eq!(
            argv,
            vec![
                "woorl",
                "--deadline=30s",
                "-s",
                "../../damsel/proto/domain_config.thrift",
                "http://dominant:8022/v1/domain/repository",
                "Repository",
                "Commit",
                "7",
                r#"{"ops":[]}"#,
            ]
        );
    }

    #[tokio::test]
    async fn test_call_returns_output() {
        let output = gateway("echo")
            .call(DOMAIN_CONFIG_REPOSITORY, "Checkout", &[json!({"head": {}}).into()])
            .await
            .unwrap();
        assert!(output.contains("http://dominant:8022/v1/domain/repository Repository Checkout"));
        assert!(output.contains(r#"{"head":{}}"#));
    }

    #[tokio::test]
    async fn test_strict_call_propagates_status() {
        let err = gateway("false")
            .call(DOMAIN_CONFIG_REPOSITORY, "Checkout", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::CallFailed { status: 1, .. }));
    }

    #[tokio::test]
    async fn test_tolerant_call_reports_failure() {
        let outcome = gateway("false")
            .call_tolerant(DOMAIN_CONFIG_REPOSITORY, "Commit", &[])
            .await
            .unwrap();
        assert_eq!(outcome, CallOutcome::Failed);
    }

    #[tokio::test]
    async fn test_unknown_service_fails_before_spawning() {
        let err = gateway("echo")
            .call("no_such_service", "Checkout", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::UnknownService(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error_even_when_tolerant() {
        let err = gateway("opsctl-test-no-such-binary")
            .call_tolerant(DOMAIN_CONFIG_REPOSITORY, "Commit", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::Spawn { .. }));
    }

    /// Writes `body` as a shell script and returns a woorl command running it.
    fn script(dir: &std::path::Path, body: &str) -> String {
        let path = dir.join("woorl.sh");
        std::fs::write(&path, format!("{body}\n")).unwrap();
        format!("sh {}", path.display())
    }

    #[tokio::test]
    async fn test_strict_call_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let err = gateway(&script(dir.path(), "exec sleep 5"))
            .with_deadline(Duration::ZERO)
            .with_grace(Duration::from_millis(200))
            .call(DOMAIN_CONFIG_REPOSITORY, "Checkout", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_hung_commit_fails_only_its_object() {
        let dir = tempfile::tempdir().unwrap();
        let checkout = json!({
            "version": 4,
            "domain": [
                {"value": {"category": {"ref": {"id": 1}, "data": {}}}},
                {"value": {"category": {"ref": {"id": 2}, "data": {}}}}
            ]
        });
        let command = script(
            dir.path(),
            &format!(
                "case \"$6\" in\n  Checkout) echo '{checkout}' ;;\n  Commit) case \"$8\" in *'\"id\":1'*) exec sleep 5 ;; *) echo ok ;; esac ;;\nesac"
            ),
        );

        let gw = gateway(&command)
            .with_deadline(Duration::ZERO)
            .with_grace(Duration::from_millis(500));
        let orchestrator = PurgeOrchestrator::new(Box::new(gw));

        let report = orchestrator.purge(1).await.unwrap();

        assert_eq!(report.outcome, PurgeOutcome::Exhausted);
        assert_eq!(report.removed, 1);
        assert_eq!((report.attempts[0].removed, report.attempts[0].failed), (1, 1));
        assert_eq!(report.expected_version, 5);
    }

    #[tokio::test]
    async fn test_dry_run_does_not_execute() {
        let outcome = gateway("false")
            .dry_run(true)
            .call_tolerant(DOMAIN_CONFIG_REPOSITORY, "Commit", &[])
            .await
            .unwrap();
        assert_eq!(outcome, CallOutcome::Completed(String::new()));
    }
}
