//! Post-connect policy tasks.
//!
//! A [`ConnectionPolicy`] is an ordered list of tasks that run after the
//! wallet handshake but before the session is considered established, for
//! things like backend sign-in or entitlement checks. While the policy runs
//! the manager's externally visible state stays `connecting`. A required
//! task failure rolls the whole session back; optional failures are
//! recorded and tolerated.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::WalletError;

use super::manager::WalletManager;

/// How a task behaves during silent auto-connect, where no user gesture is
/// available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoBehavior {
	/// Run the task exactly as during an explicit connect.
	Run,
	/// Skip the task; it needs a user gesture or is not worth an auto run.
	#[default]
	Skip,
}

/// What one task reports back on completion.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
	pub success: bool,
	pub data: Option<serde_json::Value>,
}

impl TaskOutcome {
	pub fn ok() -> Self {
		Self {
			success: true,
			data: None,
		}
	}

	pub fn ok_with(data: serde_json::Value) -> Self {
		Self {
			success: true,
			data: Some(data),
		}
	}

	/// A soft failure: the task ran to completion but did not succeed.
	pub fn failed() -> Self {
		Self {
			success: false,
			data: None,
		}
	}
}

/// One unit of post-connect work.
#[async_trait]
pub trait PolicyTask: Send + Sync {
	/// Unique, non-empty identifier within the policy.
	fn id(&self) -> &str;

	/// Whether a failure of this task rolls the session back.
	fn required(&self) -> bool {
		true
	}

	fn auto_behavior(&self) -> AutoBehavior {
		AutoBehavior::default()
	}

	async fn run(&self, manager: &WalletManager) -> Result<TaskOutcome, WalletError>;
}

/// Validated, ordered task list.
#[derive(Clone)]
pub struct ConnectionPolicy {
	tasks: Vec<Arc<dyn PolicyTask>>,
	/// Whether a successful silent resume emits connect events.
	pub emit_events_on_auto_connect: bool,
}

impl ConnectionPolicy {
	/// Build a policy, rejecting empty or duplicate task ids.
	pub fn new(tasks: Vec<Arc<dyn PolicyTask>>) -> Result<Self, WalletError> {
		let mut seen = HashSet::new();
		for task in &tasks {
			if task.id().is_empty() {
				return Err(WalletError::configuration_invalid(
					"policy task id must not be empty",
				));
			}
			if !seen.insert(task.id().to_string()) {
				return Err(WalletError::configuration_invalid(format!(
					"duplicate policy task id: {}",
					task.id()
				)));
			}
		}
		Ok(Self {
			tasks,
			emit_events_on_auto_connect: true,
		})
	}

	pub fn silent_auto_connect(mut self) -> Self {
		self.emit_events_on_auto_connect = false;
		self
	}

	pub fn tasks(&self) -> &[Arc<dyn PolicyTask>] {
		&self.tasks
	}
}

/// Why the engine is running the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyMode {
	/// User-initiated connect; every task runs.
	Explicit,
	/// Silent resume; only tasks opting into auto runs execute.
	AutoConnect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
	Succeeded,
	Skipped,
	/// The task failed but was optional; the session survives.
	FailedOptional,
	/// The task failed and was required; the session was rolled back.
	FailedRequired,
}

#[derive(Debug, Clone)]
pub struct TaskResult {
	pub task_id: String,
	pub status: TaskStatus,
	pub data: Option<serde_json::Value>,
	pub error: Option<WalletError>,
}

/// Per-task account of one policy run.
#[derive(Debug, Clone, Default)]
pub struct PolicyReport {
	pub results: Vec<TaskResult>,
}

impl PolicyReport {
	pub fn succeeded(&self) -> bool {
		!self
			.results
			.iter()
			.any(|result| result.status == TaskStatus::FailedRequired)
	}
}

/// Runs a policy's tasks sequentially against a freshly connected manager.
pub struct PolicyEngine;

impl PolicyEngine {
	/// Execute the policy.
	///
	/// Tasks run in order; in auto-connect mode, tasks that do not opt into
	/// auto runs are skipped. The first required failure stops the run and
	/// disconnects the session. The report covers every task up to and
	/// including the fatal one.
	pub async fn run(
		manager: &WalletManager,
		policy: &ConnectionPolicy,
		mode: PolicyMode,
	) -> Result<PolicyReport, WalletError> {
		if policy.tasks.is_empty() {
			return Ok(PolicyReport::default());
		}

		manager.begin_policy_gate();
		let mut report = PolicyReport::default();
		let mut fatal: Option<WalletError> = None;

		for task in &policy.tasks {
			if mode == PolicyMode::AutoConnect && task.auto_behavior() != AutoBehavior::Run {
				debug!(task = %task.id(), "skipping task during auto-connect");
				report.results.push(TaskResult {
					task_id: task.id().to_string(),
					status: TaskStatus::Skipped,
					data: None,
					error: None,
				});
				continue;
			}

			let (failure, data) = match task.run(manager).await {
				Ok(outcome) if outcome.success => {
					debug!(task = %task.id(), "policy task succeeded");
					report.results.push(TaskResult {
						task_id: task.id().to_string(),
						status: TaskStatus::Succeeded,
						data: outcome.data,
						error: None,
					});
					continue;
				}
				Ok(outcome) => (
					WalletError::policy_failed(format!("task {} reported failure", task.id())),
					outcome.data,
				),
				Err(err) => (err, None),
			};

			if task.required() {
				warn!(task = %task.id(), "required policy task failed: {failure}");
				report.results.push(TaskResult {
					task_id: task.id().to_string(),
					status: TaskStatus::FailedRequired,
					data,
					error: Some(failure.clone()),
				});
				fatal = Some(failure);
				break;
			}
			warn!(task = %task.id(), "optional policy task failed, continuing: {failure}");
			report.results.push(TaskResult {
				task_id: task.id().to_string(),
				status: TaskStatus::FailedOptional,
				data,
				error: Some(failure),
			});
		}

		if let Some(failure) = fatal {
			// Roll back while the gate still pins the state to connecting;
			// observers must never see the doomed session as connected.
			manager.disconnect().await;
			manager.end_policy_gate();
			return Err(WalletError::policy_failed(format!(
				"connection policy failed: {failure}"
			))
			.caused_by(failure));
		}
		manager.end_policy_gate();
		info!(tasks = report.results.len(), "connection policy completed");
		Ok(report)
	}
}
