use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::{ClientConfig, ClientId};
use crate::error_log::ErrorLog;
use crate::object_type::ObjectType;
use crate::{CoreError, TokenUsage};

/// Lifecycle of a migration session.
///
/// Variants are declared in the only order a session may move through.
/// The three terminal outcomes share a rank and are mutually exclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Pending,
    Discovering,
    Exporting,
    Converting,
    Validating,
    Completed,
    Partial,
    Failed,
}

impl WorkflowStatus {
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Discovering => 1,
            Self::Exporting => 2,
            Self::Converting => 3,
            Self::Validating => 4,
            Self::Completed | Self::Partial | Self::Failed => 5,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Partial | Self::Failed)
    }

    /// Forward-only: the next status must rank strictly higher, and terminal
    /// statuses never move again. Skipping ahead (e.g. straight to `failed`) is allowed.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    /// Phase a non-terminal status corresponds to.
    #[must_use]
    pub const fn phase(self) -> Option<Phase> {
        match self {
            Self::Pending => Some(Phase::Pending),
            Self::Discovering => Some(Phase::Discovering),
            Self::Exporting => Some(Phase::Exporting),
            Self::Converting => Some(Phase::Converting),
            Self::Validating => Some(Phase::Validating),
            Self::Completed | Self::Partial | Self::Failed => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Discovering => "discovering",
            Self::Exporting => "exporting",
            Self::Converting => "converting",
            Self::Validating => "validating",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "discovering" => Ok(Self::Discovering),
            "exporting" => Ok(Self::Exporting),
            "converting" => Ok(Self::Converting),
            "validating" => Ok(Self::Validating),
            "completed" => Ok(Self::Completed),
            "partial" => Ok(Self::Partial),
            "failed" => Ok(Self::Failed),
            _ => Err(CoreError::InvalidValue { field: "workflow_status", value: s.to_owned() }),
        }
    }
}

/// Named stage within a session. Terminal sessions keep the last phase they reached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pending,
    Discovering,
    Exporting,
    Converting,
    Validating,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Discovering => "discovering",
            Self::Exporting => "exporting",
            Self::Converting => "converting",
            Self::Validating => "validating",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "discovering" => Ok(Self::Discovering),
            "exporting" => Ok(Self::Exporting),
            "converting" => Ok(Self::Converting),
            "validating" => Ok(Self::Validating),
            _ => Err(CoreError::InvalidValue { field: "phase", value: s.to_owned() }),
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Options supplied with a start request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Drop everything in the target schema before the first object is applied.
    #[serde(default)]
    pub clean_slate: bool,
    /// Synthesize missing dependencies on "relation does not exist" failures.
    #[serde(default = "default_true")]
    pub auto_create_ddl: bool,
    #[serde(default)]
    pub session_name: Option<String>,
    /// Restricts the run to these object types. `None` uses the client's configured set.
    #[serde(default)]
    pub object_types: Option<Vec<ObjectType>>,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self { clean_slate: false, auto_create_ddl: true, session_name: None, object_types: None }
    }
}

/// One run of the migration workflow for a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationSession {
    pub id: Uuid,
    pub client_id: ClientId,
    pub session_name: Option<String>,
    pub export_type: String,
    pub status: WorkflowStatus,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_objects: u32,
    pub processed_objects: u32,
    pub successful: u32,
    pub failed: u32,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost: f64,
    pub ai_calls: u32,
    pub cache_hits: u32,
    pub errors: ErrorLog,
    pub options: MigrationOptions,
    pub config_snapshot: ClientConfig,
}

impl MigrationSession {
    #[must_use]
    pub fn new(
        client_id: ClientId,
        export_type: String,
        options: MigrationOptions,
        config_snapshot: ClientConfig,
        max_errors: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            session_name: options.session_name.clone(),
            export_type,
            status: WorkflowStatus::Pending,
            phase: Phase::Pending,
            created_at: Utc::now(),
            completed_at: None,
            total_objects: 0,
            processed_objects: 0,
            successful: 0,
            failed: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            estimated_cost: 0.0,
            ai_calls: 0,
            cache_hits: 0,
            errors: ErrorLog::new(max_errors),
            options,
            config_snapshot,
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn ensure_mutable(&self) -> crate::Result<()> {
        if self.is_terminal() {
            return Err(CoreError::SessionFinalized(self.id.to_string()));
        }
        Ok(())
    }

    /// Moves to a later status. Entering a terminal status stamps `completed_at`.
    pub fn advance(&mut self, next: WorkflowStatus) -> crate::Result<()> {
        self.ensure_mutable()?;
        if !self.status.can_advance_to(next) {
            return Err(CoreError::InvalidTransition { from: self.status, to: next });
        }
        self.status = next;
        if let Some(phase) = next.phase() {
            self.phase = phase;
        } else {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Fixes `total_objects` and moves from discovering to exporting.
    pub fn finish_discovery(&mut self, total: u32) -> crate::Result<()> {
        self.ensure_mutable()?;
        if self.status != WorkflowStatus::Discovering {
            return Err(CoreError::TotalAlreadyFixed(self.total_objects));
        }
        self.total_objects = total;
        self.advance(WorkflowStatus::Exporting)
    }

    fn record_processed(&mut self) -> crate::Result<()> {
        self.ensure_mutable()?;
        if self.processed_objects >= self.total_objects {
            return Err(CoreError::ProcessedOverflow { total: self.total_objects });
        }
        self.processed_objects += 1;
        Ok(())
    }

    pub fn record_success(&mut self) -> crate::Result<()> {
        self.record_processed()?;
        self.successful += 1;
        Ok(())
    }

    pub fn record_failure(&mut self, object_name: &str, message: &str) -> crate::Result<()> {
        self.record_processed()?;
        self.failed += 1;
        self.errors.push(Some(object_name), message);
        Ok(())
    }

    /// Adds AI usage from one correction call.
    pub fn record_ai_call(&mut self, usage: &TokenUsage, cost_per_1k_tokens: f64) -> crate::Result<()> {
        self.ensure_mutable()?;
        self.ai_calls += 1;
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.total_tokens += usage.total_tokens;
        #[allow(clippy::cast_precision_loss, reason = "token counts are far below 2^52")]
        let cost = usage.total_tokens as f64 / 1000.0 * cost_per_1k_tokens;
        self.estimated_cost += cost;
        Ok(())
    }

    pub fn record_cache_hit(&mut self) -> crate::Result<()> {
        self.ensure_mutable()?;
        self.cache_hits += 1;
        Ok(())
    }

    /// Records an error that belongs to the session rather than one object.
    pub fn record_session_error(&mut self, message: &str) -> crate::Result<()> {
        self.ensure_mutable()?;
        self.errors.push(None, message);
        Ok(())
    }

    /// Outcome implied by the current counters.
    #[must_use]
    pub const fn terminal_outcome(&self) -> WorkflowStatus {
        if self.successful == 0 {
            WorkflowStatus::Failed
        } else if self.failed == 0 {
            WorkflowStatus::Completed
        } else {
            WorkflowStatus::Partial
        }
    }

    /// Sets a terminal outcome. Returns `false` without touching anything if
    /// the session was already finalized.
    pub fn finalize(&mut self, outcome: WorkflowStatus) -> crate::Result<bool> {
        if self.is_terminal() {
            return Ok(false);
        }
        if !outcome.is_terminal() {
            return Err(CoreError::InvalidTransition { from: self.status, to: outcome });
        }
        self.advance(outcome)?;
        Ok(true)
    }

    /// Copy safe to hand to API consumers.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self { config_snapshot: self.config_snapshot.redacted(), ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> MigrationSession {
        MigrationSession::new(
            7,
            "DDL".to_owned(),
            MigrationOptions::default(),
            ClientConfig::default(),
            10,
        )
    }

    #[test]
    fn status_only_moves_forward() {
        let mut s = session();
        s.advance(WorkflowStatus::Discovering).unwrap();
        s.finish_discovery(2).unwrap();
        assert_eq!(s.status, WorkflowStatus::Exporting);
        let err = s.advance(WorkflowStatus::Discovering).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidTransition {
                from: WorkflowStatus::Exporting,
                to: WorkflowStatus::Discovering
            }
        );
    }

    #[test]
    fn total_is_fixed_after_discovery() {
        let mut s = session();
        s.advance(WorkflowStatus::Discovering).unwrap();
        s.finish_discovery(3).unwrap();
        assert_eq!(s.finish_discovery(9).unwrap_err(), CoreError::TotalAlreadyFixed(3));
        assert_eq!(s.total_objects, 3);
    }

    #[test]
    fn processed_never_exceeds_total() {
        let mut s = session();
        s.advance(WorkflowStatus::Discovering).unwrap();
        s.finish_discovery(1).unwrap();
        s.record_success().unwrap();
        assert!(matches!(s.record_failure("t", "boom"), Err(CoreError::ProcessedOverflow { total: 1 })));
        assert_eq!(s.processed_objects, 1);
        assert_eq!(s.failed, 0);
    }

    #[test]
    fn outcome_rules() {
        let mut s = session();
        s.advance(WorkflowStatus::Discovering).unwrap();
        s.finish_discovery(3).unwrap();
        assert_eq!(s.terminal_outcome(), WorkflowStatus::Failed);
        s.record_success().unwrap();
        assert_eq!(s.terminal_outcome(), WorkflowStatus::Completed);
        s.record_failure("x", "bad").unwrap();
        assert_eq!(s.terminal_outcome(), WorkflowStatus::Partial);
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut s = session();
        assert!(s.finalize(WorkflowStatus::Failed).unwrap());
        let snapshot = s.clone();
        assert!(!s.finalize(WorkflowStatus::Completed).unwrap());
        assert_eq!(s, snapshot);
        assert!(s.completed_at.is_some());
        assert_eq!(s.phase, Phase::Pending);
    }

    #[test]
    fn finalize_rejects_non_terminal_outcome() {
        let mut s = session();
        assert!(s.finalize(WorkflowStatus::Converting).is_err());
        assert_eq!(s.status, WorkflowStatus::Pending);
    }

    #[test]
    fn terminal_session_rejects_mutation() {
        let mut s = session();
        s.finalize(WorkflowStatus::Failed).unwrap();
        assert!(matches!(s.record_session_error("late"), Err(CoreError::SessionFinalized(_))));
    }

    #[test]
    fn ai_usage_accumulates_cost() {
        let mut s = session();
        let usage = TokenUsage { prompt_tokens: 400, completion_tokens: 600, total_tokens: 1000 };
        s.record_ai_call(&usage, 0.5).unwrap();
        s.record_ai_call(&usage, 0.5).unwrap();
        assert_eq!(s.ai_calls, 2);
        assert_eq!(s.total_tokens, 2000);
        assert!((s.estimated_cost - 1.0).abs() < f64::EPSILON);
    }
}
