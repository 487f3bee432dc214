//! The Audit Logger (§4.6): structured append-only trail with rotation,
//! retention, and redaction, alongside a mirrored `tracing` event at each
//! call site.
//!
//! The audit log is the durable record this module owns; `tracing` output
//! is the ambient, subscriber-dependent layer the caller wires up — nothing
//! here calls `tracing_subscriber::fmt().init()`.

use std::path::PathBuf;
use std::sync::Arc;

use deploy_fs::Filesystem;
use deploy_model::ids::{ComponentName, Platform};
use deploy_model::result::{AuditEntry, AuditLevel, Resolution};
use serde_json::{Map, Value};

use crate::backup::civil_from_days_str;
use crate::clock::Clock;
use crate::error::DeploymentError;
use crate::paths::Paths;

const ROTATION_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024;
const RETENTION_DAYS: u64 = 30;
const REDACTED_SUBSTRINGS: [&str; 5] = ["password", "apikey", "secret", "token", "auth"];

/// Structured audit trail, human-readable log, rotation, retention, and
/// redaction.
pub struct AuditLogger {
    fs: Arc<dyn Filesystem>,
    clock: Arc<dyn Clock>,
    paths: Paths,
}

impl AuditLogger {
    /// Construct a logger writing under `paths.audit_dir()`/`paths.logs_dir()`.
    #[must_use]
    pub fn new(fs: Arc<dyn Filesystem>, clock: Arc<dyn Clock>, paths: Paths) -> Self {
        Self { fs, clock, paths }
    }

    fn date_suffix(&self) -> String {
        civil_from_days_str(self.clock.now_millis() / 1000 / 86_400)
    }

    fn audit_log_path(&self) -> PathBuf {
        self.paths.audit_dir().join(format!("audit-{}.log", self.date_suffix()))
    }

    fn human_log_path(&self) -> PathBuf {
        self.paths.logs_dir().join(format!("deploy-{}.log", self.date_suffix()))
    }

    fn persist(&self, entry: AuditEntry) -> Result<(), DeploymentError> {
        self.rotate_if_needed(&self.audit_log_path())?;
        self.sweep_retention(&self.paths.audit_dir())?;
        self.sweep_retention(&self.paths.logs_dir())?;

        let redacted = AuditEntry { context: entry.context.map(redact_context), ..entry };
        let mut line = serde_json::to_vec(&redacted).unwrap_or_default();
        line.push(b'\n');
        self.fs.append(&self.audit_log_path(), &line)?;

        let human_line = format!(
            "[{}] {} {}.{} -> {}\n",
            redacted.timestamp, level_tag(redacted.level), redacted.operation, redacted.action, redacted.result
        );
        self.fs.append(&self.human_log_path(), human_line.as_bytes())?;
        Ok(())
    }

    fn rotate_if_needed(&self, path: &PathBuf) -> Result<(), DeploymentError> {
        if let Ok(meta) = self.fs.metadata(path) {
            if meta.len > ROTATION_THRESHOLD_BYTES {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("audit");
                let rotated = path.with_file_name(format!("{stem}-{}.log", self.clock.now_millis()));
                self.fs.copy(path, &rotated)?;
                self.fs.remove_file(path)?;
            }
        }
        Ok(())
    }

    fn sweep_retention(&self, dir: &std::path::Path) -> Result<(), DeploymentError> {
        let now = self.clock.now_millis();
        let threshold_millis = RETENTION_DAYS * 86_400 * 1000;
        for path in self.fs.read_dir(dir)? {
            if let Ok(meta) = self.fs.metadata(&path) {
                if now.saturating_sub(meta.modified_millis) > threshold_millis {
                    self.fs.remove_file(&path)?;
                }
            }
        }
        Ok(())
    }

    fn emit(
        &self,
        level: AuditLevel,
        operation: &str,
        action: &str,
        result: &str,
        config_id: Option<String>,
        platform: Option<Platform>,
        context: Option<Value>,
        changes: Option<Value>,
        security_context: Option<Value>,
    ) -> Result<(), DeploymentError> {
        let entry = AuditEntry {
            timestamp: self.clock.now_millis(),
            level,
            operation: operation.to_owned(),
            action: action.to_owned(),
            result: result.to_owned(),
            config_id,
            platform,
            context,
            changes,
            security_context,
        };
        match level {
            AuditLevel::Debug => tracing::debug!(operation, action, result, "audit event"),
            AuditLevel::Info => tracing::info!(operation, action, result, "audit event"),
            AuditLevel::Warning => tracing::warn!(operation, action, result, "audit event"),
            AuditLevel::Error => tracing::error!(operation, action, result, "audit event"),
            AuditLevel::Security => tracing::warn!(operation, action, result, "security audit event"),
        }
        self.persist(entry)
    }

    /// Record the start of a deployment.
    pub fn log_deployment_start(&self, platform: Platform, config_id: Option<String>) -> Result<(), DeploymentError> {
        self.emit(AuditLevel::Info, "deployment", "DEPLOYMENT_INITIATED", "success", config_id, Some(platform), None, None, None)
    }

    /// Record the completion of a deployment.
    pub fn log_deployment_complete(&self, platform: Platform, success: bool, config_id: Option<String>) -> Result<(), DeploymentError> {
        let result = if success { "success" } else { "failure" };
        self.emit(AuditLevel::Info, "deployment", "DEPLOYMENT_COMPLETED", result, config_id, Some(platform), None, None, None)
    }

    /// Record a single component's deployment outcome.
    pub fn log_component_deployment(&self, component: &ComponentName, resolution: Resolution) -> Result<(), DeploymentError> {
        self.emit(
            AuditLevel::Info,
            "component",
            "COMPONENT_DEPLOYED",
            &format!("{resolution:?}"),
            None,
            None,
            Some(Value::String(component.to_string())),
            None,
            None,
        )
    }

    /// Record a security-relevant event. Always surfaced regardless of log
    /// level filtering elsewhere, since `AuditLevel::Security` is its own
    /// band.
    pub fn log_security_event(&self, detail: &str, security_context: Option<Value>) -> Result<(), DeploymentError> {
        self.emit(AuditLevel::Security, "security", "SECURITY_EVENT", detail, None, None, None, None, security_context)
    }

    /// Record a rollback and its outcome.
    pub fn log_rollback(&self, platform: Platform, success: bool) -> Result<(), DeploymentError> {
        let result = if success { "recovered" } else { "failed" };
        self.emit(AuditLevel::Warning, "rollback", "ROLLBACK", result, None, Some(platform), None, None, None)
    }

    /// Record an error.
    pub fn log_error(&self, message: &str) -> Result<(), DeploymentError> {
        self.emit(AuditLevel::Error, "error", "ERROR", message, None, None, None, None, None)
    }

    /// Record a warning.
    pub fn log_warning(&self, message: &str) -> Result<(), DeploymentError> {
        self.emit(AuditLevel::Warning, "warning", "WARNING", message, None, None, None, None, None)
    }

    /// Record a debug-level diagnostic.
    pub fn log_debug(&self, message: &str) -> Result<(), DeploymentError> {
        self.emit(AuditLevel::Debug, "debug", "DEBUG", message, None, None, None, None, None)
    }

    /// Read the most recent `n` audit-line entries across the audit log
    /// directory (today's file only; older entries require
    /// [`Self::get_audit_trail`]).
    ///
    /// # Errors
    /// Propagates read failures; malformed individual lines are skipped.
    pub fn get_recent_logs(&self, n: usize) -> Result<Vec<AuditEntry>, DeploymentError> {
        let path = self.audit_log_path();
        if !self.fs.exists(&path) {
            return Ok(Vec::new());
        }
        let bytes = self.fs.read(&path)?;
        let entries = parse_entries(&bytes);
        Ok(entries.into_iter().rev().take(n).rev().collect())
    }

    /// Read every audit entry matching `config_id` (or all entries if
    /// `None`) across every file in the audit directory, most recent first,
    /// capped at `limit`.
    ///
    /// # Errors
    /// Propagates directory-listing failures.
    pub fn get_audit_trail(&self, config_id: Option<&str>, limit: usize) -> Result<Vec<AuditEntry>, DeploymentError> {
        let mut all = Vec::new();
        for path in self.fs.read_dir(&self.paths.audit_dir())? {
            if let Ok(bytes) = self.fs.read(&path) {
                all.extend(parse_entries(&bytes));
            }
        }
        all.sort_by_key(|e| e.timestamp);
        all.reverse();
        Ok(all
            .into_iter()
            .filter(|e| config_id.is_none_or(|id| e.config_id.as_deref() == Some(id)))
            .take(limit)
            .collect())
    }
}

fn parse_entries(bytes: &[u8]) -> Vec<AuditEntry> {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

const fn level_tag(level: AuditLevel) -> &'static str {
    match level {
        AuditLevel::Debug => "DEBUG",
        AuditLevel::Info => "INFO",
        AuditLevel::Warning => "WARN",
        AuditLevel::Error => "ERROR",
        AuditLevel::Security => "SECURITY",
    }
}

/// Replace any value whose key matches (case-insensitively) one of
/// `password|apiKey|secret|token|auth` with `"[REDACTED]"`, walking nested
/// objects and arrays recursively (§8 Invariant 7).
#[must_use]
pub fn redact_context(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, v) in map {
                let redacted_value = if is_sensitive_key(&key) { Value::String("[REDACTED]".to_owned()) } else { redact_context(v) };
                out.insert(key, redacted_value);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(redact_context).collect()),
        other => other,
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    REDACTED_SUBSTRINGS.iter().any(|needle| lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use deploy_fs::FakeFilesystem;
    use serde_json::json;

    use super::*;
    use crate::clock::FixedClock;

    fn logger(clock_millis: u64) -> (AuditLogger, Arc<FakeFilesystem>) {
        let fake = Arc::new(FakeFilesystem::new());
        let fs: Arc<dyn Filesystem> = fake.clone();
        let clock = Arc::new(FixedClock::new(clock_millis));
        (AuditLogger::new(fs, clock, Paths::new("/home/u/.taptik")), fake)
    }

    #[test]
    fn redact_context_masks_sensitive_keys_recursively() {
        let value = json!({"user": "alice", "nested": {"apiKey": "sk-123", "ok": true}, "AUTH_TOKEN": "xyz"});
        let redacted = redact_context(value);
        assert_eq!(redacted["user"], json!("alice"));
        assert_eq!(redacted["nested"]["apiKey"], json!("[REDACTED]"));
        assert_eq!(redacted["nested"]["ok"], json!(true));
        assert_eq!(redacted["AUTH_TOKEN"], json!("[REDACTED]"));
    }

    #[test]
    fn scenario_s1_start_and_complete_produce_two_entries() {
        let (logger, _fake) = logger(1_704_164_645_000);
        logger.log_deployment_start(Platform::ClaudeCode, None).unwrap();
        logger.log_deployment_complete(Platform::ClaudeCode, true, None).unwrap();
        let entries = logger.get_recent_logs(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "DEPLOYMENT_INITIATED");
        assert_eq!(entries[1].action, "DEPLOYMENT_COMPLETED");
    }

    #[test]
    fn get_audit_trail_filters_by_config_id() {
        let (logger, _fake) = logger(0);
        logger.log_deployment_start(Platform::Cursor, Some("cfg-a".to_owned())).unwrap();
        logger.log_deployment_start(Platform::Cursor, Some("cfg-b".to_owned())).unwrap();
        let trail = logger.get_audit_trail(Some("cfg-a"), 10).unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].config_id.as_deref(), Some("cfg-a"));
    }

    #[test]
    fn security_event_uses_security_level() {
        let (logger, _fake) = logger(0);
        logger.log_security_event("attempted secret exfiltration", None).unwrap();
        let entries = logger.get_recent_logs(1).unwrap();
        assert_eq!(entries[0].level, AuditLevel::Security);
    }

    #[test]
    fn persisted_entries_have_redacted_context() {
        let (logger, _fake) = logger(0);
        logger
            .emit(
                AuditLevel::Info,
                "test",
                "TEST",
                "success",
                None,
                None,
                Some(json!({"password": "hunter2"})),
                None,
                None,
            )
            .unwrap();
        let entries = logger.get_recent_logs(1).unwrap();
        assert_eq!(entries[0].context.as_ref().unwrap()["password"], json!("[REDACTED]"));
    }
}
