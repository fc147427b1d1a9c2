//! Reporting collaborator boundary
//!
//! The transport (chat gateway) is out of scope; this is the trait the core
//! calls when a failure must reach the user, plus the report payload it sends.

use crate::core::types::{ChannelRef, CorrelationId};

/// User-facing failure notification produced by default exception handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub correlation_id: Option<CorrelationId>,
    pub command_name: Option<String>,
    pub message: String,
}

pub trait MessageService: Send + Sync {
    /// Send a plain message to a channel (user-fault reports)
    fn send_message(&self, channel: &ChannelRef, message: &str);

    /// Send a failure notification to a channel (unhandled errors)
    fn send_failure_notification(&self, channel: &ChannelRef, report: &FailureReport);
}

/// Fallback service that only logs; used where no transport is wired up
#[derive(Debug, Default)]
pub struct LoggingMessageService;

impl MessageService for LoggingMessageService {
    fn send_message(&self, channel: &ChannelRef, message: &str) {
        tracing::info!("[{}] {}", channel, message);
    }

    fn send_failure_notification(&self, channel: &ChannelRef, report: &FailureReport) {
        tracing::warn!(
            "[{}] failure notification ({}): {}",
            channel,
            report
                .correlation_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "no correlation id".to_string()),
            report.message
        );
    }
}
