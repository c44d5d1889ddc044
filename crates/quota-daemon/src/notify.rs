//! Alert delivery
//!
//! Delivery is best effort: failures are logged by the caller and never
//! retried, and nothing here may block reconciliation.

use async_trait::async_trait;
use quota_types::{Alert, AlertSeverity, EnforcementActions, EnforcerId};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Payload sent for each newly raised alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertNotification {
    pub resource_name: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub namespace: String,
    pub enforcer: String,
}

impl AlertNotification {
    pub fn new(enforcer: &EnforcerId, namespace: &str, alert: &Alert) -> Self {
        Self {
            resource_name: alert.resource_name.clone(),
            severity: alert.severity,
            message: alert.message.clone(),
            namespace: namespace.to_string(),
            enforcer: enforcer.to_string(),
        }
    }

    /// Channel configured for this alert's severity
    pub fn channel<'a>(&self, actions: &'a EnforcementActions) -> &'a str {
        match self.severity {
            AlertSeverity::Warning => &actions.warning_alert_channel,
            AlertSeverity::Critical => &actions.critical_alert_channel,
        }
    }
}

/// Alert delivery failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NotificationError {
    /// The request could not be sent
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The receiver answered with an error status
    #[error("channel rejected notification with status {0}")]
    Rejected(u16),
}

/// Alert delivery channel
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Deliver `notification` to `channel`
    async fn notify(
        &self,
        channel: &str,
        notification: &AlertNotification,
    ) -> Result<(), NotificationError>;
}

/// Writes alerts to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl AlertNotifier for LogNotifier {
    async fn notify(
        &self,
        channel: &str,
        notification: &AlertNotification,
    ) -> Result<(), NotificationError> {
        tracing::warn!(
            enforcer = %notification.enforcer,
            namespace = %notification.namespace,
            resource = %notification.resource_name,
            severity = %notification.severity,
            channel = %channel,
            "{}",
            notification.message
        );
        Ok(())
    }
}

/// Posts alerts as JSON to the channel URL.
///
/// An empty channel has nowhere to post to and falls back to logging.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Delivery(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AlertNotifier for WebhookNotifier {
    async fn notify(
        &self,
        channel: &str,
        notification: &AlertNotification,
    ) -> Result<(), NotificationError> {
        if channel.trim().is_empty() {
            return LogNotifier.notify(channel, notification).await;
        }

        let response = self
            .client
            .post(channel)
            .json(notification)
            .send()
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError::Rejected(response.status().as_u16()));
        }

        tracing::debug!(
            enforcer = %notification.enforcer,
            resource = %notification.resource_name,
            "Alert delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notification(severity: AlertSeverity) -> AlertNotification {
        let alert = Alert::new("cpu", severity, "Resource cpu usage at 95%", Utc::now());
        AlertNotification::new(&EnforcerId::new("ops", "quota"), "team-a", &alert)
    }

    #[test]
    fn test_channel_follows_severity() {
        let actions = EnforcementActions {
            warning_alert_channel: "http://hooks/warn".into(),
            critical_alert_channel: "http://hooks/crit".into(),
            ..Default::default()
        };
        assert_eq!(notification(AlertSeverity::Warning).channel(&actions), "http://hooks/warn");
        assert_eq!(notification(AlertSeverity::Critical).channel(&actions), "http://hooks/crit");
    }

    #[test]
    fn test_payload_shape() {
        let value = serde_json::to_value(notification(AlertSeverity::Critical)).unwrap();
        assert_eq!(value["resourceName"], "cpu");
        assert_eq!(value["severity"], "critical");
        assert_eq!(value["namespace"], "team-a");
        assert_eq!(value["enforcer"], "ops/quota");
    }

    #[tokio::test]
    async fn test_webhook_without_channel_logs() {
        let notifier = WebhookNotifier::new(Duration::from_millis(100)).unwrap();
        notifier
            .notify("", &notification(AlertSeverity::Warning))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_webhook_unreachable_fails() {
        let notifier = WebhookNotifier::new(Duration::from_millis(200)).unwrap();
        let err = notifier
            .notify("http://127.0.0.1:1/hook", &notification(AlertSeverity::Critical))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::Delivery(_)));
    }
}
