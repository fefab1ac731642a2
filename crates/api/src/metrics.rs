//! Login metrics
//!
//! Recording is infallible; a metrics problem must never fail a login.

use prometheus::{IntCounter, Registry};

pub trait LoginMetrics: Send + Sync + 'static {
    fn record_login_success(&self);
    fn record_login_failure(&self);
}

/// Prometheus login counters, registered in their own [`Registry`]
pub struct AuthMetrics {
    registry: Registry,
    login_success: IntCounter,
    login_failure: IntCounter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub login_success: u64,
    pub login_failure: u64,
}

impl AuthMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let login_success = IntCounter::new(
            "login_success_total",
            "Total number of successful logins",
        )?;
        registry.register(Box::new(login_success.clone()))?;

        let login_failure = IntCounter::new(
            "login_failures_total",
            "Total number of failed logins (bad credentials, inactive or locked)",
        )?;
        registry.register(Box::new(login_failure.clone()))?;

        Ok(Self {
            registry,
            login_success,
            login_failure,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            login_success: self.login_success.get(),
            login_failure: self.login_failure.get(),
        }
    }
}

impl LoginMetrics for AuthMetrics {
    fn record_login_success(&self) {
        self.login_success.inc();
    }

    fn record_login_failure(&self) {
        self.login_failure.inc();
    }
}
