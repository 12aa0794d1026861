//! The appointment persistence hook: a thin external collaborator. The
//! core only accepts an `appointment_id` via the telephony `start`
//! frame and records outcomes through this contract; the Appointment
//! Dispatcher that reacts to inserts lives entirely outside the core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Outcome recorded on an appointment once a call concludes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    InProgress,
    FailedTechError,
    FailedBusinessClosed,
    FailedHumanError,
    FailedNoAvailableSlots,
    Success,
}

/// A minimal caller profile returned alongside an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: Option<String>,
    pub phone: String,
}

/// The appointment record a Session may be bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

/// A patch applied to an appointment record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentPatch {
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

/// The appointment store boundary contract.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn fetch_appointment(
        &self,
        id: &str,
    ) -> Result<(Appointment, UserProfile), CoreError>;

    async fn update_appointment(&self, id: &str, patch: AppointmentPatch) -> Result<(), CoreError>;
}

/// An in-memory [`AppointmentStore`] retaining updates for retry on
/// cleanup when the real store is unreachable (§7 persistence-failure:
/// non-fatal, logged, retained in-memory for retry).
#[derive(Default)]
pub struct RetryingAppointmentStore<S: AppointmentStore> {
    inner: S,
    pending: tokio::sync::Mutex<Vec<(String, AppointmentPatch)>>,
}

impl<S: AppointmentStore> RetryingAppointmentStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            pending: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Number of updates still awaiting successful persistence.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Retry all pending updates; successes are removed, failures stay
    /// queued.
    pub async fn retry_pending(&self) {
        let mut pending = self.pending.lock().await;
        let mut still_pending = Vec::new();
        for (id, patch) in pending.drain(..) {
            if self.inner.update_appointment(&id, patch.clone()).await.is_err() {
                still_pending.push((id, patch));
            }
        }
        *pending = still_pending;
    }
}

#[async_trait]
impl<S: AppointmentStore> AppointmentStore for RetryingAppointmentStore<S> {
    async fn fetch_appointment(&self, id: &str) -> Result<(Appointment, UserProfile), CoreError> {
        self.inner.fetch_appointment(id).await
    }

    async fn update_appointment(&self, id: &str, patch: AppointmentPatch) -> Result<(), CoreError> {
        match self.inner.update_appointment(id, patch.clone()).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(appointment_id = id, error = %err, "appointment update failed, queued for retry");
                self.pending.lock().await.push((id.to_string(), patch));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FlakyStore {
        fail_next: Arc<std::sync::atomic::AtomicBool>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AppointmentStore for FlakyStore {
        async fn fetch_appointment(
            &self,
            id: &str,
        ) -> Result<(Appointment, UserProfile), CoreError> {
            Ok((
                Appointment {
                    id: id.to_string(),
                    status: AppointmentStatus::Pending,
                    notes: None,
                },
                UserProfile {
                    name: None,
                    phone: "+15551234".into(),
                },
            ))
        }

        async fn update_appointment(&self, _id: &str, _patch: AppointmentPatch) -> Result<(), CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next.swap(false, Ordering::SeqCst) {
                Err(CoreError::Persistence("temporary outage".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn failed_update_is_retained_for_retry() {
        let fail_next = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let calls = Arc::new(AtomicUsize::new(0));
        let store = RetryingAppointmentStore::new(FlakyStore {
            fail_next: fail_next.clone(),
            calls: calls.clone(),
        });

        store
            .update_appointment(
                "appt-1",
                AppointmentPatch {
                    status: Some(AppointmentStatus::Success),
                    notes: None,
                },
            )
            .await
            .expect("non-fatal even on backing failure");
        assert_eq!(store.pending_count().await, 1);

        store.retry_pending().await;
        assert_eq!(store.pending_count().await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn successful_update_is_not_retained() {
        let store = RetryingAppointmentStore::new(FlakyStore {
            fail_next: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            calls: Arc::new(AtomicUsize::new(0)),
        });
        store
            .update_appointment("appt-1", AppointmentPatch::default())
            .await
            .expect("succeeds");
        assert_eq!(store.pending_count().await, 0);
    }
}
