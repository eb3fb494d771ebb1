use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// Guards every status write against the appointment state machine:
///
/// ```text
/// pending   -> confirmed | cancelled
/// confirmed -> completed | cancelled
/// completed, cancelled: terminal
/// ```
///
/// Date/time/symptom edits are a separate rule: allowed only while pending.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition {} -> {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Date, time and symptoms may only change while the appointment is
    /// still pending.
    pub fn can_modify(&self, status: AppointmentStatus) -> bool {
        status == AppointmentStatus::Pending
    }
}
