use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

use crate::models::{AppointmentError, AppointmentStatus, VideoRoomResponse};
use crate::services::ledger::AppointmentLedgerService;

/// Hands out consultation room URLs. The URL is a pure function of the
/// appointment id, so the patient and the doctor independently resolve the
/// same room; no signaling state lives here.
pub struct VideoRoomService {
    ledger: AppointmentLedgerService,
    base_url: String,
}

impl VideoRoomService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            ledger: AppointmentLedgerService::new(config),
            base_url: config.video_room_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn room_url(&self, appointment_id: Uuid) -> String {
        format!("{}/consult-{}", self.base_url, appointment_id)
    }

    /// Both parties of a confirmed appointment may join; anyone else is
    /// turned away.
    pub async fn join(
        &self,
        user: &User,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<VideoRoomResponse, AppointmentError> {
        let appointment = self.ledger.get(appointment_id, auth_token).await?;

        let is_party = appointment.patient_id.to_string() == user.id
            || appointment.doctor_id.to_string() == user.id;
        if !is_party && !user.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        if appointment.status != AppointmentStatus::Confirmed {
            return Err(AppointmentError::NotJoinable(appointment.status));
        }

        debug!("User {} joining room for appointment {}", user.id, appointment_id);
        Ok(VideoRoomResponse {
            appointment_id,
            room_url: self.room_url(appointment_id),
        })
    }
}
