use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use directory_cell::models::{DirectoryError, UserRole};
use directory_cell::services::directory::DirectoryService;
use history_cell::models::HistoryEntryType;
use history_cell::services::history::HistoryService;
use shared_config::AppConfig;
use shared_models::auth::User;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, BookingOutcome,
    EnrichedAppointment, ModifyAppointmentRequest,
};
use crate::services::ledger::AppointmentLedgerService;

/// Business rules on top of the ledger: who may do what to which
/// appointment. Ledger errors pass through untranslated.
pub struct BookingService {
    ledger: AppointmentLedgerService,
    directory: DirectoryService,
    history: HistoryService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            ledger: AppointmentLedgerService::new(config),
            directory: DirectoryService::new(config),
            history: HistoryService::new(config),
        }
    }

    /// Book for the calling patient (admins may book on any patient's
    /// behalf). The doctor must be visible in the directory's doctor
    /// listing before anything is persisted.
    pub async fn book(
        &self,
        user: &User,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<BookingOutcome, AppointmentError> {
        let is_own = request.patient_id.to_string() == user.id && user.is_patient();
        if !is_own && !user.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        // A patient's own role is already proven by the token; bookings on
        // someone's behalf check the referenced account really is a patient.
        if !is_own {
            let patient = self
                .directory
                .find_by_id(&request.patient_id.to_string(), Some(auth_token))
                .await
                .map_err(|e| match e {
                    DirectoryError::NotFound => AppointmentError::PatientNotFound,
                    other => AppointmentError::DatabaseError(other.to_string()),
                })?;
            if patient.user_type != UserRole::Patient {
                return Err(AppointmentError::PatientNotFound);
            }
        }

        let doctors = self
            .directory
            .list_by_role(UserRole::Doctor, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let doctor = doctors
            .into_iter()
            .find(|d| d.id == request.doctor_id)
            .ok_or(AppointmentError::DoctorNotFound)?;

        let appointment = self
            .ledger
            .create(
                request.patient_id,
                request.doctor_id,
                request.date,
                &request.time,
                &request.symptoms,
                auth_token,
            )
            .await?;

        let payload = json!({
            "appointment_id": appointment.id,
            "doctor": doctor.username,
            "specialization": doctor.specialization,
            "date": appointment.date,
            "time": appointment.time.format("%H:%M").to_string(),
        });
        let history_recorded = match self
            .history
            .append(
                appointment.patient_id,
                HistoryEntryType::DoctorVisit,
                payload,
                Some(auth_token),
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                // Journal trouble must not unwind a booking that already
                // landed; the outcome reports it instead.
                warn!("History append for booking {} failed: {}", appointment.id, e);
                false
            }
        };

        Ok(BookingOutcome {
            appointment,
            history_recorded,
        })
    }

    pub async fn get(
        &self,
        user: &User,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.ledger.get(appointment_id, auth_token).await?;
        self.authorize_party(user, &appointment)?;
        Ok(appointment)
    }

    pub async fn modify(
        &self,
        user: &User,
        appointment_id: Uuid,
        request: ModifyAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.ledger.get(appointment_id, auth_token).await?;

        let is_owner = current.patient_id.to_string() == user.id && user.is_patient();
        if !is_owner && !user.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        self.ledger.modify(appointment_id, request, auth_token).await
    }

    /// Patient-side cancellation. Doctors cancel through the status update
    /// path on their own appointments.
    pub async fn cancel(
        &self,
        user: &User,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.ledger.get(appointment_id, auth_token).await?;

        let is_owner = current.patient_id.to_string() == user.id && user.is_patient();
        if !is_owner && !user.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        self.ledger
            .set_status(appointment_id, AppointmentStatus::Cancelled, auth_token)
            .await
    }

    /// Doctor-side status changes (confirm, complete, cancel) on their own
    /// appointments.
    pub async fn update_status(
        &self,
        user: &User,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.ledger.get(appointment_id, auth_token).await?;

        let is_assigned = current.doctor_id.to_string() == user.id && user.is_doctor();
        if !is_assigned && !user.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        self.ledger
            .set_status(appointment_id, new_status, auth_token)
            .await
    }

    pub async fn attach_prescription(
        &self,
        user: &User,
        appointment_id: Uuid,
        prescription: &str,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        if !user.is_doctor() {
            return Err(AppointmentError::Unauthorized);
        }

        let doctor_id =
            Uuid::parse_str(&user.id).map_err(|_| AppointmentError::Unauthorized)?;

        self.ledger
            .attach_prescription(appointment_id, doctor_id, prescription, auth_token)
            .await
    }

    pub async fn list_for_patient(
        &self,
        user: &User,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<EnrichedAppointment>, AppointmentError> {
        if patient_id.to_string() != user.id && !user.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        self.ledger.list_for_patient(patient_id, auth_token).await
    }

    pub async fn list_for_doctor(
        &self,
        user: &User,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<EnrichedAppointment>, AppointmentError> {
        if doctor_id.to_string() != user.id && !user.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        self.ledger.list_for_doctor(doctor_id, auth_token).await
    }

    fn authorize_party(&self, user: &User, appointment: &Appointment) -> Result<(), AppointmentError> {
        let is_party = appointment.patient_id.to_string() == user.id
            || appointment.doctor_id.to_string() == user.id;
        if !is_party && !user.is_admin() {
            debug!("User {} denied access to appointment {}", user.id, appointment.id);
            return Err(AppointmentError::Unauthorized);
        }
        Ok(())
    }
}
