use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use directory_cell::models::{DirectoryError, UserProfile, UserRole};
use directory_cell::services::directory::DirectoryService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, EnrichedAppointment,
    ModifyAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

const CLOCK_FORMAT: &str = "%H:%M";

/// Persisted storage and retrieval of appointments. Every write is
/// conditional on the version counter read beforehand; a stale version means
/// someone else got there first and the write reports a conflict instead of
/// silently clobbering theirs.
pub struct AppointmentLedgerService {
    supabase: SupabaseClient,
    directory: DirectoryService,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentLedgerService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            directory: DirectoryService::new(config),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    pub async fn create(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
        symptoms: &str,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Creating appointment for patient {} with doctor {}", patient_id, doctor_id);

        let time = validate_booking_fields(date, time, symptoms, Utc::now().date_naive())?;

        let doctor = self
            .directory
            .find_by_id(&doctor_id.to_string(), Some(auth_token))
            .await
            .map_err(|e| match e {
                DirectoryError::NotFound => AppointmentError::DoctorNotFound,
                other => AppointmentError::DatabaseError(other.to_string()),
            })?;
        if doctor.user_type != UserRole::Doctor {
            return Err(AppointmentError::DoctorNotFound);
        }

        let appointment_data = json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "date": date,
            "time": time.format(CLOCK_FORMAT).to_string(),
            "symptoms": symptoms.trim(),
            "status": AppointmentStatus::Pending,
            "version": 1,
            "created_at": Utc::now().to_rfc3339(),
        });

        let created = self
            .supabase
            .insert_returning("/rest/v1/appointments", Some(auth_token), appointment_data)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let row = created.into_iter().next().ok_or_else(|| {
            AppointmentError::DatabaseError("Store returned no row for created appointment".to_string())
        })?;

        let appointment: Appointment =
            serde_json::from_value(row).map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;
        info!("Appointment {} created with status pending", appointment.id);

        Ok(appointment)
    }

    pub async fn get(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let row = rows.into_iter().next().ok_or(AppointmentError::NotFound)?;
        serde_json::from_value(row).map_err(|e| AppointmentError::DatabaseError(e.to_string()))
    }

    /// Overwrite date/time/symptoms. Only pending appointments can change
    /// shape; calling twice with identical arguments stores identical state.
    pub async fn modify(
        &self,
        appointment_id: Uuid,
        request: ModifyAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Modifying appointment {}", appointment_id);

        let current = self.get(appointment_id, auth_token).await?;

        if !self.lifecycle.can_modify(current.status) {
            return Err(AppointmentError::NotPending(current.status));
        }

        let time = validate_booking_fields(
            request.date,
            &request.time,
            &request.symptoms,
            Utc::now().date_naive(),
        )?;

        let update_data = json!({
            "date": request.date,
            "time": time.format(CLOCK_FORMAT).to_string(),
            "symptoms": request.symptoms.trim(),
            "updated_at": Utc::now().to_rfc3339(),
            "version": current.version + 1,
        });

        self.conditional_update(appointment_id, current.version, update_data, auth_token)
            .await
    }

    /// Move the appointment through the state machine, rejecting any
    /// (current, requested) pair outside the transition table.
    pub async fn set_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Setting appointment {} status to {}", appointment_id, new_status);

        let current = self.get(appointment_id, auth_token).await?;

        self.lifecycle
            .validate_status_transition(current.status, new_status)?;

        let update_data = json!({
            "status": new_status,
            "updated_at": Utc::now().to_rfc3339(),
            "version": current.version + 1,
        });

        let updated = self
            .conditional_update(appointment_id, current.version, update_data, auth_token)
            .await?;
        info!("Appointment {} moved {} -> {}", appointment_id, current.status, new_status);

        Ok(updated)
    }

    /// Attach prescription text. The acting doctor must be the appointment's
    /// assigned doctor; on a mismatch the record is left untouched. The text
    /// also lands as one mirror row per logical owner so both parties'
    /// prescription lists see it; the mirror writes are not transactional
    /// with the appointment update.
    pub async fn attach_prescription(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        prescription: &str,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Attaching prescription to appointment {}", appointment_id);

        let current = self.get(appointment_id, auth_token).await?;

        if current.doctor_id != doctor_id {
            warn!(
                "Doctor {} attempted to prescribe on appointment {} assigned to {}",
                doctor_id, appointment_id, current.doctor_id
            );
            return Err(AppointmentError::Unauthorized);
        }
        if prescription.trim().is_empty() {
            return Err(AppointmentError::ValidationError(
                "Prescription cannot be empty".to_string(),
            ));
        }

        let now = Utc::now().to_rfc3339();
        let update_data = json!({
            "prescription": prescription.trim(),
            "prescription_created_at": now,
            "updated_at": now,
            "version": current.version + 1,
        });

        let updated = self
            .conditional_update(appointment_id, current.version, update_data, auth_token)
            .await?;

        for owner_id in [current.patient_id, current.doctor_id] {
            let mirror = json!({
                "owner_id": owner_id,
                "appointment_id": appointment_id,
                "prescription": prescription.trim(),
                "created_at": now,
            });
            if let Err(e) = self
                .supabase
                .insert_returning("/rest/v1/user_prescriptions", Some(auth_token), mirror)
                .await
            {
                warn!(
                    "Prescription mirror write for owner {} on appointment {} failed: {}",
                    owner_id, appointment_id, e
                );
            }
        }

        Ok(updated)
    }

    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<EnrichedAppointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=date.asc,created_at.asc",
            patient_id
        );
        let appointments = self.fetch_sorted(&path, auth_token).await?;
        let doctors = self
            .resolve_counterparts(appointments.iter().map(|a| a.doctor_id), auth_token)
            .await;

        Ok(appointments
            .into_iter()
            .map(|appointment| {
                let doctor = doctors.get(&appointment.doctor_id);
                EnrichedAppointment {
                    doctor_name: doctor.map(|d| d.username.clone()),
                    doctor_specialization: doctor.and_then(|d| d.specialization.clone()),
                    patient_name: None,
                    appointment,
                }
            })
            .collect())
    }

    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<EnrichedAppointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=date.asc,created_at.asc",
            doctor_id
        );
        let appointments = self.fetch_sorted(&path, auth_token).await?;
        let patients = self
            .resolve_counterparts(appointments.iter().map(|a| a.patient_id), auth_token)
            .await;

        Ok(appointments
            .into_iter()
            .map(|appointment| {
                let patient = patients.get(&appointment.patient_id);
                EnrichedAppointment {
                    doctor_name: None,
                    doctor_specialization: None,
                    patient_name: patient.map(|p| p.username.clone()),
                    appointment,
                }
            })
            .collect())
    }

    /// PATCH guarded by the version read before the write. An empty result
    /// means either the row vanished or its version moved on; the row was
    /// just read, so report the version conflict.
    async fn conditional_update(
        &self,
        appointment_id: Uuid,
        expected_version: i64,
        update_data: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&version=eq.{}",
            appointment_id, expected_version
        );
        let updated = self
            .supabase
            .update_returning(&path, Some(auth_token), update_data)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let row = updated.into_iter().next().ok_or(AppointmentError::VersionConflict)?;
        serde_json::from_value(row).map_err(|e| AppointmentError::DatabaseError(e.to_string()))
    }

    async fn fetch_sorted(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let mut appointments = rows
            .into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| AppointmentError::DatabaseError(e.to_string()))
            })
            .collect::<Result<Vec<Appointment>, _>>()?;

        // Ascending by date, insertion order on ties. The order param asks
        // the store for the same thing; sorting here keeps the contract even
        // when a backend ignores it.
        appointments.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));

        Ok(appointments)
    }

    async fn resolve_counterparts(
        &self,
        ids: impl Iterator<Item = Uuid>,
        auth_token: &str,
    ) -> HashMap<Uuid, UserProfile> {
        let mut counterparts = HashMap::new();

        for id in ids {
            if counterparts.contains_key(&id) {
                continue;
            }
            match self.directory.find_by_id(&id.to_string(), Some(auth_token)).await {
                Ok(profile) => {
                    counterparts.insert(id, profile);
                }
                // Display enrichment only; a missing counterpart leaves the
                // name blank rather than failing the listing.
                Err(e) => warn!("Could not resolve user {} for enrichment: {}", id, e),
            }
        }

        counterparts
    }
}

fn validate_booking_fields(
    date: NaiveDate,
    time_raw: &str,
    symptoms: &str,
    today: NaiveDate,
) -> Result<NaiveTime, AppointmentError> {
    if symptoms.trim().is_empty() {
        return Err(AppointmentError::ValidationError(
            "Symptoms cannot be empty".to_string(),
        ));
    }
    if date < today {
        return Err(AppointmentError::ValidationError(
            "Appointment date cannot be in the past".to_string(),
        ));
    }
    NaiveTime::parse_from_str(time_raw, CLOCK_FORMAT).map_err(|_| {
        AppointmentError::ValidationError(format!("Invalid time '{}', expected HH:MM", time_raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn rejects_empty_symptoms() {
        let result = validate_booking_fields(day("2030-03-01"), "10:00", "   ", day("2025-01-01"));
        assert_matches!(result, Err(AppointmentError::ValidationError(_)));
    }

    #[test]
    fn rejects_past_dates_but_allows_today() {
        let today = day("2025-06-15");

        assert_matches!(
            validate_booking_fields(day("2025-06-14"), "10:00", "fever", today),
            Err(AppointmentError::ValidationError(_))
        );
        assert!(validate_booking_fields(day("2025-06-15"), "10:00", "fever", today).is_ok());
        assert!(validate_booking_fields(day("2025-06-16"), "10:00", "fever", today).is_ok());
    }

    #[test]
    fn rejects_malformed_clock_times() {
        let today = day("2025-01-01");

        assert_matches!(
            validate_booking_fields(day("2030-03-01"), "25:99", "fever", today),
            Err(AppointmentError::ValidationError(_))
        );
        assert_matches!(
            validate_booking_fields(day("2030-03-01"), "ten o'clock", "fever", today),
            Err(AppointmentError::ValidationError(_))
        );

        let parsed = validate_booking_fields(day("2030-03-01"), "09:30", "fever", today).unwrap();
        assert_eq!(parsed.format("%H:%M").to_string(), "09:30");
    }
}
