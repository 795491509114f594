//! Booking form state and its denormalizing submit.
//!
//! The form keeps clinic and doctor as directory ids; `to_payload` copies
//! their display fields into the nine-field appointment payload.

use super::clinics::{self, Clinic, Doctor, CLINICS};
use crate::models::AppointmentFields;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("Unknown clinic: {0}")]
    UnknownClinic(String),
    #[error("Doctor {doctor} does not practice at clinic {clinic}")]
    DoctorNotAtClinic { doctor: String, clinic: String },
    #[error("{0} is required")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingForm {
    pub title: String,
    pub description: String,
    /// `datetime-local` value, e.g. `2024-01-15T10:00`.
    pub date_time: String,
    clinic: &'static Clinic,
    doctor: Option<&'static Doctor>,
}

impl Default for BookingForm {
    fn default() -> Self {
        let clinic = &CLINICS[0];
        Self {
            title: String::new(),
            description: String::new(),
            date_time: String::new(),
            clinic,
            doctor: clinics::doctors_for_clinic(clinic.id).first().copied(),
        }
    }
}

impl BookingForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clinic(&self) -> &'static Clinic {
        self.clinic
    }

    pub fn doctor(&self) -> Option<&'static Doctor> {
        self.doctor
    }

    pub fn available_doctors(&self) -> Vec<&'static Doctor> {
        clinics::doctors_for_clinic(self.clinic.id)
    }

    /// Switch clinic; the doctor resets to that clinic's first doctor.
    pub fn select_clinic(&mut self, clinic_id: &str) -> Result<(), BookingError> {
        let clinic = clinics::clinic_by_id(clinic_id)
            .ok_or_else(|| BookingError::UnknownClinic(clinic_id.to_string()))?;
        self.clinic = clinic;
        self.doctor = clinics::doctors_for_clinic(clinic.id).first().copied();
        Ok(())
    }

    pub fn select_doctor(&mut self, doctor_id: &str) -> Result<(), BookingError> {
        let doctor = clinics::doctor_by_id(doctor_id)
            .filter(|d| d.clinic_id == self.clinic.id)
            .ok_or_else(|| BookingError::DoctorNotAtClinic {
                doctor: doctor_id.to_string(),
                clinic: self.clinic.id.to_string(),
            })?;
        self.doctor = Some(doctor);
        Ok(())
    }

    /// Build the create payload, copying clinic and doctor display fields.
    pub fn to_payload(&self) -> Result<AppointmentFields, BookingError> {
        let required = [
            ("title", &self.title),
            ("dateTime", &self.date_time),
            ("description", &self.description),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(BookingError::MissingField(*name));
        }
        let doctor = self.doctor.ok_or(BookingError::MissingField("doctor"))?;

        Ok(AppointmentFields {
            title: self.title.clone(),
            description: self.description.clone(),
            date_time: self.date_time.clone(),
            clinic: self.clinic.id.to_string(),
            clinic_name: self.clinic.name.to_string(),
            image: self.clinic.image.to_string(),
            address: self.clinic.address.to_string(),
            doctor: doctor.name.to_string(),
            doctor_specialty: doctor.specialty.to_string(),
        })
    }
}
