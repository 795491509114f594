//! Saved-appointments store: a client-only bookmark list.
//!
//! Created once and handed around by cheap clones; every clone sees the
//! same list. Entries are never written back to the server.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Appointment;

/// Display snapshot of an appointment, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAppointment {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image: String,
    pub address: String,
    pub doctor: String,
    pub doctor_specialty: String,
    pub clinic_name: String,
    pub date_time: String,
}

impl From<&Appointment> for SavedAppointment {
    fn from(appt: &Appointment) -> Self {
        let f = &appt.fields;
        Self {
            id: appt.id,
            title: f.title.clone(),
            description: f.description.clone(),
            image: f.image.clone(),
            address: f.address.clone(),
            doctor: f.doctor.clone(),
            doctor_specialty: f.doctor_specialty.clone(),
            clinic_name: f.clinic_name.clone(),
            date_time: f.date_time.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SavedAppointments {
    entries: Arc<Mutex<Vec<SavedAppointment>>>,
}

impl SavedAppointments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poisoning is ignored: the list is plain data.
    fn entries(&self) -> MutexGuard<'_, Vec<SavedAppointment>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert unless an entry with the same id exists. Returns whether
    /// anything was added.
    pub fn save(&self, appointment: SavedAppointment) -> bool {
        let mut entries = self.entries();
        if entries.iter().any(|a| a.id == appointment.id) {
            return false;
        }
        entries.push(appointment);
        true
    }

    /// Remove by id. Returns whether anything was removed.
    pub fn remove(&self, id: &Uuid) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|a| a.id != *id);
        entries.len() != before
    }

    pub fn is_saved(&self, id: &Uuid) -> bool {
        self.entries().iter().any(|a| a.id == *id)
    }

    pub fn count(&self) -> usize {
        self.entries().len()
    }

    /// Snapshot in insertion order.
    pub fn list(&self) -> Vec<SavedAppointment> {
        self.entries().clone()
    }
}
