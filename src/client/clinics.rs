//! Static clinic and doctor directory used to denormalize bookings.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clinic {
    pub id: &'static str,
    pub name: &'static str,
    pub address: &'static str,
    pub image: &'static str,
    pub specialty: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Doctor {
    pub id: &'static str,
    pub clinic_id: &'static str,
    pub name: &'static str,
    pub specialty: &'static str,
}

pub static CLINICS: [Clinic; 3] = [
    Clinic {
        id: "c1",
        name: "City Medical Center",
        address: "123 Main St, Downtown",
        image: "https://images.unsplash.com/photo-1523050854058-8df90110c9f1?q=80&w=500&auto=format&fit=crop",
        specialty: "General Medicine & Pediatrics",
    },
    Clinic {
        id: "c2",
        name: "Westside Health Clinic",
        address: "456 Park Ave, Westside",
        image: "https://images.unsplash.com/photo-1519494026892-80bbd2d6fd0d?q=80&w=500&auto=format&fit=crop",
        specialty: "Cardiology & Dermatology",
    },
    Clinic {
        id: "c3",
        name: "Riverside Hospital",
        address: "789 River Rd, Riverside",
        image: "https://images.unsplash.com/photo-1586773860418-d37222d8fce3?q=80&w=500&auto=format&fit=crop",
        specialty: "Neurology & Orthopedics",
    },
];

/// Grouped by clinic, in clinic order.
pub static DOCTORS: [Doctor; 6] = [
    Doctor {
        id: "d1",
        clinic_id: "c1",
        name: "Dr. Sarah Johnson",
        specialty: "General Practitioner",
    },
    Doctor {
        id: "d2",
        clinic_id: "c1",
        name: "Dr. Michael Chen",
        specialty: "Pediatrician",
    },
    Doctor {
        id: "d3",
        clinic_id: "c2",
        name: "Dr. Amanda Wilson",
        specialty: "Cardiologist",
    },
    Doctor {
        id: "d4",
        clinic_id: "c2",
        name: "Dr. Robert Garcia",
        specialty: "Dermatologist",
    },
    Doctor {
        id: "d5",
        clinic_id: "c3",
        name: "Dr. Emily Patel",
        specialty: "Neurologist",
    },
    Doctor {
        id: "d6",
        clinic_id: "c3",
        name: "Dr. James Williams",
        specialty: "Orthopedist",
    },
];

pub fn clinic_by_id(id: &str) -> Option<&'static Clinic> {
    CLINICS.iter().find(|c| c.id == id)
}

pub fn doctor_by_id(id: &str) -> Option<&'static Doctor> {
    DOCTORS.iter().find(|d| d.id == id)
}

pub fn doctors_for_clinic(clinic_id: &str) -> Vec<&'static Doctor> {
    DOCTORS.iter().filter(|d| d.clinic_id == clinic_id).collect()
}

pub fn all_doctors() -> &'static [Doctor] {
    &DOCTORS
}
