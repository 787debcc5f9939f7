use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Primary key of a server-side record
pub type RecordId = u64;

// Optional fields may come back as `null` or as an empty string.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => {
            T::deserialize(raw.into_deserializer()).map(Some)
        }
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AppointmentStatus {
    #[default]
    Requested,
    Approved,
    Rescheduled,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Requested => "Requested",
            Self::Approved => "Approved",
            Self::Rescheduled => "Rescheduled",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

/// Account creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Informational reply from endpoints that return no record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerMessage {
    pub message: String,
}

/// Patient profile; `user` is both the owner and the primary key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    pub user: RecordId,
    pub full_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub existing_conditions: String,
    #[serde(default)]
    pub medications: String,
}

/// Writable patient profile fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPatientProfile {
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub existing_conditions: String,
    #[serde(default)]
    pub medications: String,
}

impl From<Patient> for NewPatientProfile {
    fn from(patient: Patient) -> Self {
        Self {
            full_name: patient.full_name,
            date_of_birth: patient.date_of_birth,
            gender: patient.gender,
            phone: patient.phone,
            address: patient.address,
            allergies: patient.allergies,
            existing_conditions: patient.existing_conditions,
            medications: patient.medications,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Doctor {
    pub user: RecordId,
    pub full_name: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub office_address: String,
}

impl fmt::Display for Doctor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.specialization.is_empty() {
            write!(f, "Dr. {}", self.full_name)
        } else {
            write!(f, "Dr. {} - {}", self.full_name, self.specialization)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewDoctorProfile {
    pub full_name: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub office_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    pub id: RecordId,
    pub patient: RecordId,
    pub doctor: RecordId,
    pub appointment_datetime: DateTime<Utc>,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// Appointment request; the server assigns the patient from the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewAppointment {
    pub doctor: RecordId,
    pub appointment_datetime: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<RecordId>,
}

/// Full replacement of an appointment's writable fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppointmentUpdate {
    pub patient: RecordId,
    pub doctor: RecordId,
    pub appointment_datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: String,
}

impl From<Appointment> for AppointmentUpdate {
    fn from(appointment: Appointment) -> Self {
        Self {
            patient: appointment.patient,
            doctor: appointment.doctor,
            appointment_datetime: appointment.appointment_datetime,
            status: appointment.status,
            notes: appointment.notes,
        }
    }
}

/// Electronic medical record entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Emr {
    pub id: RecordId,
    pub patient: RecordId,
    #[serde(default)]
    pub doctor: Option<RecordId>,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub treatment_plan: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewEmr {
    pub patient: RecordId,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub treatment_plan: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prescription {
    pub id: RecordId,
    pub emr: RecordId,
    pub medication_name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub refill_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPrescription {
    pub emr: RecordId,
    pub medication_name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refill_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: RecordId,
    pub sender: RecordId,
    pub receiver: RecordId,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMessage {
    pub receiver: RecordId,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthMetric {
    pub id: RecordId,
    pub patient: RecordId,
    /// e.g. `blood_pressure_systolic`
    pub metric_type: String,
    pub value: String,
    #[serde(default)]
    pub unit: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewHealthMetric {
    pub patient: RecordId,
    pub metric_type: String,
    pub value: String,
    #[serde(default)]
    pub unit: String,
}
