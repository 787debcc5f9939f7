//! Dashboard data for the logged-in user
//!
//! The API has no "who am I" endpoint, so the caller's role is found by
//! elimination: a user with a patient profile is a patient, otherwise the
//! doctor list is scanned for the user id in the access token. The scan is
//! linear in the number of doctors.

use crate::context::Session;
use crate::error::SessionError;
use medport_core::{Appointment, Doctor, Emr, HealthMetric, Patient};

/// The profile the logged-in user acts through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalRole {
    Patient(Patient),
    Doctor(Doctor),
}

impl PortalRole {
    pub fn is_patient(&self) -> bool {
        matches!(self, Self::Patient(_))
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Patient(patient) => &patient.full_name,
            Self::Doctor(doctor) => &doctor.full_name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub role: PortalRole,
    pub appointments: Vec<Appointment>,
    pub emrs: Vec<Emr>,
    /// Only loaded for patients
    pub health_metrics: Vec<HealthMetric>,
}

impl Session {
    /// Work out whether the logged-in user is a patient or a doctor
    pub async fn resolve_role(&self) -> Result<PortalRole, SessionError> {
        let client = self.client();

        let patients = self.guard(client.my_patient_profiles()).await?;
        if let Some(patient) = patients.into_iter().next() {
            return Ok(PortalRole::Patient(patient));
        }

        let user_id = self.user_id().ok_or(SessionError::MissingUserId)?;
        let doctors = self.guard(client.doctors()).await?;
        doctors
            .into_iter()
            .find(|doctor| doctor.user == user_id)
            .map(PortalRole::Doctor)
            .ok_or(SessionError::ProfileNotFound)
    }

    /// Load everything the dashboard shows for the current role
    pub async fn load_dashboard(&self) -> Result<Dashboard, SessionError> {
        let role = self.resolve_role().await?;
        let client = self.client();

        let dashboard = if role.is_patient() {
            let (appointments, emrs, health_metrics) = self
                .guard(async {
                    tokio::try_join!(client.appointments(), client.emrs(), client.health_metrics())
                })
                .await?;
            Dashboard {
                role,
                appointments,
                emrs,
                health_metrics,
            }
        } else {
            let (appointments, emrs) = self
                .guard(async { tokio::try_join!(client.appointments(), client.emrs()) })
                .await?;
            Dashboard {
                role,
                appointments,
                emrs,
                health_metrics: Vec::new(),
            }
        };

        tracing::debug!(
            appointments = dashboard.appointments.len(),
            emrs = dashboard.emrs.len(),
            "Dashboard loaded for {}",
            dashboard.role.display_name()
        );
        Ok(dashboard)
    }
}
