//! Appointment client methods

use super::{ApiClient, ClientError};
use medport_core::{Appointment, AppointmentUpdate, NewAppointment, RecordId};

impl ApiClient {
    /// Appointments where the caller is the patient or the doctor
    pub async fn appointments(&self) -> Result<Vec<Appointment>, ClientError> {
        self.get("/appointments/").await
    }

    pub async fn appointment(&self, id: RecordId) -> Result<Appointment, ClientError> {
        self.get(&format!("/appointments/{id}/")).await
    }

    /// Request an appointment; only patients may do this
    pub async fn create_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, ClientError> {
        self.post("/appointments/", appointment).await
    }

    pub async fn update_appointment(
        &self,
        id: RecordId,
        update: &AppointmentUpdate,
    ) -> Result<Appointment, ClientError> {
        self.put(&format!("/appointments/{id}/"), update).await
    }
}
