//! Patient and doctor profile client methods

use super::{ApiClient, ClientError};
use medport_core::{Doctor, NewDoctorProfile, NewPatientProfile, Patient, RecordId};

impl ApiClient {
    /// Create the patient profile for the logged-in user
    pub async fn create_patient_profile(
        &self,
        profile: &NewPatientProfile,
    ) -> Result<Patient, ClientError> {
        self.post("/profiles/patient/", profile).await
    }

    /// Create the doctor profile for the logged-in user
    pub async fn create_doctor_profile(
        &self,
        profile: &NewDoctorProfile,
    ) -> Result<Doctor, ClientError> {
        self.post("/profiles/doctor/", profile).await
    }

    /// Patient profiles visible to the caller: their own, or none
    pub async fn my_patient_profiles(&self) -> Result<Vec<Patient>, ClientError> {
        self.get("/patients/").await
    }

    pub async fn patient(&self, id: RecordId) -> Result<Patient, ClientError> {
        self.get(&format!("/patients/{id}/")).await
    }

    pub async fn update_patient(
        &self,
        id: RecordId,
        profile: &NewPatientProfile,
    ) -> Result<Patient, ClientError> {
        self.put(&format!("/patients/{id}/"), profile).await
    }

    pub async fn doctors(&self) -> Result<Vec<Doctor>, ClientError> {
        self.get("/doctors/").await
    }

    pub async fn doctor(&self, id: RecordId) -> Result<Doctor, ClientError> {
        self.get(&format!("/doctors/{id}/")).await
    }
}
