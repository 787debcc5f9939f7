//! Health record client methods: EMRs, prescriptions and health metrics

use super::{ApiClient, ClientError};
use medport_core::{
    Emr, HealthMetric, NewEmr, NewHealthMetric, NewPrescription, Prescription,
};

impl ApiClient {
    pub async fn emrs(&self) -> Result<Vec<Emr>, ClientError> {
        self.get("/emrs/").await
    }

    /// Add a medical record; the server only accepts this from doctors
    pub async fn create_emr(&self, emr: &NewEmr) -> Result<Emr, ClientError> {
        self.post("/emrs/", emr).await
    }

    pub async fn prescriptions(&self) -> Result<Vec<Prescription>, ClientError> {
        self.get("/prescriptions/").await
    }

    pub async fn create_prescription(
        &self,
        prescription: &NewPrescription,
    ) -> Result<Prescription, ClientError> {
        self.post("/prescriptions/", prescription).await
    }

    pub async fn health_metrics(&self) -> Result<Vec<HealthMetric>, ClientError> {
        self.get("/healthmetrics/").await
    }

    pub async fn create_health_metric(
        &self,
        metric: &NewHealthMetric,
    ) -> Result<HealthMetric, ClientError> {
        self.post("/healthmetrics/", metric).await
    }
}
