//! CLI commands

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Subcommand, ValueEnum};
use medport_core::{
    AppointmentStatus, AppointmentUpdate, ClientConfig, Doctor, FileTokenStore, Gender,
    NewAppointment, NewDoctorProfile, NewEmr, NewHealthMetric, NewMessage, NewPatientProfile,
    NewPrescription, Patient, RecordId, Registration, TokenPair,
};
use medport_http::ApiClient;
use medport_session::{PortalRole, Session};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and keep the session for later commands
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "MEDPORT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show whether a stored session is still valid
    Status,

    /// Create a new account
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "MEDPORT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Patient and doctor profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// List doctors, or show one
    Doctors {
        /// Doctor's user id
        id: Option<RecordId>,
    },

    /// Appointment booking and management
    Appointments {
        #[command(subcommand)]
        command: AppointmentCommands,
    },

    /// Medical records, prescriptions and health metrics
    Records {
        #[command(subcommand)]
        command: RecordCommands,
    },

    /// Record health metrics
    Metrics {
        #[command(subcommand)]
        command: MetricCommands,
    },

    /// Messages between patients and doctors
    Messages {
        #[command(subcommand)]
        command: MessageCommands,
    },

    /// Overview for the logged-in patient or doctor
    Dashboard,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Create a patient profile for the current account
    CreatePatient {
        #[arg(long)]
        full_name: String,

        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        date_of_birth: Option<NaiveDate>,

        #[arg(long)]
        gender: Option<GenderArg>,

        #[arg(long, default_value = "")]
        phone: String,

        #[arg(long, default_value = "")]
        address: String,

        #[arg(long, default_value = "")]
        allergies: String,

        #[arg(long, default_value = "")]
        existing_conditions: String,

        #[arg(long, default_value = "")]
        medications: String,
    },

    /// Create a doctor profile for the current account
    CreateDoctor {
        #[arg(long)]
        full_name: String,

        #[arg(long, default_value = "")]
        specialization: String,

        #[arg(long, default_value = "")]
        phone: String,

        #[arg(long, default_value = "")]
        office_address: String,
    },

    /// Show the profile of the logged-in user, or a patient's profile
    Show {
        /// Patient's user id, for doctors looking up a patient
        #[arg(long)]
        patient: Option<RecordId>,
    },

    /// Change fields of the logged-in patient's profile
    Update {
        #[arg(long)]
        full_name: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        allergies: Option<String>,

        #[arg(long)]
        existing_conditions: Option<String>,

        #[arg(long)]
        medications: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AppointmentCommands {
    /// List appointments visible to the current user
    List,

    /// Show a single appointment
    Show { id: RecordId },

    /// Request an appointment with a doctor
    Create {
        /// Doctor's user id
        #[arg(long)]
        doctor: RecordId,

        /// Date and time in RFC 3339, e.g. 2025-03-01T09:30:00Z
        #[arg(long)]
        at: DateTime<Utc>,

        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Change status, time or notes of an appointment
    Update {
        id: RecordId,

        #[arg(long)]
        status: Option<StatusArg>,

        #[arg(long)]
        at: Option<DateTime<Utc>>,

        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum RecordCommands {
    /// List medical record entries
    Emrs,

    /// List prescriptions
    Prescriptions,

    /// List health metrics
    Metrics,

    /// Add a medical record entry for a patient
    AddEmr {
        #[arg(long)]
        patient: RecordId,

        #[arg(long, default_value = "")]
        diagnosis: String,

        #[arg(long, default_value = "")]
        treatment_plan: String,
    },

    /// Prescribe medication against a record entry
    Prescribe {
        #[arg(long)]
        emr: RecordId,

        #[arg(long)]
        medication: String,

        #[arg(long, default_value = "")]
        dosage: String,

        #[arg(long, default_value = "")]
        instructions: String,

        /// Refill date (YYYY-MM-DD)
        #[arg(long)]
        refill_date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
pub enum MetricCommands {
    /// Record a health metric for the logged-in patient
    Add {
        /// e.g. blood_pressure_systolic
        metric_type: String,

        value: String,

        #[arg(long, default_value = "")]
        unit: String,
    },
}

#[derive(Subcommand)]
pub enum MessageCommands {
    /// List sent and received messages
    List,

    /// Send a message to another user
    Send {
        /// Receiver's user id
        #[arg(long)]
        to: RecordId,

        message: String,
    },
}

#[derive(Clone, Debug, ValueEnum)]
pub enum GenderArg {
    Male,
    Female,
    Other,
}

impl From<GenderArg> for Gender {
    fn from(gender: GenderArg) -> Self {
        match gender {
            GenderArg::Male => Gender::Male,
            GenderArg::Female => Gender::Female,
            GenderArg::Other => Gender::Other,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum StatusArg {
    Requested,
    Approved,
    Rescheduled,
    Cancelled,
}

impl From<StatusArg> for AppointmentStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Requested => AppointmentStatus::Requested,
            StatusArg::Approved => AppointmentStatus::Approved,
            StatusArg::Rescheduled => AppointmentStatus::Rescheduled,
            StatusArg::Cancelled => AppointmentStatus::Cancelled,
        }
    }
}

/// Print a value as pretty JSON or through its human-readable renderer
fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

/// Session tokens live in the configured data directory
fn token_store(config: &ClientConfig) -> FileTokenStore {
    FileTokenStore::new(config.tokens_path())
}

fn access_expiry(tokens: &TokenPair) -> Option<DateTime<Utc>> {
    tokens.claims().ok()?.expires_at()
}

impl Commands {
    /// Commands other than these validate the stored session first
    fn needs_session(&self) -> bool {
        !matches!(
            self,
            Commands::Login { .. } | Commands::Logout | Commands::Register { .. } | Commands::Status
        )
    }

    pub async fn execute(self, config: ClientConfig, json: bool) -> Result<()> {
        let store = Arc::new(token_store(&config));
        debug!("Using token store at {}", store.path().display());
        let client = ApiClient::from_config(&config, store)?;
        let session = Session::new(client);

        if self.needs_session() && !session.initialize().await.is_authenticated {
            bail!("not logged in, run `medport login`");
        }

        match self {
            Commands::Login { username, password } => {
                session.login(&username, &password).await?;
                println!("Logged in as {username}");
                Ok(())
            }
            Commands::Logout => {
                session.logout();
                println!("Logged out");
                Ok(())
            }
            Commands::Status => {
                let state = session.initialize().await;
                if !state.is_authenticated {
                    println!("Not logged in");
                } else if let Some(user_id) = session.user_id() {
                    println!("Logged in (user {user_id})");
                } else {
                    println!("Logged in");
                }
                let tokens = session.client().store().get();
                if let Some(expires_at) = tokens.as_ref().and_then(access_expiry) {
                    println!(
                        "  Access token valid until {}",
                        expires_at.format("%Y-%m-%d %H:%M UTC")
                    );
                }
                Ok(())
            }
            Commands::Register {
                username,
                email,
                password,
            } => {
                let registration = Registration {
                    username,
                    email,
                    password,
                };
                let reply = session.client().register(&registration).await?;
                println!("{}", reply.message);
                Ok(())
            }
            Commands::Profile { command } => command.execute(&session, json).await,
            Commands::Doctors { id: Some(id) } => {
                let doctor = session.guard(session.client().doctor(id)).await?;
                emit(json, &doctor, print_doctor)
            }
            Commands::Doctors { id: None } => {
                let doctors = session.guard(session.client().doctors()).await?;
                emit(json, &doctors, |doctors| {
                    for doctor in doctors {
                        println!("{:>6}  {doctor}", doctor.user);
                    }
                })
            }
            Commands::Appointments { command } => command.execute(&session, json).await,
            Commands::Records { command } => command.execute(&session, json).await,
            Commands::Metrics { command } => command.execute(&session, json).await,
            Commands::Messages { command } => command.execute(&session, json).await,
            Commands::Dashboard => show_dashboard(&session, json).await,
        }
    }
}

impl ProfileCommands {
    pub async fn execute(self, session: &Session, json: bool) -> Result<()> {
        let client = session.client();
        match self {
            ProfileCommands::CreatePatient {
                full_name,
                date_of_birth,
                gender,
                phone,
                address,
                allergies,
                existing_conditions,
                medications,
            } => {
                let profile = NewPatientProfile {
                    full_name,
                    date_of_birth,
                    gender: gender.map(Gender::from),
                    phone,
                    address,
                    allergies,
                    existing_conditions,
                    medications,
                };
                let created = session.guard(client.create_patient_profile(&profile)).await?;
                info!("Created patient profile for {}", created.full_name);
                emit(json, &created, |p| println!("Patient profile created for {}", p.full_name))
            }
            ProfileCommands::CreateDoctor {
                full_name,
                specialization,
                phone,
                office_address,
            } => {
                let profile = NewDoctorProfile {
                    full_name,
                    specialization,
                    phone,
                    office_address,
                };
                let created = session.guard(client.create_doctor_profile(&profile)).await?;
                info!("Created doctor profile for {}", created.full_name);
                emit(json, &created, |d| println!("Doctor profile created: {d}"))
            }
            ProfileCommands::Show { patient: Some(id) } => {
                let patient = session.guard(client.patient(id)).await?;
                emit(json, &patient, print_patient)
            }
            ProfileCommands::Show { patient: None } => match session.resolve_role().await? {
                PortalRole::Patient(patient) => emit(json, &patient, print_patient),
                PortalRole::Doctor(doctor) => emit(json, &doctor, print_doctor),
            },
            ProfileCommands::Update {
                full_name,
                phone,
                address,
                allergies,
                existing_conditions,
                medications,
            } => {
                let PortalRole::Patient(current) = session.resolve_role().await? else {
                    bail!("only patient profiles can be updated");
                };
                let id = current.user;
                let mut profile = NewPatientProfile::from(current);
                for (field, value) in [
                    (&mut profile.full_name, full_name),
                    (&mut profile.phone, phone),
                    (&mut profile.address, address),
                    (&mut profile.allergies, allergies),
                    (&mut profile.existing_conditions, existing_conditions),
                    (&mut profile.medications, medications),
                ] {
                    if let Some(value) = value {
                        *field = value;
                    }
                }
                let updated = session.guard(client.update_patient(id, &profile)).await?;
                emit(json, &updated, print_patient)
            }
        }
    }
}

fn print_patient(p: &Patient) {
    println!("Patient: {}", p.full_name);
    if let Some(dob) = p.date_of_birth {
        println!("  Born: {dob}");
    }
    if let Some(gender) = p.gender {
        println!("  Gender: {gender:?}");
    }
    for (label, value) in [
        ("Phone", &p.phone),
        ("Address", &p.address),
        ("Allergies", &p.allergies),
        ("Conditions", &p.existing_conditions),
        ("Medications", &p.medications),
    ] {
        if !value.is_empty() {
            println!("  {label}: {value}");
        }
    }
}

fn print_doctor(d: &Doctor) {
    println!("{d}");
    if !d.phone.is_empty() {
        println!("  Phone: {}", d.phone);
    }
    if !d.office_address.is_empty() {
        println!("  Office: {}", d.office_address);
    }
}

impl AppointmentCommands {
    pub async fn execute(self, session: &Session, json: bool) -> Result<()> {
        let client = session.client();
        match self {
            AppointmentCommands::List => {
                let appointments = session.guard(client.appointments()).await?;
                emit(json, &appointments, |appointments| {
                    if appointments.is_empty() {
                        println!("No appointments");
                    }
                    for a in appointments {
                        println!(
                            "{:>6}  {}  doctor {:<6} patient {:<6} {}",
                            a.id,
                            a.appointment_datetime.format("%Y-%m-%d %H:%M"),
                            a.doctor,
                            a.patient,
                            a.status
                        );
                    }
                })
            }
            AppointmentCommands::Show { id } => {
                let appointment = session.guard(client.appointment(id)).await?;
                emit(json, &appointment, |a| {
                    println!("Appointment {}", a.id);
                    println!("  When: {}", a.appointment_datetime);
                    println!("  Doctor: {}", a.doctor);
                    println!("  Patient: {}", a.patient);
                    println!("  Status: {}", a.status);
                    if !a.notes.is_empty() {
                        println!("  Notes: {}", a.notes);
                    }
                })
            }
            AppointmentCommands::Create { doctor, at, notes } => {
                let request = NewAppointment {
                    doctor,
                    appointment_datetime: at,
                    notes,
                    patient: None,
                };
                let created = session.guard(client.create_appointment(&request)).await?;
                emit(json, &created, |a| {
                    println!("Requested appointment {} for {}", a.id, a.appointment_datetime)
                })
            }
            AppointmentCommands::Update {
                id,
                status,
                at,
                notes,
            } => {
                let current = session.guard(client.appointment(id)).await?;
                let mut update = AppointmentUpdate::from(current);
                if let Some(status) = status {
                    update.status = status.into();
                }
                if let Some(at) = at {
                    update.appointment_datetime = at;
                }
                if let Some(notes) = notes {
                    update.notes = notes;
                }
                let updated = session.guard(client.update_appointment(id, &update)).await?;
                emit(json, &updated, |a| {
                    println!("Appointment {} is now {}", a.id, a.status)
                })
            }
        }
    }
}

impl RecordCommands {
    pub async fn execute(self, session: &Session, json: bool) -> Result<()> {
        let client = session.client();
        match self {
            RecordCommands::Emrs => {
                let emrs = session.guard(client.emrs()).await?;
                emit(json, &emrs, |emrs| {
                    for emr in emrs {
                        println!(
                            "{:>6}  {}  patient {:<6} {}",
                            emr.id,
                            emr.created_at.format("%Y-%m-%d"),
                            emr.patient,
                            emr.diagnosis
                        );
                        if !emr.treatment_plan.is_empty() {
                            println!("        Plan: {}", emr.treatment_plan);
                        }
                    }
                })
            }
            RecordCommands::Prescriptions => {
                let prescriptions = session.guard(client.prescriptions()).await?;
                emit(json, &prescriptions, |prescriptions| {
                    for p in prescriptions {
                        println!("{:>6}  {} {}", p.id, p.medication_name, p.dosage);
                        if !p.instructions.is_empty() {
                            println!("        {}", p.instructions);
                        }
                        if let Some(refill) = p.refill_date {
                            println!("        Refill by {refill}");
                        }
                    }
                })
            }
            RecordCommands::Metrics => {
                let metrics = session.guard(client.health_metrics()).await?;
                emit(json, &metrics, |metrics| {
                    for m in metrics {
                        println!(
                            "{}  {} = {} {}",
                            m.recorded_at.format("%Y-%m-%d %H:%M"),
                            m.metric_type,
                            m.value,
                            m.unit
                        );
                    }
                })
            }
            RecordCommands::AddEmr {
                patient,
                diagnosis,
                treatment_plan,
            } => {
                let emr = NewEmr {
                    patient,
                    diagnosis,
                    treatment_plan,
                };
                let created = session.guard(client.create_emr(&emr)).await?;
                emit(json, &created, |e| println!("Created record {}", e.id))
            }
            RecordCommands::Prescribe {
                emr,
                medication,
                dosage,
                instructions,
                refill_date,
            } => {
                let prescription = NewPrescription {
                    emr,
                    medication_name: medication,
                    dosage,
                    instructions,
                    refill_date,
                };
                let created = session
                    .guard(client.create_prescription(&prescription))
                    .await?;
                emit(json, &created, |p| {
                    println!("Prescribed {} ({})", p.medication_name, p.id)
                })
            }
        }
    }
}

impl MetricCommands {
    pub async fn execute(self, session: &Session, json: bool) -> Result<()> {
        match self {
            MetricCommands::Add {
                metric_type,
                value,
                unit,
            } => {
                let Some(patient) = session.user_id() else {
                    bail!("user id not found, run `medport login` again");
                };
                let metric = NewHealthMetric {
                    patient,
                    metric_type,
                    value,
                    unit,
                };
                let created = session
                    .guard(session.client().create_health_metric(&metric))
                    .await?;
                emit(json, &created, |m| {
                    println!("Recorded {} = {} {}", m.metric_type, m.value, m.unit)
                })
            }
        }
    }
}

impl MessageCommands {
    pub async fn execute(self, session: &Session, json: bool) -> Result<()> {
        let client = session.client();
        match self {
            MessageCommands::List => {
                let messages = session.guard(client.messages()).await?;
                let me = session.user_id();
                emit(json, &messages, |messages| {
                    for m in messages {
                        let direction = if Some(m.sender) == me {
                            format!("to {}", m.receiver)
                        } else {
                            format!("from {}", m.sender)
                        };
                        println!(
                            "{}  {direction:<12} {}",
                            m.sent_at.format("%Y-%m-%d %H:%M"),
                            m.message
                        );
                    }
                })
            }
            MessageCommands::Send { to, message } => {
                let request = NewMessage {
                    receiver: to,
                    message,
                };
                let sent = session.guard(client.send_message(&request)).await?;
                emit(json, &sent, |m| println!("Message {} sent to {}", m.id, m.receiver))
            }
        }
    }
}

async fn show_dashboard(session: &Session, json: bool) -> Result<()> {
    let dashboard = session.load_dashboard().await?;

    if json {
        let role = match &dashboard.role {
            PortalRole::Patient(patient) => serde_json::json!({ "patient": patient }),
            PortalRole::Doctor(doctor) => serde_json::json!({ "doctor": doctor }),
        };
        let value = serde_json::json!({
            "role": role,
            "appointments": dashboard.appointments,
            "emrs": dashboard.emrs,
            "health_metrics": dashboard.health_metrics,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match &dashboard.role {
        PortalRole::Patient(patient) => println!("Welcome, {}", patient.full_name),
        PortalRole::Doctor(doctor) => println!("Welcome, {doctor}"),
    }
    println!("  Appointments: {}", dashboard.appointments.len());
    if let Some(next) = dashboard
        .appointments
        .iter()
        .filter(|a| a.status != AppointmentStatus::Cancelled && a.appointment_datetime > Utc::now())
        .min_by_key(|a| a.appointment_datetime)
    {
        println!(
            "  Next: {} with doctor {} ({})",
            next.appointment_datetime.format("%Y-%m-%d %H:%M"),
            next.doctor,
            next.status
        );
    }
    println!("  Medical records: {}", dashboard.emrs.len());
    if dashboard.role.is_patient() {
        println!("  Health metrics: {}", dashboard.health_metrics.len());
    }
    Ok(())
}
