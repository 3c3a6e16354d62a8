use std::future::Future;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use tracing::{debug, warn};

use appointment_cell::{
    parse_date, parse_time_of_day, Appointment, AppointmentBookingService, AppointmentCache,
    AppointmentQueryService, AppointmentType, BookAppointmentRequest, BookingOutcome,
    SessionType, SlotFetch, SlotService, NO_SLOTS_MESSAGE,
};
use directory_cell::{find_doctor, search_doctors, search_hospitals, DirectoryService};
use session_cell::{FileStore, Session, SessionError, SessionService};
use shared_api::ApiClient;
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::ViewScope;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and remember the session on this device
    Login {
        /// Registered email address or mobile number
        email_or_mobile: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// List hospitals
    Hospitals {
        /// Filter by name or specialty
        #[arg(long)]
        search: Option<String>,
    },
    /// Choose the hospital later commands act on
    SelectHospital {
        hospital_id: String,
    },
    /// List departments of the selected hospital
    Departments,
    /// List doctors in a department of the selected hospital
    Doctors {
        department: String,
        #[arg(long)]
        search: Option<String>,
    },
    /// Show bookable slots for a doctor
    Slots {
        doctor_id: String,
        /// YYYY-MM-DD, defaults to today at the clinic
        #[arg(long)]
        date: Option<String>,
    },
    /// List appointments at the selected hospital
    Appointments {
        /// Show the history instead of upcoming appointments
        #[arg(long)]
        past: bool,
    },
    /// Book a slot
    Book {
        doctor_id: String,
        /// YYYY-MM-DD
        date: String,
        /// Slot start, HH:MM
        start: String,
        /// Slot end, HH:MM. Needed only when two slots share a start
        #[arg(long)]
        end: Option<String>,
        /// consultation, follow-up, therapy or check-up
        #[arg(long, default_value = "consultation")]
        session_type: String,
        /// manual or virtual
        #[arg(long, default_value = "manual")]
        appointment_type: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Move an appointment to another slot on the same day
    Reschedule {
        appointment_id: String,
        /// New slot start, HH:MM
        start: String,
    },
    /// Cancel an appointment
    Cancel {
        appointment_id: String,
    },
}

impl Commands {
    pub fn view_name(&self) -> &'static str {
        match self {
            Commands::Login { .. } | Commands::Logout => "login",
            Commands::Hospitals { .. } | Commands::SelectHospital { .. } => "hospitals",
            Commands::Departments | Commands::Doctors { .. } => "directory",
            Commands::Slots { .. } | Commands::Book { .. } => "booking",
            Commands::Appointments { .. } => "appointments",
            Commands::Reschedule { .. } | Commands::Cancel { .. } => "manage-appointment",
        }
    }
}

#[derive(Clone)]
pub struct App {
    config: Arc<AppConfig>,
    sessions: Arc<SessionService>,
    directory: Arc<DirectoryService>,
    slots: Arc<SlotService>,
    appointments: Arc<AppointmentQueryService>,
    booking: Arc<AppointmentBookingService>,
}

/// Awaits `fut` inside the view. A closed view surfaces as an error so the
/// command stops instead of printing stale data.
async fn in_view<F, T>(scope: &ViewScope, key: &str, fut: F) -> Result<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    scope
        .run(key, fut)
        .await
        .ok_or_else(|| anyhow!("{} cancelled", key))
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let api = Arc::new(
            ApiClient::new(&config)
                .map_err(AppError::from)
                .context("Set API_BASE_URL to the hospital backend")?,
        );
        let store = Arc::new(FileStore::new(config.session_store_path.clone()));

        Ok(Self {
            sessions: Arc::new(SessionService::new(Arc::clone(&api), store)),
            directory: Arc::new(DirectoryService::new(Arc::clone(&api))),
            slots: Arc::new(SlotService::new(Arc::clone(&api), &config)),
            appointments: Arc::new(AppointmentQueryService::new(Arc::clone(&api))),
            booking: Arc::new(AppointmentBookingService::new(api)),
            config: Arc::new(config),
        })
    }

    pub async fn run(&self, command: Commands, scope: &ViewScope) -> Result<()> {
        match command {
            Commands::Login {
                email_or_mobile,
                password,
            } => self.login(scope, email_or_mobile, password).await,
            Commands::Logout => self.logout().await,
            Commands::Hospitals { search } => self.hospitals(scope, search).await,
            Commands::SelectHospital { hospital_id } => self.select_hospital(scope, hospital_id).await,
            Commands::Departments => self.departments(scope).await,
            Commands::Doctors { department, search } => self.doctors(scope, department, search).await,
            Commands::Slots { doctor_id, date } => {
                let date = match date {
                    Some(raw) => parse_date(&raw).map_err(AppError::from)?,
                    None => self.config.clinic_now().date(),
                };
                let session = self.session().await?;
                let fetch = self.available_slots(scope, &session, &doctor_id, date).await?;
                print_slots(&fetch);
                Ok(())
            }
            Commands::Appointments { past } => self.list_appointments(scope, past).await,
            Commands::Book {
                doctor_id,
                date,
                start,
                end,
                session_type,
                appointment_type,
                reason,
            } => {
                self.book(
                    scope,
                    BookArgs {
                        doctor_id,
                        date,
                        start,
                        end,
                        session_type,
                        appointment_type,
                        reason,
                    },
                )
                .await
            }
            Commands::Reschedule {
                appointment_id,
                start,
            } => self.reschedule(scope, appointment_id, start).await,
            Commands::Cancel { appointment_id } => self.cancel(scope, appointment_id).await,
        }
    }

    async fn session(&self) -> Result<Session> {
        self.sessions
            .restore(Utc::now())
            .await
            .map_err(|e| AppError::from(e).into())
    }

    async fn login(&self, scope: &ViewScope, email_or_mobile: String, password: Option<String>) -> Result<()> {
        let password = match password {
            Some(password) => password,
            None => prompt("Password: ")?,
        };

        let sessions = Arc::clone(&self.sessions);
        let result = in_view(scope, "login", async move {
            sessions.login(&email_or_mobile, &password).await
        })
        .await?;

        match result {
            Ok(session) => {
                println!("Logged in as {}", session.patient.display_name());
                match &session.selected_hospital {
                    Some(hospital) => println!("Selected hospital: {} ({})", hospital.name, hospital.id),
                    None => println!("No hospital selected yet. Run `hospital hospitals` to pick one."),
                }
                Ok(())
            }
            Err(SessionError::LoginRejected(message)) => bail!("Login failed: {}", message),
            Err(e) => Err(AppError::from(e).into()),
        }
    }

    async fn logout(&self) -> Result<()> {
        match self.sessions.restore(Utc::now()).await {
            Ok(session) => {
                self.sessions.logout(session).await.map_err(AppError::from)?;
                println!("Logged out");
            }
            Err(SessionError::MissingSession) => println!("No active session"),
            Err(e) => return Err(AppError::from(e).into()),
        }
        Ok(())
    }

    async fn hospitals(&self, scope: &ViewScope, search: Option<String>) -> Result<()> {
        let session = self.session().await?;
        let directory = Arc::clone(&self.directory);
        let lookup = session.clone();
        let hospitals = in_view(scope, "hospitals", async move {
            directory.list_hospitals(&lookup).await
        })
        .await?
        .map_err(AppError::from)?;

        let shown = match search.as_deref() {
            Some(query) => search_hospitals(&hospitals, query),
            None => hospitals.iter().collect(),
        };
        if shown.is_empty() {
            println!("No hospitals found");
        }
        for hospital in shown {
            let marker = if session.hospital_id() == Some(hospital.hospital_id.as_str()) {
                "*"
            } else {
                " "
            };
            println!(
                "{} {:<26} {}  {}",
                marker,
                hospital.hospital_id,
                hospital.name,
                hospital.address.as_deref().unwrap_or_default()
            );
        }
        Ok(())
    }

    async fn select_hospital(&self, scope: &ViewScope, hospital_id: String) -> Result<()> {
        let mut session = self.session().await?;
        let directory = Arc::clone(&self.directory);
        let lookup = session.clone();
        let id = hospital_id.clone();
        let hospital = in_view(scope, "hospital", async move {
            directory.get_hospital(&lookup, &id).await
        })
        .await?
        .map_err(AppError::from)?;

        self.sessions
            .select_hospital(&mut session, &hospital.hospital_id, &hospital.name)
            .await
            .map_err(AppError::from)?;
        println!("Selected {}", hospital.name);
        Ok(())
    }

    async fn departments(&self, scope: &ViewScope) -> Result<()> {
        let session = self.session().await?;
        let directory = Arc::clone(&self.directory);
        let departments = in_view(scope, "departments", async move {
            directory.list_departments(&session).await
        })
        .await?
        .map_err(AppError::from)?;

        if departments.is_empty() {
            println!("No departments found");
        }
        for department in departments {
            println!("{}", department);
        }
        Ok(())
    }

    async fn doctors(&self, scope: &ViewScope, department: String, search: Option<String>) -> Result<()> {
        let session = self.session().await?;
        let directory = Arc::clone(&self.directory);
        let doctors = in_view(scope, "doctors", async move {
            directory.list_doctors(&session, &department).await
        })
        .await?
        .map_err(AppError::from)?;

        let shown = match search.as_deref() {
            Some(query) => search_doctors(&doctors, query),
            None => doctors.iter().collect(),
        };
        if shown.is_empty() {
            println!("No doctors found");
        }
        for doctor in shown {
            println!("{:<26} {}", doctor.id, doctor.name);
        }
        Ok(())
    }

    async fn available_slots(
        &self,
        scope: &ViewScope,
        session: &Session,
        doctor_id: &str,
        date: NaiveDate,
    ) -> Result<SlotFetch> {
        let slots = Arc::clone(&self.slots);
        let session = session.clone();
        let doctor_id = doctor_id.to_string();
        let now = self.config.clinic_now();
        in_view(scope, "slots", async move {
            slots.available_slots(&session, &doctor_id, date, now).await
        })
        .await
    }

    async fn list_appointments(&self, scope: &ViewScope, past: bool) -> Result<()> {
        let session = self.session().await?;
        let now = self.config.clinic_now();
        let appointments = Arc::clone(&self.appointments);
        let lookup = session.clone();

        let classification = if past {
            let history = in_view(scope, "past-appointments", async move {
                appointments.fetch_past_appointments(&lookup).await
            })
            .await?
            .map_err(AppError::from)?;
            let mut cache = AppointmentCache::new();
            cache.replace_past(history);
            cache.classify_past(session.hospital_id(), now)
        } else {
            in_view(scope, "appointments", async move {
                appointments.load_classified(&lookup, now).await
            })
            .await?
            .map_err(AppError::from)?
        };

        if classification.skipped > 0 {
            warn!("{} appointments could not be read", classification.skipped);
        }

        let past_count = classification.past.len();
        let shown = if past {
            // Anything the backend calls past but that is still ahead stays listed.
            let mut all = classification.past;
            all.extend(classification.upcoming);
            all
        } else {
            classification.upcoming
        };

        if shown.is_empty() {
            println!("No appointments found");
        }
        for appointment in &shown {
            print_appointment(appointment);
        }
        if !past && past_count > 0 {
            println!("({} past appointments, see --past)", past_count);
        }
        Ok(())
    }

    async fn book(&self, scope: &ViewScope, args: BookArgs) -> Result<()> {
        let session = self.session().await?;
        if session.hospital_id().is_none() {
            bail!("Select a hospital first with `hospital select-hospital <id>`");
        }

        let date = parse_date(&args.date).map_err(AppError::from)?;
        let start = parse_time_of_day(&args.start).map_err(AppError::from)?;
        let end = args
            .end
            .as_deref()
            .map(parse_time_of_day)
            .transpose()
            .map_err(AppError::from)?;
        let session_type = SessionType::from_str(&args.session_type).map_err(AppError::from)?;
        let appointment_type = AppointmentType::from_str(&args.appointment_type).map_err(AppError::from)?;

        let fetch = self.available_slots(scope, &session, &args.doctor_id, date).await?;
        if let Some(notice) = &fetch.notice {
            return Err(notice.clone().into());
        }
        let slot = match fetch.find(start, end) {
            Some(slot) => slot,
            None => {
                println!("That slot is not available.");
                print_slots(&fetch);
                bail!("Choose one of the listed slots");
            }
        };

        let doctor_name = self.doctor_name(scope, &session, &args.doctor_id).await;
        let request = BookAppointmentRequest {
            doctor_id: args.doctor_id.clone(),
            doctor_name,
            date,
            slot,
            session_type,
            appointment_type,
            reason: args.reason,
        };

        let booking = Arc::clone(&self.booking);
        let submit_session = session.clone();
        let outcome = in_view(scope, "book", async move {
            booking.book_appointment(&submit_session, &request).await
        })
        .await?;

        self.report_outcome(scope, &session, &args.doctor_id, date, outcome).await
    }

    async fn doctor_name(&self, scope: &ViewScope, session: &Session, doctor_id: &str) -> String {
        let Some(hospital_id) = session.hospital_id().map(str::to_string) else {
            return doctor_id.to_string();
        };
        let directory = Arc::clone(&self.directory);
        let lookup = session.clone();
        let result = in_view(scope, "hospital-doctors", async move {
            directory.list_hospital_doctors(&lookup, &hospital_id).await
        })
        .await;

        match result {
            Ok(Ok(doctors)) => find_doctor(&doctors, doctor_id)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| doctor_id.to_string()),
            Ok(Err(e)) => {
                debug!("Doctor lookup failed, using id as name: {}", e);
                doctor_id.to_string()
            }
            Err(e) => {
                debug!("{}", e);
                doctor_id.to_string()
            }
        }
    }

    async fn load_cache(&self, scope: &ViewScope, session: &Session) -> Result<AppointmentCache> {
        let appointments = Arc::clone(&self.appointments);
        let lookup = session.clone();
        let records = in_view(scope, "appointments", async move {
            appointments.fetch_appointments(&lookup).await
        })
        .await?
        .map_err(AppError::from)?;

        let mut cache = AppointmentCache::new();
        cache.replace_all(records);
        Ok(cache)
    }

    async fn reschedule(&self, scope: &ViewScope, appointment_id: String, start: String) -> Result<()> {
        let session = self.session().await?;
        let start = parse_time_of_day(&start).map_err(AppError::from)?;
        let mut cache = self.load_cache(scope, &session).await?;
        let appointment = find_appointment(&cache, &appointment_id)?;

        let doctor_id = appointment
            .doctor_id
            .clone()
            .ok_or_else(|| anyhow!("Appointment {} has no doctor", appointment_id))?;
        let date = appointment.parsed_date().map_err(AppError::from)?;

        let fetch = self.available_slots(scope, &session, &doctor_id, date).await?;
        if let Some(notice) = &fetch.notice {
            return Err(notice.clone().into());
        }
        let slot = match fetch.find(start, None) {
            Some(slot) => slot,
            None => {
                println!("That slot is not available.");
                print_slots(&fetch);
                bail!("Choose one of the listed slots");
            }
        };

        let booking = Arc::clone(&self.booking);
        let submit_session = session.clone();
        let outcome = in_view(scope, "reschedule", async move {
            booking
                .reschedule_appointment(&submit_session, &appointment, slot)
                .await
        })
        .await?;

        cache.apply(&outcome);
        self.report_outcome(scope, &session, &doctor_id, date, outcome).await
    }

    async fn cancel(&self, scope: &ViewScope, appointment_id: String) -> Result<()> {
        let session = self.session().await?;
        let mut cache = self.load_cache(scope, &session).await?;
        let appointment = find_appointment(&cache, &appointment_id)?;

        let booking = Arc::clone(&self.booking);
        let submit_session = session.clone();
        let outcome = in_view(scope, "cancel", async move {
            booking.cancel_appointment(&submit_session, &appointment).await
        })
        .await?;

        cache.apply(&outcome);
        match outcome {
            BookingOutcome::Confirmed(appointment) => {
                println!("Cancelled");
                print_appointment(&appointment);
                Ok(())
            }
            BookingOutcome::Conflict { message } => Err(AppError::Conflict(message).into()),
            BookingOutcome::Failed(e) => Err(e.into()),
        }
    }

    /// Prints the result of a book or reschedule. On conflict the slot list is
    /// refreshed so the patient can pick again.
    async fn report_outcome(
        &self,
        scope: &ViewScope,
        session: &Session,
        doctor_id: &str,
        date: NaiveDate,
        outcome: BookingOutcome,
    ) -> Result<()> {
        match outcome {
            BookingOutcome::Confirmed(appointment) => {
                println!("{}", outcome_message(&appointment));
                print_appointment(&appointment);
                Ok(())
            }
            BookingOutcome::Conflict { message } => {
                debug!("Conflict from backend: {}", message);
                println!("{}", AppError::Conflict(message).user_message());
                let fetch = self.available_slots(scope, session, doctor_id, date).await?;
                println!("Still available:");
                print_slots(&fetch);
                Err(anyhow!("Slot was taken before the request arrived"))
            }
            BookingOutcome::Failed(e) => Err(e.into()),
        }
    }
}

struct BookArgs {
    doctor_id: String,
    date: String,
    start: String,
    end: Option<String>,
    session_type: String,
    appointment_type: String,
    reason: String,
}

fn find_appointment(cache: &AppointmentCache, appointment_id: &str) -> Result<Appointment> {
    cache
        .get(appointment_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", appointment_id)).into())
}

fn outcome_message(appointment: &Appointment) -> &'static str {
    if appointment.is_cancelled() {
        "Appointment cancelled"
    } else {
        "Appointment confirmed"
    }
}

fn print_slots(fetch: &SlotFetch) {
    if let Some(notice) = &fetch.notice {
        eprintln!("{}", notice.user_message());
    }
    if fetch.is_empty() {
        println!("{}", NO_SLOTS_MESSAGE);
        return;
    }
    for slot in &fetch.slots {
        println!("  {}", slot);
    }
}

fn print_appointment(appointment: &Appointment) {
    let status = if appointment.is_cancelled() {
        " [cancelled]".to_string()
    } else {
        String::new()
    };
    println!(
        "{:<26} {} {:<13} {:<20} {}{}",
        appointment.appointment_id,
        appointment.date,
        appointment.time,
        appointment.doctor_name,
        appointment.session_type,
        status
    );
}

fn prompt(label: &str) -> Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", label)?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
