//! `slots` CLI — query availability and validate or create bookings against a
//! practice file.
//!
//! ## Usage
//!
//! ```sh
//! # Free intervals for the week containing 2026-03-16
//! slots availability -d practice.json --practitioner dr-ng --location main --week 2026-03-16
//!
//! # Two practitioners who must attend together
//! slots availability -d practice.json --practitioner dr-ng --practitioner dr-osei --mode virtual
//!
//! # Bookable slots for a date range
//! slots open-slots -d practice.json --service physio --from 2026-03-16 --to 2026-03-20 \
//!     --now 2026-03-15T12:00:00Z
//!
//! # Is a specific local start time still free? (exit code 2 on conflict)
//! slots check -d practice.json --practitioner dr-ng --start "2026-03-16 10:00"
//!
//! # Create the booking and save it back to the file
//! slots book -d practice.json --practitioner dr-ng --start "2026-03-16 11:00" \
//!     --now 2026-03-15T12:00:00Z --write
//! ```
//!
//! Logs go to stderr and are controlled with `RUST_LOG`; stdout is always JSON.

use std::io::{self, Read};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use slot_engine::model::{
    BookingStatus, CandidateSlot, LocationId, Mode, PractitionerId, ServiceId, TenantId,
};
use slot_engine::time::{day_of_week, parse_date, parse_instant, to_local, to_utc};
use slot_engine::{
    AvailabilityQuery, Booker, BookingRequest, EngineError, InMemoryStore, PracticeData,
    TenantContext,
};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit code for "the requested slot is taken".
const EXIT_CONFLICT: i32 = 2;

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Practitioner availability and booking conflict checks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Practice file (JSON). Reads from stdin if omitted.
    #[arg(short, long, global = true)]
    data: Option<String>,

    /// Tenant id; defaults to the file's `tenant_id`.
    #[arg(long, global = true)]
    tenant: Option<String>,

    /// Override the practice timezone from the file's settings.
    #[arg(long, global = true)]
    timezone: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Free intervals per weekday for one week
    Availability {
        #[command(flatten)]
        who: Selection,
        /// Any date in the target week (YYYY-MM-DD)
        #[arg(long)]
        week: String,
    },
    /// Bookable session-length slots over a date range
    OpenSlots {
        #[command(flatten)]
        who: Selection,
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Last date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: String,
        /// Current instant (RFC 3339); anchors advance-notice rules
        #[arg(long)]
        now: String,
    },
    /// Check whether a candidate start time is free
    Check {
        #[command(flatten)]
        who: Selection,
        /// Local start time in the practice timezone
        #[arg(long)]
        start: String,
        /// Session length in minutes (defaults to the practice setting)
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Validate and create a booking
    Book {
        #[command(flatten)]
        who: Selection,
        /// Local start time in the practice timezone
        #[arg(long)]
        start: String,
        #[arg(long)]
        duration: Option<u32>,
        /// Current instant (RFC 3339)
        #[arg(long)]
        now: String,
        #[arg(long, value_enum, default_value_t = StatusArg::Pending)]
        status: StatusArg,
        /// Save the new booking back to the practice file
        #[arg(long, requires = "data")]
        write: bool,
    },
    /// Show an instant in UTC and practice-local time
    Convert {
        /// RFC 3339 instant
        #[arg(long, conflicts_with = "local")]
        instant: Option<String>,
        /// Local datetime in the practice timezone
        #[arg(long)]
        local: Option<String>,
    },
}

/// Who is being booked, where, and how.
#[derive(Args)]
struct Selection {
    /// Practitioner id (repeat for practitioners who must attend together)
    #[arg(short, long = "practitioner")]
    practitioners: Vec<String>,
    /// Service id, used when no practitioner is given
    #[arg(long)]
    service: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long, value_enum, default_value_t = ModeArg::InPerson)]
    mode: ModeArg,
}

impl Selection {
    fn query(&self) -> AvailabilityQuery {
        AvailabilityQuery {
            practitioner_ids: self
                .practitioners
                .iter()
                .map(|p| PractitionerId::new(p.as_str()))
                .collect(),
            service_id: self.service.as_deref().map(ServiceId::from),
            location_id: self.location.as_deref().map(LocationId::from),
            mode: self.mode.into(),
        }
    }

    fn request(&self, start: &str, duration: Option<u32>, status: BookingStatus) -> BookingRequest {
        let query = self.query();
        BookingRequest {
            practitioner_ids: query.practitioner_ids,
            service_id: query.service_id,
            location_id: query.location_id,
            start: start.to_string(),
            duration_minutes: duration,
            status,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    InPerson,
    Virtual,
    Hybrid,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::InPerson => Mode::InPerson,
            ModeArg::Virtual => Mode::Virtual,
            ModeArg::Hybrid => Mode::Hybrid,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Pending,
    Confirmed,
    Requested,
}

impl From<StatusArg> for BookingStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => BookingStatus::Pending,
            StatusArg::Confirmed => BookingStatus::Confirmed,
            StatusArg::Requested => BookingStatus::Requested,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("slot_engine=warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let raw = read_input(cli.data.as_deref())?;
    let mut data = PracticeData::from_json(&raw).context("Failed to parse practice file")?;
    if let Some(tz) = &cli.timezone {
        data.settings.timezone = tz.clone();
    }
    let tenant = cli
        .tenant
        .clone()
        .or_else(|| data.tenant_id.as_ref().map(|t| t.to_string()))
        .unwrap_or_else(|| "default".to_string());
    let tenant = TenantId::new(tenant);
    let ctx = TenantContext::new(tenant.clone(), data.settings.clone())
        .context("Invalid practice settings")?;
    debug!(tenant = %tenant, timezone = %ctx.timezone, "loaded practice file");

    let store = Arc::new(InMemoryStore::new(tenant, data));
    let booker = Booker::new(Arc::clone(&store));
    let service = booker.service();

    match cli.command {
        Commands::Availability { who, week } => {
            let week_of = parse_date(&week).context("Invalid --week")?;
            let availability = service.get_availability(&ctx, &who.query(), week_of)?;
            print_json(&json!({
                "week_of": slot_engine::time::week_start(week_of),
                "timezone": ctx.timezone.name(),
                "availability": availability,
            }))?;
        }
        Commands::OpenSlots { who, from, to, now } => {
            let from: NaiveDate = parse_date(&from).context("Invalid --from")?;
            let to: NaiveDate = parse_date(&to).context("Invalid --to")?;
            let now: DateTime<Utc> = parse_instant(&now).context("Invalid --now")?;
            let slots = service.open_slots(&ctx, &who.query(), from, to, now)?;
            print_json(&json!({ "slots": slots }))?;
        }
        Commands::Check { who, start, duration } => {
            let request = who.request(&start, duration, BookingStatus::Pending);
            let candidate: CandidateSlot = booker.candidate(&ctx, &request)?;
            match service.validate_candidate(&ctx, &candidate) {
                Ok(()) => print_json(&json!({ "available": true, "candidate": candidate }))?,
                Err(EngineError::SlotConflict { booking_ids }) => {
                    print_json(&json!({
                        "available": false,
                        "candidate": candidate,
                        "conflicting_booking_ids": booking_ids,
                    }))?;
                    process::exit(EXIT_CONFLICT);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Book {
            who,
            start,
            duration,
            now,
            status,
            write,
        } => {
            let now = parse_instant(&now).context("Invalid --now")?;
            let request = who.request(&start, duration, status.into());
            let booking = match booker.book(&ctx, &request, now) {
                Ok(booking) => booking,
                Err(EngineError::SlotConflict { booking_ids }) => {
                    print_json(&json!({
                        "booked": false,
                        "conflicting_booking_ids": booking_ids,
                    }))?;
                    process::exit(EXIT_CONFLICT);
                }
                Err(err) => return Err(err.into()),
            };

            if write {
                // `requires = "data"` guarantees a path here.
                if let Some(path) = cli.data.as_deref() {
                    let updated = store.snapshot()?.to_json_pretty()?;
                    std::fs::write(path, updated)
                        .with_context(|| format!("Failed to write file: {}", path))?;
                }
            }
            print_json(&json!({ "booked": true, "booking": booking }))?;
        }
        Commands::Convert { instant, local } => {
            let utc = match (instant, local) {
                (Some(instant), _) => parse_instant(&instant)?,
                (None, Some(local)) => to_utc(&local, ctx.timezone)?,
                (None, None) => anyhow::bail!("Provide --instant or --local"),
            };
            print_json(&json!({
                "utc": utc,
                "local": to_local(utc, ctx.timezone),
                "timezone": ctx.timezone.name(),
                "day_of_week": day_of_week(utc, ctx.timezone),
            }))?;
        }
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}
