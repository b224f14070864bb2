use bson::oid::ObjectId;
use chrono::Weekday;
use clap::{Parser, Subcommand, ValueEnum};
use env::Env;
use eyre::{bail, Context};
use ledger::{service::schedule::WeeklyScheduleRequest, Ledger, LedgerConfig};
use log::info;
use model::{
    day::parse_date,
    exception::ExceptionKind,
    interval::Interval,
    reservation::ReservationStatus,
    schedule::WEEK,
};
use serde::Serialize;
use storage::Storage;

#[derive(Parser)]
#[command(
    name = "booking-cli",
    about = "Availability and reservations for pet-service businesses"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database name override
    #[arg(long, global = true)]
    db: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Register a business in an IANA timezone
    RegisterBusiness {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "UTC")]
        timezone: String,
    },
    SetTimezone {
        #[arg(long)]
        business: ObjectId,
        #[arg(long)]
        timezone: String,
    },
    AddService {
        #[arg(long)]
        business: ObjectId,
        #[arg(long)]
        name: String,
        /// Minutes
        #[arg(long)]
        duration: u32,
    },
    Services {
        #[arg(long)]
        business: ObjectId,
    },
    /// Replace the weekly schedule
    SetSchedule {
        #[arg(long)]
        business: ObjectId,
        /// Open days, e.g. mon,tue,wed
        #[arg(long, value_delimiter = ',')]
        days: Vec<Weekday>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        break_start: Option<String>,
        #[arg(long)]
        break_end: Option<String>,
    },
    Schedule {
        #[arg(long)]
        business: ObjectId,
    },
    /// Override the weekly schedule for one date
    AddException {
        #[arg(long)]
        business: ObjectId,
        #[arg(long)]
        date: String,
        #[arg(long, value_enum)]
        kind: ExceptionArg,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        break_start: Option<String>,
        #[arg(long)]
        break_end: Option<String>,
        #[arg(long)]
        reason: Option<String>,
    },
    RemoveException {
        #[arg(long)]
        id: ObjectId,
    },
    Exceptions {
        #[arg(long)]
        business: ObjectId,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Bookable start times for a date
    Slots {
        #[arg(long)]
        business: ObjectId,
        #[arg(long)]
        date: String,
        /// Minutes between slot starts
        #[arg(long)]
        granularity: Option<u32>,
    },
    Book {
        #[arg(long)]
        business: ObjectId,
        #[arg(long)]
        service: ObjectId,
        #[arg(long)]
        pet: ObjectId,
        #[arg(long)]
        user: ObjectId,
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: String,
    },
    Reservation {
        #[arg(long)]
        id: ObjectId,
    },
    SetStatus {
        #[arg(long)]
        id: ObjectId,
        /// CONFIRMED, REJECTED, CANCELED or COMPLETED
        #[arg(long)]
        status: ReservationStatus,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExceptionArg {
    Closed,
    Hours,
    Notice,
}

fn print<T: Serialize>(value: &T) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn selections(days: &[Weekday]) -> [bool; 7] {
    let mut selections = [false; 7];
    for (selected, weekday) in selections.iter_mut().zip(WEEK) {
        *selected = days.contains(&weekday);
    }
    selections
}

fn exception_kind(
    kind: ExceptionArg,
    request: &WeeklyScheduleRequest,
) -> eyre::Result<ExceptionKind> {
    Ok(match kind {
        ExceptionArg::Closed => ExceptionKind::Closed,
        ExceptionArg::Notice => ExceptionKind::Notice,
        ExceptionArg::Hours => {
            let Some(working_hours) = request.working_hours()? else {
                bail!("--start and --end are required for substitute hours");
            };
            ExceptionKind::Hours {
                working_hours,
                break_time: request.break_time()?,
            }
        }
    })
}

async fn run(ledger: &Ledger, command: Command) -> eyre::Result<()> {
    match command {
        Command::RegisterBusiness { name, timezone } => {
            print(&ledger.businesses.register(&name, &timezone).await?)
        }
        Command::SetTimezone { business, timezone } => {
            ledger.businesses.set_timezone(business, &timezone).await?;
            print(&ledger.businesses.get(business).await?)
        }
        Command::AddService {
            business,
            name,
            duration,
        } => print(&ledger.businesses.add_service(business, &name, duration).await?),
        Command::Services { business } => print(&ledger.businesses.services(business).await?),
        Command::SetSchedule {
            business,
            days,
            start,
            end,
            break_start,
            break_end,
        } => {
            let request = WeeklyScheduleRequest {
                days: selections(&days),
                start,
                end,
                break_start,
                break_end,
            };
            print(&ledger.set_schedule(business, &request).await?)
        }
        Command::Schedule { business } => print(&ledger.get_schedule(business).await?),
        Command::AddException {
            business,
            date,
            kind,
            start,
            end,
            break_start,
            break_end,
            reason,
        } => {
            let date = parse_date(&date)?;
            let hours = WeeklyScheduleRequest {
                days: [false; 7],
                start,
                end,
                break_start,
                break_end,
            };
            let kind = exception_kind(kind, &hours)?;
            print(
                &ledger
                    .exceptions
                    .set_exception(business, date, kind, reason)
                    .await?,
            )
        }
        Command::RemoveException { id } => print(&ledger.exceptions.remove_exception(id).await?),
        Command::Exceptions { business, from, to } => {
            let (from, to) = (parse_date(&from)?, parse_date(&to)?);
            print(&ledger.exceptions.list_exceptions(business, from, to).await?)
        }
        Command::Slots {
            business,
            date,
            granularity,
        } => print(&ledger.get_slots(business, &date, granularity).await?),
        Command::Book {
            business,
            service,
            pet,
            user,
            date,
            time,
        } => print(
            &ledger
                .reservations
                .place_reservation_str(business, service, pet, user, &date, &time)
                .await?,
        ),
        Command::Reservation { id } => print(&ledger.reservations.get_reservation(id).await?),
        Command::SetStatus { id, status } => {
            print(&ledger.reservations.set_status(id, status).await?)
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let env = Env::load()?;
    pretty_env_logger::formatted_builder()
        .parse_filters(env.rust_log().unwrap_or("info"))
        .init();

    let db_name = cli.db.as_deref().unwrap_or(env.mongo_db());
    info!("connecting to mongo: {}", db_name);
    let storage = Storage::new(env.mongo_url(), db_name)
        .await
        .context("Failed to create storage")?;
    let ledger = Ledger::new(
        storage,
        LedgerConfig {
            slot_granularity_min: env.slot_granularity_min(),
        },
    )?;

    run(&ledger, cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selections_are_sunday_first() {
        assert_eq!(
            selections(&[Weekday::Mon, Weekday::Sat]),
            [false, true, false, false, false, false, true]
        );
        assert_eq!(selections(&[]), [false; 7]);
    }

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from([
            "booking-cli",
            "set-schedule",
            "--business",
            "65f0a1b2c3d4e5f6a7b8c9d0",
            "--days",
            "mon,tue,fri",
            "--start",
            "09:00",
            "--end",
            "18:00",
        ])
        .unwrap();
        match cli.command {
            Command::SetSchedule { days, start, .. } => {
                assert_eq!(days, vec![Weekday::Mon, Weekday::Tue, Weekday::Fri]);
                assert_eq!(start.as_deref(), Some("09:00"));
            }
            _ => panic!("unexpected command"),
        }

        let cli = Cli::try_parse_from([
            "booking-cli",
            "set-status",
            "--id",
            "65f0a1b2c3d4e5f6a7b8c9d0",
            "--status",
            "confirmed",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::SetStatus {
                status: ReservationStatus::Confirmed,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["booking-cli", "slots", "--business", "nope"]).is_err());
    }

    #[test]
    fn test_exception_kind() {
        let mut request = WeeklyScheduleRequest::default();
        assert!(exception_kind(ExceptionArg::Hours, &request).is_err());
        assert!(matches!(
            exception_kind(ExceptionArg::Closed, &request).unwrap(),
            ExceptionKind::Closed
        ));
        request.start = Some("10:00".to_owned());
        request.end = Some("14:00".to_owned());
        match exception_kind(ExceptionArg::Hours, &request).unwrap() {
            ExceptionKind::Hours {
                working_hours,
                break_time,
            } => {
                assert_eq!(working_hours, Interval::parse("10:00", "14:00").unwrap());
                assert_eq!(break_time, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
