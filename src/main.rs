use clap::Parser;
use std::process::ExitCode;
use trip_pact::args::{
    Args, BudgetSubcommand, Command, ExpenseSubcommand, ItinerarySubcommand, ProfileSubcommand,
    TripSubcommand,
};
use trip_pact::{commands, Config, Mode, Result};
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().pact_home().path();
    let member = args.common().member();

    // When TRIP_PACT_IN_TEST_MODE is set and non-empty, suggestions come from canned data instead
    // of the text-generation service.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(
            home,
            init_args.currency_symbol(),
            init_args.payment_scheme(),
        )
        .await?
        .print(),

        Command::Trip(trip_args) => {
            let config = Config::load(home).await?;
            match trip_args.subcommand() {
                TripSubcommand::Create(args) => commands::create_trip(config, member, args.clone())
                    .await?
                    .print(),
                TripSubcommand::List(args) => commands::list_trips(config, member, args.all())
                    .await?
                    .print(),
                TripSubcommand::Show(args) => commands::show_trip(config, args.trip())
                    .await?
                    .print(),
                TripSubcommand::Join(args) => commands::join_trip(config, member, args.trip())
                    .await?
                    .print(),
            }
        }

        Command::Profile(profile_args) => {
            let config = Config::load(home).await?;
            match profile_args.subcommand() {
                ProfileSubcommand::Set(args) => commands::set_profile(config, member, args.clone())
                    .await?
                    .print(),
            }
        }

        Command::Pledge(args) => commands::pledge(Config::load(home).await?, member, args.trip())
            .await?
            .print(),

        Command::Itinerary(itinerary_args) => {
            let config = Config::load(home).await?;
            match itinerary_args.subcommand() {
                ItinerarySubcommand::Add(args) => {
                    commands::add_itinerary_item(config, member, args.clone())
                        .await?
                        .print()
                }
                ItinerarySubcommand::List(args) => commands::list_itinerary(config, args.trip())
                    .await?
                    .print(),
                ItinerarySubcommand::Suggest(args) => {
                    commands::suggest_itinerary(config, mode, member, args.clone())
                        .await?
                        .print()
                }
            }
        }

        Command::Expense(expense_args) => {
            let config = Config::load(home).await?;
            match expense_args.subcommand() {
                ExpenseSubcommand::Add(args) => commands::add_expense(config, member, args.clone())
                    .await?
                    .print(),
                ExpenseSubcommand::List(args) => commands::list_expenses(config, args.trip())
                    .await?
                    .print(),
                ExpenseSubcommand::Delete(args) => {
                    commands::delete_expense(config, member, args.id())
                        .await?
                        .print()
                }
            }
        }

        Command::Budget(budget_args) => {
            let config = Config::load(home).await?;
            match budget_args.subcommand() {
                BudgetSubcommand::Set(args) => commands::set_budget(config, member, args.clone())
                    .await?
                    .print(),
                BudgetSubcommand::Report(args) => commands::budget_report(config, args.trip())
                    .await?
                    .print(),
            }
        }

        Command::Settle(args) => commands::settle(Config::load(home).await?, args.trip())
            .await?
            .print(),

        Command::Deals(args) => {
            commands::deals(Config::load(home).await?, mode, args.destination())
                .await?
                .print()
        }

        Command::Mcp(_mcp_args) => commands::mcp(Config::load(home).await?, mode)
            .await?
            .print(),
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        // Without RUST_LOG, only the library and this binary log at `level`.
        None => EnvFilter::new(format!(
            "trip_pact={level},{}={level}",
            env!("CARGO_CRATE_NAME"),
        )),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
