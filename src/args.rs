//! These structs provide the CLI interface for the pact CLI.

use crate::model::{Amount, ExpenseId, MemberId, SplitMethod, TripId, DEFAULT_SYMBOL};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// pact: plan group trips and settle up afterwards.
///
/// Create a trip, invite your friends, pledge the agreed amount into the trip wallet and log
/// expenses as you go. At the end, `pact settle` tells everyone who pays whom, using as few
/// transfers as it reasonably can.
///
/// Most commands act on behalf of a member. Pass your identity with --member or set PACT_MEMBER.
///
/// There is also a mode in which an AI agent can use this program through the mcp subcommand.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the configuration file and the trip database.
    ///
    /// This is the first command you should run. By default the data directory is $HOME/pact,
    /// pass --pact-home to put it somewhere else.
    Init(InitArgs),
    /// Create, list, show and join trips.
    Trip(TripArgs),
    /// Manage your member profile.
    Profile(ProfileArgs),
    /// Pledge the trip's pact amount into the trip wallet. Only members who have pledged share in
    /// the trip's costs.
    Pledge(TripRef),
    /// Add to, list or generate suggestions for a trip's itinerary.
    Itinerary(ItineraryArgs),
    /// Log, list and delete expenses.
    Expense(ExpenseArgs),
    /// Declare category budgets and see how much of each has been spent.
    Budget(BudgetArgs),
    /// Show each member's balance and the transfers that settle the trip.
    Settle(TripRef),
    /// Find money-saving deals for a destination.
    Deals(DealsArgs),
    /// Run as an MCP server over stdio so that an AI agent can use pact.
    Mcp(McpArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where pact data and configuration is held. Defaults to ~/pact
    #[arg(long, env = "PACT_HOME", default_value_t = default_pact_home())]
    pact_home: DisplayPath,

    /// Who you are. Commands that change a trip act on behalf of this member.
    #[arg(long, env = "PACT_MEMBER")]
    member: Option<MemberId>,
}

impl Common {
    pub fn new(log_level: LevelFilter, pact_home: PathBuf, member: Option<MemberId>) -> Self {
        Self {
            log_level,
            pact_home: pact_home.into(),
            member,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn pact_home(&self) -> &DisplayPath {
        &self.pact_home
    }

    pub fn member(&self) -> Option<&MemberId> {
        self.member.as_ref()
    }
}

/// Args for the `pact init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The symbol amounts are displayed with.
    #[arg(long, default_value_t = DEFAULT_SYMBOL)]
    currency_symbol: char,

    /// The URL scheme of the payment links shown by `pact settle`.
    #[arg(long, default_value = "upi")]
    payment_scheme: String,
}

impl InitArgs {
    pub fn new(currency_symbol: char, payment_scheme: impl Into<String>) -> Self {
        Self {
            currency_symbol,
            payment_scheme: payment_scheme.into(),
        }
    }

    pub fn currency_symbol(&self) -> char {
        self.currency_symbol
    }

    pub fn payment_scheme(&self) -> &str {
        &self.payment_scheme
    }
}

/// Identifies the trip a command acts on.
#[derive(Debug, Parser, Clone)]
pub struct TripRef {
    /// The trip ID, e.g. trip-3f2a...
    #[arg(long)]
    trip: TripId,
}

impl TripRef {
    pub fn new(trip: impl Into<TripId>) -> Self {
        Self { trip: trip.into() }
    }

    pub fn trip(&self) -> &TripId {
        &self.trip
    }
}

/// Args for the `pact trip` command.
#[derive(Debug, Parser, Clone)]
pub struct TripArgs {
    #[command(subcommand)]
    subcommand: TripSubcommand,
}

impl TripArgs {
    pub fn new(subcommand: TripSubcommand) -> Self {
        Self { subcommand }
    }

    pub fn subcommand(&self) -> &TripSubcommand {
        &self.subcommand
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum TripSubcommand {
    /// Create a trip. You become its first member.
    Create(CreateTripArgs),
    /// List your trips, or every trip with --all.
    List(ListTripsArgs),
    /// Show a trip with its members, pledges, itinerary and spending.
    Show(TripRef),
    /// Join a trip you were invited to.
    Join(TripRef),
}

/// Args for the `pact trip create` command.
#[derive(Debug, Parser, Clone)]
pub struct CreateTripArgs {
    /// The trip's name, e.g. "Goa Monsoon 2024".
    #[arg(long)]
    title: String,

    /// Where the trip goes.
    #[arg(long, default_value = "")]
    destination: String,

    /// The amount each member pledges into the trip wallet.
    #[arg(long, default_value = "0")]
    pact_amount: Amount,
}

impl CreateTripArgs {
    pub fn new(title: impl Into<String>, destination: impl Into<String>, pact_amount: Amount) -> Self {
        Self {
            title: title.into(),
            destination: destination.into(),
            pact_amount,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn pact_amount(&self) -> Amount {
        self.pact_amount
    }
}

/// Args for the `pact trip list` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct ListTripsArgs {
    /// List every trip in the database, not only yours.
    #[arg(long)]
    all: bool,
}

impl ListTripsArgs {
    pub fn new(all: bool) -> Self {
        Self { all }
    }

    pub fn all(&self) -> bool {
        self.all
    }
}

/// Args for the `pact profile` command.
#[derive(Debug, Parser, Clone)]
pub struct ProfileArgs {
    #[command(subcommand)]
    subcommand: ProfileSubcommand,
}

impl ProfileArgs {
    pub fn new(subcommand: ProfileSubcommand) -> Self {
        Self { subcommand }
    }

    pub fn subcommand(&self) -> &ProfileSubcommand {
        &self.subcommand
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileSubcommand {
    /// Set the email shown to other members and where you want to be paid.
    Set(SetProfileArgs),
}

/// Args for the `pact profile set` command.
#[derive(Debug, Parser, Clone)]
pub struct SetProfileArgs {
    #[arg(long)]
    email: String,

    /// Where you receive payments, e.g. a UPI address like name@okbank.
    #[arg(long)]
    payout_address: Option<String>,
}

impl SetProfileArgs {
    pub fn new(email: impl Into<String>, payout_address: Option<String>) -> Self {
        Self {
            email: email.into(),
            payout_address,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn payout_address(&self) -> Option<&str> {
        self.payout_address.as_deref()
    }
}

/// Args for the `pact itinerary` command.
#[derive(Debug, Parser, Clone)]
pub struct ItineraryArgs {
    #[command(subcommand)]
    subcommand: ItinerarySubcommand,
}

impl ItineraryArgs {
    pub fn new(subcommand: ItinerarySubcommand) -> Self {
        Self { subcommand }
    }

    pub fn subcommand(&self) -> &ItinerarySubcommand {
        &self.subcommand
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ItinerarySubcommand {
    /// Add an entry to the itinerary.
    Add(AddItineraryArgs),
    /// List the itinerary, oldest entry first.
    List(TripRef),
    /// Ask the text generator for an itinerary.
    Suggest(SuggestItineraryArgs),
}

/// Args for the `pact itinerary add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddItineraryArgs {
    #[arg(long)]
    trip: TripId,

    /// e.g. "Visit Baga Beach".
    #[arg(long)]
    title: String,
}

impl AddItineraryArgs {
    pub fn new(trip: impl Into<TripId>, title: impl Into<String>) -> Self {
        Self {
            trip: trip.into(),
            title: title.into(),
        }
    }

    pub fn trip(&self) -> &TripId {
        &self.trip
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// Args for the `pact itinerary suggest` command.
#[derive(Debug, Parser, Clone)]
pub struct SuggestItineraryArgs {
    #[arg(long)]
    trip: TripId,

    /// How many days the itinerary should cover.
    #[arg(long, default_value_t = 3)]
    days: u32,

    /// Add the suggestions to the trip's itinerary instead of only showing them.
    #[arg(long)]
    add: bool,
}

impl SuggestItineraryArgs {
    pub fn new(trip: impl Into<TripId>, days: u32, add: bool) -> Self {
        Self {
            trip: trip.into(),
            days,
            add,
        }
    }

    pub fn trip(&self) -> &TripId {
        &self.trip
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn add(&self) -> bool {
        self.add
    }
}

/// Args for the `pact expense` command.
#[derive(Debug, Parser, Clone)]
pub struct ExpenseArgs {
    #[command(subcommand)]
    subcommand: ExpenseSubcommand,
}

impl ExpenseArgs {
    pub fn new(subcommand: ExpenseSubcommand) -> Self {
        Self { subcommand }
    }

    pub fn subcommand(&self) -> &ExpenseSubcommand {
        &self.subcommand
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ExpenseSubcommand {
    /// Log an expense that you paid for.
    Add(AddExpenseArgs),
    /// List a trip's expenses, newest first, with the running total.
    List(TripRef),
    /// Delete an expense. Only its payer or the trip's creator may do this.
    Delete(DeleteExpenseArgs),
}

/// Args for the `pact expense add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddExpenseArgs {
    #[arg(long)]
    trip: TripId,

    /// The amount paid, e.g. 1200 or "₹1,200.50".
    #[arg(long)]
    amount: Amount,

    #[arg(long, default_value = "")]
    description: String,

    /// A free-form label used for budget tracking, e.g. Food.
    #[arg(long, default_value = "")]
    category: String,

    /// split-equally: a shared cost. you-are-owed: the others owe you, but it is not shared.
    #[arg(long, value_enum, default_value_t = SplitMethod::SplitEqually)]
    split: SplitMethod,

    /// A link to a photo of the receipt.
    #[arg(long)]
    receipt_url: Option<String>,
}

impl AddExpenseArgs {
    pub fn new(trip: impl Into<TripId>, amount: Amount, split: SplitMethod) -> Self {
        Self {
            trip: trip.into(),
            amount,
            description: String::new(),
            category: String::new(),
            split,
            receipt_url: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_receipt_url(mut self, receipt_url: impl Into<String>) -> Self {
        self.receipt_url = Some(receipt_url.into());
        self
    }

    pub fn trip(&self) -> &TripId {
        &self.trip
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn split(&self) -> SplitMethod {
        self.split
    }

    pub fn receipt_url(&self) -> Option<&str> {
        self.receipt_url.as_deref()
    }
}

/// Args for the `pact expense delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteExpenseArgs {
    /// The expense ID, e.g. exp-9c1d...
    #[arg(long)]
    id: ExpenseId,
}

impl DeleteExpenseArgs {
    pub fn new(id: impl Into<ExpenseId>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &ExpenseId {
        &self.id
    }
}

/// Args for the `pact budget` command.
#[derive(Debug, Parser, Clone)]
pub struct BudgetArgs {
    #[command(subcommand)]
    subcommand: BudgetSubcommand,
}

impl BudgetArgs {
    pub fn new(subcommand: BudgetSubcommand) -> Self {
        Self { subcommand }
    }

    pub fn subcommand(&self) -> &BudgetSubcommand {
        &self.subcommand
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum BudgetSubcommand {
    /// Declare or change the budget of a category.
    Set(SetBudgetArgs),
    /// Show spending against each declared budget.
    Report(TripRef),
}

/// Args for the `pact budget set` command.
#[derive(Debug, Parser, Clone)]
pub struct SetBudgetArgs {
    #[arg(long)]
    trip: TripId,

    #[arg(long)]
    category: String,

    #[arg(long)]
    amount: Amount,
}

impl SetBudgetArgs {
    pub fn new(trip: impl Into<TripId>, category: impl Into<String>, amount: Amount) -> Self {
        Self {
            trip: trip.into(),
            category: category.into(),
            amount,
        }
    }

    pub fn trip(&self) -> &TripId {
        &self.trip
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}

/// Args for the `pact deals` command.
#[derive(Debug, Parser, Clone)]
pub struct DealsArgs {
    /// Where you are going, e.g. Goa.
    destination: String,
}

impl DealsArgs {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

/// Args for the `pact mcp` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct McpArgs {}

fn default_pact_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("pact"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --pact-home or PACT_HOME instead of relying on the default \
                pact home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("pact")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        <Args as CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_parse_expense_add() {
        let args = Args::try_parse_from([
            "pact",
            "--member",
            "asha",
            "--pact-home",
            "/tmp/pact",
            "expense",
            "add",
            "--trip",
            "trip-1",
            "--amount",
            "₹1,200",
            "--split",
            "you-are-owed",
            "--category",
            "Food",
        ])
        .unwrap();
        assert_eq!(args.common().member(), Some(&MemberId::from("asha")));
        assert_eq!(args.common().pact_home().path(), Path::new("/tmp/pact"));
        let Command::Expense(expense) = args.command() else {
            panic!("expected the expense command");
        };
        let ExpenseSubcommand::Add(add) = expense.subcommand() else {
            panic!("expected expense add");
        };
        assert_eq!(add.trip().as_str(), "trip-1");
        assert_eq!(add.amount().value(), rust_decimal::Decimal::from(1200));
        assert_eq!(add.split(), SplitMethod::YouAreOwed);
        assert_eq!(add.category(), "Food");
        assert_eq!(add.description(), "");
    }

    #[test]
    fn test_parse_rejects_bad_amount() {
        let result = Args::try_parse_from([
            "pact", "budget", "set", "--trip", "t", "--category", "Food", "--amount", "lots",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_settle() {
        let args = Args::try_parse_from(["pact", "settle", "--trip", "trip-9"]).unwrap();
        let Command::Settle(trip) = args.command() else {
            panic!("expected settle");
        };
        assert_eq!(trip.trip().as_str(), "trip-9");
    }
}
