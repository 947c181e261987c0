//! The pact tools exposed over MCP.

use crate::args::{AddExpenseArgs, SetBudgetArgs, SuggestItineraryArgs};
use crate::commands;
use crate::error::{ErrorType, IntoResult};
use crate::mcp::mcp_utils::tool_result;
use crate::mcp::PactServer;
use crate::model::{Amount, ExpenseId, MemberId, SplitMethod, TripId};
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use rmcp::{tool, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use std::str::FromStr;
use tracing::info;

/// Parameters for tools that only need a trip.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "TripParams")]
pub struct TripParams {
    /// The trip's ID, e.g. `trip-3f2a...`.
    pub trip_id: TripId,
}

/// Parameters for tools that act on a trip on behalf of a member.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "MemberTripParams")]
pub struct MemberTripParams {
    pub trip_id: TripId,
    /// The member on whose behalf the tool acts.
    pub member_id: MemberId,
}

/// Parameters for the list_trips tool.
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[schemars(title = "ListTripsParams")]
pub struct ListTripsParams {
    /// Only list the trips this member belongs to. Lists every trip when omitted.
    #[serde(default)]
    pub member_id: Option<MemberId>,
}

/// Parameters for the add_expense tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "AddExpenseParams")]
pub struct AddExpenseParams {
    pub trip_id: TripId,
    /// The member who paid.
    pub member_id: MemberId,
    /// The amount paid, as a decimal string such as `"1250.50"`. Must not be negative.
    pub amount: String,
    /// `split_equally` (the default) for a shared cost, or `you_are_owed` for a cost the payer is
    /// credited without it joining the shared pool.
    #[serde(default)]
    pub split_method: SplitMethod,
    #[serde(default)]
    pub description: String,
    /// A free-form label used for budget tracking, e.g. `Food`.
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub receipt_url: Option<String>,
}

/// Parameters for the delete_expense tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "DeleteExpenseParams")]
pub struct DeleteExpenseParams {
    pub expense_id: ExpenseId,
    /// Must be the expense's payer or the trip's creator.
    pub member_id: MemberId,
}

/// Parameters for the set_budget tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "SetBudgetParams")]
pub struct SetBudgetParams {
    pub trip_id: TripId,
    pub member_id: MemberId,
    /// Matched exactly against expense categories.
    pub category: String,
    /// The declared budget, as a decimal string.
    pub amount: String,
}

/// Parameters for the suggest_itinerary tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "SuggestItineraryParams")]
pub struct SuggestItineraryParams {
    pub trip_id: TripId,
    /// The length of the trip in days, from 1 to 30.
    pub days: u32,
    /// Also add the suggestions to the itinerary. Requires `member_id`.
    #[serde(default)]
    pub add: bool,
    #[serde(default)]
    pub member_id: Option<MemberId>,
}

/// Parameters for the find_deals tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "FindDealsParams")]
pub struct FindDealsParams {
    /// Where the group is going.
    pub destination: String,
}

fn parse_amount(s: &str) -> crate::Result<Amount> {
    Amount::from_str(s).pub_result(ErrorType::Request)
}

#[tool_router(vis = "pub(super)")]
impl PactServer {
    #[tool]
    /// Initialize the pact MCP service for this session and return usage instructions. You
    /// **MUST** call this **ONCE** before using other tools so that you have the full usage
    /// instructions. You **MAY** call it more than once if you have forgotten the usage
    /// instructions.
    async fn initialize_service(&self) -> Result<CallToolResult, McpError> {
        let mut initialized = self.initialized.lock().await;
        *initialized = true;
        Ok(CallToolResult::success(vec![rmcp::model::Content::text(
            include_str!("docs/INSTRUCTIONS.md"),
        )]))
    }

    /// List trips, newest first, with their member counts. Pass `member_id` to list only the
    /// trips that member belongs to.
    #[tool]
    async fn list_trips(
        &self,
        params: Parameters<ListTripsParams>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: list_trips called");
        let config = (*self.config).clone();
        let member = params.0.member_id;
        tool_result(commands::list_trips(config, member.as_ref(), member.is_none()).await)
    }

    /// Show a trip with its members, who has pledged, the wallet total, its itinerary and how
    /// much has been spent.
    #[tool]
    async fn show_trip(&self, params: Parameters<TripParams>) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: show_trip called for {}", params.0.trip_id);
        let config = (*self.config).clone();
        tool_result(commands::show_trip(config, &params.0.trip_id).await)
    }

    /// Record that a member pledged the trip's pact amount. Only pledged members share in the
    /// trip's costs and appear in the settlement.
    #[tool]
    async fn pledge(&self, params: Parameters<MemberTripParams>) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let MemberTripParams { trip_id, member_id } = params.0;
        info!("MCP: pledge called for {member_id} on {trip_id}");
        let config = (*self.config).clone();
        tool_result(commands::pledge(config, Some(&member_id), &trip_id).await)
    }

    /// Log an expense paid by a member of the trip.
    ///
    /// `split_equally` expenses go into the shared pool, which every pledged member owes an equal
    /// share of. `you_are_owed` expenses credit the payer without joining the pool. Either way the
    /// payer is credited the full amount, provided they have pledged.
    #[tool]
    async fn add_expense(
        &self,
        params: Parameters<AddExpenseParams>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let p = params.0;
        info!("MCP: add_expense called for {} on {}", p.member_id, p.trip_id);
        let amount = match parse_amount(&p.amount) {
            Ok(amount) => amount,
            Err(e) => return tool_result::<()>(Err(e)),
        };
        let mut args = AddExpenseArgs::new(p.trip_id, amount, p.split_method)
            .with_description(p.description)
            .with_category(p.category);
        if let Some(url) = p.receipt_url {
            args = args.with_receipt_url(url);
        }
        let config = (*self.config).clone();
        tool_result(commands::add_expense(config, Some(&p.member_id), args).await)
    }

    /// List a trip's expenses, newest first, with the total spent.
    #[tool]
    async fn list_expenses(
        &self,
        params: Parameters<TripParams>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: list_expenses called for {}", params.0.trip_id);
        let config = (*self.config).clone();
        tool_result(commands::list_expenses(config, &params.0.trip_id).await)
    }

    /// Delete an expense. Only the member who paid it or the trip's creator may do so.
    #[tool]
    async fn delete_expense(
        &self,
        params: Parameters<DeleteExpenseParams>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let DeleteExpenseParams {
            expense_id,
            member_id,
        } = params.0;
        info!("MCP: delete_expense called for {expense_id}");
        let config = (*self.config).clone();
        tool_result(commands::delete_expense(config, Some(&member_id), &expense_id).await)
    }

    /// Compute every pledged member's balance and the transfers that settle the trip.
    ///
    /// A positive balance means the member is owed money, a negative one means they owe. Each
    /// transfer names who pays whom and how much, with a payment link when the recipient has set
    /// a payout address. The result always reflects the latest expenses and pledges.
    #[tool]
    async fn settle(&self, params: Parameters<TripParams>) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: settle called for {}", params.0.trip_id);
        tool_result(self.settle_trip(&params.0.trip_id).await)
    }

    /// Declare or replace the budget of a spending category.
    #[tool]
    async fn set_budget(
        &self,
        params: Parameters<SetBudgetParams>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let p = params.0;
        info!("MCP: set_budget called for {} on {}", p.category, p.trip_id);
        let amount = match parse_amount(&p.amount) {
            Ok(amount) => amount,
            Err(e) => return tool_result::<()>(Err(e)),
        };
        let config = (*self.config).clone();
        let args = SetBudgetArgs::new(p.trip_id, p.category, amount);
        tool_result(commands::set_budget(config, Some(&p.member_id), args).await)
    }

    /// Report how much of each declared budget has been spent, flagging the categories that are
    /// over budget.
    #[tool]
    async fn budget_report(
        &self,
        params: Parameters<TripParams>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: budget_report called for {}", params.0.trip_id);
        let config = (*self.config).clone();
        tool_result(commands::budget_report(config, &params.0.trip_id).await)
    }

    /// Ask the text generator for a day-by-day itinerary for the trip's destination.
    #[tool]
    async fn suggest_itinerary(
        &self,
        params: Parameters<SuggestItineraryParams>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let p = params.0;
        info!("MCP: suggest_itinerary called for {}", p.trip_id);
        let config = (*self.config).clone();
        let args = SuggestItineraryArgs::new(p.trip_id, p.days, p.add);
        tool_result(
            commands::suggest_itinerary(config, self.mode, p.member_id.as_ref(), args).await,
        )
    }

    /// Ask the text generator for student-friendly deals at a destination.
    #[tool]
    async fn find_deals(
        &self,
        params: Parameters<FindDealsParams>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: find_deals called for {}", params.0.destination);
        let config = (*self.config).clone();
        tool_result(commands::deals(config, self.mode, &params.0.destination).await)
    }
}
