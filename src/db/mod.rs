//! The local trip store: reads and writes trips, members, pledges, itinerary entries, expenses and
//! budgets in a SQLite file. Every successful write publishes a `Change` on the `ChangeFeed`.

mod migrations;

use crate::error::Res;
use crate::model::{
    Amount, Budget, Expense, ExpenseId, ItineraryItem, ItineraryItemId, MemberId, Pledge,
    PledgeId, Profile, SplitMethod, Trip, TripId, TripSummary, MAX_AMOUNT,
};
use crate::notify::{Change, ChangeFeed, Table};
use crate::utils::{generate_id, parse_timestamp, timestamp};
use anyhow::{bail, ensure, Context};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl Db {
    /// Creates a new SQLite file at `path` and brings its schema to the current version. Fails if
    /// a file already exists there.
    pub(crate) async fn init(path: impl AsRef<Path>, feed: ChangeFeed) -> Res<Self> {
        let path = path.as_ref();
        ensure!(
            !path.exists(),
            "A database already exists at {}",
            path.display()
        );
        let pool = connect(path, true).await?;
        migrations::bootstrap(&pool).await?;
        migrations::run(&pool, 0, migrations::CURRENT_VERSION).await?;
        info!("Created trip database at {}", path.display());
        Ok(Self { pool, feed })
    }

    /// Opens the existing SQLite file at `path`, migrating its schema if it is out of date.
    pub(crate) async fn load(path: impl AsRef<Path>, feed: ChangeFeed) -> Res<Self> {
        let path = path.as_ref();
        ensure!(
            path.is_file(),
            "No database found at {}, did you run 'pact init'?",
            path.display()
        );
        let pool = connect(path, false).await?;
        let version = migrations::current_version(&pool).await?;
        if version > migrations::CURRENT_VERSION {
            bail!(
                "The database at {} is at schema version {version}, which is newer than this \
                version of pact supports ({})",
                path.display(),
                migrations::CURRENT_VERSION
            );
        }
        migrations::run(&pool, version, migrations::CURRENT_VERSION).await?;
        Ok(Self { pool, feed })
    }

    /// The feed on which this store announces its writes.
    pub(crate) fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn publish(&self, table: Table, trip_id: &TripId) {
        self.feed.publish(Change::new(table, trip_id));
    }

    // Trips -------------------------------------------------------------------------------------

    /// Creates a trip. Its creator becomes the first member.
    pub(crate) async fn create_trip(
        &self,
        creator: &MemberId,
        title: &str,
        destination: &str,
        pact_amount: Amount,
    ) -> Res<Trip> {
        let title = title.trim();
        ensure!(!title.is_empty(), "A trip needs a title");
        ensure!(
            !pact_amount.is_negative(),
            "The pact amount cannot be negative"
        );
        ensure!(
            !pact_amount.exceeds_limit(),
            "The pact amount cannot be more than {MAX_AMOUNT}"
        );

        let trip = Trip {
            id: TripId::new(generate_id("trip")),
            title: title.to_string(),
            destination: destination.trim().to_string(),
            pact_amount,
            created_by: creator.clone(),
            created_at: Utc::now(),
        };
        let created_at = timestamp(&trip.created_at);

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query(
            "INSERT INTO trips (id, title, destination, pact_amount, created_by, created_at) \
            VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(trip.id.as_str())
        .bind(&trip.title)
        .bind(&trip.destination)
        .bind(trip.pact_amount.value().to_string())
        .bind(creator.as_str())
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to insert trip")?;
        sqlx::query("INSERT INTO trip_members (trip_id, member_id, joined_at) VALUES (?, ?, ?)")
            .bind(trip.id.as_str())
            .bind(creator.as_str())
            .bind(&created_at)
            .execute(&mut *tx)
            .await
            .context("Failed to add the trip creator as a member")?;
        tx.commit().await.context("Failed to commit new trip")?;

        debug!("Created trip {} '{}'", trip.id, trip.title);
        self.publish(Table::Trips, &trip.id);
        self.publish(Table::TripMembers, &trip.id);
        Ok(trip)
    }

    pub(crate) async fn get_trip(&self, trip_id: &TripId) -> Res<Option<Trip>> {
        let row = sqlx::query(
            "SELECT id, title, destination, pact_amount, created_by, created_at \
            FROM trips WHERE id = ?",
        )
        .bind(trip_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to read trip {trip_id}"))?;
        row.as_ref().map(trip_from_row).transpose()
    }

    /// Like `get_trip`, but a missing trip is an error.
    pub(crate) async fn require_trip(&self, trip_id: &TripId) -> Res<Trip> {
        self.get_trip(trip_id)
            .await?
            .with_context(|| format!("Trip {trip_id} does not exist"))
    }

    /// Lists trips, newest first. When `member` is given, only the trips they belong to.
    pub(crate) async fn list_trips(&self, member: Option<&MemberId>) -> Res<Vec<TripSummary>> {
        let member = member.map(MemberId::as_str);
        let rows = sqlx::query(
            "SELECT t.id, t.title, t.destination, t.pact_amount, t.created_by, t.created_at, \
                (SELECT COUNT(*) FROM trip_members m WHERE m.trip_id = t.id) AS member_count \
            FROM trips t \
            WHERE ? IS NULL OR EXISTS \
                (SELECT 1 FROM trip_members m WHERE m.trip_id = t.id AND m.member_id = ?) \
            ORDER BY t.created_at DESC, t.rowid DESC",
        )
        .bind(member)
        .bind(member)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list trips")?;

        rows.iter()
            .map(|row| -> Res<TripSummary> {
                let member_count: i64 = row.try_get("member_count")?;
                Ok(TripSummary {
                    trip: trip_from_row(row)?,
                    member_count: u64::try_from(member_count).unwrap_or_default(),
                })
            })
            .collect()
    }

    // Members -----------------------------------------------------------------------------------

    /// Adds `member` to the trip. Returns `false` if they were already a member.
    pub(crate) async fn join_trip(&self, trip_id: &TripId, member: &MemberId) -> Res<bool> {
        self.require_trip(trip_id).await?;
        let result = sqlx::query(
            "INSERT OR IGNORE INTO trip_members (trip_id, member_id, joined_at) VALUES (?, ?, ?)",
        )
        .bind(trip_id.as_str())
        .bind(member.as_str())
        .bind(timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to add {member} to trip {trip_id}"))?;

        let joined = result.rows_affected() > 0;
        if joined {
            debug!("{member} joined trip {trip_id}");
            self.publish(Table::TripMembers, trip_id);
        }
        Ok(joined)
    }

    /// The trip's members in the order they joined.
    pub(crate) async fn members(&self, trip_id: &TripId) -> Res<Vec<MemberId>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT member_id FROM trip_members WHERE trip_id = ? ORDER BY joined_at, rowid",
        )
        .bind(trip_id.as_str())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to read members of trip {trip_id}"))?;
        Ok(rows.into_iter().map(|(id,)| MemberId::from(id)).collect())
    }

    pub(crate) async fn is_member(&self, trip_id: &TripId, member: &MemberId) -> Res<bool> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM trip_members WHERE trip_id = ? AND member_id = ?",
        )
        .bind(trip_id.as_str())
        .bind(member.as_str())
        .fetch_one(&self.pool)
        .await
        .context("Failed to check trip membership")?;
        Ok(row.0 > 0)
    }

    async fn require_member(&self, trip_id: &TripId, member: &MemberId) -> Res<()> {
        ensure!(
            self.is_member(trip_id, member).await?,
            "{member} is not a member of trip {trip_id}"
        );
        Ok(())
    }

    // Profiles ----------------------------------------------------------------------------------

    pub(crate) async fn upsert_profile(&self, profile: &Profile) -> Res<()> {
        sqlx::query(
            "INSERT INTO profiles (member_id, email, payout_address) VALUES (?, ?, ?) \
            ON CONFLICT (member_id) DO UPDATE SET \
                email = excluded.email, payout_address = excluded.payout_address",
        )
        .bind(profile.member_id.as_str())
        .bind(&profile.email)
        .bind(profile.payout_address.as_deref())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save profile of {}", profile.member_id))?;
        self.feed.publish(Change::global(Table::Profiles));
        Ok(())
    }

    /// Profiles of the trip's members. Members without a profile are simply absent.
    pub(crate) async fn profiles(&self, trip_id: &TripId) -> Res<Vec<Profile>> {
        let rows = sqlx::query(
            "SELECT p.member_id, p.email, p.payout_address \
            FROM profiles p JOIN trip_members m ON m.member_id = p.member_id \
            WHERE m.trip_id = ? ORDER BY m.joined_at, m.rowid",
        )
        .bind(trip_id.as_str())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to read profiles for trip {trip_id}"))?;

        rows.iter()
            .map(|row| -> Res<Profile> {
                Ok(Profile {
                    member_id: MemberId::from(row.try_get::<String, _>("member_id")?),
                    email: row.try_get("email")?,
                    payout_address: row.try_get("payout_address")?,
                })
            })
            .collect()
    }

    // Pledges -----------------------------------------------------------------------------------

    /// Records a pledge of the trip's pact amount by `member`, who must belong to the trip.
    pub(crate) async fn pledge(&self, trip_id: &TripId, member: &MemberId) -> Res<Pledge> {
        let trip = self.require_trip(trip_id).await?;
        self.require_member(trip_id, member).await?;

        let pledge = Pledge {
            id: PledgeId::new(generate_id("pledge")),
            trip_id: trip_id.clone(),
            member_id: member.clone(),
            amount: trip.pact_amount,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO pledges (id, trip_id, member_id, amount, created_at) \
            VALUES (?, ?, ?, ?, ?)",
        )
        .bind(pledge.id.as_str())
        .bind(trip_id.as_str())
        .bind(member.as_str())
        .bind(pledge.amount.value().to_string())
        .bind(timestamp(&pledge.created_at))
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to record pledge by {member}"))?;

        debug!("{member} pledged {} to trip {trip_id}", pledge.amount);
        self.publish(Table::Pledges, trip_id);
        Ok(pledge)
    }

    pub(crate) async fn pledges(&self, trip_id: &TripId) -> Res<Vec<Pledge>> {
        let rows = sqlx::query(
            "SELECT id, trip_id, member_id, amount, created_at FROM pledges \
            WHERE trip_id = ? ORDER BY created_at, rowid",
        )
        .bind(trip_id.as_str())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to read pledges of trip {trip_id}"))?;

        rows.iter()
            .map(|row| -> Res<Pledge> {
                Ok(Pledge {
                    id: PledgeId::from(row.try_get::<String, _>("id")?),
                    trip_id: TripId::from(row.try_get::<String, _>("trip_id")?),
                    member_id: MemberId::from(row.try_get::<String, _>("member_id")?),
                    amount: Amount::parse_lenient(row.try_get("amount")?),
                    created_at: parse_timestamp(row.try_get("created_at")?)?,
                })
            })
            .collect()
    }

    /// Members with at least one pledge, ordered by their first pledge. These are the members the
    /// shared costs of the trip are divided among.
    pub(crate) async fn pledged_members(&self, trip_id: &TripId) -> Res<Vec<MemberId>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT member_id FROM pledges WHERE trip_id = ? \
            GROUP BY member_id ORDER BY MIN(rowid)",
        )
        .bind(trip_id.as_str())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to read pledged members of trip {trip_id}"))?;
        Ok(rows.into_iter().map(|(id,)| MemberId::from(id)).collect())
    }

    // Itinerary ---------------------------------------------------------------------------------

    pub(crate) async fn add_itinerary_item(
        &self,
        trip_id: &TripId,
        member: &MemberId,
        title: &str,
    ) -> Res<ItineraryItem> {
        let title = title.trim();
        ensure!(!title.is_empty(), "An itinerary entry needs a title");
        self.require_trip(trip_id).await?;
        self.require_member(trip_id, member).await?;

        let item = ItineraryItem {
            id: ItineraryItemId::new(generate_id("item")),
            trip_id: trip_id.clone(),
            member_id: member.clone(),
            title: title.to_string(),
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO itinerary_items (id, trip_id, member_id, title, created_at) \
            VALUES (?, ?, ?, ?, ?)",
        )
        .bind(item.id.as_str())
        .bind(trip_id.as_str())
        .bind(member.as_str())
        .bind(&item.title)
        .bind(timestamp(&item.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to insert itinerary entry")?;

        self.publish(Table::ItineraryItems, trip_id);
        Ok(item)
    }

    /// The trip's itinerary, oldest entry first.
    pub(crate) async fn itinerary(&self, trip_id: &TripId) -> Res<Vec<ItineraryItem>> {
        let rows = sqlx::query(
            "SELECT id, trip_id, member_id, title, created_at FROM itinerary_items \
            WHERE trip_id = ? ORDER BY created_at, rowid",
        )
        .bind(trip_id.as_str())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to read itinerary of trip {trip_id}"))?;

        rows.iter()
            .map(|row| -> Res<ItineraryItem> {
                Ok(ItineraryItem {
                    id: ItineraryItemId::from(row.try_get::<String, _>("id")?),
                    trip_id: TripId::from(row.try_get::<String, _>("trip_id")?),
                    member_id: MemberId::from(row.try_get::<String, _>("member_id")?),
                    title: row.try_get("title")?,
                    created_at: parse_timestamp(row.try_get("created_at")?)?,
                })
            })
            .collect()
    }

    // Expenses ----------------------------------------------------------------------------------

    /// Stores `expense`. Its payer must belong to the trip and its amount cannot be negative.
    pub(crate) async fn add_expense(&self, expense: &Expense) -> Res<()> {
        ensure!(
            !expense.amount.is_negative(),
            "An expense amount cannot be negative"
        );
        ensure!(
            !expense.amount.exceeds_limit(),
            "An expense amount cannot be more than {MAX_AMOUNT}"
        );
        self.require_trip(&expense.trip_id).await?;
        self.require_member(&expense.trip_id, &expense.paid_by)
            .await?;

        sqlx::query(
            "INSERT INTO expenses (id, trip_id, paid_by, description, amount, split_method, \
                category, receipt_url, created_at) \
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(expense.id.as_str())
        .bind(expense.trip_id.as_str())
        .bind(expense.paid_by.as_str())
        .bind(&expense.description)
        .bind(expense.amount.value().to_string())
        .bind(expense.split_method.to_string())
        .bind(&expense.category)
        .bind(expense.receipt_url.as_deref())
        .bind(timestamp(&expense.created_at))
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert expense {}", expense.id))?;

        debug!(
            "Expense {} of {} by {} added to trip {}",
            expense.id, expense.amount, expense.paid_by, expense.trip_id
        );
        self.publish(Table::Expenses, &expense.trip_id);
        Ok(())
    }

    /// The trip's expenses, newest first.
    pub(crate) async fn expenses(&self, trip_id: &TripId) -> Res<Vec<Expense>> {
        let rows = sqlx::query(
            "SELECT id, trip_id, paid_by, description, amount, split_method, category, \
                receipt_url, created_at \
            FROM expenses WHERE trip_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(trip_id.as_str())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to read expenses of trip {trip_id}"))?;
        rows.iter().map(expense_from_row).collect()
    }

    /// Deletes an expense. Only its payer or the trip's creator may do so.
    pub(crate) async fn delete_expense(
        &self,
        expense_id: &ExpenseId,
        requested_by: &MemberId,
    ) -> Res<Expense> {
        let row = sqlx::query(
            "SELECT id, trip_id, paid_by, description, amount, split_method, category, \
                receipt_url, created_at \
            FROM expenses WHERE id = ?",
        )
        .bind(expense_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to read expense {expense_id}"))?
        .with_context(|| format!("Expense {expense_id} does not exist"))?;
        let expense = expense_from_row(&row)?;
        let trip = self.require_trip(&expense.trip_id).await?;

        ensure!(
            &expense.paid_by == requested_by || &trip.created_by == requested_by,
            "Only the payer or the trip creator may delete expense {expense_id}"
        );

        sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(expense_id.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete expense {expense_id}"))?;

        debug!("Expense {expense_id} deleted by {requested_by}");
        self.publish(Table::Expenses, &expense.trip_id);
        Ok(expense)
    }

    // Budgets -----------------------------------------------------------------------------------

    /// Declares the budget of one category, replacing any earlier value.
    pub(crate) async fn set_budget(&self, budget: &Budget) -> Res<()> {
        ensure!(
            !budget.amount.is_negative(),
            "A budget cannot be negative"
        );
        ensure!(
            !budget.amount.exceeds_limit(),
            "A budget cannot be more than {MAX_AMOUNT}"
        );
        ensure!(
            !budget.category.trim().is_empty(),
            "A budget needs a category"
        );
        self.require_trip(&budget.trip_id).await?;

        sqlx::query(
            "INSERT INTO budgets (trip_id, category, amount) VALUES (?, ?, ?) \
            ON CONFLICT (trip_id, category) DO UPDATE SET amount = excluded.amount",
        )
        .bind(budget.trip_id.as_str())
        .bind(budget.category.trim())
        .bind(budget.amount.value().to_string())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save budget for '{}'", budget.category))?;

        self.publish(Table::Budgets, &budget.trip_id);
        Ok(())
    }

    /// The trip's budgets, ordered by category.
    pub(crate) async fn budgets(&self, trip_id: &TripId) -> Res<Vec<Budget>> {
        let rows = sqlx::query(
            "SELECT trip_id, category, amount FROM budgets WHERE trip_id = ? ORDER BY category",
        )
        .bind(trip_id.as_str())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to read budgets of trip {trip_id}"))?;

        rows.iter()
            .map(|row| -> Res<Budget> {
                Ok(Budget {
                    trip_id: TripId::from(row.try_get::<String, _>("trip_id")?),
                    category: row.try_get("category")?,
                    amount: Amount::parse_lenient(row.try_get("amount")?),
                })
            })
            .collect()
    }
}

async fn connect(path: &Path, create: bool) -> Res<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open SQLite database at {}", path.display()))
}

fn trip_from_row(row: &SqliteRow) -> Res<Trip> {
    Ok(Trip {
        id: TripId::from(row.try_get::<String, _>("id")?),
        title: row.try_get("title")?,
        destination: row.try_get("destination")?,
        pact_amount: Amount::parse_lenient(row.try_get("pact_amount")?),
        created_by: MemberId::from(row.try_get::<String, _>("created_by")?),
        created_at: parse_timestamp(row.try_get("created_at")?)?,
    })
}

fn expense_from_row(row: &SqliteRow) -> Res<Expense> {
    let id = ExpenseId::from(row.try_get::<String, _>("id")?);
    let split: &str = row.try_get("split_method")?;
    let split_method = SplitMethod::from_str(split).unwrap_or_else(|_| {
        warn!("Expense {id} has unknown split method '{split}', treating it as split_equally");
        SplitMethod::SplitEqually
    });
    Ok(Expense {
        trip_id: TripId::from(row.try_get::<String, _>("trip_id")?),
        paid_by: MemberId::from(row.try_get::<String, _>("paid_by")?),
        description: row.try_get("description")?,
        amount: Amount::parse_lenient(row.try_get("amount")?),
        split_method,
        category: row.try_get("category")?,
        receipt_url: row.try_get("receipt_url")?,
        created_at: parse_timestamp(row.try_get("created_at")?)?,
        id,
    })
}
