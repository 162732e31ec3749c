use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::not;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use pairly_shared::clients::db::DbPool;
use pairly_shared::errors::{AppError, AppResult};

use super::{InteractionLedger, ProfileStore};
use crate::matching::eligibility::EligibilityFilter;
use crate::models::{Action, DecisionRecord, Gender, LookingFor, PersonId, Profile, ProfilePatch};
use crate::schema::{interactions, profiles};

/// Diesel-backed store. Diesel is blocking, so each call checks out a pooled
/// connection on the blocking thread pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> AppResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| AppError::unavailable(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| AppError::internal(e.to_string()))?
    }
}

// --- Rows ---

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ProfileRow {
    person_id: i64,
    username: Option<String>,
    name: Option<String>,
    age: Option<i32>,
    city: Option<String>,
    #[allow(dead_code)]
    city_key: Option<String>,
    gender: Option<String>,
    looking_for: Option<String>,
    description: Option<String>,
    photo_ref: Option<String>,
    embedding: Option<Vec<f32>>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        // An unparseable enum column leaves the field absent, which makes the profile incomplete.
        let gender = row.gender.as_deref().and_then(|g| {
            g.parse::<Gender>()
                .map_err(|e| tracing::warn!(person_id = row.person_id, error = %e, "bad gender column"))
                .ok()
        });
        let looking_for = row.looking_for.as_deref().and_then(|l| {
            l.parse::<LookingFor>()
                .map_err(|e| tracing::warn!(person_id = row.person_id, error = %e, "bad looking_for column"))
                .ok()
        });

        Profile {
            person_id: row.person_id,
            username: row.username,
            name: row.name,
            age: row.age,
            city: row.city,
            gender,
            looking_for,
            description: row.description,
            photo_ref: row.photo_ref,
            embedding: row.embedding,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
struct NewProfileRow {
    person_id: i64,
    username: Option<String>,
    name: Option<String>,
    age: Option<i32>,
    city: Option<String>,
    city_key: Option<String>,
    gender: Option<String>,
    looking_for: Option<String>,
    description: Option<String>,
    photo_ref: Option<String>,
    embedding: Option<Vec<f32>>,
    updated_at: DateTime<Utc>,
}

/// `None` fields are skipped; `embedding: Some(None)` writes NULL.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = profiles)]
struct ProfileChangeset {
    username: Option<String>,
    name: Option<String>,
    age: Option<i32>,
    city: Option<String>,
    city_key: Option<String>,
    gender: Option<String>,
    looking_for: Option<String>,
    description: Option<String>,
    photo_ref: Option<String>,
    embedding: Option<Option<Vec<f32>>>,
    updated_at: DateTime<Utc>,
}

fn split_patch(person_id: PersonId, patch: ProfilePatch) -> (NewProfileRow, ProfileChangeset) {
    let patch = patch.normalized();
    let now = Utc::now();
    let city_key = patch.city.as_deref().map(crate::models::normalize_city);
    let gender = patch.gender.map(|g| g.as_str().to_string());
    let looking_for = patch.looking_for.map(|l| l.as_str().to_string());

    let insert = NewProfileRow {
        person_id,
        username: patch.username.clone(),
        name: patch.name.clone(),
        age: patch.age,
        city: patch.city.clone(),
        city_key: city_key.clone(),
        gender: gender.clone(),
        looking_for: looking_for.clone(),
        description: patch.description.clone(),
        photo_ref: patch.photo_ref.clone(),
        embedding: patch.embedding.clone().flatten(),
        updated_at: now,
    };
    let update = ProfileChangeset {
        username: patch.username,
        name: patch.name,
        age: patch.age,
        city: patch.city,
        city_key,
        gender,
        looking_for,
        description: patch.description,
        photo_ref: patch.photo_ref,
        embedding: patch.embedding,
        updated_at: now,
    };
    (insert, update)
}

#[derive(QueryableByName)]
struct PendingCount {
    #[diesel(sql_type = BigInt)]
    pending: i64,
}

#[derive(QueryableByName)]
struct PendingActor {
    #[diesel(sql_type = BigInt)]
    actor_id: i64,
}

const COUNT_PENDING_SQL: &str = "\
    SELECT COUNT(*) AS pending
    FROM interactions i
    WHERE i.target_id = $1
      AND i.action = 'like'
      AND NOT EXISTS (
            SELECT 1 FROM interactions x
            WHERE x.actor_id = $1 AND x.target_id = i.actor_id
      )
      AND EXISTS (SELECT 1 FROM profiles p WHERE p.person_id = i.actor_id)";

const OLDEST_PENDING_SQL: &str = "\
    SELECT i.actor_id
    FROM interactions i
    WHERE i.target_id = $1
      AND i.action = 'like'
      AND NOT EXISTS (
            SELECT 1 FROM interactions x
            WHERE x.actor_id = $1 AND x.target_id = i.actor_id
      )
      AND EXISTS (SELECT 1 FROM profiles p WHERE p.person_id = i.actor_id)
    ORDER BY i.ts ASC, i.actor_id ASC
    LIMIT 1";

/// Advisory lock key for the unordered pair {a, b}.
pub(crate) fn pair_lock_key(a: PersonId, b: PersonId) -> i64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    lo.wrapping_mul(0x9E37_79B9_7F4A_7C15_u64 as i64).rotate_left(17) ^ hi
}

fn parse_action(raw: &str) -> AppResult<Action> {
    raw.parse::<Action>().map_err(AppError::internal)
}

fn upsert_edge(
    conn: &mut PgConnection,
    actor_id: PersonId,
    target_id: PersonId,
    action: Action,
    ts: DateTime<Utc>,
) -> QueryResult<usize> {
    use diesel::upsert::excluded;

    diesel::insert_into(interactions::table)
        .values((
            interactions::actor_id.eq(actor_id),
            interactions::target_id.eq(target_id),
            interactions::action.eq(action.as_str()),
            interactions::ts.eq(ts),
        ))
        .on_conflict((interactions::actor_id, interactions::target_id))
        .do_update()
        .set((
            interactions::action.eq(excluded(interactions::action)),
            interactions::ts.eq(excluded(interactions::ts)),
        ))
        .execute(conn)
}

fn edge_action(conn: &mut PgConnection, actor_id: PersonId, target_id: PersonId) -> AppResult<Option<Action>> {
    let raw = interactions::table
        .find((actor_id, target_id))
        .select(interactions::action)
        .first::<String>(conn)
        .optional()?;
    raw.as_deref().map(parse_action).transpose()
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get(&self, person_id: PersonId) -> AppResult<Option<Profile>> {
        self.with_conn(move |conn| {
            let row = profiles::table
                .find(person_id)
                .select(ProfileRow::as_select())
                .first::<ProfileRow>(conn)
                .optional()?;
            Ok(row.map(Profile::from))
        })
        .await
    }

    async fn upsert(&self, person_id: PersonId, patch: ProfilePatch) -> AppResult<Profile> {
        let (insert, update) = split_patch(person_id, patch);
        self.with_conn(move |conn| {
            let row = diesel::insert_into(profiles::table)
                .values(&insert)
                .on_conflict(profiles::person_id)
                .do_update()
                .set(&update)
                .returning(ProfileRow::as_returning())
                .get_result::<ProfileRow>(conn)?;
            Ok(Profile::from(row))
        })
        .await
    }

    async fn scan_eligible(
        &self,
        requester: &Profile,
        filter: &EligibilityFilter,
        limit: usize,
    ) -> AppResult<Vec<Profile>> {
        let (Some(city_key), Some(age), Some(gender)) =
            (requester.city_key(), requester.age, requester.gender)
        else {
            return Ok(Vec::new());
        };
        let requester_id = requester.person_id;
        let wanted_gender = requester.preference().gender();
        let tolerance = filter.age_tolerance();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.with_conn(move |conn| {
            let already_decided = interactions::table
                .select(interactions::target_id)
                .filter(interactions::actor_id.eq(requester_id));

            let mut query = profiles::table
                .select(ProfileRow::as_select())
                .filter(profiles::person_id.ne(requester_id))
                .filter(profiles::city_key.eq(city_key))
                .filter(profiles::age.between(age.saturating_sub(tolerance), age.saturating_add(tolerance)))
                .filter(
                    profiles::looking_for
                        .is_null()
                        .or(profiles::looking_for.eq_any(vec![LookingFor::Any.as_str(), gender.as_str()])),
                )
                .filter(profiles::name.is_not_null())
                .filter(profiles::gender.is_not_null())
                .filter(profiles::description.is_not_null())
                .filter(profiles::photo_ref.is_not_null())
                .filter(not(profiles::person_id.eq_any(already_decided)))
                .into_boxed();

            if let Some(wanted) = wanted_gender {
                query = query.filter(profiles::gender.eq(wanted.as_str()));
            }

            let rows = query
                .order(profiles::person_id.asc())
                .limit(limit)
                .load::<ProfileRow>(conn)?;

            Ok(rows.into_iter().map(Profile::from).collect())
        })
        .await
    }

    async fn ping(&self) -> AppResult<()> {
        self.with_conn(|conn| {
            diesel::sql_query("SELECT 1").execute(conn)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl InteractionLedger for PgStore {
    async fn put_edge(
        &self,
        actor_id: PersonId,
        target_id: PersonId,
        action: Action,
        ts: DateTime<Utc>,
    ) -> AppResult<()> {
        self.with_conn(move |conn| {
            upsert_edge(conn, actor_id, target_id, action, ts)?;
            Ok(())
        })
        .await
    }

    async fn has_edge(
        &self,
        actor_id: PersonId,
        target_id: PersonId,
        action: Option<Action>,
    ) -> AppResult<bool> {
        self.with_conn(move |conn| {
            let mut query = interactions::table
                .filter(interactions::actor_id.eq(actor_id))
                .filter(interactions::target_id.eq(target_id))
                .into_boxed();
            if let Some(action) = action {
                query = query.filter(interactions::action.eq(action.as_str()));
            }
            let count: i64 = query.count().get_result(conn)?;
            Ok(count > 0)
        })
        .await
    }

    async fn record_decision(
        &self,
        actor_id: PersonId,
        target_id: PersonId,
        action: Action,
        ts: DateTime<Utc>,
    ) -> AppResult<DecisionRecord> {
        self.with_conn(move |conn| {
            conn.transaction::<_, AppError, _>(|conn| {
                // Serializes crossing decisions on the same pair until commit.
                diesel::sql_query("SELECT pg_advisory_xact_lock($1)")
                    .bind::<BigInt, _>(pair_lock_key(actor_id, target_id))
                    .execute(conn)?;

                let previous = edge_action(conn, actor_id, target_id)?;
                upsert_edge(conn, actor_id, target_id, action, ts)?;
                let reverse = edge_action(conn, target_id, actor_id)?;

                Ok(DecisionRecord { previous, reverse })
            })
        })
        .await
    }

    async fn count_reciprocal_pending(&self, target_id: PersonId) -> AppResult<i64> {
        self.with_conn(move |conn| {
            let row = diesel::sql_query(COUNT_PENDING_SQL)
                .bind::<BigInt, _>(target_id)
                .get_result::<PendingCount>(conn)?;
            Ok(row.pending)
        })
        .await
    }

    async fn oldest_pending(&self, target_id: PersonId) -> AppResult<Option<PersonId>> {
        self.with_conn(move |conn| {
            let row = diesel::sql_query(OLDEST_PENDING_SQL)
                .bind::<BigInt, _>(target_id)
                .get_result::<PendingActor>(conn)
                .optional()?;
            Ok(row.map(|r| r.actor_id))
        })
        .await
    }
}
