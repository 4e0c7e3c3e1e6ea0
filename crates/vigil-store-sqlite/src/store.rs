//! [`SqliteStore`] — the SQLite implementation of [`SituationStore`].

use std::future::Future;
use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};

use vigil_core::{
  lifecycle,
  situation::{ResolutionState, Situation},
  store::{SituationQuery, SituationStore, StoreErrorKind},
};

use crate::{
  Error, Result,
  encode::{
    RawSituation, encode_dt, encode_properties, encode_resolution_state,
    encode_severity,
  },
  schema::SCHEMA,
};

/// Page size applied to reads when the query does not set a limit. Deletion
/// by query is never paginated implicitly.
const DEFAULT_PAGE_SIZE: usize = 100;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Vigil situation store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All calls
/// run on the connection's dedicated thread, and every lifecycle mutation is
/// one read-modify-write transaction, so per-id mutations never interleave
/// partially.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Load, apply an in-memory bookkeeping mutation, and write back — all in
  /// one transaction on the connection thread.
  async fn mutate<F>(&self, id: &str, apply: F) -> Result<()>
  where
    F: FnOnce(&mut Situation) + Send + 'static,
  {
    let select =
      format!("SELECT {} FROM situations WHERE situation_id = ?1", RawSituation::COLUMNS);
    let id_param = id.to_owned();

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let raw = tx
          .query_row(&select, rusqlite::params![id_param], RawSituation::from_row)
          .optional()?;
        let Some(raw) = raw else { return Ok(false) };

        let mut situation = raw.into_situation().map_err(into_call_error)?;
        apply(&mut situation);

        let bookkeeping =
          encode_properties(&situation.bookkeeping).map_err(into_call_error)?;
        let resolution = encode_resolution_state(situation.resolution_state());

        tx.execute(
          "UPDATE situations SET bookkeeping = ?2, resolution_state = ?3
           WHERE situation_id = ?1",
          rusqlite::params![situation.id, bookkeeping, resolution],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if found {
      Ok(())
    } else {
      Err(Error::NotFound(id.to_owned()))
    }
  }

  async fn query_rows(
    &self,
    query: &SituationQuery,
    default_limit: i64,
  ) -> Result<Vec<RawSituation>> {
    let (where_clause, mut params) = build_filter(query);

    // LIMIT -1 is SQLite for "no limit".
    params.push(Value::Integer(
      query.limit.map(|l| l as i64).unwrap_or(default_limit),
    ));
    params.push(Value::Integer(query.offset.unwrap_or(0) as i64));

    let sql = format!(
      "SELECT {} FROM situations {where_clause}
       ORDER BY created_at, situation_id LIMIT ? OFFSET ?",
      RawSituation::COLUMNS,
    );

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawSituation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws)
  }
}

/// Build the dynamic WHERE clause and its positional parameters.
fn build_filter(query: &SituationQuery) -> (String, Vec<Value>) {
  let mut conds: Vec<String> = Vec::new();
  let mut params: Vec<Value> = Vec::new();

  if let Some(t) = &query.situation_type {
    conds.push("situation_type = ?".to_owned());
    params.push(Value::Text(t.clone()));
  }
  if let Some(severity) = query.severity {
    conds.push("severity = ?".to_owned());
    params.push(Value::Text(encode_severity(severity)));
  }
  if let Some(state) = query.resolution_state {
    conds.push("resolution_state = ?".to_owned());
    params.push(Value::Text(encode_resolution_state(state)));
  }
  if let Some(from) = query.from {
    conds.push("created_at >= ?".to_owned());
    params.push(Value::Text(encode_dt(from)));
  }
  if let Some(to) = query.to {
    conds.push("created_at < ?".to_owned());
    params.push(Value::Text(encode_dt(to)));
  }
  for (key, value) in &query.properties {
    // Quoted JSON path so property keys with dots stay literal.
    conds.push(r#"json_extract(properties, '$."' || ? || '"') = ?"#.to_owned());
    params.push(Value::Text(key.clone()));
    params.push(Value::Text(value.clone()));
  }

  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };

  (where_clause, params)
}

fn into_call_error(e: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

// ─── SituationStore impl ─────────────────────────────────────────────────────

impl SituationStore for SqliteStore {
  type Error = Error;

  fn classify(err: &Error) -> StoreErrorKind {
    match err {
      Error::NotFound(_) => StoreErrorKind::NotFound,
      Error::DuplicateSituation(_)
      | Error::Core(vigil_core::Error::DuplicateSituation(_)) => {
        StoreErrorKind::Duplicate
      }
      _ => StoreErrorKind::Other,
    }
  }

  async fn store(&self, mut situation: Situation) -> Result<()> {
    lifecycle::prepare_for_store(&mut situation)?;

    let id          = situation.id.clone();
    let kind        = situation.situation_type.clone();
    let severity    = encode_severity(situation.severity);
    let subject     = situation.subject.clone();
    let description = situation.description.clone();
    let created_at  = encode_dt(situation.timestamp);
    let properties  = encode_properties(&situation.properties)?;
    let bookkeeping = encode_properties(&situation.bookkeeping)?;
    let resolution  = encode_resolution_state(situation.resolution_state());

    let id_param = id.clone();
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM situations WHERE situation_id = ?1",
            rusqlite::params![id_param],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if exists {
          return Ok(false);
        }

        tx.execute(
          "INSERT INTO situations (
             situation_id, situation_type, severity, subject, description,
             created_at, properties, bookkeeping, resolution_state
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_param,
            kind,
            severity,
            subject,
            description,
            created_at,
            properties,
            bookkeeping,
            resolution,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if inserted {
      Ok(())
    } else {
      Err(Error::DuplicateSituation(id))
    }
  }

  fn get_situation(
    &self,
    id: &str,
  ) -> impl Future<Output = Result<Option<Situation>>> + Send + '_ {
    let select =
      format!("SELECT {} FROM situations WHERE situation_id = ?1", RawSituation::COLUMNS);
    let id_param = id.to_owned();

    async move {
      let raw = self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(&select, rusqlite::params![id_param], RawSituation::from_row)
              .optional()?,
          )
        })
        .await?;

      raw.map(RawSituation::into_situation).transpose()
    }
  }

  async fn get_situations(&self, query: &SituationQuery) -> Result<Vec<Situation>> {
    let raws = self.query_rows(query, DEFAULT_PAGE_SIZE as i64).await?;
    raws.into_iter().map(RawSituation::into_situation).collect()
  }

  fn assign_situation(
    &self,
    id: &str,
    user: &str,
  ) -> impl Future<Output = Result<()>> + Send + '_ {
    let id = id.to_owned();
    let user = user.to_owned();
    async move { self.mutate(&id, move |s| lifecycle::assign(s, &user)).await }
  }

  fn unassign_situation(&self, id: &str) -> impl Future<Output = Result<()>> + Send + '_ {
    let id = id.to_owned();
    async move { self.mutate(&id, lifecycle::unassign).await }
  }

  fn update_resolution_state(
    &self,
    id: &str,
    state: ResolutionState,
  ) -> impl Future<Output = Result<()>> + Send + '_ {
    let id = id.to_owned();
    async move {
      self
        .mutate(&id, move |s| lifecycle::update_resolution_state(s, state))
        .await
    }
  }

  fn record_successful_resubmit(
    &self,
    id: &str,
    user: &str,
  ) -> impl Future<Output = Result<()>> + Send + '_ {
    let id = id.to_owned();
    let user = user.to_owned();
    async move {
      let now = Utc::now();
      self
        .mutate(&id, move |s| lifecycle::record_resubmit_success(s, &user, now))
        .await
    }
  }

  fn record_resubmit_failure(
    &self,
    id: &str,
    error_message: &str,
    user: &str,
  ) -> impl Future<Output = Result<()>> + Send + '_ {
    let id = id.to_owned();
    let user = user.to_owned();
    let message = error_message.to_owned();
    async move {
      let now = Utc::now();
      self
        .mutate(&id, move |s| {
          lifecycle::record_resubmit_failure(s, &message, &user, now)
        })
        .await
    }
  }

  fn delete_situation(&self, id: &str) -> impl Future<Output = Result<()>> + Send + '_ {
    let id_param = id.to_owned();
    let id_owned = id.to_owned();
    async move {
      let deleted = self
        .conn
        .call(move |conn| {
          Ok(conn.execute(
            "DELETE FROM situations WHERE situation_id = ?1",
            rusqlite::params![id_param],
          )?)
        })
        .await?;

      if deleted == 0 {
        Err(Error::NotFound(id_owned))
      } else {
        Ok(())
      }
    }
  }

  async fn delete_matching(&self, query: &SituationQuery) -> Result<usize> {
    let (where_clause, mut params) = build_filter(query);
    params.push(Value::Integer(query.limit.map(|l| l as i64).unwrap_or(-1)));
    params.push(Value::Integer(query.offset.unwrap_or(0) as i64));

    let select = format!(
      "SELECT situation_id FROM situations {where_clause}
       ORDER BY created_at, situation_id LIMIT ? OFFSET ?"
    );

    // Snapshot the matching ids and delete them inside one transaction; the
    // returned count reflects rows actually removed, so a record inserted
    // mid-operation is never counted.
    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let ids: Vec<String> = {
          let mut stmt = tx.prepare(&select)?;
          stmt
            .query_map(rusqlite::params_from_iter(params), |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut deleted = 0;
        for id in ids {
          deleted += tx.execute(
            "DELETE FROM situations WHERE situation_id = ?1",
            rusqlite::params![id],
          )?;
        }

        tx.commit()?;
        Ok(deleted)
      })
      .await?;

    Ok(deleted)
  }
}
