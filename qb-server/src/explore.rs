//! Read-only paging over the precomputed `drug_disease_pairs` table.

use std::{
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

use rusqlite::{
    Connection, OpenFlags, params_from_iter,
    types::{Value as SqlValue, ValueRef},
};
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::ExploreError;

pub const MAX_PAGE_SIZE: i64 = 500;

/// Columns callers may filter on with exact matches.
pub const FILTER_COLUMNS: [&str; 2] = ["disease_name", "drug_name"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrugDiseasePage {
    pub rows: Vec<Map<String, Value>>,
    pub limit: i64,
    pub offset: i64,
}

/// Reads `pagination` from a request body, clamping `limit` to [`MAX_PAGE_SIZE`].
pub fn parse_pagination(body: &Value) -> Result<Page, ExploreError> {
    let pagination = body.get("pagination").ok_or(ExploreError::MissingPagination)?;
    let (Some(offset), Some(limit)) = (
        integer_field(pagination, "offset"),
        integer_field(pagination, "limit"),
    ) else {
        return Err(ExploreError::MissingPagination);
    };
    if limit < 1 || offset < 0 {
        return Err(ExploreError::InvalidPagination);
    }
    Ok(Page {
        limit: limit.min(MAX_PAGE_SIZE),
        offset,
    })
}

/// Reads optional exact-match `filters`. Unknown columns and non-string
/// values are rejected.
pub fn parse_filters(body: &Value) -> Result<Vec<(&'static str, String)>, ExploreError> {
    let filters = match body.get("filters") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(filters)) => filters,
        Some(_) => return Err(ExploreError::UnsupportedFilter("filters".to_string())),
    };
    let mut parsed = Vec::with_capacity(filters.len());
    for (name, value) in filters {
        let column = FILTER_COLUMNS
            .iter()
            .find(|column| **column == name.as_str())
            .ok_or_else(|| ExploreError::UnsupportedFilter(name.clone()))?;
        let Value::String(value) = value else {
            return Err(ExploreError::UnsupportedFilter(name.clone()));
        };
        parsed.push((*column, value.clone()));
    }
    Ok(parsed)
}

fn integer_field(value: &Value, field: &str) -> Option<i64> {
    let Value::Number(number) = value.get(field)? else {
        return None;
    };
    if let Some(integer) = number.as_i64() {
        return Some(integer);
    }
    // Integral values beyond i64 saturate, so a huge limit still clamps.
    let float = number.as_f64()?;
    (float.is_finite() && float.fract() == 0.0).then_some(float as i64)
}

/// Handle to the explore database, opened read-only.
#[derive(Clone)]
pub struct DrugDiseaseStore {
    conn: Arc<Mutex<Connection>>,
}

impl DrugDiseaseStore {
    pub fn open(path: &Path) -> Result<Self, ExploreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn page(
        &self,
        filters: Vec<(&'static str, String)>,
        page: Page,
    ) -> Result<DrugDiseasePage, ExploreError> {
        let conn = Arc::clone(&self.conn);
        let rows = tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            query_page(&conn, &filters, page)
        })
        .await
        .map_err(ExploreError::TaskJoin)??;
        Ok(DrugDiseasePage {
            rows,
            limit: page.limit,
            offset: page.offset,
        })
    }
}

fn query_page(
    conn: &Connection,
    filters: &[(&'static str, String)],
    page: Page,
) -> Result<Vec<Map<String, Value>>, ExploreError> {
    let mut sql = String::from("SELECT * FROM drug_disease_pairs");
    if !filters.is_empty() {
        let clauses = filters
            .iter()
            .map(|(column, _)| format!("{column} = ?"))
            .collect::<Vec<_>>();
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY score DESC LIMIT ? OFFSET ?");

    let mut params = filters
        .iter()
        .map(|(_, value)| SqlValue::Text(value.clone()))
        .collect::<Vec<_>>();
    params.push(SqlValue::Integer(page.limit));
    params.push(SqlValue::Integer(page.offset));

    let mut statement = conn.prepare(&sql)?;
    let columns = statement
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let rows = statement.query_map(params_from_iter(params), |row| {
        let mut record = Map::new();
        for (index, column) in columns.iter().enumerate() {
            record.insert(column.clone(), json_value(row.get_ref(index)?));
        }
        Ok(record)
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(integer) => Value::from(integer),
        ValueRef::Real(real) => Number::from_f64(real).map_or(Value::Null, Value::Number),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|byte| Value::from(*byte)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pagination_bounds_are_enforced() {
        let err = parse_pagination(&json!({"pagination": {"offset": -1, "limit": 10}}))
            .expect_err("negative offset should fail");
        assert!(matches!(err, ExploreError::InvalidPagination));

        let err = parse_pagination(&json!({"pagination": {"offset": 0, "limit": 0}}))
            .expect_err("zero limit should fail");
        assert!(matches!(err, ExploreError::InvalidPagination));

        let page = parse_pagination(&json!({"pagination": {"offset": 0, "limit": 10000}}))
            .expect("large limit should be clamped");
        assert_eq!(page, Page { limit: 500, offset: 0 });

        for body in [
            json!({"pagination": {"offset": 0, "limit": 1e20}}),
            json!({"pagination": {"offset": 0, "limit": u64::MAX}}),
        ] {
            let page = parse_pagination(&body).expect("huge limit should be clamped");
            assert_eq!(page, Page { limit: 500, offset: 0 }, "{body}");
        }

        let err = parse_pagination(&json!({"pagination": {"offset": -1e20, "limit": 10}}))
            .expect_err("huge negative offset should fail");
        assert!(matches!(err, ExploreError::InvalidPagination));
    }

    #[test]
    fn pagination_requires_integers() {
        for body in [
            json!({}),
            json!({"pagination": {"offset": 0}}),
            json!({"pagination": {"offset": "0", "limit": 10}}),
            json!({"pagination": {"offset": 0, "limit": 2.5}}),
        ] {
            let err = parse_pagination(&body).expect_err("pagination should be rejected");
            assert!(matches!(err, ExploreError::MissingPagination), "{body}");
        }
        let page = parse_pagination(&json!({"pagination": {"offset": 20.0, "limit": 10}}))
            .expect("integral floats are integers");
        assert_eq!(page, Page { limit: 10, offset: 20 });
    }

    #[test]
    fn filters_are_whitelisted() {
        let filters = parse_filters(&json!({"filters": {"disease_name": "asthma"}}))
            .expect("known filter should parse");
        assert_eq!(filters, vec![("disease_name", "asthma".to_string())]);
        assert!(parse_filters(&json!({"filters": null})).expect("null filters").is_empty());

        let err = parse_filters(&json!({"filters": {"score; DROP TABLE": "x"}}))
            .expect_err("unknown column should fail");
        assert!(matches!(err, ExploreError::UnsupportedFilter(_)));
    }

    #[test]
    fn query_orders_by_score_and_applies_filters() {
        let conn = Connection::open_in_memory().expect("in-memory db should open");
        conn.execute_batch(
            "CREATE TABLE drug_disease_pairs (disease_name TEXT, drug_name TEXT, score REAL);
             INSERT INTO drug_disease_pairs VALUES ('asthma', 'albuterol', 0.9);
             INSERT INTO drug_disease_pairs VALUES ('asthma', 'montelukast', 0.95);
             INSERT INTO drug_disease_pairs VALUES ('gout', 'colchicine', 0.99);",
        )
        .expect("fixture should load");

        let rows = query_page(&conn, &[], Page { limit: 2, offset: 0 }).expect("query should run");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["drug_name"], json!("colchicine"));
        assert_eq!(rows[1]["drug_name"], json!("montelukast"));

        let rows = query_page(
            &conn,
            &[("disease_name", "asthma".to_string())],
            Page { limit: 10, offset: 1 },
        )
        .expect("filtered query should run");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["drug_name"], json!("albuterol"));
        assert_eq!(rows[0]["score"], json!(0.9));
    }
}
