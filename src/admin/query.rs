//! Changelist and change-view queries.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::{Map, Value};

use super::catalog::{table_spec, Column, ColumnKind, TableSpec};
use super::descriptors::{strip_direction, ViewDescriptor};
use super::{AdminError, LIST_PER_PAGE};
use crate::db::repository::DATE_FORMAT;
use crate::models::enums::EntityKind;

/// Query-string keys with a meaning of their own; everything else is a filter.
pub const SEARCH_PARAM: &str = "q";
pub const PAGE_PARAM: &str = "page";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeListQuery {
    pub search: Option<String>,
    pub filters: BTreeMap<String, String>,
    /// 1-based.
    pub page: usize,
}

impl Default for ChangeListQuery {
    fn default() -> Self {
        Self {
            search: None,
            filters: BTreeMap::new(),
            page: 1,
        }
    }
}

impl ChangeListQuery {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    /// Split raw query-string pairs into search, page and filters.
    pub fn from_params(params: BTreeMap<String, String>) -> Result<Self, AdminError> {
        let mut query = Self::default();
        for (key, value) in params {
            match key.as_str() {
                SEARCH_PARAM => query.search = Some(value).filter(|v| !v.trim().is_empty()),
                PAGE_PARAM => {
                    query.page = value
                        .trim()
                        .parse()
                        .map_err(|_| AdminError::InvalidPage(value.clone()))?;
                }
                _ => {
                    query.filters.insert(key, value);
                }
            }
        }
        Ok(query)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeList {
    pub entity: EntityKind,
    pub columns: Vec<&'static str>,
    /// One object per row, keyed by column plus `id`.
    pub rows: Vec<Value>,
    pub total: i64,
    pub page: usize,
    pub pages: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldsetView {
    pub title: Option<&'static str>,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineView {
    pub entity: EntityKind,
    pub fields: Vec<&'static str>,
    pub rows: Vec<Value>,
    pub extra: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeView {
    pub entity: EntityKind,
    pub id: i64,
    pub fieldsets: Vec<FieldsetView>,
    pub inlines: Vec<InlineView>,
}

/// One page of rows matching the search terms and filters.
pub fn changelist(
    conn: &Connection,
    descriptor: &ViewDescriptor,
    query: &ChangeListQuery,
) -> Result<ChangeList, AdminError> {
    if query.page == 0 {
        return Err(AdminError::InvalidPage(query.page.to_string()));
    }
    let spec = table_spec(descriptor.entity);
    let columns = resolve_columns(spec, &descriptor.list_display)?;

    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();
    search_conditions(spec, descriptor, query.search.as_deref(), &mut conditions, &mut params)?;
    filter_conditions(spec, descriptor, &query.filters, &mut conditions, &mut params)?;

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}{}", spec.source, where_clause),
        rusqlite::params_from_iter(params.iter()),
        |row| row.get(0),
    )?;

    let pages = (total.max(0) as usize).div_ceil(LIST_PER_PAGE).max(1);
    if query.page > pages {
        return Err(AdminError::InvalidPage(query.page.to_string()));
    }

    let sql = format!(
        "SELECT t.id, {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
        select_list(&columns),
        spec.source,
        where_clause,
        order_clause(spec, descriptor)?,
        LIST_PER_PAGE,
        (query.page - 1) * LIST_PER_PAGE,
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            row_object(row, &columns)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ChangeList {
        entity: descriptor.entity,
        columns: descriptor.list_display.clone(),
        rows,
        total,
        page: query.page,
        pages,
    })
}

/// One row grouped into fieldsets, plus its inline children.
pub fn change_view(
    conn: &Connection,
    descriptor: &ViewDescriptor,
    id: i64,
) -> Result<ChangeView, AdminError> {
    let spec = table_spec(descriptor.entity);
    let fieldsets = descriptor.detail_fieldsets();
    let names: Vec<&'static str> = fieldsets.iter().flat_map(|f| f.fields.iter().copied()).collect();
    let columns = resolve_columns(spec, &names)?;

    let sql = format!(
        "SELECT t.id, {} FROM {} WHERE t.id = ?1",
        select_list(&columns),
        spec.source
    );
    let row = conn
        .query_row(&sql, [id], |row| row_object(row, &columns))
        .optional()?
        .ok_or(AdminError::NotFound {
            entity: descriptor.entity,
            id,
        })?;

    let fieldsets = fieldsets
        .into_iter()
        .map(|set| FieldsetView {
            title: set.title,
            fields: set
                .fields
                .iter()
                .map(|f| (f.to_string(), row.get(*f).cloned().unwrap_or(Value::Null)))
                .collect(),
        })
        .collect();

    let mut inlines = Vec::with_capacity(descriptor.inlines.len());
    for inline in &descriptor.inlines {
        let child = table_spec(inline.child);
        let columns = resolve_columns(child, &inline.fields)?;
        let parent = column(child, inline.parent_key)?;
        let sql = format!(
            "SELECT t.id, {} FROM {} WHERE {} = ?1 ORDER BY t.id",
            select_list(&columns),
            child.source,
            parent.filter_target()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([id], |row| row_object(row, &columns))?
            .collect::<Result<Vec<_>, _>>()?;
        inlines.push(InlineView {
            entity: inline.child,
            fields: inline.fields.clone(),
            rows,
            extra: inline.extra,
        });
    }

    Ok(ChangeView {
        entity: descriptor.entity,
        id,
        fieldsets,
        inlines,
    })
}

fn column<'a>(spec: &'a TableSpec, name: &str) -> Result<&'a Column, AdminError> {
    spec.column(name).ok_or_else(|| AdminError::UnknownField {
        entity: spec.kind,
        field: name.to_string(),
    })
}

fn resolve_columns<'a>(spec: &'a TableSpec, names: &[&str]) -> Result<Vec<&'a Column>, AdminError> {
    names.iter().map(|name| column(spec, name)).collect()
}

fn select_list(columns: &[&Column]) -> String {
    columns
        .iter()
        .map(|c| c.expr)
        .collect::<Vec<_>>()
        .join(", ")
}

fn search_conditions(
    spec: &TableSpec,
    descriptor: &ViewDescriptor,
    search: Option<&str>,
    conditions: &mut Vec<String>,
    params: &mut Vec<SqlValue>,
) -> Result<(), AdminError> {
    let Some(search) = search else {
        return Ok(());
    };
    if descriptor.search_fields.is_empty() {
        return Ok(());
    }
    let fields = resolve_columns(spec, &descriptor.search_fields)?;

    // Each term must hit at least one search field.
    for term in search.split_whitespace() {
        params.push(SqlValue::Text(format!("%{}%", escape_like(term))));
        let placeholder = params.len();
        let any_field = fields
            .iter()
            .map(|c| format!("{} LIKE ?{placeholder} ESCAPE '\\'", c.expr))
            .collect::<Vec<_>>()
            .join(" OR ");
        conditions.push(format!("({any_field})"));
    }
    Ok(())
}

fn filter_conditions(
    spec: &TableSpec,
    descriptor: &ViewDescriptor,
    filters: &BTreeMap<String, String>,
    conditions: &mut Vec<String>,
    params: &mut Vec<SqlValue>,
) -> Result<(), AdminError> {
    for (name, raw) in filters {
        if !descriptor.list_filter.iter().any(|f| *f == name.as_str()) {
            return Err(AdminError::UnknownFilter {
                entity: descriptor.entity,
                filter: name.clone(),
            });
        }
        let column = column(spec, name)?;
        let invalid = || AdminError::InvalidFilterValue {
            filter: name.clone(),
            value: raw.clone(),
        };
        let target = column.filter_target();

        let value = match column.kind {
            ColumnKind::Text => SqlValue::Text(raw.clone()),
            ColumnKind::Integer | ColumnKind::ForeignKey => {
                SqlValue::Integer(raw.trim().parse().map_err(|_| invalid())?)
            }
            ColumnKind::Bool => SqlValue::Integer(parse_flag(raw).ok_or_else(invalid)?),
            ColumnKind::Date | ColumnKind::DateTime => {
                let day = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| invalid())?;
                SqlValue::Text(day.format(DATE_FORMAT).to_string())
            }
        };
        params.push(value);
        let placeholder = params.len();

        let condition = match column.kind {
            ColumnKind::DateTime => format!("date({target}) = ?{placeholder}"),
            _ => format!("{target} = ?{placeholder}"),
        };
        conditions.push(condition);
    }
    Ok(())
}

fn order_clause(spec: &TableSpec, descriptor: &ViewDescriptor) -> Result<String, AdminError> {
    if descriptor.ordering.is_empty() {
        return Ok("t.id DESC".into());
    }
    let mut keys = Vec::with_capacity(descriptor.ordering.len() + 1);
    for key in &descriptor.ordering {
        let direction = if key.starts_with('-') { "DESC" } else { "ASC" };
        keys.push(format!("{} {direction}", column(spec, strip_direction(key))?.expr));
    }
    keys.push("t.id ASC".into());
    Ok(keys.join(", "))
}

fn parse_flag(raw: &str) -> Option<i64> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(1),
        "0" | "false" | "no" => Some(0),
        _ => None,
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Column 0 is always `t.id`; the rest follow `columns`.
fn row_object(row: &rusqlite::Row<'_>, columns: &[&Column]) -> rusqlite::Result<Value> {
    let mut object = Map::with_capacity(columns.len() + 1);
    object.insert("id".into(), Value::from(row.get::<_, i64>(0)?));
    for (i, column) in columns.iter().enumerate() {
        let value = to_json(row.get_ref(i + 1)?, column.kind);
        object.insert(column.name.to_string(), value);
    }
    Ok(Value::Object(object))
}

fn to_json(value: ValueRef<'_>, kind: ColumnKind) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if kind == ColumnKind::Bool => Value::Bool(i != 0),
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{AdminSite, LoginWorkflow};
    use crate::db;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{NewCommunication, NewStatistics, NewTestResult};

    fn site() -> AdminSite {
        AdminSite::configure(LoginWorkflow::AdminCredentials).unwrap()
    }

    fn emails(list: &ChangeList, column: &str) -> Vec<String> {
        list.rows
            .iter()
            .map(|r| r[column].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn customer_search_matches_related_email_case_insensitively() {
        let conn = open_memory_database().unwrap();
        make_customer(&conn, "alice@farm.com");
        make_customer(&conn, "bob@orchard.com");

        let list = site()
            .changelist(&conn, EntityKind::Customer, &ChangeListQuery::search("ALICE"))
            .unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(emails(&list, "user"), vec!["alice@farm.com"]);
        assert_eq!(list.columns, vec!["user", "phone"]);
    }

    #[test]
    fn every_search_term_must_match_some_field() {
        let conn = open_memory_database().unwrap();
        make_customer(&conn, "alice@farm.com");
        make_customer(&conn, "bob@farm.com");

        let both = site()
            .changelist(&conn, EntityKind::Customer, &ChangeListQuery::search("farm +123456789"))
            .unwrap();
        assert_eq!(both.total, 2);

        let narrowed = site()
            .changelist(&conn, EntityKind::Customer, &ChangeListQuery::search("farm bob"))
            .unwrap();
        assert_eq!(emails(&narrowed, "user"), vec!["bob@farm.com"]);
    }

    #[test]
    fn like_wildcards_in_terms_are_literal() {
        let conn = open_memory_database().unwrap();
        make_customer(&conn, "alice@farm.com");
        let list = site()
            .changelist(&conn, EntityKind::Customer, &ChangeListQuery::search("%"))
            .unwrap();
        assert_eq!(list.total, 0);
    }

    #[test]
    fn default_order_is_newest_first_and_user_order_is_by_id() {
        let conn = open_memory_database().unwrap();
        make_customer(&conn, "first@x.com");
        make_customer(&conn, "second@x.com");

        let customers = site()
            .changelist(&conn, EntityKind::Customer, &ChangeListQuery::default())
            .unwrap();
        assert_eq!(emails(&customers, "user"), vec!["second@x.com", "first@x.com"]);

        let users = site()
            .changelist(&conn, EntityKind::User, &ChangeListQuery::default())
            .unwrap();
        assert_eq!(emails(&users, "email"), vec!["first@x.com", "second@x.com"]);
        assert_eq!(users.rows[0]["is_superuser"], Value::Bool(false));
    }

    #[test]
    fn datetime_filter_matches_calendar_day() {
        let conn = open_memory_database().unwrap();
        let customer = make_customer(&conn, "c@x.com");
        let operator = make_operator(&conn, "op@x.com", "Field 7");
        make_appointment(&conn, &customer, &operator, "2024-05-01 09:00:00");
        make_appointment(&conn, &customer, &operator, "2024-05-01 17:30:00");
        make_appointment(&conn, &customer, &operator, "2024-05-02 09:00:00");

        let query = ChangeListQuery::default().with_filter("scheduled_time", "2024-05-01");
        let list = site().changelist(&conn, EntityKind::Appointment, &query).unwrap();
        assert_eq!(list.total, 2);
        assert_eq!(list.rows[0]["test_operator"], "op@x.com");
        assert_eq!(list.rows[0]["customer"], "c@x.com");
    }

    #[test]
    fn foreign_key_filter_uses_official_id() {
        let conn = open_memory_database().unwrap();
        let customer = make_customer(&conn, "c@x.com");
        let north = make_official(&conn, "north@gov.org", "North");
        let south = make_official(&conn, "south@gov.org", "South");
        for official in [&north, &south, &north] {
            db::insert_communication(&conn, &NewCommunication {
                customer_id: customer.id,
                government_official_id: official.id,
                message_content: "Inspection due".into(),
                timestamp: at("2024-05-02 10:00:00"),
            })
            .unwrap();
        }

        let query = ChangeListQuery::default().with_filter("government_official", south.id.to_string());
        let list = site().changelist(&conn, EntityKind::Communication, &query).unwrap();
        assert_eq!(emails(&list, "government_official"), vec!["south@gov.org"]);

        let by_email = site()
            .changelist(&conn, EntityKind::Communication, &ChangeListQuery::search("north@"))
            .unwrap();
        assert_eq!(by_email.total, 2);
    }

    #[test]
    fn statistics_filter_by_region_and_date() {
        let conn = open_memory_database().unwrap();
        for (region, date) in [("North", "2024-05-01"), ("North", "2024-05-02"), ("South", "2024-05-01")] {
            db::insert_statistics(&conn, &NewStatistics {
                region: region.into(),
                total_tests: 10,
                positive_results: 2,
                date: NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            })
            .unwrap();
        }
        let query = ChangeListQuery::default()
            .with_filter("region", "North")
            .with_filter("date", "2024-05-01");
        let list = site().changelist(&conn, EntityKind::Statistics, &query).unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.rows[0]["total_tests"], 10);
    }

    #[test]
    fn undeclared_or_malformed_filters_are_rejected() {
        let conn = open_memory_database().unwrap();
        let unknown = ChangeListQuery::default().with_filter("phone", "+123456789");
        assert!(matches!(
            site().changelist(&conn, EntityKind::Customer, &unknown),
            Err(AdminError::UnknownFilter { .. })
        ));

        let bad_day = ChangeListQuery::default().with_filter("date", "yesterday");
        assert!(matches!(
            site().changelist(&conn, EntityKind::Statistics, &bad_day),
            Err(AdminError::InvalidFilterValue { .. })
        ));
    }

    #[test]
    fn pages_hold_one_hundred_rows() {
        let conn = open_memory_database().unwrap();
        for i in 0..105 {
            db::insert_statistics(&conn, &NewStatistics {
                region: format!("R{i}"),
                total_tests: i,
                positive_results: 0,
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            })
            .unwrap();
        }

        let first = site()
            .changelist(&conn, EntityKind::Statistics, &ChangeListQuery::default())
            .unwrap();
        assert_eq!((first.rows.len(), first.pages, first.total), (100, 2, 105));

        let second = site()
            .changelist(&conn, EntityKind::Statistics, &ChangeListQuery::default().with_page(2))
            .unwrap();
        assert_eq!(second.rows.len(), 5);
        assert_eq!(second.rows[4]["region"], "R0");

        assert!(matches!(
            site().changelist(&conn, EntityKind::Statistics, &ChangeListQuery::default().with_page(3)),
            Err(AdminError::InvalidPage(_))
        ));
    }

    #[test]
    fn empty_changelist_has_one_page() {
        let conn = open_memory_database().unwrap();
        let list = site()
            .changelist(&conn, EntityKind::Doctor, &ChangeListQuery::default())
            .unwrap();
        assert_eq!((list.total, list.pages), (0, 1));
    }

    #[test]
    fn query_params_split_into_search_page_and_filters() {
        let params: BTreeMap<String, String> = [
            ("q", "alice"),
            ("page", "2"),
            ("status", "scheduled"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let query = ChangeListQuery::from_params(params).unwrap();
        assert_eq!(query.search.as_deref(), Some("alice"));
        assert_eq!(query.page, 2);
        assert_eq!(query.filters.get("status").map(String::as_str), Some("scheduled"));

        let bad: BTreeMap<String, String> = [("page".to_string(), "two".to_string())].into();
        assert!(matches!(ChangeListQuery::from_params(bad), Err(AdminError::InvalidPage(_))));
    }

    #[test]
    fn user_change_view_groups_fieldsets() {
        let conn = open_memory_database().unwrap();
        let user = make_user(&conn, "ann@x.com");
        let view = site().change_view(&conn, EntityKind::User, user.id).unwrap();

        let titles: Vec<_> = view.fieldsets.iter().map(|f| f.title).collect();
        assert_eq!(
            titles,
            vec![None, Some("Personal info"), Some("Permissions"), Some("Important dates")]
        );
        assert_eq!(view.fieldsets[0].fields["email"], "ann@x.com");
        assert_eq!(view.fieldsets[0].fields["password"], "No password set.");
        assert!(view.inlines.is_empty());
    }

    #[test]
    fn customer_change_view_lists_inline_children() {
        let conn = open_memory_database().unwrap();
        let customer = make_customer(&conn, "c@x.com");
        let other = make_customer(&conn, "other@x.com");
        let operator = make_operator(&conn, "op@x.com", "Field 7");
        make_appointment(&conn, &customer, &operator, "2024-05-01 09:00:00");
        make_appointment(&conn, &other, &operator, "2024-05-01 10:00:00");

        let view = site().change_view(&conn, EntityKind::Customer, customer.id).unwrap();
        assert_eq!(view.fieldsets.len(), 1);
        assert_eq!(view.fieldsets[0].fields["user"], "c@x.com");

        let appointments = &view.inlines[0];
        assert_eq!(appointments.entity, EntityKind::Appointment);
        assert_eq!(appointments.rows.len(), 1);
        assert_eq!(appointments.rows[0]["test_operator"], "op@x.com");
        assert_eq!(appointments.rows[0]["scheduled_time"], "2024-05-01 09:00:00");
        assert_eq!(appointments.extra, 1);

        let communications = &view.inlines[1];
        assert_eq!(communications.entity, EntityKind::Communication);
        assert!(communications.rows.is_empty());
    }

    #[test]
    fn appointment_change_view_derives_disease_label() {
        let conn = open_memory_database().unwrap();
        let customer = make_customer(&conn, "c@x.com");
        let operator = make_operator(&conn, "op@x.com", "Field 7");
        let appointment = make_appointment(&conn, &customer, &operator, "2024-05-01 09:00:00");
        let disease = make_disease(&conn, "Fire blight");
        db::insert_test_result(&conn, &NewTestResult {
            appointment_id: appointment.id,
            result: "positive".into(),
            disease_id: disease.id,
        })
        .unwrap();

        let view = site().change_view(&conn, EntityKind::Appointment, appointment.id).unwrap();
        let results = &view.inlines[0];
        assert_eq!(results.rows[0]["disease_tested"], "Fire blight");
        assert_eq!(results.rows[0]["result"], "positive");
    }

    #[test]
    fn password_column_shows_only_the_algorithm() {
        use crate::accounts::{create_user, Registration};
        use crate::crypto::PasswordHasher;

        let conn = open_memory_database().unwrap();
        let user = create_user(&conn, &PasswordHasher::new(1_000), &Registration::new("ann@x.com", "pw"))
            .unwrap();
        let view = site().change_view(&conn, EntityKind::User, user.id).unwrap();
        assert_eq!(view.fieldsets[0].fields["password"], "algorithm: pbkdf2_sha256");
    }

    #[test]
    fn missing_row_is_not_found() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            site().change_view(&conn, EntityKind::Doctor, 42),
            Err(AdminError::NotFound { entity: EntityKind::Doctor, id: 42 })
        ));
    }
}
