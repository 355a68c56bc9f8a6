//! Column catalog: what the admin surface can show, search and filter per entity.
//!
//! Each entity is one SQL source (`t` is always the entity's own table) plus
//! named column expressions. Related-account lookups such as `user__email`
//! are plain columns resolved through joins.

use crate::models::enums::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Bool,
    Date,
    DateTime,
    /// Shows the related row's label; filters on the raw key.
    ForeignKey,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub expr: &'static str,
    pub kind: ColumnKind,
    /// Expression compared when filtering, when it differs from `expr`.
    pub filter_expr: Option<&'static str>,
}

impl Column {
    pub fn filter_target(&self) -> &'static str {
        self.filter_expr.unwrap_or(self.expr)
    }
}

#[derive(Debug)]
pub struct TableSpec {
    pub kind: EntityKind,
    pub source: &'static str,
    pub columns: &'static [Column],
}

impl TableSpec {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

const fn col(name: &'static str, expr: &'static str, kind: ColumnKind) -> Column {
    Column { name, expr, kind, filter_expr: None }
}

const fn fk(name: &'static str, label: &'static str, key: &'static str) -> Column {
    Column { name, expr: label, kind: ColumnKind::ForeignKey, filter_expr: Some(key) }
}

static USERS: TableSpec = TableSpec {
    kind: EntityKind::User,
    source: "users t",
    columns: &[
        col("id", "t.id", ColumnKind::Integer),
        col("email", "t.email", ColumnKind::Text),
        col("name", "t.name", ColumnKind::Text),
        col(
            "password",
            "CASE WHEN substr(t.password, 1, 1) = '!' THEN 'No password set.'
                  ELSE 'algorithm: ' || substr(t.password, 1, instr(t.password, '$') - 1) END",
            ColumnKind::Text,
        ),
        col("is_active", "t.is_active", ColumnKind::Bool),
        col("is_staff", "t.is_staff", ColumnKind::Bool),
        col("is_superuser", "t.is_superuser", ColumnKind::Bool),
        col("last_login", "t.last_login", ColumnKind::DateTime),
        col("date_joined", "t.date_joined", ColumnKind::DateTime),
    ],
};

static CUSTOMERS: TableSpec = TableSpec {
    kind: EntityKind::Customer,
    source: "customers t JOIN users u ON u.id = t.user_id",
    columns: &[
        col("id", "t.id", ColumnKind::Integer),
        fk("user", "u.email", "t.user_id"),
        col("user__email", "u.email", ColumnKind::Text),
        col("phone", "t.phone", ColumnKind::Text),
        col("address", "t.address", ColumnKind::Text),
    ],
};

static TEST_OPERATORS: TableSpec = TableSpec {
    kind: EntityKind::TestOperator,
    source: "test_operators t JOIN users u ON u.id = t.user_id",
    columns: &[
        col("id", "t.id", ColumnKind::Integer),
        fk("user", "u.email", "t.user_id"),
        col("user__email", "u.email", ColumnKind::Text),
        col("location", "t.location", ColumnKind::Text),
    ],
};

static GOVERNMENT_OFFICIALS: TableSpec = TableSpec {
    kind: EntityKind::GovernmentOfficial,
    source: "government_officials t JOIN users u ON u.id = t.user_id",
    columns: &[
        col("id", "t.id", ColumnKind::Integer),
        fk("user", "u.email", "t.user_id"),
        col("user__email", "u.email", ColumnKind::Text),
        col("region", "t.region", ColumnKind::Text),
    ],
};

static DOCTORS: TableSpec = TableSpec {
    kind: EntityKind::Doctor,
    source: "doctors t JOIN users u ON u.id = t.user_id",
    columns: &[
        col("id", "t.id", ColumnKind::Integer),
        fk("user", "u.email", "t.user_id"),
        col("user__email", "u.email", ColumnKind::Text),
        col("specialization", "t.specialization", ColumnKind::Text),
    ],
};

static DISEASES: TableSpec = TableSpec {
    kind: EntityKind::Disease,
    source: "diseases t",
    columns: &[
        col("id", "t.id", ColumnKind::Integer),
        col("name", "t.name", ColumnKind::Text),
        col("description", "t.description", ColumnKind::Text),
    ],
};

static APPOINTMENTS: TableSpec = TableSpec {
    kind: EntityKind::Appointment,
    source: "appointments t
             JOIN customers c ON c.id = t.customer_id
             JOIN users cu ON cu.id = c.user_id
             JOIN test_operators o ON o.id = t.test_operator_id
             JOIN users ou ON ou.id = o.user_id",
    columns: &[
        col("id", "t.id", ColumnKind::Integer),
        fk("customer", "cu.email", "t.customer_id"),
        col("customer__user__email", "cu.email", ColumnKind::Text),
        fk("test_operator", "ou.email", "t.test_operator_id"),
        col("test_operator__user__email", "ou.email", ColumnKind::Text),
        col("scheduled_time", "t.scheduled_time", ColumnKind::DateTime),
        col("status", "t.status", ColumnKind::Text),
    ],
};

static TEST_RESULTS: TableSpec = TableSpec {
    kind: EntityKind::TestResult,
    source: "test_results t JOIN diseases d ON d.id = t.disease_id",
    columns: &[
        col("id", "t.id", ColumnKind::Integer),
        col("appointment", "t.appointment_id", ColumnKind::Integer),
        col("result", "t.result", ColumnKind::Text),
        fk("disease", "COALESCE(d.name, '')", "t.disease_id"),
        col("disease_tested", "COALESCE(d.name, '')", ColumnKind::Text),
    ],
};

static STATISTICS: TableSpec = TableSpec {
    kind: EntityKind::Statistics,
    source: "statistics t",
    columns: &[
        col("id", "t.id", ColumnKind::Integer),
        col("region", "t.region", ColumnKind::Text),
        col("total_tests", "t.total_tests", ColumnKind::Integer),
        col("positive_results", "t.positive_results", ColumnKind::Integer),
        col("date", "t.date", ColumnKind::Date),
    ],
};

static COMMUNICATIONS: TableSpec = TableSpec {
    kind: EntityKind::Communication,
    source: "communications t
             JOIN customers c ON c.id = t.customer_id
             JOIN users cu ON cu.id = c.user_id
             JOIN government_officials g ON g.id = t.government_official_id
             JOIN users gu ON gu.id = g.user_id",
    columns: &[
        col("id", "t.id", ColumnKind::Integer),
        fk("customer", "cu.email", "t.customer_id"),
        col("customer__user__email", "cu.email", ColumnKind::Text),
        fk("government_official", "gu.email", "t.government_official_id"),
        col("government_official__user__email", "gu.email", ColumnKind::Text),
        col("message_content", "t.message_content", ColumnKind::Text),
        col("timestamp", "t.timestamp", ColumnKind::DateTime),
    ],
};

pub fn table_spec(kind: EntityKind) -> &'static TableSpec {
    match kind {
        EntityKind::User => &USERS,
        EntityKind::Customer => &CUSTOMERS,
        EntityKind::TestOperator => &TEST_OPERATORS,
        EntityKind::GovernmentOfficial => &GOVERNMENT_OFFICIALS,
        EntityKind::Doctor => &DOCTORS,
        EntityKind::Disease => &DISEASES,
        EntityKind::Appointment => &APPOINTMENTS,
        EntityKind::TestResult => &TEST_RESULTS,
        EntityKind::Statistics => &STATISTICS,
        EntityKind::Communication => &COMMUNICATIONS,
    }
}
