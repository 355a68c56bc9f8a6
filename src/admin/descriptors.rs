//! View descriptors: one registry entry per administered entity.

use serde::Serialize;

use crate::models::enums::EntityKind;

/// Blank child forms offered below each inline.
pub const DEFAULT_INLINE_EXTRA: usize = 1;

/// Ordering key. A leading `-` sorts descending.
pub type OrderKey = &'static str;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fieldset {
    pub title: Option<&'static str>,
    pub fields: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineDescriptor {
    pub child: EntityKind,
    /// Child field referencing the parent row.
    pub parent_key: &'static str,
    pub fields: Vec<&'static str>,
    pub extra: usize,
}

impl InlineDescriptor {
    pub fn new(child: EntityKind, parent_key: &'static str, fields: &[&'static str]) -> Self {
        Self {
            child,
            parent_key,
            fields: fields.to_vec(),
            extra: DEFAULT_INLINE_EXTRA,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewDescriptor {
    pub entity: EntityKind,
    pub list_display: Vec<&'static str>,
    pub search_fields: Vec<&'static str>,
    pub list_filter: Vec<&'static str>,
    pub ordering: Vec<OrderKey>,
    pub inlines: Vec<InlineDescriptor>,
    pub fieldsets: Vec<Fieldset>,
}

impl ViewDescriptor {
    pub fn new(entity: EntityKind, list_display: &[&'static str]) -> Self {
        Self {
            entity,
            list_display: list_display.to_vec(),
            search_fields: Vec::new(),
            list_filter: Vec::new(),
            ordering: Vec::new(),
            inlines: Vec::new(),
            fieldsets: Vec::new(),
        }
    }

    pub fn search(mut self, fields: &[&'static str]) -> Self {
        self.search_fields = fields.to_vec();
        self
    }

    pub fn filter(mut self, fields: &[&'static str]) -> Self {
        self.list_filter = fields.to_vec();
        self
    }

    pub fn order_by(mut self, keys: &[OrderKey]) -> Self {
        self.ordering = keys.to_vec();
        self
    }

    pub fn inline(mut self, inline: InlineDescriptor) -> Self {
        self.inlines.push(inline);
        self
    }

    pub fn fieldset(mut self, title: Option<&'static str>, fields: &[&'static str]) -> Self {
        self.fieldsets.push(Fieldset {
            title,
            fields: fields.to_vec(),
        });
        self
    }

    /// Fields shown on the change view: fieldsets when declared, else the list columns.
    pub fn detail_fieldsets(&self) -> Vec<Fieldset> {
        if self.fieldsets.is_empty() {
            vec![Fieldset {
                title: None,
                fields: self.list_display.clone(),
            }]
        } else {
            self.fieldsets.clone()
        }
    }

    /// Every field name this descriptor refers to on its own entity.
    pub(crate) fn referenced_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.list_display
            .iter()
            .chain(&self.search_fields)
            .chain(&self.list_filter)
            .copied()
            .chain(self.ordering.iter().copied().map(strip_direction))
            .chain(self.fieldsets.iter().flat_map(|f| f.fields.iter().copied()))
    }
}

/// `-date` → `date`.
pub(crate) fn strip_direction(key: OrderKey) -> &'static str {
    key.strip_prefix('-').unwrap_or(key)
}

fn appointment_inline(parent_key: &'static str) -> InlineDescriptor {
    InlineDescriptor::new(
        EntityKind::Appointment,
        parent_key,
        &["scheduled_time", "test_operator", "status"],
    )
}

fn communication_inline(parent_key: &'static str) -> InlineDescriptor {
    InlineDescriptor::new(
        EntityKind::Communication,
        parent_key,
        &["government_official", "message_content", "timestamp"],
    )
}

/// The registry the site is configured with by default.
pub fn default_descriptors() -> Vec<ViewDescriptor> {
    vec![
        ViewDescriptor::new(EntityKind::User, &["email", "name", "is_superuser"])
            .search(&["name"])
            .order_by(&["id"])
            .fieldset(None, &["email", "password"])
            .fieldset(Some("Personal info"), &["name"])
            .fieldset(Some("Permissions"), &["is_active", "is_staff", "is_superuser"])
            .fieldset(Some("Important dates"), &["last_login", "date_joined"]),
        ViewDescriptor::new(EntityKind::Customer, &["user", "phone"])
            .search(&["user__email", "phone"])
            .inline(appointment_inline("customer"))
            .inline(communication_inline("customer")),
        ViewDescriptor::new(EntityKind::TestOperator, &["user", "location"])
            .search(&["user__email", "location"])
            .inline(appointment_inline("test_operator")),
        ViewDescriptor::new(EntityKind::GovernmentOfficial, &["user", "region"])
            .search(&["user__email", "region"])
            .inline(communication_inline("government_official")),
        ViewDescriptor::new(EntityKind::Doctor, &["user", "specialization"])
            .search(&["user__email", "specialization"]),
        ViewDescriptor::new(
            EntityKind::Appointment,
            &["customer", "test_operator", "scheduled_time", "status"],
        )
        .filter(&["scheduled_time", "status"])
        .inline(InlineDescriptor::new(
            EntityKind::TestResult,
            "appointment",
            &["result", "disease_tested"],
        )),
        ViewDescriptor::new(
            EntityKind::Statistics,
            &["region", "total_tests", "positive_results", "date"],
        )
        .filter(&["region", "date"]),
        ViewDescriptor::new(
            EntityKind::Communication,
            &["customer", "government_official", "timestamp"],
        )
        .filter(&["timestamp", "government_official"])
        .search(&["customer__user__email", "government_official__user__email"]),
    ]
}
