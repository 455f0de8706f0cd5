//! Attribute predicates applied on top of the radius cutoff.
//!
//! Flags with an equality index (`state`, `hasDelivery`, `isOpen`) are pushed
//! down to the store to cut the number of rows read. Every predicate is then
//! checked again in process after refinement, which is the authoritative
//! check and the only one that sees category membership.

use crate::entity::Business;
use crate::store::FieldFilter;
use serde::{Deserialize, Serialize};

/// Stored field names the filter pushes down.
pub const STATE_FIELD: &str = "state";
pub const HAS_DELIVERY_FIELD: &str = "hasDelivery";
pub const IS_OPEN_FIELD: &str = "isOpen";

/// Optional equality predicates supplied with a query. An absent predicate
/// always passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_delivery: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_open: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl AttributeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_has_delivery(mut self, has_delivery: bool) -> Self {
        self.has_delivery = Some(has_delivery);
        self
    }

    pub fn with_is_open(mut self, is_open: bool) -> Self {
        self.is_open = Some(is_open);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Category predicate in comparable form; blank categories are ignored.
    fn normalized_category(&self) -> Option<String> {
        self.category
            .as_deref()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
    }

    /// Equality filters the store can evaluate itself.
    pub fn pushdown(&self, require_active: bool) -> Vec<FieldFilter> {
        let mut filters = Vec::with_capacity(3);
        if require_active {
            filters.push(FieldFilter::equals(STATE_FIELD, true));
        }
        if let Some(has_delivery) = self.has_delivery {
            filters.push(FieldFilter::equals(HAS_DELIVERY_FIELD, has_delivery));
        }
        if let Some(is_open) = self.is_open {
            filters.push(FieldFilter::equals(IS_OPEN_FIELD, is_open));
        }
        filters
    }

    /// Whether a business satisfies every supplied predicate.
    ///
    /// ```rust
    /// use nearby::{AttributeFilter, Business};
    /// use serde_json::json;
    ///
    /// let business = Business {
    ///     categories: vec![json!({ "name": " Pizza " })],
    ///     is_open: true,
    ///     ..Default::default()
    /// };
    /// assert!(AttributeFilter::new().with_category("pizza").matches(&business));
    /// assert!(!AttributeFilter::new().with_category("sushi").matches(&business));
    /// ```
    pub fn matches(&self, business: &Business) -> bool {
        if self.has_delivery.is_some_and(|wanted| business.has_delivery != wanted) {
            return false;
        }
        if self.is_open.is_some_and(|wanted| business.is_open != wanted) {
            return false;
        }
        match self.normalized_category() {
            None => true,
            Some(wanted) => business
                .category_names()
                .any(|name| name.trim().to_lowercase() == wanted),
        }
    }

    /// Whether a business passes the filter and, when required, is active.
    pub fn admits(&self, business: &Business, require_active: bool) -> bool {
        (!require_active || business.state) && self.matches(business)
    }
}
