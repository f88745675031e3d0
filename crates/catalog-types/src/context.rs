//! Request-scoped consideration context.
//!
//! Pricing and active-date decisions made by catalog collaborators depend on
//! the current locale, currency and pricing considerations. The rebuild
//! pipeline passes this context explicitly; only the orchestrator saves and
//! restores the process-wide copy.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::field::Locale;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Locale of the current request
    #[serde(default)]
    pub locale: Option<Locale>,

    /// ISO currency code
    #[serde(default)]
    pub currency: Option<String>,

    /// Pricing considerations (customer segment, price list, ...)
    #[serde(default)]
    pub pricing_considerations: BTreeMap<String, String>,

    /// Instant used by active-date checks instead of the wall clock
    #[serde(default)]
    pub active_date_override: Option<DateTime<Utc>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_pricing_consideration(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pricing_considerations.insert(key.into(), value.into());
        self
    }
}
