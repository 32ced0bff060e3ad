use chrono::Duration;

/// Cart-level settings applied by the quote pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// How long a quoted cart stays valid for checkout.
    pub ttl: Duration,
    pub currency: String,
}

impl CartConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(24),
            currency: "USD".to_string(),
        }
    }
}
