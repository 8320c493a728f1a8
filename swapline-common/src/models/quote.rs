use chrono::{NaiveDateTime, Utc};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::{route::Route, Amount};

/// The expected outcome of trading `input_amount` along `route`.
///
/// Quotes are immutable and superseded by the next quote request. A quote without a route and
/// with a zero output means "no route / no quote", never "you will receive nothing".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub input_amount: Amount,
    pub output_amount: Amount,
    pub route: Option<Route>,
    pub computed_at: NaiveDateTime,
}

impl Quote {
    pub fn new(input_amount: Amount, output_amount: Amount, route: Route) -> Self {
        Self { input_amount, output_amount, route: Some(route), computed_at: Utc::now().naive_utc() }
    }

    /// The fail-soft result used whenever a quote could not be produced.
    pub fn zero(input_amount: Amount) -> Self {
        Self {
            input_amount,
            output_amount: Amount::zero(),
            route: None,
            computed_at: Utc::now().naive_utc(),
        }
    }

    /// Whether this quote can back a transaction.
    pub fn is_executable(&self) -> bool {
        self.route.is_some() && !self.output_amount.is_zero() && !self.input_amount.is_zero()
    }
}
