//! Slippage protection bounds and transaction deadlines.
//!
//! Both adjustments round the *adjustment* down: `min_output_for` subtracts
//! `floor(expected * bps / 10000)` and `max_input_for` adds the same floored amount. The bound
//! is therefore never more lenient than the requested tolerance on the output side, and at most
//! one minor unit tighter on the input side.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    errors::{SwapError, SwapResult},
    models::Amount,
};

/// Basis points in 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// A protection bound derived from a reference amount and a tolerance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageBound {
    pub reference_amount: Amount,
    pub tolerance_bps: u32,
    pub bounded_amount: Amount,
}

fn check_tolerance(tolerance_bps: u32) -> SwapResult<()> {
    if tolerance_bps > BPS_DENOMINATOR {
        return Err(SwapError::InvalidToleranceRange(tolerance_bps));
    }
    Ok(())
}

fn adjustment(expected: &Amount, tolerance_bps: u32) -> Amount {
    expected * Amount::from(tolerance_bps) / Amount::from(BPS_DENOMINATOR)
}

/// Minimum acceptable output: `expected - floor(expected * bps / 10000)`.
pub fn min_output_for(expected: &Amount, tolerance_bps: u32) -> SwapResult<Amount> {
    check_tolerance(tolerance_bps)?;
    Ok(expected - adjustment(expected, tolerance_bps))
}

/// Maximum acceptable input: `expected + floor(expected * bps / 10000)`.
pub fn max_input_for(expected: &Amount, tolerance_bps: u32) -> SwapResult<Amount> {
    check_tolerance(tolerance_bps)?;
    Ok(expected + adjustment(expected, tolerance_bps))
}

/// Absolute unix timestamp `buffer_seconds` after `now_seconds`.
pub fn deadline_from(now_seconds: u64, buffer_seconds: u64) -> SwapResult<u64> {
    if buffer_seconds == 0 {
        return Err(SwapError::InvalidDeadlineBuffer(buffer_seconds));
    }
    now_seconds
        .checked_add(buffer_seconds)
        .ok_or(SwapError::InvalidDeadlineBuffer(buffer_seconds))
}

/// Tolerance and deadline settings applied to every submitted swap or deposit.
///
/// Defaults to 0.5% tolerance and a 20 minute deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSlippagePolicy", into = "RawSlippagePolicy")]
pub struct SlippagePolicy {
    tolerance_bps: u32,
    deadline_buffer: Duration,
}

impl SlippagePolicy {
    pub fn new(tolerance_bps: u32, deadline_buffer: Duration) -> SwapResult<Self> {
        check_tolerance(tolerance_bps)?;
        if deadline_buffer.as_secs() == 0 {
            return Err(SwapError::InvalidDeadlineBuffer(deadline_buffer.as_secs()));
        }
        Ok(Self { tolerance_bps, deadline_buffer })
    }

    pub fn with_tolerance_bps(self, tolerance_bps: u32) -> SwapResult<Self> {
        Self::new(tolerance_bps, self.deadline_buffer)
    }

    pub fn with_deadline_buffer(self, deadline_buffer: Duration) -> SwapResult<Self> {
        Self::new(self.tolerance_bps, deadline_buffer)
    }

    pub fn tolerance_bps(&self) -> u32 {
        self.tolerance_bps
    }

    pub fn deadline_buffer(&self) -> Duration {
        self.deadline_buffer
    }

    pub fn min_output(&self, expected: &Amount) -> SlippageBound {
        SlippageBound {
            reference_amount: expected.clone(),
            tolerance_bps: self.tolerance_bps,
            bounded_amount: expected - adjustment(expected, self.tolerance_bps),
        }
    }

    pub fn max_input(&self, expected: &Amount) -> SlippageBound {
        SlippageBound {
            reference_amount: expected.clone(),
            tolerance_bps: self.tolerance_bps,
            bounded_amount: expected + adjustment(expected, self.tolerance_bps),
        }
    }

    pub fn deadline(&self, now_seconds: u64) -> SwapResult<u64> {
        deadline_from(now_seconds, self.deadline_buffer.as_secs())
    }
}

impl Default for SlippagePolicy {
    fn default() -> Self {
        Self { tolerance_bps: 50, deadline_buffer: Duration::from_secs(20 * 60) }
    }
}

#[derive(Serialize, Deserialize)]
struct RawSlippagePolicy {
    tolerance_bps: u32,
    deadline_buffer_secs: u64,
}

impl From<SlippagePolicy> for RawSlippagePolicy {
    fn from(policy: SlippagePolicy) -> Self {
        Self {
            tolerance_bps: policy.tolerance_bps,
            deadline_buffer_secs: policy.deadline_buffer.as_secs(),
        }
    }
}

impl TryFrom<RawSlippagePolicy> for SlippagePolicy {
    type Error = SwapError;

    fn try_from(raw: RawSlippagePolicy) -> Result<Self, Self::Error> {
        Self::new(raw.tolerance_bps, Duration::from_secs(raw.deadline_buffer_secs))
    }
}
