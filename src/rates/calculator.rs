use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::core::errors::{ServiceError, ServiceResult};
use crate::service::traits::RateCalculation;

/// Decimal places kept by [`RateCalculation::apy_to_apr`].
const APR_SCALE: u32 = 12;

/// Periodic compounding between APR and APY.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompoundingRateCalculator;

impl CompoundingRateCalculator {
    pub fn new() -> Self {
        Self
    }
}

fn checked_powu(base: Decimal, mut exp: u32) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    let mut factor = base;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.checked_mul(factor)?;
        }
        exp >>= 1;
        if exp > 0 {
            factor = factor.checked_mul(factor)?;
        }
    }
    Some(result)
}

fn overflow(what: &str, value: Decimal) -> ServiceError {
    ServiceError::InvalidInput(format!("{} {} overflows", what, value))
}

fn require_periods(periods: u32) -> ServiceResult<Decimal> {
    if periods == 0 {
        return Err(ServiceError::InvalidInput("compounding periods must be > 0".into()));
    }
    Ok(Decimal::from(periods))
}

impl RateCalculation for CompoundingRateCalculator {
    fn apr_to_apy(&self, apr: Decimal, periods: u32) -> ServiceResult<Decimal> {
        let n = require_periods(periods)?;
        let per_period = apr
            .checked_div(n)
            .and_then(|rate| Decimal::ONE.checked_add(rate))
            .ok_or_else(|| overflow("apr", apr))?;
        if per_period < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(format!("apr {} is below -{}", apr, n)));
        }
        checked_powu(per_period, periods)
            .and_then(|growth| growth.checked_sub(Decimal::ONE))
            .ok_or_else(|| overflow("apr", apr))
    }

    fn apy_to_apr(&self, apy: Decimal, periods: u32) -> ServiceResult<Decimal> {
        let n = require_periods(periods)?;
        if apy <= -Decimal::ONE {
            return Err(ServiceError::InvalidInput(format!("apy {} must be greater than -1", apy)));
        }
        let growth = Decimal::ONE
            .checked_add(apy)
            .and_then(|g| g.to_f64())
            .ok_or_else(|| overflow("apy", apy))?;
        let per_period = growth.powf(1.0 / f64::from(periods)) - 1.0;
        Decimal::from_f64(per_period)
            .and_then(|r| r.checked_mul(n))
            .map(|r| r.round_dp(APR_SCALE))
            .ok_or_else(|| ServiceError::InvalidInput(format!("apy {} out of range", apy)))
    }
}
