use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::config::IrrSolverConfig;
use crate::error::CashFlowError;
use crate::types::{Money, Rate};
use crate::CashFlowResult;

/// (1 + rate)^periods
pub fn compound(rate: Rate, periods: u32) -> CashFlowResult<Decimal> {
    (Decimal::ONE + rate)
        .checked_powi(i64::from(periods))
        .ok_or_else(|| CashFlowError::InvalidInput {
            field: "rate".into(),
            reason: format!("(1 + {rate})^{periods} overflows"),
        })
}

/// 1 / (1 + rate)^periods
pub fn discount_factor(rate: Rate, periods: u32) -> CashFlowResult<Decimal> {
    if rate <= dec!(-1) {
        return Err(CashFlowError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    let growth = compound(rate, periods)?;
    if growth.is_zero() {
        return Err(CashFlowError::DivisionByZero {
            context: format!("discount factor at period {periods}"),
        });
    }
    Ok(Decimal::ONE / growth)
}

/// Net Present Value of a series of cash flows; the first flow is at t = 0.
///
/// Fails rather than panics when a discount factor or running sum leaves the
/// range `Decimal` can represent.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> CashFlowResult<Money> {
    if rate <= dec!(-1) {
        return Err(CashFlowError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| unrepresentable(rate, t))?;
        }
        if discount.is_zero() {
            return Err(CashFlowError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result = cf
            .checked_div(discount)
            .and_then(|pv| result.checked_add(pv))
            .ok_or_else(|| unrepresentable(rate, t))?;
    }

    Ok(result)
}

fn unrepresentable(rate: Rate, period: usize) -> CashFlowError {
    CashFlowError::InvalidInput {
        field: "rate".into(),
        reason: format!("NPV at rate {rate} is not representable at period {period}"),
    }
}

/// d(NPV)/d(rate) for the same series.
fn npv_derivative(rate: Rate, cash_flows: &[Money]) -> CashFlowResult<Decimal> {
    let one_plus_r = Decimal::ONE + rate;
    let mut result = Decimal::ZERO;
    for (t, cf) in cash_flows.iter().enumerate().skip(1) {
        let term = compound(rate, t as u32)?
            .checked_mul(one_plus_r)
            .filter(|denom| !denom.is_zero())
            .and_then(|denom| {
                Decimal::from(t as i64)
                    .checked_mul(*cf)
                    .and_then(|n| n.checked_div(denom))
            })
            .ok_or_else(|| unrepresentable(rate, t))?;
        result = result
            .checked_sub(term)
            .ok_or_else(|| unrepresentable(rate, t))?;
    }
    Ok(result)
}

/// Internal Rate of Return.
///
/// Newton-Raphson from `config.guess`, kept inside the configured bracket.
/// When Newton stalls or leaves the bracket, falls back to bisection over
/// `[lower_bound, upper_bound]`; a bracket without a sign change has no root.
/// Bracket ends where NPV cannot be represented (deep negative rates over
/// long horizons) are pulled toward zero until it can.
pub fn irr(cash_flows: &[Money], config: &IrrSolverConfig) -> CashFlowResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(CashFlowError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    if let Some(rate) = newton(cash_flows, config) {
        return Ok(rate);
    }
    bisection(cash_flows, config)
}

fn newton(cash_flows: &[Money], config: &IrrSolverConfig) -> Option<Rate> {
    let mut rate = config.guess;

    for _ in 0..config.max_newton_iterations {
        let npv_val = npv(rate, cash_flows).ok()?;
        if npv_val.abs() < config.tolerance {
            return Some(rate);
        }

        let dnpv = npv_derivative(rate, cash_flows).ok()?;
        if dnpv.is_zero() {
            return None;
        }

        let next = npv_val
            .checked_div(dnpv)
            .and_then(|step| rate.checked_sub(step))?;
        if next < config.lower_bound || next > config.upper_bound {
            return None;
        }
        rate = next;
    }

    None
}

/// Halvings of a bracket end toward zero before giving up on it.
const MAX_BRACKET_SHRINKS: u32 = 64;

/// Move `rate` toward zero until NPV there is representable.
fn representable_end(rate: Rate, cash_flows: &[Money]) -> Option<(Rate, Money)> {
    let mut rate = rate;
    for _ in 0..MAX_BRACKET_SHRINKS {
        if let Ok(value) = npv(rate, cash_flows) {
            return Some((rate, value));
        }
        rate /= dec!(2);
    }
    None
}

fn no_root(iterations: u32, last_delta: Decimal) -> CashFlowError {
    CashFlowError::NoConvergingRoot {
        function: "IRR".into(),
        iterations,
        last_delta,
    }
}

fn bisection(cash_flows: &[Money], config: &IrrSolverConfig) -> CashFlowResult<Rate> {
    let (mut lo, mut f_lo) = representable_end(config.lower_bound, cash_flows)
        .ok_or_else(|| no_root(0, Decimal::ZERO))?;
    let (mut hi, f_hi) = representable_end(config.upper_bound, cash_flows)
        .ok_or_else(|| no_root(0, Decimal::ZERO))?;

    if f_lo.abs() < config.tolerance {
        return Ok(lo);
    }
    if f_hi.abs() < config.tolerance {
        return Ok(hi);
    }
    if f_lo.is_sign_positive() == f_hi.is_sign_positive() {
        return Err(no_root(0, f_lo.abs().min(f_hi.abs())));
    }

    let mut last_delta = f_lo;
    for _ in 0..config.max_bisection_iterations {
        let mid = (lo + hi) / dec!(2);
        let f_mid = npv(mid, cash_flows).map_err(|_| no_root(0, last_delta))?;
        last_delta = f_mid;
        if f_mid.abs() < config.tolerance {
            return Ok(mid);
        }
        if f_mid.is_sign_positive() == f_lo.is_sign_positive() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    Err(no_root(
        config.max_newton_iterations + config.max_bisection_iterations,
        last_delta,
    ))
}
