use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dates::parse_or_today;
use crate::decimal::Money;
use crate::loans::Loan;

/// result of assessing a loan against its due date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyAssessment {
    pub overdue_days: u32,
    pub penalty: Money,
    pub total_due: Money,
    /// resolved due date, when the loan carried one
    pub due_date: Option<NaiveDate>,
    /// true when the due date was unparseable and "today" substituted;
    /// such an assessment never reports the loan overdue
    pub fell_back_to_today: bool,
}

/// assess overdue days and penalty for a loan as of `today`
///
/// Pure calendar-and-money arithmetic with no store dependency. A loan
/// due exactly today is not yet overdue; once overdue, each day accrues
/// `interest / period_days` of penalty, where the interest amount
/// resolves loan record first, then the member-level cached figure,
/// then zero. All outputs are rounded to cents.
pub fn assess_penalty(
    loan: &Loan,
    fallback_interest: Option<Money>,
    today: NaiveDate,
    period_days: u32,
) -> PenaltyAssessment {
    let monthly = loan.total_monthly_payment;

    let Some(due_input) = loan.effective_due() else {
        return PenaltyAssessment {
            overdue_days: 0,
            penalty: Money::ZERO,
            total_due: monthly,
            due_date: None,
            fell_back_to_today: false,
        };
    };

    let parsed = parse_or_today(due_input, today);
    let due = parsed.value.date();

    // strictly greater: a loan due today is not yet overdue
    if today <= due {
        return PenaltyAssessment {
            overdue_days: 0,
            penalty: Money::ZERO,
            total_due: monthly,
            due_date: Some(due),
            fell_back_to_today: parsed.fell_back,
        };
    }

    let overdue_days = (today - due).num_days().max(0) as u32;
    let interest = loan.interest.or(fallback_interest).unwrap_or(Money::ZERO);
    let period = period_days.max(1);
    let penalty = interest * (Decimal::from(overdue_days) / Decimal::from(period));

    PenaltyAssessment {
        overdue_days,
        penalty,
        total_due: monthly + penalty,
        due_date: Some(due),
        fell_back_to_today: parsed.fell_back,
    }
}
