use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dates::DateInput;
use crate::decimal::{Money, Rate};

/// an active loan held by a member
///
/// `interest` is an absolute currency amount fixed when the loan
/// application was approved, not a rate. Due dates arrive in whatever
/// textual encoding the record was written with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: String,
    pub member_id: String,
    pub loan_amount: Money,
    #[serde(default)]
    pub interest: Option<Money>,
    pub total_monthly_payment: Money,
    pub term_months: u32,
    #[serde(default)]
    pub due_date: Option<DateInput>,
    #[serde(default)]
    pub next_due_date: Option<DateInput>,
}

impl Loan {
    /// effective due date: `due_date` wins over `next_due_date`, first
    /// non-empty in that order
    pub fn effective_due(&self) -> Option<&DateInput> {
        self.due_date
            .as_ref()
            .filter(|d| !d.is_empty())
            .or_else(|| self.next_due_date.as_ref().filter(|d| !d.is_empty()))
    }

    /// advance the schedule one month after an approved payment
    pub fn advance_due(&mut self, today: NaiveDate) {
        let current = self
            .effective_due()
            .and_then(|d| crate::dates::parse_flexible(d).ok())
            .map(|dt| dt.date())
            .unwrap_or(today);
        let next = current
            .checked_add_months(Months::new(1))
            .unwrap_or(current);
        self.next_due_date = Some(DateInput::Text(next.format("%Y-%m-%d").to_string()));
        self.due_date = None;
    }
}

/// terms derived at approval time from a flat monthly rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub interest: Money,
    pub total_repayable: Money,
    pub total_monthly_payment: Money,
    pub first_due_date: NaiveDate,
}

impl LoanTerms {
    /// flat-rate schedule: interest fixed up front, equal installments
    ///
    /// `interest = principal * rate * term`, repaid in `term_months`
    /// equal payments; the first payment falls due one month after
    /// approval (clamped at month end).
    pub fn derive(
        principal: Money,
        term_months: u32,
        monthly_rate: Rate,
        approved_on: NaiveDate,
    ) -> Self {
        let interest = principal * (monthly_rate.as_decimal() * Decimal::from(term_months));
        let total_repayable = principal + interest;
        let total_monthly_payment = if term_months == 0 {
            total_repayable
        } else {
            total_repayable / Decimal::from(term_months)
        };
        let first_due_date = approved_on
            .checked_add_months(Months::new(1))
            .unwrap_or(approved_on);

        Self {
            interest,
            total_repayable,
            total_monthly_payment,
            first_due_date,
        }
    }

    /// book a loan record from these terms
    pub fn into_loan(self, loan_id: String, member_id: String, principal: Money, term_months: u32) -> Loan {
        Loan {
            loan_id,
            member_id,
            loan_amount: principal,
            interest: Some(self.interest),
            total_monthly_payment: self.total_monthly_payment,
            term_months,
            due_date: Some(DateInput::Text(
                self.first_due_date.format("%Y-%m-%d").to_string(),
            )),
            next_due_date: None,
        }
    }
}
