//! Step targets of the pricing chain.

use std::collections::HashMap;

use anyhow::Context as _;
use daisychain_core::{AppendixSet, Arg, MethodTable, ProtocolContext, StepTarget};
use tracing::debug;

use super::domain::{voucher_reduction, Article, Customer, Employee, Money, Voucher};
use super::{EMPLOYMENT, MARKETING};

// ---------------------------------------------------------------------------
// CustomerDirectory
// ---------------------------------------------------------------------------

/// Knows which customers are employees and which vouchers they hold, and
/// attaches that knowledge to the call as appendixes.
#[derive(Debug, Default)]
pub struct CustomerDirectory {
    employees: HashMap<String, Employee>,
    vouchers: HashMap<String, Vec<Voucher>>,
}

impl CustomerDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_employee(mut self, customer_id: impl Into<String>, employee: Employee) -> Self {
        self.employees.insert(customer_id.into(), employee);
        self
    }

    #[must_use]
    pub fn with_voucher(mut self, customer_id: impl Into<String>, voucher: Voucher) -> Self {
        self.vouchers.entry(customer_id.into()).or_default().push(voucher);
        self
    }

    /// Directory used by the demo binary: `c-100` is an employee with 10%
    /// discount, `c-200` holds two vouchers, `c-300` is both.
    #[must_use]
    pub fn sample() -> Self {
        Self::new()
            .with_employee(
                "c-100",
                Employee {
                    personnel_id: 4711,
                    discount_percent: 10,
                },
            )
            .with_voucher("c-200", Voucher::combinable("SPRING", Money::from_cents(500)))
            .with_voucher("c-200", Voucher::combinable("WELCOME", Money::from_cents(250)))
            .with_employee(
                "c-300",
                Employee {
                    personnel_id: 815,
                    discount_percent: 20,
                },
            )
            .with_voucher("c-300", Voucher::top_dog("VIP", Money::from_cents(1000)))
    }

    fn identify(
        &self,
        mut ctx: ProtocolContext<Money>,
        Arg(customer): Arg<Customer>,
    ) -> anyhow::Result<ProtocolContext<Money>> {
        if let Some(employee) = self.employees.get(&customer.id) {
            ctx.attach(EMPLOYMENT, employee.clone());
        }
        for voucher in self.vouchers.get(&customer.id).into_iter().flatten() {
            ctx.attach(MARKETING, voucher.clone());
        }
        debug!(customer = %customer.id, appendixes = ctx.appendixes().len(), "identified customer");
        Ok(ctx)
    }
}

impl StepTarget for CustomerDirectory {
    fn expose(methods: &mut MethodTable<Self>) {
        methods.method("identify", Self::identify);
    }

    fn target_name() -> &'static str {
        "CustomerDirectory"
    }
}

// ---------------------------------------------------------------------------
// Calculators
// ---------------------------------------------------------------------------

/// Starts the calculation with the article's list price.
#[derive(Debug, Default)]
pub struct BasePriceCalculator;

impl BasePriceCalculator {
    fn calculate_price(
        &self,
        ctx: ProtocolContext<Money>,
        Arg(article): Arg<Article>,
    ) -> anyhow::Result<ProtocolContext<Money>> {
        Ok(ctx.with_result(article.price))
    }
}

impl StepTarget for BasePriceCalculator {
    fn expose(methods: &mut MethodTable<Self>) {
        methods.method("calculatePrice", Self::calculate_price);
    }

    fn target_name() -> &'static str {
        "BasePriceCalculator"
    }
}

/// Grants the employee discount. Runs only for employees.
#[derive(Debug, Default)]
pub struct EmployeeDiscountCalculator;

impl EmployeeDiscountCalculator {
    fn calculate_price(
        &self,
        mut ctx: ProtocolContext<Money>,
        Arg(employee): Arg<Employee>,
    ) -> anyhow::Result<ProtocolContext<Money>> {
        let price = ctx
            .take_result()
            .context("employee discount needs a price to reduce")?;
        ctx.set_result(price.percent_off(employee.discount_percent));
        Ok(ctx)
    }
}

impl StepTarget for EmployeeDiscountCalculator {
    fn expose(methods: &mut MethodTable<Self>) {
        methods.method("calculatePrice", Self::calculate_price);
    }

    fn target_name() -> &'static str {
        "EmployeeDiscountCalculator"
    }
}

/// Redeems the customer's vouchers. Runs only if there is at least one.
#[derive(Debug, Default)]
pub struct VoucherDiscountCalculator;

impl VoucherDiscountCalculator {
    fn calculate_price(
        &self,
        mut ctx: ProtocolContext<Money>,
        vouchers: AppendixSet<Voucher>,
    ) -> anyhow::Result<ProtocolContext<Money>> {
        let price = ctx
            .take_result()
            .context("voucher discount needs a price to reduce")?;
        ctx.set_result(price.saturating_sub(voucher_reduction(&vouchers.0)));
        Ok(ctx)
    }
}

impl StepTarget for VoucherDiscountCalculator {
    fn expose(methods: &mut MethodTable<Self>) {
        methods.method("calculatePrice", Self::calculate_price);
    }

    fn target_name() -> &'static str {
        "VoucherDiscountCalculator"
    }
}
