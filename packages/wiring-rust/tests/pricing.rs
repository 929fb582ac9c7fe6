//! Pricing chain scenarios, wired in code and from the bundled configuration.

use std::sync::Arc;

use daisychain_core::{
    AppendixStore, Argument, CallArgs, ChainInterface, DispatchError, DispatcherFactory, StepSpec,
};
use daisychain_wiring::pricing::{
    wire_bundled, wire_price_calculator, Article, Customer, CustomerDirectory, Employee, EmployeeDiscountCalculator,
    Money, PriceCalculator, PriceCalculatorChain, Voucher, EMPLOYMENT, MARKETING,
};

fn lamp() -> Article {
    Article {
        id: "a-1".to_string(),
        name: "Desk lamp".to_string(),
        price: Money::from_cents(10_000),
    }
}

fn customer(id: &str) -> Customer {
    Customer {
        id: id.to_string(),
        name: format!("Customer {id}"),
    }
}

fn chains() -> Vec<PriceCalculatorChain> {
    let directory = Arc::new(CustomerDirectory::sample());
    vec![
        wire_price_calculator(Arc::clone(&directory)).unwrap(),
        wire_bundled(directory).unwrap(),
    ]
}

fn price(chain: &PriceCalculatorChain, customer_id: &str) -> Money {
    chain.calculate_price(lamp(), customer(customer_id)).unwrap().unwrap()
}

#[test]
fn unknown_customer_pays_list_price() {
    for chain in chains() {
        assert_eq!(price(&chain, "c-000"), Money::from_cents(10_000));
    }
}

#[test]
fn employee_gets_discount_and_voucher_step_is_skipped() {
    for chain in chains() {
        assert_eq!(price(&chain, "c-100"), Money::from_cents(9_000));
    }
}

#[test]
fn vouchers_add_up_and_employee_step_is_skipped() {
    for chain in chains() {
        assert_eq!(price(&chain, "c-200"), Money::from_cents(9_250));
    }
}

#[test]
fn all_steps_apply_in_order() {
    // 100.00 - 20% = 80.00, then the top-dog voucher takes 10.00 off.
    for chain in chains() {
        assert_eq!(price(&chain, "c-300"), Money::from_cents(7_000));
    }
}

#[test]
fn vouchers_never_make_the_price_negative() {
    let directory =
        CustomerDirectory::new().with_voucher("c-9", Voucher::combinable("HUGE", Money::from_cents(50_000)));
    let chain = wire_price_calculator(Arc::new(directory)).unwrap();
    assert_eq!(price(&chain, "c-9"), Money::ZERO);
}

#[test]
fn largest_list_price_is_discounted_without_overflow() {
    let expensive = Article {
        price: Money::from_cents(i64::MAX),
        ..lamp()
    };
    for chain in chains() {
        let employee = chain.calculate_price(expensive.clone(), customer("c-100")).unwrap();
        assert_eq!(employee, Some(Money::from_cents(i64::MAX).percent_off(10)));

        let both = chain.calculate_price(expensive.clone(), customer("c-300")).unwrap();
        assert_eq!(
            both,
            Some(Money::from_cents(i64::MAX).percent_off(20).saturating_sub(Money::from_cents(1000)))
        );
    }
}

#[test]
fn null_customer_fails_before_any_step() {
    for chain in chains() {
        let err = chain
            .dispatcher()
            .invoke::<Money>("calculatePrice", &CallArgs::new().with(lamp()).with_null())
            .unwrap_err();
        assert!(matches!(err, DispatchError::NullRequiredParameter { position: 1, .. }));
    }
}

#[test]
fn seeded_appendixes_reach_later_steps() {
    // The directory step carries the caller's appendixes forward through its
    // context argument, so a seeded employee record applies to anyone.
    let chain = wire_price_calculator(Arc::new(CustomerDirectory::new())).unwrap();
    let seeded = AppendixStore::new().with(
        EMPLOYMENT,
        Employee {
            personnel_id: 1,
            discount_percent: 50,
        },
    );
    let ctx = chain
        .dispatcher()
        .invoke_with::<Money>(
            "calculatePrice",
            &CallArgs::new().with(lamp()).with(customer("c-x")),
            seeded,
        )
        .unwrap();
    assert_eq!(ctx.result(), Some(&Money::from_cents(5_000)));
    assert!(ctx.appendix::<Employee>(EMPLOYMENT).is_some());
    assert!(ctx.appendixes().get_all::<Voucher>(MARKETING).next().is_none());
}

#[test]
fn failing_calculator_is_reported_with_its_name() {
    // Employee discount without a preceding base price step.
    let chain: PriceCalculatorChain = DispatcherFactory::for_interface::<PriceCalculatorChain>()
        .pipeline(
            PriceCalculatorChain::method_pipeline::<Money>("calculatePrice").step(
                StepSpec::on(Arc::new(EmployeeDiscountCalculator), "calculatePrice")
                    .arg(Argument::context())
                    .arg(Argument::appendix::<Employee>(EMPLOYMENT)),
            ),
        )
        .build_interface()
        .unwrap();

    let seeded = AppendixStore::new().with(
        EMPLOYMENT,
        Employee {
            personnel_id: 2,
            discount_percent: 5,
        },
    );
    let err = chain
        .dispatcher()
        .invoke_with::<Money>(
            "calculatePrice",
            &CallArgs::new().with(lamp()).with(customer("c-1")),
            seeded,
        )
        .unwrap_err();
    match err {
        DispatchError::InvocationFailure { target, method, source } => {
            assert_eq!(target, "EmployeeDiscountCalculator");
            assert_eq!(method, "calculatePrice");
            assert!(source.to_string().contains("needs a price"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}
