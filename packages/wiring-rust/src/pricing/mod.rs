//! Worked example: an article price computed by a chain of calculators.
//!
//! `calculatePrice(article, customer)` runs four steps:
//!
//! 1. `CustomerDirectory::identify` attaches the customer's employee record
//!    (owner [`EMPLOYMENT`]) and vouchers (owner [`MARKETING`]).
//! 2. `BasePriceCalculator` sets the list price.
//! 3. `EmployeeDiscountCalculator` applies the staff discount; skipped for
//!    customers without an employee record.
//! 4. `VoucherDiscountCalculator` redeems vouchers; skipped when there are
//!    none.

pub mod domain;
pub mod targets;

use std::sync::Arc;

use daisychain_core::{
    chain_interface, Argument, BuildError, ChainInterface, DispatchError, DispatcherFactory, OwnerId, StepSpec,
};

pub use domain::{Article, Customer, Employee, Money, Voucher, VoucherCompatibility};
pub use targets::{BasePriceCalculator, CustomerDirectory, EmployeeDiscountCalculator, VoucherDiscountCalculator};

use crate::assemble::assemble;
use crate::config::ChainConfig;
use crate::error::WiringError;
use crate::registry::TargetRegistry;

/// Owner of employee appendixes.
pub const EMPLOYMENT: OwnerId = OwnerId::from_u128(0x6e4f_2a1c_9b3d_4e8f_a071_5c2d_e9b4_1001);
/// Owner of voucher appendixes.
pub const MARKETING: OwnerId = OwnerId::from_u128(0x6e4f_2a1c_9b3d_4e8f_a071_5c2d_e9b4_1002);

/// Bundled chain configuration, equivalent to [`wire_price_calculator`].
pub const PRICING_CONFIG: &str = include_str!("../../config/pricing.json");

pub trait PriceCalculator {
    fn calculate_price(&self, article: Article, customer: Customer) -> Result<Option<Money>, DispatchError>;
}

chain_interface! {
    /// [`PriceCalculator`] implemented by a calculator chain.
    pub struct PriceCalculatorChain implements PriceCalculator {
        fn calculate_price(&self, #[required] article: Article, #[required] customer: Customer)
            -> Money => "calculatePrice";
    }
}

/// Wires the pricing chain in code.
///
/// # Errors
///
/// Returns a [`BuildError`] if the chain does not validate.
pub fn wire_price_calculator(directory: Arc<CustomerDirectory>) -> Result<PriceCalculatorChain, BuildError> {
    let pipeline = PriceCalculatorChain::method_pipeline::<Money>("calculatePrice")
        .step(
            StepSpec::on(directory, "identify")
                .arg(Argument::context())
                .arg(Argument::positional::<Customer>(1)),
        )
        .step(
            StepSpec::on(Arc::new(BasePriceCalculator), "calculatePrice")
                .arg(Argument::context())
                .arg(Argument::positional::<Article>(0)),
        )
        .step(
            StepSpec::on(Arc::new(EmployeeDiscountCalculator), "calculatePrice")
                .arg(Argument::context())
                .arg(Argument::appendix::<Employee>(EMPLOYMENT).required()),
        )
        .step(
            StepSpec::on(Arc::new(VoucherDiscountCalculator), "calculatePrice")
                .arg(Argument::context())
                .arg(Argument::appendix_set::<Voucher>(MARKETING).required_not_empty()),
        );

    DispatcherFactory::for_interface::<PriceCalculatorChain>()
        .pipeline(pipeline)
        .build_interface()
}

/// Registry holding the pricing targets and owners under the names the
/// bundled configuration uses.
#[must_use]
pub fn pricing_registry(directory: Arc<CustomerDirectory>) -> TargetRegistry {
    let registry = TargetRegistry::new();
    registry.register_target("customerDirectory", directory);
    registry.register_target("basePrice", Arc::new(BasePriceCalculator));
    registry.register_target("employeeDiscount", Arc::new(EmployeeDiscountCalculator));
    registry.register_target("voucherDiscount", Arc::new(VoucherDiscountCalculator));
    registry.register_owner("employment", EMPLOYMENT);
    registry.register_owner("marketing", MARKETING);
    registry
}

/// Wires the pricing chain from a configuration.
///
/// # Errors
///
/// See [`assemble`].
pub fn wire_from_config(
    config: &ChainConfig,
    directory: Arc<CustomerDirectory>,
) -> Result<PriceCalculatorChain, WiringError> {
    assemble::<PriceCalculatorChain>(config, &pricing_registry(directory))
}

/// Wires the pricing chain from [`PRICING_CONFIG`].
///
/// # Errors
///
/// See [`assemble`].
pub fn wire_bundled(directory: Arc<CustomerDirectory>) -> Result<PriceCalculatorChain, WiringError> {
    wire_from_config(&ChainConfig::from_json_str(PRICING_CONFIG)?, directory)
}
