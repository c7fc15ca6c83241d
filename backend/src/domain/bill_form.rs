//! Validity gate for the order entry form.
//!
//! A bill can only be finalized when every entered item has a name, a
//! positive price and a positive quantity. Members without any items are
//! allowed; they simply ordered nothing.
//!
//! Every line total and every computed total must also stay finite. JSON has
//! no representation for infinity or NaN, so a bill carrying one could be
//! written but never read back.

use shared::Order;

use super::error::OrderValidationError;
use super::split_calculator::{compute, SplitComputation};

/// Collect every problem with the submitted orders and charges
pub fn validate(
    orders: &[Order],
    tax_rate_percent: f64,
    service_charge: f64,
) -> Result<(), Vec<OrderValidationError>> {
    let mut errors = Vec::new();

    if orders.iter().all(|order| order.items.is_empty()) {
        errors.push(OrderValidationError::NoOrders);
    }

    for order in orders {
        for (position, item) in order.items.iter().enumerate() {
            if item.name.trim().is_empty() {
                errors.push(OrderValidationError::EmptyItemName {
                    member: order.member_name.clone(),
                    item: position,
                });
            }
            if !(item.unit_price.is_finite() && item.unit_price > 0.0) {
                errors.push(OrderValidationError::NonPositivePrice {
                    member: order.member_name.clone(),
                    item: position,
                });
            }
            if item.quantity == 0 {
                errors.push(OrderValidationError::NonPositiveQuantity {
                    member: order.member_name.clone(),
                    item: position,
                });
            } else if item.unit_price.is_finite() && !item.line_total().is_finite() {
                errors.push(OrderValidationError::LineTotalTooLarge {
                    member: order.member_name.clone(),
                    item: position,
                });
            }
        }
    }

    if tax_rate_percent < 0.0 || !tax_rate_percent.is_finite() {
        errors.push(OrderValidationError::NegativeTaxRate);
    }
    if service_charge < 0.0 || !service_charge.is_finite() {
        errors.push(OrderValidationError::NegativeServiceCharge);
    }

    if errors.is_empty() && !totals_are_finite(&compute(orders, tax_rate_percent, service_charge)) {
        errors.push(OrderValidationError::TotalTooLarge);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Whether every subtotal, tax, total and the grand total is a finite number
pub fn totals_are_finite(computation: &SplitComputation) -> bool {
    computation.grand_total.is_finite()
        && computation
            .per_member
            .iter()
            .all(|member| member.subtotal.is_finite() && member.tax.is_finite() && member.total.is_finite())
}

/// Whether the "split now" action should be enabled
pub fn is_submittable(orders: &[Order], tax_rate_percent: f64, service_charge: f64) -> bool {
    validate(orders, tax_rate_percent, service_charge).is_ok()
}

/// Read a tax rate or service charge typed by the user; blank or unparsable input is 0
pub fn parse_charge_input(input: &str) -> f64 {
    match input.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Item;

    fn order(name: &str, items: Vec<Item>) -> Order {
        Order {
            member_id: name.to_lowercase(),
            member_name: name.to_string(),
            items,
        }
    }

    #[test]
    fn test_valid_orders_with_an_empty_member() {
        let orders = vec![
            order("Alice", vec![]),
            order("Budi", vec![Item::new("Nasi goreng", 20000.0, 1)]),
        ];
        assert!(validate(&orders, 10.0, 3000.0).is_ok());
        assert!(is_submittable(&orders, 0.0, 0.0));
    }

    #[test]
    fn test_nothing_ordered_is_rejected() {
        let orders = vec![order("Alice", vec![])];
        assert_eq!(
            validate(&orders, 0.0, 0.0).unwrap_err(),
            vec![OrderValidationError::NoOrders]
        );
        assert_eq!(
            validate(&[], 0.0, 0.0).unwrap_err(),
            vec![OrderValidationError::NoOrders]
        );
    }

    #[test]
    fn test_every_bad_field_is_reported() {
        let orders = vec![order(
            "Budi",
            vec![
                Item::new("Es teh", 5000.0, 1),
                Item::new("  ", 0.0, 0),
            ],
        )];
        let errors = validate(&orders, -1.0, 0.0).unwrap_err();
        assert_eq!(
            errors,
            vec![
                OrderValidationError::EmptyItemName {
                    member: "Budi".to_string(),
                    item: 1
                },
                OrderValidationError::NonPositivePrice {
                    member: "Budi".to_string(),
                    item: 1
                },
                OrderValidationError::NonPositiveQuantity {
                    member: "Budi".to_string(),
                    item: 1
                },
                OrderValidationError::NegativeTaxRate,
            ]
        );
    }

    #[test]
    fn test_overflowing_line_total_is_rejected() {
        let orders = vec![order("Budi", vec![Item::new("Emas", f64::MAX, 2)])];
        assert_eq!(
            validate(&orders, 0.0, 0.0).unwrap_err(),
            vec![OrderValidationError::LineTotalTooLarge {
                member: "Budi".to_string(),
                item: 0
            }]
        );
    }

    #[test]
    fn test_overflowing_totals_are_rejected() {
        // Each line is finite, the member subtotal is not
        let subtotal_overflow = vec![order(
            "Budi",
            vec![Item::new("Emas", f64::MAX, 1), Item::new("Perak", f64::MAX, 1)],
        )];
        assert_eq!(
            validate(&subtotal_overflow, 0.0, 0.0).unwrap_err(),
            vec![OrderValidationError::TotalTooLarge]
        );

        // Subtotal is finite, the tax on it is not
        let tax_overflow = vec![order("Budi", vec![Item::new("Emas", 1e308, 1)])];
        assert_eq!(
            validate(&tax_overflow, 1000.0, 0.0).unwrap_err(),
            vec![OrderValidationError::TotalTooLarge]
        );

        // Two finite member totals that overflow once summed
        let grand_overflow = vec![
            order("Alice", vec![Item::new("Emas", 1e308, 1)]),
            order("Budi", vec![Item::new("Emas", 1e308, 1)]),
        ];
        assert!(!is_submittable(&grand_overflow, 0.0, 0.0));
    }

    #[test]
    fn test_parse_charge_input() {
        assert_eq!(parse_charge_input("10"), 10.0);
        assert_eq!(parse_charge_input(" 2.5 "), 2.5);
        assert_eq!(parse_charge_input(""), 0.0);
        assert_eq!(parse_charge_input("abc"), 0.0);
    }
}
