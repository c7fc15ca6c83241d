//! Split calculator.
//!
//! Turns per-member orders plus a tax rate and a flat service charge into
//! per-member totals:
//!
//! ```text
//! subtotal = Σ unit_price × quantity
//! tax      = subtotal × tax_rate_percent / 100
//! service  = service_charge / member_count
//! total    = subtotal + tax + service
//! ```
//!
//! The service charge is shared by every member of the bill, including those
//! who ordered nothing, but members with a zero subtotal are left out of the
//! result and the grand total. Nothing is rounded here.

use shared::{Item, Order};

use super::money::{divide_evenly, percentage_of};

/// One member's computed share
#[derive(Debug, Clone, PartialEq)]
pub struct MemberTotal {
    pub member_id: String,
    pub member_name: String,
    pub items: Vec<Item>,
    pub subtotal: f64,
    pub tax: f64,
    pub service: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitComputation {
    /// Members with a non-zero subtotal, in input order
    pub per_member: Vec<MemberTotal>,
    pub grand_total: f64,
    pub service_per_person: f64,
    /// Everyone the service charge was divided across
    pub member_count: usize,
    pub tax_rate_percent: f64,
    pub service_charge: f64,
}

impl SplitComputation {
    pub fn member(&self, member_id: &str) -> Option<&MemberTotal> {
        self.per_member
            .iter()
            .find(|member| member.member_id == member_id)
    }
}

/// Sum of all line totals
pub fn subtotal(items: &[Item]) -> f64 {
    items.iter().map(Item::line_total).sum()
}

pub fn compute(orders: &[Order], tax_rate_percent: f64, service_charge: f64) -> SplitComputation {
    let member_count = orders.len();
    let service_per_person = divide_evenly(service_charge, member_count);

    let per_member: Vec<MemberTotal> = orders
        .iter()
        .filter_map(|order| {
            let subtotal = subtotal(&order.items);
            if subtotal == 0.0 {
                return None;
            }
            let tax = percentage_of(subtotal, tax_rate_percent);
            Some(MemberTotal {
                member_id: order.member_id.clone(),
                member_name: order.member_name.clone(),
                items: order.items.clone(),
                subtotal,
                tax,
                service: service_per_person,
                total: subtotal + tax + service_per_person,
            })
        })
        .collect();

    let grand_total = per_member.iter().map(|member| member.total).sum();

    SplitComputation {
        per_member,
        grand_total,
        service_per_person,
        member_count,
        tax_rate_percent,
        service_charge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn order(id: &str, items: Vec<Item>) -> Order {
        Order {
            member_id: id.to_string(),
            member_name: id.to_uppercase(),
            items,
        }
    }

    fn scenario_orders() -> Vec<Order> {
        vec![
            order("a", vec![]),
            order("b", vec![Item::new("Nasi goreng", 20000.0, 1)]),
            order("c", vec![Item::new("Es teh", 5000.0, 2)]),
        ]
    }

    #[test]
    fn test_three_member_bill_with_empty_creator() {
        let result = compute(&scenario_orders(), 10.0, 3000.0);

        assert_eq!(result.service_per_person, 1000.0);
        assert_eq!(result.member_count, 3);
        assert!(result.member("a").is_none());

        let b = result.member("b").unwrap();
        assert_eq!((b.subtotal, b.tax, b.total), (20000.0, 2000.0, 23000.0));

        let c = result.member("c").unwrap();
        assert_eq!((c.subtotal, c.tax, c.total), (10000.0, 1000.0, 12000.0));

        assert_eq!(result.grand_total, 35000.0);
    }

    #[test]
    fn test_subtotal_ignores_item_order() {
        let items = vec![
            Item::new("Sate", 15000.5, 3),
            Item::new("Es jeruk", 7000.25, 2),
            Item::new("Kerupuk", 1000.0, 7),
        ];
        let mut reversed = items.clone();
        reversed.reverse();

        assert!((subtotal(&items) - (45001.5 + 14000.5 + 7000.0)).abs() < EPSILON);
        assert!((subtotal(&items) - subtotal(&reversed)).abs() < EPSILON);
    }

    #[test]
    fn test_tax_is_proportional_to_subtotal() {
        let orders = vec![
            order("a", vec![Item::new("Kopi", 18000.0, 1)]),
            order("b", vec![Item::new("Roti", 12345.0, 3)]),
            order("c", vec![Item::new("Teh", 999.0, 1)]),
        ];
        let result = compute(&orders, 11.0, 0.0);
        for member in &result.per_member {
            assert!((member.tax / member.subtotal - 0.11).abs() < EPSILON);
        }
    }

    #[test]
    fn test_service_charge_is_conserved_across_members() {
        let orders = vec![
            order("a", vec![Item::new("Kopi", 18000.0, 1)]),
            order("b", vec![Item::new("Roti", 12000.0, 1)]),
            order("c", vec![Item::new("Teh", 9000.0, 1)]),
        ];
        let result = compute(&orders, 0.0, 10000.0);
        let distributed: f64 = result.per_member.iter().map(|m| m.service).sum();
        assert!((distributed - 10000.0).abs() < 1e-6);
    }

    #[test]
    fn test_grand_total_is_sum_of_counted_members() {
        let result = compute(&scenario_orders(), 12.5, 4500.0);
        let expected: f64 = result
            .per_member
            .iter()
            .map(|m| m.subtotal + m.tax + result.service_per_person)
            .sum();
        assert!((result.grand_total - expected).abs() < EPSILON);
        assert_eq!(result.per_member.len(), 2);
    }

    #[test]
    fn test_no_members_does_not_divide_by_zero() {
        let result = compute(&[], 10.0, 3000.0);
        assert_eq!(result.service_per_person, 3000.0);
        assert!(result.per_member.is_empty());
        assert_eq!(result.grand_total, 0.0);
    }

    #[test]
    fn test_fractional_amounts_are_not_rounded() {
        let orders = vec![order("a", vec![Item::new("Gorengan", 333.33, 3)])];
        let result = compute(&orders, 10.0, 0.0);
        assert!((result.grand_total - 1099.989).abs() < 1e-6);
    }
}
