//! Read-only receipt projection.
//!
//! A receipt is built either from a fresh [`SplitComputation`] or from a
//! persisted [`Bill`]. Older bills may lack the itemized breakdown; those
//! splits show a fallback line and only their stored total.

use chrono::{DateTime, Utc};
use shared::{Bill, Item};
use std::fmt::Write;

use super::money::CurrencyFormat;
use super::split_calculator::SplitComputation;

pub const ITEMS_UNAVAILABLE: &str = "Items detail not available";

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptLine {
    pub label: String,
    pub amount: f64,
}

impl ReceiptLine {
    fn for_item(item: &Item) -> Self {
        let label = if item.quantity > 1 {
            format!("{} x{}", item.name, item.quantity)
        } else {
            item.name.clone()
        };
        Self {
            label,
            amount: item.line_total(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptEntry {
    pub member_id: String,
    pub member_name: String,
    /// Empty when the item breakdown was not retained
    pub lines: Vec<ReceiptLine>,
    /// Tax plus service share; `None` when it cannot be derived
    pub charges: Option<f64>,
    pub total: f64,
}

impl ReceiptEntry {
    pub fn items_available(&self) -> bool {
        !self.lines.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub group_name: String,
    pub group_icon: String,
    pub tax_rate_percent: f64,
    pub entries: Vec<ReceiptEntry>,
    pub grand_total: f64,
    pub recorded_on: Option<DateTime<Utc>>,
}

impl Receipt {
    pub fn from_computation(group_name: &str, group_icon: &str, computation: &SplitComputation) -> Self {
        let entries = computation
            .per_member
            .iter()
            .map(|member| ReceiptEntry {
                member_id: member.member_id.clone(),
                member_name: member.member_name.clone(),
                lines: member.items.iter().map(ReceiptLine::for_item).collect(),
                charges: Some(member.tax + member.service),
                total: member.total,
            })
            .collect();

        Self {
            group_name: group_name.to_string(),
            group_icon: group_icon.to_string(),
            tax_rate_percent: computation.tax_rate_percent,
            entries,
            grand_total: computation.grand_total,
            recorded_on: None,
        }
    }

    pub fn from_bill(bill: &Bill) -> Self {
        let entries = bill
            .splits
            .iter()
            .map(|split| {
                let lines: Vec<ReceiptLine> = split.items.iter().map(ReceiptLine::for_item).collect();
                let charges = if lines.is_empty() {
                    None
                } else {
                    let subtotal: f64 = lines.iter().map(|line| line.amount).sum();
                    Some(split.total_amount - subtotal)
                };
                ReceiptEntry {
                    member_id: split.uid.clone(),
                    member_name: split.name.clone(),
                    lines,
                    charges,
                    total: split.total_amount,
                }
            })
            .collect();

        Self {
            group_name: bill.group_name.clone(),
            group_icon: bill.group_icon.clone(),
            tax_rate_percent: bill.tax_rate_percent,
            entries,
            grand_total: bill.total_amount,
            recorded_on: Some(bill.created_at),
        }
    }

    /// Plain-text rendering with floored amounts
    pub fn render(&self, currency: &CurrencyFormat) -> String {
        let mut out = String::new();
        let rule = "-".repeat(40);

        let _ = writeln!(out, "{} {}", self.group_icon, self.group_name);
        let _ = writeln!(out, "Bill Receipt");
        let _ = writeln!(out, "{}", rule);

        for entry in &self.entries {
            let _ = writeln!(out, "{}", entry.member_name);
            if entry.items_available() {
                for line in &entry.lines {
                    let _ = writeln!(out, "  {:<24}{:>14}", line.label, currency.format(line.amount));
                }
            } else {
                let _ = writeln!(out, "  {}", ITEMS_UNAVAILABLE);
            }
            if let Some(charges) = entry.charges {
                let label = format!("Tax ({}%) + Service", self.tax_rate_percent);
                let _ = writeln!(out, "  {:<24}{:>14}", label, currency.format(charges));
            }
            let _ = writeln!(out, "  {:<24}{:>14}", "Subtotal", currency.format(entry.total));
            let _ = writeln!(out, "{}", rule);
        }

        let _ = writeln!(out, "{:<26}{:>14}", "Grand Total", currency.format(self.grand_total));
        if let Some(recorded_on) = self.recorded_on {
            let _ = writeln!(out, "Recorded on {}", recorded_on.format("%d/%m/%Y"));
        }
        out
    }
}
