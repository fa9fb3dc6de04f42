//! Invoice pricing.
//!
//! Money is held as [`Decimal`]. Inputs are normalized to the precision the
//! `invoices` and `invoice_items` columns store (four places for quantities,
//! unit prices and the tax rate, two for the discount) before any arithmetic,
//! so the figures returned here are exactly the figures persisted. Line
//! amounts and the tax amount are rounded to two places, midpoint away from
//! zero, and the totals identities hold on the rounded values:
//!
//! ```text
//! subtotal     = sum(line.amount)
//! tax_amount   = round2(subtotal * tax_rate / 100)
//! total_amount = subtotal + tax_amount - discount_amount
//! ```

use crate::services::error::InvoiceError;
use rust_decimal::{Decimal, RoundingStrategy};

const MONEY_DP: u32 = 2;
const RATE_DP: u32 = 4;

/// Largest quantity `invoice_items.quantity NUMERIC(14, 4)` holds.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 4);
/// Largest unit price `invoice_items.unit_price NUMERIC(16, 4)` holds.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_874_919_423, 2_328_306, 0, false, 4);
/// Largest absolute amount the `NUMERIC(16, 2)` money columns hold.
pub const MAX_MONEY: Decimal = Decimal::from_parts(1_874_919_423, 2_328_306, 0, false, 2);

/// One priced line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

/// Priced invoice: per-line amounts in input order plus header totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Totals {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
}

fn round(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

fn overflow() -> InvoiceError {
    InvoiceError::InvalidInput("invoice amounts are too large".to_string())
}

fn ensure_money(field: &str, value: Decimal) -> Result<Decimal, InvoiceError> {
    if value.abs() > MAX_MONEY {
        return Err(InvoiceError::InvalidInput(format!(
            "{} exceeds the maximum of {}",
            field, MAX_MONEY
        )));
    }
    Ok(value)
}

/// Price `(quantity, unit_price)` pairs with a percentage tax rate and a flat
/// discount.
///
/// Fails with `InvalidInput` for negative quantities, prices or discounts, a
/// tax rate outside `[0, 100]`, or any figure too large for its column. A discount larger
/// than the taxed subtotal yields a negative total.
pub fn calculate<I>(items: I, tax_rate: Decimal, discount_amount: Decimal) -> Result<Totals, InvoiceError>
where
    I: IntoIterator<Item = (Decimal, Decimal)>,
{
    let tax_rate = round(tax_rate, RATE_DP);
    if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE_HUNDRED {
        return Err(InvoiceError::InvalidInput(
            "tax_rate must be between 0 and 100".to_string(),
        ));
    }

    let discount_amount = round(discount_amount, MONEY_DP);
    if discount_amount < Decimal::ZERO {
        return Err(InvoiceError::InvalidInput(
            "discount_amount must not be negative".to_string(),
        ));
    }
    ensure_money("discount_amount", discount_amount)?;

    let mut lines = Vec::new();
    let mut subtotal = Decimal::ZERO;

    for (position, (quantity, unit_price)) in items.into_iter().enumerate() {
        let quantity = round(quantity, RATE_DP);
        let unit_price = round(unit_price, RATE_DP);

        if quantity < Decimal::ZERO {
            return Err(InvoiceError::InvalidInput(format!(
                "item {} quantity must not be negative",
                position + 1
            )));
        }
        if unit_price < Decimal::ZERO {
            return Err(InvoiceError::InvalidInput(format!(
                "item {} unit_price must not be negative",
                position + 1
            )));
        }

        if quantity > MAX_QUANTITY {
            return Err(InvoiceError::InvalidInput(format!(
                "item {} quantity exceeds the maximum of {}",
                position + 1,
                MAX_QUANTITY
            )));
        }
        if unit_price > MAX_UNIT_PRICE {
            return Err(InvoiceError::InvalidInput(format!(
                "item {} unit_price exceeds the maximum of {}",
                position + 1,
                MAX_UNIT_PRICE
            )));
        }

        let amount = round(quantity.checked_mul(unit_price).ok_or_else(overflow)?, MONEY_DP);
        let amount = ensure_money(&format!("item {} amount", position + 1), amount)?;
        subtotal = ensure_money(
            "subtotal",
            subtotal.checked_add(amount).ok_or_else(overflow)?,
        )?;

        lines.push(PricedLine {
            quantity,
            unit_price,
            amount,
        });
    }

    let tax_amount = round(
        subtotal
            .checked_mul(tax_rate)
            .ok_or_else(overflow)?
            .checked_div(Decimal::ONE_HUNDRED)
            .ok_or_else(overflow)?,
        MONEY_DP,
    );
    let tax_amount = ensure_money("tax_amount", tax_amount)?;

    let total_amount = subtotal
        .checked_add(tax_amount)
        .and_then(|v| v.checked_sub(discount_amount))
        .ok_or_else(overflow)?;
    let total_amount = ensure_money("total_amount", total_amount)?;

    Ok(Totals {
        lines,
        subtotal,
        tax_rate,
        tax_amount,
        discount_amount,
        total_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn prices_lines_tax_and_discount() {
        let totals = calculate(
            vec![(d("2"), d("100.00")), (d("1"), d("50.50"))],
            d("18"),
            d("10"),
        )
        .unwrap();

        assert_eq!(totals.lines[0].amount, d("200.00"));
        assert_eq!(totals.lines[1].amount, d("50.50"));
        assert_eq!(totals.subtotal, d("250.50"));
        assert_eq!(totals.tax_amount, d("45.09"));
        assert_eq!(totals.total_amount, d("285.59"));
    }

    #[test]
    fn identities_hold_on_rounded_values() {
        let totals = calculate(
            vec![(d("3"), d("0.3333")), (d("1.5"), d("19.99")), (d("7"), d("0.0049"))],
            d("7.25"),
            d("1.13"),
        )
        .unwrap();

        let sum: Decimal = totals.lines.iter().map(|l| l.amount).sum();
        assert_eq!(totals.subtotal, sum);
        assert_eq!(
            totals.tax_amount,
            (totals.subtotal * totals.tax_rate / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        );
        assert_eq!(
            totals.total_amount,
            totals.subtotal + totals.tax_amount - totals.discount_amount
        );
    }

    #[test]
    fn rounds_midpoint_away_from_zero() {
        // 0.10 * 5% = 0.005
        let totals = calculate(vec![(d("1"), d("0.10"))], d("5"), Decimal::ZERO).unwrap();
        assert_eq!(totals.tax_amount, d("0.01"));

        // 3 * 0.3333 = 0.9999
        let totals = calculate(vec![(d("3"), d("0.3333"))], Decimal::ZERO, Decimal::ZERO).unwrap();
        assert_eq!(totals.lines[0].amount, d("1.00"));
    }

    #[test]
    fn inputs_are_normalized_to_stored_precision() {
        let totals = calculate(vec![(d("1.00005"), d("2.123456"))], d("12.34567"), d("0.125")).unwrap();

        assert_eq!(totals.lines[0].quantity, d("1.0001"));
        assert_eq!(totals.lines[0].unit_price, d("2.1235"));
        assert_eq!(totals.tax_rate, d("12.3457"));
        assert_eq!(totals.discount_amount, d("0.13"));
    }

    #[test]
    fn discount_larger_than_total_goes_negative() {
        let totals = calculate(vec![(d("1"), d("10"))], Decimal::ZERO, d("25")).unwrap();
        assert_eq!(totals.total_amount, d("-15"));
    }

    #[test]
    fn zero_quantity_line_prices_to_zero() {
        let totals = calculate(vec![(Decimal::ZERO, d("99.99"))], d("18"), Decimal::ZERO).unwrap();
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total_amount, Decimal::ZERO);
    }

    #[test]
    fn rejects_out_of_range_inputs() {
        let one = vec![(Decimal::ONE, Decimal::ONE)];

        assert!(matches!(
            calculate(one.clone(), d("100.01"), Decimal::ZERO),
            Err(InvoiceError::InvalidInput(_))
        ));
        assert!(matches!(
            calculate(one.clone(), d("-1"), Decimal::ZERO),
            Err(InvoiceError::InvalidInput(_))
        ));
        assert!(matches!(
            calculate(one, Decimal::ZERO, d("-0.01")),
            Err(InvoiceError::InvalidInput(_))
        ));
        assert!(matches!(
            calculate(vec![(d("-1"), Decimal::ONE)], Decimal::ZERO, Decimal::ZERO),
            Err(InvoiceError::InvalidInput(_))
        ));
        assert!(matches!(
            calculate(vec![(Decimal::ONE, d("-5"))], Decimal::ZERO, Decimal::ZERO),
            Err(InvoiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn full_tax_rate_is_allowed() {
        let totals = calculate(vec![(d("1"), d("40"))], d("100"), Decimal::ZERO).unwrap();
        assert_eq!(totals.tax_amount, d("40"));
        assert_eq!(totals.total_amount, d("80"));
    }

    #[test]
    fn column_limits_match_schema_precision() {
        assert_eq!(MAX_QUANTITY, d("9999999999.9999"));
        assert_eq!(MAX_UNIT_PRICE, d("999999999999.9999"));
        assert_eq!(MAX_MONEY, d("99999999999999.99"));
    }

    #[test]
    fn figures_at_column_limits_are_accepted() {
        let totals = calculate(vec![(MAX_QUANTITY, Decimal::ZERO)], Decimal::ZERO, Decimal::ZERO)
            .unwrap();
        assert_eq!(totals.lines[0].quantity, MAX_QUANTITY);

        let totals = calculate(vec![(Decimal::ONE, MAX_UNIT_PRICE)], Decimal::ZERO, Decimal::ZERO)
            .unwrap();
        assert_eq!(totals.subtotal, d("1000000000000.00"));
    }

    #[test]
    fn oversized_quantity_and_price_are_rejected() {
        let err = calculate(vec![(d("100000000000"), d("1"))], Decimal::ZERO, Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidInput(ref m) if m.contains("quantity")));

        let err = calculate(vec![(d("1000"), d("1000000000000"))], Decimal::ZERO, Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidInput(ref m) if m.contains("unit_price")));
    }

    #[test]
    fn amounts_beyond_money_columns_are_rejected() {
        // 9_999_999_999 * 999_999 overflows a single line amount
        let err = calculate(vec![(d("9999999999"), d("999999"))], Decimal::ZERO, Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidInput(ref m) if m.contains("item 1 amount")));

        // two lines that fit on their own but not summed
        let err = calculate(
            vec![(d("100"), d("600000000000")), (d("100"), d("600000000000"))],
            Decimal::ZERO,
            Decimal::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidInput(ref m) if m.contains("subtotal")));

        // subtotal and tax fit, their sum does not
        let err = calculate(vec![(d("100"), d("600000000000"))], d("100"), Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidInput(ref m) if m.contains("total_amount")));

        let err = calculate(vec![(Decimal::ONE, Decimal::ONE)], Decimal::ZERO, d("100000000000000"))
            .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidInput(ref m) if m.contains("discount_amount")));
    }

    #[test]
    fn overflow_is_reported_as_invalid_input() {
        let err = calculate(vec![(Decimal::MAX, Decimal::MAX)], Decimal::ZERO, Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidInput(_)));
    }
}
