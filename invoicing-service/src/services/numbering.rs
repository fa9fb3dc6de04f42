//! Sequential invoice numbers.

/// Format the invoice number for an account's current counter value.
///
/// The counter is zero-padded to at least four digits: `INV-0007`,
/// `INV-12345`. Callers must hold the account row lock from reading the
/// counter until it is incremented, or two invoices can share a number.
pub fn format_invoice_number(prefix: &str, next_invoice_number: i32) -> String {
    format!("{}-{:04}", prefix, next_invoice_number)
}
