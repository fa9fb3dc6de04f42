//! Invoice document rendering.
//!
//! [`render_invoice`] is pure: the same invoice and account always lay out
//! the same A4 pages. Long item lists continue on further pages.

use crate::models::{Account, Client, InvoiceDetails};
use crate::services::error::InvoiceError;
use crate::services::lifecycle::DATE_FORMAT;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};
use std::io::BufWriter;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const TOP: f32 = 282.0;
const BOTTOM: f32 = 25.0;
const LAYER: &str = "Layer 1";

const COL_QTY: f32 = 115.0;
const COL_PRICE: f32 = 140.0;
const COL_AMOUNT: f32 = 170.0;
const DESCRIPTION_CHARS: usize = 55;

/// Writes text top to bottom, starting a new page when the bottom margin is
/// reached.
struct Writer<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl Writer<'_> {
    fn text(&self, text: &str, size: f32, x: f32) {
        self.layer.use_text(text, size, Mm(x), Mm(self.y), &self.regular);
    }

    fn bold(&self, text: &str, size: f32, x: f32) {
        self.layer.use_text(text, size, Mm(x), Mm(self.y), &self.bold);
    }

    fn rule(&self) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(self.y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(self.y)), false),
            ],
            is_closed: false,
        });
    }

    fn advance(&mut self, by: f32) {
        self.y -= by;
        if self.y < BOTTOM {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP;
        }
    }
}

fn render_error(err: impl std::fmt::Display) -> InvoiceError {
    InvoiceError::Render(anyhow::anyhow!("{}", err))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

fn client_lines(client: &Client) -> Vec<String> {
    let mut lines = vec![client.name.clone()];
    lines.extend(client.company_name.clone());
    lines.extend(client.address_line1.clone());
    lines.extend(client.address_line2.clone());

    let locality = [&client.city, &client.state, &client.postal_code]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if !locality.is_empty() {
        lines.push(locality);
    }
    lines.extend(client.country.clone());
    if let Some(email) = &client.email {
        lines.push(format!("Email: {}", email));
    }
    if let Some(tax_id) = &client.tax_id {
        lines.push(format!("Tax ID: {}", tax_id));
    }
    lines
}

/// Lay out an invoice as a PDF issued by `account`.
pub fn render_invoice(details: &InvoiceDetails, account: &Account) -> Result<Vec<u8>, InvoiceError> {
    let invoice = &details.invoice;

    let (doc, page, layer) = PdfDocument::new(
        format!("Invoice {}", invoice.invoice_number),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        LAYER,
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(render_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(render_error)?;

    let mut w = Writer {
        layer: doc.get_page(page).get_layer(layer),
        doc: &doc,
        regular,
        bold,
        y: TOP,
    };

    // Issuer on the left, title and number on the right.
    w.bold(&account.full_name, 16.0, MARGIN);
    w.bold("INVOICE", 22.0, 140.0);
    w.advance(7.0);
    w.text(&account.email, 10.0, MARGIN);
    w.bold(&invoice.invoice_number, 12.0, 140.0);
    w.advance(10.0);
    w.rule();
    w.advance(10.0);

    let mut facts = vec![
        ("Status", invoice.status.clone()),
        ("Issue date", invoice.issue_date.format(DATE_FORMAT).to_string()),
        ("Due date", invoice.due_date.format(DATE_FORMAT).to_string()),
        ("Currency", invoice.currency.clone()),
    ];
    if let Some(paid) = invoice.paid_utc {
        facts.push(("Paid on", paid.format(DATE_FORMAT).to_string()));
    }

    let bill_to = details.client.as_ref().map(client_lines).unwrap_or_default();
    w.bold("Bill To:", 11.0, MARGIN);
    w.bold("Details:", 11.0, 120.0);
    w.advance(6.0);
    for row in 0..bill_to.len().max(facts.len()) {
        if let Some(line) = bill_to.get(row) {
            w.text(line, 10.0, MARGIN);
        }
        if let Some((label, value)) = facts.get(row) {
            w.text(&format!("{}: {}", label, value), 10.0, 120.0);
        }
        w.advance(5.0);
    }
    w.advance(7.0);

    w.bold("Description", 10.0, MARGIN);
    w.bold("Qty", 10.0, COL_QTY);
    w.bold("Unit price", 10.0, COL_PRICE);
    w.bold("Amount", 10.0, COL_AMOUNT);
    w.advance(3.0);
    w.rule();
    w.advance(6.0);

    for (position, item) in details.items.iter().enumerate() {
        let description = format!("{}. {}", position + 1, item.description);
        w.text(&truncate(&description, DESCRIPTION_CHARS), 10.0, MARGIN);
        w.text(&item.quantity.normalize().to_string(), 10.0, COL_QTY);
        w.text(&item.unit_price.round_dp(2).to_string(), 10.0, COL_PRICE);
        w.text(&item.amount.round_dp(2).to_string(), 10.0, COL_AMOUNT);
        w.advance(6.0);
    }

    w.rule();
    w.advance(8.0);

    let totals = [
        ("Subtotal:".to_string(), invoice.subtotal),
        (format!("Tax ({}%):", invoice.tax_rate.normalize()), invoice.tax_amount),
        ("Discount:".to_string(), invoice.discount_amount),
    ];
    for (label, value) in totals {
        w.text(&label, 10.0, COL_PRICE);
        w.text(&value.round_dp(2).to_string(), 10.0, COL_AMOUNT);
        w.advance(6.0);
    }
    w.bold("Total:", 12.0, COL_PRICE);
    w.bold(
        &format!("{} {}", invoice.total_amount.round_dp(2), invoice.currency),
        12.0,
        COL_AMOUNT - 10.0,
    );
    w.advance(12.0);

    for (heading, body) in [
        ("Notes", invoice.notes.as_deref()),
        ("Terms and Conditions", invoice.terms_and_conditions.as_deref()),
    ] {
        let Some(body) = body.filter(|b| !b.trim().is_empty()) else {
            continue;
        };
        w.bold(&format!("{}:", heading), 11.0, MARGIN);
        w.advance(6.0);
        for line in body.lines() {
            w.text(&truncate(line, 95), 10.0, MARGIN);
            w.advance(5.0);
        }
        w.advance(5.0);
    }

    w.text("Thank you for your business.", 9.0, MARGIN);
    drop(w);

    let mut out = BufWriter::new(Vec::<u8>::new());
    doc.save(&mut out).map_err(render_error)?;
    out.into_inner().map_err(render_error)
}
