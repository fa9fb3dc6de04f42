//! Invoice orchestration: creation, edits, status changes, listing and
//! duplication on top of [`Database`].

use crate::dtos::{
    CreateInvoiceRequest, InvoiceItemRequest, ListInvoicesParams, UpdateInvoiceRequest,
    UpdateInvoiceStatusRequest,
};
use crate::models::{
    Account, Invoice, InvoiceDetails, InvoiceDocument, InvoicePage, InvoiceStats, InvoiceStatus,
    InvoiceTemplate, NewInvoice, NewInvoiceItem,
};
use crate::services::database::Database;
use crate::services::error::InvoiceError;
use crate::services::lifecycle::{self, parse_date, DATE_FORMAT};
use crate::services::metrics::{INVOICES_TOTAL, INVOICE_AMOUNT_TOTAL, QUOTA_REJECTIONS_TOTAL};
use crate::services::numbering::format_invoice_number;
use crate::services::pagination::PageRequest;
use crate::services::plan::check_invoice_quota;
use crate::services::pdf;
use crate::services::pricing::{self, Totals};
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Days between issue and due date on a duplicated invoice.
const DUPLICATE_PAYMENT_TERMS_DAYS: i64 = 30;

#[derive(Clone)]
pub struct InvoiceService {
    db: Database,
}

impl InvoiceService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a priced, numbered draft.
    ///
    /// Numbering and the account counters are updated in the same
    /// transaction as the header and items, with the account row locked.
    #[instrument(skip(self, request), fields(account_id = %account_id, client_id = %request.client_id))]
    pub async fn create_invoice(
        &self,
        account_id: Uuid,
        request: CreateInvoiceRequest,
    ) -> Result<InvoiceDetails, InvoiceError> {
        request.validate()?;
        validate_items(&request.items)?;

        let account = self
            .db
            .get_account(account_id)
            .await?
            .ok_or_else(|| InvoiceError::not_found("account"))?;
        enforce_quota(&account)?;

        let issue_date = parse_date("issue_date", &request.issue_date)?;
        let due_date = parse_date("due_date", &request.due_date)?;
        ensure_due_after_issue(issue_date, due_date)?;

        let template_id = resolve_template(request.template_id.as_deref())?;
        let currency = request
            .currency
            .as_deref()
            .unwrap_or(&account.default_currency)
            .to_uppercase();

        self.db
            .get_client(account_id, request.client_id)
            .await?
            .ok_or_else(|| InvoiceError::not_found("client"))?;

        let totals = price_items(&request.items, request.tax_rate, request.discount_amount)?;

        let mut tx = self.db.begin().await?;

        let locked = self
            .db
            .lock_account(&mut tx, account_id)
            .await?
            .ok_or_else(|| InvoiceError::not_found("account"))?;
        enforce_quota(&locked)?;

        let invoice_number =
            format_invoice_number(&locked.invoice_number_prefix, locked.next_invoice_number);

        let invoice = self
            .db
            .insert_invoice(
                &mut tx,
                &NewInvoice {
                    account_id,
                    client_id: request.client_id,
                    invoice_number,
                    issue_date,
                    due_date,
                    currency,
                    subtotal: totals.subtotal,
                    tax_rate: totals.tax_rate,
                    tax_amount: totals.tax_amount,
                    discount_amount: totals.discount_amount,
                    total_amount: totals.total_amount,
                    template_id,
                    notes: request.notes,
                    terms_and_conditions: request.terms_and_conditions,
                },
            )
            .await?;

        let items = new_items(&request.items, &totals);
        self.db
            .insert_invoice_items(&mut tx, account_id, invoice.invoice_id, &items)
            .await?;
        self.db.advance_invoice_counter(&mut tx, account_id).await?;

        tx.commit().await.map_err(|e| {
            InvoiceError::Storage(anyhow::anyhow!("Failed to commit invoice: {}", e))
        })?;

        INVOICES_TOTAL
            .with_label_values(&[InvoiceStatus::Draft.as_str()])
            .inc();
        if let Some(amount) = invoice.total_amount.to_f64().filter(|a| *a > 0.0) {
            INVOICE_AMOUNT_TOTAL
                .with_label_values(&[invoice.currency.as_str()])
                .inc_by(amount);
        }

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            total_amount = %invoice.total_amount,
            "Invoice created"
        );

        self.get_invoice(account_id, invoice.invoice_id).await
    }

    /// Invoice header with its items and billed client.
    #[instrument(skip(self), fields(account_id = %account_id, invoice_id = %invoice_id))]
    pub async fn get_invoice(
        &self,
        account_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<InvoiceDetails, InvoiceError> {
        let invoice = self
            .db
            .get_invoice(account_id, invoice_id)
            .await?
            .ok_or_else(|| InvoiceError::not_found("invoice"))?;
        self.hydrate(invoice).await
    }

    /// One page of invoices, newest first.
    #[instrument(skip(self, params), fields(account_id = %account_id))]
    pub async fn list_invoices(
        &self,
        account_id: Uuid,
        params: ListInvoicesParams,
    ) -> Result<InvoicePage, InvoiceError> {
        let page = PageRequest::new(params.page, params.page_size);
        let status = params
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<InvoiceStatus>)
            .transpose()
            .map_err(|e| InvoiceError::InvalidInput(e.to_string()))?;

        let total = self.db.count_invoices(account_id, status).await?;
        let invoices = self
            .db
            .list_invoices(account_id, status, page.limit(), page.offset())
            .await?;

        Ok(InvoicePage {
            invoices,
            total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages(total),
        })
    }

    /// Edit a draft. Totals are recomputed from the resulting items, tax
    /// rate and discount whether or not items were supplied.
    #[instrument(skip(self, request), fields(account_id = %account_id, invoice_id = %invoice_id))]
    pub async fn update_invoice(
        &self,
        account_id: Uuid,
        invoice_id: Uuid,
        request: UpdateInvoiceRequest,
    ) -> Result<InvoiceDetails, InvoiceError> {
        request.validate()?;
        if let Some(items) = &request.items {
            validate_items(items)?;
        }

        let mut tx = self.db.begin().await?;

        let current = self
            .db
            .lock_invoice(&mut tx, account_id, invoice_id)
            .await?
            .ok_or_else(|| InvoiceError::not_found("invoice"))?;
        lifecycle::ensure_editable(stored_status(&current)?)?;

        let client_id = match request.client_id {
            Some(client_id) if client_id != current.client_id => {
                self.db
                    .get_client(account_id, client_id)
                    .await?
                    .ok_or_else(|| InvoiceError::not_found("client"))?;
                client_id
            }
            _ => current.client_id,
        };

        let issue_date = match request.issue_date.as_deref() {
            Some(value) => parse_date("issue_date", value)?,
            None => current.issue_date,
        };
        let due_date = match request.due_date.as_deref() {
            Some(value) => parse_date("due_date", value)?,
            None => current.due_date,
        };
        ensure_due_after_issue(issue_date, due_date)?;

        let template_id = match request.template_id.as_deref() {
            Some(value) => resolve_template(Some(value))?,
            None => current.template_id.clone(),
        };
        let currency = request
            .currency
            .as_deref()
            .map(str::to_uppercase)
            .unwrap_or_else(|| current.currency.clone());

        let tax_rate = request.tax_rate.unwrap_or(current.tax_rate);
        let discount_amount = request.discount_amount.unwrap_or(current.discount_amount);

        let (totals, replacement) = match &request.items {
            Some(items) => {
                let totals = price_items(items, tax_rate, discount_amount)?;
                let replacement = new_items(items, &totals);
                (totals, Some(replacement))
            }
            None => {
                let stored = self.db.get_invoice_items(account_id, invoice_id).await?;
                let totals = pricing::calculate(
                    stored.iter().map(|item| (item.quantity, item.unit_price)),
                    tax_rate,
                    discount_amount,
                )?;
                (totals, None)
            }
        };

        self.db
            .update_invoice_header(
                &mut tx,
                account_id,
                invoice_id,
                &NewInvoice {
                    account_id,
                    client_id,
                    invoice_number: current.invoice_number.clone(),
                    issue_date,
                    due_date,
                    currency,
                    subtotal: totals.subtotal,
                    tax_rate: totals.tax_rate,
                    tax_amount: totals.tax_amount,
                    discount_amount: totals.discount_amount,
                    total_amount: totals.total_amount,
                    template_id,
                    notes: request.notes.or(current.notes),
                    terms_and_conditions: request
                        .terms_and_conditions
                        .or(current.terms_and_conditions),
                },
            )
            .await?;

        if let Some(items) = replacement {
            self.db
                .replace_invoice_items(&mut tx, account_id, invoice_id, &items)
                .await?;
        }

        tx.commit().await.map_err(|e| {
            InvoiceError::Storage(anyhow::anyhow!("Failed to commit invoice update: {}", e))
        })?;

        info!(total_amount = %totals.total_amount, "Draft invoice updated");

        self.get_invoice(account_id, invoice_id).await
    }

    /// Move an invoice to a new status under the lifecycle rules.
    #[instrument(skip(self, request), fields(account_id = %account_id, invoice_id = %invoice_id, status = %request.status))]
    pub async fn update_invoice_status(
        &self,
        account_id: Uuid,
        invoice_id: Uuid,
        request: UpdateInvoiceStatusRequest,
    ) -> Result<InvoiceDetails, InvoiceError> {
        let target: InvoiceStatus = request
            .status
            .trim()
            .parse()
            .map_err(|e: crate::models::UnknownStatus| InvoiceError::InvalidInput(e.to_string()))?;

        let mut tx = self.db.begin().await?;

        let current = self
            .db
            .lock_invoice(&mut tx, account_id, invoice_id)
            .await?
            .ok_or_else(|| InvoiceError::not_found("invoice"))?;
        let from = stored_status(&current)?;

        let change = lifecycle::plan_status_change(
            from,
            target,
            request.paid_date.as_deref(),
            Utc::now(),
        )?;

        self.db
            .update_invoice_status(&mut tx, account_id, invoice_id, &change)
            .await?;

        tx.commit().await.map_err(|e| {
            InvoiceError::Storage(anyhow::anyhow!("Failed to commit status change: {}", e))
        })?;

        INVOICES_TOTAL.with_label_values(&[target.as_str()]).inc();

        info!(from = %from, to = %target, "Invoice status changed");

        self.get_invoice(account_id, invoice_id).await
    }

    /// Hard-delete a draft.
    #[instrument(skip(self), fields(account_id = %account_id, invoice_id = %invoice_id))]
    pub async fn delete_invoice(&self, account_id: Uuid, invoice_id: Uuid) -> Result<(), InvoiceError> {
        let mut tx = self.db.begin().await?;

        let current = self
            .db
            .lock_invoice(&mut tx, account_id, invoice_id)
            .await?
            .ok_or_else(|| InvoiceError::not_found("invoice"))?;
        lifecycle::ensure_deletable(stored_status(&current)?)?;

        self.db.delete_invoice(&mut tx, account_id, invoice_id).await?;

        tx.commit().await.map_err(|e| {
            InvoiceError::Storage(anyhow::anyhow!("Failed to commit invoice delete: {}", e))
        })?;

        info!(invoice_number = %current.invoice_number, "Invoice deleted");

        Ok(())
    }

    /// Render the invoice as a PDF issued by its account and stamp the
    /// generation time.
    #[instrument(skip(self), fields(account_id = %account_id, invoice_id = %invoice_id))]
    pub async fn render_pdf(
        &self,
        account_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<InvoiceDocument, InvoiceError> {
        let details = self.get_invoice(account_id, invoice_id).await?;
        let account = self
            .db
            .get_account(account_id)
            .await?
            .ok_or_else(|| InvoiceError::not_found("account"))?;

        let bytes = pdf::render_invoice(&details, &account)?;
        self.db.mark_pdf_generated(account_id, invoice_id).await?;

        info!(
            invoice_number = %details.invoice.invoice_number,
            size = bytes.len(),
            "Invoice PDF rendered"
        );

        Ok(InvoiceDocument {
            file_name: format!("{}.pdf", details.invoice.invoice_number),
            bytes,
        })
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn get_stats(&self, account_id: Uuid) -> Result<InvoiceStats, InvoiceError> {
        self.db.invoice_stats(account_id).await
    }

    /// Copy an invoice into a fresh draft issued today and due in 30 days.
    ///
    /// Goes through [`Self::create_invoice`], so the copy takes a new number
    /// and counts against the plan quota.
    #[instrument(skip(self), fields(account_id = %account_id, invoice_id = %invoice_id))]
    pub async fn duplicate_invoice(
        &self,
        account_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<InvoiceDetails, InvoiceError> {
        let source = self
            .db
            .get_invoice(account_id, invoice_id)
            .await?
            .ok_or_else(|| InvoiceError::not_found("invoice"))?;
        let items = self.db.get_invoice_items(account_id, invoice_id).await?;

        let issue_date = Utc::now().date_naive();
        let due_date = issue_date + Duration::days(DUPLICATE_PAYMENT_TERMS_DAYS);

        let request = CreateInvoiceRequest {
            client_id: source.client_id,
            issue_date: issue_date.format(DATE_FORMAT).to_string(),
            due_date: due_date.format(DATE_FORMAT).to_string(),
            currency: Some(source.currency),
            tax_rate: source.tax_rate,
            discount_amount: source.discount_amount,
            template_id: Some(source.template_id),
            notes: source.notes,
            terms_and_conditions: source.terms_and_conditions,
            items: items
                .into_iter()
                .map(|item| InvoiceItemRequest {
                    description: item.description,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
        };

        let copy = self.create_invoice(account_id, request).await?;

        info!(
            source_number = %source.invoice_number,
            copy_id = %copy.invoice.invoice_id,
            "Invoice duplicated"
        );

        Ok(copy)
    }

    async fn hydrate(&self, invoice: Invoice) -> Result<InvoiceDetails, InvoiceError> {
        let items = self
            .db
            .get_invoice_items(invoice.account_id, invoice.invoice_id)
            .await?;
        let client = self
            .db
            .get_billed_client(invoice.account_id, invoice.client_id)
            .await?;
        Ok(InvoiceDetails {
            invoice,
            items,
            client,
        })
    }
}

fn enforce_quota(account: &Account) -> Result<(), InvoiceError> {
    check_invoice_quota(account).inspect_err(|_| {
        QUOTA_REJECTIONS_TOTAL.inc();
        warn!(
            account_id = %account.account_id,
            count = account.monthly_invoice_count,
            limit = account.monthly_invoice_limit,
            "Invoice quota reached"
        );
    })
}

fn validate_items(items: &[InvoiceItemRequest]) -> Result<(), InvoiceError> {
    for item in items {
        item.validate()?;
    }
    Ok(())
}

fn price_items(
    items: &[InvoiceItemRequest],
    tax_rate: Decimal,
    discount_amount: Decimal,
) -> Result<Totals, InvoiceError> {
    pricing::calculate(
        items.iter().map(|item| (item.quantity, item.unit_price)),
        tax_rate,
        discount_amount,
    )
}

fn new_items(items: &[InvoiceItemRequest], totals: &Totals) -> Vec<NewInvoiceItem> {
    items
        .iter()
        .zip(&totals.lines)
        .enumerate()
        .map(|(position, (item, line))| NewInvoiceItem {
            description: item.description.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            amount: line.amount,
            sort_order: position as i32,
        })
        .collect()
}

fn ensure_due_after_issue(issue_date: NaiveDate, due_date: NaiveDate) -> Result<(), InvoiceError> {
    if due_date < issue_date {
        return Err(InvoiceError::InvalidInput(
            "due_date must not be before issue_date".to_string(),
        ));
    }
    Ok(())
}

fn resolve_template(template_id: Option<&str>) -> Result<String, InvoiceError> {
    match template_id.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(InvoiceTemplate::Default.as_str().to_string()),
        Some(value) => InvoiceTemplate::parse(value)
            .map(|t| t.as_str().to_string())
            .ok_or_else(|| {
                InvoiceError::InvalidInput(format!(
                    "unknown template_id '{}', expected one of default, modern, minimal, professional",
                    value
                ))
            }),
    }
}

fn stored_status(invoice: &Invoice) -> Result<InvoiceStatus, InvoiceError> {
    invoice
        .status()
        .map_err(|e| InvoiceError::Storage(anyhow::Error::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(description: &str, quantity: &str, unit_price: &str) -> InvoiceItemRequest {
        InvoiceItemRequest {
            description: description.to_string(),
            quantity: quantity.parse().unwrap(),
            unit_price: unit_price.parse().unwrap(),
        }
    }

    #[test]
    fn template_defaults_and_rejects_unknown() {
        assert_eq!(resolve_template(None).unwrap(), "default");
        assert_eq!(resolve_template(Some("  ")).unwrap(), "default");
        assert_eq!(resolve_template(Some("minimal")).unwrap(), "minimal");
        assert!(matches!(
            resolve_template(Some("glossy")),
            Err(InvoiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn due_date_may_equal_but_not_precede_issue_date() {
        let day = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        assert!(ensure_due_after_issue(day, day).is_ok());
        assert!(ensure_due_after_issue(day, day.pred_opt().unwrap()).is_err());
    }

    #[test]
    fn new_items_keep_submission_order_and_priced_amounts() {
        let requested = vec![item("Design", "2", "100"), item("Hosting", "1", "9.999")];
        let totals = price_items(&requested, Decimal::ZERO, Decimal::ZERO).unwrap();

        let items = new_items(&requested, &totals);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].sort_order, 0);
        assert_eq!(items[0].description, "Design");
        assert_eq!(items[1].sort_order, 1);
        assert_eq!(items[1].unit_price, "9.999".parse::<Decimal>().unwrap());
        assert_eq!(items[1].amount, "10.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn item_validation_reports_invalid_input() {
        let err = validate_items(&[item("", "1", "1")]).unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidInput(_)));
    }
}
