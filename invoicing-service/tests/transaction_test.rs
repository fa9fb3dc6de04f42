//! Invoice creation must commit fully or not at all.

mod common;

use common::{invoice_request, item, TestApp};
use invoicing_service::services::InvoiceError;
use uuid::Uuid;

/// Item description the test trigger refuses to store.
const REJECTED_DESCRIPTION: &str = "reject-on-insert";

/// Make inserts of items carrying [`REJECTED_DESCRIPTION`] fail inside the
/// database, after the invoice header has been written.
async fn install_item_rejection_trigger(app: &TestApp) {
    sqlx::raw_sql(
        r#"
        CREATE OR REPLACE FUNCTION reject_marked_invoice_item() RETURNS trigger AS $$
        BEGIN
            IF NEW.description = 'reject-on-insert' THEN
                RAISE EXCEPTION 'invoice item rejected';
            END IF;
            RETURN NEW;
        END;
        $$ LANGUAGE plpgsql;

        DROP TRIGGER IF EXISTS reject_marked_invoice_item ON invoice_items;
        CREATE TRIGGER reject_marked_invoice_item
            BEFORE INSERT ON invoice_items
            FOR EACH ROW EXECUTE FUNCTION reject_marked_invoice_item();
        "#,
    )
    .execute(app.db.pool())
    .await
    .expect("Failed to install item trigger");
}

async fn count_rows(app: &TestApp, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM {} WHERE account_id = $1",
        table
    ))
    .bind(app.account_id())
    .fetch_one(app.db.pool())
    .await
    .expect("Failed to count rows")
}

#[tokio::test]
async fn failed_item_insert_rolls_back_header_and_counters() {
    let Some(app) = TestApp::spawn().await else { return };
    install_item_rejection_trigger(&app).await;
    let client = app.create_client("Acme Corp").await;

    let request = invoice_request(
        client.client_id,
        vec![item("Design", "1", "100"), item(REJECTED_DESCRIPTION, "1", "50")],
    );

    let err = app
        .invoices
        .create_invoice(app.account_id(), request)
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::Storage(_)));

    let account = app.reload_account().await;
    assert_eq!(account.next_invoice_number, 1);
    assert_eq!(account.monthly_invoice_count, 0);
    assert_eq!(count_rows(&app, "invoices").await, 0);
    assert_eq!(count_rows(&app, "invoice_items").await, 0);

    let stats = app.invoices.get_stats(app.account_id()).await.unwrap();
    assert_eq!(stats.total_invoices, 0);

    // The same account still numbers from the start once the input is fine.
    let created = app
        .invoices
        .create_invoice(
            app.account_id(),
            invoice_request(client.client_id, vec![item("Design", "1", "100")]),
        )
        .await
        .expect("Failed to create invoice");
    assert_eq!(created.invoice.invoice_number, "INV-0001");
}

#[tokio::test]
async fn number_collision_leaves_counters_untouched() {
    let Some(app) = TestApp::spawn().await else { return };
    let client = app.create_client("Globex").await;

    // A row holding the next number without the counter having advanced.
    sqlx::query(
        r#"
        INSERT INTO invoices (
            invoice_id, account_id, client_id, invoice_number, issue_date, due_date, currency
        )
        VALUES ($1, $2, $3, 'INV-0001', DATE '2026-01-01', DATE '2026-01-31', 'INR')
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(app.account_id())
    .bind(client.client_id)
    .execute(app.db.pool())
    .await
    .expect("Failed to seed invoice");

    let err = app
        .invoices
        .create_invoice(
            app.account_id(),
            invoice_request(client.client_id, vec![item("Work", "2", "10")]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::Storage(_)));

    let account = app.reload_account().await;
    assert_eq!(account.next_invoice_number, 1);
    assert_eq!(account.monthly_invoice_count, 0);
    assert_eq!(count_rows(&app, "invoices").await, 1);
    assert_eq!(count_rows(&app, "invoice_items").await, 0);
}
