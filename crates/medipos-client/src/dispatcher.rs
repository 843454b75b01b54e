//! # Checkout Dispatcher
//!
//! Runs the effects the session reducer asks for: backend calls, receipt
//! output and the session updates that follow them.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Effect::Submit                                  │
//! │                               │                                         │
//! │                               ▼                                         │
//! │                    PosApi::submit (POST /sales | /returns)              │
//! │                      │                        │                         │
//! │                 Ok(outcome)                Err(e)                       │
//! │                      │                        │                         │
//! │                      ▼                        ▼                         │
//! │         ReceiptDocument::build        finish_failure(e.user_message)    │
//! │         └─► sink (HTML file)          back to Reviewing, cart intact    │
//! │         └─► plain summary on error                                      │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │         refresh catalog (awaited)                                       │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │         finish_success: cart reset, Idle                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Local validation happens in the reducer, so a cart that fails it never
//! produces an `Effect::Submit` and the backend is never called.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use medipos_core::prescription::{render_prescription, PrescriptionContext};
use medipos_core::receipt::{fallback_summary, short_id, ReceiptDocument};
use medipos_core::types::TransactionOutcome;
use medipos_core::workflow::{Notice, Submission};
use medipos_core::{dispatch, Effect, KeyInput, TransactionMode};
use tracing::{debug, error, info, warn};

use crate::api::PosApi;
use crate::error::ClientResult;
use crate::session::SharedSession;
use crate::sink::ReceiptSink;

/// Splits reducer output into notices to show now and work to run.
pub fn partition(effects: Vec<Effect>) -> (Vec<Notice>, Vec<Effect>) {
    let mut notices = Vec::new();
    let mut work = Vec::new();
    for effect in effects {
        match effect {
            Effect::Notice(notice) => notices.push(notice),
            other => work.push(other),
        }
    }
    (notices, work)
}

pub struct Dispatcher<A, S> {
    api: Arc<A>,
    sink: Arc<S>,
    session: SharedSession,
}

impl<A, S> Clone for Dispatcher<A, S> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            sink: Arc::clone(&self.sink),
            session: self.session.clone(),
        }
    }
}

impl<A: PosApi, S: ReceiptSink> Dispatcher<A, S> {
    pub fn new(api: A, sink: S, session: SharedSession) -> Self {
        Self {
            api: Arc::new(api),
            sink: Arc::new(sink),
            session,
        }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Loads settings, catalog and customers.
    ///
    /// Settings fall back to the built-in defaults and customers to an empty
    /// list; only a missing catalog is reported to the operator. When the
    /// catalog fetch could not reach the backend at all, the customer list
    /// is not attempted.
    pub async fn bootstrap(&self) -> Vec<Notice> {
        let mut notices = Vec::new();

        match self.api.fetch_settings().await {
            Ok(settings) => self.session.with_session_mut(|s| s.set_settings(settings)),
            Err(err) => warn!(error = %err, "Shop settings unavailable, using defaults"),
        }

        if let Err(err) = self.refresh_catalog().await {
            notices.push(Notice::error(format!(
                "Could not load medicines: {}",
                err.user_message()
            )));
            if err.is_connection() {
                warn!("Backend unreachable, skipping customer list");
                return notices;
            }
        }

        match self.api.list_customers().await {
            Ok(customers) => {
                debug!(count = customers.len(), "Customers loaded");
                self.session.with_session_mut(|s| s.replace_customers(customers));
            }
            Err(err) => warn!(error = %err, "Customer list unavailable"),
        }

        notices
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Feeds one key press to the session.
    pub fn press(&self, input: KeyInput) -> Vec<Effect> {
        self.session.with_session_mut(|s| dispatch(s, input))
    }

    /// Feeds one key press and runs whatever it asks for.
    pub async fn press_and_run(&self, input: KeyInput) -> Vec<Notice> {
        let effects = self.press(input);
        self.run(effects).await
    }

    /// Runs effects in order and collects the resulting notices.
    pub async fn run(&self, effects: Vec<Effect>) -> Vec<Notice> {
        let mut notices = Vec::new();
        for effect in effects {
            match effect {
                Effect::Notice(notice) => notices.push(notice),
                Effect::LoadHistory { customer_id } => self.load_history(&customer_id).await,
                Effect::Submit(submission) => notices.extend(self.submit(submission).await),
                Effect::RefreshCatalog => match self.refresh_catalog().await {
                    Ok(count) => notices.push(Notice::info(format!("Stock refreshed ({count} items)"))),
                    Err(err) => notices.push(Notice::error(format!(
                        "Could not refresh stock: {}",
                        err.user_message()
                    ))),
                },
            }
        }
        notices
    }

    // =========================================================================
    // Backend Effects
    // =========================================================================

    /// Replaces the catalog; returns the number of items.
    pub async fn refresh_catalog(&self) -> ClientResult<usize> {
        let catalog = self.api.list_catalog().await.map_err(|err| {
            warn!(error = %err, "Catalog refresh failed");
            err
        })?;
        let count = catalog.len();
        self.session.with_session_mut(|s| s.replace_catalog(catalog));
        debug!(count, "Catalog loaded");
        Ok(count)
    }

    async fn load_history(&self, customer_id: &str) {
        let sales = match self.api.customer_history(customer_id).await {
            Ok(sales) => sales,
            Err(err) => {
                warn!(error = %err, customer_id, "Previous sales unavailable");
                Vec::new()
            }
        };
        self.session
            .with_session_mut(|s| s.apply_history(customer_id, sales));
    }

    async fn submit(&self, submission: Submission) -> Vec<Notice> {
        let outcome = match self.api.submit(&submission.request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, mode = ?submission.mode(), "Transaction rejected");
                let message = err.user_message();
                self.session
                    .with_session_mut(|s| s.finish_failure(&message));
                return vec![Notice::error(message)];
            }
        };

        info!(
            id = %outcome.id,
            mode = ?submission.mode(),
            total = %submission.totals.total,
            "Transaction accepted"
        );

        let mut notices = self.deliver_receipt(&submission, &outcome);

        if let Err(err) = self.refresh_catalog().await {
            notices.push(Notice::error(format!(
                "Stock list may be out of date: {}",
                err.user_message()
            )));
        }

        let total = self
            .session
            .with_session_mut(|s| {
                let total = s.settings().format_currency(submission.totals.total);
                s.finish_success().map(|_| total)
            });
        match total {
            Ok(total) => {
                let label = match submission.mode() {
                    TransactionMode::Sale => "Sale",
                    TransactionMode::Return => "Return",
                };
                notices.insert(0, Notice::info(format!("{label} completed: {total}")));
            }
            Err(err) => warn!(error = %err, "Session left submitting state early"),
        }
        notices
    }

    // =========================================================================
    // Documents
    // =========================================================================

    /// Renders and writes the receipt. Never fails the transaction.
    fn deliver_receipt(&self, submission: &Submission, outcome: &TransactionOutcome) -> Vec<Notice> {
        let settings = self.session.with_session(|s| s.settings().clone());
        let printed_at = Local::now().fixed_offset();

        let document = match ReceiptDocument::build(submission, outcome, &settings, printed_at) {
            Ok(document) => document,
            Err(err) => {
                warn!(error = %err, "Receipt template invalid, printing summary");
                return vec![Notice::info(fallback_summary(submission, outcome, &settings))];
            }
        };

        let name = format!("receipt-{}", short_id(&outcome.id));
        let open = settings.printer.auto_print_receipts;
        match self.sink.deliver(&name, &document.render_html(), open) {
            Ok(Some(path)) => vec![Notice::info(format!("Receipt saved to {}", path.display()))],
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "Receipt output failed, printing text");
                vec![
                    Notice::error(err.user_message()),
                    Notice::info(document.render_plain()),
                ]
            }
        }
    }

    /// Renders a prescription page with the current shop settings.
    pub fn print_prescription(&self, context: &PrescriptionContext) -> ClientResult<Option<PathBuf>> {
        let settings = self.session.with_session(|s| s.settings().clone());
        let html = render_prescription(context, &settings, Local::now().fixed_offset())?;
        let name = match &context.prescription.id {
            Some(id) => format!("prescription-{}", short_id(id)),
            None => "prescription".to_string(),
        };
        self.sink.deliver(&name, &html, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use medipos_core::money::Money;
    use medipos_core::settings::ShopSettings;
    use medipos_core::types::{CatalogItem, Customer, PastTransaction, TransactionRequest};
    use medipos_core::workflow::{Key, NoticeLevel, UiState};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    // =========================================================================
    // Fakes
    // =========================================================================

    #[derive(Default)]
    struct FakeApi {
        catalog: Mutex<Vec<CatalogItem>>,
        catalog_after_submit: Option<Vec<CatalogItem>>,
        customers: Vec<Customer>,
        history: Vec<PastTransaction>,
        settings: Option<ShopSettings>,
        fail_customers: bool,
        offline: bool,
        customer_requests: AtomicUsize,
        reject_with: Option<(u16, String)>,
        gate: Option<Arc<Notify>>,
        submits: AtomicUsize,
        submitted: Mutex<Vec<TransactionRequest>>,
    }

    impl PosApi for FakeApi {
        async fn list_catalog(&self) -> ClientResult<Vec<CatalogItem>> {
            if self.offline {
                return Err(unreachable_backend());
            }
            Ok(self.catalog.lock().unwrap().clone())
        }

        async fn list_customers(&self) -> ClientResult<Vec<Customer>> {
            self.customer_requests.fetch_add(1, Ordering::SeqCst);
            if self.fail_customers {
                return Err(ClientError::Server {
                    status: 500,
                    detail: None,
                });
            }
            Ok(self.customers.clone())
        }

        async fn fetch_settings(&self) -> ClientResult<ShopSettings> {
            self.settings.clone().ok_or_else(unreachable_backend)
        }

        async fn submit(&self, request: &TransactionRequest) -> ClientResult<TransactionOutcome> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            self.submitted.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if let Some((status, detail)) = &self.reject_with {
                return Err(ClientError::Server {
                    status: *status,
                    detail: Some(detail.clone()),
                });
            }
            if let Some(next) = &self.catalog_after_submit {
                *self.catalog.lock().unwrap() = next.clone();
            }
            Ok(TransactionOutcome {
                id: "5f0c7d2e-1b9a-4c7e-9d31-12a1b2c3".to_string(),
                created_at: None,
            })
        }

        async fn customer_history(&self, _customer_id: &str) -> ClientResult<Vec<PastTransaction>> {
            Ok(self.history.clone())
        }
    }

    fn unreachable_backend() -> ClientError {
        ClientError::Connection {
            url: "http://localhost:8001/".to_string(),
            message: "Cannot reach the pharmacy server".to_string(),
        }
    }

    /// Records documents as (name, html, opened).
    #[derive(Default)]
    struct MemorySink {
        documents: Mutex<Vec<(String, String, bool)>>,
    }

    impl ReceiptSink for MemorySink {
        fn deliver(&self, name: &str, html: &str, open: bool) -> ClientResult<Option<PathBuf>> {
            self.documents
                .lock()
                .unwrap()
                .push((name.to_string(), html.to_string(), open));
            Ok(None)
        }
    }

    fn item(id: &str, name: &str, price_cents: i64, stock: i64) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: name.to_string(),
            generic_name: None,
            unit_price: Money::new(price_cents, 2),
            stock_quantity: stock,
            minimum_stock_level: 2,
        }
    }

    fn customer(id: &str, name: &str) -> Customer {
        Customer {
            id: id.to_string(),
            name: name.to_string(),
            phone: None,
            email: None,
            address: None,
            date_of_birth: None,
            gender: None,
            medical_history: None,
        }
    }

    fn api() -> FakeApi {
        FakeApi {
            catalog: Mutex::new(vec![item("m1", "Amoxicillin", 1000, 5)]),
            settings: Some(ShopSettings::default()),
            customers: vec![customer("p1", "Ayesha Khan")],
            ..FakeApi::default()
        }
    }

    async fn ready(api: FakeApi) -> Dispatcher<FakeApi, MemorySink> {
        let dispatcher = Dispatcher::new(api, MemorySink::default(), SharedSession::default());
        dispatcher.bootstrap().await;
        dispatcher
    }

    /// Puts one unit of the first catalog item in the cart.
    fn add_first_item(dispatcher: &Dispatcher<FakeApi, MemorySink>) {
        dispatcher.session().with_session_mut(|s| {
            s.open_search();
            s.set_search_query("amox");
            s.select_highlighted();
            s.confirm_quantity();
        });
    }

    fn ctrl_enter() -> KeyInput {
        KeyInput::ctrl(Key::Enter)
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[tokio::test]
    async fn test_bootstrap_loads_everything() {
        let dispatcher = ready(api()).await;
        dispatcher.session().with_session(|s| {
            assert_eq!(s.catalog().len(), 1);
            assert_eq!(s.customers().len(), 1);
        });
    }

    #[tokio::test]
    async fn test_bootstrap_degrades_on_secondary_failures() {
        let mut fake = api();
        fake.settings = None;
        fake.fail_customers = true;
        let dispatcher = Dispatcher::new(fake, MemorySink::default(), SharedSession::default());

        let notices = dispatcher.bootstrap().await;

        assert!(notices.is_empty());
        dispatcher.session().with_session(|s| {
            assert_eq!(s.catalog().len(), 1);
            assert!(s.customers().is_empty());
            assert_eq!(s.settings(), &ShopSettings::default());
        });
    }

    #[tokio::test]
    async fn test_bootstrap_stops_when_backend_unreachable() {
        let mut fake = api();
        fake.settings = None;
        fake.offline = true;
        let dispatcher = Dispatcher::new(fake, MemorySink::default(), SharedSession::default());

        let notices = dispatcher.bootstrap().await;

        assert_eq!(
            notices,
            vec![Notice::error(
                "Could not load medicines: Cannot reach the pharmacy server"
            )]
        );
        assert_eq!(dispatcher.api.customer_requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_underpaid_cash_never_calls_backend() {
        let dispatcher = ready(api()).await;
        add_first_item(&dispatcher);
        dispatcher
            .session()
            .with_session_mut(|s| s.set_received_text("5"));

        let notices = dispatcher.press_and_run(ctrl_enter()).await;

        assert_eq!(dispatcher.api.submits.load(Ordering::SeqCst), 0);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(dispatcher.session().with_session(|s| s.cart().lines().len()), 1);
    }

    #[tokio::test]
    async fn test_successful_sale_prints_refreshes_and_resets() {
        let mut fake = api();
        fake.catalog_after_submit = Some(vec![item("m1", "Amoxicillin", 1000, 4)]);
        let dispatcher = ready(fake).await;
        add_first_item(&dispatcher);
        dispatcher
            .session()
            .with_session_mut(|s| s.set_received_text("50"));

        let notices = dispatcher.press_and_run(ctrl_enter()).await;

        assert_eq!(dispatcher.api.submits.load(Ordering::SeqCst), 1);
        assert_eq!(notices[0], Notice::info("Sale completed: $11.00"));

        let documents = dispatcher.sink.documents.lock().unwrap().clone();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].0, "receipt-12a1b2c3");
        assert!(documents[0].1.contains("SALE RECEIPT"));

        dispatcher.session().with_session(|s| {
            assert!(s.cart().is_empty());
            assert_eq!(s.ui(), &UiState::Idle);
            assert_eq!(s.catalog()[0].stock_quantity, 4);
        });
    }

    #[tokio::test]
    async fn test_backend_rejection_keeps_cart_and_shows_detail() {
        let mut fake = api();
        fake.reject_with = Some((400, "Insufficient stock for Amoxicillin".to_string()));
        let dispatcher = ready(fake).await;
        add_first_item(&dispatcher);
        dispatcher
            .session()
            .with_session_mut(|s| s.set_received_text("50"));

        let notices = dispatcher.press_and_run(ctrl_enter()).await;

        assert_eq!(
            notices,
            vec![Notice::error("Insufficient stock for Amoxicillin")]
        );
        dispatcher.session().with_session(|s| {
            assert_eq!(s.cart().lines().len(), 1);
            match s.ui() {
                UiState::Reviewing(review) => assert_eq!(
                    review.error.as_deref(),
                    Some("Insufficient stock for Amoxicillin")
                ),
                other => panic!("expected review, got {other:?}"),
            }
        });
        assert!(dispatcher.sink.documents.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_submit_refused_while_first_in_flight() {
        let gate = Arc::new(Notify::new());
        let mut fake = api();
        fake.gate = Some(Arc::clone(&gate));
        let dispatcher = ready(fake).await;
        add_first_item(&dispatcher);
        dispatcher
            .session()
            .with_session_mut(|s| s.set_received_text("50"));

        let effects = dispatcher.press(ctrl_enter());
        let worker = dispatcher.clone();
        let in_flight = tokio::spawn(async move { worker.run(effects).await });
        while dispatcher.api.submits.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let (notices, work) = partition(dispatcher.press(ctrl_enter()));
        assert!(work.is_empty());
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);

        gate.notify_one();
        in_flight.await.unwrap();
        assert_eq!(dispatcher.api.submits.load(Ordering::SeqCst), 1);
        assert!(dispatcher.session().with_session(|s| s.cart().is_empty()));
    }

    #[tokio::test]
    async fn test_bad_receipt_template_falls_back_to_summary() {
        let mut settings = ShopSettings::default();
        settings.printer.receipt_footer = "Thanks {{unknown_token}}".to_string();
        let mut fake = api();
        fake.settings = Some(settings);
        let dispatcher = ready(fake).await;
        add_first_item(&dispatcher);
        dispatcher
            .session()
            .with_session_mut(|s| s.set_received_text("50"));

        let notices = dispatcher.press_and_run(ctrl_enter()).await;

        assert!(notices
            .iter()
            .any(|n| n.message == "Sale 12a1b2c3 for Walk-in Customer: $11.00 (1 items, CASH)"));
        assert!(dispatcher.sink.documents.lock().unwrap().is_empty());
        assert!(dispatcher.session().with_session(|s| s.cart().is_empty()));
    }

    #[tokio::test]
    async fn test_receipt_not_opened_when_shop_disables_auto_print() {
        let mut settings = ShopSettings::default();
        settings.printer.auto_print_receipts = false;
        let mut fake = api();
        fake.settings = Some(settings);
        let dispatcher = ready(fake).await;
        add_first_item(&dispatcher);
        dispatcher
            .session()
            .with_session_mut(|s| s.set_received_text("20"));

        dispatcher.press_and_run(ctrl_enter()).await;

        let documents = dispatcher.sink.documents.lock().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].0, "receipt-12a1b2c3");
        assert!(!documents[0].2);
    }

    #[tokio::test]
    async fn test_receipt_opened_when_shop_enables_auto_print() {
        let mut settings = ShopSettings::default();
        settings.printer.auto_print_receipts = true;
        let mut fake = api();
        fake.settings = Some(settings);
        let dispatcher = ready(fake).await;
        add_first_item(&dispatcher);
        dispatcher
            .session()
            .with_session_mut(|s| s.set_received_text("20"));

        dispatcher.press_and_run(ctrl_enter()).await;

        assert!(dispatcher.sink.documents.lock().unwrap()[0].2);
    }

    #[tokio::test]
    async fn test_history_loaded_for_picked_customer() {
        let mut fake = api();
        fake.history = vec![PastTransaction {
            id: "s1".to_string(),
            items: Vec::new(),
            subtotal: Money::new(500, 2),
            discount_amount: Money::zero(),
            tax_amount: Money::zero(),
            total_amount: Money::new(500, 2),
            payment_method: Default::default(),
            created_at: None,
        }];
        let dispatcher = ready(fake).await;

        let effects = dispatcher
            .session()
            .with_session_mut(|s| s.pick_customer("p1"));
        dispatcher.run(effects).await;

        assert_eq!(dispatcher.session().with_session(|s| s.history().len()), 1);
    }

    #[tokio::test]
    async fn test_manual_refresh_reports_count() {
        let dispatcher = ready(api()).await;
        let notices = dispatcher.run(vec![Effect::RefreshCatalog]).await;
        assert_eq!(notices, vec![Notice::info("Stock refreshed (1 items)")]);
    }

    #[tokio::test]
    async fn test_prescription_goes_to_sink() {
        let dispatcher = ready(api()).await;
        let mut context = PrescriptionContext::default();
        context.prescription.id = Some("rx-0001-abcdef12".to_string());

        dispatcher.print_prescription(&context).unwrap();

        let documents = dispatcher.sink.documents.lock().unwrap();
        assert_eq!(documents[0].0, "prescription-abcdef12");
        assert!(documents[0].1.contains("Dr. Unknown"));
    }
}
