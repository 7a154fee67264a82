//! Integration tests for the plan-page interactor, driven end to end
//! against in-memory collaborator fakes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use checkout_plans::storage::MemoryStore;
use checkout_plans::{
    Analytics, ApiFile, AuthApi, CheckoutError, Collaborators, CoverRenderer, FileKind, FilesApi,
    InteractorConfig, KeyValueStore, PlanId, PlanInteractor, Product, ProductPrice,
    ProductsSource, QueryMap, QueryValue, RemoteConfigSnapshot, RemoteConfigSource, Router,
    SessionSnapshot, SessionSource, StorageKey,
};

// ── Fakes ────────────────────────────────────────────────────────────────

struct FakeRouter {
    query: Mutex<QueryMap>,
    pushes: Mutex<Vec<(String, QueryMap)>>,
    backs: AtomicUsize,
}

impl FakeRouter {
    fn new(query: QueryMap) -> Self {
        Self {
            query: Mutex::new(query),
            pushes: Mutex::new(Vec::new()),
            backs: AtomicUsize::new(0),
        }
    }

    fn set_query(&self, query: QueryMap) {
        *self.query.lock().unwrap() = query;
    }

    fn pushes(&self) -> Vec<(String, QueryMap)> {
        self.pushes.lock().unwrap().clone()
    }
}

impl Router for FakeRouter {
    fn query(&self) -> QueryMap {
        self.query.lock().unwrap().clone()
    }

    fn push(&self, path: &str, query: &QueryMap) {
        self.pushes
            .lock()
            .unwrap()
            .push((path.to_string(), query.clone()));
    }

    fn back(&self) {
        self.backs.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct FakeAuth {
    tokens: Mutex<Vec<String>>,
}

#[async_trait]
impl AuthApi for FakeAuth {
    async fn exchange_token(&self, token: &str) -> Result<(), CheckoutError> {
        self.tokens.lock().unwrap().push(token.to_string());
        Ok(())
    }
}

struct FakeFiles {
    files: Vec<ApiFile>,
    list_calls: AtomicUsize,
    fail_urls: bool,
}

impl FakeFiles {
    fn new(files: Vec<ApiFile>) -> Self {
        Self {
            files,
            list_calls: AtomicUsize::new(0),
            fail_urls: false,
        }
    }
}

#[async_trait]
impl FilesApi for FakeFiles {
    async fn list_files(&self) -> Result<Vec<ApiFile>, CheckoutError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.files.clone())
    }

    async fn download_url(&self, file_id: &str) -> Result<String, CheckoutError> {
        if self.fail_urls {
            return Err(CheckoutError::Api {
                endpoint: "/files".into(),
                reason: "HTTP 500".into(),
            });
        }
        Ok(format!("https://cdn.test/{file_id}/original"))
    }

    async fn edited_download_url(&self, file_id: &str) -> Result<String, CheckoutError> {
        if self.fail_urls {
            return Err(CheckoutError::Api {
                endpoint: "/files".into(),
                reason: "HTTP 500".into(),
            });
        }
        Ok(format!("https://cdn.test/{file_id}/edited"))
    }
}

#[derive(Default)]
struct FakeCover {
    calls: Mutex<Vec<(String, u32)>>,
}

#[async_trait]
impl CoverRenderer for FakeCover {
    async fn render_cover(&self, source_url: &str, width: u32) -> Result<Vec<u8>, CheckoutError> {
        self.calls
            .lock()
            .unwrap()
            .push((source_url.to_string(), width));
        Ok(format!("png:{source_url}").into_bytes())
    }
}

#[derive(Default)]
struct FakeProducts {
    products: Mutex<Vec<Product>>,
}

impl ProductsSource for FakeProducts {
    fn products(&self) -> Vec<Product> {
        self.products.lock().unwrap().clone()
    }
}

struct FakeSession {
    session: Mutex<SessionSnapshot>,
}

impl SessionSource for FakeSession {
    fn session(&self) -> SessionSnapshot {
        self.session.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct FakeRemoteConfig {
    snapshot: Mutex<RemoteConfigSnapshot>,
}

impl RemoteConfigSource for FakeRemoteConfig {
    fn snapshot(&self) -> RemoteConfigSnapshot {
        self.snapshot.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct CountingAnalytics {
    views: AtomicUsize,
    continues: Mutex<Vec<(PlanId, Option<String>)>>,
}

impl Analytics for CountingAnalytics {
    fn page_viewed(&self) {
        self.views.fetch_add(1, Ordering::SeqCst);
    }

    fn checkout_continued(&self, plan: PlanId, place: Option<&str>) {
        self.continues
            .lock()
            .unwrap()
            .push((plan, place.map(str::to_string)));
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

struct Harness {
    router: Arc<FakeRouter>,
    auth: Arc<FakeAuth>,
    files: Arc<FakeFiles>,
    cover: Arc<FakeCover>,
    products: Arc<FakeProducts>,
    session: Arc<FakeSession>,
    remote_config: Arc<FakeRemoteConfig>,
    storage: Arc<MemoryStore>,
    analytics: Arc<CountingAnalytics>,
}

impl Harness {
    fn build(
        query: QueryMap,
        session: SessionSnapshot,
        files: FakeFiles,
    ) -> (Self, PlanInteractor) {
        let harness = Harness {
            router: Arc::new(FakeRouter::new(query)),
            auth: Arc::new(FakeAuth::default()),
            files: Arc::new(files),
            cover: Arc::new(FakeCover::default()),
            products: Arc::new(FakeProducts::default()),
            session: Arc::new(FakeSession {
                session: Mutex::new(session),
            }),
            remote_config: Arc::new(FakeRemoteConfig::default()),
            storage: Arc::new(MemoryStore::new()),
            analytics: Arc::new(CountingAnalytics::default()),
        };

        let deps = Collaborators {
            auth: harness.auth.clone(),
            files: harness.files.clone(),
            products: harness.products.clone(),
            remote_config: harness.remote_config.clone(),
            session: harness.session.clone(),
            router: harness.router.clone(),
            storage: harness.storage.clone(),
            analytics: harness.analytics.clone(),
            cover: harness.cover.clone(),
        };

        let interactor = PlanInteractor::new(InteractorConfig::default(), deps);
        (harness, interactor)
    }
}

fn query(pairs: &[(&str, &str)]) -> QueryMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), QueryValue::One(v.to_string())))
        .collect()
}

fn signed_in() -> SessionSnapshot {
    SessionSnapshot {
        email: Some("visitor@example.com".into()),
        email_verified: true,
        subscription: None,
    }
}

fn pdf_file(id: &str, filename: &str) -> ApiFile {
    ApiFile {
        id: id.into(),
        filename: filename.into(),
        internal_type: FileKind::Pdf,
        edited: false,
    }
}

fn image_file(id: &str, filename: &str, kind: FileKind) -> ApiFile {
    ApiFile {
        id: id.into(),
        filename: filename.into(),
        internal_type: kind,
        edited: false,
    }
}

fn three_products() -> Vec<Product> {
    ["monthly", "monthly_full", "annual"]
        .iter()
        .enumerate()
        .map(|(i, name)| Product {
            name: name.to_string(),
            price: ProductPrice {
                price: 1000 * (i as i64 + 1),
                trial_price: 100 * (i as i64 + 1),
                currency: "USD".into(),
            },
        })
        .collect()
}

async fn settle_spawned_tasks() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

// ── Guard machine ────────────────────────────────────────────────────────

#[tokio::test]
async fn subscribed_visitor_is_redirected_to_dashboard() {
    let session = SessionSnapshot {
        subscription: Some("pro".into()),
        ..signed_in()
    };
    let (h, mut interactor) =
        Harness::build(query(&[("source", "editor")]), session, FakeFiles::new(vec![]));

    interactor.mount().await;

    let pushes = h.router.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].0, "/dashboard");
    // Terminal: no impression, no file fetch.
    assert_eq!(h.analytics.views.load(Ordering::SeqCst), 0);
    assert_eq!(h.files.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn visitor_without_email_goes_back() {
    let session = SessionSnapshot {
        email: None,
        ..signed_in()
    };
    let (h, mut interactor) = Harness::build(QueryMap::new(), session, FakeFiles::new(vec![]));

    interactor.mount().await;

    assert_eq!(h.router.backs.load(Ordering::SeqCst), 1);
    assert!(h.router.pushes().is_empty());
    assert_eq!(h.files.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unverified_email_with_token_triggers_exchange() {
    let session = SessionSnapshot {
        email_verified: false,
        ..signed_in()
    };
    let (h, mut interactor) = Harness::build(
        query(&[("token", "one-time-token")]),
        session,
        FakeFiles::new(vec![]),
    );

    interactor.mount().await;
    settle_spawned_tasks().await;

    assert_eq!(
        h.auth.tokens.lock().unwrap().as_slice(),
        ["one-time-token"]
    );
    // The exchange is not a redirect: the page still mounted.
    assert_eq!(h.files.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn verified_email_never_exchanges_tokens() {
    let (h, mut interactor) = Harness::build(
        query(&[("token", "stale-token")]),
        signed_in(),
        FakeFiles::new(vec![]),
    );

    interactor.mount().await;
    settle_spawned_tasks().await;

    assert!(h.auth.tokens.lock().unwrap().is_empty());
}

#[tokio::test]
async fn guard_reruns_when_session_changes() {
    let (h, mut interactor) = Harness::build(QueryMap::new(), signed_in(), FakeFiles::new(vec![]));
    interactor.mount().await;
    assert!(h.router.pushes().is_empty());

    // Subscription appears mid-session (payment completed in another tab).
    h.session.session.lock().unwrap().subscription = Some("pro".into());
    interactor.sync().await;

    let pushes = h.router.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].0, "/dashboard");
}

// ── Selection & continue ─────────────────────────────────────────────────

#[tokio::test]
async fn default_selection_is_monthly_full() {
    let (_h, interactor) = Harness::build(QueryMap::new(), signed_in(), FakeFiles::new(vec![]));
    assert_eq!(interactor.selected_plan(), PlanId::MonthlyFull);
}

#[tokio::test]
async fn tapping_the_selected_plan_confirms_and_navigates() {
    let original_query = query(&[("source", "editor"), ("file", "f1")]);
    let (h, mut interactor) = Harness::build(
        original_query.clone(),
        signed_in(),
        FakeFiles::new(vec![pdf_file("f1", "contract.pdf")]),
    );
    interactor.mount().await;

    interactor.select_plan(PlanId::Annual);
    assert_eq!(interactor.selected_plan(), PlanId::Annual);
    assert!(h.router.pushes().is_empty(), "first tap must not navigate");

    interactor.select_plan(PlanId::Annual);

    let pushes = h.router.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].0, "/payment");
    assert_eq!(pushes[0].1, original_query, "query must be forwarded unchanged");
    assert_eq!(
        h.storage.get(StorageKey::SelectedPlan).as_deref(),
        Some("annual")
    );
}

#[tokio::test]
async fn continue_forwards_place_to_analytics() {
    let (h, mut interactor) = Harness::build(QueryMap::new(), signed_in(), FakeFiles::new(vec![]));
    interactor.mount().await;

    interactor.continue_checkout(Some("sticky_footer"));

    let continues = h.analytics.continues.lock().unwrap();
    assert_eq!(
        continues.as_slice(),
        [(PlanId::MonthlyFull, Some("sticky_footer".to_string()))]
    );
}

// ── Preselection override ────────────────────────────────────────────────

#[tokio::test]
async fn email_campaign_visit_preselects_dedicated_tier() {
    let (_h, mut interactor) = Harness::build(
        query(&[("fromEmail", "true")]),
        signed_in(),
        FakeFiles::new(vec![]),
    );

    interactor.mount().await;
    assert_eq!(
        interactor.selected_plan(),
        PlanId::MonthlyFullSecondEmail
    );
}

#[tokio::test]
async fn manual_reselection_sticks_until_config_changes_again() {
    let (h, mut interactor) = Harness::build(
        query(&[("fromEmail", "true")]),
        signed_in(),
        FakeFiles::new(vec![]),
    );
    interactor.mount().await;
    assert_eq!(interactor.selected_plan(), PlanId::MonthlyFullSecondEmail);

    interactor.select_plan(PlanId::Monthly);
    interactor.sync().await;
    assert_eq!(
        interactor.selected_plan(),
        PlanId::Monthly,
        "override is one-shot per config change"
    );

    // New experiment data re-arms the override.
    h.remote_config
        .snapshot
        .lock()
        .unwrap()
        .ab_tests
        .insert("checkout_copy".into(), "b".into());
    interactor.sync().await;
    assert_eq!(interactor.selected_plan(), PlanId::MonthlyFullSecondEmail);
}

// ── Impression bookkeeping ───────────────────────────────────────────────

#[tokio::test]
async fn impression_fires_once_per_mount() {
    let (h, mut interactor) = Harness::build(QueryMap::new(), signed_in(), FakeFiles::new(vec![]));

    interactor.mount().await;
    interactor.sync().await;
    interactor.sync().await;
    assert_eq!(h.analytics.views.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.storage.get(StorageKey::PlanViewed).as_deref(),
        Some("true")
    );

    interactor.unmount();
    assert_eq!(h.storage.get(StorageKey::PlanViewed), None);

    interactor.mount().await;
    assert_eq!(h.analytics.views.load(Ordering::SeqCst), 2);
}

// ── File resolution & preview ────────────────────────────────────────────

#[tokio::test]
async fn pdf_preview_uses_latest_upload_without_query_file() {
    let (h, mut interactor) = Harness::build(
        QueryMap::new(),
        signed_in(),
        FakeFiles::new(vec![
            pdf_file("f1", "old.pdf"),
            pdf_file("f2", "latest.pdf"),
        ]),
    );

    assert!(!interactor.view().preview_loading);
    interactor.mount().await;

    let view = interactor.view();
    assert!(!view.preview_loading, "flag must be released after the run");
    assert_eq!(view.file_name.as_deref(), Some("latest.pdf"));
    assert_eq!(view.file_kind, Some(FileKind::Pdf));
    assert_eq!(
        view.pdf_cover.as_deref(),
        Some(b"png:https://cdn.test/f2/original".as_slice())
    );
    assert_eq!(
        h.cover.calls.lock().unwrap().as_slice(),
        [("https://cdn.test/f2/original".to_string(), 640)]
    );
    assert_eq!(view.file_link, None);
}

#[tokio::test]
async fn explicit_query_file_with_edited_flag_uses_edited_variant() {
    let (h, mut interactor) = Harness::build(
        query(&[("file", "f1"), ("editedFile", "true")]),
        signed_in(),
        FakeFiles::new(vec![pdf_file("f1", "draft.pdf"), pdf_file("f2", "other.pdf")]),
    );

    interactor.mount().await;

    assert_eq!(
        interactor.view().pdf_cover.as_deref(),
        Some(b"png:https://cdn.test/f1/edited".as_slice())
    );
    assert_eq!(
        h.cover.calls.lock().unwrap().as_slice(),
        [("https://cdn.test/f1/edited".to_string(), 640)]
    );
}

#[tokio::test]
async fn image_file_gets_a_direct_link_and_no_cover() {
    // "png" (3 chars) passes the triple check whole.
    let (h, mut interactor) = Harness::build(
        QueryMap::new(),
        signed_in(),
        FakeFiles::new(vec![image_file("f9", "png", FileKind::Png)]),
    );

    interactor.mount().await;

    let view = interactor.view();
    assert_eq!(
        view.file_link.as_deref(),
        Some("https://cdn.test/f9/original")
    );
    assert_eq!(view.pdf_cover, None);
    assert!(h.cover.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn mismatched_extension_suppresses_image_preview() {
    // Declared type is PNG but ".PNG" (last 4) is not in the allow-list.
    let (h, mut interactor) = Harness::build(
        QueryMap::new(),
        signed_in(),
        FakeFiles::new(vec![image_file("f9", "photo.png", FileKind::Png)]),
    );

    interactor.mount().await;

    let view = interactor.view();
    assert_eq!(view.file_link, None);
    assert_eq!(view.pdf_cover, None);
    assert!(h.cover.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn preview_failure_leaves_preview_blank_and_flag_clear() {
    let mut files = FakeFiles::new(vec![pdf_file("f1", "broken.pdf")]);
    files.fail_urls = true;
    let (h, mut interactor) = Harness::build(QueryMap::new(), signed_in(), files);

    interactor.mount().await;

    let view = interactor.view();
    assert!(!view.preview_loading, "flag must clear on the failure path");
    assert_eq!(view.pdf_cover, None);
    assert!(h.cover.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn query_change_retriggers_preview_but_not_file_resolution() {
    let (h, mut interactor) = Harness::build(
        QueryMap::new(),
        signed_in(),
        FakeFiles::new(vec![pdf_file("f1", "old.pdf"), pdf_file("f2", "latest.pdf")]),
    );
    interactor.mount().await;
    assert_eq!(h.cover.calls.lock().unwrap().len(), 1);

    h.router.set_query(query(&[("file", "f1")]));
    interactor.sync().await;
    interactor.sync().await; // unchanged key: must not double-fire

    let calls = h.cover.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].0, "https://cdn.test/f1/original");
    drop(calls);

    assert_eq!(
        h.files.list_calls.load(Ordering::SeqCst),
        1,
        "the file list is fetched once per mount"
    );
}

#[tokio::test]
async fn missing_query_file_id_resolves_to_no_file() {
    // The query names a file that is not in the collection.
    let (h, mut interactor) = Harness::build(
        query(&[("file", "ghost")]),
        signed_in(),
        FakeFiles::new(vec![pdf_file("f1", "a.pdf")]),
    );

    interactor.mount().await;

    let view = interactor.view();
    assert_eq!(view.file_name, None);
    assert_eq!(view.pdf_cover, None);
    assert!(h.cover.calls.lock().unwrap().is_empty());
}

// ── Plans projection & flow flags ────────────────────────────────────────

#[tokio::test]
async fn plans_report_loading_until_products_arrive() {
    let (h, mut interactor) = Harness::build(QueryMap::new(), signed_in(), FakeFiles::new(vec![]));
    interactor.mount().await;

    let t = |key: &str| key.to_string();
    assert!(interactor.plans_loading());
    assert!(interactor.plans(&t).is_empty());

    *h.products.products.lock().unwrap() = three_products();
    assert!(!interactor.plans_loading());

    let first = interactor.plans(&t);
    let second = interactor.plans(&t);
    assert_eq!(first.len(), 3);
    assert_eq!(first, second, "projection must be idempotent");
    assert!(first[2].date.is_some());
    assert_eq!(first[0].date, None);
}

#[tokio::test]
async fn view_reflects_flow_flags_from_the_live_query() {
    let (h, mut interactor) = Harness::build(
        query(&[("source", "editor")]),
        signed_in(),
        FakeFiles::new(vec![]),
    );
    interactor.mount().await;

    let view = interactor.view();
    assert!(view.is_editor_flow);
    assert!(!view.is_second_email);
    assert!(!view.is_third_email);

    h.router.set_query(query(&[("fromEmail", "true")]));
    let view = interactor.view();
    assert!(!view.is_editor_flow);
    assert!(view.is_second_email);
    assert!(view.is_third_email);
}
