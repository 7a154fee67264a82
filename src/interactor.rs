//! The plan-page interactor: the coordination core of the checkout step.
//!
//! ## Reactive model
//!
//! The original page reacted to provider updates; here the same behaviour
//! is an explicit diff-and-recompute loop. The interactor remembers the
//! last-seen value of each unit's dependency set and re-runs a unit only
//! when those dependencies changed:
//!
//! | unit            | dependencies                          | effect |
//! |-----------------|---------------------------------------|--------|
//! | guard machine   | session snapshot                      | dashboard redirect / back / token exchange |
//! | preselection    | remote-config `ab_tests`              | force the remarketing-email tier |
//! | preview         | resolved file + `file`/`editedFile`   | PDF cover and/or image link |
//! | impression      | mount only                            | one-time page-viewed event |
//! | file resolution | mount only                            | fetch the upload collection once |
//!
//! The units have disjoint dependency sets and no cross-ordering, except
//! that `mount` runs the guard machine first: a terminal redirect means
//! the visitor is leaving and nothing else should fire.
//!
//! ## Known limitation
//!
//! Preview resolutions are not cancelled or fenced. If the trigger fires
//! again while a resolution is in flight, the late result still lands
//! (last-writer-wins, not last-triggered-wins). The loading flag is an
//! advisory busy indicator, not a mutex.

use std::sync::Arc;

use futures::join;
use tracing::{debug, info, warn};

use crate::config::InteractorConfig;
use crate::domain::{
    is_image_file, ApiFile, FileKind, Plan, PlanId, SessionSnapshot, StorageKey,
};
use crate::error::CheckoutError;
use crate::plans::build_plans;
use crate::query::{self, first_param, QueryMap};
use crate::services::{
    Analytics, AuthApi, CoverRenderer, FilesApi, KeyValueStore, ProductsSource,
    RemoteConfigSource, Router, SessionSource, Translator,
};

/// The external collaborators the interactor is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn AuthApi>,
    pub files: Arc<dyn FilesApi>,
    pub products: Arc<dyn ProductsSource>,
    pub remote_config: Arc<dyn RemoteConfigSource>,
    pub session: Arc<dyn SessionSource>,
    pub router: Arc<dyn Router>,
    pub storage: Arc<dyn KeyValueStore>,
    pub analytics: Arc<dyn Analytics>,
    pub cover: Arc<dyn CoverRenderer>,
}

/// Dependency set of the preview unit. The preview recomputes whenever
/// this key changes; the file list itself is never refetched.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PreviewKey {
    file_id: Option<String>,
    query_file: Option<String>,
    edited: bool,
}

/// Read surface handed to the view layer. Flow flags are recomputed from
/// the live query on every call to [`PlanInteractor::view`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlanPageView {
    pub selected_plan: PlanId,
    /// Rendered PDF cover (PNG bytes), when the resolved file is a PDF.
    pub pdf_cover: Option<Vec<u8>>,
    pub preview_loading: bool,
    pub file_name: Option<String>,
    pub file_kind: Option<FileKind>,
    /// Direct preview link, when the resolved file passed the image check.
    pub file_link: Option<String>,
    pub is_editor_flow: bool,
    pub is_second_email: bool,
    pub is_third_email: bool,
    pub remote_config_loading: bool,
    pub plans_loading: bool,
}

/// Session-scoped state machine behind the plan-selection page.
pub struct PlanInteractor {
    config: InteractorConfig,
    deps: Collaborators,

    selected_plan: PlanId,
    file: Option<ApiFile>,
    pdf_cover: Option<Vec<u8>>,
    preview_loading: bool,
    file_link: Option<String>,

    mounted: bool,
    /// A guard redirect fired; the page is terminal and units stop.
    left_page: bool,

    seen_session: Option<SessionSnapshot>,
    seen_ab_tests: Option<std::collections::BTreeMap<String, String>>,
    seen_preview_key: Option<PreviewKey>,
}

impl PlanInteractor {
    pub fn new(config: InteractorConfig, deps: Collaborators) -> Self {
        Self {
            config,
            deps,
            selected_plan: PlanId::MonthlyFull,
            file: None,
            pdf_cover: None,
            preview_loading: false,
            file_link: None,
            mounted: false,
            left_page: false,
            seen_session: None,
            seen_ab_tests: None,
            seen_preview_key: None,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Enter the page: run the guard machine, record the impression, and
    /// resolve the checkout file, then bring every reactive unit current.
    ///
    /// Collaborator failures degrade the page instead of failing it: a
    /// broken file list or preview leaves the respective state empty.
    pub async fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;

        let query = self.deps.router.query();
        let session = self.deps.session.session();
        self.seen_session = Some(session.clone());
        if self.run_guard(&session, &query) {
            self.left_page = true;
            return;
        }

        // Impression bookkeeping: debounced per mount via the durable
        // marker, cleared again on unmount.
        if self.deps.storage.get(StorageKey::PlanViewed).is_none() {
            info!("plan page viewed");
            self.deps.analytics.page_viewed();
        }
        self.deps.storage.set(StorageKey::PlanViewed, "true");

        // File resolution happens exactly once per mount. Later query
        // changes only re-trigger the preview unit.
        match self.deps.files.list_files().await {
            Ok(files) => {
                self.file = match first_param(&query, "file") {
                    Some(id) => files.iter().find(|f| f.id == id).cloned(),
                    None => files.last().cloned(),
                };
                debug!(
                    file = self.file.as_ref().map(|f| f.filename.as_str()),
                    "resolved checkout file"
                );
            }
            Err(e) => {
                warn!(error = %e, "file list fetch failed, page renders without a preview");
            }
        }

        self.sync().await;
    }

    /// Bring the reactive units current. The host calls this whenever a
    /// provider snapshot or the navigation query may have changed.
    pub async fn sync(&mut self) {
        if !self.mounted || self.left_page {
            return;
        }

        let query = self.deps.router.query();

        let session = self.deps.session.session();
        if self.seen_session.as_ref() != Some(&session) {
            self.seen_session = Some(session.clone());
            if self.run_guard(&session, &query) {
                self.left_page = true;
                return;
            }
        }

        let ab_tests = self.deps.remote_config.snapshot().ab_tests;
        if self.seen_ab_tests.as_ref() != Some(&ab_tests) {
            self.seen_ab_tests = Some(ab_tests);
            // One-shot per config change: a manual reselection afterwards
            // stays until the experiment data changes again.
            if query::is_second_email(&query) {
                info!("remarketing-email visit, preselecting the dedicated tier");
                self.selected_plan = PlanId::MonthlyFullSecondEmail;
            }
        }

        let key = PreviewKey {
            file_id: self.file.as_ref().map(|f| f.id.clone()),
            query_file: first_param(&query, "file").map(str::to_string),
            edited: first_param(&query, "editedFile") == Some("true"),
        };
        if self.seen_preview_key.as_ref() != Some(&key) {
            self.seen_preview_key = Some(key);
            self.refresh_preview(&query).await;
        }
    }

    /// Leave the page. Clears the impression marker so a later navigation
    /// back into the page emits the event again.
    pub fn unmount(&mut self) {
        self.deps.storage.remove(StorageKey::PlanViewed);
        self.mounted = false;
        self.left_page = false;
        self.file = None;
        self.pdf_cover = None;
        self.file_link = None;
        self.preview_loading = false;
        self.seen_session = None;
        self.seen_ab_tests = None;
        self.seen_preview_key = None;
    }

    // ── Commands ─────────────────────────────────────────────────────────

    /// Select a plan. Selecting the already-selected plan is a
    /// confirmation: the choice is persisted and the visitor moves to the
    /// payment step. Selecting a different plan only updates the
    /// selection.
    pub fn select_plan(&mut self, plan: PlanId) {
        if self.selected_plan == plan {
            self.continue_checkout(None);
            return;
        }
        debug!(plan = plan.as_str(), "plan selected");
        self.selected_plan = plan;
    }

    /// Persist the current selection and navigate to the payment step,
    /// forwarding the current query parameters unchanged. `place` names
    /// the control that triggered the continue; telemetry only.
    pub fn continue_checkout(&mut self, place: Option<&str>) {
        self.deps
            .storage
            .set(StorageKey::SelectedPlan, self.selected_plan.as_str());
        self.deps
            .analytics
            .checkout_continued(self.selected_plan, place);

        let query = self.deps.router.query();
        info!(plan = self.selected_plan.as_str(), "continuing to payment");
        self.deps.router.push(&self.config.payment_path, &query);
    }

    // ── Reads ────────────────────────────────────────────────────────────

    pub fn selected_plan(&self) -> PlanId {
        self.selected_plan
    }

    /// Formatted plan cards for the current locale. Empty while the
    /// product list is still loading.
    pub fn plans(&self, t: &dyn Translator) -> Vec<Plan> {
        build_plans(t, &self.deps.products.products())
    }

    pub fn plans_loading(&self) -> bool {
        self.deps.products.products().is_empty()
    }

    /// Full read surface for the view layer.
    pub fn view(&self) -> PlanPageView {
        let query = self.deps.router.query();
        PlanPageView {
            selected_plan: self.selected_plan,
            pdf_cover: self.pdf_cover.clone(),
            preview_loading: self.preview_loading,
            file_name: self.file.as_ref().map(|f| f.filename.clone()),
            file_kind: self.file.as_ref().map(|f| f.internal_type),
            file_link: self.file_link.clone(),
            is_editor_flow: query::is_editor_flow(&query),
            is_second_email: query::is_second_email(&query),
            is_third_email: query::is_third_email(&query),
            remote_config_loading: self.deps.remote_config.snapshot().is_loading,
            plans_loading: self.plans_loading(),
        }
    }

    // ── Internal units ───────────────────────────────────────────────────

    /// Ordered session checks; returns true when a terminal redirect
    /// fired. The token exchange is fire-and-forget: spawned, logged on
    /// failure, never retried.
    fn run_guard(&self, session: &SessionSnapshot, query: &QueryMap) -> bool {
        if session.subscription.is_some() {
            info!("active subscription, redirecting to dashboard");
            self.deps
                .router
                .push(&self.config.dashboard_path, &QueryMap::new());
            return true;
        }

        if session.email.is_none() {
            info!("no email on session, leaving checkout");
            self.deps.router.back();
            return true;
        }

        if !session.email_verified {
            if let Some(token) = first_param(query, "token") {
                let auth = Arc::clone(&self.deps.auth);
                let token = token.to_string();
                tokio::spawn(async move {
                    if let Err(e) = auth.exchange_token(&token).await {
                        warn!(error = %e, "email-token exchange failed");
                    }
                });
            }
        }

        false
    }

    /// Recompute both preview artifacts. Previous artifacts are cleared
    /// first; failures leave the preview blank and are only logged.
    async fn refresh_preview(&mut self, query: &QueryMap) {
        self.pdf_cover = None;
        self.file_link = None;

        let Some(file) = self.file.clone() else {
            return;
        };

        let query_file = first_param(query, "file").map(str::to_string);
        let edited = first_param(query, "editedFile") == Some("true");

        let pdf_applicable = file.internal_type == FileKind::Pdf;
        let image_applicable = is_image_file(file.internal_type, &file.filename);

        let pdf_fut = {
            let files = Arc::clone(&self.deps.files);
            let cover = Arc::clone(&self.deps.cover);
            let query_file = query_file.clone();
            let file_id = file.id.clone();
            let width = self.config.cover_width;
            async move {
                if !pdf_applicable {
                    return None;
                }
                let result = async {
                    let url =
                        resolve_preview_url(&files, &file_id, query_file.as_deref(), edited).await?;
                    cover.render_cover(&url, width).await
                }
                .await;
                Some(result)
            }
        };

        let image_fut = {
            let files = Arc::clone(&self.deps.files);
            let file_id = file.id.clone();
            async move {
                if !image_applicable {
                    return None;
                }
                Some(resolve_preview_url(&files, &file_id, query_file.as_deref(), edited).await)
            }
        };

        // The loading flag brackets the PDF path only; it is cleared on
        // every exit, including failure.
        if pdf_applicable {
            self.preview_loading = true;
        }
        let (cover_result, link_result) = join!(pdf_fut, image_fut);
        if pdf_applicable {
            self.preview_loading = false;
        }

        match cover_result {
            Some(Ok(png)) => {
                debug!(bytes = png.len(), "PDF cover ready");
                self.pdf_cover = Some(png);
            }
            Some(Err(e)) => warn!(error = %e, "PDF cover generation failed"),
            None => {}
        }

        match link_result {
            Some(Ok(url)) => self.file_link = Some(url),
            Some(Err(e)) => warn!(error = %e, "image preview resolution failed"),
            None => {}
        }
    }
}

/// Resolve the preview source URL.
///
/// An explicit `file` query reference wins over the resolved file, and its
/// edited variant wins over the canonical URL when `editedFile=true`.
async fn resolve_preview_url(
    files: &Arc<dyn FilesApi>,
    file_id: &str,
    query_file: Option<&str>,
    edited: bool,
) -> Result<String, CheckoutError> {
    match query_file {
        Some(qf) if edited => files.edited_download_url(qf).await,
        Some(qf) => files.download_url(qf).await,
        None => files.download_url(file_id).await,
    }
}
