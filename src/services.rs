//! Collaborator contracts consumed by the interactor.
//!
//! Every external surface the page touches — auth, files, products, remote
//! config, session, navigation, durable storage, analytics, cover
//! rendering, translation — is a trait here, injected as `Arc<dyn …>`.
//! The traits are object-safe so hosts and tests can swap implementations
//! freely; the crate ships production implementations in [`crate::http`],
//! [`crate::storage`], and [`crate::cover`].
//!
//! Reactive sources (`ProductsSource`, `RemoteConfigSource`,
//! `SessionSource`, `Router::query`) are synchronous snapshot getters: the
//! host owns the subscription machinery and calls
//! [`crate::interactor::PlanInteractor::sync`] when anything may have
//! changed.

use async_trait::async_trait;

use crate::domain::{
    ApiFile, PlanId, Product, RemoteConfigSnapshot, SessionSnapshot, StorageKey,
};
use crate::error::CheckoutError;
use crate::query::QueryMap;

// ── Async collaborators ──────────────────────────────────────────────────

/// Auth backend: one-time email-token exchange.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange a one-time token for a verified session. Fire-and-forget
    /// at the call site; no retry on failure.
    async fn exchange_token(&self, token: &str) -> Result<(), CheckoutError>;
}

/// Files backend: the user's upload collection and download-URL resolution.
#[async_trait]
pub trait FilesApi: Send + Sync {
    /// All files uploaded by the current user, oldest first.
    async fn list_files(&self) -> Result<Vec<ApiFile>, CheckoutError>;

    /// Downloadable URL of the canonical (original) file.
    async fn download_url(&self, file_id: &str) -> Result<String, CheckoutError>;

    /// Downloadable URL of the edited variant.
    async fn edited_download_url(&self, file_id: &str) -> Result<String, CheckoutError>;
}

/// Renders the first page of a PDF at `width` pixels into a PNG blob.
#[async_trait]
pub trait CoverRenderer: Send + Sync {
    async fn render_cover(&self, source_url: &str, width: u32) -> Result<Vec<u8>, CheckoutError>;
}

// ── Reactive snapshot sources ────────────────────────────────────────────

/// Subscription products. An empty list means "still loading".
pub trait ProductsSource: Send + Sync {
    fn products(&self) -> Vec<Product>;
}

/// Experiment flags and the remote-config loading passthrough.
pub trait RemoteConfigSource: Send + Sync {
    fn snapshot(&self) -> RemoteConfigSnapshot;
}

/// Current user/session state.
pub trait SessionSource: Send + Sync {
    fn session(&self) -> SessionSnapshot;
}

// ── Host surfaces ────────────────────────────────────────────────────────

/// Navigation surface of the host page.
pub trait Router: Send + Sync {
    /// Current navigation query parameters.
    fn query(&self) -> QueryMap;

    /// Navigate to `path`, carrying `query`.
    fn push(&self, path: &str, query: &QueryMap);

    /// Navigate back (abort checkout).
    fn back(&self);
}

/// Durable client-side key-value storage (survives reloads).
///
/// Mirrors the browser localStorage contract: infallible from the caller's
/// perspective, last write wins. Implementations log persistence failures
/// instead of surfacing them.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: StorageKey) -> Option<String>;
    fn set(&self, key: StorageKey, value: &str);
    fn remove(&self, key: StorageKey);
}

/// Analytics emission seam.
///
/// All methods default to no-ops so hosts only override what they track.
/// Implementations must tolerate concurrent calls.
pub trait Analytics: Send + Sync {
    /// One-time page impression (debounced per mount).
    fn page_viewed(&self) {}

    /// The visitor confirmed a plan and is moving to payment. `place` is
    /// telemetry context only (which control triggered the continue).
    fn checkout_continued(&self, plan: PlanId, place: Option<&str>) {
        let _ = (plan, place);
    }
}

/// No-op analytics for hosts that do not track this page.
pub struct NoopAnalytics;

impl Analytics for NoopAnalytics {}

// ── Translation ──────────────────────────────────────────────────────────

/// Locale translator for plan titles, bullets, and descriptive text.
///
/// Blanket-implemented for closures so tests and simple hosts can pass
/// `&|key: &str| …` directly.
pub trait Translator {
    fn translate(&self, key: &str) -> String;
}

impl<F> Translator for F
where
    F: Fn(&str) -> String,
{
    fn translate(&self, key: &str) -> String {
        self(key)
    }
}

// Compile-time assertion: the injected seams must stay object-safe.
const _: () = {
    fn _assert_object_safe(
        _: &dyn AuthApi,
        _: &dyn FilesApi,
        _: &dyn CoverRenderer,
        _: &dyn Router,
        _: &dyn KeyValueStore,
        _: &dyn Analytics,
    ) {
    }
};
