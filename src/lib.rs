//! # checkout-plans
//!
//! The "choose plan" step of a file-conversion checkout flow, as a
//! host-agnostic interactor: it decides which subscription plans a visitor
//! sees, prepares a visual preview of the file they are converting, and
//! decides when and where to route them next.
//!
//! ## Why an interactor?
//!
//! The page itself is trivial to render; the hard part is the coordination
//! around it — guard redirects driven by session state, one-time
//! impression bookkeeping, async preview generation that must not race or
//! double-fire, and remote-config-driven plan preselection. All of that
//! lives in [`PlanInteractor`], behind small collaborator traits, so any
//! view layer can consume a plain read surface and two commands.
//!
//! ## Page Overview
//!
//! ```text
//! session ──▶ guard machine   dashboard redirect / back / token exchange
//! mount ────▶ impression      one-time page-viewed event (debounced)
//!        └──▶ file resolve    explicit ?file=… or the latest upload
//! file/query ▶ preview        PDF cover (pdfium, width 640) or image link
//! config ───▶ preselection    remarketing-email tier override
//! products ─▶ plan cards      trial/annual pricing, 8 bullets, copy
//! ```
//!
//! ## Quick Start
//!
//! The pure projection layer works without any wiring:
//!
//! ```rust
//! use checkout_plans::{currency_symbol, format_price};
//!
//! assert_eq!(format_price(1200, "USD", "trial"), "$12.00");
//! assert_eq!(format_price(11988, "USD", "annual"), "$9.99");
//! assert_eq!(currency_symbol("GBP"), "£");
//! ```
//!
//! Driving the full page means implementing the traits in [`services`]
//! (or using the shipped [`http::HttpCheckoutApi`], [`cover::PdfiumCover`]
//! and [`storage::JsonFileStore`]), then calling
//! [`PlanInteractor::mount`] once and [`PlanInteractor::sync`] whenever a
//! provider snapshot or the navigation query changes.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod cover;
pub mod domain;
pub mod error;
pub mod http;
pub mod interactor;
pub mod plans;
pub mod pricing;
pub mod query;
pub mod services;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{InteractorConfig, InteractorConfigBuilder};
pub use domain::{
    ApiFile, BulletIcon, FileKind, Plan, PlanBullet, PlanId, Product, ProductPrice,
    RemoteConfigSnapshot, SessionSnapshot, StorageKey,
};
pub use error::CheckoutError;
pub use interactor::{Collaborators, PlanInteractor, PlanPageView};
pub use plans::{build_bullets, build_plans};
pub use pricing::{currency_symbol, format_price};
pub use query::{QueryMap, QueryValue};
pub use services::{
    Analytics, AuthApi, CoverRenderer, FilesApi, KeyValueStore, NoopAnalytics, ProductsSource,
    RemoteConfigSource, Router, SessionSource, Translator,
};
