//! Core data model: plan tiers, product records, file records, and the
//! reactive snapshots consumed by the interactor.
//!
//! Everything here is plain data. The only logic is the image-format
//! allow-list check used by the preview unit, which lives next to
//! [`FileKind`] because it is a property of the file record, not of the
//! effect that consumes it.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ── Plans ────────────────────────────────────────────────────────────────

/// Enumerated billing-tier identifier.
///
/// `MonthlyFullSecondEmail` is the remarketing-email variant of the full
/// monthly tier; it is only ever selected by the preselection override,
/// never offered in the rendered plan list by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanId {
    Monthly,
    MonthlyFull,
    Annual,
    MonthlyFullSecondEmail,
}

impl PlanId {
    /// Stable string form, used as the product name on the wire and as the
    /// persisted value under [`StorageKey::SelectedPlan`].
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::Monthly => "monthly",
            PlanId::MonthlyFull => "monthly_full",
            PlanId::Annual => "annual",
            PlanId::MonthlyFullSecondEmail => "monthly_full_second_email",
        }
    }

    /// Parse a raw product name. Unknown names yield `None`; the plan
    /// projection falls back to [`PlanId::Monthly`] rather than erroring.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "monthly" => Some(PlanId::Monthly),
            "monthly_full" => Some(PlanId::MonthlyFull),
            "annual" => Some(PlanId::Annual),
            "monthly_full_second_email" => Some(PlanId::MonthlyFullSecondEmail),
            _ => None,
        }
    }
}

/// Icon attached to a plan bullet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulletIcon {
    Check,
    Cross,
}

/// One feature line of a plan card. `dimmed` is set for the negative
/// rendition so the view can grey the text out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanBullet {
    pub icon: BulletIcon,
    pub text: String,
    pub dimmed: bool,
}

/// A fully formatted plan card, rebuilt from raw product records on every
/// projection. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub id: PlanId,
    pub title: String,
    /// Display price: trial price for monthly tiers, monthly-equivalent of
    /// the annual total for the annual tier.
    pub price: String,
    /// Non-discounted price, always trial-formatted.
    pub full_price: String,
    pub currency_symbol: String,
    /// Trial-end label; present only on the annual tier.
    pub date: Option<String>,
    pub bullets: Vec<PlanBullet>,
    /// Descriptive text with the reference price already interpolated.
    pub text: String,
}

// ── Products (external input) ────────────────────────────────────────────

/// Price block of a raw product record. Amounts are integer minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPrice {
    /// Full (non-discounted) amount.
    pub price: i64,
    /// Discounted initial-period amount.
    pub trial_price: i64,
    /// ISO currency code, e.g. "USD".
    pub currency: String,
}

/// Raw product record from the subscription backend.
///
/// The upstream ordering is an implicit contract: index 2 is always the
/// annual tier, indices 0 and 1 the monthly variants. Not validated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Maps to [`PlanId`] via [`PlanId::from_name`].
    pub name: String,
    pub price: ProductPrice,
}

// ── Files ────────────────────────────────────────────────────────────────

/// Internal type classification of an uploaded file.
///
/// The upstream classification is not always trustworthy for images, which
/// is why [`is_image_file`] re-checks the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileKind {
    Pdf,
    Heic,
    Svg,
    Png,
    Bmp,
    Eps,
    Gif,
    Tiff,
    Webp,
    Jpg,
    Jpeg,
    Doc,
    Docx,
    Xls,
    Xlsx,
    Ppt,
    Pptx,
}

impl FileKind {
    /// Parse an uppercased extension or type name.
    pub fn from_ext(ext: &str) -> Option<Self> {
        match ext {
            "PDF" => Some(FileKind::Pdf),
            "HEIC" => Some(FileKind::Heic),
            "SVG" => Some(FileKind::Svg),
            "PNG" => Some(FileKind::Png),
            "BMP" => Some(FileKind::Bmp),
            "EPS" => Some(FileKind::Eps),
            "GIF" => Some(FileKind::Gif),
            "TIFF" => Some(FileKind::Tiff),
            "WEBP" => Some(FileKind::Webp),
            "JPG" => Some(FileKind::Jpg),
            "JPEG" => Some(FileKind::Jpeg),
            "DOC" => Some(FileKind::Doc),
            "DOCX" => Some(FileKind::Docx),
            "XLS" => Some(FileKind::Xls),
            "XLSX" => Some(FileKind::Xlsx),
            "PPT" => Some(FileKind::Ppt),
            "PPTX" => Some(FileKind::Pptx),
            _ => None,
        }
    }
}

/// The raster-preview allow-list. Only these kinds get a direct image link.
pub static IMAGE_FORMATS: Lazy<HashSet<FileKind>> = Lazy::new(|| {
    HashSet::from([
        FileKind::Heic,
        FileKind::Svg,
        FileKind::Png,
        FileKind::Bmp,
        FileKind::Eps,
        FileKind::Gif,
        FileKind::Tiff,
        FileKind::Webp,
        FileKind::Jpg,
        FileKind::Jpeg,
    ])
});

/// Last `n` characters of a filename, uppercased. Shorter names are
/// returned whole, matching JavaScript `slice(-n)` semantics.
fn tail_upper(name: &str, n: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    let start = chars.len().saturating_sub(n);
    chars[start..].iter().collect::<String>().to_uppercase()
}

/// Triple allow-list check for the image-preview path.
///
/// The declared kind AND the uppercased last-3 AND last-4 characters of the
/// filename must all be members of [`IMAGE_FORMATS`]. The filename checks
/// exist because operating systems sometimes report the wrong file type on
/// upload; all three must agree before a preview link is produced.
pub fn is_image_file(kind: FileKind, filename: &str) -> bool {
    if !IMAGE_FORMATS.contains(&kind) {
        return false;
    }
    let last3 = FileKind::from_ext(&tail_upper(filename, 3));
    let last4 = FileKind::from_ext(&tail_upper(filename, 4));
    matches!(last3, Some(k) if IMAGE_FORMATS.contains(&k))
        && matches!(last4, Some(k) if IMAGE_FORMATS.contains(&k))
}

/// An uploaded file as reported by the files backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFile {
    pub id: String,
    pub filename: String,
    pub internal_type: FileKind,
    /// True when an edited variant exists for this file.
    #[serde(default)]
    pub edited: bool,
}

// ── Durable storage keys ─────────────────────────────────────────────────

/// Closed set of durable client-storage keys owned by this page.
///
/// The string values are load-bearing: they must match what earlier
/// releases wrote so an existing visitor's selection survives an upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    SelectedPlan,
    PlanViewed,
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::SelectedPlan => "selectedPlan",
            StorageKey::PlanViewed => "select_plan_view",
        }
    }
}

// ── Reactive snapshots ───────────────────────────────────────────────────

/// Current user/session state as seen by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    /// Email address known for the session, if any.
    pub email: Option<String>,
    /// Whether the email has been verified (token exchange completed).
    pub email_verified: bool,
    /// Active subscription status, `None` when the visitor has none.
    pub subscription: Option<String>,
}

/// Remote-config state: experiment flags plus a loading passthrough.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteConfigSnapshot {
    pub ab_tests: BTreeMap<String, String>,
    pub is_loading: bool,
}
