//! Interactor configuration, built via [`InteractorConfigBuilder`].
//!
//! The defaults match the production checkout flow; hosts typically only
//! override the navigation paths when embedding the page elsewhere.

use crate::error::CheckoutError;

/// Configuration for a [`crate::interactor::PlanInteractor`].
///
/// # Example
/// ```rust
/// use checkout_plans::InteractorConfig;
///
/// let config = InteractorConfig::builder()
///     .payment_path("/checkout/payment")
///     .cover_width(640)
///     .build()
///     .unwrap();
/// assert_eq!(config.cover_width, 640);
/// ```
#[derive(Debug, Clone)]
pub struct InteractorConfig {
    /// Target pixel width of the rendered PDF cover. Default: 640.
    ///
    /// 640 px fills the preview pane on every supported breakpoint without
    /// forcing pdfium to rasterise more pixels than the page will display.
    pub cover_width: u32,

    /// Route of the payment step. Default: `/payment`.
    pub payment_path: String,

    /// Route of the dashboard (redirect target for already-subscribed
    /// visitors). Default: `/dashboard`.
    pub dashboard_path: String,

    /// Download timeout for preview-source fetches, in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for InteractorConfig {
    fn default() -> Self {
        Self {
            cover_width: 640,
            payment_path: "/payment".to_string(),
            dashboard_path: "/dashboard".to_string(),
            download_timeout_secs: 120,
        }
    }
}

impl InteractorConfig {
    /// Create a new builder for `InteractorConfig`.
    pub fn builder() -> InteractorConfigBuilder {
        InteractorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`InteractorConfig`].
#[derive(Debug)]
pub struct InteractorConfigBuilder {
    config: InteractorConfig,
}

impl InteractorConfigBuilder {
    pub fn cover_width(mut self, px: u32) -> Self {
        self.config.cover_width = px;
        self
    }

    pub fn payment_path(mut self, path: impl Into<String>) -> Self {
        self.config.payment_path = path.into();
        self
    }

    pub fn dashboard_path(mut self, path: impl Into<String>) -> Self {
        self.config.dashboard_path = path.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<InteractorConfig, CheckoutError> {
        let c = &self.config;
        if c.cover_width == 0 || c.cover_width > 4096 {
            return Err(CheckoutError::InvalidConfig(format!(
                "cover width must be 1–4096 px, got {}",
                c.cover_width
            )));
        }
        if !c.payment_path.starts_with('/') || !c.dashboard_path.starts_with('/') {
            return Err(CheckoutError::InvalidConfig(
                "navigation paths must be absolute (start with '/')".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_production_values() {
        let c = InteractorConfig::default();
        assert_eq!(c.cover_width, 640);
        assert_eq!(c.payment_path, "/payment");
        assert_eq!(c.dashboard_path, "/dashboard");
    }

    #[test]
    fn zero_cover_width_is_rejected() {
        let err = InteractorConfig::builder().cover_width(0).build();
        assert!(matches!(err, Err(CheckoutError::InvalidConfig(_))));
    }

    #[test]
    fn relative_paths_are_rejected() {
        let err = InteractorConfig::builder().payment_path("payment").build();
        assert!(matches!(err, Err(CheckoutError::InvalidConfig(_))));
    }
}
