//! Plan-list projection: raw product records + translator → formatted
//! plan cards. Pure, no I/O.
//!
//! The upstream product source guarantees positional ordering (0 and 1 are
//! monthly variants, 2 is annual). That contract is encoded in one named
//! lookup table rather than scattered index comparisons.

use crate::domain::{BulletIcon, Plan, PlanBullet, PlanId, Product};
use crate::pricing::{currency_symbol, format_price};
use crate::services::Translator;

/// Position-indexed billing-period labels. Out-of-range positions fall
/// back to "monthly", matching the upstream source's behaviour for lists
/// it never promised to send.
const BILLING_PERIODS: [&str; 3] = ["monthly", "monthly_full", "annual"];

/// The annual tier always sits at this index in the product list.
const ANNUAL_INDEX: usize = 2;

fn billing_period(index: usize) -> &'static str {
    BILLING_PERIODS.get(index).copied().unwrap_or("monthly")
}

/// Build the 8 feature bullets for a plan.
///
/// Keys follow `payment_page.plans.{prefix}.bullet{1..8}`. The `positive`
/// rendition uses the check icon; the negative one uses the cross icon and
/// dims the text.
pub fn build_bullets(t: &dyn Translator, prefix: &str, positive: bool) -> Vec<PlanBullet> {
    (1..=8)
        .map(|i| PlanBullet {
            icon: if positive {
                BulletIcon::Check
            } else {
                BulletIcon::Cross
            },
            text: t.translate(&format!("payment_page.plans.{prefix}.bullet{i}")),
            dimmed: !positive,
        })
        .collect()
}

/// Project raw product records into formatted plan cards.
///
/// Fails soft: an empty product list (still loading) yields an empty vec.
/// Each record is mapped by position — display price uses the annual kind
/// only at [`ANNUAL_INDEX`] (on the full amount), the trial kind otherwise
/// (on the trial amount); the full price is always trial-formatted; the
/// date label appears only on the annual entry. The descriptive text
/// interpolates a reference price taken from the first product's full
/// amount, trial-formatted.
pub fn build_plans(t: &dyn Translator, products: &[Product]) -> Vec<Plan> {
    let reference_price = products
        .first()
        .map(|p| format_price(p.price.price, &p.price.currency, "trial"))
        .unwrap_or_default();

    products
        .iter()
        .enumerate()
        .map(|(index, product)| {
            let period = billing_period(index);
            let annual = index == ANNUAL_INDEX;
            let price = &product.price;

            Plan {
                id: PlanId::from_name(&product.name).unwrap_or(PlanId::Monthly),
                title: t.translate(&format!("payment_page.plans.{period}.title")),
                price: format_price(
                    if annual { price.price } else { price.trial_price },
                    &price.currency,
                    if annual { "annual" } else { "trial" },
                ),
                full_price: format_price(price.price, &price.currency, "trial"),
                currency_symbol: currency_symbol(&price.currency).to_string(),
                date: annual.then(|| t.translate("payment_page.plans.annual.date")),
                bullets: build_bullets(t, period, true),
                text: t
                    .translate(&format!("payment_page.plans.{period}.text"))
                    .replace("{formattedPrice}", &reference_price),
            }
        })
        .collect()
}
