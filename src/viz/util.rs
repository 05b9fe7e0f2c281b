//! Utility functions for visualization: colors, ranges, locale mapping, axis labels.

use crate::models::PricingTier;
use num_format::{Locale, ToFormattedString};
use plotters::prelude::*;
use std::ops::Range;

use super::text::estimate_text_width_px;

/// Microsoft Office (2013+) chart series palette.
/// Order: Blue, Orange, Gray, Gold, Light Blue, Green, Dark Blue, Dark Orange, Dark Gray, Brownish Gold.
const OFFICE10: [RGBColor; 10] = [
    RGBColor(68, 114, 196),  // blue      (#4472C4)
    RGBColor(237, 125, 49),  // orange    (#ED7D31)
    RGBColor(165, 165, 165), // gray      (#A5A5A5)
    RGBColor(255, 192, 0),   // gold      (#FFC000)
    RGBColor(91, 155, 213),  // light blue(#5B9BD5)
    RGBColor(112, 173, 71),  // green     (#70AD47)
    RGBColor(38, 68, 120),   // dark blue (#264478)
    RGBColor(158, 72, 14),   // dark org. (#9E480E)
    RGBColor(99, 99, 99),    // dark gray (#636363)
    RGBColor(153, 115, 0),   // brownish  (#997300)
];

/// Get a color from the Office palette.
#[inline]
pub fn office_color(idx: usize) -> RGBAColor {
    OFFICE10[idx % OFFICE10.len()].to_rgba()
}

/// Fixed color per pricing tier so the competitor chart reads the same every run.
pub fn tier_color(tier: PricingTier) -> RGBAColor {
    match tier {
        PricingTier::Premium => RGBColor(231, 76, 60).to_rgba(), // #E74C3C
        PricingTier::Mid => RGBColor(243, 156, 18).to_rgba(),    // #F39C12
        PricingTier::Budget => RGBColor(52, 152, 219).to_rgba(), // #3498DB
    }
}

/// Map a user-provided locale tag to a `num_format::Locale`.
///
/// Supported tags (case-insensitive): `en`, `us`, `en_US`, `de`, `de_DE`, `german`,
/// `fr`, `es`, `it`, `pt`, `nl`. Defaults to English.
pub fn map_locale(tag: &str) -> &'static Locale {
    match tag.to_lowercase().as_str() {
        "de" | "de_de" | "german" => &Locale::de,
        "fr" | "fr_fr" | "french" => &Locale::fr,
        "es" | "es_es" => &Locale::es,
        "it" | "it_it" => &Locale::it,
        "pt" | "pt_pt" | "pt_br" => &Locale::pt,
        "nl" | "nl_nl" => &Locale::nl,
        _ => &Locale::en, // default
    }
}

/// Tick label: thousands separators for large magnitudes, fewer decimals as values grow.
pub fn axis_label(v: f64, locale: &Locale) -> String {
    let a = v.abs();
    if a >= 1000.0 {
        let n = v.round() as i64;
        return n.to_formatted_string(locale);
    }
    let prec = if a >= 100.0 {
        0
    } else if a >= 10.0 {
        1
    } else {
        2
    };
    format!("{:.*}", prec, v)
}

/// `0..max` with headroom above the tallest value; `0..1` for empty or all-zero data.
pub fn value_range(max: f64, headroom: f64) -> Range<f64> {
    if max.is_finite() && max > 0.0 {
        0.0..max * (1.0 + headroom)
    } else {
        0.0..1.0
    }
}

/// `min..max` padded on both sides by `pad` of the span; degenerate spans widen by ±1.
pub fn padded_range(min: f64, max: f64, pad: f64) -> Range<f64> {
    if !(min.is_finite() && max.is_finite()) {
        return 0.0..1.0;
    }
    if (max - min).abs() < f64::EPSILON {
        return (min - 1.0)..(max + 1.0);
    }
    let d = (max - min) * pad;
    (min - d)..(max + d)
}

/// Compute a tight left label area width for the Y axis (in pixels),
/// based on the formatted tick labels that will appear.
///
/// Returns a width clamped to a sensible range to avoid extremes.
pub fn compute_left_label_area_px(
    y_range: &Range<f64>,
    ticks: usize,
    font_px: u32,
    locale: &Locale,
) -> u32 {
    let mut max_px = 0u32;
    for i in 0..=ticks {
        let t = if ticks == 0 {
            0.0
        } else {
            i as f64 / ticks as f64
        };
        let v = y_range.start + (y_range.end - y_range.start) * t;
        let s = axis_label(v, locale);
        max_px = max_px.max(estimate_text_width_px(&s, font_px));
    }

    // Padding for tick marks and the rotated axis description.
    let with_padding = max_px.saturating_add(30);
    with_padding.clamp(48, 140)
}
