//! Text measurement and truncation for axis labels.

/// Heuristic: estimate pixel width of text (Plotters has no built-in text measuring).
pub fn estimate_text_width_px(text: &str, font_px: u32) -> u32 {
    ((text.chars().count() as f32) * (font_px as f32) * 0.60).ceil() as u32
}

/// Truncate to fit `max_px` and add a single ellipsis if needed.
pub fn truncate_to_width(text: &str, font_px: u32, max_px: u32) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        let next = format!("{out}{ch}");
        if estimate_text_width_px(&next, font_px) > max_px {
            if !out.is_empty() {
                if estimate_text_width_px(&(out.clone() + "…"), font_px) <= max_px {
                    out.push('…');
                } else if out.chars().count() > 1 {
                    out.pop();
                    out.push('…');
                }
            }
            return out;
        }
        out = next;
    }
    out
}

/// Display form of a country key such as `Burkina_Faso`.
pub fn display_name(country: &str) -> String {
    country.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_labels_are_untouched() {
        assert_eq!(truncate_to_width("Senegal", 12, 200), "Senegal");
    }

    #[test]
    fn long_labels_get_one_ellipsis() {
        let t = truncate_to_width("Burkina Faso Extended Name", 12, 80);
        assert!(t.ends_with('…'));
        assert!(estimate_text_width_px(&t, 12) <= 80);
        assert_eq!(t.matches('…').count(), 1);
    }

    #[test]
    fn underscores_become_spaces() {
        assert_eq!(display_name("Cote_Ivoire"), "Cote Ivoire");
    }
}
