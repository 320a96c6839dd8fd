//! Console rendering of recommendation results

use crate::types::RecommendationList;

/// Render the top `top` recommendations under a model header
///
/// ```text
///
/// Top 10 recommended tags (Model A):
/// [ 1] cuisine
/// [ 2] opening_hours
/// ```
pub fn render_recommendations(selector: &str, list: &RecommendationList, top: usize) -> String {
    let mut out = format!(
        "\nTop {} recommended tags (Model {}):\n",
        top,
        selector.trim().to_uppercase()
    );
    for (i, item) in list.iter().take(top).enumerate() {
        out.push_str(&format!("[ {}] {}\n", i + 1, item.property));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Property, RecommendationItem};

    fn list(n: u32) -> RecommendationList {
        (0..n)
            .map(|i| RecommendationItem::new(Property::new(i, format!("t{}", i), 1), 0.5))
            .collect()
    }

    #[test]
    fn test_header_uses_uppercase_selector() {
        let out = render_recommendations("a", &list(1), 10);
        assert_eq!(out, "\nTop 10 recommended tags (Model A):\n[ 1] t0\n");
    }

    #[test]
    fn test_rank_column_keeps_single_space() {
        let out = render_recommendations("c", &list(12), 10);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[2], "[ 1] t0");
        assert_eq!(lines[11], "[ 10] t9");
    }

    #[test]
    fn test_empty_list_prints_header_only() {
        let out = render_recommendations("best", &RecommendationList::new(), 5);
        assert_eq!(out, "\nTop 5 recommended tags (Model BEST):\n");
    }
}
