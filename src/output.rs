use crate::kits::Kit;
use crate::model::{Category, FilterSet, Price, SearchResultState};
use crate::price_watch::PriceTick;

pub fn format_search_results(query: &str, state: &SearchResultState, limit: usize) -> String {
    let mut out = String::new();

    if state.products.is_empty() {
        out.push_str(&format!("No products found for \"{}\".\n", query.trim()));
        format_related(state, &mut out);
        return out;
    }

    let shown = &state.products[..state.products.len().min(limit)];
    let mode = if state.used_advanced_search {
        "advanced"
    } else {
        "basic"
    };
    out.push_str(&format!(
        "## Search results for \"{}\" (showing {} of {}, {} search)\n\n",
        query.trim(),
        shown.len(),
        format_number(state.total_count),
        mode
    ));
    out.push_str(
        "_Amazon results with affiliate links. The kits are what has actually been tested._\n\n",
    );

    for (i, product) in shown.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n", i + 1, product.title));

        if let Some(ref price) = product.price {
            out.push_str(&format!("- **Price:** {}\n", format_price(price)));
        }

        if let Some(rating) = product.rating {
            match product.review_count {
                Some(count) => out.push_str(&format!(
                    "- **Rating:** {:.1}/5 ({} reviews)\n",
                    rating,
                    format_number(count)
                )),
                None => out.push_str(&format!("- **Rating:** {:.1}/5\n", rating)),
            }
        }

        if let Some(ref category) = product.category {
            out.push_str(&format!("- **Category:** {}\n", category));
        }

        out.push_str(&format!("- **ASIN:** {}\n", product.asin));
        if !product.image_url.is_empty() {
            out.push_str(&format!("- **Image:** {}\n", product.image_url));
        }
        if !product.affiliate_url.is_empty() {
            out.push_str(&format!("- **Link:** {}\n", product.affiliate_url));
        }

        if i < shown.len() - 1 {
            out.push_str("\n---\n\n");
        }
    }

    format_related(state, &mut out);
    out
}

fn format_related(state: &SearchResultState, out: &mut String) {
    if state.used_advanced_search && !state.suggestions.is_empty() {
        out.push_str(&format!(
            "\n**Related searches:** {}\n",
            state.suggestions.join(", ")
        ));
    }
}

pub fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        return "No suggestions.\n".to_string();
    }
    let mut out = String::from("## Suggestions\n");
    for (i, suggestion) in suggestions.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, suggestion));
    }
    out
}

pub fn format_categories(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories available.\n".to_string();
    }
    let mut out = String::from("## Categories\n\n| ID | Name | Products |\n|---|---|---|\n");
    for category in categories {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            category.identifier,
            category.display_name,
            format_number(category.count)
        ));
    }
    out
}

pub fn format_kits(kits: &[Kit]) -> String {
    let mut out = String::from("## Tested Kits\n\n");
    for (i, kit) in kits.iter().enumerate() {
        out.push_str(&format!("### {}\n", kit.title));
        out.push_str(kit.description);
        out.push('\n');
        out.push_str(&format!("- **Slug:** {}\n", kit.slug));
        out.push_str(&format!("- **Image:** {}\n", kit.image_url));
        out.push_str(&format!("- **Link:** {}\n", kit.affiliate_url));
        if i < kits.len() - 1 {
            out.push('\n');
        }
    }
    out
}

pub fn format_filters(filters: &FilterSet) -> String {
    if !filters.is_active() {
        return "No active filters.\n".to_string();
    }
    let mut out = String::from("## Active filters\n");
    if let Some(min) = filters.min_price {
        out.push_str(&format!("- **Min price:** {:.2}\n", min));
    }
    if let Some(max) = filters.max_price {
        out.push_str(&format!("- **Max price:** {:.2}\n", max));
    }
    if let Some(rating) = filters.min_rating {
        out.push_str(&format!("- **Min rating:** {:.1}\n", rating));
    }
    if let Some(ref category) = filters.category {
        out.push_str(&format!("- **Category:** {}\n", category));
    }
    out.push_str(&format!("- **Sort:** {}\n", filters.sort_by.as_str()));
    out
}

pub fn format_price_tick(tick: &PriceTick) -> String {
    match &tick.result {
        Ok(product) => {
            let price = product
                .price
                .as_ref()
                .map(format_price)
                .unwrap_or_else(|| "unavailable".to_string());
            format!("[{}] {} ({}): {}\n", tick.sequence, product.title, tick.asin, price)
        }
        Err(message) => format!("[{}] {}: refresh failed: {}\n", tick.sequence, tick.asin, message),
    }
}

pub fn format_price(price: &Price) -> String {
    let symbol = match price.currency.as_str() {
        "USD" => "$",
        "GBP" => "£",
        "CAD" => "CA$",
        "EUR" => "€",
        other => return format!("{} {:.2}", other, price.amount),
    };
    format!("{}{:.2}", symbol, price.amount)
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::product;
    use crate::model::SortBy;

    #[test]
    fn numbers_get_thousands_separators() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn prices_use_currency_symbols() {
        let price = |currency: &str| Price {
            currency: currency.to_string(),
            amount: 19.5,
        };
        assert_eq!(format_price(&price("USD")), "$19.50");
        assert_eq!(format_price(&price("GBP")), "£19.50");
        assert_eq!(format_price(&price("JPY")), "JPY 19.50");
    }

    #[test]
    fn results_show_total_and_respect_limit() {
        let mut lamp = product("X1", "Lamp", Some(19.99));
        lamp.rating = Some(4.55);
        lamp.review_count = Some(1200);
        let state = SearchResultState {
            products: vec![lamp, product("X2", "Shade", None)],
            total_count: 2500,
            suggestions: vec!["desk lamp led".to_string()],
            is_loading: false,
            used_advanced_search: true,
        };

        let out = format_search_results("desk lamp", &state, 1);
        assert!(out.contains("showing 1 of 2,500, advanced search"));
        assert!(out.contains("### 1. Lamp"));
        assert!(out.contains("- **Price:** $19.99"));
        assert!(out.contains("(1,200 reviews)"));
        assert!(!out.contains("Shade"));
        assert!(out.contains("**Related searches:** desk lamp led"));
    }

    #[test]
    fn empty_results_message() {
        let out = format_search_results(" lamp ", &SearchResultState::default(), 10);
        assert_eq!(out, "No products found for \"lamp\".\n");
    }

    #[test]
    fn filters_listing() {
        assert_eq!(format_filters(&FilterSet::default()), "No active filters.\n");
        let filters = FilterSet {
            min_price: Some(10.0),
            sort_by: SortBy::Rating,
            ..FilterSet::default()
        };
        let out = format_filters(&filters);
        assert!(out.contains("- **Min price:** 10.00"));
        assert!(out.contains("- **Sort:** rating"));
    }

    #[test]
    fn failed_tick_is_readable() {
        let tick = PriceTick {
            asin: "B07PXGQC1Q".to_string(),
            sequence: 3,
            result: Err("Backend returned HTTP 502: bad gateway".to_string()),
        };
        assert_eq!(
            format_price_tick(&tick),
            "[3] B07PXGQC1Q: refresh failed: Backend returned HTTP 502: bad gateway\n"
        );
    }
}
