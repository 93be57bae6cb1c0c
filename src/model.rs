use crate::error::UnfluffedError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of suggestions kept for display.
pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CountryCode {
    #[default]
    US,
    UK,
    CA,
}

impl CountryCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountryCode::US => "US",
            CountryCode::UK => "UK",
            CountryCode::CA => "CA",
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountryCode {
    type Err = UnfluffedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US" => Ok(CountryCode::US),
            "UK" => Ok(CountryCode::UK),
            "CA" => Ok(CountryCode::CA),
            other => Err(UnfluffedError::Config(format!(
                "Unknown country code '{}'. Supported: us, uk, ca",
                other.to_ascii_lowercase()
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    PriceLow,
    PriceHigh,
    Rating,
    ReviewCount,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::PriceLow => "price_low",
            SortBy::PriceHigh => "price_high",
            SortBy::Rating => "rating",
            SortBy::ReviewCount => "review_count",
        }
    }
}

impl FromStr for SortBy {
    type Err = UnfluffedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "relevance" => Ok(SortBy::Relevance),
            "price_low" => Ok(SortBy::PriceLow),
            "price_high" => Ok(SortBy::PriceHigh),
            "rating" => Ok(SortBy::Rating),
            "review_count" => Ok(SortBy::ReviewCount),
            other => Err(UnfluffedError::InvalidFilter(format!(
                "unknown sort order '{}'",
                other
            ))),
        }
    }
}

/// Filters applied to an advanced search. The default value is "inactive".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSet {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub category: Option<String>,
    pub sort_by: SortBy,
}

impl FilterSet {
    pub fn is_active(&self) -> bool {
        *self != FilterSet::default()
    }

    /// Merge a single field from user input. An empty value clears the field.
    /// On error the set is left untouched.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), UnfluffedError> {
        let value = value.trim();
        match name {
            "min_price" | "minPrice" => self.min_price = parse_price(name, value)?,
            "max_price" | "maxPrice" => self.max_price = parse_price(name, value)?,
            "min_rating" | "minRating" => self.min_rating = parse_rating(value)?,
            "category" => {
                self.category = (!value.is_empty()).then(|| value.to_string());
            }
            "sort_by" | "sortBy" => {
                self.sort_by = if value.is_empty() {
                    SortBy::default()
                } else {
                    value.parse()?
                };
            }
            other => {
                return Err(UnfluffedError::InvalidFilter(format!(
                    "unknown filter '{}'",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Cross-field checks that cannot be done one field at a time.
    pub fn validate(&self) -> Result<(), UnfluffedError> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if max < min {
                return Err(UnfluffedError::InvalidFilter(format!(
                    "max price {:.2} is below min price {:.2}",
                    max, min
                )));
            }
        }
        Ok(())
    }
}

fn parse_number(name: &str, value: &str) -> Result<Option<f64>, UnfluffedError> {
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(UnfluffedError::InvalidFilter(format!(
            "{} must be a number, got '{}'",
            name, value
        ))),
    }
}

fn parse_price(name: &str, value: &str) -> Result<Option<f64>, UnfluffedError> {
    let price = parse_number(name, value)?;
    if let Some(p) = price {
        if p <= 0.0 {
            return Err(UnfluffedError::InvalidFilter(format!(
                "{} must be positive, got {}",
                name, p
            )));
        }
    }
    Ok(price)
}

fn parse_rating(value: &str) -> Result<Option<f64>, UnfluffedError> {
    let rating = parse_number("min_rating", value)?;
    if let Some(r) = rating {
        if !(0.0..=5.0).contains(&r) {
            return Err(UnfluffedError::InvalidFilter(format!(
                "min_rating must be between 0 and 5, got {}",
                r
            )));
        }
    }
    Ok(rating)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(alias = "id")]
    pub identifier: String,
    #[serde(alias = "name", alias = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub currency: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub asin: String,
    pub title: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<u64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub affiliate_url: String,
}

/// Everything the presentation layer reads about the latest search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResultState {
    pub products: Vec<Product>,
    pub total_count: u64,
    pub suggestions: Vec<String>,
    pub is_loading: bool,
    pub used_advanced_search: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BasicSearchRequest {
    pub query: String,
    pub country: CountryCode,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvancedSearchRequest {
    pub query: String,
    pub country: CountryCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub sort_by: SortBy,
    pub include_suggestions: bool,
}

impl AdvancedSearchRequest {
    pub fn new(query: &str, country: CountryCode, filters: &FilterSet) -> Self {
        Self {
            query: query.to_string(),
            country,
            min_price: filters.min_price,
            max_price: filters.max_price,
            min_rating: filters.min_rating,
            category: filters.category.clone(),
            sort_by: filters.sort_by,
            include_suggestions: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicSearchResponse {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub cached: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvancedSearchResponse {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub cached: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoriesResponse {
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResponse {
    pub product: Product,
    #[serde(default)]
    pub cached: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filters_are_inactive() {
        let filters = FilterSet::default();
        assert!(!filters.is_active());
        assert_eq!(filters.sort_by, SortBy::Relevance);
    }

    #[test]
    fn any_changed_field_activates_filters() {
        let mut filters = FilterSet::default();
        filters.set("sort_by", "rating").unwrap();
        assert!(filters.is_active());

        let mut filters = FilterSet::default();
        filters.set("minRating", "4").unwrap();
        assert!(filters.is_active());

        filters.set("minRating", "").unwrap();
        assert!(!filters.is_active());
    }

    #[test]
    fn rejects_bad_values_without_mutating() {
        let mut filters = FilterSet::default();
        filters.set("min_price", "10").unwrap();

        assert!(filters.set("min_price", "abc").is_err());
        assert!(filters.set("min_price", "-5").is_err());
        assert!(filters.set("min_price", "0").is_err());
        assert!(filters.set("max_price", "NaN").is_err());
        assert!(filters.set("min_rating", "5.5").is_err());
        assert!(filters.set("color", "red").is_err());
        assert_eq!(filters.min_price, Some(10.0));
        assert_eq!(filters.min_rating, None);
    }

    #[test]
    fn validate_rejects_inverted_price_range() {
        let mut filters = FilterSet::default();
        filters.set("minPrice", "50").unwrap();
        filters.set("maxPrice", "20").unwrap();
        assert!(matches!(
            filters.validate(),
            Err(UnfluffedError::InvalidFilter(_))
        ));

        filters.set("maxPrice", "50").unwrap();
        assert!(filters.validate().is_ok());
    }

    #[test]
    fn country_parsing_is_case_insensitive() {
        assert_eq!("uk".parse::<CountryCode>().unwrap(), CountryCode::UK);
        assert_eq!(" Ca ".parse::<CountryCode>().unwrap(), CountryCode::CA);
        assert!("de".parse::<CountryCode>().is_err());
        assert!("gb".parse::<CountryCode>().is_err());
        assert_eq!(CountryCode::default(), CountryCode::US);
    }

    #[test]
    fn advanced_request_omits_unset_filters() {
        let mut filters = FilterSet::default();
        filters.set("min_rating", "4.5").unwrap();
        let req = AdvancedSearchRequest::new("desk lamp", CountryCode::UK, &filters);
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["country"], "UK");
        assert_eq!(json["min_rating"], 4.5);
        assert_eq!(json["sort_by"], "relevance");
        assert_eq!(json["include_suggestions"], true);
        assert!(json.get("min_price").is_none());
        assert!(json.get("category").is_none());
    }

    #[test]
    fn product_tolerates_missing_optional_fields() {
        let json = r#"{"asin":"X1","title":"Lamp","price":{"currency":"USD","amount":19.99}}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.asin, "X1");
        assert_eq!(product.price.unwrap().amount, 19.99);
        assert!(product.rating.is_none());
        assert!(product.affiliate_url.is_empty());
    }

    #[test]
    fn category_accepts_short_field_names() {
        let json = r#"{"id":"electronics","name":"Electronics","count":12}"#;
        let category: Category = serde_json::from_str(json).unwrap();
        assert_eq!(category.identifier, "electronics");
        assert_eq!(category.display_name, "Electronics");
        assert_eq!(category.count, 12);
    }
}
