use crate::error::UnfluffedError;
use crate::model::{
    AdvancedSearchRequest, AdvancedSearchResponse, BasicSearchRequest, BasicSearchResponse,
    CategoriesResponse, Category, CountryCode, Product, ProductResponse, SuggestionsResponse,
};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

/// The remote search service. Ranking, currency conversion and affiliate link
/// generation all happen behind this seam.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn basic_search(
        &self,
        request: &BasicSearchRequest,
    ) -> Result<BasicSearchResponse, UnfluffedError>;

    async fn advanced_search(
        &self,
        request: &AdvancedSearchRequest,
    ) -> Result<AdvancedSearchResponse, UnfluffedError>;

    async fn suggestions(&self, text: &str) -> Result<Vec<String>, UnfluffedError>;

    async fn categories(&self) -> Result<Vec<Category>, UnfluffedError>;

    async fn product(&self, asin: &str, country: CountryCode) -> Result<Product, UnfluffedError>;
}

pub fn validate_asin(asin: &str) -> Result<(), UnfluffedError> {
    static ASIN_RE: OnceLock<Regex> = OnceLock::new();
    let re = ASIN_RE.get_or_init(|| Regex::new(r"^[A-Z0-9]{10}$").expect("static regex"));
    if re.is_match(asin) {
        Ok(())
    } else {
        Err(UnfluffedError::InvalidAsin(asin.to_string()))
    }
}

/// reqwest-backed client for the `/api` surface.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, UnfluffedError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("unfluffed/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, UnfluffedError> {
        self.base_url
            .join(path)
            .map_err(|e| UnfluffedError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, UnfluffedError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::warn!("Request to backend timed out");
            }
            UnfluffedError::Network(e)
        })?;

        let status = response.status();
        tracing::debug!("Backend responded with {}", status);

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UnfluffedError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| UnfluffedError::InvalidResponse(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn basic_search(
        &self,
        request: &BasicSearchRequest,
    ) -> Result<BasicSearchResponse, UnfluffedError> {
        let url = self.endpoint("api/products/search")?;
        tracing::info!("Basic search for '{}' in {}", request.query, request.country);
        let response: BasicSearchResponse =
            self.send_json(self.client.post(url).json(request)).await?;
        tracing::debug!(
            "Basic search returned {} products (cached: {})",
            response.products.len(),
            response.cached
        );
        Ok(response)
    }

    async fn advanced_search(
        &self,
        request: &AdvancedSearchRequest,
    ) -> Result<AdvancedSearchResponse, UnfluffedError> {
        let url = self.endpoint("api/products/advanced-search")?;
        tracing::info!(
            "Advanced search for '{}' in {} sorted by {}",
            request.query,
            request.country,
            request.sort_by.as_str()
        );
        let response: AdvancedSearchResponse =
            self.send_json(self.client.post(url).json(request)).await?;
        tracing::debug!(
            "Advanced search returned {} products of {:?} (cached: {})",
            response.products.len(),
            response.total_count,
            response.cached
        );
        Ok(response)
    }

    async fn suggestions(&self, text: &str) -> Result<Vec<String>, UnfluffedError> {
        let url = self.endpoint("api/search-suggestions")?;
        let response: SuggestionsResponse = self
            .send_json(self.client.get(url).query(&[("q", text)]))
            .await?;
        Ok(response.suggestions)
    }

    async fn categories(&self) -> Result<Vec<Category>, UnfluffedError> {
        let url = self.endpoint("api/categories")?;
        let response: CategoriesResponse = self.send_json(self.client.get(url)).await?;
        Ok(response.categories)
    }

    async fn product(&self, asin: &str, country: CountryCode) -> Result<Product, UnfluffedError> {
        validate_asin(asin)?;
        let url = self.endpoint(&format!("api/products/{}", asin))?;
        let response: ProductResponse = self
            .send_json(self.client.get(url).query(&[("country", country.as_str())]))
            .await?;
        tracing::debug!("Fetched product {} (cached: {})", asin, response.cached);
        Ok(response.product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> HttpBackend {
        let url = Url::parse(&format!("{}/", server.uri())).unwrap();
        HttpBackend::new(url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn asin_validation() {
        assert!(validate_asin("B07PXGQC1Q").is_ok());
        assert!(validate_asin("b07pxgqc1q").is_err());
        assert!(validate_asin("B07PXG").is_err());
        assert!(validate_asin("../etc/pwd").is_err());
    }

    #[test]
    fn endpoints_respect_base_path() {
        let b = HttpBackend::new(
            Url::parse("https://example.com/proxy/").unwrap(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            b.endpoint("api/categories").unwrap().as_str(),
            "https://example.com/proxy/api/categories"
        );
    }

    #[tokio::test]
    async fn basic_search_posts_query_and_country() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/products/search"))
            .and(body_json(json!({"query": "desk lamp", "country": "US"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "products": [{
                    "asin": "X1",
                    "title": "Lamp",
                    "price": {"currency": "USD", "amount": 19.99}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = BasicSearchRequest {
            query: "desk lamp".to_string(),
            country: CountryCode::US,
        };
        let response = backend(&server).basic_search(&request).await.unwrap();

        assert_eq!(response.products.len(), 1);
        assert_eq!(response.products[0].title, "Lamp");
    }

    #[tokio::test]
    async fn advanced_search_sends_filters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/products/advanced-search"))
            .and(body_json(json!({
                "query": "lamp",
                "country": "UK",
                "min_price": 10.0,
                "sort_by": "rating",
                "include_suggestions": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "products": [],
                "total_count": 42,
                "suggestions": ["lamp shade"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut filters = crate::model::FilterSet::default();
        filters.set("min_price", "10").unwrap();
        filters.set("sort_by", "rating").unwrap();
        let request = AdvancedSearchRequest::new("lamp", CountryCode::UK, &filters);
        let response = backend(&server).advanced_search(&request).await.unwrap();

        assert_eq!(response.total_count, Some(42));
        assert_eq!(response.suggestions, vec!["lamp shade"]);
    }

    #[tokio::test]
    async fn suggestions_send_query_parameter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search-suggestions"))
            .and(query_param("q", "desk l"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"suggestions": ["desk lamp", "desk mat"]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let suggestions = backend(&server).suggestions("desk l").await.unwrap();
        assert_eq!(suggestions, vec!["desk lamp", "desk mat"]);
    }

    #[tokio::test]
    async fn product_lookup_passes_country() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products/B07PXGQC1Q"))
            .and(query_param("country", "CA"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "product": {"asin": "B07PXGQC1Q", "title": "Lamp"},
                "cached": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let product = backend(&server)
            .product("B07PXGQC1Q", CountryCode::CA)
            .await
            .unwrap();
        assert_eq!(product.title, "Lamp");
    }

    #[tokio::test]
    async fn non_success_status_maps_to_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .respond_with(ResponseTemplate::new(503).set_body_string(r#"{"detail":"down"}"#))
            .mount(&server)
            .await;

        let err = backend(&server).categories().await.unwrap_err();
        match err {
            UnfluffedError::Http { status, message } => {
                assert_eq!(status, 503);
                assert!(message.contains("down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = backend(&server).categories().await.unwrap_err();
        assert!(matches!(err, UnfluffedError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn product_rejects_bad_asin_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = backend(&server)
            .product("nope", CountryCode::US)
            .await
            .unwrap_err();
        assert!(matches!(err, UnfluffedError::InvalidAsin(_)));
    }
}
