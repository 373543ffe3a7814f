use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use url::Url;

use mealbox_core::error::SourceError;
use mealbox_core::mealdb::{MealsResponse, RawMeal};
use mealbox_core::source::MealSource;

pub const DEFAULT_BASE_URL: &str = "https://www.themealdb.com/api/json/v1/1/";

pub struct MealDbClient {
    client: reqwest::Client,
    base_url: Url,
}

impl MealDbClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "mealbox-cli/{} (recipe browser)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;

        // Url::join drops the last segment unless the base ends in '/'
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url =
            Url::parse(&base_url).with_context(|| format!("Invalid API base URL: {base_url}"))?;

        Ok(Self { client, base_url })
    }

    async fn get_meals(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Vec<RawMeal>> {
        let url = self.base_url.join(endpoint)?;
        tracing::debug!(%url, ?query, "requesting meals");

        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .context("Failed to reach TheMealDB API")?
            .error_for_status()
            .context("TheMealDB API returned an error status")?;

        let data: MealsResponse = resp
            .json()
            .await
            .context("Failed to parse TheMealDB response")?;

        Ok(data.into_meals())
    }

    pub async fn search_first_letter(&self, letter: char) -> Result<Vec<RawMeal>> {
        let letter = letter.to_string();
        self.get_meals("search.php", &[("f", letter.as_str())]).await
    }

    pub async fn search_name(&self, name: &str) -> Result<Vec<RawMeal>> {
        self.get_meals("search.php", &[("s", name)]).await
    }

    pub async fn lookup_id(&self, id: &str) -> Result<Option<RawMeal>> {
        let meals = self.get_meals("lookup.php", &[("i", id)]).await?;
        Ok(meals.into_iter().next())
    }
}

#[async_trait]
impl MealSource for MealDbClient {
    async fn fetch_partition(&self, letter: char) -> Result<Vec<RawMeal>, SourceError> {
        self.search_first_letter(letter).await.map_err(Into::into)
    }

    async fn lookup(&self, id: &str) -> Result<Option<RawMeal>, SourceError> {
        self.lookup_id(id).await.map_err(Into::into)
    }

    async fn search(&self, name: &str) -> Result<Vec<RawMeal>, SourceError> {
        self.search_name(name).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealbox_core::source::fetch_all;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> MealDbClient {
        MealDbClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_search_first_letter_sends_bucket() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.php"))
            .and(query_param("f", "a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meals": [
                    { "idMeal": "52768", "strMeal": "Apple Frangipan Tart", "strCategory": "Dessert" },
                    { "idMeal": "52893", "strMeal": "Apple & Blackberry Crumble", "strCategory": "Dessert" }
                ]
            })))
            .mount(&server)
            .await;

        let meals = client(&server).search_first_letter('a').await.unwrap();
        assert_eq!(meals.len(), 2);
        assert_eq!(meals[0]["strMeal"], "Apple Frangipan Tart");
    }

    #[tokio::test]
    async fn test_null_meals_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "meals": null })))
            .mount(&server)
            .await;

        let meals = client(&server).search_first_letter('x').await.unwrap();
        assert!(meals.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.php"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).search_first_letter('a').await.unwrap_err();
        assert!(format!("{err:#}").contains("error status"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server).search_first_letter('a').await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse"));
    }

    #[tokio::test]
    async fn test_lookup_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lookup.php"))
            .and(query_param("i", "52772"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meals": [{ "idMeal": "52772", "strMeal": "Teriyaki Chicken Casserole" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/lookup.php"))
            .and(query_param("i", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "meals": null })))
            .mount(&server)
            .await;

        let c = client(&server);
        let meal = c.lookup_id("52772").await.unwrap().unwrap();
        assert_eq!(meal["strMeal"], "Teriyaki Chicken Casserole");
        assert!(c.lookup_id("1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_name_encodes_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.php"))
            .and(query_param("s", "beef & mustard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meals": [{ "idMeal": "52874", "strMeal": "Beef and Mustard Pie" }]
            })))
            .mount(&server)
            .await;

        let meals = client(&server).search_name("beef & mustard").await.unwrap();
        assert_eq!(meals.len(), 1);
    }

    #[tokio::test]
    async fn test_base_url_with_path_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/json/v1/1/search.php"))
            .and(query_param("f", "b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "meals": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/api/json/v1/1", server.uri());
        let c = MealDbClient::new(&base, Duration::from_secs(5)).unwrap();
        assert!(c.search_first_letter('b').await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partitioned_fetch_survives_one_bad_bucket() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.php"))
            .and(query_param("f", "a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meals": [{ "idMeal": "52768", "strMeal": "Apple Frangipan Tart" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search.php"))
            .and(query_param("f", "b"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let c = client(&server);
        let fetched = fetch_all(&c, &['a', 'b']).await.unwrap();
        assert_eq!(fetched.meals.len(), 1);
        assert_eq!(fetched.failures.len(), 1);
        assert_eq!(fetched.failures[0].partition, 'b');
    }

    // --- Integration tests (hit the real TheMealDB API) ---

    #[tokio::test]
    #[ignore = "hits TheMealDB API"]
    async fn test_live_first_letter() {
        let c = MealDbClient::new(DEFAULT_BASE_URL, Duration::from_secs(10)).unwrap();
        let meals = c.search_first_letter('a').await.unwrap();
        assert!(!meals.is_empty());
    }

    #[tokio::test]
    #[ignore = "hits TheMealDB API"]
    async fn test_live_lookup() {
        let c = MealDbClient::new(DEFAULT_BASE_URL, Duration::from_secs(10)).unwrap();
        let meal = c.lookup_id("52772").await.unwrap();
        assert!(meal.is_some());
    }
}
