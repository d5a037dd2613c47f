// ===============================
// src/api.rs (backend REST client)
// ===============================
//
// Thin JSON client for the Börsibaar backend. In the deployed system these
// calls go through a same-origin proxy that injects the session cookie; here
// the cookie is a single configured header value.

use reqwest::header::COOKIE;
use thiserror::Error;
use url::Url;

use crate::domain::{BarStation, Category, Product, SaleRequest};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad backend base url: {0}")]
    BadBaseUrl(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-2xx from the backend, body text kept verbatim for the operator.
    #[error("backend returned {status}: {body}")]
    Backend {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            ApiError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The message shown to the operator: the raw backend body when there is
    /// one, otherwise the transport error.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Backend { body, .. } if !body.is_empty() => body.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    session_cookie: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, session_cookie: Option<String>) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url)?;
        // join() below replaces the last path segment unless the base ends in '/'
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            session_cookie,
        })
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let mut req = self.http.get(url);
        if let Some(cookie) = &self.session_cookie {
            req = req.header(COOKIE, cookie);
        }
        req
    }

    pub async fn fetch_inventory(
        &self,
        category_id: Option<i64>,
    ) -> Result<Vec<Product>, ApiError> {
        let mut url = self.base.join("inventory")?;
        if let Some(cat) = category_id {
            url.query_pairs_mut()
                .append_pair("categoryId", &cat.to_string());
        }
        let rsp = self.get(url).send().await?;
        Self::check(rsp).await?.json().await.map_err(Into::into)
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        let url = self.base.join("categories")?;
        let rsp = self.get(url).send().await?;
        Self::check(rsp).await?.json().await.map_err(Into::into)
    }

    pub async fn fetch_station(&self, station_id: i64) -> Result<BarStation, ApiError> {
        let url = self.base.join(&format!("bar-stations/{station_id}"))?;
        let rsp = self.get(url).send().await?;
        Self::check(rsp).await?.json().await.map_err(Into::into)
    }

    /// Submit the sale. The backend is all-or-nothing; a non-2xx response
    /// carries a plain-text or JSON error body which we keep verbatim.
    pub async fn submit_sale(&self, sale: &SaleRequest) -> Result<(), ApiError> {
        let url = self.base.join("sales")?;
        let mut req = self.http.post(url).json(sale);
        if let Some(cookie) = &self.session_cookie {
            req = req.header(COOKIE, cookie);
        }
        let rsp = req.send().await?;
        Self::check(rsp).await.map(|_| ())
    }

    async fn check(rsp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = rsp.status();
        if status.is_success() {
            Ok(rsp)
        } else {
            let body = rsp.text().await.unwrap_or_default();
            Err(ApiError::Backend { status, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SaleItem;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn inventory_row(product_id: i64, quantity: i64) -> serde_json::Value {
        json!({
            "id": product_id + 1000,
            "organizationId": 1,
            "productId": product_id,
            "productName": format!("product-{product_id}"),
            "quantity": quantity,
            "unitPrice": 2.5,
            "basePrice": 2.0,
            "updatedAt": "2026-01-01T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn fetch_inventory_parses_backend_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/inventory"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([inventory_row(7, 12), inventory_row(8, 0)])),
            )
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri(), None).unwrap();
        let products = api.fetch_inventory(None).await.unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].product_id, 7);
        assert_eq!(products[0].quantity, 12);
        assert_eq!(products[1].quantity, 0);
    }

    #[tokio::test]
    async fn fetch_inventory_passes_category_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/inventory"))
            .and(query_param("categoryId", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri(), None).unwrap();
        api.fetch_inventory(Some(3)).await.unwrap();
    }

    #[tokio::test]
    async fn submit_sale_surfaces_error_body_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sales"))
            .respond_with(
                ResponseTemplate::new(409).set_body_string("Insufficient stock for product 7"),
            )
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri(), None).unwrap();
        let sale = SaleRequest {
            items: vec![SaleItem {
                product_id: 7,
                quantity: 3,
            }],
            notes: "POS Sale - Station: Main Bar".into(),
            bar_station_id: Some(1),
        };

        let err = api.submit_sale(&sale).await.unwrap_err();
        assert_eq!(err.status().unwrap().as_u16(), 409);
        assert_eq!(err.user_message(), "Insufficient stock for product 7");
    }

    #[tokio::test]
    async fn station_fetch_maps_access_denied_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bar-stations/9"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri(), None).unwrap();
        let err = api.fetch_station(9).await.unwrap_err();
        assert_eq!(err.status().unwrap().as_u16(), 403);
    }
}
