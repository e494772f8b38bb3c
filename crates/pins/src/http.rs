//! REST client for the admin backend's map-pin collection.
//!
//! Endpoints, relative to the collection URL (e.g. `http://host/api/map-pins`):
//! - `GET    {base}`      → `[Pin]`
//! - `POST   {base}`      → `Pin` (201), body `{ "label", "position": [x, y, z] }`
//! - `DELETE {base}/{id}` → 200, or 404 when the id is unknown
//!
//! Error bodies are `{ "error": "..." }`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::pin::{NewPin, Pin, PinId};
use crate::store::{PinStore, PinStoreError};

#[derive(Debug, Clone)]
pub struct HttpPinStore {
    client: Client,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpPinStore {
    pub fn new(base_url: &str) -> Result<Self, PinStoreError> {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, client: Client) -> Result<Self, PinStoreError> {
        let base = Url::parse(base_url).map_err(|e| {
            PinStoreError::Unavailable(format!("invalid pin store url {base_url}: {e}"))
        })?;
        if base.cannot_be_a_base() {
            return Err(PinStoreError::Unavailable(format!(
                "invalid pin store url {base_url}: not a hierarchical url"
            )));
        }
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn pin_url(&self, id: &PinId) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id.as_str());
        }
        url
    }
}

fn transport_error(err: reqwest::Error) -> PinStoreError {
    if err.is_timeout() {
        PinStoreError::Timeout
    } else {
        PinStoreError::Unavailable(err.to_string())
    }
}

async fn status_error(resp: reqwest::Response, id: Option<&PinId>) -> PinStoreError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or_else(|_| format!("HTTP {status}"));

    match (status, id) {
        (StatusCode::NOT_FOUND, Some(id)) => PinStoreError::NotFound(id.clone()),
        (s, _) if s.is_client_error() => PinStoreError::Rejected(message),
        _ => PinStoreError::Unavailable(message),
    }
}

#[async_trait]
impl PinStore for HttpPinStore {
    async fn list(&self) -> Result<Vec<Pin>, PinStoreError> {
        let resp = self
            .client
            .get(self.base.clone())
            .send()
            .await
            .map_err(transport_error)?;
        if !resp.status().is_success() {
            return Err(status_error(resp, None).await);
        }
        let pins: Vec<Pin> = resp
            .json()
            .await
            .map_err(|e| PinStoreError::Decode(e.to_string()))?;
        debug!(count = pins.len(), "pins listed");
        Ok(pins)
    }

    async fn create(&self, pin: NewPin) -> Result<Pin, PinStoreError> {
        let resp = self
            .client
            .post(self.base.clone())
            .json(&pin)
            .send()
            .await
            .map_err(transport_error)?;
        if !resp.status().is_success() {
            let err = status_error(resp, None).await;
            warn!(label = %pin.label, "pin create failed: {err}");
            return Err(err);
        }
        resp.json()
            .await
            .map_err(|e| PinStoreError::Decode(e.to_string()))
    }

    async fn delete(&self, id: &PinId) -> Result<(), PinStoreError> {
        let resp = self
            .client
            .delete(self.pin_url(id))
            .send()
            .await
            .map_err(transport_error)?;
        if !resp.status().is_success() {
            return Err(status_error(resp, Some(id)).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::Json;
    use axum::Router;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::{delete, get};
    use parking_lot::Mutex;
    use serde_json::json;

    use super::HttpPinStore;
    use crate::pin::{NewPin, Pin, PinId};
    use crate::store::{PinStore, PinStoreError};
    use foundation::math::Vec3;

    type Db = Arc<Mutex<Vec<Pin>>>;

    async fn list_pins(State(db): State<Db>) -> Json<Vec<Pin>> {
        Json(db.lock().clone())
    }

    async fn create_pin(State(db): State<Db>, Json(body): Json<NewPin>) -> Response {
        if body.label.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Failed to create map pin" })),
            )
                .into_response();
        }
        let mut pins = db.lock();
        let pin = body.into_pin(PinId::new(format!("pin-{}", pins.len() + 1)));
        pins.push(pin.clone());
        (StatusCode::CREATED, Json(pin)).into_response()
    }

    async fn delete_pin(State(db): State<Db>, Path(id): Path<String>) -> Response {
        let mut pins = db.lock();
        match pins.iter().position(|p| p.id.as_str() == id) {
            Some(idx) => {
                pins.remove(idx);
                Json(json!({ "message": "Map pin deleted successfully" })).into_response()
            }
            None => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Map pin not found" })),
            )
                .into_response(),
        }
    }

    async fn broken() -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch map pins" })),
        )
            .into_response()
    }

    async fn spawn_backend() -> SocketAddr {
        let db: Db = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/api/map-pins", get(list_pins).post(create_pin))
            .route("/api/map-pins/:id", delete(delete_pin))
            .route("/broken", get(broken))
            .with_state(db);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        addr
    }

    #[test]
    fn pin_url_appends_id_segment() {
        let store = HttpPinStore::new("http://localhost:3000/api/map-pins/").expect("url");
        assert_eq!(
            store.pin_url(&PinId::new("abc")).as_str(),
            "http://localhost:3000/api/map-pins/abc"
        );
        let store = HttpPinStore::new("http://localhost:3000/api/map-pins").expect("url");
        assert_eq!(
            store.pin_url(&PinId::new("a b")).as_str(),
            "http://localhost:3000/api/map-pins/a%20b"
        );
    }

    #[test]
    fn rejects_non_hierarchical_url() {
        assert!(HttpPinStore::new("mailto:admin@example.com").is_err());
        assert!(HttpPinStore::new("not a url").is_err());
    }

    #[tokio::test]
    async fn round_trip_against_backend() {
        let addr = spawn_backend().await;
        let store = HttpPinStore::new(&format!("http://{addr}/api/map-pins")).expect("url");

        assert!(store.list().await.expect("list").is_empty());
        let pin = store
            .create(NewPin::new("Playa Conchal", Vec3::new(10.0, 2.5, -3.0)))
            .await
            .expect("create");
        assert_eq!(pin.id, PinId::new("pin-1"));
        assert_eq!(pin.position, Vec3::new(10.0, 2.5, -3.0));

        assert_eq!(store.list().await.expect("list"), vec![pin.clone()]);
        store.delete(&pin.id).await.expect("delete");
        assert_eq!(
            store.delete(&pin.id).await.unwrap_err(),
            PinStoreError::NotFound(pin.id)
        );
    }

    #[tokio::test]
    async fn backend_errors_are_classified() {
        let addr = spawn_backend().await;
        let store = HttpPinStore::new(&format!("http://{addr}/api/map-pins")).expect("url");
        assert_eq!(
            store.create(NewPin::new("", Vec3::ZERO)).await.unwrap_err(),
            PinStoreError::Rejected("Failed to create map pin".to_string())
        );

        let broken = HttpPinStore::new(&format!("http://{addr}/broken")).expect("url");
        assert_eq!(
            broken.list().await.unwrap_err(),
            PinStoreError::Unavailable("Failed to fetch map pins".to_string())
        );
    }
}
