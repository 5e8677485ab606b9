//! Client for the travel-price service.
//!
//! The service is opaque: given an origin and a destination it answers with
//! a distance, a travel price and a short description. No geocoding or
//! routing happens here, and failed calls are never retried; the caller
//! surfaces the error so the operator can try again.

use std::fmt;
use std::time::Duration;

use fo_core::TravelQuote;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const QUOTE_PATH: &str = "quote";

/// Travel client errors.
#[derive(Debug, Error)]
pub enum TravelError {
    /// The client configuration is unusable.
    #[error("invalid travel service configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// Transport failure; safe to retry by hand.
    #[error("travel service unreachable: {0}")]
    Network(#[from] reqwest::Error),
    /// The service answered with an error.
    #[error("travel service error: {message}")]
    Api { message: String },
    /// The answer could not be understood.
    #[error("invalid travel quote: {0}")]
    InvalidResponse(String),
}

/// Travel-price service client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty or not http(s), if the API key
    /// is given but blank, or if the HTTP client fails to build.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, TravelError> {
        let endpoint = quote_endpoint(base_url)?;
        if api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(TravelError::InvalidConfig {
                reason: "API key cannot be blank",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(TravelError::ClientBuild)?;

        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }

    /// Asks for the distance and travel price between two addresses.
    pub async fn quote(&self, origin: &str, destination: &str) -> Result<TravelQuote, TravelError> {
        if origin.trim().is_empty() || destination.trim().is_empty() {
            return Err(TravelError::InvalidConfig {
                reason: "origin and destination are required",
            });
        }
        let request = QuoteRequest {
            origin: origin.trim(),
            destination: destination.trim(),
        };

        let mut builder = self.http.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        tracing::debug!(endpoint = %self.endpoint, "requesting travel quote");
        let response = builder.send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(&body).unwrap_or_else(|| TravelError::Api {
                message: format!("status {status}: {body}"),
            }));
        }
        parse_quote(&body)
    }
}

#[derive(Debug, Serialize)]
struct QuoteRequest<'a> {
    origin: &'a str,
    destination: &'a str,
}

fn quote_endpoint(base_url: &str) -> Result<String, TravelError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(TravelError::InvalidConfig {
            reason: "base URL cannot be empty",
        });
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(TravelError::InvalidConfig {
            reason: "base URL must start with http:// or https://",
        });
    }
    Ok(format!("{trimmed}/{QUOTE_PATH}"))
}

fn parse_quote(body: &str) -> Result<TravelQuote, TravelError> {
    let quote: TravelQuote =
        serde_json::from_str(body).map_err(|err| TravelError::InvalidResponse(err.to_string()))?;
    if quote.distance_km < Decimal::ZERO {
        return Err(TravelError::InvalidResponse(format!(
            "negative distance {}",
            quote.distance_km
        )));
    }
    if quote.travel_price < Decimal::ZERO {
        return Err(TravelError::InvalidResponse(format!(
            "negative travel price {}",
            quote.travel_price
        )));
    }
    Ok(TravelQuote {
        travel_description: quote
            .travel_description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        ..quote
    })
}

fn parse_api_error(body: &str) -> Option<TravelError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorDetails {
        Message { message: String },
        Text(String),
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| TravelError::Api {
            message: match payload.error {
                ErrorDetails::Message { message } | ErrorDetails::Text(message) => message,
            },
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn client_rejects_bad_base_url() {
        assert!(matches!(
            Client::new("", None),
            Err(TravelError::InvalidConfig { .. })
        ));
        assert!(matches!(
            Client::new("ftp://travel.local", None),
            Err(TravelError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn client_rejects_blank_api_key() {
        assert!(matches!(
            Client::new("https://travel.local", Some("   ".to_string())),
            Err(TravelError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn client_accepts_missing_api_key() {
        assert!(Client::new("https://travel.local/api/", None).is_ok());
    }

    #[test]
    fn client_debug_redacts_api_key() {
        let client = Client::new("https://travel.local", Some("secret-key".to_string())).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn endpoint_joins_path_once() {
        assert_eq!(
            quote_endpoint("https://travel.local/api/").unwrap(),
            "https://travel.local/api/quote"
        );
        assert_eq!(
            quote_endpoint(" http://localhost:8080 ").unwrap(),
            "http://localhost:8080/quote"
        );
    }

    #[test]
    fn parse_quote_accepts_service_shape() {
        let body = r#"{"distanceKm": 42.5, "travelPrice": "212.50", "travelDescription": "  Ida e volta, 85 km  "}"#;
        let quote = parse_quote(body).unwrap();
        assert_eq!(quote.distance_km, dec!(42.5));
        assert_eq!(quote.travel_price, dec!(212.50));
        assert_eq!(quote.travel_description.as_deref(), Some("Ida e volta, 85 km"));
    }

    #[test]
    fn parse_quote_drops_blank_description() {
        let quote = parse_quote(r#"{"distanceKm": 1, "travelPrice": 0, "travelDescription": " "}"#).unwrap();
        assert_eq!(quote.travel_description, None);
    }

    #[test]
    fn parse_quote_rejects_negative_amounts() {
        let err = parse_quote(r#"{"distanceKm": 10, "travelPrice": -5}"#).unwrap_err();
        assert!(matches!(err, TravelError::InvalidResponse(_)));
        let err = parse_quote(r#"{"distanceKm": -1, "travelPrice": 5}"#).unwrap_err();
        assert!(matches!(err, TravelError::InvalidResponse(_)));
    }

    #[test]
    fn parse_quote_rejects_invalid_json() {
        let err = parse_quote("not-json").unwrap_err();
        assert!(matches!(err, TravelError::InvalidResponse(_)));
    }

    #[test]
    fn parse_api_error_reads_both_shapes() {
        let nested = parse_api_error(r#"{"error": {"message": "address not found"}}"#).unwrap();
        assert_eq!(nested.to_string(), "travel service error: address not found");
        let flat = parse_api_error(r#"{"error": "quota exceeded"}"#).unwrap();
        assert_eq!(flat.to_string(), "travel service error: quota exceeded");
        assert!(parse_api_error("<html>").is_none());
    }

    #[tokio::test]
    async fn quote_requires_addresses() {
        let client = Client::new("http://127.0.0.1:9", None).unwrap();
        let err = client.quote(" ", "Rua B, 20").await.unwrap_err();
        assert!(matches!(err, TravelError::InvalidConfig { .. }));
    }
}
