//! Integration tests for the HTTP-backed sources using wiremock.

use folio_core::{NetworkError, TemperatureUnit};
use folio_weather::{
    Coordinates, GeolocationError, IpLocator, NominatimClient, OpenMeteoClient, PositionOptions,
    RequestOptions, RetryConfig, SourceError, TimezoneDetection, WeatherCondition,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn nominatim(server: &MockServer) -> NominatimClient {
    NominatimClient::new(&server.uri(), "folio-tests/0.1")
        .unwrap()
        .with_retry(RetryConfig::none())
}

fn paris_place(place_id: Option<u64>) -> serde_json::Value {
    let mut place = serde_json::json!({
        "lat": "48.8566",
        "lon": "2.3522",
        "display_name": "Paris, Île-de-France, France métropolitaine, France",
        "address": {
            "city": "Paris",
            "state": "Île-de-France",
            "country": "France",
            "country_code": "fr"
        }
    });
    if let Some(id) = place_id {
        place["place_id"] = serde_json::json!(id);
    }
    place
}

#[tokio::test]
async fn test_reverse_geocode_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("lat", "48.8566"))
        .and(query_param("lon", "2.3522"))
        .and(query_param("accept-language", "es"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_place(Some(88_716_706))))
        .mount(&server)
        .await;

    let options = RequestOptions::default().with_language("es");
    let info = nominatim(&server).reverse(48.8566, 2.3522, &options).await.unwrap();

    assert_eq!(info.city, "Paris");
    assert_eq!(info.country_code, "FR");
    assert_eq!(info.state.as_deref(), Some("Île-de-France"));
    assert_eq!(info.place_id.as_deref(), Some("88716706"));
}

#[tokio::test]
async fn test_reverse_geocode_without_place_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_place(None)))
        .mount(&server)
        .await;

    let info = nominatim(&server)
        .reverse(48.8566, 2.3522, &RequestOptions::default())
        .await
        .unwrap();

    assert!(info.place_id.is_none());
}

#[tokio::test]
async fn test_reverse_geocode_in_the_ocean() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "error": "Unable to geocode" })),
        )
        .mount(&server)
        .await;

    let result = nominatim(&server)
        .reverse(0.0, -30.0, &RequestOptions::default())
        .await;

    assert!(matches!(result, Err(SourceError::NotFound(_))));
}

#[tokio::test]
async fn test_reverse_geocode_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = nominatim(&server)
        .reverse(48.8566, 2.3522, &RequestOptions::default())
        .await;

    match result {
        Err(SourceError::Network(NetworkError::ServerError { status, .. })) => {
            assert_eq!(status, 500)
        }
        other => panic!("expected server error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_search_skips_entries_without_coordinates() {
    let server = MockServer::start().await;
    let mut broken = paris_place(Some(2));
    broken["lat"] = serde_json::json!("not-a-number");

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Paris"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            paris_place(Some(1)),
            broken,
            paris_place(None),
        ])))
        .mount(&server)
        .await;

    let options = RequestOptions::default().with_limit(3);
    let results = nominatim(&server).search("  Paris ", &options).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].place_id, "1");
    assert_eq!(results[0].coordinates, Coordinates::new(48.8566, 2.3522));
    assert_eq!(results[1].place_id, "48.8566,2.3522");
}

#[tokio::test]
async fn test_blank_search_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let results = nominatim(&server)
        .search("   ", &RequestOptions::default())
        .await
        .unwrap();

    assert!(results.is_empty());
}

#[tokio::test]
async fn test_current_weather_parses_conditions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "40.4168"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "latitude": 40.4168,
            "longitude": -3.7038,
            "current": {
                "time": "2026-10-18T12:00",
                "interval": 900,
                "temperature_2m": 21.4,
                "relative_humidity_2m": 47.6,
                "apparent_temperature": 20.1,
                "weather_code": 61,
                "wind_speed_10m": 11.2,
                "is_day": 1
            }
        })))
        .mount(&server)
        .await;

    let client = OpenMeteoClient::new(&server.uri(), TemperatureUnit::Auto)
        .unwrap()
        .with_retry(RetryConfig::none());
    let weather = client
        .current_weather(40.4168, -3.7038, &RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(weather.condition, WeatherCondition::Rain);
    assert_eq!(weather.humidity, 48);
    assert!(weather.is_day);
    assert_eq!(weather.unit, TemperatureUnit::Celsius);
    assert_eq!(weather.updated_at.to_rfc3339(), "2026-10-18T12:00:00+00:00");
}

#[tokio::test]
async fn test_current_weather_requests_fahrenheit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("temperature_unit", "fahrenheit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": {
                "temperature_2m": 70.5,
                "relative_humidity_2m": 30,
                "apparent_temperature": 69.0,
                "weather_code": 0,
                "wind_speed_10m": 3.0,
                "is_day": 0
            }
        })))
        .mount(&server)
        .await;

    let client = OpenMeteoClient::new(&server.uri(), TemperatureUnit::Fahrenheit)
        .unwrap()
        .with_retry(RetryConfig::none());
    let weather = client
        .current_weather(40.71, -74.0, &RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(weather.unit, TemperatureUnit::Fahrenheit);
    assert!(!weather.is_day);
}

#[tokio::test]
async fn test_timezone_at_uses_iana_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("timezone", "auto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "timezone": "Asia/Tokyo",
            "timezone_abbreviation": "JST",
            "utc_offset_seconds": 32400
        })))
        .mount(&server)
        .await;

    let client = OpenMeteoClient::new(&server.uri(), TemperatureUnit::Auto)
        .unwrap()
        .with_retry(RetryConfig::none());
    let tz = client.timezone_at(35.68, 139.69, "ja-JP").await.unwrap();

    assert_eq!(tz.timezone, "Asia/Tokyo");
    assert_eq!(tz.offset, 540);
    assert_eq!(tz.is_dst, Some(false));
    assert_eq!(tz.locale, "ja-JP");
    assert_eq!(tz.detection_method, TimezoneDetection::Geolocation);
    assert_eq!(tz.coordinates, Some(Coordinates::new(35.68, 139.69)));
}

#[tokio::test]
async fn test_timezone_at_gives_up_on_a_stalled_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_secs(5))
                .set_body_json(serde_json::json!({
                    "timezone": "Asia/Tokyo",
                    "utc_offset_seconds": 32400
                })),
        )
        .mount(&server)
        .await;

    let client = OpenMeteoClient::new(&server.uri(), TemperatureUnit::Auto)
        .unwrap()
        .with_retry(RetryConfig::none())
        .with_lookup_timeout(std::time::Duration::from_millis(100));
    let err = client.timezone_at(35.68, 139.69, "ja-JP").await.unwrap_err();

    assert!(err.is_timeout(), "expected a timeout, got {err:?}");
}

#[tokio::test]
async fn test_ip_locate_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "lat": 41.3874,
            "lon": 2.1686
        })))
        .mount(&server)
        .await;

    let locator = IpLocator::new(&server.uri()).unwrap();
    let position = locator.locate(&PositionOptions::default()).await.unwrap();

    assert_eq!(position.coordinates, Coordinates::new(41.3874, 2.1686));
    assert!(position.accuracy > 0.0);
}

#[tokio::test]
async fn test_ip_locate_failure_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "fail",
            "message": "private range"
        })))
        .mount(&server)
        .await;

    let locator = IpLocator::new(&server.uri()).unwrap();
    let result = locator.locate(&PositionOptions::default()).await;

    assert_eq!(
        result,
        Err(GeolocationError::PositionUnavailable("private range".to_string()))
    );
}

#[tokio::test]
async fn test_ip_locate_forbidden_is_permission_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let locator = IpLocator::new(&server.uri()).unwrap();
    let result = locator.locate(&PositionOptions::default()).await;

    assert_eq!(result, Err(GeolocationError::PermissionDenied));
}

#[tokio::test]
async fn test_ip_locate_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_millis(500))
                .set_body_json(serde_json::json!({ "status": "success", "lat": 1.0, "lon": 1.0 })),
        )
        .mount(&server)
        .await;

    let locator = IpLocator::new(&server.uri()).unwrap();
    let options = PositionOptions {
        timeout: std::time::Duration::from_millis(50),
        ..PositionOptions::default()
    };
    let result = locator.locate(&options).await;

    assert_eq!(result, Err(GeolocationError::Timeout));
}
