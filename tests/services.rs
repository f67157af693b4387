use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use reqwest::Client;
use serde_json::{json, Value};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;
use weather_stack::client::{RecommendationsClient, WeatherClient};
use weather_stack::predictor::{Condition, WeatherPredictor, LOCATIONS};
use weather_stack::recommendations::{self, RecommendationState};
use weather_stack::rules::RuleTable;
use weather_stack::traffic::{Target, TrafficGenerator};
use weather_stack::weather::{self, WeatherState};

fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener).unwrap().serve(app.into_make_service());
    tokio::spawn(server);
    addr
}

fn http_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap()
}

fn spawn_weather() -> SocketAddr {
    spawn(weather::router(Arc::new(WeatherState::new(WeatherPredictor::new()))))
}

fn spawn_recommendations(weather_addr: SocketAddr, timeout: Duration) -> SocketAddr {
    let weather = WeatherClient::new(http_client(timeout), &format!("http://{}", weather_addr)).unwrap();
    spawn(recommendations::router(Arc::new(RecommendationState::new(
        weather,
        RuleTable::new(),
    ))))
}

fn spawn_stub_weather(body: Value) -> SocketAddr {
    spawn(Router::new().route(
        "/prediction",
        get(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    ))
}

async fn get_json(url: String) -> (StatusCode, Value) {
    let res = reqwest::get(url).await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn test_recommendations_from_stub_weather() {
    let weather_addr = spawn_stub_weather(json!({
        "location": "Paris",
        "condition": "Rainy",
        "temperature_celsius": 12.0,
    }));
    let addr = spawn_recommendations(weather_addr, Duration::from_secs(5));

    let (status, json) = get_json(format!("http://{}/recommendations?location=Paris", addr)).await;

    assert_eq!(StatusCode::OK, status);
    assert_eq!("Paris", json["location"]);
    assert_eq!("rainy", json["weather_condition"]);
    assert_eq!(12.0, json["temperature_celsius"]);
    assert_eq!("museum", json["best_activity"]);

    let recs = json["recommendations"].as_array().unwrap();
    let activities: Vec<&str> = recs.iter().map(|r| r["activity"].as_str().unwrap()).collect();
    assert_eq!(vec!["museum", "cinema", "indoor_shopping"], activities);
    assert_eq!("Museum is great with rainy weather at 12.0°C", recs[0]["rationale"]);
    assert_eq!("Perfect for museum visits", recs[0]["description"]);
}

#[tokio::test]
async fn test_recommendations_repeated_location_uses_last() {
    let weather_addr = spawn_weather();
    let addr = spawn_recommendations(weather_addr, Duration::from_secs(5));

    let (status, json) = get_json(format!("http://{}/recommendations?location=a&location=b", addr)).await;

    assert_eq!(StatusCode::OK, status);
    assert_eq!("b", json["location"]);
}

#[tokio::test]
async fn test_recommendations_unknown_condition() {
    let weather_addr = spawn_stub_weather(json!({"location": "Paris"}));
    let addr = spawn_recommendations(weather_addr, Duration::from_secs(5));

    let (status, json) = get_json(format!("http://{}/recommendations?location=Paris", addr)).await;

    assert_eq!(StatusCode::OK, status);
    assert_eq!("unknown", json["weather_condition"]);
    assert_eq!(0.0, json["temperature_celsius"]);
    assert_eq!(json!([]), json["recommendations"]);
    assert!(json["best_activity"].is_null());
}

#[tokio::test]
async fn test_recommendations_weather_error_status() {
    let weather_addr = spawn(Router::new().route(
        "/prediction",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"}))) }),
    ));
    let addr = spawn_recommendations(weather_addr, Duration::from_secs(5));

    let (status, json) = get_json(format!("http://{}/recommendations?location=Paris", addr)).await;

    assert_eq!(StatusCode::SERVICE_UNAVAILABLE, status);
    assert!(json["error"].as_str().unwrap().starts_with("Failed to get weather data"));
    assert!(json.get("recommendations").is_none());
}

#[tokio::test]
async fn test_recommendations_weather_timeout() {
    let weather_addr = spawn(Router::new().route(
        "/prediction",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"condition": "sunny"}))
        }),
    ));
    let addr = spawn_recommendations(weather_addr, Duration::from_millis(200));

    let (status, json) = get_json(format!("http://{}/recommendations?location=Oslo", addr)).await;
    assert_eq!(StatusCode::SERVICE_UNAVAILABLE, status);
    assert!(json.get("recommendations").is_none());

    let metrics = reqwest::get(format!("http://{}/metrics", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("weather_service_calls_total{status=\"error\"} 1"));
    assert!(!metrics.contains("recommendations_generated_total{"));
}

#[tokio::test]
async fn test_recommendations_end_to_end() {
    let weather_addr = spawn_weather();
    let addr = spawn_recommendations(weather_addr, Duration::from_secs(5));
    let client = RecommendationsClient::new(http_client(Duration::from_secs(5)), &format!("http://{}", addr)).unwrap();

    for _ in 0..10 {
        let res = client.recommendations("Tokyo").await.unwrap();

        assert_eq!("Tokyo", res.location);
        assert!(res.weather_condition.parse::<Condition>().is_ok());
        assert!(!res.recommendations.is_empty() && res.recommendations.len() <= 3);
        assert!(res.recommendations.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(Some(&res.recommendations[0].activity), res.best_activity.as_ref());
    }

    let metrics = reqwest::get(format!("http://{}/metrics", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("weather_service_calls_total{status=\"success\"} 10"));
    assert!(metrics.contains("recommendation_latency_seconds_count 10"));
}

#[tokio::test]
async fn test_weather_client() {
    let addr = spawn_weather();
    let client = WeatherClient::new(http_client(Duration::from_secs(5)), &format!("http://{}", addr)).unwrap();

    assert_eq!("healthy", client.health().await.unwrap().status);
    assert_eq!(LOCATIONS.to_vec(), client.locations().await.unwrap().locations);

    let prediction = client.prediction(None).await.unwrap();
    assert!(LOCATIONS.contains(&prediction.location.as_deref().unwrap()));

    let prediction = client.prediction(Some("São Paulo")).await.unwrap();
    assert_eq!(Some("São Paulo"), prediction.location.as_deref());
}

#[tokio::test]
async fn test_traffic_generator() {
    let weather_addr = spawn_weather();
    let recs_addr = spawn_recommendations(weather_addr, Duration::from_secs(5));
    let http = http_client(Duration::from_secs(5));

    let generator = TrafficGenerator::new(
        WeatherClient::new(http.clone(), &format!("http://{}", weather_addr)).unwrap(),
        RecommendationsClient::new(http, &format!("http://{}", recs_addr)).unwrap(),
        3,
        Duration::from_millis(1),
    );

    generator.check(Target::Both).await.unwrap();
    assert_eq!(6, generator.run(Target::Both, Some("Berlin")).await.unwrap());
    assert_eq!(3, generator.run(Target::Weather, None).await.unwrap());
}

#[tokio::test]
async fn test_traffic_generator_service_down() {
    let http = http_client(Duration::from_millis(500));
    let generator = TrafficGenerator::new(
        WeatherClient::new(http.clone(), "http://127.0.0.1:9").unwrap(),
        RecommendationsClient::new(http, "http://127.0.0.1:9").unwrap(),
        1,
        Duration::from_millis(1),
    );

    assert!(generator.check(Target::Recommendations).await.is_err());
    assert!(generator.run(Target::Weather, None).await.is_err());
}
