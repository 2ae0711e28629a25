//! Geocoder and schedule source against a local mock HTTP server.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dogwise::{
    Finder, Geocoder, HttpScheduleSource, LocationResolver, ScheduleError, SearchOutcome,
    ZippopotamGeocoder, default_roster,
};

fn beverly_hills_body() -> serde_json::Value {
    json!({
        "post code": "90210",
        "country": "United States",
        "country abbreviation": "US",
        "places": [{
            "place name": "Beverly Hills",
            "longitude": "-118.4065",
            "state": "California",
            "state abbreviation": "CA",
            "latitude": "34.0901"
        }]
    })
}

fn december_2029() -> NaiveDate {
    NaiveDate::from_ymd_opt(2029, 12, 1).unwrap()
}

#[tokio::test]
async fn geocoder_reads_first_place() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/us/90210"))
        .respond_with(ResponseTemplate::new(200).set_body_json(beverly_hills_body()))
        .mount(&server)
        .await;

    let geocoder = ZippopotamGeocoder::new(server.uri()).unwrap();
    let record = geocoder.lookup("90210").await.unwrap().unwrap();

    assert_eq!(record.city, "Beverly Hills");
    assert_eq!(record.state, "CA");
}

#[tokio::test]
async fn geocoder_unknown_zip_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/us/00501"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
        .mount(&server)
        .await;

    let geocoder = ZippopotamGeocoder::new(server.uri()).unwrap();
    assert!(geocoder.lookup("00501").await.unwrap().is_none());
}

#[tokio::test]
async fn geocoder_non_json_body_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/us/30301"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let geocoder = ZippopotamGeocoder::new(server.uri()).unwrap();
    assert!(geocoder.lookup("30301").await.is_err());
}

#[tokio::test]
async fn resolver_hits_network_once_per_zip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/us/90210"))
        .respond_with(ResponseTemplate::new(200).set_body_json(beverly_hills_body()))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = LocationResolver::new(Arc::new(ZippopotamGeocoder::new(server.uri()).unwrap()));
    let first = resolver.resolve("90210").await;
    let second = resolver.resolve("90210").await;

    assert!(first.is_some());
    assert_eq!(first, second);
    // MockServer verifies `expect(1)` on drop.
}

#[tokio::test]
async fn rank_reports_zip_not_found_from_empty_geocoder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/us/00501"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
        .mount(&server)
        .await;

    let finder = Finder::new(
        default_roster(),
        Arc::new(ZippopotamGeocoder::new(server.uri()).unwrap()),
    );

    assert_eq!(
        finder.rank_on("00501", 5, december_2029()).await,
        SearchOutcome::ZipNotFound {
            zip: "00501".to_string()
        }
    );
}

#[tokio::test]
async fn schedule_refresh_replaces_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sheet.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "Trainer,01/02/2030,15/02/2030\n\"Delta, Trainer\",full,OPEN\n",
        ))
        .mount(&server)
        .await;

    let geocoder = Arc::new(ZippopotamGeocoder::new(server.uri()).unwrap());
    let finder = Finder::new(default_roster(), geocoder);
    let source = HttpScheduleSource::new(format!("{}/sheet.csv", server.uri())).unwrap();

    assert_eq!(finder.refresh_schedule(&source).await.unwrap(), 1);

    let SearchOutcome::Found { results, .. } = finder.rank_on("19103", 1, december_2029()).await
    else {
        panic!("expected results for a roster ZIP");
    };
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].candidate.name, "Trainer Delta");
    assert_eq!(results[0].distance_miles, 0);
    assert_eq!(results[0].next_available, "Feb 15");
}

#[tokio::test]
async fn failed_schedule_fetch_keeps_previous_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/good.csv"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("Trainer,01/02/2030\nAlpha,OPEN\nBravo,3\n"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken.csv"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let finder = Finder::new(
        default_roster(),
        Arc::new(ZippopotamGeocoder::new(server.uri()).unwrap()),
    );
    let good = HttpScheduleSource::new(format!("{}/good.csv", server.uri())).unwrap();
    let broken = HttpScheduleSource::new(format!("{}/broken.csv", server.uri())).unwrap();

    finder.refresh_schedule(&good).await.unwrap();
    let err = finder.refresh_schedule(&broken).await.unwrap_err();

    assert!(matches!(err, ScheduleError::UnexpectedStatus { status: 500, .. }));
    assert_eq!(finder.schedule_rows().await, 2);
}
