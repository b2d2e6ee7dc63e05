//! End-to-end tests against a local fake upstream.
//!
//! The fake serves station pages the way the real dashboards do: a page
//! with hidden personnel flags and a script holding a signed data URL,
//! plus a data endpoint that only answers sessions which loaded the page.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use cuartel_server::cache::{CacheConfig, RefreshOutcome, SnapshotCache};
use cuartel_server::domain::{Registry, Source, StationRecord, VehicleState, VehicleStatus};
use cuartel_server::fetch::{FetchConfig, StationFetch, StationFetcher};
use cuartel_server::web::{AppState, create_router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

#[derive(Debug, Deserialize)]
struct DataQuery {
    id_proce: String,
    time: String,
    hash: String,
}

fn station_html(data_url: Option<&str>, present: usize, absent: usize) -> String {
    let mut html = String::from("<html><head><title>Cuartel</title>\n<script>\n");
    if let Some(url) = data_url {
        html.push_str(&format!("var url=\"{url}\";\n"));
    }
    html.push_str("</script></head><body>\n");
    for _ in 0..present {
        html.push_str("<input type=\"hidden\" name=\"estado_personal\" value=\"1\">\n");
    }
    for _ in 0..absent {
        html.push_str("<input type=\"hidden\" name=\"estado_personal\" value=\"0\">\n");
    }
    html.push_str("</body></html>");
    html
}

async fn station_page(
    State(base): State<Arc<String>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !agent.starts_with("Mozilla/") {
        return (StatusCode::FORBIDDEN, "forbidden").into_response();
    }

    let html = match id.as_str() {
        "lento" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            station_html(None, 0, 0)
        }
        "sin-marcador" => station_html(None, 2, 1),
        _ => {
            let query = format!("id_proce={id}&time=1718000000&hash=f00d{id}");
            let url = format!("{base}/cuartel/datos.php?{query}");
            station_html(Some(&url), 3, 1)
        }
    };

    (
        [(header::SET_COOKIE, format!("PHPSESSID=sess-{id}; Path=/"))],
        Html(html),
    )
        .into_response()
}

async fn vehicle_data(Query(q): Query<DataQuery>, headers: HeaderMap) -> Response {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let signed = q.time == "1718000000" && q.hash == format!("f00d{}", q.id_proce);
    if !signed || !cookie.contains(&format!("PHPSESSID=sess-{}", q.id_proce)) {
        return Html("<html>Sesión expirada</html>").into_response();
    }

    let body = match q.id_proce.as_str() {
        "124" => json!({"carros": {
            "7": {"nombre": "B-1", "estado_nombre": "En llamado"},
            "3": {"nombre": "Q-1", "estado_nombre": "Fuera de servicio"},
            "5": {"nombre": "R-1", "estado_nombre": "En servicio"}
        }})
        .to_string(),
        "247" => json!({"carros": [
            {"nombre": "B-2", "estado_nombre": "disponible en llamado"},
            "basura"
        ]})
        .to_string(),
        "nulo" => json!({"carros": null, "otro": 1}).to_string(),
        "roto" => "<br /><b>Warning</b>: mysqli_connect() failed".to_string(),
        _ => json!({}).to_string(),
    };

    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Start the fake upstream and return its base URL.
async fn start_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let base = format!("http://{addr}");

    let app = Router::new()
        .route("/c/v/:id", get(station_page))
        .route("/cuartel/datos.php", get(vehicle_data))
        .with_state(Arc::new(base.clone()));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    base
}

/// Page requests currently being served, and the most seen at once.
#[derive(Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

const SLOW_PAGE_DELAY: Duration = Duration::from_millis(200);

async fn counted_page(State(in_flight): State<Arc<InFlight>>) -> Html<String> {
    let now = in_flight.current.fetch_add(1, Ordering::SeqCst) + 1;
    in_flight.peak.fetch_max(now, Ordering::SeqCst);

    tokio::time::sleep(SLOW_PAGE_DELAY).await;

    in_flight.current.fetch_sub(1, Ordering::SeqCst);
    Html(station_html(None, 1, 0))
}

/// Start an upstream whose pages are slow and count concurrent requests.
async fn start_counting_upstream() -> (String, Arc<InFlight>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let in_flight = Arc::new(InFlight::default());

    let app = Router::new()
        .route("/c/v/:id", get(counted_page))
        .with_state(Arc::clone(&in_flight));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), in_flight)
}

fn fetcher_for(base: &str) -> StationFetcher {
    StationFetcher::new(
        FetchConfig::default()
            .with_timeout(1)
            .with_data_url_prefix(format!("{base}/cuartel/datos.php")),
    )
    .unwrap()
}

async fn fetch(base: &str, name: &str, id: &str) -> StationRecord {
    let source = Source::new(name, format!("{base}/c/v/{id}"));
    fetcher_for(base).fetch_station(&source).await
}

#[tokio::test]
async fn keyed_vehicles_are_normalized() {
    let base = start_upstream().await;
    let record = fetch(&base, "1 CBS", "124").await;

    assert_eq!(record.station_name, "1 CBS");
    assert_eq!(record.personnel_count, 3);
    assert_eq!(
        record.vehicles,
        vec![
            VehicleStatus::new("B-1", VehicleState::EnLlamado),
            VehicleStatus::new("R-1", VehicleState::EnServicio),
        ]
    );
}

#[tokio::test]
async fn listed_vehicles_skip_malformed_entries() {
    let base = start_upstream().await;
    let record = fetch(&base, "2 CBS", "247").await;

    assert_eq!(
        record.vehicles,
        vec![VehicleStatus::new("B-2", VehicleState::DisponibleEnLlamado)]
    );
}

#[tokio::test]
async fn missing_marker_is_offline_but_counts_personnel() {
    let base = start_upstream().await;
    let record = fetch(&base, "4 CBS", "sin-marcador").await;

    assert_eq!(record.personnel_count, 2);
    assert_eq!(record.vehicles, vec![VehicleStatus::offline()]);
}

#[tokio::test]
async fn broken_vehicle_data_is_offline_but_keeps_personnel() {
    let base = start_upstream().await;
    let record = fetch(&base, "6 CBS", "roto").await;

    assert_eq!(record.personnel_count, 3);
    assert_eq!(record.vehicles, vec![VehicleStatus::offline()]);
}

#[tokio::test]
async fn null_vehicle_list_is_empty() {
    let base = start_upstream().await;
    let record = fetch(&base, "8 CBS", "nulo").await;

    assert_eq!(record.personnel_count, 3);
    assert!(record.vehicles.is_empty());
    assert!(!record.is_degraded());
}

#[tokio::test]
async fn slow_page_times_out_as_sin_conexion() {
    let base = start_upstream().await;
    let record = fetch(&base, "18 CBS", "lento").await;

    assert_eq!(record.personnel_count, 0);
    assert_eq!(record.vehicles, vec![VehicleStatus::sin_conexion()]);
}

#[tokio::test]
async fn browser_user_agent_is_required_upstream() {
    let base = start_upstream().await;
    let fetcher = StationFetcher::new(
        FetchConfig::default()
            .with_user_agent("curl/8.5")
            .with_data_url_prefix(format!("{base}/cuartel/datos.php")),
    )
    .unwrap();

    // The error page is reachable but has no data URL.
    let record = fetcher
        .fetch_station(&Source::new("1 CBS", format!("{base}/c/v/124")))
        .await;
    assert_eq!(record.personnel_count, 0);
    assert_eq!(record.vehicles, vec![VehicleStatus::offline()]);
}

#[tokio::test]
async fn refresh_and_serve_whole_registry() {
    let base = start_upstream().await;
    let registry = Registry::new(vec![
        Source::new("18 CBS", format!("{base}/c/v/lento")),
        Source::new("6 CBS", format!("{base}/c/v/roto")),
        Source::new("2 CBS", format!("{base}/c/v/247")),
        Source::new("1 CBS", format!("{base}/c/v/124")),
        Source::new("4 CBS", format!("{base}/c/v/sin-marcador")),
        Source::new("22 CBS", "http://127.0.0.1:1/c/v/2707"),
    ]);
    let cache = SnapshotCache::new(
        fetcher_for(&base),
        registry,
        &CacheConfig::new(Duration::from_secs(60)),
    );

    let outcome = cache.refresh_all().await;
    assert_eq!(
        outcome,
        RefreshOutcome::Completed {
            records: 6,
            degraded: 4
        }
    );

    let app = create_router(AppState::new(cache, true));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/carros")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(
        body,
        json!([
            {
                "nombre_cuartel": "1 CBS",
                "personal": "3",
                "carros": [
                    {"nombre": "B-1", "estado": "EN LLAMADO"},
                    {"nombre": "R-1", "estado": "EN SERVICIO"}
                ]
            },
            {
                "nombre_cuartel": "2 CBS",
                "personal": "3",
                "carros": [{"nombre": "B-2", "estado": "DISPONIBLE EN LLAMADO"}]
            },
            {
                "nombre_cuartel": "4 CBS",
                "personal": "2",
                "carros": [{"nombre": "SISTEMA", "estado": "OFFLINE"}]
            },
            {
                "nombre_cuartel": "6 CBS",
                "personal": "3",
                "carros": [{"nombre": "SISTEMA", "estado": "OFFLINE"}]
            },
            {
                "nombre_cuartel": "18 CBS",
                "personal": "0",
                "carros": [{"nombre": "SISTEMA", "estado": "SIN CONEXIÓN"}]
            },
            {
                "nombre_cuartel": "22 CBS",
                "personal": "0",
                "carros": [{"nombre": "SISTEMA", "estado": "SIN CONEXIÓN"}]
            }
        ])
    );
}

#[tokio::test]
async fn refresh_respects_concurrency_limit() {
    const LIMIT: usize = 3;
    const STATIONS: usize = 10;

    let (base, in_flight) = start_counting_upstream().await;
    let registry = Registry::new(
        (1..=STATIONS)
            .map(|n| Source::new(format!("{n} CBS"), format!("{base}/c/v/{n}")))
            .collect(),
    );
    let fetcher = StationFetcher::new(
        FetchConfig::default()
            .with_timeout(5)
            .with_max_concurrent(LIMIT),
    )
    .unwrap();
    let cache = SnapshotCache::new(fetcher, registry, &CacheConfig::default());

    // The first refresh builds every station session; measure the second.
    cache.refresh_all().await;
    in_flight.peak.store(0, Ordering::SeqCst);

    let started = Instant::now();
    let outcome = cache.refresh_all().await;
    let elapsed = started.elapsed();

    assert_eq!(
        outcome,
        RefreshOutcome::Completed {
            records: STATIONS,
            degraded: STATIONS
        }
    );
    assert_eq!(in_flight.peak.load(Ordering::SeqCst), LIMIT);

    let waves = STATIONS.div_ceil(LIMIT) as u32;
    assert!(
        elapsed >= SLOW_PAGE_DELAY * waves,
        "refresh took {elapsed:?} for {waves} waves"
    );

    let snapshot = cache.current().await;
    for (i, record) in snapshot.records().iter().enumerate() {
        assert_eq!(record.station_name, format!("{} CBS", i + 1));
        assert_eq!(record.personnel_count, 1);
        assert_eq!(record.vehicles, vec![VehicleStatus::offline()]);
    }
}

#[tokio::test]
async fn station_session_is_reused_across_refreshes() {
    let base = start_upstream().await;
    let fetcher = fetcher_for(&base);
    let source = Source::new("1 CBS", format!("{base}/c/v/124"));

    let first = fetcher.fetch_station(&source).await;
    let second = fetcher.fetch_station(&source).await;

    assert_eq!(fetcher.session_count().await, 1);
    assert!(!first.is_degraded());
    assert_eq!(first, second);
}
