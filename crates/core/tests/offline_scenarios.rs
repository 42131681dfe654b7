//! End-to-end behaviour of the worker against an in-process network.
//!
//! Covers install/activate across generations, cache-first resolution,
//! populate-on-miss with FIFO trimming, and the offline fallback rules.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use cinecache_core::{
    CacheDb, Error, FetchEvent, GenerationConfig, Network, NetworkError, PreloadResponse, Registration, Request,
    Response, ResponseSource, ServiceWorker, WorkerMessage, WorkerState,
};
use serde_json::json;
use url::Url;

const ORIGIN: &str = "https://movies.test";

fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

#[derive(Default)]
struct StubNetwork {
    routes: Mutex<HashMap<String, Response>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: AtomicUsize,
    held: Mutex<HashSet<String>>,
    arrived: Notify,
    release: Notify,
}

impl StubNetwork {
    fn serving(paths: &[&str]) -> Arc<Self> {
        let network = Arc::new(Self::default());
        for path in paths {
            network.route(path, Response::new(200, format!("body of {path}")));
        }
        network
    }

    fn route(&self, path: &str, response: Response) {
        self.routes.lock().unwrap().insert(url(path).to_string(), response);
    }

    fn fail(&self, path: &str) {
        self.failing.lock().unwrap().insert(url(path).to_string());
    }

    /// Block fetches of `path` until `release` is notified.
    fn hold(&self, path: &str) {
        self.held.lock().unwrap().insert(url(path).to_string());
    }

    fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = request.url.to_string();
        let held = self.held.lock().unwrap().contains(&key);
        if held {
            self.arrived.notify_one();
            self.release.notified().await;
        }
        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&key) {
            return Err(NetworkError::Offline);
        }
        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Response::new(404, "not found")))
    }
}

fn generation(tag: u32, manifest: &[&str], offline: &str, ceiling: usize) -> GenerationConfig {
    GenerationConfig {
        static_cache: format!("static-v{tag}"),
        dynamic_cache: format!("dynamic-{tag}"),
        manifest: manifest.iter().map(|p| url(p)).collect(),
        offline_url: url(offline),
        max_dynamic_entries: ceiling,
        navigation_preload: true,
    }
}

async fn registered(network: &Arc<StubNetwork>, generation: GenerationConfig) -> Registration {
    let db = CacheDb::open_in_memory().await.unwrap();
    let registration = Registration::new(db, network.clone());
    registration.register(generation).await.unwrap();
    registration
}

async fn dynamic_urls(registration: &Registration, name: &str) -> Vec<String> {
    let partition = registration.db().open_partition(name).await.unwrap();
    partition.keys().await.unwrap().into_iter().map(|k| k.url).collect()
}

#[tokio::test]
async fn install_then_offline_requests() {
    let network = StubNetwork::serving(&["/", "/offline.html"]);
    let registration = registered(&network, generation(1, &["/", "/offline.html"], "/offline.html", 50)).await;

    let fixed = registration.db().open_partition("static-v1").await.unwrap();
    assert_eq!(fixed.len().await.unwrap(), 2);

    network.go_offline();

    let result = registration.fetch(FetchEvent::new(Request::get(url("/missing.png")))).await;
    assert!(matches!(result, Err(Error::Network(_))));

    let served = registration
        .fetch(FetchEvent::new(Request::navigate(url("/movie"))))
        .await
        .unwrap();
    assert_eq!(served.source, ResponseSource::Fallback);
    assert_eq!(served.response.text(), "body of /offline.html");

    let served = registration
        .fetch(FetchEvent::new(Request::navigate(url("/"))))
        .await
        .unwrap();
    assert_eq!(served.source, ResponseSource::Cache { partition: "static-v1".into() });
    assert_eq!(served.response.text(), "body of /");
}

#[tokio::test]
async fn cached_requests_skip_the_network() {
    let network = StubNetwork::serving(&["/", "/404.html", "/css/app.css"]);
    let registration = registered(&network, generation(1, &["/", "/404.html"], "/404.html", 50)).await;

    registration
        .fetch(FetchEvent::new(Request::get(url("/css/app.css"))))
        .await
        .unwrap();
    let before = network.calls();

    for path in ["/", "/404.html", "/css/app.css"] {
        let served = registration.fetch(FetchEvent::new(Request::get(url(path)))).await.unwrap();
        assert!(matches!(served.source, ResponseSource::Cache { .. }), "{path} not served from cache");
    }

    assert_eq!(network.calls(), before);
}

#[tokio::test]
async fn miss_populates_dynamic_partition() {
    let network = StubNetwork::serving(&["/", "/404.html"]);
    network.route("/api/search?query=alien", Response::new(200, "[alien]"));
    let registration = registered(&network, generation(1, &["/", "/404.html"], "/404.html", 50)).await;

    let served = registration
        .fetch(FetchEvent::new(Request::get(url("/api/search?query=alien"))))
        .await
        .unwrap();

    assert_eq!(served.source, ResponseSource::Network);
    assert_eq!(served.response.text(), "[alien]");
    assert_eq!(dynamic_urls(&registration, "dynamic-1").await, vec![url("/api/search?query=alien").to_string()]);

    network.go_offline();
    let served = registration
        .fetch(FetchEvent::new(Request::get(url("/api/search?query=alien"))))
        .await
        .unwrap();
    assert_eq!(served.source, ResponseSource::Cache { partition: "dynamic-1".into() });
}

#[tokio::test]
async fn dynamic_partition_is_fifo_bounded() {
    let network = StubNetwork::serving(&["/", "/404.html", "/u1", "/u2", "/u3", "/u4"]);
    let registration = registered(&network, generation(1, &["/", "/404.html"], "/404.html", 3)).await;

    for path in ["/u1", "/u2", "/u3", "/u4"] {
        registration.fetch(FetchEvent::new(Request::get(url(path)))).await.unwrap();
    }

    let expected: Vec<String> = ["/u2", "/u3", "/u4"].iter().map(|p| url(p).to_string()).collect();
    assert_eq!(dynamic_urls(&registration, "dynamic-1").await, expected);
}

#[tokio::test]
async fn concurrent_misses_respect_ceiling() {
    let paths: Vec<String> = (0..12).map(|i| format!("/img/{i}.png")).collect();
    let network = StubNetwork::serving(&["/", "/404.html"]);
    for path in &paths {
        network.route(path, Response::new(200, path.clone()));
    }
    let registration = Arc::new(registered(&network, generation(1, &["/", "/404.html"], "/404.html", 5)).await);

    let mut tasks = Vec::new();
    for path in paths {
        let registration = Arc::clone(&registration);
        tasks.push(tokio::spawn(async move {
            registration.fetch(FetchEvent::new(Request::get(url(&path)))).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(dynamic_urls(&registration, "dynamic-1").await.len(), 5);
}

#[tokio::test]
async fn asset_failure_is_not_substituted() {
    let network = StubNetwork::serving(&["/", "/404.html"]);
    let registration = registered(&network, generation(1, &["/", "/404.html"], "/404.html", 50)).await;
    network.fail("/img/poster.jpg");

    let result = registration.fetch(FetchEvent::new(Request::get(url("/img/poster.jpg")))).await;

    assert!(matches!(result, Err(Error::Network(NetworkError::Offline))));
}

#[tokio::test]
async fn html_subresource_gets_fallback() {
    let network = StubNetwork::serving(&["/", "/404.html"]);
    let registration = registered(&network, generation(1, &["/", "/404.html"], "/404.html", 50)).await;
    network.go_offline();

    let served = registration
        .fetch(FetchEvent::new(Request::get(url("/partials/card.html"))))
        .await
        .unwrap();

    assert_eq!(served.source, ResponseSource::Fallback);
    assert_eq!(served.response.text(), "body of /404.html");
}

#[tokio::test]
async fn non_get_requests_pass_through() {
    let network = StubNetwork::serving(&["/", "/404.html"]);
    network.route("/api/rate", Response::new(201, "created"));
    let registration = registered(&network, generation(1, &["/", "/404.html"], "/404.html", 50)).await;

    let served = registration
        .fetch(FetchEvent::new(Request::get(url("/api/rate")).with_method("POST")))
        .await
        .unwrap();

    assert_eq!(served.source, ResponseSource::Passthrough);
    assert_eq!(served.response.status, 201);
    assert!(dynamic_urls(&registration, "dynamic-1").await.is_empty());
}

#[tokio::test]
async fn preload_supersedes_network_fetch() {
    let network = StubNetwork::serving(&["/", "/404.html"]);
    let registration = registered(&network, generation(1, &["/", "/404.html"], "/404.html", 50)).await;
    let before = network.calls();

    let preload = PreloadResponse::ready(Ok(Response::new(200, "preloaded")));
    let served = registration
        .fetch(FetchEvent::new(Request::navigate(url("/home.html"))).with_preload(preload))
        .await
        .unwrap();

    assert_eq!(served.source, ResponseSource::Preload);
    assert_eq!(served.response.text(), "preloaded");
    assert_eq!(network.calls(), before);
    assert_eq!(dynamic_urls(&registration, "dynamic-1").await, vec![url("/home.html").to_string()]);
}

#[tokio::test]
async fn failed_preload_falls_back() {
    let network = StubNetwork::serving(&["/", "/404.html"]);
    let registration = registered(&network, generation(1, &["/", "/404.html"], "/404.html", 50)).await;

    let preload = PreloadResponse::ready(Err(NetworkError::Offline));
    let served = registration
        .fetch(FetchEvent::new(Request::navigate(url("/search"))).with_preload(preload))
        .await
        .unwrap();

    assert_eq!(served.source, ResponseSource::Fallback);
}

#[tokio::test]
async fn static_shadows_dynamic() {
    let network = StubNetwork::serving(&["/", "/404.html"]);
    let registration = registered(&network, generation(1, &["/", "/404.html"], "/404.html", 50)).await;
    let runtime = registration.db().open_partition("dynamic-1").await.unwrap();
    runtime
        .put(&Request::get(url("/")), &Response::new(200, "stale copy"))
        .await
        .unwrap();

    let served = registration.fetch(FetchEvent::new(Request::get(url("/")))).await.unwrap();

    assert_eq!(served.response.text(), "body of /");
}

#[tokio::test]
async fn activation_deletes_other_generations() {
    let network = StubNetwork::serving(&["/", "/404.html"]);
    let db = CacheDb::open_in_memory().await.unwrap();
    for name in ["static-v0", "dynamic-0", "fonts-legacy"] {
        db.open_partition(name).await.unwrap();
    }
    let registration = Registration::new(db, network.clone());

    registration
        .register(generation(1, &["/", "/404.html"], "/404.html", 50))
        .await
        .unwrap();

    let names = registration.db().partition_names().await.unwrap();
    assert!(names.iter().all(|n| n == "static-v1" || n == "dynamic-1"), "left over: {names:?}");
}

#[tokio::test]
async fn failed_install_keeps_previous_generation() {
    let network = StubNetwork::serving(&["/", "/404.html", "/css/app.css"]);
    let registration = registered(&network, generation(1, &["/", "/404.html"], "/404.html", 50)).await;
    network.fail("/css/app.css");

    let result = registration
        .register(generation(2, &["/", "/404.html", "/css/app.css"], "/404.html", 50))
        .await;

    assert!(matches!(result, Err(Error::ProvisionFailed(_))));
    assert!(!registration.db().has_partition("static-v2").await.unwrap());
    assert!(registration.db().has_partition("static-v1").await.unwrap());

    let active = registration.active().await.unwrap();
    assert_eq!(active.generation().static_cache, "static-v1");
    assert_eq!(active.state().await, WorkerState::Active);
}

#[tokio::test]
async fn error_status_in_manifest_fails_install() {
    let network = StubNetwork::serving(&["/", "/404.html"]);
    let db = CacheDb::open_in_memory().await.unwrap();
    let registration = Registration::new(db, network.clone());

    let result = registration
        .register(generation(1, &["/", "/404.html", "/js/app.js"], "/404.html", 50))
        .await;

    assert!(matches!(result, Err(Error::ProvisionFailed(msg)) if msg.contains("404")));
    assert!(registration.active().await.is_none());
    assert!(!registration.db().has_partition("static-v1").await.unwrap());
}

#[tokio::test]
async fn upgrade_retires_previous_worker() {
    let network = StubNetwork::serving(&["/", "/404.html", "/feed"]);
    let registration = registered(&network, generation(1, &["/", "/404.html"], "/404.html", 50)).await;
    registration.fetch(FetchEvent::new(Request::get(url("/feed")))).await.unwrap();
    let old = registration.active().await.unwrap();

    let new = registration
        .register(generation(2, &["/", "/404.html"], "/404.html", 50))
        .await
        .unwrap();

    assert_eq!(old.state().await, WorkerState::Redundant);
    assert!(!old.controls_clients());
    assert!(new.controls_clients());
    assert_eq!(registration.db().partition_names().await.unwrap(), vec!["static-v2"]);
}

#[tokio::test]
async fn fetch_in_flight_across_upgrade_does_not_revive_old_partition() {
    let network = StubNetwork::serving(&["/", "/404.html", "/slow"]);
    network.hold("/slow");
    let registration = Arc::new(registered(&network, generation(1, &["/", "/404.html"], "/404.html", 50)).await);

    let in_flight = tokio::spawn({
        let registration = Arc::clone(&registration);
        async move { registration.fetch(FetchEvent::new(Request::get(url("/slow")))).await }
    });
    network.arrived.notified().await;

    registration
        .register(generation(2, &["/", "/404.html"], "/404.html", 50))
        .await
        .unwrap();
    assert_eq!(registration.db().partition_names().await.unwrap(), vec!["static-v2"]);

    network.release.notify_one();
    let served = in_flight.await.unwrap().unwrap();

    assert_eq!(served.source, ResponseSource::Network);
    assert_eq!(served.response.text(), "body of /slow");
    assert_eq!(registration.db().partition_names().await.unwrap(), vec!["static-v2"]);
}

#[tokio::test]
async fn lifecycle_rejects_out_of_order_signals() {
    let network = StubNetwork::serving(&["/", "/404.html"]);
    let db = CacheDb::open_in_memory().await.unwrap();
    let worker = ServiceWorker::new(generation(1, &["/", "/404.html"], "/404.html", 50), db, network.clone());

    assert!(matches!(worker.activate().await, Err(Error::InvalidState(_))));

    worker.install().await.unwrap();
    assert_eq!(worker.state().await, WorkerState::Waiting);
    assert!(worker.skip_waiting_requested());
    assert!(matches!(worker.install().await, Err(Error::InvalidState(_))));

    let report = worker.activate().await.unwrap();
    assert!(report.deleted.is_empty());
    assert_eq!(worker.state().await, WorkerState::Active);
}

#[tokio::test]
async fn waiting_worker_does_not_intercept() {
    let network = StubNetwork::serving(&["/", "/404.html"]);
    let db = CacheDb::open_in_memory().await.unwrap();
    let worker = ServiceWorker::new(generation(1, &["/", "/404.html"], "/404.html", 50), db, network.clone());
    worker.install().await.unwrap();

    let resolution = worker.handle_fetch(FetchEvent::new(Request::get(url("/")))).await.unwrap();

    assert!(matches!(resolution, cinecache_core::Resolution::Passthrough));
}

#[tokio::test]
async fn no_active_worker_goes_to_network() {
    let network = StubNetwork::serving(&["/"]);
    let registration = Registration::new(CacheDb::open_in_memory().await.unwrap(), network.clone());

    let served = registration.fetch(FetchEvent::new(Request::get(url("/")))).await.unwrap();

    assert_eq!(served.source, ResponseSource::Passthrough);
    assert!(registration.db().partition_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn messages_are_recognised() {
    let network = StubNetwork::serving(&["/", "/404.html"]);
    let registration = registered(&network, generation(1, &["/", "/404.html"], "/404.html", 50)).await;

    let message = registration.message(json!({"isOnline": true, "description": "back online"})).await;

    assert_eq!(message, WorkerMessage::ConnectionStatus { is_online: true, description: "back online".into() });
}
