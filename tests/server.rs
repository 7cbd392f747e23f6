use std::{net::SocketAddr, time::Duration};

use rusty_neopixel::prelude::*;
use smart_leds::RGB8;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::watch,
    time::{timeout, Instant},
};

const TICK: Duration = Duration::from_millis(5);

fn server_config() -> ServerConfig {
    ServerConfig {
        bind: "127.0.0.1".parse().unwrap(),
        port: 0,
        read_timeout_ms: 200,
        buffer_size: 1024,
        percent_decode: false,
    }
}

async fn start_server(control: SharedControl) -> SocketAddr {
    let config = server_config();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(Server::new(control, &config).serve(listener));
    addr
}

async fn request(addr: SocketAddr, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();
    let mut response = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("server never closed the connection")
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

fn control() -> SharedControl {
    SharedControl::new(ControlState::default(), Duration::from_millis(5))
}

#[tokio::test]
async fn test_update_then_status_page() {
    let addr = start_server(control()).await;

    let response = request(
        addr,
        b"GET /update?static_color=[10,20,30]&rainbow_enable=false HTTP/1.1\r\nHost: x\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{}", response);
    assert!(response.ends_with("Settings updated"));

    let page = request(addr, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert!(page.contains("Content-Type: text/html"));
    assert!(page.contains("Connection: close"));
    assert!(page.contains("10,20,30"));
    assert!(page.contains("#0a141e"));
}

#[tokio::test]
async fn test_post_json_update() {
    let control = control();
    let addr = start_server(control.clone()).await;

    let body = r#"{"brightness": 0.2, "rainbow_enable": false, "static_color": [1, 2, 3]}"#;
    let raw = format!(
        "POST /update HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let response = request(addr, raw.as_bytes()).await;
    assert!(response.ends_with("Settings updated"), "{}", response);

    let state = control.snapshot().await;
    assert_eq!(state.static_color, RGB8::new(1, 2, 3));
    assert_eq!(state.mode, AnimationMode::Static);
    assert_eq!(state.brightness, Brightness::from_level(51));
}

#[tokio::test]
async fn test_body_split_across_writes() {
    let control = control();
    let addr = start_server(control.clone()).await;

    let body = r#"{"static_color": [7, 8, 9]}"#;
    let head = format!("POST /update HTTP/1.1\r\nContent-Length: {}\r\n\r\n", body.len());

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(head.as_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    stream.write_all(body.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.ends_with("Settings updated"), "{}", response);
    assert_eq!(control.snapshot().await.static_color, RGB8::new(7, 8, 9));
}

#[tokio::test]
async fn test_bad_requests_do_not_stop_the_server() {
    let addr = start_server(control()).await;

    let response = request(addr, b"\xff\xfe\x00 garbage\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 400 Bad Request"), "{}", response);

    let response = request(addr, b"GET /missing HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{}", response);
    assert!(response.contains("Content-Type: text/html"));

    let response = request(addr, b"POST /missing HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found"), "{}", response);

    let response = request(addr, b"POST /update HTTP/1.1\r\n\r\n{\"brightness\": ").await;
    assert!(response.starts_with("HTTP/1.1 400"), "{}", response);

    let oversized = format!("GET /update?pad={} HTTP/1.1\r\n\r\n", "x".repeat(4096));
    let response = request(addr, oversized.as_bytes()).await;
    assert!(response.starts_with("HTTP/1.1 400"), "{}", response);

    let response = request(addr, b"GET / HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
}

#[tokio::test]
async fn test_silent_client_is_dropped() {
    let addr = start_server(control()).await;

    // Connects and never sends; the read timeout frees the handler
    let _silent = TcpStream::connect(addr).await.unwrap();

    let started = Instant::now();
    let response = request(addr, b"GET / HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_rapid_updates_while_animating() {
    let control = control();
    let driver = MemoryDriver::new(1);
    let frames = driver.frame_log();
    let (_, link) = watch::channel(Link::Failed);
    let actuator = Actuator::new(
        control.clone(),
        LightController::new(driver),
        MemoryDisplay::default(),
        link,
    );
    tokio::spawn(actuator.run());
    control
        .apply(&ControlUpdate {
            speed: Some(TICK),
            ..Default::default()
        })
        .await;

    let addr = start_server(control.clone()).await;
    let burst = Instant::now();
    let frames_before = frames.len();

    for i in 0..100 {
        let flag = if i % 2 == 0 { "true" } else { "false" };
        let raw = format!("GET /update?rainbow_enable={} HTTP/1.1\r\n\r\n", flag);

        let started = Instant::now();
        let response = request(addr, raw.as_bytes()).await;
        assert!(response.ends_with("Settings updated"), "{}", response);
        assert!(
            started.elapsed() < TICK * 10,
            "request {} took {:?}",
            i,
            started.elapsed()
        );
    }

    // The lights kept their cadence through the burst, within a factor of 4
    let ticks = burst.elapsed().as_millis() / (TICK * 4).as_millis();
    let drawn = frames.len() - frames_before;
    assert!(
        drawn as u128 >= ticks,
        "{} frames in {:?}",
        drawn,
        burst.elapsed()
    );

    // Half brightness bounds every channel of every frame
    let frames = frames.frames();
    assert!(!frames.is_empty());
    for frame in frames {
        for pixel in frame {
            assert!(pixel.r <= 128 && pixel.g <= 128 && pixel.b <= 128, "{:?}", pixel);
        }
    }
    assert_eq!(control.snapshot().await.mode, AnimationMode::Static);
}

#[tokio::test]
async fn test_association_failure_runs_lights_only() {
    let mut config = Config::default();
    config.network.mode = NetworkMode::Disabled;
    config.defaults.rainbow = false;
    config.defaults.speed_ms = 5;

    let driver = MemoryDriver::new(1);
    let frames = driver.frame_log();
    let display = MemoryDisplay::default();

    let running = rusty_neopixel::launch(&config, LightController::new(driver), display.clone())
        .await
        .unwrap();
    assert!(running.address.is_none());
    assert!(running.local_addr.is_none());
    assert!(running.server.is_none());

    tokio::time::sleep(Duration::from_millis(100)).await;

    // (128, 128, 128) at half brightness
    assert_eq!(frames.last(), Some(vec![RGB8::new(64, 64, 64)]));
    let screen = display.last().unwrap();
    assert_eq!(screen[0], ASSOCIATION_FAILED);
    assert_eq!(screen[3], "Mode: Static");

    running.actuator.abort();
}

#[tokio::test]
async fn test_lights_run_while_association_retries() {
    let mut config = Config::default();
    config.network.mode = NetworkMode::Probe;
    config.network.probe_target = "not an address".to_string();
    config.network.attempts = 3;
    config.network.retry_delay_ms = 100;
    config.defaults.speed_ms = 5;

    let driver = MemoryDriver::new(1);
    let frames = driver.frame_log();
    let display = MemoryDisplay::default();

    let started = Instant::now();
    let running = rusty_neopixel::launch(&config, LightController::new(driver), display.clone())
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(running.address.is_none());

    // About 200ms of retries at 5ms a frame
    assert!(frames.len() >= 5, "only {} frames", frames.len());
    let screens = display.screens();
    assert_eq!(screens[0][0], CONNECTING);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(display.last().unwrap()[0], ASSOCIATION_FAILED);

    running.actuator.abort();
}

#[tokio::test]
async fn test_launch_serves_after_association() {
    let mut config = Config::default();
    config.network.mode = NetworkMode::Static("127.0.0.1".parse().unwrap());
    config.server = server_config();

    let running = rusty_neopixel::launch(&config, LightController::new(MemoryDriver::new(1)), MemoryDisplay::default())
        .await
        .unwrap();
    let addr = running.local_addr.unwrap();

    let response = request(addr, b"GET /off HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(running.control.snapshot().await.static_color, RGB8::new(0, 0, 0));

    running.actuator.abort();
    if let Some(server) = running.server {
        server.abort();
    }
}
