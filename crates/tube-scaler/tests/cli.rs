// One-shot mode of the tube-scaler binary

use beanstalk_client::fake::FakeServer;
use tokio::process::Command;

#[tokio::test]
async fn test_once_prints_one_line_per_tube() {
    let server = FakeServer::start().await.unwrap();
    for i in 0..25 {
        server.put("emails", format!("mail {}", i).as_bytes());
    }
    server.put("reports", b"q3");

    let addr = server.addr();
    let (host, port) = addr.rsplit_once(':').unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_tube-scaler"))
        .env("RUST_LOG", "off")
        .env_remove("TUBE_SCALER__DEPLOYMENT_PREFIX")
        .env_remove("TUBE_SCALER__JOBS_PER_REPLICA")
        .args(["--host", host, "--port", port, "--once"])
        .output()
        .await
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "consumer-default\t0\t0",
            "consumer-emails\t25\t2",
            "consumer-reports\t1\t1",
        ]
    );
    assert_eq!(server.deleted(), Vec::<u64>::new());
}

#[tokio::test]
async fn test_unreachable_server_fails() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let output = Command::new(env!("CARGO_BIN_EXE_tube-scaler"))
        .args(["--host", "127.0.0.1", "--port", &port.to_string(), "--once"])
        .output()
        .await
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to connect"), "stderr: {}", stderr);
}
