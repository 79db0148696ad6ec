//! File scan example demonstrating streaming scans and pre-checks.
//!
//! This example shows how to:
//! - Stream files to the engine in fixed-size blocks
//! - See missing and blocklisted files rejected before any engine call
//! - Bound a scan with a deadline from async code
//!
//! Run with: cargo run --example file_scan

use scanbroker::backends::{MockEngine, EICAR};
use scanbroker::prelude::*;

use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Scanbroker File Scan Example ===\n");

    let dir = tempfile::tempdir()?;
    let clean = dir.path().join("report.txt");
    let infected = dir.path().join("payload.bin");
    let blocked = dir.path().join("installer.exe");
    let missing = dir.path().join("missing.txt");

    std::fs::write(&clean, "quarterly numbers\n".repeat(10_000))?;
    let mut payload = vec![0u8; 300 * 1024];
    payload.extend_from_slice(EICAR.as_bytes());
    std::fs::write(&infected, payload)?;
    std::fs::write(&blocked, b"MZ")?;

    let config = ScanConfig::new()
        .with_block_size(64 * 1024)
        .with_blocked_extension("exe");
    let client = ScanClient::new(Arc::new(MockEngine::new()), config)?;

    let mut session = client.open_session()?;
    for path in [&clean, &infected, &blocked, &missing] {
        let result = session.scan_file(path);
        println!(
            "{:<16} {:<18} {} bytes",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("?"),
            result.verdict.to_string(),
            result.context.content_length
        );
    }

    if let Some(engine) = client.detection_engine() {
        println!("\nDetection engine: {engine}");
    }

    println!("\nScanning with a deadline:");
    match client
        .scan_file_with_deadline(&infected, Duration::from_secs(5))
        .await
    {
        Ok(result) => println!("  {} in {:?}", result.verdict, result.duration),
        Err(e) => println!("  Scan failed: {e}"),
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
