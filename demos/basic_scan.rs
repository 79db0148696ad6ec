//! Basic scan example demonstrating string and buffer scans.
//!
//! This example shows how to:
//! - Create a client over an engine context
//! - Open a session
//! - Scan strings and buffers and handle the verdicts
//! - Recover from a transient engine failure with retries
//!
//! Run with: cargo run --example basic_scan

use scanbroker::backends::{MockEngine, EICAR};
use scanbroker::core::{E_FAIL, RESULT_NOT_DETECTED};
use scanbroker::prelude::*;

use std::sync::Arc;
use std::time::Duration;

fn report(result: &ScanResult) {
    println!("  Content: {}", result.context.content_name);
    println!("  Length: {} bytes", result.context.content_length);
    if let Some(hash) = &result.context.content_hash {
        println!("  Hash: {hash}");
    }
    println!("  Attempts: {}", result.attempts);

    match result.verdict {
        Verdict::Clean | Verdict::NotDetected => println!("  ✅ {}", result.verdict),
        Verdict::Detected | Verdict::BlockedByAdmin | Verdict::Blocked => {
            println!("  ❌ {}", result.verdict)
        }
        Verdict::FileNotExists | Verdict::ApplicationError => {
            println!("  💥 {}", result.verdict);
            if let Some(message) = &result.message {
                println!("  Reason: {message}");
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Scanbroker Basic Scan Example ===\n");

    // The first buffer scan fails once, as a busy engine would.
    let engine = MockEngine::new()
        .with_name("basic-scan-example")
        .with_result(Err(NativeError::new("AmsiScanBuffer", E_FAIL, "engine busy")))
        .with_result(Ok(RESULT_NOT_DETECTED));

    let config = ScanConfig::new().with_retry(3, Duration::from_millis(100));
    let client = ScanClient::new(Arc::new(engine), config)?;
    let mut session = client.open_session()?;

    println!("Scanning a buffer (engine fails on the first attempt):");
    report(&session.scan_buffer(b"This is the content of a clean file.", "document.txt"));

    println!("\nScanning a script string:");
    report(&session.scan_string("Write-Host 'hello'", "script.ps1"));

    println!("\nScanning the EICAR test string:");
    report(&session.scan_string(EICAR, "eicar.txt"));

    session.close();

    println!("\n=== Example Complete ===");
    Ok(())
}
