use anyhow::Context;
use clap::Parser;
use sms_dispatch::adapters::health_client::HealthClient;
use sms_dispatch::utils::logger;
use sms_dispatch::DispatchError;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "health-check")]
#[command(about = "Check that a running sms-dispatch service is healthy")]
struct Args {
    /// Base URL of the service
    #[arg(short, long, default_value = "http://127.0.0.1:5000")]
    url: String,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "5")]
    timeout: u64,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let client = HealthClient::new(&args.url, Duration::from_secs(args.timeout))
        .with_context(|| format!("invalid service url '{}'", args.url))?;

    let report = match client.check().await {
        Ok(report) => report,
        Err(DispatchError::UnexpectedStatus { status, .. }) => {
            eprintln!("❌ {} answered /health with HTTP {}", args.url, status);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("❌ {} is unreachable: {}", args.url, e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Status: {}", report.status);
        println!(
            "Workers: {}/{} active, {} waiting",
            report.pool.active, report.pool.size, report.pool.waiting
        );
        println!("Tracked jobs: {}", report.tracked_jobs);
        println!("Uptime: {:.0}s", report.uptime_seconds);
        if let Some(process) = &report.process {
            println!(
                "Memory: {}MB (peak {}MB), CPU: {:.1}%",
                process.memory_usage_mb, process.peak_memory_mb, process.cpu_usage
            );
        }
    }

    if report.status != "healthy" {
        std::process::exit(2);
    }
    Ok(())
}
