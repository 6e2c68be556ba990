use clap::{Parser, Subcommand, ValueEnum};
use reqwest::Client;
use serde_json::{json, Value};
use std::error::Error;

#[derive(Parser)]
#[command(name = "signalroot-cli")]
#[command(about = "SignalRoot operations CLI", long_about = None)]
struct Cli {
    #[arg(short, long, env = "SIGNALROOT_ENDPOINT", default_value = "http://localhost:8080")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,

    /// Show idempotency store sizes
    Stats,

    /// Run the idempotency cleanup sweep now
    Cleanup,

    /// Get incident details
    Get {
        #[arg(value_name = "INCIDENT_ID")]
        id: String,
    },

    /// Send a sample webhook for a source
    SendTest {
        #[arg(short, long, value_enum)]
        source: Source,

        /// Organization key the webhook is addressed to
        #[arg(short, long, default_value = "acme-corp")]
        org: String,

        /// Upstream event id; also used as the delivery id
        #[arg(short = 'i', long, default_value = "test-001")]
        external_id: String,

        /// Service, alarm, repository or job name
        #[arg(short = 'n', long, default_value = "payment-service")]
        name: String,

        /// Severity (PagerDuty), alarm state (CloudWatch), or deploy status
        #[arg(short = 'S', long)]
        state: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    Pagerduty,
    Cloudwatch,
    Github,
    Jenkins,
}

impl Source {
    fn path(self) -> &'static str {
        match self {
            Source::Pagerduty => "pagerduty",
            Source::Cloudwatch => "cloudwatch",
            Source::Github => "github",
            Source::Jenkins => "jenkins",
        }
    }

    fn sample(self, external_id: &str, name: &str, state: Option<&str>) -> Value {
        let now = chrono::Utc::now().to_rfc3339();
        match self {
            Source::Pagerduty => json!({
                "type": "incident.triggered",
                "webhookId": external_id,
                "payload": {
                    "incident": {
                        "id": external_id,
                        "title": format!("{} error rate above threshold", name),
                        "status": "triggered",
                        "severity": state.unwrap_or("critical"),
                        "service": { "name": name },
                        "created_at": now,
                    }
                }
            }),
            Source::Cloudwatch => json!({
                "id": external_id,
                "detail-type": "CloudWatch Alarm State Change",
                "source": "aws.cloudwatch",
                "region": "us-east-1",
                "time": now,
                "detail": {
                    "alarmName": format!("{}-high-cpu", name),
                    "state": { "value": state.unwrap_or("ALARM"), "reason": "Threshold crossed" },
                }
            }),
            Source::Github => json!({
                "action": "created",
                "deployment": {
                    "id": external_id,
                    "sha": "a1b2c3d4",
                    "ref": "v1.0.0",
                    "environment": "production",
                    "created_at": now,
                },
                "deployment_status": { "state": state.unwrap_or("success") },
                "repository": { "name": name, "full_name": format!("acme/{}", name) },
            }),
            Source::Jenkins => json!({
                "name": name,
                "build": {
                    "number": external_id,
                    "status": state.unwrap_or("SUCCESS"),
                    "phase": "COMPLETED",
                    "timestamp": now,
                },
                "job": { "name": name },
            }),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let client = Client::new();

    let response = match cli.command {
        Commands::Health => client.get(format!("{}/health", cli.endpoint)).send().await?,

        Commands::Stats => {
            client
                .get(format!("{}/api/safety/stats", cli.endpoint))
                .send()
                .await?
        }

        Commands::Cleanup => {
            client
                .post(format!("{}/api/safety/cleanup", cli.endpoint))
                .send()
                .await?
        }

        Commands::Get { id } => {
            client
                .get(format!("{}/v1/incidents/{}", cli.endpoint, id))
                .send()
                .await?
        }

        Commands::SendTest {
            source,
            org,
            external_id,
            name,
            state,
        } => {
            client
                .post(format!("{}/inbound/{}/{}", cli.endpoint, source.path(), org))
                .json(&source.sample(&external_id, &name, state.as_deref()))
                .send()
                .await?
        }
    };

    let status = response.status();
    let body: Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);

    if !status.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
