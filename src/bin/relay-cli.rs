use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use serde_json::Value;

use dashboard_relay::sse::FrameDecoder;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Command-line client for the dashboard relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Dashboard secret, sent as the session cookie.
    #[arg(short, long, env = "RELAY_DASHBOARD_SECRET")]
    token: Option<String>,

    #[arg(long, default_value = "relay_session")]
    cookie_name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check relay liveness
    Health,
    /// List deployments
    Deployments,
    /// Show one deployment
    Deployment { id: String },
    /// List deployments of one service
    ServiceDeployments { project: String, service: String },
    /// List container inspections
    Containers,
    /// Show container state of one service on one host
    ServiceContainers {
        hostname: String,
        project: String,
        service: String,
    },
    /// Follow the relayed event stream
    Tail,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}={}", cli.cookie_name, token))?,
        );
    }

    let path = match &cli.command {
        Commands::Health => "/health".to_string(),
        Commands::Deployments => "/api/deployments".to_string(),
        Commands::Deployment { id } => format!("/api/deployments/{}", id),
        Commands::ServiceDeployments { project, service } => {
            format!("/api/deployments/{}/{}", project, service)
        }
        Commands::Containers => "/api/containers".to_string(),
        Commands::ServiceContainers {
            hostname,
            project,
            service,
        } => format!("/api/containers/{}/{}/{}", hostname, project, service),
        Commands::Tail => "/events".to_string(),
    };

    let res = client
        .get(format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;

    match cli.command {
        Commands::Health => {
            println!("{} {}", res.status(), res.text().await?);
        }
        Commands::Tail => tail(res).await?,
        _ => print_response(res).await?,
    }

    Ok(())
}

async fn tail(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if !res.status().is_success() {
        eprintln!("Error: relay returned status {}", res.status());
        return Ok(());
    }

    let mut decoder = FrameDecoder::new();
    let mut body = res.bytes_stream();
    while let Some(chunk) = body.next().await {
        for frame in decoder.feed(&chunk?) {
            println!("{}", frame.data);
        }
    }
    eprintln!("Stream closed");
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
