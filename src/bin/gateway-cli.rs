use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Client and management CLI for the quota gateway", long_about = None)]
struct Cli {
    /// Gateway base URL.
    #[arg(short, long, default_value = "http://localhost:7000")]
    url: String,

    /// Bearer token (user token, or the admin key for admin commands).
    #[arg(short, long, env = "GATEWAY_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness check
    Ping,
    /// Register this machine and print the issued token
    Register,
    /// Add requests to the token's quota
    Recharge {
        #[arg(short, long)]
        amount: Option<i64>,
    },
    /// List protected items
    List,
    /// Create a protected item
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Replace a protected item
    Update {
        id: u64,
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a protected item
    Delete { id: u64 },
    /// Admin: system status
    Status,
    /// Admin: live/exhausted identity counts
    Identities,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
    }

    let (method, path, body) = match cli.command {
        Commands::Ping => (Method::GET, "/ping".to_string(), None),
        Commands::Register => (Method::POST, "/register".to_string(), None),
        Commands::Recharge { amount } => (
            Method::POST,
            "/recharge".to_string(),
            Some(amount.map_or_else(|| json!({}), |a| json!({ "amount": a }))),
        ),
        Commands::List => (Method::GET, "/items".to_string(), None),
        Commands::Create { name, description } => (
            Method::POST,
            "/items".to_string(),
            Some(json!({ "name": name, "description": description })),
        ),
        Commands::Update {
            id,
            name,
            description,
        } => (
            Method::PUT,
            format!("/items/{id}"),
            Some(json!({ "name": name, "description": description })),
        ),
        Commands::Delete { id } => (Method::DELETE, format!("/items/{id}"), None),
        Commands::Status => (Method::GET, "/admin/status".to_string(), None),
        Commands::Identities => (Method::GET, "/admin/identities".to_string(), None),
    };

    let mut request = client
        .request(method, format!("{}{}", cli.url, path))
        .headers(headers);
    if let Some(body) = body {
        request = request.json(&body);
    }

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{rendered}");
    } else {
        eprintln!("Error: gateway returned status {status}");
        eprintln!("{rendered}");
    }
    Ok(())
}
