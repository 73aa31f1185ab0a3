use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the query gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// List backends
    Backends {
        /// Only active backends
        #[arg(long)]
        active: bool,
    },
    /// Put a backend back into rotation
    Activate { name: String },
    /// Take a backend out of rotation
    Deactivate { name: String },
    /// Register a new backend
    AddBackend {
        name: String,
        /// Base URL, e.g. http://presto-1:8080
        address: String,
        #[arg(long, default_value = "adhoc")]
        group: String,
        #[arg(long)]
        inactive: bool,
    },
    /// Replace an existing backend's address, group and state
    UpdateBackend {
        name: String,
        address: String,
        #[arg(long, default_value = "adhoc")]
        group: String,
        #[arg(long)]
        inactive: bool,
    },
    /// Remove a backend
    DeleteBackend { name: String },
    /// List routing groups
    Groups,
    /// Add a routing group
    AddGroup {
        name: String,
        #[arg(long)]
        paused: bool,
    },
    /// Delete a routing group
    DeleteGroup { name: String },
    /// Pause a routing group
    Pause { name: String },
    /// Resume a routing group
    Resume { name: String },
    /// Show which backend a request would be routed to
    Route {
        /// Routing group; adhoc when omitted
        #[arg(long)]
        group: Option<String>,
        /// Existing query id
        #[arg(long, conflicts_with = "group")]
        query: Option<String>,
    },
    /// Show per-group queue lengths
    Queues,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = format!("{}/gateway", cli.url.trim_end_matches('/'));

    let request = match cli.command {
        Commands::Status => client.get(base),
        Commands::Backends { active } => {
            let which = if active { "active" } else { "all" };
            client.get(format!("{base}/backend/{which}"))
        }
        Commands::Activate { name } => client.post(format!("{base}/backend/activate/{name}")),
        Commands::Deactivate { name } => client.post(format!("{base}/backend/deactivate/{name}")),
        Commands::AddBackend {
            name,
            address,
            group,
            inactive,
        } => client
            .post(format!("{base}/backend/modify/add"))
            .json(&backend_body(name, address, group, inactive)),
        Commands::UpdateBackend {
            name,
            address,
            group,
            inactive,
        } => client
            .post(format!("{base}/backend/modify/update"))
            .json(&backend_body(name, address, group, inactive)),
        Commands::DeleteBackend { name } => {
            client.post(format!("{base}/backend/modify/delete")).body(name)
        }
        Commands::Groups => client.get(format!("{base}/routingGroups")),
        Commands::AddGroup { name, paused } => client
            .post(format!("{base}/routingGroups"))
            .json(&json!({ "name": name, "active": !paused })),
        Commands::DeleteGroup { name } => client.delete(format!("{base}/routingGroups/{name}")),
        Commands::Pause { name } => {
            client.post(format!("{base}/routingGroups/pauseRoutingGroup/{name}"))
        }
        Commands::Resume { name } => {
            client.post(format!("{base}/routingGroups/resumeRoutingGroup/{name}"))
        }
        Commands::Route { group, query } => match (group, query) {
            (_, Some(id)) => client.get(format!("{base}/route/query/{id}")),
            (Some(group), None) => client.get(format!("{base}/route/group/{group}")),
            (None, None) => client.get(format!("{base}/route/adhoc")),
        },
        Commands::Queues => client.get(format!("{base}/queueLengths")),
    };

    print_response(request.send().await?).await
}

fn backend_body(name: String, address: String, group: String, inactive: bool) -> Value {
    json!({
        "name": name,
        "proxyTo": address,
        "routingGroup": group,
        "active": !inactive,
    })
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
