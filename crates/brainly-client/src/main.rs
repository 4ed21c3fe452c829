//! Brainly CLI
//!
//! Command-line front end for a Brainly server: account, dashboard and
//! shared-view operations.

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use brainly_client::view::{filter_by_type, share_hash, share_url, type_counts};
use brainly_client::{ApiClient, TokenStore};
use brainly_types::api::ContentItem;
use brainly_types::models::ContentType;

#[derive(Parser)]
#[command(name = "brainly")]
#[command(about = "Brainly - save and share links from the command line")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Server base URL
    #[arg(
        long,
        global = true,
        env = "BRAINLY_SERVER_URL",
        default_value = "http://localhost:3000"
    )]
    server: String,

    /// Origin used when printing share links (defaults to the server URL)
    #[arg(long, global = true, env = "BRAINLY_SHARE_ORIGIN")]
    share_origin: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        username: String,
        #[arg(long, env = "BRAINLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in and remember the session
    Signin {
        username: String,
        #[arg(long, env = "BRAINLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// List your saved content
    #[command(alias = "ls")]
    List {
        /// Only show one content type
        #[arg(long = "type", value_parser = parse_kind)]
        kind: Option<ContentType>,
    },
    /// Save a link
    Add {
        #[arg(long)]
        title: String,
        #[arg(long = "type", value_parser = parse_kind)]
        kind: ContentType,
        #[arg(long)]
        link: String,
    },
    /// Delete a saved item by id
    #[command(alias = "rm")]
    Delete { id: Uuid },
    /// Publish your collection and print the share link
    Share,
    /// Stop sharing your collection
    Unshare,
    /// Show someone's shared collection
    Shared {
        /// Share hash, or the full link printed by `brainly share`
        #[arg(value_name = "HASH_OR_LINK")]
        hash: String,
        #[arg(long = "type", value_parser = parse_kind)]
        kind: Option<ContentType>,
    },
}

fn parse_kind(s: &str) -> Result<ContentType, String> {
    s.parse::<ContentType>().map_err(|e| {
        let names: Vec<&str> = ContentType::ALL.iter().map(|t| t.as_str()).collect();
        format!("{} (expected one of {})", e, names.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let tokens = TokenStore::default_location()?;

    let mut client = ApiClient::new(&cli.server);
    if let Some(token) = tokens.load()? {
        client = client.with_token(token);
    }

    match cli.command {
        Commands::Signup { username, password } => {
            let message = client.signup(&username, &password).await?;
            println!("{}", message);
        }
        Commands::Signin { username, password } => {
            let token = client.signin(&username, &password).await?;
            tokens.save(&token)?;
            println!("Signed in as {}", username);
        }
        Commands::Logout => {
            tokens.clear()?;
            println!("Signed out");
        }
        Commands::List { kind } => {
            let items = client.list_content().await?;
            print_items(&items, kind, cli.json)?;
        }
        Commands::Add { title, kind, link } => {
            client.add_content(&title, kind, &link).await?;
            println!("Added {} \"{}\"", kind, title);
        }
        Commands::Delete { id } => {
            client.delete_content(id).await?;
            println!("Deleted {}", id);
        }
        Commands::Share => {
            let hash = client.enable_share().await?;
            let origin = cli.share_origin.as_deref().unwrap_or(client.base_url());
            println!("{}", share_url(origin, &hash));
        }
        Commands::Unshare => {
            client.disable_share().await?;
            println!("Sharing disabled");
        }
        Commands::Shared { hash, kind } => {
            let shared = client.shared_brain(share_hash(&hash)).await?;
            if !cli.json {
                println!("{}'s brain", shared.username);
            }
            print_items(&shared.content, kind, cli.json)?;
        }
    }

    Ok(())
}

fn print_items(items: &[ContentItem], kind: Option<ContentType>, json: bool) -> Result<()> {
    let shown = filter_by_type(items, kind);

    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    let counts: Vec<String> = type_counts(items)
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .map(|(t, n)| format!("{} {}", t, n))
        .collect();
    println!("{} items ({})", items.len(), counts.join(", "));

    if shown.is_empty() {
        match kind {
            Some(k) => println!("No contents found for {}", k),
            None => println!("No contents found"),
        }
        return Ok(());
    }

    for item in shown {
        println!(
            "{}  [{}]  {}\n    {}  ({})",
            item.id,
            item.kind,
            item.title,
            item.link,
            item.created_at.format("%d %b %Y")
        );
    }
    Ok(())
}
