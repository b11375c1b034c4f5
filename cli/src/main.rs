//! Backstage CLI
//!
//! Command line client for the artist team management API.

mod client;
mod messages;

use anyhow::Result;
use clap::{Parser, Subcommand};

use client::BackstageClient;
use messages::{InviteRequest, User};

#[derive(Parser)]
#[command(name = "backstage-cli")]
#[command(about = "Command line client for Backstage team management")]
struct Cli {
    /// Server base URL
    #[arg(short, long, default_value = "http://localhost:3000")]
    server: String,

    /// Bearer token from a previous login
    #[arg(short, long, env = "BACKSTAGE_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print a bearer token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Context to activate (artist, agent, team_member)
        #[arg(short, long)]
        context: Option<String>,
    },
    /// Show the current user, context and permissions
    Me,
    /// List available contexts
    Contexts,
    /// Switch the active context
    Switch { context: String },
    /// List assignable team roles
    Roles,
    /// List the current artist's team
    Members,
    /// Invite someone to the current artist's team
    Invite {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Role value as listed by `roles`
        #[arg(short, long)]
        role: String,
        #[arg(long)]
        custom_role: Option<String>,
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Accept an invitation token
    Accept { token: String },
    /// Decline an invitation token
    Decline { token: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backstage_cli=info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let client = BackstageClient::new(&cli.server, cli.token)?;

    match cli.command {
        Commands::Login {
            email,
            password,
            context,
        } => {
            let session = client.login(&email, &password, context.as_deref()).await?;
            print_user(&session.user);
            println!();
            println!("Token (expires {}):", session.expires_at);
            println!("{}", session.token);
        }
        Commands::Me => {
            print_user(&client.me().await?);
        }
        Commands::Contexts => {
            let contexts = client.contexts().await?;
            for context in &contexts.available_contexts {
                let marker = if contexts.current_context.as_deref() == Some(context.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{} {}", marker, context);
            }
            if contexts.available_contexts.is_empty() {
                println!("No contexts available");
            }
        }
        Commands::Switch { context } => {
            let user = client.switch_context(&context).await?;
            println!("Switched to {} context", context);
            print_user(&user);
        }
        Commands::Roles => {
            for role in client.roles().await?.roles {
                println!("{:<20} {}", role.value, role.label);
            }
        }
        Commands::Members => {
            let members = client.members().await?;
            println!("{} team member(s)", members.total_count);
            for m in members.team_members {
                let primary = if m.is_primary { " (primary)" } else { "" };
                println!("  {} <{}> {}{}  [{}]", m.name, m.email, m.role_display, primary, m.id);
            }
        }
        Commands::Invite {
            name,
            email,
            role,
            custom_role,
            message,
        } => {
            let sent = client
                .invite(&InviteRequest {
                    name: &name,
                    email: &email,
                    role: &role,
                    custom_role: custom_role.as_deref(),
                    message: message.as_deref(),
                })
                .await?;
            println!(
                "{}: {} <{}> as {} (expires {})",
                sent.message,
                sent.invitation.name,
                sent.invitation.email,
                sent.invitation.role_display,
                sent.invitation.expires_at
            );
        }
        Commands::Accept { token } => {
            let accepted = client.accept(&token).await?;
            println!(
                "{}: joined as {}",
                accepted.message, accepted.team_member.role_display
            );
        }
        Commands::Decline { token } => {
            println!("{}", client.decline(&token).await?.message);
        }
    }

    Ok(())
}

fn print_user(user: &User) {
    println!("{} <{}>", user.name, user.email);
    println!(
        "  context:     {}",
        user.current_context.as_deref().unwrap_or("none")
    );
    println!("  available:   {}", user.available_contexts.join(", "));
    if let Some(role) = &user.current_role {
        println!("  role:        {}", role);
    }
    if let Some(artist) = &user.artist {
        println!("  artist:      {}", artist.name);
    }
    let granted = user.permissions.granted();
    println!(
        "  permissions: {}",
        if granted.is_empty() {
            "none".to_string()
        } else {
            granted.join(", ")
        }
    );
}
