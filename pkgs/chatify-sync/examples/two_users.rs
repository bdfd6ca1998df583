use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chatify_store::MemoryBackend;
use chatify_sync::{ChatClient, Identity, SyncConfig};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional TOML file overriding the store layout and time label format
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Number of messages the first user sends
    #[arg(short, long, default_value = "3", value_parser = clap::value_parser!(u64).range(1..))]
    messages: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            SyncConfig::from_toml_str(&source)?
        }
        None => SyncConfig::default(),
    };

    let backend = Arc::new(MemoryBackend::new());
    let alice = ChatClient::new(backend.clone(), Identity::new("alice", "+100"), config.clone());
    let bob = ChatClient::new(backend.clone(), Identity::new("bob", "+200"), config);

    alice.profile().register("Alice").await;
    bob.profile().register("Bob").await;
    alice.start();
    bob.start();

    let mut directory = alice.directory().watch();
    directory
        .wait_for(|view| view.all.iter().any(|c| c.phone_number == "+200"))
        .await?;

    for n in 1..=args.messages {
        let body = format!("message {}", n);
        if alice.send_message("+200", &body).await.is_none() {
            eprintln!("✗ Bob is not in Alice's directory");
            return Ok(());
        }
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    println!("Bob's chats:");
    for chat in bob.chats().chats() {
        println!(
            "  {} [{}]: {}",
            chat.partner_name.as_deref().unwrap_or("?"),
            chat.last_message_time_label.as_deref().unwrap_or(""),
            chat.last_message.as_deref().unwrap_or("")
        );
    }

    let unseen = bob.unseen_count("alice");
    let mut counts = unseen.subscribe();
    let pending = *counts.wait_for(|count| *count > 0).await?;
    println!("Bob has {} unseen messages from Alice", pending);

    let thread = bob
        .open_thread("+100")
        .context("Alice is not in Bob's directory")?;
    counts.wait_for(|count| *count == 0).await?;
    println!("Bob opened the conversation; unseen is now {}", unseen.count());

    let mut sent = alice.messages().subscribe("bob");
    if let Some(messages) = sent.next().await {
        for message in messages {
            println!("  [{}] {}", message.status, message.body);
        }
    }

    thread.close();
    alice.shutdown();
    bob.shutdown();
    Ok(())
}
