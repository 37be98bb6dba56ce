use std::{env, path::Path, sync::Arc};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use euro_assets::{ErrorReporter, OutboundAttachment, PosthogReporter};
use euro_client::{SyncClient, spawn_endpoint_follower};
use euro_endpoint::{EndpointManager, TokenSource};
use euro_settings::{SettingsWithDiskSync, SyncSettings};
use euro_storage::{AlwaysGranted, PlatformCapabilities};
use futures::future::join_all;
use tracing::{debug, error};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt,
};

const USAGE: &str = "usage: euro-sync <command>

commands:
  conversations [search]    list the first page of conversations
  messages <conversation>   print a conversation's full history
  download <conversation>   save every attachment of a conversation
  upload <path>...          upload files as one batch";

/// Bearer token handed in by whoever launched the tool.
struct EnvToken(String);

#[async_trait]
impl TokenSource for EnvToken {
    async fn access_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

async fn initialize_posthog() -> Result<(), posthog_rs::Error> {
    let posthog_key = option_env!("POSTHOG_API_KEY");
    if let Some(key) = posthog_key {
        return posthog_rs::init_global(key).await;
    }
    Err(posthog_rs::Error::Connection(
        "Posthog key not found".to_string(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy("euro_=debug,hyper=off,reqwest=warn");
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{USAGE}");
        return Ok(());
    };

    let settings = SettingsWithDiskSync::new(SyncSettings::default_config_dir()?)
        .context("loading settings")?;
    if let Err(e) = settings.watch_in_background() {
        error!("Settings will not reload: {}", e);
    }
    let current = settings.get();

    let mut endpoint = EndpointManager::new(&current.api.endpoint)?;
    if let Ok(token) = env::var("EURORA_ACCESS_TOKEN") {
        endpoint = endpoint.with_token_source(Arc::new(EnvToken(token)));
    }
    let endpoint = Arc::new(endpoint);
    spawn_endpoint_follower(settings.subscribe(), Arc::clone(&endpoint));

    let telemetry = current.telemetry.anonymous_errors
        && initialize_posthog()
            .await
            .map_err(|e| debug!("Posthog disabled: {}", e))
            .is_ok();
    let reporter: Arc<dyn ErrorReporter> = Arc::new(PosthogReporter::new(
        telemetry,
        current.telemetry.distinct_id.clone(),
    ));

    let client = SyncClient::connect(
        &endpoint,
        settings.subscribe(),
        PlatformCapabilities::detect(),
        Arc::new(AlwaysGranted),
        reporter,
    )?;

    match (command.as_str(), &args[1..]) {
        ("conversations", rest) => {
            client.set_search(rest.first().map(String::as_str));
            let page = client.fetch_next_conversation_page().await?;
            for conversation in &page.items {
                println!(
                    "{}\t{}",
                    conversation.id,
                    conversation.title.as_deref().unwrap_or("(untitled)")
                );
            }
            if page.has_more() {
                println!("...");
            }
        }
        ("messages", [conversation_id]) => {
            let history = load_history(&client, conversation_id).await?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        ("download", [conversation_id]) => {
            let history = load_history(&client, conversation_id).await?;
            let attachments: Vec<_> = history
                .iter()
                .flat_map(|message| message.attachments.iter())
                .collect();
            let outcomes = join_all(
                attachments
                    .iter()
                    .map(|attachment| client.download_attachment(attachment)),
            )
            .await;
            for (attachment, outcome) in attachments.iter().zip(outcomes) {
                match (outcome.local_path, outcome.error) {
                    (Some(path), _) => println!("{}\t{}", attachment.id, path.display()),
                    (None, error) => println!(
                        "{}\tfailed: {}",
                        attachment.id,
                        error.unwrap_or_default()
                    ),
                }
            }
        }
        ("upload", paths) if !paths.is_empty() => {
            let files = paths
                .iter()
                .map(|path| file_uri(Path::new(path)))
                .collect::<Result<Vec<_>>>()?;
            let outcome = client.upload_attachments(files).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.success {
                bail!(outcome.error_text.unwrap_or_default());
            }
        }
        _ => bail!("{USAGE}"),
    }

    Ok(())
}

async fn load_history(
    client: &SyncClient,
    conversation_id: &str,
) -> Result<Vec<euro_thread::Message>> {
    loop {
        let page = client.fetch_next_message_page(conversation_id).await?;
        if !page.has_more() {
            return Ok(page.items);
        }
    }
}

fn file_uri(path: &Path) -> Result<OutboundAttachment> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("resolving {}", path.display()))?;
    Ok(OutboundAttachment::from_uri(format!(
        "file://{}",
        absolute.display()
    )))
}
