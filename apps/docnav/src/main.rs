mod headless;

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use doc_client::{
    link::PageWidget, load_settings, load_settings_from, model::DocModel, DocController, DocEvent,
    MemoryDocModel,
};
use shared::{
    action::{DocUserAction, SectionType},
    cursor::UrlState,
    domain::{DocPage, PageToken, SectionId},
};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::headless::{HeadlessViews, LoopbackChannel};

#[derive(Parser, Debug)]
#[command(about = "Drive a document controller against a JSON document fixture")]
struct Cli {
    /// Document fixture: tables, columns, views, sections and table data.
    #[arg(long)]
    doc: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a page token (view id, `code`, `acl`, `data`, `GristDocTour`) to the page shown.
    Page { token: String },
    /// Follow a document URL, including its `#a1.s<section>.r<row>.c<col>` anchor.
    Goto { url: String },
    /// List the links a new widget over a section's table could use.
    Links { section: i64 },
    /// Feed a JSON array of action broadcasts through the controller.
    Replay { actions: PathBuf },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings(),
    };
    let raw = fs::read_to_string(&cli.doc)
        .with_context(|| format!("failed to read document fixture '{}'", cli.doc.display()))?;
    let model = Arc::new(MemoryDocModel::from_json(&raw).context("invalid document fixture")?);
    info!(doc = %cli.doc.display(), "docnav: document loaded");

    let controller = DocController::new(
        Arc::new(LoopbackChannel::default()),
        model.clone(),
        Arc::new(HeadlessViews::default()),
        settings,
    );
    let mut events = BroadcastStream::new(controller.subscribe_events());
    let printer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                Ok(DocEvent::Error(err)) => println!("error {:?}: {}", err.code, err.message),
                Ok(DocEvent::ActiveViewChanged(page)) => {
                    let page = page.map_or_else(|| "-".to_string(), |p| p.to_token().to_string());
                    println!("page {page}");
                }
                Ok(_) => {}
                Err(err) => warn!(%err, "docnav: event stream lagged"),
            }
        }
    });

    let result = run(&controller, model.as_ref(), cli.command).await;
    // Dropping the last controller handle closes the event stream.
    drop(controller);
    let _ = printer.await;
    result
}

async fn run(controller: &DocController, model: &dyn DocModel, command: Command) -> Result<()> {
    match command {
        Command::Page { token } => {
            let page =
                PageToken::parse(&token).ok_or_else(|| anyhow!("invalid page token '{token}'"))?;
            controller.set_url(UrlState {
                doc_page: Some(page),
                ..UrlState::default()
            });
            let resolved = controller.refresh_active_view().await;
            match resolved {
                Some(page) => println!(
                    "active {} \"{}\"",
                    page.to_token(),
                    controller.current_page_name().await
                ),
                None => println!("active -"),
            }
        }
        Command::Goto { url } => {
            controller.set_url(UrlState::parse(&url)?);
            controller.handle_url_change().await;
            let pos = controller.get_cursor_pos().await;
            match (pos.section_id, pos.row_id) {
                (Some(section_id), Some(row_id)) => {
                    println!("at section={section_id} row={row_id}")
                }
                _ => println!("at -"),
            }
        }
        Command::Links { section } => {
            let section = model.section(SectionId(section)).await?;
            let table = model.table(section.table_ref).await?;
            controller.open_doc_page(DocPage::View(section.view_id)).await;
            let widget = PageWidget {
                table_ref: section.table_ref,
                section_type: SectionType::Record,
                summarize: table.is_summary(),
                group_by: Vec::new(),
                section_id: Some(section.section_id),
            };
            for option in controller.select_by(&widget).await? {
                println!("{:<12} {}", option.link.link_id(), option.label);
            }
        }
        Command::Replay { actions } => {
            let raw = fs::read_to_string(&actions)
                .with_context(|| format!("failed to read actions '{}'", actions.display()))?;
            let messages: Vec<DocUserAction> =
                serde_json::from_str(&raw).context("invalid action broadcasts")?;
            for message in messages {
                let action_num = message.data.action_group.action_num;
                if let Err(err) = controller.on_doc_user_action(message).await {
                    warn!(action_num = action_num.0, %err, "docnav: broadcast rejected");
                }
            }
            for entry in controller.action_log().await {
                println!("#{} {} ({})", entry.action_num, entry.desc, entry.user);
            }
            println!(
                "undo={} redo={} rows={}",
                controller.can_undo().await,
                controller.can_redo().await,
                controller
                    .row_count()
                    .await
                    .map_or_else(|| "-".to_string(), |count| count.to_string())
            );
        }
    }
    Ok(())
}
