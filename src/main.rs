//! `docchat`: interactive terminal front end for the document-chat API.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use dotenvy::dotenv;
use mimalloc::MiMalloc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use docchat_client::api::types::{DocumentId, NewUser};
use docchat_client::config::{AppConfig, Cli};
use docchat_client::transport::ProgressFn;
use docchat_client::views::{
    ChatView, ConversationsPanel, DocumentsPanel, StatisticsPanel, SummaryHandler,
};
use docchat_client::{AppEvent, EventName, NoticeLevel, SessionStatus, Subscription, Workspace};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const HELP: &str = "\
Commands:
  login <username> <password>       log in
  register <user> <email> <password> <full name...>
  me                                show the signed-in profile
  passwd <old> <new>                change password
  logout                            log out
  docs                              list your documents
  upload <path>                     upload a pdf, docx or txt file and wait for processing
  status <document-id>              show processing status
  delete-doc <document-id>          delete a document and its conversations
  summary <document-id>             summarize a document
  chats                             list conversations
  new <document-id> [title...]      start a conversation and open it
  open <conversation-id>            open a conversation
  ask <question...>                 ask about the open conversation's document
  rename <conversation-id> <title...>
  delete-chat <conversation-id>
  stats                             usage statistics
  help                              this text
  quit                              exit";

struct Shell {
    workspace: Workspace,
    conversations: ConversationsPanel,
    documents: DocumentsPanel,
    statistics: StatisticsPanel,
    chat: ChatView,
    _summaries: SummaryHandler,
    _listeners: Vec<Subscription>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let cli = Cli::parse();
    let config = AppConfig::load_from_cli(&cli).context("Configuration error")?;
    docchat_client::telemetry::init(&config.log);

    info!(
        name: "client.config.loaded",
        base_url = %config.api.base_url,
        "Client configuration loaded"
    );

    let workspace = Workspace::from_config(config)?;
    let shell = Shell::new(workspace);
    shell.spawn_watchers();

    if let (Some(username), Some(password)) = (&cli.username, &cli.password) {
        let _ = shell.workspace.login(username, password).await;
    }

    println!("docchat: type 'help' for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        if let Err(err) = shell.run(line).await {
            println!("error: {err:#}");
        }
    }

    info!(name: "client.exit", "Bye");
    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

impl Shell {
    fn new(workspace: Workspace) -> Self {
        let bus = workspace.bus();
        let listeners = vec![
            bus.subscribe(EventName::SummarySuccess, |event| {
                if let AppEvent::SummarySuccess(summary) = event {
                    println!(
                        "\n── Summary of {} ({} chunks, {:.1}s{}) ──\n{}\n",
                        summary.document_title,
                        summary.metrics.chunk_count,
                        summary.metrics.processing_time_seconds,
                        if summary.metrics.cached { ", cached" } else { "" },
                        summary.summary
                    );
                }
            }),
            bus.subscribe(EventName::SummaryError, |event| {
                if let AppEvent::SummaryError { document_id, message } = event {
                    println!("\nSummary of document {document_id} failed: {message}");
                }
            }),
        ];

        Self {
            conversations: workspace.conversations_panel(),
            documents: workspace.documents_panel(),
            statistics: workspace.statistics_panel(),
            chat: workspace.chat_view(),
            _summaries: workspace.summary_handler(),
            _listeners: listeners,
            workspace,
        }
    }

    /// Print notices and react to forced logout.
    fn spawn_watchers(&self) {
        let mut notices = self.workspace.notices();
        tokio::spawn(async move {
            while let Ok(notice) = notices.recv().await {
                let tag = match notice.level {
                    NoticeLevel::Info => "info",
                    NoticeLevel::Success => "ok",
                    NoticeLevel::Warning => "warning",
                    NoticeLevel::Error => "error",
                };
                let retry = if notice.retryable { " (retry?)" } else { "" };
                println!("[{tag}] {notice}{retry}");
            }
        });

        let mut status = self.workspace.tokens().watch_status();
        let chat = self.chat.clone();
        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                if *status.borrow_and_update() == SessionStatus::Expired {
                    chat.reset();
                    println!("\nSession expired. Please log in again.");
                }
            }
        });
    }

    async fn run(&self, line: &str) -> anyhow::Result<()> {
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();
        let ws = &self.workspace;

        match command {
            "help" => println!("{HELP}"),
            "login" => {
                let [username, password] = args[..] else {
                    bail!("usage: login <username> <password>");
                };
                let _ = ws.login(username, password).await;
            }
            "register" => {
                if args.len() < 4 {
                    bail!("usage: register <user> <email> <password> <full name...>");
                }
                let user = NewUser {
                    username: args[0].to_string(),
                    email: args[1].to_string(),
                    password: args[2].to_string(),
                    full_name: args[3..].join(" "),
                };
                let _ = ws.register(&user).await;
            }
            "me" => {
                let user = ws.api().auth().me().await?;
                println!(
                    "{} <{}> {}",
                    user.username,
                    user.email.unwrap_or_default(),
                    user.full_name.unwrap_or_default()
                );
            }
            "passwd" => {
                let [old, new] = args[..] else {
                    bail!("usage: passwd <old> <new>");
                };
                let _ = ws.change_password(old, new).await;
            }
            "logout" => {
                self.chat.reset();
                ws.logout();
            }
            "docs" => self.print_documents().await,
            "upload" => {
                if rest.is_empty() {
                    bail!("usage: upload <path>");
                }
                let progress: ProgressFn = Arc::new(|pct| {
                    eprint!("\rUploading... {pct:>3}%");
                    if pct == 100 {
                        eprintln!();
                    }
                });
                if let Ok(status) = ws.upload_document(Path::new(rest), Some(progress)).await {
                    println!("{}: {} ({})", status.id, status.filename, status.status);
                }
            }
            "status" => {
                let status = ws.api().documents().status(parse_id(&args, 0)?).await?;
                let done = if status.processing_complete { "done" } else { "pending" };
                println!("{}: {} [{}] {}", status.id, status.filename, done, status.status);
            }
            "delete-doc" => {
                let _ = ws.delete_document(parse_id(&args, 0)?).await;
            }
            "summary" => {
                if ws.request_summary(parse_id(&args, 0)?) {
                    println!("Generating summary...");
                }
            }
            "chats" => self.print_conversations().await,
            "new" => {
                let document_id: DocumentId = parse_id(&args, 0)?;
                let title = rest.split_once(' ').map(|(_, t)| t.trim()).filter(|t| !t.is_empty());
                if let Ok(conversation) = ws.start_conversation(document_id, title).await {
                    self.chat.open(conversation.id).await?;
                    println!("Opened conversation {}", conversation.id);
                }
            }
            "open" => {
                self.chat.open(parse_id(&args, 0)?).await?;
                self.print_transcript();
            }
            "ask" => {
                if rest.is_empty() {
                    bail!("usage: ask <question...>");
                }
                if let Ok(answer) = self.chat.ask(rest).await {
                    println!("\n{}\n", answer.answer);
                    if !answer.sources.is_empty() {
                        println!("({} sources)", answer.sources.len());
                    }
                }
            }
            "rename" => {
                let id = parse_id(&args, 0)?;
                let title = rest.split_once(' ').map_or("", |(_, t)| t);
                let _ = ws.rename_conversation(id, title).await;
            }
            "delete-chat" => {
                let _ = ws.delete_conversation(parse_id(&args, 0)?).await;
            }
            "stats" => self.print_statistics().await,
            other => bail!("unknown command '{other}', try 'help'"),
        }
        Ok(())
    }

    async fn print_documents(&self) {
        self.documents.reload().await;
        if let Some(docs) = self.documents.data() {
            if docs.is_empty() {
                println!("No documents yet.");
            }
            for doc in docs {
                println!("{:>5}  {}", doc.id, doc.filename);
            }
        }
    }

    async fn print_conversations(&self) {
        self.conversations.reload().await;
        if let Some(conversations) = self.conversations.data() {
            if conversations.is_empty() {
                println!("No conversations yet.");
            }
            for conv in conversations {
                println!(
                    "{:>5}  {}  (document {})",
                    conv.id,
                    conv.display_title(),
                    conv.document_id
                );
            }
        }
    }

    async fn print_statistics(&self) {
        self.statistics.reload().await;
        let Some(stats) = self.statistics.data() else {
            return;
        };
        let user = &stats.user;
        println!("Documents:     {}", user.documents_count);
        println!("Conversations: {}", user.conversations_count);
        println!("Questions:     {}", user.questions_count);
        if let Some(ms) = user.avg_response_time_ms {
            println!("Avg response:  {ms:.0} ms");
        }
        if let Some(day) = &user.most_active_day {
            println!("Most active:   {day}");
        }
        if let Some(latest) = &stats.latest_conversation {
            println!("Latest chat:   {} ({})", latest.display_title(), latest.id);
        }
        if !stats.recommended.is_empty() {
            let names: Vec<&str> = stats.recommended.iter().map(|d| d.filename.as_str()).collect();
            println!("Recommended:   {}", names.join(", "));
        }
    }

    fn print_transcript(&self) {
        let state = self.chat.state();
        let Some(conversation) = state.conversation else {
            return;
        };
        println!("── {} ──", conversation.display_title());
        for message in &state.messages {
            println!("{:?}: {}", message.role, message.content);
        }
    }
}

fn parse_id(args: &[&str], index: usize) -> anyhow::Result<i64> {
    let raw = args.get(index).context("missing id")?;
    raw.parse().with_context(|| format!("'{raw}' is not a valid id"))
}
