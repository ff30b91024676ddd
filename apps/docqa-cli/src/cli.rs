use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use docqa_core::config::Config;
use docqa_pipeline::{Pipeline, QueryResponse, Session, SessionId};

#[derive(Parser)]
#[command(name = "docqa", version, about = "Ask questions about your PDF and text documents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Index every .pdf/.txt under a folder as permanent documents
    Ingest {
        /// Defaults to `documents.folder`
        folder: Option<PathBuf>,
    },
    /// Answer one question from the indexed documents
    Query {
        question: String,
        /// Also print the retrieved context
        #[arg(long)]
        show_context: bool,
    },
    /// Interactive question loop; type `exit` to quit
    Ask {
        /// Index the documents folder before starting
        #[arg(long)]
        index: bool,
    },
    /// List indexed documents
    List,
    /// Answer a question about a file without keeping it in the index
    Upload {
        file: PathBuf,
        #[arg(long, short)]
        question: String,
        #[arg(long)]
        show_context: bool,
    },
}

pub async fn execute(cli: Cli) -> Result<()> {
    let settings = Config::load()?.settings()?;
    let pipeline = Pipeline::initialize(settings).await?;
    match cli.command {
        Command::Ingest { folder } => ingest(&pipeline, folder).await,
        Command::Query { question, show_context } => {
            let response = with_spinner("Thinking...", pipeline.query(&question)).await?;
            print_response(&response, show_context);
            Ok(())
        }
        Command::Ask { index } => {
            if index { ingest(&pipeline, None).await?; }
            ask_loop(&pipeline).await
        }
        Command::List => list(&pipeline).await,
        Command::Upload { file, question, show_context } => upload(&pipeline, file, &question, show_context).await,
    }
}

async fn ingest(pipeline: &Pipeline, folder: Option<PathBuf>) -> Result<()> {
    let chunks = with_spinner("Indexing documents...", pipeline.ingest_folder(folder.as_deref())).await?;
    let total = pipeline.chunk_count().await?;
    println!("📊 Indexed {} new chunks ({} total)", chunks.len(), total);
    Ok(())
}

async fn list(pipeline: &Pipeline) -> Result<()> {
    let docs = pipeline.list_documents().await?;
    if docs.is_empty() {
        println!("No documents indexed yet. Run `docqa ingest` first.");
        return Ok(());
    }
    for doc in &docs {
        let kind = if doc.is_permanent { "permanent" } else { "temporary" };
        println!("  {:<10} {}  ({})", kind, doc.filename, doc.source_path);
    }
    println!("\n📊 {} documents, {} chunks", docs.len(), pipeline.chunk_count().await?);
    Ok(())
}

async fn upload(pipeline: &Pipeline, file: PathBuf, question: &str, show_context: bool) -> Result<()> {
    let bytes = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
    let filename = file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let mut session = Session::new(SessionId::generate());
    let result = async {
        pipeline.add_temporary_document(&mut session, &bytes, &filename).await?;
        with_spinner("Thinking...", pipeline.query(question)).await
    }
    .await;
    pipeline.cleanup_session(&mut session).await;
    print_response(&result?, show_context);
    Ok(())
}

async fn ask_loop(pipeline: &Pipeline) -> Result<()> {
    println!("💬 Ask a question about your documents (type 'exit' to quit)");
    let stdin = io::stdin();
    loop {
        print!("\n> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 { break; }
        let question = line.trim();
        if question.is_empty() { continue; }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") { break; }
        match with_spinner("Thinking...", pipeline.query(question)).await {
            Ok(response) => print_response(&response, false),
            Err(e) => eprintln!("❌ {}", e),
        }
    }
    println!("👋 Goodbye!");
    Ok(())
}

fn print_response(response: &QueryResponse, show_context: bool) {
    if show_context {
        println!("📝 Context:\n{}\n", response.context);
    }
    println!("{}", response.answer.trim());
}

async fn with_spinner<T, F: std::future::Future<Output = T>>(message: &str, fut: F) -> T {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    let out = fut.await;
    pb.finish_and_clear();
    out
}
