mod db;
mod images;
mod parser;
mod settings;
mod source;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use settings::Settings;
use source::{PageSource, PdfSource, TextDumpSource};

#[derive(Parser)]
#[command(name = "qbank_ingest", about = "Turn exam-dump PDFs into a question bank")]
struct Cli {
    /// SQLite database (default: $QBANK_DB_PATH or study_app.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the source document into questions, then attach page images
    Ingest {
        /// PDF, or a form-feed separated .txt dump
        #[arg(short, long)]
        source: Option<PathBuf>,
        /// Directory for extracted question images
        #[arg(long)]
        images: Option<PathBuf>,
        /// Delete the existing database before ingesting
        #[arg(long)]
        fresh: bool,
        /// Skip the image association pass
        #[arg(long)]
        skip_images: bool,
    },
    /// Question and quarantine totals
    Stats,
    /// Questions table
    List {
        /// Filter by topic (e.g. "Topic 3")
        #[arg(short, long)]
        topic: Option<String>,
        /// Only questions whose answer could not be read
        #[arg(short, long)]
        unknown: bool,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
    },
    /// Quarantined segments awaiting manual repair
    Errors {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Print one question as JSON
    Show {
        /// Question number, e.g. 696
        number: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    let db_path = cli.db.clone().unwrap_or_else(|| settings.db_path.clone());

    let result = match cli.command {
        Commands::Ingest {
            source,
            images,
            fresh,
            skip_images,
        } => {
            let source_path = source.unwrap_or_else(|| settings.source.clone());
            let image_dir = images.unwrap_or_else(|| settings.image_dir.clone());
            run_ingest(&settings, &source_path, &db_path, &image_dir, fresh, skip_images)
        }
        Commands::Stats => {
            let conn = open_store(&db_path)?;
            let s = db::get_stats(&conn)?;
            println!("Questions:    {}", s.questions);
            println!("  standard:   {}", s.standard);
            println!("  drag/drop:  {}", s.drag_drop);
            println!("  simulation: {}", s.simulation);
            println!("With image:   {}", s.with_image);
            println!("Unknown ans:  {}", s.unknown_answer);
            println!("Quarantined:  {}", s.quarantined);

            let topics = db::topic_breakdown(&conn)?;
            if !topics.is_empty() {
                println!("\n--- Topics ---");
                for (topic, count) in topics {
                    println!("  {:<12} {:>5}", topic, count);
                }
            }
            Ok(())
        }
        Commands::List {
            topic,
            unknown,
            limit,
            offset,
        } => {
            let conn = open_store(&db_path)?;
            let (rows, total) = db::fetch_questions(&conn, topic.as_deref(), unknown, limit, offset)?;
            if rows.is_empty() {
                println!("No questions found.");
                return Ok(());
            }

            println!(
                "{:>6} | {:<10} | {:<10} | {:<8} | {:>3} | {:<48}",
                "#", "Topic", "Type", "Answer", "Img", "Question"
            );
            println!("{}", "-".repeat(100));
            for q in &rows {
                let img = if q.image_path.is_some() { "yes" } else { "-" };
                println!(
                    "{:>6} | {:<10} | {:<10} | {:<8} | {:>3} | {:<48}",
                    q.question_number,
                    truncate(&q.topic, 10),
                    q.question_type.as_str(),
                    truncate(&q.correct_answer, 8),
                    img,
                    truncate(&q.text.replace('\n', " "), 48),
                );
            }
            println!("\n{}-{} of {} questions", offset + 1, offset + rows.len(), total);
            Ok(())
        }
        Commands::Errors { limit } => {
            let conn = open_store(&db_path)?;
            let rows = db::fetch_parsing_errors(&conn, limit)?;
            if rows.is_empty() {
                println!("Quarantine is empty.");
                return Ok(());
            }
            for r in &rows {
                let page = r.source_page.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
                println!(
                    "#{:<5} page {:<4} {} | {}",
                    r.id,
                    page,
                    r.error_reason,
                    truncate(&r.raw_text.replace('\n', " "), 60)
                );
            }
            Ok(())
        }
        Commands::Show { number } => {
            let conn = open_store(&db_path)?;
            match db::fetch_question(&conn, &number)? {
                Some(q) => println!("{}", serde_json::to_string_pretty(&q)?),
                None => println!("No question {}.", number),
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open_store(db_path: &Path) -> Result<rusqlite::Connection> {
    let conn = db::connect(db_path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

fn run_ingest(
    settings: &Settings,
    source_path: &Path,
    db_path: &Path,
    image_dir: &Path,
    fresh: bool,
    skip_images: bool,
) -> Result<()> {
    // Open the document before touching the database: a bad source leaves it as is.
    let pdfium;
    let source: Box<dyn PageSource + '_> = if source::is_text_dump(source_path) {
        Box::new(TextDumpSource::open(source_path)?)
    } else {
        pdfium = source::bind_pdfium()?;
        Box::new(PdfSource::open(&pdfium, source_path)?)
    };
    info!(path = %source_path.display(), pages = source.page_count(), "opened source");

    if fresh {
        remove_database(db_path)?;
    }
    let conn = open_store(db_path)?;

    let tx = conn.unchecked_transaction()?;
    let t_parse = Instant::now();
    println!("Segmenting {} pages...", source.page_count());
    let report = parser::ingest(source.as_ref(), &*tx)?;
    println!("Parsed in {:.1}s", t_parse.elapsed().as_secs_f64());
    report.print();

    if skip_images {
        println!("Image pass skipped.");
    } else {
        println!("Extracting images into {}...", image_dir.display());
        let enrichment = images::associate_images(source.as_ref(), &*tx, image_dir, settings.anchor_region());
        enrichment.print();
    }
    tx.commit().context("Failed to commit ingest")?;
    Ok(())
}

fn remove_database(db_path: &Path) -> Result<()> {
    let mut paths = vec![db_path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut name = db_path.as_os_str().to_owned();
        name.push(suffix);
        paths.push(PathBuf::from(name));
    }
    for path in paths.iter().filter(|p| p.exists()) {
        std::fs::remove_file(path)
            .with_context(|| format!("Could not delete {} (is it open elsewhere?)", path.display()))?;
    }
    info!(path = %db_path.display(), "removed previous database");
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
