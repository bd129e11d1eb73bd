//! ClimateVision - climate scenario visualization and EcoVoice reporting.
//!
//! This binary runs one step of a ClimateVision session per invocation:
//! - `serve`: the backend relay, object bucket, and report API
//! - `generate`: image effects and videos from a source photo
//! - `report` / `reports`: draft, submit, list, and export reports
//! - `config`: the local credential store

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use climatevision_app::cli::{
    Cli, Command, ConfigCommand, GenerateCommand, ReportArgs, ReportCommand, ReportsCommand,
    ServeArgs,
};
use climatevision_app::export::write_reports_csv;
use climatevision_core::credentials::{self, CredentialStore, FAL_API_KEY, GEMINI_API_KEY};
use climatevision_core::generation::{ImageGenerator, ImageRef, VideoClient, VideoJob, VideoMode};
use climatevision_core::media::MediaBlob;
use climatevision_core::notifications::NotificationCenter;
use climatevision_core::providers::GeminiImageProvider;
use climatevision_core::reports::ReportService;
use climatevision_core::scenario::{Category, GenerationResult};
use climatevision_core::session::{Completion, SessionContext};
use climatevision_server::{Server, ServerConfig};
use climatevision_storage::{Bucket, Database, DEFAULT_BUCKET};
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("org", "climatevision", "climatevision")
        .map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
fn init_logging(cli: &Cli) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if cli.debug { "debug" } else { &cli.log_level };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("climatevision={},warn", log_level)));

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("climatevision")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                // stdout carries command output, so the console layer writes to stderr.
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stderr))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::debug!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

fn open_database(path: Option<&Path>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => Database::with_path(path),
        None => Database::new(),
    }
    .context("Failed to open database")?;
    Ok(db)
}

/// Prints the session's notifications, oldest first.
fn print_notifications(center: &NotificationCenter) {
    for note in center.list().iter().rev() {
        println!("[{}] {}", note.kind.as_str(), note.message);
    }
    center.mark_all_read();
}

async fn serve(cli: &Cli, args: &ServeArgs) -> anyhow::Result<()> {
    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => Database::default_db_path()?,
    };

    let mut config = ServerConfig::with_db_path(db_path.to_string_lossy())
        .with_host(args.host.clone())
        .with_port(args.port)
        .with_public_base_url(cli.public_url.clone())
        .with_bucket(args.bucket.clone())
        .with_video_settings(args.video.settings());
    if let Some(model) = &args.fal_model {
        config = config.with_fal_model(model.clone());
    }

    let server = Server::new(config).await?;
    tracing::info!("Listening on {}", server.addr());
    server.run().await?;
    Ok(())
}

async fn generate(cli: &Cli, db: Database, command: &GenerateCommand) -> anyhow::Result<()> {
    let notifications = NotificationCenter::new().with_desktop_delivery(cli.notify);
    let session = SessionContext::with_notifications(Arc::new(db), notifications.clone());

    let result = match command {
        GenerateCommand::Image {
            image,
            description,
            category,
            output,
        } => {
            let photo = MediaBlob::from_path(image)?;
            let generator = ImageGenerator::new(GeminiImageProvider::new()?, session.credentials());
            let category = Category::from(*category);

            match session
                .generate_image(&generator, photo, description, category)
                .await
            {
                Ok(outcome) if outcome.completion == Completion::Applied => {
                    match session.download(description) {
                        Some((name, blob)) => {
                            std::fs::create_dir_all(output)?;
                            let path = output.join(name);
                            std::fs::write(&path, &blob.bytes)
                                .with_context(|| format!("Failed to write {:?}", path))?;
                            println!("Saved {}", path.display());
                        }
                        None => tracing::warn!("Generated result is not an image"),
                    }
                    Ok(())
                }
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            }
        }
        GenerateCommand::Video {
            image,
            prompt,
            relay_url,
            video,
        } => {
            let photo = MediaBlob::from_path(image)?;
            let credentials = session.credentials();
            let mode = VideoMode::resolve(credentials.as_ref(), relay_url.as_deref())?;
            tracing::info!(mode = mode.name(), "Video mode resolved");

            let client = VideoClient::new(mode);
            let job = VideoJob::new(ImageRef::Inline(photo), prompt.as_str())
                .with_settings(video.settings());

            session.generate_video(&client, &job).await.map(|outcome| {
                if let GenerationResult::Video(video) = outcome.result {
                    println!("Video: {}", video.url);
                    if let Some(source) = video.source_image_url {
                        println!("Source image: {}", source);
                    }
                }
            })
        }
    };

    print_notifications(session.notifications());
    session.reset();
    Ok(result?)
}

fn report(cli: &Cli, db: Database, command: &ReportCommand) -> anyhow::Result<()> {
    let notifications = NotificationCenter::new().with_desktop_delivery(cli.notify);
    let bucket = Bucket::new(db.clone(), DEFAULT_BUCKET, cli.public_url.clone());
    let service = ReportService::new(Arc::new(db), Arc::new(bucket), notifications.clone());

    let (args, submit): (&ReportArgs, bool) = match command {
        ReportCommand::Submit(args) => (args, true),
        ReportCommand::Draft(args) => (args, false),
    };

    let mut form = args.load_form(&service)?;
    if let Some(path) = &args.image {
        form.set_image(MediaBlob::from_path(path)?);
    }

    let result = if submit {
        service.submit(&mut form)
    } else {
        service.save_draft(&mut form)
    };

    print_notifications(&notifications);
    let id = result?;
    if submit {
        println!("Report #{} submitted", id);
    } else {
        println!("Draft #{} saved (continue with --draft-id {})", id, id);
    }
    Ok(())
}

fn reports(db: &Database, command: &ReportsCommand) -> anyhow::Result<()> {
    match command {
        ReportsCommand::List { limit } => {
            let reports = db.list_submitted_reports(*limit)?;
            if reports.is_empty() {
                println!("No submitted reports");
            }
            for r in reports {
                println!(
                    "#{} {} [{}] {} - {} ({})",
                    r.id,
                    r.created_at.format("%Y-%m-%d %H:%M"),
                    r.severity,
                    r.violation_type,
                    r.location,
                    r.reporter_name
                );
            }
        }
        ReportsCommand::Export { path, limit } => {
            let reports = db.list_submitted_reports(*limit)?;
            let written = write_reports_csv(path, &reports)?;
            println!("Exported {} reports to {}", written, path.display());
        }
    }
    Ok(())
}

fn config(db: &Database, command: &ConfigCommand) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Set { key, value } => {
            credentials::save(db, key.store_key(), value)?;
            println!("Saved {}", key.store_key());
        }
        ConfigCommand::Show => {
            for key in [GEMINI_API_KEY, FAL_API_KEY] {
                match CredentialStore::get(db, key)? {
                    Some(value) => println!("{} = {}", key, credentials::mask(&value)),
                    None => println!("{} = (not set)", key),
                }
            }
        }
        ConfigCommand::Clear { key } => {
            if CredentialStore::remove(db, key.store_key())? {
                println!("Cleared {}", key.store_key());
            } else {
                println!("{} was not set", key.store_key());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered log lines are flushed on exit.
    let _log_guard = init_logging(&cli);
    tracing::debug!("Args: {:?}", cli);

    match &cli.command {
        Command::Serve(args) => serve(&cli, args).await?,
        Command::Generate(command) => {
            let db = open_database(cli.db.as_deref())?;
            generate(&cli, db, command).await?;
        }
        Command::Report(command) => {
            let db = open_database(cli.db.as_deref())?;
            report(&cli, db, command)?;
        }
        Command::Reports(command) => reports(&open_database(cli.db.as_deref())?, command)?,
        Command::Config(command) => config(&open_database(cli.db.as_deref())?, command)?,
        Command::Suggestions { category } => {
            let category = Category::from(*category);
            println!("{}:", category.name());
            for suggestion in category.suggestions() {
                println!("  - {}", suggestion);
            }
        }
    }

    Ok(())
}
