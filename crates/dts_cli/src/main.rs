//! `dts` command-line front end.
//!
//! # Responsibility
//! - Expose catalog, document and admin bootstrap operations of `dts_core`.
//! - Print results as deterministic `key=value` lines.
//!
//! # Invariants
//! - Flags override `DTS_*` environment configuration.
//! - Every error exits with code 1 and its full cause chain on stderr.

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dts_core::service::user_service::DEFAULT_ADMIN_USERNAME;
use dts_core::{
    init_logging_from_config, open_db, AppConfig, CatalogService, CreateDocumentRequest, Document,
    DocumentListQuery, DocumentService, DocumentStatus, SqliteCatalogRepository,
    SqliteDocumentRepository, SqliteUserRepository, UserId, UserService,
};
use rusqlite::Connection;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "dts", about = "Document tracking system", version)]
struct Cli {
    /// SQLite database file (overrides DTS_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log level (overrides DTS_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Rolling log directory (overrides DTS_LOG_DIR)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check core linkage
    Ping,
    /// Create the default administrator if missing
    CreateAdmin {
        #[arg(long, default_value = DEFAULT_ADMIN_USERNAME)]
        username: String,
    },
    /// Document type operations
    Type {
        #[command(subcommand)]
        action: TypeAction,
    },
    /// Checkpoint template operations
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },
    /// Route operations
    Route {
        #[command(subcommand)]
        action: RouteAction,
    },
    /// Document operations
    Doc {
        #[command(subcommand)]
        action: DocAction,
    },
}

#[derive(Subcommand)]
enum TypeAction {
    /// Register a document type
    Add {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Username of the creator
        #[arg(long)]
        by: Option<String>,
    },
    /// List document types with their templates
    List {
        /// Include inactive types
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// Add a checkpoint template to a document type
    Add {
        /// Document type id
        document_type: Uuid,
        name: String,
        /// Position in the checkpoint sequence, starting at 1
        sequence_order: i64,
        #[arg(long, default_value = "")]
        description: String,
    },
}

#[derive(Subcommand)]
enum RouteAction {
    /// Register a route
    Add {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List routes
    List {
        /// Include inactive routes
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum DocAction {
    /// Create a document and allocate its tracking id
    Create {
        /// Document type id
        #[arg(long = "type")]
        document_type: Uuid,
        /// Route id
        #[arg(long)]
        route: Uuid,
        /// Document date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Exam date (YYYY-MM-DD)
        #[arg(long)]
        exam_date: Option<NaiveDate>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Username of the creator
        #[arg(long)]
        by: Option<String>,
    },
    /// Show one document and its checkpoints
    Show {
        /// Tracking id, e.g. DTS-20240115-0001
        tracking_id: String,
    },
    /// List documents, newest first
    List {
        /// pending | in_progress | finalized
        #[arg(long)]
        status: Option<String>,
        #[arg(long = "type")]
        document_type: Option<Uuid>,
        #[arg(long)]
        route: Option<Uuid>,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Only finalized (true) or open (false) documents
        #[arg(long)]
        finalized: Option<bool>,
        /// Substring of tracking id or notes
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Complete one checkpoint
    Complete {
        /// Checkpoint id
        checkpoint: Uuid,
        /// Username of the completer
        #[arg(long)]
        by: String,
        #[arg(long, default_value = "")]
        receiver: String,
        #[arg(long, default_value = "")]
        remarks: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::Ping = cli.command {
        println!("dts_core ping={}", dts_core::ping());
        println!("dts_core version={}", dts_core::core_version());
        return Ok(());
    }

    let config = resolve_config(&cli)?;
    init_logging_from_config(&config).map_err(|err| anyhow!(err))?;
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;

    match cli.command {
        Command::Ping => Ok(()),
        Command::CreateAdmin { username } => cmd_create_admin(&conn, &username),
        Command::Type { action } => cmd_type(&conn, action),
        Command::Template { action } => cmd_template(&conn, action),
        Command::Route { action } => cmd_route(&conn, action),
        Command::Doc { action } => cmd_doc(&conn, action),
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::from_env();
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    // The logger only accepts absolute directories.
    if let Some(dir) = config.log_dir.take() {
        let dir = if dir.is_absolute() {
            dir
        } else {
            std::env::current_dir()
                .context("failed to resolve current directory")?
                .join(dir)
        };
        config.log_dir = Some(dir);
    }
    Ok(config)
}

fn cmd_create_admin(conn: &Connection, username: &str) -> anyhow::Result<()> {
    let users = UserService::new(SqliteUserRepository::try_new(conn)?);
    let (admin, created) = users.ensure_admin(username)?;
    println!("user_id={}", admin.id);
    println!("username={}", admin.username);
    println!("created={created}");
    Ok(())
}

fn cmd_type(conn: &Connection, action: TypeAction) -> anyhow::Result<()> {
    let catalog = CatalogService::new(SqliteCatalogRepository::try_new(conn)?);
    match action {
        TypeAction::Add {
            name,
            description,
            by,
        } => {
            let creator = by.map(|username| resolve_user(conn, &username)).transpose()?;
            let created = catalog.create_document_type(&name, &description, creator)?;
            println!("document_type_id={}", created.id);
            println!("name={}", created.name);
        }
        TypeAction::List { all } => {
            for document_type in catalog.list_document_types(all)? {
                println!(
                    "document_type_id={} name={} active={}",
                    document_type.id, document_type.name, document_type.is_active
                );
                for template in catalog.list_checkpoint_templates(document_type.id)? {
                    println!(
                        "  template_id={} sequence_order={} name={}",
                        template.id, template.sequence_order, template.name
                    );
                }
            }
        }
    }
    Ok(())
}

fn cmd_template(conn: &Connection, action: TemplateAction) -> anyhow::Result<()> {
    let catalog = CatalogService::new(SqliteCatalogRepository::try_new(conn)?);
    match action {
        TemplateAction::Add {
            document_type,
            name,
            sequence_order,
            description,
        } => {
            let template = catalog.add_checkpoint_template(
                document_type,
                &name,
                sequence_order,
                &description,
            )?;
            println!("template_id={}", template.id);
            println!("sequence_order={}", template.sequence_order);
        }
    }
    Ok(())
}

fn cmd_route(conn: &Connection, action: RouteAction) -> anyhow::Result<()> {
    let catalog = CatalogService::new(SqliteCatalogRepository::try_new(conn)?);
    match action {
        RouteAction::Add { name, description } => {
            let route = catalog.create_route(&name, &description)?;
            println!("route_id={}", route.id);
            println!("name={}", route.name);
        }
        RouteAction::List { all } => {
            for route in catalog.list_routes(all)? {
                println!(
                    "route_id={} name={} active={}",
                    route.id, route.name, route.is_active
                );
            }
        }
    }
    Ok(())
}

fn cmd_doc(conn: &Connection, action: DocAction) -> anyhow::Result<()> {
    let documents = DocumentService::new(SqliteDocumentRepository::try_new(conn)?);
    match action {
        DocAction::Create {
            document_type,
            route,
            date,
            exam_date,
            location,
            notes,
            by,
        } => {
            let mut request = CreateDocumentRequest::new(document_type, route, date);
            request.exam_date = exam_date;
            request.current_location = location;
            request.notes = notes;
            request.created_by = by.map(|username| resolve_user(conn, &username)).transpose()?;
            let document = documents.create_document(&request)?;
            print_document(&document, documents.completion_percentage(&document));
        }
        DocAction::Show { tracking_id } => {
            let document = documents
                .get_document_by_tracking_id(&tracking_id)?
                .ok_or_else(|| anyhow!("document not found: {tracking_id}"))?;
            print_document(&document, documents.completion_percentage(&document));
        }
        DocAction::List {
            status,
            document_type,
            route,
            date,
            finalized,
            search,
            limit,
            offset,
        } => {
            let status = status
                .map(|value| {
                    DocumentStatus::parse(&value)
                        .ok_or_else(|| anyhow!("unknown document status `{value}`"))
                })
                .transpose()?;
            let query = DocumentListQuery {
                status,
                document_type_id: document_type,
                route_id: route,
                is_finalized: finalized,
                document_date: date,
                search,
                limit,
                offset,
            };
            for document in documents.list_documents(&query)? {
                println!(
                    "tracking_id={} status={} progress={} document_date={}",
                    document.tracking_id,
                    document.status.as_str(),
                    documents.completion_percentage(&document),
                    document.document_date
                );
            }
        }
        DocAction::Complete {
            checkpoint,
            by,
            receiver,
            remarks,
        } => {
            let completer = resolve_user(conn, &by)?;
            let document =
                documents.complete_checkpoint(checkpoint, completer, &receiver, &remarks)?;
            print_document(&document, documents.completion_percentage(&document));
        }
    }
    Ok(())
}

fn resolve_user(conn: &Connection, username: &str) -> anyhow::Result<UserId> {
    let users = UserService::new(SqliteUserRepository::try_new(conn)?);
    let user = users
        .get_user_by_username(username)?
        .ok_or_else(|| anyhow!("user not found: {username}"))?;
    Ok(user.id)
}

fn print_document(document: &Document, progress: u8) {
    println!("document_id={}", document.id);
    println!("tracking_id={}", document.tracking_id);
    println!("status={}", document.status.as_str());
    println!("is_finalized={}", document.is_finalized);
    println!("progress={progress}");
    println!("document_date={}", document.document_date);
    if let Some(exam_date) = document.exam_date {
        println!("exam_date={exam_date}");
    }
    for checkpoint in &document.checkpoints {
        println!(
            "checkpoint id={} sequence_order={} completed={} name={}",
            checkpoint.id, checkpoint.sequence_order, checkpoint.is_completed, checkpoint.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, DocAction};
    use clap::Parser;

    #[test]
    fn doc_list_accepts_finalized_filter() {
        let cli = Cli::try_parse_from(["dts", "doc", "list", "--finalized", "true"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Doc {
                action: DocAction::List {
                    finalized: Some(true),
                    ..
                }
            }
        ));

        let cli = Cli::try_parse_from(["dts", "doc", "list", "--finalized", "false"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Doc {
                action: DocAction::List {
                    finalized: Some(false),
                    ..
                }
            }
        ));
    }

    #[test]
    fn doc_list_without_finalized_filter_lists_everything() {
        let cli = Cli::try_parse_from(["dts", "doc", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Doc {
                action: DocAction::List {
                    finalized: None,
                    offset: 0,
                    ..
                }
            }
        ));
    }

    #[test]
    fn doc_list_rejects_non_boolean_finalized() {
        assert!(Cli::try_parse_from(["dts", "doc", "list", "--finalized", "maybe"]).is_err());
    }
}
