use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing::debug;

use quote_app::app::App;
use quote_app::config::AppConfig;
use quote_app::logging;
use quote_app::pdf::{QuoteDocument, format_eur, format_percentage};
use quote_app::wizard::{ScriptOutcome, load_script};
use quote_core::calculations::{DiscountRate, FamilyDiscounts};
use quote_core::db::ProfileUpdate;
use quote_core::{BuilderEvent, LineKind, QuoteDetails, Role, SavedQuote, User};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Shower-tray quoting for sales agents.
///
/// Quotes are configured with builder scripts (JSON arrays of wizard events),
/// stored per account and exported as internal or customer PDF documents.
#[derive(Debug, Parser)]
#[command(name = "quoter", version)]
struct Cli {
    /// Configuration file. Defaults to `quoter.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep log records off the terminal.
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log filter for this run, e.g. `debug` or `quote_core=trace`.
    /// Overrides both `RUST_LOG` and `[logging] level`.
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the product lines and their options.
    Catalog,

    /// Manage accounts.
    #[command(subcommand)]
    User(UserCommand),

    /// Start a session.
    Login { email: String, password: String },

    /// End the current session.
    Logout,

    /// Show the logged-in account.
    Whoami,

    /// Update the logged-in account's document details.
    Profile {
        #[arg(long)]
        name: Option<String>,

        /// Company printed in document headers.
        #[arg(long)]
        commercial_name: Option<String>,

        /// Person signing the documents.
        #[arg(long)]
        prepared_by: Option<String>,
    },

    /// Work with saved quotes.
    #[command(subcommand)]
    Quote(QuoteCommand),
}

#[derive(Debug, Subcommand)]
enum UserCommand {
    /// Register a new account.
    Add {
        email: String,
        name: String,
        password: String,

        #[arg(long, value_enum, default_value_t = RoleArg::Agent)]
        role: RoleArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Agent,
    Privileged,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Agent => Role::Agent,
            RoleArg::Privileged => Role::Privileged,
        }
    }
}

#[derive(Debug, Subcommand)]
enum QuoteCommand {
    /// Build a quote from a script and save it.
    New {
        /// JSON array of builder events.
        #[arg(long)]
        script: PathBuf,

        #[arg(long)]
        customer: Option<String>,

        #[arg(long)]
        project: Option<String>,
    },

    /// List your quotes, newest first.
    List,

    /// Show the lines and totals of a quote.
    Show { id: String },

    /// Delete a quote.
    Delete { id: String },

    /// Mark a quote as ordered.
    Order { id: String },

    /// Save a copy of a quote, optionally changed by a script.
    Duplicate {
        id: String,

        #[arg(long)]
        script: Option<PathBuf>,
    },

    /// Export the internal document with one discount on the whole quote.
    Pdf {
        id: String,

        /// Percentage such as `10`, `7,5` or `12%`. Unreadable input means 0.
        #[arg(long, default_value = "0")]
        discount: String,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Export the customer document with per-family discounts.
    CustomerPdf {
        id: String,

        /// `FAMILY=PERCENT`, repeatable. Families not listed get 0%.
        #[arg(long = "family", value_parser = parse_family)]
        families: Vec<(String, Decimal)>,

        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_family(entry: &str) -> Result<(String, Decimal), String> {
    FamilyDiscounts::parse_entry(entry).map_err(|e| e.to_string())
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    logging::init_from_config(&config.logging, cli.quiet)?;
    if let Some(filter) = &cli.log_level {
        logging::set_log_level(filter)?;
    }
    debug!(?config, "configuration loaded");

    let app = App::open(config).await?;

    match cli.command {
        Command::Catalog => print_catalog(&app),
        Command::User(UserCommand::Add {
            email,
            name,
            password,
            role,
        }) => {
            let user = User {
                email,
                name,
                role: role.into(),
                commercial_name: None,
                prepared_by: None,
            };
            app.register_user(user, password).await?;
            println!("Account created.");
        }
        Command::Login { email, password } => {
            let user = app.sessions().login(&email, &password).await?;
            println!("Logged in as {} <{}>.", user.name, user.email);
        }
        Command::Logout => {
            app.sessions().logout().await?;
            println!("Logged out.");
        }
        Command::Whoami => match app.sessions().current_user().await? {
            Some(user) => print_user(&user),
            None => println!("Not logged in."),
        },
        Command::Profile {
            name,
            commercial_name,
            prepared_by,
        } => {
            let update = ProfileUpdate {
                name,
                commercial_name,
                prepared_by,
            };
            let user = app.sessions().update_profile(update).await?;
            print_user(&user);
        }
        Command::Quote(command) => run_quote_command(&app, command).await?,
    }

    Ok(())
}

async fn run_quote_command(
    app: &App,
    command: QuoteCommand,
) -> Result<()> {
    match command {
        QuoteCommand::New {
            script,
            customer,
            project,
        } => {
            let events = load_script(&script)?;
            let details = QuoteDetails {
                customer_name: customer,
                project_reference: project,
            };
            let (quote, outcome) = app.create_quote(events, details, Utc::now()).await?;
            report_outcome(&outcome);
            println!("Saved quote {} ({}).", quote.id, quote.quote_number());
        }
        QuoteCommand::List => {
            let quotes = app.list_quotes().await?;
            if quotes.is_empty() {
                println!("No saved quotes.");
            }
            for quote in &quotes {
                print_quote_row(quote);
            }
        }
        QuoteCommand::Show { id } => {
            let quote = app.get_quote(&id).await?;
            print_quote(app, &quote).await?;
        }
        QuoteCommand::Delete { id } => {
            app.delete_quote(&id).await?;
            println!("Deleted quote {}.", id);
        }
        QuoteCommand::Order { id } => {
            let quote = app.order_quote(&id, Utc::now()).await?;
            print_quote_row(&quote);
        }
        QuoteCommand::Duplicate { id, script } => {
            let events: Vec<BuilderEvent> = match script {
                Some(path) => load_script(&path)?,
                None => Vec::new(),
            };
            let (quote, outcome) = app.duplicate_quote(&id, events, Utc::now()).await?;
            report_outcome(&outcome);
            println!("Saved copy {} ({}).", quote.id, quote.quote_number());
        }
        QuoteCommand::Pdf {
            id,
            discount,
            output,
        } => {
            let document = app
                .internal_document(&id, DiscountRate::parse_lenient(&discount))
                .await?;
            write_document(app, &document, output)?;
        }
        QuoteCommand::CustomerPdf {
            id,
            families,
            output,
        } => {
            let discounts: FamilyDiscounts = families.into_iter().collect();
            let document = app.customer_document(&id, &discounts).await?;
            write_document(app, &document, output)?;
        }
    }

    Ok(())
}

fn write_document(
    app: &App,
    document: &QuoteDocument,
    output: Option<PathBuf>,
) -> Result<()> {
    let path = app.write_document(document, output.as_deref())?;
    println!("{} ({})", path.display(), format_eur(document.total_due()));
    Ok(())
}

// ─── output ──────────────────────────────────────────────────────────────────

fn print_catalog(app: &App) {
    for line in app.catalog().lines() {
        let kind = match line.kind {
            LineKind::Dimensioned => "dimensioned",
            LineKind::Countertop => "countertop",
            LineKind::Kit => "kits",
            LineKind::Custom => "made to order",
        };
        println!("{} - {} ({})", line.id, line.name, kind);

        if !line.widths.is_empty() {
            let widths: Vec<_> = line.widths.iter().map(u32::to_string).collect();
            let lengths: Vec<_> = line.lengths.iter().map(u32::to_string).collect();
            println!("  widths:  {}", widths.join(", "));
            println!("  lengths: {}", lengths.join(", "));
        }
        for model in &line.models {
            println!("  model  {:<16} {}", model.id, model.name);
        }
        for color in &line.colors {
            println!("  color  {:<16} {} {}", color.id, color.name, format_eur(color.price));
        }
        for extra in &line.extras {
            println!("  extra  {:<16} {} {}", extra.id, extra.name, format_eur(extra.price));
        }
        for kit in &line.kits {
            println!("  kit    {:<16} {} {}", kit.id, kit.name, format_eur(kit.price));
        }
    }
}

fn print_user(user: &User) {
    println!("{} <{}> ({})", user.name, user.email, user.role.as_str());
    println!("  issuer:      {}", user.issuer_name());
    if let Some(prepared_by) = &user.prepared_by {
        println!("  prepared by: {}", prepared_by);
    }
}

fn print_quote_row(quote: &SavedQuote) {
    let status = match quote.ordered_timestamp {
        Some(at) => format!("ordered {}", at.format("%d/%m/%Y")),
        None => "open".to_string(),
    };
    println!(
        "{}  {}  {:>3} u.  {:>14}  {:<10}  {}",
        quote.id,
        quote.timestamp.format("%d/%m/%Y %H:%M"),
        quote.total_units(),
        format_eur(quote.total_price),
        status,
        quote.customer_name.as_deref().unwrap_or("-"),
    );
}

async fn print_quote(
    app: &App,
    quote: &SavedQuote,
) -> Result<()> {
    let view = app.quote_view(quote).await?;

    print_quote_row(quote);
    if let Some(project) = &quote.project_reference {
        println!("Project: {}", project);
    }
    println!();
    for line in &view.lines {
        println!("{}", line.description);
        println!(
            "  {} x {}  = {}  -{}  -> {}",
            line.prices.quantity,
            format_eur(line.prices.unit_price),
            format_eur(line.prices.original),
            format_percentage(line.prices.discount_percentage),
            format_eur(line.prices.discounted),
        );
    }
    println!();
    println!("Total PVP       {:>14}", format_eur(view.totals.subtotal));
    if view.totals.has_discount() {
        println!("Descuento       {:>14}", format_eur(-view.totals.discount));
    }
    println!("Base imponible  {:>14}", format_eur(view.totals.taxable_base));
    println!("IVA             {:>14}", format_eur(view.totals.vat));
    println!("Total           {:>14}", format_eur(view.totals.total));
    Ok(())
}

fn report_outcome(outcome: &ScriptOutcome) {
    for blocked in &outcome.blocked {
        eprintln!("event {} blocked: {}", blocked.index, blocked.failure);
    }
    if outcome.contact_required {
        eprintln!("A made-to-order line was chosen; contact the sales office for it.");
    }
}
