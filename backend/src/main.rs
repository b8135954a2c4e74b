//! Memberreg CLI - validate, import and export membership CSV files
//!
//! # Commands
//!
//! ```bash
//! memberreg check members.csv             # Parse and validate, no submission
//! memberreg import members.csv            # Import every valid row in one batch
//! memberreg export                        # Write members_database_<date>.csv
//! memberreg template --samples            # Write members_template.csv
//! memberreg register --membership-number MEM001 --name ...
//! memberreg list --query downtown         # List / search members
//! memberreg serve                         # Start HTTP server (port 3000)
//! ```
//!
//! Commands that reach the member store need `MEMBERREG_STORE_URL`.

use clap::{Args, Parser, Subcommand};
use memberreg::config::TEMPLATE_FILE_NAME;
use memberreg::export::{blank_template, export_file_name_today, render_members, sample_template};
use memberreg::import::success_message;
use memberreg::server::{start_server, AppState};
use memberreg::{
    filter_members, member_count_label, BulkImporter, Field, HttpStore, ImportOptions,
    MemberRecord, MemberStore, MembershipYear, RegisterError, RegisterForm, Settings,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "memberreg")]
#[command(about = "Membership registry CSV import and export", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a CSV file without importing it
    Check {
        /// Input CSV file
        input: PathBuf,

        /// Print every parsed row as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import the valid rows of a CSV file
    Import {
        /// Input CSV file
        input: PathBuf,

        /// Stop after the preview
        #[arg(long)]
        dry_run: bool,
    },

    /// Export every member to CSV
    Export {
        /// Output file, `-` for stdout (default: members_database_<date>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the CSV template
    Template {
        /// Output file, `-` for stdout (default: members_template.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include two example rows
        #[arg(long)]
        samples: bool,
    },

    /// Register a single member
    Register(RegisterArgs),

    /// List members
    List {
        /// Case-insensitive search text
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: MEMBERREG_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct RegisterArgs {
    #[arg(long)]
    membership_number: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    mobile_no: String,
    #[arg(long)]
    address: String,
    #[arg(long)]
    area: String,
    #[arg(long)]
    spouse_name: String,
    #[arg(long)]
    alternate_mobile: Option<String>,
    #[arg(long)]
    family_member_count: Option<String>,

    /// Active year, optionally with a receipt: `2024` or `2024:R-118`
    #[arg(long = "year")]
    years: Vec<String>,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match Settings::from_env() {
        Ok(settings) => run(cli.command, settings).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, settings: Settings) -> CliResult {
    match command {
        Commands::Check { input, json } => cmd_check(&input, json, &settings).await,
        Commands::Import { input, dry_run } => cmd_import(&input, dry_run, &settings).await,
        Commands::Export { output } => cmd_export(output.as_deref(), &settings).await,
        Commands::Template { output, samples } => cmd_template(output.as_deref(), samples),
        Commands::Register(args) => cmd_register(args, &settings).await,
        Commands::List { query } => cmd_list(query.as_deref(), &settings).await,
        Commands::Serve { port } => {
            let port = port.unwrap_or(settings.port);
            start_server(AppState::from_settings(settings), port).await?;
            Ok(())
        }
    }
}

fn store(settings: &Settings) -> Result<HttpStore, Box<dyn std::error::Error>> {
    Ok(HttpStore::from_url(settings.store_url.as_deref())?)
}

/// Load and print the preview. Shared by `check` and `import`.
async fn preview(input: &Path, settings: &Settings) -> Result<BulkImporter, Box<dyn std::error::Error>> {
    let mut importer = BulkImporter::new(ImportOptions::from(settings));
    let summary = importer.load_path(input).await?;

    eprintln!("\n📊 {}", input.display());
    eprintln!("   Rows:    {}", summary.total);
    eprintln!("   Valid:   {}", summary.valid);
    eprintln!("   Invalid: {}", summary.invalid);
    for row in importer.invalid_rows().take(10) {
        eprintln!("   ❌ Row {}: {}", row.row_index(), row.errors().join("; "));
    }
    if summary.invalid > 10 {
        eprintln!("   ... and {} more", summary.invalid - 10);
    }

    Ok(importer)
}

async fn cmd_check(input: &Path, json: bool, settings: &Settings) -> CliResult {
    let importer = preview(input, settings).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(importer.rows())?);
    }
    Ok(())
}

async fn cmd_import(input: &Path, dry_run: bool, settings: &Settings) -> CliResult {
    let mut importer = preview(input, settings).await?;
    if dry_run {
        eprintln!("\n🔍 Dry run, nothing submitted");
        return Ok(());
    }

    let store = store(settings)?;
    let count = importer.submit(&store).await?;
    eprintln!("\n✨ {}", success_message(count));
    Ok(())
}

async fn cmd_export(output: Option<&Path>, settings: &Settings) -> CliResult {
    let members = store(settings)?.list_all().await?;
    let records: Vec<MemberRecord> = members.into_iter().map(|member| member.record).collect();
    eprintln!("📦 Exporting {} members", records.len());

    let default_name = export_file_name_today();
    write_output(&render_members(&records), output.unwrap_or(Path::new(&default_name)))
}

fn cmd_template(output: Option<&Path>, samples: bool) -> CliResult {
    let content = if samples { sample_template() } else { blank_template() };
    write_output(&content, output.unwrap_or(Path::new(TEMPLATE_FILE_NAME)))
}

/// `2024`, `Prior to 2021:R-9`
fn parse_year_arg(arg: &str) -> Result<(MembershipYear, &str), String> {
    let (label, receipt) = arg.split_once(':').unwrap_or((arg, ""));
    MembershipYear::from_label(label.trim())
        .map(|year| (year, receipt.trim()))
        .ok_or_else(|| format!("Unknown membership year: '{}'", label.trim()))
}

async fn cmd_register(args: RegisterArgs, settings: &Settings) -> CliResult {
    let mut session = RegisterForm::new(settings.flag_policy);
    let form = session.form_mut();
    form.set(Field::MembershipNumber, &args.membership_number);
    form.set(Field::Name, &args.name);
    form.set(Field::MobileNo, &args.mobile_no);
    form.set(Field::Address, &args.address);
    form.set(Field::Area, &args.area);
    form.set(Field::SpouseName, &args.spouse_name);
    form.set(Field::AlternateMobile, args.alternate_mobile.as_deref().unwrap_or_default());
    form.set(Field::FamilyMemberCount, args.family_member_count.as_deref().unwrap_or_default());
    for arg in &args.years {
        let (year, receipt) = parse_year_arg(arg)?;
        form.set_year(year, true, receipt);
    }

    let store = store(settings)?;
    match session.submit(&store).await {
        Ok(id) => {
            eprintln!("✅ {}", session.state().message().unwrap_or_default());
            println!("{}", id);
            Ok(())
        }
        Err(RegisterError::Invalid(errors)) => {
            for (field, message) in &errors {
                eprintln!("   ❌ {}: {}", field.column(), message);
            }
            Err(RegisterError::Invalid(errors).into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn cmd_list(query: Option<&str>, settings: &Settings) -> CliResult {
    let members = store(settings)?.list_all().await?;
    let found = filter_members(&members, query.unwrap_or_default());

    eprintln!("📋 {}\n", member_count_label(found.len()));
    for member in found {
        let record = &member.record;
        let years: Vec<&str> = record.years.active_years().map(MembershipYear::label).collect();
        println!("  {}  {}", record.membership_number, record.name);
        println!("     {} | {} | {}", record.mobile_no, record.area, record.address);
        if !years.is_empty() {
            println!("     Years: {}", years.join(", "));
        }
    }
    Ok(())
}

fn write_output(content: &str, path: &Path) -> CliResult {
    if path == Path::new("-") {
        println!("{}", content);
    } else {
        fs::write(path, content)?;
        eprintln!("💾 Output written to: {}", path.display());
    }
    Ok(())
}
