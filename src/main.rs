use clap::{Args, Parser, Subcommand};
use hospital_directory::backend::HttpHospitalBackend;
use hospital_directory::config::AppConfig;
use hospital_directory::directory::{DirectoryQueryEngine, HospitalId, HospitalSummary};
use hospital_directory::error::AppError;
use hospital_directory::submission::{
    HospitalDraft, ImageFile, SubmissionWorkflow, ValidationRules, SPECIALITY_OPTIONS,
};
use hospital_directory::telemetry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "Hospital Directory",
    about = "Browse, search, and register hospitals against the directory API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List hospitals, optionally scoped to a city and narrowed by speciality
    List(ListArgs),
    /// Show the full record of one hospital
    Show {
        /// Hospital identifier
        id: String,
    },
    /// Register a new hospital: upload its image, then create the record
    Create(CreateArgs),
    /// Print the specialities offered by the registration form
    Specialities,
}

#[derive(Args, Debug, Default)]
struct ListArgs {
    /// City to search for; matching is done by the backend
    #[arg(long)]
    city: Option<String>,
    /// Case-insensitive speciality fragment applied to the fetched list
    #[arg(long)]
    speciality: Option<String>,
    /// Print the directory snapshot as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Default)]
struct CreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    city: String,
    /// Rating between 1 and 5
    #[arg(long)]
    rating: Option<f64>,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    doctors: Option<i64>,
    #[arg(long)]
    departments: Option<i64>,
    /// Speciality to offer; repeat for several
    #[arg(long = "speciality")]
    specialities: Vec<String>,
    /// Path to the hospital image
    #[arg(long)]
    image: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        debug!(error = %err, "command failed");
        eprintln!("error: {}", err.user_message());
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();

    if let Command::Specialities = cli.command {
        for speciality in SPECIALITY_OPTIONS {
            println!("{speciality}");
        }
        return Ok(());
    }

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    info!(?config.environment, api = %config.backend.base_url, "hospital directory client starting");

    let rules = ValidationRules::from(&config.submission);
    let backend = Arc::new(HttpHospitalBackend::new(config.backend)?);

    match cli.command {
        Command::List(args) => run_list(backend, args).await,
        Command::Show { id } => run_show(backend, HospitalId(id)).await,
        Command::Create(args) => run_create(backend, rules, args).await,
        Command::Specialities => Ok(()),
    }
}

async fn run_list(backend: Arc<HttpHospitalBackend>, args: ListArgs) -> Result<(), AppError> {
    let origin = backend.config().origin();
    let engine = DirectoryQueryEngine::new(backend);

    match args.city.as_deref() {
        Some(city) => engine.search_by_city(city).await?,
        None => engine.load_all().await?,
    };
    if let Some(speciality) = args.speciality.as_deref() {
        engine.apply_speciality_filter(speciality);
    }

    let snapshot = engine.snapshot();
    if args.json {
        let rendered = serde_json::to_string_pretty(&snapshot).map_err(std::io::Error::from)?;
        println!("{rendered}");
        return Ok(());
    }

    if snapshot.visible.is_empty() {
        println!("No hospitals found");
        return Ok(());
    }
    println!(
        "{} of {} hospitals",
        snapshot.visible.len(),
        snapshot.authoritative.len()
    );
    for hospital in &snapshot.visible {
        println!("{}", summary_line(hospital, &origin));
    }
    Ok(())
}

async fn run_show(backend: Arc<HttpHospitalBackend>, id: HospitalId) -> Result<(), AppError> {
    let origin = backend.config().origin();
    let engine = DirectoryQueryEngine::new(backend);
    let hospital = engine.hospital(&id).await?;

    println!("{}", summary_line(&hospital.summary, &origin));
    println!(
        "Doctors: {}  Departments: {}",
        hospital.summary.doctor_count, hospital.summary.department_count
    );
    if let Some(description) = hospital.description.as_deref() {
        println!("\n{description}");
    }
    if let Some(created_at) = hospital.created_at {
        println!("\nListed since {}", created_at.format("%Y-%m-%d"));
    }
    Ok(())
}

async fn run_create(
    backend: Arc<HttpHospitalBackend>,
    rules: ValidationRules,
    args: CreateArgs,
) -> Result<(), AppError> {
    let image = match args.image.as_deref() {
        Some(path) => Some(read_image(path).await?),
        None => None,
    };
    let draft = draft_from_args(args, image);

    let workflow = SubmissionWorkflow::new(backend, rules);
    let id = workflow.submit(&draft).await?;
    println!("Hospital created: {id}");
    Ok(())
}

async fn read_image(path: &Path) -> Result<ImageFile, AppError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(image_file(path, bytes))
}

fn image_file(path: &Path, bytes: Vec<u8>) -> ImageFile {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    ImageFile::new(file_name, content_type, bytes)
}

fn draft_from_args(args: CreateArgs, image: Option<ImageFile>) -> HospitalDraft {
    let mut draft = HospitalDraft::new();
    draft.name = args.name;
    draft.city = args.city;
    draft.rating = args.rating;
    draft.description = args.description;
    draft.number_of_doctors = args.doctors;
    draft.number_of_departments = args.departments;
    draft.image = image;
    for speciality in args.specialities {
        draft.select_speciality(speciality);
    }
    draft
}

fn summary_line(hospital: &HospitalSummary, origin: &str) -> String {
    format!(
        "- [{}] {} ({}) rating {:.1} | {} | {}",
        hospital.id,
        hospital.name,
        hospital.city,
        hospital.rating,
        hospital.specialities.join(", "),
        hospital.image_ref.resolve(origin)
    )
}
