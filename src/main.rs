//! Form-driven prediction CLI
//!
//! Collects form input from JSON pages and `--set` assignments, encodes it
//! the way the selected model was trained, and prints the model's verdict.

use clap::{Parser, Subcommand};
use formcast::{Config, Result};

#[derive(Parser)]
#[command(name = "formcast")]
#[command(about = "Predictions from pre-trained tabular models", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// List built-in profiles
    Profiles,
    /// Show a profile's form fields and feature columns
    Schema {
        /// Built-in profile name or path to a profile TOML file
        profile: String,
    },
    /// Encode form input and print the feature vector the model receives
    Encode {
        /// Built-in profile name or path to a profile TOML file
        profile: String,
        #[command(flatten)]
        input: InputArgs,
        /// Output format
        #[arg(long)]
        format: Option<OutputFormat>,
    },
    /// Predict from form input
    Predict {
        /// Built-in profile name or path to a profile TOML file
        profile: String,
        #[command(flatten)]
        input: InputArgs,
        /// Output format
        #[arg(long)]
        format: Option<OutputFormat>,
    },
    /// Evaluate a named bucket rule
    Bucket {
        /// Rule name
        rule: String,
        /// Value to bucket
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Form page as a JSON object (repeatable, later pages override)
    #[arg(short, long = "input")]
    inputs: Vec<String>,
    /// Field assignment field=value (repeatable)
    #[arg(long = "set")]
    sets: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Profiles => commands::profiles(),
        Commands::Schema { profile } => commands::schema(&config, &profile),
        Commands::Encode {
            profile,
            input,
            format,
        } => commands::encode(&config, &profile, &input, format),
        Commands::Predict {
            profile,
            input,
            format,
        } => commands::predict(&config, &profile, &input, format),
        Commands::Bucket { rule, value } => commands::bucket(&rule, value),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use formcast::features::BucketRule;
    use formcast::predict::format::{encoded_csv, format_outcome, outcome_csv, summarize};
    use formcast::predict::{FormSession, PredictionService};
    use formcast::profiles::{self, Profile};
    use formcast::{parse_assignment, FormcastError, RawInput};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.artifact_dir)?;
        for name in profiles::builtin_names() {
            std::fs::create_dir_all(std::path::Path::new(&config.data.artifact_dir).join(name))?;
        }
        println!("Created {}/ with one directory per profile", config.data.artifact_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Export each model's artifacts into its profile directory");
        println!("  3. Run 'formcast schema <profile>' to see the form fields");
        println!("  4. Run 'formcast predict <profile> --set field=value ...' to predict");

        Ok(())
    }

    pub fn profiles() -> Result<()> {
        println!("Built-in profiles");
        println!("───────────────────────────────");
        for name in profiles::builtin_names() {
            let profile = profiles::builtin(name)?;
            println!(
                "  {:<20} {:<15} {}",
                profile.name,
                profile.task.to_string(),
                profile.title
            );
        }
        Ok(())
    }

    pub fn schema(config: &Config, selector: &str) -> Result<()> {
        let (profile, base) = profiles::resolve(selector, config)?;

        println!("{} ({})", profile.title, profile.name);
        println!("───────────────────────────────");
        println!("  Task:       {}", profile.task);
        println!("  Artifacts:  {}", base.display());

        for page in pages(&profile) {
            println!("\n{}", page.title);
            for field in &page.fields {
                let Some(rule) = profile.fields.iter().find(|r| r.field() == field.as_str()) else {
                    continue;
                };
                println!("  {:<28} {}", field, rule.kind());
                for level in rule.levels().unwrap_or_default() {
                    let mut line = format!("      {}", level.value);
                    if !level.aliases.is_empty() {
                        line.push_str(&format!(" ({})", level.aliases.join(", ")));
                    }
                    if level.reference {
                        line.push_str(" [reference]");
                    }
                    println!("{}", line);
                }
            }
        }

        println!("\nFeature columns ({})", profile.schema.len());
        for (i, column) in profile.schema.columns().iter().enumerate() {
            println!("  {:>3}  {}", i, column);
        }
        Ok(())
    }

    pub fn encode(
        config: &Config,
        selector: &str,
        input: &InputArgs,
        format: Option<OutputFormat>,
    ) -> Result<()> {
        let (profile, base) = profiles::resolve(selector, config)?;
        let service = PredictionService::load(profile, &base)?;
        let raw = collect_input(&service, input)?;
        let vector = service.encode(&raw)?;

        match output_format(config, format)? {
            OutputFormat::Table => {
                println!("Encoded features");
                println!("───────────────────────────────");
                for (column, value) in vector.iter() {
                    println!("  {:<36} {}", column, value);
                }
            }
            OutputFormat::Json => {
                let map: serde_json::Map<String, serde_json::Value> = vector
                    .iter()
                    .map(|(column, value)| (column.to_string(), serde_json::json!(value)))
                    .collect();
                println!("{}", to_json(&map)?);
            }
            OutputFormat::Csv => print!("{}", encoded_csv(&vector)?),
        }
        Ok(())
    }

    pub fn predict(
        config: &Config,
        selector: &str,
        input: &InputArgs,
        format: Option<OutputFormat>,
    ) -> Result<()> {
        let (profile, base) = profiles::resolve(selector, config)?;
        let service = PredictionService::load(profile, &base)?;
        let raw = collect_input(&service, input)?;
        let outcome = service.predict(&raw)?;

        let profile = service.profile();
        let labels = profile.labels();
        let output = &config.output;

        match output_format(config, format)? {
            OutputFormat::Table => {
                print!("{}", format_outcome(&profile.title, &outcome, &labels, output));
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "profile": profile.name,
                    "outcome": outcome,
                    "summary": summarize(&outcome, &labels, output),
                });
                println!("{}", to_json(&json)?);
            }
            OutputFormat::Csv => {
                print!("{}", outcome_csv(&profile.name, &outcome, &labels, output)?);
            }
        }
        Ok(())
    }

    pub fn bucket(rule: &str, value: f64) -> Result<()> {
        let bucket_rule = BucketRule::builtin(rule).ok_or_else(|| {
            FormcastError::Config(format!(
                "Unknown bucket rule: {}. Available: {}",
                rule,
                BucketRule::builtin_names().join(", ")
            ))
        })?;
        let label = bucket_rule.bucketize(value).ok_or_else(|| FormcastError::InvalidValue {
            field: rule.to_string(),
            message: "cannot bucket NaN".to_string(),
        })?;
        println!("{}", label);
        Ok(())
    }

    /// Pages declared by the profile, or a single page holding every field
    fn pages(profile: &Profile) -> Vec<profiles::FormPage> {
        if !profile.pages.is_empty() {
            return profile.pages.clone();
        }
        vec![profiles::FormPage {
            title: "Fields".to_string(),
            fields: profile.fields.iter().map(|r| r.field().to_string()).collect(),
        }]
    }

    /// Merge JSON pages then `--set` assignments into one complete input
    fn collect_input(service: &PredictionService, args: &InputArgs) -> Result<RawInput> {
        let mut session = FormSession::new(service.encoder());

        for path in &args.inputs {
            let content = std::fs::read_to_string(path)?;
            let page: RawInput = serde_json::from_str(&content)
                .map_err(|e| FormcastError::Parse(format!("{}: {}", path, e)))?;
            session.submit(page);
        }

        if !args.sets.is_empty() {
            let page = args
                .sets
                .iter()
                .map(|s| parse_assignment(s))
                .collect::<Result<RawInput>>()?;
            session.submit(page);
        }

        let missing = session.missing_fields();
        if !missing.is_empty() {
            log::warn!("Form incomplete, missing: {}", missing.join(", "));
        }
        session.finish()
    }

    fn output_format(config: &Config, format: Option<OutputFormat>) -> Result<OutputFormat> {
        match format {
            Some(f) => Ok(f),
            None => config.output.format.parse().map_err(FormcastError::Config),
        }
    }

    fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
        serde_json::to_string_pretty(value).map_err(|e| FormcastError::Parse(e.to_string()))
    }
}
