//! `cardio` — heart-disease screening from the command line.
//!
//! Each field flag corresponds to one control of the intake form. Values
//! may also come from a JSON or YAML file; flags override the file.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use cardio_core::classifier::Classifier;
use cardio_core::record::{codes, CategoricalCode};
use cardio_core::{
    service_from_config, AppConfig, Field, FieldKind, PredictionError, RawInput, RawValue,
    RecordError, TreeEnsemble,
};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "cardio.yaml";

const EXIT_SUCCESS: u8 = 0;

/// Exit code for failures other than a rejected record.
const EXIT_FAILURE: u8 = 1;

/// Exit code for a rejected patient record.
const EXIT_INVALID_RECORD: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "cardio", version, about = "Heart-disease screening with a pre-trained classifier")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Classifier artifact (overrides model_path from the config)
    #[arg(long, global = true, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate patient values and predict
    Predict(PredictArgs),

    /// Load the classifier artifact and print a summary
    CheckModel,

    /// List the 13 input fields with their accepted values
    Fields,
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// JSON or YAML file with raw field values
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(flatten)]
    values: FieldArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

/// One optional flag per form control. Values are passed through as text
/// and typed by the record builder.
#[derive(Args, Debug, Default)]
struct FieldArgs {
    /// Age in years (25-80)
    #[arg(long)]
    age: Option<String>,

    /// Gender (1 = male; 0 = female)
    #[arg(long)]
    sex: Option<String>,

    /// Chest pain type (0-3)
    #[arg(long)]
    cp: Option<String>,

    /// Resting blood pressure in mm Hg (90-200)
    #[arg(long)]
    trestbps: Option<String>,

    /// Serum cholesterol in mg/dl (120-570)
    #[arg(long)]
    chol: Option<String>,

    /// Fasting blood sugar > 120 mg/dl (1 = true; 0 = false)
    #[arg(long)]
    fbs: Option<String>,

    /// Resting electrocardiographic results (0-2)
    #[arg(long)]
    restecg: Option<String>,

    /// Maximum heart rate achieved (70-200)
    #[arg(long)]
    thalach: Option<String>,

    /// Exercise induced angina (1 = yes; 0 = no)
    #[arg(long)]
    exang: Option<String>,

    /// ST depression induced by exercise relative to rest (0.0-7.0)
    #[arg(long, allow_hyphen_values = true)]
    oldpeak: Option<String>,

    /// Slope of the peak exercise ST segment (0-2)
    #[arg(long)]
    slope: Option<String>,

    /// Number of major vessels colored by fluoroscopy (0-4)
    #[arg(long)]
    ca: Option<String>,

    /// Thalassemia (1 = normal; 2 = fixed defect; 3 = reversible defect)
    #[arg(long)]
    thal: Option<String>,
}

impl FieldArgs {
    fn into_raw(self) -> RawInput {
        let pairs = [
            (Field::Age, self.age),
            (Field::Sex, self.sex),
            (Field::ChestPain, self.cp),
            (Field::RestingBloodPressure, self.trestbps),
            (Field::Cholesterol, self.chol),
            (Field::FastingBloodSugar, self.fbs),
            (Field::RestingEcg, self.restecg),
            (Field::MaxHeartRate, self.thalach),
            (Field::ExerciseAngina, self.exang),
            (Field::StDepression, self.oldpeak),
            (Field::Slope, self.slope),
            (Field::MajorVessels, self.ca),
            (Field::Thal, self.thal),
        ];

        let mut raw = RawInput::new();
        for (field, value) in pairs {
            if let Some(value) = value {
                raw.set(field, RawValue::Text(value));
            }
        }
        raw
    }
}

/// What a command produced: the exit status and the text for each stream.
#[derive(Debug, Default)]
struct Outcome {
    status: u8,
    stdout: String,
    stderr: String,
}

impl Outcome {
    fn success(stdout: String) -> Self {
        Self {
            status: EXIT_SUCCESS,
            stdout,
            stderr: String::new(),
        }
    }

    fn failure(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "Command failed");
        Self {
            status: EXIT_FAILURE,
            stdout: String::new(),
            stderr: format!("error: {:#}\n", err),
        }
    }

    fn emit(&self) -> ExitCode {
        print!("{}", self.stdout);
        eprint!("{}", self.stderr);
        ExitCode::from(self.status)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    run(cli).unwrap_or_else(Outcome::failure).emit()
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    // RUST_LOG wins over the verbosity flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<Outcome> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(model) = cli.model {
        config.model_path = model;
    }

    match cli.command {
        Command::Predict(args) => predict(&config, args),
        Command::CheckModel => check_model(&config).map(Outcome::success),
        Command::Fields => print_fields().map(Outcome::success),
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            AppConfig::from_yaml_file(DEFAULT_CONFIG_FILE)
                .with_context(|| format!("loading config {}", DEFAULT_CONFIG_FILE))
        }
        None => Ok(AppConfig::default()),
    }
}

fn predict(config: &AppConfig, args: PredictArgs) -> Result<Outcome> {
    let service = service_from_config(config)
        .with_context(|| format!("loading classifier {}", config.model_path.display()))?;

    let mut raw = match &args.input {
        Some(path) => RawInput::from_file(path)
            .with_context(|| format!("reading input {}", path.display()))?,
        None => RawInput::new(),
    };
    raw.merge(args.values.into_raw());

    match service.predict(&raw) {
        Ok(report) => {
            let stdout = match args.format {
                OutputFormat::Text => report.render_text(),
                OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&report)?),
            };
            Ok(Outcome::success(stdout))
        }
        Err(PredictionError::Record(err)) => invalid_record(&err, args.format),
        Err(err) => Err(err.into()),
    }
}

fn invalid_record(err: &RecordError, format: OutputFormat) -> Result<Outcome> {
    let mut outcome = Outcome {
        status: EXIT_INVALID_RECORD,
        ..Outcome::default()
    };

    match format {
        OutputFormat::Text => {
            outcome.stderr = format!("invalid patient record: {}\n", err);
        }
        OutputFormat::Json => {
            let kind = match err {
                RecordError::Validation { .. } => "validation",
                RecordError::Coercion { .. } => "coercion",
            };
            let body = serde_json::json!({
                "error": kind,
                "message": err.to_string(),
                "fields": err.fields(),
            });
            outcome.stdout = format!("{}\n", serde_json::to_string_pretty(&body)?);
        }
    }
    Ok(outcome)
}

fn check_model(config: &AppConfig) -> Result<String> {
    let model = TreeEnsemble::from_file(&config.model_path)
        .with_context(|| format!("loading classifier {}", config.model_path.display()))?;

    let mut out = String::new();
    writeln!(out, "artifact:  {}", config.model_path.display())?;
    writeln!(out, "name:      {}", model.name())?;
    if let Some(description) = model.description() {
        writeln!(out, "about:     {}", description)?;
    }
    writeln!(out, "version:   {}", model.version())?;
    writeln!(out, "trees:     {}", model.trees().len())?;
    writeln!(out, "nodes:     {}", model.node_count())?;
    writeln!(out, "threshold: {}", model.threshold())?;
    writeln!(out, "features:  {}", cardio_core::record::field_names().join(", "))?;
    Ok(out)
}

fn print_fields() -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{:<10} {:<12} {:<16} PROMPT", "FIELD", "KIND", "ACCEPTS")?;
    for field in Field::ALL {
        let accepts = match field.kind() {
            FieldKind::Numeric => field
                .range()
                .map(|r| format!("{}..={}", r.start(), r.end()))
                .unwrap_or_default(),
            FieldKind::Categorical => field
                .codes()
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join("|"),
        };
        writeln!(
            out,
            "{:<10} {:<12} {:<16} {}",
            field.name(),
            field.kind().to_string(),
            accepts,
            field.prompt()
        )?;
    }
    writeln!(out)?;
    writeln!(out, "sex codes: {}", code_labels::<codes::Sex>())?;
    writeln!(out, "cp codes: {}", code_labels::<codes::ChestPain>())?;
    writeln!(out, "restecg codes: {}", code_labels::<codes::RestingEcg>())?;
    writeln!(out, "slope codes: {}", code_labels::<codes::StSlope>())?;
    writeln!(out, "thal codes: {}", code_labels::<codes::Thalassemia>())?;
    Ok(out)
}

fn code_labels<T: CategoricalCode>() -> String {
    T::CODES
        .iter()
        .filter_map(|&code| T::from_code(code))
        .map(|value| format!("{} = {}", value.code(), value.label()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_predict_flags_parse() {
        let cli = Cli::try_parse_from([
            "cardio", "predict", "--age", "63", "--sex", "1", "--oldpeak", "2.3", "--format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Command::Predict(args) => {
                assert_eq!(args.format, OutputFormat::Json);
                let raw = args.values.into_raw();
                assert_eq!(raw.get(Field::Age), Some(&RawValue::Text("63".into())));
                assert_eq!(raw.get(Field::StDepression), Some(&RawValue::Text("2.3".into())));
                assert_eq!(raw.get(Field::Thal), None);
            }
            other => panic!("expected predict, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cardio", "check-model", "--model", "m.json", "-vv"])
            .unwrap();
        assert_eq!(cli.model, Some(PathBuf::from("m.json")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_flags_override_input_file_values() {
        let mut raw = RawInput::new()
            .with(Field::Age, 50)
            .with(Field::Thal, "2");
        let flags = FieldArgs {
            age: Some("63".to_string()),
            ..FieldArgs::default()
        };
        raw.merge(flags.into_raw());

        assert_eq!(raw.get(Field::Age), Some(&RawValue::Text("63".into())));
        assert_eq!(raw.get(Field::Thal), Some(&RawValue::Text("2".into())));
    }

    fn shipped_model() -> String {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../models/heart_gb.json")
            .display()
            .to_string()
    }

    /// Scenario A as command-line flags, with `--thal` last so tests can drop it.
    const SCENARIO_A: [&str; 26] = [
        "--age", "63", "--sex", "1", "--cp", "3", "--trestbps", "145", "--chol", "233",
        "--fbs", "1", "--restecg", "0", "--thalach", "150", "--exang", "0", "--oldpeak", "2.3",
        "--slope", "0", "--ca", "0", "--thal", "1",
    ];

    fn run_with(model: &str, extra: &[&str], values: &[&str]) -> Outcome {
        let mut argv = vec!["cardio", "predict", "--model", model];
        argv.extend_from_slice(extra);
        argv.extend_from_slice(values);
        let cli = Cli::try_parse_from(argv).unwrap();
        run(cli).unwrap_or_else(Outcome::failure)
    }

    #[test]
    fn test_scenario_a_exits_zero_with_diagnosis() {
        let outcome = run_with(&shipped_model(), &[], &SCENARIO_A);

        assert_eq!(outcome.status, EXIT_SUCCESS);
        assert!(outcome
            .stdout
            .starts_with("The patient has high chances of having heart disease"));
        assert!(outcome.stdout.contains("- [Cardiologist]("));
        assert!(outcome.stderr.is_empty());
    }

    #[test]
    fn test_scenario_a_json_report() {
        let outcome = run_with(&shipped_model(), &["--format", "json"], &SCENARIO_A);
        assert_eq!(outcome.status, EXIT_SUCCESS);

        let report: serde_json::Value = serde_json::from_str(&outcome.stdout).unwrap();
        assert_eq!(report["diagnosis"], "disease_likely");
        assert_eq!(report["record"]["chol"], 233.0);
        assert_eq!(report["specialists"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_field_exits_two() {
        let without_thal = &SCENARIO_A[..24];
        let outcome = run_with(&shipped_model(), &[], without_thal);

        assert_eq!(outcome.status, EXIT_INVALID_RECORD);
        assert!(outcome.stdout.is_empty());
        assert_eq!(
            outcome.stderr,
            "invalid patient record: contains null values: thal\n"
        );
    }

    #[test]
    fn test_invalid_record_json_body() {
        let without_thal = &SCENARIO_A[..24];
        let outcome = run_with(&shipped_model(), &["--format", "json"], without_thal);
        assert_eq!(outcome.status, EXIT_INVALID_RECORD);

        let body: serde_json::Value = serde_json::from_str(&outcome.stdout).unwrap();
        assert_eq!(body["error"], "validation");
        assert_eq!(body["message"], "contains null values: thal");
        assert_eq!(body["fields"], serde_json::json!(["thal"]));

        // a bad code alongside the missing field still reports the missing one
        let mut values = without_thal.to_vec();
        values[5] = "9";
        let outcome = run_with(&shipped_model(), &["--format", "json"], &values);
        assert_eq!(outcome.status, EXIT_INVALID_RECORD);
        let body: serde_json::Value = serde_json::from_str(&outcome.stdout).unwrap();
        assert_eq!(body["error"], "validation");
        assert_eq!(body["fields"], serde_json::json!(["thal"]));
    }

    #[test]
    fn test_bad_code_is_coercion_error() {
        let mut values = SCENARIO_A.to_vec();
        values[5] = "9";
        let outcome = run_with(&shipped_model(), &["--format", "json"], &values);
        assert_eq!(outcome.status, EXIT_INVALID_RECORD);

        let body: serde_json::Value = serde_json::from_str(&outcome.stdout).unwrap();
        assert_eq!(body["error"], "coercion");
        assert_eq!(body["fields"], serde_json::json!(["cp"]));
    }

    #[test]
    fn test_bad_model_path_exits_one() {
        let outcome = run_with("/nonexistent/heart_gb.json", &[], &SCENARIO_A);

        assert_eq!(outcome.status, EXIT_FAILURE);
        assert!(outcome.stdout.is_empty());
        assert!(outcome
            .stderr
            .starts_with("error: loading classifier /nonexistent/heart_gb.json"));
        assert_eq!(outcome.stderr.matches("os error").count(), 1);
    }

    #[test]
    fn test_check_model_summary() {
        let cli = Cli::try_parse_from(["cardio", "check-model", "--model", &shipped_model()])
            .unwrap();
        let outcome = run(cli).unwrap();

        assert_eq!(outcome.status, EXIT_SUCCESS);
        assert!(outcome.stdout.contains("name:      heart_gb"));
        assert!(outcome.stdout.contains("trees:     12"));
    }

    #[test]
    fn test_fields_lists_every_column() {
        let out = print_fields().unwrap();
        for field in Field::ALL {
            assert!(out.contains(field.name()));
        }
        assert!(out.contains("thal codes: 1 = normal, 2 = fixed defect, 3 = reversible defect"));
    }

    #[test]
    fn test_code_labels() {
        assert_eq!(
            code_labels::<codes::Sex>(),
            "0 = female, 1 = male"
        );
    }
}
