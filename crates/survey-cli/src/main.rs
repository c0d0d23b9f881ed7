use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use survey_spec::{
    AnswerMap, Survey, ValidationResult, build_render_payload, render_json_ui, render_text,
    resolve_visibility, run_calculations, validate, values_by_code,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Environment variable holding the log filter, e.g. `survey_spec=debug`.
const LOG_ENV: &str = "SURVEY_ENGINE_LOG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Program survey evaluation CLI",
    long_about = "Evaluates visibility criteria, calculated questions and validation for program survey definitions"
)]
struct Cli {
    /// Log at debug level unless SURVEY_ENGINE_LOG says otherwise.
    #[arg(long, global = true, alias = "debug")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Print the visibility of every component, keyed by component id.
    Visibility {
        /// Path to the survey definition JSON.
        #[arg(long, value_name = "SURVEY")]
        survey: PathBuf,
        /// Path to the answers JSON, keyed by data element id.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Print calculated question results, keyed by data element code.
    Calculate {
        /// Path to the survey definition JSON.
        #[arg(long, value_name = "SURVEY")]
        survey: PathBuf,
        /// Path to the answers JSON, keyed by data element id.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Validate answers against a survey definition.
    Validate {
        /// Path to the survey definition JSON.
        #[arg(long, value_name = "SURVEY")]
        survey: PathBuf,
        /// Path to the answers JSON, keyed by data element id.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Render the survey state for the given answers.
    Render {
        /// Path to the survey definition JSON.
        #[arg(long, value_name = "SURVEY")]
        survey: PathBuf,
        /// Optional answers JSON; an empty submission is assumed otherwise.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Print the JSON schema of a survey definition.
    Schema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Visibility { survey, answers } => run_visibility(&survey, &answers),
        Command::Calculate { survey, answers } => run_calculate(&survey, &answers),
        Command::Validate { survey, answers } => run_validate(&survey, &answers),
        Command::Render {
            survey,
            answers,
            format,
        } => run_render(&survey, answers.as_deref(), format),
        Command::Schema => print_json(&schemars::schema_for!(Survey)),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_survey(path: &Path) -> CliResult<Survey> {
    let raw = fs::read_to_string(path)?;
    let survey = Survey::from_json_str(&raw)?;
    info!(
        survey = %survey.id,
        components = survey.components.len(),
        "loaded survey definition"
    );
    Ok(survey)
}

fn load_answers(path: &Path) -> CliResult<Value> {
    let raw = fs::read_to_string(path)?;
    let answers: Value = serde_json::from_str(&raw)?;
    if !answers.is_object() {
        return Err(format!("answers in {} must be a JSON object", path.display()).into());
    }
    debug!(path = %path.display(), "loaded answers");
    Ok(answers)
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_visibility(survey_path: &Path, answers_path: &Path) -> CliResult<()> {
    let survey = load_survey(survey_path)?;
    let answers = load_answers(answers_path)?;
    print_json(&resolve_visibility(&survey, &answers))
}

fn run_calculate(survey_path: &Path, answers_path: &Path) -> CliResult<()> {
    let survey = load_survey(survey_path)?;
    let answers: AnswerMap = load_answers(answers_path)?
        .as_object()
        .cloned()
        .unwrap_or_default();
    let by_code = values_by_code(&answers, &survey.components);
    print_json(&run_calculations(&survey.components, &by_code))
}

fn run_validate(survey_path: &Path, answers_path: &Path) -> CliResult<()> {
    let survey = load_survey(survey_path)?;
    let answers = load_answers(answers_path)?;

    let result = validate(&survey, &answers);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!(
                "  {} - {}",
                error.path.as_deref().unwrap_or("<unknown>"),
                error.message
            );
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            result.missing_required.join(", ")
        );
    }
    if !result.unknown_fields.is_empty() {
        println!(
            "Unknown answer fields: {}",
            result.unknown_fields.join(", ")
        );
    }
}

fn run_render(
    survey_path: &Path,
    answers_path: Option<&Path>,
    format: RenderMode,
) -> CliResult<()> {
    let survey = load_survey(survey_path)?;
    let answers = match answers_path {
        Some(path) => load_answers(path)?,
        None => Value::Object(AnswerMap::new()),
    };

    let payload = build_render_payload(&survey, &answers);
    match format {
        RenderMode::Text => {
            println!("{}", render_text(&payload));
            Ok(())
        }
        RenderMode::Json => print_json(&render_json_ui(&payload)),
    }
}

#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use assert_fs::prelude::*;
    use serde_json::{Value, json};
    use std::fs;
    use tempfile::TempDir;

    fn legacy_survey() -> Value {
        json!({
            "id": "program-legacy",
            "name": "Legacy",
            "components": [
                {
                    "id": "component-ref",
                    "dataElement": { "id": "pde-ref", "code": "REF", "name": "Reference", "type": "Binary" }
                },
                {
                    "id": "component-check",
                    "componentIndex": 1,
                    "visibilityCriteria": "REF: Yes",
                    "validationCriteria": "{\"mandatory\": true}",
                    "dataElement": { "id": "pde-check", "code": "CHECK", "name": "Check", "type": "FreeText" }
                },
                {
                    "id": "component-double",
                    "componentIndex": 2,
                    "calculation": "SCORE * 2",
                    "dataElement": { "id": "pde-double", "code": "DOUBLE", "name": "Double", "type": "CalculatedQuestion" }
                },
                {
                    "id": "component-score",
                    "componentIndex": 3,
                    "dataElement": { "id": "pde-score", "code": "SCORE", "name": "Score", "type": "Number" }
                }
            ]
        })
    }

    fn write_inputs(dir: &TempDir, answers: Value) -> (std::path::PathBuf, std::path::PathBuf) {
        let survey_path = dir.path().join("survey.json");
        let answers_path = dir.path().join("answers.json");
        fs::write(&survey_path, legacy_survey().to_string()).expect("write survey");
        fs::write(&answers_path, answers.to_string()).expect("write answers");
        (survey_path, answers_path)
    }

    fn stdout_json(output: &std::process::Output) -> Value {
        serde_json::from_slice(&output.stdout).expect("json output")
    }

    #[test]
    fn visibility_command_prints_component_map() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let (survey, answers) = write_inputs(&dir, json!({ "pde-ref": true }));

        let output = Command::cargo_bin("survey-engine")?
            .arg("visibility")
            .arg("--survey")
            .arg(&survey)
            .arg("--answers")
            .arg(&answers)
            .assert()
            .success()
            .get_output()
            .clone();
        let map = stdout_json(&output);
        assert_eq!(map["component-ref"], Value::Bool(true));
        assert_eq!(map["component-check"], Value::Bool(true));
        Ok(())
    }

    #[test]
    fn calculate_command_rekeys_answers_by_code() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let (survey, answers) = write_inputs(&dir, json!({ "pde-score": "7.5" }));

        let output = Command::cargo_bin("survey-engine")?
            .args(["calculate", "--survey"])
            .arg(&survey)
            .arg("--answers")
            .arg(&answers)
            .assert()
            .success()
            .get_output()
            .clone();
        assert_eq!(stdout_json(&output), json!({ "DOUBLE": "15.00" }));
        Ok(())
    }

    #[test]
    fn validate_command_fails_on_missing_answers() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let survey = workspace.child("survey.json");
        survey.write_str(&legacy_survey().to_string())?;
        let answers = workspace.child("answers.json");
        answers.write_str(r#"{ "pde-ref": "Yes" }"#)?;

        let output = Command::cargo_bin("survey-engine")?
            .arg("validate")
            .arg("--survey")
            .arg(survey.path())
            .arg("--answers")
            .arg(answers.path())
            .assert()
            .failure()
            .get_output()
            .clone();
        let stdout = String::from_utf8(output.stdout)?;
        assert!(stdout.contains("Validation result: invalid"));
        assert!(stdout.contains("Missing required answers: pde-check"));
        Ok(())
    }

    #[test]
    fn render_command_supports_text_and_json() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let survey = workspace.child("survey.json");
        survey.write_str(&legacy_survey().to_string())?;

        let output = Command::cargo_bin("survey-engine")?
            .arg("render")
            .arg("--survey")
            .arg(survey.path())
            .assert()
            .success()
            .get_output()
            .clone();
        let text = String::from_utf8(output.stdout)?;
        assert!(text.contains("Survey: Legacy (program-legacy)"));
        assert!(text.contains("All mandatory questions are answered."));

        let answers = workspace.child("answers.json");
        answers.write_str(r#"{ "pde-ref": true }"#)?;
        let output = Command::cargo_bin("survey-engine")?
            .arg("render")
            .arg("--survey")
            .arg(survey.path())
            .arg("--answers")
            .arg(answers.path())
            .args(["--format", "json"])
            .assert()
            .success()
            .get_output()
            .clone();
        let ui = stdout_json(&output);
        assert_eq!(ui["status"], "need_input");
        assert_eq!(ui["next_question_id"], "component-check");
        Ok(())
    }

    #[test]
    fn invalid_answers_file_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let (survey, answers) = write_inputs(&dir, json!(["not", "an", "object"]));

        Command::cargo_bin("survey-engine")?
            .arg("visibility")
            .arg("--survey")
            .arg(&survey)
            .arg("--answers")
            .arg(&answers)
            .assert()
            .failure();
        Ok(())
    }

    #[test]
    fn schema_command_describes_components() -> Result<(), Box<dyn std::error::Error>> {
        let output = Command::cargo_bin("survey-engine")?
            .arg("schema")
            .assert()
            .success()
            .get_output()
            .clone();
        let schema = stdout_json(&output);
        assert!(schema["properties"]["components"].is_object());
        Ok(())
    }
}
