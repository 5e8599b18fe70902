use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use referral_client::HttpSubmissionEndpoint;
use referral_core::config::{AppConfig, LoadOptions};
use referral_core::controller::SubmissionController;
use referral_core::domain::attachment::Attachment;
use referral_core::domain::form::{FieldName, FieldValue};
use referral_core::endpoint::{RecordingEndpoint, SubmissionEndpoint};
use referral_core::errors::SubmissionError;
use referral_core::signature::SignatureScript;
use toml::Value;
use tracing::info;

use crate::commands::{
    runtime, CommandResult, EXIT_CONFIG, EXIT_INPUT, EXIT_SUBMISSION, EXIT_VALIDATION,
};
use crate::SubmitArgs;

const COMMAND: &str = "submit";

/// Everything read from disk before the form is touched.
struct Inputs {
    fields: Vec<(FieldName, FieldValue)>,
    signature: Option<SignatureScript>,
    attachment: Option<Attachment>,
}

pub fn run(args: &SubmitArgs) -> CommandResult {
    let mut config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let inputs = match read_inputs(args) {
        Ok(inputs) => inputs,
        Err(error) => {
            return CommandResult::failure(COMMAND, "input", format!("{error:#}"), EXIT_INPUT);
        }
    };
    if let Some(stroke_width) = inputs.signature.as_ref().and_then(|script| script.stroke_width) {
        config.signature.stroke_width = stroke_width;
    }

    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    if args.dry_run {
        let endpoint = RecordingEndpoint::default();
        let controller = SubmissionController::new(endpoint.clone(), &config);
        return runtime.block_on(async {
            match submit(&controller, inputs).await {
                Ok(result) => {
                    let payloads = endpoint.payloads();
                    let Some(payload) = payloads.first() else {
                        return result;
                    };
                    CommandResult::ok_with(
                        COMMAND,
                        format!(
                            "dry run: registration assembled with {} fields and {} files, nothing sent",
                            payload.text_parts.len(),
                            payload.binary_parts.len()
                        ),
                        Some(payload.correlation_id.as_str()),
                    )
                }
                Err(result) => result,
            }
        });
    }

    let endpoint = match HttpSubmissionEndpoint::from_config(&config.endpoint) {
        Ok(endpoint) => endpoint,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            );
        }
    };
    info!(event_name = "cli.submit_target", url = %endpoint.url(), "submitting registration");
    let controller = SubmissionController::new(endpoint, &config);
    runtime.block_on(async {
        match submit(&controller, inputs).await {
            Ok(result) | Err(result) => result,
        }
    })
}

async fn submit<E>(
    controller: &SubmissionController<E>,
    inputs: Inputs,
) -> Result<CommandResult, CommandResult>
where
    E: SubmissionEndpoint,
{
    for (name, value) in inputs.fields {
        controller.update_field(name, value).map_err(|error| {
            CommandResult::failure(COMMAND, "input", error.to_string(), EXIT_INPUT)
        })?;
    }

    if let Some(script) = inputs.signature {
        controller.resize_signature_pad(script.surface);
        for event in script.events() {
            controller.pointer(event);
        }
    }
    controller.attach_file(inputs.attachment);

    match controller.submit().await {
        Ok(receipt) => Ok(CommandResult::ok_with(
            COMMAND,
            receipt.message,
            Some(receipt.correlation_id.as_str()),
        )),
        Err(error) => Err(failure(&error)),
    }
}

fn failure(error: &SubmissionError) -> CommandResult {
    let exit_code = match error {
        SubmissionError::Validation(_) => EXIT_VALIDATION,
        _ => EXIT_SUBMISSION,
    };
    let correlation_id = match error {
        SubmissionError::Application { correlation_id, .. }
        | SubmissionError::Transport { correlation_id, .. } => Some(correlation_id.as_str()),
        SubmissionError::Validation(_) | SubmissionError::InFlight => None,
    };
    CommandResult::failure_with(
        COMMAND,
        error.error_class(),
        format!("{} ({error})", error.user_message()),
        exit_code,
        correlation_id,
    )
}

fn read_inputs(args: &SubmitArgs) -> Result<Inputs> {
    let fields = read_applicant(&args.applicant)?;

    let signature = match &args.signature {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("could not read signature script `{}`", path.display()))?;
            let script = SignatureScript::from_json(&raw)
                .with_context(|| format!("invalid signature script `{}`", path.display()))?;
            Some(script)
        }
        None => None,
    };

    let attachment = match &args.attachment {
        Some(path) => Some(
            Attachment::from_path(path)
                .with_context(|| format!("could not read attachment `{}`", path.display()))?,
        ),
        None => None,
    };

    Ok(Inputs { fields, signature, attachment })
}

/// Reads an applicant file: a flat TOML table keyed by form input names,
/// string values for text fields and booleans for the consent checkboxes.
fn read_applicant(path: &Path) -> Result<Vec<(FieldName, FieldValue)>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read applicant file `{}`", path.display()))?;
    let table = raw
        .parse::<toml::Table>()
        .with_context(|| format!("could not parse applicant file `{}`", path.display()))?;

    let mut fields = Vec::with_capacity(table.len());
    for (key, value) in table {
        let name = key.parse::<FieldName>().map_err(|error| anyhow!("{error}"))?;
        let value = match value {
            Value::String(text) => FieldValue::Text(text),
            Value::Boolean(checked) => FieldValue::Checked(checked),
            Value::Integer(number) => FieldValue::Text(number.to_string()),
            other => bail!("field `{key}` has unsupported value type `{}`", other.type_str()),
        };
        fields.push((name, value));
    }
    Ok(fields)
}
