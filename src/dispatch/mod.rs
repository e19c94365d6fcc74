use crate::diagnostics::{Diagnostic, Severity};
use crate::parsers::chain_parsers;
use crate::plugins::{execute_command, env, ExecutorError, PluginRegistry, ShellPathCache};
use crate::storage::{Storage, StorageError};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod raw_output;
pub mod response;
pub mod security;

pub use raw_output::{run_log_range, run_raw, LogRangeResponse, QueryError, RawResponse};
pub use response::{ConfirmationRequest, SimpleDiagnostic, ToolCallOutcome, ToolResponse};
pub use security::CwdError;

/// Synthetic exit code recorded when the tool never ran or the orchestration
/// around it failed.
const EXECUTION_FAILED_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone)]
pub struct ToolInput {
    pub cwd: Option<String>,
    pub args: Vec<String>,
    pub confirmed: bool,
}

pub struct DispatchContext<'a> {
    pub registry: &'a PluginRegistry,
    pub storage: &'a Storage,
    pub shell_path: &'a ShellPathCache,
    pub default_cwd: PathBuf,
}

/// Resolves and runs a tool: permission gate, run capture, diagnostic
/// extraction, persistence, response shaping. Usage errors come back as
/// error responses with stable codes; only storage failures propagate.
pub fn run_tool(
    context: &DispatchContext<'_>,
    name: &str,
    input: &ToolInput,
) -> Result<ToolCallOutcome, StorageError> {
    let Some(spec) = context.registry.get(name) else {
        return Ok(usage_error(
            name,
            "UNKNOWN_TOOL",
            format!("Unknown tool: {name}"),
        ));
    };

    let raw_cwd = input.cwd.as_deref();
    let joined = match raw_cwd {
        Some(cwd) if Path::new(cwd).is_absolute() => PathBuf::from(cwd),
        Some(cwd) => context.default_cwd.join(cwd),
        None => context.default_cwd.clone(),
    };
    let cwd = match security::validate_cwd(&joined, raw_cwd, &context.default_cwd) {
        Ok(cwd) => cwd,
        Err(err) => return Ok(usage_error(spec.name, err.code(), err.to_string())),
    };

    if spec.mutates_workspace && !input.confirmed {
        return Ok(ToolCallOutcome::ConfirmationNeeded(ConfirmationRequest {
            confirmation_required: true,
            tool: spec.name.to_string(),
            description: spec.description.to_string(),
            args: input.args.clone(),
            cwd: cwd.display().to_string(),
        }));
    }

    // Metadata records the caller's command as requested; the built argument
    // vector may differ (separators, forced flags) and fails late so the
    // failure is captured as a run like any other execution error.
    let mut recorded_command = vec![spec.program.to_string()];
    recorded_command.extend(input.args.iter().cloned());
    let mut writer = context.storage.create_run(spec.name, &cwd, &recorded_command)?;
    info!(tool = spec.name, run_id = %writer.run_id(), "executing tool");

    let command_args = match spec.command_args(&input.args) {
        Ok(args) => args,
        Err(err) => return execution_error(writer, spec.name, err.to_string()),
    };

    let child_env = env::build_child_env(&cwd, context.shell_path);
    let captured = match execute_command(spec.program, &command_args, &cwd, &child_env, &mut writer)
    {
        Ok(captured) => captured,
        Err(ExecutorError::Storage(err)) => return Err(err),
        Err(err) => return execution_error(writer, spec.name, err.to_string()),
    };

    let diagnostics = chain_parsers(spec.parsers, spec.name, &captured.output);
    let summary = spec.summary.extract(&captured.output);
    writer.write_diagnostics(&diagnostics)?;
    let meta = writer.complete(captured.exit_code)?;

    let success = spec.success.is_success(captured.exit_code);
    Ok(ToolCallOutcome::Response(ToolResponse::from_diagnostics(
        success,
        meta.run_id.to_string(),
        &diagnostics,
        summary,
    )))
}

fn usage_error(tool: &str, code: &str, message: String) -> ToolCallOutcome {
    let mut diagnostic = Diagnostic::new(tool, Severity::Error, message);
    diagnostic.code = Some(code.to_string());
    ToolCallOutcome::Response(ToolResponse::from_diagnostics(
        false,
        String::new(),
        &[diagnostic],
        None,
    ))
}

/// The subprocess never ran to completion; the run is still completed with a
/// synthetic exit code so its captured output remains retrievable.
fn execution_error(
    writer: crate::storage::RunWriter,
    tool: &str,
    message: String,
) -> Result<ToolCallOutcome, StorageError> {
    let mut diagnostic = Diagnostic::new(
        tool,
        Severity::Error,
        format!("Execution failed: {message}"),
    );
    diagnostic.code = Some("EXECUTION_ERROR".to_string());
    writer.write_diagnostics(std::slice::from_ref(&diagnostic))?;
    let meta = writer.complete(EXECUTION_FAILED_EXIT_CODE)?;
    Ok(ToolCallOutcome::Response(ToolResponse::from_diagnostics(
        false,
        meta.run_id.to_string(),
        &[diagnostic],
        None,
    )))
}
