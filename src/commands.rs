use crate::cli::{help_text, parse_cli_verb, CliVerb};
use crate::config::{load_global_settings, Settings};
use crate::dispatch::{self, DispatchContext, QueryError, ToolCallOutcome, ToolInput};
use crate::plugins::{builtin_registry, ShellPathCache};
use crate::storage::Storage;
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Exec => cmd_exec(&args[1..]),
        CliVerb::List => cmd_list(),
        CliVerb::Runs => cmd_runs(),
        CliVerb::Raw => cmd_raw(&args[1..]),
        CliVerb::LogRange => cmd_log_range(&args[1..]),
        CliVerb::Cleanup => cmd_cleanup(),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}

fn load_settings() -> Result<Settings, String> {
    load_global_settings().map_err(|err| err.to_string())
}

fn open_storage(settings: &Settings) -> Result<Storage, String> {
    let root = settings.resolve_storage_root().map_err(|err| err.to_string())?;
    Storage::open(root).map_err(|err| err.to_string())
}

fn default_cwd(settings: &Settings) -> Result<PathBuf, String> {
    match &settings.default_cwd {
        Some(cwd) => Ok(cwd.clone()),
        None => std::env::current_dir()
            .map_err(|err| format!("failed to resolve current directory: {err}")),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| err.to_string())
}

/// Usage errors keep their stable code and come back as a JSON body; storage
/// failures abort the command.
fn query_result<T: serde::Serialize>(result: Result<T, QueryError>) -> Result<String, String> {
    match result {
        Ok(response) => to_json(&response),
        Err(QueryError::Storage(err)) => Err(err.to_string()),
        Err(err) => to_json(&json!({ "error": err.to_string(), "code": err.code() })),
    }
}

fn cmd_exec(args: &[String]) -> Result<String, String> {
    let double_dash = args.iter().position(|arg| arg == "--");
    let (flags, extra) = match double_dash {
        Some(i) => (&args[..i], &args[i + 1..]),
        None => (args, &[] as &[String]),
    };

    let mut tool = None;
    let mut cwd = None;
    let mut confirmed = false;
    let mut i = 0;
    while i < flags.len() {
        match flags[i].as_str() {
            "--cwd" => {
                i += 1;
                cwd = Some(
                    flags
                        .get(i)
                        .ok_or("--cwd requires a directory argument")?
                        .clone(),
                );
            }
            "--confirmed" => confirmed = true,
            value if tool.is_none() => tool = Some(value.to_string()),
            value => return Err(format!("unexpected argument `{value}`")),
        }
        i += 1;
    }
    let tool = tool.ok_or("usage: exec <tool> [--cwd <dir>] [--confirmed] [-- <args...>]")?;

    let settings = load_settings()?;
    let storage = open_storage(&settings)?;
    // best-effort retention sweep on startup
    let _ = storage.cleanup(Utc::now(), settings.resolve_retention_days());
    let registry = builtin_registry().map_err(|err| err.to_string())?;
    let shell_path = ShellPathCache::with_shell(settings.shell.clone());
    let context = DispatchContext {
        registry: &registry,
        storage: &storage,
        shell_path: &shell_path,
        default_cwd: default_cwd(&settings)?,
    };
    let input = ToolInput {
        cwd,
        args: extra.to_vec(),
        confirmed,
    };

    match dispatch::run_tool(&context, &tool, &input).map_err(|err| err.to_string())? {
        ToolCallOutcome::Response(response) => to_json(&response),
        ToolCallOutcome::ConfirmationNeeded(request) => to_json(&request),
    }
}

fn cmd_list() -> Result<String, String> {
    let registry = builtin_registry().map_err(|err| err.to_string())?;
    let tools: Vec<_> = registry
        .list()
        .map(|spec| {
            json!({
                "name": spec.name,
                "description": spec.description,
                "mutatesWorkspace": spec.mutates_workspace,
            })
        })
        .collect();
    to_json(&json!({ "tools": tools }))
}

fn cmd_runs() -> Result<String, String> {
    let settings = load_settings()?;
    let storage = open_storage(&settings)?;
    let runs = storage.list_runs().map_err(|err| err.to_string())?;
    to_json(&json!({ "runs": runs }))
}

fn cmd_raw(args: &[String]) -> Result<String, String> {
    let mut run_id = None;
    let mut offset = None;
    let mut length = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--offset" => {
                i += 1;
                offset = Some(parse_number(args.get(i), "--offset")?);
            }
            "--length" => {
                i += 1;
                length = Some(parse_number(args.get(i), "--length")? as usize);
            }
            value if run_id.is_none() => run_id = Some(value.to_string()),
            value => return Err(format!("unexpected argument `{value}`")),
        }
        i += 1;
    }
    let run_id = run_id.ok_or("usage: raw <runId> [--offset N] [--length N]")?;

    let settings = load_settings()?;
    let storage = open_storage(&settings)?;
    query_result(dispatch::run_raw(&storage, &run_id, offset, length))
}

fn cmd_log_range(args: &[String]) -> Result<String, String> {
    let mut run_id = None;
    let mut start_line = None;
    let mut line_count = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--start-line" => {
                i += 1;
                start_line = Some(parse_number(args.get(i), "--start-line")?);
            }
            "--line-count" => {
                i += 1;
                line_count = Some(parse_number(args.get(i), "--line-count")?);
            }
            value if run_id.is_none() => run_id = Some(value.to_string()),
            value => return Err(format!("unexpected argument `{value}`")),
        }
        i += 1;
    }
    let run_id =
        run_id.ok_or("usage: log-range <runId> --start-line N [--line-count N]")?;
    let start_line =
        start_line.ok_or("usage: log-range <runId> --start-line N [--line-count N]")?;

    let settings = load_settings()?;
    let storage = open_storage(&settings)?;
    query_result(dispatch::run_log_range(
        &storage, &run_id, start_line, line_count,
    ))
}

fn cmd_cleanup() -> Result<String, String> {
    let settings = load_settings()?;
    let storage = open_storage(&settings)?;
    let removed = storage
        .cleanup(Utc::now(), settings.resolve_retention_days())
        .map_err(|err| err.to_string())?;
    to_json(&json!({ "removed": removed }))
}

fn parse_number(value: Option<&String>, flag: &str) -> Result<u64, String> {
    let raw = value.ok_or_else(|| format!("{flag} requires a numeric argument"))?;
    raw.parse()
        .map_err(|_| format!("{flag} requires a numeric argument, got `{raw}`"))
}
