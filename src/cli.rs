#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Exec,
    List,
    Runs,
    Raw,
    LogRange,
    Cleanup,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "exec" => CliVerb::Exec,
        "list" => CliVerb::List,
        "runs" => CliVerb::Runs,
        "raw" => CliVerb::Raw,
        "log-range" => CliVerb::LogRange,
        "cleanup" => CliVerb::Cleanup,
        "--help" | "-h" | "help" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  exec <tool> [--cwd <dir>] [--confirmed] [-- <args...>]".to_string(),
        "                                       Run a build/test/lint tool".to_string(),
        "  list                                 List registered tools".to_string(),
        "  runs                                 List stored runs, newest first".to_string(),
        "  raw <runId> [--offset N] [--length N]".to_string(),
        "                                       Read raw bytes from a run's log".to_string(),
        "  log-range <runId> --start-line N [--line-count N]".to_string(),
        "                                       Read a line range from a run's log".to_string(),
        "  cleanup                              Delete runs past the retention window".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    let mut lines = vec![
        "Usage: buildlens <command> [options]".to_string(),
        String::new(),
    ];
    lines.extend(cli_help_lines());
    lines.push(String::new());
    lines.push("All command output is JSON on stdout.".to_string());
    lines.join("\n")
}
