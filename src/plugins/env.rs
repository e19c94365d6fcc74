use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Bound on the auxiliary login-shell spawn used for PATH discovery. The
/// primary tool invocation is never timed out.
pub const SHELL_PATH_TIMEOUT: Duration = Duration::from_secs(5);

const ALLOWED_SHELLS: &[&str] = &[
    "/bin/sh",
    "/bin/bash",
    "/bin/zsh",
    "/bin/dash",
    "/usr/bin/bash",
    "/usr/bin/zsh",
];

const FALLBACK_PATHS: &[&str] = &[
    "/opt/homebrew/bin",
    "/usr/local/bin",
    "/usr/local/share/dotnet",
    "/usr/share/dotnet",
    "/usr/bin",
];

// Variable names that smell like credentials never reach the child process.
static SECRET_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(token|secret|password|passwd|credential|api_?key|private_?key|access_?key|session_?key|auth)",
    )
    .expect("valid regex")
});

// Cloud-provider prefixes and database connection strings.
static SECRET_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(AWS_|AZURE_|GCP_|GOOGLE_|HEROKU_|DIGITALOCEAN_|DO_API)").expect("valid regex")
});
static CONNECTION_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^database_url$|_connection_string$|_dsn$)").expect("valid regex"));

pub fn is_secret_env_name(name: &str) -> bool {
    SECRET_NAME.is_match(name) || SECRET_PREFIX.is_match(name) || CONNECTION_STRING.is_match(name)
}

/// Process-wide memo of the user's login-shell PATH. Discovery spawns the
/// login shell once; `reset` forces re-discovery (tests depend on this).
#[derive(Debug, Default)]
pub struct ShellPathCache {
    shell_override: Option<String>,
    cached: Mutex<Option<Option<String>>>,
}

impl ShellPathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefer `shell` over `$SHELL` for discovery; still allow-list checked.
    pub fn with_shell(shell: Option<String>) -> Self {
        Self {
            shell_override: shell,
            cached: Mutex::new(None),
        }
    }

    pub fn reset(&self) {
        if let Ok(mut slot) = self.cached.lock() {
            *slot = None;
        }
    }

    pub fn user_shell_path(&self) -> Option<String> {
        let Ok(mut slot) = self.cached.lock() else {
            return None;
        };
        if let Some(path) = slot.as_ref() {
            return path.clone();
        }
        let discovered = discover_shell_path(self.shell_override.as_deref());
        debug!(found = discovered.is_some(), "resolved user shell PATH");
        *slot = Some(discovered.clone());
        discovered
    }
}

/// Builds the child environment: the parent environment minus secret-bearing
/// variables, with PATH rebuilt as project-local bin, then the user's shell
/// PATH (or the platform fallback list), then the process PATH.
pub fn build_child_env(cwd: &Path, shell_path: &ShellPathCache) -> BTreeMap<String, String> {
    let mut child_env: BTreeMap<String, String> = std::env::vars()
        .filter(|(name, _)| !is_secret_env_name(name))
        .collect();

    let process_path = child_env.get("PATH").cloned().unwrap_or_default();
    let mut parts = vec![cwd.join("node_modules/.bin").display().to_string()];
    match shell_path.user_shell_path() {
        Some(user_path) => parts.push(user_path),
        None => parts.extend(FALLBACK_PATHS.iter().map(|p| p.to_string())),
    }
    if !process_path.is_empty() {
        parts.push(process_path);
    }
    child_env.insert("PATH".to_string(), parts.join(":"));
    child_env
}

fn validated_shell(preferred: Option<&str>) -> String {
    let candidate = preferred
        .map(str::to_string)
        .or_else(|| std::env::var("SHELL").ok());
    match candidate {
        Some(shell) if ALLOWED_SHELLS.contains(&shell.as_str()) => shell,
        _ => "/bin/sh".to_string(),
    }
}

fn discover_shell_path(preferred_shell: Option<&str>) -> Option<String> {
    let shell = validated_shell(preferred_shell);
    let mut command = Command::new(&shell);
    command
        .args(["-l", "-c", "echo $PATH"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let mut child = command.spawn().ok()?;
    let stdout = child.stdout.take()?;
    let reader = thread::spawn(move || {
        let mut buf = String::new();
        let mut stdout = stdout;
        let _ = stdout.read_to_string(&mut buf);
        buf
    });

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    return None;
                }
                break;
            }
            Ok(None) => {
                if start.elapsed() > SHELL_PATH_TIMEOUT {
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(_) => return None,
        }
    }

    let output = reader.join().unwrap_or_default();
    let trimmed = output.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
