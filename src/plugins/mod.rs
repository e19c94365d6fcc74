use crate::diagnostics::TestSummary;
use crate::parsers::{self, ParserKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

pub mod env;
pub mod executor;

pub use env::ShellPathCache;
pub use executor::{execute_command, CapturedRun, ExecutorError, MAX_INLINE_OUTPUT_BYTES};

static SCRIPT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_:@/.-]+$").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("plugin `{0}` is already registered")]
    DuplicateRegistration(String),
    #[error("script name must not be empty")]
    MissingScriptName,
    #[error("invalid script name `{0}`: only alphanumeric, _, :, @, /, ., - characters are allowed")]
    InvalidScriptName(String),
    #[error("blocked flag `{0}`: this flag can load arbitrary code")]
    BlockedFlag(String),
}

/// How the caller-supplied arguments combine with the plugin's base command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgStyle {
    /// Arguments appended directly after the base args.
    Append,
    /// Fixed `run <script>` invocation; arguments follow a `--` separator.
    ScriptArgs,
    /// First argument names the script to run; the rest follow `--`.
    NamedScript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    None,
    /// `dotnet test` per-project tallies plus failed-to-build project count.
    Dotnet,
    /// Jest tally, falling back to the vitest form.
    Node,
}

impl SummaryKind {
    pub fn extract(self, output: &str) -> Option<TestSummary> {
        match self {
            SummaryKind::None => None,
            SummaryKind::Dotnet => parsers::dotnet_test::parse_test_summary(output),
            SummaryKind::Node => parsers::jest::parse_jest_summary(output)
                .or_else(|| parsers::vitest::parse_vitest_summary(output)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessRule {
    ZeroExit,
    /// eslint exits 1 when lint findings exist; only 2+ is a tool failure.
    ZeroOrOneExit,
}

impl SuccessRule {
    pub fn is_success(self, exit_code: i32) -> bool {
        match self {
            SuccessRule::ZeroExit => exit_code == 0,
            SuccessRule::ZeroOrOneExit => exit_code == 0 || exit_code == 1,
        }
    }
}

/// Capability record for one logical tool. The registry maps tool names to
/// these; everything the dispatch layer needs to run a tool is here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub mutates_workspace: bool,
    pub program: &'static str,
    pub base_args: &'static [&'static str],
    /// Forced after all caller arguments (eslint's `--format json`).
    pub trailing_args: &'static [&'static str],
    pub arg_style: ArgStyle,
    /// Flags rejected before spawn because they load arbitrary code.
    pub blocked_flags: &'static [&'static str],
    pub parsers: &'static [ParserKind],
    pub summary: SummaryKind,
    pub success: SuccessRule,
}

impl PluginSpec {
    /// Builds the literal argument vector for this invocation. No shell is
    /// involved anywhere downstream, so nothing here needs quoting.
    pub fn command_args(&self, extra: &[String]) -> Result<Vec<String>, PluginError> {
        for arg in extra {
            if self.blocked_flags.iter().any(|flag| flag == arg) {
                return Err(PluginError::BlockedFlag(arg.clone()));
            }
        }

        let mut args: Vec<String> = self.base_args.iter().map(|s| s.to_string()).collect();
        match self.arg_style {
            ArgStyle::Append => {
                args.extend(extra.iter().cloned());
            }
            ArgStyle::ScriptArgs => {
                if !extra.is_empty() {
                    args.push("--".to_string());
                    args.extend(extra.iter().cloned());
                }
            }
            ArgStyle::NamedScript => {
                let Some((script, script_args)) = extra.split_first() else {
                    return Err(PluginError::MissingScriptName);
                };
                validate_script_name(script)?;
                args.push(script.clone());
                if !script_args.is_empty() {
                    args.push("--".to_string());
                    args.extend(script_args.iter().cloned());
                }
            }
        }
        args.extend(self.trailing_args.iter().map(|s| s.to_string()));
        Ok(args)
    }

    /// The stored command vector for run metadata: program plus built args.
    pub fn command_vector(&self, extra: &[String]) -> Result<Vec<String>, PluginError> {
        let mut command = vec![self.program.to_string()];
        command.extend(self.command_args(extra)?);
        Ok(command)
    }
}

pub fn validate_script_name(name: &str) -> Result<(), PluginError> {
    if name.is_empty() {
        return Err(PluginError::MissingScriptName);
    }
    if !SCRIPT_NAME.is_match(name) {
        return Err(PluginError::InvalidScriptName(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<&'static str, PluginSpec>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicate names are a startup-time error, never a silent overwrite.
    pub fn register(&mut self, spec: PluginSpec) -> Result<(), PluginError> {
        if self.plugins.contains_key(spec.name) {
            return Err(PluginError::DuplicateRegistration(spec.name.to_string()));
        }
        self.plugins.insert(spec.name, spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PluginSpec> {
        self.plugins.get(name)
    }

    pub fn list(&self) -> impl Iterator<Item = &PluginSpec> {
        self.plugins.values()
    }
}

const ESLINT_BLOCKED_FLAGS: &[&str] = &[
    "--config",
    "-c",
    "--rulesdir",
    "--plugin",
    "--resolve-plugins-relative-to",
];

pub const BUILTIN_PLUGINS: &[PluginSpec] = &[
    PluginSpec {
        name: "dotnet.build",
        description: "Build a .NET project or solution",
        mutates_workspace: false,
        program: "dotnet",
        base_args: &["build"],
        trailing_args: &[],
        arg_style: ArgStyle::Append,
        blocked_flags: &[],
        parsers: &[ParserKind::Msbuild],
        summary: SummaryKind::None,
        success: SuccessRule::ZeroExit,
    },
    PluginSpec {
        name: "dotnet.restore",
        description: "Restore NuGet packages for a .NET project",
        mutates_workspace: true,
        program: "dotnet",
        base_args: &["restore"],
        trailing_args: &[],
        arg_style: ArgStyle::Append,
        blocked_flags: &[],
        parsers: &[ParserKind::Msbuild],
        summary: SummaryKind::None,
        success: SuccessRule::ZeroExit,
    },
    PluginSpec {
        name: "dotnet.test",
        description: "Run .NET tests with structured pass/fail counts",
        mutates_workspace: false,
        program: "dotnet",
        base_args: &["test"],
        trailing_args: &[],
        arg_style: ArgStyle::Append,
        blocked_flags: &[],
        parsers: &[ParserKind::Msbuild, ParserKind::DotnetTest],
        summary: SummaryKind::Dotnet,
        success: SuccessRule::ZeroExit,
    },
    PluginSpec {
        name: "npm.install",
        description: "Install npm dependencies",
        mutates_workspace: true,
        program: "npm",
        base_args: &["install"],
        trailing_args: &[],
        arg_style: ArgStyle::Append,
        blocked_flags: &[],
        parsers: &[ParserKind::Npm],
        summary: SummaryKind::None,
        success: SuccessRule::ZeroExit,
    },
    PluginSpec {
        name: "npm.build",
        description: "Run the npm build script",
        mutates_workspace: false,
        program: "npm",
        base_args: &["run", "build"],
        trailing_args: &[],
        arg_style: ArgStyle::ScriptArgs,
        blocked_flags: &[],
        parsers: &[ParserKind::Npm, ParserKind::Typescript, ParserKind::Nextjs],
        summary: SummaryKind::None,
        success: SuccessRule::ZeroExit,
    },
    PluginSpec {
        name: "npm.test",
        description: "Run the npm test script",
        mutates_workspace: false,
        program: "npm",
        base_args: &["run", "test"],
        trailing_args: &[],
        arg_style: ArgStyle::ScriptArgs,
        blocked_flags: &[],
        parsers: &[
            ParserKind::Npm,
            ParserKind::Typescript,
            ParserKind::Jest,
            ParserKind::Vitest,
        ],
        summary: SummaryKind::Node,
        success: SuccessRule::ZeroExit,
    },
    PluginSpec {
        name: "npm.run",
        description: "Run an npm script by name",
        mutates_workspace: true,
        program: "npm",
        base_args: &["run"],
        trailing_args: &[],
        arg_style: ArgStyle::NamedScript,
        blocked_flags: &[],
        parsers: &[ParserKind::Npm, ParserKind::Typescript],
        summary: SummaryKind::None,
        success: SuccessRule::ZeroExit,
    },
    PluginSpec {
        name: "pnpm.install",
        description: "Install pnpm dependencies",
        mutates_workspace: true,
        program: "pnpm",
        base_args: &["install"],
        trailing_args: &[],
        arg_style: ArgStyle::Append,
        blocked_flags: &[],
        parsers: &[ParserKind::Pnpm],
        summary: SummaryKind::None,
        success: SuccessRule::ZeroExit,
    },
    PluginSpec {
        name: "pnpm.build",
        description: "Run the pnpm build script",
        mutates_workspace: false,
        program: "pnpm",
        base_args: &["run", "build"],
        trailing_args: &[],
        arg_style: ArgStyle::ScriptArgs,
        blocked_flags: &[],
        parsers: &[ParserKind::Pnpm, ParserKind::Typescript, ParserKind::Nextjs],
        summary: SummaryKind::None,
        success: SuccessRule::ZeroExit,
    },
    PluginSpec {
        name: "pnpm.test",
        description: "Run the pnpm test script",
        mutates_workspace: false,
        program: "pnpm",
        base_args: &["run", "test"],
        trailing_args: &[],
        arg_style: ArgStyle::ScriptArgs,
        blocked_flags: &[],
        parsers: &[
            ParserKind::Pnpm,
            ParserKind::Typescript,
            ParserKind::Jest,
            ParserKind::Vitest,
        ],
        summary: SummaryKind::Node,
        success: SuccessRule::ZeroExit,
    },
    PluginSpec {
        name: "pnpm.run",
        description: "Run a pnpm script by name",
        mutates_workspace: true,
        program: "pnpm",
        base_args: &["run"],
        trailing_args: &[],
        arg_style: ArgStyle::NamedScript,
        blocked_flags: &[],
        parsers: &[ParserKind::Pnpm, ParserKind::Typescript],
        summary: SummaryKind::None,
        success: SuccessRule::ZeroExit,
    },
    PluginSpec {
        name: "eslint.lint",
        description: "Run ESLint over JavaScript/TypeScript files",
        mutates_workspace: false,
        program: "eslint",
        base_args: &[],
        trailing_args: &["--format", "json"],
        arg_style: ArgStyle::Append,
        blocked_flags: ESLINT_BLOCKED_FLAGS,
        parsers: &[ParserKind::Eslint],
        summary: SummaryKind::None,
        success: SuccessRule::ZeroOrOneExit,
    },
];

pub fn builtin_registry() -> Result<PluginRegistry, PluginError> {
    let mut registry = PluginRegistry::new();
    for spec in BUILTIN_PLUGINS {
        registry.register(*spec)?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_registers_every_plugin_once() {
        let registry = builtin_registry().expect("builtin catalog has unique names");
        assert_eq!(registry.list().count(), BUILTIN_PLUGINS.len());
        assert!(registry.get("dotnet.build").is_some());
        assert!(registry.get("made.up").is_none());
    }

    #[test]
    fn named_script_style_inserts_separator_before_script_args() {
        let spec = *BUILTIN_PLUGINS
            .iter()
            .find(|spec| spec.name == "npm.run")
            .expect("npm.run registered");
        let args = spec
            .command_args(&["lint".to_string(), "--fix".to_string()])
            .expect("valid script");
        assert_eq!(args, vec!["run", "lint", "--", "--fix"]);

        let bare = spec.command_args(&["lint".to_string()]).expect("valid script");
        assert_eq!(bare, vec!["run", "lint"]);

        assert!(matches!(
            spec.command_args(&[]),
            Err(PluginError::MissingScriptName)
        ));
        assert!(matches!(
            spec.command_args(&["bad name".to_string()]),
            Err(PluginError::InvalidScriptName(_))
        ));
    }

    #[test]
    fn eslint_blocks_flags_that_load_arbitrary_code() {
        let spec = *BUILTIN_PLUGINS
            .iter()
            .find(|spec| spec.name == "eslint.lint")
            .expect("eslint.lint registered");
        let args = spec
            .command_args(&["src/".to_string()])
            .expect("plain path allowed");
        assert_eq!(args, vec!["src/", "--format", "json"]);

        assert!(matches!(
            spec.command_args(&["--config".to_string(), "evil.js".to_string()]),
            Err(PluginError::BlockedFlag(_))
        ));
    }
}
