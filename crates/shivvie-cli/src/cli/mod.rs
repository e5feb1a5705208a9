//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "shivvie",
    bin_name = "shivvie",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "\u{26a1} Composable scaffolding modules",
    long_about = "Shivvie resolves a scaffolding module from a local path, a git \
                  repository or the npm registry, validates your input against \
                  its schema and applies the actions it produces.",
    after_help = "EXAMPLES:\n\
        \x20 shivvie exec ./modules/rust-lib my-lib --data '{ name: \"my-lib\" }'\n\
        \x20 shivvie exec gh:acme/kits#v2/rust/lib my-lib -d '{ name: \"my-lib\" }'\n\
        \x20 shivvie exec npm:@acme/react-kit app --dry-run\n\
        \x20 shivvie info gh:acme/kits/rust/lib\n\
        \x20 shivvie completions bash > /usr/share/bash-completion/completions/shivvie",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute a module against a target directory.
    #[command(
        visible_alias = "x",
        about = "Execute a module",
        after_help = "MODULE REFERENCES:\n\
            \x20 ./path, file:./path            local directory\n\
            \x20 gh:owner/repo[#ref][/subpath]  git repository\n\
            \x20 npm:[@scope/]name              npm package\n\n\
            EXAMPLES:\n\
            \x20 shivvie exec ./modules/lib out --data '{ name: \"core\" }'\n\
            \x20 shivvie exec gh:acme/kits#main/web site --dry-run"
    )]
    Exec(ExecArgs),

    /// Describe a module and the input it expects.
    #[command(
        visible_alias = "i",
        about = "Show module information",
        after_help = "EXAMPLES:\n\
            \x20 shivvie info ./modules/lib\n\
            \x20 shivvie info npm:@acme/react-kit --format json"
    )]
    Info(InfoArgs),

    /// Initialise a Shivvie configuration file.
    #[command(
        about = "Initialise configuration",
        after_help = "EXAMPLES:\n\
            \x20 shivvie init          # default location\n\
            \x20 shivvie init --force  # overwrite an existing file"
    )]
    Init(InitArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 shivvie completions bash > ~/.local/share/bash-completion/completions/shivvie\n\
            \x20 shivvie completions zsh  > ~/.zfunc/_shivvie\n\
            \x20 shivvie completions fish > ~/.config/fish/completions/shivvie.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the Shivvie configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 shivvie config get engine.max_delegate_depth\n\
            \x20 shivvie config list\n\
            \x20 shivvie config path"
    )]
    Config(ConfigCommands),
}

// ── exec ──────────────────────────────────────────────────────────────────────

/// Arguments for `shivvie exec`.
#[derive(Debug, Args)]
pub struct ExecArgs {
    /// Module reference: a path, `file:`, `gh:` or `npm:` URI.
    #[arg(value_name = "MODULE", help = "Module reference")]
    pub module: String,

    /// Directory the module writes into. Created if missing.
    #[arg(value_name = "TARGET", help = "Target directory")]
    pub target: PathBuf,

    /// Module input as a JSON5 object.
    #[arg(
        short = 'd',
        long = "data",
        value_name = "JSON5",
        default_value = "{}",
        help = "Module input (JSON5 object)"
    )]
    pub data: String,

    /// Print the actions without applying them.
    #[arg(long = "dry-run", help = "Show the planned actions without applying them")]
    pub dry_run: bool,
}

// ── info ──────────────────────────────────────────────────────────────────────

/// Arguments for `shivvie info`.
#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Module reference: a path, `file:`, `gh:` or `npm:` URI.
    #[arg(value_name = "MODULE", help = "Module reference")]
    pub module: String,

    /// Output format.
    #[arg(
        long = "format",
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: InfoFormat,
}

/// Output format for the `info` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InfoFormat {
    /// Labelled lines.
    Human,
    /// A single JSON object.
    Json,
}

// ── init ──────────────────────────────────────────────────────────────────────

/// Arguments for `shivvie init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(short = 'f', long = "force", help = "Overwrite existing configuration")]
    pub force: bool,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `shivvie completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `shivvie config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `engine.shell`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the active configuration file.
    Path,
}

// ── tests ─────────────────────────────────────────────────────────────────────
