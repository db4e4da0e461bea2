use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wjf_core::flags::{FLAG_ONLY_IF_EXISTS, FLAG_VALIDATE_SCHEMA};
use wjf_core::{
    Action, ActionFlags, EditContext, EditOptions, EditRequest, EditScript, JsonFileError,
    ScriptRunner, StatusCode,
};

#[derive(Parser, Debug)]
#[command(
    name = "wjf",
    about = "Edit JSON files in place by JSONPath: set, delete, array ops, schema checks",
    version
)]
struct Cli {
    /// Edit options file (indent, trailing_newline, atomic_write, strict_actions)
    #[arg(long, global = true, value_name = "JSON")]
    config: Option<PathBuf>,
    #[command(flatten)]
    overrides: OptionOverrides,
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
    /// Log output format (written to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plaintext)]
    log_format: LogFormat,
    #[command(subcommand)]
    cmd: Cmd,
}

/// Per-run overrides applied on top of --config.
#[derive(ClapArgs, Debug, Default)]
struct OptionOverrides {
    /// Spaces per indentation level when writing
    #[arg(long, global = true)]
    indent: Option<usize>,
    /// End the written file with a newline
    #[arg(long, global = true)]
    trailing_newline: bool,
    /// Write the target directly instead of via temp file and rename
    #[arg(long, global = true)]
    no_atomic_write: bool,
    /// Fail when more than one action bit is set
    #[arg(long, global = true)]
    strict_actions: bool,
}

impl OptionOverrides {
    fn apply(&self, opts: &mut EditOptions) {
        if let Some(indent) = self.indent {
            opts.indent = indent;
        }
        opts.trailing_newline |= self.trailing_newline;
        opts.atomic_write &= !self.no_atomic_write;
        opts.strict_actions |= self.strict_actions;
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Apply one edit to a JSON file
    Apply(ApplyArgs),
    /// Print the first value matched by a JSONPath
    Get(GetArgs),
    /// Check a JSON file against a schema
    Validate(ValidateArgs),
    /// Run a script of JsonFile rows, rolling back on failure
    Run(RunArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogFormat {
    Plaintext,
    Json,
}

#[derive(ClapArgs, Debug)]
struct ApplyArgs {
    /// JSON file to edit in place
    file: PathBuf,
    /// JSONPath expression (JSON Pointer for --create)
    #[arg(long)]
    path: String,
    /// Value for set/create/append/insert/remove, raw JSON for replace
    #[arg(long, default_value = "")]
    value: String,
    /// Raw action bit set, as stored in the JsonFile table
    #[arg(long)]
    flags: Option<u32>,
    #[command(flatten)]
    actions: ActionSwitches,
    /// Insert position; negative prepends
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    index: i64,
    /// Schema file checked after the edit
    #[arg(long)]
    schema: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Default)]
struct ActionSwitches {
    #[arg(long)]
    delete: bool,
    #[arg(long)]
    set: bool,
    #[arg(long)]
    replace: bool,
    #[arg(long)]
    create: bool,
    #[arg(long)]
    append: bool,
    #[arg(long)]
    insert: bool,
    #[arg(long)]
    remove: bool,
    #[arg(long)]
    distinct: bool,
    /// Check the edited file against --schema
    #[arg(long)]
    validate: bool,
    /// Skip the edit when the path matches nothing
    #[arg(long)]
    only_if_exists: bool,
}

impl ActionSwitches {
    fn to_flags(&self) -> ActionFlags {
        let switches = [
            (self.delete, Action::DeleteValue),
            (self.set, Action::SetValue),
            (self.replace, Action::ReplaceJsonValue),
            (self.create, Action::CreateValue),
            (self.append, Action::AppendArray),
            (self.insert, Action::InsertArray),
            (self.remove, Action::RemoveArrayElement),
            (self.distinct, Action::DistinctValues),
        ];
        let mut flags = ActionFlags::default();
        for (on, action) in switches {
            if on {
                flags = flags.with_action(action);
            }
        }
        if self.validate {
            flags = flags.with(FLAG_VALIDATE_SCHEMA);
        }
        if self.only_if_exists {
            flags = flags.with(FLAG_ONLY_IF_EXISTS);
        }
        flags
    }
}

#[derive(ClapArgs, Debug)]
struct GetArgs {
    /// JSON file to read
    file: PathBuf,
    /// JSONPath expression
    #[arg(long)]
    path: String,
}

#[derive(ClapArgs, Debug)]
struct ValidateArgs {
    /// JSON file to check
    file: PathBuf,
    /// Schema file
    #[arg(long)]
    schema: PathBuf,
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// JSON array of JsonFile rows
    script: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_format);

    let ctx = match load_context(cli.config.as_deref(), &cli.overrides) {
        Ok(ctx) => ctx,
        Err(e) => return fail(&e),
    };
    let status = match cli.cmd {
        Cmd::Apply(a) => cmd_apply(&ctx, a),
        Cmd::Get(a) => cmd_get(a),
        Cmd::Validate(a) => cmd_validate(a),
        Cmd::Run(a) => cmd_run(&ctx, a),
    };
    exit_code(status)
}

fn init_logging(level: LogLevel, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let res = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init(),
        LogFormat::Plaintext => tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init(),
    };
    if let Err(e) = res {
        eprintln!("warning: logging not initialized: {}", e);
    }
}

fn load_context(config: Option<&Path>, overrides: &OptionOverrides) -> wjf_core::Result<EditContext> {
    let mut options = match config {
        Some(path) => EditOptions::from_file(path)?,
        None => EditOptions::default(),
    };
    overrides.apply(&mut options);
    Ok(EditContext::new(options))
}

fn exit_code(status: StatusCode) -> ExitCode {
    ExitCode::from(status.code() as u8)
}

fn fail(e: &JsonFileError) -> ExitCode {
    error!("{e}");
    exit_code(e.status())
}

fn cmd_apply(ctx: &EditContext, args: ApplyArgs) -> StatusCode {
    let switches = args.actions.to_flags();
    let flags = match args.flags {
        Some(bits) => ActionFlags::from_bits(bits | switches.bits()),
        None => switches,
    };
    let mut req = EditRequest::new(args.file, args.path, flags)
        .value(args.value)
        .index(args.index);
    if let Some(schema) = args.schema {
        req = req.schema(schema);
    }
    wjf_core::run_edit(ctx, &req)
}

fn cmd_get(args: GetArgs) -> StatusCode {
    match wjf_core::read(&args.file, &args.path) {
        Ok(Some(v)) => {
            println!("{}", v);
            StatusCode::Success
        }
        Ok(None) => {
            error!(path = %args.path, "not found");
            StatusCode::PathNotFound
        }
        Err(e) => {
            error!("{e}");
            e.status()
        }
    }
}

fn cmd_validate(args: ValidateArgs) -> StatusCode {
    match wjf_core::schema::validate_files(&args.file, &args.schema) {
        Ok(()) => StatusCode::Success,
        Err(e) => {
            error!(file = %args.file.display(), "{e}");
            e.status()
        }
    }
}

fn cmd_run(ctx: &EditContext, args: RunArgs) -> StatusCode {
    let script = match EditScript::load(&args.script) {
        Ok(s) => s,
        Err(e) => {
            error!("{e}");
            return e.status();
        }
    };
    match ScriptRunner::new(ctx).run(&script) {
        Ok(report) => {
            if !report.properties.is_empty() {
                match serde_json::to_string_pretty(&report.properties) {
                    Ok(s) => println!("{}", s),
                    Err(e) => {
                        error!("could not print properties: {e}");
                        return StatusCode::GenericFailure;
                    }
                }
            }
            StatusCode::Success
        }
        Err(e) => e.status(),
    }
}
