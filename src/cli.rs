//! CLI argument parsing for the workshop binary.
use crate::report::ReportFormat;
use crate::stage::Stage;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "esgw",
    version,
    about = "LM-assisted ESG strategy workshop for social welfare centers",
    after_help = "Commands:\n  session                         Run the workshop shell (stdin or --script)\n  template --stage <stage>        Print the CSV upload template of a stage\n  report --doc <json>             Render the final report of a saved document\n\nExamples:\n  esgw session --lm 'llm -m gemini-2.5-flash'\n  esgw session --script workshop.txt --load team1.json\n  esgw template --stage diagnosis --bom --out template_diagnosis.csv\n  esgw report --doc team1.json --format html --out report.html\n\nLogging goes to stderr; set ESGW_LOG (e.g. ESGW_LOG=info) to change the level.",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Session(SessionArgs),
    Template(TemplateArgs),
    Report(ReportArgs),
}

/// Session inputs: backend selection plus the command source.
#[derive(Parser, Debug)]
#[command(about = "Run the workshop shell")]
pub struct SessionArgs {
    /// LM command; the prompt is written to its stdin (overrides ESGW_LM_COMMAND)
    #[arg(long, value_name = "CMD")]
    pub lm: Option<String>,

    /// Gemini model used when no LM command is set
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Webhook that receives the submitted document
    #[arg(long, value_name = "URL")]
    pub sink_url: Option<String>,

    /// Output language requested from the LM
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Config file (default: <config dir>/esgw/config.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Read commands from a file instead of stdin
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Start from a previously exported document
    #[arg(long, value_name = "PATH")]
    pub load: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Print a stage's CSV upload template")]
pub struct TemplateArgs {
    /// Stage name or number (diagnosis, swot, strategy, action_ideas, roadmap)
    #[arg(long, value_name = "STAGE")]
    pub stage: Stage,

    /// Prefix a UTF-8 byte order mark (for spreadsheet tools)
    #[arg(long)]
    pub bom: bool,

    /// Write to a file (or into a directory as template_<stage>.csv)
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Render the final report from a saved document")]
pub struct ReportArgs {
    /// Exported document JSON
    #[arg(long, value_name = "PATH")]
    pub doc: PathBuf,

    #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
    pub format: ReportFormat,

    /// Write to a file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}
