use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, BufReader, IsTerminal};

mod catalog;
mod cli;
mod config;
mod document;
mod gateway;
mod ideas;
mod report;
mod roadmap;
mod score;
mod session;
mod shell;
mod sink;
mod stage;
mod strategy;
mod swot;
mod template;
mod util;

use cli::{Command, ReportArgs, RootArgs, SessionArgs, TemplateArgs};
use config::{Config, ConfigOverrides};
use session::WorkshopSession;
use shell::Shell;

const LOG_ENV: &str = "ESGW_LOG";

fn main() -> Result<()> {
    init_tracing();
    let args = RootArgs::parse();
    match args.command {
        Command::Session(args) => cmd_session(args),
        Command::Template(args) => cmd_template(args),
        Command::Report(args) => cmd_report(args),
    }
}

/// Events go to stderr so shell and report output on stdout stay clean.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn cmd_session(args: SessionArgs) -> Result<()> {
    let config = Config::resolve(&ConfigOverrides {
        config_path: args.config,
        lm_command: args.lm,
        gemini_model: args.model,
        sink_url: args.sink_url,
        language: args.language,
    })?;
    let gateway = config.gateway();
    let sink = config.sink();
    let mut session = match &args.load {
        Some(path) => {
            WorkshopSession::with_document(session::read_document(path)?, gateway, sink)
        }
        None => WorkshopSession::new(gateway, sink),
    };

    let stdout = io::stdout();
    match &args.script {
        Some(path) => {
            let file = fs::File::open(path)
                .with_context(|| format!("open script {}", path.display()))?;
            Shell::new(BufReader::new(file), stdout.lock(), false).run(&mut session)
        }
        None => {
            let stdin = io::stdin();
            let prompt = stdin.is_terminal();
            Shell::new(stdin.lock(), stdout.lock(), prompt).run(&mut session)
        }
    }
}

fn cmd_template(args: TemplateArgs) -> Result<()> {
    let body = template::render_template(args.stage, args.bom)
        .ok_or_else(|| anyhow!("the {} stage has no upload template", args.stage))?;
    match &args.out {
        Some(out) => {
            let path = if out.is_dir() {
                out.join(template::template_file_name(args.stage))
            } else {
                out.clone()
            };
            fs::write(&path, &body).with_context(|| format!("write {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{body}"),
    }
    Ok(())
}

fn cmd_report(args: ReportArgs) -> Result<()> {
    let document = session::read_document(&args.doc)?;
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    let rendered = report::render(&document, args.format, &date);
    match &args.out {
        Some(path) => {
            fs::write(path, &rendered).with_context(|| format!("write {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
