//! CLI support for non-command bits

use crate::cli::common::{load_host, resolve_program, Command};
use crate::{cli, project};
use clap::{AppSettings, Arg, ArgSettings};
use std::io;
use std::path::Path;
use std::str::FromStr;

const DEFAULT_PROJECT: &str = "functrace.json";

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_module("functrace", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .init();
}

pub fn main() -> io::Result<()> {
    let mut app = app_from_crate!().setting(AppSettings::SubcommandRequiredElseHelp);
    app = app.arg(
        Arg::with_name("program")
            .long("program")
            .value_name("myapp")
            .takes_value(true)
            .help("Which program to analyze")
            .set(ArgSettings::Global),
    );
    app = project::Program::configure_app(app);
    app = app.arg(
        Arg::with_name("project")
            .long("project")
            .value_name(DEFAULT_PROJECT)
            .takes_value(true)
            .help("The project file to load")
            .set(ArgSettings::Global),
    );
    app = app.arg(
        Arg::with_name("verbose")
            .short("v")
            .long("verbose")
            .help("Log every emulated instruction")
            .set(ArgSettings::Global),
    );

    for cmd in Command::enumerate().iter() {
        app = app.subcommand(cmd.into_clap_subcommand());
    }

    let matches = app.get_matches();
    init_logging(matches.is_present("verbose"));

    let project_filename = matches.value_of("project");
    let version = matches.value_of("program");
    let (prog, export_given) = project::Program::from_arg_matches(&matches);

    //A missing project file is only an error if one was asked for.
    let project = match project::Project::read(project_filename.unwrap_or(DEFAULT_PROJECT)) {
        Ok(project) => project,
        Err(crate::error::Error::Io(ref e))
            if e.kind() == io::ErrorKind::NotFound && project_filename.is_none() =>
        {
            project::Project::default()
        }
        Err(e) => return Err(e.into()),
    };
    let project_dir = Path::new(project_filename.unwrap_or(DEFAULT_PROJECT))
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .to_path_buf();

    let (command, submatches) = matches.subcommand();
    let command = Command::from_str(command).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("Unknown command {}", command))
    })?;
    let submatches = submatches.ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "Did not provide a command")
    })?;

    let prog = resolve_program(&project, version, prog, export_given)?;
    let host = load_host(&prog, &project_dir)?;

    match command {
        Command::Blocks => cli::blocks(host, &prog, submatches)?,
        Command::Paths => cli::paths(host, &prog, submatches)?,
        Command::Trace => cli::trace(host, &prog, submatches)?,
    };

    Ok(())
}
