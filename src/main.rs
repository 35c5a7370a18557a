mod args;
mod polls;

use clap::Parser;
use log::debug;
use snafu::ErrorCompat;

use crate::args::{AnalysisArgs, Args, Command};
use crate::polls::config_reader::{read_settings, Settings};
use crate::polls::{AnalysisKind, AnalysisOptions, PollsResult};

fn analysis_options(settings: &Settings, args: &AnalysisArgs) -> PollsResult<AnalysisOptions> {
    Ok(AnalysisOptions {
        data_path: settings.data_path(&args.data),
        output_directory: settings.output_directory(&args.out_dir),
        chart_size: settings.chart_size()?,
        rules: settings.rules()?,
        summary: args.summary.clone(),
        reference: args.reference.clone(),
    })
}

fn run(args: &Args) -> PollsResult<()> {
    let settings = match args.config.as_deref() {
        Some(path) => read_settings(path)?,
        None => Settings::default(),
    };

    let (kind, analysis_args) = match &args.command {
        Command::Convert { input, output } => {
            return polls::run_convert(&settings.csv_path(input), &settings.data_path(output));
        }
        Command::LovedRate(a) => (AnalysisKind::LovedRate, a),
        Command::Participation(a) => (AnalysisKind::Participation, a),
        Command::Cycle(a) => (AnalysisKind::Cycle, a),
    };
    let opts = analysis_options(&settings, analysis_args)?;
    debug!("run: options {:?}", opts);
    polls::run_analysis(kind, &opts)?;
    Ok(())
}

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }
    debug!("args: {:?}", args);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("{:?}", bt);
        }
        std::process::exit(1);
    }
}
