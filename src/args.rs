use clap::{Parser, Subcommand};

/// Converts community poll histories and charts them per game mode.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file with default paths, chart size and analysis rules.
    /// Flags given on the command line take precedence over its content.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Converts the CSV export of the poll history to the serialized array.
    Convert {
        /// (file path, default data/poll_history.csv) The CSV export, with a header row.
        #[clap(short, long, value_parser)]
        input: Option<String>,
        /// (file path, default data/player_skills.npy) Where to write the serialized array.
        #[clap(short, long, value_parser)]
        output: Option<String>,
    },
    /// Share of maps loved against the yes-vote threshold.
    LovedRate(AnalysisArgs),
    /// Yes-vote ratio against the number of votes.
    Participation(AnalysisArgs),
    /// Number of votes against the voting cycle.
    Cycle(AnalysisArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnalysisArgs {
    /// (file path, default data/player_skills.npy) The serialized poll history.
    #[clap(short, long, value_parser)]
    pub data: Option<String>,

    /// (directory, default data) Where the chart is written.
    #[clap(long, value_parser)]
    pub out_dir: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the analysis will be written
    /// in JSON format to the given location. With 'stdout', the cutoff table is not printed.
    #[clap(short, long, value_parser)]
    pub summary: Option<String>,

    /// (file path) A reference file containing the summary in JSON format. If provided, lovedpolls
    /// will check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,
}
