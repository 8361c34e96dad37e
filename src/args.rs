use clap::{Parser, Subcommand};

/// This is a survey administration program: participants, questions, votes and results.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. See the manual for the available keys.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, optional) The file holding the survey. Setting this option overrides the path
    /// that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub store: Option<String>,

    /// (url, optional) The prefix of the voting links. Setting this option overrides the value
    /// that may be specified with the --config option.
    #[clap(long, value_parser)]
    pub base_url: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Registers a participant and prints their voting link.
    Register {
        #[clap(long, value_parser)]
        email: String,
        #[clap(long, value_parser)]
        first_name: String,
        #[clap(long, value_parser)]
        last_name: String,
    },
    /// Registers all the participants listed in an Excel (.xlsx) file.
    /// The columns are: email, first name, last name. The first row is a header.
    Import {
        #[clap(short, long, value_parser)]
        input: String,
        /// (default: the first worksheet) The name of the worksheet to read.
        #[clap(long, value_parser)]
        worksheet: Option<String>,
    },
    /// Lists the participants with their voting links.
    Participants,
    /// Removes a participant. Their votes are kept.
    RemoveParticipant {
        #[clap(value_parser)]
        id: String,
    },
    /// Creates a question. The options "No sé" and "Ninguno" are added automatically.
    AddQuestion {
        #[clap(long, value_parser)]
        title: String,
        #[clap(long, value_parser)]
        description: Option<String>,
        /// One option of the question. Pass it at least twice.
        #[clap(long = "option", value_parser)]
        options: Vec<String>,
    },
    /// Removes a question and the votes cast on it.
    RemoveQuestion {
        #[clap(value_parser)]
        id: String,
    },
    /// Adds an option to a question.
    AddOption {
        #[clap(value_parser)]
        question_id: String,
        #[clap(value_parser)]
        text: String,
    },
    /// Removes an option from a question, with the votes cast for it.
    RemoveOption {
        #[clap(value_parser)]
        question_id: String,
        #[clap(value_parser)]
        option_id: String,
    },
    /// Lists the questions and their options.
    Questions,
    /// Tells whether a participant may vote: INVALID, ALREADY_VOTED or ELIGIBLE.
    Status {
        #[clap(long, value_parser)]
        email: Option<String>,
        /// (url) A voting link, as printed by the register command. Used when --email is missing.
        #[clap(long, value_parser)]
        link: Option<String>,
    },
    /// Votes on every question at once.
    Vote {
        #[clap(long, value_parser)]
        email: Option<String>,
        /// (url) A voting link, as printed by the register command. Used when --email is missing.
        #[clap(long, value_parser)]
        link: Option<String>,
        /// (<question-id>=<option id or text>) The answer to one question. Every question needs an answer.
        #[clap(long = "choice", value_parser)]
        choices: Vec<String>,
    },
    /// Prints the results of the survey in JSON format.
    Results {
        /// (file path, 'stdout' or empty) Where to write the summary.
        #[clap(short, long, value_parser)]
        out: Option<String>,
        /// (file path) A reference summary in JSON format. If provided, surveyctl will
        /// check that the computed summary matches the reference.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },
}
