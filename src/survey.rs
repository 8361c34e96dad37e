use std::fs;
use std::io::Write;

use log::{debug, info, warn};
use snafu::{prelude::*, Snafu};
use survey_store::links::{email_from_link, vote_link};
use survey_store::*;

use crate::args::{Args, Command};

pub mod config_reader;
pub mod io_xlsx;
pub mod report;

pub use crate::survey::config_reader::Settings;

#[derive(Debug, Snafu)]
pub enum CliError {
    #[snafu(display("Error opening config file {path}"))]
    OpeningConfig {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing config file {path}"))]
    ParsingConfig {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet {name} in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("The file {path} has no data"))]
    EmptyExcel { path: String },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error encoding the summary"))]
    EncodingSummary { source: serde_json::Error },
    #[snafu(display("Error writing the output"))]
    WritingOutput { source: std::io::Error },
    #[snafu(display("Survey operation failed"))]
    Store { source: StoreError },
    #[snafu(display("Cannot vote: {status}"))]
    CannotVote { status: VoterStatus },
    #[snafu(display("Invalid choice '{choice}': expected <question-id>=<option>"))]
    InvalidChoice { choice: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type CliResult<T> = Result<T, CliError>;

pub fn run(args: &Args) -> CliResult<()> {
    let settings = config_reader::load_settings(args)?;
    let storage = JsonFileStorage::new(&settings.store_path);
    let mut store = SurveyStore::open(storage, RandomIds).context(StoreSnafu {})?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&mut store, &settings, &args.command, &mut out)
}

/// Runs one command against an opened store. Human-readable output goes to `out`.
pub fn execute<S, G, W>(
    store: &mut SurveyStore<S, G>,
    settings: &Settings,
    command: &Command,
    out: &mut W,
) -> CliResult<()>
where
    S: SnapshotStorage,
    G: IdGenerator,
    W: Write,
{
    debug!("execute: {:?}", command);
    match command {
        Command::Register {
            email,
            first_name,
            last_name,
        } => {
            store
                .register_participant(email, first_name, last_name)
                .context(StoreSnafu {})?;
            writeln!(out, "{}", vote_link(&settings.base_url, email)).context(WritingOutputSnafu {})?;
        }
        Command::Import { input, worksheet } => {
            let entries = io_xlsx::read_roster(input, worksheet.as_deref())?;
            info!("Read {} participant(s) from {}", entries.len(), input);
            let mut registered = 0;
            for entry in entries.iter() {
                match store.register_participant(&entry.email, &entry.first_name, &entry.last_name)
                {
                    Ok(_) => {
                        registered += 1;
                        writeln!(
                            out,
                            "{}\t{}",
                            entry.email,
                            vote_link(&settings.base_url, &entry.email)
                        )
                        .context(WritingOutputSnafu {})?;
                    }
                    Err(e) if e.is_rejection() => {
                        warn!("row {}: {}", entry.row, e);
                        writeln!(out, "skipped row {}: {}", entry.row, e)
                            .context(WritingOutputSnafu {})?;
                    }
                    Err(e) => return Err(e).context(StoreSnafu {}),
                }
            }
            writeln!(out, "registered {} of {}", registered, entries.len())
                .context(WritingOutputSnafu {})?;
        }
        Command::Participants => {
            for p in store.participants() {
                let state = if p.has_voted { "voted" } else { "pending" };
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}",
                    p.id,
                    p.email,
                    p.full_name(),
                    state,
                    vote_link(&settings.base_url, &p.email)
                )
                .context(WritingOutputSnafu {})?;
            }
        }
        Command::RemoveParticipant { id } => {
            store
                .remove_participant(&ParticipantId(id.clone()))
                .context(StoreSnafu {})?;
        }
        Command::AddQuestion {
            title,
            description,
            options,
        } => {
            let texts: Vec<&str> = options.iter().map(|s| s.as_str()).collect();
            let id = store
                .add_question(title, description.as_deref(), &texts)
                .context(StoreSnafu {})?;
            writeln!(out, "{}", id).context(WritingOutputSnafu {})?;
        }
        Command::RemoveQuestion { id } => {
            store
                .remove_question(&QuestionId(id.clone()))
                .context(StoreSnafu {})?;
        }
        Command::AddOption { question_id, text } => {
            let id = store
                .add_option_to_question(&QuestionId(question_id.clone()), text)
                .context(StoreSnafu {})?;
            writeln!(out, "{}", id).context(WritingOutputSnafu {})?;
        }
        Command::RemoveOption {
            question_id,
            option_id,
        } => {
            store
                .remove_option_from_question(
                    &QuestionId(question_id.clone()),
                    &OptionId(option_id.clone()),
                )
                .context(StoreSnafu {})?;
        }
        Command::Questions => {
            for q in store.questions() {
                writeln!(out, "{}\t{}", q.id, q.title).context(WritingOutputSnafu {})?;
                if let Some(d) = &q.description {
                    writeln!(out, "\t{}", d).context(WritingOutputSnafu {})?;
                }
                for o in q.options.iter() {
                    let mark = if q.is_protected(&o.id) { " (protected)" } else { "" };
                    writeln!(out, "  {}\t{}\t{}{}", o.id, o.text, o.votes, mark)
                        .context(WritingOutputSnafu {})?;
                }
            }
        }
        Command::Status { email, link } => {
            let email = resolve_email(email, link);
            let status = store.voter_status(email.as_deref());
            writeln!(out, "{}", status).context(WritingOutputSnafu {})?;
        }
        Command::Vote {
            email,
            link,
            choices,
        } => {
            let email = resolve_email(email, link);
            let status = store.voter_status(email.as_deref());
            let email = match (status, email) {
                (VoterStatus::Eligible, Some(e)) => e,
                (status, _) => return CannotVoteSnafu { status }.fail(),
            };
            let mut builder = BallotBuilder::new(store.questions());
            for choice in choices.iter() {
                let (question_id, option_id) = parse_choice(store.questions(), choice)?;
                builder
                    .select(&question_id, &option_id)
                    .context(StoreSnafu {})?;
            }
            let ballot = builder.build().context(StoreSnafu {})?;
            store.submit_ballot(&email, &ballot).context(StoreSnafu {})?;
            writeln!(out, "{}", VoterStatus::Submitted).context(WritingOutputSnafu {})?;
        }
        Command::Results { out: dest, reference } => {
            let summary = report::build_summary_js(settings, store.snapshot());
            let pretty = serde_json::to_string_pretty(&summary).context(EncodingSummarySnafu {})?;
            match dest.as_deref() {
                None | Some("stdout") => {
                    writeln!(out, "{}", pretty).context(WritingOutputSnafu {})?;
                }
                Some(path) => {
                    info!("Writing summary to {}", path);
                    fs::write(path, &pretty).context(WritingFileSnafu { path })?;
                }
            }
            if let Some(reference_path) = reference {
                report::check_reference(&pretty, reference_path)?;
            }
        }
    }
    Ok(())
}

fn resolve_email(email: &Option<String>, link: &Option<String>) -> Option<String> {
    match (email, link) {
        (Some(e), _) => Some(e.clone()),
        (None, Some(l)) => email_from_link(l),
        (None, None) => None,
    }
}

/// Reads `<question-id>=<option>`, where the option is given by id or by its text.
fn parse_choice(questions: &[SurveyQuestion], choice: &str) -> CliResult<(QuestionId, OptionId)> {
    let (q, o) = choice
        .split_once('=')
        .context(InvalidChoiceSnafu { choice })?;
    let (q, o) = (q.trim(), o.trim());
    ensure!(!q.is_empty() && !o.is_empty(), InvalidChoiceSnafu { choice });
    let question_id = QuestionId(q.to_string());
    let option_id = questions
        .iter()
        .find(|question| question.id == question_id)
        .and_then(|question| {
            question
                .options
                .iter()
                .find(|opt| opt.id.0 == o)
                .or_else(|| question.options.iter().find(|opt| opt.text == o))
        })
        .map(|opt| opt.id.clone())
        .unwrap_or_else(|| OptionId(o.to_string()));
    Ok((question_id, option_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    type TestStore = SurveyStore<MemoryStorage, SequentialIds>;

    fn setup() -> (TestStore, Settings) {
        let _ = env_logger::builder().is_test(true).try_init();
        let store = SurveyStore::open(MemoryStorage::new(), SequentialIds::new()).unwrap();
        let settings = Settings {
            store_path: PathBuf::from("unused.json"),
            base_url: "https://survey.example/".to_string(),
            survey_name: "Games".to_string(),
        };
        (store, settings)
    }

    fn run_cmd(store: &mut TestStore, settings: &Settings, command: Command) -> CliResult<String> {
        let mut out: Vec<u8> = Vec::new();
        execute(store, settings, &command, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn register(store: &mut TestStore, settings: &Settings, email: &str) -> CliResult<String> {
        run_cmd(
            store,
            settings,
            Command::Register {
                email: email.to_string(),
                first_name: "Ana".to_string(),
                last_name: "Lee".to_string(),
            },
        )
    }

    fn add_question(store: &mut TestStore, settings: &Settings, title: &str) -> String {
        run_cmd(
            store,
            settings,
            Command::AddQuestion {
                title: title.to_string(),
                description: None,
                options: vec!["RPG".to_string(), "FPS".to_string()],
            },
        )
        .unwrap()
        .trim()
        .to_string()
    }

    fn vote(
        store: &mut TestStore,
        settings: &Settings,
        email: &str,
        choices: Vec<String>,
    ) -> CliResult<String> {
        run_cmd(
            store,
            settings,
            Command::Vote {
                email: Some(email.to_string()),
                link: None,
                choices,
            },
        )
    }

    #[test]
    fn register_prints_link() {
        let (mut store, settings) = setup();
        let out = register(&mut store, &settings, "ana+1@x.com").unwrap();
        assert_eq!(out.trim(), "https://survey.example/vote?email=ana%2B1%40x.com");

        let res = register(&mut store, &settings, "ANA+1@x.com");
        assert!(matches!(
            res,
            Err(CliError::Store {
                source: StoreError::DuplicateEmail { .. }
            })
        ));
    }

    #[test]
    fn full_voting_flow() {
        let (mut store, settings) = setup();
        let link = register(&mut store, &settings, "a@x.com").unwrap();
        let q1 = add_question(&mut store, &settings, "Favorite genre?");
        let q2 = add_question(&mut store, &settings, "Favorite platform?");

        let status = run_cmd(
            &mut store,
            &settings,
            Command::Status {
                email: None,
                link: Some(link.trim().to_string()),
            },
        )
        .unwrap();
        assert_eq!(status.trim(), "ELIGIBLE");

        // Missing an answer: nothing is recorded.
        let res = vote(&mut store, &settings, "a@x.com", vec![format!("{}=RPG", q1)]);
        assert!(matches!(
            res,
            Err(CliError::Store {
                source: StoreError::IncompleteBallot { .. }
            })
        ));
        assert!(store.votes().is_empty());

        let out = vote(
            &mut store,
            &settings,
            "A@x.com",
            vec![format!("{}=RPG", q1), format!("{}=Ninguno", q2)],
        )
        .unwrap();
        assert_eq!(out.trim(), "SUBMITTED");
        assert_eq!(store.votes().len(), 2);
        let q2_id = QuestionId(q2.clone());
        assert_eq!(store.tally(&q2_id)[3].1, 1);

        let res = vote(&mut store, &settings, "a@x.com", vec![format!("{}=FPS", q1), format!("{}=FPS", q2)]);
        assert!(matches!(
            res,
            Err(CliError::CannotVote {
                status: VoterStatus::AlreadyVoted
            })
        ));
        let res = vote(&mut store, &settings, "ghost@x.com", vec![format!("{}=FPS", q1)]);
        assert!(matches!(
            res,
            Err(CliError::CannotVote {
                status: VoterStatus::Invalid
            })
        ));
    }

    #[test]
    fn malformed_choice() {
        let (mut store, settings) = setup();
        register(&mut store, &settings, "a@x.com").unwrap();
        add_question(&mut store, &settings, "Q");
        let res = vote(&mut store, &settings, "a@x.com", vec!["RPG".to_string()]);
        assert!(matches!(res, Err(CliError::InvalidChoice { .. })));
    }

    #[test]
    fn protected_option_removal_is_refused() {
        let (mut store, settings) = setup();
        let q = add_question(&mut store, &settings, "Q");
        let protected = store.question(&QuestionId(q.clone())).unwrap().options[2].id.clone();
        let res = run_cmd(
            &mut store,
            &settings,
            Command::RemoveOption {
                question_id: q.clone(),
                option_id: protected.0,
            },
        );
        assert!(matches!(
            res,
            Err(CliError::Store {
                source: StoreError::ProtectedOption { .. }
            })
        ));

        let listing = run_cmd(&mut store, &settings, Command::Questions).unwrap();
        assert!(listing.contains("No sé\t0 (protected)"));
        assert!(listing.contains("RPG\t0\n"));
    }

    #[test]
    fn results_to_stdout() {
        let (mut store, settings) = setup();
        register(&mut store, &settings, "a@x.com").unwrap();
        let q = add_question(&mut store, &settings, "Q");
        vote(&mut store, &settings, "a@x.com", vec![format!("{}=FPS", q)]).unwrap();
        let out = run_cmd(
            &mut store,
            &settings,
            Command::Results {
                out: None,
                reference: None,
            },
        )
        .unwrap();
        let js: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(js["survey"], "Games");
        assert_eq!(js["results"][0]["options"][0]["text"], "FPS");
        assert_eq!(js["stats"]["participationRate"], 100);
    }

    #[test]
    fn choice_by_text_or_id() {
        let (mut store, settings) = setup();
        let q = add_question(&mut store, &settings, "Q");
        let questions = store.questions();
        let fps = questions[0].options[1].id.clone();
        assert_eq!(
            parse_choice(questions, &format!("{}=FPS", q)).unwrap(),
            (QuestionId(q.clone()), fps.clone())
        );
        assert_eq!(
            parse_choice(questions, &format!("{} = {}", q, fps)).unwrap(),
            (QuestionId(q.clone()), fps)
        );
        assert!(parse_choice(questions, "=FPS").is_err());
    }
}
