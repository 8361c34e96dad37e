/*!
State store for single-tenant surveys.

The [SurveyStore] owns the participants, the questions and the votes of one
survey. Every operation checks the integrity rules of the survey before
touching anything:

* an email (compared case-insensitively) is registered at most once;
* every question ends with the two protected options "No sé" and "Ninguno";
* a participant votes once: after their first vote, every further vote is refused.

The state is written through a [SnapshotStorage] after every successful
mutation, and read back from it when the store is opened.

```
use survey_store::*;

let mut store = SurveyStore::open(MemoryStorage::new(), SequentialIds::new())?;
store.register_participant("a@x.com", "Ana", "Lee")?;
let q = store.add_question("Favorite genre?", None, &["RPG", "FPS"])?;
let rpg = store.question(&q).unwrap().options[0].id.clone();

store.submit_vote("A@X.com", &q, &rpg)?;
assert!(store.has_voted("a@x.com"));
assert_eq!(store.tally(&q)[0], (rpg, 1));
# Ok::<(), StoreError>(())
```
*/

mod model;

pub mod builder;
pub mod ids;
pub mod links;
pub mod manual;
pub mod results;
pub mod storage;

use chrono::Utc;
use log::{debug, info};
use snafu::prelude::*;

pub use crate::builder::{Ballot, BallotBuilder};
pub use crate::ids::{IdGenerator, IdKind, RandomIds, SequentialIds};
pub use crate::model::*;
pub use crate::storage::{JsonFileStorage, MemoryStorage, SnapshotStorage, StorageError};

pub type StoreResult<T> = Result<T, StoreError>;

/// The survey aggregate: all the state of a survey and the operations that change it.
///
/// Mutations are prepared on a copy of the state and only adopted once the
/// storage accepted the new snapshot.
pub struct SurveyStore<S: SnapshotStorage, G: IdGenerator> {
    snapshot: Snapshot,
    storage: S,
    ids: G,
}

impl<S: SnapshotStorage, G: IdGenerator> SurveyStore<S, G> {
    /// Opens a store over the given storage, restoring the saved snapshot if there is one.
    pub fn open(storage: S, mut ids: G) -> StoreResult<SurveyStore<S, G>> {
        let snapshot = storage.load().context(StorageSnafu {})?.unwrap_or_default();
        reserve_ids(&snapshot, &mut ids);
        info!(
            "Opened survey: {} participants, {} questions, {} votes",
            snapshot.participants.len(),
            snapshot.questions.len(),
            snapshot.votes.len()
        );
        Ok(SurveyStore {
            snapshot,
            storage,
            ids,
        })
    }

    fn commit(&mut self, next: Snapshot) -> StoreResult<()> {
        self.storage.save(&next).context(StorageSnafu {})?;
        self.snapshot = next;
        Ok(())
    }

    // **** Accessors ****

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn participants(&self) -> &[Participant] {
        &self.snapshot.participants
    }

    pub fn questions(&self) -> &[SurveyQuestion] {
        &self.snapshot.questions
    }

    pub fn votes(&self) -> &[Vote] {
        &self.snapshot.votes
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn question(&self, id: &QuestionId) -> Option<&SurveyQuestion> {
        self.snapshot.questions.iter().find(|q| q.id == *id)
    }

    pub fn participant_by_email(&self, email: &str) -> Option<&Participant> {
        let normalized = normalize_email(email);
        self.snapshot
            .participants
            .iter()
            .find(|p| p.matches_email(&normalized))
    }

    // **** Participants ****

    /// Registers a new participant.
    ///
    /// Fails with [StoreError::DuplicateEmail] if the email is already
    /// registered, whatever its casing.
    pub fn register_participant(
        &mut self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> StoreResult<ParticipantId> {
        let (email, first_name, last_name) = (email.trim(), first_name.trim(), last_name.trim());
        ensure!(!email.is_empty(), EmptyFieldSnafu { field: "email" });
        ensure!(!first_name.is_empty(), EmptyFieldSnafu { field: "first name" });
        ensure!(!last_name.is_empty(), EmptyFieldSnafu { field: "last name" });
        ensure!(
            !self.is_registered(email),
            DuplicateEmailSnafu { email }
        );

        let id = ParticipantId(self.ids.next_id(IdKind::Participant));
        let participant = Participant {
            id: id.clone(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            created_at: Utc::now(),
            // Votes outlive their participant: a returning email keeps its vote.
            has_voted: self.has_voted(email),
        };
        let mut next = self.snapshot.clone();
        next.participants.push(participant);
        self.commit(next)?;
        info!("Registered participant {} ({})", id, email);
        Ok(id)
    }

    /// Removes a participant. Their votes are kept.
    pub fn remove_participant(&mut self, id: &ParticipantId) -> StoreResult<()> {
        ensure!(
            self.snapshot.participants.iter().any(|p| p.id == *id),
            UnknownParticipantSnafu { id: id.clone() }
        );
        let mut next = self.snapshot.clone();
        next.participants.retain(|p| p.id != *id);
        self.commit(next)?;
        info!("Removed participant {}", id);
        Ok(())
    }

    // **** Questions ****

    /// Creates a question with the given options, followed by the protected options.
    ///
    /// Blank option texts are dropped. At least two options must remain.
    pub fn add_question(
        &mut self,
        title: &str,
        description: Option<&str>,
        option_texts: &[&str],
    ) -> StoreResult<QuestionId> {
        let title = title.trim();
        ensure!(!title.is_empty(), EmptyTitleSnafu {});
        let texts: Vec<&str> = option_texts
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        ensure!(texts.len() >= 2, TooFewOptionsSnafu { given: texts.len() });

        let mut options: Vec<SurveyOption> = Vec::new();
        for text in texts.into_iter().chain(PROTECTED_OPTIONS) {
            options.push(SurveyOption {
                id: OptionId(self.ids.next_id(IdKind::Option)),
                text: text.to_string(),
                votes: 0,
            });
        }
        let id = QuestionId(self.ids.next_id(IdKind::Question));
        let question = SurveyQuestion {
            id: id.clone(),
            title: title.to_string(),
            description: description
                .map(|d| d.trim())
                .filter(|d| !d.is_empty())
                .map(|d| d.to_string()),
            options,
            created_at: Utc::now(),
        };
        debug!("add_question: {:?}", question);
        let mut next = self.snapshot.clone();
        next.questions.push(question);
        self.commit(next)?;
        info!("Added question {}: {}", id, title);
        Ok(id)
    }

    /// Removes a question and all the votes cast on it.
    pub fn remove_question(&mut self, id: &QuestionId) -> StoreResult<()> {
        ensure!(
            self.question(id).is_some(),
            UnknownQuestionSnafu { id: id.clone() }
        );
        let mut next = self.snapshot.clone();
        next.questions.retain(|q| q.id != *id);
        let before = next.votes.len();
        next.votes.retain(|v| v.question_id != *id);
        let dropped = before - next.votes.len();
        self.commit(next)?;
        info!("Removed question {} and {} vote(s)", id, dropped);
        Ok(())
    }

    /// Adds an option just before the protected options.
    pub fn add_option_to_question(
        &mut self,
        question_id: &QuestionId,
        text: &str,
    ) -> StoreResult<OptionId> {
        let text = text.trim();
        ensure!(!text.is_empty(), EmptyFieldSnafu { field: "option" });
        let position = self
            .question_position(question_id)
            .context(UnknownQuestionSnafu {
                id: question_id.clone(),
            })?;

        let option_id = OptionId(self.ids.next_id(IdKind::Option));
        let mut next = self.snapshot.clone();
        let question = &mut next.questions[position];
        let idx = question.insertion_index();
        question.options.insert(
            idx,
            SurveyOption {
                id: option_id.clone(),
                text: text.to_string(),
                votes: 0,
            },
        );
        self.commit(next)?;
        info!(
            "Added option {} to question {} at position {}",
            option_id, question_id, idx
        );
        Ok(option_id)
    }

    /// Removes an option from a question, together with the votes cast for it.
    ///
    /// The protected options cannot be removed.
    pub fn remove_option_from_question(
        &mut self,
        question_id: &QuestionId,
        option_id: &OptionId,
    ) -> StoreResult<()> {
        let position = self
            .question_position(question_id)
            .context(UnknownQuestionSnafu {
                id: question_id.clone(),
            })?;
        let question = &self.snapshot.questions[position];
        let option = question.option(option_id).context(UnknownOptionSnafu {
            question: question_id.clone(),
            option: option_id.clone(),
        })?;
        ensure!(
            !question.is_protected(option_id),
            ProtectedOptionSnafu {
                question: question_id.clone(),
                text: option.text.clone(),
            }
        );

        let mut next = self.snapshot.clone();
        next.questions[position]
            .options
            .retain(|o| o.id != *option_id);
        next.votes
            .retain(|v| !(v.question_id == *question_id && v.option_id == *option_id));
        self.commit(next)?;
        info!("Removed option {} from question {}", option_id, question_id);
        Ok(())
    }

    fn question_position(&self, id: &QuestionId) -> Option<usize> {
        self.snapshot.questions.iter().position(|q| q.id == *id)
    }

    // **** Votes ****

    /// True if any vote was recorded for this email, on any question.
    pub fn has_voted(&self, email: &str) -> bool {
        let normalized = normalize_email(email);
        self.snapshot
            .votes
            .iter()
            .any(|v| v.participant_email == normalized)
    }

    pub fn is_registered(&self, email: &str) -> bool {
        self.participant_by_email(email).is_some()
    }

    /// The entry gate of the voting flow for the given email.
    pub fn voter_status(&self, email: Option<&str>) -> VoterStatus {
        match email.map(str::trim) {
            None | Some("") => VoterStatus::Invalid,
            Some(e) if !self.is_registered(e) => VoterStatus::Invalid,
            Some(e) if self.voting_closed(e) => VoterStatus::AlreadyVoted,
            Some(_) => VoterStatus::Eligible,
        }
    }

    /// Records a single vote.
    ///
    /// The participant must be registered and must not have voted yet, on
    /// any question. Use [SurveyStore::submit_ballot] to vote on all the
    /// questions at once.
    pub fn submit_vote(
        &mut self,
        email: &str,
        question_id: &QuestionId,
        option_id: &OptionId,
    ) -> StoreResult<VoteId> {
        let normalized = self.check_eligible(email)?;
        self.check_selection(question_id, option_id)?;

        let mut next = self.snapshot.clone();
        let vote_id = record_vote(&mut next, &mut self.ids, &normalized, question_id, option_id);
        self.commit(next)?;
        info!("Recorded vote {} of {}", vote_id, normalized);
        Ok(vote_id)
    }

    /// Records one vote per question for a participant, all or nothing.
    ///
    /// The ballot must answer every current question. If any check fails,
    /// no vote is recorded.
    pub fn submit_ballot(&mut self, email: &str, ballot: &Ballot) -> StoreResult<Vec<VoteId>> {
        let normalized = self.check_eligible(email)?;
        ensure!(!self.snapshot.questions.is_empty(), NoQuestionsSnafu {});
        let missing: Vec<QuestionId> = self
            .snapshot
            .questions
            .iter()
            .filter(|q| ballot.selection(&q.id).is_none())
            .map(|q| q.id.clone())
            .collect();
        ensure!(missing.is_empty(), IncompleteBallotSnafu { missing });
        for (question_id, option_id) in ballot.selections() {
            self.check_selection(question_id, option_id)?;
        }

        let mut next = self.snapshot.clone();
        let mut vote_ids: Vec<VoteId> = Vec::new();
        for (question_id, option_id) in ballot.selections() {
            vote_ids.push(record_vote(
                &mut next,
                &mut self.ids,
                &normalized,
                question_id,
                option_id,
            ));
        }
        self.commit(next)?;
        info!("Recorded ballot of {}: {} vote(s)", normalized, vote_ids.len());
        Ok(vote_ids)
    }

    fn check_eligible(&self, email: &str) -> StoreResult<String> {
        let normalized = normalize_email(email);
        ensure!(!normalized.is_empty(), EmptyFieldSnafu { field: "email" });
        ensure!(
            self.is_registered(&normalized),
            NotRegisteredSnafu {
                email: normalized.clone()
            }
        );
        ensure!(
            !self.voting_closed(&normalized),
            AlreadyVotedSnafu {
                email: normalized.clone()
            }
        );
        Ok(normalized)
    }

    // Votes can disappear with their option or question, the participant flag stays.
    fn voting_closed(&self, email: &str) -> bool {
        self.has_voted(email)
            || self
                .participant_by_email(email)
                .map_or(false, |p| p.has_voted)
    }

    fn check_selection(&self, question_id: &QuestionId, option_id: &OptionId) -> StoreResult<()> {
        let question = self.question(question_id).context(UnknownQuestionSnafu {
            id: question_id.clone(),
        })?;
        ensure!(
            question.option(option_id).is_some(),
            UnknownOptionSnafu {
                question: question_id.clone(),
                option: option_id.clone(),
            }
        );
        Ok(())
    }

    // **** Tallies ****

    /// The vote counters of a question, in option order. Empty if the question does not exist.
    pub fn tally(&self, question_id: &QuestionId) -> Tally {
        match self.question(question_id) {
            Some(q) => q.options.iter().map(|o| (o.id.clone(), o.votes)).collect(),
            None => Vec::new(),
        }
    }
}

// Tells the generator about every id already present in the snapshot.
fn reserve_ids<G: IdGenerator>(snapshot: &Snapshot, ids: &mut G) {
    for p in snapshot.participants.iter() {
        ids.reserve(IdKind::Participant, &p.id.0);
    }
    for q in snapshot.questions.iter() {
        ids.reserve(IdKind::Question, &q.id.0);
        for o in q.options.iter() {
            ids.reserve(IdKind::Option, &o.id.0);
        }
    }
    for v in snapshot.votes.iter() {
        ids.reserve(IdKind::Vote, &v.id.0);
    }
}

// Appends the vote, flags the participant and bumps the option counter.
// The selection must have been checked beforehand.
fn record_vote<G: IdGenerator>(
    snapshot: &mut Snapshot,
    ids: &mut G,
    normalized_email: &str,
    question_id: &QuestionId,
    option_id: &OptionId,
) -> VoteId {
    let vote_id = VoteId(ids.next_id(IdKind::Vote));
    snapshot.votes.push(Vote {
        id: vote_id.clone(),
        participant_email: normalized_email.to_string(),
        question_id: question_id.clone(),
        option_id: option_id.clone(),
        voted_at: Utc::now(),
    });
    for p in snapshot.participants.iter_mut() {
        if p.matches_email(normalized_email) {
            p.has_voted = true;
        }
    }
    if let Some(q) = snapshot.questions.iter_mut().find(|q| q.id == *question_id) {
        for o in q.options.iter_mut().filter(|o| o.id == *option_id) {
            o.votes += 1;
        }
    }
    vote_id
}
