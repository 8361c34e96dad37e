use std::collections::HashMap;

use snafu::prelude::*;

use crate::model::*;

/// One selection per question, ready to be submitted with
/// [crate::SurveyStore::submit_ballot].
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ballot {
    selections: Vec<(QuestionId, OptionId)>,
}

impl Ballot {
    /// The selections, in question order.
    pub fn selections(&self) -> &[(QuestionId, OptionId)] {
        &self.selections
    }

    pub fn selection(&self, question_id: &QuestionId) -> Option<&OptionId> {
        self.selections
            .iter()
            .find(|(q, _)| q == question_id)
            .map(|(_, o)| o)
    }
}

/// A builder for filling a ballot, one question at a time.
///
/// ```
/// use survey_store::*;
///
/// let mut store = SurveyStore::open(MemoryStorage::new(), SequentialIds::new())?;
/// store.register_participant("a@x.com", "Ana", "Lee")?;
/// let q = store.add_question("Favorite genre?", None, &["RPG", "FPS"])?;
/// let fps = store.question(&q).unwrap().options[1].id.clone();
///
/// let mut builder = BallotBuilder::new(store.questions());
/// builder.select(&q, &fps)?;
/// let ballot = builder.build()?;
/// store.submit_ballot("a@x.com", &ballot)?;
///
/// # Ok::<(), StoreError>(())
/// ```
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotBuilder {
    // The option ids available for each question, in question order.
    questions: Vec<(QuestionId, Vec<OptionId>)>,
    selections: HashMap<QuestionId, OptionId>,
}

impl BallotBuilder {
    pub fn new(questions: &[SurveyQuestion]) -> BallotBuilder {
        BallotBuilder {
            questions: questions
                .iter()
                .map(|q| (q.id.clone(), q.options.iter().map(|o| o.id.clone()).collect()))
                .collect(),
            selections: HashMap::new(),
        }
    }

    /// Chooses an option for a question, replacing any previous choice.
    pub fn select(&mut self, question_id: &QuestionId, option_id: &OptionId) -> Result<(), StoreError> {
        let (_, options) = self
            .questions
            .iter()
            .find(|(q, _)| q == question_id)
            .context(UnknownQuestionSnafu {
                id: question_id.clone(),
            })?;
        ensure!(
            options.contains(option_id),
            UnknownOptionSnafu {
                question: question_id.clone(),
                option: option_id.clone(),
            }
        );
        self.selections
            .insert(question_id.clone(), option_id.clone());
        Ok(())
    }

    /// The questions that have no selection yet, in question order.
    pub fn unanswered(&self) -> Vec<QuestionId> {
        self.questions
            .iter()
            .filter(|(q, _)| !self.selections.contains_key(q))
            .map(|(q, _)| q.clone())
            .collect()
    }

    /// Builds the ballot. Every question must have a selection.
    pub fn build(&self) -> Result<Ballot, StoreError> {
        ensure!(!self.questions.is_empty(), NoQuestionsSnafu {});
        let missing = self.unanswered();
        ensure!(missing.is_empty(), IncompleteBallotSnafu { missing });
        let mut selections: Vec<(QuestionId, OptionId)> = Vec::new();
        for (q, _) in self.questions.iter() {
            if let Some(o) = self.selections.get(q) {
                selections.push((q.clone(), o.clone()));
            }
        }
        Ok(Ballot { selections })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn question(id: &str, options: &[&str]) -> SurveyQuestion {
        SurveyQuestion {
            id: QuestionId(id.to_string()),
            title: id.to_uppercase(),
            description: None,
            options: options
                .iter()
                .map(|o| SurveyOption {
                    id: OptionId(o.to_string()),
                    text: o.to_string(),
                    votes: 0,
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    fn qid(s: &str) -> QuestionId {
        QuestionId(s.to_string())
    }

    fn oid(s: &str) -> OptionId {
        OptionId(s.to_string())
    }

    #[test]
    fn selections_follow_question_order() {
        let questions = vec![question("q1", &["a", "b"]), question("q2", &["c", "d"])];
        let mut builder = BallotBuilder::new(&questions);
        builder.select(&qid("q2"), &oid("d")).unwrap();
        assert_eq!(builder.unanswered(), vec![qid("q1")]);
        builder.select(&qid("q1"), &oid("a")).unwrap();
        builder.select(&qid("q1"), &oid("b")).unwrap();
        let ballot = builder.build().unwrap();
        assert_eq!(
            ballot.selections(),
            &[(qid("q1"), oid("b")), (qid("q2"), oid("d"))]
        );
        assert_eq!(ballot.selection(&qid("q2")), Some(&oid("d")));
    }

    #[test]
    fn options_belong_to_their_question() {
        let questions = vec![question("q1", &["a", "b"]), question("q2", &["c", "d"])];
        let mut builder = BallotBuilder::new(&questions);
        let res = builder.select(&qid("q1"), &oid("c"));
        assert!(matches!(res, Err(StoreError::UnknownOption { .. })));
        let res = builder.select(&qid("q3"), &oid("a"));
        assert!(matches!(res, Err(StoreError::UnknownQuestion { .. })));
        assert_eq!(builder.unanswered().len(), 2);
    }

    #[test]
    fn incomplete_ballot() {
        let questions = vec![question("q1", &["a", "b"]), question("q2", &["c", "d"])];
        let mut builder = BallotBuilder::new(&questions);
        builder.select(&qid("q1"), &oid("a")).unwrap();
        match builder.build() {
            Err(StoreError::IncompleteBallot { missing }) => assert_eq!(missing, vec![qid("q2")]),
            x => panic!("unexpected result {:?}", x),
        }
    }
}
