//! Summaries of the votes, as shown to the administrator.

use serde::Serialize;

use crate::model::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct OptionResult {
    pub id: OptionId,
    pub text: String,
    pub votes: u64,
    /// Rounded to the closest integer. 0 when the question has no votes.
    pub percentage: u32,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct QuestionResults {
    pub id: QuestionId,
    pub title: String,
    #[serde(rename = "totalVotes")]
    pub total_votes: u64,
    /// Sorted by decreasing number of votes. Ties keep the option order.
    pub options: Vec<OptionResult>,
    /// The option with the most votes, if it received any.
    pub winner: Option<OptionId>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct SurveyStats {
    pub participants: usize,
    pub questions: usize,
    #[serde(rename = "totalVotes")]
    pub total_votes: usize,
    #[serde(rename = "votedParticipants")]
    pub voted_participants: usize,
    /// Share of the participants who voted, in percent.
    #[serde(rename = "participationRate")]
    pub participation_rate: u32,
}

// Rounds half up, like the percentages displayed elsewhere.
fn percentage(count: u64, total: u64) -> u32 {
    if total == 0 {
        0
    } else {
        ((count * 200 + total) / (2 * total)) as u32
    }
}

pub fn question_results(question: &SurveyQuestion) -> QuestionResults {
    let total = question.total_votes();
    let mut options: Vec<OptionResult> = question
        .options
        .iter()
        .map(|o| OptionResult {
            id: o.id.clone(),
            text: o.text.clone(),
            votes: o.votes,
            percentage: percentage(o.votes, total),
        })
        .collect();
    // Stable sort.
    options.sort_by(|a, b| b.votes.cmp(&a.votes));
    let winner = options
        .first()
        .filter(|o| o.votes > 0)
        .map(|o| o.id.clone());
    QuestionResults {
        id: question.id.clone(),
        title: question.title.clone(),
        total_votes: total,
        options,
        winner,
    }
}

pub fn survey_results(snapshot: &Snapshot) -> Vec<QuestionResults> {
    snapshot.questions.iter().map(question_results).collect()
}

pub fn survey_stats(snapshot: &Snapshot) -> SurveyStats {
    let participants = snapshot.participants.len();
    let voted_participants = snapshot.participants.iter().filter(|p| p.has_voted).count();
    SurveyStats {
        participants,
        questions: snapshot.questions.len(),
        total_votes: snapshot.votes.len(),
        voted_participants,
        participation_rate: percentage(voted_participants as u64, participants as u64),
    }
}
