//! Identifier generation for the entities of the store.

use uuid::Uuid;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum IdKind {
    Participant,
    Question,
    Option,
    Vote,
}

impl IdKind {
    fn prefix(self) -> &'static str {
        match self {
            IdKind::Participant => "participant",
            IdKind::Question => "question",
            IdKind::Option => "option",
            IdKind::Vote => "vote",
        }
    }

    fn index(self) -> usize {
        match self {
            IdKind::Participant => 0,
            IdKind::Question => 1,
            IdKind::Option => 2,
            IdKind::Vote => 3,
        }
    }
}

/// Source of fresh identifiers.
pub trait IdGenerator {
    fn next_id(&mut self, kind: IdKind) -> String;

    /// Marks an identifier as taken. It will not be handed out afterwards.
    fn reserve(&mut self, _kind: IdKind, _id: &str) {}
}

/// Deterministic identifiers: `question-1`, `option-1`, `option-2`, ...
///
/// There is one counter per kind of entity. Reserved ids of the same shape
/// move the counter past them.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SequentialIds {
    counters: [u64; 4],
}

impl SequentialIds {
    pub fn new() -> SequentialIds {
        SequentialIds::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, kind: IdKind) -> String {
        let counter = &mut self.counters[kind.index()];
        *counter += 1;
        format!("{}-{}", kind.prefix(), counter)
    }

    fn reserve(&mut self, kind: IdKind, id: &str) {
        let taken = id
            .strip_prefix(kind.prefix())
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|n| n.parse::<u64>().ok());
        if let Some(n) = taken {
            let counter = &mut self.counters[kind.index()];
            *counter = (*counter).max(n);
        }
    }
}

/// Random (v4) UUIDs.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&mut self, _kind: IdKind) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_counts_per_kind() {
        let mut ids = SequentialIds::new();
        assert_eq!(ids.next_id(IdKind::Question), "question-1");
        assert_eq!(ids.next_id(IdKind::Option), "option-1");
        assert_eq!(ids.next_id(IdKind::Option), "option-2");
        assert_eq!(ids.next_id(IdKind::Question), "question-2");
        assert_eq!(ids.next_id(IdKind::Vote), "vote-1");
    }

    #[test]
    fn reserved_ids_are_skipped() {
        let mut ids = SequentialIds::new();
        ids.reserve(IdKind::Option, "option-7");
        ids.reserve(IdKind::Option, "option-3");
        ids.reserve(IdKind::Option, "3f2c-uuid");
        ids.reserve(IdKind::Question, "option-9");
        assert_eq!(ids.next_id(IdKind::Option), "option-8");
        assert_eq!(ids.next_id(IdKind::Question), "question-1");
    }

    #[test]
    fn random_ids_differ() {
        let mut ids = RandomIds;
        let a = ids.next_id(IdKind::Participant);
        let b = ids.next_id(IdKind::Participant);
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
