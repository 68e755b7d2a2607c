use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit(i64),
    MissingId,
    Known,
    Repeat,
}

/// Id-based dedup for one run: the store's ids at run start plus every id
/// admitted since. Plain set membership, nothing fuzzy.
#[derive(Debug, Default)]
pub struct DedupFilter {
    known: HashSet<i64>,
    processed: HashSet<i64>,
}

impl DedupFilter {
    pub fn new(known: HashSet<i64>) -> Self {
        Self {
            known,
            processed: HashSet::new(),
        }
    }

    /// What `admit` would say, without recording anything.
    pub fn check(&self, id: Option<i64>) -> Admission {
        match id {
            None => Admission::MissingId,
            Some(id) if self.known.contains(&id) => Admission::Known,
            Some(id) if self.processed.contains(&id) => Admission::Repeat,
            Some(id) => Admission::Admit(id),
        }
    }

    pub fn admit(&mut self, id: Option<i64>) -> Admission {
        let verdict = self.check(id);
        match verdict {
            Admission::Admit(id) => {
                self.processed.insert(id);
            }
            other => debug!(?id, verdict = ?other, "dedup skip"),
        }
        verdict
    }

    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    pub fn processed_len(&self) -> usize {
        self.processed.len()
    }
}
