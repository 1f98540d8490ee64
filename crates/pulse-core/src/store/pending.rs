//! In-flight mutation tracking.
//!
//! Each field-group is a tiny state machine: absent from the set means
//! `Settled`, present means `Pending`. A group can only enter `Pending` from
//! `Settled`.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::domain::{CommentId, RecordId};

/// Kind of optimistic operation, reported alongside failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Like,
    Comment,
    CreatePost,
    DeletePost,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Like => "like",
            Operation::Comment => "comment",
            Operation::CreatePost => "create_post",
            Operation::DeletePost => "delete_post",
        })
    }
}

/// The minimal set of fields mutated atomically by one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    /// `likeCount` + `isLiked` of a post.
    Like(RecordId),
    /// Existence of one provisional comment (and its +1 on the post's count).
    CommentInsert(CommentId),
    /// Existence of a post being deleted.
    PostRemoval(RecordId),
}

/// Proof that a field-group entered `Pending`, carried to its settlement.
#[derive(Debug)]
pub(crate) struct Ticket {
    pub group: FieldGroup,
    /// Store generation when the optimistic change was applied.
    pub generation: u64,
}

#[derive(Debug, Default)]
pub(crate) struct PendingSet {
    groups: HashSet<FieldGroup>,
}

impl PendingSet {
    /// `Settled -> Pending`. Returns `None` when the group is already pending.
    pub fn begin(&mut self, group: FieldGroup, generation: u64) -> Option<Ticket> {
        if self.groups.insert(group) {
            Some(Ticket { group, generation })
        } else {
            None
        }
    }

    /// `Pending -> Settled`, whether the write was confirmed or rolled back.
    pub fn settle(&mut self, ticket: &Ticket) {
        self.groups.remove(&ticket.group);
    }

    pub fn contains(&self, group: &FieldGroup) -> bool {
        self.groups.contains(group)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_cannot_reenter_pending() {
        let mut pending = PendingSet::default();
        let group = FieldGroup::Like(RecordId(1));

        let ticket = pending.begin(group, 0).unwrap();
        assert!(pending.begin(group, 0).is_none());

        pending.settle(&ticket);
        assert!(!pending.contains(&group));
        assert!(pending.begin(group, 1).is_some());
    }

    #[test]
    fn test_disjoint_groups_are_independent() {
        let mut pending = PendingSet::default();

        assert!(pending.begin(FieldGroup::Like(RecordId(1)), 0).is_some());
        assert!(pending.begin(FieldGroup::Like(RecordId(2)), 0).is_some());
        assert!(pending.begin(FieldGroup::PostRemoval(RecordId(1)), 0).is_some());
        assert_eq!(pending.len(), 3);
    }
}
