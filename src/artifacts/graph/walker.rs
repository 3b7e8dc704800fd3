//! Ancestry walks and merge-base search
//!
//! [`HistoryWalker`] is generic over a commit loader function, so the same
//! algorithms run against the object store in production and an in-memory
//! graph in tests.
//!
//! The merge-base search expands both tips simultaneously through a single
//! priority queue ordered by (timestamp, id), newest first, marking each
//! commit with the side(s) that reached it. The first commit popped bearing
//! both marks is the answer. When a DAG with several merge commits offers
//! multiple equally-near common ancestors, the (timestamp, id) pop order is
//! the deterministic tie-break.

use crate::artifacts::objects::commit::SlimCommit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::CoreResult;
use bitflags::bitflags;
use chrono::{DateTime, FixedOffset};
use std::collections::{BinaryHeap, HashMap, HashSet};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct VisitState: u8 {
        const NONE = 0b00;
        const FROM_SOURCE = 0b01;
        const FROM_TARGET = 0b10;
        const FROM_BOTH = Self::FROM_SOURCE.bits() | Self::FROM_TARGET.bits();
    }
}

/// Ancestry queries over commits reachable through parent links
///
/// `CommitLoaderFn` maps an id to its [`SlimCommit`] projection; root
/// commits simply have an empty parent list, termination is guaranteed by
/// the DAG being cycle-free.
#[derive(Debug, Clone)]
pub struct HistoryWalker<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> CoreResult<SlimCommit>,
{
    commit_loader: CommitLoaderFn,
}

impl<CommitLoaderFn> HistoryWalker<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> CoreResult<SlimCommit>,
{
    pub fn new(commit_loader: CommitLoaderFn) -> Self {
        Self { commit_loader }
    }

    /// Lazy walk over `start` and everything reachable through parents
    ///
    /// Yields each commit at most once, newest first by (timestamp, id).
    /// Nothing is traversed beyond what the caller consumes, so dropping
    /// the iterator cancels the walk.
    pub fn ancestors(&self, start: &ObjectId) -> Ancestors<'_, CommitLoaderFn> {
        let mut walk = Ancestors {
            walker: self,
            queue: BinaryHeap::new(),
            enqueued: HashSet::new(),
        };
        walk.enqueue(start.clone());
        walk
    }

    /// Is `ancestor` reachable from `descendant` (inclusive)?
    pub fn is_ancestor(&self, ancestor: &ObjectId, descendant: &ObjectId) -> CoreResult<bool> {
        for commit in self.ancestors(descendant) {
            if &commit?.oid == ancestor {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Nearest common ancestor of two commits
    ///
    /// `None` means the histories are unrelated. Ties between equally-near
    /// ancestors resolve to the first one discovered by the simultaneous
    /// expansion (newest (timestamp, id) first).
    pub fn merge_base(&self, a: &ObjectId, b: &ObjectId) -> CoreResult<Option<ObjectId>> {
        if a == b {
            return Ok(Some(a.clone()));
        }

        let mut states = HashMap::<ObjectId, VisitState>::new();
        let mut queue = BinaryHeap::new();

        let source = (self.commit_loader)(a)?;
        states.insert(a.clone(), VisitState::FROM_SOURCE);
        queue.push((source.timestamp, a.clone()));

        let target = (self.commit_loader)(b)?;
        states.insert(b.clone(), VisitState::FROM_TARGET);
        queue.push((target.timestamp, b.clone()));

        while let Some((_, oid)) = queue.pop() {
            let state = states.get(&oid).copied().unwrap_or(VisitState::NONE);
            tracing::trace!(commit = %oid, ?state, "merge-base expansion");

            if state.contains(VisitState::FROM_BOTH) {
                tracing::debug!(base = %oid, "merge base found");
                return Ok(Some(oid));
            }

            let commit = (self.commit_loader)(&oid)?;
            for parent_id in &commit.parents {
                let parent_state = states.get(parent_id).copied().unwrap_or(VisitState::NONE);

                // Re-enqueue a parent whenever it learns about a new side;
                // a commit first reached from one side may become the base
                // once the other side's paint arrives.
                if !parent_state.contains(state) {
                    let parent = (self.commit_loader)(parent_id)?;
                    states.insert(parent_id.clone(), parent_state | state);
                    queue.push((parent.timestamp, parent_id.clone()));
                }
            }
        }

        Ok(None)
    }
}

/// Lazy ancestor iterator, see [`HistoryWalker::ancestors`]
pub struct Ancestors<'w, CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> CoreResult<SlimCommit>,
{
    walker: &'w HistoryWalker<CommitLoaderFn>,
    queue: BinaryHeap<(DateTime<FixedOffset>, ObjectId)>,
    enqueued: HashSet<ObjectId>,
}

impl<CommitLoaderFn> Ancestors<'_, CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> CoreResult<SlimCommit>,
{
    fn enqueue(&mut self, oid: ObjectId) {
        if self.enqueued.insert(oid.clone())
            && let Ok(commit) = (self.walker.commit_loader)(&oid)
        {
            self.queue.push((commit.timestamp, oid));
        }
    }
}

impl<CommitLoaderFn> Iterator for Ancestors<'_, CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> CoreResult<SlimCommit>,
{
    type Item = CoreResult<SlimCommit>;

    fn next(&mut self) -> Option<Self::Item> {
        let (_, oid) = self.queue.pop()?;

        match (self.walker.commit_loader)(&oid) {
            Ok(commit) => {
                for parent in &commit.parents {
                    self.enqueue(parent.clone());
                }
                Some(Ok(commit))
            }
            Err(error) => Some(Err(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CoreError;
    use chrono::TimeZone;
    use rstest::*;
    use std::collections::HashMap;

    /// In-memory commit graph for exercising the walker without a store
    #[derive(Debug, Clone, Default)]
    struct InMemoryGraph {
        commits: HashMap<ObjectId, SlimCommit>,
    }

    impl InMemoryGraph {
        fn add_commit(&mut self, oid: ObjectId, parents: Vec<ObjectId>) {
            // Spread timestamps an hour apart so ordering is deterministic
            let timestamp_offset = self.commits.len() as i64 * 3600;
            let timestamp = FixedOffset::east_opt(0)
                .unwrap()
                .timestamp_opt(1_640_995_200 + timestamp_offset, 0)
                .unwrap();
            self.commits.insert(
                oid.clone(),
                SlimCommit {
                    oid,
                    parents,
                    timestamp,
                },
            );
        }

        fn load(&self, oid: &ObjectId) -> CoreResult<SlimCommit> {
            self.commits
                .get(oid)
                .cloned()
                .ok_or_else(|| CoreError::NotFound(oid.clone()))
        }
    }

    fn create_oid(id: &str) -> ObjectId {
        let mut hex_string = String::new();
        for byte in id.as_bytes() {
            hex_string.push_str(&format!("{:02x}", byte));
        }
        while hex_string.len() < 40 {
            hex_string.push('0');
        }
        hex_string.truncate(40);

        ObjectId::try_parse(hex_string).expect("invalid test object id")
    }

    #[fixture]
    fn linear_history() -> InMemoryGraph {
        let mut graph = InMemoryGraph::default();

        // Linear history: A <- B <- C <- D
        let a = create_oid("commit_a");
        let b = create_oid("commit_b");
        let c = create_oid("commit_c");
        let d = create_oid("commit_d");

        graph.add_commit(a.clone(), vec![]);
        graph.add_commit(b.clone(), vec![a]);
        graph.add_commit(c.clone(), vec![b]);
        graph.add_commit(d, vec![c]);

        graph
    }

    #[fixture]
    fn simple_divergence() -> InMemoryGraph {
        let mut graph = InMemoryGraph::default();

        //     A
        //    / \
        //   B   C
        let a = create_oid("commit_a");
        let b = create_oid("commit_b");
        let c = create_oid("commit_c");

        graph.add_commit(a.clone(), vec![]);
        graph.add_commit(b, vec![a.clone()]);
        graph.add_commit(c, vec![a]);

        graph
    }

    #[fixture]
    fn criss_cross() -> InMemoryGraph {
        let mut graph = InMemoryGraph::default();

        //     A
        //    / \
        //   B   C
        //   |\ /|
        //   | X |
        //   |/ \|
        //   D   E
        //   |   |
        //   F   G
        let a = create_oid("commit_a");
        let b = create_oid("commit_b");
        let c = create_oid("commit_c");
        let d = create_oid("commit_d");
        let e = create_oid("commit_e");
        let f = create_oid("commit_f");
        let g = create_oid("commit_g");

        graph.add_commit(a.clone(), vec![]);
        graph.add_commit(b.clone(), vec![a.clone()]);
        graph.add_commit(c.clone(), vec![a]);
        graph.add_commit(d.clone(), vec![b.clone(), c.clone()]);
        graph.add_commit(e.clone(), vec![c, b]);
        graph.add_commit(f, vec![d]);
        graph.add_commit(g, vec![e]);

        graph
    }

    #[rstest]
    fn ancestors_walk_yields_each_commit_once(linear_history: InMemoryGraph) {
        let walker = HistoryWalker::new(|oid: &ObjectId| linear_history.load(oid));

        let walked: Vec<ObjectId> = walker
            .ancestors(&create_oid("commit_d"))
            .map(|commit| commit.unwrap().oid)
            .collect();

        assert_eq!(
            walked,
            vec![
                create_oid("commit_d"),
                create_oid("commit_c"),
                create_oid("commit_b"),
                create_oid("commit_a"),
            ]
        );
    }

    #[rstest]
    fn ancestors_walk_is_lazy(linear_history: InMemoryGraph) {
        let walker = HistoryWalker::new(|oid: &ObjectId| linear_history.load(oid));

        // consuming only the first element must not fail even though the
        // rest of the history would; early termination is the cancellation
        // mechanism for long walks
        let first = walker
            .ancestors(&create_oid("commit_d"))
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(first.oid, create_oid("commit_d"));
    }

    #[rstest]
    fn is_ancestor_in_linear_history(linear_history: InMemoryGraph) {
        let walker = HistoryWalker::new(|oid: &ObjectId| linear_history.load(oid));

        let a = create_oid("commit_a");
        let d = create_oid("commit_d");

        assert!(walker.is_ancestor(&a, &d).unwrap());
        assert!(!walker.is_ancestor(&d, &a).unwrap());
        assert!(walker.is_ancestor(&d, &d).unwrap());
    }

    #[rstest]
    fn merge_base_of_same_commit_is_itself(linear_history: InMemoryGraph) {
        let walker = HistoryWalker::new(|oid: &ObjectId| linear_history.load(oid));
        let c = create_oid("commit_c");

        assert_eq!(walker.merge_base(&c, &c).unwrap(), Some(c));
    }

    #[rstest]
    fn merge_base_of_linear_commits_is_the_older_one(linear_history: InMemoryGraph) {
        let walker = HistoryWalker::new(|oid: &ObjectId| linear_history.load(oid));

        let b = create_oid("commit_b");
        let d = create_oid("commit_d");

        assert_eq!(walker.merge_base(&b, &d).unwrap(), Some(b.clone()));
        assert_eq!(walker.merge_base(&d, &b).unwrap(), Some(b));
    }

    #[rstest]
    fn merge_base_of_diverged_branches_is_the_fork_point(simple_divergence: InMemoryGraph) {
        let walker = HistoryWalker::new(|oid: &ObjectId| simple_divergence.load(oid));

        let base = walker
            .merge_base(&create_oid("commit_b"), &create_oid("commit_c"))
            .unwrap();
        assert_eq!(base, Some(create_oid("commit_a")));
    }

    #[rstest]
    fn merge_base_is_a_common_ancestor_with_no_closer_one(criss_cross: InMemoryGraph) {
        let walker = HistoryWalker::new(|oid: &ObjectId| criss_cross.load(oid));

        let f = create_oid("commit_f");
        let g = create_oid("commit_g");
        let base = walker.merge_base(&f, &g).unwrap().unwrap();

        // B and C are equally near (neither is an ancestor of the other);
        // either is a valid deterministic answer
        let b = create_oid("commit_b");
        let c = create_oid("commit_c");
        assert!(base == b || base == c, "unexpected base {base}");
        assert!(walker.is_ancestor(&base, &f).unwrap());
        assert!(walker.is_ancestor(&base, &g).unwrap());

        // the root is strictly farther, it must not be chosen
        assert_ne!(base, create_oid("commit_a"));
    }

    #[rstest]
    fn merge_base_is_deterministic(criss_cross: InMemoryGraph) {
        let walker = HistoryWalker::new(|oid: &ObjectId| criss_cross.load(oid));

        let f = create_oid("commit_f");
        let g = create_oid("commit_g");
        let first = walker.merge_base(&f, &g).unwrap();
        for _ in 0..10 {
            assert_eq!(walker.merge_base(&f, &g).unwrap(), first);
        }
    }

    #[rstest]
    fn unrelated_roots_have_no_merge_base() {
        let mut graph = InMemoryGraph::default();

        let a = create_oid("commit_a");
        let b = create_oid("commit_b");
        let x = create_oid("commit_x");
        let y = create_oid("commit_y");

        graph.add_commit(a.clone(), vec![]);
        graph.add_commit(b.clone(), vec![a]);
        graph.add_commit(x.clone(), vec![]);
        graph.add_commit(y.clone(), vec![x]);

        let walker = HistoryWalker::new(|oid: &ObjectId| graph.load(oid));

        assert_eq!(walker.merge_base(&b, &y).unwrap(), None);
    }

    #[rstest]
    fn merge_base_with_parent_child_pair() {
        let mut graph = InMemoryGraph::default();
        let parent = create_oid("parent");
        let child = create_oid("child");

        graph.add_commit(parent.clone(), vec![]);
        graph.add_commit(child.clone(), vec![parent.clone()]);

        let walker = HistoryWalker::new(|oid: &ObjectId| graph.load(oid));

        assert_eq!(
            walker.merge_base(&parent, &child).unwrap(),
            Some(parent.clone())
        );
        assert_eq!(walker.merge_base(&child, &parent).unwrap(), Some(parent));
    }

    #[rstest]
    fn merge_base_through_merge_commits() {
        let mut graph = InMemoryGraph::default();

        //     A
        //    / \
        //   B   C
        //    \ /
        //     D (merge)
        //     |
        //     E
        let a = create_oid("commit_a");
        let b = create_oid("commit_b");
        let c = create_oid("commit_c");
        let d = create_oid("commit_d");
        let e = create_oid("commit_e");

        graph.add_commit(a.clone(), vec![]);
        graph.add_commit(b.clone(), vec![a.clone()]);
        graph.add_commit(c.clone(), vec![a]);
        graph.add_commit(d.clone(), vec![b.clone(), c.clone()]);
        graph.add_commit(e.clone(), vec![d]);

        let walker = HistoryWalker::new(|oid: &ObjectId| graph.load(oid));

        // the merge commit's side branch is fully contained in E's history
        assert_eq!(walker.merge_base(&e, &c).unwrap(), Some(c.clone()));
        assert_eq!(walker.merge_base(&e, &b).unwrap(), Some(b));
    }
}
