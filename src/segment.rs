//! Intent-bounded segment collection.
//!
//! A segment is every message reachable forward from a start message without
//! taking a transition that is labeled with an intent. The start message
//! itself is never part of its segment.
//!
//! ## Algorithm
//!
//! Preorder depth-first walk over outgoing edges in edge order:
//!
//! 1. Mark the start message visited
//! 2. For each unlabeled edge of the current message whose target is
//!    unvisited: mark it, emit it, then descend into it before moving to the
//!    next edge
//! 3. Labeled edges are never followed
//!
//! The visited set lives for a single call, so the walk terminates on cycles
//! and emits each message at most once on diamonds. The walk uses an explicit
//! stack instead of recursion.

use std::collections::HashSet;

use crate::index::GraphIndex;
use crate::types::{Message, MessageId};

/// Error type for segment collection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    /// A message id is not in the index.
    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),
}

/// Collect the segment that follows `start`.
pub fn collect_segment<'a>(index: &'a GraphIndex, start: &MessageId) -> Result<Vec<&'a Message>, SegmentError> {
    let start_message = index
        .message(start)
        .ok_or_else(|| SegmentError::MessageNotFound(start.clone()))?;

    let mut segment: Vec<&Message> = Vec::new();
    let mut visited: HashSet<&MessageId> = HashSet::new();
    visited.insert(&start_message.message_id);

    // (message, index of the next edge to inspect)
    let mut stack: Vec<(&Message, usize)> = vec![(start_message, 0)];

    while let Some((message, edge_idx)) = stack.pop() {
        let Some(edge) = message.next.get(edge_idx) else {
            continue;
        };
        stack.push((message, edge_idx + 1));

        if edge.has_intent() || visited.contains(&edge.message_id) {
            continue;
        }

        let target = index
            .message(&edge.message_id)
            .ok_or_else(|| SegmentError::MessageNotFound(edge.message_id.clone()))?;
        visited.insert(&target.message_id);
        segment.push(target);
        stack.push((target, 0));
    }

    Ok(segment)
}

/// Ids of the segment that follows `start`, in emission order.
pub fn segment_ids(index: &GraphIndex, start: &MessageId) -> Result<Vec<MessageId>, SegmentError> {
    Ok(collect_segment(index, start)?
        .into_iter()
        .map(|m| m.message_id.clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FlowGraph;

    fn ids(index: &GraphIndex, start: &str) -> Vec<String> {
        segment_ids(index, &MessageId::from(start))
            .unwrap()
            .into_iter()
            .map(|id| id.to_string())
            .collect()
    }

    #[test]
    fn test_linear_chain_stops_at_intent() {
        let graph = FlowGraph::builder()
            .root("a")
            .edge("a", "b")
            .edge("b", "c")
            .intent_edge("c", "d", "i1")
            .edge("d", "e")
            .build();
        let index = GraphIndex::build(graph).unwrap();

        assert_eq!(ids(&index, "a"), vec!["b", "c"]);
        assert_eq!(ids(&index, "c"), Vec::<String>::new());
        assert_eq!(ids(&index, "d"), vec!["e"]);
    }

    #[test]
    fn test_depth_first_per_edge() {
        //     a
        //    / \
        //   b   c
        //   |
        //   d
        let graph = FlowGraph::builder()
            .root("a")
            .edge("a", "b")
            .edge("a", "c")
            .edge("b", "d")
            .build();
        let index = GraphIndex::build(graph).unwrap();

        assert_eq!(ids(&index, "a"), vec!["b", "d", "c"]);
    }

    #[test]
    fn test_diamond_emits_once() {
        let graph = FlowGraph::builder()
            .root("a")
            .edge("a", "b")
            .edge("a", "c")
            .edge("b", "d")
            .edge("c", "d")
            .build();
        let index = GraphIndex::build(graph).unwrap();

        assert_eq!(ids(&index, "a"), vec!["b", "d", "c"]);
    }

    #[test]
    fn test_cycle_terminates_and_excludes_start() {
        let graph = FlowGraph::builder()
            .root("a")
            .edge("a", "b")
            .edge("b", "c")
            .edge("c", "a")
            .edge("c", "b")
            .build();
        let index = GraphIndex::build(graph).unwrap();

        assert_eq!(ids(&index, "a"), vec!["b", "c"]);
    }

    #[test]
    fn test_self_loop() {
        let graph = FlowGraph::builder().root("a").edge("a", "a").build();
        let index = GraphIndex::build(graph).unwrap();

        assert!(ids(&index, "a").is_empty());
    }

    #[test]
    fn test_message_reachable_both_ways_is_included() {
        // c is behind an intent from a, but also reachable through b.
        let graph = FlowGraph::builder()
            .root("a")
            .intent_edge("a", "c", "i1")
            .edge("a", "b")
            .edge("b", "c")
            .build();
        let index = GraphIndex::build(graph).unwrap();

        assert_eq!(ids(&index, "a"), vec!["b", "c"]);
    }

    #[test]
    fn test_unknown_start() {
        let graph = FlowGraph::builder().root("a").build();
        let index = GraphIndex::build(graph).unwrap();

        let err = collect_segment(&index, &MessageId::from("zzz")).unwrap_err();
        assert_eq!(err, SegmentError::MessageNotFound(MessageId::from("zzz")));
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let mut builder = FlowGraph::builder().root("m0");
        for i in 1..5_000 {
            builder = builder.edge(&format!("m{}", i - 1), &format!("m{i}"));
        }
        let index = GraphIndex::build(builder.build()).unwrap();

        assert_eq!(collect_segment(&index, &MessageId::from("m0")).unwrap().len(), 4_999);
    }
}
