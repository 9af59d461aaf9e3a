//! Property tests for annotation, segment collection and context resolution.

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

use flow_intent_export::segment::segment_ids;
use flow_intent_export::{
    annotate, Converter, ConvertOptions, DialogflowRenderer, FlowGraph, GraphIndex, Intent,
    MessageId, VariableOccurrence,
};

// ─────────────────────────────────────────────────────────────────────────────
// Strategies
// ─────────────────────────────────────────────────────────────────────────────

/// Marked variable tokens: `%word%`, `<word>`, `{word}`, `[word]`, `$word`.
fn arb_token() -> impl Strategy<Value = String> {
    ("[a-z]{1,6}", 0usize..5).prop_map(|(word, style)| match style {
        0 => format!("%{word}%"),
        1 => format!("<{word}>"),
        2 => format!("{{{word}}}"),
        3 => format!("[{word}]"),
        _ => format!("${word}"),
    })
}

/// Plain text that may contain multibyte chars but no markers.
fn arb_plain() -> impl Strategy<Value = String> {
    "[a-zA-Z é日,.]{0,8}"
}

/// Utterance text with its occurrences, shuffled out of textual order.
fn arb_utterance() -> impl Strategy<Value = (String, Vec<VariableOccurrence>)> {
    (
        prop::collection::vec((arb_plain(), arb_token()), 0..5),
        arb_plain(),
        any::<u64>(),
    )
        .prop_map(|(parts, tail, seed)| {
            let mut text = String::new();
            let mut occurrences = Vec::new();
            for (plain, token) in parts {
                text.push_str(&plain);
                let start = text.chars().count();
                occurrences.push(VariableOccurrence::new(token.clone(), "entity", start));
                text.push_str(&token);
            }
            text.push_str(&tail);
            if !occurrences.is_empty() {
                let len = occurrences.len();
                occurrences.rotate_left((seed as usize) % len);
            }
            (text, occurrences)
        })
}

/// Edge list over `n` messages: (from, to, optional intent index).
fn arb_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize, Option<usize>)>)> {
    (1usize..12).prop_flat_map(|n| {
        let edge = (0..n, 0..n, prop::option::of(0usize..4));
        (Just(n), prop::collection::vec(edge, 0..30))
    })
}

fn build_graph(n: usize, edges: &[(usize, usize, Option<usize>)]) -> FlowGraph {
    let mut builder = FlowGraph::builder().root("m0");
    for i in 0..n {
        builder = builder.message(&format!("m{i}"));
    }
    for (from, to, intent) in edges {
        let (from, to) = (format!("m{from}"), format!("m{to}"));
        builder = match intent {
            Some(i) => builder.intent_edge(&from, &to, &format!("i{i}")),
            None => builder.edge(&from, &to),
        };
    }
    builder.build()
}

/// Messages reachable from `start` over unlabeled edges, excluding `start`.
fn plain_reachable(n: usize, edges: &[(usize, usize, Option<usize>)], start: usize) -> BTreeSet<String> {
    let mut seen = vec![false; n];
    seen[start] = true;
    let mut stack = vec![start];
    while let Some(at) = stack.pop() {
        for (from, to, intent) in edges {
            if *from == at && intent.is_none() && !seen[*to] {
                seen[*to] = true;
                stack.push(*to);
            }
        }
    }
    (0..n)
        .filter(|&i| i != start && seen[i])
        .map(|i| format!("m{i}"))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_annotation_reproduces_text((text, occurrences) in arb_utterance()) {
        let chunks = annotate(&text, &occurrences).unwrap();

        let mut sorted = occurrences.clone();
        sorted.sort_by_key(|o| o.start_index);
        let mut names = sorted.iter().map(|o| o.name.as_str());

        let rebuilt: String = chunks
            .iter()
            .map(|c| if c.is_annotated() { names.next().unwrap() } else { c.text.as_str() })
            .collect();

        prop_assert_eq!(rebuilt, text);
        prop_assert!(chunks.len() <= 2 * occurrences.len() + 1);
        prop_assert_eq!(chunks.iter().filter(|c| c.is_annotated()).count(), occurrences.len());
    }

    #[test]
    fn prop_segment_has_no_duplicates((n, edges) in arb_graph(), start in 0usize..12) {
        let start = start % n;
        let index = GraphIndex::build(build_graph(n, &edges)).unwrap();
        let ids = segment_ids(&index, &MessageId::new(format!("m{start}"))).unwrap();

        let distinct: HashSet<&MessageId> = ids.iter().collect();
        prop_assert_eq!(distinct.len(), ids.len());
    }

    #[test]
    fn prop_segment_stops_at_intent_edges((n, edges) in arb_graph(), start in 0usize..12) {
        let start = start % n;
        let index = GraphIndex::build(build_graph(n, &edges)).unwrap();
        let ids: BTreeSet<String> = segment_ids(&index, &MessageId::new(format!("m{start}")))
            .unwrap()
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect();

        prop_assert_eq!(ids, plain_reachable(n, &edges, start));
    }

    #[test]
    fn prop_output_contexts_are_distinct((n, edges) in arb_graph(), names in prop::collection::vec(0usize..2, 4)) {
        let index = GraphIndex::build(build_graph(n, &edges)).unwrap();
        // Four intent ids share two names.
        let intents: Vec<Intent> = names
            .iter()
            .enumerate()
            .map(|(i, name)| Intent::new(format!("i{i}"), format!("name{name}")))
            .collect();

        let conversion = Converter::new(DialogflowRenderer::default(), ConvertOptions::default())
            .convert(&index, &intents, &[]);

        prop_assert!(conversion.is_complete());
        for record in conversion.intent_records() {
            let contexts: Vec<&str> = record.responses[0]
                .affected_contexts
                .iter()
                .map(|c| c.name.as_str())
                .collect();
            let distinct: HashSet<&&str> = contexts.iter().collect();
            prop_assert_eq!(distinct.len(), contexts.len());
        }
    }
}
