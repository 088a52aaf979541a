use a3s_mask::detector::{Detection, DetectorKind};
use a3s_mask::resolver::{DetectorInfo, SpanResolver};
use a3s_mask::{Category, KeywordDetector, MaskConfig, MaskingEngine, RegexDetector, Session};
use futures::executor::block_on;
use proptest::prelude::*;

fn regex_engine() -> MaskingEngine {
    MaskingEngine::builder()
        .detector(RegexDetector::with_defaults().unwrap())
        .build()
        .unwrap()
}

// ── Round-trip law ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn unmask_restores_arbitrary_text(text in ".{0,200}") {
        let engine = regex_engine();
        let out = block_on(engine.mask(&text));
        let restored = engine.unmask(&out.masked, &out.session).unwrap();
        prop_assert_eq!(restored, text);
    }

    #[test]
    fn unmask_restores_text_with_sensitive_values(
        user in "[a-z]{3,8}",
        domain in "[a-z]{3,8}",
        a in 1u8..=254,
        b in 0u8..=254,
        filler in "[ a-zA-Z,.<>_0-9]{0,40}"
    ) {
        let text = format!("{filler} mail {user}@{domain}.com from 10.{a}.{b}.1 {filler}");
        let engine = regex_engine();
        let out = block_on(engine.mask(&text));
        let email = format!("{user}@{domain}.com");
        prop_assert!(!out.masked.contains(&email), "email leaked: {}", out.masked);
        let restored = engine.unmask(&out.masked, &out.session).unwrap();
        prop_assert_eq!(restored, text);
    }

    #[test]
    fn unmask_restores_text_with_literal_placeholders(
        prefix in "[a-z ]{0,20}",
        index in 0usize..3
    ) {
        let text = format!("{prefix} <IP_{index}> seen at 10.0.0.{index} and <EMAIL_0>");
        let engine = regex_engine();
        let out = block_on(engine.mask(&text));
        let ip = format!("10.0.0.{index}");
        prop_assert!(!out.masked.contains(&ip), "ip leaked: {}", out.masked);
        let restored = engine.unmask(&out.masked, &out.session).unwrap();
        prop_assert_eq!(restored, text);
    }
}

// ── Allocation is idempotent per value ────────────────────────────────────

proptest! {
    #[test]
    fn repeated_value_reuses_token(
        first in "[A-Z][a-z]{3,8}",
        second in "[A-Z][a-z]{3,8}"
    ) {
        prop_assume!(first != second);
        let config = MaskConfig {
            allowed_values: vec![],
            ..Default::default()
        };
        let detector = KeywordDetector::from_keywords(
            Category::Person,
            vec![first.clone(), second.clone()],
        )
        .unwrap();
        let engine = MaskingEngine::builder()
            .detector(detector)
            .config(config)
            .build()
            .unwrap();

        let text = format!("{first} met {second} and {first} ok");
        let out = block_on(engine.mask(&text));
        prop_assert_eq!(out.masked, "<PERSON_0> met <PERSON_1> and <PERSON_0> ok");
    }
}

// ── Resolution never yields overlapping findings ──────────────────────────

proptest! {
    #[test]
    fn findings_never_overlap(
        text in "[a-z ]{1,60}",
        ranges in prop::collection::vec((0usize..60, 1usize..20), 0..30)
    ) {
        let resolver = SpanResolver::new(&MaskConfig::default());
        let item = Category::custom("ITEM").unwrap();
        let detections = ranges
            .into_iter()
            .map(|(start, len)| Detection::span(start, start + len, item.clone()))
            .collect();
        let info = DetectorInfo {
            name: "ranges".to_string(),
            kind: DetectorKind::Structured,
            order: 0,
        };

        let (candidates, _) = resolver.locate(&text, &info, detections);
        let resolution = resolver.resolve(&text, candidates);
        for pair in resolution.findings.windows(2) {
            prop_assert!(pair[0].span.end <= pair[1].span.start);
        }
        for finding in &resolution.findings {
            prop_assert!(finding.span.start < finding.span.end);
            prop_assert!(finding.span.end <= text.len());
        }
    }
}

// ── Fresh sessions pass text through ──────────────────────────────────────

proptest! {
    #[test]
    fn empty_session_unmask_is_identity(text in ".{0,200}") {
        let session = Session::new();
        prop_assert_eq!(MaskingEngine::unmask_session(&session, &text), text);
    }
}
