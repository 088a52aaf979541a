//! Named-entity detector backed by a token-classification model
//!
//! The model itself lives outside this crate. Callers plug it in through
//! [`EntityRecognizer`], which is decoupled from any inference runtime so the
//! detector is testable with canned responses. [`EntityDetector`] turns the
//! model's per-token labels into category detections:
//!
//! - labels are mapped to categories through a [`TagMap`]; unmapped labels
//!   (including `O`) are dropped
//! - with offsets, adjacent tokens of one entity are merged into a single span
//! - without offsets, sub-word pieces (`##ing`) are dropped and the remaining
//!   words are reported as values
//!
//! A recognizer failure is reported as [`DetectorError::Unavailable`], never as
//! an empty result.

use super::{Detection, Detector, DetectorKind};
use crate::category::Category;
use crate::error::DetectorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One labelled token (or word) produced by a recognizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTag {
    /// Token text as reported by the model
    pub word: String,
    /// Model label (e.g. `B-PER`, `LABEL_3`)
    pub label: String,
    /// Model confidence (0.0 to 1.0)
    pub score: f64,
    /// Start byte offset in the input text, if the model reports offsets
    #[serde(default)]
    pub start: Option<usize>,
    /// End byte offset in the input text
    #[serde(default)]
    pub end: Option<usize>,
}

/// Trait for invoking a named-entity recognition model.
#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    /// Label the tokens of `text`. `Err` means the model could not run.
    async fn recognize(&self, text: &str) -> Result<Vec<EntityTag>, String>;
}

/// Mapping from model labels to categories
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagMap {
    labels: HashMap<String, Category>,
    /// Labels that open a new entity even right after one of the same category
    #[serde(default)]
    begins: HashSet<String>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `label` to `category`
    pub fn with(mut self, label: impl Into<String>, category: Category) -> Self {
        self.labels.insert(label.into(), category);
        self
    }

    /// Map `label` to `category` and mark it as the first token of an entity
    pub fn with_begin(mut self, label: impl Into<String>, category: Category) -> Self {
        let label = label.into();
        self.begins.insert(label.clone());
        self.labels.insert(label, category);
        self
    }

    /// Label scheme of the `dslim/distilbert-NER` model (`LABEL_0` is outside,
    /// odd labels begin an entity)
    pub fn distilbert_ner() -> Self {
        Self::new()
            .with_begin("LABEL_1", Category::Misc)
            .with("LABEL_2", Category::Misc)
            .with_begin("LABEL_3", Category::Person)
            .with("LABEL_4", Category::Person)
            .with_begin("LABEL_5", Category::Organization)
            .with("LABEL_6", Category::Organization)
            .with_begin("LABEL_7", Category::Location)
            .with("LABEL_8", Category::Location)
    }

    /// CoNLL-style IOB labels (`B-PER`, `I-ORG`, ...) and their bare forms
    pub fn iob() -> Self {
        let mut map = Self::new();
        for (tag, category) in [
            ("PER", Category::Person),
            ("ORG", Category::Organization),
            ("LOC", Category::Location),
            ("MISC", Category::Misc),
        ] {
            map = map
                .with(tag, category.clone())
                .with_begin(format!("B-{}", tag), category.clone())
                .with(format!("I-{}", tag), category);
        }
        map
    }

    pub fn category(&self, label: &str) -> Option<&Category> {
        self.labels.get(label)
    }

    /// Whether `label` starts a new entity
    pub fn begins(&self, label: &str) -> bool {
        self.begins.contains(label)
    }
}

/// Detector adapter over an [`EntityRecognizer`]
pub struct EntityDetector {
    name: String,
    recognizer: Box<dyn EntityRecognizer>,
    tags: TagMap,
    categories: Option<HashSet<Category>>,
}

impl EntityDetector {
    /// Create a detector with the given label mapping
    pub fn new(recognizer: Box<dyn EntityRecognizer>, tags: TagMap) -> Self {
        Self {
            name: "entity".to_string(),
            recognizer,
            tags,
            categories: None,
        }
    }

    /// Override the name reported for this detector
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Only report entities of the given categories
    pub fn only(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories = Some(categories.into_iter().collect());
        self
    }

    fn wanted(&self, category: &Category) -> bool {
        self.categories
            .as_ref()
            .map_or(true, |set| set.contains(category))
    }

    fn labelled(&self, tags: Vec<EntityTag>) -> Vec<(Category, EntityTag)> {
        tags.into_iter()
            .filter_map(|tag| {
                let category = self.tags.category(&tag.label)?.clone();
                self.wanted(&category).then_some((category, tag))
            })
            .collect()
    }
}

#[async_trait]
impl Detector for EntityDetector {
    async fn find(&self, text: &str) -> Result<Vec<Detection>, DetectorError> {
        let tags = self
            .recognizer
            .recognize(text)
            .await
            .map_err(DetectorError::Unavailable)?;

        let labelled = self.labelled(tags);
        let has_offsets = labelled
            .iter()
            .all(|(_, t)| t.start.is_some() && t.end.is_some());

        let detections = if has_offsets {
            merge_spans(text, &self.tags, labelled)
        } else {
            word_values(labelled)
        };

        tracing::debug!(
            detector = %self.name,
            entities = detections.len(),
            with_offsets = has_offsets,
            "Entity recognizer finished"
        );

        Ok(detections)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::Statistical
    }
}

/// Merge consecutive tokens of one category into whole-entity spans.
///
/// A token joins the open entity when it has the same category and only
/// whitespace (or nothing, for sub-word pieces) separates them. A begin label
/// (`B-PER`, `LABEL_3`) after whitespace starts a new entity. The merged score
/// is the lowest score of its tokens.
fn merge_spans(
    text: &str,
    tags: &TagMap,
    mut labelled: Vec<(Category, EntityTag)>,
) -> Vec<Detection> {
    labelled.sort_by_key(|(_, t)| t.start);

    let mut detections = Vec::new();
    let mut open: Option<(Category, usize, usize, f64)> = None;

    for (category, tag) in labelled {
        let (Some(start), Some(end)) = (tag.start, tag.end) else {
            continue;
        };

        if let Some((ref open_cat, _, ref mut open_end, ref mut score)) = open {
            let gap = if start >= *open_end {
                text.get(*open_end..start)
            } else {
                None
            };
            let continues = match gap {
                Some("") => *open_cat == category,
                Some(g) => {
                    *open_cat == category
                        && g.chars().all(char::is_whitespace)
                        && !tags.begins(&tag.label)
                }
                None => false,
            };
            if continues {
                *open_end = end;
                *score = score.min(tag.score);
                continue;
            }
        }

        if let Some((cat, s, e, score)) = open.take() {
            detections.push(Detection::span(s, e, cat).with_score(score));
        }
        open = Some((category, start, end, tag.score));
    }

    if let Some((cat, s, e, score)) = open {
        detections.push(Detection::span(s, e, cat).with_score(score));
    }

    detections
}

/// Report whole words as values, dropping sub-word pieces and duplicates
fn word_values(labelled: Vec<(Category, EntityTag)>) -> Vec<Detection> {
    let mut seen = HashSet::new();
    labelled
        .into_iter()
        .filter(|(_, tag)| !tag.word.contains('#'))
        .filter(|(category, tag)| seen.insert((tag.word.clone(), category.clone())))
        .map(|(category, tag)| Detection::value(tag.word, category).with_score(tag.score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::Locator;

    /// Mock recognizer that returns canned tags
    struct MockRecognizer {
        tags: Vec<EntityTag>,
    }

    #[async_trait]
    impl EntityRecognizer for MockRecognizer {
        async fn recognize(&self, _text: &str) -> Result<Vec<EntityTag>, String> {
            Ok(self.tags.clone())
        }
    }

    /// Mock recognizer whose model never loaded
    struct FailingRecognizer;

    #[async_trait]
    impl EntityRecognizer for FailingRecognizer {
        async fn recognize(&self, _text: &str) -> Result<Vec<EntityTag>, String> {
            Err("model not loaded".to_string())
        }
    }

    fn tag(word: &str, label: &str, score: f64, range: Option<(usize, usize)>) -> EntityTag {
        EntityTag {
            word: word.to_string(),
            label: label.to_string(),
            score,
            start: range.map(|r| r.0),
            end: range.map(|r| r.1),
        }
    }

    fn detector(tags: Vec<EntityTag>, map: TagMap) -> EntityDetector {
        EntityDetector::new(Box::new(MockRecognizer { tags }), map)
    }

    #[tokio::test]
    async fn test_merges_adjacent_tokens() {
        let text = "Contact John Smith today";
        let d = detector(
            vec![
                tag("John", "B-PER", 0.99, Some((8, 12))),
                tag("Smith", "I-PER", 0.95, Some((13, 18))),
            ],
            TagMap::iob(),
        );
        let found = d.find(text).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].locator, Locator::Range { start: 8, end: 18 });
        assert_eq!(found[0].category, Category::Person);
        assert_eq!(found[0].score, Some(0.95));
    }

    #[tokio::test]
    async fn test_merges_subword_pieces() {
        let text = "Ask Kowalski";
        let d = detector(
            vec![
                tag("Kowal", "B-PER", 0.9, Some((4, 9))),
                tag("##ski", "I-PER", 0.8, Some((9, 12))),
            ],
            TagMap::iob(),
        );
        let found = d.find(text).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].locator, Locator::Range { start: 4, end: 12 });
    }

    #[tokio::test]
    async fn test_begin_label_splits_entities() {
        let text = "Alice Bob";
        let d = detector(
            vec![
                tag("Alice", "B-PER", 0.9, Some((0, 5))),
                tag("Bob", "B-PER", 0.9, Some((6, 9))),
            ],
            TagMap::iob(),
        );
        assert_eq!(d.find(text).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_distilbert_begin_labels_split_entities() {
        let d = detector(
            vec![
                tag("Alice", "LABEL_3", 0.9, Some((0, 5))),
                tag("Bob", "LABEL_3", 0.9, Some((6, 9))),
            ],
            TagMap::distilbert_ner(),
        );
        let found = d.find("Alice Bob").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].locator, Locator::Range { start: 0, end: 5 });
        assert_eq!(found[1].locator, Locator::Range { start: 6, end: 9 });

        let d = detector(
            vec![
                tag("John", "LABEL_3", 0.9, Some((0, 4))),
                tag("Smith", "LABEL_4", 0.8, Some((5, 10))),
            ],
            TagMap::distilbert_ner(),
        );
        let found = d.find("John Smith").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].locator, Locator::Range { start: 0, end: 10 });
    }

    #[tokio::test]
    async fn test_category_change_splits_entities() {
        let text = "Smith Acme";
        let d = detector(
            vec![
                tag("Smith", "I-PER", 0.9, Some((0, 5))),
                tag("Acme", "I-ORG", 0.9, Some((6, 10))),
            ],
            TagMap::iob(),
        );
        let found = d.find(text).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].category, Category::Organization);
    }

    #[tokio::test]
    async fn test_word_values_without_offsets() {
        let d = detector(
            vec![
                tag("Maria", "LABEL_3", 0.97, None),
                tag("##ria", "LABEL_4", 0.9, None),
                tag("Maria", "LABEL_3", 0.97, None),
                tag("Nokia", "LABEL_5", 0.88, None),
                tag("the", "LABEL_0", 0.99, None),
            ],
            TagMap::distilbert_ner(),
        );
        let found = d.find("irrelevant").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].locator, Locator::Value("Maria".into()));
        assert_eq!(found[1].category, Category::Organization);
    }

    #[tokio::test]
    async fn test_only_filters_categories() {
        let d = detector(
            vec![
                tag("Maria", "B-PER", 0.9, None),
                tag("Oslo", "B-LOC", 0.9, None),
            ],
            TagMap::iob(),
        )
        .only([Category::Location]);
        let found = d.find("irrelevant").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, Category::Location);
    }

    #[tokio::test]
    async fn test_failure_is_unavailable_not_empty() {
        let d = EntityDetector::new(Box::new(FailingRecognizer), TagMap::iob());
        let err = d.find("text").await.unwrap_err();
        assert_eq!(err, DetectorError::Unavailable("model not loaded".into()));
    }

    #[test]
    fn test_name_and_kind() {
        let d = detector(vec![], TagMap::iob()).named("ner");
        assert_eq!(d.name(), "ner");
        assert_eq!(d.kind(), DetectorKind::Statistical);
    }

    #[test]
    fn test_tag_maps() {
        assert_eq!(TagMap::distilbert_ner().category("LABEL_0"), None);
        assert_eq!(
            TagMap::distilbert_ner().category("LABEL_7"),
            Some(&Category::Location)
        );
        assert_eq!(TagMap::iob().category("I-ORG"), Some(&Category::Organization));
        assert_eq!(TagMap::iob().category("O"), None);
        assert!(TagMap::iob().begins("B-LOC"));
        assert!(!TagMap::iob().begins("I-LOC"));
        assert!(TagMap::distilbert_ner().begins("LABEL_5"));
        assert!(!TagMap::distilbert_ner().begins("LABEL_6"));
    }
}
