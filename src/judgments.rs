//! Judgment documents: judged sentences with ranked target candidates
//!
//! Two renditions are read. The native one is a JCML file, where ranks are
//! attributes of the `tgt` elements:
//!
//! ```xml
//! <jcml>
//!   <judgedsentence id="s1" langsrc="de">
//!     <src>erste</src>
//!     <tgt rank="1" pred="2">first</tgt>
//!     <tgt rank="2">second</tgt>
//!   </judgedsentence>
//! </jcml>
//! ```
//!
//! The same content as JSON:
//!
//! ```json
//! {"sentences": [
//!   {"id": "s1", "attributes": {"langsrc": "de"},
//!    "targets": [
//!      {"text": "first", "attributes": {"rank": "1", "pred": 2}},
//!      {"text": "second", "attributes": {"rank": "2"}}
//!    ]}
//! ]}
//! ```
//!
//! [`JudgmentDocument::parse`] picks the rendition from the first
//! non-blank character. Each judged sentence becomes one [`RankGroup`],
//! candidates in document order. A rejected candidate is recorded and
//! skipped; loading continues.

use crate::{config::RankAttributes, group::RankGroup, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// A whole judgment document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JudgmentDocument {
    /// Judged sentences in document order
    pub sentences: Vec<JudgedSentence>,
}

/// One judged context: a source sentence with its ranked targets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JudgedSentence {
    /// Context id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Source text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Free-form sentence attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    /// Ranked candidates
    #[serde(default)]
    pub targets: Vec<Target>,
}

/// One candidate translation with its attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Candidate text
    #[serde(default)]
    pub text: String,
    /// Attributes, including the rank attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

/// Groups built from a document plus the candidates that were rejected
#[derive(Debug, Default)]
pub struct LoadedCorpus {
    /// One group per judged sentence
    pub groups: Vec<RankGroup>,
    /// Rejected candidates, as [`Error::MalformedRank`]
    pub rejected: Vec<Error>,
}

impl LoadedCorpus {
    /// Total accepted candidates
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.groups.iter().map(RankGroup::size).sum()
    }
}

/// Element names of the JCML rendition
mod xml_tag {
    pub const DOC: &str = "jcml";
    pub const SENTENCE: &str = "judgedsentence";
    pub const SOURCE: &str = "src";
    pub const TARGET: &str = "tgt";
}

fn element_attributes(node: &roxmltree::Node<'_, '_>) -> BTreeMap<String, Value> {
    node.attributes()
        .map(|attr| (attr.name().to_string(), Value::String(attr.value().to_string())))
        .collect()
}

fn element_text(node: &roxmltree::Node<'_, '_>) -> String {
    node.descendants()
        .filter(roxmltree::Node::is_text)
        .filter_map(|text| text.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Outcome of reading one attribute
enum AttrValue {
    Missing,
    Number(f64),
    Unparsable(String),
}

fn read_attribute(attributes: &BTreeMap<String, Value>, name: &str) -> AttrValue {
    match attributes.get(name) {
        None | Some(Value::Null) => AttrValue::Missing,
        Some(Value::Number(number)) => number
            .as_f64()
            .map_or_else(|| AttrValue::Unparsable(number.to_string()), AttrValue::Number),
        Some(Value::String(text)) if text.trim().is_empty() => AttrValue::Missing,
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map_or_else(|_| AttrValue::Unparsable(text.clone()), AttrValue::Number),
        Some(other) => AttrValue::Unparsable(other.to_string()),
    }
}

impl JudgmentDocument {
    /// Parse a document from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: Self = serde_json::from_str(json)?;
        Ok(document)
    }

    /// Parse a document from JCML text.
    ///
    /// Every `judgedsentence` element under the `jcml` root becomes a
    /// sentence. Its attributes and those of its `tgt` children are kept
    /// as strings; numeric parsing happens in [`JudgmentDocument::to_groups`].
    pub fn from_xml_str(xml: &str) -> Result<Self> {
        let tree = roxmltree::Document::parse(xml)
            .map_err(|e| Error::InvalidDocument(format!("malformed XML: {e}")))?;
        let root = tree.root_element();
        if root.tag_name().name() != xml_tag::DOC {
            return Err(Error::InvalidDocument(format!(
                "expected root <{}>, found <{}>",
                xml_tag::DOC,
                root.tag_name().name()
            )));
        }

        let sentences = root
            .descendants()
            .filter(|node| node.has_tag_name(xml_tag::SENTENCE))
            .map(|node| JudgedSentence {
                id: node.attribute("id").map(str::to_string),
                source: node
                    .children()
                    .find(|child| child.has_tag_name(xml_tag::SOURCE))
                    .map(|child| element_text(&child)),
                attributes: element_attributes(&node),
                targets: node
                    .children()
                    .filter(|child| child.has_tag_name(xml_tag::TARGET))
                    .map(|child| Target {
                        text: element_text(&child),
                        attributes: element_attributes(&child),
                    })
                    .collect(),
            })
            .collect();

        Ok(Self { sentences })
    }

    /// Parse either rendition: JCML when the text starts with `<`, JSON otherwise
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with('<') {
            Self::from_xml_str(trimmed)
        } else {
            Self::from_json_str(text)
        }
    }

    /// Read a document from a file, JCML or JSON
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(|e| match e {
            Error::Serialization(inner) => {
                Error::InvalidDocument(format!("{}: {inner}", path.display()))
            }
            Error::InvalidDocument(reason) => {
                Error::InvalidDocument(format!("{}: {reason}", path.display()))
            }
            other => other,
        })
    }

    /// Build one group per sentence using the configured attribute names
    pub fn to_groups(&self, attributes: &RankAttributes) -> Result<LoadedCorpus> {
        attributes.validate()?;
        let mut corpus = LoadedCorpus::default();

        for (index, sentence) in self.sentences.iter().enumerate() {
            let id = sentence
                .id
                .clone()
                .or_else(|| match sentence.attributes.get("id") {
                    Some(Value::String(id)) => Some(id.clone()),
                    Some(Value::Number(id)) => Some(id.to_string()),
                    _ => None,
                })
                .unwrap_or_else(|| (index + 1).to_string());

            let mut group = RankGroup::new(id);
            for target in &sentence.targets {
                if let Err(e) = add_target(&mut group, target, attributes) {
                    corpus.rejected.push(e);
                }
            }
            corpus.groups.push(group);
        }

        tracing::debug!(
            groups = corpus.groups.len(),
            candidates = corpus.candidate_count(),
            rejected = corpus.rejected.len(),
            "loaded judgments"
        );
        Ok(corpus)
    }
}

fn add_target(group: &mut RankGroup, target: &Target, attributes: &RankAttributes) -> Result<()> {
    let gold = match read_attribute(&target.attributes, &attributes.gold) {
        AttrValue::Number(value) => Some(value),
        AttrValue::Missing => None,
        AttrValue::Unparsable(raw) => {
            return Err(group.malformed(format!("gold rank '{raw}' is not a number")));
        }
    };
    let predicted = match read_attribute(&target.attributes, &attributes.predicted) {
        AttrValue::Number(value) => Some(value),
        AttrValue::Missing => None,
        AttrValue::Unparsable(raw) => {
            return Err(group.malformed(format!("predicted rank '{raw}' is not a number")));
        }
    };
    let quality = match &attributes.quality {
        None => None,
        Some(name) => match read_attribute(&target.attributes, name) {
            AttrValue::Number(value) => Some(value),
            AttrValue::Missing => None,
            AttrValue::Unparsable(raw) => {
                return Err(group.malformed(format!("gold quality '{raw}' is not a number")));
            }
        },
    };
    group.add_candidate_with_quality(gold, predicted, quality)
}

/// Read a judgment file and build its groups
pub fn load_groups(path: impl AsRef<Path>, attributes: &RankAttributes) -> Result<LoadedCorpus> {
    JudgmentDocument::from_path(path)?.to_groups(attributes)
}
