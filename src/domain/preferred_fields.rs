use std::collections::BTreeSet;

use crate::domain::topic::Topic;

/// Topics a subscriber wants in the digest. An empty set means every topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct PreferredFields(BTreeSet<Topic>);

impl PreferredFields {
    pub fn all_topics() -> PreferredFields {
        Self(BTreeSet::new())
    }

    /// Rejects the whole list when a single tag is not a known topic.
    pub fn parse(tags: Vec<String>) -> Result<PreferredFields, String> {
        let topics = tags
            .into_iter()
            .map(Topic::parse)
            .collect::<Result<BTreeSet<Topic>, String>>()?;

        Ok(Self(topics))
    }

    pub fn is_all_topics(&self) -> bool {
        self.0.is_empty()
    }

    pub fn includes(&self, topic: Topic) -> bool {
        self.is_all_topics() || self.0.contains(&topic)
    }

    pub fn topics(&self) -> impl Iterator<Item = Topic> + '_ {
        self.0.iter().copied()
    }

    /// Column value: `None` stands for "all topics".
    pub fn to_storage(&self) -> Option<Vec<String>> {
        if self.is_all_topics() {
            return None;
        }

        Some(self.topics().map(|topic| topic.as_ref().to_string()).collect())
    }

    pub fn from_storage(tags: Option<Vec<String>>) -> Result<PreferredFields, String> {
        Self::parse(tags.unwrap_or_default())
    }
}
