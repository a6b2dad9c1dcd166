use dashmap::DashSet;

/// Topics whose publishes are rejected, used to exercise the publish-failure path.
pub(crate) struct InducedFailure {
    rejected_topics: DashSet<String>,
}

impl InducedFailure {
    pub(crate) fn new() -> Self {
        return InducedFailure { rejected_topics: DashSet::new() };
    }

    pub(crate) fn reject_publishes_to(&self, topic: &str) {
        self.rejected_topics.insert(topic.to_string());
    }

    pub(crate) fn clear(&self, topic: &str) {
        self.rejected_topics.remove(topic);
    }

    pub(crate) fn should_reject(&self, topic: &str) -> bool {
        return self.rejected_topics.contains(topic);
    }
}
