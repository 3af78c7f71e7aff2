use bytes::Bytes;

/// Parameters of one bulk call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkParams {
    pub index: Option<String>,
    /// Newline-delimited bulk body.
    pub body: Bytes,
    /// Requested bulk size, counted in `unit`.
    pub bulk_size: u64,
    pub unit: String,
    pub detailed_results: bool,
    /// Whether every document line is preceded by an action/metadata line.
    pub action_metadata_present: bool,
}

impl BulkParams {
    pub fn new(index: impl Into<String>, body: impl Into<Bytes>, bulk_size: u64, unit: impl Into<String>) -> Self {
        Self {
            index: Some(index.into()),
            body: body.into(),
            bulk_size,
            unit: unit.into(),
            detailed_results: false,
            action_metadata_present: true,
        }
    }

    #[must_use]
    pub fn with_detailed_results(mut self, detailed_results: bool) -> Self {
        self.detailed_results = detailed_results;
        self
    }

    #[must_use]
    pub fn with_action_metadata(mut self, present: bool) -> Self {
        self.action_metadata_present = present;
        self
    }

    /// Body lines without the empty line left by the terminating newline.
    pub fn lines(&self) -> Vec<&[u8]> {
        let mut lines: Vec<&[u8]> = self.body.split(|byte| *byte == b'\n').collect();
        if lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        lines
    }

    /// Document lines, skipping action/metadata lines when present.
    pub fn documents(&self) -> Vec<&[u8]> {
        let lines = self.lines();
        if self.action_metadata_present {
            lines.into_iter().skip(1).step_by(2).collect()
        } else {
            lines
        }
    }
}
