use std::fmt;

/// Position of a pipeline run in `Idle → IndexBuilt → FieldComputed → Triangulated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    Idle,
    IndexBuilt,
    FieldComputed,
    Triangulated,
}

impl PipelineStage {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::IndexBuilt),
            Self::IndexBuilt => Some(Self::FieldComputed),
            Self::FieldComputed => Some(Self::Triangulated),
            Self::Triangulated => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Triangulated
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::IndexBuilt => "index built",
            Self::FieldComputed => "field computed",
            Self::Triangulated => "triangulated",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_order() {
        let mut stage = PipelineStage::Idle;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            stage = next;
            seen.push(stage);
        }
        assert_eq!(seen.len(), 4);
        assert!(stage.is_terminal());
    }
}
