use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one invocation of the fuzzing pipeline.
///
/// Recorded on the run's tracing span and in `run_summary.json` so log
/// lines and the summary of the same CI step can be joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[non_exhaustive]
pub struct RunId(pub Uuid);

impl RunId {
    /// A fresh random (v4) id for a run that is starting now.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

/// Hyphenated UUID form, as it appears in logs and the run summary.
impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for RunId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
