use serde::Deserialize;

use crate::scheduler::{Scheduler, SchedulerRef};

/// Configuration applied when wrapping a value. Nested nodes inherit it.
///
/// Deserializes from the same shape callers pass as an options object:
///
/// ```
/// use object_observable::Options;
///
/// let opts: Options = serde_json::from_str(r#"{"recursive": false}"#).unwrap();
/// assert!(!opts.recursive);
/// assert!(!opts.clone);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Wrap a deep copy of the input instead of adopting it.
    pub clone: bool,
    /// Wrap nested composites so their mutations bubble up.
    pub recursive: bool,
    #[serde(skip)]
    pub scheduler: SchedulerRef,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            clone: false,
            recursive: true,
            scheduler: SchedulerRef::default(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clone(mut self, clone: bool) -> Self {
        self.clone = clone;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = SchedulerRef::new(scheduler);
        self
    }
}
