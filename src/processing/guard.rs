/*! Time bucket consistency tracking

In append mode every record of a shard is expected to fall in a single time bucket.
[ConsistencyGuard] keeps the shard's baseline bucket and reports the first record that doesn't match it.

```text
UNSET --check(b)--> BASELINED --check(b' != baseline)--> WARNED
                      |   ^                                 | ^
                      +---+ check(baseline)                 +-+ check(any)
```

Only one [MismatchWarning] is ever reported by a guard, even under heavy skew.
!*/
use std::fmt;

use serde::Serialize;

use crate::time::TimeBucket;

/// First time bucket that didn't match a shard's baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MismatchWarning {
    pub baseline: TimeBucket,
    pub current: TimeBucket,
}

impl fmt::Display for MismatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "This shard contains multiple time units. Sample is {}, current is {}",
            self.baseline, self.current
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Unset,
    Baselined,
    Warned,
}

/// Per-worker consistency state.
///
/// A guard is never shared between workers.
#[derive(Debug, Default)]
pub struct ConsistencyGuard {
    baseline: Option<TimeBucket>,
    warned: bool,
    mismatches: u64,
}

impl ConsistencyGuard {
    /// New guard, without baseline.
    pub fn new() -> Self {
        Self::default()
    }

    /// New guard, already baselined on `baseline`.
    pub fn with_baseline(baseline: TimeBucket) -> Self {
        Self {
            baseline: Some(baseline),
            ..Default::default()
        }
    }

    pub fn state(&self) -> GuardState {
        match (&self.baseline, self.warned) {
            (None, _) => GuardState::Unset,
            (Some(_), false) => GuardState::Baselined,
            (Some(_), true) => GuardState::Warned,
        }
    }

    /// Get a reference to the guard's baseline.
    pub fn baseline(&self) -> Option<&TimeBucket> {
        self.baseline.as_ref()
    }

    /// Number of checked buckets that differed from the baseline.
    pub fn mismatches(&self) -> u64 {
        self.mismatches
    }

    pub fn warned(&self) -> bool {
        self.warned
    }

    /// Check `bucket` against the baseline, setting it if there's none yet.
    ///
    /// Returns a [MismatchWarning] on the first mismatch only.
    pub fn check(&mut self, bucket: &TimeBucket) -> Option<MismatchWarning> {
        let baseline = match &self.baseline {
            Some(baseline) => baseline,
            None => {
                self.baseline = Some(bucket.clone());
                return None;
            }
        };

        if baseline == bucket {
            return None;
        }

        self.mismatches += 1;
        if self.warned {
            return None;
        }

        self.warned = true;
        Some(MismatchWarning {
            baseline: baseline.clone(),
            current: bucket.clone(),
        })
    }
}
