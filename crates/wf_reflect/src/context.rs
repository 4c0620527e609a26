use chrono::{FixedOffset, Offset, Utc};

use crate::error::ReflectError;

/// Maximum nesting depth a single conversion may recurse through.
///
/// Object graphs deeper than this fail with [`ReflectError::TooDeep`] rather
/// than exhausting the stack.
pub const MAX_BIND_DEPTH: usize = 128;

/// Ambient state threaded through every [`Coerce`](crate::Coerce) call.
///
/// The context carries the policies a conversion needs but individual
/// properties cannot know: the time zone dates are rendered in, whether nil
/// values and unknown keys are skipped, and the current recursion depth.
/// Serializers construct one per operation from their configuration.
#[derive(Debug, Clone)]
pub struct BindContext {
    time_zone: FixedOffset,
    ignore_nil: bool,
    ignore_unknown: bool,
    depth: usize,
}

impl BindContext {
    /// Creates a context with explicit policies.
    pub fn new(time_zone: FixedOffset, ignore_nil: bool, ignore_unknown: bool) -> Self {
        Self { time_zone, ignore_nil, ignore_unknown, depth: 0 }
    }

    /// The offset dates are rendered in and naive timestamps are read in.
    #[inline]
    pub const fn time_zone(&self) -> FixedOffset {
        self.time_zone
    }

    /// Whether nil properties and entries are skipped instead of emitted or
    /// assigned.
    #[inline]
    pub const fn ignore_nil(&self) -> bool {
        self.ignore_nil
    }

    /// Whether keys with no matching property are skipped instead of
    /// reported.
    #[inline]
    pub const fn ignore_unknown(&self) -> bool {
        self.ignore_unknown
    }

    /// Current recursion depth.
    #[inline]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Steps one level deeper, failing once [`MAX_BIND_DEPTH`] is reached.
    ///
    /// Every successful `enter` must be paired with a [`leave`](Self::leave)
    /// on the non-error path.
    #[inline]
    pub fn enter(&mut self) -> Result<(), ReflectError> {
        if self.depth >= MAX_BIND_DEPTH {
            return Err(ReflectError::TooDeep(MAX_BIND_DEPTH));
        }
        self.depth += 1;
        Ok(())
    }

    /// Steps back out of a level entered with [`enter`](Self::enter).
    #[inline]
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

impl Default for BindContext {
    /// UTC rendering, nil values skipped, unknown keys reported.
    fn default() -> Self {
        Self::new(Utc.fix(), true, false)
    }
}
