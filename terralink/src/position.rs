//! Vehicle position input.

use parking_lot::Mutex;

use crate::grid::Location;

/// Source of the vehicle's current position.
pub trait PositionSource {
    /// Current position, or `None` without a fix.
    fn current_position(&self) -> Option<Location>;
}

/// Position set by hand, e.g. from a host estimator callback or a test.
#[derive(Debug, Default)]
pub struct FixedPosition {
    position: Mutex<Option<Location>>,
}

impl FixedPosition {
    pub fn new(position: Option<Location>) -> Self {
        Self {
            position: Mutex::new(position),
        }
    }

    pub fn at(loc: Location) -> Self {
        Self::new(Some(loc))
    }

    /// Replace the position; `None` drops the fix.
    pub fn set(&self, position: Option<Location>) {
        *self.position.lock() = position;
    }
}

impl PositionSource for FixedPosition {
    fn current_position(&self) -> Option<Location> {
        *self.position.lock()
    }
}
