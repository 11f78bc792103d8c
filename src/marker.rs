use crate::coordinate::Coordinate;
use std::fmt;

/// Marker identity. The value is a creation time in Unix milliseconds, bumped
/// forward when two markers would otherwise share a millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(i64);

impl MarkerId {
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerRecord {
    pub id: MarkerId,
    pub coordinate: Coordinate,
}

impl MarkerRecord {
    pub fn new(id: MarkerId, coordinate: Coordinate) -> Self {
        Self { id, coordinate }
    }
}

/// Hands out strictly increasing ids seeded from the wall clock.
#[derive(Debug, Default)]
pub struct MarkerIdGenerator {
    last: Option<i64>,
}

impl MarkerIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> MarkerId {
        self.next_at(chrono::Utc::now().timestamp_millis())
    }

    pub fn next_at(&mut self, now_ms: i64) -> MarkerId {
        let id = match self.last {
            Some(last) if now_ms <= last => last + 1,
            _ => now_ms,
        };
        self.last = Some(id);
        MarkerId(id)
    }
}
