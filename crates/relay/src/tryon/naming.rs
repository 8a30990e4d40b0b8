//! Object names for generated images.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Issues `tryon_<epoch-ms>.png` names.
///
/// Names are strictly increasing within a process: if two requests land in
/// the same millisecond, the later one is bumped forward by one.
#[derive(Debug, Default)]
pub struct ObjectNamer {
    last: AtomicI64,
}

impl ObjectNamer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// Next object name, using the current wall clock.
    pub fn next_name(&self) -> String {
        self.next_name_at(Utc::now().timestamp_millis())
    }

    /// Next object name for a given clock reading.
    pub fn next_name_at(&self, now_ms: i64) -> String {
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_ms.max(previous + 1);
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format!("tryon_{candidate}.png"),
                Err(actual) => previous = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_name_format() {
        let namer = ObjectNamer::new();
        assert_eq!(namer.next_name_at(1_700_000_000_000), "tryon_1700000000000.png");
    }

    #[test]
    fn test_same_millisecond_is_bumped() {
        let namer = ObjectNamer::new();
        assert_eq!(namer.next_name_at(1000), "tryon_1000.png");
        assert_eq!(namer.next_name_at(1000), "tryon_1001.png");
        // Clock went backwards
        assert_eq!(namer.next_name_at(900), "tryon_1002.png");
        assert_eq!(namer.next_name_at(5000), "tryon_5000.png");
    }

    #[test]
    fn test_concurrent_names_are_distinct() {
        let namer = Arc::new(ObjectNamer::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let namer = Arc::clone(&namer);
                std::thread::spawn(move || (0..100).map(|_| namer.next_name_at(42)).collect::<Vec<_>>())
            })
            .collect();

        let mut names = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap_or_default() {
                assert!(names.insert(name));
            }
        }
        assert_eq!(names.len(), 800);
    }
}
