use parking_lot::Mutex;

/// Catalog generation counter reported as the ContentDirectory `UpdateID`.
#[derive(Debug, Default)]
pub struct Generation {
    value: Mutex<u32>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u32 {
        *self.value.lock()
    }

    /// Advance the counter and return the new value. Never goes backwards.
    pub fn bump(&self) -> u32 {
        let mut value = self.value.lock();
        *value = value.saturating_add(1);
        *value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_bump_is_monotonic() {
        let generation = Generation::new();
        assert_eq!(generation.current(), 0);
        assert_eq!(generation.bump(), 1);
        assert_eq!(generation.bump(), 2);
        assert_eq!(generation.current(), 2);
    }

    #[test]
    fn test_concurrent_bumps() {
        let generation = Arc::new(Generation::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generation = generation.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        generation.bump();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(generation.current(), 800);
    }
}
