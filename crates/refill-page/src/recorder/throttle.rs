use std::collections::HashMap;

/// Per-selector typing throttle.
///
/// An event may be captured only if at least `window_ms` elapsed since the
/// last *persisted* entry for the same selector. Events inside the window are
/// dropped outright; nothing is buffered or coalesced.
#[derive(Debug, Clone)]
pub struct TypingThrottle {
    window_ms: u64,
    last_persisted: HashMap<String, u64>,
}

impl TypingThrottle {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_persisted: HashMap::new(),
        }
    }

    pub fn is_open(&self, selector: &str, at_ms: u64) -> bool {
        self.last_persisted
            .get(selector)
            .is_none_or(|last| at_ms.saturating_sub(*last) >= self.window_ms)
    }

    /// Start a new window for `selector`. Call only once an entry exists.
    pub fn mark_persisted(&mut self, selector: &str, at_ms: u64) {
        self.last_persisted.insert(selector.to_string(), at_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every admitted event is persisted.
    fn admit(throttle: &mut TypingThrottle, selector: &str, at_ms: u64) -> bool {
        let open = throttle.is_open(selector, at_ms);
        if open {
            throttle.mark_persisted(selector, at_ms);
        }
        open
    }

    #[test]
    fn drops_events_inside_the_window() {
        let mut throttle = TypingThrottle::new(500);
        let admitted: Vec<u64> = [0, 100, 200, 600]
            .into_iter()
            .filter(|t| admit(&mut throttle, "#email", *t))
            .collect();
        assert_eq!(admitted, vec![0, 600]);
    }

    #[test]
    fn window_is_measured_from_last_persisted_entry() {
        let mut throttle = TypingThrottle::new(500);
        assert!(admit(&mut throttle, "#q", 0));
        assert!(!admit(&mut throttle, "#q", 499));
        assert!(admit(&mut throttle, "#q", 500));
        assert!(!admit(&mut throttle, "#q", 999));
    }

    #[test]
    fn checking_the_window_does_not_consume_it() {
        let mut throttle = TypingThrottle::new(500);
        assert!(throttle.is_open("#q", 0));
        assert!(throttle.is_open("#q", 10));
        throttle.mark_persisted("#q", 10);
        assert!(!throttle.is_open("#q", 20));
        assert!(throttle.is_open("#q", 510));
    }

    #[test]
    fn selectors_are_independent() {
        let mut throttle = TypingThrottle::new(500);
        assert!(admit(&mut throttle, "#a", 0));
        assert!(admit(&mut throttle, "#b", 10));
        assert!(!admit(&mut throttle, "#a", 20));
    }
}
