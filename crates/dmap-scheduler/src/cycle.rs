//! Monotonic cycle tokens.

use serde::Serialize;

/// Identifies one refresh cycle. Later cycles have larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct CycleToken(u64);

impl CycleToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Issues tokens and remembers the newest one.
#[derive(Debug, Default)]
pub struct CycleRegister {
    latest: u64,
}

impl CycleRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> CycleToken {
        self.latest += 1;
        CycleToken(self.latest)
    }

    /// Whether `token` is the most recently issued one.
    pub fn is_latest(&self, token: CycleToken) -> bool {
        token.0 == self.latest
    }

    pub fn latest(&self) -> CycleToken {
        CycleToken(self.latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_increase() {
        let mut reg = CycleRegister::new();
        let a = reg.issue();
        let b = reg.issue();
        assert!(b > a);
        assert!(reg.is_latest(b));
        assert!(!reg.is_latest(a));
        assert_eq!(reg.latest(), b);
    }
}
