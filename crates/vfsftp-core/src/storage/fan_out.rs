use serde::Deserialize;

const DEFAULT_FAN_OUT: usize = 5;

/// The number of store requests a bulk operation, such as removing a directory, keeps in flight.
/// Never zero: smaller values are raised to one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "usize")]
pub struct FanOut(usize);

impl FanOut {
    /// The bound itself.
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for FanOut {
    fn default() -> Self {
        FanOut(DEFAULT_FAN_OUT)
    }
}

impl From<usize> for FanOut {
    fn from(n: usize) -> Self {
        FanOut(n.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn zero_is_raised_to_one() {
        assert_eq!(FanOut::from(0).get(), 1);
        assert_eq!(FanOut::from(3).get(), 3);
        assert_eq!(FanOut::default().get(), 5);
    }
}
