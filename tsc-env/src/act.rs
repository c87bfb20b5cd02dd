use tsc_core::Act;

/// A signal action.
///
/// Actions are enumerated as `Extend = 0` and `Activate(p) = p + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalAct {
    /// Keep the current phase green for one more step.
    Extend,

    /// Switch to the given phase. Selecting the current phase is the same as
    /// [`SignalAct::Extend`].
    Activate(usize),
}

impl Act for SignalAct {
    fn index(&self) -> usize {
        match self {
            Self::Extend => 0,
            Self::Activate(p) => p + 1,
        }
    }

    fn from_index(ix: usize) -> Self {
        match ix {
            0 => Self::Extend,
            ix => Self::Activate(ix - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index() {
        for ix in 0..5 {
            assert_eq!(SignalAct::from_index(ix).index(), ix);
        }
        assert_eq!(SignalAct::from_index(2), SignalAct::Activate(1));
    }
}
