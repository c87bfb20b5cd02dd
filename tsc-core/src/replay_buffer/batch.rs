use crate::Transition;

/// A batch of transitions sampled from a replay buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionBatch {
    transitions: Vec<Transition>,
    ix_sample: Vec<usize>,
}

impl TransitionBatch {
    /// Constructs a batch from transitions and the buffer slots they were taken from.
    pub fn new(transitions: Vec<Transition>, ix_sample: Vec<usize>) -> Self {
        Self {
            transitions,
            ix_sample,
        }
    }

    /// Builds a batch that does not originate from a buffer.
    pub fn from_transitions(transitions: Vec<Transition>) -> Self {
        let ix_sample = (0..transitions.len()).collect();
        Self::new(transitions, ix_sample)
    }

    /// Number of transitions.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Returns `true` if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Iterates over the transitions.
    pub fn iter(&self) -> std::slice::Iter<'_, Transition> {
        self.transitions.iter()
    }

    /// Buffer slots of the sampled transitions.
    pub fn ix_sample(&self) -> &[usize] {
        &self.ix_sample
    }

    /// Unpacks the batch into its transitions.
    pub fn into_transitions(self) -> Vec<Transition> {
        self.transitions
    }
}

impl<'a> IntoIterator for &'a TransitionBatch {
    type Item = &'a Transition;
    type IntoIter = std::slice::Iter<'a, Transition>;

    fn into_iter(self) -> Self::IntoIter {
        self.transitions.iter()
    }
}
