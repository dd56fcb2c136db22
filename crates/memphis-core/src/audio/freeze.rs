//! Freeze capture-loop state machine.

use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FreezeState {
    #[default]
    Idle,
    /// Live signal is flowing into a freshly built freeze delay.
    Recording,
    /// Input closed; the captured material loops on high feedback.
    Playing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreezeInput {
    Press,
    Release,
    Clear,
}

impl FreezeState {
    /// Next state for `input`, or `None` when the input is ignored in this
    /// state.
    pub fn next(self, input: FreezeInput) -> Option<FreezeState> {
        use FreezeInput::*;
        use FreezeState::*;
        match (self, input) {
            (Recording, Press) => None,
            (Idle | Playing, Press) => Some(Recording),
            (Recording, Release) => Some(Playing),
            (Idle | Playing, Release) => None,
            (Recording | Playing, Clear) => Some(Idle),
            (Idle, Clear) => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FreezeState::Idle => "idle",
            FreezeState::Recording => "recording",
            FreezeState::Playing => "playing",
        }
    }
}

impl fmt::Display for FreezeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::FreezeInput::*;
    use super::FreezeState::*;
    use super::*;

    #[test]
    fn full_cycle() {
        let s = Idle.next(Press).unwrap();
        assert_eq!(s, Recording);
        let s = s.next(Release).unwrap();
        assert_eq!(s, Playing);
        assert_eq!(s.next(Clear), Some(Idle));
    }

    #[test]
    fn guarded_inputs_are_ignored() {
        assert_eq!(Recording.next(Press), None);
        assert_eq!(Idle.next(Release), None);
        assert_eq!(Playing.next(Release), None);
        assert_eq!(Idle.next(Clear), None);
    }

    #[test]
    fn pressing_while_looping_recaptures() {
        assert_eq!(Playing.next(Press), Some(Recording));
    }
}
