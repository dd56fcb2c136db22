// Keyboard shortcuts for the playground page. Pure so it can be tested on the host.

/// What a key does to the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    ToggleMute,
    Reset,
    MorePopulation,
    FewerPopulation,
    FreezePress,
    FreezeRelease,
    ClearFreeze,
}

/// Step applied by the population shortcuts.
pub const POPULATION_STEP: usize = 1;

/// Action for a `keydown`. Auto-repeated presses are ignored for the freeze
/// key so holding `f` keeps recording instead of restarting the capture.
#[inline]
pub fn action_for_key_down(key: &str, repeat: bool) -> Option<KeyAction> {
    match key {
        "m" | "M" => Some(KeyAction::ToggleMute),
        "r" | "R" => Some(KeyAction::Reset),
        "+" | "=" => Some(KeyAction::MorePopulation),
        "-" | "_" => Some(KeyAction::FewerPopulation),
        "f" | "F" if !repeat => Some(KeyAction::FreezePress),
        "c" | "C" => Some(KeyAction::ClearFreeze),
        _ => None,
    }
}

/// Action for a `keyup`.
#[inline]
pub fn action_for_key_up(key: &str) -> Option<KeyAction> {
    match key {
        "f" | "F" => Some(KeyAction::FreezeRelease),
        _ => None,
    }
}

/// Population after applying `action` to `current`. Clamping to the valid
/// range happens in the scene.
#[inline]
pub fn next_population(current: usize, action: KeyAction) -> Option<usize> {
    match action {
        KeyAction::MorePopulation => Some(current.saturating_add(POPULATION_STEP)),
        KeyAction::FewerPopulation => Some(current.saturating_sub(POPULATION_STEP)),
        _ => None,
    }
}
