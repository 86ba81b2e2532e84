//! Controller state reported by the control loop.

/// Where the controller is in its advance / evade cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// Driving forward and polling for hazards.
    #[default]
    Advancing,
    /// Running the evasion plan; hazards are not looked at.
    Evading,
    /// Absorbing: motors stopped, loop exiting.
    ShuttingDown,
}

impl ControllerState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Advancing => "advancing",
            Self::Evading => "evading",
            Self::ShuttingDown => "shutting_down",
        }
    }
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
