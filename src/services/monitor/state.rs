use std::fmt;

/// Lifecycle of the live feed session
///
/// `Stopped` is both the initial and the terminal state. Connection errors move a
/// connected session to `Disconnected`, from where the monitor reconnects.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum MonitorState {
	#[default]
	Stopped,
	Connecting,
	Connected,
	Processing,
	Disconnected,
}

impl MonitorState {
	/// Whether a feed connection is currently open
	pub fn is_connected(&self) -> bool {
		matches!(self, Self::Connected | Self::Processing)
	}

	pub fn can_transition_to(&self, next: MonitorState) -> bool {
		use MonitorState::*;
		match (self, next) {
			(_, Stopped) => true,
			(Stopped, Connecting) => true,
			(Connecting, Connected) | (Connecting, Disconnected) => true,
			(Connected, Processing) | (Processing, Connected) => true,
			(Connected, Disconnected) | (Processing, Disconnected) => true,
			(Disconnected, Connecting) => true,
			_ => false,
		}
	}
}

impl fmt::Display for MonitorState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Stopped => "stopped",
			Self::Connecting => "connecting",
			Self::Connected => "connected",
			Self::Processing => "processing",
			Self::Disconnected => "disconnected",
		};
		f.write_str(name)
	}
}
