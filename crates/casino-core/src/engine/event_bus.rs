//! Broadcast channel for engine events.
//!
//! Every subscriber receives every event published after it subscribed.
//! Publishing never blocks; with no subscribers the event is dropped.

use casino_types::CasinoEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<CasinoEvent>,
}

impl EventBus {
	/// Creates a bus buffering up to `capacity` events per lagging receiver.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<CasinoEvent> {
		self.sender.subscribe()
	}

	/// Returns the number of receivers reached, or an error when none exist.
	pub fn publish(
		&self,
		event: CasinoEvent,
	) -> Result<usize, broadcast::error::SendError<CasinoEvent>> {
		self.sender.send(event)
	}
}
