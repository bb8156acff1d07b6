//! Transaction monitoring for submitted wagers.
//!
//! Polls the endpoint for a receipt at a fixed interval until the transaction
//! is included or the confirmation timeout elapses, then reads the wager
//! outcome from the receipt's logs.

use crate::submitter::SubmitError;
use casino_decoder::EventDecoder;
use casino_endpoint::EndpointInterface;
use casino_types::{
	truncate_id, Address, DomainEvent, TransactionHash, TransactionReceipt, WagerOutcome,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

pub struct TransactionMonitor {
	endpoint: Arc<dyn EndpointInterface>,
	decoder: EventDecoder,
	poll_interval: Duration,
	timeout: Duration,
}

impl TransactionMonitor {
	pub fn new(
		endpoint: Arc<dyn EndpointInterface>,
		decoder: EventDecoder,
		poll_interval: Duration,
		timeout: Duration,
	) -> Self {
		Self {
			endpoint,
			decoder,
			poll_interval,
			timeout,
		}
	}

	/// Waits until `hash` is included.
	///
	/// Endpoint errors while polling are treated as "not yet known". A
	/// reverted transaction is [`SubmitError::TransactionFailed`].
	#[instrument(skip_all, fields(tx_hash = %truncate_id(&hash.to_string())))]
	pub async fn wait_for_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<TransactionReceipt, SubmitError> {
		let start_time = tokio::time::Instant::now();

		loop {
			if start_time.elapsed() >= self.timeout {
				tracing::warn!(
					timeout_secs = self.timeout.as_secs(),
					"Confirmation timeout reached"
				);
				return Err(SubmitError::ConfirmationTimeout(*hash));
			}

			match self.endpoint.get_receipt(hash).await {
				Ok(Some(receipt)) if receipt.success => {
					tracing::info!(block = receipt.block_number, "Confirmed");
					return Ok(receipt);
				},
				Ok(Some(receipt)) => {
					tracing::warn!(block = receipt.block_number, "Transaction reverted");
					return Err(SubmitError::TransactionFailed {
						hash: *hash,
						reason: "Transaction reverted".into(),
					});
				},
				Ok(None) => {
					tracing::debug!(
						elapsed_secs = start_time.elapsed().as_secs(),
						"Waiting for transaction to be mined"
					);
				},
				Err(e) => {
					tracing::debug!(error = %e, "Checking transaction status");
				},
			}

			tokio::time::sleep(self.poll_interval).await;
		}
	}

	/// Outcome of the dice round `player` played in `receipt`.
	pub fn read_outcome(&self, receipt: &TransactionReceipt, player: Address) -> WagerOutcome {
		self.decoder
			.decode_all(&receipt.logs)
			.into_iter()
			.find_map(|event| match event {
				DomainEvent::DiceRolled(resolved) if resolved.player == player => {
					Some(if resolved.won {
						WagerOutcome::Won {
							game_id: resolved.game_id,
							result: resolved.result,
							payout: resolved.payout,
						}
					} else {
						WagerOutcome::Lost {
							game_id: resolved.game_id,
							result: resolved.result,
						}
					})
				},
				_ => None,
			})
			.unwrap_or(WagerOutcome::Unresolved)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::{
		ether, mock_hash, resolved_event, roll_receipt, started_event, CASINO, PLAYER,
	};
	use casino_endpoint::implementations::mock::MockEndpoint;
	use casino_types::U256;

	fn monitor(endpoint: Arc<MockEndpoint>) -> TransactionMonitor {
		TransactionMonitor::new(
			endpoint,
			EventDecoder::new(CASINO),
			Duration::from_millis(100),
			Duration::from_secs(5),
		)
	}

	#[tokio::test(start_paused = true)]
	async fn test_receipt_after_polling() {
		let endpoint = Arc::new(MockEndpoint::new());
		let monitor = monitor(endpoint.clone());
		let receipt = roll_receipt(
			mock_hash(1),
			&started_event(1, PLAYER, "0.05", 20),
			&resolved_event(1, PLAYER, 3, 3, "0.30", 20),
		);

		let delayed = endpoint.clone();
		let inserted = receipt.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(450)).await;
			delayed.insert_receipt(inserted).await;
		});

		let found = monitor.wait_for_receipt(&mock_hash(1)).await.unwrap();
		assert_eq!(found, receipt);
		assert_eq!(
			monitor.read_outcome(&found, PLAYER),
			WagerOutcome::Won {
				game_id: U256::from(1),
				result: 3,
				payout: ether("0.30"),
			}
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_timeout() {
		let endpoint = Arc::new(MockEndpoint::new());
		let result = monitor(endpoint).wait_for_receipt(&mock_hash(1)).await;
		assert_eq!(result, Err(SubmitError::ConfirmationTimeout(mock_hash(1))));
	}

	#[tokio::test(start_paused = true)]
	async fn test_endpoint_errors_keep_polling() {
		let endpoint = Arc::new(MockEndpoint::new());
		endpoint.fail_next(3).await;
		endpoint
			.insert_receipt(roll_receipt(
				mock_hash(1),
				&started_event(1, PLAYER, "0.05", 20),
				&resolved_event(1, PLAYER, 3, 1, "0", 20),
			))
			.await;

		assert!(monitor(endpoint).wait_for_receipt(&mock_hash(1)).await.is_ok());
	}

	#[tokio::test]
	async fn test_reverted_receipt() {
		let endpoint = Arc::new(MockEndpoint::new());
		endpoint
			.insert_receipt(TransactionReceipt {
				hash: mock_hash(1),
				block_number: 4,
				success: false,
				logs: vec![],
			})
			.await;

		assert!(matches!(
			monitor(endpoint).wait_for_receipt(&mock_hash(1)).await,
			Err(SubmitError::TransactionFailed { .. })
		));
	}

	#[test]
	fn test_outcome_for_other_player_is_unresolved() {
		let monitor = monitor(Arc::new(MockEndpoint::new()));
		let receipt = roll_receipt(
			mock_hash(1),
			&started_event(1, PLAYER, "0.05", 20),
			&resolved_event(1, PLAYER, 3, 1, "0", 20),
		);

		assert!(matches!(
			monitor.read_outcome(&receipt, PLAYER),
			WagerOutcome::Lost { result: 1, .. }
		));
		assert_eq!(
			monitor.read_outcome(&receipt, Address::with_last_byte(0xbb)),
			WagerOutcome::Unresolved
		);
	}
}
