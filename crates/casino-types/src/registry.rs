//! Registry trait for self-registering implementations.
//!
//! Endpoint and wallet implementations expose a `Registry` struct that ties
//! the key used under `implementations.<name>` in configuration to the
//! factory that builds it.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// Configuration key of this implementation, e.g. "alloy" or "local".
	const NAME: &'static str;

	/// Factory function type, defined by the owning crate.
	type Factory;

	/// Returns the factory for this implementation.
	fn factory() -> Self::Factory;
}
