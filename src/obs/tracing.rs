// self
use crate::{_prelude::*, expr::ExpressionError, obs::OperationKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by engine operations.
#[derive(Clone, Debug)]
pub struct EngineSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl EngineSpan {
	/// Creates a new span tagged with the operation kind and its subject (function id or
	/// chain length).
	pub fn new(kind: OperationKind, subject: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("oauth2_lab.engine", op = kind.as_str(), subject);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, subject);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a step that ended in failure.
pub fn step_failed(function: &str, error: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(function, error, "sub function failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (function, error);
}

/// Logs a chain step whose id overwrites an earlier step's outputs.
pub fn duplicate_step_id(step: &str, index: usize) {
	#[cfg(feature = "tracing")]
	tracing::warn!(step, index, "step id repeats; earlier subFn outputs are overwritten");
	#[cfg(not(feature = "tracing"))]
	let _ = (step, index);
}

/// Logs an expression body that could not be parsed and is left unresolved.
pub fn expression_rejected(body: &str, error: &ExpressionError) {
	#[cfg(feature = "tracing")]
	tracing::debug!(expression = body, %error, "template expression left unresolved");
	#[cfg(not(feature = "tracing"))]
	let _ = (body, error);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn span_and_events_are_safe_without_subscriber() {
		let _span = EngineSpan::new(OperationKind::Step, "jwt_decode");

		step_failed("jwt_decode", "Invalid JWT");
		duplicate_step_id("sign", 2);
		expression_rejected("secrets.key", &ExpressionError::Empty);
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = EngineSpan::new(OperationKind::Chain, "3");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
