use std::{future::Future, pin::Pin, time::Duration};

use web_async::Lock;

use super::Signal;

type Cleanup = Box<dyn FnOnce() + Send>;

/// An owning scope for background work.
///
/// Tasks spawned on the scope are cancelled when the scope closes; cleanup
/// callbacks run in reverse registration order. Closing is idempotent and
/// also happens on drop.
pub struct Effect {
	cancel: Signal<bool>,
	state: Lock<State>,
}

#[derive(Default)]
struct State {
	cleanups: Vec<Cleanup>,
	closed: bool,
}

impl Effect {
	pub fn new() -> Self {
		Self {
			cancel: Signal::new(false),
			state: Lock::new(State::default()),
		}
	}

	/// Register a callback to run when this scope closes.
	///
	/// Callbacks run in reverse registration order. If the scope is already
	/// closed, the callback runs immediately.
	pub fn cleanup(&self, f: impl FnOnce() + Send + 'static) {
		{
			let mut state = self.state.lock();
			if !state.closed {
				state.cleanups.push(Box::new(f));
				return;
			}
		}

		// Already closed; don't hold the lock while running the callback.
		f();
	}

	/// Run a task in the background until it completes or the scope closes.
	pub fn spawn<F: Future<Output = ()> + Send + 'static>(&self, f: F) {
		let mut cancel = self.cancel.getter();

		web_async::spawn(async move {
			tokio::select! {
				biased;
				_ = cancel.wait_for(|cancelled| *cancelled) => {}
				_ = f => {}
			}
		});
	}

	/// Run a callback on a fixed period until the scope closes.
	pub fn interval(&self, period: Duration, mut f: impl FnMut() + Send + 'static) {
		self.spawn(async move {
			let mut ticker = tokio::time::interval(period);
			ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

			// The first tick fires immediately.
			loop {
				ticker.tick().await;
				f();
			}
		});
	}

	/// Run a child scope that re-runs whenever a signal it observed changes.
	///
	/// The body reads signals through [EffectScope::get]; when any of them
	/// changes, the child's cleanups run (reverse order) and the body runs
	/// again with a fresh scope. Closing this scope stops the child for good.
	pub fn effect<F>(&self, mut body: F)
	where
		F: FnMut(&mut EffectScope) + Send + 'static,
	{
		let mut cancel = self.cancel.getter();

		web_async::spawn(async move {
			loop {
				let mut scope = EffectScope::default();
				body(&mut scope);

				let watches = std::mem::take(&mut scope.watches);
				let changed = async move {
					if watches.is_empty() {
						// Nothing observed; the body never re-runs.
						std::future::pending::<()>().await;
					}

					futures::future::select_all(watches).await;
				};

				tokio::select! {
					biased;
					_ = cancel.wait_for(|cancelled| *cancelled) => {
						scope.close();
						return;
					}
					_ = changed => scope.close(),
				}
			}
		});
	}

	/// Close the scope: cancel tasks and run cleanups in reverse order.
	pub fn close(&self) {
		let cleanups = {
			let mut state = self.state.lock();
			state.closed = true;
			std::mem::take(&mut state.cleanups)
		};

		self.cancel.set(true);

		for f in cleanups.into_iter().rev() {
			f();
		}
	}
}

impl Default for Effect {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for Effect {
	fn drop(&mut self) {
		self.close();
	}
}

/// The per-run scope handed to an [Effect::effect] body.
#[derive(Default)]
pub struct EffectScope {
	cleanups: Vec<Cleanup>,
	watches: Vec<Pin<Box<dyn Future<Output = ()> + Send>>>,
}

impl EffectScope {
	/// Read a signal and subscribe this run to its changes.
	pub fn get<T: Clone + Send + Sync + 'static>(&mut self, signal: &Signal<T>) -> T {
		let mut rx = signal.subscribe_raw();
		let value = rx.borrow_and_update().clone();

		self.watches.push(Box::pin(async move {
			if rx.changed().await.is_err() {
				// The signal is gone; it will never change again.
				std::future::pending::<()>().await
			}
		}));

		value
	}

	/// Register a callback to run before the next re-run (or on close).
	pub fn cleanup(&mut self, f: impl FnOnce() + Send + 'static) {
		self.cleanups.push(Box::new(f));
	}

	fn close(&mut self) {
		for f in self.cleanups.drain(..).rev() {
			f();
		}
	}
}
