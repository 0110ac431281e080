use tokio::sync::watch;

/// A cell holding a value, notifying subscribers when it changes.
///
/// Cloning a Signal clones the handle, not the value; all clones share the
/// same cell. Reads via [Signal::peek] are unobserved; to react to changes,
/// create a [Getter] or read through an effect scope.
pub struct Signal<T> {
	tx: watch::Sender<T>,
}

impl<T> Signal<T> {
	pub fn new(value: T) -> Self {
		Self {
			tx: watch::channel(value).0,
		}
	}

	/// Read the current value without subscribing to changes.
	pub fn peek(&self) -> T
	where
		T: Clone,
	{
		self.tx.borrow().clone()
	}

	/// Replace the value, notifying subscribers only if it actually changed.
	///
	/// Returns true if the value changed.
	pub fn set(&self, value: T) -> bool
	where
		T: PartialEq,
	{
		self.tx.send_if_modified(|current| {
			if *current == value {
				return false;
			}

			*current = value;
			true
		})
	}

	/// Mutate the value in place, always notifying subscribers.
	///
	/// Use this for state that is too expensive (or unable) to compare.
	pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
		let mut result = None;
		self.tx.send_modify(|value| result = Some(f(value)));
		result.unwrap()
	}

	/// A read-only projection of this signal.
	pub fn getter(&self) -> Getter<T> {
		Getter {
			rx: self.tx.subscribe(),
		}
	}

	pub(crate) fn subscribe_raw(&self) -> watch::Receiver<T> {
		self.tx.subscribe()
	}

	/// Wait until every [Getter] has been dropped.
	///
	/// The future is detached from `self` so it can ride a select! alongside
	/// mutable access.
	pub fn unused(&self) -> impl std::future::Future<Output = ()> + Send + 'static
	where
		T: Send + Sync + 'static,
	{
		let tx = self.tx.clone();
		async move { tx.closed().await }
	}
}

impl<T> Clone for Signal<T> {
	fn clone(&self) -> Self {
		Self { tx: self.tx.clone() }
	}
}

impl<T: Default> Default for Signal<T> {
	fn default() -> Self {
		Self::new(T::default())
	}
}

/// A read-only view of a [Signal].
pub struct Getter<T> {
	rx: watch::Receiver<T>,
}

impl<T> Getter<T> {
	/// Read the current value.
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.rx.borrow().clone()
	}

	/// Wait for the value to change, returning the new value.
	///
	/// Returns None once the signal has been dropped.
	pub async fn updated(&mut self) -> Option<T>
	where
		T: Clone,
	{
		self.rx.changed().await.ok()?;
		Some(self.rx.borrow_and_update().clone())
	}

	/// Wait until the value satisfies the predicate, returning it.
	///
	/// Returns None if the signal is dropped before the predicate matches.
	pub async fn wait_for<F>(&mut self, pred: F) -> Option<T>
	where
		T: Clone,
		F: FnMut(&T) -> bool,
	{
		let value = self.rx.wait_for(pred).await.ok()?;
		Some(value.clone())
	}
}

impl<T> Clone for Getter<T> {
	fn clone(&self) -> Self {
		Self { rx: self.rx.clone() }
	}
}
