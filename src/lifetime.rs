//! Loaded-account registry and credential lifetime enforcement.
//!
//! Two deadlines bound what the agent may keep in memory: the account-wide unload
//! deadline (the whole record is wiped and dropped) and the password deadline (only
//! the password is wiped, the account stays loaded). The registry enforces both on
//! every lookup and on explicit [`prune`](AccountSet::prune) sweeps, so a caller that
//! polls on each request needs no timer thread. Wipes overwrite the backing bytes via
//! the secret buffer type before memory is released.

// self
use crate::{
	_prelude::*,
	account::{Account, AccountId},
};

/// Registry of loaded accounts, filled by the external loader.
#[derive(Debug, Default)]
pub struct AccountSet {
	accounts: HashMap<AccountId, Account>,
}
impl AccountSet {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Loads an account, replacing (and returning) any previous record of the same name.
	pub fn load(&mut self, account: Account) -> Option<Account> {
		self.accounts.insert(account.name().clone(), account)
	}

	/// Unloads an account by name, wiping its secrets. Returns whether one was present.
	pub fn unload(&mut self, name: &str) -> bool {
		match self.accounts.remove(name) {
			Some(mut account) => {
				account.wipe_secrets();

				true
			},
			None => false,
		}
	}

	/// Number of loaded accounts.
	pub fn len(&self) -> usize {
		self.accounts.len()
	}

	/// Returns true when no accounts are loaded.
	pub fn is_empty(&self) -> bool {
		self.accounts.is_empty()
	}

	/// Returns true when an account of this name is loaded (deadlines not consulted).
	pub fn contains(&self, name: &str) -> bool {
		self.accounts.contains_key(name)
	}

	/// Iterator over the names of all loaded accounts.
	pub fn names(&self) -> impl Iterator<Item = &AccountId> {
		self.accounts.keys()
	}

	/// Looks up an account for a flow run, enforcing both deadlines first.
	///
	/// An account past its unload deadline is wiped and removed before the lookup
	/// answers, so no flow can ever run against a dead record. A passed password
	/// deadline wipes the password but keeps the account available.
	pub fn account_mut(&mut self, name: &str, now: OffsetDateTime) -> Option<&mut Account> {
		if self.accounts.get(name).is_some_and(|account| account.due_for_unload(now)) {
			self.unload(name);

			return None;
		}

		let account = self.accounts.get_mut(name)?;

		account.expire_password(now);

		Some(account)
	}

	/// Sweeps every loaded account, applying both deadlines. Returns the unloaded names.
	pub fn prune(&mut self, now: OffsetDateTime) -> Vec<AccountId> {
		let due: Vec<AccountId> = self
			.accounts
			.values()
			.filter(|account| account.due_for_unload(now))
			.map(|account| account.name().clone())
			.collect();

		for name in &due {
			self.unload(name);
		}
		for account in self.accounts.values_mut() {
			account.expire_password(now);
		}

		due
	}

	/// Resets the password deadline on a loaded account. Returns whether it was found.
	pub fn touch_password(&mut self, name: &str, ttl: Option<Duration>, now: OffsetDateTime) -> bool {
		match self.accounts.get_mut(name) {
			Some(account) => {
				account.touch_password(ttl, now);

				true
			},
			None => false,
		}
	}

	/// Wipes the password of a loaded account immediately. Returns whether it was found.
	pub fn clear_password(&mut self, name: &str) -> bool {
		match self.accounts.get_mut(name) {
			Some(account) => {
				account.clear_password();

				true
			},
			None => false,
		}
	}
}
