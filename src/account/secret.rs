//! Wiped secret buffer for passwords, tokens, and client secrets.

// crates.io
use zeroize::Zeroize;
// self
use crate::_prelude::*;

/// Secret string whose backing bytes are overwritten before the memory is released.
///
/// The wipe goes through [`zeroize`], which guarantees the compiler cannot elide the
/// overwrite. Formatting is redacted so secrets never reach logs; access to the raw
/// value is explicit via [`expose`](Self::expose). The type is deliberately not `Copy`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);
impl SecretString {
	/// Wraps a new secret value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the buffer holds no bytes.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Overwrites the buffer in place, leaving it empty.
	pub(crate) fn wipe(&mut self) {
		self.0.zeroize();
	}
}
impl Drop for SecretString {
	fn drop(&mut self) {
		self.0.zeroize();
	}
}
impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self(value.to_owned())
	}
}
impl Debug for SecretString {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SecretString").field(&"<redacted>").finish()
	}
}
impl Display for SecretString {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
