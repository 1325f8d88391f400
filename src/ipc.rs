//! Prompt surface between the engine and the surrounding IPC transport.
//!
//! The transport hands each invocation a borrowed pipe pair; the engine can write one
//! prompt and read one reply through it, and never retains the handle. Grant payloads
//! (authorization codes, device codes) travel the other way: they arrive inside a
//! [`TokenRequest`](crate::flows::TokenRequest) and are never solicited from here.
//! Flow drivers do not prompt either; a missing password stays a fast local failure,
//! and the daemon decides when to ask the user via [`Agent::request_password`].

// self
use crate::{
	_prelude::*,
	account::{Account, SecretString},
	flows::Agent,
	http::TokenHttpClient,
};

/// Environment variable the surrounding daemon uses to advertise its PID.
///
/// Managed entirely by the daemon; the engine never reads it.
pub const AGENT_PID_ENV: &str = "OIDCD_PID";
/// Environment variable carrying the daemon's socket path.
///
/// Managed entirely by the daemon; the engine never reads it.
pub const AGENT_SOCKET_ENV: &str = "OIDC_SOCK";

/// Prompt messages the engine may write to the pipe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentPrompt {
	/// User authorization is required to proceed; the transport should ask for the
	/// account password and relay the answer.
	AuthorizationRequired {
		/// Short name of the account the prompt concerns.
		account: String,
		/// Human-readable reason to display to the user.
		message: String,
	},
}

/// Reply read back from the pipe after a prompt.
#[derive(Clone, Debug)]
pub enum PromptReply {
	/// The user supplied a secret.
	Secret(SecretString),
	/// The user (or the transport on their behalf) refused.
	Refused {
		/// Why the prompt was refused.
		reason: String,
	},
}

/// Future type returned by [`PromptPipe::exchange`].
pub type PromptFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// One borrowed pipe pair: write a prompt, read the matching reply.
pub trait PromptPipe
where
	Self: Send + Sync,
{
	/// Writes `prompt` and waits synchronously (from the engine's point of view) for
	/// the transport's reply.
	fn exchange<'a>(&'a mut self, prompt: AgentPrompt) -> PromptFuture<'a, PromptReply>;
}

impl<C> Agent<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Asks the transport for the account's password and stores the answer.
	///
	/// On success the password is retained under `ttl` (`None` keeps it until logout
	/// or unload). A refusal surfaces as a typed error and leaves the account
	/// untouched.
	pub async fn request_password(
		&self,
		account: &mut Account,
		pipe: &mut dyn PromptPipe,
		message: &str,
		ttl: Option<Duration>,
	) -> Result<()> {
		let prompt = AgentPrompt::AuthorizationRequired {
			account: account.name().to_string(),
			message: message.to_owned(),
		};

		match pipe.exchange(prompt).await? {
			PromptReply::Secret(password) => {
				account.set_password(password);
				account.touch_password(ttl, OffsetDateTime::now_utc());

				Ok(())
			},
			PromptReply::Refused { reason } => Err(Error::PromptRefused { reason }),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn prompts_serialize_with_a_kind_tag() {
		let prompt = AgentPrompt::AuthorizationRequired {
			account: "egi".into(),
			message: "Password required to refresh tokens".into(),
		};
		let json = serde_json::to_string(&prompt).expect("Prompt should serialize.");

		assert_eq!(
			json,
			"{\"kind\":\"authorization_required\",\"account\":\"egi\",\"message\":\"Password required to refresh tokens\"}",
		);
	}

	#[cfg(feature = "reqwest")]
	mod with_agent {
		// self
		use super::super::*;
		use crate::{account::AccountId, http::ReqwestHttpClient};

		struct ScriptedPipe {
			reply: Option<PromptReply>,
		}
		impl PromptPipe for ScriptedPipe {
			fn exchange<'a>(&'a mut self, _prompt: AgentPrompt) -> PromptFuture<'a, PromptReply> {
				let reply = self.reply.take().expect("Pipe script exhausted.");

				Box::pin(async move { Ok(reply) })
			}
		}

		fn account() -> Account {
			let name = AccountId::new("prompted").expect("Account fixture name should be valid.");
			let issuer =
				Url::parse("https://iss.example/").expect("Account fixture issuer should parse.");

			Account::builder(name, issuer, "agent").build()
		}

		#[tokio::test]
		async fn supplied_password_is_stored_under_its_ttl() {
			let agent = Agent::with_http_client(ReqwestHttpClient::default());
			let mut account = account();
			let mut pipe =
				ScriptedPipe { reply: Some(PromptReply::Secret(SecretString::new("hunter2"))) };

			agent
				.request_password(&mut account, &mut pipe, "Re-authentication needed", Some(Duration::minutes(5)))
				.await
				.expect("Password prompt should succeed.");

			assert_eq!(account.password().map(SecretString::expose), Some("hunter2"));
			assert!(account.password_deadline().is_some());
		}

		#[tokio::test]
		async fn refusal_surfaces_as_a_typed_error() {
			let agent = Agent::with_http_client(ReqwestHttpClient::default());
			let mut account = account();
			let mut pipe = ScriptedPipe {
				reply: Some(PromptReply::Refused { reason: "user dismissed the dialog".into() }),
			};
			let err = agent
				.request_password(&mut account, &mut pipe, "Re-authentication needed", None)
				.await
				.expect_err("Refusals must fail.");

			assert!(matches!(err, Error::PromptRefused { .. }));
			assert!(account.password().is_none());
		}
	}
}
