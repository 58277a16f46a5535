//! Per-job credential refresh for `SmDetector` when an `execution_role` is set (spec.md §4.3).

use crate::errors::InvalidAssumedRoleException;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Short-lived credentials obtained by assuming an execution role.
#[derive(Debug, Clone, PartialEq)]
pub struct AssumedCredentials {
	pub access_key_id: String,
	pub secret_access_key: String,
	pub session_token: String,
	pub expires_at: Instant,
}

impl AssumedCredentials {
	pub fn is_within_margin_of_expiry(&self, margin: Duration, now: Instant) -> bool {
		self.expires_at.saturating_duration_since(now) <= margin
	}
}

/// Assumes a role and returns short-lived credentials. The managed client used by `SmDetector`
/// implements this against STS; tests use a stub.
pub trait RoleAssumer: Send + Sync {
	fn assume_role(&self, role: &str) -> Result<AssumedCredentials, InvalidAssumedRoleException>;
}

/// Caches one job's assumed-role credentials and refreshes them once within a safety margin of
/// expiry (default 5 minutes, spec.md §4.3). Fails the whole job via
/// `InvalidAssumedRoleException` if the role cannot be assumed.
pub struct CredentialProvider {
	role: String,
	refresh_margin: Duration,
	assumer: Box<dyn RoleAssumer>,
	cached: Mutex<Option<AssumedCredentials>>,
}

impl CredentialProvider {
	pub fn new(role: String, refresh_margin: Duration, assumer: Box<dyn RoleAssumer>) -> Self {
		Self { role, refresh_margin, assumer, cached: Mutex::new(None) }
	}

	/// Returns cached credentials if still outside the refresh margin, otherwise assumes the
	/// role again.
	pub fn credentials(&self, now: Instant) -> Result<AssumedCredentials, InvalidAssumedRoleException> {
		let mut cached = self.cached.lock();
		if let Some(credentials) = cached.as_ref() {
			if !credentials.is_within_margin_of_expiry(self.refresh_margin, now) {
				return Ok(credentials.clone());
			}
		}
		let fresh = self.assumer.assume_role(&self.role)?;
		*cached = Some(fresh.clone());
		Ok(fresh)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct StubAssumer {
		ttl: Duration,
	}

	impl RoleAssumer for StubAssumer {
		fn assume_role(&self, role: &str) -> Result<AssumedCredentials, InvalidAssumedRoleException> {
			Ok(AssumedCredentials {
				access_key_id: format!("AKIA-{role}"),
				secret_access_key: "secret".to_string(),
				session_token: "token".to_string(),
				expires_at: Instant::now() + self.ttl,
			})
		}
	}

	struct FailingAssumer;

	impl RoleAssumer for FailingAssumer {
		fn assume_role(&self, role: &str) -> Result<AssumedCredentials, InvalidAssumedRoleException> {
			Err(InvalidAssumedRoleException { role: role.to_string(), reason: "access denied".to_string() })
		}
	}

	#[test]
	fn caches_credentials_outside_refresh_margin() {
		let provider = CredentialProvider::new(
			"arn:aws:iam::012345678910:role/Test".to_string(),
			Duration::from_secs(300),
			Box::new(StubAssumer { ttl: Duration::from_secs(3600) }),
		);
		let now = Instant::now();
		let first = provider.credentials(now).unwrap();
		let second = provider.credentials(now).unwrap();
		assert_eq!(first, second);
	}

	#[test]
	fn refreshes_when_within_margin_of_expiry() {
		let provider = CredentialProvider::new(
			"arn:aws:iam::012345678910:role/Test".to_string(),
			Duration::from_secs(300),
			Box::new(StubAssumer { ttl: Duration::from_secs(60) }),
		);
		let now = Instant::now();
		let first = provider.credentials(now).unwrap();
		// first's expiry is within the 300s margin, so the next call must assume again.
		let second = provider.credentials(now + Duration::from_secs(1)).unwrap();
		assert_ne!(first.session_token, "".to_string());
		assert!(second.expires_at >= first.expires_at);
	}

	#[test]
	fn propagates_invalid_assumed_role_exception() {
		let provider =
			CredentialProvider::new("bad-role".to_string(), Duration::from_secs(300), Box::new(FailingAssumer));
		let result = provider.credentials(Instant::now());
		assert!(result.is_err());
	}
}
