//! Calls an HTTP inference endpoint with a tile's raw bytes (spec.md §4.3).

use super::{Detector, ErrorCounter};
use crate::api::ModelInvokeMode;
use model_runner_geometry::FeatureCollection;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Submits tile bytes as an HTTP POST body to a configured URL and parses the response as a
/// `FeatureCollection`. Never raises to its caller: connection failures, non-2xx responses, and
/// bodies that don't parse as JSON all count as a tile failure and increment `error_count`.
pub struct HttpDetector {
	endpoint: String,
	name: String,
	client: reqwest::blocking::Client,
	error_count: ErrorCounter,
}

impl HttpDetector {
	pub fn new(endpoint: impl Into<String>, name: impl Into<String>) -> Self {
		let name = name.into();
		let client = build_client(DEFAULT_TIMEOUT, &name);
		Self { endpoint: endpoint.into(), name, client, error_count: ErrorCounter::new() }
	}

	/// Rebuilds the pooled client against the new timeout. Every tile call for a region runs
	/// through the same `HttpDetector`, so the pool built here is reused across the thousands of
	/// requests a region can issue rather than opening a fresh connection per tile.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.client = build_client(timeout, &self.name);
		self
	}
}

fn build_client(timeout: Duration, name: &str) -> reqwest::blocking::Client {
	reqwest::blocking::Client::builder().timeout(timeout).build().unwrap_or_else(|error| {
		log::warn!("could not build HTTP client for detector {name}: {error}, falling back to defaults");
		reqwest::blocking::Client::new()
	})
}

impl Detector for HttpDetector {
	fn name(&self) -> &str {
		&self.name
	}

	fn mode(&self) -> ModelInvokeMode {
		ModelInvokeMode::HttpEndpoint
	}

	fn find_features(&self, tile_bytes: &[u8]) -> FeatureCollection {
		let response = match self.client.post(&self.endpoint).body(tile_bytes.to_vec()).send() {
			Ok(response) => response,
			Err(error) => {
				log::warn!("detector {} request failed: {error}", self.name);
				self.error_count.increment();
				return FeatureCollection::new(Vec::new());
			}
		};

		if response.status().is_server_error() {
			log::warn!("detector {} endpoint returned {}", self.name, response.status());
			self.error_count.increment();
			return FeatureCollection::new(Vec::new());
		}
		if !response.status().is_success() {
			log::warn!("detector {} endpoint returned {}", self.name, response.status());
			self.error_count.increment();
			return FeatureCollection::new(Vec::new());
		}

		match response.json::<FeatureCollection>() {
			Ok(collection) => collection,
			Err(error) => {
				log::warn!("detector {} returned an undecodable body: {error}", self.name);
				self.error_count.increment();
				FeatureCollection::new(Vec::new())
			}
		}
	}

	fn error_count(&self) -> u64 {
		self.error_count.get()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;
	use std::io::{Read, Write};
	use std::net::TcpListener;
	use std::thread;

	/// Spawns a single-shot HTTP server on a loopback port that always answers with `body` and
	/// `status`, then returns its `http://127.0.0.1:<port>/` base URL.
	fn spawn_stub_server(status: &'static str, body: &'static str) -> String {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let port = listener.local_addr().unwrap().port();
		thread::spawn(move || {
			if let Ok((mut stream, _)) = listener.accept() {
				let mut buf = [0u8; 4096];
				let _ = stream.read(&mut buf);
				let response = format!(
					"HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
					body.len()
				);
				let _ = stream.write_all(response.as_bytes());
			}
		});
		format!("http://127.0.0.1:{port}/")
	}

	#[test]
	fn valid_feature_collection_returned_verbatim_and_error_count_unchanged() {
		let body = r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":null,"properties":{"bounds_imcoords":[429,553,440,561],"detection_score":0.2961518168449402}}]}"#;
		let endpoint = spawn_stub_server("200 OK", body);
		let detector = HttpDetector::new(endpoint, "test");
		let collection = detector.find_features(b"tile-bytes");
		assert_eq!(collection.features.len(), 1);
		assert_eq!(detector.error_count(), 0);
	}

	#[test]
	fn bad_json_body_returns_empty_collection_and_increments_error_count() {
		let endpoint = spawn_stub_server("200 OK", "Not a json string");
		let detector = HttpDetector::new(endpoint, "test");
		let collection = detector.find_features(b"tile-bytes");
		assert!(collection.features.is_empty());
		assert_eq!(detector.error_count(), 1);
	}

	#[test]
	fn server_error_status_increments_error_count() {
		let endpoint = spawn_stub_server("503 Service Unavailable", "{}");
		let detector = HttpDetector::new(endpoint, "test");
		let collection = detector.find_features(b"tile-bytes");
		assert!(collection.features.is_empty());
		assert_eq!(detector.error_count(), 1);
	}

	#[test]
	fn connection_failure_increments_error_count() {
		// Port 0 never accepts connections once the temporary listener above has been dropped,
		// so binding-and-dropping gives us a guaranteed-closed port to connect against.
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let port = listener.local_addr().unwrap().port();
		drop(listener);
		let detector = HttpDetector::new(format!("http://127.0.0.1:{port}/"), "test")
			.with_timeout(Duration::from_millis(500));
		let collection = detector.find_features(b"tile-bytes");
		assert!(collection.features.is_empty());
		assert_eq!(detector.error_count(), 1);
	}
}
