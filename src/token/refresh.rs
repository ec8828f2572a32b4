//! Refresh request construction and refresh response parsing for both signing families.

// self
use crate::{
	_prelude::*,
	auth::{Credentials, Secret, TokenRecord, TokenRecordBuilderError},
	error::TransportError,
	http::{ApiRequest, ApiResponse, endpoint_url},
	platform::PlatformConfig,
	sign::Signer,
	token::{SIGN_METHOD, timestamp_millis, timestamp_secs},
};

/// Failures of a single refresh call.
///
/// [`TokenManager::ensure_valid_token`](crate::token::TokenManager::ensure_valid_token)
/// logs these and keeps the stale token; only
/// [`TokenManager::refresh_now`](crate::token::TokenManager::refresh_now) returns them.
#[derive(Debug, ThisError)]
pub enum RefreshError {
	/// The refresh call never produced a response.
	#[error("Refresh request failed.")]
	Transport(#[from] TransportError),
	/// The auth endpoint answered with a non-success status.
	#[error("Refresh endpoint responded with HTTP {status}: {body}.")]
	HttpStatus {
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body: String,
	},
	/// The response body is not the expected JSON document.
	#[error("Refresh response is malformed at `{path}`.")]
	Malformed {
		/// JSON path of the failing field.
		path: String,
		/// Underlying decoding failure.
		#[source]
		source: serde_json::Error,
	},
	/// The response carried no access token.
	#[error("Refresh response carried no access token (code `{code}`): {message}.")]
	MissingAccessToken {
		/// Platform error code, or `none`.
		code: String,
		/// Platform message, or `Unknown error`.
		message: String,
	},
	/// The refreshed record failed validation.
	#[error("Refreshed token record is invalid.")]
	Record(#[from] TokenRecordBuilderError),
}

#[derive(Debug, Deserialize)]
struct RefreshPayload {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default, alias = "expire_in")]
	expires_in: Option<Value>,
	#[serde(default)]
	code: Option<Value>,
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	message: Option<String>,
}
impl RefreshPayload {
	fn error_code(&self) -> String {
		match (&self.error, &self.code) {
			(Some(error), _) if !error.is_empty() => error.clone(),
			(_, Some(Value::String(code))) => code.clone(),
			(_, Some(code @ Value::Number(_))) => code.to_string(),
			_ => "none".into(),
		}
	}

	fn lifetime(&self) -> Option<Duration> {
		let secs = match self.expires_in.as_ref()? {
			Value::Number(number) => number.as_u64()?,
			Value::String(text) => text.trim().parse().ok()?,
			_ => return None,
		};

		(secs > 0).then(|| Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)))
	}
}

/// Builds the signed refresh call for `credentials`.
///
/// App-key platforms receive a form POST signed over the sorted parameters; partner
/// platforms receive a JSON body with `partner_id`, `timestamp` and a three-field
/// signature in the query string.
pub(crate) fn build_request(
	config: &PlatformConfig,
	credentials: &Credentials,
	refresh_token: &Secret,
	now: OffsetDateTime,
) -> Result<ApiRequest> {
	let url = endpoint_url(&config.auth_base, &config.refresh_path)?;
	let signer = Signer::new(config.hex_case);

	match credentials {
		Credentials::AppKey { app_key, app_secret } => {
			let mut params = BTreeMap::from([
				("app_key".to_owned(), app_key.clone()),
				("sign_method".to_owned(), SIGN_METHOD.to_owned()),
				("timestamp".to_owned(), timestamp_millis(now)),
				("refresh_token".to_owned(), refresh_token.expose().to_owned()),
			]);
			let path = config.signing_path(&config.auth_base, &url);
			let sign = signer.sign(app_secret.expose(), &path, &params);

			params.insert("sign".into(), sign);

			Ok(ApiRequest::post(url).with_form(params))
		},
		Credentials::Partner { partner_id, partner_key, shop_id } => {
			let partner = partner_id.to_string();
			let timestamp = timestamp_secs(now);
			let sign = signer
				.sign_fields(partner_key.expose(), [partner.as_str(), url.path(), timestamp.as_str()]);
			let query = BTreeMap::from([
				("partner_id".to_owned(), partner),
				("timestamp".to_owned(), timestamp),
				("sign".to_owned(), sign),
			]);
			let body = serde_json::json!({
				"shop_id": shop_id,
				"partner_id": partner_id,
				"refresh_token": refresh_token.expose(),
			});

			Ok(ApiRequest::post(url).with_query(&query).with_json(body))
		},
	}
}

/// Parses a refresh response into a new record issued at `now`.
///
/// A missing refresh token keeps `previous_refresh`; a missing or zero expiry falls back
/// to the platform's refreshed-token lifetime.
pub(crate) fn parse_response(
	config: &PlatformConfig,
	response: &ApiResponse,
	previous_refresh: Secret,
	now: OffsetDateTime,
) -> Result<TokenRecord, RefreshError> {
	if !response.is_success() {
		return Err(RefreshError::HttpStatus {
			status: response.status,
			body: response.body_preview(),
		});
	}

	let mut deserializer = serde_json::Deserializer::from_slice(&response.body);
	let payload: RefreshPayload = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| RefreshError::Malformed { path: e.path().to_string(), source: e.into_inner() })?;
	let lifetime = payload.lifetime().unwrap_or(config.refreshed_token_lifetime);
	let code = payload.error_code();
	let RefreshPayload { access_token, refresh_token, message, .. } = payload;
	let Some(access_token) = access_token.filter(|token| !token.is_empty()) else {
		return Err(RefreshError::MissingAccessToken {
			code,
			message: message.filter(|m| !m.is_empty()).unwrap_or_else(|| "Unknown error".into()),
		});
	};
	let refresh_token =
		refresh_token.filter(|token| !token.is_empty()).map(Secret::from).unwrap_or(previous_refresh);

	Ok(TokenRecord::builder()
		.access_token(access_token)
		.refresh_token(refresh_token)
		.issued_at(now)
		.expires_in(lifetime)
		.build()?)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		http::{RequestBody, ResponseMetadata},
		platform::LazadaRegion,
	};

	const NOW: OffsetDateTime = macros::datetime!(2023-11-14 22:13:20 UTC);

	fn response(status: u16, body: Value) -> ApiResponse {
		ApiResponse {
			status,
			body: serde_json::to_vec(&body).expect("Fixture body should serialize."),
			metadata: ResponseMetadata::default(),
		}
	}

	#[test]
	fn lazada_refresh_is_a_signed_form_post() {
		let config = PlatformConfig::lazada(LazadaRegion::Sg).expect("Preset should build.");
		let credentials = Credentials::app_key("K", "S");
		let request = build_request(&config, &credentials, &Secret::from("r-1"), NOW)
			.expect("Refresh request should build.");

		assert_eq!(request.url.as_str(), "https://auth.lazada.com/rest/auth/token/refresh");

		let RequestBody::Form(form) = &request.body else {
			panic!("Lazada refresh must be form encoded: {:?}", request.body);
		};
		let mut unsigned = form.clone();
		let sign = unsigned.remove("sign").expect("Form should carry a signature.");

		assert_eq!(form.get("timestamp").map(String::as_str), Some("1700000000000"));
		assert_eq!(form.get("refresh_token").map(String::as_str), Some("r-1"));
		assert_eq!(
			sign,
			Signer::new(config.hex_case).sign("S", "/auth/token/refresh", &unsigned)
		);
	}

	#[test]
	fn shopee_refresh_signs_three_fields_and_sends_json() {
		let config = PlatformConfig::shopee().expect("Preset should build.");
		let credentials = Credentials::partner(1000, "pk", 2000);
		let request = build_request(&config, &credentials, &Secret::from("r-1"), NOW)
			.expect("Refresh request should build.");
		let query = request.query_params();
		let expected = Signer::new(config.hex_case)
			.sign_fields("pk", ["1000", "/api/v2/auth/access_token/get", "1700000000"]);

		assert_eq!(query.get("sign"), Some(&expected));
		assert_eq!(
			request.body,
			RequestBody::Json(serde_json::json!({
				"shop_id": 2000,
				"partner_id": 1000,
				"refresh_token": "r-1",
			}))
		);
	}

	#[test]
	fn response_without_access_token_is_an_error() {
		let config = PlatformConfig::lazada(LazadaRegion::Sg).expect("Preset should build.");
		let err = parse_response(
			&config,
			&response(200, serde_json::json!({"code": "IllegalRefreshToken", "message": "bad"})),
			Secret::from("r-1"),
			NOW,
		)
		.expect_err("Missing access token must fail.");

		assert!(matches!(
			err,
			RefreshError::MissingAccessToken { ref code, ref message }
				if code == "IllegalRefreshToken" && message == "bad"
		));
	}

	#[test]
	fn expiry_falls_back_to_platform_default_and_refresh_token_is_kept() {
		let config = PlatformConfig::shopee().expect("Preset should build.");
		let record = parse_response(
			&config,
			&response(200, serde_json::json!({"access_token": "a-2", "error": ""})),
			Secret::from("r-1"),
			NOW,
		)
		.expect("Refresh response should parse.");

		assert_eq!(record.expires_at, NOW + Duration::hours(4));
		assert_eq!(record.refresh_token, Some(Secret::from("r-1")));

		let record = parse_response(
			&config,
			&response(200, serde_json::json!({"access_token": "a-3", "refresh_token": "r-2", "expire_in": 600})),
			Secret::from("r-1"),
			NOW,
		)
		.expect("Refresh response should parse.");

		assert_eq!(record.expires_at, NOW + Duration::seconds(600));
		assert_eq!(record.refresh_token, Some(Secret::from("r-2")));
	}

	#[test]
	fn malformed_field_reports_its_path() {
		let config = PlatformConfig::lazada(LazadaRegion::Sg).expect("Preset should build.");
		let err = parse_response(
			&config,
			&response(200, serde_json::json!({"access_token": 42})),
			Secret::from("r-1"),
			NOW,
		)
		.expect_err("Numeric access token must be rejected.");

		assert!(matches!(err, RefreshError::Malformed { ref path, .. } if path == "access_token"));
	}
}
