//! Offline JWT helpers: decode a compact token and mint HMAC-signed assertions.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Sha256, Sha384, Sha512};
// self
use crate::{
	_prelude::*,
	context::ExecutionContext,
	error::{FunctionError, RegistryError},
	function::{
		FunctionDescriptor, FunctionFuture, FunctionOutput, InputSpec, OutputSpec, SubFunction,
		ValueType, decode_inputs,
	},
};

const DEFAULT_EXPIRES_IN: i64 = 300;
const JTI_LEN: usize = 24;

/// Signing algorithms accepted by [`JwtSign`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
	/// HMAC with SHA-256.
	#[default]
	#[serde(rename = "HS256")]
	Hs256,
	/// HMAC with SHA-384.
	#[serde(rename = "HS384")]
	Hs384,
	/// HMAC with SHA-512.
	#[serde(rename = "HS512")]
	Hs512,
}
impl Algorithm {
	/// JOSE `alg` header value.
	pub const fn as_str(self) -> &'static str {
		match self {
			Algorithm::Hs256 => "HS256",
			Algorithm::Hs384 => "HS384",
			Algorithm::Hs512 => "HS512",
		}
	}

	fn sign(self, key: &[u8], input: &[u8]) -> Result<Vec<u8>, FunctionError> {
		match self {
			Algorithm::Hs256 => mac::<Hmac<Sha256>>(key, input),
			Algorithm::Hs384 => mac::<Hmac<Sha384>>(key, input),
			Algorithm::Hs512 => mac::<Hmac<Sha512>>(key, input),
		}
	}
}

/// Minimal JSON Web Key view used for signing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Jwk {
	/// Key type.
	pub kty: String,
	/// Symmetric key material (base64url).
	#[serde(default)]
	pub k: Option<String>,
	/// Key id copied into the JOSE header.
	#[serde(default)]
	pub kid: Option<String>,
}
impl Jwk {
	/// Parses a JWK given as an object or as a JSON-encoded string.
	pub fn from_value(value: Value) -> Result<Self, FunctionError> {
		let value = match value {
			Value::String(raw) => serde_json::from_str(&raw)
				.map_err(|e| FunctionError::InvalidJwk { reason: e.to_string() })?,
			other => other,
		};

		serde_json::from_value(value).map_err(|e| FunctionError::InvalidJwk { reason: e.to_string() })
	}

	/// Raw symmetric key bytes of an `oct` key.
	pub fn symmetric_key(&self) -> Result<Vec<u8>, FunctionError> {
		if self.kty != "oct" {
			return Err(FunctionError::InvalidJwk {
				reason: format!("key type `{}` cannot sign here; provide an `oct` key", self.kty),
			});
		}

		let k = self
			.k
			.as_deref()
			.ok_or_else(|| FunctionError::InvalidJwk { reason: "missing `k`".into() })?;
		let bytes = decode_segment(k)
			.map_err(|e| FunctionError::InvalidJwk { reason: format!("`k` is not base64url: {e}") })?;

		if bytes.is_empty() {
			return Err(FunctionError::InvalidJwk { reason: "`k` is empty".into() });
		}

		Ok(bytes)
	}
}

/// Parts of a compact JWT.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedJwt {
	/// JOSE header.
	pub header: JsonMap,
	/// Claims set.
	pub payload: JsonMap,
	/// Signature segment, still base64url encoded.
	pub signature: String,
}
impl DecodedJwt {
	/// Splits and decodes a compact JWS. The signature is not verified.
	pub fn parse(token: &str) -> Result<Self, FunctionError> {
		let segments = token.trim().split('.').collect::<Vec<_>>();
		let [header, payload, signature] = segments.as_slice() else {
			return Err(FunctionError::InvalidToken {
				reason: format!("expected 3 segments, found {}", segments.len()),
			});
		};

		Ok(Self {
			header: decode_json_segment("header", header)?,
			payload: decode_json_segment("payload", payload)?,
			signature: (*signature).to_owned(),
		})
	}
}

/// Decodes a compact JWT without verifying it.
#[derive(Clone, Copy, Debug, Default)]
pub struct JwtDecode;
impl SubFunction for JwtDecode {
	fn execute<'a>(&'a self, inputs: JsonMap, _context: &'a ExecutionContext) -> FunctionFuture<'a> {
		Box::pin(async move {
			#[derive(Deserialize)]
			struct DecodeRequest {
				token: String,
			}

			let request = decode_inputs::<DecodeRequest>(inputs)?;
			let decoded = DecodedJwt::parse(&request.token)?;
			let mut outputs = JsonMap::new();

			outputs.insert("header".into(), Value::Object(decoded.header));
			outputs.insert("payload".into(), Value::Object(decoded.payload));
			outputs.insert("signature".into(), Value::String(decoded.signature));

			Ok(FunctionOutput::from(outputs))
		})
	}
}

/// Mints an HMAC-signed JWT from a claims object and an `oct` JWK.
#[derive(Clone, Copy, Debug, Default)]
pub struct JwtSign;
impl SubFunction for JwtSign {
	fn execute<'a>(&'a self, inputs: JsonMap, _context: &'a ExecutionContext) -> FunctionFuture<'a> {
		Box::pin(async move {
			let request = decode_inputs::<SignRequest>(inputs)?;
			let jwk = Jwk::from_value(request.key)?;
			let key = jwk.symmetric_key()?;
			let claims = complete_claims(
				request.claims,
				OffsetDateTime::now_utc().unix_timestamp(),
				request.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
				request.include_jti.unwrap_or(true),
			);
			let mut header = JsonMap::new();

			header.insert("alg".into(), request.algorithm.as_str().into());
			header.insert("typ".into(), "JWT".into());

			if let Some(kid) = jwk.kid {
				header.insert("kid".into(), kid.into());
			}

			let signing_input = format!("{}.{}", encode_json(&header)?, encode_json(&claims)?);
			let signature = request.algorithm.sign(&key, signing_input.as_bytes())?;
			let jwt = format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature));
			let mut outputs = JsonMap::new();

			outputs.insert("jwt".into(), jwt.into());
			outputs.insert("header".into(), Value::Object(header));
			outputs.insert("claims".into(), Value::Object(claims));

			Ok(FunctionOutput::from(outputs))
		})
	}
}

#[derive(Deserialize)]
struct SignRequest {
	claims: JsonMap,
	key: Value,
	#[serde(default)]
	algorithm: Algorithm,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	include_jti: Option<bool>,
}

/// Descriptor for [`JwtDecode`].
pub fn decode_descriptor() -> Result<FunctionDescriptor, RegistryError> {
	Ok(FunctionDescriptor::builder("jwt_decode", JwtDecode)
		.name("Decode JWT")
		.description("Splits a compact JWT into header, payload, and signature without verifying it.")
		.category("jwt")
		.input("token", InputSpec::required(ValueType::String, "Compact JWT."))
		.output("header", OutputSpec::new(ValueType::Object, "JOSE header."))
		.output("payload", OutputSpec::new(ValueType::Object, "Claims set."))
		.output("signature", OutputSpec::new(ValueType::String, "Signature segment (base64url)."))
		.build()?)
}

/// Descriptor for [`JwtSign`].
pub fn sign_descriptor() -> Result<FunctionDescriptor, RegistryError> {
	Ok(FunctionDescriptor::builder("jwt_sign", JwtSign)
		.name("Sign JWT")
		.description("Mints an HMAC-signed JWT, filling iat, exp, and jti when absent.")
		.category("jwt")
		.input("claims", InputSpec::required(ValueType::Object, "Claims to sign."))
		.input("key", InputSpec::required(ValueType::Jwk, "Symmetric `oct` JWK."))
		.input(
			"algorithm",
			InputSpec::optional(ValueType::String, "HS256, HS384, or HS512.")
				.with_default(Algorithm::default().as_str()),
		)
		.input(
			"expires_in",
			InputSpec::optional(ValueType::Number, "Lifetime in seconds when `exp` is absent.")
				.with_default(DEFAULT_EXPIRES_IN),
		)
		.input(
			"include_jti",
			InputSpec::optional(ValueType::Boolean, "Add a random `jti` when absent.")
				.with_default(true),
		)
		.output("jwt", OutputSpec::new(ValueType::String, "Compact JWT."))
		.output("header", OutputSpec::new(ValueType::Object, "JOSE header."))
		.output("claims", OutputSpec::new(ValueType::Object, "Claims as signed."))
		.build()?)
}

fn complete_claims(mut claims: JsonMap, now: i64, expires_in: i64, include_jti: bool) -> JsonMap {
	let iat = match claims.get("iat").and_then(Value::as_i64) {
		Some(iat) => iat,
		None => {
			claims.entry("iat").or_insert(now.into());

			now
		},
	};

	claims.entry("exp").or_insert((iat + expires_in).into());

	if include_jti {
		claims.entry("jti").or_insert_with(|| {
			rand::rng()
				.sample_iter(&Alphanumeric)
				.take(JTI_LEN)
				.map(char::from)
				.collect::<String>()
				.into()
		});
	}

	claims
}

fn mac<M>(key: &[u8], input: &[u8]) -> Result<Vec<u8>, FunctionError>
where
	M: Mac + hmac::digest::KeyInit,
{
	let mut mac = <M as Mac>::new_from_slice(key)
		.map_err(|e| FunctionError::Signing { reason: e.to_string() })?;

	mac.update(input);

	Ok(mac.finalize().into_bytes().to_vec())
}

fn encode_json(map: &JsonMap) -> Result<String, FunctionError> {
	let bytes = serde_json::to_vec(map).map_err(|e| FunctionError::Signing { reason: e.to_string() })?;

	Ok(URL_SAFE_NO_PAD.encode(bytes))
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
	URL_SAFE_NO_PAD.decode(segment.trim_end_matches('='))
}

fn decode_json_segment(name: &str, segment: &str) -> Result<JsonMap, FunctionError> {
	let bytes = decode_segment(segment).map_err(|e| FunctionError::InvalidToken {
		reason: format!("{name} is not base64url: {e}"),
	})?;

	serde_json::from_slice(&bytes).map_err(|e| FunctionError::InvalidToken {
		reason: format!("{name} is not a JSON object: {e}"),
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const SECRET: &[u8] = b"lab-shared-secret-with-enough-bytes";

	fn inputs(value: Value) -> JsonMap {
		let Value::Object(map) = value else { unreachable!() };

		map
	}

	fn oct_jwk(kid: &str) -> Value {
		json!({ "kty": "oct", "kid": kid, "k": URL_SAFE_NO_PAD.encode(SECRET) })
	}

	#[tokio::test]
	async fn signed_token_decodes_and_verifies() {
		let ctx = ExecutionContext::default();
		let key = serde_json::to_string(&oct_jwk("lab-1")).expect("JWK should serialize.");
		let signed = JwtSign
			.execute(
				inputs(json!({
					"claims": { "sub": "alice", "aud": "https://api.example" },
					"key": key,
					"algorithm": "HS256"
				})),
				&ctx,
			)
			.await
			.expect("Signing should succeed.");
		let jwt = signed.outputs["jwt"].as_str().expect("jwt output should be a string.");
		let decoded = JwtDecode
			.execute(inputs(json!({ "token": jwt })), &ctx)
			.await
			.expect("Decoding should succeed.");

		assert_eq!(decoded.outputs["header"]["alg"], "HS256");
		assert_eq!(decoded.outputs["header"]["kid"], "lab-1");
		assert_eq!(decoded.outputs["payload"]["sub"], "alice");
		assert_eq!(
			decoded.outputs["payload"]["exp"].as_i64(),
			decoded.outputs["payload"]["iat"].as_i64().map(|iat| iat + DEFAULT_EXPIRES_IN)
		);
		assert_eq!(decoded.outputs["payload"]["jti"].as_str().map(str::len), Some(JTI_LEN));
		assert_eq!(signed.curl, None);

		let (signing_input, signature) = jwt.rsplit_once('.').expect("JWT should have a signature.");
		let mut verifier =
			<Hmac<Sha256> as Mac>::new_from_slice(SECRET).expect("HMAC accepts any key length.");

		verifier.update(signing_input.as_bytes());
		verifier
			.verify_slice(&URL_SAFE_NO_PAD.decode(signature).expect("Signature should be base64url."))
			.expect("Signature should verify.");
	}

	#[test]
	fn explicit_claims_are_preserved() {
		let claims = complete_claims(
			inputs(json!({ "iat": 100, "exp": 150, "jti": "fixed" })),
			1_000,
			300,
			true,
		);

		assert_eq!(Value::Object(claims), json!({ "iat": 100, "exp": 150, "jti": "fixed" }));

		let claims = complete_claims(inputs(json!({ "iat": 100 })), 1_000, 60, false);

		assert_eq!(Value::Object(claims), json!({ "iat": 100, "exp": 160 }));
	}

	#[tokio::test]
	async fn non_symmetric_keys_are_rejected() {
		let err = JwtSign
			.execute(
				inputs(json!({ "claims": {}, "key": { "kty": "RSA", "n": "AQAB", "e": "AQAB" } })),
				&ExecutionContext::default(),
			)
			.await
			.expect_err("RSA key should be rejected.");

		assert!(matches!(err, FunctionError::InvalidJwk { .. }), "Unexpected error: {err:?}");
	}

	#[test]
	fn malformed_tokens_are_rejected() {
		assert!(matches!(
			DecodedJwt::parse("only.two"),
			Err(FunctionError::InvalidToken { reason }) if reason == "expected 3 segments, found 2"
		));
		assert!(matches!(
			DecodedJwt::parse("!!!.e30.sig"),
			Err(FunctionError::InvalidToken { reason }) if reason.starts_with("header is not base64url")
		));
	}

	#[test]
	fn descriptors_declare_defaults() {
		let sign = sign_descriptor().expect("Descriptor should build.");

		assert_eq!(sign.inputs["algorithm"].default, Some(json!("HS256")));
		assert_eq!(sign.inputs["expires_in"].default, Some(json!(300)));
		assert!(sign.inputs["key"].required);
		assert_eq!(decode_descriptor().expect("Descriptor should build.").category, "jwt");
	}
}
