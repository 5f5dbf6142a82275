//! Placeholder body obfuscation schemes.
//!
//! None of these schemes provide confidentiality or integrity. They reproduce the wire format the
//! backend expects for sealed bodies (`{"encrypted": "<sealed>"}` plus the `X-Encrypted` and
//! `X-Encrypt-Type` headers) and must not be mistaken for cryptography:
//!
//! - `simple`: XOR with the shared key, then standard Base64.
//! - `aes`: XOR with `key ^ salt ^ iv` (16 random bytes each), encoded as `salt:iv:data` in Base64.
//!   Despite the name no AES is involved.
//! - `rsa` / `sm2`: Base64 of the plaintext, gated on a configured public key. The client holds no
//!   private key, so sealed responses in these schemes cannot be opened.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;
// self
use crate::_prelude::*;

/// Header flagging a sealed body.
pub const ENCRYPTED_HEADER: &str = "x-encrypted";
/// Header naming the scheme of a sealed body.
pub const ENCRYPT_TYPE_HEADER: &str = "x-encrypt-type";
/// Body member carrying the sealed payload.
pub const ENCRYPTED_FIELD: &str = "encrypted";

const MASK_LEN: usize = 16;

/// Obfuscation scheme names recognized in configuration and headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncryptionType {
	/// XOR + Base64.
	Simple,
	/// Salted XOR in `salt:iv:data` layout.
	Aes,
	/// Base64 placeholder keyed on an RSA public key.
	Rsa,
	/// Base64 placeholder keyed on an SM2 public key.
	Sm2,
}
impl EncryptionType {
	/// Returns the lowercase wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			EncryptionType::Simple => "simple",
			EncryptionType::Aes => "aes",
			EncryptionType::Rsa => "rsa",
			EncryptionType::Sm2 => "sm2",
		}
	}
}
impl Display for EncryptionType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for EncryptionType {
	type Err = CipherError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"simple" => Ok(Self::Simple),
			"aes" => Ok(Self::Aes),
			"rsa" => Ok(Self::Rsa),
			"sm2" => Ok(Self::Sm2),
			_ => Err(CipherError::UnknownScheme { label: s.to_owned() }),
		}
	}
}
impl<'de> Deserialize<'de> for EncryptionType {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		raw.parse().map_err(serde::de::Error::custom)
	}
}
impl Serialize for EncryptionType {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(self.as_str())
	}
}

/// Errors raised while sealing or opening a body.
#[derive(Debug, ThisError)]
pub enum CipherError {
	/// Scheme label is not recognized.
	#[error("Unknown encryption scheme `{label}`.")]
	UnknownScheme {
		/// Offending label.
		label: String,
	},
	/// Scheme needs key material that is not configured.
	#[error("The {scheme} scheme has no key configured.")]
	MissingKey {
		/// Scheme lacking a key.
		scheme: EncryptionType,
	},
	/// Shared key is empty.
	#[error("The obfuscation key must not be empty.")]
	EmptyKey,
	/// Opening requires a private key the client does not hold.
	#[error("The {scheme} scheme cannot be opened on the client.")]
	Unsupported {
		/// Scheme that cannot be opened.
		scheme: EncryptionType,
	},
	/// Sealed text does not follow the `salt:iv:data` layout.
	#[error("Sealed payload is malformed.")]
	MalformedPayload,
	/// Base64 decoding failed.
	#[error(transparent)]
	Base64(#[from] base64::DecodeError),
	/// Opened bytes are not UTF-8.
	#[error(transparent)]
	Utf8(#[from] std::string::FromUtf8Error),
}

/// Configured obfuscation scheme with its key material.
#[derive(Clone, PartialEq, Eq)]
pub enum BodyCipher {
	/// XOR + Base64 with a shared key.
	Simple {
		/// Shared key.
		key: String,
	},
	/// Salted XOR with a shared key.
	Aes {
		/// Shared key.
		key: String,
	},
	/// Base64 placeholder gated on a public key.
	Rsa {
		/// PEM or Base64 public key.
		public_key: String,
	},
	/// Base64 placeholder gated on a public key.
	Sm2 {
		/// Hex public key.
		public_key: String,
	},
}
impl BodyCipher {
	/// Returns the scheme label sent in `X-Encrypt-Type`.
	pub fn kind(&self) -> EncryptionType {
		match self {
			BodyCipher::Simple { .. } => EncryptionType::Simple,
			BodyCipher::Aes { .. } => EncryptionType::Aes,
			BodyCipher::Rsa { .. } => EncryptionType::Rsa,
			BodyCipher::Sm2 { .. } => EncryptionType::Sm2,
		}
	}

	/// Obfuscates `plaintext`.
	pub fn seal(&self, plaintext: &str) -> Result<String, CipherError> {
		match self {
			BodyCipher::Simple { key } => {
				let key = non_empty_key(key)?;

				Ok(STANDARD.encode(xor_with(plaintext.as_bytes(), |i| key[i % key.len()])))
			},
			BodyCipher::Aes { key } => {
				let key = non_empty_key(key)?;
				let mut salt = [0_u8; MASK_LEN];
				let mut iv = [0_u8; MASK_LEN];
				let mut rng = rand::rng();

				rng.fill_bytes(&mut salt);
				rng.fill_bytes(&mut iv);

				let data = xor_with(plaintext.as_bytes(), |i| salted_mask(key, &salt, &iv, i));

				Ok(format!(
					"{}:{}:{}",
					STANDARD.encode(salt),
					STANDARD.encode(iv),
					STANDARD.encode(data)
				))
			},
			BodyCipher::Rsa { public_key } | BodyCipher::Sm2 { public_key } => {
				if public_key.is_empty() {
					return Err(CipherError::MissingKey { scheme: self.kind() });
				}

				Ok(STANDARD.encode(plaintext))
			},
		}
	}

	/// Reverses [`seal`](Self::seal).
	pub fn open(&self, sealed: &str) -> Result<String, CipherError> {
		match self {
			BodyCipher::Simple { key } => {
				let key = non_empty_key(key)?;
				let bytes = STANDARD.decode(sealed.trim())?;

				Ok(String::from_utf8(xor_with(&bytes, |i| key[i % key.len()]))?)
			},
			BodyCipher::Aes { key } => {
				let key = non_empty_key(key)?;
				let mut parts = sealed.trim().split(':');
				let (Some(salt), Some(iv), Some(data), None) =
					(parts.next(), parts.next(), parts.next(), parts.next())
				else {
					return Err(CipherError::MalformedPayload);
				};
				let salt = STANDARD.decode(salt)?;
				let iv = STANDARD.decode(iv)?;
				let data = STANDARD.decode(data)?;

				if salt.is_empty() || iv.is_empty() {
					return Err(CipherError::MalformedPayload);
				}

				Ok(String::from_utf8(xor_with(&data, |i| salted_mask(key, &salt, &iv, i)))?)
			},
			BodyCipher::Rsa { .. } | BodyCipher::Sm2 { .. } =>
				Err(CipherError::Unsupported { scheme: self.kind() }),
		}
	}
}
impl Debug for BodyCipher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("BodyCipher").field(&self.kind().as_str()).finish()
	}
}

fn non_empty_key(key: &str) -> Result<&[u8], CipherError> {
	if key.is_empty() { Err(CipherError::EmptyKey) } else { Ok(key.as_bytes()) }
}

fn salted_mask(key: &[u8], salt: &[u8], iv: &[u8], i: usize) -> u8 {
	key[i % key.len()] ^ salt[i % salt.len()] ^ iv[i % iv.len()]
}

fn xor_with(input: &[u8], mask: impl Fn(usize) -> u8) -> Vec<u8> {
	input.iter().enumerate().map(|(i, byte)| byte ^ mask(i)).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const PLAINTEXT: &str = r#"{"score":120,"name":"测试加密"}"#;

	#[test]
	fn simple_scheme_reverses_itself() {
		let cipher = BodyCipher::Simple { key: "default_key".into() };
		let sealed = cipher.seal(PLAINTEXT).expect("Sealing should succeed.");

		assert_ne!(sealed, PLAINTEXT);
		assert_eq!(cipher.open(&sealed).expect("Opening should succeed."), PLAINTEXT);
	}

	#[test]
	fn simple_scheme_matches_known_vector() {
		let cipher = BodyCipher::Simple { key: "k".into() };

		// 'a' ^ 'k' = 0x0a, 'b' ^ 'k' = 0x09
		assert_eq!(cipher.seal("ab").expect("Sealing should succeed."), STANDARD.encode([0x0a, 0x09]));
	}

	#[test]
	fn aes_placeholder_uses_fresh_salt_per_seal() {
		let cipher = BodyCipher::Aes { key: "12345678901234567890123456789012".into() };
		let first = cipher.seal(PLAINTEXT).expect("Sealing should succeed.");
		let second = cipher.seal(PLAINTEXT).expect("Sealing should succeed.");

		assert_eq!(first.split(':').count(), 3);
		assert_ne!(first, second);
		assert_eq!(cipher.open(&first).expect("Opening should succeed."), PLAINTEXT);
		assert_eq!(cipher.open(&second).expect("Opening should succeed."), PLAINTEXT);
	}

	#[test]
	fn aes_placeholder_rejects_malformed_layouts() {
		let cipher = BodyCipher::Aes { key: "k".into() };

		assert!(matches!(cipher.open("only:two"), Err(CipherError::MalformedPayload)));
		assert!(matches!(cipher.open("a:b:c:d"), Err(CipherError::MalformedPayload)));
		assert!(matches!(cipher.open("!!:!!:!!"), Err(CipherError::Base64(_))));
	}

	#[test]
	fn public_key_schemes_cannot_be_opened() {
		let cipher = BodyCipher::Rsa { public_key: "MIIB".into() };
		let sealed = cipher.seal("{}").expect("Sealing should succeed with a public key.");

		assert_eq!(sealed, STANDARD.encode("{}"));
		assert!(matches!(
			cipher.open(&sealed),
			Err(CipherError::Unsupported { scheme: EncryptionType::Rsa })
		));
		assert!(matches!(
			BodyCipher::Sm2 { public_key: String::new() }.seal("{}"),
			Err(CipherError::MissingKey { scheme: EncryptionType::Sm2 })
		));
	}

	#[test]
	fn scheme_labels_parse_case_insensitively() {
		assert_eq!("AES".parse::<EncryptionType>().expect("AES should parse."), EncryptionType::Aes);
		assert_eq!(" Sm2 ".parse::<EncryptionType>().expect("SM2 should parse."), EncryptionType::Sm2);
		assert!("des".parse::<EncryptionType>().is_err());
	}

	#[test]
	fn debug_output_hides_key_material() {
		let cipher = BodyCipher::Simple { key: "hunter2".into() };

		assert_eq!(format!("{cipher:?}"), "BodyCipher(\"simple\")");
	}
}
