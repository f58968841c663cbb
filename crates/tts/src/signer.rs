use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Shared signing key for the vendor's bootstrap endpoint
///
/// Fixed by the vendor's client protocol, not a secret of this service.
const SIGNING_KEY_B64: &str = "oik6PdDdMnOXemTbwvMn9de/h9lFnfBaCWbGMMZqqoSaQaqUOqjVGm5NqsmjcBI1x+sS9ugjB55HEJWRiFXYFw==";

const SIGNATURE_PREFIX: &str = "MSTranslatorAndroidApp";

pub(crate) const CLIENT_VERSION: &str = "4.0.530a 5fe1dc6c";
pub(crate) const USER_AGENT: &str = "okhttp/4.5.0";
pub(crate) const HOME_GEOGRAPHIC_REGION: &str = "zh-Hans-CN";

/// Compute the time-bound bootstrap signature for `url`
///
/// Pure function of the current time and a random nonce; safe to call
/// from any number of tasks concurrently.
pub(crate) fn sign(url: &str) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let date = signature_date(jiff::Timestamp::now());
    signature_for(url, &date, &nonce)
}

/// Random 16-hex-digit user id sent alongside the signature
pub(crate) fn random_user_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes)
}

/// Lowercased RFC-1123-style GMT date the signature scheme expects,
/// e.g. "mon, 02 jan 2006 15:04:05gmt"
fn signature_date(now: jiff::Timestamp) -> String {
    format!("{}gmt", now.strftime("%a, %d %b %Y %H:%M:%S")).to_lowercase()
}

fn signature_for(url: &str, date: &str, nonce: &str) -> String {
    // Scheme is excluded from the signed string
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let encoded_url: String = url::form_urlencoded::byte_serialize(without_scheme.as_bytes()).collect();

    let to_sign = format!("{SIGNATURE_PREFIX}{encoded_url}{date}{nonce}").to_lowercase();

    let key = BASE64.decode(SIGNING_KEY_B64).expect("signing key must be valid base64");
    let mut mac = Hmac::<Sha256>::new_from_slice(&key).expect("HMAC accepts any key length");
    mac.update(to_sign.as_bytes());
    let mac_b64 = BASE64.encode(mac.finalize().into_bytes());

    format!("{SIGNATURE_PREFIX}::{mac_b64}::{date}::{nonce}")
}
