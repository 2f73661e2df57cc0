//! AWS Signature Version 4 request signing
//!
//! The four signing tasks (canonical request, string to sign, key
//! derivation, authorization header) are pure functions over explicit
//! inputs. Nothing here touches the network or the clock; the caller
//! supplies the signing time, which per the protocol must be the moment of
//! signing, not of message construction.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tt_common::time;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Static key pair identifying the caller to the bus
#[derive(Debug, Clone)]
pub struct Credentials<'a> {
    pub access_key: &'a str,
    pub secret_key: &'a str,
}

/// Headers to attach to the outgoing request after signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub authorization: String,
    pub amz_date: String,
}

/// HMAC-SHA256 of `data` under `key`
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Lowercase hex SHA-256 digest
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Task 1: canonical request.
///
/// Headers are lowercased, trimmed, and sorted by name; the payload is
/// folded in as its hex digest.
pub fn canonical_request(
    method: &str,
    uri: &str,
    query_string: &str,
    headers: &[(String, String)],
    payload: &str,
) -> String {
    let (canonical_headers, signed_headers) = canonical_headers(headers);

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        uri,
        query_string,
        canonical_headers,
        signed_headers,
        sha256_hex(payload.as_bytes())
    )
}

/// Credential scope `date/region/service/aws4_request`
pub fn credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{}/{}/{}/aws4_request", date_stamp, region, service)
}

/// Task 2: string to sign
pub fn string_to_sign(amz_timestamp: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_timestamp,
        scope,
        sha256_hex(canonical_request.as_bytes())
    )
}

/// Task 3: HMAC derivation chain seeded by the secret key
pub fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Sign one request, producing the authorization and date headers.
///
/// `headers` lists the headers the caller will send (minus `x-amz-date`,
/// which is derived from `signing_time` and included in the signed set
/// here).
pub fn sign_request(
    credentials: &Credentials<'_>,
    region: &str,
    service: &str,
    method: &str,
    uri: &str,
    query_string: &str,
    headers: &[(String, String)],
    payload: &str,
    signing_time: DateTime<Utc>,
) -> SignedRequest {
    let amz_timestamp = time::to_signing_timestamp(signing_time);
    let date_stamp = time::to_signing_datestamp(signing_time);

    let mut all_headers = headers.to_vec();
    all_headers.push(("x-amz-date".to_string(), amz_timestamp.clone()));

    let canonical = canonical_request(method, uri, query_string, &all_headers, payload);
    let scope = credential_scope(&date_stamp, region, service);
    let signing_input = string_to_sign(&amz_timestamp, &scope, &canonical);

    let signing_key = derive_signing_key(credentials.secret_key, &date_stamp, region, service);
    let signature = hex::encode(hmac_sha256(&signing_key, signing_input.as_bytes()));

    let (_, signed_headers) = canonical_headers(&all_headers);
    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, credentials.access_key, scope, signed_headers, signature
    );

    SignedRequest {
        authorization,
        amz_date: amz_timestamp,
    }
}

/// Lowercased/sorted `name:value\n` block plus the `;`-joined signed list
fn canonical_headers(headers: &[(String, String)]) -> (String, String) {
    let mut normalized: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    normalized.sort();

    let block = normalized
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect::<String>();
    let signed = normalized
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    (block, signed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ACCESS_KEY: &str = "AKIDEXAMPLE";
    const SECRET_KEY: &str = "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY";
    const PAYLOAD: &str = "Action=Publish&Message=hello&TopicArn=arn%3Aaws%3Asns%3Aus-east-1%3A123456789012%3Atraintrack-events&Version=2010-03-31";

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    fn request_headers() -> Vec<(String, String)> {
        vec![
            (
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            ),
            ("Host".to_string(), "sns.us-east-1.amazonaws.com".to_string()),
        ]
    }

    #[test]
    fn test_canonical_request_layout() {
        let mut headers = request_headers();
        headers.push(("x-amz-date".to_string(), "20260115T120000Z".to_string()));

        let canonical = canonical_request("POST", "/", "", &headers, PAYLOAD);

        let expected = "POST\n\
                        /\n\
                        \n\
                        content-type:application/x-www-form-urlencoded\n\
                        host:sns.us-east-1.amazonaws.com\n\
                        x-amz-date:20260115T120000Z\n\
                        \n\
                        content-type;host;x-amz-date\n\
                        b8f7c3dbba439541cd1f03eea88d23c502d6a3316bc36d2335fcd4cab29b64e4";
        assert_eq!(canonical, expected);
        assert_eq!(
            sha256_hex(canonical.as_bytes()),
            "2f078a4bfe63de155e68ad2e4986e5835abb7e70784031d72f9b690e10c5227b"
        );
    }

    #[test]
    fn test_header_order_does_not_affect_canonical_form() {
        let forward = canonical_request("POST", "/", "", &request_headers(), PAYLOAD);
        let mut reversed = request_headers();
        reversed.reverse();
        let backward = canonical_request("POST", "/", "", &reversed, PAYLOAD);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_signing_key_derivation_golden_value() {
        let key = derive_signing_key(SECRET_KEY, "20260115", "us-east-1", "sns");
        assert_eq!(
            hex::encode(key),
            "6befe993dccaad4951db93b3c05e80a8d4cd7292a27d60cb6b46d1594a93e785"
        );
    }

    #[test]
    fn test_signature_golden_value() {
        let signed = sign_request(
            &Credentials {
                access_key: ACCESS_KEY,
                secret_key: SECRET_KEY,
            },
            "us-east-1",
            "sns",
            "POST",
            "/",
            "",
            &request_headers(),
            PAYLOAD,
            fixed_time(),
        );

        assert_eq!(signed.amz_date, "20260115T120000Z");
        assert_eq!(
            signed.authorization,
            "AWS4-HMAC-SHA256 \
             Credential=AKIDEXAMPLE/20260115/us-east-1/sns/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date, \
             Signature=fe0a094b4c6021ff12a0b36566ea9b9c090f0f91b2e5addcfb4cebd9f109871b"
        );
    }

    #[test]
    fn test_single_character_payload_change_alters_signature() {
        let credentials = Credentials {
            access_key: ACCESS_KEY,
            secret_key: SECRET_KEY,
        };
        let altered = PAYLOAD.replace("hello", "hellp");

        let signed = sign_request(
            &credentials,
            "us-east-1",
            "sns",
            "POST",
            "/",
            "",
            &request_headers(),
            &altered,
            fixed_time(),
        );

        assert!(signed.authorization.ends_with(
            "Signature=88e3df1a68b6cd6828c59a60e2594bbaead35af40795e543893356d52f629804"
        ));
    }

    #[test]
    fn test_same_inputs_reproduce_same_signature() {
        let credentials = Credentials {
            access_key: ACCESS_KEY,
            secret_key: SECRET_KEY,
        };
        let first = sign_request(
            &credentials,
            "us-east-1",
            "sns",
            "POST",
            "/",
            "",
            &request_headers(),
            PAYLOAD,
            fixed_time(),
        );
        let second = sign_request(
            &credentials,
            "us-east-1",
            "sns",
            "POST",
            "/",
            "",
            &request_headers(),
            PAYLOAD,
            fixed_time(),
        );
        assert_eq!(first, second);
    }
}
