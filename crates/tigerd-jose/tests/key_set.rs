use std::io::Write;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use tigerd_crypto::base64url_decode;
use tigerd_jose::{
    generate_encryption_key, generate_octet_key, generate_signature_key, Decoder, Encoder,
    EncryptionAlgorithm, JwksSource, Key, KeySet, KeyUse, SharedKeySet, SignatureAlgorithm,
};

const PRIVATE_MEMBERS: [&str; 7] = ["d", "p", "q", "dp", "dq", "qi", "k"];

fn mixed() -> &'static KeySet {
    static KEYS: OnceLock<KeySet> = OnceLock::new();
    KEYS.get_or_init(|| {
        KeySet::new([
            generate_signature_key("rsa", SignatureAlgorithm::Rs256, 0).unwrap(),
            generate_signature_key("ec", SignatureAlgorithm::Es384, 0).unwrap(),
            generate_signature_key("hmac", SignatureAlgorithm::Hs256, 0).unwrap(),
            generate_encryption_key("ecdh", EncryptionAlgorithm::EcdhEs, 0).unwrap(),
            generate_encryption_key("wrap", EncryptionAlgorithm::A256Kw, 0).unwrap(),
            generate_octet_key("secret", 32).unwrap(),
        ])
    })
}

fn document(set: &KeySet) -> Value {
    serde_json::from_str(&set.to_json().unwrap()).unwrap()
}

#[test]
fn public_document_never_carries_private_material() {
    let public: Value = serde_json::from_str(&mixed().public_json().unwrap()).unwrap();
    let keys = public["keys"].as_array().unwrap();

    let kids: Vec<&str> = keys.iter().map(|k| k["kid"].as_str().unwrap()).collect();
    assert_eq!(kids, vec!["ec", "ecdh", "rsa"]);

    for key in keys {
        for member in PRIVATE_MEMBERS {
            assert!(key.get(member).is_none(), "{member} leaked in {key}");
        }
    }
}

#[test]
fn public_projection_keeps_identity() {
    let public = mixed().to_public();
    for key in public.iter() {
        assert!(key.is_public());
        let original = mixed().find_by_id(key.kid()).unwrap();
        assert_eq!(key.algorithm(), original.algorithm());
        assert_eq!(key.key_use(), original.key_use());
        assert_eq!(key.thumbprint().unwrap(), original.thumbprint().unwrap());
    }
    assert!(public.find_by_id("hmac").is_none());
    assert!(public.find_by_id("secret").is_none());
}

#[test]
fn private_document_restores_working_keys() {
    let restored = KeySet::from_json(&mixed().to_json().unwrap()).unwrap();
    assert_eq!(restored.len(), mixed().len());

    let rsa = document(mixed())["keys"]
        .as_array()
        .unwrap()
        .iter()
        .find(|k| k["kid"] == "rsa")
        .cloned()
        .unwrap();
    for member in ["n", "e", "d", "p", "q", "dp", "dq", "qi"] {
        assert!(rsa.get(member).is_some(), "missing {member}");
    }

    // a token signed with a restored key verifies against the original set
    let claims = json!({"sub": "alice"});
    for alg in [
        SignatureAlgorithm::Rs256,
        SignatureAlgorithm::Es384,
        SignatureAlgorithm::Hs256,
    ] {
        let token = Encoder::new(&claims)
            .unwrap()
            .with_signature(alg, &restored)
            .unwrap()
            .encode()
            .unwrap();
        let decoded = Decoder::new(&token)
            .expect_signature(alg, mixed())
            .into_value()
            .unwrap();
        assert_eq!(decoded, claims);
    }
}

#[test]
fn rfc7517_example_keys_parse() {
    // RFC 7517 Appendix A.2
    let set = KeySet::from_json(
        r#"{"keys":[{
            "kty":"EC",
            "crv":"P-256",
            "x":"MKBCTNIcKUSDii11ySs3526iDZ8AiTo7Tu6KPAqv7D4",
            "y":"4Etl6SRW2YiLUrN5vfvVHuhp7x8PxltmWWlbbM4IFyM",
            "d":"870MB6gfuTJ4HtUnUvYMyJpr5eUZNP4Bk43bVdj3eAE",
            "use":"enc",
            "kid":"1"
        }]}"#,
    )
    .unwrap();

    let key = set.find_by_id("1").unwrap();
    assert_eq!(key.key_use(), Some(KeyUse::Encryption));
    assert!(!key.is_public());
    assert_eq!(key.algorithm(), "");
}

#[test]
fn find_never_returns_wrong_use_or_algorithm() {
    let set = mixed();
    assert!(set.find_for_signing(SignatureAlgorithm::Rs384).is_none());
    assert!(set
        .find_for_encryption(EncryptionAlgorithm::EcdhEsA128Kw)
        .is_none());

    let key = set.find_for_signing(SignatureAlgorithm::Es384).unwrap();
    assert_eq!(key.kid(), "ec");
    assert_eq!(key.key_use(), Some(KeyUse::Signing));

    let key = set
        .find_for_encryption(EncryptionAlgorithm::A256Kw)
        .unwrap();
    assert_eq!(key.kid(), "wrap");
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[test]
fn repeated_lookups_within_a_second_agree() {
    let set = KeySet::new([
        generate_signature_key("a", SignatureAlgorithm::Hs256, 0).unwrap(),
        generate_signature_key("b", SignatureAlgorithm::Hs256, 0).unwrap(),
    ]);

    // retry if the loop straddles a second boundary
    for _ in 0..5 {
        let start = unix_seconds();
        let kids: Vec<String> = (0..1000)
            .map(|_| {
                set.find_for_signing(SignatureAlgorithm::Hs256)
                    .unwrap()
                    .kid()
                    .to_string()
            })
            .collect();
        if unix_seconds() != start {
            continue;
        }
        assert!(kids.iter().all(|kid| kid == &kids[0]));
        let expected = if start % 2 == 0 { "a" } else { "b" };
        assert_eq!(kids[0], expected);
        return;
    }
    panic!("could not complete lookups within one second");
}

#[test]
fn merge_and_source_compose() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(mixed().public_json().unwrap().as_bytes())
        .unwrap();

    let published = JwksSource::from_file(file.path()).load().unwrap();
    let local = KeySet::new([generate_octet_key("local", 16).unwrap()]);
    let merged = local.merge(&published);

    assert_eq!(merged.len(), 4);
    assert!(merged.find_by_id("local").is_some());
    assert!(merged.find_by_id("rsa").unwrap().is_public());
}

#[test]
fn shared_set_rotates_signing_key() {
    let old = generate_signature_key("old", SignatureAlgorithm::Es256, 0).unwrap();
    let new = generate_signature_key("new", SignatureAlgorithm::Es256, 0).unwrap();
    let shared = SharedKeySet::new(KeySet::new([old.clone()]));

    let claims = json!({"sub": "alice"});
    let sign = |keys: &KeySet| {
        Encoder::new(&claims)
            .unwrap()
            .with_signature(SignatureAlgorithm::Es256, keys)
            .unwrap()
            .encode()
            .unwrap()
    };
    let before = sign(shared.current().as_ref());

    shared.rotate(KeySet::new([new]));
    let after = sign(shared.current().as_ref());
    let header = base64url_decode(after.split('.').next().unwrap()).unwrap();
    let header: Value = serde_json::from_slice(&header).unwrap();
    assert_eq!(header["kid"], "new");

    // relying parties keep the retired public key around for a while
    let verification = shared
        .current()
        .to_public()
        .merge(&KeySet::new([old.to_public().unwrap()]));
    for token in [before, after] {
        Decoder::new(&token)
            .expect_signature(SignatureAlgorithm::Es256, &verification)
            .into_value()
            .unwrap();
    }
}

#[test]
fn single_key_document_round_trips() {
    let key = generate_encryption_key("", EncryptionAlgorithm::RsaOaep256, 0).unwrap();
    let json = serde_json::to_string(&key.to_public().unwrap()).unwrap();
    let parsed = Key::from_json(&json).unwrap();
    assert_eq!(parsed.kid(), key.thumbprint().unwrap());
    assert!(parsed.is_public());
}
