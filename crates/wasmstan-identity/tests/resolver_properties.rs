use proptest::prelude::*;
use wasmstan_identity::{resolve, ModelIdentity, ID_HEX_LEN};

#[test]
fn known_program_resolves_to_stable_token() {
    let first = resolve(b"data { int n; }", b"v1.2.3");
    let second = resolve(b"data { int n; }", b"v1.2.3");

    assert_eq!(first, second);
    assert!(first.as_str().starts_with("models/"));
    assert_eq!(first.as_str().len(), "models/".len() + ID_HEX_LEN);
}

#[test]
fn reparsing_a_resolved_token_is_lossless() {
    let identity = resolve(b"model { y ~ normal(0, 1); }", b"nodejs-stan 0.3");
    let parsed: ModelIdentity = identity.as_str().parse().unwrap();
    assert_eq!(parsed, identity);

    let bare = ModelIdentity::parse(identity.model_id()).unwrap();
    assert_eq!(bare, identity);
}

proptest! {
    #[test]
    fn prop_resolve_is_deterministic(
        source in proptest::collection::vec(any::<u8>(), 0..256),
        version in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        prop_assert_eq!(resolve(&source, &version), resolve(&source, &version));
    }

    #[test]
    fn prop_resolve_output_shape(
        source in proptest::collection::vec(any::<u8>(), 0..256),
        version in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let identity = resolve(&source, &version);
        let id = identity.model_id();
        prop_assert_eq!(id.len(), ID_HEX_LEN);
        prop_assert!(id.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn prop_distinct_sources_yield_distinct_identities(
        a in "[ -~]{0,64}",
        b in "[ -~]{0,64}",
        version in "[ -~]{1,16}",
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(
            resolve(a.as_bytes(), version.as_bytes()),
            resolve(b.as_bytes(), version.as_bytes())
        );
    }

    #[test]
    fn prop_distinct_versions_yield_distinct_identities(
        source in "[ -~]{0,64}",
        v1 in "[ -~]{1,16}",
        v2 in "[ -~]{1,16}",
    ) {
        prop_assume!(v1 != v2);
        prop_assert_ne!(
            resolve(source.as_bytes(), v1.as_bytes()),
            resolve(source.as_bytes(), v2.as_bytes())
        );
    }
}
