use super::*;

#[test]
fn test_identity_generation() {
    let identity = Identity::generate();
    let expected = PeerId::from_pubkey(&identity.pubkey());
    assert_eq!(*identity.peer_id(), expected);
}

#[test]
fn test_identity_from_secret_hex_roundtrip() {
    let identity = Identity::generate();
    let restored = Identity::from_secret_hex(&identity.secret_hex()).unwrap();
    assert_eq!(identity.peer_id(), restored.peer_id());
}

#[test]
fn test_identity_invalid_secret() {
    // Zero is not a valid secp256k1 scalar
    let zero = "00".repeat(32);
    assert!(matches!(
        Identity::from_secret_hex(&zero),
        Err(IdentityError::InvalidSecretKey(_))
    ));
    assert!(matches!(
        Identity::from_secret_hex("not hex"),
        Err(IdentityError::InvalidHex(_))
    ));
}

#[test]
fn test_peer_id_from_slice_length() {
    assert!(PeerId::from_slice(&[1u8; 32]).is_ok());
    assert!(matches!(
        PeerId::from_slice(&[1u8; 31]),
        Err(IdentityError::InvalidPeerIdLength(31))
    ));
}

#[test]
fn test_peer_id_display_is_short_hex() {
    let mut bytes = [0u8; 32];
    bytes[0] = 0xab;
    bytes[3] = 0x01;
    let id = PeerId::from_bytes(bytes);
    assert_eq!(id.to_string(), "ab000001");
    assert!(format!("{:?}", id).starts_with("PeerId(ab000001"));
}

// ===== HashCode Tests =====

fn make_hash(last: u8) -> HashCode {
    let mut bytes = [0u8; 32];
    bytes[31] = last;
    HashCode::from_bytes(bytes)
}

#[test]
fn test_hash_random_distinct() {
    let a = HashCode::random();
    let b = HashCode::random();
    assert_ne!(a, b);
}

#[test]
fn test_hash_ring_distance_simple() {
    let a = make_hash(10);
    let b = make_hash(15);
    assert_eq!(a.ring_distance(&b), make_hash(5));
    assert_eq!(a.ring_distance(&a), HashCode::ZERO);
}

#[test]
fn test_hash_ring_distance_wraps() {
    let a = make_hash(15);
    let b = make_hash(10);
    // (10 - 15) mod 2^256 = 2^256 - 5
    let d = a.ring_distance(&b);
    let mut expected = [0xffu8; 32];
    expected[31] = 0xfb;
    assert_eq!(d, HashCode::from_bytes(expected));
}

#[test]
fn test_hash_cmp_successor() {
    let key = make_hash(100);
    let after = make_hash(120);
    let before = make_hash(90);
    // 120 is reached clockwise before wrapping around to 90
    assert_eq!(
        key.cmp_successor(&after, &before),
        std::cmp::Ordering::Less
    );
}

#[test]
fn test_hash_from_hex() {
    let h = HashCode::from_hex(&"ab".repeat(32)).unwrap();
    assert_eq!(h.as_bytes(), &[0xab; 32]);
    assert!(matches!(
        HashCode::from_hex("abcd"),
        Err(IdentityError::InvalidHashLength(2))
    ));
}
