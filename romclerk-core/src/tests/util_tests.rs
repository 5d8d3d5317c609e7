use super::*;

#[test]
fn test_hex_round_trip() {
    let data = [0x00u8, 0x1a, 0xff, 0x42];
    assert_eq!(hex_lower(&data), "001aff42");
    assert_eq!(hex_upper(&data), "001AFF42");
    assert_eq!(hex_decode("001aff42").unwrap(), data.to_vec());
    assert_eq!(hex_decode("001AFF42").unwrap(), data.to_vec());
}

#[test]
fn test_hex_decode_rejects_garbage() {
    assert!(hex_decode("abc").is_none()); // odd length
    assert!(hex_decode("zz").is_none());
    assert_eq!(hex_decode("").unwrap(), Vec::<u8>::new());
}

#[test]
fn test_decode_bcd() {
    assert_eq!(decode_bcd(0x00), 0);
    assert_eq!(decode_bcd(0x09), 9);
    assert_eq!(decode_bcd(0x10), 10);
    assert_eq!(decode_bcd(0x83), 83);
    assert_eq!(decode_bcd(0x99), 99);
}

#[test]
fn test_encode_bcd() {
    assert_eq!(encode_bcd(0), Some(0x00));
    assert_eq!(encode_bcd(9), Some(0x09));
    assert_eq!(encode_bcd(25), Some(0x25));
    assert_eq!(encode_bcd(99), Some(0x99));
    assert_eq!(encode_bcd(100), None);
}

#[test]
fn test_bcd_round_trip() {
    for value in 0u8..=99 {
        assert_eq!(decode_bcd(encode_bcd(value).unwrap()), u16::from(value));
    }
}
