use super::*;

#[test]
fn test_date_heisei_fold() {
    // BCD 83 and above is a Heisei-written dump: 1925 + 83 - 25 = 1983
    let date = FdsDate::from_bcd([0x83, 0x12, 0x25]);
    assert_eq!(date.year, 1983);
    assert_eq!(date.month, 12);
    assert_eq!(date.day, 25);
}

#[test]
fn test_date_showa_form_below_boundary() {
    // BCD years below 83 use the plain Showa epoch: 1925 + 82 = 2007
    let date = FdsDate::from_bcd([0x82, 0x01, 0x01]);
    assert_eq!(date.year, 2007);
    assert_eq!(date.month, 1);
    assert_eq!(date.day, 1);
}

#[test]
fn test_date_typical_release() {
    // Showa 61 = 1986
    let date = FdsDate::from_bcd([0x61, 0x02, 0x21]);
    assert_eq!(date.year, 1986);
    assert_eq!(date.month, 2);
    assert_eq!(date.day, 21);
}

#[test]
fn test_date_encode_round_trip() {
    let date = FdsDate {
        year: 1986,
        month: 2,
        day: 21,
    };
    assert_eq!(date.to_bcd().unwrap(), [0x61, 0x02, 0x21]);
    assert_eq!(FdsDate::from_bcd(date.to_bcd().unwrap()), date);
}

#[test]
fn test_date_encode_out_of_range() {
    let too_early = FdsDate {
        year: 1900,
        month: 1,
        day: 1,
    };
    assert!(too_early.to_bcd().is_err());

    let too_late = FdsDate {
        year: 2100,
        month: 1,
        day: 1,
    };
    assert!(too_late.to_bcd().is_err());
}

#[test]
fn test_reserved_accessors_map_offsets() {
    let reserved = FdsReserved([
        0x18, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2a, 0x2b,
        0x2f, 0x30, 0x33, 0x36,
    ]);
    assert_eq!(reserved.byte_18(), 0x18);
    assert_eq!(reserved.bytes_1a_1e(), &[0x1a, 0x1b, 0x1c, 0x1d, 0x1e]);
    assert_eq!(
        reserved.bytes_23_2b(),
        &[0x23, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2a, 0x2b]
    );
    assert_eq!(reserved.bytes_2f_30(), &[0x2f, 0x30]);
    assert_eq!(reserved.byte_33(), 0x33);
    assert_eq!(reserved.byte_36(), 0x36);
}

#[test]
fn test_side_count() {
    let archive = FdsArchive {
        disks: vec![
            FdsDisk {
                disk_number: 0,
                sides: vec![FdsSide::default(), FdsSide::default()],
            },
            FdsDisk {
                disk_number: 1,
                sides: vec![FdsSide::default()],
            },
        ],
    };
    assert_eq!(archive.side_count(), 3);
}
