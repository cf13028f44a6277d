use litewalk::types::{
    error::DatabaseError,
    page::{
        PageHeader, PageType, cell_pointer_array_start, header_offset, page_start,
        parse_cell_pointers,
    },
};

fn header_bytes(page_type: u8, cell_count: u16, content_start: u16, rightmost: u32) -> Vec<u8> {
    let mut bytes = vec![page_type, 0, 0];
    bytes.extend(cell_count.to_be_bytes());
    bytes.extend(content_start.to_be_bytes());
    bytes.push(3);
    bytes.extend(rightmost.to_be_bytes());
    bytes
}

#[test]
fn test_interior_types_carry_rightmost_pointer() {
    for (byte, page_type) in [(0x02, PageType::InteriorIndex), (0x05, PageType::InteriorTable)] {
        let header = PageHeader::from_bytes(&header_bytes(byte, 4, 3000, 42)).unwrap();
        assert_eq!(header.page_type, page_type);
        assert_eq!(header.size(), 12);
        assert_eq!(header.cell_count, 4);
        assert_eq!(header.cell_content_start, 3000);
        assert_eq!(header.fragmented_free_bytes, 3);
        assert_eq!(header.rightmost_pointer, Some(42));
    }
}

#[test]
fn test_leaf_types_have_no_rightmost_pointer() {
    for (byte, page_type) in [(0x0A, PageType::LeafIndex), (0x0D, PageType::LeafTable)] {
        let header = PageHeader::from_bytes(&header_bytes(byte, 1, 4000, 42)).unwrap();
        assert_eq!(header.page_type, page_type);
        assert_eq!(header.size(), 8);
        assert_eq!(header.rightmost_pointer, None);
    }
}

#[test]
fn test_leaf_header_needs_only_eight_bytes() {
    let bytes = header_bytes(0x0D, 2, 100, 0);
    let header = PageHeader::from_bytes(&bytes[..8]).unwrap();
    assert_eq!(header.cell_count, 2);
}

#[test]
fn test_zero_content_start_means_65536() {
    let header = PageHeader::from_bytes(&header_bytes(0x0D, 0, 0, 0)).unwrap();
    assert_eq!(header.cell_content_start, 65536);
}

#[test]
fn test_invalid_page_types() {
    for byte in [0x00, 0x01, 0x0C, 0x0E, 0xFF] {
        let err = PageHeader::from_bytes(&header_bytes(byte, 0, 0, 0)).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidPageType(b) if b == byte));
    }
}

#[test]
fn test_page_offsets() {
    assert_eq!(page_start(1, 4096), 0);
    assert_eq!(page_start(3, 4096), 8192);
    assert_eq!(header_offset(1), 100);
    assert_eq!(header_offset(2), 0);
    assert_eq!(cell_pointer_array_start(1, 4096, PageType::LeafTable), 108);
    assert_eq!(cell_pointer_array_start(1, 4096, PageType::InteriorTable), 112);
    assert_eq!(cell_pointer_array_start(2, 1024, PageType::InteriorIndex), 1036);
    assert_eq!(cell_pointer_array_start(2, 1024, PageType::LeafIndex), 1032);
}

#[test]
fn test_cell_pointers_are_big_endian() {
    let pointers = parse_cell_pointers(&[0x0F, 0xA0, 0x0F, 0x80, 0xFF], 2).unwrap();
    assert_eq!(pointers, vec![0x0FA0, 0x0F80]);
    assert!(matches!(
        parse_cell_pointers(&[0x0F], 1),
        Err(DatabaseError::UnexpectedEof { .. })
    ));
}
