use litewalk::{
    types::{
        error::DatabaseError,
        page::PageType,
        record::{IndexCell, Record, SerialType, decode_signed_be, local_payload_size},
        value::Value,
    },
    utils::mock::encode_record,
};

#[test]
fn test_signed_integer_widths() {
    assert_eq!(decode_signed_be(&[0xFF]), -1);
    assert_eq!(decode_signed_be(&[0x00, 0x80]), 128);
    assert_eq!(decode_signed_be(&[0x80, 0x00]), -32768);
    assert_eq!(decode_signed_be(&[0xFF, 0xFF, 0xFE]), -2);
    assert_eq!(decode_signed_be(&[0x7F, 0xFF, 0xFF]), 8_388_607);
    assert_eq!(decode_signed_be(&[0x80, 0, 0, 0, 0, 0]), -(1i64 << 47));
    assert_eq!(decode_signed_be(&i64::MIN.to_be_bytes()), i64::MIN);
}

#[test]
fn test_blob_and_text_lengths() {
    assert_eq!(SerialType::from_code(12).unwrap().size(), 0);
    assert_eq!(SerialType::from_code(13).unwrap().size(), 0);
    assert_eq!(SerialType::from_code(14).unwrap(), SerialType::Blob(1));
    assert_eq!(SerialType::from_code(15).unwrap(), SerialType::Text(1));
    assert_eq!(SerialType::from_code(1012).unwrap(), SerialType::Blob(500));
    assert_eq!(SerialType::from_code(1013).unwrap(), SerialType::Text(500));
}

#[test]
fn test_reserved_serial_types_are_rejected() {
    for code in [10, 11] {
        assert!(matches!(
            SerialType::from_code(code),
            Err(DatabaseError::InvalidRecord { .. })
        ));
    }
}

#[test]
fn test_decode_mixed_record() {
    let values = vec![
        Value::Null,
        Value::Integer(0),
        Value::Integer(1),
        Value::Integer(-200),
        Value::Integer(1 << 40),
        Value::Real(3.25),
        Value::Text(String::new()),
        Value::Text("héllo".to_string()),
        Value::Blob(vec![0xde, 0xad]),
    ];
    let record = Record::decode(&encode_record(&values)).unwrap();
    assert_eq!(record.values, values);
    assert_eq!(
        record.serial_types,
        vec![
            SerialType::Null,
            SerialType::Zero,
            SerialType::One,
            SerialType::I16,
            SerialType::I48,
            SerialType::F64,
            SerialType::Text(0),
            SerialType::Text(6),
            SerialType::Blob(2),
        ]
    );
}

#[test]
fn test_truncated_body() {
    let mut payload = encode_record(&[Value::Text("truncated".to_string())]);
    payload.truncate(payload.len() - 3);
    assert!(matches!(
        Record::decode(&payload),
        Err(DatabaseError::UnexpectedEof { .. })
    ));
}

#[test]
fn test_header_size_past_payload() {
    assert!(matches!(
        Record::decode(&[0x09, 0x01]),
        Err(DatabaseError::InvalidRecord { .. })
    ));
}

#[test]
fn test_index_cell_key_and_rowid() {
    let cell = IndexCell {
        left_child: None,
        record: Record::decode(&encode_record(&[
            Value::Text("Bob".to_string()),
            Value::Integer(2),
        ]))
        .unwrap(),
    };
    assert_eq!(cell.key().unwrap(), &Value::Text("Bob".to_string()));
    assert_eq!(cell.row_id().unwrap(), 2);

    let bad = IndexCell {
        left_child: None,
        record: Record::decode(&encode_record(&[
            Value::Text("Bob".to_string()),
            Value::Real(2.5),
        ]))
        .unwrap(),
    };
    assert!(matches!(bad.row_id(), Err(DatabaseError::InvalidIndexRowId { .. })));
}

#[test]
fn test_local_payload_size_table_leaf() {
    assert_eq!(local_payload_size(PageType::LeafTable, 4061, 4096), 4061);
    assert_eq!(local_payload_size(PageType::LeafTable, 4062, 4096), 489);
    assert_eq!(local_payload_size(PageType::LeafTable, 5000, 4096), 908);
}

#[test]
fn test_local_payload_size_index() {
    assert_eq!(local_payload_size(PageType::LeafIndex, 1002, 4096), 1002);
    assert_eq!(local_payload_size(PageType::InteriorIndex, 1003, 4096), 489);
}
