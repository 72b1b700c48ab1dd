// Unit tests for the PCM16 frame codec.

use exam_room::codec;

#[test]
fn test_encode_quantizes_to_pcm16_le() {
    let bytes = codec::encode(&[0.0, 1.0, -1.0]);

    assert_eq!(bytes.len(), 6);
    assert_eq!(&bytes[0..2], &0i16.to_le_bytes());
    assert_eq!(&bytes[2..4], &32767i16.to_le_bytes());
    assert_eq!(&bytes[4..6], &(-32767i16).to_le_bytes());
}

#[test]
fn test_encode_clamps_out_of_range_samples() {
    let bytes = codec::encode(&[2.5, -2.5]);

    assert_eq!(&bytes[0..2], &32767i16.to_le_bytes());
    assert_eq!(&bytes[2..4], &(-32767i16).to_le_bytes());
}

#[test]
fn test_decode_reads_little_endian() {
    // 0x0001 little-endian = [0x01, 0x00]
    let samples = codec::decode(&[0x01, 0x00]).unwrap();

    assert_eq!(samples.len(), 1);
    assert!((samples[0] - 1.0 / 32768.0).abs() < f32::EPSILON);
}

#[test]
fn test_decode_rejects_odd_length() {
    assert!(codec::decode(&[0x01, 0x00, 0x02]).is_err());
}

#[test]
fn test_decode_empty_payload() {
    let samples = codec::decode(&[]).unwrap();
    assert!(samples.is_empty());
}

#[test]
fn test_round_trip_preserves_samples_within_quantization() {
    let original = vec![0.0f32, 0.25, -0.25, 0.5, -0.5, 0.99, -0.99];

    let decoded = codec::decode(&codec::encode(&original)).unwrap();

    assert_eq!(decoded.len(), original.len());
    for (a, b) in original.iter().zip(decoded.iter()) {
        assert!((a - b).abs() < 1.0 / 32000.0, "sample drifted: {} vs {}", a, b);
    }
}
