use pngstrip::{
  png::{check_signature, read_document, ChunkType, SignatureStatus, Stripper},
  PngError,
};
use std::path::Path;

#[test]
fn test_read_document_no_panics() {
  // even totally random data should never panic the reader!
  for _ in 0..50 {
    let v = super::rand_bytes(1024);
    let _ = read_document(v.as_slice());
  }
  // nor should random data behind a real signature and header
  let sample = super::sample_png();
  for _ in 0..50 {
    let mut v = sample[..33].to_vec();
    v.extend(super::rand_bytes(512));
    let _ = read_document(v.as_slice());
  }
}

#[test]
fn test_sample_strips_to_critical_chunks() {
  let sample = super::sample_png();
  assert_eq!(check_signature(&sample), SignatureStatus::Valid);
  let doc = read_document(sample.as_slice()).unwrap();
  assert_eq!(doc.chunks().len(), 8);
  let out = Stripper::new(true).strip(&doc, Path::new("sample.png")).unwrap();
  let types: Vec<ChunkType> =
    read_document(out.as_slice()).unwrap().chunks().iter().map(|c| c.chunk_type()).collect();
  assert_eq!(types, [ChunkType::IHDR, ChunkType::PLTE, ChunkType::IDAT, ChunkType::IDAT, ChunkType::IEND]);
}

#[test]
fn test_every_truncation_is_reported() {
  let sample = super::sample_png();
  for len in 0..sample.len() {
    match read_document(&sample[..len]) {
      Err(PngError::Truncated) => (),
      other => panic!("cut at {len}: expected truncation, got {other:?}"),
    }
  }
}

#[test]
fn test_every_single_bit_flip_is_reported() {
  let sample = super::sample_png();
  // skip the signature, which isn't covered by any CRC
  for i in 8..sample.len() {
    let mut v = sample.clone();
    v[i] ^= 0x10;
    assert!(read_document(v.as_slice()).is_err(), "flip at byte {i} went unnoticed");
  }
}
