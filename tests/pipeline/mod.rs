use std::{fs, path::Path};

use pngstrip::{
  pipeline::TaskState,
  png::{read_document_from_path, ChunkType, PNG_SIGNATURE},
  BatchPipeline, Config,
};

fn write(path: &Path, bytes: &[u8]) {
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, bytes).unwrap();
}

fn outcome_state(report: &pngstrip::PipelineReport, name: &str) -> TaskState {
  report
    .outcomes
    .iter()
    .find(|o| o.input.file_name().unwrap() == name)
    .unwrap_or_else(|| panic!("no outcome for {name}"))
    .state
}

#[test]
fn test_pipeline_strips_a_tree() {
  let input = tempfile::tempdir().unwrap();
  let output = tempfile::tempdir().unwrap();
  let sample = super::sample_png();

  write(&input.path().join("a.png"), &sample);
  write(&input.path().join("deeper").join("b.png"), &sample);
  // a flipped byte inside the tEXt data
  let mut corrupt = sample.clone();
  corrupt[80] ^= 0xFF;
  write(&input.path().join("corrupt.png"), &corrupt);
  // cut off before IEND
  write(&input.path().join("short.png"), &sample[..sample.len() - 6]);
  // ignored, wrong extension
  write(&input.path().join("readme.txt"), b"not an image");

  let config = Config::new(input.path(), output.path()).with_workers(3).with_verify_checksums(true);
  let report = BatchPipeline::new(config).run().unwrap();

  assert_eq!(report.enumerated, 4);
  assert_eq!(report.completed, 2);
  assert_eq!(report.failed, 2);
  assert_eq!(outcome_state(&report, "a.png"), TaskState::Completed);
  assert_eq!(outcome_state(&report, "b.png"), TaskState::Completed);
  assert_eq!(outcome_state(&report, "corrupt.png"), TaskState::Failed);
  assert_eq!(outcome_state(&report, "short.png"), TaskState::Failed);

  for out in [output.path().join("a.png"), output.path().join("deeper").join("b.png")] {
    let bytes = fs::read(&out).unwrap();
    assert_eq!(&bytes[..8], &PNG_SIGNATURE);
    assert!(bytes.len() < sample.len());
    let doc = read_document_from_path(&out).unwrap();
    let types: Vec<ChunkType> = doc.chunks().iter().map(|c| c.chunk_type()).collect();
    assert_eq!(
      types,
      [ChunkType::IHDR, ChunkType::PLTE, ChunkType::IDAT, ChunkType::IDAT, ChunkType::IEND]
    );
  }
  // failed files leave nothing behind
  assert!(!output.path().join("corrupt.png").exists());
  assert!(!output.path().join("short.png").exists());
  assert!(!output.path().join("readme.txt").exists());
}

#[test]
fn test_pipeline_signature_check_is_opt_in() {
  let input = tempfile::tempdir().unwrap();
  let out_lenient = tempfile::tempdir().unwrap();
  let out_strict = tempfile::tempdir().unwrap();
  let mut foreign = super::sample_png();
  foreign[1..4].copy_from_slice(b"XYZ");
  write(&input.path().join("foreign.png"), &foreign);

  let lenient = BatchPipeline::new(Config::new(input.path(), out_lenient.path())).run().unwrap();
  assert_eq!(lenient.completed, 1);
  assert!(out_lenient.path().join("foreign.png").exists());

  let strict = BatchPipeline::new(
    Config::new(input.path(), out_strict.path()).with_verify_signature(true),
  )
  .run()
  .unwrap();
  assert_eq!(strict.failed, 1);
  assert_eq!(strict.outcomes[0].error.as_deref(), Some("not a png file"));
  assert!(!out_strict.path().join("foreign.png").exists());
}

#[cfg(unix)]
#[test]
fn test_pipeline_encoder_failure_is_per_file() {
  use pngstrip::ExternalEncoder;

  let input = tempfile::tempdir().unwrap();
  let output = tempfile::tempdir().unwrap();
  let temp = tempfile::tempdir().unwrap();
  for name in ["one.png", "two.png", "three.png"] {
    write(&input.path().join(name), &super::sample_png());
  }
  let encoder = ExternalEncoder { temp_dir: Some(temp.path().to_path_buf()), ..ExternalEncoder::new("false") };
  let config = Config::new(input.path(), output.path()).with_encoder(Some(encoder)).with_workers(2);
  let report = BatchPipeline::new(config).run().unwrap();

  assert_eq!(report.failed, 3);
  for outcome in &report.outcomes {
    assert!(outcome.error.as_deref().unwrap().contains("exit code 1"), "{outcome:?}");
  }
  // every intermediate file was cleaned up
  assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn test_pipeline_output_inside_input_is_not_reprocessed() {
  let input = tempfile::tempdir().unwrap();
  let sample = super::sample_png();
  for i in 0..200 {
    write(&input.path().join(format!("img{i:03}.png")), &sample);
  }
  let output = input.path().join("processed");

  let config = Config::new(input.path(), &output).with_workers(8).with_queue_capacity(1);
  let report = BatchPipeline::new(config).run().unwrap();

  assert_eq!(report.enumerated, 200);
  assert_eq!(report.completed, 200);
  assert!(!output.join("processed").exists());
  assert_eq!(fs::read_dir(&output).unwrap().count(), 200);
}

#[test]
fn test_pipeline_signature_check_runs_before_chunks() {
  let input = tempfile::tempdir().unwrap();
  let output = tempfile::tempdir().unwrap();
  let sample = super::sample_png();
  // the signature as it looks after every LF became CR LF
  let mut damaged = vec![0x89, b'P', b'N', b'G', b'\r', b'\r', b'\n', 0x1A, b'\r', b'\n'];
  damaged.extend_from_slice(&sample[8..]);
  write(&input.path().join("damaged.png"), &damaged);

  let config = Config::new(input.path(), output.path()).with_verify_signature(true);
  let report = BatchPipeline::new(config).run().unwrap();
  assert_eq!(report.failed, 1);
  assert_eq!(
    report.outcomes[0].error.as_deref(),
    Some("signature damaged by unix to dos line ending conversion")
  );
}
