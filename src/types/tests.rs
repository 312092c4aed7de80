use super::*;

#[test]
fn test_make_id_format() {
    assert_eq!(CodeChunk::make_id("pkg/a.py", "f", 3, 9), "pkg/a.py#f#3-9");
}

#[test]
fn test_code_chunk_new_derives_id() {
    let chunk = CodeChunk::new(
        "https://github.com/o/r.git",
        "pkg/a.py",
        "Widget",
        "class Widget:\n    pass",
        10,
        11,
        vec![0.5; 4],
    )
    .unwrap();

    assert_eq!(chunk.id, "pkg/a.py#Widget#10-11");
    assert_eq!(chunk.repo_url, "https://github.com/o/r.git");
    assert_eq!(chunk.embedding.len(), 4);
}

#[test]
fn test_code_chunk_rejects_zero_start_line() {
    let err = CodeChunk::new("r", "a.py", "f", "", 0, 2, vec![1.0]).unwrap_err();
    assert!(matches!(err, ValidationError::ConstraintViolation { ref field, .. } if field == "start_line"));
}

#[test]
fn test_code_chunk_rejects_inverted_range() {
    let err = CodeChunk::new("r", "a.py", "f", "", 5, 4, vec![1.0]).unwrap_err();
    assert!(matches!(err, ValidationError::ConstraintViolation { ref field, .. } if field == "end_line"));
}

#[test]
fn test_code_chunk_rejects_empty_embedding_and_path() {
    assert_eq!(
        CodeChunk::new("r", "a.py", "f", "", 1, 1, vec![]).unwrap_err(),
        ValidationError::Empty("embedding".to_string())
    );
    assert_eq!(
        CodeChunk::new("r", "", "f", "", 1, 1, vec![1.0]).unwrap_err(),
        ValidationError::Empty("file_path".to_string())
    );
}

#[test]
fn test_code_chunk_serialization_skips_embedding() {
    let chunk = CodeChunk::new("r", "a.py", "f", "def f(): pass", 1, 1, vec![0.1, 0.2]).unwrap();
    let json = serde_json::to_value(&chunk).unwrap();
    assert!(json.get("embedding").is_none());
    assert_eq!(json["id"], "a.py#f#1-1");
}

#[test]
fn test_change_set_unions() {
    let change_set = ChangeSet {
        added: vec!["new.py".to_string()],
        modified: vec!["mod.py".to_string(), "both.py".to_string()],
        deleted: vec!["gone.py".to_string(), "both.py".to_string()],
    };

    assert_eq!(change_set.paths_to_delete(), vec!["gone.py", "both.py", "mod.py"]);
    assert_eq!(change_set.paths_to_index(), vec!["new.py", "mod.py", "both.py"]);
    assert!(!change_set.is_empty());
    assert!(ChangeSet::default().is_empty());
}

#[test]
fn test_index_status_from_problems() {
    assert_eq!(IndexStatus::from_problems(&[], &[]), IndexStatus::Complete);
    assert_eq!(
        IndexStatus::from_problems(&["a.py: bad".to_string()], &[]),
        IndexStatus::Partial
    );
    assert_eq!(
        IndexStatus::from_problems(&[], &["missing".to_string()]),
        IndexStatus::Partial
    );
}

#[test]
fn test_sync_report_serializes_status_lowercase() {
    let report = SyncReport {
        status: IndexStatus::Partial,
        deleted_count: 1,
        added_count: 2,
        files_added: 1,
        files_modified: 0,
        files_deleted: 1,
        errors: vec![],
        warnings: vec!["b.py: chunk 2 skipped".to_string()],
        duration_ms: 12,
    };
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "partial");
    assert!(!report.is_complete());
}
