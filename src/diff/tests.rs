use super::*;

const SINGLE_FILE: &str = "diff --git a/x.py b/x.py\n--- a/x.py\n+++ b/x.py\n@@ -1,2 +1,3 @@\n def f():\n+    return 1\n     pass\n";

const MULTI_FILE: &str = "\
diff --git a/pkg/a.py b/pkg/a.py
index 3b18e51..a9c1d2f 100644
--- a/pkg/a.py
+++ b/pkg/a.py
@@ -10,4 +10,6 @@ class Widget:
     def render(self):
-        return None
+        html = self.template()
+        return html
 
     def close(self):
+        self.closed = True
diff --git a/pkg/new.py b/pkg/new.py
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/pkg/new.py
@@ -0,0 +1,2 @@
+def hello():
+    return \"hi\"
\\ No newline at end of file
";

#[test]
fn test_empty_input_yields_nothing() {
    assert!(parse_diff("").is_empty());
    assert!(parse_diff("not a diff at all\n").is_empty());
}

#[test]
fn test_single_file_mapping_counts_every_line() {
    let diffs = parse_diff(SINGLE_FILE);
    assert_eq!(diffs.len(), 1);

    let diff = &diffs[0];
    assert_eq!(diff.path, "x.py");
    assert_eq!(diff.content, SINGLE_FILE);
    // diff --git=1, ---=2, +++=3, @@=4, " def f():"=5, "+    return 1"=6
    assert_eq!(diff.line_mapping, BTreeMap::from([(2, 6)]));
}

#[test]
fn test_added_line_directly_after_hunk_header() {
    let text = "diff --git a/x.py b/x.py\n--- a/x.py\n+++ b/x.py\n@@ -1,1 +1,2 @@\n+import os\n def f():\n";
    let diffs = parse_diff(text);
    assert_eq!(diffs[0].line_mapping, BTreeMap::from([(1, 5)]));
}

#[test]
fn test_multi_file_in_source_order() {
    let diffs = parse_diff(MULTI_FILE);
    let paths: Vec<&str> = diffs.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(paths, vec!["pkg/a.py", "pkg/new.py"]);

    assert_eq!(
        diffs[0].line_mapping,
        BTreeMap::from([(11, 8), (12, 9), (15, 12)])
    );
    assert_eq!(diffs[1].line_mapping, BTreeMap::from([(1, 7), (2, 8)]));
}

#[test]
fn test_mapped_positions_index_added_lines() {
    for diff in parse_diff(MULTI_FILE) {
        let lines: Vec<&str> = diff.content.split('\n').collect();
        for position in diff.line_mapping.values() {
            let line = lines[position - 1];
            assert!(line.starts_with('+'), "{:?} is not an added line", line);
            assert!(!line.starts_with("+++"));
        }
    }
}

#[test]
fn test_uses_post_change_path() {
    let text = "diff --git a/old/name.py b/new/name.py\nsimilarity index 90%\n";
    let diffs = parse_diff(text);
    assert_eq!(diffs[0].path, "new/name.py");
    assert!(diffs[0].line_mapping.is_empty());
}

#[test]
fn test_crlf_header_is_trimmed() {
    let text = "diff --git a/x.py b/x.py\r\n--- a/x.py\r\n";
    assert_eq!(parse_diff(text)[0].path, "x.py");
}

#[test]
fn test_malformed_segments_are_skipped() {
    let text = format!(
        "diff --git garbage-without-paths\n+oops\n{}diff --git a/y.py b/y.py\n@@ -1 +abc @@\n+x\n",
        SINGLE_FILE
    );
    let diffs = parse_diff(&text);
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].path, "x.py");
    assert!(diffs.len() <= text.matches("diff --git ").count());
}

#[test]
fn test_hunk_without_line_count() {
    assert_eq!(hunk_new_start("@@ -0,0 +1 @@"), Ok(1));
    assert_eq!(hunk_new_start("@@ -3,7 +42,9 @@ def g():"), Ok(42));
    assert!(matches!(
        hunk_new_start("@@ -3,7 @@"),
        Err(DiffError::MalformedHunkHeader(_))
    ));
}

#[test]
fn test_destination_path_errors() {
    assert!(matches!(
        destination_path("a/x.py"),
        Err(DiffError::MissingPath(_))
    ));
    assert!(matches!(
        destination_path("a/x.py b/"),
        Err(DiffError::MissingPath(_))
    ));
}

#[test]
fn test_position_for() {
    let diff = &parse_diff(SINGLE_FILE)[0];
    assert_eq!(diff.position_for(2), Some(6));
    assert_eq!(diff.position_for(1), None);
}

#[test]
fn test_position_comments_splits_mapped_and_unmapped() {
    let diff = &parse_diff(MULTI_FILE)[0];
    let comments = vec![
        LineComment {
            line_number: 12,
            body: "Template may be None here".to_string(),
        },
        LineComment {
            line_number: 13,
            body: "Context line, cannot anchor".to_string(),
        },
        LineComment {
            line_number: 15,
            body: "  ".to_string(),
        },
    ];

    let result = position_comments(diff, comments);
    assert_eq!(
        result.positioned,
        vec![PositionedComment {
            path: "pkg/a.py".to_string(),
            position: 9,
            body: "Template may be None here".to_string(),
        }]
    );
    let unmapped: Vec<usize> = result.unmapped.iter().map(|c| c.line_number).collect();
    assert_eq!(unmapped, vec![13, 15]);
}
