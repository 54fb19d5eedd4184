//! Integration tests for the `rika` binary over local files.
//!
//! Each test builds its fixtures in a fresh temp directory and runs the
//! compiled binary with `RIKA_OPTIONS` cleared.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rika_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.push("rika");
    path
}

fn run_rika_with_env(args: &[&str], env_options: Option<&str>) -> (String, String, i32) {
    let mut cmd = Command::new(rika_binary());
    cmd.args(args).env_remove("RIKA_OPTIONS").env_remove("RIKA_LOG");
    if let Some(options) = env_options {
        cmd.env("RIKA_OPTIONS", options);
    }
    let output = cmd.output().expect("failed to run rika binary");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

fn run_rika(args: &[&str]) -> (String, String, i32) {
    run_rika_with_env(args, None)
}

fn write_file(dir: &Path, name: &str, contents: &[u8]) -> String {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().to_string()
}

/// Minimal valid PDF whose page shows "stopping by woods".
/// Body first, then an xref with correct byte offsets so pdf-extract can
/// parse it.
fn minimal_pdf() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(b"4 0 obj << /Length 49 >> stream\nBT /F1 12 Tf 100 700 Td (stopping by woods) Tj ET\nendstream endobj\n");
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let o6 = out.len();
    out.extend_from_slice(b"6 0 obj << /Title (Snowy Evening) /Author (Robert Frost) >> endobj\n");
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 7\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5, o6] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 7 /Root 1 0 R /Info 6 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// Minimal docx: one paragraph plus core properties.
fn minimal_docx(phrase: &str) -> Vec<u8> {
    use std::io::Write;
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(b"<?xml version=\"1.0\"?><Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\"><Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/></Types>").unwrap();
        zip.start_file("word/document.xml", options).unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
            phrase
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.start_file("docProps/core.xml", options).unwrap();
        zip.write_all(b"<?xml version=\"1.0\"?><cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\"><dc:title>Office Poem</dc:title></cp:coreProperties>").unwrap();
        zip.finish().unwrap();
    }
    buf
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout.trim_end())
        .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {stdout}"))
}

#[test]
fn test_json_pair_renders_one_record_per_document() {
    let tmp = TempDir::new().unwrap();
    let poem = "The woods are lovely, dark and deep, but I have promises to keep, and miles to go before I sleep.";
    let a = write_file(tmp.path(), "a.txt", poem.as_bytes());

    let (stdout, stderr, code) = run_rika(&["-f", "jj", &a]);
    assert_eq!(code, 0, "stderr: {stderr}");
    let value = json(&stdout);
    assert_eq!(value["source"], a.as_str());
    assert_eq!(value["text"], poem);
    assert_eq!(value["metadata"]["rika:data-source"], a.as_str());
    assert_eq!(value["metadata"]["rika:language"], "en");
    assert!(value["metadata"]["Content-Type"]
        .as_str()
        .unwrap()
        .starts_with("text/plain"));
}

#[test]
fn test_invalid_format_fails_before_any_target() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"alpha");

    let (stdout, stderr, code) = run_rika(&["-f", "q", &a]);
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Invalid format: q"), "stderr: {stderr}");
    assert!(stderr.contains("Usage"), "help is shown: {stderr}");
}

#[test]
fn test_partial_failure_is_isolated() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"alpha words");
    let b = write_file(tmp.path(), "b.txt", b"bravo words");
    let missing = tmp.path().join("missing.txt").to_string_lossy().to_string();

    let (stdout, stderr, code) =
        run_rika(&["-f", "t", "--no-metadata", "--no-source", &a, &missing, &b]);
    assert_eq!(code, 1);
    assert_eq!(stdout, "alpha words\nbravo words\n");
    assert!(
        stderr.contains(&format!("Issues:\n  non_existent_file:\n    {}\n", missing)),
        "stderr: {stderr}"
    );
}

#[test]
fn test_streamed_sections_and_source_banner() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"alpha");

    let (stdout, _, code) = run_rika(&["-f", "it", &a]);
    assert_eq!(code, 0);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], format!("Source: {}", a));
    assert!(lines[1].starts_with("{\"Content-Encoding\" => \"UTF-8\""));
    assert_eq!(lines[2], "alpha");
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_key_sort_orders_metadata_case_insensitively() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"alpha");

    let (stdout, _, _) = run_rika(&["-f", "J", "-t-", "-s-", &a]);
    let value = json(&stdout);
    let keys: Vec<String> = value
        .as_object()
        .unwrap()
        .keys()
        .map(|k| k.to_lowercase())
        .collect();
    assert!(keys.windows(2).all(|w| w[0] <= w[1]), "{keys:?}");

    let (stdout, _, _) = run_rika(&["-f", "J", "-t-", "-s-", "-k-", &a]);
    let value = json(&stdout);
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    let n = keys.len();
    assert_eq!(keys[n - 2], "rika:language");
    assert_eq!(keys[n - 1], "rika:data-source");
}

#[test]
fn test_glob_skips_directories_silently() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "docs/a.txt", b"alpha");
    write_file(tmp.path(), "docs/sub/b.txt", b"bravo");
    let pattern = tmp.path().join("docs").join("*").to_string_lossy().to_string();

    let (stdout, stderr, code) = run_rika(&["-f", "j", "-a", "-m-", &pattern]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stderr.is_empty(), "stderr: {stderr}");
    let value = json(&stdout);
    let records = value.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["text"], "alpha");
    assert!(records[0]["source"].as_str().unwrap().ends_with("a.txt"));
}

#[test]
fn test_recursive_glob_in_array_mode_keeps_order() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "docs/a.txt", b"alpha");
    write_file(tmp.path(), "docs/sub/b.txt", b"bravo");
    let pattern = tmp.path().join("docs").join("**").join("*.txt").to_string_lossy().to_string();

    let (stdout, _, code) = run_rika(&["-f", "y", "-a", "-m-", "-s-", &pattern]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "- text: alpha\n- text: bravo\n");
}

#[test]
fn test_pdf_text_and_metadata() {
    let tmp = TempDir::new().unwrap();
    let pdf = write_file(tmp.path(), "poem.pdf", &minimal_pdf());

    let (stdout, stderr, code) = run_rika(&["-f", "j", &pdf]);
    assert_eq!(code, 0, "stderr: {stderr}");
    let value = json(&stdout);
    assert!(
        value["text"].as_str().unwrap().contains("stopping by woods"),
        "text: {}",
        value["text"]
    );
    assert_eq!(value["metadata"]["Content-Type"], "application/pdf");
    assert_eq!(value["metadata"]["dc:title"], "Snowy Evening");
    assert_eq!(value["metadata"]["dc:creator"], "Robert Frost");
    assert_eq!(value["metadata"]["xmpTPg:NPages"], "1");
}

#[test]
fn test_metadata_only_pdf_has_no_text() {
    let tmp = TempDir::new().unwrap();
    let pdf = write_file(tmp.path(), "poem.pdf", &minimal_pdf());

    let (stdout, _, code) = run_rika(&["-f", "j", "-t-", "-s-", &pdf]);
    assert_eq!(code, 0);
    let value = json(&stdout);
    assert_eq!(value["Content-Type"], "application/pdf");
    assert!(!stdout.contains("stopping by woods"));
}

#[test]
fn test_docx_text_and_title() {
    let tmp = TempDir::new().unwrap();
    let docx = write_file(tmp.path(), "poem.docx", &minimal_docx("miles to go before I sleep"));

    let (stdout, stderr, code) = run_rika(&["-f", "j", &docx]);
    assert_eq!(code, 0, "stderr: {stderr}");
    let value = json(&stdout);
    assert_eq!(value["text"].as_str().unwrap().trim(), "miles to go before I sleep");
    assert_eq!(
        value["metadata"]["Content-Type"],
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    assert_eq!(value["metadata"]["dc:title"], "Office Poem");
}

#[test]
fn test_corrupt_document_is_an_io_error() {
    let tmp = TempDir::new().unwrap();
    let bad = write_file(tmp.path(), "bad.pdf", b"%PDF-1.4\nno objects, no xref, no trailer");
    let good = write_file(tmp.path(), "good.txt", b"still processed");

    let (stdout, stderr, code) = run_rika(&["-f", "t", "-m-", "-s-", &bad, &good]);
    assert_eq!(code, 1);
    assert_eq!(stdout, "still processed\n");
    assert!(stderr.contains("io_error:"), "stderr: {stderr}");
    assert!(stderr.contains(&bad));
}

#[test]
fn test_only_unusable_targets_is_a_no_op() {
    let tmp = TempDir::new().unwrap();
    let empty = write_file(tmp.path(), "empty.txt", b"");

    let (stdout, stderr, code) = run_rika(&[&empty]);
    assert_eq!(code, 0);
    assert!(stdout.is_empty());
    assert!(stderr.contains("empty_file:"), "stderr: {stderr}");
    assert!(stderr.contains("No valid targets specified."));
}

#[test]
fn test_bad_url_scheme_is_reported() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"alpha");

    let (stdout, stderr, code) = run_rika(&["-f", "t", "-m-", "-s-", "ftp://example.com/x.pdf", &a]);
    assert_eq!(code, 1);
    assert_eq!(stdout, "alpha\n");
    assert!(stderr.contains("bad_url_scheme:\n    ftp://example.com/x.pdf"));
}

#[test]
fn test_data_source_keeps_unusual_file_names() {
    let tmp = TempDir::new().unwrap();
    let odd = write_file(tmp.path(), "a poem (final) #2.txt", b"alpha");

    let (stdout, _, code) = run_rika(&["-f", "j", &odd]);
    assert_eq!(code, 0);
    let value = json(&stdout);
    assert_eq!(value["metadata"]["rika:data-source"], odd.as_str());
}

#[test]
fn test_environment_options_are_defaults() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"alpha");

    let (stdout, _, code) = run_rika_with_env(&[&a], Some("-f j --no-source"));
    assert_eq!(code, 0);
    let value = json(&stdout);
    assert!(value.get("source").is_none());
    assert_eq!(value["text"], "alpha");

    // the command line wins over the environment
    let (stdout, _, _) = run_rika_with_env(&["-f", "t", "-m-", "-s-", &a], Some("-f j"));
    assert_eq!(stdout, "alpha\n");
}

#[test]
fn test_max_content_length_truncates() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.txt", b"Whose woods these are I think I know");

    let (stdout, _, code) =
        run_rika(&["-f", "t", "-m-", "-s-", "--max-content-length", "11", &a]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "Whose woods\n");
}

#[test]
fn test_version() {
    let (stdout, _, code) = run_rika(&["--version"]);
    assert_eq!(code, 0);
    assert!(stdout.starts_with(&format!("Versions: Rika: {}", env!("CARGO_PKG_VERSION"))));
    assert!(stdout.contains("Engine: native"));
}

#[test]
fn test_version_wins_over_invalid_options() {
    let (stdout, stderr, code) = run_rika(&["-v", "-f", "q"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.starts_with("Versions: Rika: "));
    assert!(!stderr.contains("Invalid format"));
}

#[test]
fn test_literal_file_name_with_glob_characters() {
    let tmp = TempDir::new().unwrap();
    let report = write_file(tmp.path(), "report[1].txt", b"first quarterly report");

    let (stdout, stderr, code) = run_rika(&["-f", "t", "-m-", "-s-", &report]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert_eq!(stdout, "first quarterly report\n");
}

#[test]
fn test_help_documents_formats() {
    let (stdout, _, code) = run_rika(&["--help"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("--format"));
    assert!(stdout.contains("[J] for pretty json"));
}
