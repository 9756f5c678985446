use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::{tempdir, TempDir};

use txt2md_core::config::RunSettings;
use txt2md_core::contract::{ConversionError, MockConverter};
use txt2md_core::pipeline::{run, PipelineError};

struct Tree {
    _tmp: TempDir,
    settings: RunSettings,
}

impl Tree {
    fn new() -> Self {
        let tmp = tempdir().unwrap();
        let input = tmp.path().join("input");
        let output = tmp.path().join("output");
        fs::create_dir_all(&input).unwrap();
        let settings = RunSettings::new("http://localhost:1234/v1/chat/completions")
            .with_dirs(input, output);
        Self {
            _tmp: tmp,
            settings,
        }
    }

    fn input(&self, rel: &str) -> std::path::PathBuf {
        self.settings.input_dir.join(rel)
    }

    fn output(&self, rel: &str) -> std::path::PathBuf {
        self.settings.output_dir.join(rel)
    }

    fn write_input(&self, rel: &str, body: &str) {
        write_file(&self.input(rel), body);
    }

    fn write_output(&self, rel: &str, body: &str) {
        write_file(&self.output(rel), body);
    }
}

fn write_file(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn mtime(path: &Path, t: SystemTime) {
    set_file_mtime(path, FileTime::from_system_time(t)).expect("set mtime");
}

fn echo_converter(times: usize) -> MockConverter {
    let mut converter = MockConverter::new();
    converter
        .expect_convert()
        .times(times)
        .returning(|text, _settings| Ok(format!("# Converted\n\n{text}")));
    converter
}

#[tokio::test]
async fn new_file_is_converted_and_up_to_date_file_is_skipped() {
    let tree = Tree::new();
    let now = SystemTime::now();
    tree.write_input("a.txt", "alpha");
    tree.write_input("b/c.txt", "gamma");
    tree.write_output("b/c.md", "previous gamma");
    mtime(&tree.input("b/c.txt"), now - Duration::from_secs(3600));
    mtime(&tree.output("b/c.md"), now - Duration::from_secs(60));

    let mut converter = MockConverter::new();
    converter
        .expect_convert()
        .withf(|text, _| text.contains("alpha"))
        .times(1)
        .returning(|_, _| Ok("## Alpha".to_string()));

    let summary = run(&tree.settings, &converter).await.expect("run succeeds");

    assert_eq!(summary.converted, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(fs::read_to_string(tree.output("a.md")).unwrap(), "## Alpha");
    assert_eq!(fs::read_to_string(tree.output("b/c.md")).unwrap(), "previous gamma");
}

#[tokio::test]
async fn caching_disabled_reprocesses_every_file() {
    let mut tree = Tree::new();
    let now = SystemTime::now();
    tree.write_input("a.txt", "alpha");
    tree.write_input("b/c.txt", "gamma");
    tree.write_output("b/c.md", "previous gamma");
    mtime(&tree.input("b/c.txt"), now - Duration::from_secs(3600));
    tree.settings = tree.settings.clone().with_cache(false, false);

    let converter = echo_converter(2);
    let summary = run(&tree.settings, &converter).await.unwrap();

    assert_eq!(summary.converted, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(
        fs::read_to_string(tree.output("b/c.md")).unwrap(),
        "# Converted\n\ngamma"
    );
}

#[tokio::test]
async fn force_reprocess_ignores_fresh_outputs() {
    let mut tree = Tree::new();
    let now = SystemTime::now();
    tree.write_input("a.txt", "alpha");
    tree.write_output("a.md", "fresh");
    mtime(&tree.input("a.txt"), now - Duration::from_secs(3600));
    tree.settings = tree.settings.clone().with_cache(true, true);

    let converter = echo_converter(1);
    let summary = run(&tree.settings, &converter).await.unwrap();

    assert_eq!(summary.converted, 1);
    assert_eq!(fs::read_to_string(tree.output("a.md")).unwrap(), "# Converted\n\nalpha");
}

#[tokio::test]
async fn equal_timestamps_count_as_up_to_date() {
    let tree = Tree::new();
    let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    tree.write_input("same.txt", "x");
    tree.write_output("same.md", "kept");
    mtime(&tree.input("same.txt"), t);
    mtime(&tree.output("same.md"), t);

    let converter = echo_converter(0);
    let summary = run(&tree.settings, &converter).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(fs::read_to_string(tree.output("same.md")).unwrap(), "kept");
}

#[tokio::test]
async fn older_output_is_regenerated_and_ends_up_newer_than_input() {
    let tree = Tree::new();
    let now = SystemTime::now();
    tree.write_input("doc.txt", "body");
    tree.write_output("doc.md", "stale");
    mtime(&tree.output("doc.md"), now - Duration::from_secs(3600));
    mtime(&tree.input("doc.txt"), now - Duration::from_secs(60));

    let converter = echo_converter(1);
    let summary = run(&tree.settings, &converter).await.unwrap();
    assert_eq!(summary.converted, 1);

    let input_mtime = fs::metadata(tree.input("doc.txt")).unwrap().modified().unwrap();
    let output_mtime = fs::metadata(tree.output("doc.md")).unwrap().modified().unwrap();
    assert!(output_mtime >= input_mtime);
}

#[tokio::test]
async fn one_failing_conversion_does_not_stop_the_others() {
    let tree = Tree::new();
    tree.write_input("a.txt", "fail me");
    tree.write_input("b.txt", "beta");
    tree.write_input("c/d.txt", "delta");
    tree.write_input("e.txt", "epsilon");

    let mut converter = MockConverter::new();
    converter.expect_convert().times(4).returning(|text, _| {
        if text.contains("fail me") {
            Err(ConversionError::Status {
                status: 500,
                body: "model crashed".into(),
            })
        } else {
            Ok(text.to_uppercase())
        }
    });

    let summary = run(&tree.settings, &converter).await.unwrap();

    assert_eq!(summary.converted, 3);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.exit_code(), 1);
    assert_eq!(summary.failures[0].path, tree.input("a.txt"));
    assert!(summary.failures[0].reason.contains("HTTP 500"));
    assert!(!tree.output("a.md").exists());
    assert_eq!(fs::read_to_string(tree.output("c/d.md")).unwrap(), "DELTA");
}

#[tokio::test]
async fn failed_conversion_leaves_existing_output_untouched() {
    let tree = Tree::new();
    let now = SystemTime::now();
    tree.write_input("a.txt", "new text");
    tree.write_output("a.md", "old markdown");
    mtime(&tree.output("a.md"), now - Duration::from_secs(3600));

    let mut converter = MockConverter::new();
    converter.expect_convert().times(1).returning(|_, _| {
        Err(ConversionError::Connect {
            url: "http://localhost:1234".into(),
            message: "connection refused".into(),
        })
    });

    let summary = run(&tree.settings, &converter).await.unwrap();

    assert_eq!(summary.failed(), 1);
    assert!(summary.connection_failure);
    assert_eq!(fs::read_to_string(tree.output("a.md")).unwrap(), "old markdown");
}

#[tokio::test]
async fn write_failure_fails_only_that_file() {
    let tree = Tree::new();
    tree.write_input("a.txt", "alpha");
    tree.write_input("b.txt", "beta");
    fs::create_dir_all(tree.output("a.md")).unwrap();

    let converter = echo_converter(2);
    let summary = run(&tree.settings, &converter).await.unwrap();

    assert_eq!(summary.converted, 1);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.exit_code(), 1);
    assert_eq!(summary.failures[0].path, tree.input("a.txt"));
    assert!(summary.failures[0].reason.contains("cannot write output file"));
    assert!(tree.output("a.md").is_dir());
    assert_eq!(fs::read_to_string(tree.output("b.md")).unwrap(), "# Converted\n\nbeta");
}

#[tokio::test]
async fn unreadable_input_fails_without_calling_the_converter() {
    let tree = Tree::new();
    fs::write(tree.input("binary.txt"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();
    tree.write_input("ok.txt", "fine");

    let converter = echo_converter(1);
    let summary = run(&tree.settings, &converter).await.unwrap();

    assert_eq!(summary.converted, 1);
    assert_eq!(summary.failed(), 1);
    assert!(summary.failures[0].reason.contains("cannot read input"));
}

#[tokio::test]
async fn missing_input_root_aborts_before_any_call() {
    let mut tree = Tree::new();
    let missing = tree.settings.input_dir.join("nope");
    tree.settings = tree.settings.clone().with_dirs(missing, tree.settings.output_dir.clone());

    let converter = echo_converter(0);
    let err = run(&tree.settings, &converter).await.unwrap_err();
    assert!(matches!(err, PipelineError::InputRootMissing(_)));
}

#[tokio::test]
async fn empty_tree_produces_an_empty_successful_summary() {
    let tree = Tree::new();
    tree.write_input("readme.md", "not an input");

    let converter = echo_converter(0);
    let summary = run(&tree.settings, &converter).await.unwrap();
    assert_eq!(summary.total(), 0);
    assert_eq!(summary.exit_code(), 0);
    assert!(tree.settings.output_dir.is_dir());
}

#[tokio::test]
async fn bounded_concurrency_yields_the_same_outcomes() {
    let mut tree = Tree::new();
    for i in 0..8 {
        tree.write_input(&format!("dir{}/file{i}.txt", i % 3), &format!("text {i}"));
    }
    tree.write_input("dir1/zz_fail.txt", "fail");
    tree.settings = tree.settings.clone().with_concurrency(3);

    let mut converter = MockConverter::new();
    converter.expect_convert().times(9).returning(|text, _| {
        if text.contains("fail") {
            Err(ConversionError::Timeout { secs: 60 })
        } else {
            Ok(format!("md: {text}"))
        }
    });

    let summary = run(&tree.settings, &converter).await.unwrap();

    assert_eq!(summary.converted, 8);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.failures[0].path, tree.input("dir1/zz_fail.txt"));
    for i in 0..8 {
        let out = tree.output(&format!("dir{}/file{i}.md", i % 3));
        assert_eq!(fs::read_to_string(out).unwrap(), format!("md: text {i}"));
    }
}

#[tokio::test]
async fn second_run_skips_everything_converted_by_the_first() {
    let tree = Tree::new();
    tree.write_input("a.txt", "alpha");
    tree.write_input("nested/b.txt", "beta");
    let past = SystemTime::now() - Duration::from_secs(3600);
    mtime(&tree.input("a.txt"), past);
    mtime(&tree.input("nested/b.txt"), past);

    let first = run(&tree.settings, &echo_converter(2)).await.unwrap();
    assert_eq!(first.converted, 2);

    let second = run(&tree.settings, &echo_converter(0)).await.unwrap();
    assert_eq!(second.skipped, 2);
    assert_eq!(second.converted, 0);
}
