use std::fs;
use std::path::{Path, PathBuf};

use markletkit::app::build::{BuildOptions, Builder, GALLERY_FILE};
use markletkit::app::package::PackageOptions;

const HELPER_NAMES: &[&str] = &[
    "waitForElement",
    "waitForElementObserver",
    "clickElement",
    "clickAndWait",
    "delay",
    "findElementByText",
    "waitForElementByText",
    "getTextContent",
    "elementExists",
    "log",
    "showError",
];

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn shipped_helpers() -> PathBuf {
    repo_root().join("bookmarklets/lib/helpers.js")
}

fn options(source_dir: PathBuf, out_dir: PathBuf) -> BuildOptions {
    BuildOptions {
        source_dir,
        helpers_path: shipped_helpers(),
        out_dir,
        ignore_globs: vec!["_*".into()],
        package: PackageOptions::default(),
        gallery_title: "Pipeline".into(),
        gallery_template: None,
    }
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    fs::write(path, contents).expect("write file");
}

#[test]
fn delay_and_log_unit_gets_exactly_those_helpers() {
    let temp = tempfile::tempdir().expect("tempdir");
    let src = temp.path().join("src");
    write(
        &src.join("waiter/index.js"),
        "(function () {\n    'use strict';\n    log('waiting');\n    delay(250).then(() => log('done'));\n})();\n",
    );

    let builder = Builder::new(options(src, temp.path().join("dist"))).expect("builder");
    let report = builder.build().expect("build");

    assert!(report.failures.is_empty());
    let packaged = &report.packaged[0];
    assert_eq!(packaged.helpers, vec!["delay", "log"]);
    assert!(packaged.code.starts_with("javascript:"));
    assert!(!packaged.code.contains('\n'));

    let assembled = builder.assemble_unit("waiter").expect("assemble");
    assert!(assembled.source.contains("function delay(ms)"));
    assert!(assembled.source.contains("function log(message, data)"));
    for other in HELPER_NAMES.iter().filter(|name| !["delay", "log"].contains(name)) {
        assert!(
            !assembled.source.contains(&format!("function {other}(")),
            "unexpected helper {other}"
        );
    }
}

#[test]
fn helpers_called_but_left_out_of_meta_are_still_inlined() {
    let temp = tempfile::tempdir().expect("tempdir");
    let src = temp.path().join("src");
    write(
        &src.join("partial/index.js"),
        "(function () {\n    'use strict';\n    delay(5);\n    log('x');\n})();\n",
    );
    write(&src.join("partial/meta.json"), r#"{ "helpers": ["log"] }"#);

    let builder = Builder::new(options(src, temp.path().join("dist"))).expect("builder");
    let report = builder.build().expect("build");

    assert!(report.failures.is_empty());
    assert_eq!(report.packaged[0].helpers, vec!["delay", "log"]);
    let assembled = builder.assemble_unit("partial").expect("assemble");
    assert!(assembled.source.contains("function delay(ms)"));
}

#[test]
fn template_units_leave_no_placeholders() {
    let temp = tempfile::tempdir().expect("tempdir");
    let unit = temp.path().join("src/panel");
    write(
        &unit.join("index.js"),
        "(function () {\n    const html = '{{HTML_CONTENT}}';\n    const css = \"{{CSS_CONTENT}}\";\n    document.body.insertAdjacentHTML('beforeend', html + '<style>' + css + '</style>');\n})();\n",
    );
    write(&unit.join("template.html"), "<div class=\"panel\">It's \"quoted\"</div>\n");
    write(&unit.join("styles.css"), ".panel {\n    content: '\\2014';\n}\n");

    let builder = Builder::new(options(temp.path().join("src"), temp.path().join("dist"))).expect("builder");
    let report = builder.build().expect("build");

    assert!(report.failures.is_empty());
    let code = &report.packaged[0].code;
    assert!(!code.contains("{{HTML_CONTENT}}"));
    assert!(!code.contains("{{CSS_CONTENT}}"));
    let assembled = builder.assemble_unit("panel").expect("assemble");
    assert!(assembled.source.contains(r#"const html = "<div class=\"panel\">It's \"quoted\"</div>"#));
}

#[test]
fn one_broken_unit_does_not_stop_the_build() {
    let temp = tempfile::tempdir().expect("tempdir");
    let src = temp.path().join("src");
    write(&src.join("fine/index.js"), "(function () { alert('hi'); })();\n");
    write(&src.join("broken-meta/index.js"), "(function () {})();\n");
    write(&src.join("broken-meta/meta.json"), "{ not json");
    write(&src.join("unknown-helper/index.js"), "(function () {})();\n");
    write(&src.join("unknown-helper/meta.json"), r#"{ "helpers": ["teleport"] }"#);

    let dist = temp.path().join("dist");
    let report = Builder::new(options(src, dist.clone()))
        .expect("builder")
        .build()
        .expect("build");

    let failed: Vec<&str> = report.failures.iter().map(|f| f.unit.as_str()).collect();
    assert_eq!(failed, vec!["broken-meta", "unknown-helper"]);
    assert_eq!(report.packaged.len(), 1);
    let gallery = fs::read_to_string(dist.join(GALLERY_FILE)).expect("gallery");
    assert!(gallery.contains("Fine"));
    assert!(!gallery.contains("Broken Meta"));
}

#[test]
fn rebuilding_unchanged_sources_is_byte_identical() {
    let temp = tempfile::tempdir().expect("tempdir");
    let src = repo_root().join("bookmarklets/src");
    let first = temp.path().join("first");
    let second = temp.path().join("second");

    let one = Builder::new(options(src.clone(), first.clone()))
        .expect("builder")
        .build()
        .expect("first build");
    Builder::new(options(src, second.clone()))
        .expect("builder")
        .build()
        .expect("second build");

    assert!(!one.packaged.is_empty());
    for bookmarklet in &one.packaged {
        let a = fs::read(first.join(&bookmarklet.filename)).expect("first artifact");
        let b = fs::read(second.join(&bookmarklet.filename)).expect("second artifact");
        assert_eq!(a, b, "{} differs between builds", bookmarklet.filename);
    }
}

#[test]
fn shipped_bookmarklets_all_package() {
    let temp = tempfile::tempdir().expect("tempdir");
    let report = Builder::new(options(repo_root().join("bookmarklets/src"), temp.path().to_path_buf()))
        .expect("builder")
        .build()
        .expect("build");

    let failures: Vec<String> = report
        .failures
        .iter()
        .map(|f| format!("{}: {}", f.unit, f.error))
        .collect();
    assert!(failures.is_empty(), "{failures:?}");

    let names: Vec<&str> = report.packaged.iter().map(|b| b.filename.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "azure-container-delete-cmds.js",
            "azure-select-delete-top10.js",
            "icm-link-child.js",
            "icm-resolve-mitigated.js",
            "multi-select.js",
            "page-stats.js",
        ]
    );
    let link_child = &report.packaged[2];
    assert_eq!(
        link_child.helpers,
        vec!["waitForElementObserver", "clickAndWait", "delay", "log", "showError"]
    );
    assert_eq!(report.packaged[1].helpers, vec!["delay", "log"]);
    assert!(!temp.path().join("_template.js").exists());
}
