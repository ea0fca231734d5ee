use insta::assert_snapshot;
use markletkit::app::helpers::HelperLibrary;
use markletkit::app::package::{PackageOptions, Packager};
use markletkit::app::scan::UnitSource;

const LIBRARY: &str = "function delay(ms) {\n    return new Promise(r => setTimeout(r, ms));\n}\n\nfunction log(m) {\n    console.log('[Bookmarklet] ' + m);\n}\n\nfunction elementExists(s) {\n    return document.querySelector(s) !== null;\n}\n";

fn ping_unit(root: &std::path::Path) -> markletkit::domain::model::BookmarkletUnit {
    let dir = root.join("ping");
    std::fs::create_dir_all(&dir).expect("unit dir");
    std::fs::write(
        dir.join("index.js"),
        "(function () {\n    'use strict';\n    delay(10).then(() => log('done'));\n})();\n",
    )
    .expect("write unit");
    UnitSource {
        name: "ping".into(),
        dir,
    }
    .load()
    .expect("load unit")
}

#[test]
fn assembled_unit_inlines_only_called_helpers() {
    let temp = tempfile::tempdir().expect("tempdir");
    let library = HelperLibrary::parse(LIBRARY);
    let assembled = Packager::new(&library, PackageOptions::default())
        .assemble(&ping_unit(temp.path()))
        .expect("assemble");

    assert_snapshot!(assembled.source.trim_end(), @r"
(function () {
    'use strict';

    // === Shared Helper Functions ===
    function delay(ms) {
    return new Promise(r => setTimeout(r, ms));
}

    function log(m) {
    console.log('[Bookmarklet] ' + m);
}
    // === End Helper Functions ===

    delay(10).then(() => log('done'));
})();
");
}

#[test]
fn packaged_unit_is_one_compressed_line() {
    let temp = tempfile::tempdir().expect("tempdir");
    let library = HelperLibrary::parse(LIBRARY);
    let packager = Packager::new(&library, PackageOptions::default());
    let unit = ping_unit(temp.path());
    let assembled = packager.assemble(&unit).expect("assemble");
    let packaged = packager.package(&unit).expect("package");

    assert!(packaged.code.starts_with("javascript:"));
    assert!(!packaged.code.contains('\n'));
    assert!(packaged.code.len() < assembled.source.len());
    assert!(!packaged.code.contains("=== Shared Helper Functions ==="));
    assert!(packaged.code.contains("setTimeout("));
    assert!(packaged.code.contains("[Bookmarklet] "));
    assert!(!packaged.code.contains("querySelector"));
}
