#![allow(clippy::disallowed_methods)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use pretty_assertions::assert_eq;
use skpack::{
    compiler::{CompileError, CompileOptions, CompiledUnit, SourceCompiler},
    config::Config,
    emitter::OutputTarget,
    minify::LineMinifier,
    module_path::ModuleNaming,
    orchestrator::BundleOrchestrator,
    util::js_string_literal,
};
use tempfile::TempDir;

/// Compiles anything except sources containing `def (`, embedding the source
/// so tests can tell which file an entry came from
struct FakeCompiler;

impl SourceCompiler for FakeCompiler {
    fn compile(
        &self,
        source: &str,
        module_name: &str,
        _options: &CompileOptions,
    ) -> Result<CompiledUnit, CompileError> {
        if source.contains("def (") {
            return Err(CompileError::Syntax {
                message: "bad input".to_owned(),
                line: 1,
                column: 5,
            });
        }
        Ok(CompiledUnit {
            code: format!(
                "var $scope0 = function($modname) {{\n    return {};\n}};",
                js_string_literal(source.trim())
            ),
            funcname: format!("$scope0_{}", module_name.len()),
        })
    }
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn orchestrator(config: Config) -> BundleOrchestrator {
    BundleOrchestrator::with_backends(config, Box::new(FakeCompiler), Box::new(LineMinifier))
}

/// Two roots: `a` holds a valid module and an excluded one, `b` a broken one
struct Fixture {
    _temp_dir: TempDir,
    root_a: PathBuf,
    root_b: PathBuf,
    output: PathBuf,
}

fn fixture() -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let root_a = temp_dir.path().join("src").join("a");
    let root_b = temp_dir.path().join("src").join("b");
    write(&root_a.join("x.py"), "x = 1\n");
    write(&root_b.join("y.py"), "def (:\n    pass\n");
    write(&root_a.join("skip").join("z.py"), "z = 3\n");
    write(&root_a.join("README.md"), "# not python\n");
    let output = temp_dir.path().join("bundle.js");

    Fixture {
        root_a,
        root_b,
        output,
        _temp_dir: temp_dir,
    }
}

fn fixture_config(fixture: &Fixture) -> Config {
    Config {
        roots: vec![fixture.root_a.clone(), fixture.root_b.clone()],
        exclude: vec![fixture.root_a.join("skip").join("z.py")],
        output: fixture.output.clone(),
        ..Config::default()
    }
}

#[test]
fn test_end_to_end_skips_broken_and_excluded_sources() {
    let fixture = fixture();
    let config = fixture_config(&fixture);

    let report = orchestrator(config)
        .run(&OutputTarget::File(fixture.output.clone()))
        .unwrap();

    let naming = ModuleNaming::default();
    let x_key = naming.module_key(&fixture.root_a.join("x.py"));
    assert_eq!(report.bundled, vec![x_key.clone()]);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, fixture.root_b.join("y.py"));
    assert_eq!(
        report.failures[0].module_name,
        naming.source_name(&fixture.root_b.join("y.py"))
    );
    assert!(matches!(report.failures[0].error, CompileError::Syntax { line: 1, .. }));

    let bundle = fs::read_to_string(&fixture.output).unwrap();
    let expected_code = format!(
        "var $scope0 = function($modname) {{\nreturn \"x = 1\";\n}};\nvar $builtinmodule = $scope0_{};",
        naming.source_name(&fixture.root_a.join("x.py")).len()
    );
    assert_eq!(
        bundle,
        format!(
            "Sk.builtinFiles.files[{}] = {}",
            js_string_literal(&x_key),
            js_string_literal(&expected_code)
        )
    );
}

#[test]
fn test_excluded_directory_is_not_descended() {
    let fixture = fixture();
    let mut config = fixture_config(&fixture);
    config.exclude = vec![fixture.root_a.join("skip")];
    write(&fixture.root_a.join("skip").join("nested").join("w.py"), "w = 4\n");

    let (bundle, _) = orchestrator(config).build().unwrap();

    assert!(bundle.module_paths().all(|key| !key.contains("/skip/")));
    assert_eq!(bundle.len(), 1);
}

#[test]
fn test_every_matching_file_gets_exactly_one_entry() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("pedal");
    let sources = [
        "__init__.py",
        "core/__init__.py",
        "core/report.py",
        "tifa/tifa_core.py",
        "tifa/messages/__init__.py",
    ];
    for source in sources {
        write(&root.join(source), "pass\n");
    }
    write(&root.join("core").join("data.json"), "{}");

    let config = Config {
        roots: vec![root.clone()],
        ..Config::default()
    };
    let (bundle, report) = orchestrator(config).build().unwrap();

    let naming = ModuleNaming::default();
    let mut expected: Vec<String> = sources
        .iter()
        .map(|source| naming.module_key(&root.join(source)))
        .collect();
    expected.sort();
    let mut actual: Vec<String> = bundle.module_paths().map(str::to_owned).collect();
    actual.sort();

    assert_eq!(actual, expected);
    assert!(report.failures.is_empty());
    assert!(report.collisions.is_empty());
}

#[test]
fn test_running_twice_produces_identical_output() {
    let fixture = fixture();
    write(&fixture.root_a.join("pkg").join("m.py"), "m = 2\n");
    write(&fixture.root_a.join("pkg").join("n.py"), "n = 3\n");
    let target = OutputTarget::File(fixture.output.clone());

    orchestrator(fixture_config(&fixture)).run(&target).unwrap();
    let first = fs::read(&fixture.output).unwrap();
    orchestrator(fixture_config(&fixture)).run(&target).unwrap();
    let second = fs::read(&fixture.output).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_key_collision_keeps_last_processed_file() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("lib");
    write(&root.join("mod.py"), "first = 1\n");
    write(&root.join("mod.pyi"), "second = 2\n");

    let config = Config {
        roots: vec![root.clone()],
        extensions: vec!["py".to_owned(), "pyi".to_owned()],
        ..Config::default()
    };
    let (bundle, report) = orchestrator(config).build().unwrap();

    let key = ModuleNaming::default().module_key(&root.join("mod.py"));
    assert_eq!(bundle.len(), 1);
    assert!(bundle.get(&key).unwrap().contains("second = 2"));
    assert_eq!(report.collisions.len(), 1);
    assert_eq!(report.collisions[0].replaced, root.join("mod.py"));
    assert_eq!(report.collisions[0].kept, root.join("mod.pyi"));
}

#[test]
fn test_missing_root_aborts_without_writing() {
    let fixture = fixture();
    let mut config = fixture_config(&fixture);
    config.roots.push(fixture.root_a.join("does-not-exist"));

    let result = orchestrator(config).run(&OutputTarget::File(fixture.output.clone()));

    assert!(result.is_err());
    assert!(!fixture.output.exists());
}

#[test]
fn test_non_utf8_source_is_skipped() {
    let fixture = fixture();
    fs::write(fixture.root_a.join("latin1.py"), b"name = '\xe9t\xe9'\n").unwrap();

    let (bundle, report) = orchestrator(fixture_config(&fixture)).build().unwrap();

    assert_eq!(bundle.len(), 1);
    assert_eq!(report.failures.len(), 2);
    assert!(
        report
            .failures
            .iter()
            .any(|failure| matches!(failure.error, CompileError::Decode(_)))
    );
}

#[test]
fn test_minification_disabled_keeps_compiler_output() {
    let fixture = fixture();
    let config = Config {
        minify: false,
        ..fixture_config(&fixture)
    };

    let (bundle, _) = orchestrator(config).build().unwrap();
    let key = ModuleNaming::default().module_key(&fixture.root_a.join("x.py"));

    assert!(bundle.get(&key).unwrap().contains("\n    return \"x = 1\";\n"));
}

#[test]
fn test_overlapping_roots_process_each_file_once() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("pedal");
    write(&root.join("core.py"), "c = 1\n");
    write(&root.join("tifa").join("tifa_core.py"), "t = 2\n");

    let config = Config {
        roots: vec![root.clone(), root.clone(), root.join("tifa")],
        ..Config::default()
    };
    let (bundle, report) = orchestrator(config).build().unwrap();

    assert_eq!(bundle.len(), 2);
    assert_eq!(report.bundled.len(), 2);
    assert!(report.collisions.is_empty());
    assert!(report.failures.is_empty());
}
