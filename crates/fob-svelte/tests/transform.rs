//! Integration tests for the Svelte transformer
//!
//! These drive the full preprocess → compile → split flow with the in-process
//! fakes from `fob_svelte::testing`, so no Node.js install is needed.

use fob_svelte::split::HOT_ACCEPT_STUB;
use fob_svelte::testing::{FakeCompiler, FakeHotReload, FakePreprocessor, RecordingSink, HOT_MARKER};
use async_trait::async_trait;
use fob_svelte::{
    ArtifactMeta, BundleBehavior, CompileWarning, CompiledUnit, DependencyKind, GeneratedCode,
    LineColumn, OutputKind, OutputRequest, PreprocessOutput, Preprocessor, SvelteError,
    SvelteTransformer, ToolError, PLUGIN_ORIGIN,
};
use miette::Diagnostic;
use proptest::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const APP: &str = "/app/src/App.svelte";

fn transformer(compiler: Arc<FakeCompiler>) -> SvelteTransformer {
    SvelteTransformer::new("/app", compiler)
}

#[tokio::test]
async fn test_component_with_styles() {
    let compiler = Arc::new(FakeCompiler::new());
    let transformer = transformer(compiler.clone());
    let source = "<h1>Hi</h1><style>h1{color:red}</style>";
    let path = Path::new(APP);

    let style = transformer
        .transform(path, source, OutputRequest::Style, true)
        .await
        .unwrap();
    assert_eq!(style.kind, OutputKind::Css);
    assert_eq!(style.code, "h1{color:red}");

    let script = transformer
        .transform(path, source, OutputRequest::Script, true)
        .await
        .unwrap();
    assert_eq!(script.kind, OutputKind::Js);
    assert!(script.code.starts_with("export default function Component"));
    assert!(script.code.contains("<h1>Hi</h1>"));

    let entry = transformer
        .transform(path, source, OutputRequest::Entry, true)
        .await
        .unwrap();
    assert_eq!(entry.kind, OutputKind::Js);
    assert_eq!(entry.code.matches("?type=css").count(), 1);
    assert!(entry.code.contains("import Component from \"/src/App.svelte?type=js\";"));
    assert!(entry.code.contains("export default Component;"));
    assert!(entry.map.is_none());

    assert_eq!(compiler.calls(), 1);
}

#[tokio::test]
async fn test_entry_snapshot() {
    let transformer = transformer(Arc::new(FakeCompiler::new()));
    let entry = transformer
        .transform(
            Path::new(APP),
            "<h1>Hi</h1><style>h1{color:red}</style>",
            OutputRequest::Entry,
            true,
        )
        .await
        .unwrap();

    insta::assert_snapshot!(entry.code, @r#"
    import "/src/App.svelte?type=css";
    import Component from "/src/App.svelte?type=js";
    export default Component;
    "#);
}

#[tokio::test]
async fn test_blank_stylesheet_is_not_imported() {
    let transformer = transformer(Arc::new(FakeCompiler::new()));

    for source in ["<p>plain</p>", "<p>plain</p><style>  \n </style>"] {
        let path = PathBuf::from(format!("/app/src/Plain{}.svelte", source.len()));
        let entry = transformer
            .transform(&path, source, OutputRequest::Entry, true)
            .await
            .unwrap();

        assert!(!entry.code.contains("?type=css"), "{}", entry.code);
        assert!(entry.code.contains("?type=js"));
    }
}

#[tokio::test]
async fn test_dev_build_is_hot_wrapped() {
    let hot = Arc::new(FakeHotReload::new());
    let transformer = transformer(Arc::new(FakeCompiler::new())).with_hot_reload(hot.clone());
    let path = Path::new(APP);

    let entry = transformer
        .transform(path, "<h1>Hi</h1>", OutputRequest::Entry, false)
        .await
        .unwrap();
    assert!(entry.code.ends_with(HOT_ACCEPT_STUB));

    let script = transformer
        .transform(path, "<h1>Hi</h1>", OutputRequest::Script, false)
        .await
        .unwrap();
    assert!(script.code.ends_with(&format!("{}src/App.svelte */", HOT_MARKER)));
    assert_eq!(hot.calls(), 1);
}

#[tokio::test]
async fn test_hot_wrapper_only_changes_script_code() {
    let source = "<h1>Hi</h1><style>h1{color:red}</style>";
    let path = Path::new(APP);
    let plain = transformer(Arc::new(FakeCompiler::new()));
    let wrapped = transformer(Arc::new(FakeCompiler::new()))
        .with_hot_reload(Arc::new(FakeHotReload::new()));

    let mut outputs = Vec::new();
    for transformer in [&plain, &wrapped] {
        let script = transformer
            .transform(path, source, OutputRequest::Script, false)
            .await
            .unwrap();
        let style = transformer
            .transform(path, source, OutputRequest::Style, false)
            .await
            .unwrap();
        outputs.push((script, style));
    }
    let (plain_script, plain_style) = &outputs[0];
    let (wrapped_script, wrapped_style) = &outputs[1];

    assert_ne!(plain_script.code, wrapped_script.code);
    assert!(plain_script.map.is_some());
    assert_eq!(plain_script.map, wrapped_script.map);
    assert_eq!(plain_style, wrapped_style);
}

#[tokio::test]
async fn test_optimized_build_skips_hot_wrapper() {
    let hot = Arc::new(FakeHotReload::new());
    let transformer = transformer(Arc::new(FakeCompiler::new())).with_hot_reload(hot.clone());
    let path = Path::new(APP);

    let entry = transformer
        .transform(path, "<h1>Hi</h1>", OutputRequest::Entry, true)
        .await
        .unwrap();
    let script = transformer
        .transform(path, "<h1>Hi</h1>", OutputRequest::Script, true)
        .await
        .unwrap();

    assert!(!entry.code.contains("import.meta.hot"));
    assert!(!script.code.contains(HOT_MARKER));
    assert_eq!(hot.calls(), 0);
}

#[tokio::test]
async fn test_dev_build_without_wrapper_still_gets_stub() {
    let transformer = transformer(Arc::new(FakeCompiler::new()));
    let unit = transformer
        .produce("<h1>Hi</h1>", Path::new(APP), false)
        .await
        .unwrap();

    assert!(!unit.optimized);
    let entry = transformer.split(&unit, OutputRequest::Entry);
    assert!(entry.code.ends_with(HOT_ACCEPT_STUB));
}

#[tokio::test]
async fn test_preprocess_dependencies_registered_once() {
    let preprocessor = FakePreprocessor::new().with_dependencies([
        "/app/src/theme.scss",
        "/app/shared/vars.scss",
        "/app/src/theme.scss",
    ]);
    let transformer =
        transformer(Arc::new(FakeCompiler::new())).with_preprocessor(Arc::new(preprocessor));

    let entry = transformer
        .transform(Path::new(APP), "<h1>Hi</h1>", OutputRequest::Entry, true)
        .await
        .unwrap();

    let specifiers: Vec<&str> = entry
        .dependencies
        .iter()
        .map(|dependency| dependency.specifier.as_str())
        .collect();
    assert_eq!(specifiers, vec!["/src/theme.scss", "/shared/vars.scss"]);

    for dependency in &entry.dependencies {
        assert_eq!(dependency.kind, DependencyKind::File);
        assert_eq!(dependency.behavior, BundleBehavior::Isolated);
        assert_eq!(dependency.resolve_from, dependency.specifier);
    }
}

/// Inlines `theme.scss` from the component's directory in place of
/// `/*theme*/` and reports it as a dependency.
#[derive(Debug)]
struct ThemePreprocessor;

#[async_trait]
impl Preprocessor for ThemePreprocessor {
    async fn preprocess(&self, source: &str, filename: &Path) -> Result<PreprocessOutput, ToolError> {
        let theme = filename.with_file_name("theme.scss");
        let contents = tokio::fs::read_to_string(&theme)
            .await
            .map_err(|e| ToolError::new(e.to_string()))?;

        Ok(PreprocessOutput {
            code: source.replace("/*theme*/", contents.trim()),
            map: None,
            dependencies: vec![theme],
        })
    }
}

#[tokio::test]
async fn test_edited_dependency_recompiles_unit() {
    let dir = tempfile::TempDir::new().unwrap();
    let component = dir.path().join("src/App.svelte");
    std::fs::create_dir_all(component.parent().unwrap()).unwrap();
    std::fs::write(dir.path().join("src/theme.scss"), "h1{color:red}").unwrap();

    let compiler = Arc::new(FakeCompiler::new());
    let transformer = SvelteTransformer::new(dir.path(), compiler.clone())
        .with_preprocessor(Arc::new(ThemePreprocessor));
    let source = "<h1>Hi</h1><style>/*theme*/</style>";

    let first = transformer
        .transform(&component, source, OutputRequest::Style, true)
        .await
        .unwrap();
    let unchanged = transformer
        .transform(&component, source, OutputRequest::Style, true)
        .await
        .unwrap();
    assert_eq!(first.code, "h1{color:red}");
    assert_eq!(unchanged.code, "h1{color:red}");
    assert_eq!(compiler.calls(), 1);

    std::fs::write(dir.path().join("src/theme.scss"), "h1{color:blue}").unwrap();
    let second = transformer
        .transform(&component, source, OutputRequest::Style, true)
        .await
        .unwrap();
    assert_eq!(second.code, "h1{color:blue}");
    assert_eq!(compiler.calls(), 2);
}

#[tokio::test]
async fn test_script_and_style_faces_have_no_dependencies() {
    let preprocessor = FakePreprocessor::new().with_dependencies(["/app/src/theme.scss"]);
    let transformer =
        transformer(Arc::new(FakeCompiler::new())).with_preprocessor(Arc::new(preprocessor));

    for request in [OutputRequest::Script, OutputRequest::Style] {
        let output = transformer
            .transform(Path::new(APP), "<h1>Hi</h1>", request, true)
            .await
            .unwrap();
        assert!(output.dependencies.is_empty());
    }
}

#[tokio::test]
async fn test_preprocess_error_caches_nothing() {
    let compiler = Arc::new(FakeCompiler::new());
    let preprocessor = FakePreprocessor::failing(
        ToolError::new("Unexpected token")
            .with_location(LineColumn::new(1, 16), LineColumn::new(1, 17)),
    );
    let transformer = transformer(compiler.clone()).with_preprocessor(Arc::new(preprocessor));
    let source = "<script lang=\"ts\">let x: = 1</script>";

    let error = transformer
        .transform(Path::new(APP), source, OutputRequest::Entry, true)
        .await
        .unwrap_err();

    let diagnostic = match &error {
        SvelteError::Preprocess(diagnostic) => diagnostic,
        other => panic!("expected preprocess error, got {other}"),
    };
    assert_eq!(diagnostic.origin, PLUGIN_ORIGIN);
    assert_eq!(diagnostic.file_path, PathBuf::from(APP));
    assert_eq!(diagnostic.message, "Unexpected token");
    assert_eq!(diagnostic.code_frames.len(), 1);
    assert!(!error.is_internal());

    assert_eq!(compiler.calls(), 0);
    assert!(transformer.cache().get("src/App.svelte").is_none());
    assert!(transformer
        .materialize(Path::new(APP), OutputRequest::Script)
        .unwrap_err()
        .is_internal());
}

#[tokio::test]
async fn test_compile_error_points_into_source() {
    let transformer = transformer(Arc::new(FakeCompiler::new()));
    let source = "<h1>Hi</h1>\n{#fail}";

    let error = transformer
        .transform(Path::new(APP), source, OutputRequest::Entry, true)
        .await
        .unwrap_err();

    assert!(matches!(error, SvelteError::Compile(_)));
    let code = error.code().map(|code| code.to_string());
    assert_eq!(code.as_deref(), Some("fob::svelte::compile"));

    let labels: Vec<_> = error.labels().unwrap().collect();
    assert_eq!(labels[0].offset(), 12);
    assert_eq!(labels[0].len(), 7);

    let diagnostic = error.to_diagnostic();
    assert_eq!(diagnostic.code_frames[0].code.as_deref(), Some(source));
    assert!(transformer.cache().get("src/App.svelte").is_none());
}

#[tokio::test]
async fn test_recovers_after_fixing_compile_error() {
    let compiler = Arc::new(FakeCompiler::new());
    let transformer = transformer(compiler.clone());
    let path = Path::new(APP);

    assert!(transformer
        .transform(path, "{#fail}", OutputRequest::Entry, true)
        .await
        .is_err());
    let fixed = transformer
        .transform(path, "<h1>fixed</h1>", OutputRequest::Script, true)
        .await
        .unwrap();

    assert!(fixed.code.contains("fixed"));
    assert_eq!(compiler.calls(), 2);
}

#[tokio::test]
async fn test_faces_share_one_compile_per_version() {
    let compiler = Arc::new(FakeCompiler::new());
    let transformer = transformer(compiler.clone());
    let path = Path::new(APP);
    let source = "<h1>Hi</h1><style>h1{color:red}</style>";

    let (entry, script, style) = tokio::join!(
        transformer.transform(path, source, OutputRequest::Entry, true),
        transformer.transform(path, source, OutputRequest::Script, true),
        transformer.transform(path, source, OutputRequest::Style, true),
    );
    assert!(entry.is_ok() && script.is_ok() && style.is_ok());
    assert_eq!(compiler.calls(), 1);

    transformer
        .transform(path, "<h2>Changed</h2>", OutputRequest::Script, true)
        .await
        .unwrap();
    assert_eq!(compiler.calls(), 2);

    transformer
        .transform(path, "<h2>Changed</h2>", OutputRequest::Script, false)
        .await
        .unwrap();
    assert_eq!(compiler.calls(), 3);
}

#[tokio::test]
async fn test_stale_stored_unit_is_recompiled() {
    let compiler = Arc::new(FakeCompiler::new());
    let transformer = transformer(compiler.clone());
    let source = "<h1>Hi</h1>";

    let stale = CompiledUnit {
        meta: ArtifactMeta {
            kind: "fob-svelte".into(),
            version: "0.0.1".into(),
        },
        filename: "src/App.svelte".into(),
        js: GeneratedCode::new("export default 'stale'"),
        css: None,
        dependencies: Vec::new(),
        optimized: true,
    };
    assert!(!transformer.can_reuse(&stale.meta));
    transformer.cache().insert(source, true, stale).await;

    let script = transformer
        .transform(Path::new(APP), source, OutputRequest::Script, true)
        .await
        .unwrap();
    assert!(!script.code.contains("stale"));
    assert_eq!(compiler.calls(), 1);
}

#[tokio::test]
async fn test_materialize_uses_stored_unit() {
    let compiler = Arc::new(FakeCompiler::new());
    let transformer = transformer(compiler.clone());
    let source = "<h1>Hi</h1><style>h1{color:red}</style>";

    transformer
        .transform(Path::new(APP), source, OutputRequest::Entry, true)
        .await
        .unwrap();
    let style = transformer
        .materialize(Path::new(APP), OutputRequest::Style)
        .unwrap();

    assert_eq!(style.code, "h1{color:red}");
    assert_eq!(compiler.calls(), 1);
}

#[tokio::test]
async fn test_source_maps_are_sanitized() {
    let compiler = Arc::new(FakeCompiler::new());
    let transformer =
        transformer(compiler.clone()).with_preprocessor(Arc::new(FakePreprocessor::new()));

    let script = transformer
        .transform(Path::new(APP), "<h1>Hi</h1>", OutputRequest::Script, true)
        .await
        .unwrap();

    let incoming = compiler.last_options().unwrap().sourcemap.unwrap();
    assert_eq!(incoming.file.as_deref(), Some("src/App.svelte"));
    assert_eq!(incoming.sources, vec!["src/App.svelte".to_string()]);

    let map = script.map.unwrap();
    assert_eq!(map.file.as_deref(), Some("src/App.svelte"));
    assert_eq!(map.sources, vec!["src/App.svelte".to_string()]);
    assert_eq!(map.sources_content.map(|c| c.len()), Some(1));

    let style = transformer
        .transform(Path::new(APP), "<h1>Hi</h1>", OutputRequest::Style, true)
        .await
        .unwrap();
    assert!(style.map.is_none());
}

#[tokio::test]
async fn test_compile_options_follow_optimize_flag() {
    let compiler = Arc::new(FakeCompiler::new());
    let transformer = transformer(compiler.clone());

    transformer
        .produce("<h1>Hi</h1>", Path::new(APP), false)
        .await
        .unwrap();
    let options = compiler.last_options().unwrap();

    assert_eq!(options.filename, APP);
    assert!(options.dev);
    assert!(options.preserve_comments);
    assert!(!options.inject_css);
    assert!(options.sourcemap.is_none());
}

#[tokio::test]
async fn test_warnings_forwarded_as_one_batch() {
    let warnings = vec![
        CompileWarning {
            code: Some("a11y-missing-attribute".into()),
            message: "<img> element should have an alt attribute".into(),
            filename: Some(APP.into()),
            start: Some(LineColumn::new(1, 0)),
            end: Some(LineColumn::new(1, 15)),
        },
        CompileWarning {
            code: Some("css-unused-selector".into()),
            message: "Unused CSS selector".into(),
            filename: None,
            start: None,
            end: None,
        },
    ];
    let sink = Arc::new(RecordingSink::new());
    let transformer = transformer(Arc::new(FakeCompiler::new().with_warnings(warnings)))
        .with_sink(sink.clone());

    transformer
        .produce("<img src={s} />", Path::new(APP), true)
        .await
        .unwrap();

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    let (filename, forwarded) = &batches[0];
    assert_eq!(filename, "src/App.svelte");
    assert_eq!(forwarded.len(), 2);
    assert_eq!(forwarded[0].code_frames.len(), 1);
    assert_eq!(forwarded[0].code_frames[0].file_path, APP);
    assert!(forwarded[1].code_frames.is_empty());
}

#[tokio::test]
async fn test_no_warnings_no_batch() {
    let sink = Arc::new(RecordingSink::new());
    let transformer = transformer(Arc::new(FakeCompiler::new())).with_sink(sink.clone());

    transformer
        .produce("<h1>Hi</h1>", Path::new(APP), true)
        .await
        .unwrap();
    assert!(sink.batches().is_empty());
}

#[tokio::test]
async fn test_file_outside_root_keeps_parent_segments() {
    let transformer = transformer(Arc::new(FakeCompiler::new()));
    let entry = transformer
        .transform(
            Path::new("/shared/Button.svelte"),
            "<button>ok</button>",
            OutputRequest::Entry,
            true,
        )
        .await
        .unwrap();

    assert!(entry.code.contains("\"/../shared/Button.svelte?type=js\""));
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: compiling the same text with the same flag twice yields
    /// identical script and stylesheet text
    #[test]
    fn prop_compile_is_deterministic(
        markup in "[a-z ]{0,24}",
        css in "[a-z{}:; ]{0,24}",
        optimize in any::<bool>(),
    ) {
        let source = format!("<p>{}</p><style>{}</style>", markup, css);
        let transformer = transformer(Arc::new(FakeCompiler::new()));

        let (first, second) = block_on(async {
            let first = transformer.produce(&source, Path::new(APP), optimize).await.unwrap();
            let second = transformer.produce(&source, Path::new(APP), optimize).await.unwrap();
            (first, second)
        });

        prop_assert_eq!(first, second);
    }

    /// Property: splitting is pure and the stylesheet import appears iff the
    /// stylesheet has non-whitespace content
    #[test]
    fn prop_split_is_pure(
        markup in "[a-z ]{0,24}",
        css in "[a-z{}:; ]{0,24}",
        optimize in any::<bool>(),
        order in Just(OutputRequest::ALL.to_vec()).prop_shuffle(),
    ) {
        let source = format!("<p>{}</p><style>{}</style>", markup, css);
        let transformer = transformer(Arc::new(FakeCompiler::new()));
        let unit = block_on(transformer.produce(&source, Path::new(APP), optimize)).unwrap();

        let expected: Vec<_> = OutputRequest::ALL
            .iter()
            .map(|request| transformer.split(&unit, *request))
            .collect();
        for request in order {
            let index = OutputRequest::ALL.iter().position(|r| *r == request).unwrap();
            prop_assert_eq!(&transformer.split(&unit, request), &expected[index]);
        }

        let css_imports = expected[0].code.matches("?type=css").count();
        prop_assert_eq!(css_imports, usize::from(!css.trim().is_empty()));
        prop_assert_eq!(expected[0].code.ends_with(HOT_ACCEPT_STUB), !optimize);
    }
}
