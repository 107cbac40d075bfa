//! Packaged build output.
//!
//! All built files are concatenated into one program (internal files
//! first, then application files, each group in path order), optionally
//! minified with oxc, and emitted with a source map.

use std::fs;
use std::path::{Path, PathBuf};

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use thiserror::Error;

use super::pipeline::Built;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundle is not valid JavaScript: {0}")]
    Parse(String),

    #[error("failed to write `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub name: String,
    pub code: String,
    /// Source map JSON
    pub map: Option<String>,
}

/// Concatenate built files, each preceded by a `// <file>` marker.
pub fn concat(files: &[Built]) -> String {
    let mut ordered: Vec<&Built> = files.iter().collect();
    ordered.sort_by(|a, b| (!a.internal, &a.key).cmp(&(!b.internal, &b.key)));

    let mut out = String::new();
    for file in ordered {
        out.push_str("// ");
        out.push_str(&file.key);
        out.push('\n');
        out.push_str(&file.code);
        if !file.code.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Build the bundle named `name` from the built files.
pub fn package(files: &[Built], name: &str, minify: bool) -> Result<Bundle, BundleError> {
    let source = concat(files);
    let file_name = format!("{name}.js");

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, &source, SourceType::mjs()).parse();
    if let Some(error) = ret.errors.first() {
        return Err(BundleError::Parse(error.to_string()));
    }
    let mut program = ret.program;

    let scoping = if minify {
        let options = MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: Some(CompressOptions::smallest()),
        };
        Minifier::new(options).minify(&allocator, &mut program).scoping
    } else {
        None
    };

    let comments = if minify {
        CommentOptions::disabled()
    } else {
        CommentOptions::default()
    };
    let ret = Codegen::new()
        .with_options(CodegenOptions {
            minify,
            comments,
            source_map_path: Some(PathBuf::from(&file_name)),
            ..CodegenOptions::default()
        })
        .with_scoping(scoping)
        .build(&program);

    crate::debug!(
        "bundle";
        "{} files, {} -> {} bytes",
        files.len(),
        source.len(),
        ret.code.len()
    );

    Ok(Bundle {
        name: file_name,
        code: ret.code,
        map: ret.map.map(|map| map.to_json_string()),
    })
}

/// Write `<dist>/<name>.js` and, with a map, `<dist>/<name>.js.map`.
/// Returns the bundle path.
pub fn write_bundle(dist: &Path, bundle: &Bundle) -> Result<PathBuf, BundleError> {
    let io = |path: &Path| {
        let path = path.to_path_buf();
        move |source| BundleError::Io { path, source }
    };

    fs::create_dir_all(dist).map_err(io(dist))?;
    let code_path = dist.join(&bundle.name);
    let mut code = bundle.code.clone();

    if let Some(map) = &bundle.map {
        let map_name = format!("{}.map", bundle.name);
        let map_path = dist.join(&map_name);
        fs::write(&map_path, map).map_err(io(&map_path))?;
        if !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str(&format!("//# sourceMappingURL={map_name}\n"));
    }

    fs::write(&code_path, code).map_err(io(&code_path))?;
    Ok(code_path)
}
