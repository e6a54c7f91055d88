//! The compilation pipeline and the command-line interface of the compiler.
//!
//! All modules pass through each phase before the next phase starts: every module is parsed,
//! lowered and collected, then the definitions of all modules are resolved together and finally
//! every module is emitted. The first error aborts the compilation.

use cli::{Command, GlobalOptions, TranspileOptions};
use diagnostics::Diag;
use session::{Registry, Specializations};
use span::{SourceFile, SourceMap};
use std::{
    borrow::Cow,
    io::{self, Write},
    path::{Component, Path, PathBuf},
};
use utility::{
    is_snake_case,
    paint::{epaint, AnsiColor, ColorChoice, Effects},
};

pub use codegen_cpp::Output;
pub use diagnostics::{CompileError, ErrorKind};

mod cli;
mod render;
#[cfg(test)]
mod test;

/// The environment variable holding the logging filter.
const LOG_VARIABLE: &str = "MYSC_LOG";

/// A module to compile.
#[derive(Clone, Debug)]
pub struct Source {
    pub text: String,
    /// The dotted name of the module, e.g. `package.foo.bar`.
    pub module: String,
    /// Drop the functions decorated with `@test`.
    pub skip_tests: bool,
    /// Whether the module defines the entry point of the application.
    pub has_main: bool,
    /// The path the header is written to.
    pub header_path: PathBuf,
    /// The path the source is written to.
    pub source_path: PathBuf,
}

impl Source {
    /// A library module whose files are written next to each other relative to the current
    /// folder.
    pub fn new(module: impl Into<String>, text: impl Into<String>) -> Self {
        let module = module.into();
        let path = codegen_cpp::include_path(&module);

        Self {
            text: text.into(),
            header_path: format!("{path}.mys.hpp").into(),
            source_path: format!("{path}.mys.cpp").into(),
            module,
            skip_tests: false,
            has_main: false,
        }
    }

    /// The path the early header is written to.
    pub fn early_header_path(&self) -> PathBuf {
        let header = self.header_path.to_string_lossy();
        match header.strip_suffix(".hpp") {
            Some(stem) => format!("{stem}.early.hpp").into(),
            None => format!("{header}.early.hpp").into(),
        }
    }
}

/// Compile the given modules in order.
///
/// On success, the outputs correspond one to one to the sources.
pub fn compile(sources: &[Source]) -> Result<Vec<Output>, CompileError> {
    compile_in(&mut SourceMap::default(), sources)
}

/// Compile the given modules, adding their texts to the given source map.
fn compile_in(map: &mut SourceMap, sources: &[Source]) -> Result<Vec<Output>, CompileError> {
    let mut modules = Vec::with_capacity(sources.len());

    for source in sources {
        if modules
            .iter()
            .any(|definitions: &hir::Definitions| definitions.module == source.module)
        {
            return Err(Diag::error()
                .message(format!("module '{}' is given more than once", source.module))
                .resolve(map));
        }

        let file = map.add_str(source.module.as_str(), &source.text);
        let definitions = definitions(&map[file], source).map_err(|error| error.resolve(map))?;
        modules.push(definitions);
    }

    tracing::debug!(modules = modules.len(), "resolving names");
    resolver::resolve(&mut modules).map_err(|error| error.resolve(map))?;

    let registry = Registry::new(modules);
    let mut specializations = Specializations::default();

    let outputs = sources
        .iter()
        .map(|source| {
            codegen_cpp::compile_module(
                &registry,
                &mut specializations,
                &source.module,
                codegen_cpp::Options {
                    has_main: source.has_main,
                },
            )
            .map_err(|error| error.resolve(map))
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(specializations = specializations.len(), "compiled all modules");
    Ok(outputs)
}

fn definitions(file: &SourceFile, source: &Source) -> diagnostics::Result<hir::Definitions> {
    tracing::debug!(module = %source.module, "parsing module");
    let mut module = parser::parse(file)?;

    lowerer::lower_iterators(&mut module)?;

    tracing::debug!(module = %source.module, "collecting definitions");
    collector::collect(
        &source.module,
        &module,
        collector::Options {
            skip_tests: source.skip_tests,
            has_main: source.has_main,
        },
    )
}

/// The failure of a command.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Arguments(#[from] clap::Error),
    #[error("could not read the file '{}'", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write the file '{}'", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("the path '{}' does not name a module", path.display())]
    ModuleName { path: PathBuf },
    /// The compile error has already been reported.
    #[error("{0}")]
    Compile(CompileError),
}

pub fn main() -> Result<(), Error> {
    set_panic_hook();

    let (command, options) = match cli::arguments() {
        Ok(arguments) => arguments,
        Err(error) if !error.use_stderr() => {
            // help and version
            let _ = error.print();
            return Ok(());
        }
        Err(error) => {
            let _ = error.print();
            return Err(error.into());
        }
    };

    initialize_logging(options.verbose);

    let result = match command {
        Command::Transpile(transpile_options) => transpile(&transpile_options, &options),
    };

    if let Err(error) = &result {
        if !matches!(error, Error::Compile(_) | Error::Arguments(_)) {
            let _ = epaint(
                |painter| {
                    painter.set(AnsiColor::Red.on_default().effects(Effects::BOLD))?;
                    write!(painter, "error")?;
                    painter.unset()?;
                    writeln!(painter, ": {error}")
                },
                options.color,
            );
        }
    }

    result
}

fn initialize_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_VARIABLE)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .compact()
        .try_init();
}

fn transpile(options: &TranspileOptions, global_options: &GlobalOptions) -> Result<(), Error> {
    let mut sources = Vec::with_capacity(options.files.len());

    for path in &options.files {
        let module = module_name(options.package.as_deref(), path)
            .ok_or_else(|| Error::ModuleName { path: path.clone() })?;
        let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.clone(),
            source,
        })?;

        let output = options.output.join(codegen_cpp::include_path(&module));
        sources.push(Source {
            text,
            skip_tests: options.skip_tests,
            has_main: options.main.as_deref() == Some(module.as_str()),
            header_path: output.with_extension("mys.hpp"),
            source_path: output.with_extension("mys.cpp"),
            module,
        });
    }

    tracing::debug!(files = sources.len(), output = %options.output.display(), "transpiling");

    let mut map = SourceMap::default();
    let outputs = match compile_in(&mut map, &sources) {
        Ok(outputs) => outputs,
        Err(error) => {
            report(&error, &map, &sources, &options.files, global_options.color);
            return Err(Error::Compile(error));
        }
    };

    for (source, output) in sources.iter().zip(outputs) {
        write(&source.early_header_path(), &output.early_header)?;
        write(&source.header_path, &output.header)?;
        write(&source.source_path, &output.source)?;
    }

    Ok(())
}

fn write(path: &Path, content: &str) -> Result<(), Error> {
    let error = |source| Error::Write {
        path: path.to_owned(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(error)?;
    }
    std::fs::write(path, content).map_err(error)
}

fn report(error: &CompileError, map: &SourceMap, sources: &[Source], paths: &[PathBuf], color: ColorChoice) {
    let file = error.file.as_ref().map(ToString::to_string);
    let path = sources
        .iter()
        .position(|source| file.as_deref() == Some(source.module.as_str()))
        .map_or(Cow::Borrowed("<unknown>"), |index| paths[index].to_string_lossy());
    let line = error.span.and_then(|span| map.line_with_highlight(span));

    let _ = epaint(|painter| render::render(error, &path, line, painter), color);
}

/// The dotted name of the module stored at the given path.
///
/// A leading `src` folder is not part of the name: `src/foo/bar.mys` is the module `foo.bar`.
fn module_name(package: Option<&str>, path: &Path) -> Option<String> {
    if path.extension()? != utility::FILE_EXTENSION {
        return None;
    }

    let stem = path.with_extension("");
    let mut segments = Vec::new();
    for component in stem.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if segments.first() == Some(&"src") && segments.len() > 1 {
        segments.remove(0);
    }
    if !segments.iter().all(|segment| is_snake_case(segment)) {
        return None;
    }

    let name = segments.join(".");
    Some(match package {
        Some(package) => format!("{package}.{name}"),
        None => name,
    })
}

fn set_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let payload = info.payload();

        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown cause")
            .to_owned();

        let backtrace = std::env::var("MYSC_BACKTRACE")
            .is_ok_and(|variable| variable != "0")
            .then(std::backtrace::Backtrace::force_capture);

        let mut notes = Vec::new();
        if let Some(location) = info.location() {
            notes.push(format!("at '{location}'"));
        }
        notes.push("the compiler unexpectedly panicked. this is a bug".to_owned());
        notes.push(match backtrace {
            Some(backtrace) => format!("with the following backtrace:\n{backtrace}"),
            None => "rerun with the environment variable 'MYSC_BACKTRACE=1' to display a backtrace"
                .to_owned(),
        });

        let error = CompileError {
            kind: ErrorKind::Internal,
            message,
            notes,
            file: None,
            line: 0,
            column: 0,
            span: None,
        };

        let _ = epaint(
            |painter| render::render(&error, "<compiler>", None, painter),
            ColorChoice::Auto,
        );
    }));
}
