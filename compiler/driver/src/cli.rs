use clap::{
    builder::{PossibleValue, TypedValueParser, ValueParser},
    Arg, ArgAction, ArgMatches,
};
use std::{ffi::OsStr, path::PathBuf};
use utility::paint::ColorChoice;

pub(crate) fn arguments() -> Result<(Command, GlobalOptions), clap::Error> {
    let matches = clap::Command::new("mysc")
        .bin_name("mysc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Translate Mys modules to C++")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .args([
            Arg::new(option::VERBOSE)
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log the progress of the compiler to stderr. Overridden by 'MYSC_LOG'"),
            Arg::new(option::COLOR)
                .long("color")
                .global(true)
                .value_name("WHEN")
                .value_parser(ColorChoiceParser)
                .help("Control when to use color"),
        ])
        .subcommand(
            clap::Command::new(subcommand::TRANSPILE)
                .visible_alias("t")
                .about("Translate the given source files to early headers, headers and sources")
                .args([
                    Arg::new(argument::FILES)
                        .value_parser(ValueParser::path_buf())
                        .action(ArgAction::Append)
                        .required(true)
                        .help("The paths to the source files"),
                    Arg::new(option::PACKAGE)
                        .long("package")
                        .short('p')
                        .value_name(argument::NAME)
                        .help("The name of the package prefixed to every module name"),
                    Arg::new(option::OUTPUT)
                        .long("output")
                        .short('o')
                        .value_name("DIRECTORY")
                        .value_parser(ValueParser::path_buf())
                        .default_value("build/transpiled")
                        .help("The folder the emitted files are written to"),
                    Arg::new(option::SKIP_TESTS)
                        .long("skip-tests")
                        .action(ArgAction::SetTrue)
                        .help("Drop the functions decorated with '@test'"),
                    Arg::new(option::MAIN)
                        .long("main")
                        .short('m')
                        .value_name("MODULE")
                        .help("The module defining the entry point of the application"),
                ]),
        )
        .try_get_matches()?;

    let global_options = GlobalOptions::deserialize(&matches);

    let command = match matches.subcommand() {
        Some((subcommand::TRANSPILE, matches)) => Command::Transpile(TranspileOptions::deserialize(matches)),
        _ => unreachable!(),
    };

    Ok((command, global_options))
}

mod subcommand {
    pub(super) const TRANSPILE: &str = "transpile";
}

mod argument {
    pub(super) const FILES: &str = "FILES";
    pub(super) const NAME: &str = "NAME";
}

mod option {
    pub(super) const COLOR: &str = "color";
    pub(super) const MAIN: &str = "main";
    pub(super) const OUTPUT: &str = "output";
    pub(super) const PACKAGE: &str = "package";
    pub(super) const SKIP_TESTS: &str = "skip_tests";
    pub(super) const VERBOSE: &str = "verbose";
}

pub(crate) enum Command {
    Transpile(TranspileOptions),
}

pub(crate) struct GlobalOptions {
    pub(crate) verbose: bool,
    pub(crate) color: ColorChoice,
}

impl GlobalOptions {
    fn deserialize(matches: &ArgMatches) -> Self {
        Self {
            verbose: matches.get_flag(option::VERBOSE),
            color: matches.get_one(option::COLOR).copied().unwrap_or_default(),
        }
    }
}

pub(crate) struct TranspileOptions {
    pub(crate) files: Vec<PathBuf>,
    pub(crate) package: Option<String>,
    pub(crate) output: PathBuf,
    pub(crate) skip_tests: bool,
    pub(crate) main: Option<String>,
}

impl TranspileOptions {
    fn deserialize(matches: &ArgMatches) -> Self {
        Self {
            files: matches
                .get_many::<PathBuf>(argument::FILES)
                .map(|files| files.cloned().collect())
                .unwrap_or_default(),
            package: matches.get_one::<String>(option::PACKAGE).cloned(),
            output: matches
                .get_one::<PathBuf>(option::OUTPUT)
                .cloned()
                .unwrap_or_default(),
            skip_tests: matches.get_flag(option::SKIP_TESTS),
            main: matches.get_one::<String>(option::MAIN).cloned(),
        }
    }
}

#[derive(Clone)]
struct ColorChoiceParser;

impl TypedValueParser for ColorChoiceParser {
    type Value = ColorChoice;

    fn parse_ref(
        &self,
        _: &clap::Command,
        _: Option<&Arg>,
        source: &OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let source = parse_utf8(source)?;

        COLOR_CHOICES
            .into_iter()
            .find(|choice| choice.name() == source)
            .ok_or_else(|| {
                clap::Error::raw(
                    clap::error::ErrorKind::InvalidValue,
                    format!("'{source}' is not a valid color choice\n"),
                )
            })
    }

    fn possible_values(&self) -> Option<Box<dyn Iterator<Item = PossibleValue>>> {
        Some(Box::new(
            COLOR_CHOICES
                .into_iter()
                .map(|choice| PossibleValue::new(choice.name())),
        ))
    }
}

const COLOR_CHOICES: [ColorChoice; 3] = [ColorChoice::Auto, ColorChoice::Always, ColorChoice::Never];

fn parse_utf8(source: &OsStr) -> Result<&str, clap::Error> {
    source.to_str().ok_or_else(|| {
        clap::Error::raw(
            clap::error::ErrorKind::InvalidUtf8,
            format!("'{}' is not valid UTF-8\n", source.to_string_lossy()),
        )
    })
}
