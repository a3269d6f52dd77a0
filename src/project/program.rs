//! Program identifier

use crate::arch::ArchName;
use crate::project::EmulatorConfig;
use clap::{App, Arg, ArgMatches, ArgSettings};
use relative_path::{RelativePath, RelativePathBuf};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Program {
    arch: Option<ArchName>,

    #[serde(skip)]
    name: Option<String>,

    #[serde(default = "default_export_filename")]
    export: RelativePathBuf,

    #[serde(default)]
    emulator: EmulatorConfig,
}

fn default_export_filename() -> RelativePathBuf {
    RelativePathBuf::from("export.json")
}

impl Default for Program {
    fn default() -> Self {
        Program {
            arch: None,
            name: None,
            export: default_export_filename(),
            emulator: EmulatorConfig::default(),
        }
    }
}

impl Program {
    pub fn configure_app<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
        app.arg(
            Arg::with_name("export")
                .long("export")
                .value_name("export.json")
                .help("The disassembly export to analyze.")
                .takes_value(true)
                .set(ArgSettings::Global),
        )
        .arg(
            Arg::with_name("arch")
                .long("arch")
                .value_name("ARCH")
                .help("What architecture to expect.")
                .takes_value(true)
                .set(ArgSettings::Global),
        )
    }

    /// Construct a Program from clap ArgMatches
    ///
    /// An export path is only set if one was given, so that `apply_override`
    /// can tell it apart from the default.
    pub fn from_arg_matches(args: &ArgMatches) -> (Program, bool) {
        let export = args.value_of("export");

        let program = Program {
            arch: args
                .value_of("arch")
                .and_then(|s| ArchName::from_str(s).ok()),
            name: None,
            export: export.map_or_else(default_export_filename, RelativePathBuf::from),
            emulator: EmulatorConfig::default(),
        };

        (program, export.is_some())
    }

    pub fn arch(&self) -> Option<ArchName> {
        self.arch
    }

    pub fn set_arch(&mut self, arch: ArchName) {
        self.arch = Some(arch);
    }

    pub fn as_export_path(&self) -> &RelativePath {
        self.export.as_ref()
    }

    pub fn set_export_path(&mut self, path: &str) {
        self.export = RelativePathBuf::from(path);
    }

    pub fn emulator(&self) -> &EmulatorConfig {
        &self.emulator
    }

    pub fn as_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    /// Produce a program with every setting given on the command line
    /// replacing the corresponding project setting.
    pub fn apply_override(&self, other: &Program, export_given: bool) -> Program {
        Program {
            arch: other.arch.or(self.arch),
            name: other.name.clone().or_else(|| self.name.clone()),
            export: if export_given {
                other.export.clone()
            } else {
                self.export.clone()
            },
            emulator: self.emulator.clone(),
        }
    }
}
