//! Project configuration file representation

use crate::error::Result;
use crate::project::program::Program;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::{fs, io};

/// In-memory representation of the current project configuration.
///
/// This file is typically read from a file named `functrace.json`, and it
/// maps program names to the export and emulator settings used to trace
/// them.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Project {
    programs: HashMap<String, Program>,
}

impl Project {
    pub fn read(filename: &str) -> Result<Self> {
        let project_file = fs::File::open(filename)?;
        Self::from_reader(io::BufReader::new(project_file))
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut project: Self = serde_json::from_reader(reader)?;

        for (name, prog) in project.programs.iter_mut() {
            if prog.as_name().is_none() {
                prog.set_name(name);
            }
        }

        Ok(project)
    }

    /// Get the program with the given name within the project.
    pub fn program(&self, name: &str) -> Option<&Program> {
        self.programs.get(name)
    }

    /// Get the project's default program.
    ///
    /// Programs are kept in a hash map, so "default" is only meaningful when
    /// the project holds a single program.
    pub fn default_program(&self) -> Option<(&String, &Program)> {
        self.programs.iter().next()
    }

    pub fn iter_programs(&self) -> impl Iterator<Item = (&str, &Program)> {
        self.programs.iter().map(|(k, v)| (k.as_str(), v))
    }
}
