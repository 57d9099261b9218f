use glob::glob;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::host::Entry;
use super::parser_error::InvalidIncludeError;
use super::parser_error::InvalidIncludeErrorDetails;
use super::parser_error::ParseError;
use super::{EntryType, Host};

/// Same limit as OpenSSH's `READCONF_MAX_DEPTH`.
const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug)]
pub struct Parser {
    include_base: PathBuf,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    #[must_use]
    pub fn new() -> Parser {
        Parser {
            include_base: PathBuf::from(shellexpand::tilde("~/.ssh").into_owned()),
        }
    }

    /// A parser for `config_path`, resolving relative `Include`s next to it
    /// the way OpenSSH does for `~/.ssh/config`.
    #[must_use]
    pub fn for_config(config_path: &Path) -> Parser {
        match config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => Parser::new().with_include_base(dir),
            _ => Parser::new(),
        }
    }

    /// Directory that relative `Include` paths are resolved against.
    #[must_use]
    pub fn with_include_base<P>(mut self, dir: P) -> Parser
    where
        P: Into<PathBuf>,
    {
        self.include_base = dir.into();
        self
    }

    /// # Errors
    ///
    /// Will return `Err` if the file cannot be opened or read.
    pub fn parse_file<P>(&self, path: P) -> Result<Vec<Host>, ParseError>
    where
        P: AsRef<Path>,
    {
        self.parse(&mut open(path)?)
    }

    /// Reads every host block except `Host *`, sorted by alias.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the reader fails or an `Include` cannot be
    /// resolved.
    pub fn parse(&self, reader: &mut impl BufRead) -> Result<Vec<Host>, ParseError> {
        Ok(collect_hosts(&self.entries(reader)?))
    }

    /// All directives of the reader in file order, `Include`s inlined.
    pub(crate) fn entries(&self, reader: &mut impl BufRead) -> Result<Vec<Entry>, ParseError> {
        let mut entries = Vec::new();
        self.read_entries(reader, 0, &mut entries)?;
        Ok(entries)
    }

    fn read_entries(
        &self,
        reader: &mut impl BufRead,
        depth: usize,
        entries: &mut Vec<Entry>,
    ) -> Result<(), ParseError> {
        // Bytes, not `read_line`: a stray Latin-1 comment must not abort the read.
        let mut line = Vec::new();
        while reader.read_until(b'\n', &mut line)? > 0 {
            let entry = parse_line(&String::from_utf8_lossy(&line));
            line.clear();

            let Some(entry) = entry else {
                continue;
            };

            if entry.0 == EntryType::Include {
                self.include(&entry.1, depth, entries)?;
                continue;
            }

            entries.push(entry);
        }

        Ok(())
    }

    fn include(
        &self,
        value: &str,
        depth: usize,
        entries: &mut Vec<Entry>,
    ) -> Result<(), ParseError> {
        let invalid = |details: InvalidIncludeErrorDetails| InvalidIncludeError {
            line: format!("Include {value}"),
            details,
        };

        if depth >= MAX_INCLUDE_DEPTH {
            return Err(invalid(InvalidIncludeErrorDetails::TooDeep(MAX_INCLUDE_DEPTH)).into());
        }

        for raw_pattern in value.split_whitespace() {
            let mut pattern = PathBuf::from(shellexpand::tilde(raw_pattern).into_owned());
            if pattern.is_relative() {
                pattern = self.include_base.join(pattern);
            }

            let paths = glob(&pattern.to_string_lossy()).map_err(|e| invalid(e.into()))?;

            for path in paths {
                let path = path.map_err(|e| invalid(e.into()))?;
                let file = File::open(&path).map_err(|source| {
                    invalid(InvalidIncludeErrorDetails::Io {
                        path: path.clone(),
                        source,
                    })
                })?;

                self.read_entries(&mut BufReader::new(file), depth + 1, entries)?;
            }
        }

        Ok(())
    }
}

pub(crate) fn open<P>(path: P) -> Result<BufReader<File>, ParseError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ParseError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(BufReader::new(file))
}

/// Splits a line into its directive and the remaining tokens.
///
/// Comments and lines with fewer than two tokens yield `None`.
fn parse_line(line: &str) -> Option<Entry> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }

    let mut tokens = line.split_whitespace();
    let key = tokens.next()?;
    let value = tokens.join(" ");
    if value.is_empty() {
        return None;
    }

    Some((EntryType::parse(key), value))
}

/// Folds directives into hosts keyed by alias, the last block winning.
///
/// `Host *` and `Match` close the current block, so a `HostName` under them
/// never lands on the host declared before.
fn collect_hosts(entries: &[Entry]) -> Vec<Host> {
    let mut hosts: BTreeMap<&str, Host> = BTreeMap::new();
    let mut current: Option<&str> = None;

    for (entry_type, value) in entries {
        match entry_type {
            EntryType::Host if value != "*" => {
                hosts.insert(value.as_str(), Host::new(value.as_str(), String::new()));
                current = Some(value.as_str());
            }
            EntryType::Host | EntryType::Match => current = None,
            EntryType::HostName => {
                if let Some(host) = current.and_then(|alias| hosts.get_mut(alias)) {
                    host.hostname.clone_from(value);
                }
            }
            _ => {}
        }
    }

    hosts.into_values().collect()
}
