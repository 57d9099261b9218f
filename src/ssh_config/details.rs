use std::io::BufRead;
use std::path::Path;

use super::host::Entry;
use super::parser::open;
use super::{EntryType, Host, HostDetails, ParseError, Parser};

impl Parser {
    /// Collects every directive of the `Host` block named exactly like
    /// `host.alias`.
    ///
    /// When the alias appears in more than one block, the last one wins, the
    /// same way [`Parser::parse_file`] resolves duplicates.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the file cannot be opened or read.
    pub fn host_details_from_file<P>(
        &self,
        path: P,
        host: &Host,
    ) -> Result<HostDetails, ParseError>
    where
        P: AsRef<Path>,
    {
        self.host_details(&mut open(path)?, host)
    }

    /// # Errors
    ///
    /// Will return `Err` if the reader fails or an `Include` cannot be
    /// resolved.
    pub fn host_details(
        &self,
        reader: &mut impl BufRead,
        host: &Host,
    ) -> Result<HostDetails, ParseError> {
        Ok(collect_details(&self.entries(reader)?, host))
    }
}

fn collect_details(entries: &[Entry], host: &Host) -> HostDetails {
    let mut details = HostDetails::new(host);
    let mut in_host = false;

    for entry in entries {
        match &entry.0 {
            EntryType::Host if entry.1 == host.alias => {
                details.attributes.clear();
                in_host = true;
            }
            EntryType::Host | EntryType::Match => in_host = false,
            _ if in_host => details.update(entry),
            _ => {}
        }
    }

    details
}
