//! Delimiter separated values reader.
//!
//! Records end at a line break that is not inside a quoted value. The first
//! record names the columns unless [`CsvOptions::no_column_names`] is set, in
//! which case columns are named `"0"`, `"1"`, ... and the first record is
//! data. Lines starting with the comment character are skipped.

use std::borrow::Cow;

use log::debug;

use crate::data::TextField;
use crate::result::{Parsed, ReaderResult};
use crate::task::{chunked_subtask, ParseOptions, Progress, RuntimeContext};
use crate::text::{slice, Tokens, DEFAULT_LINE_CHUNK_SIZE};

/// Dialect of a delimiter separated file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Quote character; a doubled quote inside a quoted value is a literal quote
    pub quote: u8,
    /// Comment character, recognised at the start of a record
    pub comment: u8,
    /// Value delimiter
    pub delimiter: u8,
    /// The first record is data, not column names
    pub no_column_names: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            quote: b'"',
            comment: b'#',
            delimiter: b',',
            no_column_names: false,
        }
    }
}

impl CsvOptions {
    /// Use `delimiter` between values, e.g. `b'\t'`
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Use `quote` for quoted values
    pub fn with_quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    /// Use `comment` for comment lines
    pub fn with_comment(mut self, comment: u8) -> Self {
        self.comment = comment;
        self
    }

    /// Treat the first record as data
    pub fn with_no_column_names(mut self, no_column_names: bool) -> Self {
        self.no_column_names = no_column_names;
        self
    }
}

/// Column-oriented records
#[derive(Debug, Clone)]
pub struct CsvTable<'a> {
    /// Number of data records
    pub row_count: usize,
    /// Column names in order
    pub column_names: Vec<String>,
    /// One field per column, `row_count` values each
    pub columns: Vec<TextField<'a>>,
    quote: u8,
}

impl<'a> CsvTable<'a> {
    /// Column by name
    pub fn get_column(&self, name: &str) -> Option<&TextField<'a>> {
        self.column_names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    /// Value of `row` in column `column` with doubled quotes collapsed
    pub fn unescaped(&self, column: usize, row: usize) -> Cow<'a, str> {
        unescape(self.columns[column].raw(row), self.quote)
    }
}

/// A parsed delimiter separated file
#[derive(Debug, Clone)]
pub struct CsvFile<'a> {
    /// The single table
    pub table: CsvTable<'a>,
}

/// Collapse doubled quote characters into one
pub fn unescape(value: &str, quote: u8) -> Cow<'_, str> {
    let quote = char::from(quote);
    let doubled: String = [quote, quote].iter().collect();
    if value.contains(&doubled) {
        Cow::Owned(value.replace(&doubled, &quote.to_string()))
    } else {
        Cow::Borrowed(value)
    }
}

/// A value range and whether the record ends after it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CsvValue {
    start: usize,
    end: usize,
    ends_record: bool,
}

struct CsvTokenizer<'a> {
    data: &'a str,
    position: usize,
    options: CsvOptions,
}

impl<'a> CsvTokenizer<'a> {
    fn new(data: &'a str, options: CsvOptions) -> Self {
        Self {
            data,
            position: 0,
            options,
        }
    }

    fn byte(&self, pos: usize) -> Option<u8> {
        self.data.as_bytes().get(pos).copied()
    }

    fn skip_blanks(&mut self) {
        while matches!(self.byte(self.position), Some(b' ' | b'\t')) {
            self.position += 1;
        }
    }

    fn skip_line_break(&mut self) {
        match self.byte(self.position) {
            Some(b'\r') => {
                self.position += 1;
                if self.byte(self.position) == Some(b'\n') {
                    self.position += 1;
                }
            }
            Some(b'\n') => self.position += 1,
            _ => {}
        }
    }

    /// Move to the first value of the next record, skipping blank and comment
    /// lines. Returns `false` at the end of input.
    fn start_record(&mut self) -> bool {
        loop {
            while matches!(self.byte(self.position), Some(b' ' | b'\t' | b'\n' | b'\r')) {
                self.position += 1;
            }
            match self.byte(self.position) {
                None => return false,
                Some(c) if c == self.options.comment => {
                    while !matches!(self.byte(self.position), None | Some(b'\n' | b'\r')) {
                        self.position += 1;
                    }
                }
                Some(_) => return true,
            }
        }
    }

    /// After a value: consume a delimiter or a line break
    fn finish_value(&mut self) -> bool {
        self.skip_blanks();
        match self.byte(self.position) {
            None => true,
            Some(b'\n' | b'\r') => {
                self.skip_line_break();
                true
            }
            Some(c) if c == self.options.delimiter => {
                self.position += 1;
                false
            }
            // stray characters after a closing quote belong to nothing
            Some(_) => {
                while !matches!(self.byte(self.position), None | Some(b'\n' | b'\r'))
                    && self.byte(self.position) != Some(self.options.delimiter)
                {
                    self.position += 1;
                }
                self.finish_value()
            }
        }
    }

    fn read_quoted(&mut self) -> CsvValue {
        let quote = self.options.quote;
        let start = self.position + 1;
        let mut pos = start;
        let end = loop {
            match self.byte(pos) {
                None => {
                    self.position = pos;
                    return CsvValue {
                        start,
                        end: pos,
                        ends_record: true,
                    };
                }
                Some(c) if c == quote => {
                    if self.byte(pos + 1) == Some(quote) {
                        pos += 2;
                    } else {
                        break pos;
                    }
                }
                Some(_) => pos += 1,
            }
        };
        self.position = end + 1;
        let ends_record = self.finish_value();
        CsvValue {
            start,
            end,
            ends_record,
        }
    }

    fn read_unquoted(&mut self) -> CsvValue {
        let start = self.position;
        let mut end = start;
        loop {
            match self.byte(self.position) {
                None => {
                    return CsvValue {
                        start,
                        end,
                        ends_record: true,
                    }
                }
                Some(b'\n' | b'\r') => {
                    self.skip_line_break();
                    return CsvValue {
                        start,
                        end,
                        ends_record: true,
                    };
                }
                Some(c) if c == self.options.delimiter => {
                    self.position += 1;
                    return CsvValue {
                        start,
                        end,
                        ends_record: false,
                    };
                }
                Some(b' ' | b'\t') => self.position += 1,
                Some(_) => {
                    self.position += 1;
                    end = self.position;
                }
            }
        }
    }

    /// Next value of the current record
    fn read_value(&mut self) -> CsvValue {
        self.skip_blanks();
        match self.byte(self.position) {
            Some(c) if c == self.options.quote => self.read_quoted(),
            _ => self.read_unquoted(),
        }
    }

    /// Read one record into `out`; `false` at the end of input
    fn read_record(&mut self, out: &mut Vec<(usize, usize)>) -> bool {
        out.clear();
        if !self.start_record() {
            return false;
        }
        loop {
            let value = self.read_value();
            out.push((value.start, value.end));
            if value.ends_record {
                return true;
            }
        }
    }
}

struct RecordState<'a> {
    tokenizer: CsvTokenizer<'a>,
    columns: Vec<Tokens<'a>>,
    record: Vec<(usize, usize)>,
    row_count: usize,
}

/// Parse comma separated values with the default dialect
pub fn parse_csv(data: &str) -> ReaderResult<CsvFile<'_>> {
    parse_csv_with(
        data,
        CsvOptions::default(),
        &mut RuntimeContext::new(),
        &ParseOptions::default(),
    )
}

/// Parse delimiter separated values, reporting progress every chunk of records.
///
/// Records with more values than columns drop the extra values; records with
/// fewer are padded with empty (not present) values.
pub fn parse_csv_with<'a>(
    data: &'a str,
    options: CsvOptions,
    ctx: &mut RuntimeContext,
    parse_options: &ParseOptions,
) -> ReaderResult<CsvFile<'a>> {
    ctx.update(Progress::parsing(0, data.len()))?;
    let mut tokenizer = CsvTokenizer::new(data, options);

    let mut header = Vec::new();
    tokenizer.read_record(&mut header);
    let column_names: Vec<String> = if options.no_column_names {
        tokenizer.position = 0;
        (0..header.len()).map(|i| i.to_string()).collect()
    } else {
        header
            .iter()
            .map(|&(start, end)| unescape(slice(data, start, end), options.quote).into_owned())
            .collect()
    };

    let mut state = RecordState {
        tokenizer,
        columns: column_names
            .iter()
            .map(|_| Tokens::new(data, data.len() / 80))
            .collect(),
        record: Vec::with_capacity(column_names.len()),
        row_count: 0,
    };
    chunked_subtask(
        ctx,
        parse_options.chunk_size_or(DEFAULT_LINE_CHUNK_SIZE),
        &mut state,
        |size, state| {
            let mut read = 0;
            while read < size && state.tokenizer.read_record(&mut state.record) {
                for (i, column) in state.columns.iter_mut().enumerate() {
                    let (start, end) = state.record.get(i).copied().unwrap_or((0, 0));
                    column.add(start, end);
                }
                read += 1;
            }
            state.row_count += read;
            read
        },
        |ctx, state| ctx.update(Progress::parsing(state.tokenizer.position, data.len())),
    )?;

    debug!(
        "Parsed CSV with {} columns and {} records",
        column_names.len(),
        state.row_count
    );
    Ok(Parsed::new(CsvFile {
        table: CsvTable {
            row_count: state.row_count,
            column_names,
            columns: state.columns.into_iter().map(TextField::new).collect(),
            quote: options.quote,
        },
    }))
}
